use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use cse_chart_core::chart::ChartPoint;
use cse_chart_core::cse::{self, CseApi};

const MISSING_SYMBOL: &str = "missing symbol";
const METHOD_NOT_ALLOWED: &str = "Method not allowed";

#[derive(Clone)]
pub struct AppState {
    pub cse: Arc<dyn CseApi>,
}

/// Every path and method lands on the chart-data handler.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(chart_data)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
struct ChartResponse {
    data: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Failures that end the request with 502. `Display` is the body's error text.
#[derive(Debug)]
pub enum ChartDataError {
    StreamRead(axum::Error),
    Upstream(anyhow::Error),
}

impl fmt::Display for ChartDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamRead(e) => write!(f, "failed to read request body: {e}"),
            Self::Upstream(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for ChartDataError {}

impl IntoResponse for ChartDataError {
    fn into_response(self) -> Response {
        match &self {
            Self::StreamRead(e) => {
                tracing::error!(error = %e, "request body read failed");
            }
            Self::Upstream(e) => {
                sentry_anyhow::capture_anyhow(e);
                tracing::error!(error = %format!("{e:#}"), "CSE chart fetch failed");
            }
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        with_cors(StatusCode::BAD_GATEWAY, Json(body))
    }
}

/// Builds the response with the CORS headers ahead of every other header.
fn with_cors(status: StatusCode, body: impl IntoResponse) -> Response {
    let mut res = body.into_response();
    let rest = std::mem::take(res.headers_mut());

    let mut headers = HeaderMap::with_capacity(rest.len() + 3);
    for (name, value) in cors_headers() {
        headers.insert(name, value);
    }
    for (name, value) in rest.iter() {
        headers.append(name.clone(), value.clone());
    }

    *res.status_mut() = status;
    *res.headers_mut() = headers;
    res
}

fn cors_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ),
    ]
}

async fn chart_data(State(state): State<AppState>, method: Method, body: Body) -> Response {
    if method == Method::OPTIONS {
        return with_cors(StatusCode::NO_CONTENT, ());
    }

    if method != Method::POST {
        let body = ErrorResponse {
            error: METHOD_NOT_ALLOWED.to_string(),
        };
        return with_cors(StatusCode::METHOD_NOT_ALLOWED, Json(body));
    }

    match handle_post(&state, body).await {
        Ok(resp) => with_cors(StatusCode::OK, Json(resp)),
        Err(err) => err.into_response(),
    }
}

async fn handle_post(state: &AppState, body: Body) -> Result<ChartResponse, ChartDataError> {
    let text = read_body_text(body).await?;

    let Some(symbol) = form_symbol(&text) else {
        return Ok(ChartResponse {
            data: Vec::new(),
            error: Some(MISSING_SYMBOL),
        });
    };

    let data = cse::fetch_chart_data(state.cse.as_ref(), &symbol)
        .await
        .map_err(ChartDataError::Upstream)?;
    tracing::info!(%symbol, rows = data.len(), "served chart data");

    Ok(ChartResponse { data, error: None })
}

/// Buffers the whole body. No size cap is applied.
pub async fn read_body_text(body: Body) -> Result<String, ChartDataError> {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(ChartDataError::StreamRead)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// First `symbol` value of a urlencoded form; empty counts as absent.
fn form_symbol(body: &str) -> Option<String> {
    url::form_urlencoded::parse(body.as_bytes())
        .find(|(k, _)| k == "symbol")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
