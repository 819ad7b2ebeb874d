use crate::config::Settings;
use crate::cse::error::UpstreamStatusError;
use crate::cse::types::{ChartDataResponse, CompanySummaryResponse, RawChartPoint, StockId};
use crate::cse::{CseApi, CHART_BY_STOCK_ENDPOINT, CHART_PERIOD, COMPANY_SUMMARY_ENDPOINT};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpCseClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCseClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.cse_base_url(),
            settings.cse_timeout_secs.map(Duration::from_secs),
        )
    }

    /// No timeout unless one is given: a stalled upstream stalls the caller.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build CSE http client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let res = self
            .http
            .post(self.url(endpoint))
            .form(form)
            .send()
            .await
            .with_context(|| format!("CSE {endpoint} request failed"))?;

        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamStatusError { endpoint, status }.into());
        }

        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read CSE {endpoint} response"))?;
        serde_json::from_str::<T>(&text)
            .with_context(|| format!("CSE {endpoint} response is not valid JSON"))
    }
}

#[async_trait::async_trait]
impl CseApi for HttpCseClient {
    async fn resolve_symbol(&self, symbol: &str) -> Result<Option<StockId>> {
        let summary: CompanySummaryResponse = self
            .post_form(COMPANY_SUMMARY_ENDPOINT, &[("symbol", symbol)])
            .await?;
        Ok(summary.stock_id())
    }

    async fn fetch_chart(&self, stock_id: &StockId) -> Result<Vec<RawChartPoint>> {
        let chart: ChartDataResponse = self
            .post_form(
                CHART_BY_STOCK_ENDPOINT,
                &[("stockId", stock_id.as_str()), ("period", CHART_PERIOD)],
            )
            .await?;
        Ok(chart.into_points())
    }
}
