pub mod client;
pub mod error;
pub mod types;

use crate::chart::{self, ChartPoint};
use crate::cse::types::{RawChartPoint, StockId};
use anyhow::Result;

pub const COMPANY_SUMMARY_ENDPOINT: &str = "companyInfoSummery";
pub const CHART_BY_STOCK_ENDPOINT: &str = "companyChartDataByStock";

/// Daily bars.
pub const CHART_PERIOD: &str = "5";

#[async_trait::async_trait]
pub trait CseApi: Send + Sync {
    /// Looks up the internal stock id for a symbol. `None` means the symbol is unknown upstream.
    async fn resolve_symbol(&self, symbol: &str) -> Result<Option<StockId>>;

    async fn fetch_chart(&self, stock_id: &StockId) -> Result<Vec<RawChartPoint>>;
}

/// Symbol lookup followed by the chart fetch. An unknown symbol yields no rows and skips the
/// second call.
pub async fn fetch_chart_data(api: &dyn CseApi, symbol: &str) -> Result<Vec<ChartPoint>> {
    let Some(stock_id) = api.resolve_symbol(symbol).await? else {
        tracing::info!(%symbol, "CSE has no stock id for symbol; returning empty chart");
        return Ok(Vec::new());
    };

    let raw = api.fetch_chart(&stock_id).await?;
    tracing::debug!(%symbol, %stock_id, rows = raw.len(), "fetched CSE chart data");
    Ok(chart::reshape(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cse::error::UpstreamStatusError;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubCse {
        stock_id: Option<StockId>,
        summary_status: Option<StatusCode>,
        rows: Vec<RawChartPoint>,
        summary_calls: AtomicUsize,
        chart_calls: AtomicUsize,
        last_stock_id: std::sync::Mutex<Option<StockId>>,
    }

    #[async_trait::async_trait]
    impl CseApi for StubCse {
        async fn resolve_symbol(&self, _symbol: &str) -> Result<Option<StockId>> {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(status) = self.summary_status {
                return Err(UpstreamStatusError {
                    endpoint: COMPANY_SUMMARY_ENDPOINT,
                    status,
                }
                .into());
            }
            Ok(self.stock_id.clone())
        }

        async fn fetch_chart(&self, stock_id: &StockId) -> Result<Vec<RawChartPoint>> {
            self.chart_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_stock_id.lock().unwrap() = Some(stock_id.clone());
            Ok(self.rows.clone())
        }
    }

    fn row(p: f64, h: f64, l: f64, q: u64) -> RawChartPoint {
        RawChartPoint {
            p: Some(json!(p)),
            h: Some(json!(h)),
            l: Some(json!(l)),
            q: Some(json!(q)),
        }
    }

    #[tokio::test]
    async fn maps_every_row_for_known_symbol() {
        let stub = StubCse {
            stock_id: Some(StockId::from(42)),
            rows: vec![row(1.0, 2.0, 0.5, 100), row(2.0, 3.0, 1.5, 200), row(1.5, 2.0, 1.0, 50)],
            ..Default::default()
        };

        let out = fetch_chart_data(&stub, "ABC.N0000").await.unwrap();

        assert_eq!(out.len(), 3);
        for (got, raw) in out.iter().zip(&stub.rows) {
            assert_eq!(got.close, raw.p);
            assert_eq!(got.high, raw.h);
            assert_eq!(got.low, raw.l);
            assert_eq!(got.volume, raw.q);
        }
        assert_eq!(*stub.last_stock_id.lock().unwrap(), Some(StockId::from(42)));
    }

    #[tokio::test]
    async fn unknown_symbol_skips_chart_call() {
        let stub = StubCse::default();

        let out = fetch_chart_data(&stub, "NOPE").await.unwrap();

        assert!(out.is_empty());
        assert_eq!(stub.summary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(stub.chart_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summary_failure_propagates_without_chart_call() {
        let stub = StubCse {
            stock_id: Some(StockId::from(42)),
            summary_status: Some(StatusCode::INTERNAL_SERVER_ERROR),
            ..Default::default()
        };

        let err = fetch_chart_data(&stub, "ABC").await.unwrap_err();

        let status = err.downcast_ref::<UpstreamStatusError>().unwrap();
        assert_eq!(status.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "CSE companyInfoSummery: 500");
        assert_eq!(stub.chart_calls.load(Ordering::SeqCst), 0);
    }
}
