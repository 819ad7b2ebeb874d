use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// `companyInfoSummery` payload. Only the stock id is consumed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanySummaryResponse {
    #[serde(rename = "reqSymbolInfo", default)]
    pub req_symbol_info: Option<SymbolInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolInfo {
    #[serde(default)]
    pub id: Option<Value>,
}

impl CompanySummaryResponse {
    pub fn stock_id(&self) -> Option<StockId> {
        self.req_symbol_info
            .as_ref()
            .and_then(|info| info.id.as_ref())
            .and_then(StockId::from_json)
    }
}

/// Upstream stock id, kept as the text sent back in the `stockId` form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockId(String);

impl StockId {
    /// Integral numbers are written without a fraction (`42.0` -> `42`); strings are used
    /// verbatim. Null, bools, arrays and objects carry no usable id.
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => Some(Self(format_number(n))),
            Value::String(s) => Some(Self(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for StockId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for StockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // 2^53: beyond this f64 no longer represents every integer exactly.
        Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// `companyChartDataByStock` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartDataResponse {
    #[serde(rename = "chartData", default)]
    pub chart_data: Option<Vec<RawChartPoint>>,
}

impl ChartDataResponse {
    pub fn into_points(self) -> Vec<RawChartPoint> {
        self.chart_data.unwrap_or_default()
    }
}

/// One upstream chart row: p=close, h=high, l=low, q=volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChartPoint {
    #[serde(default)]
    pub p: Option<Value>,
    #[serde(default)]
    pub h: Option<Value>,
    #[serde(default)]
    pub l: Option<Value>,
    #[serde(default)]
    pub q: Option<Value>,
}
