use crate::cse::types::RawChartPoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub close: Option<Value>,
    pub high: Option<Value>,
    pub low: Option<Value>,
    pub volume: Option<Value>,
}

impl From<RawChartPoint> for ChartPoint {
    fn from(raw: RawChartPoint) -> Self {
        Self {
            close: raw.p,
            high: raw.h,
            low: raw.l,
            volume: raw.q,
        }
    }
}

/// Renames upstream fields without touching values, order or count.
pub fn reshape(raw: Vec<RawChartPoint>) -> Vec<ChartPoint> {
    raw.into_iter().map(ChartPoint::from).collect()
}

/// Numeric closes, oldest first. Rows whose close is missing or non-numeric are skipped.
pub fn closes(points: &[ChartPoint]) -> Vec<f64> {
    series(points, |p| &p.close)
}

pub fn highs(points: &[ChartPoint]) -> Vec<f64> {
    series(points, |p| &p.high)
}

pub fn lows(points: &[ChartPoint]) -> Vec<f64> {
    series(points, |p| &p.low)
}

pub fn volumes(points: &[ChartPoint]) -> Vec<f64> {
    series(points, |p| &p.volume)
}

fn series(points: &[ChartPoint], field: impl Fn(&ChartPoint) -> &Option<Value>) -> Vec<f64> {
    points
        .iter()
        .filter_map(|p| field(p).as_ref().and_then(Value::as_f64))
        .collect()
}

/// Mean of the last `window` closes.
pub fn simple_moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(p: Value, h: Value, l: Value, q: Value) -> RawChartPoint {
        RawChartPoint {
            p: Some(p),
            h: Some(h),
            l: Some(l),
            q: Some(q),
        }
    }

    #[test]
    fn reshape_renames_fields_in_order() {
        let rows = vec![
            raw(json!(1), json!(2), json!(0.5), json!(100)),
            raw(json!(3.25), json!(4), json!(3), json!(7)),
        ];
        let out = reshape(rows);
        assert_eq!(out.len(), 2);
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!([
                {"close": 1, "high": 2, "low": 0.5, "volume": 100},
                {"close": 3.25, "high": 4, "low": 3, "volume": 7},
            ])
        );
    }

    #[test]
    fn reshape_passes_missing_fields_through_as_null() {
        let out = reshape(vec![RawChartPoint {
            p: Some(json!(10)),
            ..Default::default()
        }]);
        assert_eq!(
            serde_json::to_string(&out[0]).unwrap(),
            r#"{"close":10,"high":null,"low":null,"volume":null}"#
        );
    }

    #[test]
    fn reshape_treats_explicit_null_like_missing() {
        let missing = reshape(vec![RawChartPoint {
            p: Some(json!(10)),
            ..Default::default()
        }]);
        let parsed: RawChartPoint = serde_json::from_value(json!({"p": 10, "h": null})).unwrap();
        let explicit = reshape(vec![parsed]);
        assert_eq!(
            serde_json::to_string(&missing).unwrap(),
            serde_json::to_string(&explicit).unwrap()
        );
    }

    #[test]
    fn reshape_keeps_duplicates() {
        let row = raw(json!(1), json!(1), json!(1), json!(1));
        assert_eq!(reshape(vec![row.clone(), row.clone(), row]).len(), 3);
    }

    #[test]
    fn closes_skips_non_numeric() {
        let points = reshape(vec![
            raw(json!(1), json!(0), json!(0), json!(0)),
            RawChartPoint::default(),
            raw(json!("n/a"), json!(0), json!(0), json!(0)),
            raw(json!(2.5), json!(0), json!(0), json!(0)),
        ]);
        assert_eq!(closes(&points), vec![1.0, 2.5]);
    }

    #[test]
    fn series_extract_each_field() {
        let points = reshape(vec![
            raw(json!(1), json!(2), json!(0.5), json!(100)),
            raw(json!(3), json!(4), json!(2.5), json!(300)),
        ]);
        assert_eq!(highs(&points), vec![2.0, 4.0]);
        assert_eq!(lows(&points), vec![0.5, 2.5]);
        assert_eq!(volumes(&points), vec![100.0, 300.0]);
    }

    #[test]
    fn moving_average_uses_tail_window() {
        let closes: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        // Last 50 values are 11..=60.
        assert_eq!(simple_moving_average(&closes, 50), Some(35.5));
        assert_eq!(simple_moving_average(&closes[..49], 50), None);
        assert_eq!(simple_moving_average(&closes, 0), None);
    }
}
