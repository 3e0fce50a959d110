//! Result shaping for centrality and aggregate queries.
//!
//! The query engine returns raw rows; these helpers turn them into
//! id-keyed maps and apply the relative normalisations.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

/// Per-vertex metric values keyed by vertex id, in result order.
pub type Metric = IndexMap<String, f64>;

fn number(value: &Value) -> Result<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::InvalidParameter(format!("non-finite metric value {n}"))),
        other => Err(Error::InvalidParameter(format!(
            "expected numeric metric value, got {other}"
        ))),
    }
}

fn pair(row: &Value) -> Result<(String, f64)> {
    match row.as_array().map(Vec::as_slice) {
        Some([Value::String(id), value]) => Ok((id.clone(), number(value)?)),
        _ => Err(Error::InvalidParameter(format!(
            "expected [id, value] row, got {row}"
        ))),
    }
}

/// Parses `[id, value]` rows. `null` values count as 0.
///
/// # Errors
///
/// Returns `Error::InvalidParameter` for rows of another shape.
pub fn parse_metric(rows: &[Value]) -> Result<Metric> {
    rows.iter().map(pair).collect()
}

/// Divides the smallest non-zero value by each non-zero value, so the
/// vertex with the minimum raw value scores 1. Zero values stay 0.
#[must_use]
pub fn normalize_by_min(metric: Metric) -> Metric {
    let min = metric
        .values()
        .copied()
        .filter(|v| *v > 0.0)
        .fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return metric;
    }
    metric
        .into_iter()
        .map(|(id, v)| (id, if v > 0.0 { min / v } else { 0.0 }))
        .collect()
}

/// Divides each value by the maximum, so the top vertex scores 1. An
/// all-zero metric is returned unchanged.
#[must_use]
pub fn normalize_by_max(metric: Metric) -> Metric {
    let max = metric.values().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return metric;
    }
    metric.into_iter().map(|(id, v)| (id, v / max)).collect()
}

/// Parses the `{toFind, paths}` betweenness row.
///
/// Every id in `toFind` is present in the result (0 when it lies on no
/// shortest path). For undirected traversal each path is found in both
/// directions, so counts are halved.
///
/// # Errors
///
/// Returns `Error::InvalidParameter` for rows of another shape.
pub fn parse_betweenness(rows: &[Value], undirected: bool) -> Result<Metric> {
    let Some(row) = rows.first() else {
        return Ok(Metric::new());
    };
    let ids = row
        .get("toFind")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidParameter("betweenness row lacks toFind".to_string()))?;
    let paths = match row.get("paths") {
        Some(Value::Array(paths)) => parse_metric(paths)?,
        _ => Metric::new(),
    };

    let divisor = if undirected { 2.0 } else { 1.0 };
    let mut metric = Metric::with_capacity(ids.len());
    for id in ids {
        let Value::String(id) = id else {
            return Err(Error::InvalidParameter(format!(
                "expected vertex id in toFind, got {id}"
            )));
        };
        let count = paths.get(id).copied().unwrap_or(0.0);
        metric.insert(id.clone(), count / divisor);
    }
    Ok(metric)
}

/// Reads an optional single scalar row (radius, diameter).
///
/// # Errors
///
/// Returns `Error::InvalidParameter` if the row is not numeric.
pub fn parse_scalar(rows: &[Value]) -> Result<Option<f64>> {
    rows.first().map(number).transpose()
}

/// Parses `{left, right, neighbors: [...]}` rows into neighbor counts per
/// pair.
///
/// # Errors
///
/// Returns `Error::InvalidParameter` for rows of another shape.
pub fn count_neighbors(rows: &[Value]) -> Result<IndexMap<String, IndexMap<String, usize>>> {
    let mut counts: IndexMap<String, IndexMap<String, usize>> = IndexMap::new();
    for row in rows {
        let left = row.get("left").and_then(Value::as_str);
        let right = row.get("right").and_then(Value::as_str);
        let neighbors = row.get("neighbors").and_then(Value::as_array);
        match (left, right, neighbors) {
            (Some(left), Some(right), Some(neighbors)) => {
                counts
                    .entry(left.to_string())
                    .or_default()
                    .insert(right.to_string(), neighbors.len());
            }
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "expected common neighbors row, got {row}"
                )))
            }
        }
    }
    Ok(counts)
}

/// Merges `{id: value}` rows into one map.
///
/// # Errors
///
/// Returns `Error::InvalidParameter` for rows that are not objects.
pub fn merge_objects(rows: Vec<Value>) -> Result<IndexMap<String, Value>> {
    let mut merged = IndexMap::new();
    for row in rows {
        match row {
            Value::Object(map) => merged.extend(map),
            other => {
                return Err(Error::InvalidParameter(format!(
                    "expected object row, got {other}"
                )))
            }
        }
    }
    Ok(merged)
}
