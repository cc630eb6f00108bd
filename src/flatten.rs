//! Reshapes a nested report result into a time-indexed table.
//!
//! The data tree nests one level per breakdown element plus one date level.
//! Every leaf closes a path of ancestor values; paths of the wrong length are
//! partial rows the API emits now and then, and are dropped.

use crate::{
    error::{Result, SiteCatError},
    model::{DataNode, RawReportResult},
    table::{Cell, Table, TimeKey},
};
use serde_json::Value;
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::debug;

/// The report's stand-in for an empty breakdown value.
pub const UNSPECIFIED: &str = "::unspecified::";
pub const UNSPECIFIED_REPLACEMENT: &str = "None";

const DATETIME_ELEMENT: &str = "datetime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValue {
    Time(TimeKey),
    Name(String),
}

#[derive(Debug, Clone)]
pub struct LeafPath<'a> {
    pub values: Vec<PathValue>,
    pub counts: &'a [Value],
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub time_key: TimeKey,
    /// `(dimension, value)` in declared dimension order.
    pub breakdowns: Vec<(String, String)>,
    /// `(metric, value)` in declared metric order.
    pub metrics: Vec<(String, Cell)>,
}

pub struct ResultFlattener<'a> {
    raw: &'a RawReportResult,
    metrics: Vec<String>,
    dimensions: Vec<String>,
}

impl<'a> ResultFlattener<'a> {
    pub fn new(raw: &'a RawReportResult) -> Result<Self> {
        let metrics = raw
            .metrics
            .iter()
            .map(|m| {
                m.name
                    .as_deref()
                    .or(m.id.as_deref())
                    .map(column_name)
                    .ok_or_else(|| SiteCatError::malformed("metric without name or id"))
            })
            .collect::<Result<Vec<_>>>()?;

        let dimensions = raw
            .elements
            .iter()
            .filter(|e| e.id != DATETIME_ELEMENT)
            .map(|e| {
                let label = e
                    .classification
                    .as_deref()
                    .or(e.name.as_deref())
                    .unwrap_or(e.id.as_str());
                column_name(label)
            })
            .collect();

        Ok(Self {
            raw,
            metrics,
            dimensions,
        })
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metrics
    }

    pub fn dimension_names(&self) -> &[String] {
        &self.dimensions
    }

    /// Number of path values a complete leaf path carries.
    pub fn expected_depth(&self) -> usize {
        self.dimensions.len() + 1
    }

    /// Depth-first, in document order, every path ending at a leaf.
    pub fn leaf_paths(&self) -> Result<Vec<LeafPath<'a>>> {
        let mut out = Vec::new();
        let mut path: Vec<PathValue> = Vec::new();
        let mut stack: Vec<(&'a DataNode, usize)> =
            self.raw.data.iter().rev().map(|n| (n, 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            path.truncate(depth);
            path.push(node_value(node)?);
            match &node.breakdown {
                None => out.push(LeafPath {
                    values: path.clone(),
                    counts: &node.counts,
                }),
                Some(children) => {
                    stack.extend(children.iter().rev().map(|c| (c, depth + 1)));
                }
            }
        }
        Ok(out)
    }

    pub fn records(&self) -> Result<Vec<FlatRecord>> {
        let all = self.leaf_paths()?;
        let total = all.len();
        let expected = self.expected_depth();
        let complete: Vec<LeafPath<'a>> = all
            .into_iter()
            .filter(|p| p.values.len() == expected)
            .collect();
        if complete.len() < total {
            debug!(
                "dropped {} partial paths (expected depth {})",
                total - complete.len(),
                expected
            );
        }

        let Some(first) = complete.first() else {
            return Ok(Vec::new());
        };
        let date_pos = first
            .values
            .iter()
            .position(|v| matches!(v, PathValue::Time(_)))
            .ok_or_else(|| SiteCatError::malformed("no date-shaped value in the first complete path"))?;

        complete
            .iter()
            .map(|p| self.record(p, date_pos))
            .collect()
    }

    fn record(&self, path: &LeafPath<'_>, date_pos: usize) -> Result<FlatRecord> {
        let time_key = match &path.values[date_pos] {
            PathValue::Time(k) => *k,
            PathValue::Name(n) => {
                return Err(SiteCatError::malformed(format!(
                    "expected a date at depth {date_pos}, found {n:?}"
                )));
            }
        };

        let mut breakdowns = Vec::with_capacity(self.dimensions.len());
        let others = path
            .values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_pos)
            .map(|(_, v)| v);
        for (dim, value) in self.dimensions.iter().zip(others) {
            let value = match value {
                PathValue::Name(n) if n == UNSPECIFIED => UNSPECIFIED_REPLACEMENT.to_string(),
                PathValue::Name(n) => n.clone(),
                PathValue::Time(k) => {
                    return Err(SiteCatError::malformed(format!(
                        "unexpected second date {k} in breakdown {dim}"
                    )));
                }
            };
            breakdowns.push((dim.clone(), value));
        }

        if path.counts.len() > self.metrics.len() {
            return Err(SiteCatError::malformed(format!(
                "{} counts for {} metrics",
                path.counts.len(),
                self.metrics.len()
            )));
        }
        let mut metrics = Vec::with_capacity(self.metrics.len());
        for (i, name) in self.metrics.iter().enumerate() {
            let cell = match path.counts.get(i) {
                Some(v) => parse_count(v)?,
                None => Cell::Null,
            };
            metrics.push((name.clone(), cell));
        }

        Ok(FlatRecord {
            time_key,
            breakdowns,
            metrics,
        })
    }

    /// Index sorted ascending, breakdown columns then metric columns.
    pub fn into_table(self) -> Result<Table> {
        let records = self.records()?;
        let Some(first) = records.first() else {
            return Ok(Table::empty());
        };
        let index_name = if first.time_key.is_hourly() { "hour" } else { "date" };

        let columns: Vec<String> = self
            .dimensions
            .iter()
            .chain(self.metrics.iter())
            .cloned()
            .collect();
        let mut table = Table::time_indexed(index_name, columns);
        for rec in records {
            let row = rec
                .breakdowns
                .into_iter()
                .map(|(_, v)| Cell::Str(v))
                .chain(rec.metrics.into_iter().map(|(_, c)| c))
                .collect();
            table.push_keyed(rec.time_key, row)?;
        }
        table.sort_by_index();
        Ok(table)
    }
}

pub fn flatten(raw: &RawReportResult) -> Result<Table> {
    if raw.data.is_empty() {
        return Ok(Table::empty());
    }
    ResultFlattener::new(raw)?.into_table()
}

/// `"Page Views"` → `"page_views"`.
pub fn column_name(label: &str) -> String {
    label.replace(' ', "_").to_lowercase()
}

fn node_value(node: &DataNode) -> Result<PathValue> {
    if let Some(year) = node.year {
        let (month, day) = match (node.month, node.day) {
            (Some(m), Some(d)) => (m, d),
            _ => {
                return Err(SiteCatError::malformed(format!(
                    "date node for {year} lacks month or day"
                )));
            }
        };
        let date = Month::try_from(month)
            .and_then(|m| Date::from_calendar_date(year, m, day))
            .map_err(|e| SiteCatError::malformed(format!("bad date {year}-{month}-{day}: {e}")))?;
        return Ok(PathValue::Time(match node.hour {
            Some(h) => {
                let t = Time::from_hms(h, 0, 0)
                    .map_err(|e| SiteCatError::malformed(format!("bad hour {h}: {e}")))?;
                TimeKey::Hour(PrimitiveDateTime::new(date, t))
            }
            None => TimeKey::Date(date),
        }));
    }
    node.name
        .clone()
        .map(PathValue::Name)
        .ok_or_else(|| SiteCatError::malformed("data node has neither a date nor a name"))
}

/// Integer when lossless, float otherwise; never a string.
///
/// An integer that does not fit in `i64` is rejected rather than rounded.
fn parse_count(v: &Value) -> Result<Cell> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Cell::Int(i))
            } else if is_integer_literal(s) {
                Err(SiteCatError::malformed(format!("count {s} overflows i64")))
            } else if let Ok(x) = s.parse::<f64>() {
                Ok(Cell::Float(x))
            } else {
                Err(SiteCatError::malformed(format!("count {s:?} is not numeric")))
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Cell::Int(i))
            } else if n.is_u64() {
                Err(SiteCatError::malformed(format!("count {n} overflows i64")))
            } else {
                n.as_f64()
                    .map(integral_or_float)
                    .ok_or_else(|| SiteCatError::malformed(format!("count {n} out of range")))
            }
        }
        other => Err(SiteCatError::malformed(format!("count {other} is not numeric"))),
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

// i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
fn integral_or_float(x: f64) -> Cell {
    if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Cell::Int(x as i64)
    } else {
        Cell::Float(x)
    }
}
