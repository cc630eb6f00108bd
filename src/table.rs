//! Minimal column-ordered table used as the sink for flattened results.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, Write};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::error::{Result, SiteCatError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeKey {
    Date(Date),
    Hour(PrimitiveDateTime),
}

impl TimeKey {
    pub fn is_hourly(&self) -> bool {
        matches!(self, Self::Hour(_))
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => {
                let s = d
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&s)
            }
            Self::Hour(dt) => {
                let s = dt
                    .format(format_description!(
                        "[year]-[month]-[day] [hour]:[minute]:[second]"
                    ))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&s)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl Cell {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Rows share one column list. A table either has a time index (one key per
/// row) or a positional one (no keys).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    index_name: Option<String>,
    index: Vec<TimeKey>,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// No columns, no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn positional(columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn time_indexed(index_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            index_name: Some(index_name.into()),
            columns,
            ..Self::default()
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if self.index_name.is_some() {
            return Err(SiteCatError::malformed("time-indexed table needs a key per row"));
        }
        self.check_width(&row)?;
        self.rows.push(row);
        Ok(())
    }

    pub fn push_keyed(&mut self, key: TimeKey, row: Vec<Cell>) -> Result<()> {
        if self.index_name.is_none() {
            return Err(SiteCatError::malformed("positional table takes no row keys"));
        }
        self.check_width(&row)?;
        self.index.push(key);
        self.rows.push(row);
        Ok(())
    }

    fn check_width(&self, row: &[Cell]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(SiteCatError::malformed(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }

    /// Stable ascending sort by time key; a no-op for positional tables.
    pub fn sort_by_index(&mut self) {
        if self.index.is_empty() {
            return;
        }
        let mut pairs: Vec<(TimeKey, Vec<Cell>)> = std::mem::take(&mut self.index)
            .into_iter()
            .zip(std::mem::take(&mut self.rows))
            .collect();
        pairs.sort_by_key(|(k, _)| *k);
        (self.index, self.rows) = pairs.into_iter().unzip();
    }

    /// Appends the rows of `other`. Both tables must share the same columns and index kind.
    pub fn append(&mut self, other: Table) -> Result<()> {
        if other.columns.is_empty() && other.rows.is_empty() {
            return Ok(());
        }
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.columns != other.columns || self.index_name != other.index_name {
            return Err(SiteCatError::malformed(format!(
                "cannot append table with columns {:?} to {:?}",
                other.columns, self.columns
            )));
        }
        self.index.extend(other.index);
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    pub fn index(&self) -> &[TimeKey] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| &r[i]).collect())
    }

    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        let mut header: Vec<String> = Vec::with_capacity(self.columns.len() + 1);
        if let Some(name) = &self.index_name {
            header.push(csv_field(name));
        }
        header.extend(self.columns.iter().map(|c| csv_field(c)));
        if !header.is_empty() {
            writeln!(w, "{}", header.join(","))?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let mut fields = Vec::with_capacity(row.len() + 1);
            if let Some(key) = self.index.get(i) {
                fields.push(key.to_string());
            }
            fields.extend(row.iter().map(|c| csv_field(&c.to_string())));
            writeln!(w, "{}", fields.join(","))?;
        }
        Ok(())
    }

    /// One JSON object per row, index first.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut rec = Map::new();
                if let (Some(name), Some(key)) = (&self.index_name, self.index.get(i)) {
                    rec.insert(name.clone(), Value::String(key.to_string()));
                }
                for (col, cell) in self.columns.iter().zip(row) {
                    rec.insert(
                        col.clone(),
                        serde_json::to_value(cell).unwrap_or(Value::Null),
                    );
                }
                Value::Object(rec)
            })
            .collect()
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
