use crate::{
    error::{Result, SiteCatError},
    model::FileSegment,
    table::{Cell, Table},
};
use serde_json::Value;

/// Concatenates export pages into one positional table.
///
/// Trailing unclassified cells are omitted on the wire, so short rows are
/// padded with nulls. With `only_unclassified`, only rows carrying nothing
/// but the key survive.
pub fn table_from_segments(segments: &[FileSegment], only_unclassified: bool) -> Result<Table> {
    let Some(header) = segments.iter().map(|s| &s.header).find(|h| !h.is_empty()) else {
        return Ok(Table::empty());
    };
    let width = header.len();
    let mut table = Table::positional(header.clone());

    for seg in segments {
        if !seg.header.is_empty() && seg.header != *header {
            return Err(SiteCatError::malformed(format!(
                "segment header {:?} differs from {:?}",
                seg.header, header
            )));
        }
        let mut page = Table::positional(header.clone());
        for r in &seg.data {
            if only_unclassified && r.row.len() != 1 {
                continue;
            }
            if r.row.len() > width {
                return Err(SiteCatError::malformed(format!(
                    "row has {} fields, header has {width}",
                    r.row.len()
                )));
            }
            let mut cells: Vec<Cell> = r.row.iter().map(to_cell).collect();
            cells.resize(width, Cell::Null);
            page.push_row(cells)?;
        }
        table.append(page)?;
    }
    Ok(table)
}

fn to_cell(v: &Value) -> Cell {
    match v {
        Value::Null => Cell::Null,
        Value::String(s) => Cell::Str(s.clone()),
        other => Cell::Str(other.to_string()),
    }
}
