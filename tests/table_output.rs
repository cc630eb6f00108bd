use serde_json::json;
use sitecat::{
    Cell, RawReportResult, Table,
    cli::write_table,
    config::{Config, OutputFormat},
    flatten::flatten,
};

fn sample() -> Table {
    let raw = RawReportResult::from_response(json!({
        "metrics": [{ "name": "Visits" }],
        "elements": [{ "id": "page", "name": "Page" }],
        "data": [{
            "year": 2024, "month": 3, "day": 5,
            "breakdown": [{ "name": "Home, \"new\"", "counts": ["8"] }]
        }]
    }))
    .unwrap();
    flatten(&raw).unwrap()
}

#[test]
fn csv_quotes_fields_that_need_it() {
    let mut buf = Vec::new();
    sample().write_csv(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text, "date,page,visits\n2024-03-05,\"Home, \"\"new\"\"\",8\n");
}

#[test]
fn records_put_the_index_first() {
    let records = sample().to_records();
    assert_eq!(
        records,
        vec![json!({ "date": "2024-03-05", "page": "Home, \"new\"", "visits": 8 })]
    );
}

#[test]
fn records_keep_declared_column_order() {
    let raw = RawReportResult::from_response(json!({
        "metrics": [{ "name": "Visits" }, { "name": "Page Views" }],
        "elements": [{ "id": "zone", "name": "Zone" }],
        "data": [{
            "year": 2024, "month": 3, "day": 5,
            "breakdown": [{ "name": "North", "counts": ["3", "7"] }]
        }]
    }))
    .unwrap();
    let table = flatten(&raw).unwrap();
    assert_eq!(table.columns(), &["zone", "visits", "page_views"].map(String::from));

    let records = table.to_records();
    let keys: Vec<&str> = records[0]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["date", "zone", "visits", "page_views"]);
}

#[test]
fn append_requires_matching_columns() {
    let mut a = Table::positional(vec!["key".into()]);
    a.push_row(vec![Cell::Str("x".into())]).unwrap();
    let mut b = Table::positional(vec!["other".into()]);
    b.push_row(vec![Cell::Null]).unwrap();
    assert!(a.append(b).is_err());

    let mut c = Table::positional(vec!["key".into()]);
    c.push_row(vec![Cell::Str("y".into())]).unwrap();
    a.append(c).unwrap();
    assert_eq!(a.len(), 2);
}

#[test]
fn write_table_honours_the_configured_format() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::default();
    cfg.output.dir = dir.path().display().to_string();
    cfg.output.format = OutputFormat::Json;

    let path = write_table(&cfg, &sample(), None, "report-abc").unwrap();
    assert_eq!(path, dir.path().join("report-abc.json"));
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written[0]["visits"], 8);
}
