use serde_json::{Value, json};
use sitecat::{
    Cell, RawReportResult, SiteCatError, TimeKey,
    flatten::{ResultFlattener, flatten},
};
use time::macros::{date, datetime};

fn raw(v: Value) -> RawReportResult {
    RawReportResult::from_response(v).expect("raw report")
}

fn ints(cells: Vec<&Cell>) -> Vec<i64> {
    cells.into_iter().map(|c| c.as_i64().expect("int cell")).collect()
}

fn strs(cells: Vec<&Cell>) -> Vec<&str> {
    cells.into_iter().map(|c| c.as_str().expect("str cell")).collect()
}

fn two_level_breakdown() -> RawReportResult {
    raw(json!({
        "report": {
            "metrics": [{ "id": "pageviews", "name": "Page Views" }, { "id": "visits", "name": "Visits" }],
            "elements": [
                { "id": "page", "name": "Page" },
                { "id": "browser", "name": "Browser", "classification": "Browser Type" }
            ],
            "data": [
                {
                    "name": "Tue. 2 Jan. 2024", "year": 2024, "month": 1, "day": 2,
                    "breakdown": [
                        {
                            "name": "Home",
                            "breakdown": [
                                { "name": "Chrome", "counts": ["5", "2.5"] },
                                { "name": "::unspecified::", "counts": ["1", "1"] }
                            ]
                        },
                        { "name": "Empty", "breakdown": [] },
                        { "name": "Partial", "counts": ["9", "9"] }
                    ]
                },
                {
                    "name": "Mon. 1 Jan. 2024", "year": 2024, "month": 1, "day": 1,
                    "breakdown": [
                        { "name": "About", "breakdown": [{ "name": "Safari", "counts": ["3", "4"] }] }
                    ]
                }
            ]
        }
    }))
}

#[test]
fn single_metric_daily_report() {
    let r = raw(json!({
        "elements": [{ "id": "datetime" }],
        "metrics": [{ "name": "Visits" }],
        "data": [
            { "year": 2024, "month": 1, "day": 1, "counts": ["10"] },
            { "year": 2024, "month": 1, "day": 2, "counts": ["20"] },
            { "year": 2024, "month": 1, "day": 3, "counts": ["5"] }
        ]
    }));
    let table = flatten(&r).unwrap();

    assert_eq!(table.index_name(), Some("date"));
    assert_eq!(
        table.index(),
        &[
            TimeKey::Date(date!(2024 - 01 - 01)),
            TimeKey::Date(date!(2024 - 01 - 02)),
            TimeKey::Date(date!(2024 - 01 - 03)),
        ]
    );
    assert_eq!(table.columns(), &["visits".to_string()]);
    assert_eq!(ints(table.column("visits").unwrap()), vec![10, 20, 5]);
}

#[test]
fn nested_breakdowns_keep_only_complete_paths() {
    let r = two_level_breakdown();
    let f = ResultFlattener::new(&r).unwrap();
    assert_eq!(f.dimension_names(), &["page".to_string(), "browser_type".to_string()]);
    assert_eq!(f.metric_names(), &["page_views".to_string(), "visits".to_string()]);
    // Chrome, unspecified, Partial, Safari; "Empty" has no leaves
    assert_eq!(f.leaf_paths().unwrap().len(), 4);

    let table = f.into_table().unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(
        table.columns(),
        &["page", "browser_type", "page_views", "visits"].map(String::from)
    );
    assert_eq!(strs(table.column("page").unwrap()), vec!["About", "Home", "Home"]);
    assert_eq!(
        strs(table.column("browser_type").unwrap()),
        vec!["Safari", "Chrome", "None"]
    );
    assert_eq!(ints(table.column("page_views").unwrap()), vec![3, 5, 1]);
    assert_eq!(table.column("visits").unwrap()[1], &Cell::Float(2.5));
    assert_eq!(table.index()[0], TimeKey::Date(date!(2024 - 01 - 01)));
}

#[test]
fn unspecified_becomes_the_string_none() {
    let table = flatten(&two_level_breakdown()).unwrap();
    let browsers = table.column("browser_type").unwrap();
    assert!(browsers.contains(&&Cell::Str("None".into())));
    assert!(!browsers.contains(&&Cell::Null));
}

#[test]
fn date_position_is_detected_when_innermost() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "elements": [{ "id": "page", "name": "Page" }, { "id": "datetime", "name": "Date" }],
        "data": [
            {
                "name": "Home",
                "breakdown": [
                    { "year": 2024, "month": 1, "day": 1, "counts": ["1"] },
                    { "year": 2024, "month": 1, "day": 2, "counts": ["2"] }
                ]
            },
            { "name": "About", "breakdown": [{ "year": 2024, "month": 1, "day": 1, "counts": ["3"] }] }
        ]
    }));
    let table = flatten(&r).unwrap();

    assert_eq!(table.columns(), &["page".to_string(), "visits".to_string()]);
    assert_eq!(strs(table.column("page").unwrap()), vec!["Home", "About", "Home"]);
    assert_eq!(ints(table.column("visits").unwrap()), vec![1, 3, 2]);
}

#[test]
fn hour_fields_give_an_hourly_index() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "elements": [{ "id": "datetime" }],
        "data": [
            { "year": 2024, "month": 1, "day": 1, "hour": 13, "counts": ["7"] },
            { "year": 2024, "month": 1, "day": 1, "hour": 9, "counts": ["4"] }
        ]
    }));
    let table = flatten(&r).unwrap();

    assert_eq!(table.index_name(), Some("hour"));
    assert_eq!(table.index()[0], TimeKey::Hour(datetime!(2024-01-01 9:00)));
    assert_eq!(ints(table.column("visits").unwrap()), vec![4, 7]);
}

#[test]
fn empty_data_yields_an_empty_table() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "elements": [{ "id": "datetime" }],
        "data": []
    }));
    let table = flatten(&r).unwrap();
    assert!(table.is_empty());
    assert!(table.columns().is_empty());
}

#[test]
fn only_partial_paths_yield_an_empty_table() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "elements": [{ "id": "page", "name": "Page" }],
        "data": [{ "year": 2024, "month": 1, "day": 1, "counts": ["1"] }]
    }));
    let table = flatten(&r).unwrap();
    assert!(table.is_empty());
    assert!(table.columns().is_empty());
}

#[test]
fn flattening_is_deterministic() {
    let r = two_level_breakdown();
    assert_eq!(flatten(&r).unwrap(), flatten(&r).unwrap());
}

#[test]
fn numeric_json_counts_are_accepted() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }, { "name": "Bounce Rate" }],
        "elements": [],
        "data": [{ "year": 2024, "month": 2, "day": 29, "counts": [12, 0.25] }]
    }));
    let table = flatten(&r).unwrap();
    assert_eq!(table.rows()[0], vec![Cell::Int(12), Cell::Float(0.25)]);
}

#[test]
fn integral_float_counts_become_integers() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }, { "name": "Orders" }, { "name": "Rate" }],
        "data": [{ "year": 2024, "month": 1, "day": 1, "counts": [10.0, "10.0", -3.0] }]
    }));
    let table = flatten(&r).unwrap();
    assert_eq!(
        table.rows()[0],
        vec![Cell::Int(10), Cell::Float(10.0), Cell::Int(-3)]
    );
}

#[test]
fn counts_beyond_i64_are_malformed() {
    for count in [json!("99999999999999999999"), json!(18446744073709551615u64)] {
        let r = raw(json!({
            "metrics": [{ "name": "Visits" }],
            "data": [{ "year": 2024, "month": 1, "day": 1, "counts": [count] }]
        }));
        assert!(matches!(flatten(&r), Err(SiteCatError::MalformedResult(_))));
    }
}

#[test]
fn missing_counts_are_null_and_extra_counts_are_malformed() {
    let short = raw(json!({
        "metrics": [{ "name": "Visits" }, { "name": "Orders" }],
        "data": [{ "year": 2024, "month": 1, "day": 1, "counts": ["3"] }]
    }));
    let table = flatten(&short).unwrap();
    assert_eq!(table.rows()[0], vec![Cell::Int(3), Cell::Null]);

    let long = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "data": [{ "year": 2024, "month": 1, "day": 1, "counts": ["3", "4"] }]
    }));
    assert!(matches!(flatten(&long), Err(SiteCatError::MalformedResult(_))));
}

#[test]
fn non_numeric_count_is_malformed() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "data": [{ "year": 2024, "month": 1, "day": 1, "counts": ["lots"] }]
    }));
    assert!(matches!(flatten(&r), Err(SiteCatError::MalformedResult(_))));
}

#[test]
fn nameless_node_is_malformed() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "elements": [{ "id": "page", "name": "Page" }],
        "data": [{ "year": 2024, "month": 1, "day": 1, "breakdown": [{ "counts": ["1"] }] }]
    }));
    assert!(matches!(flatten(&r), Err(SiteCatError::MalformedResult(_))));
}

#[test]
fn path_without_a_date_is_malformed() {
    let r = raw(json!({
        "metrics": [{ "name": "Visits" }],
        "elements": [{ "id": "page", "name": "Page" }],
        "data": [{ "name": "Home", "breakdown": [{ "name": "Chrome", "counts": ["1"] }] }]
    }));
    assert!(matches!(flatten(&r), Err(SiteCatError::MalformedResult(_))));
}
