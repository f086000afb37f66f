//! End-to-end tests: configuration files to indexed rows to search results.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{collections::BTreeSet, ops::Bound, path::Path};

use celldex_config::{ConfigFormat, parse_schema_str, parse_table_str};
use celldex_data::{RowBuilder, RowMetadata, Value};
use celldex_index::{
    CompiledQuery, IndexError, IndexValue, QueryCompiler, QueryKind, RowIndex, Schema, SearchHit,
    SearchValidation,
};
use celldex_query::{Condition, Search, SortField};
use num_bigint::BigInt;

const SCHEMA: &str = r#"
default_analyzer = "prose"

[analyzers.prose]
type = "snowball"
language = "english"
stop_words = ["about", "and"]

[fields.name]
type = "string"
case_sensitive = false

[fields.bio]
type = "text"

[fields.age]
type = "integer"

[fields.tags]
type = "string"

[fields.attrs]
type = "integer"

[fields.balance]
type = "bigint"
digits = 10

[fields.ip]
type = "inet"
"#;

const TABLE: &str = r#"
partition_key = [{ name = "id", type = "int" }]
columns = [
    { name = "name", type = "text" },
    { name = "bio", type = "text" },
    { name = "age", type = "int" },
    { name = "tags", type = "set<text>" },
    { name = "attrs", type = "map<text, int>" },
    { name = "balance", type = "varint" },
    { name = "ip", type = "inet" },
]
"#;

fn schema() -> Schema {
    let raw = parse_schema_str(SCHEMA, ConfigFormat::Toml, Path::new("schema.toml")).unwrap();
    Schema::from_config(&raw).unwrap()
}

fn metadata() -> RowMetadata {
    parse_table_str(TABLE, ConfigFormat::Toml, Path::new("table.toml"))
        .unwrap()
        .to_metadata()
        .unwrap()
}

/// Three people: ann and cid write about databases, bob and cid about gardens.
fn populated() -> RowIndex {
    let meta = metadata();
    let mut index = RowIndex::create_in_ram(schema(), meta.clone()).unwrap();

    let ann = RowBuilder::new(&meta)
        .partition_key(&[Value::Int(1)])
        .unwrap()
        .cell("name", &Value::from("Ann"))
        .unwrap()
        .cell("bio", &Value::from("Ann writes fast databases"))
        .unwrap()
        .cell("age", &Value::Int(42))
        .unwrap()
        .set_element("tags", &Value::from("rust"))
        .unwrap()
        .set_element("tags", &Value::from("db"))
        .unwrap()
        .map_entry("attrs", &Value::from("height"), &Value::Int(180))
        .unwrap()
        .map_entry("attrs", &Value::from("weight"), &Value::Int(75))
        .unwrap()
        .cell("balance", &Value::Varint(BigInt::from(100)))
        .unwrap()
        .cell("ip", &Value::Inet("10.0.0.1".parse().unwrap()))
        .unwrap()
        .build()
        .unwrap();

    let bob = RowBuilder::new(&meta)
        .partition_key(&[Value::Int(2)])
        .unwrap()
        .cell("name", &Value::from("Bob"))
        .unwrap()
        .cell("bio", &Value::from("Bob likes quiet gardens"))
        .unwrap()
        .cell("age", &Value::Int(35))
        .unwrap()
        .set_element("tags", &Value::from("garden"))
        .unwrap()
        .map_entry("attrs", &Value::from("height"), &Value::Int(170))
        .unwrap()
        .cell("balance", &Value::Varint(BigInt::from(-5)))
        .unwrap()
        .cell("ip", &Value::Inet("10.0.0.2".parse().unwrap()))
        .unwrap()
        .build()
        .unwrap();

    let cid = RowBuilder::new(&meta)
        .partition_key(&[Value::Int(3)])
        .unwrap()
        .cell("name", &Value::from("Cid"))
        .unwrap()
        .cell("bio", &Value::from("Cid writes about gardens and databases"))
        .unwrap()
        .cell("age", &Value::Int(51))
        .unwrap()
        .set_element("tags", &Value::from("rust"))
        .unwrap()
        .build()
        .unwrap();

    for row in [&ann, &bob, &cid] {
        index.index_row(row).unwrap();
    }
    index.commit().unwrap();
    index
}

fn names(hits: &[SearchHit]) -> Vec<String> {
    hits.iter().map(|hit| hit.fields["name"][0].clone()).collect()
}

fn matching(index: &RowIndex, condition: Condition) -> BTreeSet<String> {
    let search = Search {
        filter: Some(condition),
        ..Search::default()
    };
    names(&index.search(&search, 10).unwrap())
        .into_iter()
        .collect()
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn range_compiles_to_open_ended_integer_range() {
    let schema = schema();
    let condition = Condition::Range {
        field: "age".into(),
        lower: Some(Value::Int(42)),
        upper: None,
        include_lower: true,
        include_upper: false,
        boost: 1.0,
    };
    assert_eq!(
        QueryCompiler::new(&schema).compile(&condition).unwrap(),
        CompiledQuery {
            kind: QueryKind::Range {
                field: "age".into(),
                lower: Bound::Included(IndexValue::Integer(42)),
                upper: Bound::Unbounded,
            },
            boost: 1.0,
        }
    );

    let index = populated();
    assert_eq!(matching(&index, condition), set(&["ann", "cid"]));
}

#[test]
fn nested_boosts_stay_on_their_nodes() {
    let schema = schema();
    let condition = Condition::boolean()
        .must(Condition::matching("name", "ann").with_boost(2.0))
        .with_boost(0.5);
    let compiled = QueryCompiler::new(&schema).compile(&condition).unwrap();
    assert_eq!(compiled.boost, 0.5);
    let QueryKind::Boolean { must, .. } = compiled.kind else {
        panic!("expected a boolean query");
    };
    assert_eq!(must[0].boost, 2.0);
}

#[test]
fn collection_entries_match_their_column() {
    let index = populated();
    assert_eq!(
        matching(&index, Condition::matching("tags", "rust")),
        set(&["ann", "cid"])
    );
    assert_eq!(
        matching(&index, Condition::matching("attrs.height", 180)),
        set(&["ann"])
    );
    assert_eq!(
        matching(&index, Condition::matching("attrs", 75)),
        set(&["ann"])
    );
}

#[test]
fn map_entries_only_match_their_own_key() {
    let index = populated();
    assert!(matching(&index, Condition::matching("attrs.weight", 180)).is_empty());
    assert!(matching(&index, Condition::matching("attrs.height", 75)).is_empty());
    assert_eq!(
        matching(&index, Condition::matching("attrs.weight", 75)),
        set(&["ann"])
    );
    assert!(matching(&index, Condition::matching("attrs.depth", 180)).is_empty());
}

#[test]
fn map_entry_ranges_stay_within_their_key() {
    let index = populated();
    let tall = Condition::range("attrs.height", Some(Value::Int(100)), None);
    assert_eq!(matching(&index, tall), set(&["ann", "bob"]));

    let light = Condition::range("attrs.weight", None, Some(Value::Int(100)));
    assert_eq!(matching(&index, light), set(&["ann"]));

    let between = Condition::range("attrs.height", Some(Value::Int(171)), Some(Value::Int(200)));
    assert_eq!(matching(&index, between), set(&["ann"]));

    let negative = Condition::range("attrs.height", None, Some(Value::Int(0)));
    assert!(matching(&index, negative).is_empty());
}

#[test]
fn text_conditions_use_the_analyzer() {
    let index = populated();
    assert_eq!(
        matching(&index, Condition::matching("bio", "Gardens")),
        set(&["bob", "cid"])
    );
    assert_eq!(
        matching(&index, Condition::phrase("bio", ["writes fast"])),
        set(&["ann"])
    );
    assert_eq!(
        matching(&index, Condition::raw(None, "quiet")),
        set(&["bob"])
    );
}

#[test]
fn pattern_conditions() {
    let index = populated();
    assert_eq!(matching(&index, Condition::prefix("name", "A")), set(&["ann"]));
    assert_eq!(
        matching(&index, Condition::wildcard("ip", "10.0.0.*")),
        set(&["ann", "bob"])
    );
    assert_eq!(
        matching(&index, Condition::fuzzy("name", "bop")),
        set(&["bob"])
    );
}

#[test]
fn must_not_alone_excludes_from_everything() {
    let index = populated();
    let condition = Condition::boolean().must_not(Condition::matching("tags", "rust"));
    assert_eq!(matching(&index, condition), set(&["bob"]));
}

#[test]
fn bigint_range_orders_signed_values() {
    let index = populated();
    let positive = Condition::range("balance", Some(Value::Int(0)), None);
    assert_eq!(matching(&index, positive), set(&["ann"]));
    let negative = Condition::range("balance", None, Some(Value::Int(0)));
    assert_eq!(matching(&index, negative), set(&["bob"]));
}

#[test]
fn sort_orders_before_relevance() {
    let index = populated();
    let search = Search {
        query: Some(Condition::matching("tags", "rust")),
        filter: None,
        sort: Some(vec![SortField::desc("age")]),
    };
    assert_eq!(names(&index.search(&search, 10).unwrap()), vec!["cid", "ann"]);

    let search = Search {
        sort: Some(vec![SortField::asc("age")]),
        ..Search::default()
    };
    assert_eq!(names(&index.search(&search, 2).unwrap()), vec!["bob", "ann"]);
}

#[test]
fn boosts_drive_relevance() {
    let index = populated();
    let search = Search {
        query: Some(
            Condition::boolean()
                .should(Condition::matching("name", "ann"))
                .should(Condition::matching("name", "bob").with_boost(5.0)),
        ),
        ..Search::default()
    };
    let hits = index.search(&search, 10).unwrap();
    assert_eq!(names(&hits), vec!["bob", "ann"]);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn searches_parse_from_json() {
    let index = populated();
    let search = Search::parse(
        r#"{
            "query": {"type": "match", "field": "bio", "value": "databases"},
            "filter": {"type": "range", "field": "age", "lower": 45},
            "sort": [{"field": "name"}]
        }"#,
    )
    .unwrap();
    assert!(search.validate(index.schema()).is_ok());
    assert_eq!(names(&index.search(&search, 10).unwrap()), vec!["cid"]);
}

#[test]
fn invalid_searches_fail_before_execution() {
    let index = populated();
    let unknown = Search {
        query: Some(Condition::matching("nickname", "x")),
        ..Search::default()
    };
    assert!(matches!(
        index.search(&unknown, 10),
        Err(IndexError::SchemaMismatch { .. })
    ));

    let prefix_on_number = Search {
        filter: Some(Condition::prefix("age", "4")),
        ..Search::default()
    };
    assert!(matches!(
        prefix_on_number.validate(index.schema()),
        Err(IndexError::UnsupportedOperation { .. })
    ));
}

#[test]
fn missing_cells_add_no_values() {
    let index = populated();
    let search = Search {
        filter: Some(Condition::matching("name", "cid")),
        ..Search::default()
    };
    let hits = index.search(&search, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(!hits[0].fields.contains_key("balance"));
    assert!(!hits[0].fields.contains_key("ip"));
    assert_eq!(hits[0].row_key, "00000003");
}
