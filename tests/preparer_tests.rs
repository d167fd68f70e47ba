use ordereda::application::preparer::deduplicate;
use ordereda::application::DatasetPreparer;
use ordereda::domain::entity::{
    CleaningConfig, CleaningWarning, Column, DataType, Dataset, MissingValueStrategy, RawTable,
    Row, Table, Value,
};
use ordereda::infrastructure::parser::DelimitedParser;
use ordereda::prepare_delimited;
use proptest::prelude::*;
use test_case::test_case;

const ORDERS: &str = "\
order_id,customer_id,product_id,order_date,price,quantity,category
1,C1,P1,2024-01-01,10.0,2,Books
1,C1,P1,2024-01-01,10.0,2,Books
2,C2,P2,2024-01-01,-5.0,1,Toys
3,C3,P3,2024-01-02,7.5,,Toys
4,C4,P4,garbage,12.0,1,
5,C5,P5,2024-01-03,,3,Books
6,C6,P6,2024-01-03,20.0,0,Games
";

fn prepare(csv: &str, strategy: MissingValueStrategy) -> ordereda::domain::entity::PreparedDataset {
    prepare_delimited("orders", csv.as_bytes(), &DelimitedParser::default(), CleaningConfig::with_strategy(strategy))
        .expect("fixture should parse")
}

#[test]
fn drop_strategy_reports_each_step() {
    let prepared = prepare(ORDERS, MissingValueStrategy::Drop);
    let report = &prepared.report;

    assert_eq!(report.initial_row_count, 7);
    assert_eq!(report.removed_duplicate_count, 1);
    assert_eq!(report.unparseable_date_count, 1);
    // 数量欠損・日付不正・カテゴリ欠損（同じ行）・価格欠損
    assert_eq!(report.removed_missing_count, 3);
    // 価格が負の行と数量0の行
    assert_eq!(report.removed_invalid_count, 2);
    assert_eq!(report.final_row_count, 1);
    assert_eq!(report.shape(), (1, 7));
    assert!(report.warnings.is_empty());
    assert!(report.missing_value_counts_after.iter().all(|c| c.count == 0));
}

#[test]
fn missing_counts_before_are_taken_after_date_parsing() {
    let prepared = prepare(ORDERS, MissingValueStrategy::Drop);
    let before: Vec<(String, usize)> = prepared.report.missing_value_counts_before
        .iter()
        .map(|c| (c.column.clone(), c.count))
        .collect();
    assert!(before.contains(&("order_date".to_string(), 1)));
    assert!(before.contains(&("price".to_string(), 1)));
    assert!(before.contains(&("quantity".to_string(), 1)));
    assert!(before.contains(&("category".to_string(), 1)));
}

#[test]
fn constant_fill_keeps_zero_price_but_drops_zero_quantity() {
    let csv = "\
order_id,order_date,price,quantity,category
1,2024-01-01,,2,Books
2,2024-01-01,5.0,,Toys
3,2024-01-02,4.0,1,
";
    let prepared = prepare(csv, MissingValueStrategy::FillConstant);
    let table = &prepared.table;

    let ids: Vec<&Value> = table.column_values("order_id").collect();
    assert_eq!(ids, vec![&Value::Integer(1), &Value::Integer(3)]);
    assert_eq!(table.rows[0].value("price"), &Value::Float(0.0));
    assert_eq!(table.rows[1].value("category"), &Value::from("Unknown"));
    assert_eq!(prepared.report.removed_invalid_count, 1);
}

#[test]
fn central_tendency_fill_uses_median_and_mode() {
    let csv = "\
order_id,price,quantity,category
1,1,1,Books
2,2,1,Toys
3,,1,
4,4,1,Toys
";
    let prepared = prepare(csv, MissingValueStrategy::FillCentralTendency);
    let row = &prepared.table.rows[2];
    assert_eq!(row.value("price"), &Value::Integer(2));
    assert_eq!(row.value("category"), &Value::from("Toys"));
}

#[test]
fn constant_fill_excludes_rows_without_a_valid_date() {
    let csv = "\
order_date,price,quantity
2024-01-01,1,1
not-a-date,2,1
";
    let prepared = prepare(csv, MissingValueStrategy::FillConstant);
    assert_eq!(prepared.report.unparseable_date_count, 1);
    assert_eq!(prepared.report.removed_unfillable_count, 1);
    assert_eq!(prepared.table.len(), 1);
}

#[test]
fn central_tendency_fills_unparseable_date_with_most_common_date() {
    let csv = "\
order_date,price,quantity
2024-01-02,1,1
2024-01-02,2,1
2024-01-01,3,1
someday,4,1
";
    let prepared = prepare(csv, MissingValueStrategy::FillCentralTendency);
    assert_eq!(prepared.table.len(), 4);
    assert_eq!(prepared.table.rows[3].value("order_date"), prepared.table.rows[0].value("order_date"));
}

#[test_case("2024-01-01", "2024-01-01 00:00:00" ; "same day spelled differently")]
#[test_case("2024-01-01", "2024/01/01" ; "different separators")]
fn dates_are_normalised_before_deduplication(first: &str, second: &str) {
    let csv = format!("order_id,order_date,price,quantity\n1,{},10,1\n1,{},10,1\n", first, second);
    let prepared = prepare(&csv, MissingValueStrategy::Drop);
    assert_eq!(prepared.report.removed_duplicate_count, 1);
    assert_eq!(prepared.table.len(), 1);
}

#[test]
fn unparseable_dates_collapse_into_one_row() {
    let csv = "order_id,order_date,price,quantity\n1,someday,10,1\n1,never,10,1\n";
    let prepared = prepare(csv, MissingValueStrategy::FillCentralTendency);
    assert_eq!(prepared.report.unparseable_date_count, 2);
    assert_eq!(prepared.report.removed_duplicate_count, 1);
}

#[test_case("price,quantity\n1,1\n", "order_date" ; "without dates")]
#[test_case("order_date,quantity\n2024-01-01,1\n", "price" ; "without price")]
#[test_case("order_date,price\n2024-01-01,1\n", "quantity" ; "without quantity")]
fn absent_columns_are_warnings(csv: &str, column: &str) {
    let prepared = prepare(csv, MissingValueStrategy::Drop);
    assert_eq!(prepared.table.len(), 1);
    assert!(prepared.report.warnings.iter().any(|w| matches!(
        w,
        CleaningWarning::MissingColumn { column: c, .. } if c == column
    )));
}

#[test]
fn classification_follows_schema() {
    let prepared = prepare("order_id,price,category\n1,9.99,Books\n", MissingValueStrategy::Drop);
    let classification = &prepared.classification;
    assert_eq!(classification.identifier, vec!["order_id"]);
    assert_eq!(classification.numeric, vec!["price"]);
    assert_eq!(classification.categorical, vec!["category"]);
}

#[test]
fn raw_table_is_not_mutated() {
    let raw = DelimitedParser::default().parse("orders", ORDERS.as_bytes()).unwrap();
    let snapshot = raw.clone();
    for strategy in [MissingValueStrategy::Drop, MissingValueStrategy::FillConstant] {
        DatasetPreparer::new(CleaningConfig::with_strategy(strategy)).prepare(&raw);
    }
    assert_eq!(raw, snapshot);
}

fn order_schema() -> Table {
    Table::new("generated")
        .with_column(Column::new("category", DataType::Text)).unwrap()
        .with_column(Column::new("price", DataType::Float)).unwrap()
        .with_column(Column::new("quantity", DataType::Integer)).unwrap()
}

fn cell<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}

prop_compose! {
    fn arb_row()(
        category in proptest::option::of(prop_oneof![Just("A"), Just("B"), Just("C")]),
        price in proptest::option::of(-5i64..50),
        quantity in proptest::option::of(-2i64..5),
    ) -> Row {
        let mut row = Row::new();
        row.set("category", cell(category));
        row.set("price", cell(price.map(|p| p as f64)));
        row.set("quantity", cell(quantity));
        row
    }
}

fn arb_strategy() -> impl Strategy<Value = MissingValueStrategy> {
    prop_oneof![
        Just(MissingValueStrategy::Drop),
        Just(MissingValueStrategy::FillCentralTendency),
        Just(MissingValueStrategy::FillConstant),
    ]
}

proptest! {
    #[test]
    fn cleaning_never_adds_rows(rows in proptest::collection::vec(arb_row(), 0..40), strategy in arb_strategy()) {
        let raw = RawTable::new(Dataset::with_rows(order_schema(), rows));
        let prepared = DatasetPreparer::new(CleaningConfig::with_strategy(strategy)).prepare(&raw);
        prop_assert!(prepared.table.len() <= raw.len());
    }

    #[test]
    fn cleaned_rows_satisfy_price_and_quantity_rules(rows in proptest::collection::vec(arb_row(), 0..40), strategy in arb_strategy()) {
        let raw = RawTable::new(Dataset::with_rows(order_schema(), rows));
        let prepared = DatasetPreparer::new(CleaningConfig::with_strategy(strategy)).prepare(&raw);
        for row in &prepared.table.rows {
            prop_assert!(row.value("price").as_f64().unwrap() >= 0.0);
            prop_assert!(row.value("quantity").as_f64().unwrap() > 0.0);
            prop_assert!(prepared.table.schema.columns.iter().all(|c| !row.is_missing(&c.name)));
        }
    }

    #[test]
    fn deduplication_is_idempotent(rows in proptest::collection::vec(arb_row(), 0..40)) {
        let (once, _) = deduplicate(Dataset::with_rows(order_schema(), rows));
        let (twice, removed) = deduplicate(once.clone());
        prop_assert_eq!(removed, 0);
        prop_assert_eq!(twice, once);
    }
}
