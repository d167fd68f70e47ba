//! アップロードされたデータのクリーニングとカラム分類
//!
//! 処理順序は固定: 重複除去 → 日付解析 → 欠損値処理 → 不正行の除外 → カラム分類。
//! 不正行の除外は欠損値処理の後に行うため、0 で補完された `price` は残り、
//! 0 で補完された `quantity` は除外される。

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::application::stats;
use crate::domain::entity::{
    CleanedTable, CleaningConfig, CleaningReport, CleaningWarning, ColumnClassification,
    DataType, Dataset, MissingValueStrategy, PreparedDataset, RawTable, Row, Table, Value,
};

const STEP_DATE_PARSING: &str = "date parsing";
const STEP_INVALID_FILTER: &str = "invalid-row filtering";

/// 定数補完で文字列カラムに入れる値
pub const UNKNOWN: &str = "Unknown";

/// データセットの前処理を行う
#[derive(Debug, Clone, Default)]
pub struct DatasetPreparer {
    config: CleaningConfig,
}

impl DatasetPreparer {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// RawTable からクリーニング済みデータ・分類・レポートを作る。RawTable は変更しない
    pub fn prepare(&self, raw: &RawTable) -> PreparedDataset {
        let config = &self.config;
        let mut warnings = Vec::new();
        let initial_row_count = raw.len();

        let dataset = Dataset::clone(raw);

        // 日付の表記ゆれを揃えてから重複を判定する
        let (dataset, unparseable_date_count) = if dataset.has_column(&config.date_column) {
            parse_dates(dataset, &config.date_column)
        } else {
            warnings.push(CleaningWarning::MissingColumn {
                column: config.date_column.clone(),
                step: STEP_DATE_PARSING.to_string(),
            });
            (dataset, 0)
        };

        let (dataset, removed_duplicate_count) = deduplicate(dataset);

        let missing_value_counts_before = dataset.missing_counts();

        let (dataset, removed_missing_count, fill_warnings) = handle_missing(dataset, config.strategy);
        warnings.extend(fill_warnings);

        let (dataset, removed_unfillable_count) = remove_unfillable(dataset);
        let missing_value_counts_after = dataset.missing_counts();

        let (dataset, removed_invalid_count, filter_warnings) =
            filter_invalid(dataset, &config.price_column, &config.quantity_column);
        warnings.extend(filter_warnings);

        let classification = classify_columns(&dataset.schema, &config.identifier_columns);

        for warning in &warnings {
            warn!(table = %raw.schema.name, "{}", warning);
        }

        let report = CleaningReport {
            strategy: config.strategy,
            initial_row_count,
            removed_duplicate_count,
            unparseable_date_count,
            missing_value_counts_before,
            missing_value_counts_after,
            removed_missing_count,
            removed_unfillable_count,
            removed_invalid_count,
            final_row_count: dataset.len(),
            final_column_count: dataset.column_count(),
            warnings,
        };

        info!(
            table = %raw.schema.name,
            strategy = %config.strategy,
            rows = report.final_row_count,
            columns = report.final_column_count,
            duplicates = removed_duplicate_count,
            invalid = removed_invalid_count,
            "dataset prepared"
        );

        PreparedDataset {
            table: CleanedTable::new(dataset),
            classification,
            report,
        }
    }
}

/// 完全一致する行のうち2件目以降を除去する
pub fn deduplicate(dataset: Dataset) -> (Dataset, usize) {
    let Dataset { schema, rows } = dataset;
    let before = rows.len();

    let mut seen = HashSet::new();
    let rows: Vec<Row> = rows.into_iter()
        .filter(|row| seen.insert(row.key(&schema)))
        .collect();

    let removed = before - rows.len();
    debug!(removed, "removed duplicate rows");
    (Dataset::with_rows(schema, rows), removed)
}

/// 日付カラムを日時に変換する。解釈できない値は欠損にする（行は残す）
pub fn parse_dates(dataset: Dataset, column: &str) -> (Dataset, usize) {
    let Dataset { mut schema, mut rows } = dataset;
    let mut failures = 0;

    for row in &mut rows {
        let value = row.value(column);
        if value.is_missing() || value.data_type().is_timestamp() {
            continue;
        }
        let parsed = value.cast_to(DataType::Timestamp).unwrap_or_else(|_| {
            failures += 1;
            Value::Null
        });
        row.set(column, parsed);
    }

    // has_column を確認した上で呼ばれるので失敗しない
    if schema.set_column_type(column, DataType::Timestamp).is_err() {
        debug!(column, "date column not in schema");
    }

    debug!(column, failures, "parsed date column");
    (Dataset::with_rows(schema, rows), failures)
}

/// 選択された方針で欠損値を処理する
///
/// 戻り値は (データ, 欠損のため削除した行数, 警告)。
pub fn handle_missing(
    dataset: Dataset,
    strategy: MissingValueStrategy,
) -> (Dataset, usize, Vec<CleaningWarning>) {
    match strategy {
        MissingValueStrategy::Drop => {
            let (dataset, removed) = remove_unfillable(dataset);
            (dataset, removed, Vec::new())
        },
        MissingValueStrategy::FillCentralTendency | MissingValueStrategy::FillConstant => {
            let (dataset, warnings) = fill_missing(dataset, strategy);
            (dataset, 0, warnings)
        },
    }
}

/// 欠損値を含む行を除去する
pub fn remove_unfillable(dataset: Dataset) -> (Dataset, usize) {
    let Dataset { schema, rows } = dataset;
    let before = rows.len();

    let rows: Vec<Row> = rows.into_iter()
        .filter(|row| schema.columns.iter().all(|c| !row.is_missing(&c.name)))
        .collect();

    let removed = before - rows.len();
    (Dataset::with_rows(schema, rows), removed)
}

fn fill_missing(dataset: Dataset, strategy: MissingValueStrategy) -> (Dataset, Vec<CleaningWarning>) {
    let Dataset { mut schema, mut rows } = dataset;
    let mut warnings = Vec::new();
    let mut fills: Vec<(String, Value)> = Vec::new();

    for column in schema.columns.clone() {
        let name = column.name.as_str();
        if rows.iter().all(|row| !row.is_missing(name)) {
            continue;
        }

        let fill = match strategy {
            MissingValueStrategy::FillCentralTendency => {
                let fill = central_tendency(&mut schema, &mut rows, name, column.data_type);
                if fill.is_none() {
                    warnings.push(CleaningWarning::EmptyFillSource { column: column.name.clone() });
                }
                // 値が一つも無い場合は定数で補完する
                fill.or_else(|| constant_fill(column.data_type))
            },
            _ => constant_fill(column.data_type),
        };

        match fill {
            Some(value) => fills.push((column.name.clone(), value)),
            None => debug!(column = name, "no fill value, rows with missing cells will be removed"),
        }
    }

    for row in &mut rows {
        for (name, value) in &fills {
            if row.is_missing(name) {
                row.set(name.clone(), value.clone());
            }
        }
    }

    (Dataset::with_rows(schema, rows), warnings)
}

/// 数値は中央値、それ以外は最頻値
///
/// 整数カラムの中央値が小数になる場合はカラムを浮動小数点数に昇格する。
fn central_tendency(
    schema: &mut Table,
    rows: &mut [Row],
    column: &str,
    data_type: DataType,
) -> Option<Value> {
    if !data_type.is_numeric() {
        return stats::mode(rows.iter().map(|row| row.value(column)));
    }

    let values: Vec<f64> = rows.iter().filter_map(|row| row.value(column).as_f64()).collect();
    let median = stats::median(&values)?;

    if data_type.is_float() {
        return Some(Value::Float(median));
    }
    if median.fract() == 0.0 {
        return Some(Value::Integer(median as i64));
    }

    debug!(column, median, "promoting integer column to float");
    for row in rows.iter_mut() {
        if let Value::Integer(i) = row.value(column) {
            let promoted = Value::Float(*i as f64);
            row.set(column, promoted);
        }
    }
    if schema.set_column_type(column, DataType::Float).is_err() {
        debug!(column, "column missing from schema");
    }
    Some(Value::Float(median))
}

/// 定数補完の値。日時カラムには補完値が無い
fn constant_fill(data_type: DataType) -> Option<Value> {
    match data_type {
        DataType::Integer => Some(Value::Integer(0)),
        DataType::Float | DataType::Null => Some(Value::Float(0.0)),
        DataType::Text => Some(Value::Text(UNKNOWN.to_string())),
        DataType::Timestamp => None,
    }
}

/// `price < 0` または `quantity <= 0` の行を除外する
///
/// カラムが無い、または数値でない場合はその条件を適用せず警告を返す。
pub fn filter_invalid(
    dataset: Dataset,
    price_column: &str,
    quantity_column: &str,
) -> (Dataset, usize, Vec<CleaningWarning>) {
    let mut warnings = Vec::new();
    let check_price = predicate_applies(&dataset, price_column, &mut warnings);
    let check_quantity = predicate_applies(&dataset, quantity_column, &mut warnings);

    let Dataset { schema, rows } = dataset;
    let before = rows.len();

    let rows: Vec<Row> = rows.into_iter()
        .filter(|row| {
            let price_ok = !check_price
                || row.value(price_column).as_f64().is_some_and(|p| p >= 0.0);
            let quantity_ok = !check_quantity
                || row.value(quantity_column).as_f64().is_some_and(|q| q > 0.0);
            price_ok && quantity_ok
        })
        .collect();

    let removed = before - rows.len();
    debug!(removed, "removed invalid rows");
    (Dataset::with_rows(schema, rows), removed, warnings)
}

fn predicate_applies(dataset: &Dataset, column: &str, warnings: &mut Vec<CleaningWarning>) -> bool {
    match dataset.column_type(column) {
        Some(data_type) if data_type.is_numeric() => true,
        Some(_) => {
            warnings.push(CleaningWarning::NonNumericColumn {
                column: column.to_string(),
                step: STEP_INVALID_FILTER.to_string(),
            });
            false
        },
        None => {
            warnings.push(CleaningWarning::MissingColumn {
                column: column.to_string(),
                step: STEP_INVALID_FILTER.to_string(),
            });
            false
        },
    }
}

/// スキーマの型に基づいてカラムを分類する
pub fn classify_columns(schema: &Table, identifier_columns: &[String]) -> ColumnClassification {
    let mut classification = ColumnClassification::default();

    for column in &schema.columns {
        let name = column.name.clone();
        if identifier_columns.contains(&column.name) {
            classification.identifier.push(name);
        } else if column.data_type.is_numeric() {
            classification.numeric.push(name);
        } else if column.data_type.is_text() {
            classification.categorical.push(name);
        } else if column.data_type.is_timestamp() {
            classification.temporal.push(name);
        }
    }

    classification
}
