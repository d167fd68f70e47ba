use crate::domain::entity::table::{CleanedTable, ColumnCount};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};
use typed_builder::TypedBuilder;

/// 識別子として扱うカラム
pub const IDENTIFIER_COLUMNS: [&str; 3] = ["order_id", "customer_id", "product_id"];
pub const ORDER_DATE: &str = "order_date";
pub const PRICE: &str = "price";
pub const QUANTITY: &str = "quantity";
pub const CATEGORY: &str = "category";

/// 欠損値の処理方針。テーブル全体に一つだけ適用する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueStrategy {
    /// 欠損を含む行を削除する
    #[strum(serialize = "drop")]
    #[display(fmt = "drop")]
    Drop,

    /// 数値は中央値、それ以外は最頻値で補完する
    #[strum(serialize = "fill_central_tendency")]
    #[display(fmt = "fill_central_tendency")]
    FillCentralTendency,

    /// 数値は0、文字列は "Unknown" で補完する
    #[strum(serialize = "fill_constant")]
    #[display(fmt = "fill_constant")]
    FillConstant,
}

impl Default for MissingValueStrategy {
    fn default() -> Self {
        MissingValueStrategy::Drop
    }
}

/// クリーニング処理の設定（セッションごとに明示的に渡す）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct CleaningConfig {
    #[builder(default)]
    pub strategy: MissingValueStrategy,

    #[builder(default = IDENTIFIER_COLUMNS.iter().map(|c| c.to_string()).collect())]
    pub identifier_columns: Vec<String>,

    #[builder(default = ORDER_DATE.to_string(), setter(into))]
    pub date_column: String,

    #[builder(default = PRICE.to_string(), setter(into))]
    pub price_column: String,

    #[builder(default = QUANTITY.to_string(), setter(into))]
    pub quantity_column: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CleaningConfig {
    pub fn with_strategy(strategy: MissingValueStrategy) -> Self {
        Self::builder().strategy(strategy).build()
    }
}

/// クリーニング中に発生した警告（処理は中断しない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleaningWarning {
    #[display(fmt = "column '{}' not found, {} skipped", column, step)]
    MissingColumn { column: String, step: String },

    #[display(fmt = "column '{}' is not numeric, {} skipped", column, step)]
    NonNumericColumn { column: String, step: String },

    #[display(fmt = "column '{}' has no values to derive a fill value from", column)]
    EmptyFillSource { column: String },
}

/// カラムの分類結果（互いに素）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnClassification {
    pub identifier: Vec<String>,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub temporal: Vec<String>,
}

impl ColumnClassification {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical.iter().any(|c| c == column)
    }
}

/// クリーニング結果のレポート
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub strategy: MissingValueStrategy,
    pub initial_row_count: usize,
    pub removed_duplicate_count: usize,
    pub unparseable_date_count: usize,
    pub missing_value_counts_before: Vec<ColumnCount>,
    pub missing_value_counts_after: Vec<ColumnCount>,
    pub removed_missing_count: usize,
    pub removed_unfillable_count: usize,
    pub removed_invalid_count: usize,
    pub final_row_count: usize,
    pub final_column_count: usize,
    pub warnings: Vec<CleaningWarning>,
}

impl CleaningReport {
    /// 整形後のデータの形 (行数, 列数)
    pub fn shape(&self) -> (usize, usize) {
        (self.final_row_count, self.final_column_count)
    }
}

/// 前処理の成果物一式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedDataset {
    pub table: CleanedTable,
    pub classification: ColumnClassification,
    pub report: CleaningReport,
}
