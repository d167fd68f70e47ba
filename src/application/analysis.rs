//! 可視化の元になる集計
//!
//! どの関数もクリーニング済みデータと分類を読むだけで変更しない。
//! 表示できるものが無い場合は `AnalysisError::NothingToDisplay` を返し、他のビューには影響しない。

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::application::stats::{self, HistogramBin};
use crate::domain::entity::cleaning::{CATEGORY, ORDER_DATE, PRICE};
use crate::domain::entity::{CleanedTable, ColumnClassification, PreparedDataset, Row, Value};

/// 離散表示に切り替える異なり数のしきい値
pub const DISCRETE_THRESHOLD: usize = 10;

/// 集計エラー
#[derive(Error, Debug, PartialEq)]
pub enum AnalysisError {
    #[error("Nothing to display: {0}")]
    NothingToDisplay(String),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Column '{0}' is not categorical")]
    NotCategorical(String),

    #[error("Column '{0}' is not a date column")]
    NotTemporal(String),

    #[error("Required columns missing: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// 値ごとの件数（数値カラム）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericCount {
    pub value: f64,
    pub count: usize,
}

/// 数値カラムの要約統計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// 単変量ビュー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnivariateView {
    /// 異なり数が少ない場合の件数表示
    Discrete { column: String, counts: Vec<NumericCount> },

    /// 分布（ヒストグラム）表示
    Distribution { column: String, bins: Vec<HistogramBin>, summary: Summary },
}

/// カテゴリごとの件数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalView {
    pub column: String,
    pub counts: Vec<CategoryCount>,
}

/// 箱ひげ図の要約
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSummary {
    pub category: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BivariateView {
    pub category_column: String,
    pub value_column: String,
    pub groups: Vec<BoxSummary>,
}

/// 日次の四本値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesView {
    pub candles: Vec<Candle>,
}

/// 相関行列。定義できない係数は None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

/// クリーニング済みデータに対する読み取り専用の集計
#[derive(Debug, Clone, Copy)]
pub struct Analysis<'a> {
    table: &'a CleanedTable,
    classification: &'a ColumnClassification,
}

impl<'a> Analysis<'a> {
    pub fn new(table: &'a CleanedTable, classification: &'a ColumnClassification) -> Self {
        Self { table, classification }
    }

    pub fn of(prepared: &'a PreparedDataset) -> Self {
        Self::new(&prepared.table, &prepared.classification)
    }

    fn ensure_rows(&self) -> Result<(), AnalysisError> {
        if self.table.is_empty() {
            return Err(AnalysisError::NothingToDisplay("no rows left after cleaning".to_string()));
        }
        Ok(())
    }

    fn ensure_numeric(&self, column: &str) -> Result<(), AnalysisError> {
        if !self.table.has_column(column) {
            return Err(AnalysisError::ColumnNotFound(column.to_string()));
        }
        if !self.classification.is_numeric(column) {
            return Err(AnalysisError::NotNumeric(column.to_string()));
        }
        Ok(())
    }

    /// 数値カラムの分布。異なり数が10未満なら値ごとの件数、そうでなければヒストグラム
    pub fn univariate(&self, column: &str) -> Result<UnivariateView, AnalysisError> {
        if self.classification.numeric.is_empty() {
            return Err(AnalysisError::NothingToDisplay("no numeric columns".to_string()));
        }
        self.ensure_numeric(column)?;
        self.ensure_rows()?;

        // 無限大は分布として表示できないので除く
        let values: Vec<f64> = self.table.numeric_values(column)
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return Err(AnalysisError::NothingToDisplay(format!("no finite values in {}", column)));
        }
        let distinct = values.iter().map(|v| Value::Float(*v).key()).unique().count();

        if distinct < DISCRETE_THRESHOLD {
            let counts = values.iter()
                .copied()
                .sorted_by(f64::total_cmp)
                .dedup_with_count()
                .map(|(count, value)| NumericCount { value, count })
                .collect();
            return Ok(UnivariateView::Discrete { column: column.to_string(), counts });
        }

        let (min, max) = values.iter()
            .copied()
            .minmax_by(f64::total_cmp)
            .into_option()
            .ok_or_else(|| AnalysisError::NothingToDisplay(column.to_string()))?;
        let summary = Summary {
            count: values.len(),
            mean: stats::mean(&values).unwrap_or_default(),
            std: stats::std_dev(&values),
            min,
            max,
        };

        let bins = stats::histogram(&values);
        if bins.is_empty() {
            return Err(AnalysisError::NothingToDisplay(format!("range of {} is too wide", column)));
        }

        Ok(UnivariateView::Distribution {
            column: column.to_string(),
            bins,
            summary,
        })
    }

    /// カテゴリカラムの件数（件数の降順、同数は出現順）
    pub fn categorical(&self, column: &str) -> Result<CategoricalView, AnalysisError> {
        if self.classification.categorical.is_empty() {
            return Err(AnalysisError::NothingToDisplay("no categorical columns".to_string()));
        }
        if !self.table.has_column(column) {
            return Err(AnalysisError::ColumnNotFound(column.to_string()));
        }
        if !self.classification.is_categorical(column) {
            return Err(AnalysisError::NotCategorical(column.to_string()));
        }
        self.ensure_rows()?;

        let counts = count_in_order(self.table.column_values(column).map(Value::to_string))
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .map(|(value, count)| CategoryCount { value, count })
            .collect();

        Ok(CategoricalView { column: column.to_string(), counts })
    }

    /// カテゴリ別の価格分布（箱ひげ図の要約）
    pub fn bivariate(&self) -> Result<BivariateView, AnalysisError> {
        self.require_columns(&[CATEGORY, PRICE])?;
        self.ensure_numeric(PRICE)?;
        self.ensure_rows()?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
        for row in &self.table.rows {
            let Some(price) = row.value(PRICE).as_f64() else { continue };
            let category = row.value(CATEGORY).to_string();
            groups.entry(category.clone())
                .or_insert_with(|| {
                    order.push(category);
                    Vec::new()
                })
                .push(price);
        }

        let groups = order.into_iter()
            .filter_map(|category| {
                let sorted = stats::sorted(groups.get(&category)?);
                Some(BoxSummary {
                    count: sorted.len(),
                    min: *sorted.first()?,
                    q1: stats::quantile_sorted(&sorted, 0.25),
                    median: stats::quantile_sorted(&sorted, 0.5),
                    q3: stats::quantile_sorted(&sorted, 0.75),
                    max: *sorted.last()?,
                    category,
                })
            })
            .collect();

        Ok(BivariateView {
            category_column: CATEGORY.to_string(),
            value_column: PRICE.to_string(),
            groups,
        })
    }

    /// 日付ごとの四本値（始値・高値・安値・終値は元の行順で決める）
    pub fn time_series(&self) -> Result<TimeSeriesView, AnalysisError> {
        self.require_columns(&[ORDER_DATE, PRICE])?;
        if !self.classification.temporal.iter().any(|c| c == ORDER_DATE) {
            return Err(AnalysisError::NotTemporal(ORDER_DATE.to_string()));
        }
        self.ensure_numeric(PRICE)?;
        self.ensure_rows()?;

        let mut days: BTreeMap<NaiveDate, Candle> = BTreeMap::new();
        for row in &self.table.rows {
            let (Some(timestamp), Some(price)) =
                (row.value(ORDER_DATE).as_timestamp(), row.value(PRICE).as_f64())
            else {
                continue;
            };
            let date = timestamp.date();
            days.entry(date)
                .and_modify(|candle| {
                    candle.high = candle.high.max(price);
                    candle.low = candle.low.min(price);
                    candle.close = price;
                })
                .or_insert(Candle { date, open: price, high: price, low: price, close: price });
        }

        Ok(TimeSeriesView { candles: days.into_values().collect() })
    }

    /// 数値カラム間のピアソン相関行列
    pub fn correlation(&self) -> Result<CorrelationMatrix, AnalysisError> {
        let columns = self.classification.numeric.clone();
        if columns.is_empty() {
            return Err(AnalysisError::NothingToDisplay("no numeric columns for correlation".to_string()));
        }
        self.ensure_rows()?;

        let series: Vec<Vec<f64>> = columns.iter()
            .map(|c| self.table.column_values(c).map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
            .collect();

        let values = series.iter()
            .map(|xs| series.iter().map(|ys| pairwise_pearson(xs, ys)).collect())
            .collect();

        Ok(CorrelationMatrix { columns, values })
    }

    /// 先頭 n 行
    pub fn preview(&self, limit: usize) -> Vec<&'a Row> {
        self.table.head(limit).iter().collect()
    }

    fn require_columns(&self, columns: &[&str]) -> Result<(), AnalysisError> {
        let missing: Vec<String> = columns.iter()
            .filter(|c| !self.table.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::MissingColumns(missing))
        }
    }
}

/// 両方の値がそろっている行だけで相関を計算する
fn pairwise_pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = xs.iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .unzip();
    stats::pearson(&xs, &ys)
}

/// 出現順を保ったまま件数を数える
fn count_in_order(values: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        match index.get(&value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }
    counts
}
