use crate::domain::entity::column::Column;
use crate::domain::entity::data_type::DataType;
use crate::domain::entity::value::{Value, ValueKey};
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("Column '{0}' already exists in table")]
    ColumnAlreadyExists(String),

    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),
}

/// データセットのスキーマ（カラム名 -> 型）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    // table name (通常はアップロードされたファイル名)
    pub name: String,

    // table columns
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn add_column(&mut self, column: Column) -> Result<(), TableError> {
        // 同名のカラムが既に存在するかチェック
        if self.get_column(&column.name).is_some() {
            return Err(TableError::ColumnAlreadyExists(column.name));
        }

        self.columns.push(column);
        Ok(())
    }

    /// ビルダーパターンでカラムを追加する
    pub fn with_column(mut self, column: Column) -> Result<Self, TableError> {
        self.add_column(column)?;
        Ok(self)
    }

    /// 名前でカラムを検索する
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// カラムの型を変更する
    pub fn set_column_type(&mut self, name: &str, data_type: DataType) -> Result<(), TableError> {
        let column = self.columns.iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        column.data_type = data_type;
        Ok(())
    }

    /// テーブルのカラム名のリストを取得する
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// 1行のデータを表現する
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// カラム名と値のマッピング
    pub values: HashMap<String, Value>,
}

static NULL: Value = Value::Null;

impl Row {
    /// 新しい空の行を作成する
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// カラム名と値のペアから新しい行を作成する
    pub fn from_values(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    /// 値を取得する。カラムが無い場合は欠損値として扱う
    pub fn value(&self, column_name: &str) -> &Value {
        self.values.get(column_name).unwrap_or(&NULL)
    }

    /// 特定のカラムの値を設定する
    pub fn set(&mut self, column_name: impl Into<String>, value: Value) {
        self.values.insert(column_name.into(), value);
    }

    pub fn is_missing(&self, column_name: &str) -> bool {
        self.value(column_name).is_missing()
    }

    /// スキーマ順に並べた完全一致キー
    pub fn key(&self, schema: &Table) -> Vec<ValueKey> {
        schema.columns.iter().map(|c| self.value(&c.name).key()).collect()
    }
}

impl Default for Row {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_values(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// スキーマと行の集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    // データセットのスキーマ
    pub schema: Table,

    // 行（元の順序を保持）
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(schema: Table) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(schema: Table, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    //行数を取得する
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    // データセットが空かどうか
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.schema.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.get_column(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<DataType> {
        self.schema.get_column(name).map(|c| c.data_type)
    }

    /// 特定カラムの値を行順に走査する
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |row| row.value(name))
    }

    /// カラムの数値を行順に取り出す（欠損は除外）
    pub fn numeric_values(&self, name: &str) -> Vec<f64> {
        self.column_values(name).filter_map(Value::as_f64).collect()
    }

    /// カラムごとの欠損値数（スキーマ順）
    pub fn missing_counts(&self) -> Vec<ColumnCount> {
        self.schema.columns.iter()
            .map(|c| ColumnCount {
                column: c.name.clone(),
                count: self.column_values(&c.name).filter(|v| v.is_missing()).count(),
            })
            .collect()
    }

    /// 先頭n行
    pub fn head(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// カラム名と件数の組
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCount {
    pub column: String,
    pub count: usize,
}

/// アップロードされたままのデータ。作成後は変更しない
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Deref)]
pub struct RawTable(Dataset);

impl RawTable {
    pub fn new(dataset: Dataset) -> Self {
        Self(dataset)
    }
}

/// クリーニング済みのデータ。作成後は変更しない
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Deref)]
pub struct CleanedTable(Dataset);

impl CleanedTable {
    pub fn new(dataset: Dataset) -> Self {
        Self(dataset)
    }
}
