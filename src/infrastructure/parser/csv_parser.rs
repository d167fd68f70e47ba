use csv::ReaderBuilder;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::domain::entity::{Column, DataType, Dataset, RawTable, Row, Table, TableError, Value};

/// 区切り文字ファイル解析エラー
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Input is empty or has no header row")]
    Empty,

    #[error("Malformed delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid header: {0}")]
    Schema(#[from] TableError),

    #[error("Row at line {line} has {found} fields, expected at most {expected}")]
    RaggedRow { line: u64, expected: usize, found: usize },
}

/// 欠損値として扱うトークン
pub const DEFAULT_MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

/// 区切り文字の候補（自動判定用）
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// パーサーの設定
#[derive(Debug, Clone, TypedBuilder)]
pub struct ParserConfig {
    /// 区切り文字。None の場合はヘッダ行から推定する
    #[builder(default, setter(strip_option))]
    pub delimiter: Option<u8>,

    #[builder(default = DEFAULT_MISSING_TOKENS.iter().map(|t| t.to_string()).collect())]
    pub missing_tokens: Vec<String>,

    /// 宣言済みのカラム型。推論より優先される
    #[builder(default)]
    pub declared_types: HashMap<String, DataType>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// 区切り文字ファイルのパーサー
#[derive(Debug, Clone, Default)]
pub struct DelimitedParser {
    config: ParserConfig,
}

impl DelimitedParser {
    /// 新しいパーサーを作成する
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// 入力を解析して RawTable を作る
    pub fn parse(&self, name: &str, input: &[u8]) -> Result<RawTable, ParseError> {
        let delimiter = self.config.delimiter.unwrap_or_else(|| sniff_delimiter(input));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(input);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(ParseError::Empty);
        }

        // カラムごとに生の文字列を集める
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(ParseError::RaggedRow {
                    line: record.position().map_or(0, |p| p.line()),
                    expected: headers.len(),
                    found: record.len(),
                });
            }

            for (i, column) in cells.iter_mut().enumerate() {
                // 足りないフィールドは欠損で埋める
                let cell = record.get(i).filter(|s| !self.is_missing_token(s));
                column.push(cell.map(str::to_string));
            }
        }

        let mut schema = Table::new(name);
        for (header, column) in headers.iter().zip(&cells) {
            let data_type = match self.config.declared_types.get(header) {
                Some(declared) => *declared,
                None => infer_type(column),
            };
            schema.add_column(Column::new(header.clone(), data_type))?;
        }

        let row_count = cells.first().map_or(0, Vec::len);
        let mut rows: Vec<Row> = (0..row_count).map(|_| Row::new()).collect();
        let mut coercion_failures = 0;
        for (column, values) in schema.columns.iter().zip(cells) {
            for (row, cell) in rows.iter_mut().zip(values) {
                let value = match cell {
                    None => Value::Null,
                    Some(text) => match Value::Text(text).cast_to(column.data_type) {
                        Ok(v) => v,
                        Err(e) => {
                            debug!(column = %column.name, error = %e, "coercion failed, treating as missing");
                            coercion_failures += 1;
                            Value::Null
                        }
                    },
                };
                row.set(column.name.clone(), value);
            }
        }

        info!(
            table = %name,
            rows = rows.len(),
            columns = schema.columns.len(),
            coercion_failures,
            delimiter = %(delimiter as char).escape_default(),
            "parsed delimited input"
        );

        Ok(RawTable::new(Dataset::with_rows(schema, rows)))
    }

    fn is_missing_token(&self, cell: &str) -> bool {
        let cell = cell.trim();
        self.config.missing_tokens.iter().any(|t| t == cell)
    }
}

/// 列の値から型を推論する（整数 → 浮動小数点数 → 文字列の順に広げる）
fn infer_type(cells: &[Option<String>]) -> DataType {
    let mut inferred: Option<DataType> = None;
    for cell in cells.iter().flatten() {
        let cell = cell.trim();
        inferred = match inferred {
            None | Some(DataType::Integer) => {
                if cell.parse::<i64>().is_ok() {
                    Some(DataType::Integer)
                } else if cell.parse::<f64>().is_ok() {
                    Some(DataType::Float)
                } else {
                    Some(DataType::Text)
                }
            },
            Some(DataType::Float) => {
                if cell.parse::<f64>().is_ok() {
                    Some(DataType::Float)
                } else {
                    Some(DataType::Text)
                }
            },
            _ => break,
        };
    }

    // 値が一つも無い列は数値（すべて欠損）として扱う
    inferred.unwrap_or(DataType::Float)
}

/// ヘッダ行で最も多く現れる候補を区切り文字とする
fn sniff_delimiter(input: &[u8]) -> u8 {
    let header = input.split(|b| *b == b'\n').next().unwrap_or_default();
    DELIMITER_CANDIDATES
        .iter()
        .map(|d| (*d, header.iter().filter(|b| *b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map_or(b',', |(d, _)| d)
}
