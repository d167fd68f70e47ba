use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::entity::data_type::DataType;
use thiserror::Error;

// 値型エラーの定義
#[derive(Error, Debug, PartialEq)]
pub enum ValueError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },

    #[error("Cannot convert {0} to {1}")]
    ConversionError(String, String),
}

/// 日時として受け付ける書式（日時付き）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// 日付のみの書式
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d-%b-%Y",
];

/// 文字列を日時として解釈する。解釈できなければ None
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

// データセット内の値の表現
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Null,
}

/// 行の完全一致判定に使うハッシュ可能なキー
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Null,
    Integer(i64),
    Float(u64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Null => DataType::Null,
        }
    }

    /// 欠損値かどうか（NaNも欠損として扱う）
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// 数値として取り出す
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(dt) => Some(*dt),
            _ => None,
        }
    }

    /// 重複判定・最頻値計算用のキーに変換する
    pub fn key(&self) -> ValueKey {
        match self {
            Value::Integer(i) => ValueKey::Integer(*i),
            // -0.0 と 0.0、NaN同士を同一視する
            Value::Float(f) if f.is_nan() => ValueKey::Null,
            Value::Float(f) if *f == 0.0 => ValueKey::Float(0f64.to_bits()),
            Value::Float(f) => ValueKey::Float(f.to_bits()),
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Timestamp(dt) => ValueKey::Timestamp(*dt),
            Value::Null => ValueKey::Null,
        }
    }

    //指定したデータ型に変換する
    pub fn cast_to(&self, target_type: DataType) -> Result<Value, ValueError> {
        match (self, target_type) {
            //NUllはどの型にも変換できる
            (Value::Null, _) => Ok(Value::Null),

            //同じ型への変換はそのまま返す
            (v, t) if v.data_type() == t => Ok(v.clone()),

            //整数から他の型への変換
            (Value::Integer(i), DataType::Float) => Ok(Value::Float(*i as f64)),
            (Value::Integer(i), DataType::Text) => Ok(Value::Text(i.to_string())),
            (Value::Integer(i), DataType::Timestamp) => parse_timestamp(&i.to_string())
                .map(Value::Timestamp)
                .ok_or_else(|| ValueError::ConversionError(i.to_string(), "TIMESTAMP".to_string())),

            //浮動小数点数から他の型への変換
            (Value::Float(f), DataType::Integer) if f.fract() == 0.0 => Ok(Value::Integer(*f as i64)),
            (Value::Float(f), DataType::Text) => Ok(Value::Text(f.to_string())),

            //文字列から他の型への変換
            (Value::Text(s), DataType::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| ValueError::ConversionError(s.to_string(), "INTEGER".to_string())),
            (Value::Text(s), DataType::Float) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ValueError::ConversionError(s.to_string(), "FLOAT".to_string())),
            (Value::Text(s), DataType::Timestamp) => parse_timestamp(s)
                .map(Value::Timestamp)
                .ok_or_else(|| ValueError::ConversionError(s.to_string(), "TIMESTAMP".to_string())),

            //日時から文字列への変換
            (Value::Timestamp(dt), DataType::Text) => Ok(Value::Text(dt.to_string())),

            // その他の変換はエラー
            (value, target) => Err(ValueError::TypeMismatch {
                expected: target,
                actual: value.data_type(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::Integer(val)
    }
}
impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(val)
    }
}
impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::Text(val)
    }
}
impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::Text(val.to_string())
    }
}
impl From<NaiveDateTime> for Value {
    fn from(val: NaiveDateTime) -> Self {
        Value::Timestamp(val)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        val.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("2024-03-05", "2024-03-05 00:00:00")]
    #[test_case("2024-03-05 14:30:00", "2024-03-05 14:30:00")]
    #[test_case("2024-03-05T14:30:00.250", "2024-03-05 14:30:00")]
    #[test_case("2024/03/05", "2024-03-05 00:00:00")]
    #[test_case("03/05/2024", "2024-03-05 00:00:00")]
    #[test_case("05.03.2024", "2024-03-05 00:00:00")]
    #[test_case("20240305", "2024-03-05 00:00:00")]
    #[test_case("05-Mar-2024", "2024-03-05 00:00:00")]
    #[test_case("2024-03-05T14:30:00+09:00", "2024-03-05 14:30:00")]
    fn parses_supported_date_formats(raw: &str, expected: &str) {
        let parsed = parse_timestamp(raw).expect("should parse");
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), expected);
    }

    #[test_case("")]
    #[test_case("not a date")]
    #[test_case("2024-13-45")]
    fn rejects_unparseable_dates(raw: &str) {
        assert_eq!(parse_timestamp(raw), None);
    }

    #[test]
    fn text_cast_failure_is_a_conversion_error() {
        let err = Value::from("abc").cast_to(DataType::Float).unwrap_err();
        assert_eq!(err, ValueError::ConversionError("abc".into(), "FLOAT".into()));
    }

    #[test]
    fn null_casts_to_anything() {
        assert_eq!(Value::Null.cast_to(DataType::Integer), Ok(Value::Null));
    }

    #[test]
    fn float_keys_unify_signed_zero_and_nan() {
        assert_eq!(Value::Float(-0.0).key(), Value::Float(0.0).key());
        assert_eq!(Value::Float(f64::NAN).key(), Value::Null.key());
        assert!(Value::Float(f64::NAN).is_missing());
    }
}
