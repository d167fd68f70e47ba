use derive_more::Display;
use strum::EnumString;
use serde::{Deserialize, Serialize};


/// データセットでサポートされるデータ型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum DataType {
    #[strum(serialize = "INTEGER", serialize = "INT")]
    #[display(fmt = "INTEGER")]
    Integer,

    #[strum(serialize = "FLOAT", serialize = "REAL", serialize = "DOUBLE")]
    #[display(fmt = "FLOAT")]
    Float,

    #[strum(serialize = "TEXT", serialize = "STRING", serialize = "VARCHAR")]
    #[display(fmt = "TEXT")]
    Text,

    #[strum(serialize = "TIMESTAMP", serialize = "DATETIME", serialize = "DATE")]
    #[display(fmt = "TIMESTAMP")]
    Timestamp,

    // 欠損値マーカーの型（カラムの型としては使わない）
    #[strum(serialize = "NULL")]
    #[display(fmt = "NULL")]
    Null,
}

impl DataType {
    /// 数値型（整数または浮動小数点数）かどうか
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Text)
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self, DataType::Timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case("INTEGER", DataType::Integer)]
    #[test_case("int", DataType::Integer)]
    #[test_case("Double", DataType::Float)]
    #[test_case("string", DataType::Text)]
    #[test_case("date", DataType::Timestamp)]
    fn parses_declared_type_names(name: &str, expected: DataType) {
        assert_eq!(DataType::from_str(name).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_type_name() {
        assert!(DataType::from_str("BLOB").is_err());
    }

    #[test]
    fn displays_canonical_name() {
        assert_eq!(DataType::Timestamp.to_string(), "TIMESTAMP");
        assert!(DataType::Float.is_numeric());
        assert!(!DataType::Text.is_numeric());
    }
}
