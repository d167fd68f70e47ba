use crate::domain::entity::data_type::DataType;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use std::fmt;

/// データセットのカラムを表すエンティティ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct Column {
    /// カラム名
    #[builder(setter(into))]
    pub name: String,

    /// データ型（宣言または推論済み）
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)
    }
}
