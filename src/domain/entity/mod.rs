pub mod data_type;
pub mod value;
pub mod column;
pub mod table;
pub mod cleaning;
pub mod session;
// src/domain/entity/mod.rs

pub use data_type::DataType;
pub use value::{Value, ValueKey, ValueError, parse_timestamp};
pub use column::Column;
pub use table::{Table, Row, Dataset, RawTable, CleanedTable, ColumnCount, TableError};
pub use cleaning::{
    CleaningConfig, CleaningReport, CleaningWarning, ColumnClassification,
    MissingValueStrategy, PreparedDataset,
};
pub use session::{Session, SessionId};
