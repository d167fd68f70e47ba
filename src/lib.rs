pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod interface;
pub mod client;

use crate::application::DatasetPreparer;
use crate::domain::entity::{CleaningConfig, PreparedDataset};
use crate::infrastructure::parser::{DelimitedParser, ParseError};

// ordereda version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// crate result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum  Error {
    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}

/// 区切り文字ファイルを読み込み、クリーニングまで行う
pub fn prepare_delimited(
    name: &str,
    input: &[u8],
    parser: &DelimitedParser,
    config: CleaningConfig,
) -> Result<PreparedDataset> {
    let raw = parser.parse(name, input)?;
    Ok(DatasetPreparer::new(config).prepare(&raw))
}
