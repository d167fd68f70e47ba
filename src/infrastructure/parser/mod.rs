pub mod csv_parser;

pub use csv_parser::{
    DelimitedParser, ParserConfig, ParseError, DEFAULT_MISSING_TOKENS,
};
