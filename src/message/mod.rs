//! Stream message parsing

mod parser;

pub use parser::parse_message;
