//! Frontend: command text to expressions

pub mod parser;

pub use parser::{parse, parse_number, Expression};
