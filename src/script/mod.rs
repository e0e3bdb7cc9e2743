//! Script — the turtle command language.
//!
//! Turns newline-delimited text into an ordered list of `Action`s and wraps
//! that list behind a one-shot forward cursor.

pub mod parser;
pub mod sequence;

pub use parser::{Action, Command, parse, parse_line, parse_str};
pub use sequence::ActionSequence;
