//! SQL layer - parsing and lowering
//!
//! This module provides:
//! - `Parser`: Parses SQL text and lowers it into the planner-facing AST
//! - `ast`: Closed set of query node kinds the planner translates

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::*;
pub use error::{SqlError, SqlResult};
pub use parser::Parser;
