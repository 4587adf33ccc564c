//! # Query Expression Evaluator
//!
//! Compiles a WHERE clause such as `age>=18 and city="Sofia"` into a
//! [`Predicate`] over records.
//!
//! Grammar:
//!
//! ```text
//! clause     := comparison ( connective comparison )*
//! connective := " and " | " or "                 (case-insensitive, not mixed)
//! comparison := field operator literal
//! operator   := "<=" | "<" | ">=" | ">" | "=" | " like " | " in "
//! literal    := JSON scalar | "(" JSON list items ")"   (list only for " in ")
//! ```
//!
//! Operators are tried in the order above at the earliest position where
//! any of them matches, so `<=` is never read as `<` followed by `=`.

pub mod errors;
pub mod lexer;
pub mod predicate;
pub mod value;

pub use errors::{QueryError, QueryResult};
pub use lexer::{Connective, Operator};
pub use predicate::{Comparison, Operand, Predicate};
