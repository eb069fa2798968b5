//! # myqb
//!
//! A chainable MySQL statement builder: structured clause descriptions in,
//! one syntactically valid, fully escaped SQL string out.
//!
//! ## Features
//!
//! - **Chainable builder**: `table(..).select(..).where_cond(..).build()`
//! - **Safe by default**: every literal and identifier goes through the
//!   escaping provider; raw fragments are explicit (`???` placeholders)
//! - **Heterogeneous conditions**: raw templates, ordered field maps with
//!   typed operators, and composable AND/OR expressions
//! - **Subqueries**: any [`Buildable`] value is inlined recursively
//! - **Six statement kinds**: SELECT [DISTINCT], INSERT, UPDATE,
//!   INSERT ... ON DUPLICATE KEY UPDATE, DELETE, and custom templates with
//!   `:$table`-style macros
//!
//! ## Example
//!
//! ```ignore
//! use myqb::{Op, args, cond, table};
//!
//! let sql = table("users")
//!     .select(&["id", "name"])
//!     .where_cond(cond! {
//!         "status" => "active",
//!         "role" => Op::in_list(vec!["admin", "staff"]),
//!     })
//!     .and(("created_at > ?", args!["2024-01-01"]))
//!     .order_by("`id` DESC")
//!     .limit(20)
//!     .build()?;
//! # Ok::<(), myqb::QbError>(())
//! ```
//!
//! Statement execution is out of scope: the builder produces a string, and
//! whatever client executes it is up to the caller.

pub mod builder;
pub mod condition;
pub mod error;
pub mod escape;
pub mod expr;
pub mod format;
pub mod value;

pub use builder::{Buildable, JoinKind, QueryBuilder, QueryKind, QueryOptions, Row, RowSet};
pub use condition::{
    Condition, FieldMap, FieldValue, InValues, Op, SetExpr, SetValue, UpdateMap, incr,
};
pub use error::{QbError, QbResult};
pub use escape::{escape_id, escape_value};
pub use expr::Expression;
pub use format::{Param, Template, TemplateValues, format};
pub use value::Value;

/// Create a builder with the table name set.
///
/// # Example
/// ```ignore
/// let qb = myqb::table("users").select(&["id"]);
/// ```
pub fn table(name: impl Into<String>) -> QueryBuilder {
    QueryBuilder::new().table(name)
}

/// Create a SELECT builder; set the table with
/// [`from`](QueryBuilder::from).
pub fn select(fields: &[&str]) -> QueryBuilder {
    QueryBuilder::new().select(fields)
}

/// Create a SELECT DISTINCT builder.
pub fn select_distinct(fields: &[&str]) -> QueryBuilder {
    QueryBuilder::new().select_distinct(fields)
}

/// Create an INSERT builder from one row or a batch; set the table with
/// [`from`](QueryBuilder::from).
pub fn insert(rows: impl Into<RowSet>) -> QueryBuilder {
    QueryBuilder::new().insert(rows)
}

/// Create an UPDATE builder; add assignments with
/// [`set`](QueryBuilder::set).
pub fn update() -> QueryBuilder {
    QueryBuilder::new().update()
}

/// Create a DELETE builder.
pub fn delete() -> QueryBuilder {
    QueryBuilder::new().delete()
}

/// Create an empty AND/OR expression.
pub fn expr() -> Expression {
    Expression::new()
}
