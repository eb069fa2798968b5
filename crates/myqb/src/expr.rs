//! AND/OR expression combinator.
//!
//! [`Expression`] accumulates condition fragments with their connectors and
//! renders them as one parenthesized boolean expression. It accepts the
//! same input shapes as the builder's condition methods and can itself be
//! embedded into a builder as one opaque fragment.

use crate::condition::{Condition, condition_strings};
use crate::error::{QbError, QbResult};

/// Connector between adjacent fragments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Connector {
    And,
    Or,
}

impl Connector {
    const fn as_str(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// A composable boolean expression.
///
/// # Example
/// ```ignore
/// use myqb::{args, cond, expr};
///
/// let sql = expr()
///     .and(("a=?", args![123]))
///     .or(cond! { "b" => 456 })
///     .build()?;
/// assert_eq!(sql, "(a=123 OR `b`=456)");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Expression {
    parts: Vec<(Connector, String)>,
    error: Option<QbError>,
}

impl Expression {
    /// Create an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an AND-connected condition.
    pub fn and(self, condition: impl Into<Condition>) -> Self {
        self.combine(Connector::And, condition.into())
    }

    /// Append an OR-connected condition.
    pub fn or(self, condition: impl Into<Condition>) -> Self {
        self.combine(Connector::Or, condition.into())
    }

    /// Render the accumulated fragments as `(a CONN b CONN c)`.
    ///
    /// The first fragment's connector is structurally meaningless and is
    /// stripped. Fails if nothing was accumulated.
    pub fn build(&self) -> QbResult<String> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let mut text = String::new();
        for (connector, fragment) in &self.parts {
            text.push(' ');
            text.push_str(connector.as_str());
            text.push(' ');
            text.push_str(fragment);
        }
        let mut text = text.trim();
        if let Some(rest) = text.strip_prefix("AND ") {
            text = rest;
        } else if let Some(rest) = text.strip_prefix("OR ") {
            text = rest;
        }
        if text.is_empty() {
            return Err(QbError::validation("expression cannot be empty"));
        }
        Ok(format!("({text})"))
    }

    fn combine(mut self, connector: Connector, condition: Condition) -> Self {
        if self.error.is_some() {
            return self;
        }
        match condition {
            Condition::Template(template) => match template.format() {
                Ok(fragment) => self.parts.push((connector, fragment)),
                Err(err) => self.error = Some(err),
            },
            Condition::Fields(map) => match condition_strings(&map) {
                Ok(fragments) => {
                    for fragment in fragments {
                        self.parts.push((connector, fragment));
                    }
                }
                Err(err) => self.error = Some(err),
            },
            Condition::Expr(inner) => match inner.build() {
                Ok(fragment) => self.parts.push((connector, fragment)),
                Err(err) => self.error = Some(err),
            },
        }
        self
    }
}
