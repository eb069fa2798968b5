//! Condition and update translators for dynamic field maps.
//!
//! A [`FieldMap`] is an ordered field → value-or-operator mapping; the
//! condition translator renders it into one boolean predicate per entry
//! (or per operator, when a field carries several). An [`UpdateMap`] is
//! the assignment-side counterpart. Both keep insertion order, and both
//! render through the escaping provider only.

use std::sync::Arc;

use crate::builder::Buildable;
use crate::error::{QbError, QbResult};
use crate::escape::{escape_id, escape_value};
use crate::expr::Expression;
use crate::format::{Param, Template};
use crate::value::Value;

/// The operand of an `IN` / `NOT IN` operator: a literal list or a
/// subquery inlined into the list position.
#[derive(Clone)]
pub enum InValues {
    /// Literal list, each element escaped.
    List(Vec<Value>),
    /// Nested statement whose `build()` output is inlined.
    Subquery(Arc<dyn Buildable + Send + Sync>),
}

impl std::fmt::Debug for InValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InValues::List(values) => f.debug_tuple("List").field(values).finish(),
            InValues::Subquery(_) => f.debug_tuple("Subquery").field(&"<dyn Buildable>").finish(),
        }
    }
}

/// Condition operator for one field.
///
/// # Example
/// ```ignore
/// use myqb::Op;
///
/// Op::eq(1);
/// Op::like("%pattern%");
/// Op::in_list(vec![1, 2, 3]);
/// Op::in_query(myqb::table("t2").select(&["id"]));
/// Op::is_null();
/// ```
#[derive(Clone, Debug)]
pub enum Op {
    /// Equal: `field=value`
    Eq(Value),
    /// Not equal: `field<>value`
    Ne(Value),
    /// Less than: `field<value`
    Lt(Value),
    /// Less than or equal: `field<=value`
    Lte(Value),
    /// Greater than: `field>value`
    Gt(Value),
    /// Greater than or equal: `field>=value`
    Gte(Value),
    /// `field IS NULL`
    IsNull,
    /// `field IS NOT NULL`
    IsNotNull,
    /// `field LIKE pattern`
    Like(String),
    /// `field NOT LIKE pattern`
    NotLike(String),
    /// `field IN (...)`
    In(InValues),
    /// `field NOT IN (...)`
    NotIn(InValues),
}

impl Op {
    /// Create an equality operator.
    pub fn eq(value: impl Into<Value>) -> Self {
        Op::Eq(value.into())
    }

    /// Create a not-equal operator.
    pub fn ne(value: impl Into<Value>) -> Self {
        Op::Ne(value.into())
    }

    /// Create a less-than operator.
    pub fn lt(value: impl Into<Value>) -> Self {
        Op::Lt(value.into())
    }

    /// Create a less-than-or-equal operator.
    pub fn lte(value: impl Into<Value>) -> Self {
        Op::Lte(value.into())
    }

    /// Create a greater-than operator.
    pub fn gt(value: impl Into<Value>) -> Self {
        Op::Gt(value.into())
    }

    /// Create a greater-than-or-equal operator.
    pub fn gte(value: impl Into<Value>) -> Self {
        Op::Gte(value.into())
    }

    /// Create an IS NULL operator.
    pub fn is_null() -> Self {
        Op::IsNull
    }

    /// Create an IS NOT NULL operator.
    pub fn is_not_null() -> Self {
        Op::IsNotNull
    }

    /// Create a LIKE operator.
    pub fn like(pattern: impl Into<String>) -> Self {
        Op::Like(pattern.into())
    }

    /// Create a NOT LIKE operator.
    pub fn not_like(pattern: impl Into<String>) -> Self {
        Op::NotLike(pattern.into())
    }

    /// Create an IN (list) operator.
    pub fn in_list<T: Into<Value>>(values: Vec<T>) -> Self {
        Op::In(InValues::List(values.into_iter().map(Into::into).collect()))
    }

    /// Create a NOT IN (list) operator.
    pub fn not_in<T: Into<Value>>(values: Vec<T>) -> Self {
        Op::NotIn(InValues::List(values.into_iter().map(Into::into).collect()))
    }

    /// Create an IN (subquery) operator.
    pub fn in_query(query: impl Buildable + Send + Sync + 'static) -> Self {
        Op::In(InValues::Subquery(Arc::new(query)))
    }

    /// Create a NOT IN (subquery) operator.
    pub fn not_in_query(query: impl Buildable + Send + Sync + 'static) -> Self {
        Op::NotIn(InValues::Subquery(Arc::new(query)))
    }
}

/// The right-hand side of one condition entry.
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// Plain value, rendered as an equality predicate.
    Value(Value),
    /// One predicate per operator.
    Ops(Vec<Op>),
    /// A value that was never supplied. Rejected by the translator so a
    /// predicate is not dropped silently.
    Unset,
}

macro_rules! impl_field_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::Value(v.into())
                }
            }
        )*
    };
}

impl_field_value_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, &str, String);

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Value(v)
    }
}

impl From<Op> for FieldValue {
    fn from(op: Op) -> Self {
        FieldValue::Ops(vec![op])
    }
}

impl From<Vec<Op>> for FieldValue {
    fn from(ops: Vec<Op>) -> Self {
        FieldValue::Ops(ops)
    }
}

/// `None` marks the entry as unset, which the translator rejects.
impl<T: Into<Value>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => FieldValue::Value(v.into()),
            None => FieldValue::Unset,
        }
    }
}

/// Ordered field → value-or-operator mapping for WHERE conditions.
#[derive(Clone, Debug, Default)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry. Entries keep insertion order; the same field may
    /// appear more than once.
    pub fn entry(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.entries.push((field.into(), value.into()));
        self
    }

    /// Check if the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn unset_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, value)| matches!(value, FieldValue::Unset))
            .map(|(field, _)| field.as_str())
            .collect()
    }
}

/// The right-hand side of one assignment entry.
#[derive(Clone, Debug)]
pub enum SetValue {
    /// Plain value: `field=value`
    Value(Value),
    /// Increment: `field=field+value`
    Incr(Value),
}

macro_rules! impl_set_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SetValue {
                fn from(v: $t) -> Self {
                    SetValue::Value(v.into())
                }
            }
        )*
    };
}

impl_set_value_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, &str, String);

impl From<Value> for SetValue {
    fn from(v: Value) -> Self {
        SetValue::Value(v)
    }
}

/// Increment assignment, for use in [`set!`](crate::set) maps:
/// `set! { "a" => incr(1) }` renders `` `a`=`a`+1 ``.
pub fn incr(value: impl Into<Value>) -> SetValue {
    SetValue::Incr(value.into())
}

/// Ordered field → value-or-operator mapping for SET assignments.
#[derive(Clone, Debug, Default)]
pub struct UpdateMap {
    entries: Vec<(String, SetValue)>,
}

impl UpdateMap {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one assignment.
    pub fn entry(mut self, field: impl Into<String>, value: impl Into<SetValue>) -> Self {
        self.entries.push((field.into(), value.into()));
        self
    }

    /// Check if the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A condition in any of the accepted shapes.
#[derive(Clone, Debug)]
pub enum Condition {
    /// Raw SQL template plus values, run through the formatter.
    Template(Template),
    /// Field map, run through the condition translator.
    Fields(FieldMap),
    /// A pre-combined boolean expression, embedded as one fragment.
    Expr(Expression),
}

impl From<&str> for Condition {
    fn from(text: &str) -> Self {
        Condition::Template(text.into())
    }
}

impl From<String> for Condition {
    fn from(text: String) -> Self {
        Condition::Template(text.into())
    }
}

impl<S: Into<String>> From<(S, Vec<Param>)> for Condition {
    fn from(template: (S, Vec<Param>)) -> Self {
        Condition::Template(template.into())
    }
}

impl<S: Into<String>> From<(S, Vec<(String, Param)>)> for Condition {
    fn from(template: (S, Vec<(String, Param)>)) -> Self {
        Condition::Template(template.into())
    }
}

impl From<Template> for Condition {
    fn from(template: Template) -> Self {
        Condition::Template(template)
    }
}

impl From<FieldMap> for Condition {
    fn from(map: FieldMap) -> Self {
        Condition::Fields(map)
    }
}

impl From<Expression> for Condition {
    fn from(expr: Expression) -> Self {
        Condition::Expr(expr)
    }
}

/// An update payload in either accepted shape.
#[derive(Clone, Debug)]
pub enum SetExpr {
    /// Raw SQL template plus values, run through the formatter.
    Template(Template),
    /// Field map, run through the update translator.
    Fields(UpdateMap),
}

impl From<&str> for SetExpr {
    fn from(text: &str) -> Self {
        SetExpr::Template(text.into())
    }
}

impl From<String> for SetExpr {
    fn from(text: String) -> Self {
        SetExpr::Template(text.into())
    }
}

impl<S: Into<String>> From<(S, Vec<Param>)> for SetExpr {
    fn from(template: (S, Vec<Param>)) -> Self {
        SetExpr::Template(template.into())
    }
}

impl<S: Into<String>> From<(S, Vec<(String, Param)>)> for SetExpr {
    fn from(template: (S, Vec<(String, Param)>)) -> Self {
        SetExpr::Template(template.into())
    }
}

impl From<Template> for SetExpr {
    fn from(template: Template) -> Self {
        SetExpr::Template(template)
    }
}

impl From<UpdateMap> for SetExpr {
    fn from(map: UpdateMap) -> Self {
        SetExpr::Fields(map)
    }
}

/// Build an ordered condition map:
/// `cond! { "a" => 123, "b" => Op::like("%x%") }`.
#[macro_export]
macro_rules! cond {
    () => {
        $crate::FieldMap::new()
    };
    ($($field:literal => $value:expr),+ $(,)?) => {{
        let map = $crate::FieldMap::new();
        $( let map = map.entry($field, $value); )+
        map
    }};
}

/// Build an ordered assignment map:
/// `set! { "a" => 123, "b" => incr(1) }`.
#[macro_export]
macro_rules! set {
    () => {
        $crate::UpdateMap::new()
    };
    ($($field:literal => $value:expr),+ $(,)?) => {{
        let map = $crate::UpdateMap::new();
        $( let map = map.entry($field, $value); )+
        map
    }};
}

/// Translate a condition map into one predicate string per entry/operator.
///
/// Unset entries are rejected before anything is rendered, naming every
/// offending key.
pub(crate) fn condition_strings(map: &FieldMap) -> QbResult<Vec<String>> {
    let unset = map.unset_keys();
    if !unset.is_empty() {
        return Err(QbError::validation(format!(
            "found unset value for condition keys {}; it may cause unexpected errors",
            unset.join(",")
        )));
    }
    let mut out = Vec::with_capacity(map.entries.len());
    for (field, value) in &map.entries {
        let column = escape_id(field);
        match value {
            FieldValue::Value(v) => out.push(format!("{column}={}", escape_value(v))),
            FieldValue::Ops(ops) => {
                for op in ops {
                    out.push(render_op(&column, op)?);
                }
            }
            FieldValue::Unset => {}
        }
    }
    Ok(out)
}

fn render_op(column: &str, op: &Op) -> QbResult<String> {
    let sql = match op {
        Op::Eq(v) => format!("{column}={}", escape_value(v)),
        Op::Ne(v) => format!("{column}<>{}", escape_value(v)),
        Op::Lt(v) => format!("{column}<{}", escape_value(v)),
        Op::Lte(v) => format!("{column}<={}", escape_value(v)),
        Op::Gt(v) => format!("{column}>{}", escape_value(v)),
        Op::Gte(v) => format!("{column}>={}", escape_value(v)),
        Op::IsNull => format!("{column} IS NULL"),
        Op::IsNotNull => format!("{column} IS NOT NULL"),
        Op::Like(pattern) => format!(
            "{column} LIKE {}",
            escape_value(&Value::Text(pattern.clone()))
        ),
        Op::NotLike(pattern) => format!(
            "{column} NOT LIKE {}",
            escape_value(&Value::Text(pattern.clone()))
        ),
        Op::In(values) => format!("{column} IN ({})", render_in_values(values)?),
        Op::NotIn(values) => format!("{column} NOT IN ({})", render_in_values(values)?),
    };
    Ok(sql)
}

fn render_in_values(values: &InValues) -> QbResult<String> {
    match values {
        InValues::List(items) => Ok(items
            .iter()
            .map(escape_value)
            .collect::<Vec<_>>()
            .join(", ")),
        InValues::Subquery(query) => query.build(),
    }
}

/// Translate an assignment map into one assignment string per entry.
pub(crate) fn update_strings(map: &UpdateMap) -> Vec<String> {
    map.entries
        .iter()
        .map(|(field, value)| {
            let column = escape_id(field);
            match value {
                SetValue::Value(v) => format!("{column}={}", escape_value(v)),
                SetValue::Incr(v) => format!("{column}={column}+{}", escape_value(v)),
            }
        })
        .collect()
}
