//! The statement builder.
//!
//! [`QueryBuilder`] is a mutable state machine: chained configuration calls
//! accumulate clause data, and [`QueryBuilder::build`] assembles the final
//! SQL string with one of six algorithms selected by the statement kind.
//!
//! Configuration methods consume and return `Self`. An error detected by a
//! configuration call is recorded in the builder (first error wins) and
//! reported by `build()`; a builder that recorded an error is poisoned and
//! should be discarded.
//!
//! `build()` reads state without modifying it and may be called repeatedly;
//! nested builders supplied as subquery values are built recursively.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::condition::{Condition, SetExpr, condition_strings, update_strings};
use crate::error::{QbError, QbResult};
use crate::escape::{escape_id, escape_value};
use crate::format::{Template, TemplateValues, format_named};
use crate::value::Value;

/// Capability of producing a complete SQL statement.
///
/// Anything implementing this trait is accepted wherever a nested subquery
/// value is legal (raw placeholders, `IN` operands).
pub trait Buildable {
    /// Assemble the statement.
    fn build(&self) -> QbResult<String>;
}

/// The statement kind selecting the assembly algorithm.
///
/// Set exactly once per builder; any later attempt to set it again is an
/// error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryKind {
    /// No kind chosen yet; `build()` fails.
    #[default]
    Unset,
    /// `SELECT ... FROM ...`
    Select,
    /// `SELECT DISTINCT ... FROM ...`
    SelectDistinct,
    /// `INSERT INTO ...`
    Insert,
    /// `UPDATE ... SET ...`
    Update,
    /// `INSERT INTO ... ON DUPLICATE KEY UPDATE ...`
    InsertOrUpdate,
    /// `DELETE FROM ...`
    Delete,
    /// A caller-supplied template with macro expansion.
    Custom,
}

impl QueryKind {
    const fn describe(self) -> &'static str {
        match self {
            QueryKind::Unset => "",
            QueryKind::Select => "SELECT",
            QueryKind::SelectDistinct => "SELECT DISTINCT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::InsertOrUpdate => "INSERT_OR_UPDATE",
            QueryKind::Delete => "DELETE",
            QueryKind::Custom => "CUSTOM",
        }
    }
}

/// Join flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    /// `JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
}

impl JoinKind {
    const fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Clone, Debug)]
struct JoinClause {
    table: String,
    kind: JoinKind,
    /// Extra field specs selected from the joined table.
    fields: Vec<String>,
    /// Rendered ON predicate; set at most once.
    on: String,
    alias: Option<String>,
}

/// One row of insert data: an ordered column → value mapping.
///
/// Usually built with the [`row!`](crate::row) macro.
#[derive(Clone, Debug, Default)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one column value.
    pub fn col(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// One or many insert rows.
#[derive(Clone, Debug)]
pub struct RowSet(pub(crate) Vec<Row>);

impl From<Row> for RowSet {
    fn from(row: Row) -> Self {
        RowSet(vec![row])
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        RowSet(rows)
    }
}

/// Build an insert row: `row! { "a" => 123, "b" => "x" }`.
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($($col:literal => $value:expr),+ $(,)?) => {{
        let row = $crate::Row::new();
        $( let row = row.col($col, $value); )+
        row
    }};
}

/// Batch configuration applied through [`QueryBuilder::options`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Rows to skip (alias of `offset`).
    pub skip: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Rows to return.
    pub limit: Option<u64>,
    /// ORDER BY template.
    pub order_by: Option<String>,
    /// GROUP BY template.
    pub group_by: Option<String>,
    /// Field list.
    pub fields: Option<Vec<String>>,
}

/// A chainable SQL statement builder.
///
/// # Example
/// ```ignore
/// use myqb::{cond, table};
///
/// let sql = table("users")
///     .select(&["id", "name"])
///     .where_cond(cond! { "status" => "active" })
///     .order_by("`id` DESC")
///     .limit(20)
///     .build()?;
/// assert_eq!(
///     sql,
///     "SELECT `id`, `name` FROM `users` WHERE `status`='active' ORDER BY `id` DESC LIMIT 20"
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct QueryBuilder {
    kind: QueryKind,
    table_name: Option<String>,
    table_name_escaped: String,
    /// Raw field specs; resolved (escaped/prefixed) during `build`.
    fields: Vec<String>,
    /// Pre-rendered predicates, ANDed in order at build time.
    conditions: Vec<String>,
    joins: Vec<JoinClause>,
    table_alias: HashMap<String, String>,
    alias_table: HashMap<String, String>,
    /// Pre-rendered assignment strings.
    update: Vec<String>,
    /// Rendered `(cols) VALUES (...)` payload.
    insert: String,
    insert_rows: usize,
    order_by: String,
    group_by: String,
    offset_rows: u64,
    limit_rows: u64,
    custom_tpl: String,
    custom_values: TemplateValues,
    build_error: Option<QbError>,
}

impl QueryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the statement kind chosen so far.
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    fn fail(mut self, err: QbError) -> Self {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
        self
    }

    fn set_kind(mut self, kind: QueryKind) -> Self {
        if self.kind != QueryKind::Unset {
            let current = self.kind.describe();
            return self.fail(QbError::state(format!(
                "cannot change statement kind after it was set to \"{current}\""
            )));
        }
        self.kind = kind;
        self
    }

    // ==================== Table ====================

    /// Set the table name. May be called once.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(existing) = &self.table_name {
            let existing = existing.clone();
            return self.fail(QbError::state(format!(
                "cannot change table name after it was set to \"{existing}\""
            )));
        }
        self.table_name_escaped = escape_id(&name);
        self.table_name = Some(name);
        self
    }

    /// Alias of [`QueryBuilder::table`].
    pub fn from(self, name: impl Into<String>) -> Self {
        self.table(name)
    }

    // ==================== Statement kind ====================

    /// Start a SELECT statement with the given field specs (may be empty).
    pub fn select(self, fields: &[&str]) -> Self {
        let qb = self.set_kind(QueryKind::Select);
        if fields.is_empty() {
            return qb;
        }
        qb.fields(fields)
    }

    /// Start a SELECT DISTINCT statement; at least one field is required.
    pub fn select_distinct(self, fields: &[&str]) -> Self {
        let qb = self.set_kind(QueryKind::SelectDistinct);
        if fields.is_empty() {
            return qb.fail(QbError::validation(
                "select_distinct() requires at least one field",
            ));
        }
        qb.fields(fields)
    }

    /// Start a `SELECT COUNT(*) AS <alias>` statement.
    pub fn count(self, alias: impl Into<String>) -> Self {
        let alias: String = alias.into();
        let mut qb = self.set_kind(QueryKind::Select);
        qb.fields = vec![format!("COUNT(*) AS {}", escape_id(&alias))];
        qb
    }

    /// Start an INSERT statement from one row or a batch of rows.
    ///
    /// Every row must carry exactly the first row's column set.
    pub fn insert(self, rows: impl Into<RowSet>) -> Self {
        let mut qb = self.set_kind(QueryKind::Insert);
        let RowSet(rows) = rows.into();
        if rows.is_empty() {
            return qb.fail(QbError::validation(
                "insert data must contain at least one row",
            ));
        }
        let columns: Vec<String> = rows[0]
            .entries
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        let mut tuples = Vec::with_capacity(rows.len());
        for row in &rows {
            let matches = row.len() == columns.len()
                && columns.iter().all(|column| row.get(column).is_some());
            if !matches {
                return qb.fail(QbError::validation(
                    "every insert row must share the first row's column set",
                ));
            }
            let line: Vec<String> = columns
                .iter()
                .map(|column| escape_value(row.get(column).unwrap_or(&Value::Null)))
                .collect();
            tuples.push(format!("({})", line.join(", ")));
        }
        let escaped: Vec<String> = columns.iter().map(|c| escape_id(c)).collect();
        qb.insert = format!("({}) VALUES {}", escaped.join(", "), tuples.join(",\n"));
        qb.insert_rows = rows.len();
        qb
    }

    /// Start an UPDATE statement. Assignments are added with
    /// [`QueryBuilder::set`].
    pub fn update(self) -> Self {
        self.set_kind(QueryKind::Update)
    }

    /// Start a DELETE statement.
    pub fn delete(self) -> Self {
        self.set_kind(QueryKind::Delete)
    }

    /// Turn an INSERT of exactly one row into
    /// `INSERT ... ON DUPLICATE KEY UPDATE`; follow with
    /// [`QueryBuilder::set`].
    pub fn on_duplicate_key_update(mut self) -> Self {
        if self.kind != QueryKind::Insert {
            return self.fail(QbError::state(
                "on_duplicate_key_update() must be called after insert()",
            ));
        }
        if self.insert_rows != 1 {
            let rows = self.insert_rows;
            return self.fail(QbError::state(format!(
                "on_duplicate_key_update() requires exactly one inserted row, got {rows}"
            )));
        }
        self.kind = QueryKind::InsertOrUpdate;
        self
    }

    /// Start a custom statement from a raw template.
    ///
    /// The template may use the macros `:$table`, `:$orderBy`, `:$limit`,
    /// `:$fields`, `:$offsetRows`, `:$limitRows` (and the legacy
    /// `:$skipRows`), expanded without escaping at build time.
    pub fn sql(self, template: impl Into<String>) -> Self {
        let mut qb = self.set_kind(QueryKind::Custom);
        qb.custom_tpl = template.into();
        qb
    }

    /// Start a custom statement with values for its placeholders, stored
    /// verbatim and expanded after the macros.
    pub fn sql_values(
        self,
        template: impl Into<String>,
        values: impl Into<TemplateValues>,
    ) -> Self {
        let mut qb = self.set_kind(QueryKind::Custom);
        qb.custom_tpl = template.into();
        qb.custom_values = values.into();
        qb
    }

    // ==================== Fields ====================

    /// Set the field specs. May be called once; join field injection is
    /// separate.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        if !self.fields.is_empty() {
            return self.fail(QbError::state(
                "cannot change fields after they have been set",
            ));
        }
        if fields.iter().any(|f| f.is_empty()) {
            return self.fail(QbError::validation("field name cannot be empty"));
        }
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    // ==================== Joins ====================

    /// Append a `JOIN`, with extra field specs selected from the joined
    /// table (may be empty).
    pub fn join(self, table: impl Into<String>, fields: &[&str]) -> Self {
        self.add_join(table, JoinKind::Inner, fields)
    }

    /// Append a `LEFT JOIN`.
    pub fn left_join(self, table: impl Into<String>, fields: &[&str]) -> Self {
        self.add_join(table, JoinKind::Left, fields)
    }

    /// Append a `RIGHT JOIN`.
    pub fn right_join(self, table: impl Into<String>, fields: &[&str]) -> Self {
        self.add_join(table, JoinKind::Right, fields)
    }

    fn add_join(mut self, table: impl Into<String>, kind: JoinKind, fields: &[&str]) -> Self {
        self.joins.push(JoinClause {
            table: table.into(),
            kind,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            on: String::new(),
            alias: None,
        });
        self
    }

    /// Attach an alias to the most recently added join, or to the base
    /// table when no join was added yet. Alias names are unique per
    /// builder.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.alias_table.contains_key(&name) || self.table_alias.contains_key(&name) {
            return self.fail(QbError::state(format!(
                "alias name \"{name}\" already registered"
            )));
        }
        if self.joins.is_empty() {
            let Some(table) = self.table_name.clone() else {
                return self.fail(QbError::state(
                    "cannot set an alias before the table name",
                ));
            };
            if self.table_alias.contains_key(&table) {
                return self.fail(QbError::state(format!(
                    "table \"{table}\" already has an alias"
                )));
            }
            self.alias_table.insert(name.clone(), table.clone());
            self.table_alias.insert(table, name);
        } else {
            let aliased = self.joins.last().is_some_and(|j| j.alias.is_some());
            if aliased {
                return self.fail(QbError::state("join table already has an alias"));
            }
            let table = self
                .joins
                .last()
                .map(|j| j.table.clone())
                .unwrap_or_default();
            self.alias_table.insert(name.clone(), table.clone());
            self.table_alias.entry(table).or_insert_with(|| name.clone());
            if let Some(join) = self.joins.last_mut() {
                join.alias = Some(name);
            }
        }
        self
    }

    /// Attach the ON predicate to the most recently added join. Set at
    /// most once per join.
    pub fn on(mut self, template: impl Into<Template>) -> Self {
        let template: Template = template.into();
        let Some(last) = self.joins.last() else {
            return self.fail(QbError::state("missing join table before on()"));
        };
        if !last.on.is_empty() {
            let current = last.on.clone();
            return self.fail(QbError::state(format!(
                "join condition already registered, current is \"{current}\""
            )));
        }
        match template.format() {
            Ok(rendered) => {
                if let Some(join) = self.joins.last_mut() {
                    join.on = rendered;
                }
                self
            }
            Err(err) => self.fail(err),
        }
    }

    // ==================== Conditions ====================

    /// Append a WHERE condition: a raw template (with optional values), a
    /// [`FieldMap`](crate::FieldMap), or an
    /// [`Expression`](crate::Expression).
    ///
    /// Empty input is a no-op for SELECT kinds and an error for modifying
    /// statements.
    pub fn where_cond(self, condition: impl Into<Condition>) -> Self {
        self.and(condition)
    }

    /// Alias of [`QueryBuilder::where_cond`]; all conditions are ANDed.
    pub fn and(mut self, condition: impl Into<Condition>) -> Self {
        let tolerates_empty =
            matches!(self.kind, QueryKind::Select | QueryKind::SelectDistinct);
        match condition.into() {
            Condition::Template(template) => {
                if template.text.trim().is_empty() {
                    if tolerates_empty {
                        return self;
                    }
                    return self.fail(QbError::validation(
                        "condition for a modifying statement cannot be empty",
                    ));
                }
                match template.format() {
                    Ok(rendered) => {
                        self.conditions.push(rendered);
                        self
                    }
                    Err(err) => self.fail(err),
                }
            }
            Condition::Fields(map) => {
                let unset = map.unset_keys();
                if !unset.is_empty() {
                    let keys = unset.join(",");
                    return self.fail(QbError::validation(format!(
                        "found unset value for condition keys {keys}; it may cause unexpected errors"
                    )));
                }
                if map.is_empty() {
                    if tolerates_empty {
                        return self;
                    }
                    return self.fail(QbError::validation(
                        "condition for a modifying statement cannot be empty",
                    ));
                }
                match condition_strings(&map) {
                    Ok(predicates) => {
                        self.conditions.extend(predicates);
                        self
                    }
                    Err(err) => self.fail(err),
                }
            }
            Condition::Expr(expr) => match expr.build() {
                Ok(fragment) => {
                    self.conditions.push(fragment);
                    self
                }
                Err(err) => self.fail(err),
            },
        }
    }

    // ==================== Assignments ====================

    /// Append SET assignments: a raw template or an
    /// [`UpdateMap`](crate::UpdateMap). Legal for UPDATE and
    /// INSERT-OR-UPDATE statements; assignments accumulate across calls.
    pub fn set(mut self, update: impl Into<SetExpr>) -> Self {
        if !matches!(self.kind, QueryKind::Update | QueryKind::InsertOrUpdate) {
            return self.fail(QbError::state(
                "statement kind must be UPDATE, call update() first",
            ));
        }
        match update.into() {
            SetExpr::Template(template) => match template.format() {
                Ok(rendered) => {
                    self.update.push(rendered);
                    self
                }
                Err(err) => self.fail(err),
            },
            SetExpr::Fields(map) => {
                self.update.extend(update_strings(&map));
                self
            }
        }
    }

    // ==================== Ordering, grouping, paging ====================

    /// Set the ORDER BY clause from a template. Quoted `'ASC'`/`'DESC'`
    /// produced by value placeholders are unquoted.
    pub fn order_by(mut self, template: impl Into<Template>) -> Self {
        let template: Template = template.into();
        match template.format() {
            Ok(fields) => {
                self.order_by = unquote_directions(&format!("ORDER BY {fields}"));
                self
            }
            Err(err) => self.fail(err),
        }
    }

    /// Set the GROUP BY clause from a template; the template may carry a
    /// `HAVING` suffix directly.
    pub fn group_by(mut self, template: impl Into<Template>) -> Self {
        let template: Template = template.into();
        match template.format() {
            Ok(fields) => {
                self.group_by = unquote_directions(&format!("GROUP BY {fields}"));
                self
            }
            Err(err) => self.fail(err),
        }
    }

    /// Append a HAVING clause; requires a prior [`QueryBuilder::group_by`].
    pub fn having(mut self, template: impl Into<Template>) -> Self {
        let template: Template = template.into();
        if self.group_by.is_empty() {
            return self.fail(QbError::state("having() requires group_by() first"));
        }
        match template.format() {
            Ok(rendered) => {
                self.group_by.push_str(" HAVING ");
                self.group_by.push_str(&rendered);
                self
            }
            Err(err) => self.fail(err),
        }
    }

    /// Skip the first `rows` rows.
    pub fn offset(mut self, rows: u64) -> Self {
        self.offset_rows = rows;
        self
    }

    /// Alias of [`QueryBuilder::offset`].
    pub fn skip(self, rows: u64) -> Self {
        self.offset(rows)
    }

    /// Return at most `rows` rows.
    pub fn limit(mut self, rows: u64) -> Self {
        self.limit_rows = rows;
        self
    }

    /// Apply a batch of options in a fixed order: `skip`, `offset`,
    /// `limit`, `order_by`, `group_by`, `fields`.
    pub fn options(mut self, options: QueryOptions) -> Self {
        if let Some(rows) = options.skip {
            self = self.offset(rows);
        }
        if let Some(rows) = options.offset {
            self = self.offset(rows);
        }
        if let Some(rows) = options.limit {
            self = self.limit(rows);
        }
        if let Some(template) = options.order_by {
            self = self.order_by(template);
        }
        if let Some(template) = options.group_by {
            self = self.group_by(template);
        }
        if let Some(fields) = options.fields {
            let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
            self = self.fields(&refs);
        }
        self
    }

    // ==================== Build ====================

    /// Assemble the statement.
    ///
    /// Reads state only; calling it again with unchanged state produces
    /// the same string.
    pub fn build(&self) -> QbResult<String> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        let Some(table) = self.table_name.as_deref() else {
            return Err(QbError::state("missing table name"));
        };
        let t = &self.table_name_escaped;

        let conditions: Vec<&str> = self
            .conditions
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = self.limit_sql();

        let sql = match self.kind {
            QueryKind::Select | QueryKind::SelectDistinct => {
                self.build_select(table, &where_clause, &limit)?
            }
            QueryKind::Insert => format!("INSERT INTO {t} {}", self.insert),
            QueryKind::Update => {
                if self.update.is_empty() {
                    return Err(QbError::validation("update data cannot be empty"));
                }
                let tail = join_multi(&[&where_clause, &limit]);
                format!("UPDATE {t} SET {} {tail}", self.update.join(", "))
            }
            QueryKind::InsertOrUpdate => {
                if self.update.is_empty() {
                    return Err(QbError::validation("update data cannot be empty"));
                }
                format!(
                    "INSERT INTO {t} {} ON DUPLICATE KEY UPDATE {}",
                    self.insert,
                    self.update.join(", ")
                )
            }
            QueryKind::Delete => {
                let tail = join_multi(&[&where_clause, &limit]);
                format!("DELETE FROM {t} {tail}")
            }
            QueryKind::Custom => self.build_custom()?,
            QueryKind::Unset => {
                return Err(QbError::state(format!(
                    "invalid statement kind \"{}\"",
                    self.kind.describe()
                )));
            }
        };
        let sql = sql.trim().to_string();
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %sql, "statement built");
        Ok(sql)
    }

    fn build_select(&self, table: &str, where_clause: &str, limit: &str) -> QbResult<String> {
        let t = &self.table_name_escaped;
        let keyword = if self.kind == QueryKind::SelectDistinct {
            "SELECT DISTINCT"
        } else {
            "SELECT"
        };
        let base_alias = self.table_alias.get(table).map(|a| escape_id(a));

        let mut from = t.clone();
        if let Some(alias) = &base_alias {
            from.push_str(" AS ");
            from.push_str(alias);
        }

        let mut fields;
        let mut join_segments: Vec<String> = Vec::new();
        if self.joins.is_empty() {
            fields = resolve_fields(base_alias.as_deref(), &self.fields);
        } else {
            let base_prefix = base_alias.unwrap_or_else(|| t.clone());
            fields = resolve_fields(Some(&base_prefix), &self.fields);
            for join in &self.joins {
                let joined = escape_id(&join.table);
                let mut clause = format!("{} {joined}", join.kind.as_sql());
                let prefix = match &join.alias {
                    Some(alias) => {
                        let alias = escape_id(alias);
                        clause.push_str(" AS ");
                        clause.push_str(&alias);
                        alias
                    }
                    None => joined,
                };
                if !join.on.is_empty() {
                    clause.push_str(" ON ");
                    clause.push_str(&join.on);
                }
                fields.extend(resolve_fields(Some(&prefix), &join.fields));
                join_segments.push(clause);
            }
        }
        if fields.is_empty() {
            fields.push("*".to_string());
        }

        let mut tail_parts: Vec<&str> = join_segments.iter().map(String::as_str).collect();
        tail_parts.push(where_clause);
        tail_parts.push(&self.group_by);
        tail_parts.push(&self.order_by);
        tail_parts.push(limit);
        let tail = join_multi(&tail_parts);

        Ok(format!("{keyword} {} FROM {from} {tail}", fields.join(", ")))
    }

    fn build_custom(&self) -> QbResult<String> {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            resolve_fields(None, &self.fields).join(", ")
        };
        let macros = vec![
            text_macro("$table", self.table_name_escaped.clone()),
            text_macro("$orderBy", self.order_by.clone()),
            text_macro("$limit", self.limit_sql()),
            text_macro("$fields", fields),
            rows_macro("$skipRows", self.offset_rows),
            rows_macro("$offsetRows", self.offset_rows),
            rows_macro("$limitRows", self.limit_rows),
        ];
        let expanded = format_named(&self.custom_tpl, &macros, true)?;
        Template {
            text: expanded,
            values: self.custom_values.clone(),
        }
        .format()
    }

    fn limit_sql(&self) -> String {
        if self.limit_rows > 0 {
            if self.offset_rows > 0 {
                format!("LIMIT {},{}", self.offset_rows, self.limit_rows)
            } else {
                format!("LIMIT {}", self.limit_rows)
            }
        } else if self.offset_rows > 0 {
            // offset without a row count: pin the upper bound to the
            // engine's "unbounded" sentinel
            format!("LIMIT {},{}", self.offset_rows, u64::MAX)
        } else {
            String::new()
        }
    }
}

impl Buildable for QueryBuilder {
    fn build(&self) -> QbResult<String> {
        QueryBuilder::build(self)
    }
}

/// A builder used as a placeholder value is a subquery.
impl From<QueryBuilder> for crate::format::Param {
    fn from(query: QueryBuilder) -> Self {
        crate::format::Param::subquery(query)
    }
}

fn text_macro(name: &str, value: String) -> (String, crate::format::Param) {
    (
        name.to_string(),
        crate::format::Param::Value(Value::Text(value)),
    )
}

fn rows_macro(name: &str, rows: u64) -> (String, crate::format::Param) {
    (name.to_string(), crate::format::Param::Value(Value::UInt(rows)))
}

/// Resolve field specs against an optional (already escaped) prefix.
///
/// `*` becomes `<prefix>.*`; a spec containing a case-insensitive ` as `
/// is a custom expression and passes through unprefixed; a spec already
/// starting with a backtick is prefixed without re-escaping; anything else
/// is escaped, then prefixed.
fn resolve_fields(prefix: Option<&str>, specs: &[String]) -> Vec<String> {
    specs
        .iter()
        .map(|spec| resolve_field(prefix, spec))
        .collect()
}

fn resolve_field(prefix: Option<&str>, spec: &str) -> String {
    let Some(prefix) = prefix else {
        if spec == "*" || spec.starts_with('`') || has_alias_marker(spec) {
            return spec.to_string();
        }
        return escape_id(spec);
    };
    if spec == "*" {
        return format!("{prefix}.*");
    }
    if has_alias_marker(spec) {
        return spec.to_string();
    }
    if spec.starts_with('`') {
        return format!("{prefix}.{spec}");
    }
    format!("{prefix}.{}", escape_id(spec))
}

fn has_alias_marker(spec: &str) -> bool {
    spec.to_ascii_lowercase().contains(" as ")
}

/// Join non-empty segments with single spaces.
fn join_multi(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace quoted `'ASC'`/`'DESC'` tokens (any case) with the bare
/// keyword. Value placeholders deliver direction keywords as quoted
/// strings; ORDER BY and GROUP BY templates expect them unquoted.
fn unquote_directions(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;
    'scan: while i < chars.len() {
        if chars[i] == '\'' {
            for word in ["DESC", "ASC"] {
                let len = word.len();
                if i + len + 1 < chars.len()
                    && chars[i + len + 1] == '\''
                    && chars[i + 1..i + 1 + len]
                        .iter()
                        .collect::<String>()
                        .eq_ignore_ascii_case(word)
                {
                    out.push_str(word);
                    i += len + 2;
                    continue 'scan;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_fields_without_prefix() {
        assert_eq!(resolve_field(None, "*"), "*");
        assert_eq!(resolve_field(None, "name"), "`name`");
        assert_eq!(resolve_field(None, "count(y) AS c1"), "count(y) AS c1");
        assert_eq!(resolve_field(None, "`raw`"), "`raw`");
    }

    #[test]
    fn resolves_fields_with_prefix() {
        assert_eq!(resolve_field(Some("`A`"), "*"), "`A`.*");
        assert_eq!(resolve_field(Some("`A`"), "name"), "`A`.`name`");
        assert_eq!(resolve_field(Some("`A`"), "`name`"), "`A`.`name`");
        assert_eq!(
            resolve_field(Some("`A`"), "count(y) as c1"),
            "count(y) as c1"
        );
    }

    #[test]
    fn unquotes_directions() {
        assert_eq!(
            unquote_directions("ORDER BY `a` 'DESC', `b` 'asc'"),
            "ORDER BY `a` DESC, `b` ASC"
        );
        assert_eq!(unquote_directions("'descendant'"), "'descendant'");
    }

    #[test]
    fn join_multi_skips_blanks() {
        assert_eq!(join_multi(&["a", "", "  ", "b"]), "a b");
    }

    #[test]
    fn limit_encoding() {
        let qb = QueryBuilder::new();
        assert_eq!(qb.limit_sql(), "");
        let qb = QueryBuilder::new().limit(10);
        assert_eq!(qb.limit_sql(), "LIMIT 10");
        let qb = QueryBuilder::new().offset(5).limit(10);
        assert_eq!(qb.limit_sql(), "LIMIT 5,10");
        let qb = QueryBuilder::new().offset(5);
        assert_eq!(qb.limit_sql(), "LIMIT 5,18446744073709551615");
    }
}
