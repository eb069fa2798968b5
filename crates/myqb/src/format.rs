//! Template formatting: placeholder rewriting for raw SQL fragments.
//!
//! Two token families with identical semantics:
//!
//! - Positional, consumed left to right: `?` (escaped literal), `??`
//!   (escaped identifier), `???` (raw string or parenthesized subquery).
//! - Named: `:name`, `::name`, `:::name` resolved by lookup; a name absent
//!   from the supplied values is left in the template verbatim, which
//!   permits deferred expansion of the remaining tokens.
//!
//! Both entry points are pure left-to-right scans producing a new string;
//! positional values are consumed through an explicit cursor over an
//! immutable slice.

use std::sync::Arc;

use crate::builder::Buildable;
use crate::error::{QbError, QbResult};
use crate::escape::{escape_id, escape_value, raw_text};
use crate::value::Value;

/// A value a placeholder can consume: a plain literal or a subquery.
///
/// Subqueries are held behind `Arc` so templates stay clone-friendly.
#[derive(Clone)]
pub enum Param {
    /// A literal value, rendered through the escaping provider.
    Value(Value),
    /// A nested statement; legal only for raw placeholders, where its
    /// `build()` output is inlined in parentheses.
    Subquery(Arc<dyn Buildable + Send + Sync>),
}

impl Param {
    /// Wrap a nested statement as a placeholder value.
    pub fn subquery(query: impl Buildable + Send + Sync + 'static) -> Self {
        Param::Subquery(Arc::new(query))
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Param::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Param::Subquery(_) => f.debug_tuple("Subquery").field(&"<dyn Buildable>").finish(),
        }
    }
}

macro_rules! impl_param_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Param {
                fn from(v: $t) -> Self {
                    Param::Value(v.into())
                }
            }
        )*
    };
}

impl_param_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, &str, String);

impl From<Value> for Param {
    fn from(v: Value) -> Self {
        Param::Value(v)
    }
}

/// The values attached to a template.
#[derive(Clone, Debug, Default)]
pub enum TemplateValues {
    /// No values; the template is used as-is.
    #[default]
    None,
    /// Positional values consumed by `?` tokens in order.
    Positional(Vec<Param>),
    /// Named values looked up by `:name` tokens.
    Named(Vec<(String, Param)>),
}

impl From<Vec<Param>> for TemplateValues {
    fn from(v: Vec<Param>) -> Self {
        TemplateValues::Positional(v)
    }
}

impl From<Vec<(String, Param)>> for TemplateValues {
    fn from(v: Vec<(String, Param)>) -> Self {
        TemplateValues::Named(v)
    }
}

/// A raw SQL fragment plus the values for its placeholders.
#[derive(Clone, Debug, Default)]
pub struct Template {
    pub(crate) text: String,
    pub(crate) values: TemplateValues,
}

impl Template {
    /// Run the formatter and return the rewritten fragment.
    pub fn format(&self) -> QbResult<String> {
        match &self.values {
            TemplateValues::None => Ok(self.text.clone()),
            TemplateValues::Positional(values) => format_positional(&self.text, values),
            TemplateValues::Named(values) => format_named(&self.text, values, false),
        }
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template {
            text: text.to_string(),
            values: TemplateValues::None,
        }
    }
}

impl From<String> for Template {
    fn from(text: String) -> Self {
        Template {
            text,
            values: TemplateValues::None,
        }
    }
}

impl<S: Into<String>> From<(S, Vec<Param>)> for Template {
    fn from((text, values): (S, Vec<Param>)) -> Self {
        Template {
            text: text.into(),
            values: TemplateValues::Positional(values),
        }
    }
}

impl<S: Into<String>> From<(S, Vec<(String, Param)>)> for Template {
    fn from((text, values): (S, Vec<(String, Param)>)) -> Self {
        Template {
            text: text.into(),
            values: TemplateValues::Named(values),
        }
    }
}

/// Format a template with positional or named values.
///
/// # Example
/// ```ignore
/// use myqb::{args, format};
///
/// let sql = format("a=? AND b=?", args![1, "x"])?;
/// assert_eq!(sql, "a=1 AND b='x'");
/// ```
pub fn format(template: &str, values: impl Into<TemplateValues>) -> QbResult<String> {
    Template {
        text: template.to_string(),
        values: values.into(),
    }
    .format()
}

/// Build a positional (`args![1, "x"]`) or named (`args!{"a" => 1}`) value
/// list for a template.
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Param>::new()
    };
    ($($key:literal => $val:expr),+ $(,)?) => {
        ::std::vec![$(($key.to_string(), $crate::Param::from($val))),+]
    };
    ($($val:expr),+ $(,)?) => {
        ::std::vec![$($crate::Param::from($val)),+]
    };
}

/// Render one consuming token (`run` is the token length, 1..=3).
fn render_token(run: usize, param: &Param) -> QbResult<String> {
    match run {
        1 => match param {
            Param::Value(v) => Ok(escape_value(v)),
            Param::Subquery(_) => Err(QbError::format(
                "value placeholder '?' cannot take a subquery, use '???'",
            )),
        },
        2 => match param {
            Param::Value(Value::Text(name)) => Ok(escape_id(name)),
            Param::Value(other) => Err(QbError::format(format!(
                "identifier placeholder '??' requires a string, got {}",
                other.type_name()
            ))),
            Param::Subquery(_) => Err(QbError::format(
                "identifier placeholder '??' cannot take a subquery",
            )),
        },
        _ => match param {
            Param::Value(Value::Text(sql)) => Ok(sql.clone()),
            Param::Subquery(query) => Ok(format!("({})", query.build()?)),
            Param::Value(other) => Err(QbError::format(format!(
                "raw placeholder '???' requires a string or subquery, got {}",
                other.type_name()
            ))),
        },
    }
}

/// Rewrite `?` / `??` / `???` tokens, consuming the next unused value per
/// token. Tokens beyond the last value are left untouched.
pub(crate) fn format_positional(template: &str, values: &[Param]) -> QbResult<String> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '?' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let mut run = 1;
        while run < 3 && i + run < chars.len() && chars[i + run] == '?' {
            run += 1;
        }
        if cursor < values.len() {
            out.push_str(&render_token(run, &values[cursor])?);
            cursor += 1;
        } else {
            for _ in 0..run {
                out.push('?');
            }
        }
        i += run;
    }
    Ok(out)
}

/// Rewrite `:name` / `::name` / `:::name` tokens by lookup. Unknown names
/// pass through verbatim. With `raw` set, every resolved value is
/// substituted as plain text regardless of token length (used for the
/// custom-statement macro expansion).
pub(crate) fn format_named(
    template: &str,
    values: &[(String, Param)],
    raw: bool,
) -> QbResult<String> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != ':' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let mut colons = 1;
        while colons < 3 && i + colons < chars.len() && chars[i + colons] == ':' {
            colons += 1;
        }
        let mut end = i + colons;
        while end < chars.len() && is_name_char(chars[end]) {
            end += 1;
        }
        if end == i + colons {
            // bare colon run, not a token
            for _ in 0..colons {
                out.push(':');
            }
            i += colons;
            continue;
        }
        let name: String = chars[i + colons..end].iter().collect();
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, param)) if raw => match param {
                Param::Value(v) => out.push_str(&raw_text(v)),
                Param::Subquery(query) => out.push_str(&format!("({})", query.build()?)),
            },
            Some((_, param)) => out.push_str(&render_token(colons, param)?),
            None => {
                let token: String = chars[i..end].iter().collect();
                out.push_str(&token);
            }
        }
        i = end;
    }
    Ok(out)
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}
