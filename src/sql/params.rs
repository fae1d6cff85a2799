//! Named-parameter binding.
//!
//! Rewrites named placeholders in finished SQL text:
//!
//! | Placeholder | Replacement                                  | Collected |
//! |-------------|----------------------------------------------|-----------|
//! | `@name`     | next `$n`                                    | yes       |
//! | `@@name`    | the value as a quoted identifier             | no        |
//! | `@@@name`   | the value verbatim                           | no        |
//!
//! A placeholder may be wrapped in matching `'` or `"` quotes; the quotes
//! are consumed with it. Placeholders glued to a word character, `.` or
//! `@` (such as `user@example.com`) are left alone. A quoted `@@name` may
//! sit next to `.`, so `"@@schema"."@@table"` binds both parts.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

use super::format::quote_json_identifier;
use crate::error::{QueryError, QueryResult};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(['"]?)(@+)(\w+)(['"]?)"#).unwrap());

/// SQL text with positional parameters and their values, in `$n` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundQuery {
    pub sql: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sigil {
    Value,
    Identifier,
    Raw,
}

impl Sigil {
    fn from_len(len: usize) -> Option<Self> {
        match len {
            1 => Some(Sigil::Value),
            2 => Some(Sigil::Identifier),
            3 => Some(Sigil::Raw),
            _ => None,
        }
    }
}

/// Replace named placeholders in `sql` with positional parameters.
///
/// Every `@name` occurrence binds a fresh `$n`, so a name used twice yields
/// two parameters with the same value.
pub fn bind_params(sql: &str, values: &Map<String, Value>) -> QueryResult<BoundQuery> {
    if sql.trim().is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let mut out = String::with_capacity(sql.len());
    let mut bound = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(sql) {
        let (Some(open), Some(sigils), Some(name), Some(close)) =
            (caps.get(1), caps.get(2), caps.get(3), caps.get(4))
        else {
            continue;
        };
        let Some(sigil) = Sigil::from_len(sigils.as_str().len()) else {
            continue;
        };

        let quoted = !open.as_str().is_empty() && open.as_str() == close.as_str();
        let qualified = quoted && sigil == Sigil::Identifier;
        let span = if quoted && is_isolated(sql, open.start(), close.end(), qualified) {
            (open.start(), close.end())
        } else if is_isolated(sql, sigils.start(), name.end(), false) {
            (sigils.start(), name.end())
        } else {
            continue;
        };

        let key = name.as_str();
        let value = values
            .get(key)
            .ok_or_else(|| QueryError::MissingParameterValue(key.to_string()))?;

        out.push_str(&sql[last..span.0]);
        match sigil {
            Sigil::Value => {
                bound.push(value.clone());
                out.push('$');
                out.push_str(&bound.len().to_string());
            }
            Sigil::Identifier => out.push_str(&quote_json_identifier(value)),
            Sigil::Raw => match value {
                Value::String(text) => out.push_str(text),
                other => out.push_str(&other.to_string()),
            },
        }
        last = span.1;
    }
    out.push_str(&sql[last..]);

    debug!(values = bound.len(), "bound query parameters");
    Ok(BoundQuery {
        sql: out,
        values: bound,
    })
}

/// The span is not glued to a word character, `.` or `@` on either side.
///
/// With `dotted`, a neighbouring `.` is allowed so quoted identifier
/// placeholders can be qualified, as in `"@@schema"."@@table"`.
fn is_isolated(sql: &str, start: usize, end: usize, dotted: bool) -> bool {
    let glued = |c: char| is_glue(c) && !(dotted && c == '.');
    let before = sql[..start].chars().next_back();
    let after = sql[end..].chars().next();
    !before.is_some_and(glued) && !after.is_some_and(glued)
}

fn is_glue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '@'
}
