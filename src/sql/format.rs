//! Identifier and literal formatting.
//!
//! Every identifier and literal that ends up in generated SQL passes through
//! [`quote_identifier`] or [`format_value`]. Nothing else in the crate embeds
//! caller-controlled text directly.
//!
//! Both functions let "special syntax" through untouched so that
//! placeholders and hand-written expressions survive formatting:
//!
//! - `quote_identifier("artist.name")` → `"artist"."name"`
//! - `quote_identifier("COUNT(price)")` → `COUNT(price)`
//! - `format_value(&json!("O'Reilly"))` → `'O''Reilly'`
//! - `format_value(&json!("$1"))` → `$1`

use regex::Regex;
use serde_json::{Number, Value};
use std::sync::LazyLock;

use crate::error::{QueryError, QueryResult};

/// Prefix that marks a string as raw SQL. Produced by [`raw`].
pub const RAW_MARKER: &str = "\u{0}raw\u{0}";

/// Placeholder families that are never quoted as identifiers:
/// `?`, `??`, `:name`, `:name:`, `:name::`, `${...}`, `$name`, `$1`.
static IDENTIFIER_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\?\??|:\w+(?::{1,2})?|\$\{[^}]*\}|\$\w+)$").unwrap()
});

/// Placeholder and keyword families that are never quoted as values.
static VALUE_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\?\??|:\w+(?::{1,2})?|\$\{[^}]*\}|\$\w+|NULL|NOT\s+NULL)$").unwrap()
});

// =============================================================================
// Raw SQL
// =============================================================================

/// Mark text as raw SQL.
///
/// Raw text is emitted verbatim by both [`quote_identifier`] and
/// [`format_value`].
///
/// # Security Warning
///
/// **Never pass user input to this function.** Raw SQL is not sanitized.
pub fn raw(sql: impl AsRef<str>) -> String {
    format!("{}{}", RAW_MARKER, sql.as_ref())
}

/// Strip the raw marker, if present.
pub fn strip_raw(s: &str) -> Option<&str> {
    s.strip_prefix(RAW_MARKER)
}

/// Build a raw function call, quoting each argument as an identifier.
///
/// `pg_fn("count", &["*"])` → `COUNT(*)`, `pg_fn("lower", &["users.email"])`
/// → `LOWER("users"."email")`.
pub fn pg_fn(name: &str, args: &[&str]) -> String {
    let args: Vec<String> = args.iter().map(|a| quote_identifier(a)).collect();
    raw(format!("{}({})", name.to_uppercase(), args.join(", ")))
}

// =============================================================================
// Identifiers
// =============================================================================

/// Quote a (possibly dotted) identifier with double quotes.
pub fn quote_identifier(ident: &str) -> String {
    if let Some(sql) = strip_raw(ident) {
        return sql.to_string();
    }
    if ident.trim().is_empty()
        || ident == "*"
        || is_numeric(ident)
        || is_special_identifier(ident)
    {
        return ident.to_string();
    }
    ident
        .split('.')
        .map(|part| {
            if part == "*" {
                part.to_string()
            } else {
                quote_double(part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote an identifier supplied as JSON.
///
/// Strings go through [`quote_identifier`], arrays become a comma-separated
/// identifier list, and scalars are rendered unchanged.
pub fn quote_json_identifier(value: &Value) -> String {
    match value {
        Value::String(s) => quote_identifier(s),
        Value::Null => "NULL".into(),
        Value::Bool(b) => format_bool(*b).into(),
        Value::Number(n) => format_number(n),
        Value::Array(items) => items
            .iter()
            .map(quote_json_identifier)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => quote_double(&value.to_string()),
    }
}

/// `"table"."field" = "reference_table"."reference_field"`
pub fn connect(table: &str, field: &str, reference_table: &str, reference_field: &str) -> String {
    format!(
        "{} = {}",
        quote_identifier(&format!("{}.{}", table, field)),
        quote_identifier(&format!("{}.{}", reference_table, reference_field))
    )
}

/// `"table"."column"` from trimmed, non-empty parts.
pub fn concat(table: &str, column: &str) -> QueryResult<String> {
    let table = table.trim();
    let column = column.trim();
    if table.is_empty() || column.is_empty() {
        return Err(QueryError::validation(
            "Table and column names should not be empty",
        ));
    }
    Ok(format!("{}.{}", quote_double(table), quote_double(column)))
}

/// `"name"` or `"name" AS "alias"`.
pub fn table_ref(table: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("{} AS {}", quote_identifier(table), quote_identifier(alias)),
        None => quote_identifier(table),
    }
}

fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn is_special_identifier(ident: &str) -> bool {
    ident.contains(['(', ')']) || IDENTIFIER_SYNTAX.is_match(ident)
}

/// Numeric text is left unquoted so `SELECT 1` works where a column is expected.
fn is_numeric(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() {
        return false;
    }
    if matches!(t, "Infinity" | "+Infinity" | "-Infinity") {
        return true;
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).is_ok();
        }
    }
    !t.contains(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
        && t.parse::<f64>().is_ok_and(f64::is_finite)
}

// =============================================================================
// Literals
// =============================================================================

/// Format a JSON value as a SQL literal.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Bool(b) => format_bool(*b).into(),
        Value::Number(n) => format_number(n),
        Value::String(s) => format_text(s),
        Value::Array(items) => format!(
            "({})",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(_) => quote_string(&value.to_string()),
    }
}

/// Format text as a SQL literal, honoring raw markers and placeholders.
pub fn format_text(s: &str) -> String {
    if let Some(sql) = strip_raw(s) {
        return sql.to_string();
    }
    if VALUE_SYNTAX.is_match(s) {
        return s.to_string();
    }
    quote_string(s)
}

/// Single-quote a string, escaping its contents.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string_literal(s))
}

/// Double backslashes and single quotes.
pub fn escape_string_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "''")
}

fn format_bool(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => {
            let mut buffer = ryu::Buffer::new();
            buffer.format_finite(f).to_string()
        }
        _ => n.to_string(),
    }
}
