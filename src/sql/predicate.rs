//! Where/having predicate compilation.
//!
//! Conditions render in descriptor order. Logical groups that end up empty
//! contribute no text, so `{ "id": 1, "OR": [] }` compiles to `"id" = 1`.

use serde_json::Value;
use tracing::trace;

use super::clause::Append;
use super::expand::Compiler;
use super::format::{format_value, quote_identifier};
use super::join::{correlation, junction_source};
use super::token::Token;
use crate::error::{QueryError, QueryResult};
use crate::model::{resolve, Column, Condition, Operand, Operator, Predicate, Select, SubQuery};

/// Operator joining sibling conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    fn separator(&self) -> String {
        let keyword = match self {
            Logic::And => Token::And,
            Logic::Or => Token::Or,
        };
        format!(" {} ", keyword.serialize())
    }
}

impl Compiler<'_> {
    /// Compile a predicate with its entries ANDed together.
    pub fn filter(&self, predicate: &Predicate) -> QueryResult<String> {
        self.predicate(predicate, Logic::And)
    }

    /// Compile a predicate, joining its entries with `logic`.
    pub fn predicate(&self, predicate: &Predicate, logic: Logic) -> QueryResult<String> {
        let mut clauses = Vec::with_capacity(predicate.len());

        for (field, condition) in predicate.iter() {
            match condition {
                Condition::Or(branches) => self.group(branches, Logic::Or, &mut clauses)?,
                Condition::And(branches) => self.group(branches, Logic::And, &mut clauses)?,
                Condition::Not(inner) => {
                    let sql = self.predicate(inner, Logic::And)?;
                    if !sql.is_empty() {
                        clauses.push(format!("{}({})", Token::Not.serialize(), sql));
                    }
                }
                Condition::Exists(entries) => {
                    let mut exists = Vec::with_capacity(entries.len());
                    for (relation, query) in entries {
                        exists.push(self.subquery("EXISTS", relation, &query.to_subquery(), true)?);
                    }
                    if !exists.is_empty() {
                        clauses.push(exists.join(&Logic::And.separator()));
                    }
                }
                Condition::Equals(value) => {
                    clauses.push(format!("{} = {}", quote_identifier(field), format_value(value)));
                }
                Condition::Filter(operators) => {
                    for (operator, operand) in operators {
                        self.comparison(field, *operator, operand, &mut clauses)?;
                    }
                }
            }
        }

        Ok(clauses.join(&logic.separator()))
    }

    fn group(&self, branches: &[Predicate], logic: Logic, out: &mut Vec<String>) -> QueryResult<()> {
        let mut parts = Vec::with_capacity(branches.len());
        for branch in branches {
            let sql = self.predicate(branch, logic)?;
            if !sql.is_empty() {
                parts.push(sql);
            }
        }
        if !parts.is_empty() {
            out.push(format!("({})", parts.join(&logic.separator())));
        }
        Ok(())
    }

    fn comparison(
        &self,
        field: &str,
        operator: Operator,
        operand: &Operand,
        out: &mut Vec<String>,
    ) -> QueryResult<()> {
        let column = quote_identifier(field);
        let op = operator.sql();

        if operator.is_membership() {
            match operand {
                Operand::List(items) => out.push(format!("{column} {op} {}", format_list(items))),
                Operand::Value(Value::Array(items)) => {
                    out.push(format!("{column} {op} {}", format_list(items)))
                }
                Operand::SubQueries(queries) => {
                    for (relation, query) in queries {
                        out.push(format!("{column} {}", self.subquery(op, relation, query, false)?));
                    }
                }
                _ => {
                    return Err(QueryError::malformed(
                        operator.name(),
                        "an array or a map of subqueries",
                    ))
                }
            }
            return Ok(());
        }

        if operator.is_range() {
            let items: &[Value] = match operand {
                Operand::List(items) => items.as_slice(),
                Operand::Value(Value::Array(items)) => items.as_slice(),
                _ => &[],
            };
            let [low, high] = items else {
                return Err(QueryError::malformed(operator.name(), "an array of two values"));
            };
            out.push(format!(
                "{column} {op} {} {} {}",
                format_value(low),
                Token::And.serialize(),
                format_value(high)
            ));
            return Ok(());
        }

        match operand {
            Operand::Value(value) => out.push(format!("{column} {op} {}", format_value(value))),
            Operand::List(items) => out.push(format!("{column} {op} {}", format_list(items))),
            Operand::Quantified(groups) => {
                for (quantifier, queries) in groups {
                    for (relation, query) in queries {
                        let sub = self.subquery(quantifier.sql(), relation, query, false)?;
                        out.push(format!("{column} {op} {sub}"));
                    }
                }
            }
            Operand::SubQueries(_) => {
                return Err(QueryError::malformed(
                    operator.name(),
                    "a value or a some/all subquery map",
                ))
            }
        }
        Ok(())
    }

    /// `KIND(<subquery>)`, correlated to the enclosing table through the
    /// relation unless the subquery names its own table.
    fn subquery(
        &self,
        kind: &str,
        relation_key: &str,
        sub: &SubQuery,
        exists: bool,
    ) -> QueryResult<String> {
        let mut query = sub.to_select_query();
        if exists {
            let mut one = Select::new();
            one.insert("1".into(), Column::Reuse);
            query.select = one;
        }

        if let Some(table) = &sub.table {
            trace!(table = %table, kind, "compiling uncorrelated subquery");
            let sql = self.build_select(table, &query, None, None)?;
            return Ok(format!("{kind}({sql})"));
        }

        let relation = resolve(self.relations(), relation_key)?;
        trace!(relation = %relation_key, kind, "compiling correlated subquery");
        let append = Append::filter(correlation(relation));

        match junction_source(relation) {
            Some(source) => {
                let sql = self.select_from(&source, &query, Some(&append))?;
                Ok(format!("{kind}({sql} )"))
            }
            None => {
                let sql = self.build_select(
                    &relation.table,
                    &query,
                    relation.table_alias.as_deref(),
                    Some(&append),
                )?;
                Ok(format!("{kind}({sql})"))
            }
        }
    }
}

fn format_list(items: &[Value]) -> String {
    format!(
        "({})",
        items.iter().map(format_value).collect::<Vec<_>>().join(", ")
    )
}
