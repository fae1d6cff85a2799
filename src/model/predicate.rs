//! Predicate trees for `where` and `having`.
//!
//! A predicate is an ordered map of conditions. The JSON form is parsed by
//! [`Predicate::from_json`]; Rust callers can build the same tree with the
//! helper methods.

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::query::SubQuery;
use crate::error::{QueryError, QueryResult};

/// An ordered set of conditions, joined by the enclosing logic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: IndexMap<String, Condition>,
}

/// One entry of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
    Not(Box<Predicate>),
    /// `exists: { relation: subquery | true }`
    Exists(IndexMap<String, ExistsQuery>),
    /// `field: literal`
    Equals(Value),
    /// `field: { operator: operand, ... }`
    Filter(IndexMap<Operator, Operand>),
}

/// Body of an `exists` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ExistsQuery {
    /// `true`: only the relation's correlation applies.
    Any,
    Query(SubQuery),
}

impl ExistsQuery {
    pub fn to_subquery(&self) -> SubQuery {
        match self {
            ExistsQuery::Any => SubQuery::default(),
            ExistsQuery::Query(query) => query.clone(),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Like,
    NotLike,
    ILike,
    NotILike,
    In,
    NotIn,
    Between,
    NotBetween,
    Is,
}

impl Operator {
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::ILike => "ILIKE",
            Operator::NotILike => "NOT ILIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::Is => "IS",
        }
    }

    /// Key used in descriptors.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::LessThan => "lessThan",
            Operator::GreaterThan => "greaterThan",
            Operator::LessThanOrEqual => "lessThanOrEqual",
            Operator::GreaterThanOrEqual => "greaterThanOrEqual",
            Operator::Like => "like",
            Operator::NotLike => "notLike",
            Operator::ILike => "iLike",
            Operator::NotILike => "notILike",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Between => "between",
            Operator::NotBetween => "notBetween",
            Operator::Is => "is",
        }
    }

    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Operator::Equals),
            "notEquals" => Ok(Operator::NotEquals),
            "lessThan" => Ok(Operator::LessThan),
            "greaterThan" => Ok(Operator::GreaterThan),
            "lessThanOrEqual" => Ok(Operator::LessThanOrEqual),
            "greaterThanOrEqual" => Ok(Operator::GreaterThanOrEqual),
            "like" => Ok(Operator::Like),
            "notLike" => Ok(Operator::NotLike),
            "iLike" => Ok(Operator::ILike),
            "notILike" => Ok(Operator::NotILike),
            "in" => Ok(Operator::In),
            "notIn" => Ok(Operator::NotIn),
            "between" => Ok(Operator::Between),
            "notBetween" => Ok(Operator::NotBetween),
            "is" => Ok(Operator::Is),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }
}

/// `some` / `all` subquery quantifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    All,
}

impl Quantifier {
    pub fn sql(&self) -> &'static str {
        match self {
            Quantifier::Some => "SOME",
            Quantifier::All => "ALL",
        }
    }
}

/// Right-hand side of an operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    List(Vec<Value>),
    /// `in: { relation: subquery }`
    SubQueries(IndexMap<String, SubQuery>),
    /// `op: { some: {...}, all: {...} }`, in descriptor order.
    Quantified(Vec<(Quantifier, IndexMap<String, SubQuery>)>),
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Operand::List(items),
            other => Operand::Value(other),
        }
    }
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Condition)> {
        self.conditions.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Condition> {
        self.conditions.get(key)
    }

    /// Insert a condition. An existing key keeps its position and takes the
    /// new condition.
    pub fn insert(&mut self, key: impl Into<String>, condition: Condition) {
        self.conditions.insert(key.into(), condition);
    }

    /// Merge another predicate's entries into this one.
    pub fn merge(&mut self, other: &Predicate) {
        for (key, condition) in &other.conditions {
            self.conditions.insert(key.clone(), condition.clone());
        }
    }

    /// `field = value`
    pub fn equals(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, Condition::Equals(value.into()));
        self
    }

    /// `field <op> operand`. Repeated calls on one field accumulate.
    pub fn op(mut self, field: &str, operator: Operator, operand: impl Into<Operand>) -> Self {
        let operand = operand.into();
        match self.conditions.get_mut(field) {
            Some(Condition::Filter(ops)) => {
                ops.insert(operator, operand);
            }
            _ => {
                let mut ops = IndexMap::new();
                ops.insert(operator, operand);
                self.insert(field, Condition::Filter(ops));
            }
        }
        self
    }

    pub fn or(mut self, branches: Vec<Predicate>) -> Self {
        self.insert("OR", Condition::Or(branches));
        self
    }

    pub fn and(mut self, branches: Vec<Predicate>) -> Self {
        self.insert("AND", Condition::And(branches));
        self
    }

    pub fn not(mut self, inner: Predicate) -> Self {
        self.insert("NOT", Condition::Not(Box::new(inner)));
        self
    }

    pub fn exists(mut self, relation: &str, query: ExistsQuery) -> Self {
        match self.conditions.get_mut("exists") {
            Some(Condition::Exists(entries)) => {
                entries.insert(relation.to_string(), query);
            }
            _ => {
                let mut entries = IndexMap::new();
                entries.insert(relation.to_string(), query);
                self.insert("exists", Condition::Exists(entries));
            }
        }
        self
    }

    /// Parse a predicate from its JSON form.
    pub fn from_json(value: Value) -> QueryResult<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(QueryError::validation("A where condition must be an object")),
        }
    }

    fn from_map(map: Map<String, Value>) -> QueryResult<Self> {
        let mut predicate = Predicate::new();
        for (key, value) in map {
            let condition = match key.as_str() {
                "OR" => Condition::Or(parse_branches(&key, value)?),
                "AND" => Condition::And(parse_branches(&key, value)?),
                "NOT" => Condition::Not(Box::new(Predicate::from_json(value)?)),
                "exists" => Condition::Exists(parse_exists(value)?),
                _ => match value {
                    Value::Object(ops) => Condition::Filter(parse_filter(ops)?),
                    literal => Condition::Equals(literal),
                },
            };
            predicate.conditions.insert(key, condition);
        }
        Ok(predicate)
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Predicate::from_json(value).map_err(de::Error::custom)
    }
}

fn parse_branches(operator: &str, value: Value) -> QueryResult<Vec<Predicate>> {
    match value {
        Value::Array(items) => items.into_iter().map(Predicate::from_json).collect(),
        _ => Err(QueryError::malformed(operator, "an array of conditions")),
    }
}

fn parse_exists(value: Value) -> QueryResult<IndexMap<String, ExistsQuery>> {
    let Value::Object(entries) = value else {
        return Err(QueryError::malformed("exists", "a map of relations"));
    };
    entries
        .into_iter()
        .map(|(relation, body)| {
            let query = match body {
                Value::Bool(true) => ExistsQuery::Any,
                Value::Object(_) => ExistsQuery::Query(serde_json::from_value(body)?),
                _ => return Err(QueryError::malformed("exists", "a subquery or `true`")),
            };
            Ok((relation, query))
        })
        .collect()
}

fn parse_filter(ops: Map<String, Value>) -> QueryResult<IndexMap<Operator, Operand>> {
    ops.into_iter()
        .map(|(name, value)| {
            let operator: Operator = name.parse()?;
            let operand = parse_operand(operator, value)?;
            Ok((operator, operand))
        })
        .collect()
}

fn parse_operand(operator: Operator, value: Value) -> QueryResult<Operand> {
    if operator.is_membership() {
        return match value {
            Value::Array(items) => Ok(Operand::List(items)),
            Value::Object(map) => Ok(Operand::SubQueries(parse_subqueries(map)?)),
            _ => Err(QueryError::malformed(
                operator.name(),
                "an array or a map of subqueries",
            )),
        };
    }
    if operator.is_range() {
        return match value {
            Value::Array(items) => Ok(Operand::List(items)),
            _ => Err(QueryError::malformed(operator.name(), "an array of two values")),
        };
    }
    match value {
        Value::Object(map) => {
            let mut quantified = Vec::with_capacity(map.len());
            for (key, queries) in map {
                let quantifier = match key.as_str() {
                    "some" => Quantifier::Some,
                    "all" => Quantifier::All,
                    _ => {
                        return Err(QueryError::malformed(
                            operator.name(),
                            "a value or a some/all subquery map",
                        ))
                    }
                };
                let Value::Object(queries) = queries else {
                    return Err(QueryError::malformed(operator.name(), "a map of subqueries"));
                };
                quantified.push((quantifier, parse_subqueries(queries)?));
            }
            Ok(Operand::Quantified(quantified))
        }
        other => Ok(Operand::from(other)),
    }
}

fn parse_subqueries(map: Map<String, Value>) -> QueryResult<IndexMap<String, SubQuery>> {
    map.into_iter()
        .map(|(relation, body)| Ok((relation, serde_json::from_value(body)?)))
        .collect()
}
