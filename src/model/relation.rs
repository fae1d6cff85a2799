//! Relation catalog types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Relation catalog: relation name → relation.
///
/// Resolved by name at compile time; insertion order is preserved so that
/// catalogs read from JSON or TOML behave deterministically.
pub type Relations = IndexMap<String, Relation>;

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationType {
    /// Nested as a single JSON object.
    #[default]
    One,
    /// Nested as a JSON array of objects.
    Many,
}

/// Bridge table for a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Junction {
    pub table: String,
    /// Junction column pointing at the relation's target table.
    pub field: String,
    /// Junction column pointing at the relation's reference table.
    #[serde(alias = "reference_field")]
    pub reference_field: String,
}

/// A foreign-key link between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(rename = "type", default)]
    pub kind: RelationType,
    /// Target table.
    pub table: String,
    /// Column of the target table.
    pub field: String,
    /// Table (or alias) the relation hangs off.
    #[serde(alias = "reference_table")]
    pub reference_table: String,
    #[serde(alias = "reference_field")]
    pub reference_field: String,
    #[serde(default, alias = "table_alias", skip_serializing_if = "Option::is_none")]
    pub table_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction: Option<Junction>,
}

impl Relation {
    /// Create a direct relation.
    pub fn new(
        kind: RelationType,
        table: impl Into<String>,
        field: impl Into<String>,
        reference_table: impl Into<String>,
        reference_field: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            field: field.into(),
            reference_table: reference_table.into(),
            reference_field: reference_field.into(),
            table_alias: None,
            junction: None,
        }
    }

    pub fn one(
        table: impl Into<String>,
        field: impl Into<String>,
        reference_table: impl Into<String>,
        reference_field: impl Into<String>,
    ) -> Self {
        Self::new(RelationType::One, table, field, reference_table, reference_field)
    }

    pub fn many(
        table: impl Into<String>,
        field: impl Into<String>,
        reference_table: impl Into<String>,
        reference_field: impl Into<String>,
    ) -> Self {
        Self::new(RelationType::Many, table, field, reference_table, reference_field)
    }

    /// Set the alias the target table is joined under.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = Some(alias.into());
        self
    }

    /// Route the relation through a junction table.
    pub fn through(
        mut self,
        table: impl Into<String>,
        field: impl Into<String>,
        reference_field: impl Into<String>,
    ) -> Self {
        self.junction = Some(Junction {
            table: table.into(),
            field: field.into(),
            reference_field: reference_field.into(),
        });
        self
    }

    /// Name the target table is addressed by: its alias, or the table itself.
    pub fn target_name(&self) -> &str {
        self.table_alias.as_deref().unwrap_or(&self.table)
    }

    pub fn is_many(&self) -> bool {
        self.kind == RelationType::Many
    }
}

/// Look up a relation by name.
pub fn resolve<'a>(relations: &'a Relations, name: &str) -> QueryResult<&'a Relation> {
    relations
        .get(name)
        .ok_or_else(|| QueryError::RelationNotFound(name.to_string()))
}
