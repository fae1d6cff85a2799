//! Query descriptor model.
//!
//! Descriptors arrive as JSON (or are built in Rust) and are consumed by the
//! compiler in [`crate::sql`]. Nothing here renders SQL.

pub mod predicate;
pub mod query;
pub mod relation;

pub use predicate::{Condition, ExistsQuery, Operand, Operator, Predicate, Quantifier};
pub use query::{Bound, Column, JoinQuery, Select, SelectQuery, SortDir, SubQuery};
pub use relation::{resolve, Junction, Relation, RelationType, Relations};
