//! Join synthesis from catalog relations.
//!
//! Every fragment starts with a space so fragments can be concatenated
//! directly after a FROM source or another join.

use super::format::{connect, table_ref};
use super::token::{Token, TokenStream};
use crate::model::Relation;

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Right,
    Inner,
    Full,
    /// `LEFT JOIN LATERAL (<subquery>) ON TRUE`
    LeftLateral,
}

impl JoinKind {
    fn keyword(&self) -> Token {
        match self {
            JoinKind::Left | JoinKind::LeftLateral => Token::Left,
            JoinKind::Right => Token::Right,
            JoinKind::Inner => Token::Inner,
            JoinKind::Full => Token::Full,
        }
    }
}

/// Render the join for `relation`.
///
/// `inner` is only read for [`JoinKind::LeftLateral`]; a missing or empty
/// subquery yields an empty fragment.
pub fn join(kind: JoinKind, relation: &Relation, inner: Option<&str>) -> String {
    let mut ts = TokenStream::new();

    if kind == JoinKind::LeftLateral {
        let Some(inner) = inner.filter(|sql| !sql.is_empty()) else {
            return String::new();
        };
        ts.space()
            .push(Token::Left)
            .space()
            .push(Token::Join)
            .space()
            .push(Token::Lateral)
            .space()
            .lparen()
            .fragment(inner)
            .rparen()
            .space()
            .push(Token::On)
            .space()
            .push(Token::True);
        return ts.serialize();
    }

    let target = table_ref(&relation.table, relation.table_alias.as_deref());

    match &relation.junction {
        Some(junction) => {
            join_on(
                &mut ts,
                kind,
                table_ref(&junction.table, None),
                connect(
                    &junction.table,
                    &junction.reference_field,
                    &relation.reference_table,
                    &relation.reference_field,
                ),
            );
            join_on(
                &mut ts,
                kind,
                target,
                connect(
                    &junction.table,
                    &junction.field,
                    relation.target_name(),
                    &relation.field,
                ),
            );
        }
        None => {
            join_on(
                &mut ts,
                kind,
                target,
                connect(
                    relation.target_name(),
                    &relation.field,
                    &relation.reference_table,
                    &relation.reference_field,
                ),
            );
        }
    }

    ts.serialize()
}

/// FROM source for a relation read through its junction table:
/// `"junction" LEFT JOIN "target" ON <junction.field = target.field>`.
///
/// Returns `None` for direct relations.
pub fn junction_source(relation: &Relation) -> Option<String> {
    let junction = relation.junction.as_ref()?;
    let mut ts = TokenStream::new();
    ts.fragment(table_ref(&junction.table, None));
    join_on(
        &mut ts,
        JoinKind::Left,
        table_ref(&relation.table, relation.table_alias.as_deref()),
        connect(
            &junction.table,
            &junction.field,
            relation.target_name(),
            &relation.field,
        ),
    );
    Some(ts.serialize())
}

/// `<fk column> = <referenced column>` for a relation's correlated subquery.
///
/// Junction relations correlate through the junction's reference field.
pub fn correlation(relation: &Relation) -> String {
    match &relation.junction {
        Some(junction) => connect(
            &junction.table,
            &junction.reference_field,
            &relation.reference_table,
            &relation.reference_field,
        ),
        None => connect(
            relation.target_name(),
            &relation.field,
            &relation.reference_table,
            &relation.reference_field,
        ),
    }
}

fn join_on(ts: &mut TokenStream, kind: JoinKind, table: String, on: String) {
    ts.space()
        .push(kind.keyword())
        .space()
        .push(Token::Join)
        .space()
        .fragment(table)
        .space()
        .push(Token::On)
        .space()
        .fragment(on);
}
