//! Position remapping of token spans through one edit.

use crate::token::Token;
use crate::transaction::ChangeSet;

/// Maps every token through `changes`, dropping those whose span collapses.
///
/// Mapping is monotonic, so the output keeps the input order and never
/// introduces overlap between neighbours.
pub fn remap(tokens: &[Token], changes: &ChangeSet) -> Vec<Token> {
    tokens
        .iter()
        .filter_map(|token| {
            let span = token.span.map(changes);
            if span.is_empty() {
                tracing::trace!(id = %token.id, old = %token.span, "token collapsed");
                None
            } else {
                Some(Token {
                    span,
                    ..token.clone()
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::token::{Span, TokenId};
    use crate::transaction::Change;
    use std::sync::Arc;

    fn token(id: u64, from: usize, to: usize) -> Token {
        Token {
            id: TokenId(id),
            span: Span::new(from, to),
            entity: Arc::new(Entity::new(format!("Q{id}"), "Place", "x")),
        }
    }

    #[test]
    fn test_adjacent_tokens_stay_apart() {
        let tokens = vec![token(0, 0, 4), token(1, 4, 8)];
        let changes = ChangeSet::from_changes(8, [Change::insert(4, "--")]);
        let mapped = remap(&tokens, &changes);
        assert_eq!(mapped[0].span, Span::new(0, 4));
        assert_eq!(mapped[1].span, Span::new(6, 10));
    }

    #[test]
    fn test_ids_survive() {
        let tokens = vec![token(7, 2, 5)];
        let changes = ChangeSet::from_changes(5, [Change::delete(0..1)]);
        let mapped = remap(&tokens, &changes);
        assert_eq!(mapped[0].id, TokenId(7));
        assert_eq!(mapped[0].span, Span::new(1, 4));
    }

    #[test]
    fn test_multiple_changes_in_one_pass() {
        let tokens = vec![token(0, 2, 4), token(1, 6, 9), token(2, 10, 12)];
        let changes = ChangeSet::from_changes(
            12,
            [Change::insert(0, "ab"), Change::delete(6..9), Change::insert(12, "z")],
        );
        let mapped = remap(&tokens, &changes);
        let spans: Vec<Span> = mapped.iter().map(|t| t.span).collect();
        assert_eq!(spans, vec![Span::new(4, 6), Span::new(9, 11)]);
    }
}
