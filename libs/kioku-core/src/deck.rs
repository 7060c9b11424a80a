//! Static deck content parsing.
//!
//! Chapters ship as immutable JSON: a catalog of deck metadata plus one
//! card file per chapter. The session and queue assembler never mutate
//! parsed content.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::DeckError;
use crate::types::CardContent;

/// Catalog entry describing one chapter deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckInfo {
    pub id: String,
    pub title: String,
    pub total_cards: usize,
}

/// Parse the deck catalog (`deck-info` JSON).
pub fn parse_catalog(json: &str) -> Result<Vec<DeckInfo>, DeckError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse one chapter's card file.
///
/// Rejects empty decks, blank ids, and duplicate ids so downstream code can
/// rely on ids being unique within a chapter.
pub fn parse_deck(json: &str) -> Result<Vec<CardContent>, DeckError> {
    let cards: Vec<CardContent> = serde_json::from_str(json)?;
    if cards.is_empty() {
        return Err(DeckError::EmptyDeck);
    }

    let mut seen = HashSet::new();
    for (index, card) in cards.iter().enumerate() {
        if card.id.trim().is_empty() {
            return Err(DeckError::BlankCardId { index });
        }
        if !seen.insert(card.id.as_str()) {
            return Err(DeckError::DuplicateCardId { id: card.id.clone() });
        }
    }

    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_chapter_cards() {
        let json = r#"[
            {"id": "k-01", "prompt": "水", "phonetic": "mizu", "meaning": "water"},
            {"id": "k-02", "prompt": "火", "phonetic": "hi", "meaning": "fire"}
        ]"#;
        let cards = parse_deck(json).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "k-01");
        assert_eq!(cards[1].meaning, "fire");
    }

    #[test]
    fn rejects_empty_deck() {
        assert!(matches!(parse_deck("[]"), Err(DeckError::EmptyDeck)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"[
            {"id": "k-01", "prompt": "水", "phonetic": "mizu", "meaning": "water"},
            {"id": "k-01", "prompt": "火", "phonetic": "hi", "meaning": "fire"}
        ]"#;
        assert!(matches!(
            parse_deck(json),
            Err(DeckError::DuplicateCardId { id }) if id == "k-01"
        ));
    }

    #[test]
    fn rejects_blank_id() {
        let json = r#"[{"id": " ", "prompt": "水", "phonetic": "mizu", "meaning": "water"}]"#;
        assert!(matches!(parse_deck(json), Err(DeckError::BlankCardId { index: 0 })));
    }

    #[test]
    fn parses_catalog() {
        let json = r#"[
            {"id": "chapter-6", "title": "Chapter 6", "totalCards": 58},
            {"id": "chapter-7", "title": "Chapter 7", "totalCards": 41}
        ]"#;
        let catalog = parse_catalog(json).unwrap();
        assert_eq!(catalog[0].total_cards, 58);
        assert_eq!(catalog[1].id, "chapter-7");
    }
}
