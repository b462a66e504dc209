/// The canonical card store.
///
/// Owns every `Card` in the open project. All other components refer
/// to cards through `CardId` handles into this store; the sorting
/// engine never clones a card and never writes `sorted_count` itself.
/// The mark operations here are the only writers.

use std::collections::HashMap;

use super::data::{Card, CardId};

#[derive(Debug, Default, Clone)]
pub struct Collection {
    cards: Vec<Card>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the store from imported cards, merging duplicate rows.
    ///
    /// Rows sharing a stable identifier collapse into one card with
    /// their quantities summed, keeping the first row's metadata.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        let mut merged: Vec<Card> = Vec::with_capacity(cards.len());
        let mut index_by_id: HashMap<String, CardId> = HashMap::new();

        for card in cards {
            match index_by_id.get(&card.scryfall_id) {
                Some(&id) => {
                    merged[id].quantity += card.quantity;
                    merged[id].sorted_count += card.sorted_count;
                }
                None => {
                    index_by_id.insert(card.scryfall_id.clone(), merged.len());
                    merged.push(card);
                }
            }
        }

        // Progress never exceeds ownership, even after a merge
        for card in &mut merged {
            card.sorted_count = card.sorted_count.min(card.quantity);
        }

        Collection { cards: merged }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Number of distinct cards
    pub fn unique_count(&self) -> usize {
        self.cards.len()
    }

    /// Total number of physical copies
    pub fn total_quantity(&self) -> u32 {
        self.cards.iter().map(|c| c.quantity).sum()
    }

    /// Copies not yet sorted, across the whole collection
    pub fn total_unsorted(&self) -> u32 {
        self.cards.iter().map(|c| c.unsorted_quantity()).sum()
    }

    pub fn card(&self, id: CardId) -> &Card {
        &self.cards[id]
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Every card handle, in import order
    pub fn ids(&self) -> Vec<CardId> {
        (0..self.cards.len()).collect()
    }

    /// Mark every card in `ids` fully sorted, or reset it to unsorted.
    ///
    /// Any group tree built before this call holds stale counts and
    /// must be regenerated before its counts are read again.
    pub fn mark_sorted(&mut self, ids: &[CardId], sorted: bool) {
        for &id in ids {
            let card = &mut self.cards[id];
            card.sorted_count = if sorted { card.quantity } else { 0 };
        }
    }

    /// Record that `copies` more copies of one card were sorted.
    pub fn add_sorted_copies(&mut self, id: CardId, copies: u32) {
        let card = &mut self.cards[id];
        card.sorted_count = (card.sorted_count + copies).min(card.quantity);
    }

    /// Snapshot of sorting progress for project persistence.
    /// Only cards with progress appear, keyed by stable identifier.
    pub fn progress(&self) -> HashMap<String, u32> {
        self.cards
            .iter()
            .filter(|c| c.sorted_count > 0)
            .map(|c| (c.scryfall_id.clone(), c.sorted_count))
            .collect()
    }

    /// Restore a saved progress snapshot, clamping to owned quantities.
    /// Identifiers not present in the collection are ignored.
    pub fn apply_progress(&mut self, progress: &HashMap<String, u32>) {
        for card in &mut self.cards {
            let saved = progress.get(&card.scryfall_id).copied().unwrap_or(0);
            card.sorted_count = saved.min(card.quantity);
        }
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }
}
