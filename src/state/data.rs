/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the collection store, the sorting engine, and the UI layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index handle into the canonical card store.
///
/// Sort groups hold `CardId`s rather than card clones: cards mutate
/// between plan regenerations (mark sorted/unsorted), and every group
/// tree is rebuilt from the store rather than patched in place.
pub type CardId = usize;

/// Represents a single owned line item in the collection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Card {
    /// Stable identifier from the card-data provider
    pub scryfall_id: String,
    /// Display name (e.g., "Azusa, Lost but Seeking")
    pub name: String,
    /// Name of the owning set
    pub set_name: String,
    /// Rarity string as imported ("mythic", "rare", ...)
    pub rarity: String,
    /// Full type line (e.g., "Legendary Creature — Human Monk")
    pub type_line: String,
    /// Color identity letters ("W", "U", "B", "R", "G")
    pub color_identity: Vec<String>,
    /// EDHREC popularity rank, if known
    pub edhrec_rank: Option<u32>,
    /// Mana cost string, if known
    pub mana_cost: Option<String>,
    /// Price map keyed by currency/printing variant
    #[serde(default)]
    pub prices: HashMap<String, Option<String>>,
    /// Number of copies owned (positive)
    pub quantity: u32,
    /// Free-text condition ("Near Mint", ...)
    pub condition: String,
    /// How many copies have already been physically sorted (<= quantity)
    #[serde(default)]
    pub sorted_count: u32,
}

impl Card {
    /// Copies still waiting to be sorted
    pub fn unsorted_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.sorted_count)
    }

    /// Whether every owned copy has been sorted
    pub fn is_fully_sorted(&self) -> bool {
        self.sorted_count >= self.quantity
    }
}

/// One node of the grouping hierarchy: an internal group of cards, or
/// a single-card leaf when `is_card_leaf` is set.
///
/// Both counts are recomputed fresh on every plan generation. The tree
/// is disposable: after any `sorted_count` mutation the counts are
/// stale and the plan must be regenerated before they are read again.
#[derive(Debug, Clone, PartialEq)]
pub struct SortGroup {
    /// Pile label shown to the sorter (group key or combined letters)
    pub group_name: String,
    /// Member cards, as handles into the canonical store
    pub cards: Vec<CardId>,
    /// Sum of member quantities
    pub total_count: u32,
    /// Sum of member unsorted quantities
    pub unsorted_count: u32,
    /// Whether every member card is fully sorted
    pub all_sorted: bool,
    /// Single-card leaf emitted by the Name-level breakdown
    pub is_card_leaf: bool,
    /// Sub-groups for the next criterion level (empty at leaf piles)
    pub children: Vec<SortGroup>,
}

impl SortGroup {
    /// Build a group over `cards`, computing aggregate counts from the store.
    pub fn from_members(group_name: String, cards: Vec<CardId>, store: &[Card]) -> Self {
        let mut total_count = 0;
        let mut unsorted_count = 0;
        let mut all_sorted = true;
        for &id in &cards {
            let card = &store[id];
            total_count += card.quantity;
            unsorted_count += card.unsorted_quantity();
            all_sorted &= card.is_fully_sorted();
        }
        SortGroup {
            group_name,
            cards,
            total_count,
            unsorted_count,
            all_sorted,
            is_card_leaf: false,
            children: Vec::new(),
        }
    }

    pub fn is_fully_sorted(&self) -> bool {
        self.unsorted_count == 0
    }

    /// Sorting progress for this pile, in percent
    pub fn sorted_percentage(&self) -> f32 {
        if self.total_count == 0 {
            return 100.0;
        }
        let sorted = self.total_count - self.unsorted_count;
        sorted as f32 / self.total_count as f32 * 100.0
    }
}

#[cfg(test)]
pub(crate) fn test_card(name: &str, quantity: u32, sorted_count: u32) -> Card {
    Card {
        scryfall_id: format!("id-{name}"),
        name: name.to_string(),
        set_name: "Test Set".to_string(),
        rarity: "common".to_string(),
        type_line: "Creature — Test".to_string(),
        color_identity: vec![],
        edhrec_rank: None,
        mana_cost: None,
        prices: HashMap::new(),
        quantity,
        condition: "Near Mint".to_string(),
        sorted_count,
    }
}
