/// Letter-pile consolidation
///
/// When one set is sorted by card name, single-letter piles are often
/// tiny. The optimizer merges sparse letters into combined piles so no
/// pile falls below a configurable minimum size, under three policies
/// of increasing cleverness.

use std::collections::HashMap;
use std::fmt;

use crate::state::collection::Collection;
use crate::state::data::{CardId, SortGroup};

/// A combined pile never holds more than this many letters
const MAX_LETTERS_PER_PILE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterPolicy {
    /// Every non-empty letter is its own pile
    Simple,
    /// Merge runs of adjacent sparse letters, never reordering them
    AdjacentRuns,
    /// Best-fit-decreasing bin packing of sparse letters
    BestFit,
}

pub const ALL_POLICIES: [LetterPolicy; 3] = [
    LetterPolicy::Simple,
    LetterPolicy::AdjacentRuns,
    LetterPolicy::BestFit,
];

impl fmt::Display for LetterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl LetterPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            LetterPolicy::Simple => "One pile per letter",
            LetterPolicy::AdjacentRuns => "Group adjacent low letters",
            LetterPolicy::BestFit => "Optimal (max 3 letters per pile)",
        }
    }

    /// Settings persist the policy as a short tag.
    pub fn tag(&self) -> &'static str {
        match self {
            LetterPolicy::Simple => "simple",
            LetterPolicy::AdjacentRuns => "adjacent",
            LetterPolicy::BestFit => "best_fit",
        }
    }

    /// Unknown tags fall back to the default policy.
    pub fn from_tag(tag: &str) -> Self {
        ALL_POLICIES
            .iter()
            .copied()
            .find(|p| p.tag() == tag)
            .unwrap_or(LetterPolicy::AdjacentRuns)
    }
}

/// A total mapping from the 26 uppercase letters to pile labels.
///
/// Letters that were not merged (including every zero-count letter)
/// map to themselves, so lookups never fail.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterMapping {
    piles: [String; 26],
}

impl LetterMapping {
    pub fn identity() -> Self {
        LetterMapping {
            piles: std::array::from_fn(|i| letter_at(i).to_string()),
        }
    }

    /// Pile label for an uppercase letter A-Z
    pub fn pile_for(&self, letter: char) -> Option<&str> {
        if letter.is_ascii_uppercase() {
            Some(&self.piles[(letter as u8 - b'A') as usize])
        } else {
            None
        }
    }

    /// All 26 (letter, pile) pairs in alphabetical order
    pub fn entries(&self) -> impl Iterator<Item = (char, &str)> {
        self.piles
            .iter()
            .enumerate()
            .map(|(i, pile)| (letter_at(i), pile.as_str()))
    }

    fn assign(&mut self, indices: &[usize], label: &str) {
        for &i in indices {
            self.piles[i] = label.to_string();
        }
    }
}

fn letter_at(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn label_for(indices: &[usize]) -> String {
    indices.iter().map(|&i| letter_at(i)).collect()
}

/// Per-letter copy counts for the letter statistics.
/// Nameless cards and non-alphabetic initials contribute nothing.
pub fn letter_counts(collection: &Collection, ids: &[CardId]) -> [u32; 26] {
    let mut counts = [0u32; 26];
    for &id in ids {
        let card = collection.card(id);
        if let Some(letter) = first_letter(&card.name) {
            if letter.is_ascii_uppercase() {
                counts[(letter as u8 - b'A') as usize] += card.quantity;
            }
        }
    }
    counts
}

fn first_letter(name: &str) -> Option<char> {
    if name.is_empty() || name == "N/A" {
        return None;
    }
    let first = name.chars().next()?;
    first.to_uppercase().next()
}

/// Build the letter-to-pile mapping for the given per-letter counts.
pub fn build_mapping(counts: &[u32; 26], threshold: u32, policy: LetterPolicy) -> LetterMapping {
    match policy {
        LetterPolicy::Simple => LetterMapping::identity(),
        LetterPolicy::AdjacentRuns => adjacent_runs(counts, threshold),
        LetterPolicy::BestFit => best_fit(counts, threshold),
    }
}

/// Scan the non-empty letters in alphabetical order, accumulating
/// consecutive low-count letters into a running buffer. The buffer is
/// flushed into one combined pile once its total reaches the threshold
/// or the next considered letter would not itself qualify as low, so
/// piles stay alphabetically contiguous and letters are never
/// reordered.
fn adjacent_runs(counts: &[u32; 26], threshold: u32) -> LetterMapping {
    let mut mapping = LetterMapping::identity();
    let present: Vec<(usize, u32)> = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0)
        .map(|(i, &c)| (i, c))
        .collect();

    let mut buffer: Vec<usize> = Vec::new();
    let mut buffer_total = 0u32;

    for (pos, &(index, count)) in present.iter().enumerate() {
        if count < threshold {
            buffer.push(index);
            buffer_total += count;

            let next_is_low = present
                .get(pos + 1)
                .is_some_and(|&(_, next)| next < threshold);
            if buffer_total >= threshold || !next_is_low {
                let label = label_for(&buffer);
                mapping.assign(&buffer, &label);
                buffer.clear();
                buffer_total = 0;
            }
        } else {
            // A big letter always stands alone; anything buffered
            // before it becomes its own pile.
            if !buffer.is_empty() {
                let label = label_for(&buffer);
                mapping.assign(&buffer, &label);
                buffer.clear();
                buffer_total = 0;
            }
        }
    }

    if !buffer.is_empty() {
        let label = label_for(&buffer);
        mapping.assign(&buffer, &label);
    }
    mapping
}

/// Best-fit-decreasing packing of the low letters: letters at or above
/// the threshold stay solo, the rest are placed largest-first into the
/// candidate bin (under 3 letters, post-addition sum within threshold)
/// with the least remaining capacity. Combined piles are named by
/// their letters sorted alphabetically, not packing order.
fn best_fit(counts: &[u32; 26], threshold: u32) -> LetterMapping {
    let mut mapping = LetterMapping::identity();

    let mut low: Vec<(usize, u32)> = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0 && c < threshold)
        .map(|(i, &c)| (i, c))
        .collect();
    // Stable sort: equal counts keep alphabetical order
    low.sort_by(|a, b| b.1.cmp(&a.1));

    let mut bins: Vec<(Vec<usize>, u32)> = Vec::new();
    for (index, count) in low {
        let mut best: Option<usize> = None;
        let mut best_remaining = u32::MAX;
        for (b, (letters, sum)) in bins.iter().enumerate() {
            if letters.len() >= MAX_LETTERS_PER_PILE {
                continue;
            }
            let Some(remaining) = threshold.checked_sub(sum + count) else {
                continue;
            };
            if remaining < best_remaining {
                best_remaining = remaining;
                best = Some(b);
            }
        }
        match best {
            Some(b) => {
                bins[b].0.push(index);
                bins[b].1 += count;
            }
            None => bins.push((vec![index], count)),
        }
    }

    for (mut letters, _) in bins {
        letters.sort_unstable();
        let label = label_for(&letters);
        mapping.assign(&letters, &label);
    }
    mapping
}

/// Bucket cards into letter piles under the chosen policy.
///
/// Cards whose first letter is outside A-Z land in a pile named after
/// that symbol; nameless cards are excluded entirely, matching the
/// letter statistics.
pub fn letter_plan(
    collection: &Collection,
    ids: &[CardId],
    policy: LetterPolicy,
    threshold: u32,
) -> (Vec<SortGroup>, LetterMapping) {
    let counts = letter_counts(collection, ids);
    let mapping = build_mapping(&counts, threshold, policy);

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<CardId>> = HashMap::new();
    for &id in ids {
        let Some(letter) = first_letter(&collection.card(id).name) else {
            continue;
        };
        let pile = match mapping.pile_for(letter) {
            Some(pile) => pile.to_string(),
            None => letter.to_string(),
        };
        buckets
            .entry(pile.clone())
            .or_insert_with(|| {
                order.push(pile);
                Vec::new()
            })
            .push(id);
    }

    let groups = order
        .into_iter()
        .map(|name| {
            let members = buckets.remove(&name).unwrap_or_default();
            SortGroup::from_members(name, members, collection.cards())
        })
        .collect();
    (groups, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::test_card;

    fn counts_of(pairs: &[(char, u32)]) -> [u32; 26] {
        let mut counts = [0u32; 26];
        for &(letter, count) in pairs {
            counts[(letter as u8 - b'A') as usize] = count;
        }
        counts
    }

    fn assert_total(mapping: &LetterMapping) {
        for (letter, pile) in mapping.entries() {
            assert!(!pile.is_empty(), "letter {letter} lost its pile");
        }
    }

    #[test]
    fn test_simple_policy_is_identity() {
        let counts = counts_of(&[('A', 5), ('Q', 1)]);
        let mapping = build_mapping(&counts, 20, LetterPolicy::Simple);
        assert_total(&mapping);
        for (letter, pile) in mapping.entries() {
            assert_eq!(pile, letter.to_string());
        }
    }

    #[test]
    fn test_adjacent_runs_merge_sparse_scan() {
        // Q, X and Z are the only letters present; the scan considers
        // them adjacent even across the empty letters between them.
        let counts = counts_of(&[('X', 1), ('Q', 2), ('Z', 1)]);
        let mapping = build_mapping(&counts, 20, LetterPolicy::AdjacentRuns);
        assert_total(&mapping);
        assert_eq!(mapping.pile_for('Q'), Some("QXZ"));
        assert_eq!(mapping.pile_for('X'), Some("QXZ"));
        assert_eq!(mapping.pile_for('Z'), Some("QXZ"));
        // Untouched letters keep identity
        assert_eq!(mapping.pile_for('A'), Some("A"));
    }

    #[test]
    fn test_adjacent_runs_flush_at_threshold() {
        let counts = counts_of(&[('A', 5), ('B', 5), ('C', 5), ('D', 5)]);
        let mapping = build_mapping(&counts, 10, LetterPolicy::AdjacentRuns);
        assert_eq!(mapping.pile_for('A'), Some("AB"));
        assert_eq!(mapping.pile_for('B'), Some("AB"));
        assert_eq!(mapping.pile_for('C'), Some("CD"));
        assert_eq!(mapping.pile_for('D'), Some("CD"));
    }

    #[test]
    fn test_adjacent_runs_big_letter_stays_solo() {
        let counts = counts_of(&[('A', 3), ('B', 50), ('C', 3)]);
        let mapping = build_mapping(&counts, 20, LetterPolicy::AdjacentRuns);
        assert_eq!(mapping.pile_for('A'), Some("A"));
        assert_eq!(mapping.pile_for('B'), Some("B"));
        assert_eq!(mapping.pile_for('C'), Some("C"));
    }

    #[test]
    fn test_best_fit_leaves_near_threshold_letters_solo() {
        // A and B are too big to pair with anything, C has no partner
        let counts = counts_of(&[('A', 15), ('B', 15), ('C', 10)]);
        let mapping = build_mapping(&counts, 20, LetterPolicy::BestFit);
        assert_total(&mapping);
        for (letter, pile) in mapping.entries() {
            assert_eq!(pile, letter.to_string());
        }
    }

    #[test]
    fn test_best_fit_capacity_bounds() {
        let counts = counts_of(&[
            ('A', 9),
            ('B', 8),
            ('C', 7),
            ('D', 6),
            ('E', 5),
            ('F', 4),
            ('G', 3),
            ('H', 2),
            ('I', 1),
            ('J', 40),
        ]);
        let threshold = 20;
        let mapping = build_mapping(&counts, threshold, LetterPolicy::BestFit);
        assert_total(&mapping);

        // J is individually above threshold and must stay solo
        assert_eq!(mapping.pile_for('J'), Some("J"));

        // No pile exceeds three letters or the threshold capacity
        let mut pile_sums: HashMap<String, (u32, usize)> = HashMap::new();
        for (letter, pile) in mapping.entries() {
            let count = counts[(letter as u8 - b'A') as usize];
            let entry = pile_sums.entry(pile.to_string()).or_default();
            entry.0 += count;
            if count > 0 {
                entry.1 += 1;
            }
            // Each letter's pile name contains that letter
            assert!(pile.contains(letter), "{pile} missing {letter}");
        }
        for (pile, (sum, letters)) in pile_sums {
            assert!(letters <= MAX_LETTERS_PER_PILE, "{pile} has {letters} letters");
            if letters > 1 {
                assert!(sum <= threshold, "{pile} holds {sum} cards");
            }
        }
    }

    #[test]
    fn test_best_fit_names_sorted_alphabetically() {
        // Packing order is by count descending (C first), but the pile
        // label lists its letters alphabetically.
        let counts = counts_of(&[('A', 2), ('C', 5)]);
        let mapping = build_mapping(&counts, 20, LetterPolicy::BestFit);
        assert_eq!(mapping.pile_for('A'), Some("AC"));
        assert_eq!(mapping.pile_for('C'), Some("AC"));
    }

    #[test]
    fn test_zero_threshold_degrades_to_identity() {
        let counts = counts_of(&[('A', 1), ('B', 2)]);
        for policy in ALL_POLICIES {
            let mapping = build_mapping(&counts, 0, policy);
            assert_total(&mapping);
            for (letter, pile) in mapping.entries() {
                assert_eq!(pile, letter.to_string());
            }
        }
    }

    #[test]
    fn test_letter_counts_skip_nameless_cards() {
        let collection = Collection::from_cards(vec![
            test_card("Azusa", 2, 0),
            test_card("avalanche", 3, 0),
            test_card("N/A", 9, 0),
        ]);
        let counts = letter_counts(&collection, &collection.ids());
        assert_eq!(counts[0], 5);
        assert_eq!(counts.iter().sum::<u32>(), 5);
    }

    #[test]
    fn test_letter_plan_buckets_by_mapping() {
        let collection = Collection::from_cards(vec![
            test_card("Quagmire", 2, 0),
            test_card("Xenograft", 1, 1),
            test_card("Zealot", 1, 0),
            test_card("Mountain", 30, 0),
        ]);
        let (groups, mapping) =
            letter_plan(&collection, &collection.ids(), LetterPolicy::AdjacentRuns, 20);

        assert_eq!(mapping.pile_for('M'), Some("M"));
        assert_eq!(mapping.pile_for('Q'), Some("QXZ"));

        let qxz = groups.iter().find(|g| g.group_name == "QXZ").unwrap();
        assert_eq!(qxz.total_count, 4);
        assert_eq!(qxz.unsorted_count, 3);
        let m = groups.iter().find(|g| g.group_name == "M").unwrap();
        assert_eq!(m.total_count, 30);
    }
}
