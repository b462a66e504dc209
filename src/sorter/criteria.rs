/// The fixed grouping criteria library
///
/// Each criterion is a named projection from a card to a group key.
/// Several keys carry an ordering prefix ("A-Mythic", "B-Rare", ...)
/// so that plain alphabetical pile ordering matches how a human
/// expects the piles laid out.

use std::fmt;

use crate::state::data::Card;

use super::PlanError;

/// EDHREC rank at or above which a card counts as a commander staple
const STAPLE_RANK_CUTOFF: u32 = 1000;

/// Supertypes stripped when extracting the primary type from a type line
const SUPERTYPES: [&str; 5] = ["Legendary", "Basic", "Snow", "World", "Ongoing"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Set,
    ColorIdentity,
    Rarity,
    TypeLine,
    FirstLetter,
    Name,
    Condition,
    CommanderStaple,
}

/// Every criterion, in the order offered to the user
pub const ALL_CRITERIA: [Criterion; 8] = [
    Criterion::Set,
    Criterion::ColorIdentity,
    Criterion::Rarity,
    Criterion::TypeLine,
    Criterion::FirstLetter,
    Criterion::Name,
    Criterion::Condition,
    Criterion::CommanderStaple,
];

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Criterion {
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::Set => "Set",
            Criterion::ColorIdentity => "Color Identity",
            Criterion::Rarity => "Rarity",
            Criterion::TypeLine => "Type Line",
            Criterion::FirstLetter => "First Letter",
            Criterion::Name => "Name",
            Criterion::Condition => "Condition",
            Criterion::CommanderStaple => "Commander Staple",
        }
    }

    /// Look a criterion up by its display name.
    ///
    /// Criteria orders persist in project files as plain strings, so
    /// an unknown name is a validation error naming the offender.
    pub fn from_name(name: &str) -> Result<Self, PlanError> {
        ALL_CRITERIA
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| PlanError::UnknownCriterion(name.to_string()))
    }

    /// Project a card onto this criterion's group key.
    pub fn group_key(&self, card: &Card) -> String {
        match self {
            Criterion::Set => {
                if card.set_name.is_empty() || card.set_name == "N/A" {
                    "Unknown Set".to_string()
                } else {
                    card.set_name.clone()
                }
            }
            Criterion::ColorIdentity => color_identity_key(&card.color_identity),
            Criterion::Rarity => rarity_key(&card.rarity),
            Criterion::TypeLine => primary_type(&card.type_line),
            Criterion::FirstLetter => first_letter_key(&card.name),
            Criterion::Name => {
                if card.name.is_empty() {
                    "Unknown".to_string()
                } else {
                    card.name.clone()
                }
            }
            Criterion::Condition => condition_key(&card.condition),
            Criterion::CommanderStaple => match card.edhrec_rank {
                Some(rank) if rank <= STAPLE_RANK_CUTOFF => "Staple (Top 1000)".to_string(),
                _ => "Not a Staple".to_string(),
            },
        }
    }
}

fn color_identity_key(colors: &[String]) -> String {
    match colors.len() {
        0 => "Colorless".to_string(),
        1 => match colors[0].as_str() {
            "W" => "White".to_string(),
            "U" => "Blue".to_string(),
            "B" => "Black".to_string(),
            "R" => "Red".to_string(),
            "G" => "Green".to_string(),
            _ => "Unknown".to_string(),
        },
        _ => {
            let mut sorted: Vec<&str> = colors.iter().map(|c| c.as_str()).collect();
            sorted.sort_unstable();
            format!("Multicolor ({})", sorted.join(""))
        }
    }
}

fn rarity_key(rarity: &str) -> String {
    match rarity.to_lowercase().as_str() {
        "mythic" => "A-Mythic",
        "rare" => "B-Rare",
        "uncommon" => "C-Uncommon",
        "common" => "D-Common",
        _ => "E-Other",
    }
    .to_string()
}

fn condition_key(condition: &str) -> String {
    match condition.to_lowercase().as_str() {
        "mint" => "A-Mint",
        "near mint" => "B-Near Mint",
        "lightly played" => "C-Lightly Played",
        "moderately played" => "D-Moderately Played",
        "heavily played" => "E-Heavily Played",
        "damaged" => "F-Damaged",
        _ => "B-Near Mint",
    }
    .to_string()
}

fn first_letter_key(name: &str) -> String {
    if name.is_empty() || name == "N/A" {
        return "Unknown".to_string();
    }
    match name.chars().next() {
        Some(first) => first.to_uppercase().to_string(),
        None => "Unknown".to_string(),
    }
}

/// Extract the primary type from a full type line.
///
/// Only the front face of a split card counts, subtypes after the em
/// dash are dropped, and supertypes are skipped so that "Legendary
/// Snow Creature — Yeti" groups under "Creature".
fn primary_type(type_line: &str) -> String {
    let front = type_line.split("//").next().unwrap_or("");
    let left = front.split('—').next().unwrap_or("").trim();
    if left.is_empty() || left == "N/A" {
        return "Unknown Type".to_string();
    }

    let words: Vec<&str> = left.split_whitespace().collect();
    words
        .iter()
        .find(|w| !SUPERTYPES.contains(w))
        .or(words.last())
        .map(|w| w.to_string())
        .unwrap_or_else(|| "Unknown Type".to_string())
}
