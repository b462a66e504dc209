/// Collection CSV import
///
/// Two collection-tracker export formats are recognized by their
/// headers: ManaBox (a `Scryfall ID` and a single `Quantity` column)
/// and Lion's Eye (separate non-foil and foil quantity columns).
/// Import is tolerant: rows without a stable identifier are skipped,
/// unparsable quantities default to one copy, and duplicate rows are
/// merged later by the collection store.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::state::data::Card;

/// Guard against runaway files; matches the original import worker.
const MAX_ROWS: usize = 50_000;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read CSV file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV file: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV file appears to be empty or has no valid data")]
    Empty,
    #[error("no usable card identifiers found in CSV file")]
    NoIdentifiers,
    #[error("CSV file too large (more than 50,000 rows); please split it into smaller files")]
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvFormat {
    ManaBox,
    LionsEye,
}

/// Case-insensitive header lookup for the tolerant column mapping
struct HeaderMap {
    indices: HashMap<String, usize>,
}

impl HeaderMap {
    fn new(headers: &csv::StringRecord) -> Self {
        let indices = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        HeaderMap { indices }
    }

    fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(&name.to_lowercase())
    }

    /// First matching column's trimmed value, if any
    fn get<'a>(&self, record: &'a csv::StringRecord, names: &[&str]) -> Option<&'a str> {
        names.iter().find_map(|name| {
            self.indices
                .get(&name.to_lowercase())
                .and_then(|&i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
    }
}

fn detect_format(headers: &HeaderMap) -> CsvFormat {
    if headers.contains("Number of Non-foil") && headers.contains("Number of Foil") {
        CsvFormat::LionsEye
    } else {
        CsvFormat::ManaBox
    }
}

/// Read one collection CSV into card records, one per row.
///
/// Duplicate identifiers are deliberately not merged here; the
/// collection store owns that rule.
pub fn read_collection_csv(path: &Path) -> Result<Vec<Card>, ImportError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = HeaderMap::new(reader.headers()?);
    let format = detect_format(&headers);

    let mut cards = Vec::new();
    let mut rows = 0usize;

    for record in reader.records() {
        let record = record?;
        rows += 1;
        if rows > MAX_ROWS {
            return Err(ImportError::TooLarge);
        }

        let Some(scryfall_id) = headers.get(&record, &["Scryfall ID"]) else {
            continue;
        };

        let quantity = match format {
            CsvFormat::ManaBox => parse_quantity(headers.get(&record, &["Quantity"])),
            CsvFormat::LionsEye => {
                parse_quantity(headers.get(&record, &["Number of Non-foil"]))
                    + headers
                        .get(&record, &["Number of Foil"])
                        .and_then(|v| v.parse::<u32>().ok())
                        .unwrap_or(0)
            }
        };
        if quantity == 0 {
            continue;
        }

        cards.push(Card {
            scryfall_id: scryfall_id.to_string(),
            name: headers
                .get(&record, &["Name", "Card Name"])
                .unwrap_or("N/A")
                .to_string(),
            set_name: headers
                .get(&record, &["Set name", "Set"])
                .unwrap_or("N/A")
                .to_string(),
            rarity: headers
                .get(&record, &["Rarity"])
                .unwrap_or("N/A")
                .to_lowercase(),
            type_line: headers
                .get(&record, &["Type line", "Type"])
                .unwrap_or("N/A")
                .to_string(),
            color_identity: headers
                .get(&record, &["Color identity"])
                .map(parse_color_identity)
                .unwrap_or_default(),
            edhrec_rank: headers
                .get(&record, &["EDHREC rank"])
                .and_then(|v| v.parse().ok()),
            mana_cost: headers.get(&record, &["Mana cost"]).map(str::to_string),
            prices: HashMap::new(),
            quantity,
            condition: headers
                .get(&record, &["Condition"])
                .map(normalize_condition)
                .unwrap_or_else(|| "N/A".to_string()),
            sorted_count: 0,
        });
    }

    if rows == 0 {
        return Err(ImportError::Empty);
    }
    if cards.is_empty() {
        return Err(ImportError::NoIdentifiers);
    }
    Ok(cards)
}

/// One copy when the column is missing or unparsable, like the
/// original importer.
fn parse_quantity(value: Option<&str>) -> u32 {
    value.and_then(|v| v.parse::<u32>().ok()).unwrap_or(1)
}

fn parse_color_identity(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// ManaBox writes conditions as snake_case ("near_mint"); present them
/// the way the condition criterion expects ("Near Mint").
fn normalize_condition(value: &str) -> String {
    value
        .split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_manabox_import() {
        let file = write_csv(
            "Name,Set name,Rarity,Quantity,Scryfall ID,Condition\n\
             Azusa,Champions of Kamigawa,rare,2,abc-1,near_mint\n\
             Brago,Conspiracy,rare,1,abc-2,lightly_played\n",
        );
        let cards = read_collection_csv(file.path()).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].name, "Azusa");
        assert_eq!(cards[0].quantity, 2);
        assert_eq!(cards[0].condition, "Near Mint");
        assert_eq!(cards[1].condition, "Lightly Played");
    }

    #[test]
    fn test_lions_eye_import_sums_foils() {
        let file = write_csv(
            "Card Name,Scryfall ID,Number of Non-foil,Number of Foil\n\
             Azusa,abc-1,2,1\n",
        );
        let cards = read_collection_csv(file.path()).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].quantity, 3);
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let file = write_csv(
            "Name,Quantity,Scryfall ID\n\
             Azusa,2,abc-1\n\
             Mystery,1,\n",
        );
        let cards = read_collection_csv(file.path()).unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn test_bad_quantity_defaults_to_one() {
        let file = write_csv(
            "Name,Quantity,Scryfall ID\n\
             Azusa,lots,abc-1\n",
        );
        let cards = read_collection_csv(file.path()).unwrap();
        assert_eq!(cards[0].quantity, 1);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let file = write_csv("Name,Quantity,Scryfall ID\n");
        assert!(matches!(
            read_collection_csv(file.path()),
            Err(ImportError::Empty)
        ));
    }

    #[test]
    fn test_no_identifiers_is_an_error() {
        let file = write_csv("Name,Quantity\nAzusa,2\n");
        assert!(matches!(
            read_collection_csv(file.path()),
            Err(ImportError::NoIdentifiers)
        ));
    }

    #[test]
    fn test_optional_metadata_columns() {
        let file = write_csv(
            "Name,Quantity,Scryfall ID,Color identity,EDHREC rank,Type line\n\
             Azusa,1,abc-1,\"G\",512,Legendary Creature — Human Monk\n",
        );
        let cards = read_collection_csv(file.path()).unwrap();
        assert_eq!(cards[0].color_identity, vec!["G".to_string()]);
        assert_eq!(cards[0].edhrec_rank, Some(512));
        assert_eq!(cards[0].type_line, "Legendary Creature — Human Monk");
    }
}
