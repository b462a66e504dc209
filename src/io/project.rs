/// Project persistence
///
/// A project file is a deflate-compressed archive holding one JSON
/// payload, `project_data.json`, with the collection, the sorting
/// progress, and the sorter settings. The format carries everything
/// needed to resume a physical sorting session on another machine.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::write::SimpleFileOptions;

use crate::state::collection::Collection;
use crate::state::data::Card;

pub const PROJECT_EXTENSION: &str = "mtgproj";
const PAYLOAD_NAME: &str = "project_data.json";
const FORMAT_VERSION: &str = "1.1";
const APP_NAME: &str = "card-sorter";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to access project file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid project archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("invalid project payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectMetadata {
    pub version: String,
    pub app: String,
    pub saved_at: String,
}

/// The sorter settings persisted alongside the collection.
/// Criteria are stored by display name and re-validated on load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectSettings {
    pub sort_criteria: Vec<String>,
    pub letter_policy: String,
    pub group_threshold: u32,
    pub show_sorted: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            sort_criteria: Vec::new(),
            letter_policy: "adjacent".to_string(),
            group_threshold: 20,
            show_sorted: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectData {
    pub metadata: ProjectMetadata,
    pub collection: Vec<Card>,
    /// Sorting progress keyed by stable identifier; clamped to owned
    /// quantities when restored
    pub progress: HashMap<String, u32>,
    pub settings: ProjectSettings,
}

impl ProjectData {
    pub fn new(collection: &Collection, settings: ProjectSettings) -> Self {
        ProjectData {
            metadata: ProjectMetadata {
                version: FORMAT_VERSION.to_string(),
                app: APP_NAME.to_string(),
                saved_at: Utc::now().to_rfc3339(),
            },
            collection: collection.cards().to_vec(),
            progress: collection.progress(),
            settings,
        }
    }

    /// Rebuild the canonical store from this payload.
    pub fn into_collection(self) -> (Collection, ProjectSettings) {
        let mut collection = Collection::from_cards(self.collection);
        collection.apply_progress(&self.progress);
        (collection, self.settings)
    }
}

pub fn save(path: &Path, data: &ProjectData) -> Result<(), ProjectError> {
    let file = File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(PAYLOAD_NAME, options)?;
    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.finish()?;
    Ok(())
}

pub fn load(path: &Path) -> Result<ProjectData, ProjectError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut payload = String::new();
    archive.by_name(PAYLOAD_NAME)?.read_to_string(&mut payload)?;
    Ok(serde_json::from_str(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::test_card;

    #[test]
    fn test_project_round_trip() {
        let mut collection =
            Collection::from_cards(vec![test_card("Azusa", 2, 0), test_card("Brago", 3, 0)]);
        collection.mark_sorted(&[0], true);

        let settings = ProjectSettings {
            sort_criteria: vec!["Set".to_string(), "First Letter".to_string()],
            letter_policy: "best_fit".to_string(),
            group_threshold: 25,
            show_sorted: false,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("test.{PROJECT_EXTENSION}"));
        save(&path, &ProjectData::new(&collection, settings.clone())).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.metadata.app, APP_NAME);
        assert_eq!(loaded.metadata.version, FORMAT_VERSION);

        let (restored, restored_settings) = loaded.into_collection();
        assert_eq!(restored_settings, settings);
        assert_eq!(restored.unique_count(), 2);
        assert_eq!(restored.card(0).sorted_count, 2);
        assert_eq!(restored.card(1).sorted_count, 0);
    }

    #[test]
    fn test_load_rejects_non_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.mtgproj");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(load(&path), Err(ProjectError::Archive(_))));
    }
}
