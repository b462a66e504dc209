/// Import/export and persistence module
///
/// Everything here deals in plain `Card` records and opaque settings;
/// the sorting engine itself has no file-format surface.
/// - Collection CSV import (csv.rs)
/// - Project save/load, the .mtgproj archive (project.rs)
/// - View export and the letter pile report (export.rs)

pub mod csv;
pub mod export;
pub mod project;
