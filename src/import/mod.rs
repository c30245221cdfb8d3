//! Stage data import
//!
//! Loads the stage table of a step test from CSV or JSON files. Importers are
//! selected by file extension through [`StageImportManager`].

use crate::error::{LactrsError, Result};
use crate::models::StageSample;
use std::path::Path;

pub mod csv;
pub mod json;

/// Trait for importing stage tables from different file formats
pub trait StageFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import the stages from the file
    fn import_file(&self, file_path: &Path) -> Result<Vec<StageSample>>;

    /// Get the format name for this importer
    fn format_name(&self) -> &'static str;
}

/// Manager for coordinating the stage importers
pub struct StageImportManager {
    importers: Vec<Box<dyn StageFormat + Send + Sync>>,
}

impl StageImportManager {
    pub fn new() -> Self {
        Self {
            importers: vec![
                Box::new(csv::CsvStageImporter::new()),
                Box::new(json::JsonStageImporter),
            ],
        }
    }

    /// Import a file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<Vec<StageSample>> {
        let importer = self
            .importers
            .iter()
            .find(|i| i.can_import(file_path))
            .ok_or_else(|| {
                LactrsError::Import(format!("Unsupported file format: {}", file_path.display()))
            })?;

        tracing::debug!(
            file = %file_path.display(),
            format = importer.format_name(),
            "Importing stages"
        );

        let stages = importer.import_file(file_path)?;
        if stages.is_empty() {
            return Err(LactrsError::Import(format!(
                "No stages found in {}",
                file_path.display()
            )));
        }
        Ok(stages)
    }

    pub fn supported_formats(&self) -> Vec<&'static str> {
        self.importers.iter().map(|i| i.format_name()).collect()
    }
}

impl Default for StageImportManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper over [`StageImportManager::import_file`]
pub fn load_stages<P: AsRef<Path>>(path: P) -> Result<Vec<StageSample>> {
    StageImportManager::new().import_file(path.as_ref())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_and_json_agree() {
        let mut csv_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(csv_file, "speed,lactate,hr").unwrap();
        writeln!(csv_file, "8,1.2,120").unwrap();
        writeln!(csv_file, "10,1.4,135").unwrap();
        writeln!(csv_file, "12,1.8,150").unwrap();

        let mut json_file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            json_file,
            r#"{{"speeds": [8, 10, 12], "lactates": [1.2, 1.4, 1.8], "heart_rates": [120, 135, 150]}}"#
        )
        .unwrap();

        let from_csv = load_stages(csv_file.path()).unwrap();
        let from_json = load_stages(json_file.path()).unwrap();
        assert_eq!(from_csv, from_json);
        assert_eq!(from_csv.len(), 3);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = Builder::new().suffix(".fit").tempfile().unwrap();
        let err = load_stages(file.path()).unwrap_err();
        assert!(matches!(err, LactrsError::Import(_)));
    }

    #[test]
    fn test_empty_file_rejected() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "speed,lactate,heart_rate").unwrap();
        assert!(load_stages(file.path()).is_err());
    }

    #[test]
    fn test_supported_formats() {
        assert_eq!(StageImportManager::new().supported_formats(), vec!["CSV", "JSON"]);
    }
}
