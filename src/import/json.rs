use super::{has_extension, StageFormat};
use crate::error::{LactrsError, Result};
use crate::models::{StageSample, TestInput};
use serde::Deserialize;
use std::path::Path;

/// Accepted JSON layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum StageDocument {
    /// `[{"speed": .., "lactate": .., "heart_rate": ..}, ...]`
    Rows(Vec<StageSample>),
    /// `{"stages": [...]}`
    Wrapped { stages: Vec<StageSample> },
    /// Parallel arrays as used by protocol requests
    Series {
        speeds: Vec<f64>,
        lactates: Vec<f64>,
        heart_rates: Vec<f64>,
    },
}

/// JSON stage importer
pub struct JsonStageImporter;

impl JsonStageImporter {
    pub fn parse_str(&self, content: &str) -> Result<Vec<StageSample>> {
        let document: StageDocument = serde_json::from_str(content)
            .map_err(|e| LactrsError::Import(format!("Unrecognized stage JSON: {}", e)))?;

        match document {
            StageDocument::Rows(stages) | StageDocument::Wrapped { stages } => Ok(stages),
            StageDocument::Series {
                speeds,
                lactates,
                heart_rates,
            } => Ok(TestInput::from_series(&speeds, &lactates, &heart_rates)?.stages),
        }
    }
}

impl StageFormat for JsonStageImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "json")
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<StageSample>> {
        let content = std::fs::read_to_string(file_path)?;
        self.parse_str(&content)
    }

    fn format_name(&self) -> &'static str {
        "JSON"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts() {
        let importer = JsonStageImporter;
        let rows = importer
            .parse_str(r#"[{"speed": 8, "lactate": 1.2, "heart_rate": 120}]"#)
            .unwrap();
        let wrapped = importer
            .parse_str(r#"{"stages": [{"speed": 8, "lactate": 1.2, "hr": 120}]}"#)
            .unwrap();
        let series = importer
            .parse_str(r#"{"speeds": [8], "lactates": [1.2], "heart_rates": [120]}"#)
            .unwrap();
        assert_eq!(rows, wrapped);
        assert_eq!(rows, series);
    }

    #[test]
    fn test_mismatched_series() {
        let err = JsonStageImporter
            .parse_str(r#"{"speeds": [8, 10], "lactates": [1.2], "heart_rates": [120, 130]}"#)
            .unwrap_err();
        assert!(matches!(err, LactrsError::Input(_)));
    }
}
