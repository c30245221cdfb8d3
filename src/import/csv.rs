use super::{has_extension, StageFormat};
use crate::error::{LactrsError, Result};
use crate::models::StageSample;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// CSV importer with flexible column mapping
pub struct CsvStageImporter {
    column_mapping: HashMap<String, &'static str>,
}

impl CsvStageImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "speed", &["speed", "velocity", "speed_kmh", "kmh"]);
        Self::add_mapping(&mut column_mapping, "lactate", &["lactate", "lac", "la", "lactate_mmol"]);
        Self::add_mapping(
            &mut column_mapping,
            "heart_rate",
            &["heart_rate", "hr", "heartrate", "bpm"],
        );

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, &'static str>, standard: &'static str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard);
        }
    }

    /// Parse stages from any CSV source with a header row
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Vec<StageSample>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(csv_error)?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| {
                self.column_mapping
                    .get(&h.to_lowercase())
                    .is_some_and(|standard| *standard == name)
            })
        };

        let missing = |name: &str| LactrsError::Import(format!("CSV has no {} column", name));
        let speed_col = column("speed").ok_or_else(|| missing("speed"))?;
        let lactate_col = column("lactate").ok_or_else(|| missing("lactate"))?;
        let hr_col = column("heart_rate").ok_or_else(|| missing("heart_rate"))?;

        let mut stages = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            let field = |col: usize, name: &str| -> Result<f64> {
                let raw = record.get(col).unwrap_or("");
                raw.parse::<f64>().map_err(|_| {
                    LactrsError::Import(format!("Row {}: invalid {} '{}'", row + 1, name, raw))
                })
            };
            stages.push(StageSample::new(
                field(speed_col, "speed")?,
                field(lactate_col, "lactate")?,
                field(hr_col, "heart_rate")?,
            ));
        }

        Ok(stages)
    }
}

impl Default for CsvStageImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StageFormat for CsvStageImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "csv")
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<StageSample>> {
        let file = std::fs::File::open(file_path)?;
        self.from_reader(file)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

fn csv_error(e: csv::Error) -> LactrsError {
    LactrsError::Import(format!("CSV parse error: {}", e))
}
