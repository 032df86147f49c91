use crate::io::tsv_reader;
use anyhow::{bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MappingErr {
    #[error("line {line} of the mapping file should have a sample and a barcode column")]
    MissingColumn { line: usize },

    #[error("barcode {barcode} is given for both {first} and {second}")]
    DuplicateBarcode {
        barcode: String,
        first: String,
        second: String,
    },
}

/// Sample barcodes, read from a tab-delimited mapping file.
#[derive(Debug, Default)]
pub struct SampleMapping {
    /// barcode -> sample, in file order
    pub barcodes: IndexMap<String, String>,
    /// every sample, in the order it first appears
    pub samples: IndexSet<String>,
}

/// Sample names have their underscores replaced, as `_` separates the sample from the read index
/// in downstream headers.
pub fn sample_id(name: &str) -> String {
    name.replace('_', "s")
}

impl SampleMapping {
    pub fn from_path(path: &str) -> Result<Self> {
        let mut rdr = tsv_reader(path)?;
        let mut mapping = SampleMapping::default();

        for (idx, row) in rdr.records().enumerate() {
            let row = row.with_context(|| format!("Could not read {path}"))?;
            let line = row.position().map_or(idx + 1, |p| p.line() as usize);

            // blank lines are permitted
            if row.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            let (Some(name), Some(barcode)) = (row.get(0), row.get(1)) else {
                bail!(MappingErr::MissingColumn { line });
            };
            let (name, barcode) = (name.trim(), barcode.trim());
            if name.is_empty() || barcode.is_empty() {
                bail!(MappingErr::MissingColumn { line });
            }

            let sample = sample_id(name);
            if let Some(first) = mapping.barcodes.get(barcode) {
                bail!(MappingErr::DuplicateBarcode {
                    barcode: barcode.to_string(),
                    first: first.clone(),
                    second: sample,
                });
            }

            mapping.samples.insert(sample.clone());
            mapping.barcodes.insert(barcode.to_string(), sample);
        }

        info!(
            "Read {} barcodes for {} samples from {path}",
            mapping.barcodes.len(),
            mapping.samples.len()
        );
        Ok(mapping)
    }
}
