use crate::group::{BarcodeClass, BarcodeGroups, SampleBarcodes};
use crate::io::tsv_writer;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

const HEADER: &str = "#sample\ttotal_barcodes\tsingletons\treplicates\tmultiplets";

/// Barcode classification counts for one sample.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct BarcodeSummary {
    pub sample: String,
    pub total_barcodes: usize,
    pub singletons: usize,
    pub replicates: usize,
    pub multiplets: usize,
}

impl BarcodeSummary {
    pub fn from_barcodes(sample: &str, barcodes: &SampleBarcodes) -> Self {
        let mut summary = BarcodeSummary {
            sample: sample.to_string(),
            total_barcodes: barcodes.len(),
            singletons: 0,
            replicates: 0,
            multiplets: 0,
        };

        for observations in barcodes.values() {
            match BarcodeClass::of(observations) {
                Some(BarcodeClass::Singleton) => summary.singletons += 1,
                Some(BarcodeClass::Replicate) => summary.replicates += 1,
                Some(BarcodeClass::Multiplet) => summary.multiplets += 1,
                None => {}
            }
        }

        summary
    }
}

/// Summarizes the barcodes of each requested sample, in the requested order. Samples with no
/// reads in `groups` are left out of the summary.
///
/// # Arguments
///
/// * `groups` - The reads grouped by sample and droplet barcode.
/// * `samples` - The sample names, in the order the rows should be written.
///
/// # Returns
///
/// One `BarcodeSummary` per requested sample that has reads.
pub fn summarize<'a>(
    groups: &BarcodeGroups,
    samples: impl IntoIterator<Item = &'a str>,
) -> Vec<BarcodeSummary> {
    samples
        .into_iter()
        .filter_map(|s| match groups.get(s) {
            Some(barcodes) => Some(BarcodeSummary::from_barcodes(s, barcodes)),
            None => {
                warn!("Sample {s} has no barcoded reads, skipping");
                None
            }
        })
        .collect()
}

/// Writes the summaries as a tab-delimited table with a `#`-prefixed header.
pub fn write_summaries(writer: &mut impl Write, summaries: &[BarcodeSummary]) -> Result<()> {
    writeln!(writer, "{HEADER}")?;

    let mut wtr = tsv_writer(writer);
    for summary in summaries {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;

    Ok(())
}
