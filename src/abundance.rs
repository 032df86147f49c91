use crate::group::{BarcodeClass, BarcodeGroups, SampleBarcodes};
use crate::io::tsv_writer;
use crate::taxonomy::{TaxonomicGroups, TaxonomyErr};
use anyhow::Result;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::io::Write;

/// Singleton barcode counts for one sample.
#[derive(Debug, Default, PartialEq)]
pub struct SingletonCounts {
    /// group -> singleton barcodes, in the order groups are first seen
    pub by_group: IndexMap<String, usize>,
    pub total: usize,
}

impl SingletonCounts {
    /// Counts the singleton barcodes of a sample by the group of their single read.
    pub fn from_barcodes(
        barcodes: &SampleBarcodes,
        groups: &TaxonomicGroups,
    ) -> Result<Self, TaxonomyErr> {
        let mut counts = SingletonCounts::default();

        for observations in barcodes.values() {
            if BarcodeClass::of(observations) != Some(BarcodeClass::Singleton) {
                continue;
            }
            let group = groups.group_of(&observations[0])?;
            *counts.by_group.entry(group.to_string()).or_default() += 1;
            counts.total += 1;
        }

        Ok(counts)
    }

    /// Relative abundance of each group, or `None` if there are no singletons.
    pub fn relative(&self) -> Option<IndexMap<String, f64>> {
        if self.total == 0 {
            return None;
        }
        let total = self.total as f64;
        Some(
            self.by_group
                .iter()
                .map(|(g, n)| (g.clone(), *n as f64 / total))
                .collect(),
        )
    }
}

/// Relative abundances of groups, estimated from singleton barcodes. Samples with no singleton
/// barcodes are not present.
#[derive(Debug, Default)]
pub struct AbundanceTable {
    /// sample -> group -> relative abundance
    pub by_sample: IndexMap<String, IndexMap<String, f64>>,
    /// groups seen in any sample, in group numbering order
    pub groups: Vec<String>,
}

impl AbundanceTable {
    /// The relative abundance of `group` in `sample`, or `None` if the sample had no singleton
    /// barcodes in that group.
    pub fn get(&self, sample: &str, group: &str) -> Option<f64> {
        self.by_sample.get(sample)?.get(group).copied()
    }

    /// Writes the table with one row per group and one column per sample. Groups which were
    /// never seen as a singleton in a sample have an empty cell.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        let mut wtr = tsv_writer(writer);

        let mut header = vec!["group".to_string()];
        header.extend(self.by_sample.keys().cloned());
        wtr.write_record(&header)?;

        for group in self.groups.iter() {
            let mut row = vec![group.clone()];
            row.extend(self.by_sample.keys().map(|sample| {
                self.get(sample, group)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;

        Ok(())
    }
}

/// Estimates the relative abundance of each taxonomic group per sample, counting only droplet
/// barcodes with a single read.
///
/// # Arguments
///
/// * `barcodes` - The reads grouped by sample and droplet barcode.
/// * `groups` - The taxonomic groups, used to find the group of each singleton's cluster.
///
/// # Returns
///
/// An `AbundanceTable` where each sample's abundances sum to 1. Samples with no singleton
/// barcodes are left out, and only groups seen in at least one sample are listed.
///
/// # Errors
///
/// Returns `UnknownCluster` if a singleton read belongs to a cluster with no taxonomy.
pub fn singleton_abundances(
    barcodes: &BarcodeGroups,
    groups: &TaxonomicGroups,
) -> Result<AbundanceTable> {
    // samples are independent, and collecting keeps the sample order
    let counts = barcodes
        .by_sample
        .par_iter()
        .map(|(sample, bcs)| Ok((sample, SingletonCounts::from_barcodes(bcs, groups)?)))
        .collect::<Result<Vec<_>, TaxonomyErr>>()?;

    let mut table = AbundanceTable::default();
    for (sample, counts) in counts {
        match counts.relative() {
            Some(abundances) => {
                debug!("{sample}: {} singleton barcodes", counts.total);
                table.by_sample.insert(sample.clone(), abundances);
            }
            None => warn!("Sample {sample} has no singleton barcodes, leaving it out"),
        }
    }

    table.groups = groups
        .groups()
        .filter(|g| table.by_sample.values().any(|a| a.contains_key(*g)))
        .cloned()
        .collect();

    info!(
        "Estimated abundances of {} tOTUs across {} samples",
        table.groups.len(),
        table.by_sample.len()
    );
    Ok(table)
}
