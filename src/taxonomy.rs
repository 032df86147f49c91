use crate::io::tsv_reader;
use crate::membership::cluster_label;
use crate::preset::{get_taxonomy_column, TaxonomyPreset};
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TaxonomyErr {
    #[error("line {line} of the taxonomy file has no column {column}")]
    MissingField { line: usize, column: usize },

    #[error("cluster {cluster} appears more than once in the taxonomy file")]
    DuplicateCluster { cluster: String },

    #[error("cluster {cluster} has no taxonomy")]
    UnknownCluster { cluster: String },
}

/// Cluster -> taxonomy string, in file order. Grouping depends on this order.
pub type TaxonomyMap = IndexMap<String, String>;

/// Reads cluster taxonomies from a tab-delimited file, taking the taxonomy from the column given
/// by `preset`. An empty taxonomy column is kept as an empty string.
///
/// The first column names the cluster. Classifiers are usually run on the centroid .fasta, so
/// this is often a full read header such as `s1_0;droplet_bc=AAAA`; it is reduced to the same
/// label that `annotate` writes into the read headers (`s1_0`).
pub fn read_taxonomy(path: &str, preset: &TaxonomyPreset) -> Result<TaxonomyMap> {
    let column = get_taxonomy_column(preset);
    let mut rdr = tsv_reader(path)?;
    let mut taxonomy = TaxonomyMap::new();

    for (idx, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("Could not read {path}"))?;
        let line = row.position().map_or(idx + 1, |p| p.line() as usize);

        let Some(cluster) = row.get(0).filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        let Some(tax) = row.get(column) else {
            bail!(TaxonomyErr::MissingField { line, column })
        };

        let cluster = cluster_label(cluster.trim()).to_string();
        if taxonomy.contains_key(&cluster) {
            bail!(TaxonomyErr::DuplicateCluster { cluster })
        }
        taxonomy.insert(cluster, tax.trim().to_string());
    }

    info!("Read taxonomies for {} clusters from {path}", taxonomy.len());
    Ok(taxonomy)
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GroupAssignment {
    pub cluster: String,
    pub group: String,
    pub taxonomy: String,
}

/// Clusters grouped by identical taxonomy. Each distinct taxonomy string is given a group
/// `tOtu<N>`, numbered from 1 in the order the taxonomies are first seen.
#[derive(Debug, Default)]
pub struct TaxonomicGroups {
    by_cluster: IndexMap<String, GroupAssignment>,
    /// group -> taxonomy, in numbering order
    groups: IndexMap<String, String>,
}

impl TaxonomicGroups {
    pub fn from_taxonomy(taxonomy: &TaxonomyMap) -> Self {
        let mut by_taxonomy: IndexMap<&str, String> = IndexMap::new();
        let mut result = TaxonomicGroups::default();

        for (cluster, tax) in taxonomy.iter() {
            let next = by_taxonomy.len() + 1;
            let group = by_taxonomy
                .entry(tax.as_str())
                .or_insert_with(|| format!("tOtu{next}"))
                .clone();

            result.groups.entry(group.clone()).or_insert_with(|| tax.clone());
            result.by_cluster.insert(
                cluster.clone(),
                GroupAssignment {
                    cluster: cluster.clone(),
                    group,
                    taxonomy: tax.clone(),
                },
            );
        }

        info!(
            "Grouped {} clusters into {} tOTUs",
            result.by_cluster.len(),
            result.groups.len()
        );
        result
    }

    /// The group of a cluster.
    pub fn group_of(&self, cluster: &str) -> Result<&str, TaxonomyErr> {
        self.by_cluster
            .get(cluster)
            .map(|a| a.group.as_str())
            .ok_or_else(|| TaxonomyErr::UnknownCluster {
                cluster: cluster.to_string(),
            })
    }

    /// Every group, in numbering order.
    pub fn groups(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    pub fn assignments(&self) -> impl Iterator<Item = &GroupAssignment> {
        self.by_cluster.values()
    }

    pub fn write_table(&self, writer: &mut impl Write) -> Result<()> {
        let mut wtr = crate::io::tsv_writer(writer);
        wtr.write_record(["cluster", "group", "taxonomy"])?;
        for assignment in self.assignments() {
            wtr.serialize(assignment)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
