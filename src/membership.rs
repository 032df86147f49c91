use crate::io::{fasta_reader, tsv_reader, write_fasta};
use anyhow::{bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use needletail::FastxReader;
use std::io::Write;
use thiserror::Error;

const QUERY_COLUMN: usize = 8;
const TARGET_COLUMN: usize = 9;

#[derive(Error, Debug, PartialEq)]
pub enum MembershipErr {
    #[error("line {line} of the membership report: {tag} record has no identifier in column {column}")]
    MissingField {
        line: usize,
        tag: String,
        column: usize,
    },

    #[error(
        "read {read} was a hit to seed {seed}, but {seed} is not a seed in the membership report.
suggestion: the report may be truncated; re-run the clustering step"
    )]
    MissingSeed { read: String, seed: String },

    #[error("read {read} is not present in the membership report")]
    UnknownRead { read: String },
}

/// Maps every read identifier in a clustering report to the identifier of its cluster seed.
/// Seeds map to themselves. Insertion order follows the report.
#[derive(Debug, Default)]
pub struct SeedMap {
    seeds: IndexMap<String, String>,
}

impl SeedMap {
    /// Parses a `.uc` membership report as produced by usearch or vsearch.
    ///
    /// Only `S` (seed) and `H` (hit) records are used; any other record type is ignored. The
    /// read identifiers are the first whitespace-delimited token of columns 9 and 10.
    ///
    /// # Arguments
    ///
    /// * `path` - A string slice that holds the path to the `.uc` file.
    ///
    /// # Returns
    ///
    /// A `SeedMap` with an entry for every read named as the query of an `S` or `H` record.
    ///
    /// # Errors
    ///
    /// * `MissingField` if an `S` or `H` record lacks an identifier.
    /// * `MissingSeed` if a hit points to a seed with no `S` record.
    pub fn from_path(path: &str) -> Result<Self> {
        let mut rdr = tsv_reader(path)?;
        let mut map = SeedMap::default();
        let mut declared_seeds = IndexSet::new();

        for (idx, row) in rdr.records().enumerate() {
            let row = row.with_context(|| format!("Could not read {path}"))?;
            let line = row.position().map_or(idx + 1, |p| p.line() as usize);

            let tag = row.get(0).unwrap_or_default();
            match tag {
                "S" => {
                    let read = first_token(&row, QUERY_COLUMN, line, tag)?;
                    declared_seeds.insert(read.clone());
                    map.seeds.insert(read.clone(), read);
                }
                "H" => {
                    let read = first_token(&row, QUERY_COLUMN, line, tag)?;
                    let seed = first_token(&row, TARGET_COLUMN, line, tag)?;
                    map.seeds.insert(read, seed);
                }
                _ => continue,
            }
        }

        // every hit should point at a declared seed
        if let Some((read, seed)) = map
            .seeds
            .iter()
            .find(|(_, seed)| !declared_seeds.contains(*seed))
        {
            bail!(MembershipErr::MissingSeed {
                read: read.clone(),
                seed: seed.clone()
            });
        }

        info!(
            "Read {} reads in {} clusters from {path}",
            map.len(),
            declared_seeds.len()
        );

        Ok(map)
    }

    /// Returns the seed for the given read.
    pub fn resolve(&self, read: &str) -> Result<&str, MembershipErr> {
        self.seeds
            .get(read)
            .map(|s| s.as_str())
            .ok_or_else(|| MembershipErr::UnknownRead {
                read: read.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }
}

fn first_token(
    row: &csv::StringRecord,
    column: usize,
    line: usize,
    tag: &str,
) -> Result<String, MembershipErr> {
    row.get(column)
        .and_then(|field| field.split_whitespace().next())
        .map(|s| s.to_string())
        .ok_or_else(|| MembershipErr::MissingField {
            line,
            tag: tag.to_string(),
            column,
        })
}

/// The label given to a cluster: the seed's read name, without any `;` annotations.
pub fn cluster_label(seed: &str) -> &str {
    seed.split(';').next().unwrap_or(seed)
}

/// Rewrites each record of a clustered .fasta so that its header ends with `;CLUSTER`, where
/// CLUSTER is the label of the seed the read was assigned to.
///
/// # Arguments
///
/// * `input` - A string slice that holds the path to the .fasta file which was clustered.
/// * `writer` - A mutable reference to an object that implements the `Write` trait, used to
///   write the annotated .fasta.
/// * `seeds` - The `SeedMap` parsed from the clustering run's membership report.
///
/// # Returns
///
/// The number of reads written.
///
/// # Errors
///
/// Returns an error if a read is not present in `seeds`, or the .fasta cannot be parsed.
pub fn annotate(input: &str, writer: &mut impl Write, seeds: &SeedMap) -> Result<usize> {
    let mut reader = fasta_reader(input)?;
    let mut count = 0;

    while let Some(rec) = reader.next() {
        let rec = rec.with_context(|| format!("Invalid .fasta record in {input}"))?;
        let header = std::str::from_utf8(rec.id()).context("Read header is not valid UTF-8")?;
        let read = header.split_whitespace().next().unwrap_or_default();

        let seed = seeds.resolve(read)?;
        write_fasta(
            writer,
            &format!("{read};{}", cluster_label(seed)),
            &rec.seq(),
        )?;
        count += 1;
    }

    info!("Annotated {count} reads with their clusters");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn report(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const UC: &str = indoc! {"
        S\t0\t250\t*\t*\t*\t*\t*\ts1_0;droplet_bc=AAAA\t*
        H\t0\t250\t100.0\t+\t0\t0\t250M\ts1_1;droplet_bc=CCCC extra\ts1_0;droplet_bc=AAAA
        S\t1\t248\t*\t*\t*\t*\t*\ts2_2;droplet_bc=GGGG\t*
        C\t0\t2\t*\t*\t*\t*\t*\ts1_0;droplet_bc=AAAA\t*
    "};

    #[test]
    fn seeds_and_hits() {
        let file = report(UC);
        let seeds = SeedMap::from_path(file.path().to_str().unwrap()).unwrap();

        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds.resolve("s1_0;droplet_bc=AAAA").unwrap(), "s1_0;droplet_bc=AAAA");
        assert_eq!(seeds.resolve("s1_1;droplet_bc=CCCC").unwrap(), "s1_0;droplet_bc=AAAA");
        assert_eq!(seeds.resolve("s2_2;droplet_bc=GGGG").unwrap(), "s2_2;droplet_bc=GGGG");
    }

    #[test]
    fn unknown_read() {
        let file = report(UC);
        let seeds = SeedMap::from_path(file.path().to_str().unwrap()).unwrap();

        assert_eq!(
            seeds.resolve("nope"),
            Err(MembershipErr::UnknownRead {
                read: "nope".to_string()
            })
        );
    }

    #[test]
    fn hit_without_seed_is_rejected() {
        let file = report("H\t0\t250\t100.0\t+\t0\t0\t250M\tr1\tr0\n");
        let err = SeedMap::from_path(file.path().to_str().unwrap()).unwrap_err();

        assert_eq!(
            err.downcast_ref::<MembershipErr>(),
            Some(&MembershipErr::MissingSeed {
                read: "r1".to_string(),
                seed: "r0".to_string()
            })
        );
    }

    #[test]
    fn short_record_is_rejected() {
        let file = report("S\t0\t250\n");
        let err = SeedMap::from_path(file.path().to_str().unwrap()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MembershipErr>(),
            Some(MembershipErr::MissingField { line: 1, column: 8, .. })
        ));
    }

    #[test]
    fn annotate_appends_cluster_label() {
        let file = report(UC);
        let seeds = SeedMap::from_path(file.path().to_str().unwrap()).unwrap();

        let fasta = report(indoc! {"
            >s1_0;droplet_bc=AAAA
            ACGT
            >s1_1;droplet_bc=CCCC extra
            ACGA
        "});

        let mut out = Cursor::new(Vec::new());
        let n = annotate(fasta.path().to_str().unwrap(), &mut out, &seeds).unwrap();

        assert_eq!(n, 2);
        assert_eq!(
            String::from_utf8(out.into_inner()).unwrap(),
            ">s1_0;droplet_bc=AAAA;s1_0\nACGT\n>s1_1;droplet_bc=CCCC;s1_0\nACGA\n"
        );
    }
}
