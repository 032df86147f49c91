use crate::io::fasta_reader;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use needletail::FastxReader;
use thiserror::Error;

const BARCODE_MARKER: &str = "droplet_bc=";

/// Cluster IDs of every read carrying a droplet barcode, in read order.
pub type Observations = Vec<String>;

/// barcode -> observations, for a single sample
pub type SampleBarcodes = IndexMap<String, Observations>;

/// Droplet barcodes grouped by sample. Samples and barcodes are kept in the order they are first
/// seen, and the observations for a barcode are kept in read order.
#[derive(Debug, Default, PartialEq)]
pub struct BarcodeGroups {
    pub by_sample: IndexMap<String, SampleBarcodes>,
}

#[derive(Error, Debug, PartialEq)]
pub enum HeaderErr {
    #[error("line {line}: header has no `;` before the cluster ID\n    `{header}`")]
    MissingDelimiter { line: usize, header: String },

    #[error(
        "line {line}: header has an extra `;{field}` after the cluster ID\n    `{header}`
suggestion: strip size annotations before annotating the reads with their clusters"
    )]
    ExtraField {
        line: usize,
        header: String,
        field: String,
    },

    #[error("line {line}: header has no `droplet_bc=` field\n    `{header}`")]
    MissingBarcodeMarker { line: usize, header: String },

    #[error("line {line}: header has an empty {field}\n    `{header}`")]
    MissingField {
        line: usize,
        header: String,
        field: &'static str,
    },
}

/// The fields of a cluster-annotated read header.
#[derive(Debug, PartialEq)]
pub struct ReadTag<'a> {
    pub sample: &'a str,
    pub barcode: &'a str,
    pub cluster: &'a str,
}

/// Parses a header of the form `>SAMPLE_INDEX;droplet_bc=BARCODE;CLUSTER`.
///
/// The barcode runs from the `droplet_bc=` marker to the next whitespace or `;`, and the
/// cluster is the single field after the `;` which follows the marker. The sample is everything
/// before the first `_`. The leading `>` is optional.
pub fn parse_header(header: &str, line: usize) -> Result<ReadTag<'_>, HeaderErr> {
    let header = header.trim_end();
    let missing = |field| HeaderErr::MissingField {
        line,
        header: header.to_string(),
        field,
    };

    let Some((head, rest)) = header.split_once(BARCODE_MARKER) else {
        return Err(HeaderErr::MissingBarcodeMarker {
            line,
            header: header.to_string(),
        });
    };

    let Some((barcode_field, cluster_field)) = rest.split_once(';') else {
        return Err(HeaderErr::MissingDelimiter {
            line,
            header: header.to_string(),
        });
    };

    let barcode = barcode_field.split_whitespace().next().unwrap_or_default();
    if barcode.is_empty() {
        return Err(missing("droplet barcode"));
    }

    if let Some((_, extra)) = cluster_field.split_once(';') {
        return Err(HeaderErr::ExtraField {
            line,
            header: header.to_string(),
            field: extra.to_string(),
        });
    }
    let cluster = cluster_field.trim();
    if cluster.is_empty() {
        return Err(missing("cluster ID"));
    }

    let name = head.trim_start_matches('>');
    let sample = name
        .split(|c: char| c == '_' || c == ';' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    if sample.is_empty() {
        return Err(missing("sample"));
    }

    Ok(ReadTag {
        sample,
        barcode,
        cluster,
    })
}

impl BarcodeGroups {
    pub fn insert(&mut self, tag: &ReadTag) {
        self.by_sample
            .entry(tag.sample.to_string())
            .or_default()
            .entry(tag.barcode.to_string())
            .or_default()
            .push(tag.cluster.to_string());
    }

    /// Builds the groups from the headers of a cluster-annotated .fasta file.
    ///
    /// # Arguments
    ///
    /// * `path` - A string slice that holds the path to the .fasta file, whose headers are of
    ///   the form `>SAMPLE_INDEX;droplet_bc=BARCODE;CLUSTER`.
    ///
    /// # Returns
    ///
    /// The `BarcodeGroups` of every read in the file.
    ///
    /// # Errors
    ///
    /// Fails if the file is not a valid .fasta, or on the first header which cannot be parsed;
    /// malformed reads are not skipped.
    pub fn from_fasta(path: &str) -> Result<Self> {
        let mut reader = fasta_reader(path)?;
        let mut groups = BarcodeGroups::default();
        let mut reads = 0usize;

        while let Some(rec) = reader.next() {
            let rec = rec.with_context(|| format!("Invalid .fasta record in {path}"))?;
            let line = rec.start_line_number() as usize;
            let header = std::str::from_utf8(rec.id())
                .with_context(|| format!("Read header on line {line} is not valid UTF-8"))?;

            groups.insert(&parse_header(header, line)?);
            reads += 1;
        }

        info!(
            "Grouped {reads} reads into {} barcodes across {} samples",
            groups.by_sample.values().map(|b| b.len()).sum::<usize>(),
            groups.by_sample.len()
        );

        Ok(groups)
    }

    pub fn get(&self, sample: &str) -> Option<&SampleBarcodes> {
        self.by_sample.get(sample)
    }

    pub fn samples(&self) -> impl Iterator<Item = &String> {
        self.by_sample.keys()
    }
}

/// How the reads of a droplet barcode are spread over clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeClass {
    /// exactly one read
    Singleton,
    /// several reads, all from one cluster
    Replicate,
    /// several reads spanning two or more clusters
    Multiplet,
}

impl BarcodeClass {
    /// Classifies a barcode from its observations. Returns `None` for an empty list.
    pub fn of(observations: &[String]) -> Option<Self> {
        match observations {
            [] => None,
            [_] => Some(BarcodeClass::Singleton),
            obs if obs.iter().all_equal() => Some(BarcodeClass::Replicate),
            _ => Some(BarcodeClass::Multiplet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn obs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_annotated_header() {
        assert_eq!(
            parse_header(">samp1_12;droplet_bc=ACGTACGT;Zotu4\n", 1).unwrap(),
            ReadTag {
                sample: "samp1",
                barcode: "ACGTACGT",
                cluster: "Zotu4"
            }
        );
    }

    #[test]
    fn parses_space_separated_barcode() {
        let tag = parse_header(">s2_7 droplet_bc=TTTT sequence_type=x;otu9", 3).unwrap();
        assert_eq!(tag.sample, "s2");
        assert_eq!(tag.barcode, "TTTT");
        assert_eq!(tag.cluster, "otu9");
    }

    #[test]
    fn malformed_headers() {
        assert_eq!(
            parse_header(">s1_1 droplet_bc=AAAA", 5),
            Err(HeaderErr::MissingDelimiter {
                line: 5,
                header: ">s1_1 droplet_bc=AAAA".to_string()
            })
        );
        assert!(matches!(
            parse_header(">s1_1;bc=AAAA;otu1", 2),
            Err(HeaderErr::MissingBarcodeMarker { line: 2, .. })
        ));
        assert!(matches!(
            parse_header(">s1_1;droplet_bc=AAAA;", 2),
            Err(HeaderErr::MissingField { field: "cluster ID", .. })
        ));
        assert!(matches!(
            parse_header(">s1_1;droplet_bc=;otu1", 2),
            Err(HeaderErr::MissingField { field: "droplet barcode", .. })
        ));
        assert!(matches!(
            parse_header(">_1;droplet_bc=AAAA;otu1", 2),
            Err(HeaderErr::MissingField { field: "sample", .. })
        ));
    }

    #[test]
    fn size_annotation_is_rejected() {
        assert_eq!(
            parse_header(">samp1_1;droplet_bc=AAAA;Zotu1;size=3", 4),
            Err(HeaderErr::ExtraField {
                line: 4,
                header: ">samp1_1;droplet_bc=AAAA;Zotu1;size=3".to_string(),
                field: "size=3".to_string()
            })
        );
    }

    #[test]
    fn header_without_leading_marker() {
        let tag = parse_header("samp1_1;droplet_bc=AAAA;Zotu1", 1).unwrap();
        assert_eq!(tag.sample, "samp1");
        assert_eq!(tag.cluster, "Zotu1");
    }

    #[test]
    fn fastq_input_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "@r1 x\nACGT\n+\nIIII\n").unwrap();

        let err = BarcodeGroups::from_fasta(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Invalid .fasta record"));
    }

    #[test]
    fn from_fasta_reports_header_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            ">samp1_1;droplet_bc=AAAA;otu1\nACGT\nACGT\n>samp1_2 droplet_bc=AAAA\nACGT\n"
        )
        .unwrap();

        let err = BarcodeGroups::from_fasta(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HeaderErr>(),
            Some(HeaderErr::MissingDelimiter { line: 4, .. })
        ));
    }

    #[test]
    fn groups_keep_read_order() {
        let mut groups = BarcodeGroups::default();
        for (i, h) in [
            ">samp1_1;droplet_bc=AAAA;otu1",
            ">samp1_2;droplet_bc=AAAA;otu1",
            ">samp1_3;droplet_bc=BBBB;otu2",
            ">samp2_1;droplet_bc=CCCC;otu1",
            ">samp1_4;droplet_bc=AAAA;otu3",
        ]
        .iter()
        .enumerate()
        {
            groups.insert(&parse_header(h, i + 1).unwrap());
        }

        assert_eq!(groups.samples().collect::<Vec<_>>(), vec!["samp1", "samp2"]);

        let samp1 = groups.get("samp1").unwrap();
        assert_eq!(samp1["AAAA"], obs(&["otu1", "otu1", "otu3"]));
        assert_eq!(samp1["BBBB"], obs(&["otu2"]));
        assert_eq!(groups.get("samp2").unwrap()["CCCC"], obs(&["otu1"]));
    }

    #[test]
    fn classification() {
        assert_eq!(BarcodeClass::of(&[]), None);
        assert_eq!(BarcodeClass::of(&obs(&["a"])), Some(BarcodeClass::Singleton));
        assert_eq!(
            BarcodeClass::of(&obs(&["a", "a", "a"])),
            Some(BarcodeClass::Replicate)
        );
        assert_eq!(
            BarcodeClass::of(&obs(&["a", "a", "b"])),
            Some(BarcodeClass::Multiplet)
        );
    }
}
