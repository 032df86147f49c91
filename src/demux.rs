use crate::io::{tsv_writer, write_fasta};
use crate::mapping::SampleMapping;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use needletail::parser::FastqReader;
use needletail::FastxReader;
use std::io::{Read, Write};

/// Read counts gathered while demultiplexing.
#[derive(Debug, Default)]
pub struct DemuxCounts {
    /// barcode -> number of reads assigned, in mapping order
    pub by_barcode: IndexMap<String, usize>,
    pub total_reads: usize,
    pub matched: usize,
    pub unmatched: usize,
}

impl DemuxCounts {
    fn new(mapping: &SampleMapping) -> Self {
        DemuxCounts {
            by_barcode: mapping.barcodes.keys().map(|bc| (bc.clone(), 0)).collect(),
            ..Default::default()
        }
    }

    /// Per-sample totals, summed over every barcode of the sample, in mapping order.
    pub fn by_sample(&self, mapping: &SampleMapping) -> IndexMap<String, usize> {
        let mut totals: IndexMap<String, usize> =
            mapping.samples.iter().map(|s| (s.clone(), 0)).collect();

        for (bc, count) in self.by_barcode.iter() {
            if let Some(sample) = mapping.barcodes.get(bc) {
                *totals.entry(sample.clone()).or_default() += count;
            }
        }
        totals
    }
}

/// Assigns each .fastq read to the first sample whose barcode occurs in the read header, writing
/// the matched reads as .fasta. Each matched read is given a header of the form
///
/// `SAMPLE_INDEX ORIGINAL_HEADER orig_bc=BC new_bc=BC bc_diffs=0`
///
/// where INDEX counts matched reads across all samples, starting at 0. Reads with no matching
/// barcode are dropped.
///
/// # Arguments
///
/// * `input` - The .fastq data, typically a `BufReader` around the input file.
/// * `writer` - A mutable reference to an object that implements the `Write` trait, used to
///   write the demultiplexed .fasta.
/// * `mapping` - The sample barcodes. Barcodes are tested in mapping file order.
///
/// # Returns
///
/// The `DemuxCounts` for the run, used to write the per-sample read count table.
///
/// # Errors
///
/// Returns an error if a .fastq record cannot be parsed or the output cannot be written.
pub fn demultiplex<R: Read + Send>(
    input: R,
    writer: &mut impl Write,
    mapping: &SampleMapping,
) -> Result<DemuxCounts> {
    let mut reader = FastqReader::new(input);
    let mut counts = DemuxCounts::new(mapping);

    while let Some(rec) = reader.next() {
        let rec = rec.context("Invalid .fastq record")?;
        counts.total_reads += 1;

        if counts.total_reads % 50000 == 0 {
            info!("Processed: {}", counts.total_reads)
        }

        let header = String::from_utf8_lossy(rec.id());

        let Some((bc, sample)) = mapping
            .barcodes
            .iter()
            .find(|(bc, _)| header.contains(bc.as_str()))
        else {
            counts.unmatched += 1;
            continue;
        };

        let index = counts.matched;
        counts.matched += 1;
        if let Some(c) = counts.by_barcode.get_mut(bc) {
            *c += 1;
        }

        let new_header = format!(
            "{sample}_{index} {} orig_bc={bc} new_bc={bc} bc_diffs=0",
            header.trim_end()
        );
        write_fasta(writer, &new_header, &rec.seq())?;
    }

    info!(
        "Stats: {} reads, {} assigned to samples, {} unmatched",
        counts.total_reads,
        counts.matched,
        counts.unmatched
    );

    Ok(counts)
}

/// Writes the number of reads per sample, followed by a `Total` row.
pub fn write_counts(
    writer: &mut impl Write,
    counts: &DemuxCounts,
    mapping: &SampleMapping,
) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    let mut total = 0;

    for (sample, count) in counts.by_sample(mapping) {
        wtr.write_record([sample, count.to_string()])?;
        total += count;
    }
    wtr.write_record(["Total".to_string(), total.to_string()])?;
    wtr.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mapping() -> SampleMapping {
        let mut m = SampleMapping::default();
        for (bc, sample) in [("AAAA", "s1"), ("CCCC", "s2"), ("GGGG", "s1")] {
            m.barcodes.insert(bc.to_string(), sample.to_string());
            m.samples.insert(sample.to_string());
        }
        m
    }

    const FASTQ: &str = "@r1 bc=CCCC\nACGT\n+\nIIII\n\
                         @r2 bc=TTTT\nAAAA\n+\nIIII\n\
                         @r3 bc=AAAA\nGGGA\n+\nIIII\n\
                         @r4 bc=GGGG\nTTTA\n+\nIIII\n";

    #[test]
    fn assigns_reads_in_match_order() {
        let mapping = mapping();
        let mut out = Cursor::new(Vec::new());
        let counts = demultiplex(FASTQ.as_bytes(), &mut out, &mapping).unwrap();

        assert_eq!(
            String::from_utf8(out.into_inner()).unwrap(),
            ">s2_0 r1 bc=CCCC orig_bc=CCCC new_bc=CCCC bc_diffs=0\nACGT\n\
             >s1_1 r3 bc=AAAA orig_bc=AAAA new_bc=AAAA bc_diffs=0\nGGGA\n\
             >s1_2 r4 bc=GGGG orig_bc=GGGG new_bc=GGGG bc_diffs=0\nTTTA\n"
        );
        assert_eq!(counts.total_reads, 4);
        assert_eq!(counts.unmatched, 1);
        assert_eq!(counts.matched, 3);
    }

    #[test]
    fn matched_count_agrees_with_barcode_counts() {
        let mapping = mapping();
        let input = FASTQ.repeat(3);
        let counts = demultiplex(input.as_bytes(), &mut std::io::sink(), &mapping).unwrap();

        assert_eq!(counts.matched, 9);
        assert_eq!(counts.matched, counts.by_barcode.values().sum::<usize>());
        assert_eq!(counts.matched + counts.unmatched, counts.total_reads);
    }

    #[test]
    fn first_barcode_wins() {
        let mapping = mapping();
        let mut out = Cursor::new(Vec::new());
        let counts =
            demultiplex("@r1 AAAACCCC\nACGT\n+\nIIII\n".as_bytes(), &mut out, &mapping).unwrap();

        assert_eq!(counts.by_barcode["AAAA"], 1);
        assert_eq!(counts.by_barcode["CCCC"], 0);
    }

    #[test]
    fn counts_table_sums_barcodes_per_sample() {
        let mapping = mapping();
        let counts = demultiplex(FASTQ.as_bytes(), &mut std::io::sink(), &mapping).unwrap();

        let mut out = Cursor::new(Vec::new());
        write_counts(&mut out, &counts, &mapping).unwrap();

        assert_eq!(
            String::from_utf8(out.into_inner()).unwrap(),
            "s1\t2\ns2\t1\nTotal\t3\n"
        );
    }
}
