use anyhow::{Context, Result};
use csv::{Reader, ReaderBuilder, Writer, WriterBuilder};
use needletail::parser::FastaReader;
use std::fs::File;
use std::io::{stdout, BufReader, BufWriter, Write};
use std::path::Path;

/// Creates a `BufWriter` for the given output option. This allows for an output file to be passed
/// or otherwise will default to using standard output.
///
/// # Arguments
///
/// * `output` - An `Option` containing the path to the output file as a `String`.
///
/// # Returns
///
/// A `Result` containing a `BufWriter` around either the created file or standard output.
pub fn get_writer(output: &Option<String>) -> Result<BufWriter<Box<dyn Write>>> {
    let inner = match output {
        Some(ref x) => {
            let file = File::create(Path::new(x))
                .with_context(|| format!("Unable to create output file {x}"))?;
            Box::new(file) as Box<dyn Write>
        }
        None => Box::new(stdout()) as Box<dyn Write>,
    };
    Ok(BufWriter::new(inner))
}

/// Opens a headerless, tab-delimited file. Lines starting with `#` are skipped, and rows may
/// have differing numbers of columns; callers are responsible for checking the columns they need.
pub fn tsv_reader(path: &str) -> Result<Reader<File>> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .quoting(false)
        .from_path(path)
        .with_context(|| format!("Unable to open file {path}"))
}

/// A tab-delimited writer. Headers are written explicitly by the caller, since several of the
/// output tables use a `#`-prefixed header line.
pub fn tsv_writer<W: Write>(writer: W) -> Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer)
}

/// Opens a .fasta file with needletail.
///
/// # Arguments
///
/// * `path` - A string slice that holds the path to the .fasta file.
///
/// # Returns
///
/// A `FastaReader` over the file. Records are parsed lazily, so a file which is not in .fasta
/// format (for example a .fastq) is reported as an error by the first call to `next()`.
pub fn fasta_reader(path: &str) -> Result<FastaReader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Unable to open file {path}"))?;
    Ok(FastaReader::new(BufReader::new(file)))
}

/// Writes a single .fasta record. `header` should not include the leading `>`.
pub fn write_fasta(writer: &mut impl Write, header: &str, seq: &[u8]) -> std::io::Result<()> {
    writeln!(writer, ">{header}")?;
    writer.write_all(seq)?;
    writer.write_all(b"\n")
}
