use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Parser, Subcommand};

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
💧 dropotu version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   droplet barcode grouping and singleton abundances for amplicon reads";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    arg_required_else_help = true,
    flatten_help = true,
    styles = STYLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assign raw .fastq reads to samples by barcode, writing a sample-tagged .fasta
    #[command(arg_required_else_help = true)]
    Demux {
        /// the input .fastq file
        file: String,

        /// tab-delimited mapping file, with the sample name in the first column
        /// and its barcode in the second. lines starting with # are ignored
        #[arg(long, verbatim_doc_comment)]
        mapping: String,

        /// the output .fasta
        #[arg(short)]
        output: Option<String>,

        /// where to write the per-sample read counts
        #[arg(long, default_value = "demux_summary.tsv")]
        summary: String,
    },

    /// Cluster a .fasta with usearch, producing centroids and a .uc membership report
    #[command(arg_required_else_help = true)]
    Cluster {
        /// the input .fasta file
        file: String,

        /// path to the usearch executable
        #[arg(long, default_value = "usearch")]
        usearch: String,

        /// minimum identity for a read to join a cluster
        #[arg(long, default_value_t = 0.97)]
        id: f64,
    },

    /// Append the cluster of each read to its header, using a .uc membership report
    #[command(arg_required_else_help = true)]
    Annotate {
        /// the .fasta file which was clustered
        file: String,

        /// the .uc membership report
        #[arg(long)]
        uc: String,

        /// the output .fasta
        #[arg(short)]
        output: Option<String>,
    },

    /// Count singleton, replicate and multiplet droplet barcodes for each sample
    #[command(arg_required_else_help = true)]
    Barcodes {
        /// cluster-annotated .fasta, with headers like
        ///   >SAMPLE_INDEX;droplet_bc=BARCODE;CLUSTER
        #[arg(verbatim_doc_comment)]
        file: String,

        /// the samples to report, in order
        #[arg(long, value_delimiter = ',', conflicts_with = "mapping")]
        samples: Option<Vec<String>>,

        /// take the sample order from a demultiplexing mapping file
        #[arg(long)]
        mapping: Option<String>,

        /// the output summary
        #[arg(short)]
        output: Option<String>,
    },

    /// Group clusters sharing a taxonomy into tOTUs
    #[command(arg_required_else_help = true)]
    Totus {
        /// the taxonomy file
        file: String,

        #[arg(long, value_enum, default_value = "sintax-final")]
        preset: crate::preset::TaxonomyPreset,

        /// the output table
        #[arg(short)]
        output: Option<String>,
    },

    /// Estimate relative tOTU abundances from singleton droplet barcodes
    #[command(arg_required_else_help = true)]
    Abundance {
        /// cluster-annotated .fasta
        file: String,

        /// the taxonomy file
        #[arg(long)]
        taxonomy: String,

        #[arg(long, value_enum, default_value = "sintax-final")]
        preset: crate::preset::TaxonomyPreset,

        /// the output table
        #[arg(short)]
        output: Option<String>,
    },
}
