extern crate env_logger;
#[macro_use]
extern crate log;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

mod abundance;
mod cli;
mod cluster;
mod demux;
mod group;
mod io;
mod mapping;
mod membership;
mod preset;
mod summary;
mod taxonomy;

use cli::{Cli, Commands};
use cluster::ClusterTool;
use io::get_writer;

fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();

    info!("dropotu v{}", cli::VERSION);

    match &cli.command {
        Commands::Demux {
            file,
            mapping,
            output,
            summary,
        } => {
            let samples = mapping::SampleMapping::from_path(mapping)?;
            let input = File::open(file).with_context(|| format!("Unable to open file {file}"))?;

            let mut writer = get_writer(output)?;
            let counts = demux::demultiplex(BufReader::new(input), &mut writer, &samples)?;
            writer.flush()?;

            let mut summary_writer = get_writer(&Some(summary.clone()))?;
            demux::write_counts(&mut summary_writer, &counts, &samples)?;
            summary_writer.flush()?;

            info!("Wrote read counts to {summary}");
        }
        Commands::Cluster { file, usearch, id } => {
            let outputs = cluster::Usearch::new(usearch).cluster(Path::new(file), *id)?;
            info!(
                "Clustered into {} with membership report {}",
                outputs.centroids.display(),
                outputs.membership.display()
            );
        }
        Commands::Annotate { file, uc, output } => {
            let seeds = membership::SeedMap::from_path(uc)?;

            let mut writer = get_writer(output)?;
            membership::annotate(file, &mut writer, &seeds)?;
            writer.flush()?;
        }
        Commands::Barcodes {
            file,
            samples,
            mapping,
            output,
        } => {
            let groups = group::BarcodeGroups::from_fasta(file)?;

            let order: Vec<String> = match (samples, mapping) {
                (Some(samples), _) => samples.clone(),
                (None, Some(mapping)) => mapping::SampleMapping::from_path(mapping)?
                    .samples
                    .into_iter()
                    .collect(),
                (None, None) => groups.samples().cloned().collect(),
            };

            let summaries = summary::summarize(&groups, order.iter().map(|s| s.as_str()));

            let mut writer = get_writer(output)?;
            summary::write_summaries(&mut writer, &summaries)?;
            writer.flush()?;
        }
        Commands::Totus {
            file,
            preset,
            output,
        } => {
            let clusters = taxonomy::read_taxonomy(file, preset)?;
            let groups = taxonomy::TaxonomicGroups::from_taxonomy(&clusters);

            let mut writer = get_writer(output)?;
            groups.write_table(&mut writer)?;
            writer.flush()?;
        }
        Commands::Abundance {
            file,
            taxonomy,
            preset,
            output,
        } => {
            let clusters = taxonomy::read_taxonomy(taxonomy, preset)?;
            let groups = taxonomy::TaxonomicGroups::from_taxonomy(&clusters);
            let barcodes = group::BarcodeGroups::from_fasta(file)?;

            let table = abundance::singleton_abundances(&barcodes, &groups)?;

            let mut writer = get_writer(output)?;
            table.write(&mut writer)?;
            writer.flush()?;
        }
    };

    info!("Completed successfully.");
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
