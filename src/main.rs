// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::Path;

use tiled_ndvi::benchmark::benchmark_files;
use tiled_ndvi::batch::process_batch;
use tiled_ndvi::cli::{Cli, Commands};
use tiled_ndvi::io::{GdalSource, RasterSource};
use tiled_ndvi::processing::indices::{IndexCalculator, EVI, NDI, SAVI};
use tiled_ndvi::processing::{BlockProcessor, StrategyKind};

fn run_index(
    processor: &BlockProcessor,
    calculator: &dyn IndexCalculator,
    input: &Path,
    bands: &[usize],
    output: &Path,
) -> Result<()> {
    let summary = processor
        .process(calculator, input, bands, output)
        .with_context(|| format!("computing {} from {}", calculator.name(), input.display()))?;
    info!(
        "{}: {} blocks in {:.3}s -> {}",
        summary.index,
        summary.blocks,
        summary.elapsed.as_secs_f64(),
        output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let options = cli.processing_options();
    let processor = BlockProcessor::new(options.clone());

    match &cli.command {
        Commands::Ndvi { input, red, nir } => {
            run_index(&processor, &NDI::ndvi(), &input.input, &[*red, *nir], &cli.output)?;
        }
        Commands::Ndwi { input, green, nir } => {
            run_index(&processor, &NDI::ndwi(), &input.input, &[*green, *nir], &cli.output)?;
        }
        Commands::Savi {
            input,
            nir,
            red,
            soil_factor,
            input_scale,
        } => {
            let savi = SAVI::new(0, 1, *soil_factor, None).with_input_scale(*input_scale);
            run_index(&processor, &savi, &input.input, &[*nir, *red], &cli.output)?;
        }
        Commands::Evi {
            input,
            nir,
            red,
            blue,
            input_scale,
        } => {
            let evi = EVI::new(0, 1, 2, None).with_input_scale(*input_scale);
            run_index(&processor, &evi, &input.input, &[*nir, *red, *blue], &cli.output)?;
        }
        Commands::Info { input } => {
            let source = GdalSource::open(&input.input)?;
            println!("{}", serde_json::to_string_pretty(source.profile())?);
        }
        Commands::Benchmark { input, red, nir, json } => {
            let strategies: Vec<_> = StrategyKind::ALL
                .iter()
                .map(|kind| kind.with_workers(cli.workers))
                .collect();
            let report = benchmark_files(
                &NDI::ndvi(),
                &input.input,
                &[*red, *nir],
                &cli.output,
                &options,
                &strategies,
            )?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.to_table());
            }
        }
        Commands::Batch { config } => {
            let summaries = process_batch(config, &options)?;
            info!("{} operations done", summaries.len());
        }
    }

    Ok(())
}
