// src/processing/parallel.rs
use std::{
    fmt, panic,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use clap::ValueEnum;
use flume::Receiver;
use log::{debug, info};
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};
use serde::{Deserialize, Serialize};

use crate::config::ProcessingOptions;
use crate::error::{RasterCalcError, Result};
use crate::io::{BandBlock, GdalSink, GdalSource, RasterProfile, RasterSink, RasterSource};
use crate::processing::indices::IndexCalculator;
use crate::tiling::{enumerate_blocks, Block, TileSize};

/// Worker threads per core for the concurrent strategy. Block I/O leaves
/// workers blocked often enough that oversubscribing the cores pays off.
pub const CONCURRENT_THREADS_PER_CORE: usize = 4;

/// Scheduling backend selector, without a worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Serial,
    Concurrent,
    Parallel,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::Serial, StrategyKind::Concurrent, StrategyKind::Parallel];

    /// Resolve to a full strategy, using the default pool size when `workers` is `None`.
    pub fn with_workers(self, workers: Option<usize>) -> DispatchStrategy {
        match self {
            StrategyKind::Serial => DispatchStrategy::Serial,
            StrategyKind::Concurrent => DispatchStrategy::Concurrent {
                workers: workers.unwrap_or_else(|| num_cpus::get() * CONCURRENT_THREADS_PER_CORE),
            },
            StrategyKind::Parallel => DispatchStrategy::Parallel {
                workers: workers.unwrap_or_else(num_cpus::get),
            },
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Serial => "serial",
            StrategyKind::Concurrent => "concurrent",
            StrategyKind::Parallel => "parallel",
        };
        f.write_str(name)
    }
}

/// How blocks are scheduled. Every strategy produces identical output; they
/// differ only in wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DispatchStrategy {
    /// Everything on the calling thread, in enumeration order.
    #[default]
    Serial,
    /// A thread pool where each worker reads, computes and writes its own blocks.
    Concurrent { workers: usize },
    /// A worker pool with no shared mutable state. Workers own independent
    /// source handles and hand results back to the calling thread, which does
    /// every write.
    Parallel { workers: usize },
}

impl DispatchStrategy {
    pub fn concurrent() -> Self {
        StrategyKind::Concurrent.with_workers(None)
    }

    pub fn parallel() -> Self {
        StrategyKind::Parallel.with_workers(None)
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            DispatchStrategy::Serial => StrategyKind::Serial,
            DispatchStrategy::Concurrent { .. } => StrategyKind::Concurrent,
            DispatchStrategy::Parallel { .. } => StrategyKind::Parallel,
        }
    }

    pub fn workers(&self) -> usize {
        match *self {
            DispatchStrategy::Serial => 1,
            DispatchStrategy::Concurrent { workers } | DispatchStrategy::Parallel { workers } => workers,
        }
    }
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStrategy::Serial => write!(f, "serial"),
            other => write!(f, "{} ({} workers)", other.kind(), other.workers()),
        }
    }
}

/// Outcome of one completed `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub index: String,
    pub strategy: DispatchStrategy,
    pub blocks: usize,
    pub pixels: usize,
    pub elapsed: Duration,
}

/// Reject requests that can never succeed, before any block work starts or
/// any output is created.
pub fn validate_request<T>(
    profile: &RasterProfile,
    bands: &[usize],
    transform: &T,
    tile: TileSize,
    strategy: DispatchStrategy,
) -> Result<()>
where
    T: IndexCalculator + ?Sized,
{
    if profile.band_count == 0 {
        return Err(RasterCalcError::invalid("source raster has no bands"));
    }
    if profile.extent().is_empty() {
        return Err(RasterCalcError::invalid(format!(
            "source raster is empty ({})",
            profile.extent()
        )));
    }
    if let Some(&bad) = bands.iter().find(|&&b| b == 0 || b > profile.band_count) {
        return Err(RasterCalcError::invalid(format!(
            "band {} out of range 1..={}",
            bad, profile.band_count
        )));
    }
    if bands.len() < transform.required_bands() {
        return Err(RasterCalcError::invalid(format!(
            "{} needs {} bands, {} given",
            transform.name(),
            transform.required_bands(),
            bands.len()
        )));
    }
    if tile.rows == 0 || tile.cols == 0 {
        return Err(RasterCalcError::invalid(format!(
            "tile size must be non-zero, got {}x{}",
            tile.rows, tile.cols
        )));
    }
    if strategy.workers() == 0 {
        return Err(RasterCalcError::invalid("worker count must be at least 1"));
    }
    Ok(())
}

/// Compute `transform` over every block of `source` and write the results to
/// `destination` at matching offsets, then finalize `destination`.
///
/// `bands` are 1-based band numbers of `source`; the transform receives the
/// band blocks in that order. On `Ok`, every block was read, transformed and
/// written exactly once. The first error stops further scheduling and is
/// returned; the destination is then left unfinalized.
pub fn run<S, D, T>(
    source: &S,
    destination: D,
    tile: TileSize,
    bands: &[usize],
    transform: &T,
    strategy: DispatchStrategy,
) -> Result<(RunSummary, D::Finalized)>
where
    S: RasterSource,
    D: RasterSink,
    T: IndexCalculator + ?Sized,
{
    let extent = source.extent();
    validate_request(source.profile(), bands, transform, tile, strategy)?;
    if destination.extent() != extent {
        return Err(RasterCalcError::invalid(format!(
            "destination extent {} differs from source extent {}",
            destination.extent(),
            extent
        )));
    }

    let blocks = enumerate_blocks(extent, tile.rows, tile.cols)?;
    info!(
        "Computing {} over {} raster: {} blocks of {}x{}, {}",
        transform.name(),
        extent,
        blocks.len(),
        tile.rows,
        tile.cols,
        strategy
    );

    let start = Instant::now();
    match strategy {
        DispatchStrategy::Serial => run_serial(source, &destination, &blocks, bands, transform)?,
        DispatchStrategy::Concurrent { workers } => {
            run_concurrent(source, &destination, &blocks, bands, transform, workers)?
        }
        DispatchStrategy::Parallel { workers } => {
            run_parallel(source, &destination, &blocks, bands, transform, workers)?
        }
    }
    let finalized = destination.finalize()?;
    let elapsed = start.elapsed();

    info!(
        "{} finished {} blocks in {:.3}s",
        strategy,
        blocks.len(),
        elapsed.as_secs_f64()
    );

    Ok((
        RunSummary {
            index: transform.name().to_string(),
            strategy,
            blocks: blocks.len(),
            pixels: extent.pixel_count(),
            elapsed,
        },
        finalized,
    ))
}

fn process_block<S, T>(source: &S, block: &Block, bands: &[usize], transform: &T) -> Result<BandBlock>
where
    S: RasterSource,
    T: IndexCalculator + ?Sized,
{
    let inputs = source.read_block(block, bands)?;
    let output = transform.calculate(&inputs)?;
    debug!("Computed block {}", block);
    Ok(output)
}

fn run_serial<S, D, T>(source: &S, destination: &D, blocks: &[Block], bands: &[usize], transform: &T) -> Result<()>
where
    S: RasterSource,
    D: RasterSink,
    T: IndexCalculator + ?Sized,
{
    for block in blocks {
        let output = process_block(source, block, bands, transform)?;
        destination.write_block(block, &output)?;
    }
    Ok(())
}

fn build_pool(workers: usize, label: &'static str) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("{}-{}", label, i))
        .build()
        .map_err(|e| RasterCalcError::unavailable(format!("starting {} {} workers", workers, label), e))
}

fn run_concurrent<S, D, T>(
    source: &S,
    destination: &D,
    blocks: &[Block],
    bands: &[usize],
    transform: &T,
    workers: usize,
) -> Result<()>
where
    S: RasterSource,
    D: RasterSink,
    T: IndexCalculator + ?Sized,
{
    let pool = build_pool(workers, "concurrent")?;

    // `try_clone` runs once per rayon job split, giving each worker its own handle
    pool.install(|| {
        blocks.par_iter().try_for_each_init(
            || source.try_clone(),
            |handle, block| {
                let source = handle.as_ref().map_err(|e| e.clone())?;
                let output = process_block(source, block, bands, transform)?;
                destination.write_block(block, &output)
            },
        )
    })
}

fn run_parallel<S, D, T>(
    source: &S,
    destination: &D,
    blocks: &[Block],
    bands: &[usize],
    transform: &T,
    workers: usize,
) -> Result<()>
where
    S: RasterSource,
    D: RasterSink,
    T: IndexCalculator + ?Sized,
{
    let pool = build_pool(workers, "parallel")?;
    let (tx, rx) = flume::bounded::<(Block, BandBlock)>(workers * 2);

    thread::scope(|scope| {
        let producer = scope.spawn(move || {
            pool.install(|| {
                blocks.par_iter().try_for_each_init(
                    || source.try_clone(),
                    |handle, block| {
                        let source = handle.as_ref().map_err(|e| e.clone())?;
                        let output = process_block(source, block, bands, transform)?;
                        tx.send((*block, output)).map_err(|_| {
                            RasterCalcError::unavailable(
                                format!("returning block {}", block),
                                "writer stopped receiving results",
                            )
                        })
                    },
                )
            })
        });

        let written = write_results(destination, &rx);
        // Workers blocked on a full channel fail their send once the receiver is gone
        drop(rx);

        let produced = match producer.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        };

        // A write failure is what stopped the workers, so it is the error to report
        written.and(produced)
    })
}

fn write_results<D: RasterSink>(destination: &D, rx: &Receiver<(Block, BandBlock)>) -> Result<()> {
    for (block, output) in rx.iter() {
        destination.write_block(&block, &output)?;
    }
    Ok(())
}

/// File-to-file front end: opens the input with GDAL, creates the output
/// with a profile derived from it and runs the configured strategy.
pub struct BlockProcessor {
    options: ProcessingOptions,
}

impl BlockProcessor {
    pub fn new(options: ProcessingOptions) -> Self {
        Self { options }
    }

    pub fn process<I: IndexCalculator + ?Sized>(
        &self,
        calculator: &I,
        input_path: &Path,
        bands: &[usize],
        output_path: &Path,
    ) -> Result<RunSummary> {
        let source = GdalSource::open(input_path)?;

        // Validate before the output file is created
        validate_request(
            source.profile(),
            bands,
            calculator,
            self.options.tile_size,
            self.options.strategy,
        )?;

        let profile = source.profile().for_output(self.options.tile_size);
        let sink = GdalSink::create(output_path, &profile, &self.options.output, calculator.name())?;

        let (summary, path) = run(
            &source,
            sink,
            self.options.tile_size,
            bands,
            calculator,
            self.options.strategy,
        )?;
        debug!("Wrote {}", path.display());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::indices::NDI;

    fn profile(width: usize, height: usize, band_count: usize) -> RasterProfile {
        RasterProfile {
            width,
            height,
            band_count,
            data_type: "UInt16".to_string(),
            block_size: (width, 1),
            projection: None,
            geo_transform: None,
            nodata: None,
        }
    }

    fn is_invalid(result: Result<()>) -> bool {
        matches!(result, Err(RasterCalcError::InvalidInput(_)))
    }

    #[test]
    fn test_validate_request_accepts_good_request() {
        let tile = TileSize::square(256);
        for strategy in [DispatchStrategy::Serial, DispatchStrategy::Parallel { workers: 2 }] {
            assert!(validate_request(&profile(512, 512, 4), &[1, 4], &NDI::ndvi(), tile, strategy).is_ok());
        }
    }

    #[test]
    fn test_validate_request_rejects_tile_and_workers() {
        let p = profile(512, 512, 4);
        let ndvi = NDI::ndvi();
        let tile = TileSize::square(256);

        assert!(is_invalid(validate_request(&p, &[1, 4], &ndvi, TileSize::new(0, 256), DispatchStrategy::Serial)));
        assert!(is_invalid(validate_request(&p, &[1, 4], &ndvi, TileSize::new(256, 0), DispatchStrategy::Serial)));
        assert!(is_invalid(validate_request(&p, &[1, 4], &ndvi, tile, DispatchStrategy::Concurrent { workers: 0 })));
        assert!(is_invalid(validate_request(&p, &[1, 4], &ndvi, tile, DispatchStrategy::Parallel { workers: 0 })));
    }

    #[test]
    fn test_validate_request_rejects_bands_and_extent() {
        let ndvi = NDI::ndvi();
        let tile = TileSize::square(16);
        let serial = DispatchStrategy::Serial;

        assert!(is_invalid(validate_request(&profile(64, 64, 0), &[1, 4], &ndvi, tile, serial)));
        assert!(is_invalid(validate_request(&profile(0, 64, 4), &[1, 4], &ndvi, tile, serial)));
        assert!(is_invalid(validate_request(&profile(64, 64, 4), &[1, 5], &ndvi, tile, serial)));
        assert!(is_invalid(validate_request(&profile(64, 64, 4), &[4], &ndvi, tile, serial)));
    }
}
