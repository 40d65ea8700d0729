use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::config::ProcessingOptions;
use crate::error::{RasterCalcError, Result};
use crate::processing::indices::IndexCalculator;
use crate::processing::{BlockProcessor, DispatchStrategy, RunSummary, StrategyKind};

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkEntry {
    pub strategy: DispatchStrategy,
    pub blocks: usize,
    pub seconds: f64,
    /// Baseline time divided by this entry's time.
    pub speedup: f64,
}

/// Timings of one job under several strategies.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub index: String,
    pub pixels: usize,
    pub baseline: StrategyKind,
    pub entries: Vec<BenchmarkEntry>,
}

impl BenchmarkReport {
    /// The serial run is the baseline when present, otherwise the first run.
    pub fn from_summaries(summaries: &[RunSummary]) -> Result<Self> {
        let first = summaries
            .first()
            .ok_or_else(|| RasterCalcError::invalid("benchmark needs at least one strategy"))?;
        let baseline = summaries
            .iter()
            .find(|s| s.strategy == DispatchStrategy::Serial)
            .unwrap_or(first);
        let baseline_secs = baseline.elapsed.as_secs_f64();

        let entries = summaries
            .iter()
            .map(|s| {
                let seconds = s.elapsed.as_secs_f64();
                BenchmarkEntry {
                    strategy: s.strategy,
                    blocks: s.blocks,
                    seconds,
                    speedup: if seconds > 0.0 { baseline_secs / seconds } else { f64::INFINITY },
                }
            })
            .collect();

        Ok(Self {
            index: first.index.clone(),
            pixels: first.pixels,
            baseline: baseline.strategy.kind(),
            entries,
        })
    }

    pub fn speedup(&self, kind: StrategyKind) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.strategy.kind() == kind)
            .map(|e| e.speedup)
    }

    pub fn to_table(&self) -> String {
        let header = format!(
            "{} over {} pixels (speedup vs {})\n{:<12} {:>8} {:>8} {:>10} {:>8}",
            self.index, self.pixels, self.baseline, "strategy", "workers", "blocks", "seconds", "speedup"
        );
        let rows = self
            .entries
            .iter()
            .map(|e| {
                format!(
                    "{:<12} {:>8} {:>8} {:>10.3} {:>7.2}x",
                    e.strategy.kind().to_string(),
                    e.strategy.workers(),
                    e.blocks,
                    e.seconds,
                    e.speedup
                )
            })
            .join("\n");
        format!("{}\n{}", header, rows)
    }
}

/// Run the same job once per strategy through `run_one` and compare timings.
pub fn compare_strategies<F>(strategies: &[DispatchStrategy], mut run_one: F) -> Result<BenchmarkReport>
where
    F: FnMut(DispatchStrategy) -> Result<RunSummary>,
{
    let summaries = strategies
        .iter()
        .map(|&strategy| {
            info!("Benchmarking {}", strategy);
            run_one(strategy)
        })
        .collect::<Result<Vec<_>>>()?;
    BenchmarkReport::from_summaries(&summaries)
}

/// `out.tif` + parallel -> `out_parallel.tif`
pub fn strategy_output_path(output: &Path, kind: StrategyKind) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}_{}.{}", stem, kind, ext.to_string_lossy()),
        None => format!("{}_{}", stem, kind),
    };
    output.with_file_name(name)
}

/// Benchmark a file-to-file job; each strategy writes its own output next to `output`.
pub fn benchmark_files<I: IndexCalculator + ?Sized>(
    calculator: &I,
    input: &Path,
    bands: &[usize],
    output: &Path,
    options: &ProcessingOptions,
    strategies: &[DispatchStrategy],
) -> Result<BenchmarkReport> {
    compare_strategies(strategies, |strategy| {
        let processor = BlockProcessor::new(ProcessingOptions {
            strategy,
            ..options.clone()
        });
        let path = strategy_output_path(output, strategy.kind());
        processor.process(calculator, input, bands, &path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn summary(strategy: DispatchStrategy, millis: u64) -> RunSummary {
        RunSummary {
            index: "NDVI".to_string(),
            strategy,
            blocks: 4,
            pixels: 2048 * 2048,
            elapsed: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_speedup_relative_to_serial() {
        let report = BenchmarkReport::from_summaries(&[
            summary(DispatchStrategy::Concurrent { workers: 8 }, 250),
            summary(DispatchStrategy::Serial, 1000),
            summary(DispatchStrategy::Parallel { workers: 2 }, 500),
        ])
        .unwrap();

        assert_eq!(report.baseline, StrategyKind::Serial);
        approx::assert_relative_eq!(report.speedup(StrategyKind::Concurrent).unwrap(), 4.0);
        approx::assert_relative_eq!(report.speedup(StrategyKind::Parallel).unwrap(), 2.0);
        approx::assert_relative_eq!(report.speedup(StrategyKind::Serial).unwrap(), 1.0);
        assert_eq!(report.to_table().lines().count(), 5);
    }

    #[test]
    fn test_empty_benchmark_rejected() {
        assert!(BenchmarkReport::from_summaries(&[]).is_err());
    }

    #[test]
    fn test_strategy_output_path() {
        assert_eq!(
            strategy_output_path(Path::new("/tmp/ndvi.tif"), StrategyKind::Parallel),
            PathBuf::from("/tmp/ndvi_parallel.tif")
        );
        assert_eq!(
            strategy_output_path(Path::new("ndvi"), StrategyKind::Serial),
            PathBuf::from("ndvi_serial")
        );
    }
}
