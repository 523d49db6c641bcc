use std::time::{Duration, Instant};

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{FootprintTilerError, Result};
use crate::ingestion::{self, IngestionResult};
use crate::tiling::{assemble, validate_tileset, AssemblyReport};

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct ProcessingResult {
    pub tile_count: usize,
    pub skipped: usize,
    pub duration: Duration,
}

/// Pipeline orchestrator -- drives ingestion, assembly and validation.
pub struct Pipeline;

impl Pipeline {
    /// Run the full conversion pipeline.
    pub fn run(config: &PipelineConfig) -> Result<ProcessingResult> {
        let start = Instant::now();

        info!(input = %config.input.display(), "Starting pipeline");
        config.tileset.validate()?;

        if config.dry_run {
            info!("--dry-run: scanning input only");
            let ingestion_result = ingestion::ingest(config)?;
            print_dry_run_summary(&ingestion_result, config);
            return Ok(ProcessingResult {
                tile_count: 0,
                skipped: 0,
                duration: start.elapsed(),
            });
        }

        info!("Stage 1/3: Ingestion");
        let ingestion_result = ingestion::ingest(config)?;

        info!("Stage 2/3: Assembly");
        let report = assemble(
            &ingestion_result.features,
            &config.height_attribute,
            &config.output,
            &config.tileset,
        )?;
        print_assembly_summary(&report);

        if config.validate {
            info!("Stage 3/3: Validation");
            Self::validate(config)?;
        }

        let duration = start.elapsed();
        info!(tiles = report.tile_count, elapsed = ?duration, "Pipeline complete");

        Ok(ProcessingResult {
            tile_count: report.tile_count,
            skipped: report.skipped_count(),
            duration,
        })
    }

    fn validate(config: &PipelineConfig) -> Result<()> {
        let report = validate_tileset(&config.output, &config.tileset.tileset_name)?;
        if report.is_valid() {
            println!("Validation passed: {} tiles checked", report.tile_count);
            Ok(())
        } else {
            Err(FootprintTilerError::Output(format!(
                "tileset validation found {} problem(s): {}",
                report.problems.len(),
                report.problems.join("; ")
            )))
        }
    }
}

/// Print per-reason skip counts after assembly.
fn print_assembly_summary(report: &AssemblyReport) {
    println!("=== Assembly ===");
    println!(
        "  Tiles:       {} ({} bytes)",
        report.tile_count, report.content_bytes
    );
    println!("  Skipped:     {}", report.skipped_count());
    for (reason, count) in report.skip_counts() {
        println!("    {reason}: {count}");
    }
    if report.repaired_count > 0 {
        println!("  Repaired:    {}", report.repaired_count);
    }
    if report.approximate_count > 0 {
        println!("  Approximate: {}", report.approximate_count);
    }
    println!("  Tileset:     {}", report.tileset_path.display());
}

/// Print dry-run summary with feature table stats.
fn print_dry_run_summary(ingestion: &IngestionResult, config: &PipelineConfig) {
    let stats = &ingestion.stats;
    println!("=== Dry Run Summary ===");
    println!("  Format:      {}", stats.input_format);
    println!("  Features:    {}", stats.total_features);
    println!("  Vertices:    {}", stats.total_vertices);
    println!("  No geometry: {}", stats.empty_geometries);
    println!(
        "  With {:?}: {}",
        config.height_attribute, stats.with_height
    );
}
