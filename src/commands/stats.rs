//! Write the statistics row of one library.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use minute_lib::scaling::read_count;
use minute_lib::stats::{
    ReadCounts, library_stats, parse_duplication_metrics, parse_insert_size_metrics,
};
use minute_lib::validation::validate_file_exists;
use minute_metrics::write_metrics_auto;

use crate::commands::command::Command;

/// Library statistics command.
#[derive(Debug, Parser)]
#[command(
    name = "stats",
    about = "\x1b[38;5;180m[STATS]\x1b[0m         \x1b[36mCollect the statistics of one library\x1b[0m",
    long_about = r#"
Combines the read counts of a library at each stage of the pipeline with the
Picard duplication and insert size metrics into one statistics row with the
columns library, mapped_reads, dedup_mapped_reads, restricted_reads,
estimated_library_size, percent_duplication and median_insert_size.

Count files hold a single integer or `samtools flagstat` output.
"#
)]
pub struct Stats {
    /// Library name written into the row
    #[arg(short = 'n', long = "library")]
    pub library: String,

    /// Mapped read count before duplicate removal
    #[arg(long = "mapped")]
    pub mapped: PathBuf,

    /// Mapped read count after duplicate removal
    #[arg(long = "dedup")]
    pub dedup: PathBuf,

    /// Read count after removing excluded regions
    #[arg(long = "restricted")]
    pub restricted: PathBuf,

    /// Picard MarkDuplicates metrics file
    #[arg(short = 'd', long = "duplication-metrics")]
    pub duplication_metrics: PathBuf,

    /// Picard CollectInsertSizeMetrics metrics file
    #[arg(short = 'I', long = "insert-size-metrics")]
    pub insert_size_metrics: Option<PathBuf>,

    /// Output statistics file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

impl Command for Stats {
    fn execute(&self, _command_line: &str) -> Result<()> {
        validate_file_exists(&self.duplication_metrics, "duplication-metrics")?;

        let counts = ReadCounts {
            mapped: read_count(&self.mapped)?,
            deduplicated: read_count(&self.dedup)?,
            restricted: read_count(&self.restricted)?,
        };
        let duplication = parse_duplication_metrics(&self.duplication_metrics)?;
        let insert_size =
            self.insert_size_metrics.as_ref().map(parse_insert_size_metrics).transpose()?;

        let row = library_stats(&self.library, counts, &duplication, insert_size.as_ref())?;
        info!(
            "{}: {} mapped, {} after deduplication ({:.2}% duplication)",
            row.library, row.mapped_reads, row.dedup_mapped_reads, row.percent_duplication
        );
        write_metrics_auto(&self.output, &[row])?;
        Ok(())
    }
}
