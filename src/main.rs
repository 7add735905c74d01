#![deny(unsafe_code)]
pub mod commands;
mod version;

use anyhow::Result;
use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

/// Custom styles for CLI help output
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());
use commands::command::Command;
use commands::dedup_proxy::DedupProxy;
use commands::genome_size::GenomeSize;
use commands::overview::Overview;
use commands::propagate::Propagate;
use commands::proxy::Proxy;
use commands::scale::Scale;
use commands::stats::Stats;
use commands::summarize::Summarize;
use enum_dispatch::enum_dispatch;
use env_logger::Env;
use log::info;

#[derive(Parser, Debug)]
#[command(styles = STYLES)]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
#[command(version)]
enum Subcommand {
    // Experiment
    #[command(display_order = 1)]
    Overview(Overview),

    // Duplicate marking
    #[command(display_order = 2)]
    Proxy(Proxy),
    #[command(display_order = 3)]
    DedupProxy(DedupProxy),
    #[command(display_order = 4)]
    Propagate(Propagate),

    // Scaling
    #[command(display_order = 5)]
    GenomeSize(GenomeSize),
    #[command(display_order = 6)]
    Scale(Scale),

    // Statistics
    #[command(display_order = 7)]
    Stats(Stats),
    #[command(display_order = 8)]
    Summarize(Summarize),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Capture full command line BEFORE clap parsing for @PG records
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");

    let args = Args::parse();

    info!("Running minute version {}", version::VERSION);
    args.subcommand.execute(&command_line)
}
