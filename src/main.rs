//! canopy - a concurrent content-graph builder for static sites.

mod builder;
mod cli;
mod config;
mod content;
mod hook;
mod logger;
mod meta;
mod pool;
mod reader;
mod utils;
mod writer;

use anyhow::Result;
use builder::{BuildReport, Builder};
use clap::Parser;
use cli::Cli;
use config::SiteConfig;
use hook::HookRegistry;
use reader::ReaderRegistry;
use std::{path::Path, sync::Arc};
use writer::DataWriter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let hooks = HookRegistry::builtin().chain(&config.build.hooks)?;
    log!("hook"; "chain: [{}]", hooks.names().join(", "));
    let builder = Builder::new(&config, ReaderRegistry::builtin(), hooks);

    let output = if cli.is_check() {
        builder.build_graph()?
    } else {
        let writer = DataWriter::new(config.build.output.clone(), config.build.templates.clone());
        builder.build(Arc::new(writer))?
    };
    log_report(&output.report);
    Ok(())
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    logger::set_quiet(cli.quiet);

    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        log!("warn"; "{} not found, using defaults", config_path.display());
        SiteConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}

fn log_report(report: &BuildReport) {
    log!(
        "build";
        "{} languages: {} pages, {} sections, {} taxonomies, {} terms",
        report.languages, report.pages, report.sections, report.taxonomies, report.terms
    );
    if report.skipped > 0 || report.dropped > 0 {
        log!("build"; "{} files skipped, {} entities dropped by hooks", report.skipped, report.dropped);
    }
}
