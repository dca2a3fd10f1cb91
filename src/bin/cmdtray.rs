// src/bin/cmdtray.rs

use anyhow::Result;
use clap::Parser;
use cmdtray::{
    cli::{Cli, dispatcher},
    core::config_store::ConfigStore,
    t,
};
use colored::*;

/// Sets up logging, opens the store, and reports any error in one place.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let store = ConfigStore::open_default()?;
    if let Some(report) = store.initialize()? {
        println!(
            "{}",
            format!(
                t!("main.info.migrated_favorites"),
                count = report.migrated.len(),
                upgraded = report.upgraded.len()
            )
            .dimmed()
        );
        for label in &report.skipped {
            println!(
                "{}",
                format!(t!("main.warning.skipped_favorite"), label = label).yellow()
            );
        }
    }

    dispatcher::dispatch(cli.args, &store)
}
