//! # Handlers for `import` and `export`
//!
//! Moves top-level groups between the live command file and standalone JSON
//! documents of the same shape: `{ "<group>": { "icon": ..., "<label>": { "command": ... } } }`,
//! where every key other than `icon` is a child of the group.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    core::config_store::{ConfigStore, ImportReport, StoreError},
};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Writes one top-level group to a standalone file.")]
struct ExportArgs {
    /// Name of the group to export.
    group: String,
    /// Destination file. Defaults to `<group>.json` in the current directory.
    dest: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Merges the groups of a file into the command tree.")]
struct ImportArgs {
    /// File containing one or more top-level groups.
    file: PathBuf,
    /// Replace existing groups with the same name without asking.
    #[arg(long)]
    overwrite: bool,
}

pub fn handle_export(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let export_args = ExportArgs::try_parse_from(&args)?;
    let dest = export_args
        .dest
        .unwrap_or_else(|| PathBuf::from(format!("{}.json", export_args.group)));

    store.export_group(&export_args.group, &dest)?;
    println!(
        "{} {}",
        t!("common.success"),
        format!(
            t!("transfer.success.exported"),
            name = export_args.group.cyan(),
            path = dest.display().to_string().dimmed()
        )
    );
    Ok(())
}

pub fn handle_import(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let import_args = ImportArgs::try_parse_from(&args)?;

    let report = match store.import_group(&import_args.file, import_args.overwrite) {
        Ok(report) => report,
        Err(StoreError::Conflict { names }) => {
            let prompt = format!(t!("transfer.prompt.overwrite"), names = names.join(", "));
            if !commons::confirm(&prompt, false)? {
                println!("\n{}", t!("common.info.operation_cancelled"));
                return Ok(());
            }
            store.import_group(&import_args.file, true)?
        }
        Err(e) => return Err(e.into()),
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!(
        "{} {}",
        t!("common.success"),
        format!(t!("transfer.success.imported"), count = report.imported.len())
    );
    for name in &report.imported {
        let marker = if report.replaced.contains(name) {
            t!("transfer.info.replaced_marker").yellow().to_string()
        } else {
            String::new()
        };
        println!("  {} {}", name.cyan(), marker);
    }
    commons::report_backup(&report.backup);
}
