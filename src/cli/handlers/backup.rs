//! # Handler for the `backup` command
//!
//! Takes, lists and restores snapshots of the command file. Every write of the
//! tree already snapshots the previous version, so `create` is only needed
//! before hand edits.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{Select, theme::ColorfulTheme};

use crate::{cli::handlers::commons, core::config_store::ConfigStore, models::BackupInfo};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Create, list and restore backups of the command file.")]
struct BackupArgs {
    #[command(subcommand)]
    command: Option<BackupCommand>,
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    /// Snapshots the current command file.
    Create,
    /// Lists available backups, newest first.
    #[command(name = "list", aliases = ["ls"])]
    List,
    /// Replaces the command file with a backup.
    Restore {
        /// Backup file to restore. Asks interactively when omitted.
        path: Option<PathBuf>,
        /// Do not ask for confirmation.
        #[arg(long, short)]
        yes: bool,
    },
}

pub fn handle(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let backup_args = BackupArgs::try_parse_from(&args)?;

    match backup_args.command.unwrap_or(BackupCommand::List) {
        BackupCommand::Create => match store.backup_commands()? {
            Some(path) => {
                println!(
                    "{} {} {}",
                    t!("common.success"),
                    t!("backup.success.created"),
                    path.display().to_string().dimmed()
                );
                Ok(())
            }
            None => {
                println!("\n{}", t!("backup.info.nothing_to_back_up"));
                Ok(())
            }
        },
        BackupCommand::List => {
            let backups = store.list_backups()?;
            if backups.is_empty() {
                println!("\n{}", t!("backup.info.none"));
                return Ok(());
            }
            println!(
                "\n{}",
                format!(
                    t!("backup.info.header"),
                    path = store.backups_dir().display().to_string().dimmed()
                )
                .bold()
            );
            for info in &backups {
                println!("  {}  {}", info.display_date.cyan(), file_name(info));
            }
            Ok(())
        }
        BackupCommand::Restore { path, yes } => {
            let path = match path {
                Some(path) => path,
                None => match pick_backup(store)? {
                    Some(path) => path,
                    None => return Ok(()),
                },
            };

            if !yes {
                let prompt = format!(
                    t!("backup.prompt.restore"),
                    path = path.display().to_string()
                );
                if !commons::confirm(&prompt, false)? {
                    println!("\n{}", t!("common.info.operation_cancelled"));
                    return Ok(());
                }
            }

            let status = store.restore_from_backup(&path)?;
            println!("{} {}", t!("common.success"), t!("backup.success.restored"));
            commons::report_backup(&status);
            Ok(())
        }
    }
}

fn file_name(info: &BackupInfo) -> String {
    info.path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn pick_backup(store: &ConfigStore) -> Result<Option<PathBuf>> {
    let backups = store.list_backups()?;
    if backups.is_empty() {
        return Err(anyhow!(t!("backup.info.none")));
    }

    let items: Vec<String> = backups
        .iter()
        .map(|info| format!("{}  {}", info.display_date, file_name(info)))
        .collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("backup.prompt.select"))
        .items(&items)
        .default(0)
        .interact_opt()?;

    Ok(selection
        .and_then(|index| backups.into_iter().nth(index))
        .map(|info| info.path))
}
