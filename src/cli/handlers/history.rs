use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::{cli::handlers::commons, core::config_store::ConfigStore};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Show or clear the recently executed commands.")]
struct HistoryArgs {
    #[command(subcommand)]
    command: Option<HistoryCommand>,
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// Lists the history, most recent first.
    #[command(name = "list", aliases = ["ls"])]
    List,
    /// Empties the history.
    Clear {
        /// Do not ask for confirmation.
        #[arg(long, short)]
        yes: bool,
    },
}

pub fn handle(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let history_args = HistoryArgs::try_parse_from(&args)?;

    match history_args.command.unwrap_or(HistoryCommand::List) {
        HistoryCommand::List => {
            let history = store.get_history(false);
            if history.is_empty() {
                println!("\n{}", t!("history.info.empty"));
                return Ok(());
            }

            println!("\n{}:", t!("history.info.header"));
            for (i, entry) in history.iter().enumerate() {
                println!(
                    "  {:>2}. {}  {}  {}",
                    i + 1,
                    entry.timestamp.dimmed(),
                    entry.title.cyan(),
                    entry.command
                );
            }
            Ok(())
        }
        HistoryCommand::Clear { yes } => {
            if !yes && !commons::confirm(t!("history.prompt.clear"), false)? {
                println!("\n{}", t!("common.info.operation_cancelled"));
                return Ok(());
            }
            store.clear_history()?;
            println!("{} {}", t!("common.success"), t!("history.success.cleared"));
            Ok(())
        }
    }
}
