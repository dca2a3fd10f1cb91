use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::core::{config_store::ConfigStore, tree_display};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Displays the command tree.")]
struct TreeArgs {
    /// Top-level group to show. Defaults to the whole tree.
    group: Option<String>,

    /// Re-read the command file instead of using the cache.
    #[arg(long, short)]
    refresh: bool,
}

pub fn handle(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let tree_args = TreeArgs::try_parse_from(&args)?;
    let tree = store.get_commands(tree_args.refresh)?;

    if tree.is_empty() {
        println!("\n{}", t!("tree.info.empty"));
        return Ok(());
    }

    let header = match &tree_args.group {
        Some(name) => format!(t!("tree.header.group"), name = name.cyan()),
        None => format!(
            t!("tree.header.all"),
            path = store.commands_path().display().to_string().dimmed()
        ),
    };

    let rendered = tree_display::render_tree(&tree, tree_args.group.as_deref()).ok_or_else(|| {
        anyhow!(
            t!("common.error.group_not_found"),
            name = tree_args.group.as_deref().unwrap_or_default()
        )
    })?;

    println!("\n{}", header.bold());
    print!("{}", rendered);
    Ok(())
}
