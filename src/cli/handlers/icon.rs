use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::core::config_store::ConfigStore;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Resolves an icon spec (path, URL or data URI) to the file the tray would load."
)]
struct IconArgs {
    /// The icon spec. Omit it to show the default icon.
    spec: Option<String>,
}

pub fn handle(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let icon_args = IconArgs::try_parse_from(&args)?;
    let path = store.resolve_icon(icon_args.spec.as_deref());

    let marker = if path.exists() {
        "✔".green()
    } else {
        "✖".red()
    };
    println!("{} {}", marker, path.display());
    Ok(())
}
