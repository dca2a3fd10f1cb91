//! # Handler for the `resolve` command
//!
//! Follows a dotted command path (`Group.Sub.Label`) through the live tree and
//! prints what a launcher would run: the command line, its flags, the icon file
//! it would show, and the command with the prompt answer filled in.
//!
//! With `--record` the command is also added to the execution history, exactly
//! as the tray does after running it. Nothing is executed.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use dialoguer::{Input, theme::ColorfulTheme};

use crate::{
    cli::handlers::commons,
    constants::PATH_SEPARATOR,
    core::config_store::ConfigStore,
};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Shows the live command behind a dotted path.")]
struct ResolveArgs {
    /// Dotted path to the command, e.g. `Dev.Build`.
    path: String,

    /// Answer to the command's prompt, substituted for `{promptInput}`.
    #[arg(long, short)]
    input: Option<String>,

    /// Record the command in the execution history.
    #[arg(long)]
    record: bool,
}

pub fn handle(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let resolve_args = ResolveArgs::try_parse_from(&args)?;
    let resolved = store.resolve_reference(&resolve_args.path)??;

    println!("\n{}", commons::display_path(&resolve_args.path).bold());
    println!("  {:<10} {}", t!("resolve.label.command"), resolved.command.cyan());
    println!("  {:<10} {}", t!("resolve.label.confirm"), resolved.confirm);
    println!("  {:<10} {}", t!("resolve.label.output"), resolved.show_output);
    if let Some(prompt) = &resolved.prompt {
        println!("  {:<10} {}", t!("resolve.label.prompt"), prompt);
    }
    let icon = store.resolve_icon(resolved.icon.as_deref());
    println!("  {:<10} {}", t!("resolve.label.icon"), icon.display().to_string().dimmed());

    // Only ask for the prompt answer when it will actually be used.
    let input = match (&resolved.prompt, resolve_args.input) {
        (Some(prompt), None) if resolve_args.record => Some(
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .interact_text()?,
        ),
        (_, input) => input,
    };
    if resolved.prompt.is_some() {
        println!(
            "  {:<10} {}",
            t!("resolve.label.rendered"),
            resolved.render(input.as_deref()).green()
        );
    }

    if resolve_args.record {
        let title = resolve_args
            .path
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(&resolve_args.path);
        let entry = store.record_execution(title, &resolved)?;
        println!(
            "\n{} {}",
            t!("common.success"),
            format!(t!("resolve.success.recorded"), timestamp = entry.timestamp)
        );
    }
    Ok(())
}
