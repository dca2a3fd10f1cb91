use clap::Parser;

pub mod dispatcher;
pub mod handlers;

/// Renders the help template from the locale file, coloring its semantic tags.
fn build_help_string() -> &'static str {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();
    let style = |code: &'static str| if use_colors { code } else { "" };

    let title = style("\x1b[1;33m"); // Bold Yellow
    let cmd = style("\x1b[36m"); // Cyan
    let group = style("\x1b[1;32m"); // Bold Green
    let err = style("\x1b[91m"); // Bright Red, destructive actions
    let dim = style("\x1b[2m");
    let reset = style("\x1b[0m");

    let rendered = t!("cli.help.template")
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<group>", group)
        .replace("</group>", reset)
        .replace("<err>", err)
        .replace("</err>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset);

    Box::leak(rendered.into_boxed_str())
}

/// cmdtray: inspect and maintain the command tree of the tray launcher.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    help_template = { build_help_string() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// Action followed by its own arguments; each handler parses the rest.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
