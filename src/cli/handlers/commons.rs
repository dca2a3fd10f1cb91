// src/cli/handlers/commons.rs

// Helpers shared by several handlers.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::{
    constants::{DISPLAY_SEPARATOR, PATH_SEPARATOR},
    core::config_store::BackupStatus,
    models::ResolvedCommand,
};

/// Asks a yes/no question on the terminal.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// `Dev.Docker.Up` -> `Dev → Docker → Up`.
pub fn display_path(path: &str) -> String {
    path.split(PATH_SEPARATOR)
        .collect::<Vec<_>>()
        .join(DISPLAY_SEPARATOR)
}

/// Tells the user what happened to the snapshot taken before a write.
pub fn report_backup(status: &BackupStatus) {
    match status {
        BackupStatus::Created(path) => println!(
            "  {} {}",
            t!("backup.info.created").dimmed(),
            path.display().to_string().dimmed()
        ),
        BackupStatus::NothingToBackUp => {}
        BackupStatus::Failed(reason) => println!(
            "{}",
            format!(t!("backup.warning.gap"), reason = reason).yellow()
        ),
    }
}

/// Short flag summary shown next to a command (`confirm, output, prompt`).
pub fn flag_summary(resolved: &ResolvedCommand) -> String {
    let mut flags = Vec::new();
    if resolved.confirm {
        flags.push("confirm");
    }
    if resolved.show_output {
        flags.push("output");
    }
    if resolved.prompt.is_some() {
        flags.push("prompt");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path() {
        assert_eq!(display_path("Dev.Docker.Up"), "Dev → Docker → Up");
        assert_eq!(display_path("Solo"), "Solo");
    }

    #[test]
    fn test_flag_summary() {
        let mut resolved = ResolvedCommand::default();
        assert_eq!(flag_summary(&resolved), "");
        resolved.confirm = true;
        resolved.prompt = Some("Name?".to_string());
        assert_eq!(flag_summary(&resolved), " [confirm, prompt]");
    }
}
