use anyhow::{Result, anyhow};

use crate::{cli::handlers, core::config_store::ConfigStore};

/// An action, its aliases, and the handler that receives the remaining arguments.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &ConfigStore) -> Result<()>,
}

/// The single source of truth for all actions.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "backup",
        aliases: &["bk"],
        handler: handlers::backup::handle,
    },
    CommandDefinition {
        name: "export",
        aliases: &[],
        handler: handlers::transfer::handle_export,
    },
    CommandDefinition {
        name: "fav",
        aliases: &["favorites"],
        handler: handlers::favorites::handle,
    },
    CommandDefinition {
        name: "history",
        aliases: &["hist"],
        handler: handlers::history::handle,
    },
    CommandDefinition {
        name: "icon",
        aliases: &[],
        handler: handlers::icon::handle,
    },
    CommandDefinition {
        name: "import",
        aliases: &[],
        handler: handlers::transfer::handle_import,
    },
    CommandDefinition {
        name: "resolve",
        aliases: &["show"],
        handler: handlers::resolve::handle,
    },
    CommandDefinition {
        name: "search",
        aliases: &["find"],
        handler: handlers::search::handle,
    },
    CommandDefinition {
        name: "tree",
        aliases: &["ls"],
        handler: handlers::tree::handle,
    },
];

/// Finds an action in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Routes `cmdtray <action> [args...]`. Without an action the tree is shown.
pub fn dispatch(all_args: Vec<String>, store: &ConfigStore) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let mut args = all_args.into_iter();
    let Some(action) = args.next() else {
        return handlers::tree::handle(Vec::new(), store);
    };

    let command = find_command(&action)
        .ok_or_else(|| anyhow!(t!("dispatcher.error.unknown_action"), action = action))?;
    (command.handler)(args.collect(), store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_command_by_name_and_alias() {
        assert_eq!(find_command("tree").unwrap().name, "tree");
        assert_eq!(find_command("ls").unwrap().name, "tree");
        assert_eq!(find_command("find").unwrap().name, "search");
        assert!(find_command("run").is_none());
    }

    #[test]
    fn test_registry_names_are_unique() {
        let mut seen: Vec<&str> = Vec::new();
        for cmd in COMMAND_REGISTRY {
            for name in std::iter::once(&cmd.name).chain(cmd.aliases.iter()) {
                assert!(!seen.contains(name), "duplicate action name '{}'", name);
                seen.push(name);
            }
        }
    }
}
