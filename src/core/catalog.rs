// src/core/catalog.rs

use crate::constants::{DISPLAY_SEPARATOR, PATH_SEPARATOR};
use crate::core::reference_resolver::resolve_reference;
use crate::models::{CommandTree, GroupNode, Node, ResolvedCommand};

/// One runnable entry of the tree, flattened for search and listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    /// Dotted path (`Group.Sub.Label`).
    pub path: String,
    /// Groups from the top level down to the item's parent.
    pub trail: Vec<String>,
    pub label: String,
    pub resolved: ResolvedCommand,
    /// The item's own icon, or the nearest ancestor group's.
    pub icon: Option<String>,
    /// Target path when the item is a reference inside the tree.
    pub via: Option<String>,
}

impl CatalogItem {
    /// `Group → Sub → Label`.
    pub fn display(&self) -> String {
        let mut parts: Vec<&str> = self.trail.iter().map(String::as_str).collect();
        parts.push(&self.label);
        parts.join(DISPLAY_SEPARATOR)
    }
}

/// Lists every runnable command in menu order. References embedded in the tree
/// are followed; broken ones are skipped with a warning.
pub fn flatten(tree: &CommandTree) -> Vec<CatalogItem> {
    let mut items = Vec::new();
    for (name, group) in &tree.groups {
        let mut trail = vec![name.clone()];
        walk(tree, group, &mut trail, non_empty(group.icon.as_ref()), &mut items);
    }
    items
}

fn walk(
    tree: &CommandTree,
    group: &GroupNode,
    trail: &mut Vec<String>,
    inherited: Option<&String>,
    items: &mut Vec<CatalogItem>,
) {
    for (label, child) in &group.children {
        match child {
            Node::Group(nested) => {
                trail.push(label.clone());
                let icon = non_empty(nested.icon.as_ref()).or(inherited);
                walk(tree, nested, trail, icon, items);
                trail.pop();
            }
            Node::Command(entry) => {
                let resolved = ResolvedCommand::from(entry);
                items.push(item(trail, label, resolved, inherited, None));
            }
            Node::Reference(reference) => match resolve_reference(tree, &reference.path) {
                Ok(resolved) => {
                    items.push(item(trail, label, resolved, inherited, Some(&reference.path)));
                }
                Err(e) => log::warn!("Skipping '{}' in the catalog: {}", label, e),
            },
        }
    }
}

fn item(
    trail: &[String],
    label: &str,
    resolved: ResolvedCommand,
    inherited: Option<&String>,
    via: Option<&String>,
) -> CatalogItem {
    let separator = PATH_SEPARATOR.to_string();
    let mut segments = trail.to_vec();
    segments.push(label.to_string());

    let icon = non_empty(resolved.icon.as_ref()).or(inherited).cloned();
    CatalogItem {
        path: segments.join(separator.as_str()),
        trail: trail.to_vec(),
        label: label.to_string(),
        resolved,
        icon,
        via: via.cloned(),
    }
}

fn non_empty(icon: Option<&String>) -> Option<&String> {
    icon.filter(|spec| !spec.trim().is_empty())
}

/// Case-insensitive substring search on the display text. An empty query
/// matches everything.
pub fn search(tree: &CommandTree, query: &str) -> Vec<CatalogItem> {
    let needle = query.trim().to_lowercase();
    flatten(tree)
        .into_iter()
        .filter(|item| item.display().to_lowercase().contains(&needle))
        .collect()
}

/// Paths of the commands (not references) whose command text is exactly `command`.
pub fn paths_running(tree: &CommandTree, command: &str) -> Vec<String> {
    flatten(tree)
        .into_iter()
        .filter(|item| item.via.is_none() && item.resolved.command == command)
        .map(|item| item.path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::parse_tree;
    use serde_json::json;

    fn tree() -> CommandTree {
        parse_tree(&json!({
            "Dev": {
                "icon": "dev.png",
                "Build": { "command": "make" },
                "Docker": {
                    "icon": "docker.png",
                    "Up": { "command": "docker compose up" },
                    "Logs": { "command": "docker logs", "icon": "logs.png" }
                },
                "Plain": {
                    "Status": { "command": "git status" }
                }
            },
            "Shortcuts": {
                "Again": { "ref": "Dev.Build" },
                "Gone": { "ref": "Dev.Nothing" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_flatten_orders_and_paths() {
        let paths: Vec<String> = flatten(&tree()).into_iter().map(|i| i.path).collect();
        assert_eq!(
            paths,
            vec![
                "Dev.Build",
                "Dev.Docker.Up",
                "Dev.Docker.Logs",
                "Dev.Plain.Status",
                "Shortcuts.Again",
            ]
        );
    }

    #[test]
    fn test_icons_are_inherited_from_nearest_group() {
        let items = flatten(&tree());
        let icon_of = |path: &str| {
            items
                .iter()
                .find(|i| i.path == path)
                .and_then(|i| i.icon.clone())
        };
        assert_eq!(icon_of("Dev.Build").as_deref(), Some("dev.png"));
        assert_eq!(icon_of("Dev.Docker.Up").as_deref(), Some("docker.png"));
        assert_eq!(icon_of("Dev.Docker.Logs").as_deref(), Some("logs.png"));
        assert_eq!(icon_of("Dev.Plain.Status").as_deref(), Some("dev.png"));
        assert_eq!(icon_of("Shortcuts.Again"), None);
    }

    #[test]
    fn test_tree_references_are_resolved() {
        let items = flatten(&tree());
        let again = items.iter().find(|i| i.label == "Again").unwrap();
        assert_eq!(again.resolved.command, "make");
        assert_eq!(again.via.as_deref(), Some("Dev.Build"));
    }

    #[test]
    fn test_search_is_case_insensitive_on_display() {
        let found = search(&tree(), "docker →");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].display(), "Dev → Docker → Up");

        assert_eq!(search(&tree(), "STATUS").len(), 1);
        assert_eq!(search(&tree(), "  ").len(), 5);
        assert!(search(&tree(), "compose").is_empty());
    }

    #[test]
    fn test_paths_running_ignores_references() {
        assert_eq!(paths_running(&tree(), "make"), vec!["Dev.Build".to_string()]);
        assert!(paths_running(&tree(), "mak").is_empty());
    }
}
