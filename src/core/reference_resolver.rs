//! # Reference Resolver
//!
//! Follows a dotted path (`Group.Sub.Label`) into the command tree and returns the
//! live fields of the command it names. Nothing is cached on the reference: every
//! call reads the tree, so edits to a command show through every favorite that
//! points at it.
//!
//! A path that cannot be followed is not an error condition for the caller. It
//! yields an [`UnresolvedReference`] the host renders as a broken entry.

use std::fmt;
use thiserror::Error;

use crate::constants::PATH_SEPARATOR;
use crate::models::{CommandTree, FavoriteEntry, GroupNode, Node, ResolvedCommand};

/// Why a reference could not be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Fewer than two segments, or an empty segment.
    MalformedPath,
    /// The first segment is not a top-level group.
    GroupNotFound,
    /// An intermediate segment is missing or is not a group.
    PathPartNotFound,
    /// The last segment is missing, a group, or another reference.
    InvalidTarget,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MalformedPath => "malformed path",
            Self::GroupNotFound => "group not found",
            Self::PathPartNotFound => "path part not found",
            Self::InvalidTarget => "invalid target",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Reference '{path}' cannot be resolved: {reason}")]
pub struct UnresolvedReference {
    pub path: String,
    pub reason: UnresolvedReason,
}

impl UnresolvedReference {
    fn new(path: &str, reason: UnresolvedReason) -> Self {
        Self {
            path: path.to_string(),
            reason,
        }
    }
}

pub type Resolution = Result<ResolvedCommand, UnresolvedReference>;

/// Resolves `path` against `tree`.
///
/// # Errors
/// Returns an [`UnresolvedReference`] describing the first segment that could
/// not be followed.
pub fn resolve_reference(tree: &CommandTree, path: &str) -> Resolution {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let [first, intermediate @ .., last] = segments.as_slice() else {
        return Err(UnresolvedReference::new(path, UnresolvedReason::MalformedPath));
    };
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(UnresolvedReference::new(path, UnresolvedReason::MalformedPath));
    }

    let mut group: &GroupNode = tree
        .get(*first)
        .ok_or_else(|| UnresolvedReference::new(path, UnresolvedReason::GroupNotFound))?;

    for segment in intermediate {
        group = match group.children.get(*segment) {
            Some(Node::Group(child)) => child,
            _ => {
                return Err(UnresolvedReference::new(
                    path,
                    UnresolvedReason::PathPartNotFound,
                ));
            }
        };
    }

    match group.children.get(*last) {
        Some(Node::Command(entry)) => Ok(ResolvedCommand::from(entry)),
        _ => Err(UnresolvedReference::new(path, UnresolvedReason::InvalidTarget)),
    }
}

/// Health of one favorite against the current tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteStatus {
    /// A reference that resolves. `stale` is set when the command text recorded
    /// at creation no longer matches the live command.
    Live {
        resolved: ResolvedCommand,
        stale: bool,
    },
    /// A legacy inline copy. It runs, but does not follow edits to the tree.
    Inline(ResolvedCommand),
    Broken(UnresolvedReference),
}

impl FavoriteStatus {
    /// The command to run, if there is one.
    pub fn resolved(&self) -> Option<&ResolvedCommand> {
        match self {
            Self::Live { resolved, .. } | Self::Inline(resolved) => Some(resolved),
            Self::Broken(_) => None,
        }
    }

    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken(_))
    }
}

/// Resolves a stored favorite.
pub fn resolve_favorite(tree: &CommandTree, label: &str, entry: &FavoriteEntry) -> FavoriteStatus {
    match entry {
        FavoriteEntry::Inline(copy) => FavoriteStatus::Inline(ResolvedCommand::from(copy)),
        FavoriteEntry::Reference(reference) => match resolve_reference(tree, &reference.path) {
            Ok(resolved) => {
                let stale = reference
                    .original
                    .as_deref()
                    .is_some_and(|original| original != resolved.command);
                if stale {
                    log::warn!(
                        "Favorite '{}' is stale: '{}' now runs '{}'",
                        label,
                        reference.path,
                        resolved.command
                    );
                }
                FavoriteStatus::Live { resolved, stale }
            }
            Err(unresolved) => {
                log::debug!("Favorite '{}' is broken: {}", label, unresolved);
                FavoriteStatus::Broken(unresolved)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::parse_tree;
    use crate::models::{CommandEntry, Reference};
    use serde_json::json;

    fn tree() -> CommandTree {
        parse_tree(&json!({
            "Dev": {
                "icon": "dev.png",
                "Build": { "command": "make", "confirm": false },
                "Tools": {
                    "Lint": { "command": "cargo clippy", "showOutput": true, "prompt": null }
                },
                "Alias": { "ref": "Dev.Build" }
            }
        }))
        .unwrap()
    }

    fn reason(path: &str) -> UnresolvedReason {
        resolve_reference(&tree(), path).unwrap_err().reason
    }

    #[test]
    fn test_resolves_top_level_command() {
        let resolved = resolve_reference(&tree(), "Dev.Build").unwrap();
        assert_eq!(
            resolved,
            ResolvedCommand {
                command: "make".to_string(),
                icon: None,
                show_output: false,
                confirm: false,
                prompt: None,
            }
        );
    }

    #[test]
    fn test_resolves_nested_command() {
        let resolved = resolve_reference(&tree(), "Dev.Tools.Lint").unwrap();
        assert_eq!(resolved.command, "cargo clippy");
        assert!(resolved.show_output);
    }

    #[test]
    fn test_unresolved_reasons() {
        assert_eq!(reason("Dev"), UnresolvedReason::MalformedPath);
        assert_eq!(reason("Dev..Build"), UnresolvedReason::MalformedPath);
        assert_eq!(reason(""), UnresolvedReason::MalformedPath);
        assert_eq!(reason("Ops.Build"), UnresolvedReason::GroupNotFound);
        assert_eq!(reason("Dev.Nope.Lint"), UnresolvedReason::PathPartNotFound);
        assert_eq!(reason("Dev.Build.More"), UnresolvedReason::PathPartNotFound);
        assert_eq!(reason("Dev.Missing"), UnresolvedReason::InvalidTarget);
        assert_eq!(reason("Dev.Tools"), UnresolvedReason::InvalidTarget);
        assert_eq!(reason("Dev.Alias"), UnresolvedReason::InvalidTarget);
    }

    #[test]
    fn test_resolution_reads_live_value() {
        let mut tree = tree();
        assert_eq!(resolve_reference(&tree, "Dev.Build").unwrap().command, "make");

        if let Some(Node::Command(entry)) = tree.groups.get_mut("Dev").unwrap().children.get_mut("Build") {
            entry.command = "make -j8".to_string();
        }
        assert_eq!(resolve_reference(&tree, "Dev.Build").unwrap().command, "make -j8");
    }

    #[test]
    fn test_favorite_status() {
        let tree = tree();

        let live = FavoriteEntry::Reference(Reference::new("Dev.Build"));
        assert!(matches!(
            resolve_favorite(&tree, "b", &live),
            FavoriteStatus::Live { stale: false, .. }
        ));

        let stale = FavoriteEntry::Reference(Reference {
            original: Some("make all".to_string()),
            ..Reference::new("Dev.Build")
        });
        let status = resolve_favorite(&tree, "b", &stale);
        assert!(matches!(status, FavoriteStatus::Live { stale: true, .. }));
        assert_eq!(status.resolved().unwrap().command, "make");

        let inline = FavoriteEntry::Inline(CommandEntry::new("htop"));
        assert_eq!(
            resolve_favorite(&tree, "h", &inline).resolved().unwrap().command,
            "htop"
        );

        let broken = FavoriteEntry::Reference(Reference::new("Gone.Thing"));
        let status = resolve_favorite(&tree, "g", &broken);
        assert!(status.is_broken());
        assert!(status.resolved().is_none());
    }

    #[test]
    fn test_unresolved_display() {
        let err = resolve_reference(&tree(), "Ops.Build").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reference 'Ops.Build' cannot be resolved: group not found"
        );
    }
}
