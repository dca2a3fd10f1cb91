//! # Legacy Favorites Migration
//!
//! Old installations kept favorites as a `"Favorites"` group inside the command
//! tree, holding copies of commands. Current installations keep them in their own
//! document as references. This module moves the group out of the tree and into
//! the favorites document.
//!
//! Entries from the tree win over same-named entries already in the favorites
//! document. A copied command whose text matches exactly one live command is
//! upgraded to a reference to it; anything else is kept as an inline copy so that
//! no favorite is ever lost. Nested groups cannot be favorites: they stay in a
//! `"Favorites"` group in the tree, which is removed only once it is empty.

use indexmap::IndexMap;

use crate::constants::LEGACY_FAVORITES_GROUP;
use crate::core::catalog;
use crate::models::{CommandTree, FavoriteEntry, Favorites, Node, Reference};

/// What a migration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Labels moved into the favorites document.
    pub migrated: Vec<String>,
    /// Labels whose copy was turned into a reference.
    pub upgraded: Vec<String>,
    /// Nested groups left in the tree's `"Favorites"` group.
    pub skipped: Vec<String>,
}

/// Moves the legacy favorites group out of `tree` and merges it into `favorites`.
///
/// Returns `None`, leaving both untouched, when the tree has no legacy group
/// or the group holds nothing that can become a favorite.
pub fn migrate_legacy_favorites(
    tree: &mut CommandTree,
    favorites: &mut Favorites,
) -> Option<MigrationReport> {
    let has_entries = tree.get(LEGACY_FAVORITES_GROUP).is_some_and(|group| {
        group
            .children
            .values()
            .any(|node| !matches!(node, Node::Group(_)))
    });
    if !has_entries {
        return None;
    }

    let children = tree
        .groups
        .get_mut(LEGACY_FAVORITES_GROUP)
        .map(|group| std::mem::take(&mut group.children))?;
    let mut report = MigrationReport::default();
    let mut kept = IndexMap::new();

    for (label, node) in children {
        let entry = match node {
            Node::Reference(reference) => FavoriteEntry::Reference(reference),
            Node::Command(entry) => match catalog::paths_running(tree, &entry.command).as_slice() {
                [only] => {
                    report.upgraded.push(label.clone());
                    FavoriteEntry::Reference(Reference {
                        path: only.clone(),
                        original: Some(entry.command.clone()),
                        extra: Default::default(),
                    })
                }
                _ => FavoriteEntry::Inline(entry),
            },
            group @ Node::Group(_) => {
                log::warn!(
                    "Legacy favorite '{}' is a group; it stays in the '{}' group.",
                    label,
                    LEGACY_FAVORITES_GROUP
                );
                report.skipped.push(label.clone());
                kept.insert(label, group);
                continue;
            }
        };
        favorites.entries.insert(label.clone(), entry);
        report.migrated.push(label);
    }

    if kept.is_empty() {
        tree.groups.shift_remove(LEGACY_FAVORITES_GROUP);
    } else if let Some(group) = tree.groups.get_mut(LEGACY_FAVORITES_GROUP) {
        group.children = kept;
    }

    Some(report)
}
