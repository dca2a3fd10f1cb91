// src/models.rs

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::constants::{HISTORY_LIMIT, ICON_KEY, PATH_SEPARATOR, PROMPT_PLACEHOLDER};
use crate::core::validator;

// --- COMMAND TREE MODELS ---
// The persisted tree has no discriminant tags: a child is a command when it has
// a `command` key, a reference when it has a `ref` key, and a group otherwise.
// `validator::parse_tree` derives the shape once; everything past it matches on `Node`.

/// The whole command tree: group name -> group, in menu order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandTree {
    pub groups: IndexMap<String, GroupNode>,
}

/// A named container of commands and nested groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupNode {
    /// Icon specifier inherited by descendants that do not set their own.
    pub icon: Option<String>,
    pub children: IndexMap<String, Node>,
}

/// A child of a group.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(GroupNode),
    Command(CommandEntry),
    Reference(Reference),
}

/// A runnable leaf: a shell command line plus display/behavior flags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub show_output: bool,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Keys this engine does not interpret. Kept so a save never drops user data.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandEntry {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }
}

/// A lazy pointer (`Group.Sub.Label`) to a live command elsewhere in the tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    #[serde(rename = "ref")]
    pub path: String,
    /// Command text recorded when the reference was created, if known.
    /// Only used to flag staleness; never used as the command itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Other keys stored beside `ref`. Not interpreted; kept across saves.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reference {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original: None,
            extra: Map::new(),
        }
    }

    /// The path split into its segments.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split(PATH_SEPARATOR).collect()
    }
}

impl CommandTree {
    pub fn get(&self, group: &str) -> Option<&GroupNode> {
        self.groups.get(group)
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Converts the tree into its persisted JSON shape.
    pub fn to_value(&self) -> Value {
        // Serializing a tree into a `Value` cannot fail: every key is a string.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Creates the minimal built-in tree used when no bundled defaults exist.
    pub fn builtin_default() -> Self {
        let windows = cfg!(target_os = "windows");
        let pick = |unix: &str, win: &str| if windows { win.to_string() } else { unix.to_string() };

        let mut system = GroupNode {
            icon: Some(pick("icons/system.jpeg", "")),
            ..Default::default()
        };
        system.children.insert(
            "Open Terminal".to_string(),
            Node::Command(CommandEntry::new(pick("terminator", "cmd.exe"))),
        );
        system.children.insert(
            "System Info".to_string(),
            Node::Command(CommandEntry {
                show_output: true,
                ..CommandEntry::new(pick("uname -a", "systeminfo"))
            }),
        );

        let mut utilities = GroupNode {
            icon: Some(pick("icons/utilities.jpeg", "")),
            ..Default::default()
        };
        utilities.children.insert(
            "Text Editor".to_string(),
            Node::Command(CommandEntry::new(pick("geany", "notepad.exe"))),
        );

        let mut groups = IndexMap::new();
        groups.insert("System".to_string(), system);
        groups.insert("Utilities".to_string(), utilities);
        Self { groups }
    }
}

impl Serialize for CommandTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (name, group) in &self.groups {
            map.serialize_entry(name, group)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CommandTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        validator::parse_tree(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for GroupNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.children.len() + usize::from(self.icon.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(icon) = &self.icon {
            map.serialize_entry(ICON_KEY, icon)?;
        }
        for (label, child) in &self.children {
            map.serialize_entry(label, child)?;
        }
        map.end()
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Group(group) => group.serialize(serializer),
            Node::Command(entry) => entry.serialize(serializer),
            Node::Reference(reference) => reference.serialize(serializer),
        }
    }
}

// --- FAVORITES MODELS ---

/// A stored favorite. Current installations only ever write `Reference`;
/// `Inline` is the legacy copy format and is read for compatibility.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FavoriteEntry {
    Reference(Reference),
    Inline(CommandEntry),
}

/// Favorites document: label -> entry, in menu order.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Favorites {
    pub entries: IndexMap<String, FavoriteEntry>,
}

impl Favorites {
    /// Builds the favorites from a raw document, skipping entries of unknown shape.
    /// Favorites are best-effort: one bad entry must not hide all the others.
    pub fn from_value(raw: Value) -> Self {
        let Value::Object(map) = raw else {
            log::warn!("Favorites document is not an object. Ignoring it.");
            return Self::default();
        };

        let mut entries = IndexMap::new();
        for (label, item) in map {
            match serde_json::from_value::<FavoriteEntry>(item) {
                Ok(entry) => {
                    entries.insert(label, entry);
                }
                Err(e) => log::warn!("Skipping malformed favorite '{}': {}", label, e),
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// --- HISTORY MODELS ---

/// One executed command, as shown in the "recent commands" menu.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub command: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub show_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// ISO-8601 local time of the execution.
    #[serde(default)]
    pub timestamp: String,
}

/// Inserts `entry` at the front of `history`, dropping any older entry with the
/// same command text and keeping at most `HISTORY_LIMIT` entries.
pub fn push_history(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    history.retain(|existing| existing.command != entry.command);
    history.insert(0, entry);
    history.truncate(HISTORY_LIMIT);
}

/// Restores the history invariants on data read from disk: first occurrence of a
/// command wins, and the list is capped.
pub fn normalize_history(history: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let mut normalized: Vec<HistoryEntry> = Vec::with_capacity(HISTORY_LIMIT);
    for entry in history {
        if normalized.len() == HISTORY_LIMIT {
            break;
        }
        if !normalized.iter().any(|e| e.command == entry.command) {
            normalized.push(entry);
        }
    }
    normalized
}

// --- RESOLUTION MODELS ---

/// The live fields of a command, read fresh from the tree on every resolution.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCommand {
    pub command: String,
    pub icon: Option<String>,
    pub show_output: bool,
    pub confirm: bool,
    pub prompt: Option<String>,
}

impl From<&CommandEntry> for ResolvedCommand {
    fn from(entry: &CommandEntry) -> Self {
        Self {
            command: entry.command.clone(),
            icon: entry.icon.clone(),
            show_output: entry.show_output,
            confirm: entry.confirm,
            prompt: entry.prompt.clone(),
        }
    }
}

impl ResolvedCommand {
    /// Returns the command line with every `{promptInput}` replaced by `input`.
    /// Commands without a prompt are returned untouched.
    pub fn render(&self, input: Option<&str>) -> String {
        match (&self.prompt, input) {
            (Some(_), Some(value)) => self.command.replace(PROMPT_PLACEHOLDER, value),
            _ => self.command.clone(),
        }
    }

    /// Builds the history record for an execution of this command.
    pub fn to_history_entry(&self, title: &str, timestamp: String) -> HistoryEntry {
        HistoryEntry {
            command: self.command.clone(),
            title: title.to_string(),
            confirm: self.confirm,
            show_output: self.show_output,
            prompt: self.prompt.clone(),
            timestamp,
        }
    }
}

// --- BACKUP MODELS ---

/// A snapshot of the command tree document found in the backups directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: PathBuf,
    /// Raw `YYYYMMDD_HHMMSS` stamp taken from the file name.
    pub stamp: String,
    /// Collision counter for snapshots taken within the same second.
    pub sequence: u32,
    /// Human readable `YYYY-MM-DD HH:MM:SS`.
    pub display_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(command: &str) -> HistoryEntry {
        HistoryEntry {
            command: command.to_string(),
            title: command.to_uppercase(),
            ..Default::default()
        }
    }

    #[test]
    fn test_push_history_dedups_and_moves_to_front() {
        let mut history = vec![entry("ls"), entry("make"), entry("top")];
        push_history(&mut history, entry("make"));

        let commands: Vec<_> = history.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["make", "ls", "top"]);
    }

    #[test]
    fn test_push_history_never_exceeds_limit() {
        let mut history = Vec::new();
        for i in 0..25 {
            push_history(&mut history, entry(&format!("cmd {}", i)));
            assert!(history.len() <= HISTORY_LIMIT);
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].command, "cmd 24");
        assert_eq!(history[9].command, "cmd 15");
    }

    #[test]
    fn test_normalize_history_keeps_first_occurrence() {
        let history = vec![entry("a"), entry("b"), entry("a"), entry("c")];
        let normalized = normalize_history(history);
        let commands: Vec<_> = normalized.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_render_replaces_placeholder_only_with_prompt() {
        let mut resolved = ResolvedCommand {
            command: "grep {promptInput} notes.txt".to_string(),
            ..Default::default()
        };
        assert_eq!(resolved.render(Some("todo")), "grep {promptInput} notes.txt");

        resolved.prompt = Some("Search for:".to_string());
        assert_eq!(resolved.render(Some("todo")), "grep todo notes.txt");
        assert_eq!(resolved.render(None), "grep {promptInput} notes.txt");
    }

    #[test]
    fn test_favorites_from_value_reads_both_formats() {
        let raw = json!({
            "Quick Build": { "ref": "Dev.Build" },
            "Old Copy": { "command": "make clean", "confirm": true, "prompt": null },
            "Garbage": 42
        });
        let favorites = Favorites::from_value(raw);

        assert_eq!(favorites.len(), 2);
        assert_eq!(
            favorites.entries["Quick Build"],
            FavoriteEntry::Reference(Reference::new("Dev.Build"))
        );
        match &favorites.entries["Old Copy"] {
            FavoriteEntry::Inline(entry) => {
                assert_eq!(entry.command, "make clean");
                assert!(entry.confirm);
                assert_eq!(entry.prompt, None);
            }
            other => panic!("expected inline favorite, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_serializes_with_ref_key() {
        let value = serde_json::to_value(Reference::new("Dev.Build")).unwrap();
        assert_eq!(value, json!({ "ref": "Dev.Build" }));
    }

    #[test]
    fn test_tree_serializes_icon_first_and_keeps_order() {
        let tree = CommandTree::builtin_default();
        let text = serde_json::to_string(&tree).unwrap();
        let system = text.find("\"System\"").unwrap();
        let utilities = text.find("\"Utilities\"").unwrap();
        assert!(system < utilities);

        let value = tree.to_value();
        let first_key = value["System"].as_object().unwrap().keys().next().unwrap().clone();
        assert_eq!(first_key, "icon");
    }
}
