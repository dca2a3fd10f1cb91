//! # Validator
//!
//! The boundary between untyped JSON and the typed command tree. `parse_tree`
//! checks the structure of a raw document and derives the `Node` shape of every
//! child exactly once; `validate_tree` re-checks a typed tree right before it is
//! written. References are never followed here: a reference to a group that
//! does not exist yet is a resolution-time condition, not a structural error.

use serde_json::{Map, Value};
use std::fmt;

use crate::constants::{ICON_KEY, PATH_SEPARATOR};
use crate::models::{CommandEntry, CommandTree, GroupNode, Node, Reference};

const COMMAND_KEY: &str = "command";
const REF_KEY: &str = "ref";
const SHOW_OUTPUT_KEY: &str = "showOutput";
const CONFIRM_KEY: &str = "confirm";
const PROMPT_KEY: &str = "prompt";
const ORIGINAL_KEY: &str = "original";
const COMMAND_FLAG_KEYS: [&str; 3] = [SHOW_OUTPUT_KEY, CONFIRM_KEY, PROMPT_KEY];
const KNOWN_COMMAND_KEYS: [&str; 6] = [
    COMMAND_KEY,
    REF_KEY,
    ICON_KEY,
    SHOW_OUTPUT_KEY,
    CONFIRM_KEY,
    PROMPT_KEY,
];

/// A structural violation in a command tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Top-level group containing the violation (empty for the document root).
    pub group: String,
    /// Dotted path of the offending child inside `group`, if the group itself is fine.
    pub item: Option<String>,
    pub reason: String,
}

impl ValidationError {
    fn root(reason: impl Into<String>) -> Self {
        Self {
            group: String::new(),
            item: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.group.is_empty(), &self.item) {
            (true, _) => write!(f, "Invalid command tree: {}", self.reason),
            (false, None) => write!(f, "Invalid group '{}': {}", self.group, self.reason),
            (false, Some(item)) => write!(
                f,
                "Invalid item '{}' in group '{}': {}",
                item, self.group, self.reason
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Where the parser currently is: the top-level group plus the labels below it.
struct Location<'a> {
    group: &'a str,
    trail: Vec<&'a str>,
}

impl<'a> Location<'a> {
    fn child(&self, label: &'a str) -> Self {
        let mut trail = self.trail.clone();
        trail.push(label);
        Self {
            group: self.group,
            trail,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ValidationError {
        let item = if self.trail.is_empty() {
            None
        } else {
            let separator = PATH_SEPARATOR.to_string();
            Some(self.trail.join(separator.as_str()))
        };
        ValidationError {
            group: self.group.to_string(),
            item,
            reason: reason.into(),
        }
    }
}

/// Parses and validates a raw command tree document.
///
/// # Errors
/// Returns the first `ValidationError` found, walking groups in document order.
pub fn parse_tree(raw: &Value) -> Result<CommandTree, ValidationError> {
    let Value::Object(groups) = raw else {
        return Err(ValidationError::root("the document must be a mapping of groups"));
    };

    let mut tree = CommandTree::default();
    for (name, value) in groups {
        let location = Location {
            group: name,
            trail: Vec::new(),
        };
        let Value::Object(fields) = value else {
            return Err(location.error("a group must be a mapping"));
        };
        tree.groups.insert(name.clone(), parse_group(fields, &location)?);
    }
    Ok(tree)
}

/// Validates a typed tree before it is persisted.
///
/// Checks what the type system cannot: reserved labels, unknown keys shadowing
/// known ones, and that the serialized document parses back into the same shape.
pub fn validate_tree(tree: &CommandTree) -> Result<(), ValidationError> {
    for (name, group) in &tree.groups {
        let location = Location {
            group: name,
            trail: Vec::new(),
        };
        check_group(group, &location)?;
    }
    parse_tree(&tree.to_value()).map(|_| ())
}

fn parse_group(fields: &Map<String, Value>, location: &Location<'_>) -> Result<GroupNode, ValidationError> {
    let mut group = GroupNode::default();
    for (label, value) in fields {
        if label == ICON_KEY {
            group.icon = optional_string(value).ok_or_else(|| location.error("'icon' must be a string"))?;
            continue;
        }
        let child_location = location.child(label);
        group
            .children
            .insert(label.clone(), parse_child(value, &child_location)?);
    }
    Ok(group)
}

fn parse_child(value: &Value, location: &Location<'_>) -> Result<Node, ValidationError> {
    let Value::Object(fields) = value else {
        return Err(location.error("an item must be a mapping"));
    };

    match (fields.get(COMMAND_KEY), fields.get(REF_KEY)) {
        (Some(_), Some(_)) => Err(location.error("an item must contain exactly one of 'command' or 'ref'")),
        (Some(command), None) => parse_command(command, fields, location).map(Node::Command),
        (None, Some(path)) => parse_reference(path, fields, location).map(Node::Reference),
        (None, None) if COMMAND_FLAG_KEYS.iter().any(|key| fields.contains_key(*key)) => {
            // Flags without a command line: a command entry that lost its `command`.
            read_flags(fields, location)?;
            Err(location.error("an item with command flags must contain 'command'"))
        }
        (None, None) => parse_group(fields, location).map(Node::Group),
    }
}

struct Flags {
    icon: Option<String>,
    show_output: bool,
    confirm: bool,
    prompt: Option<String>,
}

fn read_flags(fields: &Map<String, Value>, location: &Location<'_>) -> Result<Flags, ValidationError> {
    let flag = |key: &str| -> Result<bool, ValidationError> {
        match fields.get(key) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(location.error(format!("'{}' must be a boolean", key))),
        }
    };
    let text = |key: &str| -> Result<Option<String>, ValidationError> {
        match fields.get(key) {
            None => Ok(None),
            Some(v) => optional_string(v).ok_or_else(|| location.error(format!("'{}' must be a string", key))),
        }
    };

    Ok(Flags {
        show_output: flag(SHOW_OUTPUT_KEY)?,
        confirm: flag(CONFIRM_KEY)?,
        prompt: text(PROMPT_KEY)?,
        icon: text(ICON_KEY)?,
    })
}

fn parse_command(
    command: &Value,
    fields: &Map<String, Value>,
    location: &Location<'_>,
) -> Result<CommandEntry, ValidationError> {
    let Value::String(command) = command else {
        return Err(location.error("'command' must be a string"));
    };

    let flags = read_flags(fields, location)?;
    let extra = fields
        .iter()
        .filter(|(key, _)| !KNOWN_COMMAND_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(CommandEntry {
        command: command.clone(),
        icon: flags.icon,
        show_output: flags.show_output,
        confirm: flags.confirm,
        prompt: flags.prompt,
        extra,
    })
}

fn parse_reference(
    path: &Value,
    fields: &Map<String, Value>,
    location: &Location<'_>,
) -> Result<Reference, ValidationError> {
    let Value::String(path) = path else {
        return Err(location.error("'ref' must be a string"));
    };
    let original = match fields.get(ORIGINAL_KEY) {
        None => None,
        Some(v) => optional_string(v).ok_or_else(|| location.error("'original' must be a string"))?,
    };
    let extra = fields
        .iter()
        .filter(|(key, _)| key.as_str() != REF_KEY && key.as_str() != ORIGINAL_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Reference {
        path: path.clone(),
        original,
        extra,
    })
}

fn check_group(group: &GroupNode, location: &Location<'_>) -> Result<(), ValidationError> {
    for (label, child) in &group.children {
        let child_location = location.child(label);
        if label == ICON_KEY {
            return Err(child_location.error("'icon' is reserved for the group icon"));
        }
        match child {
            Node::Group(nested) => check_group(nested, &child_location)?,
            Node::Command(entry) => {
                if let Some(key) = entry
                    .extra
                    .keys()
                    .find(|key| KNOWN_COMMAND_KEYS.contains(&key.as_str()))
                {
                    return Err(child_location.error(format!("unknown field shadows '{}'", key)));
                }
            }
            Node::Reference(_) => {}
        }
    }
    Ok(())
}

/// `Some(None)` for null, `Some(Some(s))` for a string, `None` for any other type.
fn optional_string(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tree_derives_node_shapes() {
        let raw = json!({
            "Dev": {
                "icon": "dev.png",
                "Build": { "command": "make", "confirm": false },
                "Docker": {
                    "icon": "docker.png",
                    "Up": { "command": "docker compose up", "showOutput": true }
                },
                "Alias": { "ref": "Dev.Build" }
            }
        });

        let tree = parse_tree(&raw).unwrap();
        let dev = tree.get("Dev").unwrap();
        assert_eq!(dev.icon.as_deref(), Some("dev.png"));
        assert!(matches!(dev.children["Build"], Node::Command(_)));
        assert!(matches!(dev.children["Alias"], Node::Reference(_)));
        match &dev.children["Docker"] {
            Node::Group(docker) => {
                assert_eq!(docker.icon.as_deref(), Some("docker.png"));
                match &docker.children["Up"] {
                    Node::Command(up) => assert!(up.show_output),
                    other => panic!("expected command, got {:?}", other),
                }
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_string_flag_is_rejected_with_location() {
        let raw = json!({ "Sys": { "Run": { "confirm": "yes" } } });
        let err = parse_tree(&raw).unwrap_err();
        assert_eq!(err.group, "Sys");
        assert_eq!(err.item.as_deref(), Some("Run"));
        assert!(err.reason.contains("confirm"));

        let raw = json!({ "Sys": { "Run": { "confirm": true } } });
        let err = parse_tree(&raw).unwrap_err();
        assert_eq!(err.item.as_deref(), Some("Run"));
        assert!(err.reason.contains("command"));

        let raw = json!({ "Sys": { "Run": { "command": "reboot", "confirm": "yes" } } });
        let err = parse_tree(&raw).unwrap_err();
        assert_eq!(err.group, "Sys");
        assert_eq!(err.item.as_deref(), Some("Run"));
        assert!(err.reason.contains("confirm"));
    }

    #[test]
    fn test_group_must_be_mapping() {
        let err = parse_tree(&json!({ "Broken": "ls" })).unwrap_err();
        assert_eq!(err.group, "Broken");
        assert_eq!(err.item, None);

        let err = parse_tree(&json!(["not", "a", "tree"])).unwrap_err();
        assert!(err.group.is_empty());
    }

    #[test]
    fn test_command_and_ref_are_exclusive() {
        let raw = json!({ "G": { "X": { "command": "ls", "ref": "G.Y" } } });
        let err = parse_tree(&raw).unwrap_err();
        assert_eq!(err.item.as_deref(), Some("X"));
    }

    #[test]
    fn test_non_string_prompt_and_command_rejected() {
        let raw = json!({ "G": { "X": { "command": 7 } } });
        assert!(parse_tree(&raw).unwrap_err().reason.contains("command"));

        let raw = json!({ "G": { "X": { "command": "ls", "prompt": ["a"] } } });
        assert!(parse_tree(&raw).unwrap_err().reason.contains("prompt"));
    }

    #[test]
    fn test_nested_error_reports_dotted_item() {
        let raw = json!({ "G": { "Sub": { "Deep": { "command": "ls", "showOutput": 1 } } } });
        let err = parse_tree(&raw).unwrap_err();
        assert_eq!(err.group, "G");
        assert_eq!(err.item.as_deref(), Some("Sub.Deep"));
    }

    #[test]
    fn test_nulls_are_absent_and_unknown_keys_survive() {
        let raw = json!({ "G": { "X": { "command": "ls", "prompt": null, "showOutput": null, "color": "red" } } });
        let tree = parse_tree(&raw).unwrap();
        match &tree.get("G").unwrap().children["X"] {
            Node::Command(entry) => {
                assert_eq!(entry.prompt, None);
                assert!(!entry.show_output);
                assert_eq!(entry.extra.get("color"), Some(&json!("red")));
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_keeps_unknown_keys_across_save() {
        let raw = json!({ "G": { "Alias": { "ref": "G.X", "icon": "star.png", "confirm": true }, "X": { "command": "ls" } } });
        let tree = parse_tree(&raw).unwrap();
        let Some(Node::Reference(reference)) = tree.groups["G"].children.get("Alias") else {
            panic!("expected a reference");
        };
        assert_eq!(reference.extra["icon"], "star.png");
        assert_eq!(reference.extra["confirm"], true);
        assert_eq!(tree.to_value()["G"]["Alias"], raw["G"]["Alias"]);
    }

    #[test]
    fn test_dangling_reference_is_not_a_validation_error() {
        let raw = json!({ "G": { "Later": { "ref": "NotYet.Imported" } } });
        assert!(parse_tree(&raw).is_ok());
    }

    #[test]
    fn test_validate_tree_rejects_reserved_label() {
        let mut tree = CommandTree::builtin_default();
        let system = tree.groups.get_mut("System").unwrap();
        system
            .children
            .insert("icon".to_string(), Node::Command(CommandEntry::new("ls")));

        let err = validate_tree(&tree).unwrap_err();
        assert_eq!(err.group, "System");
        assert_eq!(err.item.as_deref(), Some("icon"));
    }

    #[test]
    fn test_validate_tree_rejects_shadowing_extra() {
        let mut tree = CommandTree::default();
        let mut entry = CommandEntry::new("ls");
        entry.extra.insert("ref".to_string(), json!("G.Y"));
        let mut group = GroupNode::default();
        group.children.insert("X".to_string(), Node::Command(entry));
        tree.groups.insert("G".to_string(), group);

        assert!(validate_tree(&tree).is_err());
        assert!(validate_tree(&CommandTree::builtin_default()).is_ok());
    }
}
