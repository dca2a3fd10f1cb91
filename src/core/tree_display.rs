// src/core/tree_display.rs

use crate::models::{CommandTree, GroupNode, Node};

/// Renders the command tree (or a single top-level group) as ASCII art.
///
/// Returns `None` when `start_group` names a group that does not exist.
pub fn render_tree(tree: &CommandTree, start_group: Option<&str>) -> Option<String> {
    let mut out = String::new();

    match start_group {
        Some(name) => {
            let group = tree.get(name)?;
            out.push_str(&group_line(name, group));
            out.push('\n');
            render_children(group, "", &mut out);
        }
        None => {
            let count = tree.groups.len();
            for (i, (name, group)) in tree.groups.iter().enumerate() {
                render_group(name, group, "", i + 1 == count, &mut out);
            }
        }
    }

    Some(out)
}

fn group_line(name: &str, group: &GroupNode) -> String {
    match group.icon.as_deref().filter(|icon| !icon.is_empty()) {
        Some(icon) => format!("{} [{}]", name, icon),
        None => name.to_string(),
    }
}

fn render_group(name: &str, group: &GroupNode, prefix: &str, is_last: bool, out: &mut String) {
    let connector = if is_last { "└─" } else { "├─" };
    out.push_str(&format!("{}{}{}\n", prefix, connector, group_line(name, group)));

    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
    render_children(group, &child_prefix, out);
}

fn render_children(group: &GroupNode, prefix: &str, out: &mut String) {
    let count = group.children.len();
    for (i, (label, child)) in group.children.iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└─" } else { "├─" };
        match child {
            Node::Group(nested) => render_group(label, nested, prefix, is_last, out),
            Node::Command(entry) => {
                let mut flags = Vec::new();
                if entry.confirm {
                    flags.push("confirm");
                }
                if entry.show_output {
                    flags.push("output");
                }
                if entry.prompt.is_some() {
                    flags.push("prompt");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", flags.join(", "))
                };
                out.push_str(&format!(
                    "{}{}{}: {}{}\n",
                    prefix, connector, label, entry.command, flags
                ));
            }
            Node::Reference(reference) => {
                out.push_str(&format!("{}{}{} -> {}\n", prefix, connector, label, reference.path));
            }
        }
    }
}
