//! Expandable tree with a cursor over its visible rows.
//!
//! Shared by the file browser and the structured-output browser. Nodes are
//! addressed by their index path from the roots.

use serde_json::Value;

use crate::source::FileEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<T> {
    pub label: String,
    pub data: T,
    pub children: Vec<TreeNode<T>>,
    pub expanded: bool,
}

impl<T> TreeNode<T> {
    pub fn leaf(label: impl Into<String>, data: T) -> Self {
        Self {
            label: label.into(),
            data,
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }
}

/// One rendered row of the tree.
#[derive(Debug)]
pub struct VisibleRow<'a, T> {
    pub depth: usize,
    pub path: Vec<usize>,
    pub node: &'a TreeNode<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeView<T> {
    pub roots: Vec<TreeNode<T>>,
    pub cursor: usize,
}

impl<T> TreeView<T> {
    pub fn new(roots: Vec<TreeNode<T>>) -> Self {
        Self { roots, cursor: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first rows, descending only into expanded branches.
    pub fn visible(&self) -> Vec<VisibleRow<'_, T>> {
        fn walk<'a, T>(
            nodes: &'a [TreeNode<T>],
            depth: usize,
            prefix: &mut Vec<usize>,
            out: &mut Vec<VisibleRow<'a, T>>,
        ) {
            for (i, node) in nodes.iter().enumerate() {
                prefix.push(i);
                out.push(VisibleRow {
                    depth,
                    path: prefix.clone(),
                    node,
                });
                if node.expanded {
                    walk(&node.children, depth + 1, prefix, out);
                }
                prefix.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, 0, &mut Vec::new(), &mut out);
        out
    }

    pub fn visible_len(&self) -> usize {
        self.visible().len()
    }

    pub fn move_by(&mut self, delta: isize) {
        let len = self.visible_len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let target = self.cursor as isize + delta;
        self.cursor = target.clamp(0, len as isize - 1) as usize;
    }

    pub fn selected_path(&self) -> Option<Vec<usize>> {
        self.visible().into_iter().nth(self.cursor).map(|row| row.path)
    }

    pub fn get(&self, path: &[usize]) -> Option<&TreeNode<T>> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for i in rest {
            node = node.children.get(*i)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut TreeNode<T>> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(*first)?;
        for i in rest {
            node = node.children.get_mut(*i)?;
        }
        Some(node)
    }

    pub fn selected(&self) -> Option<&TreeNode<T>> {
        self.get(&self.selected_path()?)
    }

    /// Flip a branch open or closed. Leaves are left alone.
    pub fn toggle(&mut self, path: &[usize]) -> bool {
        match self.get_mut(path) {
            Some(node) if node.is_branch() => {
                node.expanded = !node.expanded;
                true
            }
            _ => false,
        }
    }
}

/// Payload of a file-browser row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Build a directory tree from a flat listing. Directories sort before
/// files, each group alphabetically.
pub fn file_tree(entries: &[FileEntry]) -> TreeView<FileNode> {
    let mut roots: Vec<TreeNode<FileNode>> = Vec::new();
    for entry in entries {
        let parts: Vec<&str> = entry.path.split('/').filter(|p| !p.is_empty()).collect();
        insert_path(&mut roots, &parts, 0, entry);
    }
    sort_files(&mut roots);
    TreeView::new(roots)
}

fn insert_path(nodes: &mut Vec<TreeNode<FileNode>>, parts: &[&str], depth: usize, entry: &FileEntry) {
    let Some(name) = parts.get(depth) else { return };
    let last = depth + 1 == parts.len();
    let path = parts[..=depth].join("/");
    let idx = match nodes.iter().position(|n| n.data.path == path) {
        Some(idx) => idx,
        None => {
            nodes.push(TreeNode::leaf(
                *name,
                FileNode {
                    path,
                    is_dir: !last || entry.is_dir,
                    size: if last { entry.size } else { 0 },
                },
            ));
            nodes.len() - 1
        }
    };
    if !last {
        nodes[idx].data.is_dir = true;
        insert_path(&mut nodes[idx].children, parts, depth + 1, entry);
    }
}

fn sort_files(nodes: &mut [TreeNode<FileNode>]) {
    nodes.sort_by(|a, b| {
        b.data
            .is_dir
            .cmp(&a.data.is_dir)
            .then_with(|| a.label.cmp(&b.label))
    });
    for node in nodes {
        sort_files(&mut node.children);
    }
}

/// Payload of a structured-output row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    /// Rendered scalar for leaves, `None` for objects and arrays.
    pub value: Option<String>,
    pub sensitive: bool,
    pub revealed: bool,
}

pub const MASK: &str = "•••••";

const SENSITIVE_KEYS: &[&str] = &["password", "secret", "token", "private_key", "credential"];

impl OutputNode {
    pub fn display_value(&self) -> Option<&str> {
        match &self.value {
            Some(_) if self.sensitive && !self.revealed => Some(MASK),
            Some(v) => Some(v.as_str()),
            None => None,
        }
    }
}

/// Build the output browser from an outputs document.
///
/// Top-level entries shaped like `{"value": …, "sensitive": bool}` are
/// unwrapped; their `sensitive` flag masks the value and everything
/// beneath it, as does a key that names a secret.
pub fn output_tree(outputs: &Value) -> TreeView<OutputNode> {
    let roots = match outputs {
        Value::Object(map) => map
            .iter()
            .map(|(key, entry)| match entry {
                Value::Object(inner) if inner.contains_key("value") => {
                    let flagged = inner.get("sensitive").and_then(Value::as_bool).unwrap_or(false);
                    let value = inner.get("value").unwrap_or(&Value::Null);
                    output_node(key, value, flagged)
                }
                _ => output_node(key, entry, false),
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![output_node("value", other, false)],
    };
    TreeView::new(roots)
}

fn output_node(key: &str, value: &Value, inherited: bool) -> TreeNode<OutputNode> {
    let lower = key.to_ascii_lowercase();
    let sensitive = inherited || SENSITIVE_KEYS.iter().any(|k| lower.contains(k));
    let branch = |label: String, children: Vec<TreeNode<OutputNode>>| TreeNode {
        label,
        data: OutputNode {
            value: None,
            sensitive,
            revealed: false,
        },
        children,
        expanded: false,
    };
    match value {
        Value::Object(map) if !map.is_empty() => branch(
            format!("{key} {{{}}}", map.len()),
            map.iter().map(|(k, v)| output_node(k, v, sensitive)).collect(),
        ),
        Value::Array(items) if !items.is_empty() => branch(
            format!("{key} [{}]", items.len()),
            items
                .iter()
                .enumerate()
                .map(|(i, v)| output_node(&i.to_string(), v, sensitive))
                .collect(),
        ),
        scalar => TreeNode::leaf(
            key,
            OutputNode {
                value: Some(match scalar {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
                sensitive,
                revealed: false,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(path: &str, is_dir: bool) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            is_dir,
            size: 1,
        }
    }

    fn labels<T>(view: &TreeView<T>) -> Vec<String> {
        view.visible()
            .iter()
            .map(|r| format!("{}{}", "  ".repeat(r.depth), r.node.label))
            .collect()
    }

    #[test]
    fn test_file_tree_nests_and_sorts_dirs_first() {
        let mut view = file_tree(&[
            entry("main.tf", false),
            entry("modules/vpc/main.tf", false),
            entry("modules", true),
            entry("README.md", false),
        ]);
        assert_eq!(labels(&view), vec!["modules", "README.md", "main.tf"]);

        assert!(view.toggle(&[0]));
        assert!(view.toggle(&[0, 0]));
        assert_eq!(
            labels(&view),
            vec!["modules", "  vpc", "    main.tf", "README.md", "main.tf"]
        );
        assert_eq!(view.get(&[0, 0, 0]).unwrap().data.path, "modules/vpc/main.tf");
    }

    #[test]
    fn test_cursor_clamps() {
        let mut view = file_tree(&[entry("a", false), entry("b", false)]);
        view.move_by(-3);
        assert_eq!(view.cursor, 0);
        view.move_by(10);
        assert_eq!(view.cursor, 1);
        assert_eq!(view.selected().unwrap().label, "b");
    }

    #[test]
    fn test_toggle_leaf_is_noop() {
        let mut view = file_tree(&[entry("a", false)]);
        assert!(!view.toggle(&[0]));
        assert!(!view.toggle(&[7]));
    }

    #[test]
    fn test_output_tree_masks_sensitive() {
        let mut view = output_tree(&json!({
            "db_password": {"value": "hunter2", "sensitive": true},
            "endpoint": {"value": "db.internal", "sensitive": false},
            "config": {"value": {"api_token": "abc", "region": "eu"}}
        }));
        let rows = labels(&view);
        assert_eq!(rows, vec!["config {2}", "db_password", "endpoint"]);

        let password = view.get(&[1]).unwrap();
        assert_eq!(password.data.display_value(), Some(MASK));
        assert_eq!(view.get(&[2]).unwrap().data.display_value(), Some("db.internal"));

        view.toggle(&[0]);
        let token = view.get(&[0, 0]).unwrap();
        assert_eq!(token.label, "api_token");
        assert!(token.data.sensitive);
        assert!(!view.get(&[0, 1]).unwrap().data.sensitive);

        view.get_mut(&[1]).unwrap().data.revealed = true;
        assert_eq!(view.get(&[1]).unwrap().data.display_value(), Some("hunter2"));
    }

    #[test]
    fn test_output_tree_plain_document() {
        let view = output_tree(&json!({"ids": [1, 2], "name": "x"}));
        assert_eq!(labels(&view), vec!["ids [2]", "name"]);
        assert!(output_tree(&Value::Null).is_empty());
    }
}
