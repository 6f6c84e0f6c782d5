use std::fs;
use std::path::Path;

use crate::tree::{ConfigNode, ConfigTree};

/// Render a forest back to indentation text, two spaces per nesting level.
pub fn render(tree: &ConfigTree) -> String {
    render_depth(tree, usize::MAX)
}

/// Render at most `max_depth` nesting levels below the top-level lines.
pub fn render_depth(tree: &ConfigTree, max_depth: usize) -> String {
    let mut out = String::new();
    for root in tree.roots() {
        render_node(root, 0, max_depth, &mut out);
    }
    out
}

/// Serialize the arena as pretty JSON.
pub fn render_json(tree: &ConfigTree) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tree)
}

/// Render a forest and write it to `path`.
pub fn write_file(tree: &ConfigTree, path: &Path) -> std::io::Result<()> {
    fs::write(path, render(tree))
}

fn render_node(node: ConfigNode<'_>, level: usize, max_depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(level));
    out.push_str(node.text());
    out.push('\n');

    if level >= max_depth {
        return;
    }

    for child in node.children() {
        render_node(child, level + 1, max_depth, out);
    }
}

#[cfg(test)]
mod tests {
    use super::{render, render_depth};
    use crate::parser::parse;

    #[test]
    fn render_normalizes_indentation() {
        let tree = parse("zoneset name PROD vsan 10\n    member Z1\n    member Z2\n");
        assert_eq!(
            render(&tree),
            "zoneset name PROD vsan 10\n  member Z1\n  member Z2\n"
        );
    }

    #[test]
    fn render_depth_stops_descending() {
        let tree = parse("a\n b\n  c\n");
        assert_eq!(render_depth(&tree, 1), "a\n  b\n");
        assert_eq!(render_depth(&tree, 0), "a\n");
    }
}
