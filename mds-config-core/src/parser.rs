use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::tree::{ConfigTree, LineId};

/// Errors that can occur while loading configuration text.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read input file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Input bytes were not valid UTF-8.
    #[error("config file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Parse indentation-structured CLI text into a [`ConfigTree`].
///
/// Blank lines are dropped. A line becomes a child of the closest preceding
/// line with strictly smaller indentation; lines at equal or lower indentation
/// close the open scopes. Empty input yields an empty forest.
pub fn parse(text: &str) -> ConfigTree {
    let mut tree = ConfigTree::new();
    let mut stack: Vec<(LineId, usize)> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let body = raw.trim_end();
        if body.trim_start().is_empty() {
            continue;
        }

        let depth = body.chars().take_while(|c| c.is_whitespace()).count();
        while stack.last().is_some_and(|(_, open)| *open >= depth) {
            stack.pop();
        }

        let parent = stack.last().map(|(id, _)| *id);
        let id = tree.push(parent, body.trim_start(), depth, idx + 1);
        stack.push((id, depth));
    }

    tree
}

/// Parse a configuration dump from disk.
pub fn parse_file(path: &Path) -> Result<ConfigTree, ParseError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes)?;
    Ok(parse(&text))
}

#[cfg(test)]
mod tests {
    use super::parse;

    #[test]
    fn empty_input_is_an_empty_forest() {
        assert!(parse("").is_empty());
        assert!(parse("\n   \n\t\n").is_empty());
    }

    #[test]
    fn dedent_closes_nested_scopes() {
        let tree = parse(
            "zone name Z1 vsan 10\n  fcalias name A1 vsan 10\n    pwwn 10:00:00:00:00:00:00:01\nzone name Z2 vsan 10\n",
        );

        let roots: Vec<_> = tree.roots().collect();
        assert_eq!(roots.len(), 2);
        let alias = roots[0].children().next().expect("fcalias child");
        assert_eq!(alias.text(), "fcalias name A1 vsan 10");
        assert_eq!(alias.children().count(), 1);
        assert_eq!(roots[1].children().count(), 0);
    }

    #[test]
    fn carriage_returns_and_trailing_space_are_trimmed() {
        let tree = parse("device-alias database\r\n  device-alias name H1 pwwn 10:00:00:00:00:00:00:01   \r\n");
        let child = tree.roots().next().and_then(|r| r.children().next());
        assert_eq!(
            child.map(|c| c.text()),
            Some("device-alias name H1 pwwn 10:00:00:00:00:00:00:01")
        );
        assert_eq!(child.map(|c| c.depth()), Some(2));
    }

    #[test]
    fn uneven_indentation_attaches_to_nearest_shallower_line() {
        let tree = parse("a\n    b\n  c\n      d\n");
        let root = tree.roots().next().expect("root");
        let kids: Vec<_> = root.children().map(|c| c.text()).collect();
        assert_eq!(kids, vec!["b", "c"]);
        let c = root.children().nth(1).expect("c");
        assert_eq!(c.children().map(|n| n.text()).collect::<Vec<_>>(), vec!["d"]);
    }
}
