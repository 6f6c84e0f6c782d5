//! Indentation-structured CLI configuration parsing used by higher-level tools.
//!
//! Switch CLIs (NX-OS and friends) print configuration as lines whose nesting
//! is expressed only by leading whitespace. This crate turns such text into an
//! arena-backed forest of [`ConfigLine`]s, searches it with regular
//! expressions, and renders it back to text. It knows nothing about what the
//! lines mean.

pub mod parser;
pub mod tree;
pub mod writer;

pub use parser::{parse, parse_file, ParseError};
pub use regex::Regex;
pub use tree::{ConfigLine, ConfigNode, ConfigTree, LineId};
pub use writer::{render, render_depth, render_json, write_file};
