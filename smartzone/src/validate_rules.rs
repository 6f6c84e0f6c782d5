//! Text rules applied to raw switch output during a check.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::Vsan;

fn role_tagged_pwwn() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)pwwn.*\b(init|initiator|target)\b").expect("valid pattern")
    })
}

/// True when a line of `show zoneset brief` output starts with exactly
/// `zoneset name <name> vsan <vsan>`.
///
/// The name must be a whole token, so `PRODX` never satisfies `PROD`.
pub fn exists_zone_set(text: &str, name: &str, vsan: Vsan) -> bool {
    let id = vsan.id().to_string();
    text.lines()
        .filter(|line| line.starts_with("zoneset"))
        .any(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            matches!(
                tokens.as_slice(),
                ["zoneset", "name", n, "vsan", v, ..] if *n == name && *v == id
            )
        })
}

/// Loose zone set presence test for `show zoneset brief` output: some line
/// contains `name` followed later on the same line by `vsan <vsan>`.
///
/// Unanchored, so `PROD` is also found in `zoneset name PRODX vsan 10`.
pub fn brief_lists_zone_set(text: &str, name: &str, vsan: Vsan) -> bool {
    if name.is_empty() {
        return false;
    }
    let id = vsan.id().to_string();
    text.lines().any(|line| {
        line.match_indices(name)
            .any(|(idx, _)| mentions_vsan(&line[idx + name.len()..], &id))
    })
}

/// Loose zone presence test: `name` occurs anywhere in the output and the
/// output mentions `vsan <vsan>`.
///
/// A substring match, so `Z1` is also found when only `Z10` exists.
pub fn brief_mentions(text: &str, name: &str, vsan: Vsan) -> bool {
    if name.is_empty() || !text.contains(name) {
        return false;
    }
    let id = vsan.id().to_string();
    text.lines().any(|line| mentions_vsan(line, &id))
}

fn mentions_vsan(text: &str, id: &str) -> bool {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|pair| pair[0].eq_ignore_ascii_case("vsan") && pair[1] == id)
}

/// Number of lines listing a pwwn followed by a smart zoning role keyword.
pub fn count_members(text: &str) -> usize {
    text.lines()
        .filter(|line| role_tagged_pwwn().is_match(line))
        .count()
}
