//! `${name}` interpolation along the inheritance chain.

use crate::dependency::Dependency;
use crate::tree::{NodeId, PomTree};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::trace;

fn token_regex() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\$\{(.*?)\}").expect("Invalid interpolation regex"))
}

pub(crate) fn contains_token(value: &str) -> bool {
    value.contains("${")
}

/// Looks `name` up on `id` and then on each inheritance ancestor.
///
/// The walk stops at the first non-empty value free of `${`, or at the top of
/// the chain. Whatever the last visited node holds is returned unchanged, so
/// a value that still references another property comes back as-is.
pub fn find_property_value(tree: &PomTree, id: NodeId, name: &str) -> Option<String> {
    let mut current = id;
    // An inheritance cycle cannot be longer than the node list.
    for _ in 0..=tree.len() {
        let value = tree
            .pom(current)
            .raw_property(name)
            .filter(|v| !v.is_empty());

        if let Some(v) = value {
            if !contains_token(v) {
                return Some(v.to_string());
            }
        }

        match tree.inheritance_parent(current) {
            Some(parent) => current = parent,
            None => return value.map(str::to_string),
        }
    }
    None
}

/// Substitutes every resolvable `${name}` token in `s`; others stay verbatim.
pub fn interpolate(tree: &PomTree, id: NodeId, s: &str) -> String {
    if !s.contains('$') {
        return s.to_string();
    }

    token_regex()
        .replace_all(s, |caps: &Captures<'_>| {
            let name = caps[1].trim();
            match find_property_value(tree, id, name) {
                Some(value) => {
                    trace!(token = &caps[0], value = %value, "Interpolated");
                    value
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// A node's raw property, interpolated once against its chain.
pub fn resolved_property(tree: &PomTree, id: NodeId, name: &str) -> Option<String> {
    tree.pom(id)
        .raw_property(name)
        .map(|raw| interpolate(tree, id, raw))
}

/// Versioned dependencies of `id` with their versions interpolated.
///
/// Tokens are always resolved against `id` itself. Dependencies without a
/// version are managed elsewhere and omitted.
pub fn resolved_dependencies(tree: &PomTree, id: NodeId) -> Vec<Dependency> {
    tree.pom(id)
        .raw_dependencies()
        .iter()
        .filter(|dep| dep.has_version())
        .map(|dep| {
            if dep.version.contains('$') {
                dep.with_version(interpolate(tree, id, &dep.version))
            } else {
                dep.clone()
            }
        })
        .collect()
}
