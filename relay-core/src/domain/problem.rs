//! Build problem model
//!
//! A build problem is the user-visible record of a failure. Its identity must
//! be stable across runs with the same inputs so repeated failures coalesce,
//! and its message must not leak the build host's directory layout.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::RelayError;
use crate::params::Params;

/// Number of hex characters kept from the identity digest
const IDENTITY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProblem {
    pub identity: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl BuildProblem {
    /// Builds the problem for an error raised in a build with the given checkout and config
    ///
    /// The checkout dir and every directory in `scratch_dirs` are stripped from
    /// the description. Identity covers the checkout path, not the scratch dirs.
    pub fn from_error(
        checkout_dir: &Path,
        scratch_dirs: &[&Path],
        shared_config: &Params,
        error: &RelayError,
    ) -> Self {
        let mut roots = vec![checkout_dir];
        roots.extend_from_slice(scratch_dirs);
        let description = sanitize_message(&error.to_string(), &roots);
        let checkout = checkout_dir.to_string_lossy();
        Self {
            identity: problem_identity(&checkout, shared_config, error.kind(), &description),
            kind: error.kind().to_string(),
            description,
        }
    }
}

/// Deterministic identity over (checkout path, shared config, error kind, message)
///
/// Every part is length-prefixed so that adjacent parts cannot run into each other.
pub fn problem_identity(checkout: &str, shared_config: &Params, kind: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    let mut feed = |part: &str| {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    };

    feed(&to_system_independent(checkout));
    for (key, value) in shared_config {
        feed(key);
        feed(value);
    }
    feed(kind);
    feed(message);

    let mut identity = hex::encode(hasher.finalize());
    identity.truncate(IDENTITY_LEN);
    identity
}

/// Strips local directories from a message
///
/// Separators are normalized to forward slashes first. A directory is only
/// stripped where it is a whole path: `<dir>/` is removed so relative paths
/// stay readable, a bare `<dir>` is removed when nothing path-like follows.
pub fn sanitize_message(message: &str, roots: &[&Path]) -> String {
    let mut message = to_system_independent(message);
    for root in roots {
        let root = to_system_independent(&root.to_string_lossy());
        let root = root.trim_end_matches('/');
        if !root.is_empty() {
            message = strip_root(&message, root);
        }
    }
    message
}

fn strip_root(message: &str, root: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(pos) = rest.find(root) {
        let (before, matched) = rest.split_at(pos);
        let after = &matched[root.len()..];
        out.push_str(before);

        let starts_path = before
            .chars()
            .next_back()
            .is_none_or(|c| !is_path_char(c) && c != '/');
        let ends_path = after.chars().next().is_none_or(|c| !is_path_char(c));
        rest = match after.strip_prefix('/') {
            Some(relative) if starts_path => relative,
            _ if starts_path && ends_path => after,
            _ => {
                out.push_str(root);
                after
            }
        };
    }

    out.push_str(rest);
    out
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn to_system_independent(path: &str) -> String {
    path.replace('\\', "/")
}
