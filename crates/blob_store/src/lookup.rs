use shared::protocol::{BuildListing, BuildSummary};

use crate::build::{file_name, parse_build_ref, BuildFile, WISETRAINER_PREFIX};

pub trait BuildCandidate {
    fn container(&self) -> &str;
    fn path(&self) -> &str;

    /// Database id, for candidates that have one.
    fn internal_id(&self) -> Option<i64> {
        None
    }
}

impl BuildCandidate for BuildListing {
    fn container(&self) -> &str {
        &self.container
    }

    fn path(&self) -> &str {
        &self.path
    }
}

impl BuildCandidate for BuildSummary {
    fn container(&self) -> &str {
        &self.container
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn internal_id(&self) -> Option<i64> {
        Some(self.build_id.0)
    }
}

/// Finds the candidate a loosely written identifier designates. The first
/// rule that hits wins:
/// 1. exact `container:path` (or bare path) match,
/// 2. internal id match when the identifier is an integer,
/// 3. unique match on the file name alone,
/// 4. exact match with the `wisetrainer/` folder added or removed,
/// 5. a root-level candidate named like the file.
pub fn resolve_build<'a, T: BuildCandidate>(identifier: &str, candidates: &'a [T]) -> Option<&'a T> {
    let raw = identifier.trim();
    if raw.is_empty() {
        return None;
    }

    let (container, path) = parse_build_ref(raw);
    let container = container.map(str::trim);
    let path = normalize_path(path);
    let same_container =
        |candidate: &T| container.map_or(true, |container| candidate.container() == container);
    let exact = |path: &str| {
        candidates
            .iter()
            .find(|candidate| same_container(*candidate) && candidate.path() == path)
    };

    if let Some(found) = exact(path.as_str()) {
        return Some(found);
    }

    if let Ok(internal_id) = raw.parse::<i64>() {
        if let Some(found) = candidates
            .iter()
            .find(|candidate| candidate.internal_id() == Some(internal_id))
        {
            return Some(found);
        }
    }

    let name = file_name(&path);
    if name.is_empty() {
        return None;
    }
    let mut by_name = candidates
        .iter()
        .filter(|candidate| same_container(*candidate) && file_name(candidate.path()) == name);
    if let (Some(found), None) = (by_name.next(), by_name.next()) {
        return Some(found);
    }

    let toggled = match path.strip_prefix(WISETRAINER_PREFIX) {
        Some(stripped) => stripped.to_string(),
        None => format!("{WISETRAINER_PREFIX}{path}"),
    };
    if let Some(found) = exact(toggled.as_str()) {
        return Some(found);
    }

    candidates.iter().find(|candidate| {
        same_container(*candidate) && !candidate.path().contains('/') && candidate.path() == name
    })
}

/// Backslashes become slashes, leading slashes and a trailing build file
/// suffix are dropped.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let path = path.trim_start_matches('/');
    BuildFile::ALL
        .into_iter()
        .find_map(|file| path.strip_suffix(file.suffix()))
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
#[path = "tests/lookup_tests.rs"]
mod tests;
