use std::collections::BTreeMap;

use shared::protocol::{BuildFiles, BuildListing};

use crate::BlobItem;

/// Folder most builds are uploaded under.
pub const WISETRAINER_PREFIX: &str = "wisetrainer/";

/// One of the four co-named blobs of a Unity WebGL build. The build's
/// identity is `container:path`, `path` being the blob name minus the suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFile {
    Data,
    Framework,
    Loader,
    Wasm,
}

impl BuildFile {
    pub const ALL: [BuildFile; 4] = [
        BuildFile::Data,
        BuildFile::Framework,
        BuildFile::Loader,
        BuildFile::Wasm,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            BuildFile::Data => ".data.gz",
            BuildFile::Framework => ".framework.js.gz",
            BuildFile::Loader => ".loader.js",
            BuildFile::Wasm => ".wasm.gz",
        }
    }

    pub fn blob_name(self, path: &str) -> String {
        format!("{path}{}", self.suffix())
    }

    pub fn content_headers(self) -> BlobContentHeaders {
        match self {
            BuildFile::Data => BlobContentHeaders::gzip("application/octet-stream"),
            BuildFile::Framework => BlobContentHeaders::gzip("application/javascript"),
            BuildFile::Loader => BlobContentHeaders::plain("application/javascript"),
            BuildFile::Wasm => BlobContentHeaders::gzip("application/wasm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobContentHeaders {
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
}

impl BlobContentHeaders {
    pub fn plain(content_type: &'static str) -> Self {
        Self {
            content_type,
            content_encoding: None,
        }
    }

    pub fn gzip(content_type: &'static str) -> Self {
        Self {
            content_type,
            content_encoding: Some("gzip"),
        }
    }
}

impl Default for BlobContentHeaders {
    fn default() -> Self {
        Self::plain("application/octet-stream")
    }
}

/// Splits a blob name into its build path and file role.
pub fn split_build_blob(name: &str) -> Option<(&str, BuildFile)> {
    BuildFile::ALL.into_iter().find_map(|file| {
        name.strip_suffix(file.suffix())
            .filter(|path| !path.is_empty() && !path.ends_with('/'))
            .map(|path| (path, file))
    })
}

pub fn format_build_ref(container: &str, path: &str) -> String {
    format!("{container}:{path}")
}

/// Splits `container:path`. Identifiers without a colon are bare paths.
pub fn parse_build_ref(build_ref: &str) -> (Option<&str>, &str) {
    match build_ref.split_once(':') {
        Some((container, path)) if !container.is_empty() => (Some(container), path),
        Some((_, path)) => (None, path),
        None => (None, build_ref),
    }
}

/// Last path segment, i.e. the build's display name.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Groups a container listing into builds, sorted by path. Blobs that are
/// not build files are ignored.
pub fn group_builds(container: &str, items: &[BlobItem]) -> Vec<BuildListing> {
    let mut builds: BTreeMap<&str, BuildListing> = BTreeMap::new();

    for item in items {
        let Some((path, file)) = split_build_blob(&item.name) else {
            continue;
        };
        let listing = builds.entry(path).or_insert_with(|| BuildListing {
            build_ref: format_build_ref(container, path),
            container: container.to_string(),
            path: path.to_string(),
            name: file_name(path).to_string(),
            files: BuildFiles::default(),
            complete: false,
            total_size_bytes: 0,
            last_modified: None,
            formation_id: None,
        });

        match file {
            BuildFile::Data => listing.files.data = true,
            BuildFile::Framework => listing.files.framework = true,
            BuildFile::Loader => listing.files.loader = true,
            BuildFile::Wasm => listing.files.wasm = true,
        }
        listing.complete = listing.files.is_complete();
        listing.total_size_bytes += item.size_bytes;
        listing.last_modified = listing.last_modified.max(item.last_modified);
    }

    builds.into_values().collect()
}

#[cfg(test)]
#[path = "tests/build_tests.rs"]
mod tests;
