//! Reconciles the remote file list with the local content cache.
//!
//! Only source/text files are fetched, every other file is a static asset (images, 3-D models, etc.) and is
//! represented by [`STATIC_ASSET_SENTINEL`] instead of its bytes.
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;

use futures::future::join_all;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const STATIC_ASSET_SENTINEL: &str = "__STATIC_ASSET__";

/// Extensions of files whose content is text, compared case-insensitively.
pub const SOURCE_FILE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "json", "md", "mdx", "txt", "csv", "css", "html", "yml", "yaml", "toml",
    "kicad_mod", "kicad_sym", "kicad_pcb", "kicad_sch",
];

/// A mapping of path to content, in remote list order.
pub type FsMap = IndexMap<String, String>;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub file_id: String,
    pub file_path: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("File not found. file_path: {0}")]
    NotFound(String),
    #[error("Request failed. file_path: {file_path}, cause: {reason}")]
    Request { file_path: String, reason: String },
}

pub fn is_static_asset(file_path: &str) -> bool {
    let extension = Path::new(file_path)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(extension) => !SOURCE_FILE_EXTENSIONS.contains(&extension.as_str()),
        None => true,
    }
}

pub fn is_static_asset_content(content: &str) -> bool {
    content == STATIC_ASSET_SENTINEL
}

/// Build the file map for a freshly opened session.
pub async fn load_initial_files<F, Fut>(remote_files: &[RemoteFile], fetch: F) -> FsMap
where
    F: Fn(&RemoteFile) -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    reconcile_files(remote_files, &FsMap::new(), &[], fetch).await
}

/// Reconcile `remote_files` against `cache`.
///
/// * The remote list is authoritative, cached paths not in the list are not carried over.
/// * Static assets map to the sentinel and are never fetched.
/// * Text files are fetched concurrently when they are not cached, or when listed in `changed_paths`.
/// * A failed fetch is logged; the path keeps its cached (stale) content, or is absent when there is none.
pub async fn reconcile_files<F, Fut>(
    remote_files: &[RemoteFile],
    cache: &FsMap,
    changed_paths: &[String],
    fetch: F,
) -> FsMap
where
    F: Fn(&RemoteFile) -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    let changed_paths = changed_paths
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();

    let to_fetch = remote_files
        .iter()
        .filter(|file| !is_static_asset(&file.file_path))
        .filter(|file| {
            !cache.contains_key(&file.file_path) || changed_paths.contains(file.file_path.as_str())
        })
        .collect::<Vec<_>>();

    debug!(
        "Reconciling files. remote: {}, cached: {}, to_fetch: {}",
        remote_files.len(),
        cache.len(),
        to_fetch.len()
    );

    let fetched = join_all(
        to_fetch
            .iter()
            .map(|file| {
                let future = fetch(file);
                async move { (file.file_path.as_str(), future.await) }
            }),
    )
    .await
    .into_iter()
    .collect::<IndexMap<_, _>>();

    let mut fs_map = FsMap::with_capacity(remote_files.len());
    let mut failures = 0;

    for file in remote_files {
        let path = &file.file_path;

        if is_static_asset(path) {
            fs_map.insert(path.clone(), STATIC_ASSET_SENTINEL.to_string());
            continue;
        }

        match fetched.get(path.as_str()) {
            Some(Ok(content)) => {
                fs_map.insert(path.clone(), content.clone());
            }
            Some(Err(error)) => {
                failures += 1;
                warn!("Unable to fetch file. file_path: {}, cause: {}", path, error);
                if let Some(stale) = cache.get(path) {
                    fs_map.insert(path.clone(), stale.clone());
                }
            }
            None => {
                if let Some(cached) = cache.get(path) {
                    fs_map.insert(path.clone(), cached.clone());
                }
            }
        }
    }

    info!(
        "Reconciled files. files: {}, fetched: {}, failures: {}",
        fs_map.len(),
        fetched.len() - failures,
        failures
    );

    fs_map
}
