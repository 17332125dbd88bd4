use std::sync::Arc;

use log::debug;
use tower_lsp::lsp_types::*;

use crate::analysis::{self, preprocessor::IncludeContext};
use crate::backend::Backend;

/// Reruns the pipeline for an opened or changed document, publishes its
/// diagnostics, and swaps in the fresh snapshot. Diagnostics are published
/// even when empty so stale ones clear.
pub async fn on_change(backend: &Backend, uri: Url, version: i32, text: String, open: bool) {
    if !open
        && let Some(existing) = backend.snapshot(&uri)
        && version <= existing.version
    {
        debug!("ignoring stale version {version} for {uri}");
        return;
    }

    let diagnostics_enabled = backend.config.lock().await.diagnostics.enabled;
    let include_paths = backend.config.lock().await.include_paths.clone();
    let workspace_root = backend.workspace_root.lock().await.clone();
    let ctx = IncludeContext {
        include_paths: &include_paths,
        workspace_root: workspace_root.as_deref(),
    };

    let analysis = analysis::analyze(&uri, text, version, &ctx);
    let diagnostics = if diagnostics_enabled {
        analysis.diagnostics.clone()
    } else {
        Vec::new()
    };

    backend.documents.insert(uri.clone(), Arc::new(analysis));
    backend
        .client
        .publish_diagnostics(uri, diagnostics, Some(version))
        .await;
}
