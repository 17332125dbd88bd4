use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::analysis::Analysis;
use crate::analysis::ast::{IncludeDirective, Item};
use crate::analysis::symbols::{self, SymbolAt};
use crate::backend::Backend;
use crate::utils::paths::resolve_include_path;

impl Backend {
    pub async fn handle_goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let Some(analysis) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let Some(offset) = analysis.offset_of(pos) else {
            return Ok(None);
        };

        if let Some(location) = self.resolve_include_location(&analysis, offset).await {
            return Ok(Some(GotoDefinitionResponse::Scalar(location)));
        }

        let location = match symbols::symbol_at(&analysis, offset) {
            Some(SymbolAt::Reference(reference)) => {
                symbols::resolve(&analysis, &reference.name, reference.scope)
                    .and_then(|symbol| analysis.location_of(symbol))
            }
            Some(SymbolAt::Declaration(symbol)) => analysis.location_of(symbol),
            None => None,
        };

        Ok(location.map(GotoDefinitionResponse::Scalar))
    }

    /// A cursor on an `#include` path jumps to the top of the header.
    async fn resolve_include_location(
        &self,
        analysis: &Analysis,
        offset: usize,
    ) -> Option<Location> {
        let include = include_at(analysis, offset)?;

        let current = analysis.uri.to_file_path().ok()?;
        let include_paths = self.config.lock().await.include_paths.clone();
        let workspace_root = self.workspace_root.lock().await.clone();
        let path = resolve_include_path(
            &current,
            &include_paths,
            workspace_root.as_deref(),
            &include.path,
        )?;
        let path = path.canonicalize().unwrap_or(path);
        let include_uri = Url::from_file_path(path).ok()?;

        Some(Location {
            uri: include_uri,
            range: Range::new(Position::new(0, 0), Position::new(0, 0)),
        })
    }
}

/// The include directive whose quoted path spans `offset`, if any. Only the
/// path triggers the header jump; the `#include` keyword and the rest of
/// the directive line do not.
fn include_at(analysis: &Analysis, offset: usize) -> Option<&IncludeDirective> {
    analysis.unit.items.iter().find_map(|item| match item {
        Item::Include(inc) if inc.path_span.touches(offset) => Some(inc),
        _ => None,
    })
}
