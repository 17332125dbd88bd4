use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::analysis::symbols::{self, SymbolAt, same_symbol};
use crate::backend::Backend;

impl Backend {
    /// Every use in the current document resolving to the symbol under the
    /// cursor, plus its declaration when asked for. The search is scoped to
    /// the open document; headers contribute targets, not hits.
    pub async fn handle_references(
        &self,
        params: ReferenceParams,
    ) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let pos = params.text_document_position.position;

        let Some(analysis) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let Some(offset) = analysis.offset_of(pos) else {
            return Ok(None);
        };

        let target = match symbols::symbol_at(&analysis, offset) {
            Some(SymbolAt::Reference(reference)) => {
                symbols::resolve(&analysis, &reference.name, reference.scope)
            }
            Some(SymbolAt::Declaration(symbol)) => Some(symbol),
            None => None,
        };
        let Some(target) = target else {
            return Ok(None);
        };

        let mut locations = Vec::new();
        if params.context.include_declaration
            && let Some(declaration) = analysis.location_of(target)
        {
            locations.push(declaration);
        }

        for reference in &analysis.references {
            if reference.name != target.name {
                continue;
            }
            if let Some(resolved) = symbols::resolve(&analysis, &reference.name, reference.scope)
                && same_symbol(resolved, target)
            {
                locations.push(Location {
                    uri: analysis.uri.clone(),
                    range: analysis.range(reference.span),
                });
            }
        }

        Ok(Some(locations))
    }
}
