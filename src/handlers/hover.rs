use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::analysis::symbols::{self, SymbolAt};
use crate::analysis::{builtins, hover};
use crate::backend::Backend;

impl Backend {
    pub async fn handle_hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let Some(analysis) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let Some(offset) = analysis.offset_of(pos) else {
            return Ok(None);
        };

        let markdown = match symbols::symbol_at(&analysis, offset) {
            Some(SymbolAt::Reference(reference)) => {
                match symbols::resolve(&analysis, &reference.name, reference.scope) {
                    Some(symbol) => Some(hover::symbol_markdown(&analysis, symbol)),
                    // Builtins have no declaration to resolve to.
                    None => builtins::lookup(&reference.name).map(hover::builtin_markdown),
                }
            }
            Some(SymbolAt::Declaration(symbol)) => Some(hover::symbol_markdown(&analysis, symbol)),
            None => None,
        };

        Ok(markdown.map(|value| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            }),
            range: None,
        }))
    }
}
