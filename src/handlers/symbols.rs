use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::analysis::Analysis;
use crate::analysis::symbols::{Symbol, SymbolKind as SslSymbolKind};
use crate::backend::Backend;

impl Backend {
    pub async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some(analysis) = self.snapshot(&uri) else {
            return Ok(None);
        };

        let mut out = Vec::new();
        for (idx, symbol) in analysis.symbols.iter().enumerate() {
            if symbol.scope.is_some() {
                continue;
            }
            match symbol.kind {
                SslSymbolKind::Procedure => {
                    let children: Vec<DocumentSymbol> = analysis
                        .symbols
                        .iter()
                        .filter(|s| s.scope == Some(idx))
                        .map(|s| document_symbol(&analysis, s, SymbolKind::VARIABLE, None))
                        .collect();
                    let children = (!children.is_empty()).then_some(children);
                    out.push(document_symbol(&analysis, symbol, SymbolKind::FUNCTION, children));
                }
                SslSymbolKind::GlobalVariable => {
                    out.push(document_symbol(&analysis, symbol, SymbolKind::VARIABLE, None));
                }
                _ => {}
            }
        }

        Ok(Some(DocumentSymbolResponse::Nested(out)))
    }
}

#[allow(deprecated)]
fn document_symbol(
    analysis: &Analysis,
    symbol: &Symbol,
    kind: SymbolKind,
    children: Option<Vec<DocumentSymbol>>,
) -> DocumentSymbol {
    DocumentSymbol {
        name: symbol.name.clone(),
        detail: None,
        kind,
        tags: None,
        deprecated: None,
        range: analysis.range(symbol.decl_span),
        selection_range: analysis.range(symbol.selection_span),
        children,
    }
}
