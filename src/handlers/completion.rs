use log::debug;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::analysis::completion::completion_items;
use crate::backend::Backend;
use crate::utils::position::ascii_ident_prefix;

impl Backend {
    pub async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> Result<Option<CompletionResponse>> {
        if !self.config.lock().await.completion.enabled {
            return Ok(None);
        }

        let uri = params.text_document_position.text_document.uri;
        let pos = params.text_document_position.position;

        let Some(analysis) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let Some(offset) = analysis.offset_of(pos) else {
            return Ok(None);
        };

        let prefix = ascii_ident_prefix(&analysis.text, offset);
        if prefix.is_empty() {
            return Ok(None);
        }
        debug!("completing prefix {prefix:?}");

        let items = completion_items(&analysis, offset, &prefix);
        Ok(Some(CompletionResponse::Array(items)))
    }
}
