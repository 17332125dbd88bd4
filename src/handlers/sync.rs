use log::debug;
use tower_lsp::lsp_types::*;

use crate::backend::Backend;
use crate::handlers::diagnostics::on_change;

impl Backend {
    pub async fn handle_did_open(&self, params: DidOpenTextDocumentParams) {
        on_change(
            self,
            params.text_document.uri,
            params.text_document.version,
            params.text_document.text,
            true,
        )
        .await;
        debug!("file opened!");
    }

    pub async fn handle_did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the client sends the whole document as one change.
        let Some(change) = params.content_changes.into_iter().next() else {
            return;
        };
        on_change(
            self,
            params.text_document.uri,
            params.text_document.version,
            change.text,
            false,
        )
        .await;
        debug!("changed!");
    }

    pub async fn handle_did_close(&self, params: DidCloseTextDocumentParams) {
        // Dropping the snapshot also drops closure entries held only
        // through it.
        self.documents.remove(&params.text_document.uri);
        debug!("file closed!");
    }
}
