use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use log::debug;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::analysis::Analysis;
use crate::config::{self, SslConfig};

pub struct Backend {
    pub client: Client,
    /// Latest published analysis snapshot per open document. Snapshots are
    /// immutable; an edit replaces the whole entry.
    pub documents: DashMap<Url, Arc<Analysis>>,
    pub config: Mutex<SslConfig>,
    pub workspace_root: Mutex<Option<PathBuf>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: DashMap::new(),
            config: Mutex::new(SslConfig::default()),
            workspace_root: Mutex::new(None),
        }
    }

    pub fn snapshot(&self, uri: &Url) -> Option<Arc<Analysis>> {
        self.documents.get(uri).map(|entry| entry.value().clone())
    }
}

fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
        document_symbol_provider: Some(OneOf::Left(true)),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        completion_provider: Some(CompletionOptions {
            resolve_provider: Some(false),
            trigger_characters: Some(vec![]),
            work_done_progress_options: Default::default(),
            all_commit_characters: None,
            completion_item: None,
        }),
        signature_help_provider: Some(SignatureHelpOptions {
            trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
            retrigger_characters: None,
            work_done_progress_options: Default::default(),
        }),
        ..ServerCapabilities::default()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = config::find_workspace_root(&params);
        *self.config.lock().await = config::load_from_workspace_root(root.as_deref()).await;
        *self.workspace_root.lock().await = root;

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "ssl-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            offset_encoding: None,
            capabilities: server_capabilities(),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        debug!("initialized!");
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.handle_did_open(params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.handle_did_change(params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.handle_did_close(params).await;
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        self.handle_document_symbol(params).await
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        self.handle_goto_definition(params).await
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        self.handle_references(params).await
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        self.handle_completion(params).await
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        self.handle_hover(params).await
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        self.handle_signature_help(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_serialize_to_the_wire_shape_clients_expect() {
        let value = serde_json::to_value(server_capabilities()).expect("serialize");

        // Full sync advertised as the bare kind, not the options object.
        assert_eq!(value["textDocumentSync"], 1);
        assert_eq!(value["documentSymbolProvider"], true);
        assert_eq!(value["definitionProvider"], true);
        assert_eq!(value["referencesProvider"], true);
        assert_eq!(value["hoverProvider"], true);
        assert!(value.get("completionProvider").is_some());

        let triggers = value["signatureHelpProvider"]["triggerCharacters"]
            .as_array()
            .expect("trigger characters")
            .clone();
        assert!(triggers.contains(&serde_json::json!("(")));
        assert!(triggers.contains(&serde_json::json!(",")));
    }
}
