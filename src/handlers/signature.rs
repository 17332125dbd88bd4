use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::analysis::signature::{call_context_at_offset, signature_for};
use crate::backend::Backend;

impl Backend {
    pub async fn handle_signature_help(
        &self,
        params: SignatureHelpParams,
    ) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let Some(analysis) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let Some(offset) = analysis.offset_of(pos) else {
            return Ok(None);
        };

        let Some(call) = call_context_at_offset(analysis.text.as_bytes(), offset) else {
            return Ok(None);
        };
        let Some(signature) = signature_for(&analysis, &call.name) else {
            return Ok(None);
        };

        let param_count = signature.parameters.as_ref().map(Vec::len).unwrap_or(0);
        let active_parameter = if param_count == 0 {
            None
        } else {
            Some(call.active_param.min(param_count - 1) as u32)
        };

        Ok(Some(SignatureHelp {
            signatures: vec![signature],
            active_signature: Some(0),
            active_parameter,
        }))
    }
}
