use tower_lsp::{LspService, Server};

mod analysis;
mod backend;
mod config;
mod handlers;
mod utils;

use backend::Backend;

#[tokio::main]
async fn main() {
    env_logger::init();

    // Stdio is the only transport; the conventional `--stdio` flag editors
    // pass is accepted and everything else on the command line is ignored.
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new).finish();

    Server::new(stdin, stdout, socket).serve(service).await;
}
