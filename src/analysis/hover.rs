use tower_lsp::lsp_types::Url;

use crate::analysis::Analysis;
use crate::analysis::builtins::Builtin;
use crate::analysis::symbols::{Symbol, SymbolKind};

/// Markdown hover for a resolved symbol. Defines carry a source-location
/// line so headers are distinguishable from the current file.
pub fn symbol_markdown(analysis: &Analysis, symbol: &Symbol) -> String {
    let header = symbol.display_header();
    match symbol.kind {
        SymbolKind::Define | SymbolKind::DefineFn => {
            format!(
                "```ssl\n{}\n```\n\nDefined in {}",
                header,
                source_label(analysis, &symbol.uri)
            )
        }
        _ => format!("```ssl\n{header}\n```"),
    }
}

pub fn builtin_markdown(builtin: &Builtin) -> String {
    format!("```ssl\n{}\n```\n\n{}", builtin.label, builtin.doc)
}

fn source_label(analysis: &Analysis, uri: &Url) -> String {
    if *uri == analysis.uri {
        return "current file".to_string();
    }
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|name| format!("`{name}`"))
        .unwrap_or_else(|| uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::builtins;
    use crate::analysis::symbols::resolve;
    use crate::analysis::tests::analyze_str;

    #[test]
    fn define_hover_shows_replacement_and_origin() {
        let analysis = analyze_str("#define MAX_HP 100\n");
        let symbol = resolve(&analysis, "MAX_HP", None).expect("define");
        assert_eq!(
            symbol_markdown(&analysis, symbol),
            "```ssl\n#define MAX_HP 100\n```\n\nDefined in current file"
        );
    }

    #[test]
    fn procedure_hover_shows_declaration_header() {
        let analysis = analyze_str("procedure damage(variable who, variable amount) begin\nend\n");
        let symbol = resolve(&analysis, "damage", None).expect("procedure");
        assert_eq!(
            symbol_markdown(&analysis, symbol),
            "```ssl\nprocedure damage(who, amount)\n```"
        );
    }

    #[test]
    fn builtin_hover_shows_signature_and_doc() {
        let builtin = builtins::lookup("random").expect("random");
        let markdown = builtin_markdown(builtin);
        assert!(markdown.starts_with("```ssl\nrandom(min, max)\n```"));
        assert!(markdown.contains("random integer"));
    }
}
