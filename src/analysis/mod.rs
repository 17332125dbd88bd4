use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Location, Position, Range, Url};

pub mod ast;
pub mod builtins;
pub mod completion;
pub mod hover;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod scopes;
pub mod signature;
pub mod symbols;

use lexer::Span;
use preprocessor::IncludeContext;
use symbols::{Reference, Symbol};

/// An internal diagnostic carrying a byte span; converted to an LSP
/// diagnostic once the line table is final.
#[derive(Debug)]
pub struct Diag {
    pub span: Span,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Immutable per-document result of lexing, preprocessing, parsing, and
/// indexing. Published snapshots are only ever replaced wholesale.
pub struct Analysis {
    pub uri: Url,
    pub version: i32,
    pub text: String,
    pub line_starts: Vec<usize>,
    pub unit: ast::TranslationUnit,
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub diagnostics: Vec<Diagnostic>,
    /// Analyses of every transitively `#include`d header, keyed by URI.
    pub includes: HashMap<Url, Arc<Analysis>>,
}

/// Runs the full pipeline on an opened or changed document, loading its
/// include closure from disk.
pub fn analyze(uri: &Url, text: String, version: i32, ctx: &IncludeContext<'_>) -> Analysis {
    let mut parts = analyze_source(uri, text);

    let mut visited = HashSet::new();
    visited.insert(uri.clone());
    let mut closure = HashMap::new();
    preprocessor::load_includes(
        &parts.unit,
        uri,
        ctx,
        &mut visited,
        &mut closure,
        &mut parts.diags,
    );

    parts.finish(version, closure)
}

/// Lex + parse + index for a single file, without include loading.
pub(crate) fn analyze_source(uri: &Url, text: String) -> SourceAnalysis {
    let line_starts = crate::utils::position::compute_line_starts(&text);
    let mut diags = Vec::new();
    let tokens = lexer::tokenize(&text, &mut diags);
    let unit = parser::parse(&text, &tokens, &mut diags);
    let (symbols, references) = symbols::index(uri, &unit, &text);

    SourceAnalysis {
        uri: uri.clone(),
        text,
        line_starts,
        unit,
        symbols,
        references,
        diags,
    }
}

pub(crate) struct SourceAnalysis {
    pub uri: Url,
    pub text: String,
    pub line_starts: Vec<usize>,
    pub unit: ast::TranslationUnit,
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub diags: Vec<Diag>,
}

impl SourceAnalysis {
    pub(crate) fn finish(self, version: i32, includes: HashMap<Url, Arc<Analysis>>) -> Analysis {
        let diagnostics = self
            .diags
            .into_iter()
            .map(|d| Diagnostic {
                range: span_to_range(&self.text, &self.line_starts, d.span),
                severity: Some(match d.severity {
                    Severity::Error => DiagnosticSeverity::ERROR,
                    Severity::Warning => DiagnosticSeverity::WARNING,
                }),
                source: Some("ssl-lsp".into()),
                message: d.message,
                ..Default::default()
            })
            .collect();

        Analysis {
            uri: self.uri,
            version,
            text: self.text,
            line_starts: self.line_starts,
            unit: self.unit,
            symbols: self.symbols,
            references: self.references,
            diagnostics,
            includes,
        }
    }
}

impl Analysis {
    pub fn offset_of(&self, pos: Position) -> Option<usize> {
        crate::utils::position::position_to_offset(&self.text, &self.line_starts, pos)
    }

    pub fn range(&self, span: Span) -> Range {
        span_to_range(&self.text, &self.line_starts, span)
    }

    /// A symbol's Location, using the line table of whichever file in the
    /// closure declared it.
    pub fn location_of(&self, symbol: &Symbol) -> Option<Location> {
        let origin = if symbol.uri == self.uri {
            self
        } else {
            self.includes.get(&symbol.uri)?.as_ref()
        };
        Some(Location {
            uri: symbol.uri.clone(),
            range: origin.range(symbol.selection_span),
        })
    }
}

fn span_to_range(text: &str, line_starts: &[usize], span: Span) -> Range {
    Range::new(
        crate::utils::position::offset_to_position(text, line_starts, span.start),
        crate::utils::position::offset_to_position(text, line_starts, span.end),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn analyze_str(src: &str) -> Analysis {
        let uri = Url::parse("file:///test/script.ssl").expect("test uri");
        let ctx = IncludeContext {
            include_paths: &[],
            workspace_root: None,
        };
        analyze(&uri, src.to_string(), 1, &ctx)
    }

    #[test]
    fn valid_source_has_no_diagnostics() {
        let analysis =
            analyze_str("variable count := 0;\n\nprocedure start begin\n    count := 1;\nend\n");
        assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
        assert_eq!(analysis.version, 1);
    }

    #[test]
    fn invalid_source_reports_errors_with_source_tag() {
        let analysis = analyze_str("this is not valid ssl code at all;\n");
        assert!(!analysis.diagnostics.is_empty());
        let diag = &analysis.diagnostics[0];
        assert_eq!(diag.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diag.source.as_deref(), Some("ssl-lsp"));
        assert!(analysis.symbols.is_empty());
    }

    #[test]
    fn missing_include_is_a_warning_on_the_path() {
        let src = "#include \"headers/nowhere.h\"\nvariable x;\n";
        let analysis = analyze_str(src);
        assert_eq!(analysis.diagnostics.len(), 1);
        let diag = &analysis.diagnostics[0];
        assert_eq!(diag.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diag.range.start.line, 0);
        // The warning points at the path, not the whole directive.
        assert_eq!(diag.range.start.character, 10);
        // Parsing continued past the directive.
        assert_eq!(analysis.symbols.len(), 1);
    }

    #[test]
    fn include_closure_resolves_cross_file_symbols() {
        let dir = std::env::temp_dir().join(format!("ssl-lsp-closure-{}", std::process::id()));
        let headers = dir.join("headers");
        std::fs::create_dir_all(&headers).expect("create test dir");
        std::fs::write(headers.join("sfall.h"), "#define WORLDMAP (5)\n#include \"more.h\"\n")
            .expect("write header");
        std::fs::write(headers.join("more.h"), "variable from_more;\n").expect("write header");
        let script = dir.join("town.ssl");
        std::fs::write(
            &script,
            "#include \"headers/sfall.h\"\n\nprocedure start begin\n    display_msg(WORLDMAP);\nend\n",
        )
        .expect("write script");

        let uri = Url::from_file_path(&script).expect("script uri");
        let text = std::fs::read_to_string(&script).expect("read script");
        let ctx = IncludeContext {
            include_paths: &[],
            workspace_root: None,
        };
        let analysis = analyze(&uri, text, 1, &ctx);

        assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
        // Both headers land in the flat closure map.
        assert_eq!(analysis.includes.len(), 2);

        let reference = analysis
            .references
            .iter()
            .find(|r| r.name == "WORLDMAP")
            .expect("use of WORLDMAP");
        let symbol =
            symbols::resolve(&analysis, &reference.name, reference.scope).expect("resolved");
        assert!(symbol.uri.path().ends_with("headers/sfall.h"));

        let location = analysis.location_of(symbol).expect("location");
        assert_eq!(location.range.start.line, 0);
        assert_eq!(location.range.start.character, 8);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn call_site_resolves_to_procedure_declaration_line() {
        let src = "variable x;\n\nprocedure test begin\n    x := 2;\nend\n\n\nprocedure start begin\n    x := 1;\n    call test;\nend\n";
        let analysis = analyze_str(src);

        // Cursor on `test` in `call test;` (line 9, character 9).
        let offset = analysis.offset_of(Position::new(9, 9)).expect("offset");
        let Some(symbols::SymbolAt::Reference(reference)) = symbols::symbol_at(&analysis, offset)
        else {
            panic!("expected a reference under the cursor");
        };
        let symbol =
            symbols::resolve(&analysis, &reference.name, reference.scope).expect("resolved");
        let location = analysis.location_of(symbol).expect("location");
        assert_eq!(location.uri, analysis.uri);
        assert_eq!(location.range.start.line, 2);

        // The declaration's own identifier resolves to itself.
        let decl_offset = analysis
            .offset_of(location.range.start)
            .expect("declaration offset");
        match symbols::symbol_at(&analysis, decl_offset) {
            Some(symbols::SymbolAt::Declaration(s)) => assert_eq!(s.name, "test"),
            _ => panic!("expected the declaration"),
        }

        // `x := 1;` on line 8 resolves to the global on line 0.
        let offset = analysis.offset_of(Position::new(8, 4)).expect("offset");
        let Some(symbols::SymbolAt::Reference(reference)) = symbols::symbol_at(&analysis, offset)
        else {
            panic!("expected a reference under the cursor");
        };
        let symbol =
            symbols::resolve(&analysis, &reference.name, reference.scope).expect("resolved");
        let location = analysis.location_of(symbol).expect("location");
        assert_eq!(location.range.start.line, 0);
    }

    #[test]
    fn include_cycles_terminate() {
        let dir = std::env::temp_dir().join(format!("ssl-lsp-cycle-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create test dir");
        std::fs::write(dir.join("a.h"), "#include \"b.h\"\nvariable from_a;\n")
            .expect("write header");
        std::fs::write(dir.join("b.h"), "#include \"a.h\"\nvariable from_b;\n")
            .expect("write header");
        let script = dir.join("main.ssl");
        std::fs::write(&script, "#include \"a.h\"\n").expect("write script");

        let uri = Url::from_file_path(&script).expect("script uri");
        let text = std::fs::read_to_string(&script).expect("read script");
        let ctx = IncludeContext {
            include_paths: &[],
            workspace_root: None,
        };
        let analysis = analyze(&uri, text, 1, &ctx);

        assert_eq!(analysis.includes.len(), 2);
        assert!(symbols::resolve(&analysis, "from_b", None).is_some());

        std::fs::remove_dir_all(&dir).ok();
    }
}
