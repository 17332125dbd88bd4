use tower_lsp::lsp_types::Url;

use crate::analysis::Analysis;
use crate::analysis::ast::{Block, DefineDecl, Expr, Item, Stmt, TranslationUnit, VariableDecl};
use crate::analysis::lexer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Procedure,
    GlobalVariable,
    LocalVariable,
    Parameter,
    Define,
    DefineFn,
}

/// A declaration. `decl_span` covers the whole declaration, and
/// `selection_span` only the defining identifier.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub uri: Url,
    pub decl_span: Span,
    pub selection_span: Span,
    /// Index of the enclosing Procedure symbol; None for top level.
    pub scope: Option<usize>,
    /// Parameter names for procedures and function-like defines.
    pub params: Vec<String>,
    /// Replacement text for defines; rendered initializer for variables.
    pub detail: Option<String>,
}

/// An identifier use; resolved against the symbol tables on demand.
#[derive(Debug)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    pub scope: Option<usize>,
}

pub enum SymbolAt<'a> {
    Reference(&'a Reference),
    Declaration(&'a Symbol),
}

impl Symbol {
    /// The declaration header as it would read in source, for completion
    /// details, hover, and signature labels.
    pub fn display_header(&self) -> String {
        match self.kind {
            SymbolKind::Procedure => {
                if self.params.is_empty() {
                    format!("procedure {}", self.name)
                } else {
                    format!("procedure {}({})", self.name, self.params.join(", "))
                }
            }
            SymbolKind::GlobalVariable | SymbolKind::LocalVariable | SymbolKind::Parameter => {
                match self.detail.as_deref() {
                    Some(initializer) => format!("variable {} := {}", self.name, initializer),
                    None => format!("variable {}", self.name),
                }
            }
            SymbolKind::Define => match self.detail.as_deref() {
                Some(replacement) if !replacement.is_empty() => {
                    format!("#define {} {}", self.name, replacement)
                }
                _ => format!("#define {}", self.name),
            },
            SymbolKind::DefineFn => {
                let params = self.params.join(", ");
                match self.detail.as_deref() {
                    Some(replacement) if !replacement.is_empty() => {
                        format!("#define {}({}) {}", self.name, params, replacement)
                    }
                    _ => format!("#define {}({})", self.name, params),
                }
            }
        }
    }
}

/// Builds the symbol and reference tables for one parsed file.
pub fn index(uri: &Url, unit: &TranslationUnit, src: &str) -> (Vec<Symbol>, Vec<Reference>) {
    let mut indexer = Indexer {
        uri,
        symbols: Vec::new(),
        references: Vec::new(),
        scope: None,
    };

    for item in &unit.items {
        match item {
            Item::Variable(decl) => indexer.variable(decl, SymbolKind::GlobalVariable),
            Item::Procedure(proc) => {
                let proc_idx = indexer.push(Symbol {
                    name: proc.name.clone(),
                    kind: SymbolKind::Procedure,
                    uri: uri.clone(),
                    decl_span: proc.span,
                    selection_span: proc.name_span,
                    scope: None,
                    params: proc.params.iter().map(|p| p.name.clone()).collect(),
                    detail: None,
                });
                indexer.scope = Some(proc_idx);
                for param in &proc.params {
                    indexer.variable(param, SymbolKind::Parameter);
                }
                if let Some(body) = &proc.body {
                    indexer.block(body);
                }
                indexer.scope = None;
            }
            Item::Define(def) => indexer.define(def),
            Item::Include(_) => {}
        }
    }

    indexer.replacement_references(unit, src);
    indexer.references.sort_by_key(|r| r.span.start);
    (indexer.symbols, indexer.references)
}

struct Indexer<'a> {
    uri: &'a Url,
    symbols: Vec<Symbol>,
    references: Vec<Reference>,
    scope: Option<usize>,
}

impl Indexer<'_> {
    fn push(&mut self, symbol: Symbol) -> usize {
        self.symbols.push(symbol);
        self.symbols.len() - 1
    }

    fn variable(&mut self, decl: &VariableDecl, kind: SymbolKind) {
        self.push(Symbol {
            name: decl.name.clone(),
            kind,
            uri: self.uri.clone(),
            decl_span: decl.span,
            selection_span: decl.name_span,
            scope: self.scope,
            params: Vec::new(),
            detail: decl.initializer.as_ref().map(|init| init.to_string()),
        });
        if let Some(init) = &decl.initializer {
            self.expr(init);
        }
    }

    fn define(&mut self, def: &DefineDecl) {
        let kind = if def.params.is_some() {
            SymbolKind::DefineFn
        } else {
            SymbolKind::Define
        };
        self.push(Symbol {
            name: def.name.clone(),
            kind,
            uri: self.uri.clone(),
            decl_span: def.span,
            selection_span: def.name_span,
            scope: None,
            params: def.params.clone().unwrap_or_default(),
            detail: Some(def.replacement.clone()),
        });
    }

    fn block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign {
                target,
                target_span,
                value,
                ..
            } => {
                self.reference(target, *target_span);
                self.expr(value);
            }
            Stmt::Call {
                name, name_span, args, ..
            } => {
                self.reference(name, *name_span);
                for arg in args {
                    self.expr(arg);
                }
            }
            Stmt::VarDecl(decl) => {
                let kind = if self.scope.is_some() {
                    SymbolKind::LocalVariable
                } else {
                    SymbolKind::GlobalVariable
                };
                self.variable(decl, kind);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.expr(cond);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            Stmt::While { cond, body, .. } => {
                self.expr(cond);
                self.stmt(body);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                if let Some(step) = step {
                    self.stmt(step);
                }
                self.stmt(body);
            }
            Stmt::Foreach {
                var,
                var_span,
                iter,
                body,
                ..
            } => {
                self.reference(var, *var_span);
                self.expr(iter);
                self.stmt(body);
            }
            Stmt::Switch {
                scrutinee, cases, ..
            } => {
                self.expr(scrutinee);
                for case in cases {
                    if let Some(value) = &case.value {
                        self.expr(value);
                    }
                    for stmt in &case.stmts {
                        self.stmt(stmt);
                    }
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::Block(block) => self.block(block),
            Stmt::Empty { .. } => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident { name, span } => self.reference(name, *span),
            Expr::Call {
                name, name_span, args, ..
            } => {
                self.reference(name, *name_span);
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Int { .. } | Expr::Float { .. } | Expr::Str { .. } => {}
        }
    }

    fn reference(&mut self, name: &str, span: Span) {
        self.references.push(Reference {
            name: name.to_string(),
            span,
            scope: self.scope,
        });
    }

    /// Identifiers inside a `#define` replacement that match a define known
    /// in the same file count as references to it.
    fn replacement_references(&mut self, unit: &TranslationUnit, src: &str) {
        let known: Vec<&str> = self
            .symbols
            .iter()
            .filter(|s| matches!(s.kind, SymbolKind::Define | SymbolKind::DefineFn))
            .map(|s| s.name.as_str())
            .collect();
        if known.is_empty() {
            return;
        }

        for item in &unit.items {
            let Item::Define(def) = item else {
                continue;
            };
            for (name, span) in identifiers_in(src, def.replacement_span) {
                if name != def.name && known.contains(&name.as_str()) {
                    self.references.push(Reference {
                        name,
                        span,
                        scope: None,
                    });
                }
            }
        }
    }
}

fn identifiers_in(src: &str, span: Span) -> Vec<(String, Span)> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = span.start;
    while i < span.end {
        let b = bytes[i];
        if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            while i < span.end && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push((src[start..i].to_string(), Span::new(start, i)));
        } else {
            i += 1;
        }
    }
    out
}

/// Innermost identifier at `offset`: a recorded use, or a declaration's
/// defining identifier.
pub fn symbol_at(analysis: &Analysis, offset: usize) -> Option<SymbolAt<'_>> {
    // References are sorted by span start and identifier spans do not
    // overlap, so only the last one starting at or before the offset can
    // touch it.
    let idx = analysis
        .references
        .partition_point(|r| r.span.start <= offset);
    if idx > 0 {
        let reference = &analysis.references[idx - 1];
        if reference.span.touches(offset) {
            return Some(SymbolAt::Reference(reference));
        }
    }

    analysis
        .symbols
        .iter()
        .find(|s| s.selection_span.touches(offset))
        .map(SymbolAt::Declaration)
}

/// Resolves a name per the scope rules: enclosing procedure's locals and
/// parameters first, then the document's top level, then the include
/// closure. Within one table the later declaration wins.
pub fn resolve<'a>(
    analysis: &'a Analysis,
    name: &str,
    scope: Option<usize>,
) -> Option<&'a Symbol> {
    if let Some(proc_idx) = scope
        && let Some(local) = analysis
            .symbols
            .iter()
            .rev()
            .find(|s| s.scope == Some(proc_idx) && s.name == name)
    {
        return Some(local);
    }

    if let Some(global) = analysis
        .symbols
        .iter()
        .rev()
        .find(|s| s.scope.is_none() && s.name == name)
    {
        return Some(global);
    }

    for header in analysis.includes.values() {
        if let Some(symbol) = header
            .symbols
            .iter()
            .rev()
            .find(|s| s.scope.is_none() && s.name == name)
        {
            return Some(symbol);
        }
    }

    None
}

/// Two symbols are the same declaration when they come from the same file
/// and the same identifier span.
pub fn same_symbol(a: &Symbol, b: &Symbol) -> bool {
    a.uri == b.uri && a.selection_span == b.selection_span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::analyze_str;

    #[test]
    fn indexes_declarations_in_order() {
        let analysis = analyze_str(
            "variable count := 0;\n\nprocedure start begin\n    variable localvar;\n    count := 1;\nend\n",
        );
        let names: Vec<(&str, SymbolKind)> = analysis
            .symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("count", SymbolKind::GlobalVariable),
                ("start", SymbolKind::Procedure),
                ("localvar", SymbolKind::LocalVariable),
            ]
        );

        let start_idx = 1;
        assert_eq!(analysis.symbols[2].scope, Some(start_idx));
    }

    #[test]
    fn object_and_function_like_defines_are_distinct() {
        let analysis = analyze_str("#define MAX_HP 100\n#define dmg(min, max) random(min, max)\n");
        assert_eq!(analysis.symbols[0].kind, SymbolKind::Define);
        assert_eq!(analysis.symbols[1].kind, SymbolKind::DefineFn);
        assert_eq!(analysis.symbols[1].params, vec!["min", "max"]);
    }

    #[test]
    fn references_record_uses_not_declarations() {
        let analysis = analyze_str(
            "variable x;\n\nprocedure start begin\n    x := x + 1;\n    call helper;\nend\n",
        );
        let names: Vec<&str> = analysis.references.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["x", "x", "helper"]);
        // Uses inside the procedure carry its scope.
        assert_eq!(analysis.references[0].scope, Some(1));
    }

    #[test]
    fn locals_shadow_globals() {
        let analysis = analyze_str(
            "variable x;\n\nprocedure start begin\n    variable x;\n    x := 1;\nend\n",
        );
        let reference = analysis.references.first().expect("reference to x");
        let symbol = resolve(&analysis, &reference.name, reference.scope).expect("resolved");
        assert_eq!(symbol.kind, SymbolKind::LocalVariable);
    }

    #[test]
    fn top_level_use_skips_locals() {
        let analysis = analyze_str(
            "variable x;\nvariable y := x;\n\nprocedure start begin\n    variable x;\nend\n",
        );
        let reference = analysis.references.first().expect("reference to x");
        assert_eq!(reference.scope, None);
        let symbol = resolve(&analysis, &reference.name, reference.scope).expect("resolved");
        assert_eq!(symbol.kind, SymbolKind::GlobalVariable);
    }

    #[test]
    fn define_replacements_reference_known_defines() {
        let analysis = analyze_str("#define BASE 10\n#define TOTAL (BASE + 5)\n");
        let reference = analysis
            .references
            .iter()
            .find(|r| r.name == "BASE")
            .expect("replacement reference");
        let symbol = resolve(&analysis, &reference.name, reference.scope).expect("resolved");
        assert_eq!(symbol.kind, SymbolKind::Define);
    }

    #[test]
    fn symbol_at_finds_reference_and_declaration() {
        let src = "variable x;\n\nprocedure start begin\n    x := 1;\nend\n";
        let analysis = analyze_str(src);

        let use_offset = src.rfind("x :=").expect("use of x");
        match symbol_at(&analysis, use_offset) {
            Some(SymbolAt::Reference(r)) => assert_eq!(r.name, "x"),
            _ => panic!("expected reference"),
        }

        let decl_offset = src.find('x').expect("declaration of x");
        match symbol_at(&analysis, decl_offset) {
            Some(SymbolAt::Declaration(s)) => assert_eq!(s.name, "x"),
            _ => panic!("expected declaration"),
        }

        assert!(symbol_at(&analysis, src.find(";\n").expect("semicolon") + 1).is_none());
    }
}
