use std::collections::HashSet;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, InsertTextFormat,
};

use crate::analysis::symbols::{Symbol, SymbolKind};
use crate::analysis::{Analysis, builtins, scopes};

/// Candidates for the identifier prefix ending at `offset`, most specific
/// first: enclosing-procedure locals, then document globals, then include
/// closure symbols, then the builtin catalogue. The first occurrence of a
/// name wins; matching is case-sensitive.
pub fn completion_items(analysis: &Analysis, offset: usize, prefix: &str) -> Vec<CompletionItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    if let Some(proc_idx) = scopes::enclosing_procedure(analysis, offset) {
        for symbol in analysis.symbols.iter().filter(|s| s.scope == Some(proc_idx)) {
            add_symbol(symbol, prefix, &mut seen, &mut items);
        }
    }

    for symbol in analysis.symbols.iter().filter(|s| s.scope.is_none()) {
        add_symbol(symbol, prefix, &mut seen, &mut items);
    }

    for header in analysis.includes.values() {
        for symbol in header.symbols.iter().filter(|s| s.scope.is_none()) {
            add_symbol(symbol, prefix, &mut seen, &mut items);
        }
    }

    for builtin in builtins::catalogue() {
        if builtin.name.starts_with(prefix) && seen.insert(builtin.name.clone()) {
            items.push(CompletionItem {
                label: builtin.name.clone(),
                kind: Some(CompletionItemKind::FUNCTION),
                detail: Some(builtin.label.clone()),
                documentation: Some(Documentation::String(builtin.doc.clone())),
                insert_text: Some(builtin.name.clone()),
                insert_text_format: Some(InsertTextFormat::PLAIN_TEXT),
                ..Default::default()
            });
        }
    }

    items
}

fn add_symbol(
    symbol: &Symbol,
    prefix: &str,
    seen: &mut HashSet<String>,
    items: &mut Vec<CompletionItem>,
) {
    if !symbol.name.starts_with(prefix) || !seen.insert(symbol.name.clone()) {
        return;
    }

    let kind = match symbol.kind {
        SymbolKind::Procedure | SymbolKind::DefineFn => CompletionItemKind::FUNCTION,
        SymbolKind::Define => CompletionItemKind::CONSTANT,
        SymbolKind::GlobalVariable | SymbolKind::LocalVariable | SymbolKind::Parameter => {
            CompletionItemKind::VARIABLE
        }
    };

    items.push(CompletionItem {
        label: symbol.name.clone(),
        kind: Some(kind),
        detail: Some(symbol.display_header()),
        insert_text: Some(symbol.name.clone()),
        insert_text_format: Some(InsertTextFormat::PLAIN_TEXT),
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::analyze_str;

    #[test]
    fn builtins_match_by_prefix() {
        let src = "variable x;\n\nprocedure start begin\n    rand\nend\n";
        let analysis = analyze_str(src);
        let offset = src.find("rand").expect("prefix") + 4;

        let items = completion_items(&analysis, offset, "rand");
        let random = items
            .iter()
            .find(|i| i.label == "random")
            .expect("random completion");
        assert_eq!(random.kind, Some(CompletionItemKind::FUNCTION));
        assert_eq!(random.detail.as_deref(), Some("random(min, max)"));
    }

    #[test]
    fn user_symbols_come_with_their_kinds() {
        let src = "variable my_counter := 0;\nvariable my_flag := 1;\n\nprocedure my_helper begin\nend\n\nprocedure start begin\n    my_counter := 1;\nend\n";
        let analysis = analyze_str(src);
        let offset = src.rfind("my_counter").expect("prefix") + 3;

        let items = completion_items(&analysis, offset, "my_");
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"my_counter"));
        assert!(labels.contains(&"my_flag"));
        assert!(labels.contains(&"my_helper"));

        let helper = items.iter().find(|i| i.label == "my_helper").expect("helper");
        assert_eq!(helper.kind, Some(CompletionItemKind::FUNCTION));
        let counter = items.iter().find(|i| i.label == "my_counter").expect("counter");
        assert_eq!(counter.kind, Some(CompletionItemKind::VARIABLE));
    }

    #[test]
    fn defines_map_to_constant_and_function_kinds() {
        let src = "#define MAX_HP 100\n#define dmg(a, b) random(a, b)\n\nprocedure start begin\n    M\nend\n";
        let analysis = analyze_str(src);
        let offset = src.rfind("M\n").expect("prefix") + 1;

        let items = completion_items(&analysis, offset, "");
        let max_hp = items.iter().find(|i| i.label == "MAX_HP").expect("MAX_HP");
        assert_eq!(max_hp.kind, Some(CompletionItemKind::CONSTANT));
        let dmg = items.iter().find(|i| i.label == "dmg").expect("dmg");
        assert_eq!(dmg.kind, Some(CompletionItemKind::FUNCTION));
        assert_eq!(dmg.detail.as_deref(), Some("#define dmg(a, b) random(a, b)"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let src = "variable Counter;\n\nprocedure start begin\n    c\nend\n";
        let analysis = analyze_str(src);
        let offset = src.rfind("c\n").expect("prefix") + 1;

        let items = completion_items(&analysis, offset, "c");
        assert!(items.iter().all(|i| i.label != "Counter"));
    }

    #[test]
    fn locals_win_over_builtins_with_the_same_name() {
        let src = "procedure start begin\n    variable random;\n    random := 1;\nend\n";
        let analysis = analyze_str(src);
        let offset = src.rfind("random :=").expect("use") + 6;

        let items = completion_items(&analysis, offset, "random");
        let matching: Vec<&CompletionItem> =
            items.iter().filter(|i| i.label == "random").collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].kind, Some(CompletionItemKind::VARIABLE));
    }
}
