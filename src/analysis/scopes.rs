use crate::analysis::Analysis;
use crate::analysis::symbols::SymbolKind;

/// Index of the procedure symbol whose declaration spans `offset`, if any.
/// Top-level positions have no enclosing procedure.
pub fn enclosing_procedure(analysis: &Analysis, offset: usize) -> Option<usize> {
    analysis
        .symbols
        .iter()
        .position(|s| s.kind == SymbolKind::Procedure && s.decl_span.contains(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::analyze_str;

    #[test]
    fn finds_enclosing_procedure_by_offset() {
        let src = "variable x;\n\nprocedure first begin\nend\n\nprocedure second begin\n    x := 1;\nend\n";
        let analysis = analyze_str(src);

        assert_eq!(enclosing_procedure(&analysis, 0), None);

        let in_second = src.find("x := 1").expect("statement");
        let idx = enclosing_procedure(&analysis, in_second).expect("scope");
        assert_eq!(analysis.symbols[idx].name, "second");
    }
}
