use tower_lsp::lsp_types::{
    Documentation, ParameterInformation, ParameterLabel, SignatureInformation,
};

use crate::analysis::symbols::{self, SymbolKind};
use crate::analysis::{Analysis, builtins};

pub struct CallContext {
    pub name: String,
    pub active_param: usize,
}

/// Scans backward from the offset over balanced brackets to find the
/// innermost unmatched `(` and the callee identifier before it. The active
/// parameter is the number of depth-0 commas between that `(` and the
/// offset.
pub fn call_context_at_offset(src: &[u8], offset: usize) -> Option<CallContext> {
    if src.is_empty() {
        return None;
    }
    let mut i = offset.min(src.len());
    let mut depth = 0usize;
    let mut in_string = false;

    while i > 0 {
        i -= 1;
        let b = src[i];
        if in_string {
            if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b')' => depth += 1,
            b'(' => {
                if depth == 0 {
                    let name = call_name_before_open_paren(src, i)?;
                    let active_param = count_active_argument_index(src, i, offset);
                    return Some(CallContext { name, active_param });
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    None
}

fn call_name_before_open_paren(src: &[u8], open_paren: usize) -> Option<String> {
    let mut end = open_paren;
    while end > 0 && src[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 {
        let c = src[start - 1];
        if !c.is_ascii_alphanumeric() && c != b'_' {
            break;
        }
        start -= 1;
    }
    if start == end {
        return None;
    }
    std::str::from_utf8(&src[start..end])
        .ok()
        .map(str::to_string)
}

fn count_active_argument_index(src: &[u8], args_start: usize, offset: usize) -> usize {
    let scan_end = offset.min(src.len());
    let mut idx = 0usize;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = args_start.saturating_add(1);

    while i < scan_end {
        let b = src[i];
        if in_string {
            if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => idx += 1,
            _ => {}
        }
        i += 1;
    }

    idx
}

/// Resolves a callee name to a signature: a user procedure or function-like
/// define from the closure first, then the builtin catalogue.
pub fn signature_for(analysis: &Analysis, name: &str) -> Option<SignatureInformation> {
    if let Some(symbol) = symbols::resolve(analysis, name, None)
        && matches!(symbol.kind, SymbolKind::Procedure | SymbolKind::DefineFn)
    {
        return Some(SignatureInformation {
            label: symbol.display_header(),
            documentation: None,
            parameters: Some(parameter_infos(&symbol.params)),
            active_parameter: None,
        });
    }

    let builtin = builtins::lookup(name)?;
    Some(SignatureInformation {
        label: builtin.label.clone(),
        documentation: Some(Documentation::String(builtin.doc.clone())),
        parameters: Some(parameter_infos(&builtin.params)),
        active_parameter: None,
    })
}

fn parameter_infos(params: &[String]) -> Vec<ParameterInformation> {
    params
        .iter()
        .map(|p| ParameterInformation {
            label: ParameterLabel::Simple(p.clone()),
            documentation: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::analyze_str;

    #[test]
    fn finds_callee_and_active_param() {
        let src = "procedure start begin\n    x := random(1, 5);\nend\n";
        let offset = src.find("1, 5").expect("args") + "1, ".len();
        let call = call_context_at_offset(src.as_bytes(), offset).expect("call context");
        assert_eq!(call.name, "random");
        assert_eq!(call.active_param, 1);
    }

    #[test]
    fn nested_calls_use_the_innermost_open_paren() {
        let src = "y := outer(inner(a, b), c)";
        // Inside `inner`, after its first comma.
        let offset = src.find("a, b").expect("args") + "a, ".len();
        let call = call_context_at_offset(src.as_bytes(), offset).expect("call context");
        assert_eq!(call.name, "inner");
        assert_eq!(call.active_param, 1);

        // After `inner(...)` closes we are back in `outer`.
        let offset = src.find(", c").expect("outer args") + 2;
        let call = call_context_at_offset(src.as_bytes(), offset).expect("call context");
        assert_eq!(call.name, "outer");
        assert_eq!(call.active_param, 1);
    }

    #[test]
    fn commas_inside_strings_do_not_count() {
        let src = "display_msg(\"a, b\", x)";
        let offset = src.len() - 1;
        let call = call_context_at_offset(src.as_bytes(), offset).expect("call context");
        assert_eq!(call.name, "display_msg");
        assert_eq!(call.active_param, 1);
    }

    #[test]
    fn no_enclosing_call_is_none() {
        let src = "x := y + 1;\n";
        assert!(call_context_at_offset(src.as_bytes(), src.len()).is_none());
        assert!(call_context_at_offset(b"", 0).is_none());
    }

    #[test]
    fn resolves_user_procedures_then_builtins() {
        let analysis = analyze_str(
            "procedure damage(variable who, variable amount) begin\nend\n",
        );

        let sig = signature_for(&analysis, "damage").expect("user signature");
        assert_eq!(sig.label, "procedure damage(who, amount)");
        assert_eq!(sig.parameters.as_ref().map(Vec::len), Some(2));

        let sig = signature_for(&analysis, "random").expect("builtin signature");
        assert_eq!(sig.label, "random(min, max)");

        assert!(signature_for(&analysis, "no_such_callable").is_none());
    }
}
