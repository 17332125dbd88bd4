use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use tower_lsp::lsp_types::Url;

use crate::analysis::ast::{DefineDecl, IncludeDirective, Item, TranslationUnit};
use crate::analysis::lexer::Span;
use crate::analysis::{Analysis, Diag, Severity};
use crate::utils::paths::resolve_include_path;

pub enum Directive {
    Define(DefineDecl),
    Include(IncludeDirective),
    /// `#ifdef` and friends; recognized but not modeled.
    Other,
}

/// Settings that steer `#include` resolution, taken from the workspace
/// configuration at analysis time.
pub struct IncludeContext<'a> {
    pub include_paths: &'a [String],
    pub workspace_root: Option<&'a Path>,
}

/// Parses one directive token (the whole logical line) into its model.
/// Malformed `#define`/`#include` lines produce an Error diagnostic and
/// degrade to `Other`.
pub fn parse_directive(src: &str, span: Span, diags: &mut Vec<Diag>) -> Directive {
    let text = &src[span.start..span.end];
    let base = span.start;

    let mut i = 0;
    skip_ws(text, &mut i);
    if !text[i..].starts_with('#') {
        return Directive::Other;
    }
    i += 1;
    skip_ws(text, &mut i);

    let word_start = i;
    while text[i..].starts_with(|c: char| c.is_ascii_alphabetic()) {
        i += 1;
    }
    match &text[word_start..i] {
        "define" => parse_define(text, base, i, span, diags),
        "include" => parse_include(text, base, i, span, diags),
        _ => Directive::Other,
    }
}

fn parse_define(
    text: &str,
    base: usize,
    mut i: usize,
    span: Span,
    diags: &mut Vec<Diag>,
) -> Directive {
    skip_ws(text, &mut i);
    let name_start = i;
    while text[i..].starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        i += 1;
    }
    if i == name_start {
        diags.push(Diag {
            span,
            message: "expected macro name after `#define`".to_string(),
            severity: Severity::Error,
        });
        return Directive::Other;
    }
    let name = text[name_start..i].to_string();
    let name_span = Span::new(base + name_start, base + i);

    // Function-like only when `(` immediately follows the name.
    let params = if text[i..].starts_with('(') {
        i += 1;
        let mut names = Vec::new();
        let mut current = String::new();
        loop {
            match text[i..].chars().next() {
                None => {
                    diags.push(Diag {
                        span,
                        message: "unterminated macro parameter list".to_string(),
                        severity: Severity::Error,
                    });
                    return Directive::Other;
                }
                Some(')') => {
                    i += 1;
                    if !current.trim().is_empty() {
                        names.push(current.trim().to_string());
                    }
                    break;
                }
                Some(',') => {
                    i += 1;
                    if !current.trim().is_empty() {
                        names.push(current.trim().to_string());
                    }
                    current.clear();
                }
                Some(c) => {
                    i += c.len_utf8();
                    current.push(c);
                }
            }
        }
        Some(names)
    } else {
        None
    };

    skip_ws(text, &mut i);
    let replacement_span = Span::new(base + i, span.end);
    let replacement = text[i..]
        .replace("\\\r\n", " ")
        .replace("\\\n", " ")
        .trim()
        .to_string();

    Directive::Define(DefineDecl {
        name,
        name_span,
        params,
        replacement,
        replacement_span,
        span,
    })
}

fn parse_include(
    text: &str,
    base: usize,
    mut i: usize,
    span: Span,
    diags: &mut Vec<Diag>,
) -> Directive {
    skip_ws(text, &mut i);
    let close = match text[i..].chars().next() {
        Some('"') => '"',
        Some('<') => '>',
        _ => {
            diags.push(Diag {
                span,
                message: "expected \"path\" after `#include`".to_string(),
                severity: Severity::Error,
            });
            return Directive::Other;
        }
    };
    i += 1;
    let path_start = i;
    while !text[i..].is_empty() && !text[i..].starts_with(close) {
        i += text[i..].chars().next().map(char::len_utf8).unwrap_or(1);
    }
    if text[i..].is_empty() {
        diags.push(Diag {
            span,
            message: "unterminated include path".to_string(),
            severity: Severity::Error,
        });
        return Directive::Other;
    }

    Directive::Include(IncludeDirective {
        path: text[path_start..i].to_string(),
        path_span: Span::new(base + path_start, base + i),
        span,
    })
}

fn skip_ws(text: &str, i: &mut usize) {
    while text[*i..].starts_with([' ', '\t']) {
        *i += 1;
    }
}

/// Walks the unit's `#include` directives, loading each header through the
/// full pipeline and inserting its Analysis into the closure map. A URI
/// already visited is not re-entered, which also breaks include cycles.
/// Unresolvable headers leave a Warning on the directive's path span.
pub fn load_includes(
    unit: &TranslationUnit,
    uri: &Url,
    ctx: &IncludeContext<'_>,
    visited: &mut HashSet<Url>,
    closure: &mut HashMap<Url, Arc<Analysis>>,
    diags: &mut Vec<Diag>,
) {
    for item in &unit.items {
        let Item::Include(inc) = item else {
            continue;
        };

        let resolved = uri.to_file_path().ok().and_then(|current| {
            resolve_include_path(&current, ctx.include_paths, ctx.workspace_root, &inc.path)
        });
        let Some(path) = resolved else {
            missing_include(inc, diags);
            continue;
        };
        let path = path.canonicalize().unwrap_or(path);
        let Ok(header_uri) = Url::from_file_path(&path) else {
            missing_include(inc, diags);
            continue;
        };

        if !visited.insert(header_uri.clone()) {
            continue;
        }

        let Ok(text) = std::fs::read_to_string(&path) else {
            missing_include(inc, diags);
            continue;
        };

        debug!("analyzing include {header_uri}");
        let mut parts = super::analyze_source(&header_uri, text);
        load_includes(&parts.unit, &header_uri, ctx, visited, closure, &mut parts.diags);
        closure.insert(header_uri, Arc::new(parts.finish(0, HashMap::new())));
    }
}

fn missing_include(inc: &IncludeDirective, diags: &mut Vec<Diag>) {
    diags.push(Diag {
        span: inc.path_span,
        message: format!("include file not found: \"{}\"", inc.path),
        severity: Severity::Warning,
    });
}
