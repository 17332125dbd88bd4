use std::fmt;

use crate::analysis::lexer::Span;

/// Root of a parsed SSL source file.
#[derive(Debug, Default)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
}

#[derive(Debug)]
pub enum Item {
    Procedure(ProcedureDecl),
    Variable(VariableDecl),
    Define(DefineDecl),
    Include(IncludeDirective),
}

#[derive(Debug)]
pub struct ProcedureDecl {
    pub name: String,
    pub name_span: Span,
    pub params: Vec<VariableDecl>,
    /// None for a forward declaration (`procedure f;`).
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug)]
pub struct VariableDecl {
    pub name: String,
    pub name_span: Span,
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Debug)]
pub struct DefineDecl {
    pub name: String,
    pub name_span: Span,
    /// Parameter names when the define is function-like, i.e. a `(`
    /// immediately follows the name.
    pub params: Option<Vec<String>>,
    /// Replacement text with continuations collapsed, for display.
    pub replacement: String,
    /// Raw span of the replacement text in the source.
    pub replacement_span: Span,
    pub span: Span,
}

#[derive(Debug)]
pub struct IncludeDirective {
    pub path: String,
    pub path_span: Span,
    pub span: Span,
}

#[derive(Debug)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug)]
pub enum Stmt {
    Assign {
        target: String,
        target_span: Span,
        value: Expr,
        span: Span,
    },
    /// Both `call f(...)` and a bare opcode statement `f(...);`.
    Call {
        name: String,
        name_span: Span,
        args: Vec<Expr>,
        span: Span,
    },
    VarDecl(VariableDecl),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Box<Stmt>,
        span: Span,
    },
    Foreach {
        var: String,
        var_span: Span,
        iter: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Block(Block),
    Empty {
        span: Span,
    },
}

#[derive(Debug)]
pub struct SwitchCase {
    /// None for the `default` arm.
    pub value: Option<Expr>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Expr {
    Ident {
        name: String,
        span: Span,
    },
    Int {
        value: i64,
        span: Span,
    },
    Float {
        value: f64,
        span: Span,
    },
    Str {
        value: String,
        span: Span,
    },
    Call {
        name: String,
        name_span: Span,
        args: Vec<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident { span, .. }
            | Expr::Int { span, .. }
            | Expr::Float { span, .. }
            | Expr::Str { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. } => *span,
        }
    }
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign { span, .. }
            | Stmt::Call { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Foreach { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Empty { span } => *span,
            Stmt::VarDecl(decl) => decl.span,
            Stmt::Block(block) => block.span,
        }
    }
}

/// Source-shaped rendering, used for hover and completion details.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident { name, .. } => f.write_str(name),
            Expr::Int { value, .. } => write!(f, "{value}"),
            Expr::Float { value, .. } => write!(f, "{value}"),
            Expr::Str { value, .. } => write!(f, "\"{value}\""),
            Expr::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Unary { op, operand, .. } => match op {
                UnaryOp::Neg => write!(f, "-{}", Grouped(operand)),
                UnaryOp::Not => write!(f, "not {}", Grouped(operand)),
            },
            Expr::Binary { op, lhs, rhs, .. } => {
                write!(f, "{} {op} {}", Grouped(lhs), Grouped(rhs))
            }
        }
    }
}

/// Parenthesizes nested binary operands so the rendering keeps the parse.
struct Grouped<'a>(&'a Expr);

impl fmt::Display for Grouped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if matches!(self.0, Expr::Binary { .. }) {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lexer::{self, Span};
    use crate::analysis::parser;

    fn parse_expr(src: &str) -> Expr {
        let full = format!("variable probe := {src};\n");
        let mut diags = Vec::new();
        let tokens = lexer::tokenize(&full, &mut diags);
        let unit = parser::parse(&full, &tokens, &mut diags);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        let Some(Item::Variable(decl)) = unit.items.into_iter().next() else {
            panic!("expected variable item");
        };
        decl.initializer.expect("initializer")
    }

    #[test]
    fn display_round_trips_simple_expressions() {
        assert_eq!(parse_expr("random(1, x + 2)").to_string(), "random(1, x + 2)");
        assert_eq!(parse_expr("-hp").to_string(), "-hp");
        assert_eq!(parse_expr("\"msg\"").to_string(), "\"msg\"");
    }

    #[test]
    fn display_keeps_grouping_of_nested_operations() {
        assert_eq!(parse_expr("(1 + 2) * 3").to_string(), "(1 + 2) * 3");
        assert_eq!(parse_expr("not (a and b)").to_string(), "not (a and b)");
    }

    #[test]
    fn statement_spans_cover_their_tokens() {
        let src = "procedure start begin\n    if x then y := 1;\nend\n";
        let mut diags = Vec::new();
        let tokens = lexer::tokenize(src, &mut diags);
        let unit = parser::parse(src, &tokens, &mut diags);
        let Some(Item::Procedure(proc)) = unit.items.into_iter().next() else {
            panic!("expected procedure");
        };
        let body = proc.body.expect("body");
        let stmt = &body.stmts[0];
        assert_eq!(stmt.span(), Span::new(26, 43));
        assert_eq!(&src[26..43], "if x then y := 1;");
    }
}
