use crate::analysis::ast::*;
use crate::analysis::lexer::{Span, Token, TokenKind};
use crate::analysis::preprocessor::{self, Directive};
use crate::analysis::{Diag, Severity};

/// Parses a token stream into a translation unit, emitting diagnostics
/// instead of failing. On a syntax error the parser skips to the next
/// synchronization point (`;`, `end`, `procedure`, or a directive) so that
/// later declarations still produce symbols.
pub fn parse(src: &str, tokens: &[Token], diags: &mut Vec<Diag>) -> TranslationUnit {
    Parser {
        src,
        tokens,
        pos: 0,
        diags,
    }
    .translation_unit()
}

type ParseResult<T> = Result<T, ()>;

struct Parser<'a> {
    src: &'a str,
    tokens: &'a [Token],
    pos: usize,
    diags: &'a mut Vec<Diag>,
}

impl Parser<'_> {
    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn text(&self, span: Span) -> &str {
        &self.src[span.start..span.end]
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn error_at(&mut self, span: Span, message: impl Into<String>) {
        self.diags.push(Diag {
            span,
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            let tok = self.peek();
            self.error_at(tok.span, format!("expected {what}"));
            Err(())
        }
    }

    /// Top-level recovery: consume up to and including `;` or `end`, stop
    /// before `procedure` or a directive.
    fn sync_top(&mut self) {
        loop {
            match self.kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon | TokenKind::End => {
                    self.bump();
                    return;
                }
                TokenKind::Procedure | TokenKind::Directive => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Statement-level recovery: like `sync_top` but leaves `end` for the
    /// enclosing block to consume.
    fn sync_stmt(&mut self) {
        loop {
            match self.kind() {
                TokenKind::Eof | TokenKind::End | TokenKind::Procedure | TokenKind::Directive => {
                    return;
                }
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn translation_unit(mut self) -> TranslationUnit {
        let mut items = Vec::new();
        while !self.at(TokenKind::Eof) {
            match self.kind() {
                TokenKind::Directive => {
                    let tok = self.bump();
                    match preprocessor::parse_directive(self.src, tok.span, self.diags) {
                        Directive::Define(d) => items.push(Item::Define(d)),
                        Directive::Include(i) => items.push(Item::Include(i)),
                        Directive::Other => {}
                    }
                }
                TokenKind::Procedure => match self.procedure_decl() {
                    Ok(p) => items.push(Item::Procedure(p)),
                    Err(()) => self.sync_top(),
                },
                TokenKind::Variable => match self.variable_decl_terminated() {
                    Ok(v) => items.push(Item::Variable(v)),
                    Err(()) => self.sync_top(),
                },
                _ => {
                    let span = self.peek().span;
                    self.error_at(
                        span,
                        "expected `procedure`, `variable`, or a preprocessor directive",
                    );
                    self.sync_top();
                }
            }
        }
        TranslationUnit { items }
    }

    fn procedure_decl(&mut self) -> ParseResult<ProcedureDecl> {
        let kw = self.expect(TokenKind::Procedure, "`procedure`")?;
        let name_tok = self.expect(TokenKind::Ident, "procedure name")?;
        let name = self.text(name_tok.span).to_string();

        let mut params = Vec::new();
        if self.eat(TokenKind::LParen) {
            if !self.at(TokenKind::RParen) {
                loop {
                    params.push(self.variable_decl()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "`)` after parameter list")?;
        }

        if self.eat(TokenKind::Semicolon) {
            // Forward declaration.
            return Ok(ProcedureDecl {
                name,
                name_span: name_tok.span,
                params,
                body: None,
                span: Span::new(kw.span.start, self.prev_end()),
            });
        }

        let body = self.block()?;
        let span = kw.span.to(body.span);
        Ok(ProcedureDecl {
            name,
            name_span: name_tok.span,
            params,
            body: Some(body),
            span,
        })
    }

    /// `variable NAME [:= expr]`, no terminator.
    fn variable_decl(&mut self) -> ParseResult<VariableDecl> {
        let kw = self.expect(TokenKind::Variable, "`variable`")?;
        let name_tok = self.expect(TokenKind::Ident, "variable name")?;
        let initializer = if self.eat(TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(VariableDecl {
            name: self.text(name_tok.span).to_string(),
            name_span: name_tok.span,
            initializer,
            span: Span::new(kw.span.start, self.prev_end()),
        })
    }

    fn variable_decl_terminated(&mut self) -> ParseResult<VariableDecl> {
        let mut decl = self.variable_decl()?;
        self.expect(TokenKind::Semicolon, "`;` after variable declaration")?;
        decl.span.end = self.prev_end();
        Ok(decl)
    }

    fn block(&mut self) -> ParseResult<Block> {
        let begin = self.expect(TokenKind::Begin, "`begin`")?;
        let mut stmts = Vec::new();
        // A `procedure` keyword inside a block means the `end` went
        // missing; bail so the next declaration still parses.
        while !matches!(
            self.kind(),
            TokenKind::End | TokenKind::Procedure | TokenKind::Eof
        ) {
            match self.statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(()) => self.sync_stmt(),
            }
        }
        self.expect(TokenKind::End, "`end` to close block")?;
        Ok(Block {
            stmts,
            span: Span::new(begin.span.start, self.prev_end()),
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.kind() {
            TokenKind::Variable => {
                let decl = self.variable_decl_terminated()?;
                Ok(Stmt::VarDecl(decl))
            }
            TokenKind::Call => {
                let kw = self.bump();
                let name_tok = self.expect(TokenKind::Ident, "procedure name after `call`")?;
                let args = if self.at(TokenKind::LParen) {
                    self.argument_list()?
                } else {
                    Vec::new()
                };
                self.expect(TokenKind::Semicolon, "`;` after call")?;
                Ok(Stmt::Call {
                    name: self.text(name_tok.span).to_string(),
                    name_span: name_tok.span,
                    args,
                    span: Span::new(kw.span.start, self.prev_end()),
                })
            }
            TokenKind::Ident => {
                let mut stmt = self.simple_stmt()?;
                self.expect(TokenKind::Semicolon, "`;` after statement")?;
                // The terminator belongs to the statement's span.
                if let Stmt::Assign { span, .. } | Stmt::Call { span, .. } = &mut stmt {
                    span.end = self.prev_end();
                }
                Ok(stmt)
            }
            TokenKind::If => {
                let kw = self.bump();
                let cond = self.expression()?;
                self.expect(TokenKind::Then, "`then` after condition")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.eat(TokenKind::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                let end = else_branch
                    .as_deref()
                    .unwrap_or(&then_branch)
                    .span()
                    .end;
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                    span: Span::new(kw.span.start, end),
                })
            }
            TokenKind::While => {
                let kw = self.bump();
                let cond = self.expression()?;
                self.eat(TokenKind::Do);
                let body = Box::new(self.statement()?);
                let span = Span::new(kw.span.start, body.span().end);
                Ok(Stmt::While { cond, body, span })
            }
            TokenKind::For => {
                let kw = self.bump();
                self.expect(TokenKind::LParen, "`(` after `for`")?;
                let init = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.simple_stmt_or_decl()?))
                };
                self.expect(TokenKind::Semicolon, "`;` after loop initializer")?;
                let cond = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(TokenKind::Semicolon, "`;` after loop condition")?;
                let step = if self.at(TokenKind::RParen) {
                    None
                } else {
                    Some(Box::new(self.simple_stmt_or_decl()?))
                };
                self.expect(TokenKind::RParen, "`)` after loop step")?;
                let body = Box::new(self.statement()?);
                let span = Span::new(kw.span.start, body.span().end);
                Ok(Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                    span,
                })
            }
            TokenKind::Foreach => {
                let kw = self.bump();
                let parens = self.eat(TokenKind::LParen);
                let var_tok = self.expect(TokenKind::Ident, "loop variable after `foreach`")?;
                self.expect(TokenKind::In, "`in` after loop variable")?;
                let iter = self.expression()?;
                if parens {
                    self.expect(TokenKind::RParen, "`)` after `foreach` header")?;
                }
                self.eat(TokenKind::Do);
                let body = Box::new(self.statement()?);
                let span = Span::new(kw.span.start, body.span().end);
                Ok(Stmt::Foreach {
                    var: self.text(var_tok.span).to_string(),
                    var_span: var_tok.span,
                    iter,
                    body,
                    span,
                })
            }
            TokenKind::Switch => self.switch_stmt(),
            TokenKind::Return => {
                let kw = self.bump();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(TokenKind::Semicolon, "`;` after return")?;
                Ok(Stmt::Return {
                    value,
                    span: Span::new(kw.span.start, self.prev_end()),
                })
            }
            TokenKind::Begin => Ok(Stmt::Block(self.block()?)),
            TokenKind::Semicolon => {
                let tok = self.bump();
                Ok(Stmt::Empty { span: tok.span })
            }
            // A directive in statement position is tolerated but carries no
            // declarations; the preprocessor model is top-level only.
            TokenKind::Directive => {
                let tok = self.bump();
                Ok(Stmt::Empty { span: tok.span })
            }
            _ => {
                let span = self.peek().span;
                self.error_at(span, "expected statement");
                Err(())
            }
        }
    }

    /// An assignment or a bare opcode call, without the trailing `;`.
    /// Also used for `for` initializer and step clauses.
    fn simple_stmt(&mut self) -> ParseResult<Stmt> {
        let name_tok = self.expect(TokenKind::Ident, "statement")?;
        match self.kind() {
            TokenKind::Assign => {
                self.bump();
                let value = self.expression()?;
                Ok(Stmt::Assign {
                    target: self.text(name_tok.span).to_string(),
                    target_span: name_tok.span,
                    value,
                    span: Span::new(name_tok.span.start, self.prev_end()),
                })
            }
            TokenKind::LParen => {
                let args = self.argument_list()?;
                Ok(Stmt::Call {
                    name: self.text(name_tok.span).to_string(),
                    name_span: name_tok.span,
                    args,
                    span: Span::new(name_tok.span.start, self.prev_end()),
                })
            }
            _ => {
                let span = self.peek().span;
                self.error_at(span, "expected `:=` or `(` after identifier");
                Err(())
            }
        }
    }

    fn simple_stmt_or_decl(&mut self) -> ParseResult<Stmt> {
        if self.at(TokenKind::Variable) {
            Ok(Stmt::VarDecl(self.variable_decl()?))
        } else {
            self.simple_stmt()
        }
    }

    fn switch_stmt(&mut self) -> ParseResult<Stmt> {
        let kw = self.expect(TokenKind::Switch, "`switch`")?;
        let scrutinee = self.expression()?;
        self.expect(TokenKind::Begin, "`begin` after switch expression")?;

        let mut cases = Vec::new();
        while self.at(TokenKind::Case) || self.at(TokenKind::Default) {
            let value = if self.eat(TokenKind::Case) {
                Some(self.expression()?)
            } else {
                self.bump();
                None
            };
            self.expect(TokenKind::Colon, "`:` after case label")?;

            let mut stmts = Vec::new();
            while !matches!(
                self.kind(),
                TokenKind::Case
                    | TokenKind::Default
                    | TokenKind::End
                    | TokenKind::Procedure
                    | TokenKind::Eof
            ) {
                match self.statement() {
                    Ok(stmt) => stmts.push(stmt),
                    Err(()) => self.sync_stmt(),
                }
            }
            cases.push(SwitchCase { value, stmts });
        }

        self.expect(TokenKind::End, "`end` to close switch")?;
        Ok(Stmt::Switch {
            scrutinee,
            cases,
            span: Span::new(kw.span.start, self.prev_end()),
        })
    }

    fn argument_list(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)` after arguments")?;
        Ok(args)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat(TokenKind::Or) {
            let rhs = self.and_expr()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.not_expr()?;
        while self.eat(TokenKind::And) {
            let rhs = self.not_expr()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> ParseResult<Expr> {
        if self.at(TokenKind::Not) {
            let kw = self.bump();
            let operand = self.not_expr()?;
            let span = Span::new(kw.span.start, operand.span().end);
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                span,
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::BangEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::Le,
                TokenKind::GtEq => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.at(TokenKind::Minus) {
            let tok = self.bump();
            let operand = self.unary()?;
            let span = Span::new(tok.span.start, operand.span().end);
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
                span,
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        match self.kind() {
            TokenKind::Int => {
                let tok = self.bump();
                let text = self.text(tok.span);
                let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    i64::from_str_radix(hex, 16).unwrap_or(0)
                } else {
                    text.parse().unwrap_or(0)
                };
                Ok(Expr::Int {
                    value,
                    span: tok.span,
                })
            }
            TokenKind::Float => {
                let tok = self.bump();
                Ok(Expr::Float {
                    value: self.text(tok.span).parse().unwrap_or(0.0),
                    span: tok.span,
                })
            }
            TokenKind::Str => {
                let tok = self.bump();
                let text = self.text(tok.span);
                let value = text
                    .strip_prefix('"')
                    .map(|t| t.strip_suffix('"').unwrap_or(t))
                    .unwrap_or(text)
                    .to_string();
                Ok(Expr::Str {
                    value,
                    span: tok.span,
                })
            }
            TokenKind::Ident => {
                let tok = self.bump();
                let name = self.text(tok.span).to_string();
                if self.at(TokenKind::LParen) {
                    let args = self.argument_list()?;
                    Ok(Expr::Call {
                        name,
                        name_span: tok.span,
                        args,
                        span: Span::new(tok.span.start, self.prev_end()),
                    })
                } else {
                    Ok(Expr::Ident {
                        name,
                        span: tok.span,
                    })
                }
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            _ => {
                let span = self.peek().span;
                self.error_at(span, "expected expression");
                Err(())
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span().to(rhs.span());
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span,
    }
}
