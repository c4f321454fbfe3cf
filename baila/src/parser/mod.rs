//! Recursive-descent parser
//!
//! Precedence, lowest first: assignment, `|`, `^`, `&`, equality,
//! relational, additive, multiplicative, `**`, unary, postfix/primary.

mod template;


use crate::ast::*;
use crate::error::{CompileError, Result, SyntaxErrorKind};
use crate::lexer::{Token, TokenKind};
use std::rc::Rc;

/// Parse tokens into a program
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    let program = Parser::new(tokens).program()?;
    tracing::debug!(statements = program.statements.len(), "parsed program");
    Ok(program)
}

/// Parse tokens holding exactly one expression (interpolation segments)
pub fn parse_expression(tokens: Vec<Token>) -> Result<Expr> {
    let mut parser = Parser::new(tokens);
    let expr = parser.expression()?;
    parser.expect(TokenKind::Eof)?;
    Ok(expr)
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    rollbacks: Vec<usize>,
}

/// `=` or a supported compound assignment; the inner op is what the
/// compound form desugars to.
fn assignment_op(kind: TokenKind) -> Option<Option<BinOp>> {
    let op = match kind {
        TokenKind::Eq => None,
        TokenKind::PlusEq => Some(BinOp::Add),
        TokenKind::MinusEq => Some(BinOp::Sub),
        TokenKind::StarEq => Some(BinOp::Mul),
        TokenKind::StarStarEq => Some(BinOp::Pow),
        TokenKind::SlashEq => Some(BinOp::Div),
        TokenKind::SlashSlashEq => Some(BinOp::IntDiv),
        TokenKind::PercentEq => Some(BinOp::Rem),
        TokenKind::AmpEq => Some(BinOp::BitAnd),
        TokenKind::BarEq => Some(BinOp::BitOr),
        TokenKind::CaretEq => Some(BinOp::BitXor),
        _ => return None,
    };
    Some(op)
}

fn desugar_assignment(op: Option<BinOp>, current: Expr, value: Expr) -> Expr {
    match op {
        Some(op) => Expr::binary(op, current, value),
        None => value,
    }
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let eof = tokens.last().map(|last| Token {
                kind: TokenKind::Eof,
                value: String::new(),
                pos: last.pos.clone(),
                span: Span::new(last.span.end, last.span.end),
            });
            tokens.extend(eof);
        }
        Parser {
            tokens,
            current: 0,
            rollbacks: Vec::new(),
        }
    }

    // ---- cursor ----

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.current + ahead).min(last)]
    }

    fn previous(&self) -> Option<&Token> {
        self.current.checked_sub(1).map(|i| &self.tokens[i])
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_soft(&self, word: &str) -> bool {
        self.peek().is_soft_keyword(word)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(CompileError::unexpected(self.peek()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        Ok(self.expect(TokenKind::Identifier)?.value)
    }

    fn expect_soft(&mut self, word: &str) -> Result<()> {
        if self.check_soft(word) {
            self.advance();
            Ok(())
        } else {
            Err(CompileError::unexpected(self.peek()))
        }
    }

    fn unexpected<T>(&self) -> Result<T> {
        Err(CompileError::unexpected(self.peek()))
    }

    // ---- speculation ----

    /// Remember the current position so a speculative parse can be undone.
    pub fn save_rollback(&mut self) {
        self.rollbacks.push(self.current);
    }

    /// Return to the most recently saved position.
    pub fn rollback(&mut self) {
        if let Some(position) = self.rollbacks.pop() {
            self.current = position;
        }
    }

    /// Keep what was parsed since the most recent save.
    pub fn commit(&mut self) {
        self.rollbacks.pop();
    }

    // ---- statements ----

    fn program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();
        loop {
            while self.matches(TokenKind::Semicolon) {}
            if self.check(TokenKind::Eof) {
                break;
            }
            statements.push(self.statement()?);
            self.statement_end()?;
        }
        Ok(Program { statements })
    }

    /// A statement must be followed by `;`, `}` or the end of input, unless
    /// it already ended with a closing brace.
    fn statement_end(&mut self) -> Result<()> {
        if self.matches(TokenKind::Semicolon)
            || self.check(TokenKind::RBrace)
            || self.check(TokenKind::Eof)
            || self.previous().is_some_and(|t| t.kind == TokenKind::RBrace)
        {
            Ok(())
        } else {
            self.unexpected()
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        match self.peek().kind {
            TokenKind::If => self.if_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::Var => self.var_declaration(),
            TokenKind::Const => self.const_declaration(),
            TokenKind::Function => Ok(Stmt::Function(Rc::new(self.function_declaration()?))),
            TokenKind::Return => self.return_statement(),
            TokenKind::Class => self.class_declaration(),
            TokenKind::LBrace => self.block(),
            _ => Ok(Stmt::Expr(self.expression()?)),
        }
    }

    fn block(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::LBrace)?;
        let mut statements = Vec::new();
        loop {
            while self.matches(TokenKind::Semicolon) {}
            if self.check(TokenKind::RBrace) {
                break;
            }
            statements.push(self.statement()?);
            self.statement_end()?;
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::Block(statements))
    }

    fn statement_or_block(&mut self) -> Result<Stmt> {
        if self.check(TokenKind::LBrace) {
            self.block()
        } else {
            self.statement()
        }
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::If)?;
        let cond = self.expression()?;
        let then_branch = Box::new(self.statement_or_block()?);
        let else_branch = if self.matches(TokenKind::Else) {
            Some(Box::new(self.statement_or_block()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    /// `for [(] name = start to end [step expr] [)] body`
    fn for_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::For)?;

        // The header may be wrapped in parentheses; only commit to that
        // reading when the paren is followed by `name =`.
        self.save_rollback();
        let parenthesized = self.matches(TokenKind::LParen)
            && self.check(TokenKind::Identifier)
            && self.peek_at(1).kind == TokenKind::Eq;
        if parenthesized {
            self.commit();
        } else {
            self.rollback();
        }

        let var = self.expect_identifier()?;
        self.expect(TokenKind::Eq)?;
        let start = self.expression()?;
        self.expect_soft("to")?;
        let end = self.expression()?;
        let step = if self.check_soft("step") {
            self.advance();
            Some(self.expression()?)
        } else {
            None
        };
        if parenthesized {
            self.expect(TokenKind::RParen)?;
        }
        let body = Box::new(self.statement_or_block()?);
        Ok(Stmt::For {
            var,
            start,
            end,
            step,
            body,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::While)?;
        let cond = self.expression()?;
        let body = Box::new(self.statement_or_block()?);
        Ok(Stmt::While { cond, body })
    }

    fn do_while_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Do)?;
        let body = Box::new(self.statement_or_block()?);
        self.expect(TokenKind::While)?;
        let cond = self.expression()?;
        Ok(Stmt::DoWhile { body, cond })
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Var)?;
        let name = self.expect_identifier()?;
        let ty = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let value = if self.matches(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Stmt::Var { name, ty, value })
    }

    fn const_declaration(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Const)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Eq)?;
        let value = self.expression()?;
        Ok(Stmt::Const { name, value })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Return)?;
        if self.check(TokenKind::RBrace)
            || self.check(TokenKind::Semicolon)
            || self.check(TokenKind::Eof)
        {
            return Ok(Stmt::Return(None));
        }
        Ok(Stmt::Return(Some(self.expression()?)))
    }

    /// `?<Generic, ...>Name`
    fn parse_type(&mut self) -> Result<BailaType> {
        let nullable = self.matches(TokenKind::Question);
        let mut generics = Vec::new();
        if self.check(TokenKind::Shl) {
            // `<<A>B>C` lexes as `<<`; take one `<` and leave the other.
            self.tokens[self.current].kind = TokenKind::Lt;
            self.tokens[self.current].value = "<".to_string();
            generics = self.generic_arguments()?;
        } else if self.matches(TokenKind::Lt) {
            generics = self.generic_arguments()?;
        }
        let name = self.expect_identifier()?;
        let ty = BailaType::named(name).with_generics(generics);
        Ok(if nullable { ty.into_nullable() } else { ty })
    }

    fn generic_arguments(&mut self) -> Result<Vec<BailaType>> {
        let mut generics = vec![self.parse_type()?];
        while self.matches(TokenKind::Comma) {
            generics.push(self.parse_type()?);
        }
        self.expect(TokenKind::Gt)?;
        Ok(generics)
    }

    fn function_declaration(&mut self) -> Result<FunctionDecl> {
        self.expect(TokenKind::Function)?;
        let name = self.expect_identifier()?;
        let params = if self.matches(TokenKind::LParen) {
            self.parameters()?
        } else {
            Vec::new()
        };
        let return_type = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.function_body()?;
        let return_type = return_type.or_else(|| infer_return_type(&body));
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
        })
    }

    /// Parameters after the opening paren, through the closing one.
    fn parameters(&mut self) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        if self.matches(TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let name = self.expect_identifier()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let default = if self.matches(TokenKind::Eq) {
                Some(Rc::new(self.expression()?))
            } else {
                None
            };
            params.push(Param { name, ty, default });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    /// `= expr`, `=> statement` or `{ block }`
    fn function_body(&mut self) -> Result<Rc<Stmt>> {
        if self.matches(TokenKind::Eq) {
            Ok(Rc::new(Stmt::Return(Some(self.expression()?))))
        } else if self.matches(TokenKind::FatArrow) {
            Ok(Rc::new(self.statement_or_block()?))
        } else if self.check(TokenKind::LBrace) {
            Ok(Rc::new(self.block()?))
        } else {
            self.unexpected()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Class)?;
        let name = self.expect_identifier()?;
        let mut bases = Vec::new();
        if self.matches(TokenKind::Colon) {
            bases.push(self.parse_type()?);
            while self.matches(TokenKind::Comma) {
                bases.push(self.parse_type()?);
            }
        }
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        loop {
            while self.matches(TokenKind::Semicolon) {}
            if self.check(TokenKind::RBrace) {
                break;
            }
            members.push(self.class_member()?);
            self.member_end()?;
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::Class(Rc::new(ClassDecl {
            name,
            bases,
            members,
        })))
    }

    fn member_end(&mut self) -> Result<()> {
        if self.matches(TokenKind::Semicolon)
            || self.check(TokenKind::RBrace)
            || self.previous().is_some_and(|t| t.kind == TokenKind::RBrace)
        {
            return Ok(());
        }
        let token = self.peek();
        Err(CompileError::syntax(
            SyntaxErrorKind::MalformedMemberTerminator,
            format!("Expected ';' or '}}' after class member, found '{token}'"),
            token,
        ))
    }

    fn class_member(&mut self) -> Result<MemberDecl> {
        let mut access: Option<Accessibility> = None;
        let mut is_static = false;
        loop {
            let token = self.peek().clone();
            let modifier = match token.kind {
                TokenKind::Public => Accessibility::Public,
                TokenKind::Private => Accessibility::Private,
                TokenKind::Protected => Accessibility::Protected,
                TokenKind::Static => {
                    if is_static {
                        return Err(CompileError::syntax(
                            SyntaxErrorKind::DuplicateStatic,
                            "Duplicate 'static' modifier",
                            &token,
                        ));
                    }
                    is_static = true;
                    self.advance();
                    continue;
                }
                _ => break,
            };
            if let Some(previous) = access {
                return Err(CompileError::syntax(
                    SyntaxErrorKind::DuplicateAccessibility,
                    format!("Accessibility is already '{previous}'"),
                    &token,
                ));
            }
            access = Some(modifier);
            self.advance();
        }

        let kind = match self.peek().kind {
            TokenKind::Var | TokenKind::Const => self.field_member()?,
            TokenKind::Prop => self.property_member()?,
            TokenKind::Function => MemberKind::Method(Rc::new(self.function_declaration()?)),
            TokenKind::Constructor => self.constructor_member()?,
            TokenKind::Operator => self.operator_member()?,
            _ => return self.unexpected(),
        };
        Ok(MemberDecl {
            access: access.unwrap_or_default(),
            is_static,
            kind,
        })
    }

    fn field_member(&mut self) -> Result<MemberKind> {
        let readonly = self.advance().kind == TokenKind::Const;
        let name = self.expect_identifier()?;
        let ty = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let value = if self.matches(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(MemberKind::Field {
            name,
            readonly,
            ty,
            value,
        })
    }

    /// `prop name[: Type] [= value] [{ get ...; set ... }] [= value]`
    fn property_member(&mut self) -> Result<MemberKind> {
        self.expect(TokenKind::Prop)?;
        let name = self.expect_identifier()?;
        let ty = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let mut value = if self.matches(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };

        let mut getter = None;
        let mut setter = None;
        if self.matches(TokenKind::LBrace) {
            loop {
                while self.matches(TokenKind::Semicolon) {}
                if self.matches(TokenKind::RBrace) {
                    break;
                }
                let token = self.peek().clone();
                let (slot, kind, label) = if token.is_soft_keyword("get") {
                    (&mut getter, SyntaxErrorKind::DuplicateGetter, "getter")
                } else if token.is_soft_keyword("set") {
                    (&mut setter, SyntaxErrorKind::DuplicateSetter, "setter")
                } else {
                    return self.unexpected();
                };
                if slot.is_some() {
                    return Err(CompileError::syntax(
                        kind,
                        format!("Property '{name}' already has a {label}"),
                        &token,
                    ));
                }
                self.advance();
                let body = self.function_body()?;
                *slot = Some(Rc::new(FunctionDecl {
                    name: format!("{} {name}", token.value),
                    params: Vec::new(),
                    return_type: None,
                    body,
                }));
            }
        }

        if self.matches(TokenKind::Eq) {
            value = Some(self.expression()?);
        }
        Ok(MemberKind::Property {
            name,
            ty,
            getter,
            setter,
            value,
        })
    }

    fn constructor_member(&mut self) -> Result<MemberKind> {
        self.expect(TokenKind::Constructor)?;
        let params = if self.matches(TokenKind::LParen) {
            self.parameters()?
        } else {
            Vec::new()
        };
        let body = self.function_body()?;
        Ok(MemberKind::Constructor(Rc::new(FunctionDecl {
            name: "constructor".to_string(),
            params,
            return_type: None,
            body,
        })))
    }

    /// `operator OP (params)[: Type] body`; one parameter declares a binary
    /// overload, none a unary one.
    fn operator_member(&mut self) -> Result<MemberKind> {
        self.expect(TokenKind::Operator)?;
        let symbol = self.advance();
        let (binary, unary) = match symbol.kind {
            TokenKind::Plus => (Some(BinOp::Add), Some(UnOp::Plus)),
            TokenKind::Minus => (Some(BinOp::Sub), Some(UnOp::Neg)),
            TokenKind::Star => (Some(BinOp::Mul), None),
            TokenKind::Slash => (Some(BinOp::Div), None),
            TokenKind::SlashSlash => (Some(BinOp::IntDiv), None),
            TokenKind::Percent => (Some(BinOp::Rem), None),
            TokenKind::StarStar => (Some(BinOp::Pow), None),
            TokenKind::Amp => (Some(BinOp::BitAnd), None),
            TokenKind::Bar => (Some(BinOp::BitOr), None),
            TokenKind::Caret => (Some(BinOp::BitXor), None),
            TokenKind::EqEq => (Some(BinOp::Eq), None),
            TokenKind::NotEq => (Some(BinOp::Ne), None),
            TokenKind::Bang => (None, Some(UnOp::Not)),
            TokenKind::Tilde => (None, Some(UnOp::BitNot)),
            _ => return Err(CompileError::unexpected(&symbol)),
        };
        self.expect(TokenKind::LParen)?;
        let params = self.parameters()?;
        let return_type = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.function_body()?;
        let decl = Rc::new(FunctionDecl {
            name: format!("operator {}", symbol.value),
            params,
            return_type,
            body,
        });
        match (decl.params.len(), binary, unary) {
            (1, Some(op), _) => Ok(MemberKind::Operator(OperatorDecl::Binary { op, decl })),
            (0, _, Some(op)) => Ok(MemberKind::Operator(OperatorDecl::Unary { op, decl })),
            _ => Err(CompileError::unexpected(&symbol)),
        }
    }

    // ---- expressions ----

    pub fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        if self.check(TokenKind::Identifier) {
            if let Some(op) = assignment_op(self.peek_at(1).kind) {
                let name = self.advance().value;
                self.advance();
                let value = self.assignment()?;
                let value = desugar_assignment(op, Expr::Var(name.clone()), value);
                return Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                });
            }
        }

        let target = self.bit_or()?;
        let Some(op) = assignment_op(self.peek().kind) else {
            return Ok(target);
        };
        match target {
            Expr::Member { object, name } => {
                self.advance();
                let value = self.assignment()?;
                let current = Expr::Member {
                    object: object.clone(),
                    name: name.clone(),
                };
                Ok(Expr::MemberSet {
                    object,
                    name,
                    value: Box::new(desugar_assignment(op, current, value)),
                })
            }
            Expr::Index { target, index } => {
                self.advance();
                let value = self.assignment()?;
                let current = Expr::Index {
                    target: target.clone(),
                    index: index.clone(),
                };
                Ok(Expr::IndexSet {
                    target,
                    index,
                    value: Box::new(desugar_assignment(op, current, value)),
                })
            }
            _ => self.unexpected(),
        }
    }

    fn binary_level(
        &mut self,
        ops: &[(TokenKind, BinOp)],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        while let Some(&(_, op)) = ops.iter().find(|(kind, _)| self.check(*kind)) {
            self.advance();
            let right = next(self)?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn bit_or(&mut self) -> Result<Expr> {
        self.binary_level(&[(TokenKind::Bar, BinOp::BitOr)], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Result<Expr> {
        self.binary_level(&[(TokenKind::Caret, BinOp::BitXor)], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Expr> {
        self.binary_level(&[(TokenKind::Amp, BinOp::BitAnd)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::NotEq, BinOp::Ne)],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::LtEq, BinOp::Le),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::GtEq, BinOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr> {
        self.binary_level(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::SlashSlash, BinOp::IntDiv),
                (TokenKind::Percent, BinOp::Rem),
            ],
            Self::power,
        )
    }

    fn power(&mut self) -> Result<Expr> {
        self.binary_level(&[(TokenKind::StarStar, BinOp::Pow)], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::Bang => UnOp::Not,
            TokenKind::Plus => UnOp::Plus,
            TokenKind::Minus => UnOp::Neg,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(TokenKind::LParen) {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.matches(TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.matches(TokenKind::Dot) {
                let name = self.expect_identifier()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Call arguments after the opening paren, through the closing one.
    fn arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.matches(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::LParen => {
                let expr = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                let mut elements = Vec::new();
                while !self.matches(TokenKind::RBracket) {
                    elements.push(self.expression()?);
                    if !self.matches(TokenKind::Comma) {
                        self.expect(TokenKind::RBracket)?;
                        break;
                    }
                }
                Ok(Expr::List(elements))
            }
            TokenKind::Number => number_literal(&token),
            TokenKind::String(_) => template::parse_template(&token),
            TokenKind::True => Ok(Expr::Literal(Literal::Boolean(true))),
            TokenKind::False => Ok(Expr::Literal(Literal::Boolean(false))),
            TokenKind::Null => Ok(Expr::Literal(Literal::Null)),
            TokenKind::Identifier => Ok(Expr::Var(token.value)),
            TokenKind::This => Ok(Expr::var("this")),
            _ => Err(CompileError::unexpected(&token)),
        }
    }
}

/// Number token text to a literal; a `c` suffix turns the code point into a
/// one-character string.
fn number_literal(token: &Token) -> Result<Expr> {
    let text = token.value.as_str();
    let malformed = || {
        CompileError::syntax(
            SyntaxErrorKind::UnexpectedToken,
            format!("Malformed number '{text}'"),
            token,
        )
    };
    if let Some(code) = text.strip_suffix('c') {
        let code: f64 = code.parse().map_err(|_| malformed())?;
        let ch = char::from_u32(code as u32).ok_or_else(malformed)?;
        return Ok(Expr::string(ch.to_string()));
    }
    let digits = text.strip_suffix('f').unwrap_or(text);
    let value: f64 = digits.parse().map_err(|_| malformed())?;
    Ok(Expr::number(value))
}

/// Return type of a function declared without one: the type of a literal
/// returned by a `= literal` body or by the first top-level `return` in a
/// block. `None` leaves the return value unchecked.
fn infer_return_type(body: &Stmt) -> Option<BailaType> {
    let returned = match body {
        Stmt::Return(Some(expr)) => expr,
        Stmt::Block(statements) => statements.iter().find_map(|stmt| match stmt {
            Stmt::Return(Some(expr)) => Some(expr),
            _ => None,
        })?,
        _ => return None,
    };
    match returned {
        Expr::Literal(Literal::Number(_)) => Some(BailaType::number()),
        Expr::Literal(Literal::String(_)) | Expr::Template(_) => Some(BailaType::string()),
        Expr::Literal(Literal::Boolean(_)) => Some(BailaType::boolean()),
        _ => None,
    }
}
