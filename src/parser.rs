/*!
Recursive-descent parser, pulled one declaration at a time.

Each call to [`Parser::next_declaration`] (or `Iterator::next`) consumes just
enough tokens from the scanner to build the next top-level declaration.
Tokens are requested lazily, so a lexical error surfaces exactly when the
parser needs the offending token and is attributed to the declaration that
contains it.

### Logging Policy

| Location                      | Level   | Purpose                                     |
|-------------------------------|---------|---------------------------------------------|
| `Parser::new`                 | `info`  | Lifecycle milestones.                       |
| `declaration`, `statement`    | `debug` | High-level descent into grammar branches.   |
| Error paths (`synchronize`)   | `debug` | Context before returning structured error.  |

--------------------------------------------------------------------------------
Grammar (EBNF, precedence lowest to highest)
--------------------------------------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" method* "}" ;
method         → IDENT ( "(" parameters? ")" )? block ;
funDecl        → "fun" IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | block | ifStmt | whileStmt
               | forStmt | breakStmt | returnStmt ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement ;
expression     → comma ;
comma          → assignment ( "," assignment )* ;
assignment     → ( call "." IDENT | IDENT ) "=" assignment | ternary ;
ternary        → logic_or ( "?" logic_or ":" logic_or )? ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" comma? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | "super" "." IDENT | IDENT | "(" expression ")"
               | "fun" "(" parameters? ")" block ;
```

`for` is desugared here into `Block { init, While { cond, Block { body, incr } } }`.
*/

use std::rc::Rc;

use crate::ast::{ClassDecl, Expr, FunctionDecl, FunctionKind, NodeId, Stmt};
use crate::error::{ParseError, Result};
use crate::scanner::Scanner;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};

use log::{debug, info};

const MAX_ARGS: usize = 255;

/// Grammar context active while parsing a construct's body.
#[derive(Debug, Clone)]
enum Context {
    Loop,
    Function(FunctionKind),
    Class { name: Token, has_superclass: bool },
}

/// Pull-based parser over a lazily scanned token stream.
pub struct Parser<'a> {
    tokens: Scanner<'a>,
    current: Option<Token>,
    next: Option<Token>,
    eof: Option<Token>,
    contexts: Vec<Context>,
    /// `{` consumed without their matching `}`.
    open_braces: usize,
    next_id: u32,
}

impl<'a> Parser<'a> {
    /// Construct a new parser whose node ids start at zero.
    pub fn new(tokens: Scanner<'a>) -> Self {
        Self::starting_at(tokens, NodeId(0))
    }

    /// Construct a parser whose node ids continue from `first`, so several
    /// sources can share one address table.
    pub fn starting_at(tokens: Scanner<'a>, first: NodeId) -> Self {
        info!("Parser created, first node id {}", first.0);

        Self {
            tokens,
            current: None,
            next: None,
            eof: None,
            contexts: Vec::new(),
            open_braces: 0,
            next_id: first.0,
        }
    }

    /// The id the next allocated node will receive.
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_id)
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse the next top-level declaration. `Ok(None)` once the input is
    /// exhausted. After an error the parser has already skipped to the next
    /// statement boundary, so calling again attempts the following declaration.
    pub fn next_declaration(&mut self) -> Result<Option<Stmt>> {
        let result = match self.peek_kind() {
            Ok(TokenType::EOF) => return Ok(None),
            Ok(_) => self.declaration(),
            Err(e) => Err(e),
        };

        match result {
            Ok(stmt) => Ok(Some(stmt)),
            Err(e) => {
                debug!("Parse error, resynchronising: {}", e);
                self.contexts.clear();
                self.synchronize();
                Err(e)
            }
        }
    }

    /// Parse the whole remaining input, stopping at the first error.
    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();

        while let Some(stmt) = self.next_declaration()? {
            statements.push(stmt);
        }

        info!("Parsed {} declaration(s)", statements.len());

        Ok(statements)
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.parse_declaration())
    }

    fn parse_declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration");

        match self.peek_kind()? {
            TokenType::CLASS => self.class_declaration(),
            TokenType::FUN if self.peek_next_kind()? != TokenType::LEFT_PAREN => {
                self.advance()?;
                let name = self.consume(TokenType::IDENTIFIER, "function name", "'fun'")?;
                let decl = self.function(name, FunctionKind::Function)?;

                Ok(Stmt::Function(Rc::new(decl)))
            }
            TokenType::VAR => self.var_declaration(),
            _ => self.statement(),
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        self.advance()?;
        let id = self.node_id();
        let name = self.consume(TokenType::IDENTIFIER, "class name", "'class'")?;

        let superclass = if self.matches(TokenType::LESS)? {
            let parent = self.consume(TokenType::IDENTIFIER, "superclass name", "'<'")?;

            if parent.lexeme == name.lexeme {
                return Err(ParseError::SelfInheritance { name: parent }.into());
            }

            Some(Expr::Variable {
                id: self.node_id(),
                name: parent,
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "'{'", "class name")?;

        self.contexts.push(Context::Class {
            name: name.clone(),
            has_superclass: superclass.is_some(),
        });

        let mut methods = Vec::new();
        while !self.check(TokenType::RIGHT_BRACE)? && !self.is_at_end()? {
            let method_name = self.consume(TokenType::IDENTIFIER, "method name", "class body")?;

            let kind = if &*method_name.lexeme == "init" {
                FunctionKind::Initializer
            } else if self.check(TokenType::LEFT_PAREN)? {
                FunctionKind::Method
            } else {
                FunctionKind::Property
            };

            methods.push(Rc::new(self.function(method_name, kind)?));
        }

        self.consume(TokenType::RIGHT_BRACE, "'}'", "class body")?;
        self.contexts.pop();

        debug!("Parsed class '{}' with {} method(s)", name.lexeme, methods.len());

        Ok(Stmt::Class(Rc::new(ClassDecl {
            id,
            name,
            superclass,
            methods,
        })))
    }

    /// Parameter list (absent for properties) and body of any function-like
    /// declaration. `name` has already been consumed.
    fn function(&mut self, name: Token, kind: FunctionKind) -> Result<FunctionDecl> {
        let id = self.node_id();
        let mut params: Vec<Token> = Vec::new();

        if kind != FunctionKind::Property {
            self.consume(TokenType::LEFT_PAREN, "'('", "function name")?;

            if !self.check(TokenType::RIGHT_PAREN)? {
                loop {
                    if params.len() >= MAX_ARGS {
                        let at = self.peek()?.clone();
                        return Err(ParseError::TooManyParameters { at }.into());
                    }

                    params.push(self.consume(TokenType::IDENTIFIER, "parameter name", "'('")?);

                    if !self.matches(TokenType::COMMA)? {
                        break;
                    }
                }
            }

            self.consume(TokenType::RIGHT_PAREN, "')'", "parameters")?;
        }

        self.consume(TokenType::LEFT_BRACE, "'{'", "function signature")?;

        self.contexts.push(Context::Function(kind));
        let body = self.block()?;
        self.contexts.pop();

        Ok(FunctionDecl {
            id,
            name,
            params,
            body,
            kind,
        })
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        self.advance()?;
        let id = self.node_id();
        let name = self.consume(TokenType::IDENTIFIER, "variable name", "'var'")?;

        let initializer = if self.matches(TokenType::EQUAL)? {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "';'", "variable declaration")?;

        Ok(Stmt::Var {
            id,
            name,
            initializer,
        })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.parse_statement())
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement");

        match self.peek_kind()? {
            TokenType::FOR => self.for_statement(),
            TokenType::IF => self.if_statement(),
            TokenType::WHILE => self.while_statement(),
            TokenType::BREAK => self.break_statement(),
            TokenType::RETURN => self.return_statement(),
            TokenType::PRINT => self.print_statement(),
            TokenType::LEFT_BRACE => {
                self.advance()?;
                Ok(Stmt::Block(self.block()?))
            }
            _ => self.expression_statement(),
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let keyword = self.advance()?;
        self.consume(TokenType::LEFT_PAREN, "'('", "'for'")?;

        let initializer = if self.matches(TokenType::SEMICOLON)? {
            None
        } else if self.check(TokenType::VAR)? {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::SEMICOLON)? {
            self.expression()?
        } else {
            Expr::Literal(Token::synthetic(TokenType::TRUE, "true", &keyword))
        };
        self.consume(TokenType::SEMICOLON, "';'", "loop condition")?;

        let increment = if !self.check(TokenType::RIGHT_PAREN)? {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "')'", "for clauses")?;

        let mut body = self.loop_body()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let while_loop = Stmt::While {
            condition,
            body: Box::new(body),
        };

        Ok(match initializer {
            Some(initializer) => Stmt::Block(vec![initializer, while_loop]),
            None => while_loop,
        })
    }

    fn loop_body(&mut self) -> Result<Stmt> {
        self.contexts.push(Context::Loop);
        let body = self.statement()?;
        self.contexts.pop();

        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.advance()?;
        self.consume(TokenType::LEFT_PAREN, "'('", "'if'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "')'", "if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(TokenType::ELSE)? {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.advance()?;
        self.consume(TokenType::LEFT_PAREN, "'('", "'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "')'", "while condition")?;
        let body = Box::new(self.loop_body()?);

        Ok(Stmt::While { condition, body })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword = self.advance()?;

        // A function or class body hides any loop around it.
        let in_loop = matches!(self.contexts.last(), Some(Context::Loop));

        if !in_loop {
            return Err(ParseError::BreakOutsideLoop { keyword }.into());
        }

        self.consume(TokenType::SEMICOLON, "';'", "'break'")?;

        Ok(Stmt::Break(keyword))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.advance()?;

        let function = self.contexts.iter().rev().find_map(|c| match c {
            Context::Loop => None,
            Context::Function(kind) => Some(Some(*kind)),
            Context::Class { .. } => Some(None),
        });

        let Some(Some(kind)) = function else {
            return Err(ParseError::ReturnOutsideFunction { keyword }.into());
        };

        let value = if !self.check(TokenType::SEMICOLON)? {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "';'", "return value")?;

        if kind == FunctionKind::Initializer && value.is_some() {
            return Err(ParseError::ReturnValueFromInitializer { keyword }.into());
        }

        Ok(Stmt::Return { keyword, value })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        self.advance()?;
        let value = self.expression()?;
        self.consume(TokenType::SEMICOLON, "';'", "value")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;

        if let Expr::Lambda(decl) = &expr {
            let keyword = Token::synthetic(TokenType::FUN, "fun", &decl.name);
            return Err(ParseError::LambdaStatement { keyword }.into());
        }

        self.consume(TokenType::SEMICOLON, "';'", "expression")?;

        Ok(Stmt::Expression(expr))
    }

    /// Declarations up to the closing brace. The `{` is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE)? && !self.is_at_end()? {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "'}'", "block")?;

        Ok(statements)
    }

    // ───────────────────────── expression rules ───────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.comma()
    }

    fn comma(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.parse_comma())
    }

    fn parse_comma(&mut self) -> Result<Expr> {
        let mut expr = self.assignment()?;

        while self.check(TokenType::COMMA)? {
            let operator = self.advance()?;
            let right = self.assignment()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let expr = self.ternary()?;

        if !self.check(TokenType::EQUAL)? {
            return Ok(expr);
        }

        match expr {
            Expr::Variable { id, name } => {
                self.advance()?;
                let value = self.assignment()?;

                Ok(Expr::Assign {
                    id,
                    name,
                    value: Box::new(value),
                })
            }

            Expr::Get { object, name } => {
                self.advance()?;
                let value = self.assignment()?;

                Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                })
            }

            _ => {
                let equals = self.peek()?.clone();
                Err(ParseError::InvalidAssignmentTarget { equals }.into())
            }
        }
    }

    fn ternary(&mut self) -> Result<Expr> {
        let condition = self.logical_or()?;

        if !self.matches(TokenType::QUESTION)? {
            return Ok(condition);
        }

        let then_branch = self.logical_or()?;
        self.consume(TokenType::COLON, "':'", "ternary branch")?;
        let else_branch = self.logical_or()?;

        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    /// One left-associative binary precedence level.
    fn binary(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr = operand(self)?;

        while operators.contains(&self.peek_kind()?) {
            let operator = self.advance()?;
            let right = operand(self)?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        self.binary(&[TokenType::OR], Self::logical_and)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        self.binary(&[TokenType::AND], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary(&[TokenType::STAR, TokenType::SLASH], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.parse_unary())
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if matches!(self.peek_kind()?, TokenType::BANG | TokenType::MINUS) {
            let operator = self.advance()?;
            let right = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.check(TokenType::LEFT_PAREN)? {
                if let Expr::Literal(literal) = &expr {
                    let literal = literal.clone();
                    return Err(ParseError::LiteralNotCallable { literal }.into());
                }

                self.advance()?;
                expr = self.finish_call(expr)?;
            } else if self.check(TokenType::DOT)? {
                if let Expr::Literal(literal) = &expr {
                    let literal = literal.clone();
                    return Err(ParseError::LiteralNotObject { literal }.into());
                }

                self.advance()?;
                let name = self.consume(TokenType::IDENTIFIER, "property name", "'.'")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Arguments are parsed as one comma expression, then unwound back into
    /// left-to-right order.
    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN)? {
            let mut rest = self.comma()?;

            loop {
                match rest {
                    Expr::Binary {
                        left,
                        operator,
                        right,
                    } if operator.token_type == TokenType::COMMA => {
                        arguments.push(*right);
                        rest = *left;
                    }
                    last => {
                        arguments.push(last);
                        break;
                    }
                }
            }

            arguments.reverse();
        }

        let paren = self.consume(TokenType::RIGHT_PAREN, "')'", "arguments")?;

        if arguments.len() > MAX_ARGS {
            return Err(ParseError::TooManyArguments { at: paren }.into());
        }

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek_kind()? {
            TokenType::FALSE
            | TokenType::TRUE
            | TokenType::NIL
            | TokenType::NUMBER
            | TokenType::STRING => Ok(Expr::Literal(self.advance()?)),

            TokenType::IDENTIFIER => Ok(Expr::Variable {
                id: self.node_id(),
                name: self.advance()?,
            }),

            TokenType::THIS => {
                let keyword = self.advance()?;

                if self.innermost_class().is_none() {
                    return Err(ParseError::ThisOutsideClass { keyword }.into());
                }

                Ok(Expr::This {
                    id: self.node_id(),
                    keyword,
                })
            }

            TokenType::SUPER => {
                let keyword = self.advance()?;

                match self.innermost_class() {
                    None => return Err(ParseError::SuperOutsideClass { keyword }.into()),
                    Some((class, false)) => {
                        let class = class.clone();
                        return Err(ParseError::SuperWithoutSuperclass { keyword, class }.into());
                    }
                    Some((_, true)) => {}
                }

                self.consume(TokenType::DOT, "'.'", "'super'")?;
                let method = self.consume(TokenType::IDENTIFIER, "superclass method name", "'super.'")?;

                Ok(Expr::Super {
                    id: self.node_id(),
                    this_id: self.node_id(),
                    keyword,
                    method,
                })
            }

            TokenType::FUN => {
                let keyword = self.advance()?;
                let name = Token::synthetic(
                    TokenType::IDENTIFIER,
                    &format!("$lambda{}_{}$", keyword.line, keyword.column),
                    &keyword,
                );

                Ok(Expr::Lambda(Rc::new(
                    self.function(name, FunctionKind::Lambda)?,
                )))
            }

            TokenType::LEFT_PAREN => {
                self.advance()?;
                let expr = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "')'", "expression")?;

                Ok(Expr::Grouping(Box::new(expr)))
            }

            _ => {
                let found = self.peek()?.clone();
                Err(ParseError::ExpectedExpression { found }.into())
            }
        }
    }

    // ────────────────────── utility helpers ───────────────────────

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn innermost_class(&self) -> Option<(&Token, bool)> {
        self.contexts.iter().rev().find_map(|c| match c {
            Context::Class {
                name,
                has_superclass,
            } => Some((name, *has_superclass)),
            _ => None,
        })
    }

    /// Pull the next token from the scanner, honouring the two-token window.
    fn fetch(&mut self) -> Result<Token> {
        let token = match self.next.take() {
            Some(token) => token,
            None => match self.tokens.next() {
                Some(Ok(token)) => token,
                Some(Err(e)) => return Err(e.into()),
                None => self
                    .eof
                    .clone()
                    .unwrap_or_else(|| Token::new(TokenType::EOF, "", 1, 1)),
            },
        };

        if token.token_type == TokenType::EOF {
            self.eof = Some(token.clone());
        }

        Ok(token)
    }

    fn peek(&mut self) -> Result<&Token> {
        let token = match self.current.take() {
            Some(token) => token,
            None => self.fetch()?,
        };

        Ok(self.current.insert(token))
    }

    #[inline(always)]
    fn peek_kind(&mut self) -> Result<TokenType> {
        Ok(self.peek()?.token_type)
    }

    /// Kind of the token after the current one.
    fn peek_next_kind(&mut self) -> Result<TokenType> {
        self.peek()?;

        let token = match self.next.take() {
            Some(token) => token,
            None => match self.tokens.next() {
                Some(Ok(token)) => token,
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(TokenType::EOF),
            },
        };

        Ok(self.next.insert(token).token_type)
    }

    /// Consume the current token. `EOF` is never consumed.
    fn advance(&mut self) -> Result<Token> {
        let token = match self.current.take() {
            Some(token) => token,
            None => self.fetch()?,
        };

        match token.token_type {
            TokenType::EOF => self.current = Some(token.clone()),
            TokenType::LEFT_BRACE => self.open_braces += 1,
            TokenType::RIGHT_BRACE => self.open_braces = self.open_braces.saturating_sub(1),
            _ => {}
        }

        Ok(token)
    }

    #[inline(always)]
    fn check(&mut self, ttype: TokenType) -> Result<bool> {
        Ok(self.peek_kind()? == ttype)
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> Result<bool> {
        if self.check(ttype)? {
            self.advance()?;
            return Ok(true);
        }

        Ok(false)
    }

    fn consume(&mut self, ttype: TokenType, expected: &str, after: &str) -> Result<Token> {
        if self.check(ttype)? {
            return self.advance();
        }

        let found = self.peek()?.clone();
        debug!("Expected {} after {}, found {:?}", expected, after, found.token_type);

        Err(ParseError::UnexpectedToken {
            expected: expected.to_string(),
            after: after.to_string(),
            found,
        }
        .into())
    }

    #[inline(always)]
    fn is_at_end(&mut self) -> Result<bool> {
        self.check(TokenType::EOF)
    }

    /// Discards the rest of the failed top-level declaration: first out of
    /// any open braces, then up to a statement boundary, which is just past
    /// a `;` or `}` or before a keyword that starts a declaration.
    fn synchronize(&mut self) {
        loop {
            match self.advance() {
                Ok(token) if token.token_type == TokenType::EOF => break,
                Ok(token)
                    if self.open_braces == 0
                        && matches!(
                            token.token_type,
                            TokenType::SEMICOLON | TokenType::RIGHT_BRACE
                        ) =>
                {
                    break
                }
                _ => {}
            }

            if self.open_braces > 0 {
                continue;
            }

            if let Ok(kind) = self.peek_kind() {
                if kind.starts_declaration() {
                    break;
                }
            }
        }

        self.open_braces = 0;
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Stmt>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_declaration().transpose()
    }
}
