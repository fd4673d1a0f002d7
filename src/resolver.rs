//! Static resolver pass.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes nested exactly like the runtime environments:
//!    depth 0 holds the natives, depth 1 the user globals, and every block,
//!    function, lambda, method and class body pushes one more.
//! 2. Report static errors (same-scope redeclaration, use before definition,
//!    unused locals, undeclared names).
//! 3. Give every identifier occurrence an [`Address`] so the interpreter
//!    never searches environments by name.
//!
//! Each name owns a stack of bindings, one per live scope that declares it,
//! so the innermost declaration is always on top.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, FunctionDecl, NodeId, Stmt};
use crate::error::ResolveError;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};

const NATIVE_DEPTH: usize = 0;
const GLOBAL_DEPTH: usize = 1;

/// Lexical address of a binding: scope depth counted from the natives scope,
/// and slot index within that scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub depth: usize,
    pub index: usize,
}

/// Address of every resolved identifier occurrence.
pub type Locals = HashMap<NodeId, Address>;

#[derive(Debug)]
struct Binding {
    address: Address,
    defined: bool,
    used: bool,
    /// Parameters, `this`, `super` and class names are never reported unused.
    exempt: bool,
    token: Token,
}

#[derive(Debug, Default)]
struct Scope {
    names: Vec<Rc<str>>,
}

pub struct Resolver {
    scopes: Vec<Scope>,
    shadows: HashMap<Rc<str>, Vec<Binding>>,
    locals: Locals,
}

impl Resolver {
    /// A resolver whose natives scope declares `natives` in order.
    pub fn new<'n>(natives: impl IntoIterator<Item = &'n str>) -> Self {
        let mut resolver = Resolver {
            scopes: Vec::new(),
            shadows: HashMap::new(),
            locals: Locals::new(),
        };

        resolver.begin_scope();
        for name in natives {
            let token = Token::new(TokenType::IDENTIFIER, name, 0, 0);
            resolver.bind(&token, true);
        }
        resolver.begin_scope();

        info!(
            "Resolver instantiated with {} native(s)",
            resolver.scopes[NATIVE_DEPTH].names.len()
        );

        resolver
    }

    /// Resolve one top-level declaration and return the addresses it uses.
    ///
    /// On failure every binding the declaration introduced is dropped again,
    /// so the globals scope keeps matching what the interpreter has defined.
    pub fn resolve(&mut self, stmt: &Stmt) -> Result<Locals, ResolveError> {
        let mark = self.scopes[GLOBAL_DEPTH].names.len();

        match self.stmt(stmt) {
            Ok(()) => {
                debug!("Resolved statement, {} address(es)", self.locals.len());
                Ok(std::mem::take(&mut self.locals))
            }
            Err(e) => {
                debug!("Resolve failed, rolling back: {}", e);
                self.rollback(mark);
                self.locals.clear();
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), ResolveError> {
        ensure_sufficient_stack(|| self.resolve_stmt(stmt))
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<(), ResolveError> {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.expr(expr)?,

            Stmt::Var {
                id,
                name,
                initializer,
            } => {
                // declare → resolve initializer → define
                let address = self.declare(name, false)?;
                if let Some(expr) = initializer {
                    self.expr(expr)?;
                    // reads inside the initializer don't count as uses
                    if let Some(binding) = self.innermost(name) {
                        binding.used = false;
                    }
                }
                self.define(name);
                self.locals.insert(*id, address);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.stmt(s)?;
                }
                self.end_scope()?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition)?;
                self.stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                self.expr(condition)?;
                self.stmt(body)?;
            }

            Stmt::Break(_) => {}

            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    self.expr(expr)?;
                }
            }

            Stmt::Function(decl) => {
                // The name is visible inside its own body.
                let address = self.declare(&decl.name, false)?;
                self.define(&decl.name);
                self.locals.insert(decl.id, address);
                self.function(decl)?;
            }

            Stmt::Class(decl) => self.class(decl)?,
        }

        Ok(())
    }

    fn class(&mut self, decl: &ClassDecl) -> Result<(), ResolveError> {
        let address = self.declare(&decl.name, true)?;
        self.define(&decl.name);
        self.locals.insert(decl.id, address);

        if let Some(superclass) = &decl.superclass {
            self.expr(superclass)?;
        }

        self.begin_scope();

        if decl.superclass.is_some() {
            let token = Token::synthetic(TokenType::SUPER, "super", &decl.name);
            self.bind(&token, true);
        }

        for method in &decl.methods {
            self.function(method)?;
        }

        self.end_scope()
    }

    /// Scope for parameters and body. Methods get `this` in slot 0.
    fn function(&mut self, decl: &FunctionDecl) -> Result<(), ResolveError> {
        debug!("Resolving body of '{}'", decl.name.lexeme);

        self.begin_scope();

        if decl.kind.binds_this() {
            let token = Token::synthetic(TokenType::THIS, "this", &decl.name);
            self.bind(&token, true);
        }

        for param in &decl.params {
            self.declare(param, true)?;
            self.define(param);
        }

        for stmt in &decl.body {
            self.stmt(stmt)?;
        }

        self.end_scope()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn expr(&mut self, expr: &Expr) -> Result<(), ResolveError> {
        ensure_sufficient_stack(|| self.resolve_expr(expr))
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Result<(), ResolveError> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Variable { id, name } => {
                let address = self.lookup(name)?;
                self.locals.insert(*id, address);
            }

            Expr::Assign { id, name, value } => {
                let address = self.lookup(name)?;
                self.locals.insert(*id, address);
                self.expr(value)?;
            }

            Expr::Unary { right, .. } => self.expr(right)?,

            Expr::Binary { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)?;
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition)?;
                self.expr(then_branch)?;
                self.expr(else_branch)?;
            }

            Expr::Grouping(inner) => self.expr(inner)?,

            Expr::Call {
                callee, arguments, ..
            } => {
                self.expr(callee)?;
                for arg in arguments {
                    self.expr(arg)?;
                }
            }

            Expr::Get { object, .. } => self.expr(object)?,

            Expr::Set { object, value, .. } => {
                self.expr(object)?;
                self.expr(value)?;
            }

            Expr::This { id, keyword } => {
                let address = self.lookup(keyword)?;
                self.locals.insert(*id, address);
            }

            Expr::Super {
                id,
                this_id,
                keyword,
                ..
            } => {
                let address = self.lookup(keyword)?;
                self.locals.insert(*id, address);

                let this = Token::synthetic(TokenType::THIS, "this", keyword);
                let address = self.lookup(&this)?;
                self.locals.insert(*this_id, address);
            }

            Expr::Lambda(decl) => self.function(decl)?,
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope, reporting the first binding never read.
    fn end_scope(&mut self) -> Result<(), ResolveError> {
        let check = self.depth() > GLOBAL_DEPTH;
        let Some(scope) = self.scopes.pop() else {
            return Ok(());
        };

        let mut unused = None;
        for name in &scope.names {
            if let Some(binding) = self.pop_shadow(name) {
                if check && unused.is_none() && !binding.used && !binding.exempt {
                    unused = Some(binding.token);
                }
            }
        }

        match unused {
            Some(name) => Err(ResolveError::UnusedVariable { name }),
            None => Ok(()),
        }
    }

    /// Unwind a failed declaration: drop nested scopes without checks and
    /// forget globals declared after `mark`.
    fn rollback(&mut self, mark: usize) {
        while self.scopes.len() > GLOBAL_DEPTH + 1 {
            if let Some(scope) = self.scopes.pop() {
                for name in &scope.names {
                    self.pop_shadow(name);
                }
            }
        }

        let globals: Vec<Rc<str>> = self.scopes[GLOBAL_DEPTH].names.drain(mark..).collect();
        for name in globals.iter().rev() {
            self.pop_shadow(name);
        }
    }

    fn pop_shadow(&mut self, name: &str) -> Option<Binding> {
        let stack = self.shadows.get_mut(name)?;
        let binding = stack.pop();

        if stack.is_empty() {
            self.shadows.remove(name);
        }

        binding
    }

    /// Declare and define in one step.
    fn bind(&mut self, name: &Token, exempt: bool) {
        let depth = self.depth();
        self.push_binding(name, depth, exempt);
        self.define(name);
    }

    fn declare(&mut self, name: &Token, exempt: bool) -> Result<Address, ResolveError> {
        let depth = self.depth();

        // Globals may be redeclared freely.
        if depth > GLOBAL_DEPTH {
            let duplicate = self
                .shadows
                .get(&*name.lexeme)
                .and_then(|stack| stack.last())
                .is_some_and(|binding| binding.address.depth == depth);

            if duplicate {
                return Err(ResolveError::DuplicateIdentifier { name: name.clone() });
            }
        }

        Ok(self.push_binding(name, depth, exempt))
    }

    fn push_binding(&mut self, name: &Token, depth: usize, exempt: bool) -> Address {
        let scope = &mut self.scopes[depth];
        let address = Address {
            depth,
            index: scope.names.len(),
        };
        scope.names.push(name.lexeme.clone());

        self.shadows
            .entry(name.lexeme.clone())
            .or_default()
            .push(Binding {
                address,
                defined: false,
                used: false,
                exempt,
                token: name.clone(),
            });

        debug!(
            "Declared '{}' at {}:{}",
            name.lexeme, address.depth, address.index
        );

        address
    }

    fn define(&mut self, name: &Token) {
        if let Some(binding) = self.innermost(name) {
            binding.defined = true;
        }
    }

    fn innermost(&mut self, name: &Token) -> Option<&mut Binding> {
        self.shadows
            .get_mut(&*name.lexeme)
            .and_then(|stack| stack.last_mut())
    }

    /// Address of the innermost live declaration, marking it used.
    fn lookup(&mut self, name: &Token) -> Result<Address, ResolveError> {
        let binding = self
            .innermost(name)
            .ok_or_else(|| ResolveError::UndeclaredIdentifier { name: name.clone() })?;

        if !binding.defined {
            return Err(ResolveError::UseBeforeDefine { name: name.clone() });
        }

        binding.used = true;

        debug!(
            "Resolved '{}' to {}:{}",
            name.lexeme, binding.address.depth, binding.address.index
        );

        Ok(binding.address)
    }
}
