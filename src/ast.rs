//! Syntax tree produced by the parser and consumed by the resolver and the
//! interpreter.
//!
//! Every identifier occurrence that needs a lexical address carries a
//! [`NodeId`]; the resolver records `(depth, slot)` pairs against these ids.
//! Function and class declarations sit behind `Rc` so closures and classes
//! can keep their bodies alive after the top-level statement is done.

use std::rc::Rc;

use crate::token::Token;

/// Identity of one identifier occurrence (use or declaration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// `fun name(...) { ... }`
    Function,

    /// `name(...) { ... }` inside a class body.
    Method,

    /// `init(...) { ... }` inside a class body.
    Initializer,

    /// `name { ... }` inside a class body; invoked on access.
    Property,

    /// `fun (...) { ... }` in expression position.
    Lambda,
}

impl FunctionKind {
    /// Methods, initializers and properties get an implicit `this`.
    pub fn binds_this(self) -> bool {
        matches!(
            self,
            FunctionKind::Method | FunctionKind::Initializer | FunctionKind::Property
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Declaration occurrence of the name (unused for methods and lambdas).
    pub id: NodeId,

    /// Declared name, or the synthesized `$lambda{line}_{column}$`.
    pub name: Token,

    pub params: Vec<Token>,

    pub body: Vec<Stmt>,

    pub kind: FunctionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub id: NodeId,

    pub name: Token,

    /// Always an `Expr::Variable` when present.
    pub superclass: Option<Expr>,

    pub methods: Vec<Rc<FunctionDecl>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `NUMBER`, `STRING`, `true`, `false` or `nil`.
    Literal(Token),

    Variable {
        id: NodeId,
        name: Token,
    },

    Assign {
        id: NodeId,
        name: Token,
        value: Box<Expr>,
    },

    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Arithmetic, comparison, `and`/`or` and the comma operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Grouping(Box<Expr>),

    Call {
        callee: Box<Expr>,
        /// The closing `)`, kept for error locations.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: NodeId,
        keyword: Token,
    },

    /// `super.method`; `this_id` addresses the receiver.
    Super {
        id: NodeId,
        this_id: NodeId,
        keyword: Token,
        method: Token,
    },

    Lambda(Rc<FunctionDecl>),
}

impl Expr {
    /// A token that locates this expression in the source.
    pub fn token(&self) -> &Token {
        match self {
            Expr::Literal(token) => token,
            Expr::Variable { name, .. } | Expr::Assign { name, .. } => name,
            Expr::Unary { operator, .. } | Expr::Binary { operator, .. } => operator,
            Expr::Ternary { condition, .. } => condition.token(),
            Expr::Grouping(inner) => inner.token(),
            Expr::Call { paren, .. } => paren,
            Expr::Get { name, .. } | Expr::Set { name, .. } => name,
            Expr::This { keyword, .. } | Expr::Super { keyword, .. } => keyword,
            Expr::Lambda(decl) => &decl.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        id: NodeId,
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// Also the target of `for` desugaring.
    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Break(Token),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Function(Rc<FunctionDecl>),

    Class(Rc<ClassDecl>),
}
