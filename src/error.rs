//! Centralised error hierarchy for the interpreter.
//!
//! Each pipeline stage has its own error enum; all of them fold into
//! [`LoxError`] so the crate can use a single `Result<T>` alias.  Static
//! errors (lex, parse, resolve) abort one declaration, runtime errors abort
//! the whole run.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use crate::token::Token;

/// Failure while turning characters into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("[line {line}:{column}] Error: Unterminated string.")]
    UnterminatedString { line: usize, column: usize },

    #[error("[line {line}:{column}] Error: Number contains multiple decimal points.")]
    MultipleDecimalPoints { line: usize, column: usize },

    #[error("[line {line}:{column}] Error: Number ends with a decimal point.")]
    TrailingDecimalPoint { line: usize, column: usize },

    #[error("[line {line}:{column}] Error: Unexpected character: {character}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
}

/// Syntactic failure. Every variant carries the token the parser was looking at.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("[line {}:{}] Error: Expected {expected} after {after}, found '{}'.", .found.line, .found.column, .found.lexeme)]
    UnexpectedToken {
        expected: String,
        after: String,
        found: Token,
    },

    #[error("[line {}:{}] Error: Expected expression, found '{}'.", .found.line, .found.column, .found.lexeme)]
    ExpectedExpression { found: Token },

    #[error("[line {}:{}] Error: Invalid assignment target.", .equals.line, .equals.column)]
    InvalidAssignmentTarget { equals: Token },

    #[error("[line {}:{}] Error: No enclosing loop out of which to break.", .keyword.line, .keyword.column)]
    BreakOutsideLoop { keyword: Token },

    #[error("[line {}:{}] Error: No enclosing function or method out of which to return.", .keyword.line, .keyword.column)]
    ReturnOutsideFunction { keyword: Token },

    #[error("[line {}:{}] Error: Can't return a value from an initializer.", .keyword.line, .keyword.column)]
    ReturnValueFromInitializer { keyword: Token },

    #[error("[line {}:{}] Error: Can't use 'this' outside of a class.", .keyword.line, .keyword.column)]
    ThisOutsideClass { keyword: Token },

    #[error("[line {}:{}] Error: Can't use 'super' outside of a class.", .keyword.line, .keyword.column)]
    SuperOutsideClass { keyword: Token },

    #[error("[line {}:{}] Error: Class {} doesn't inherit from another class to have a super.", .keyword.line, .keyword.column, .class.lexeme)]
    SuperWithoutSuperclass { keyword: Token, class: Token },

    #[error("[line {}:{}] Error: Class {} can't inherit from itself.", .name.line, .name.column, .name.lexeme)]
    SelfInheritance { name: Token },

    #[error("[line {}:{}] Error: Literals are not callable.", .literal.line, .literal.column)]
    LiteralNotCallable { literal: Token },

    #[error("[line {}:{}] Error: Literals can't appear before '.'.", .literal.line, .literal.column)]
    LiteralNotObject { literal: Token },

    #[error("[line {}:{}] Error: Lambdas can't be used as standalone statements.", .keyword.line, .keyword.column)]
    LambdaStatement { keyword: Token },

    #[error("[line {}:{}] Error: Can't have more than 255 parameters.", .at.line, .at.column)]
    TooManyParameters { at: Token },

    #[error("[line {}:{}] Error: Can't have more than 255 arguments.", .at.line, .at.column)]
    TooManyArguments { at: Token },
}

/// Static-analysis failure raised by the resolver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("[line {}:{}] Error: Duplicate identifier definition: {}", .name.line, .name.column, .name.lexeme)]
    DuplicateIdentifier { name: Token },

    #[error("[line {}:{}] Error: You can't use a variable in its own initializer: {}", .name.line, .name.column, .name.lexeme)]
    UseBeforeDefine { name: Token },

    #[error("[line {}:{}] Error: Unused variable {}", .name.line, .name.column, .name.lexeme)]
    UnusedVariable { name: Token },

    #[error("[line {}:{}] Error: Undeclared identifier: {}", .name.line, .name.column, .name.text())]
    UndeclaredIdentifier { name: Token },
}

/// Evaluation failure. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("[line {}:{}] Runtime error: Expected {expected} but found {actual} for '{}'.", .at.line, .at.column, .at.text())]
    TypeMismatch {
        expected: String,
        actual: String,
        at: Token,
    },

    #[error("[line {}:{}] Runtime error: Division by zero: {dividend} / 0.", .at.line, .at.column)]
    DivideByZero { dividend: f64, at: Token },

    #[error("[line {}:{}] Runtime error: Undefined property '{}' on {instance}.", .name.line, .name.column, .name.lexeme)]
    UndefinedProperty { instance: String, name: Token },

    #[error("[line {}:{}] Runtime error: Uninitialized identifier: {}", .name.line, .name.column, .name.text())]
    UninitializedIdentifier { name: Token },

    #[error("[line {}:{}] Runtime error: Undefined identifier: {}", .name.line, .name.column, .name.text())]
    UndefinedIdentifier { name: Token },

    #[error("[line {}:{}] Runtime error: You can only call functions and classes, found {callee}.", .paren.line, .paren.column)]
    CallableExpected { callee: String, paren: Token },

    #[error("[line {}:{}] Runtime error: Expected {expected} arguments but got {actual} calling {callee}.", .paren.line, .paren.column)]
    ArgumentCountMismatch {
        expected: usize,
        actual: usize,
        callee: String,
        paren: Token,
    },

    #[error("[line {}:{}] Runtime error: Only instances have properties, found {found}.", .name.line, .name.column)]
    ObjectExpected { found: String, name: Token },

    #[error("[line {}:{}] Runtime error: Superclass must be a class, found {found}.", .name.line, .name.column)]
    ClassExpected { found: String, name: Token },
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Static errors abort one declaration; everything else aborts the run.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex(_) | LoxError::Parse(_) | LoxError::Resolve(_)
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
