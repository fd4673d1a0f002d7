use log::debug;
use serde::Serialize;
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// The different kinds of tokens recognized by the scanner.
///
/// Kinds carry no payload: literal values are derived lazily from the
/// lexeme (see [`Token::literal`]).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';'
    SEMICOLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '?'
    QUESTION,

    /// ':'
    COLON,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal, quotes included in the lexeme
    STRING,

    /// A numeric literal
    NUMBER,

    AND,
    BREAK,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    /// End‑of‑file marker
    EOF,
}

impl TokenType {
    /// Canonical source text of operators and keywords. `None` for kinds
    /// whose text is the lexeme itself.
    pub fn text(self) -> Option<&'static str> {
        let text = match self {
            TokenType::LEFT_PAREN => "(",
            TokenType::RIGHT_PAREN => ")",
            TokenType::LEFT_BRACE => "{",
            TokenType::RIGHT_BRACE => "}",
            TokenType::COMMA => ",",
            TokenType::DOT => ".",
            TokenType::MINUS => "-",
            TokenType::PLUS => "+",
            TokenType::SEMICOLON => ";",
            TokenType::SLASH => "/",
            TokenType::STAR => "*",
            TokenType::QUESTION => "?",
            TokenType::COLON => ":",
            TokenType::BANG => "!",
            TokenType::BANG_EQUAL => "!=",
            TokenType::EQUAL => "=",
            TokenType::EQUAL_EQUAL => "==",
            TokenType::GREATER => ">",
            TokenType::GREATER_EQUAL => ">=",
            TokenType::LESS => "<",
            TokenType::LESS_EQUAL => "<=",
            TokenType::AND => "and",
            TokenType::BREAK => "break",
            TokenType::CLASS => "class",
            TokenType::ELSE => "else",
            TokenType::FALSE => "false",
            TokenType::FUN => "fun",
            TokenType::FOR => "for",
            TokenType::IF => "if",
            TokenType::NIL => "nil",
            TokenType::OR => "or",
            TokenType::PRINT => "print",
            TokenType::RETURN => "return",
            TokenType::SUPER => "super",
            TokenType::THIS => "this",
            TokenType::TRUE => "true",
            TokenType::VAR => "var",
            TokenType::WHILE => "while",
            TokenType::IDENTIFIER | TokenType::STRING | TokenType::NUMBER | TokenType::EOF => {
                return None
            }
        };

        Some(text)
    }

    /// Keywords the parser may resynchronise on after an error.
    pub fn starts_declaration(self) -> bool {
        matches!(
            self,
            TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
        )
    }
}

/// Value carried by a literal token, computed from its lexeme on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),

    /// String contents without the surrounding quotes.
    Str(Rc<str>),

    Bool(bool),

    Nil,
}

/// A scanned token: kind, the exact lexeme and its 1‑based position.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact text from the source that produced this token.
    pub lexeme: Rc<str>,

    /// 1‑based line number in the source.
    pub line: usize,

    /// 1‑based column of the token's first character.
    pub column: usize,

    #[serde(skip)]
    literal: OnceCell<Option<Literal>>,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: &str, line: usize, column: usize) -> Self {
        Self {
            token_type,
            lexeme: Rc::from(lexeme),
            line,
            column,
            literal: OnceCell::new(),
        }
    }

    /// A token that never appeared in the source, positioned at `at`.
    pub fn synthetic(token_type: TokenType, lexeme: &str, at: &Token) -> Self {
        Self::new(token_type, lexeme, at.line, at.column)
    }

    /// Canonical text: the fixed spelling for operators and keywords,
    /// the lexeme for identifiers and literals.
    pub fn text(&self) -> &str {
        match self.token_type {
            TokenType::IDENTIFIER => &self.lexeme,
            kind => kind.text().unwrap_or(&self.lexeme),
        }
    }

    /// Literal value of `NUMBER`, `STRING`, `TRUE`, `FALSE` and `NIL` tokens.
    /// Computed once, then cached.
    pub fn literal(&self) -> Option<&Literal> {
        self.literal
            .get_or_init(|| {
                debug!("Computing literal for {:?} '{}'", self.token_type, self.lexeme);

                match self.token_type {
                    TokenType::NUMBER => self.lexeme.parse::<f64>().ok().map(Literal::Number),
                    TokenType::STRING => {
                        let inner = self
                            .lexeme
                            .strip_prefix('"')
                            .and_then(|s| s.strip_suffix('"'))
                            .unwrap_or(&self.lexeme);
                        Some(Literal::Str(Rc::from(inner)))
                    }
                    TokenType::TRUE => Some(Literal::Bool(true)),
                    TokenType::FALSE => Some(Literal::Bool(false)),
                    TokenType::NIL => Some(Literal::Nil),
                    _ => None,
                }
            })
            .as_ref()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.token_type == other.token_type
            && self.lexeme == other.lexeme
            && self.line == other.line
            && self.column == other.column
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = format!("{:?}", self.token_type);

        match self.literal() {
            Some(Literal::Number(n)) if n.fract() == 0.0 && n.abs() < 1e15 => {
                // 3 → "3.0"
                let mut buf = itoa::Buffer::new();
                write!(f, "{} {} {}.0", variant, self.lexeme, buf.format(*n as i64))
            }
            Some(Literal::Number(n)) => write!(f, "{} {} {}", variant, self.lexeme, n),
            Some(Literal::Str(s)) if self.token_type == TokenType::STRING => {
                write!(f, "{} {} {}", variant, self.lexeme, s)
            }
            _ => write!(f, "{} {} null", variant, self.lexeme),
        }
    }
}
