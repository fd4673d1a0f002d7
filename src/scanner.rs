//! Module `scanner` implements a one‑pass, streaming lexer.
//!
//! It transforms a source string into a lazy sequence of [`Token`]s, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end.
//! Designed as a `FusedIterator`: once `EOF` has been yielded the scanner is
//! exhausted and cannot be restarted.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input buffer.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, LexError>` on each `.next()`.  An error is reported
//!   at the exact token that caused it; scanning resumes right after it.
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`, `?`, `:`.
//! - Two‑character operators, longest match first: `!=`, `==`, `<=`, `>=`.
//! - `//` line comments and `/* */` block comments produce no token.
//! - String literals keep their quotes in the lexeme and may span lines.
//! - Numbers accept one optional decimal point that must be followed by a digit.
//! - Identifiers are `[A-Za-z_][A-Za-z0-9_]*`, checked against `KEYWORDS`.
//!
//! Line and column are 1‑based and point at the token's first character.

use crate::error::LexError;
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::{memchr, memchr_iter, memmem, memrchr};
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"break"  => TokenType::BREAK,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** over a borrowed source string.
pub struct Scanner<'a> {
    src: &'a str,
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    line_start: usize,          // byte index where the current line begins
    start_line: usize,          // line of the current lexeme's first byte
    start_column: usize,        // column of the current lexeme's first byte
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
    done: bool,                 // EOF already yielded
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            start_line: 1,
            start_column: 1,
            pending: None,
            done: false,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes()[self.curr];
        self.curr += 1;
        if b == b'\n' {
            self.new_line(self.curr);
        }
        b
    }

    /// Peek at the current byte without consuming it.  `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.bytes().get(self.curr).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline(always)]
    fn new_line(&mut self, line_start: usize) {
        self.line += 1;
        self.line_start = line_start;
    }

    #[inline(always)]
    fn column(&self, at: usize) -> usize {
        at - self.line_start + 1
    }

    fn two_char(&mut self, second: u8, matched: TokenType, unmatched: TokenType) {
        let tt = if self.match_byte(second) {
            matched
        } else {
            unmatched
        };

        self.pending = Some(tt);
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  If it produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments return `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<(), LexError> {
        let b = self.advance();

        match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b',' => self.pending = Some(TokenType::COMMA),
            b'.' => self.pending = Some(TokenType::DOT),
            b'-' => self.pending = Some(TokenType::MINUS),
            b'+' => self.pending = Some(TokenType::PLUS),
            b';' => self.pending = Some(TokenType::SEMICOLON),
            b'*' => self.pending = Some(TokenType::STAR),
            b'?' => self.pending = Some(TokenType::QUESTION),
            b':' => self.pending = Some(TokenType::COLON),

            // ── two‑character operators (!=, ==, <=, >=) ─────────────────
            b'!' => self.two_char(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.two_char(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.two_char(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.two_char(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            // ── whitespace / newline (line bookkeeping lives in advance) ─
            b' ' | b'\r' | b'\t' | b'\n' => {}

            // ── comments ─────────────────────────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast‑forward to the newline; it is consumed by the next
                    // scan so line counting stays in one place.
                    match memchr(b'\n', &self.bytes()[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.src.len(),
                    }
                } else if self.match_byte(b'*') {
                    self.skip_block_comment();
                } else {
                    self.pending = Some(TokenType::SLASH);
                }
            }

            b'"' => return self.parse_string(),

            b'0'..=b'9' => return self.parse_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                let character = self.src[self.start..].chars().next().unwrap_or('\u{fffd}');
                // keep `curr` on a char boundary for multi‑byte input
                self.curr = self.start + character.len_utf8();

                return Err(LexError::UnexpectedCharacter {
                    character,
                    line: self.start_line,
                    column: self.start_column,
                });
            }
        }

        Ok(())
    }

    /// Skip a `/* … */` comment.  An unterminated comment runs to EOF.
    fn skip_block_comment(&mut self) {
        let rest = &self.bytes()[self.curr..];
        let end = memmem::find(rest, b"*/").map_or(rest.len(), |pos| pos + 2);
        let skipped = &rest[..end];

        let newlines = memchr_iter(b'\n', skipped).count();
        if let Some(last) = memrchr(b'\n', skipped) {
            self.line += newlines;
            self.line_start = self.curr + last + 1;
        }

        self.curr += end;
    }

    /// Parse a double‑quoted string literal.  The lexeme keeps both quotes.
    fn parse_string(&mut self) -> Result<(), LexError> {
        while !self.is_at_end() && self.peek() != b'"' {
            self.advance();
        }

        if self.is_at_end() {
            return Err(LexError::UnterminatedString {
                line: self.start_line,
                column: self.start_column,
            });
        }

        self.advance(); // closing quote
        self.pending = Some(TokenType::STRING);

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).
    fn parse_number(&mut self) -> Result<(), LexError> {
        let mut seen_decimal = false;

        loop {
            match self.peek() {
                b'0'..=b'9' => {
                    self.advance();
                }
                b'.' if !seen_decimal => {
                    seen_decimal = true;
                    self.advance();
                }
                _ => break,
            }
        }

        if seen_decimal && self.peek() == b'.' {
            return Err(LexError::MultipleDecimalPoints {
                line: self.start_line,
                column: self.start_column,
            });
        }

        if self.bytes()[self.curr - 1] == b'.' {
            return Err(LexError::TrailingDecimalPoint {
                line: self.start_line,
                column: self.start_column,
            });
        }

        self.pending = Some(TokenType::NUMBER);

        Ok(())
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.bytes()[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            // 1. Reset per‑token state.
            self.start = self.curr;
            self.start_line = self.line;
            self.start_column = self.column(self.curr);
            self.pending = None;

            // 2. EOF guard – emit exactly one EOF then terminate.
            if self.is_at_end() {
                self.done = true;
                debug!("Scanner reached EOF on line {}", self.line);

                return Some(Ok(Token::new(
                    TokenType::EOF,
                    "",
                    self.start_line,
                    self.start_column,
                )));
            }

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                debug!("Lex error: {}", e);
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                debug!(
                    "Scanned token ({:?}) '{}' at {}:{}",
                    tt, lexeme, self.start_line, self.start_column
                );

                return Some(Ok(Token::new(
                    tt,
                    lexeme,
                    self.start_line,
                    self.start_column,
                )));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
