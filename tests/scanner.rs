#[cfg(test)]
mod scanner_tests {
    use rox::error::LexError;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(&*actual.lexeme, *expected_lexeme);
        }
    }

    fn first_error(source: &str) -> LexError {
        Scanner::new(source)
            .find_map(Result::err)
            .expect("expected a lex error")
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})?:",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_longest_operator_wins() {
        assert_token_sequence(
            "!= ! == = <= < >= >",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::EQUAL, "="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::GREATER, ">"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_comments_produce_nothing() {
        assert_token_sequence(
            "a // line comment\n/* block\n comment */ b / c",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::SLASH, "/"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_keywords_and_identifiers() {
        assert_token_sequence(
            "break classy class _under fun for",
            &[
                (TokenType::BREAK, "break"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "_under"),
                (TokenType::FUN, "fun"),
                (TokenType::FOR, "for"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_literals() {
        let tokens: Vec<Token> = Scanner::new("\"hi there\" 12.5 7")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(&*tokens[0].lexeme, "\"hi there\"");
        assert_eq!(
            tokens[0].literal(),
            Some(&Literal::Str(std::rc::Rc::from("hi there")))
        );
        assert_eq!(tokens[1].literal(), Some(&Literal::Number(12.5)));
        assert_eq!(tokens[2].to_string(), "NUMBER 7 7.0");
    }

    #[test]
    fn test_scanner_06_positions_are_one_based() {
        let tokens: Vec<Token> = Scanner::new("var x\n  = \"a\nb\" ;")
            .filter_map(Result::ok)
            .collect();

        let positions: Vec<(usize, usize)> = tokens.iter().map(|t| (t.line, t.column)).collect();

        assert_eq!(positions, vec![(1, 1), (1, 5), (2, 3), (2, 5), (3, 4), (3, 5)]);
    }

    #[test]
    fn test_scanner_07_block_comment_updates_lines() {
        let tokens: Vec<Token> = Scanner::new("/* one\ntwo\n */ x")
            .filter_map(Result::ok)
            .collect();

        assert_eq!((tokens[0].line, tokens[0].column), (3, 5));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert!(matches!(&results[0], Ok(t) if t.token_type == TokenType::COMMA));
        assert!(matches!(&results[1], Ok(t) if t.token_type == TokenType::DOT));
        assert!(matches!(&results[3], Ok(t) if t.token_type == TokenType::LEFT_PAREN));
        assert!(matches!(&results[5], Ok(t) if t.token_type == TokenType::EOF));

        assert_eq!(
            results[2],
            Err(LexError::UnexpectedCharacter {
                character: '$',
                line: 1,
                column: 3
            })
        );
        assert_eq!(
            results[4],
            Err(LexError::UnexpectedCharacter {
                character: '#',
                line: 1,
                column: 5
            })
        );
    }

    #[test]
    fn test_unterminated_string_reports_opening_quote() {
        assert_eq!(
            first_error("x = \"never\nclosed"),
            LexError::UnterminatedString { line: 1, column: 5 }
        );
    }

    #[test]
    fn test_malformed_numbers() {
        assert_eq!(
            first_error("1.2.3"),
            LexError::MultipleDecimalPoints { line: 1, column: 1 }
        );
        assert_eq!(
            first_error("  42."),
            LexError::TrailingDecimalPoint { line: 1, column: 3 }
        );
    }

    #[test]
    fn test_scanner_is_fused_after_eof() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
