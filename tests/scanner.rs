#[cfg(test)]
mod scanner_tests {
    use rlox::error::LoxError;
    use rlox::scanner::{validate_source, Scanner};
    use rlox::token::TokenType;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_symbols() {
        assert_token_sequence(
            "({*.,+*})",
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
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_keywords_and_identifiers() {
        assert_token_sequence(
            "class Foo < Bar { init() { this.x = super.y; } }",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Foo"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Bar"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::IDENTIFIER, "init"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::THIS, "this"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::SUPER, "super"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "y"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_number_literal_payload() {
        let tokens: Vec<_> = Scanner::new(b"3.14 42")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 3);

        match tokens[0].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 3.14),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }

        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 42.0),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_string_literal_strips_quotes() {
        let tokens: Vec<_> = Scanner::new(b"\"hello world\"")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "\"hello world\"");

        match tokens[0].token_type {
            TokenType::STRING(ref s) => assert_eq!(s, "hello world"),
            ref other => panic!("expected STRING, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_comments_and_lines() {
        let source = "var a = 1; // trailing comment\nvar b = 2;";
        let tokens: Vec<_> = Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect();

        // No token for the comment itself.
        assert_eq!(
            tokens
                .iter()
                .filter(|t| t.token_type == TokenType::VAR)
                .count(),
            2
        );

        // The second declaration sits on line 2.
        let b = tokens
            .iter()
            .find(|t| t.lexeme == "b")
            .expect("identifier 'b'");
        assert_eq!(b.line, 2);
    }

    #[test]
    fn test_scanner_unterminated_string() {
        let results: Vec<_> = Scanner::new(b"\"oops").collect();

        let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unterminated string"));
    }

    #[test]
    fn test_source_ingestion_rejects_invalid_utf8() {
        // A string literal carrying a bare 0xFF byte never reaches the
        // scanner's unchecked conversions.
        let err = validate_source(b"print \"\xff\";").expect_err("invalid bytes");
        assert!(matches!(err, LoxError::Utf8(_)));

        assert!(validate_source("print \"ok\";".as_bytes()).is_ok());
    }

    #[test]
    fn test_scanner_recovers_past_unexpected_chars() {
        let results: Vec<_> = Scanner::new(b",.$(#").collect();

        // COMMA, DOT, error($), LEFT_PAREN, error(#), EOF
        assert_eq!(results.len(), 6);

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2);

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "unexpected message: {}",
                err
            );
        }

        let kinds: Vec<_> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|t| t.token_type.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::COMMA,
                TokenType::DOT,
                TokenType::LEFT_PAREN,
                TokenType::EOF,
            ]
        );
    }
}
