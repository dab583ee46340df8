#[cfg(test)]
mod resolver_tests {
    use rlox::error::LoxError;
    use rlox::expr::Expr;
    use rlox::interpreter::Interpreter;
    use rlox::parser::Parser;
    use rlox::resolver::Resolver;
    use rlox::scanner::Scanner;
    use rlox::stmt::Stmt;
    use rlox::token::Token;

    fn tokens(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("clean scan")
    }

    fn parse_program(source: &str) -> Vec<Stmt> {
        let toks = tokens(source);
        let mut parser = Parser::new(&toks);
        let (statements, errors) = parser.parse();
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

        statements
    }

    /// Resolve a clean program and hand back the diagnostics, if any.
    fn resolve_errors(source: &str) -> Vec<LoxError> {
        let statements = parse_program(source);
        let mut interpreter = Interpreter::new();

        match Resolver::new(&mut interpreter).resolve(&statements) {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        }
    }

    fn assert_single_error(source: &str, fragment: &str) {
        let errors = resolve_errors(source);

        assert_eq!(errors.len(), 1, "diagnostics: {:?}", errors);
        assert!(
            errors[0].to_string().contains(fragment),
            "expected '{}' in '{}'",
            fragment,
            errors[0]
        );
    }

    #[test]
    fn test_distance_to_enclosing_block_is_one() {
        let statements = parse_program("{ var a = 1; { print a; } }");
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("clean resolve");

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected outer block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected inner block");
        };
        let Stmt::Print(expr) = &inner[0] else {
            panic!("expected print");
        };
        let Expr::Variable { id, .. } = expr else {
            panic!("expected variable read");
        };

        assert_eq!(interpreter.binding_distance(*id), Some(1));
    }

    #[test]
    fn test_parameter_resolves_at_distance_zero() {
        let statements = parse_program("fun f(x) { print x; }");
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("clean resolve");

        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function declaration");
        };
        let Stmt::Print(expr) = &decl.body[0] else {
            panic!("expected print");
        };
        let Expr::Variable { id, .. } = expr else {
            panic!("expected variable read");
        };

        assert_eq!(interpreter.binding_distance(*id), Some(0));
    }

    #[test]
    fn test_globals_are_left_unrecorded() {
        let statements = parse_program("var a = 1; print a;");
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("clean resolve");

        let Stmt::Print(expr) = &statements[1] else {
            panic!("expected print");
        };
        let Expr::Variable { id, .. } = expr else {
            panic!("expected variable read");
        };

        // Globals fall through to dynamic lookup.
        assert_eq!(interpreter.binding_distance(*id), None);
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_single_error(
            "{ var a = a; }",
            "Cannot read local variable in its own initializer",
        );
    }

    #[test]
    fn test_global_may_shadow_itself_in_initializer() {
        // Only *local* scopes enforce the initializer rule.
        assert!(resolve_errors("var a = 1; var a = a;").is_empty());
    }

    #[test]
    fn test_duplicate_declaration_in_same_scope() {
        assert_single_error(
            "{ var a = 1; var a = 2; }",
            "Variable already declared in this scope",
        );
    }

    #[test]
    fn test_return_outside_any_function() {
        assert_single_error("return 1;", "Cannot return from top-level code");
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_single_error(
            "class A { init() { return 1; } }",
            "Cannot return a value from an initializer",
        );
    }

    #[test]
    fn test_bare_return_from_initializer_is_allowed() {
        assert!(resolve_errors("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_this_outside_class() {
        assert_single_error("print this;", "Cannot use 'this' outside of a class");
    }

    #[test]
    fn test_super_outside_class() {
        assert_single_error("print super.m;", "Cannot use 'super' outside of a class");
    }

    #[test]
    fn test_super_in_class_without_superclass() {
        assert_single_error(
            "class A { m() { return super.m; } }",
            "Cannot use 'super' in a class with no superclass",
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_single_error("class A < A {}", "A class cannot inherit from itself");
    }

    #[test]
    fn test_multiple_errors_surface_in_one_pass() {
        let errors = resolve_errors("return 1;\nprint this;");

        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("[line 1]"));
        assert!(errors[1].to_string().contains("[line 2]"));
    }
}
