#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use rlox::error::LoxError;
    use rlox::interpreter::Interpreter;
    use rlox::parser::Parser;
    use rlox::resolver::Resolver;
    use rlox::scanner::Scanner;
    use rlox::token::Token;

    fn tokens(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("clean scan")
    }

    /// Run a statically clean program end to end, capturing `print` output.
    fn run(source: &str) -> (String, rlox::error::Result<()>) {
        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let sink: Rc<RefCell<dyn Write>> = buffer.clone();
        let mut interpreter = Interpreter::with_output(sink);

        let toks = tokens(source);
        let mut parser = Parser::new(&toks);
        let (statements, errors) = parser.parse();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("clean resolve");

        let outcome = interpreter.interpret(&statements);
        let output = String::from_utf8(buffer.borrow().clone()).expect("utf8 output");

        (output, outcome)
    }

    fn output(source: &str) -> String {
        let (out, result) = run(source);
        result.expect("clean run");

        out
    }

    fn runtime_message(source: &str) -> String {
        let (_, result) = run(source);

        match result.expect_err("expected a runtime error") {
            LoxError::Runtime { message, .. } => message,
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    // ────────────────────────── printing & values ───────────────────────────

    #[test]
    fn test_print_canonical_forms() {
        assert_eq!(
            output("print nil; print true; print 2 + 3; print \"hi\";"),
            "nil\ntrue\n5\nhi\n"
        );
    }

    #[test]
    fn test_fractional_numbers_keep_their_fraction() {
        assert_eq!(output("print 2.5; print 7 / 2;"), "2.5\n3.5\n");
    }

    #[test]
    fn test_instance_and_class_display() {
        assert_eq!(output("class A {} print A; print A();"), "A\nA instance\n");
    }

    // ─────────────────────────── operators ──────────────────────────────────

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_plus_rejects_mixed_operands() {
        assert_eq!(
            runtime_message("print 1 + \"a\";"),
            "Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn test_unary_minus_requires_number() {
        assert_eq!(runtime_message("print -\"a\";"), "Operand must be a number.");
    }

    #[test]
    fn test_comparison_requires_numbers() {
        assert_eq!(runtime_message("print 1 < \"a\";"), "Operands must be numbers.");
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        assert_eq!(output("print 1 / 0; print -1 / 0;"), "inf\n-inf\n");
    }

    #[test]
    fn test_truthiness_only_nil_and_false_are_falsy() {
        assert_eq!(
            output("if (0) print \"zero\"; if (\"\") print \"empty\"; if (nil) print \"nil\";"),
            "zero\nempty\n"
        );
    }

    #[test]
    fn test_logical_operators_return_operand_values() {
        assert_eq!(
            output("print \"hi\" or 2; print nil or \"yes\"; print nil and 1; print 1 and 2;"),
            "hi\nyes\nnil\n2\n"
        );
    }

    #[test]
    fn test_equality_semantics() {
        assert_eq!(
            output("print 1 == 1; print 1 == \"1\"; print nil == nil; print nil == false;"),
            "true\nfalse\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_instances_compare_by_identity() {
        assert_eq!(
            output("class A {} var a = A(); var b = A(); print a == b; print a == a;"),
            "false\ntrue\n"
        );
    }

    #[test]
    fn test_assignment_evaluates_to_assigned_value() {
        assert_eq!(output("var a = 1; print a = 2; print a;"), "2\n2\n");
    }

    // ─────────────────────── control flow & functions ───────────────────────

    #[test]
    fn test_for_loop_counts() {
        assert_eq!(
            output("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_closure_counter_keeps_state() {
        let source = "
            fun makeCounter() {
              var count = 0;
              fun increment() {
                count = count + 1;
                return count;
              }
              return increment;
            }
            var counter = makeCounter();
            print counter();
            print counter();
        ";

        assert_eq!(output(source), "1\n2\n");
    }

    #[test]
    fn test_closure_captures_definition_scope() {
        // The resolved binding is fixed at definition time; a later
        // declaration in the same block must not be observed.
        let source = "
            var a = \"global\";
            {
              fun show() { print a; }
              show();
              var a = \"block\";
              show();
            }
        ";

        assert_eq!(output(source), "global\nglobal\n");
    }

    #[test]
    fn test_return_unwinds_through_loop() {
        let source = "
            fun f() {
              while (true) {
                return \"done\";
              }
            }
            print f();
        ";

        assert_eq!(output(source), "done\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(output("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_recursion() {
        let source = "
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 2) + fib(n - 1);
            }
            print fib(10);
        ";

        assert_eq!(output(source), "55\n");
    }

    #[test]
    fn test_arity_mismatch_skips_body() {
        let (out, result) = run("fun f(a, b) { print \"body\"; } f(1);");

        assert_eq!(out, "");
        match result.expect_err("expected a runtime error") {
            LoxError::Runtime { message, .. } => {
                assert_eq!(message, "Expected 2 arguments but got 1.");
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_calling_a_non_callable() {
        assert_eq!(
            runtime_message("\"str\"();"),
            "Can only call functions and classes."
        );
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(runtime_message("print x;"), "Undefined variable 'x'.");
    }

    // ──────────────────────────── classes ───────────────────────────────────

    #[test]
    fn test_init_fields_and_methods() {
        let source = "
            class Point {
              init(x, y) {
                this.x = x;
                this.y = y;
              }
              sum() {
                return this.x + this.y;
              }
            }
            var p = Point(3, 4);
            print p.x;
            print p.sum();
        ";

        assert_eq!(output(source), "3\n7\n");
    }

    #[test]
    fn test_initializer_always_returns_the_instance() {
        let source = "
            class A {
              init() { this.x = 1; }
            }
            var a = A();
            print a.init() == a;
        ";

        assert_eq!(output(source), "true\n");
    }

    #[test]
    fn test_method_extraction_binds_this() {
        let source = "
            class Greeter {
              init(name) { this.name = name; }
              greet() { print this.name; }
            }
            var m = Greeter(\"lox\").greet;
            m();
        ";

        assert_eq!(output(source), "lox\n");
    }

    #[test]
    fn test_inherited_method_lookup() {
        let source = "
            class A {
              hello() { print \"from A\"; }
            }
            class B < A {}
            B().hello();
        ";

        assert_eq!(output(source), "from A\n");
    }

    #[test]
    fn test_super_dispatches_to_parent_body() {
        let source = "
            class A {
              describe() { print \"A\"; }
            }
            class B < A {
              describe() {
                super.describe();
                print \"B\";
              }
            }
            B().describe();
        ";

        assert_eq!(output(source), "A\nB\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = "
            class A {
              m() { return \"method\"; }
            }
            var a = A();
            print a.m();
            a.m = \"field\";
            print a.m;
        ";

        assert_eq!(output(source), "method\nfield\n");
    }

    #[test]
    fn test_undefined_property() {
        assert_eq!(
            runtime_message("class A {} print A().missing;"),
            "Undefined property 'missing'."
        );
    }

    #[test]
    fn test_only_instances_have_properties() {
        assert_eq!(
            runtime_message("print true.x;"),
            "Only instances have properties."
        );
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        assert_eq!(
            runtime_message("var x = 1; class A < x {}"),
            "Superclass must be a class."
        );
    }

    #[test]
    fn test_recovered_statements_still_execute() {
        // A malformed first statement costs one diagnostic; the statements
        // that survived synchronization still resolve and run.
        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let sink: Rc<RefCell<dyn Write>> = buffer.clone();
        let mut interpreter = Interpreter::with_output(sink);

        let toks = tokens("var = 1;\nprint \"ok\";");
        let mut parser = Parser::new(&toks);
        let (statements, errors) = parser.parse();
        assert_eq!(errors.len(), 1);

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("clean resolve");
        interpreter.interpret(&statements).expect("clean run");

        let printed = String::from_utf8(buffer.borrow().clone()).expect("utf8 output");
        assert_eq!(printed, "ok\n");
    }

    // ─────────────────────── session continuity ─────────────────────────────

    #[test]
    fn test_state_persists_across_program_units() {
        // Two separately parsed units sharing one interpreter, the way the
        // REPL drives it: node ids continue from where the first unit
        // stopped so the binding side table never collides.
        let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let sink: Rc<RefCell<dyn Write>> = buffer.clone();
        let mut interpreter = Interpreter::with_output(sink);

        let first = tokens(
            "var counter = 0;
             fun bump() {
               counter = counter + 1;
               return counter;
             }",
        );
        let mut parser = Parser::new(&first);
        let (statements, errors) = parser.parse();
        assert!(errors.is_empty());
        let next_id = parser.next_node_id();

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("clean resolve");
        interpreter.interpret(&statements).expect("clean run");

        let second = tokens("print bump(); print bump();");
        let mut parser = Parser::resuming(&second, next_id);
        let (statements, errors) = parser.parse();
        assert!(errors.is_empty());

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("clean resolve");
        interpreter.interpret(&statements).expect("clean run");

        let printed = String::from_utf8(buffer.borrow().clone()).expect("utf8 output");
        assert_eq!(printed, "1\n2\n");
    }
}
