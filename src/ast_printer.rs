use crate::expr::{Expr, LiteralValue};

/// Converts an expression to the Crafting‑Interpreters prefix form
/// (no heap allocations except `String` joins for output).
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── unary operator ──────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            // ── binary / logical operators ──────────────────────────────
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── variables and assignment ────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s: String = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => {
                format!("(. {} {})", Self::print(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }
}
