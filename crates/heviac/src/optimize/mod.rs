//! Optimization visitors
//!
//! Folds native operators over literal operands. The folded value is
//! recorded in the node's `constant` annotation; the tree keeps its shape
//! and emitters decide whether to print the folded value.

use crate::ast::{Constant, Literal, LiteralKind, Name, NodeId, NodeKind};
use crate::common::CompileResult;
use crate::types::{native_binary, native_unary, OperatorClass, UnaryClass};
use crate::walk::Walker;
use tracing::trace;

impl Walker<'_> {
    pub(crate) fn visit_optimization(&mut self, id: NodeId) -> CompileResult<()> {
        let folded = match self.ast.kind(id) {
            NodeKind::Literal(lit) => self.literal_constant(lit),
            NodeKind::Binary {
                operator,
                left,
                right,
            } => self.fold_binary(*operator, *left, *right),
            NodeKind::Unary {
                operator,
                argument,
                prefix: true,
            } => self.fold_unary(*operator, *argument),
            _ => None,
        };
        if let Some(constant) = folded {
            if !matches!(self.ast.kind(id), NodeKind::Literal(_)) {
                trace!(node = %id, ?constant, "folded");
            }
            self.ast.ann_mut(id).constant = Some(constant);
        }
        Ok(())
    }

    fn literal_constant(&self, lit: &Literal) -> Option<Constant> {
        let text = self.ast.name(lit.value);
        match lit.kind {
            LiteralKind::Number if text.contains('.') => text.parse().ok().map(Constant::Double),
            LiteralKind::Number => text.parse().ok().map(Constant::Int),
            LiteralKind::Boolean => Some(Constant::Boolean(text == "true")),
            _ => None,
        }
    }

    fn fold_binary(&self, operator: Name, left: NodeId, right: NodeId) -> Option<Constant> {
        // Custom operators shadow natives of the same symbol
        if self.custom_operator(operator).is_some() {
            return None;
        }
        let symbol = self.ast.name(operator);
        let native = native_binary(symbol)?;
        let lhs = self.ast.ann(left).constant?;
        let rhs = self.ast.ann(right).constant?;
        match native.class {
            OperatorClass::Arithmetic => fold_arithmetic(symbol, lhs, rhs),
            OperatorClass::Comparison => fold_comparison(symbol, lhs, rhs),
            OperatorClass::Logical => match (lhs, rhs) {
                (Constant::Boolean(a), Constant::Boolean(b)) => {
                    Some(Constant::Boolean(if symbol == "&&" { a && b } else { a || b }))
                }
                _ => None,
            },
            OperatorClass::Assignment => None,
        }
    }

    fn fold_unary(&self, operator: Name, argument: NodeId) -> Option<Constant> {
        let value = self.ast.ann(argument).constant?;
        match (native_unary(self.ast.name(operator))?, value) {
            (UnaryClass::Not, Constant::Boolean(b)) => Some(Constant::Boolean(!b)),
            (UnaryClass::Negate, Constant::Int(v)) => v.checked_neg().map(Constant::Int),
            (UnaryClass::Negate, Constant::Double(v)) => Some(Constant::Double(-v)),
            (UnaryClass::Plus, value @ (Constant::Int(_) | Constant::Double(_))) => Some(value),
            _ => None,
        }
    }
}

fn fold_arithmetic(symbol: &str, lhs: Constant, rhs: Constant) -> Option<Constant> {
    match (lhs, rhs) {
        (Constant::Int(a), Constant::Int(b)) => match symbol {
            "+" => a.checked_add(b),
            "-" => a.checked_sub(b),
            "*" => a.checked_mul(b),
            "/" => a.checked_div(b),
            "%" => a.checked_rem(b),
            _ => None,
        }
        .map(Constant::Int),
        (Constant::Double(a), Constant::Double(b)) => {
            let value = match symbol {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" if b != 0.0 => a / b,
                "%" if b != 0.0 => a % b,
                _ => return None,
            };
            Some(Constant::Double(value))
        }
        _ => None,
    }
}

fn fold_comparison(symbol: &str, lhs: Constant, rhs: Constant) -> Option<Constant> {
    let ordering = match (lhs, rhs) {
        (Constant::Int(a), Constant::Int(b)) => Some(a.cmp(&b)),
        (Constant::Double(a), Constant::Double(b)) => a.partial_cmp(&b),
        (Constant::Boolean(a), Constant::Boolean(b)) => match symbol {
            "==" => return Some(Constant::Boolean(a == b)),
            "!=" => return Some(Constant::Boolean(a != b)),
            _ => return None,
        },
        _ => return None,
    }?;
    let value = match symbol {
        "==" => ordering.is_eq(),
        "!=" => ordering.is_ne(),
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        ">=" => ordering.is_ge(),
        _ => return None,
    };
    Some(Constant::Boolean(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_arithmetic() {
        assert_eq!(
            fold_arithmetic("+", Constant::Int(2), Constant::Int(3)),
            Some(Constant::Int(5))
        );
        assert_eq!(
            fold_arithmetic("*", Constant::Double(1.5), Constant::Double(2.0)),
            Some(Constant::Double(3.0))
        );
    }

    #[test]
    fn test_division_by_zero_is_not_folded() {
        assert_eq!(fold_arithmetic("/", Constant::Int(1), Constant::Int(0)), None);
        assert_eq!(fold_arithmetic("%", Constant::Int(1), Constant::Int(0)), None);
        assert_eq!(
            fold_arithmetic("/", Constant::Double(1.0), Constant::Double(0.0)),
            None
        );
    }

    #[test]
    fn test_overflow_is_not_folded() {
        assert_eq!(fold_arithmetic("+", Constant::Int(i64::MAX), Constant::Int(1)), None);
    }

    #[test]
    fn test_fold_comparison() {
        assert_eq!(
            fold_comparison("<", Constant::Int(1), Constant::Int(2)),
            Some(Constant::Boolean(true))
        );
        assert_eq!(
            fold_comparison("!=", Constant::Boolean(true), Constant::Boolean(true)),
            Some(Constant::Boolean(false))
        );
        assert_eq!(fold_comparison("<", Constant::Boolean(true), Constant::Boolean(false)), None);
    }
}
