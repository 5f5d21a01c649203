//! Native operator table

/// Operator associativity, shared by native operators and the
/// `associativity` marker of custom operator declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Associativity {
    Left,
    Right,
    #[default]
    None,
}

impl Associativity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Associativity::Left => "left",
            Associativity::Right => "right",
            Associativity::None => "none",
        }
    }
}

/// How a native binary operator is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Assignment,
    Comparison,
    Logical,
    Arithmetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeOperator {
    pub symbol: &'static str,
    pub class: OperatorClass,
    pub associativity: Associativity,
    pub precedence: u32,
}

const fn op(
    symbol: &'static str,
    class: OperatorClass,
    associativity: Associativity,
    precedence: u32,
) -> NativeOperator {
    NativeOperator { symbol, class, associativity, precedence }
}

const NATIVE_BINARY: &[NativeOperator] = &[
    op("=", OperatorClass::Assignment, Associativity::Right, 90),
    op("+=", OperatorClass::Assignment, Associativity::Right, 90),
    op("-=", OperatorClass::Assignment, Associativity::Right, 90),
    op("*=", OperatorClass::Assignment, Associativity::Right, 90),
    op("/=", OperatorClass::Assignment, Associativity::Right, 90),
    op("%=", OperatorClass::Assignment, Associativity::Right, 90),
    op("||", OperatorClass::Logical, Associativity::Left, 110),
    op("&&", OperatorClass::Logical, Associativity::Left, 120),
    op("==", OperatorClass::Comparison, Associativity::None, 130),
    op("!=", OperatorClass::Comparison, Associativity::None, 130),
    op("<", OperatorClass::Comparison, Associativity::None, 130),
    op("<=", OperatorClass::Comparison, Associativity::None, 130),
    op(">", OperatorClass::Comparison, Associativity::None, 130),
    op(">=", OperatorClass::Comparison, Associativity::None, 130),
    op("+", OperatorClass::Arithmetic, Associativity::Left, 140),
    op("-", OperatorClass::Arithmetic, Associativity::Left, 140),
    op("*", OperatorClass::Arithmetic, Associativity::Left, 150),
    op("/", OperatorClass::Arithmetic, Associativity::Left, 150),
    op("%", OperatorClass::Arithmetic, Associativity::Left, 150),
];

pub fn native_binary(symbol: &str) -> Option<&'static NativeOperator> {
    NATIVE_BINARY.iter().find(|op| op.symbol == symbol)
}

/// Native prefix/postfix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryClass {
    Not,
    Negate,
    Plus,
    Increment,
    Decrement,
}

impl UnaryClass {
    /// Whether the operand is written through
    pub fn mutates(&self) -> bool {
        matches!(self, UnaryClass::Increment | UnaryClass::Decrement)
    }
}

pub fn native_unary(symbol: &str) -> Option<UnaryClass> {
    match symbol {
        "!" => Some(UnaryClass::Not),
        "-" => Some(UnaryClass::Negate),
        "+" => Some(UnaryClass::Plus),
        "++" => Some(UnaryClass::Increment),
        "--" => Some(UnaryClass::Decrement),
        _ => None,
    }
}
