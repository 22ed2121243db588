//! Operator table
//!
//! Every operator code has an arity, an input precedence (used when the
//! operator is the next token) and a stack precedence (used once it is
//! pending on the parser's operator stack). The parser reduces while the
//! pending operator's stack precedence is at least the incoming operator's
//! input precedence, so `input > stack` makes an operator right associative.
//!
//! Operators spelled with more than one token (`if .. then .. else`,
//! `.. ? .. : ..`, `.. is not ..`) list their sub-tokens. A sub-token is a
//! *prefix* when no operand comes before it.

use std::fmt;

/// Operator codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorCode {
    // Assignment
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    ModAssign,

    // Logic and bits
    /// `||`
    Or,
    /// `&&`
    And,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,

    // Comparison
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<=>` (three-way compare, yields an int)
    Cmp,

    // Arithmetic
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,

    // Prefix
    /// Unary `-`
    Neg,
    /// `!` or `not`
    Not,
    /// `~`
    BitNot,
    /// `return x`
    Return,
    /// `raise x`
    Raise,

    // Nullary
    /// `break`
    Break,
    /// `continue`
    Continue,

    // Multi-token
    /// `if c then a`
    IfThen,
    /// `if c then a else b`
    IfThenElse,
    /// `c ? a : b`
    Select,
    /// `a is T`
    Is,
    /// `a is not T`
    IsNot,

    /// `name(args...)`
    Call,
}

use OperatorCode::*;

/// One token of a multi-token operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubToken {
    /// Spelling
    pub text: &'static str,
    /// Expected with no operand before it
    pub prefix: bool,
}

const fn sub(text: &'static str, prefix: bool) -> SubToken {
    SubToken { text, prefix }
}

const IF_THEN: &[SubToken] = &[sub("if", true), sub("then", false)];
const IF_THEN_ELSE: &[SubToken] = &[sub("if", true), sub("then", false), sub("else", false)];
const SELECT: &[SubToken] = &[sub("?", false), sub(":", false)];
const IS: &[SubToken] = &[sub("is", false)];
const IS_NOT: &[SubToken] = &[sub("is", false), sub("not", true)];

/// Every operator with a sub-token sequence.
pub const SEQUENCES: &[OperatorCode] = &[IfThen, IfThenElse, Select, Is, IsNot];

impl OperatorCode {
    /// Number of operands.
    ///
    /// Calls take any number; this reports zero for them. The ternary
    /// sequences (`if c then a else b`, `c ? a : b`) are the only
    /// operators with three.
    pub fn num_operands(self) -> usize {
        match self {
            Break | Continue | Call => 0,
            Neg | Not | BitNot | Return | Raise => 1,
            IfThenElse | Select => 3,
            _ => 2,
        }
    }

    /// Precedence when the operator is the next unconsumed token.
    pub fn input_precedence(self) -> u8 {
        match self {
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | ModAssign => 10,
            Select => 15,
            Or => 20,
            And => 25,
            BitOr => 30,
            BitXor => 32,
            BitAnd => 34,
            Eq | Ne | Is | IsNot => 40,
            Lt | Le | Gt | Ge | Cmp => 45,
            Shl | Shr => 50,
            Add | Sub => 55,
            Mul | Div | Mod => 60,
            Neg | Not | BitNot | Return | Raise | IfThen | IfThenElse => 90,
            Break | Continue | Call => 100,
        }
    }

    /// Precedence once the operator is pending.
    ///
    /// For multi-token operators this is the precedence of the trailing
    /// operand: everything binding tighter is part of it.
    pub fn stack_precedence(self) -> u8 {
        match self {
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | ModAssign => 9,
            Select => 14,
            IfThen | IfThenElse => 8,
            Return | Raise => 5,
            Neg | Not | BitNot => 80,
            other => other.input_precedence(),
        }
    }

    /// Canonical spelling.
    pub fn spelling(self) -> &'static str {
        match self {
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            Or => "||",
            And => "&&",
            BitOr => "|",
            BitXor => "^",
            BitAnd => "&",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Cmp => "<=>",
            Shl => "<<",
            Shr => ">>",
            Add => "+",
            Sub | Neg => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Not => "!",
            BitNot => "~",
            Return => "return",
            Raise => "raise",
            Break => "break",
            Continue => "continue",
            IfThen | IfThenElse => "if",
            Select => "?",
            Is => "is",
            IsNot => "is not",
            Call => "()",
        }
    }

    /// Name of the actions implementing this operator.
    pub fn action_name(self) -> &'static str {
        match self {
            IfThen | IfThenElse | Select => "if",
            other => other.spelling(),
        }
    }

    /// Sub-tokens of a multi-token operator.
    pub fn sequence(self) -> Option<&'static [SubToken]> {
        match self {
            IfThen => Some(IF_THEN),
            IfThenElse => Some(IF_THEN_ELSE),
            Select => Some(SELECT),
            Is => Some(IS),
            IsNot => Some(IS_NOT),
            _ => None,
        }
    }

    /// Map a single-token spelling to its code.
    ///
    /// `prefix_position` is true when no operand precedes the token; it
    /// separates unary from binary minus.
    pub fn map_code(spelling: &str, prefix_position: bool) -> Option<OperatorCode> {
        let code = if prefix_position {
            match spelling {
                "-" => Neg,
                "!" | "not" => Not,
                "~" => BitNot,
                "return" => Return,
                "raise" => Raise,
                "break" => Break,
                "continue" => Continue,
                _ => return None,
            }
        } else {
            match spelling {
                "=" => Assign,
                "+=" => AddAssign,
                "-=" => SubAssign,
                "*=" => MulAssign,
                "/=" => DivAssign,
                "%=" => ModAssign,
                "||" => Or,
                "&&" => And,
                "|" => BitOr,
                "^" => BitXor,
                "&" => BitAnd,
                "==" => Eq,
                "!=" => Ne,
                "<" => Lt,
                "<=" => Le,
                ">" => Gt,
                ">=" => Ge,
                "<=>" => Cmp,
                "<<" => Shl,
                ">>" => Shr,
                "+" => Add,
                "-" => Sub,
                "*" => Mul,
                "/" => Div,
                "%" => Mod,
                _ => return None,
            }
        };
        Some(code)
    }

    /// Multi-token operators whose first sub-token is `spelling` in the
    /// given position.
    pub fn sequences_starting(spelling: &str, prefix_position: bool) -> Vec<OperatorCode> {
        SEQUENCES
            .iter()
            .copied()
            .filter(|code| {
                code.sequence()
                    .and_then(|seq| seq.first())
                    .is_some_and(|first| first.text == spelling && first.prefix == prefix_position)
            })
            .collect()
    }

    /// Check if the operator is one of `< <= > >= == !=`.
    pub fn is_relational(self) -> bool {
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }

    /// Check if the operator takes its operand after it.
    pub fn is_prefix(self) -> bool {
        matches!(self, Neg | Not | BitNot | Return | Raise)
    }

    /// Check if only the chosen branch of the operator is evaluated.
    pub fn is_conditional(self) -> bool {
        matches!(self, IfThen | IfThenElse | Select)
    }
}

impl fmt::Display for OperatorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}
