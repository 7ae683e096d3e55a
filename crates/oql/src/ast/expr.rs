//! Expression and condition nodes.
//!
//! `Expr` is the one genuinely recursive structure; construction is strictly
//! bottom-up during parsing, so cycles are impossible. Conditions are either
//! a leaf comparison or a pure grouping wrapper, never both.

use serde::Serialize;
use std::fmt;

/// Scalar literal. Numbers keep their raw text; each translator resolves the
/// concrete type when it emits (quoted SQL string vs JSON number, etc.).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Number(String),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Column reference: `age`, `user.name`
    Field(String),
    Literal(Literal),
    /// `*` in a projection
    Wildcard,
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// `upper(name)`, `concat(a, b)`
    Function { name: String, args: Vec<Expr> },
    /// `CASE WHEN cond THEN value ... [ELSE value] END`
    CaseWhen {
        branches: Vec<CaseBranch>,
        otherwise: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseBranch {
    pub when: Vec<Condition>,
    pub then: Expr,
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(name.into())
    }

    pub fn number(text: impl Into<String>) -> Self {
        Expr::Literal(Literal::Number(text.into()))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(text.into()))
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// The column name if this is a bare field reference.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Expr::Field(name) => Some(name),
            _ => None,
        }
    }
}

/// Comparison operator of a leaf condition. Parsed once from the token
/// stream; consumers match on the enum, never on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    Between,
    NotBetween,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    /// Single boundary from normalized operator-token text to the enum.
    pub fn from_token(text: &str) -> Option<Self> {
        Some(match text {
            "=" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            "LIKE" => CompareOp::Like,
            "NOT LIKE" => CompareOp::NotLike,
            "BETWEEN" => CompareOp::Between,
            "NOT BETWEEN" => CompareOp::NotBetween,
            "IN" => CompareOp::In,
            "NOT IN" => CompareOp::NotIn,
            "IS NULL" => CompareOp::IsNull,
            _ => return None,
        })
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::Between => "BETWEEN",
            CompareOp::NotBetween => "NOT BETWEEN",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT IN",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
        }
    }
}

/// How a condition joins to the *previous* condition in its sibling list.
/// Element 0 of any list is always `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Logic {
    #[default]
    None,
    And,
    Or,
}

/// Leaf comparison payload. `value2` is only set for BETWEEN, `values` only
/// for IN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub field: Expr,
    pub op: CompareOp,
    pub value: Option<Expr>,
    pub value2: Option<Expr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConditionNode {
    Compare(Comparison),
    /// Parenthesized group of child conditions.
    Group(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub logic: Logic,
    pub node: ConditionNode,
}

impl Condition {
    pub fn compare(logic: Logic, cmp: Comparison) -> Self {
        Condition {
            logic,
            node: ConditionNode::Compare(cmp),
        }
    }

    pub fn group(logic: Logic, children: Vec<Condition>) -> Self {
        Condition {
            logic,
            node: ConditionNode::Group(children),
        }
    }
}

// ============ Display (canonical single-line rendering) ============

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => f.write_str(n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Literal::Bool(true) => f.write_str("true"),
            Literal::Bool(false) => f.write_str("false"),
            Literal::Null => f.write_str("NULL"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(name) => f.write_str(name),
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::Wildcard => f.write_str("*"),
            Expr::Binary { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::CaseWhen {
                branches,
                otherwise,
            } => {
                f.write_str("CASE")?;
                for branch in branches {
                    f.write_str(" WHEN ")?;
                    write_conditions(f, &branch.when)?;
                    write!(f, " THEN {}", branch.then)?;
                }
                if let Some(e) = otherwise {
                    write!(f, " ELSE {e}")?;
                }
                f.write_str(" END")
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            ConditionNode::Compare(cmp) => write!(f, "{cmp}"),
            ConditionNode::Group(children) => {
                f.write_str("(")?;
                write_conditions(f, children)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            CompareOp::IsNull | CompareOp::IsNotNull => {
                write!(f, "{} {}", self.field, self.op.as_sql())
            }
            CompareOp::Between | CompareOp::NotBetween => {
                let lo = self.value.as_ref().map(ToString::to_string).unwrap_or_default();
                let hi = self.value2.as_ref().map(ToString::to_string).unwrap_or_default();
                write!(f, "{} {} {lo} AND {hi}", self.field, self.op.as_sql())
            }
            CompareOp::In | CompareOp::NotIn => {
                write!(f, "{} {} (", self.field, self.op.as_sql())?;
                for (i, v) in self.values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            _ => {
                let v = self.value.as_ref().map(ToString::to_string).unwrap_or_default();
                write!(f, "{} {} {v}", self.field, self.op.as_sql())
            }
        }
    }
}

fn write_conditions(f: &mut fmt::Formatter<'_>, conditions: &[Condition]) -> fmt::Result {
    for (i, cond) in conditions.iter().enumerate() {
        if i > 0 {
            match cond.logic {
                Logic::Or => f.write_str(" OR ")?,
                _ => f.write_str(" AND ")?,
            }
        }
        write!(f, "{cond}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_flat_comparison() {
        let cond = Condition::compare(
            Logic::None,
            Comparison {
                field: Expr::field("age"),
                op: CompareOp::Gt,
                value: Some(Expr::number("25")),
                value2: None,
                values: vec![],
            },
        );
        assert_eq!(cond.to_string(), "age > 25");
    }

    #[test]
    fn renders_between_and_in() {
        let between = Comparison {
            field: Expr::field("age"),
            op: CompareOp::Between,
            value: Some(Expr::number("18")),
            value2: Some(Expr::number("65")),
            values: vec![],
        };
        assert_eq!(between.to_string(), "age BETWEEN 18 AND 65");

        let within = Comparison {
            field: Expr::field("status"),
            op: CompareOp::In,
            value: None,
            value2: None,
            values: vec![Expr::string("active"), Expr::string("pending")],
        };
        assert_eq!(within.to_string(), "status IN ('active', 'pending')");
    }

    #[test]
    fn compare_op_round_trips_through_token_text() {
        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
            CompareOp::Like,
            CompareOp::Between,
            CompareOp::In,
        ] {
            assert_eq!(CompareOp::from_token(op.as_sql()), Some(op));
        }
    }
}
