//! Expression tree for time-dependent source values.

/// Binary operators, grouped by precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Xor,
    Or,
}

impl BinaryOp {
    /// Lowest precedence level (binds loosest).
    pub const LOOSEST: u8 = 8;

    /// Parse an operator symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "**" => Self::Pow,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "+" => Self::Add,
            "-" => Self::Sub,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "&" => Self::And,
            "^" => Self::Xor,
            "|" => Self::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Precedence level, 1 binds tightest.
    ///
    /// | Level | Operators |
    /// |-------|-----------|
    /// | 1 | `**` |
    /// | 2 | `* / %` |
    /// | 3 | `+ -` |
    /// | 4 | `< <= > >=` |
    /// | 5 | `== !=` |
    /// | 6 | `&` |
    /// | 7 | `^` |
    /// | 8 | `\|` |
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Pow => 1,
            Self::Mul | Self::Div | Self::Rem => 2,
            Self::Add | Self::Sub => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Eq | Self::Ne => 5,
            Self::And => 6,
            Self::Xor => 7,
            Self::Or => 8,
        }
    }

    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::Pow => a.powf(b),
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Rem => floored_rem(a, b),
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Lt => truth(a < b),
            Self::Le => truth(a <= b),
            Self::Gt => truth(a > b),
            Self::Ge => truth(a >= b),
            Self::Eq => truth(a == b),
            Self::Ne => truth(a != b),
            Self::And => truth(a != 0.0 && b != 0.0),
            Self::Xor => truth((a != 0.0) != (b != 0.0)),
            Self::Or => truth(a != 0.0 || b != 0.0),
        }
    }
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Remainder with the sign of the divisor.
fn floored_rem(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

/// Single-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Abs,
    Floor,
    Sqrt,
    Exp,
    Ln,
}

impl Function {
    pub const ALL: [(&'static str, Function); 11] = [
        ("sin", Self::Sin),
        ("cos", Self::Cos),
        ("tan", Self::Tan),
        ("asin", Self::Asin),
        ("acos", Self::Acos),
        ("atan", Self::Atan),
        ("abs", Self::Abs),
        ("floor", Self::Floor),
        ("sqrt", Self::Sqrt),
        ("exp", Self::Exp),
        ("ln", Self::Ln),
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, f)| f)
    }

    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Abs => x.abs(),
            Self::Floor => x.floor(),
            Self::Sqrt => x.sqrt(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
        }
    }
}

/// Named constants.
pub const CONSTANTS: [(&str, f64); 2] = [("e", std::f64::consts::E), ("pi", std::f64::consts::PI)];

/// The only free variable.
pub const TIME_VARIABLE: &str = "t";

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// The time variable `t`
    Time,
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        arg: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate at time `t`.
    pub fn eval(&self, t: f64) -> f64 {
        match self {
            Self::Number(v) => *v,
            Self::Time => t,
            Self::Negate(e) => -e.eval(t),
            Self::Binary { op, lhs, rhs } => op.apply(lhs.eval(t), rhs.eval(t)),
            Self::Call { function, arg } => function.apply(arg.eval(t)),
        }
    }

    /// Whether the expression depends on `t`.
    pub fn uses_time(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Time => true,
            Self::Negate(e) => e.uses_time(),
            Self::Binary { lhs, rhs, .. } => lhs.uses_time() || rhs.uses_time(),
            Self::Call { arg, .. } => arg.uses_time(),
        }
    }
}

/// Comma separated list of every identifier the lexer accepts.
pub fn supported_identifiers() -> String {
    Function::ALL
        .iter()
        .map(|(name, _)| *name)
        .chain(CONSTANTS.iter().map(|(name, _)| *name))
        .chain(std::iter::once(TIME_VARIABLE))
        .collect::<Vec<_>>()
        .join(", ")
}
