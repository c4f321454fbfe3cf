//! Expression AST nodes

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean or null literal
    Literal(Literal),

    /// Interpolated string: literal text and embedded expressions
    Template(Vec<TemplatePart>),

    /// List literal, evaluated element by element on every evaluation
    List(Vec<Expr>),

    /// Variable reference (`this` is an ordinary name bound by method calls)
    Var(String),

    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation
    Unary { op: UnOp, operand: Box<Expr> },

    /// `name = value`. Compound assignments are desugared by the parser
    /// into `name = name OP value`.
    Assign { name: String, value: Box<Expr> },

    /// Function call: callee(args...)
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Indexer read: target[index]
    Index { target: Box<Expr>, index: Box<Expr> },

    /// Indexer write: target[index] = value
    IndexSet {
        target: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },

    /// Member read: object.name
    Member { object: Box<Expr>, name: String },

    /// Member write: object.name = value
    MemberSet {
        object: Box<Expr>,
        name: String,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn number(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Expr {
        Expr::Literal(Literal::String(s.into()))
    }

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Literal values known at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// Piece of an interpolated string
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    /// `//`, truncating division
    IntDiv,
    Rem,
    Pow,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    /// Operators a class may overload with an `operator` member.
    pub fn is_overloadable(self) -> bool {
        !matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::IntDiv => write!(f, "//"),
            BinOp::Rem => write!(f, "%"),
            BinOp::Pow => write!(f, "**"),
            BinOp::BitAnd => write!(f, "&"),
            BinOp::BitOr => write!(f, "|"),
            BinOp::BitXor => write!(f, "^"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Le => write!(f, "<="),
            BinOp::Gt => write!(f, ">"),
            BinOp::Ge => write!(f, ">="),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Unary plus, numeric coercion
    Plus,
    /// Negation (-)
    Neg,
    /// Logical not (!)
    Not,
    /// Bitwise inversion (~)
    BitNot,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Plus => write!(f, "+"),
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
            UnOp::BitNot => write!(f, "~"),
        }
    }
}
