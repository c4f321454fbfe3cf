//! Abstract Syntax Tree definitions

mod expr;
mod span;
mod types;

pub use expr::*;
pub use span::*;
pub use types::*;

use std::rc::Rc;

/// A program is a sequence of top-level statements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression evaluated for its value
    Expr(Expr),

    /// `var name[: Type] [= value]`
    Var {
        name: String,
        ty: Option<BailaType>,
        value: Option<Expr>,
    },

    /// `const name = value`
    Const { name: String, value: Expr },

    /// `function name(params)[: Type] body`
    Function(Rc<FunctionDecl>),

    /// `class Name [: Base, ...] { members }`
    Class(Rc<ClassDecl>),

    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `for var = start to end [step step] body`
    For {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Box<Stmt>,
    },

    While { cond: Expr, body: Box<Stmt> },

    DoWhile { body: Box<Stmt>, cond: Expr },

    Return(Option<Expr>),

    /// `{ ... }`, evaluated in its own scope
    Block(Vec<Stmt>),
}

/// Function, method, constructor, operator, getter and setter bodies all
/// share this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<BailaType>,
    pub body: Rc<Stmt>,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: BailaType,
    pub default: Option<Rc<Expr>>,
}

impl Param {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub bases: Vec<BailaType>,
    pub members: Vec<MemberDecl>,
}

/// Member visibility, `private` unless stated otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accessibility {
    Public,
    #[default]
    Private,
    Protected,
}

impl std::fmt::Display for Accessibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Accessibility::Public => write!(f, "public"),
            Accessibility::Private => write!(f, "private"),
            Accessibility::Protected => write!(f, "protected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDecl {
    pub access: Accessibility,
    pub is_static: bool,
    pub kind: MemberKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    /// `var`/`const` field
    Field {
        name: String,
        readonly: bool,
        ty: Option<BailaType>,
        value: Option<Expr>,
    },
    /// `prop name[: Type] { get ...; set ... } [= value]`
    Property {
        name: String,
        ty: Option<BailaType>,
        getter: Option<Rc<FunctionDecl>>,
        setter: Option<Rc<FunctionDecl>>,
        value: Option<Expr>,
    },
    Method(Rc<FunctionDecl>),
    Constructor(Rc<FunctionDecl>),
    Operator(OperatorDecl),
}

impl MemberKind {
    pub fn name(&self) -> &str {
        match self {
            MemberKind::Field { name, .. } | MemberKind::Property { name, .. } => name,
            MemberKind::Method(decl) | MemberKind::Constructor(decl) => &decl.name,
            MemberKind::Operator(op) => &op.decl().name,
        }
    }
}

/// `operator OP (params) body`
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorDecl {
    Binary { op: BinOp, decl: Rc<FunctionDecl> },
    Unary { op: UnOp, decl: Rc<FunctionDecl> },
}

impl OperatorDecl {
    pub fn decl(&self) -> &Rc<FunctionDecl> {
        match self {
            OperatorDecl::Binary { decl, .. } | OperatorDecl::Unary { decl, .. } => decl,
        }
    }
}
