//! AST contract with the external parser.
//!
//! The shapes here are the input contract of the code generator; the parser
//! producing them lives outside this crate. Constructor helpers keep tests
//! and embedders terse.

/// A parsed module: the compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module name; feeds class-id hashing and the APP section.
    pub name: String,
    /// Classes in declaration order.
    pub classes: Vec<Class>,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// Class name.
    pub name: String,
    /// Parent class name, when the class extends another.
    pub parent: Option<String>,
    /// Object variables in declaration order.
    pub fields: Vec<Field>,
    /// Methods in declaration order.
    pub methods: Vec<Method>,
}

/// An object-variable declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Nominal type name.
    pub type_name: String,
}

/// Whether a method returns a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// No return value.
    Procedure,
    /// Returns a value.
    Function,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Nominal type name.
    pub type_name: String,
}

/// A procedure or function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// Procedure or function.
    pub kind: MethodKind,
    /// Formal parameters in declaration order.
    pub params: Vec<Param>,
    /// Return type name for functions.
    pub return_type: Option<String>,
    /// Statement body.
    pub body: Vec<Stmt>,
}

/// One arm of an if/elseif chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfArm {
    /// Arm condition.
    pub cond: Expr,
    /// Arm body.
    pub body: Vec<Stmt>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `var name := init` — declares a method local.
    VarDecl {
        /// Local name.
        name: String,
        /// Optional nominal type.
        type_name: Option<String>,
        /// Optional initializer; the slot is zeroed otherwise.
        init: Option<Expr>,
    },
    /// `name := value` — assigns a local or an object field.
    Assign {
        /// Assigned name; resolved against locals first, then fields.
        name: String,
        /// Right-hand side.
        value: Expr,
    },
    /// If / elseif / else chain.
    If {
        /// Condition arms in order.
        arms: Vec<IfArm>,
        /// Else body; may be empty.
        else_body: Vec<Stmt>,
    },
    /// `while cond do body`.
    While {
        /// Loop condition.
        cond: Expr,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// `for var := from to to do body` (inclusive, ascending).
    For {
        /// Loop variable.
        var: String,
        /// Start value.
        from: Expr,
        /// Inclusive end value.
        to: Expr,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// `return` with an optional value.
    Return(Option<Expr>),
    /// An expression evaluated for its effects.
    Expr(Expr),
    /// A nested block.
    Block(Vec<Stmt>),
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal.
    IntLiteral(i64),
    /// String literal; interned at emit time.
    StrLiteral(String),
    /// Identifier: a local, or an object field of the enclosing class.
    Ident(String),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Method, procedure or function call. A missing receiver is a call on
    /// the enclosing object; the receiver `system` routes intrinsics.
    Call {
        /// Receiver expression.
        receiver: Option<Box<Expr>>,
        /// Method name.
        method: String,
        /// Arguments in order.
        args: Vec<Expr>,
    },
    /// Explicit field access on an object expression.
    FieldAccess {
        /// Object expression.
        object: Box<Expr>,
        /// Field name.
        field: String,
    },
    /// `new Class(args...)`.
    New {
        /// Class name.
        class: String,
        /// Constructor arguments.
        args: Vec<Expr>,
    },
}

/// Binary operators of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+` — arithmetic add or string concatenation, decided by the
    /// source-shape heuristic.
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `^` — integer exponentiation.
    Pow,
    /// `%`
    Mod,
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `<`
    Less,
    /// `<=`
    Leq,
    /// `>`
    Greater,
    /// `>=`
    Geq,
    /// `and`
    And,
    /// `or`
    Or,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

/// Unary operators of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not.
    Not,
    /// Odd test.
    Odd,
}

impl Expr {
    /// Integer literal.
    pub fn int(v: i64) -> Self {
        Self::IntLiteral(v)
    }

    /// String literal.
    pub fn str(s: &str) -> Self {
        Self::StrLiteral(s.to_string())
    }

    /// Identifier.
    pub fn ident(name: &str) -> Self {
        Self::Ident(name.to_string())
    }

    /// Binary operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Call with an explicit receiver.
    pub fn method_call(receiver: Expr, method: &str, args: Vec<Expr>) -> Self {
        Self::Call {
            receiver: Some(Box::new(receiver)),
            method: method.to_string(),
            args,
        }
    }

    /// Call without a receiver (sibling method or intrinsic).
    pub fn call(method: &str, args: Vec<Expr>) -> Self {
        Self::Call {
            receiver: None,
            method: method.to_string(),
            args,
        }
    }

    /// `new Class(args...)`.
    pub fn new_object(class: &str, args: Vec<Expr>) -> Self {
        Self::New {
            class: class.to_string(),
            args,
        }
    }
}

impl Stmt {
    /// `writeln(arg)` statement.
    pub fn writeln(arg: Expr) -> Self {
        Self::Expr(Expr::call("writeln", vec![arg]))
    }

    /// `var name := init`.
    pub fn var(name: &str, init: Expr) -> Self {
        Self::VarDecl {
            name: name.to_string(),
            type_name: None,
            init: Some(init),
        }
    }

    /// `name := value`.
    pub fn assign(name: &str, value: Expr) -> Self {
        Self::Assign {
            name: name.to_string(),
            value,
        }
    }
}

impl Module {
    /// A module whose `App` class holds a single `Main` procedure with the
    /// given body. The shape every executable scenario starts from.
    pub fn executable(name: &str, main_body: Vec<Stmt>) -> Self {
        Self {
            name: name.to_string(),
            classes: vec![Class {
                name: "App".to_string(),
                parent: None,
                fields: Vec::new(),
                methods: vec![Method {
                    name: "Main".to_string(),
                    kind: MethodKind::Procedure,
                    params: Vec::new(),
                    return_type: None,
                    body: main_body,
                }],
            }],
        }
    }
}
