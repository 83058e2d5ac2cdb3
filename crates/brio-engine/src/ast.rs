//! Brio AST
//!
//! The typed tree the lowering pipeline consumes. The parser producing it
//! lives upstream; within this crate the tree is immutable input. Every node
//! kind is a closed enum so lowering can match exhaustively.

/// Byte range of a node in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A whole program: the top-level declaration list
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Top-level statements (class/function declarations and imports)
    pub statements: Vec<Statement>,
}

/// A declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    /// 1-bit boolean
    Boolean,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 16-bit float
    Float16,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Immutable string
    Str,
    /// Array with the given element type
    Array(Box<TypeName>),
    /// A user-declared class
    Class(String),
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Boolean => write!(f, "boolean"),
            TypeName::Int8 => write!(f, "int8"),
            TypeName::Int16 => write!(f, "int16"),
            TypeName::Int32 => write!(f, "int32"),
            TypeName::Int64 => write!(f, "int64"),
            TypeName::Float16 => write!(f, "float16"),
            TypeName::Float32 => write!(f, "float32"),
            TypeName::Float64 => write!(f, "float64"),
            TypeName::Str => write!(f, "string"),
            TypeName::Array(elem) => write!(f, "[]{}", elem),
            TypeName::Class(name) => write!(f, "{}", name),
        }
    }
}

/// A lexical block: `{ ... }`
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Statements in source order
    pub statements: Vec<Statement>,
    /// Source span
    pub span: Span,
}

/// A statement
#[derive(Debug, Clone)]
pub enum Statement {
    /// `say name: ty = init;`
    VariableDecl(VariableDecl),
    /// An expression in statement position (assignment, call, new)
    Expression(ExpressionStmt),
    /// `if (cond) { ... } else { ... }`
    If(IfStmt),
    /// `while (cond) { ... }`
    While(WhileStmt),
    /// `for name in range { ... }`
    Foreach(ForeachStmt),
    /// `break;`
    Break(BreakStmt),
    /// `return expr;`
    Return(ReturnStmt),
    /// `class Name : Parent { ... }`
    ClassDecl(ClassDecl),
    /// `fn name(params) -> ty { ... }`
    FunctionDecl(FunctionDecl),
    /// `import module;`
    Import(ImportStmt),
}

/// Variable declaration
#[derive(Debug, Clone)]
pub struct VariableDecl {
    /// Binding name
    pub name: String,
    /// Declared type
    pub ty: TypeName,
    /// Optional initializer; the declared type's zero value when absent
    pub initializer: Option<Expression>,
    /// Source span
    pub span: Span,
}

/// Expression statement
#[derive(Debug, Clone)]
pub struct ExpressionStmt {
    /// The expression
    pub expression: Expression,
    /// Source span
    pub span: Span,
}

/// If statement
#[derive(Debug, Clone)]
pub struct IfStmt {
    /// Condition, coerced to boolean
    pub condition: Expression,
    /// Taken branch
    pub then_branch: Block,
    /// Optional else branch
    pub else_branch: Option<Block>,
    /// Source span
    pub span: Span,
}

/// While loop
#[derive(Debug, Clone)]
pub struct WhileStmt {
    /// Condition, re-evaluated each iteration
    pub condition: Expression,
    /// Loop body
    pub body: Block,
    /// Source span
    pub span: Span,
}

/// For-over-range loop
#[derive(Debug, Clone)]
pub struct ForeachStmt {
    /// Induction variable name, scoped to the loop
    pub binding: String,
    /// The iterated range expression
    pub iterable: Expression,
    /// Loop body
    pub body: Block,
    /// Source span
    pub span: Span,
}

/// Break statement
#[derive(Debug, Clone)]
pub struct BreakStmt {
    /// Source span
    pub span: Span,
}

/// Return statement
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    /// Returned value; `None` for a bare return
    pub value: Option<Expression>,
    /// Source span
    pub span: Span,
}

/// Class declaration
#[derive(Debug, Clone)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Parent class name, if any
    pub parent: Option<String>,
    /// Fields in declaration order
    pub fields: Vec<FieldDecl>,
    /// Methods; the one named like the class is the constructor
    pub methods: Vec<FunctionDecl>,
    /// Source span
    pub span: Span,
}

/// Field declaration within a class body
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeName,
    /// Initializer evaluated at construction; zero value when absent
    pub initializer: Option<Expression>,
    /// Source span
    pub span: Span,
}

/// Function or method declaration
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// Function name
    pub name: String,
    /// Declared parameters (the receiver is implicit)
    pub params: Vec<Param>,
    /// Declared return type; `None` for void
    pub return_type: Option<TypeName>,
    /// Body
    pub body: Block,
    /// Source span
    pub span: Span,
}

/// A declared parameter
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: TypeName,
    /// Source span
    pub span: Span,
}

/// Import of a builtin module
#[derive(Debug, Clone)]
pub struct ImportStmt {
    /// Module name (`io`, `array`, `types`)
    pub module: String,
    /// Source span
    pub span: Span,
}

/// An expression
#[derive(Debug, Clone)]
pub enum Expression {
    /// A name
    Symbol(SymbolExpr),
    /// Numeric literal; always a 64-bit float until cast to a target type
    Number(NumberExpr),
    /// String literal
    Str(StringExpr),
    /// `new Class(args)`
    New(NewExpr),
    /// `object.property`
    Member(MemberExpr),
    /// `target[i, j]`
    Indexed(IndexedExpr),
    /// `-x` or `!x`
    Prefix(PrefixExpr),
    /// `callee(args)`
    Call(CallExpr),
    /// `left op right`
    Binary(BinaryExpr),
    /// `lower..upper` (upper-exclusive)
    Range(RangeExpr),
    /// `target = value`
    Assignment(AssignExpr),
}

impl Expression {
    /// Source span of the expression
    pub fn span(&self) -> Span {
        match self {
            Expression::Symbol(e) => e.span,
            Expression::Number(e) => e.span,
            Expression::Str(e) => e.span,
            Expression::New(e) => e.span,
            Expression::Member(e) => e.span,
            Expression::Indexed(e) => e.span,
            Expression::Prefix(e) => e.span,
            Expression::Call(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Range(e) => e.span,
            Expression::Assignment(e) => e.span,
        }
    }
}

/// Name reference
#[derive(Debug, Clone)]
pub struct SymbolExpr {
    /// The referenced name
    pub name: String,
    /// Source span
    pub span: Span,
}

/// Numeric literal
#[derive(Debug, Clone)]
pub struct NumberExpr {
    /// The literal value
    pub value: f64,
    /// Source span
    pub span: Span,
}

/// String literal
#[derive(Debug, Clone)]
pub struct StringExpr {
    /// The literal value
    pub value: String,
    /// Source span
    pub span: Span,
}

/// Object construction
#[derive(Debug, Clone)]
pub struct NewExpr {
    /// Class name
    pub class: String,
    /// Constructor arguments
    pub args: Vec<Expression>,
    /// Source span
    pub span: Span,
}

/// Member access
#[derive(Debug, Clone)]
pub struct MemberExpr {
    /// The receiver expression
    pub object: Box<Expression>,
    /// Accessed member name
    pub property: String,
    /// Source span
    pub span: Span,
}

/// Indexed array access
#[derive(Debug, Clone)]
pub struct IndexedExpr {
    /// The indexed expression
    pub target: Box<Expression>,
    /// One index per dimension
    pub indices: Vec<Expression>,
    /// Source span
    pub span: Span,
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    /// Numeric negation
    Neg,
    /// Boolean complement
    Not,
}

impl std::fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixOp::Neg => write!(f, "-"),
            PrefixOp::Not => write!(f, "!"),
        }
    }
}

/// Prefix expression
#[derive(Debug, Clone)]
pub struct PrefixExpr {
    /// The operator
    pub op: PrefixOp,
    /// The operand
    pub operand: Box<Expression>,
    /// Source span
    pub span: Span,
}

/// Call expression; the callee is a symbol (`module.func` member form) or a
/// member access on an instance
#[derive(Debug, Clone)]
pub struct CallExpr {
    /// The called expression
    pub callee: Box<Expression>,
    /// Arguments in order
    pub args: Vec<Expression>,
    /// Source span
    pub span: Span,
}

/// Binary operator categories; each fixes the operand coercion and result
/// type of its operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryCategory {
    /// `+ - * / %`: float operands, float result
    Arithmetic,
    /// `< <= > >= == !=`: float (or pointer) operands, boolean result
    Comparison,
    /// `&& ||`: boolean operands, boolean result
    Logical,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// The operator's fixed category
    pub fn category(&self) -> BinaryCategory {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                BinaryCategory::Arithmetic
            }
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => BinaryCategory::Comparison,
            BinaryOp::And | BinaryOp::Or => BinaryCategory::Logical,
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

/// Binary expression
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    /// The operator
    pub op: BinaryOp,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
    /// Source span
    pub span: Span,
}

/// Range expression, upper bound exclusive
#[derive(Debug, Clone)]
pub struct RangeExpr {
    /// Lower bound (inclusive)
    pub lower: Box<Expression>,
    /// Upper bound (exclusive)
    pub upper: Box<Expression>,
    /// Source span
    pub span: Span,
}

/// Assignment expression; the target is a symbol, member, or indexed access
#[derive(Debug, Clone)]
pub struct AssignExpr {
    /// Assignment target
    pub target: Box<Expression>,
    /// Assigned value
    pub value: Box<Expression>,
    /// Source span
    pub span: Span,
}
