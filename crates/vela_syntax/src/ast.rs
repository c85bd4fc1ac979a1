//! Abstract syntax tree for the Vela language.
//!
//! The parser builds this tree once; it is never mutated afterwards. The
//! type checker records its results in side tables rather than writing back
//! into nodes, so every family here is a plain closed sum type with
//! exhaustive matching at each consumer.

use std::fmt;
use std::path::PathBuf;

use crate::location::{FileId, SourceLocation};
use crate::token::TokenKind;

// ============================================================================
// TYPES
// ============================================================================

/// Mutability qualifier attached to every type, independent of its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
    #[default]
    Mutable,
    Const,
}

/// Size of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    /// `T[n]`
    Known(i64),
    /// `T[]`
    Runtime,
    /// `T[?]`
    Unknown,
}

/// Named element of a tuple type.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub name: String,
    pub ty: Type,
}

/// Structural shape of a type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Basic { name: String, generic_args: Vec<Type> },
    Pointer(Box<Type>),
    Optional(Box<Type>),
    Array { element: Box<Type>, size: ArraySize },
    Tuple(Vec<TupleElement>),
    Function { return_type: Box<Type>, param_types: Vec<Type> },
}

/// A type with its mutability qualifier and source location.
///
/// Equality compares kind and mutability only; the location exists for
/// diagnostics.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub mutability: Mutability,
    pub location: SourceLocation,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.mutability == other.mutability
    }
}

impl Type {
    pub fn new(kind: TypeKind, mutability: Mutability, location: SourceLocation) -> Self {
        Self {
            kind,
            mutability,
            location,
        }
    }

    pub fn basic(name: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(
            TypeKind::Basic {
                name: name.into(),
                generic_args: Vec::new(),
            },
            Mutability::Mutable,
            location,
        )
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn is_basic_named(&self, name: &str) -> bool {
        matches!(&self.kind, TypeKind::Basic { name: n, generic_args } if n == name && generic_args.is_empty())
    }

    pub fn is_void(&self) -> bool {
        self.is_basic_named("void")
    }

    /// The pseudo-type of a `null` literal before conversion.
    pub fn is_null(&self) -> bool {
        self.is_basic_named("null")
    }

    /// The pseudo-type of an `undefined` literal.
    pub fn is_undefined(&self) -> bool {
        self.is_basic_named("undefined")
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, TypeKind::Optional(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mutability == Mutability::Const {
            write!(f, "const ")?;
        }
        match &self.kind {
            TypeKind::Basic { name, generic_args } => {
                write!(f, "{name}")?;
                if !generic_args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in generic_args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeKind::Pointer(pointee) => write!(f, "{pointee}*"),
            TypeKind::Optional(wrapped) => write!(f, "{wrapped}?"),
            TypeKind::Array { element, size } => match size {
                ArraySize::Known(n) => write!(f, "{element}[{n}]"),
                ArraySize::Runtime => write!(f, "{element}[]"),
                ArraySize::Unknown => write!(f, "{element}[?]"),
            },
            TypeKind::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", element.ty, element.name)?;
                }
                write!(f, ")")
            }
            TypeKind::Function {
                return_type,
                param_types,
            } => {
                write!(f, "{return_type}(")?;
                for (i, param) in param_types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// OPERATORS
// ============================================================================

/// Prefix and postfix unary operators, including `++`/`--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Deref,
    AddrOf,
    Not,
    BitNot,
    Increment,
    Decrement,
}

impl UnaryOp {
    pub fn from_token(kind: &TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::And => UnaryOp::AddrOf,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Increment => UnaryOp::Increment,
            TokenKind::Decrement => UnaryOp::Decrement,
            _ => return None,
        })
    }
}

/// Binary operators, including the assignment forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    And,
    Or,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
}

/// Precedence of the ternary `?:`, treated as a binary-precedence-level
/// construct by the expression parser.
pub const TERNARY_PRECEDENCE: i32 = 2;

impl BinaryOp {
    pub fn from_token(kind: &TokenKind) -> Option<Self> {
        use TokenKind as T;
        Some(match kind {
            T::Equal => BinaryOp::Equal,
            T::NotEqual => BinaryOp::NotEqual,
            T::Less => BinaryOp::Less,
            T::LessOrEqual => BinaryOp::LessOrEqual,
            T::Greater => BinaryOp::Greater,
            T::GreaterOrEqual => BinaryOp::GreaterOrEqual,
            T::Plus => BinaryOp::Add,
            T::Minus => BinaryOp::Sub,
            T::Star => BinaryOp::Mul,
            T::Slash => BinaryOp::Div,
            T::And => BinaryOp::BitAnd,
            T::Or => BinaryOp::BitOr,
            T::Xor => BinaryOp::BitXor,
            T::LeftShift => BinaryOp::Shl,
            T::RightShift => BinaryOp::Shr,
            T::AndAnd => BinaryOp::And,
            T::OrOr => BinaryOp::Or,
            T::Assign => BinaryOp::Assign,
            T::PlusEqual => BinaryOp::AddAssign,
            T::MinusEqual => BinaryOp::SubAssign,
            T::StarEqual => BinaryOp::MulAssign,
            T::SlashEqual => BinaryOp::DivAssign,
            T::AndEqual => BinaryOp::BitAndAssign,
            T::OrEqual => BinaryOp::BitOrAssign,
            T::XorEqual => BinaryOp::BitXorAssign,
            T::LeftShiftEqual => BinaryOp::ShlAssign,
            T::RightShiftEqual => BinaryOp::ShrAssign,
            T::AndAndEqual => BinaryOp::AndAssign,
            T::OrOrEqual => BinaryOp::OrAssign,
            _ => return None,
        })
    }

    pub fn is_assignment(&self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | BitAndAssign | BitOrAssign
                | BitXorAssign | ShlAssign | ShrAssign | AndAssign | OrAssign
        )
    }

    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(self, Equal | NotEqual | Less | LessOrEqual | Greater | GreaterOrEqual)
    }

    pub fn precedence(&self) -> i32 {
        use BinaryOp::*;
        match self {
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | BitAndAssign | BitOrAssign
            | BitXorAssign | ShlAssign | ShrAssign | AndAssign | OrAssign => 1,
            Or => 3,
            And => 4,
            BitOr => 5,
            BitXor => 6,
            BitAnd => 7,
            Equal | NotEqual => 8,
            Less | LessOrEqual | Greater | GreaterOrEqual => 9,
            Shl | Shr => 10,
            Add | Sub => 11,
            Mul | Div => 12,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let text = match self {
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessOrEqual => "<=",
            Greater => ">",
            GreaterOrEqual => ">=",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Shl => "<<",
            Shr => ">>",
            And => "&&",
            Or => "||",
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            BitAndAssign => "&=",
            BitOrAssign => "|=",
            BitXorAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            AndAssign => "&&=",
            OrAssign => "||=",
        };
        write!(f, "{text}")
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// A possibly-named argument or tuple element.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: Option<String>,
    pub value: Expr,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarExpr {
    pub name: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<NamedValue>,
    pub generic_args: Vec<Type>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub operand: Box<Expr>,
    pub member: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptExpr {
    pub operand: Box<Expr>,
    pub index: Box<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub location: SourceLocation,
}

/// Ternary `condition ? then : else`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub then_expr: Box<Expr>,
    pub else_expr: Box<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub params: Vec<ParamDecl>,
    pub body: Box<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeofExpr {
    pub ty: Type,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressofExpr {
    pub operand: Box<Expr>,
    pub location: SourceLocation,
}

/// Postfix `!` unwrap of an optional.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwrapExpr {
    pub operand: Box<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(VarExpr),
    IntLiteral { value: i64, location: SourceLocation },
    FloatLiteral { value: f64, location: SourceLocation },
    BoolLiteral { value: bool, location: SourceLocation },
    StringLiteral { value: String, location: SourceLocation },
    CharLiteral { value: u8, location: SourceLocation },
    NullLiteral { location: SourceLocation },
    UndefinedLiteral { location: SourceLocation },
    ArrayLiteral { elements: Vec<Expr>, location: SourceLocation },
    TupleLiteral { elements: Vec<NamedValue>, location: SourceLocation },
    Call(CallExpr),
    Member(MemberExpr),
    Subscript(SubscriptExpr),
    Unary(UnaryExpr),
    Unwrap(UnwrapExpr),
    Binary(BinaryExpr),
    If(IfExpr),
    Lambda(LambdaExpr),
    Sizeof(SizeofExpr),
    Addressof(AddressofExpr),
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Var(e) => e.location,
            Expr::IntLiteral { location, .. }
            | Expr::FloatLiteral { location, .. }
            | Expr::BoolLiteral { location, .. }
            | Expr::StringLiteral { location, .. }
            | Expr::CharLiteral { location, .. }
            | Expr::NullLiteral { location }
            | Expr::UndefinedLiteral { location }
            | Expr::ArrayLiteral { location, .. }
            | Expr::TupleLiteral { location, .. } => *location,
            Expr::Call(e) => e.location,
            Expr::Member(e) => e.location,
            Expr::Subscript(e) => e.location,
            Expr::Unary(e) => e.location,
            Expr::Unwrap(e) => e.location,
            Expr::Binary(e) => e.location,
            Expr::If(e) => e.location,
            Expr::Lambda(e) => e.location,
            Expr::Sizeof(e) => e.location,
            Expr::Addressof(e) => e.location,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call(_))
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self, Expr::Binary(b) if b.op.is_assignment())
    }

    pub fn is_increment_or_decrement(&self) -> bool {
        matches!(
            self,
            Expr::Unary(u) if matches!(u.op, UnaryOp::Increment | UnaryOp::Decrement)
        )
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: VarDecl,
    pub range: Expr,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Pattern of one switch case: a value expression or `default`.
#[derive(Debug, Clone, PartialEq)]
pub enum CasePattern {
    Expr(Expr),
    Default,
}

/// Binding introduced by `case value as name:`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBinding {
    pub name: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub pattern: CasePattern,
    pub binding: Option<CaseBinding>,
    pub stmts: Vec<Stmt>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub condition: Expr,
    pub cases: Vec<SwitchCase>,
}

impl SwitchStmt {
    /// The statements of the `default` case, if present.
    pub fn default_stmts(&self) -> Option<&[Stmt]> {
        self.cases
            .iter()
            .find(|c| c.pattern == CasePattern::Default)
            .map(|c| c.stmts.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    Return(ReturnStmt),
    Expr(Expr),
    Defer(Expr),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Switch(SwitchStmt),
    Break(SourceLocation),
    Continue(SourceLocation),
}

// ============================================================================
// DECLARATIONS
// ============================================================================

/// Visibility of a declaration.
///
/// Ordering matters: `Private` is less permissive than `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AccessLevel {
    Private,
    #[default]
    Default,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Private => write!(f, "private"),
            AccessLevel::Default => write!(f, "public"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// `None` only for unchecked contexts; function parameters always carry
    /// a type.
    pub ty: Option<Type>,
    pub name: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericParamDecl {
    pub name: String,
    pub constraints: Vec<Type>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub ty: Type,
    pub name: String,
    pub access_level: AccessLevel,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<ParamDecl>,
    /// `None` for interface requirements and bodyless prototypes.
    pub body: Option<Vec<Stmt>>,
    pub is_extern: bool,
    pub is_variadic: bool,
    pub access_level: AccessLevel,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitDecl {
    pub params: Vec<ParamDecl>,
    pub body: Vec<Stmt>,
    pub access_level: AccessLevel,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeinitDecl {
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// A member of a struct or interface, excluding fields.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberDecl {
    Method(FunctionDecl),
    Init(InitDecl),
    Deinit(DeinitDecl),
    MethodTemplate(FunctionTemplate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Struct,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub tag: TypeTag,
    pub name: String,
    pub interfaces: Vec<Type>,
    pub fields: Vec<FieldDecl>,
    pub members: Vec<MemberDecl>,
    pub access_level: AccessLevel,
    pub location: SourceLocation,
}

impl TypeDecl {
    pub fn is_interface(&self) -> bool {
        self.tag == TypeTag::Interface
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.members.iter().filter_map(|m| match m {
            MemberDecl::Method(f) => Some(f),
            _ => None,
        })
    }

    pub fn inits(&self) -> impl Iterator<Item = &InitDecl> {
        self.members.iter().filter_map(|m| match m {
            MemberDecl::Init(i) => Some(i),
            _ => None,
        })
    }
}

/// A parameterized type declaration. The wrapped prototype is never checked
/// directly; only its instantiations are.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTemplate {
    pub generic_params: Vec<GenericParamDecl>,
    pub type_decl: TypeDecl,
    pub access_level: AccessLevel,
}

/// A parameterized function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTemplate {
    pub generic_params: Vec<GenericParamDecl>,
    pub function: FunctionDecl,
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumCase {
    pub name: String,
    pub associated_type: Option<Type>,
    /// Ordinal of declaration order, starting at 0.
    pub value: i64,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub cases: Vec<EnumCase>,
    pub access_level: AccessLevel,
    pub location: SourceLocation,
}

impl EnumDecl {
    pub fn find_case(&self, name: &str) -> Option<&EnumCase> {
        self.cases.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// Explicit type annotation, if any.
    pub declared_type: Option<Type>,
    pub mutability: Mutability,
    pub name: String,
    pub initializer: Option<Expr>,
    pub access_level: AccessLevel,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub target: String,
    pub location: SourceLocation,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Function(FunctionDecl),
    FunctionTemplate(FunctionTemplate),
    Type(TypeDecl),
    TypeTemplate(TypeTemplate),
    Enum(EnumDecl),
    Var(VarDecl),
    Import(ImportDecl),
}

// ============================================================================
// MODULE
// ============================================================================

/// One parsed source file: an ordered sequence of top-level declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file: FileId,
    pub decls: Vec<Decl>,
}

/// An ordered collection of per-file declaration lists.
///
/// Iteration order is declaration order, which keeps diagnostics
/// deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub source_files: Vec<SourceFile>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source_file(&mut self, file: SourceFile) {
        self.source_files.push(file);
    }

    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.source_files.iter().flat_map(|f| f.decls.iter())
    }
}
