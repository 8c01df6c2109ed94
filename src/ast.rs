//! Data model (spec §3): expression, statement, and declaration nodes.
//!
//! Tagged-variant shape grounded on the teacher's `ouros::expressions::Node`
//! (an expression/statement hierarchy expressed as a sum type with a `kind`
//! discriminator rather than a class hierarchy — see spec.md §9 "Inheritance
//! of node types -> tagged variants").

use smallvec::SmallVec;

use crate::arena::{ExprId, StmtId, VarId};
use crate::diagnostics::Location;
use crate::intrinsics::IntrinsicOp;
use crate::types::Type;

/// A literal value, post constant-folding or straight from the lexer.
///
/// Numeric variants carry one component per `rows*cols` of their node's
/// [`Type`] (up to a 4x4 matrix); `Str` is never shape-bearing.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Bool(SmallVec<[bool; 16]>),
    Int(SmallVec<[i32; 16]>),
    Uint(SmallVec<[u32; 16]>),
    Float(SmallVec<[f32; 16]>),
    Double(SmallVec<[f64; 16]>),
    Str(String),
}

impl LiteralValue {
    #[must_use]
    pub fn component_count(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Uint(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Str(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
}

/// The character set a swizzle's indices were drawn from (§4.F: mixing sets is an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwizzleSet {
    Xyzw,
    Rgba,
    Stpq,
}

/// A resolved call target: either a user function (index into `Ast::functions`)
/// or an intrinsic opcode from the built-in catalog (§4.H/§4.I).
///
/// There is no separate "pre-resolution call" node in the final tree: the
/// expression parser always resolves a call at the point it constructs the
/// node (§4.F), so by the time an `Ast` exists every `Call` already carries
/// its resolved callee (spec.md §8 property 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    User(usize),
    Intrinsic(IntrinsicOp),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(LiteralValue),
    /// A reference to a declared variable (global or local).
    LValue(VarId),
    Unary { op: UnaryOp, operand: ExprId },
    Binary { op: BinaryOp, lhs: ExprId, rhs: ExprId },
    Assign { op: AssignOp, target: ExprId, value: ExprId },
    /// The comma operator: evaluates left to right, yields the type/value of the last.
    Sequence(Vec<ExprId>),
    Conditional { cond: ExprId, then_branch: ExprId, else_branch: ExprId },
    Call { callee: Callee, args: Vec<ExprId> },
    Constructor { args: Vec<ExprId> },
    Swizzle { base: ExprId, indices: SmallVec<[u8; 4]>, set: SwizzleSet, assignable: bool },
    /// `._mRC` matrix element access; `(row, col)` pairs, 0-based.
    MatrixSwizzle { base: ExprId, components: SmallVec<[(u8, u8); 4]> },
    Field { base: ExprId, field_index: usize },
    Index { base: ExprId, index: ExprId },
    InitializerList(Vec<ExprId>),
    /// `(T)expr` explicit conversion (§4.F) — kept distinct from `Constructor`
    /// since a cast narrows/widens a single operand's existing components
    /// rather than concatenating several arguments' components.
    Cast { target: Type, operand: ExprId },
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub ty: Type,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub enum CaseLabel {
    Literal(ExprId),
    Default,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub labels: Vec<CaseLabel>,
    pub body: Vec<StmtId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Expr(ExprId),
    Empty,
    /// One or more variable declarators sharing a statement (`int a, b = 1;`).
    DeclareVars(Vec<VarId>),
    If { cond: ExprId, then_branch: StmtId, else_branch: Option<StmtId> },
    Switch { test: ExprId, cases: Vec<SwitchCase> },
    For { init: Option<StmtId>, cond: Option<ExprId>, increment: Option<ExprId>, body: StmtId },
    While { cond: ExprId, body: StmtId, do_while: bool },
    Return { value: Option<ExprId>, discard: bool },
    Jump(JumpKind),
}

#[derive(Debug, Clone)]
pub struct StmtNode {
    pub kind: StmtKind,
    pub loc: Location,
    /// `[name]`-style attributes attached to this statement (§4.G).
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub name: String,
    pub value: LiteralValue,
    pub loc: Location,
}

/// `Width`/`Height`/... keys recognized inside a texture or sampler's `{ ... }` property block (§3, §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
pub enum PropertyKey {
    Width,
    Height,
    MipLevels,
    Format,
    AddressU,
    AddressV,
    AddressW,
    MinFilter,
    MagFilter,
    MipFilter,
    MaxAnisotropy,
    MinLOD,
    MaxLOD,
    MipLODBias,
    SRGBTexture,
    Texture,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyBlock {
    pub entries: Vec<(PropertyKey, ExprId)>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
    /// Upper-cased per §3/§4.G.
    pub semantic: Option<String>,
    pub annotations: Vec<Annotation>,
    pub initializer: Option<ExprId>,
    pub property_block: Option<PropertyBlock>,
    pub loc: Location,
    /// Set (not cleared) the second and later time a qualifier bit is
    /// written; carried only for the X3048 diagnostic (spec.md §9
    /// "Duplicate qualifiers").
    pub duplicate_qualifier: bool,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<VarId>,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<VarId>,
    pub body: Vec<StmtId>,
    pub semantic: Option<String>,
    /// Namespace path this function was declared in (e.g. `"a::b::"`), used
    /// by the resolver's namespace-level-aware candidate collection (§4.H).
    pub namespace_path: String,
    pub loc: Location,
}

/// `VertexShader`/`PixelShader`/`RenderTarget0..7`/... state slots (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
pub enum PassState {
    VertexShader,
    PixelShader,
    /// An unindexed `RenderTarget` defaults to slot 0 (§4.G).
    #[strum(serialize = "RenderTarget", serialize = "RenderTarget0")]
    RenderTarget0,
    RenderTarget1,
    RenderTarget2,
    RenderTarget3,
    RenderTarget4,
    RenderTarget5,
    RenderTarget6,
    RenderTarget7,
    ColorWriteMask,
    SRGBWriteEnable,
    BlendEnable,
    SrcBlend,
    DestBlend,
    BlendOp,
    BlendOpAlpha,
    DepthEnable,
    DepthWriteMask,
    DepthFunc,
    StencilEnable,
    StencilReadMask,
    StencilWriteMask,
    StencilRef,
    StencilFunc,
    StencilPass,
    StencilFail,
    StencilDepthFail,
}

#[derive(Debug, Clone)]
pub struct PassDecl {
    pub name: Option<String>,
    pub states: Vec<(PassState, ExprId)>,
    pub loc: Location,
}

#[derive(Debug, Clone)]
pub struct TechniqueDecl {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub passes: Vec<PassDecl>,
    pub loc: Location,
}
