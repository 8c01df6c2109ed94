//! Intrinsic catalog (spec component I).
//!
//! A static table of built-in functions keyed by name and fixed parameter
//! shapes. Grounded on `ouros::builtins::Builtins` — a `strum`-derived enum
//! naming every interpreter-native builtin, dispatched by a single `match` —
//! generalized here to a *data* table rather than a dispatch `match`, per
//! spec.md §9's design note ("global intrinsic catalog -> constant data").
//! Built once with `std::sync::LazyLock`, the same mechanism the teacher
//! uses for its static ASCII-string table (`ouros::intern::ASCII_STRS`).

use std::sync::LazyLock;

use strum::{EnumString, IntoStaticStr};

use crate::types::{BaseType, Type};

/// One built-in function's opcode. A single opcode may have several catalog
/// entries (one per arity/shape variant); the resolver never needs to know
/// how many rows a given intrinsic supports, only which entries match a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum IntrinsicOp {
    Abs, Acos, All, Any, AsFloat, AsFloatFromUint, Asin, AsInt, Atan, Atan2, AsUint, Ceil,
    Clamp, Cos, Cosh, Cross, Ddx, Ddy, Degrees, Determinant, Distance, Dot, Exp, Exp2,
    FaceForward, Floor, Frac, Frexp, Fwidth, Ldexp, Length, Lerp, Log, Log10, Log2, Mad,
    Max, Min, Modf, Mul, Normalize, Pow, Radians, Rcp, Reflect, Refract, Round, Rsqrt,
    Saturate, Sign, Sin, SinCos, Sinh, SmoothStep, Sqrt, Step, Tan, Tanh,
    Tex2D, Tex2DFetch, Tex2DGather, Tex2DGatherOffset, Tex2DGrad, Tex2DLod, Tex2DLodOffset,
    Tex2DOffset, Tex2DProj, Tex2DSize, Transpose, Trunc,
}

/// One arity/shape variant of a built-in function.
#[derive(Debug, Clone)]
pub struct IntrinsicSig {
    pub name: &'static str,
    pub op: IntrinsicOp,
    pub params: Vec<Type>,
    pub ret: Type,
}

fn float_shape(rows: u8) -> Type {
    if rows == 1 { Type::scalar(BaseType::Float) } else { Type::vector(BaseType::Float, rows) }
}

/// Registers one entry per row count 1..=4 for a function taking and
/// returning a single float scalar/vector shape (e.g. `abs`, `sin`, `sqrt`).
fn unary_componentwise(out: &mut Vec<IntrinsicSig>, name: &'static str, op: IntrinsicOp) {
    for rows in 1..=4 {
        let shape = float_shape(rows);
        out.push(IntrinsicSig { name, op, params: vec![shape], ret: shape });
    }
}

/// Same as [`unary_componentwise`] but for a two-argument function where both
/// parameters and the return share one shape (e.g. `min`, `max`, `pow`, `step`).
fn binary_componentwise(out: &mut Vec<IntrinsicSig>, name: &'static str, op: IntrinsicOp) {
    for rows in 1..=4 {
        let shape = float_shape(rows);
        out.push(IntrinsicSig { name, op, params: vec![shape, shape], ret: shape });
    }
}

/// Same as above, three arguments sharing one shape (`clamp`, `lerp`, `mad`, `smoothstep`).
fn ternary_componentwise(out: &mut Vec<IntrinsicSig>, name: &'static str, op: IntrinsicOp) {
    for rows in 1..=4 {
        let shape = float_shape(rows);
        out.push(IntrinsicSig { name, op, params: vec![shape, shape, shape], ret: shape });
    }
}

/// A function that reduces a vector/scalar to a single bool (`all`, `any`).
fn reduce_to_bool(out: &mut Vec<IntrinsicSig>, name: &'static str, op: IntrinsicOp) {
    for rows in 1..=4 {
        out.push(IntrinsicSig { name, op, params: vec![float_shape(rows)], ret: Type::scalar(BaseType::Bool) });
    }
}

/// A function that reduces a single vector/scalar to a single float (`length`).
fn reduce_to_float(out: &mut Vec<IntrinsicSig>, name: &'static str, op: IntrinsicOp) {
    for rows in 1..=4 {
        out.push(IntrinsicSig { name, op, params: vec![float_shape(rows)], ret: Type::scalar(BaseType::Float) });
    }
}

/// A function that reduces a pair of same-shape vectors to a single float (`dot`, `distance`).
fn reduce_pair_to_float(out: &mut Vec<IntrinsicSig>, name: &'static str, op: IntrinsicOp) {
    for rows in 1..=4 {
        let shape = float_shape(rows);
        out.push(IntrinsicSig { name, op, params: vec![shape, shape], ret: Type::scalar(BaseType::Float) });
    }
}

fn build_catalog() -> Vec<IntrinsicSig> {
    let mut c = Vec::new();

    unary_componentwise(&mut c, "abs", IntrinsicOp::Abs);
    unary_componentwise(&mut c, "acos", IntrinsicOp::Acos);
    unary_componentwise(&mut c, "asin", IntrinsicOp::Asin);
    unary_componentwise(&mut c, "atan", IntrinsicOp::Atan);
    unary_componentwise(&mut c, "ceil", IntrinsicOp::Ceil);
    unary_componentwise(&mut c, "cos", IntrinsicOp::Cos);
    unary_componentwise(&mut c, "cosh", IntrinsicOp::Cosh);
    unary_componentwise(&mut c, "degrees", IntrinsicOp::Degrees);
    unary_componentwise(&mut c, "ddx", IntrinsicOp::Ddx);
    unary_componentwise(&mut c, "ddy", IntrinsicOp::Ddy);
    unary_componentwise(&mut c, "exp", IntrinsicOp::Exp);
    unary_componentwise(&mut c, "exp2", IntrinsicOp::Exp2);
    unary_componentwise(&mut c, "floor", IntrinsicOp::Floor);
    unary_componentwise(&mut c, "frac", IntrinsicOp::Frac);
    unary_componentwise(&mut c, "fwidth", IntrinsicOp::Fwidth);
    unary_componentwise(&mut c, "log", IntrinsicOp::Log);
    unary_componentwise(&mut c, "log10", IntrinsicOp::Log10);
    unary_componentwise(&mut c, "log2", IntrinsicOp::Log2);
    unary_componentwise(&mut c, "normalize", IntrinsicOp::Normalize);
    unary_componentwise(&mut c, "radians", IntrinsicOp::Radians);
    unary_componentwise(&mut c, "rcp", IntrinsicOp::Rcp);
    unary_componentwise(&mut c, "round", IntrinsicOp::Round);
    unary_componentwise(&mut c, "rsqrt", IntrinsicOp::Rsqrt);
    unary_componentwise(&mut c, "saturate", IntrinsicOp::Saturate);
    unary_componentwise(&mut c, "sign", IntrinsicOp::Sign);
    unary_componentwise(&mut c, "sin", IntrinsicOp::Sin);
    unary_componentwise(&mut c, "sinh", IntrinsicOp::Sinh);
    unary_componentwise(&mut c, "sqrt", IntrinsicOp::Sqrt);
    unary_componentwise(&mut c, "tan", IntrinsicOp::Tan);
    unary_componentwise(&mut c, "tanh", IntrinsicOp::Tanh);
    unary_componentwise(&mut c, "trunc", IntrinsicOp::Trunc);

    binary_componentwise(&mut c, "atan2", IntrinsicOp::Atan2);
    binary_componentwise(&mut c, "ldexp", IntrinsicOp::Ldexp);
    binary_componentwise(&mut c, "max", IntrinsicOp::Max);
    binary_componentwise(&mut c, "min", IntrinsicOp::Min);
    binary_componentwise(&mut c, "pow", IntrinsicOp::Pow);
    binary_componentwise(&mut c, "reflect", IntrinsicOp::Reflect);
    binary_componentwise(&mut c, "step", IntrinsicOp::Step);

    ternary_componentwise(&mut c, "clamp", IntrinsicOp::Clamp);
    ternary_componentwise(&mut c, "faceforward", IntrinsicOp::FaceForward);
    ternary_componentwise(&mut c, "lerp", IntrinsicOp::Lerp);
    ternary_componentwise(&mut c, "mad", IntrinsicOp::Mad);
    ternary_componentwise(&mut c, "refract", IntrinsicOp::Refract);
    ternary_componentwise(&mut c, "smoothstep", IntrinsicOp::SmoothStep);

    reduce_to_bool(&mut c, "all", IntrinsicOp::All);
    reduce_to_bool(&mut c, "any", IntrinsicOp::Any);

    reduce_to_float(&mut c, "length", IntrinsicOp::Length);

    reduce_pair_to_float(&mut c, "distance", IntrinsicOp::Distance);
    reduce_pair_to_float(&mut c, "dot", IntrinsicOp::Dot);

    // cross is 3-vector-only (§4.I).
    let f3 = Type::vector(BaseType::Float, 3);
    c.push(IntrinsicSig { name: "cross", op: IntrinsicOp::Cross, params: vec![f3, f3], ret: f3 });

    // Bit-reinterpretation casts.
    for rows in 1..=4 {
        let int_shape = if rows == 1 { Type::scalar(BaseType::Int) } else { Type::vector(BaseType::Int, rows) };
        let uint_shape = if rows == 1 { Type::scalar(BaseType::Uint) } else { Type::vector(BaseType::Uint, rows) };
        let float_shape_n = float_shape(rows);
        c.push(IntrinsicSig { name: "asfloat", op: IntrinsicOp::AsFloat, params: vec![int_shape], ret: float_shape_n });
        c.push(IntrinsicSig {
            name: "asfloat",
            op: IntrinsicOp::AsFloatFromUint,
            params: vec![uint_shape],
            ret: float_shape_n,
        });
        c.push(IntrinsicSig { name: "asint", op: IntrinsicOp::AsInt, params: vec![float_shape_n], ret: int_shape });
        c.push(IntrinsicSig { name: "asuint", op: IntrinsicOp::AsUint, params: vec![float_shape_n], ret: uint_shape });
    }

    // frexp/modf/sincos: (value, out param) pairs. The out-param qualifier is
    // enforced by the caller (§4.G); the catalog only records shapes.
    for rows in 1..=4 {
        let shape = float_shape(rows);
        c.push(IntrinsicSig { name: "frexp", op: IntrinsicOp::Frexp, params: vec![shape, shape], ret: shape });
        c.push(IntrinsicSig { name: "modf", op: IntrinsicOp::Modf, params: vec![shape, shape], ret: shape });
        c.push(IntrinsicSig { name: "sincos", op: IntrinsicOp::SinCos, params: vec![shape, shape, shape], ret: Type::void() });
    }

    // determinant/transpose: square matrices only.
    for n in 2..=4u8 {
        let m = Type::matrix(BaseType::Float, n, n);
        c.push(IntrinsicSig { name: "determinant", op: IntrinsicOp::Determinant, params: vec![m], ret: Type::scalar(BaseType::Float) });
        c.push(IntrinsicSig { name: "transpose", op: IntrinsicOp::Transpose, params: vec![m], ret: m });
    }

    // mul: every combination of scalar x scalar, scalar x vector, vector x
    // scalar, scalar x matrix, matrix x scalar, vector x matrix, matrix x
    // vector, and componentwise vector x vector / matrix x matrix (§4.I).
    build_mul_catalog(&mut c);

    // tex* family: first argument is always a sampler2D (we model samplers
    // uniformly rather than per-dimension, since the catalog only needs
    // shape matching, not the dimension check — that is a declaration-site
    // concern handled when the sampler variable itself is declared).
    let sampler2d = Type { texture_dim: Some(crate::types::TextureDim::D2), ..Type::scalar(BaseType::Sampler) };
    let f2 = Type::vector(BaseType::Float, 2);
    let f4 = Type::vector(BaseType::Float, 4);
    let i2 = Type::vector(BaseType::Int, 2);
    c.push(IntrinsicSig { name: "tex2D", op: IntrinsicOp::Tex2D, params: vec![sampler2d, f2], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dfetch", op: IntrinsicOp::Tex2DFetch, params: vec![sampler2d, i2], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dgather", op: IntrinsicOp::Tex2DGather, params: vec![sampler2d, f2, Type::scalar(BaseType::Int)], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dgatheroffset", op: IntrinsicOp::Tex2DGatherOffset, params: vec![sampler2d, f2, i2], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dgrad", op: IntrinsicOp::Tex2DGrad, params: vec![sampler2d, f2, f2, f2], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dlod", op: IntrinsicOp::Tex2DLod, params: vec![sampler2d, f4], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dlodoffset", op: IntrinsicOp::Tex2DLodOffset, params: vec![sampler2d, f4, i2], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Doffset", op: IntrinsicOp::Tex2DOffset, params: vec![sampler2d, f2, i2], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dproj", op: IntrinsicOp::Tex2DProj, params: vec![sampler2d, f4], ret: f4 });
    c.push(IntrinsicSig { name: "tex2Dsize", op: IntrinsicOp::Tex2DSize, params: vec![sampler2d], ret: i2 });

    c
}

fn build_mul_catalog(out: &mut Vec<IntrinsicSig>) {
    let scalar = Type::scalar(BaseType::Float);
    for rows in 1..=4u8 {
        let vec_t = if rows == 1 { scalar } else { Type::vector(BaseType::Float, rows) };
        // scalar x scalar already covered when rows == 1 below via the vector loop.
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![scalar, vec_t], ret: vec_t });
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![vec_t, scalar], ret: vec_t });
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![vec_t, vec_t], ret: vec_t });
    }
    for n in 2..=4u8 {
        let m = Type::matrix(BaseType::Float, n, n);
        let v = Type::vector(BaseType::Float, n);
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![scalar, m], ret: m });
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![m, scalar], ret: m });
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![v, m], ret: v });
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![m, v], ret: v });
        out.push(IntrinsicSig { name: "mul", op: IntrinsicOp::Mul, params: vec![m, m], ret: m });
    }
}

static CATALOG: LazyLock<Vec<IntrinsicSig>> = LazyLock::new(build_catalog);

/// All catalog entries matching `name` (regardless of arity/shape). The
/// overload resolver (§4.H) further filters and ranks these against a call's
/// argument types.
#[must_use]
pub fn candidates(name: &str) -> Vec<&'static IntrinsicSig> {
    CATALOG.iter().filter(|sig| sig.name == name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_has_one_entry_per_row_count() {
        let entries = candidates("abs");
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn cross_is_three_vector_only() {
        let entries = candidates("cross");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].params[0].rows, 3);
    }

    #[test]
    fn rcp_has_its_own_opcode_distinct_from_sign() {
        // Open Question (a): the original source's `rcp` entry mapped to the
        // `sign` opcode by mistake; this catalog gives it its own.
        let rcp = &candidates("rcp")[0];
        let sign = &candidates("sign")[0];
        assert_ne!(rcp.op, sign.op);
        assert_eq!(rcp.op, IntrinsicOp::Rcp);
    }

    #[test]
    fn length_reduces_any_row_count_to_a_scalar_float() {
        let entries = candidates("length");
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|s| s.ret.is_scalar() && s.ret.basetype == BaseType::Float));
    }

    #[test]
    fn mul_covers_matrix_vector_combinations() {
        let entries = candidates("mul");
        assert!(entries.iter().any(|s| s.params[0].is_matrix() && s.params[1].is_vector()));
        assert!(entries.iter().any(|s| s.params[0].is_vector() && s.params[1].is_matrix()));
    }
}
