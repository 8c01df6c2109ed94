//! Constant folder (spec component J).
//!
//! Invoked after every expression node is constructed in the expression
//! parser. If every operand of a unary/binary/intrinsic/constructor/cast/
//! swizzle node is a literal, folding produces an equivalent literal node;
//! otherwise the original node passes through unchanged.
//!
//! Grounded on `ouros::value` (the interpreter's per-basetype numeric
//! coercion helpers) for the conversion rules between bool/int/uint/float
//! components.

use smallvec::SmallVec;

use crate::ast::{BinaryOp, LiteralValue, UnaryOp};
use crate::intrinsics::IntrinsicOp;
use crate::types::{BaseType, Type};

/// Intrinsics the folder knows how to evaluate at compile time (§4.J); every
/// other opcode passes its call through unevaluated.
#[must_use]
pub fn is_foldable_intrinsic(op: IntrinsicOp) -> bool {
    matches!(
        op,
        IntrinsicOp::Abs
            | IntrinsicOp::Sign
            | IntrinsicOp::Rcp
            | IntrinsicOp::Sin
            | IntrinsicOp::Sinh
            | IntrinsicOp::Cos
            | IntrinsicOp::Cosh
            | IntrinsicOp::Tan
            | IntrinsicOp::Tanh
            | IntrinsicOp::Asin
            | IntrinsicOp::Acos
            | IntrinsicOp::Atan
            | IntrinsicOp::Atan2
            | IntrinsicOp::Exp
            | IntrinsicOp::Log
            | IntrinsicOp::Log2
            | IntrinsicOp::Log10
            | IntrinsicOp::Sqrt
            | IntrinsicOp::Ceil
            | IntrinsicOp::Floor
            | IntrinsicOp::Min
            | IntrinsicOp::Max
            | IntrinsicOp::Pow
    )
}

fn as_f64(value: &LiteralValue, i: usize) -> f64 {
    match value {
        LiteralValue::Bool(v) => f64::from(v[i] as u8),
        LiteralValue::Int(v) => f64::from(v[i]),
        LiteralValue::Uint(v) => f64::from(v[i]),
        LiteralValue::Float(v) => f64::from(v[i]),
        LiteralValue::Double(v) => v[i],
        LiteralValue::Str(_) => 0.0,
    }
}

fn as_i64(value: &LiteralValue, i: usize) -> i64 {
    match value {
        LiteralValue::Bool(v) => i64::from(v[i] as u8),
        LiteralValue::Int(v) => i64::from(v[i]),
        LiteralValue::Uint(v) => i64::from(v[i]),
        LiteralValue::Float(v) => v[i] as i64,
        LiteralValue::Double(v) => v[i] as i64,
        LiteralValue::Str(_) => 0,
    }
}

/// Builds a literal of `basetype` shape from `f64` components, applying
/// two's-complement modular wrap for the integral basetypes and single
/// precision for `Float` (§4.J).
fn make_float_literal(components: &[f64]) -> LiteralValue {
    LiteralValue::Float(components.iter().map(|&c| c as f32).collect())
}

fn make_int_literal(components: &[i64]) -> LiteralValue {
    LiteralValue::Int(components.iter().map(|&c| c as i32).collect())
}

fn make_uint_literal(components: &[i64]) -> LiteralValue {
    LiteralValue::Uint(components.iter().map(|&c| c as u32).collect())
}

fn make_bool_literal(components: &[bool]) -> LiteralValue {
    LiteralValue::Bool(components.iter().copied().collect())
}

/// Folds a unary operator applied to a literal operand, or returns `None` if
/// this combination of op/basetype cannot be folded (the caller keeps the
/// original node in that case).
#[must_use]
pub fn fold_unary(op: UnaryOp, ty: &Type, operand: &LiteralValue) -> Option<LiteralValue> {
    let n = operand.component_count();
    match op {
        UnaryOp::Not => {
            let out: SmallVec<[bool; 16]> = (0..n).map(|i| as_i64(operand, i) == 0).collect();
            Some(make_bool_literal(&out))
        }
        UnaryOp::BitNot => {
            let out: SmallVec<[i64; 16]> = (0..n).map(|i| !as_i64(operand, i)).collect();
            Some(fold_integral_result(ty, &out))
        }
        UnaryOp::Negate => {
            if ty.basetype == BaseType::Float {
                let out: SmallVec<[f64; 16]> = (0..n).map(|i| -as_f64(operand, i)).collect();
                Some(make_float_literal(&out))
            } else {
                let out: SmallVec<[i64; 16]> = (0..n).map(|i| -as_i64(operand, i)).collect();
                Some(fold_integral_result(ty, &out))
            }
        }
        // Increment/decrement require an l-value and are never foldable —
        // their operand is never itself a literal node.
        UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => None,
    }
}

fn fold_integral_result(ty: &Type, components: &[i64]) -> LiteralValue {
    match ty.basetype {
        BaseType::Uint => make_uint_literal(components),
        BaseType::Bool => make_bool_literal(&components.iter().map(|&c| c != 0).collect::<SmallVec<[bool; 16]>>()),
        _ => make_int_literal(components),
    }
}

/// Folds a binary operator over two literal operands whose shapes already
/// match (the expression parser has broadcast any scalar before folding).
#[must_use]
pub fn fold_binary(op: BinaryOp, result_ty: &Type, lhs: &LiteralValue, rhs: &LiteralValue) -> Option<LiteralValue> {
    let n = lhs.component_count().max(rhs.component_count());
    let lhs_i = |i: usize| as_i64(lhs, i.min(lhs.component_count() - 1));
    let rhs_i = |i: usize| as_i64(rhs, i.min(rhs.component_count() - 1));
    let lhs_f = |i: usize| as_f64(lhs, i.min(lhs.component_count() - 1));
    let rhs_f = |i: usize| as_f64(rhs, i.min(rhs.component_count() - 1));

    let is_float = matches!(result_ty.basetype, BaseType::Float);

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod if is_float => {
            let out: SmallVec<[f64; 16]> = (0..n)
                .map(|i| {
                    let (a, b) = (lhs_f(i), rhs_f(i));
                    match op {
                        BinaryOp::Add => a + b,
                        BinaryOp::Sub => a - b,
                        BinaryOp::Mul => a * b,
                        BinaryOp::Div => a / b,
                        // float `%` uses fmod semantics (§4.J), not Rust's `%`
                        // on floats — they agree, but fmod is the name the
                        // spec calls out, so spell it that way.
                        BinaryOp::Mod => a - b * (a / b).trunc(),
                        _ => unreachable!(),
                    }
                })
                .collect();
            Some(make_float_literal(&out))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let out: SmallVec<[i64; 16]> = (0..n)
                .map(|i| {
                    let (a, b) = (lhs_i(i), rhs_i(i));
                    match op {
                        BinaryOp::Add => a.wrapping_add(b),
                        BinaryOp::Sub => a.wrapping_sub(b),
                        BinaryOp::Mul => a.wrapping_mul(b),
                        BinaryOp::Div if b != 0 => a.wrapping_div(b),
                        BinaryOp::Mod if b != 0 => a.wrapping_rem(b),
                        // Division by zero has no portable wrapped result;
                        // fold to zero rather than panic, matching the
                        // shift-amount handling below.
                        _ => 0,
                    }
                })
                .collect();
            Some(fold_integral_result(result_ty, &out))
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
            let out: SmallVec<[i64; 16]> = (0..n)
                .map(|i| {
                    let (a, b) = (lhs_i(i), rhs_i(i));
                    match op {
                        BinaryOp::BitAnd => a & b,
                        BinaryOp::BitOr => a | b,
                        BinaryOp::BitXor => a ^ b,
                        // shift amounts >= basetype width are undefined
                        // (§4.J); mask to 31 bits to match the host
                        // evaluator's wrapping behavior rather than panic.
                        BinaryOp::Shl => a.wrapping_shl((b & 31) as u32),
                        BinaryOp::Shr => a.wrapping_shr((b & 31) as u32),
                        _ => unreachable!(),
                    }
                })
                .collect();
            Some(fold_integral_result(result_ty, &out))
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
            let out: SmallVec<[bool; 16]> = (0..n)
                .map(|i| {
                    if is_float {
                        let (a, b) = (lhs_f(i), rhs_f(i));
                        match op {
                            BinaryOp::Lt => a < b,
                            BinaryOp::Gt => a > b,
                            BinaryOp::Le => a <= b,
                            BinaryOp::Ge => a >= b,
                            BinaryOp::Eq => (a - b).abs() == 0.0,
                            BinaryOp::Ne => (a - b).abs() != 0.0,
                            _ => unreachable!(),
                        }
                    } else {
                        let (a, b) = (lhs_i(i), rhs_i(i));
                        match op {
                            BinaryOp::Lt => a < b,
                            BinaryOp::Gt => a > b,
                            BinaryOp::Le => a <= b,
                            BinaryOp::Ge => a >= b,
                            BinaryOp::Eq => a == b,
                            BinaryOp::Ne => a != b,
                            _ => unreachable!(),
                        }
                    }
                })
                .collect();
            Some(make_bool_literal(&out))
        }
        BinaryOp::And => Some(make_bool_literal(&[(0..n).all(|i| lhs_i(i) != 0 && rhs_i(i) != 0)])),
        BinaryOp::Or => Some(make_bool_literal(&[(0..n).any(|i| lhs_i(i) != 0 || rhs_i(i) != 0)])),
    }
}

/// Casts a literal to a new basetype/shape, component by component: indices
/// `< min(old_count, new_count)` are converted per the per-basetype rule
/// below; anything beyond that is left at zero (the "memcpy fallback" of
/// §4.J).
#[must_use]
pub fn fold_cast(dst: &Type, value: &LiteralValue) -> LiteralValue {
    let new_count = dst.component_count().max(1);
    let old_count = value.component_count();
    let copy_count = old_count.min(new_count);

    match dst.basetype {
        BaseType::Bool => {
            let mut out: SmallVec<[bool; 16]> = (0..copy_count).map(|i| as_i64(value, i) != 0).collect();
            out.resize(new_count, false);
            LiteralValue::Bool(out)
        }
        BaseType::Int => {
            let mut out: SmallVec<[i32; 16]> = (0..copy_count).map(|i| as_i64(value, i) as i32).collect();
            out.resize(new_count, 0);
            LiteralValue::Int(out)
        }
        BaseType::Uint => {
            let mut out: SmallVec<[u32; 16]> = (0..copy_count).map(|i| as_i64(value, i) as u32).collect();
            out.resize(new_count, 0);
            LiteralValue::Uint(out)
        }
        BaseType::Float => {
            let mut out: SmallVec<[f32; 16]> = (0..copy_count).map(|i| as_f64(value, i) as f32).collect();
            out.resize(new_count, 0.0);
            LiteralValue::Float(out)
        }
        _ => value.clone(),
    }
}

/// Folds a swizzle over a literal base, reading components in `indices`
/// order (duplicates and reorderings both allowed — the parser has already
/// validated the swizzle itself).
#[must_use]
pub fn fold_swizzle(base: &LiteralValue, indices: &[u8]) -> LiteralValue {
    match base {
        LiteralValue::Bool(v) => LiteralValue::Bool(indices.iter().map(|&i| v[i as usize]).collect()),
        LiteralValue::Int(v) => LiteralValue::Int(indices.iter().map(|&i| v[i as usize]).collect()),
        LiteralValue::Uint(v) => LiteralValue::Uint(indices.iter().map(|&i| v[i as usize]).collect()),
        LiteralValue::Float(v) => LiteralValue::Float(indices.iter().map(|&i| v[i as usize]).collect()),
        LiteralValue::Double(v) => LiteralValue::Double(indices.iter().map(|&i| v[i as usize]).collect()),
        LiteralValue::Str(s) => LiteralValue::Str(s.clone()),
    }
}

/// Concatenates a run of adjacent string literals (§4.F, SPEC_FULL.md §B.1):
/// the original folds an arbitrary run, not just pairs.
#[must_use]
pub fn fold_string_run(parts: &[String]) -> LiteralValue {
    LiteralValue::Str(parts.concat())
}

/// Folds a single-argument intrinsic call, for the subset listed foldable
/// in §4.J. Returns `None` for anything [`is_foldable_intrinsic`] rejects,
/// or when the opcode needs more than one argument (handled by
/// [`fold_intrinsic_binary`] instead).
#[must_use]
pub fn fold_intrinsic_unary(op: IntrinsicOp, value: &LiteralValue) -> Option<LiteralValue> {
    let n = value.component_count();
    let apply = |f: fn(f64) -> f64| {
        let out: SmallVec<[f64; 16]> = (0..n).map(|i| f(as_f64(value, i))).collect();
        Some(make_float_literal(&out))
    };
    match op {
        IntrinsicOp::Abs => apply(f64::abs),
        IntrinsicOp::Sign => apply(|x| if x > 0.0 { 1.0 } else if x < 0.0 { -1.0 } else { 0.0 }),
        IntrinsicOp::Rcp => apply(|x| 1.0 / x),
        IntrinsicOp::Sin => apply(f64::sin),
        IntrinsicOp::Sinh => apply(f64::sinh),
        IntrinsicOp::Cos => apply(f64::cos),
        IntrinsicOp::Cosh => apply(f64::cosh),
        IntrinsicOp::Tan => apply(f64::tan),
        IntrinsicOp::Tanh => apply(f64::tanh),
        IntrinsicOp::Asin => apply(f64::asin),
        IntrinsicOp::Acos => apply(f64::acos),
        IntrinsicOp::Atan => apply(f64::atan),
        IntrinsicOp::Exp => apply(f64::exp),
        IntrinsicOp::Log => apply(f64::ln),
        IntrinsicOp::Log2 => apply(f64::log2),
        IntrinsicOp::Log10 => apply(f64::log10),
        IntrinsicOp::Sqrt => apply(f64::sqrt),
        IntrinsicOp::Ceil => apply(f64::ceil),
        IntrinsicOp::Floor => apply(f64::floor),
        _ => None,
    }
}

/// Folds a two-argument foldable intrinsic (`atan2`, `min`, `max`, `pow`).
#[must_use]
pub fn fold_intrinsic_binary(op: IntrinsicOp, a: &LiteralValue, b: &LiteralValue) -> Option<LiteralValue> {
    let n = a.component_count().max(b.component_count());
    let ai = |i: usize| as_f64(a, i.min(a.component_count() - 1));
    let bi = |i: usize| as_f64(b, i.min(b.component_count() - 1));
    let f: fn(f64, f64) -> f64 = match op {
        IntrinsicOp::Atan2 => f64::atan2,
        IntrinsicOp::Min => f64::min,
        IntrinsicOp::Max => f64::max,
        IntrinsicOp::Pow => f64::powf,
        _ => return None,
    };
    let out: SmallVec<[f64; 16]> = (0..n).map(|i| f(ai(i), bi(i))).collect();
    Some(make_float_literal(&out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use smallvec::smallvec;

    #[test]
    fn integer_add_wraps_on_overflow() {
        let ty = Type::scalar(BaseType::Int);
        let lhs = LiteralValue::Int(smallvec![i32::MAX]);
        let rhs = LiteralValue::Int(smallvec![1]);
        let folded = fold_binary(BinaryOp::Add, &ty, &lhs, &rhs).unwrap();
        assert_eq!(folded, LiteralValue::Int(smallvec![i32::MIN]));
    }

    #[test]
    fn float_mod_matches_fmod_semantics() {
        let ty = Type::scalar(BaseType::Float);
        let lhs = LiteralValue::Float(smallvec![5.5]);
        let rhs = LiteralValue::Float(smallvec![2.0]);
        let folded = fold_binary(BinaryOp::Mod, &ty, &lhs, &rhs).unwrap();
        assert_eq!(folded, LiteralValue::Float(smallvec![1.5]));
    }

    #[test]
    fn cast_narrows_and_zero_fills() {
        let dst = Type::vector(BaseType::Float, 2);
        let src = LiteralValue::Int(smallvec![1, 2, 3, 4]);
        let folded = fold_cast(&dst, &src);
        assert_eq!(folded, LiteralValue::Float(smallvec![1.0, 2.0]));

        let dst_wide = Type::vector(BaseType::Int, 4);
        let src_narrow = LiteralValue::Int(smallvec![7, 8]);
        let widened = fold_cast(&dst_wide, &src_narrow);
        assert_eq!(widened, LiteralValue::Int(smallvec![7, 8, 0, 0]));
    }

    #[test]
    fn swizzle_reads_components_in_requested_order() {
        let base = LiteralValue::Float(smallvec![1.0, 2.0, 3.0, 4.0]);
        let folded = fold_swizzle(&base, &[2, 0, 0]);
        assert_eq!(folded, LiteralValue::Float(smallvec![3.0, 1.0, 1.0]));
    }

    #[test]
    fn string_run_folds_more_than_a_pair() {
        let parts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(fold_string_run(&parts), LiteralValue::Str("abc".to_string()));
    }

    #[test]
    fn abs_is_foldable_but_frac_is_not() {
        assert!(is_foldable_intrinsic(IntrinsicOp::Abs));
        assert!(!is_foldable_intrinsic(IntrinsicOp::Frac));
    }

    #[test]
    fn rcp_folds_as_reciprocal() {
        let v = LiteralValue::Float(smallvec![4.0]);
        let folded = fold_intrinsic_unary(IntrinsicOp::Rcp, &v).unwrap();
        assert_eq!(folded, LiteralValue::Float(smallvec![0.25]));
    }
}
