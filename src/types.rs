//! Type system (spec component D).
//!
//! Scalar/vector/matrix/struct/sampler/texture/string classification, the
//! qualifier bitset, the conversion-rank table, and the shape predicates.
//!
//! The qualifier bitset is grounded on `FloatyMonkey-engine`'s use of the
//! `bitflags` crate (`crates/gpu/src/lib.rs`) — the teacher itself has no
//! bitflags dependency, so this one is adopted from the wider example pack,
//! per the "enrich from the rest of the pack" rule. The basetype enum is
//! grounded on `ouros::types::type_::Type`, a `strum::EnumString`-derived
//! tag enum used both for type checking and (there) as a constructor tag.

use bitflags::bitflags;
use strum::EnumString;

use crate::arena::StructId;

/// The dimensionality carried by `sampler*D`/`texture*D` declarations.
///
/// Not part of the literal `(basetype, rows, cols, ...)` tuple in spec.md §3,
/// but needed to keep `sampler1D` distinct from `sampler2D`/`sampler3D` once
/// the lexer has collapsed them to a single `Sampler`/`Texture` basetype —
/// without it two declarations with different dimensionality would compare
/// as the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, serde::Serialize, serde::Deserialize)]
pub enum TextureDim {
    #[strum(serialize = "1D")]
    D1,
    #[strum(serialize = "2D")]
    D2,
    #[strum(serialize = "3D")]
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, serde::Serialize, serde::Deserialize)]
pub enum BaseType {
    Void,
    Bool,
    Int,
    Uint,
    Float,
    String,
    Sampler,
    Texture,
    Struct,
}

impl BaseType {
    /// Row/column index into the 4x4 conversion-rank base table (bool, int, uint, float).
    fn numeric_index(self) -> Option<usize> {
        match self {
            Self::Bool => Some(0),
            Self::Int => Some(1),
            Self::Uint => Some(2),
            Self::Float => Some(3),
            _ => None,
        }
    }
}

bitflags! {
    /// Storage-class / interpolation qualifier bitset (§3).
    ///
    /// `INOUT` is defined as exactly `IN.bits() | OUT.bits()` (an invariant
    /// checked by the `inout_is_in_or_out` test below), matching the
    /// original compiler's representation of `inout` as a derived value
    /// rather than its own bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct Qualifiers: u16 {
        const EXTERN          = 1 << 0;
        const STATIC          = 1 << 1;
        const UNIFORM         = 1 << 2;
        const VOLATILE        = 1 << 3;
        const PRECISE         = 1 << 4;
        const IN              = 1 << 5;
        const OUT             = 1 << 6;
        const CONST           = 1 << 7;
        const LINEAR          = 1 << 8;
        const NOPERSPECTIVE   = 1 << 9;
        const CENTROID        = 1 << 10;
        const NOINTERPOLATION = 1 << 11;
        const INOUT = Self::IN.bits() | Self::OUT.bits();
    }
}

/// `array_length` encoding: `0` = not an array, `-1` = unsized (`T[]`), `>0` = fixed size.
pub const ARRAY_NOT_AN_ARRAY: i32 = 0;
pub const ARRAY_UNSIZED: i32 = -1;

/// Product of `(basetype, rows, cols, array_length, qualifiers, struct_definition?)` (§3).
///
/// `Copy`: every field is a small fixed-size value (no `Vec`/`String`), so
/// `Type` is passed around by value throughout the type checker and
/// intrinsic catalog the same way a numeric ID would be.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Type {
    pub basetype: BaseType,
    pub rows: u8,
    pub cols: u8,
    pub array_length: i32,
    pub qualifiers: Qualifiers,
    pub struct_def: Option<StructId>,
    pub texture_dim: Option<TextureDim>,
}

impl Type {
    #[must_use]
    pub fn void() -> Self {
        Self {
            basetype: BaseType::Void,
            rows: 0,
            cols: 0,
            array_length: ARRAY_NOT_AN_ARRAY,
            qualifiers: Qualifiers::empty(),
            struct_def: None,
            texture_dim: None,
        }
    }

    #[must_use]
    pub fn scalar(basetype: BaseType) -> Self {
        Self {
            basetype,
            rows: 1,
            cols: 1,
            array_length: ARRAY_NOT_AN_ARRAY,
            qualifiers: Qualifiers::empty(),
            struct_def: None,
            texture_dim: None,
        }
    }

    #[must_use]
    pub fn vector(basetype: BaseType, rows: u8) -> Self {
        Self { rows, cols: 1, ..Self::scalar(basetype) }
    }

    #[must_use]
    pub fn matrix(basetype: BaseType, rows: u8, cols: u8) -> Self {
        Self { rows, cols, ..Self::scalar(basetype) }
    }

    #[must_use]
    pub fn struct_type(id: StructId) -> Self {
        Self { struct_def: Some(id), ..Self::scalar(BaseType::Struct) }
    }

    #[must_use]
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    #[must_use]
    pub fn as_array(mut self, length: i32) -> Self {
        self.array_length = length;
        self
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.array_length != ARRAY_NOT_AN_ARRAY
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.rows > 1 && self.cols == 1
    }

    #[must_use]
    pub fn is_matrix(&self) -> bool {
        self.rows >= 1 && self.cols > 1
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.basetype, BaseType::Bool | BaseType::Int | BaseType::Uint | BaseType::Float)
    }

    #[must_use]
    pub fn is_integral(&self) -> bool {
        matches!(self.basetype, BaseType::Bool | BaseType::Int | BaseType::Uint)
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self.basetype, BaseType::Void)
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.basetype, BaseType::Sampler | BaseType::Texture)
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        usize::from(self.rows) * usize::from(self.cols)
    }

    /// Same `(basetype, rows, cols, array_length, struct_def, texture_dim)` —
    /// the equality spec's overload-resolution rank (§4.D) is defined over,
    /// deliberately ignoring qualifiers (a `const float` and a `float` are the
    /// same *type* for conversion purposes).
    #[must_use]
    pub fn shape_eq(&self, other: &Self) -> bool {
        self.basetype == other.basetype
            && self.rows == other.rows
            && self.cols == other.cols
            && self.array_length == other.array_length
            && self.struct_def == other.struct_def
            && self.texture_dim == other.texture_dim
    }
}

/// Implicit-conversion rank: `0` means "not implicitly convertible"; lower
/// non-zero ranks are better matches; `1` means a perfect match (§4.D, §8
/// property 5: `rank(T, U) == 1 <=> T == U`).
#[must_use]
pub fn rank(src: &Type, dst: &Type) -> u32 {
    if src.is_array() || dst.is_array() {
        return if arrays_compatible(src, dst) { 1 } else { 0 };
    }

    if src.basetype == BaseType::Struct || dst.basetype == BaseType::Struct {
        return if src.basetype == dst.basetype && src.struct_def == dst.struct_def { 1 } else { 0 };
    }

    if src.basetype == dst.basetype && src.rows == dst.rows && src.cols == dst.cols {
        return 1;
    }

    if !src.is_numeric() || !dst.is_numeric() {
        return 0;
    }

    // to->     bool int uint float
    const BASE: [[u32; 4]; 4] = [
        [0, 5, 5, 5], // from bool
        [4, 0, 3, 5], // from int
        [4, 2, 0, 5], // from uint
        [4, 4, 4, 0], // from float
    ];
    let si = src.basetype.numeric_index().expect("checked is_numeric above");
    let di = dst.basetype.numeric_index().expect("checked is_numeric above");
    let base = BASE[si][di] << 2;

    let shape = if src.rows == dst.rows && src.cols == dst.cols {
        0
    } else if src.is_scalar() {
        2 // scalar -> vector/matrix (broadcast)
    } else if src.cols == 1 && dst.cols == 1 && dst.rows < src.rows {
        32 // vector -> scalar, or vector -> a narrower vector
    } else {
        return 0; // vector/matrix-ness or element count otherwise differ
    };

    base | shape
}

fn arrays_compatible(src: &Type, dst: &Type) -> bool {
    if src.basetype != dst.basetype || src.rows != dst.rows || src.cols != dst.cols {
        return false;
    }
    if src.basetype == BaseType::Struct && src.struct_def != dst.struct_def {
        return false;
    }
    match (src.array_length, dst.array_length) {
        (a, _) if a == ARRAY_NOT_AN_ARRAY => false,
        (_, ARRAY_UNSIZED) => true,
        (a, b) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inout_is_in_or_out() {
        assert_eq!(Qualifiers::INOUT, Qualifiers::IN | Qualifiers::OUT);
    }

    #[test]
    fn perfect_match_iff_equal() {
        let a = Type::vector(BaseType::Float, 4);
        let b = Type::vector(BaseType::Float, 4);
        assert_eq!(rank(&a, &b), 1);
        let c = Type::vector(BaseType::Float, 3);
        assert_ne!(rank(&a, &c), 1);
    }

    #[test]
    fn scalar_to_vector_broadcasts_with_small_penalty() {
        let scalar = Type::scalar(BaseType::Float);
        let vec4 = Type::vector(BaseType::Float, 4);
        assert_eq!(rank(&scalar, &vec4), 2);
    }

    #[test]
    fn vector_to_scalar_is_a_truncating_conversion() {
        let vec4 = Type::vector(BaseType::Float, 4);
        let scalar = Type::scalar(BaseType::Float);
        assert_eq!(rank(&vec4, &scalar), 32);
    }

    #[test]
    fn mismatched_vector_lengths_without_scalar_are_incompatible() {
        let vec2 = Type::vector(BaseType::Float, 2);
        let vec4 = Type::vector(BaseType::Float, 4);
        // 4 -> 2 is a narrowing vector conversion (allowed, rank 32 + base);
        // 2 -> 4 is not narrowing and not scalar, so it is incompatible.
        assert_eq!(rank(&vec2, &vec4), 0);
        assert_ne!(rank(&vec4, &vec2), 0);
    }

    #[test]
    fn bool_to_int_uses_base_table() {
        let b = Type::scalar(BaseType::Bool);
        let i = Type::scalar(BaseType::Int);
        assert_eq!(rank(&b, &i), 5 << 2);
    }

    #[test]
    fn arrays_only_convert_to_themselves_or_unsized() {
        let fixed = Type::vector(BaseType::Float, 4).as_array(3);
        let other_fixed = Type::vector(BaseType::Float, 4).as_array(5);
        let unsized_dst = Type::vector(BaseType::Float, 4).as_array(ARRAY_UNSIZED);
        assert_eq!(rank(&fixed, &other_fixed), 0);
        assert_eq!(rank(&fixed, &unsized_dst), 1);
    }

    #[test]
    fn structs_convert_only_to_the_same_definition() {
        let s1 = Type::struct_type(StructId::new(0));
        let s2 = Type::struct_type(StructId::new(0));
        let s3 = Type::struct_type(StructId::new(1));
        assert_eq!(rank(&s1, &s2), 1);
        assert_eq!(rank(&s1, &s3), 0);
    }
}
