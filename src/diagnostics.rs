//! Source buffer & diagnostics (spec component A).
//!
//! Owns the source string identity and the append-only diagnostic buffer.
//! Mirrors the teacher's (`ouros::exception_private`) choice of a hand-rolled,
//! `strum`-derived error enum over `thiserror`/`anyhow`.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Index into the small table of logical source names a [`Diagnostics`] buffer
/// tracks. In practice a compilation unit has exactly one, but the type keeps
/// `Location` `Copy` without baking a single source name into every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct SourceId(u32);

impl SourceId {
    fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("source name table overflow"))
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// `{ source-name, line, column }`, attached to every token and AST node (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub source: SourceId,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(source: SourceId, line: u32, column: u32) -> Self {
        Self { source, line, column }
    }
}

/// Error and warning kinds, keyed by the numeric codes of spec.md §7.
///
/// The `Display` impl (via `strum`) yields the bare variant name; [`DiagCode::code`]
/// gives the `X####` form used in formatted diagnostics, and [`DiagCode::default_message`]
/// gives a template close to the original compiler's wording (see SPEC_FULL.md §B.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum DiagCode {
    SyntaxUnexpectedToken,
    Redefinition,
    UndeclaredIdentifier,
    KindMismatch,
    ExternOnLocal,
    StaticOnParameter,
    ValueMustBeLiteral,
    ConstNoInitializer,
    NoViableOverload,
    WrongArgCountConstructor,
    TypeConversionFailure,
    InvalidSubscript,
    ScalarExpected,
    TypeMismatch,
    ScalarVectorMatrixExpected,
    LValueConstOrUniform,
    NonNumericConstructor,
    VoidOrLocalDisallowed,
    OutputParamConst,
    BadQualifierPlacement,
    VectorDimensionOutOfRange,
    MatrixDimensionOutOfRange,
    BadQualifierOnMember,
    ArrayDimensionNotLiteral,
    ArrayDimensionOutOfRange,
    AmbiguousCall,
    VoidFunctionWithSemantic,
    ReturnValueInVoidFunction,
    ReturnMissingValue,
    IntegralTypeRequired,
    ObjectHasNoMethods,
    StructHasNoMethods,
    NonScalarSubscriptIndex,
    NonIndexableSubscriptBase,
    BadVectorElementType,
    BadMatrixElementType,
    RecursiveCall,
    BadInterpolationOnInteger,
    ImplicitUniformWarning,
    EmptyStructWarning,
    EmptySwitchWarning,
    ImplicitTruncationWarning,
    DuplicateQualifierWarning,
}

impl DiagCode {
    /// The numeric `X####` code from spec.md §7.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::SyntaxUnexpectedToken => 3000,
            Self::Redefinition => 3003,
            Self::UndeclaredIdentifier => 3004,
            Self::KindMismatch => 3005,
            Self::ExternOnLocal => 3006,
            Self::StaticOnParameter => 3007,
            Self::ValueMustBeLiteral => 3011,
            Self::ConstNoInitializer => 3012,
            Self::NoViableOverload => 3013,
            Self::WrongArgCountConstructor => 3014,
            Self::TypeConversionFailure => 3017,
            Self::InvalidSubscript => 3018,
            Self::ScalarExpected => 3019,
            Self::TypeMismatch => 3020,
            Self::ScalarVectorMatrixExpected => 3022,
            Self::LValueConstOrUniform => 3025,
            Self::NonNumericConstructor => 3037,
            Self::VoidOrLocalDisallowed => 3038,
            Self::OutputParamConst => 3046,
            Self::BadQualifierPlacement => 3047,
            Self::VectorDimensionOutOfRange => 3052,
            Self::MatrixDimensionOutOfRange => 3053,
            Self::BadQualifierOnMember => 3055,
            Self::ArrayDimensionNotLiteral => 3058,
            Self::ArrayDimensionOutOfRange => 3059,
            Self::AmbiguousCall => 3067,
            Self::VoidFunctionWithSemantic => 3076,
            Self::ReturnValueInVoidFunction => 3079,
            Self::ReturnMissingValue => 3080,
            Self::IntegralTypeRequired => 3082,
            Self::ObjectHasNoMethods => 3087,
            Self::StructHasNoMethods => 3088,
            Self::NonScalarSubscriptIndex => 3120,
            Self::NonIndexableSubscriptBase => 3121,
            Self::BadVectorElementType => 3122,
            Self::BadMatrixElementType => 3123,
            Self::RecursiveCall => 3500,
            Self::BadInterpolationOnInteger => 4576,
            Self::ImplicitUniformWarning => 5000,
            Self::EmptyStructWarning => 5001,
            Self::EmptySwitchWarning => 5002,
            Self::ImplicitTruncationWarning => 3206,
            Self::DuplicateQualifierWarning => 3048,
        }
    }

    /// Whether this code is a warning (never aborts the parse) or an error.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::ImplicitUniformWarning
            | Self::EmptyStructWarning
            | Self::EmptySwitchWarning
            | Self::ImplicitTruncationWarning
            | Self::DuplicateQualifierWarning => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// A single emitted diagnostic, formatted as
/// `source(line, column): {error|warning} X<code>: <text>`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub location: Location,
    pub code: DiagCode,
    pub message: String,
}

/// Owns the source string identity and the append-only list of emitted
/// diagnostics for one compilation unit.
///
/// Diagnostics are strictly append-only (§4.A): speculative parsing via
/// [`crate::lexer::Lexer::backup`]/`restore` does not rewind anything emitted
/// before the restore point.
#[derive(Debug, Default)]
pub struct Diagnostics {
    source_names: Vec<String>,
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a logical source name, returning its [`SourceId`].
    pub fn add_source(&mut self, name: impl Into<String>) -> SourceId {
        self.source_names.push(name.into());
        SourceId::new(self.source_names.len() - 1)
    }

    fn source_name(&self, id: SourceId) -> &str {
        &self.source_names[id.index()]
    }

    pub fn push(&mut self, location: Location, code: DiagCode, message: impl Into<String>) {
        self.messages.push(Diagnostic { location, code, message: message.into() });
    }

    #[must_use]
    pub fn messages(&self) -> &[Diagnostic] {
        &self.messages
    }

    /// Whether any error-severity diagnostic (as opposed to warning) was emitted.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.code.severity() == Severity::Error)
    }

    /// Renders the full diagnostic buffer, one formatted line per message,
    /// in emission order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for diag in &self.messages {
            use std::fmt::Write as _;
            let _ = writeln!(
                out,
                "{}({}, {}): {} X{}: {}",
                self.source_name(diag.location.source),
                diag.location.line,
                diag.location.column,
                diag.code.severity(),
                diag.code.code(),
                diag.message,
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_like_the_source_compiler() {
        let mut diags = Diagnostics::new();
        let src = diags.add_source("test.fx");
        diags.push(
            Location::new(src, 3, 9),
            DiagCode::SyntaxUnexpectedToken,
            "syntax error: unexpected ';', expected ')'",
        );
        assert_eq!(
            diags.render(),
            "test.fx(3, 9): error X3000: syntax error: unexpected ';', expected ')'\n"
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diags = Diagnostics::new();
        let src = diags.add_source("test.fx");
        diags.push(Location::new(src, 1, 1), DiagCode::ImplicitUniformWarning, "msg");
        assert!(!diags.has_errors());
    }
}
