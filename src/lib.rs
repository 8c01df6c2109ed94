//! Front end for the FX shading language: lexer, parser, type checker,
//! overload resolver, and constant folder.
//!
//! Grounded on the teacher's own crate root (`ouros::lib`), which re-exports
//! its entry point and little else, leaving every internal module private to
//! the crate. This crate follows the same shape: [`parse`] is the only public
//! function, and it returns the parsed [`arena::Ast`] together with every
//! diagnostic collected along the way, rather than a `Result` that discards
//! partial output on the first error (spec.md §6: a caller wants the partial
//! tree plus the full diagnostic list even on failure).

pub mod arena;
pub mod ast;
mod diagnostics;
mod fold;
mod intrinsics;
mod lexer;
pub mod limits;
mod parser;
mod resolve;
mod symbols;
pub mod types;

pub use diagnostics::{DiagCode, Diagnostic, Location, Severity, SourceId};
pub use intrinsics::IntrinsicOp;
pub use limits::ParseLimits;

/// Parses one compilation unit.
///
/// `source_name` identifies the unit in rendered diagnostics; it carries no
/// other meaning (SPEC_FULL.md §B.4 — a caller that preprocessed the source
/// itself may want this to be the original file name rather than whatever
/// path the preprocessor last touched).
///
/// Returns the parsed tree (valid and walkable even when parsing failed —
/// every node that could not be resolved still carries a placeholder `Type`
/// rather than leaving a hole), the full diagnostic buffer in emission order,
/// and whether any error-severity diagnostic was raised.
#[must_use]
pub fn parse(source: &str, source_name: &str, limits: ParseLimits) -> (arena::Ast, Vec<Diagnostic>, bool) {
    let (ast, diags, success) = parser::parse(source, source_name, limits);
    (ast, diags.messages().to_vec(), success)
}

/// Same as [`parse`], but renders the diagnostic buffer to the
/// `source(line, column): severity X####: message` text format used
/// throughout spec.md §7 instead of returning structured [`Diagnostic`]s.
#[must_use]
pub fn parse_to_text(source: &str, source_name: &str, limits: ParseLimits) -> (arena::Ast, String, bool) {
    let (ast, diags, success) = parser::parse(source, source_name, limits);
    (ast, diags.render(), success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_shader_with_no_diagnostics() {
        let source = r"
            texture2D tex;
            sampler2D samp;

            float4 main(float2 uv : TEXCOORD0) : SV_Target
            {
                float4 color = tex2D(samp, uv);
                return color * 2.0;
            }
        ";
        let (ast, diags, ok) = parse(source, "minimal.fx", ParseLimits::default());
        assert!(ok, "unexpected diagnostics: {diags:?}");
        assert_eq!(ast.functions.len(), 1);
        assert_eq!(ast.uniforms.len(), 2);
    }

    #[test]
    fn reports_undeclared_identifier_but_still_returns_a_tree() {
        let source = "float f() { return undeclared_name; }";
        let (ast, diags, ok) = parse(source, "bad.fx", ParseLimits::default());
        assert!(!ok);
        assert!(diags.iter().any(|d| d.code == DiagCode::UndeclaredIdentifier));
        assert_eq!(ast.functions.len(), 1);
    }
}
