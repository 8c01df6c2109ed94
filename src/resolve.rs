//! Overload resolver (spec component H).
//!
//! Grounded on `ouros::signature` (matching a call's arguments against a
//! parameter list) generalized to the spec's rank-vector comparison, with
//! `smallvec::SmallVec` for the per-candidate rank vector the way the
//! teacher uses `smallvec` for other short-lived small collections.

use smallvec::SmallVec;

use crate::arena::Ast;
use crate::ast::Callee;
use crate::intrinsics;
use crate::symbols::{Declaration, Scope, SymbolTable};
use crate::types::{rank, Type};

/// Why a call could not be resolved to a single callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// No declaration with this name is visible at all.
    Undeclared,
    /// Some candidates exist (matching name/arity) but none accept these
    /// argument types.
    NoViableOverload,
    /// Two or more equally-good candidates matched.
    Ambiguous,
}

pub struct Resolution {
    pub callee: Callee,
    pub ret: Type,
}

struct Candidate {
    callee: Callee,
    params: SmallVec<[Type; 4]>,
    ret: Type,
}

/// Resolves `name(args)` as seen from `scope`: user functions first
/// (namespace-level aware, via the symbol table), then the intrinsic
/// catalog. Returns `Err(Undeclared)` only when not even a same-named,
/// wrong-arity declaration exists — that distinction lets the caller choose
/// between X3004 and X3013.
pub fn resolve_call(
    name: &str,
    args: &[Type],
    scope: &Scope,
    symbols: &SymbolTable,
    ast: &Ast,
) -> Result<Resolution, ResolveError> {
    let user_indices = symbols.find_functions(name, scope);
    let any_user_declared = !user_indices.is_empty();

    let user_candidates: Vec<Candidate> = user_indices
        .into_iter()
        .filter(|&idx| ast.functions[idx].params.len() == args.len())
        .map(|idx| {
            let func = &ast.functions[idx];
            let params = func.params.iter().map(|&vid| ast.var(vid).ty).collect();
            Candidate { callee: Callee::User(idx), params, ret: func.return_type }
        })
        .collect();

    if let Some(resolution) = pick_best(&user_candidates, args)? {
        return Ok(resolution);
    }

    let intrinsic_sigs = intrinsics::candidates(name);
    let any_intrinsic_declared = !intrinsic_sigs.is_empty();

    let intrinsic_candidates: Vec<Candidate> = intrinsic_sigs
        .into_iter()
        .filter(|sig| sig.params.len() == args.len())
        .map(|sig| Candidate { callee: Callee::Intrinsic(sig.op), params: sig.params.clone().into(), ret: sig.ret })
        .collect();

    if let Some(resolution) = pick_best(&intrinsic_candidates, args)? {
        return Ok(resolution);
    }

    if any_user_declared || any_intrinsic_declared {
        Err(ResolveError::NoViableOverload)
    } else {
        Err(ResolveError::Undeclared)
    }
}

/// `Ok(None)` means "no viable candidate in this set, try the next set";
/// `Err` is returned only for an in-set ambiguity, since an ambiguity
/// between (say) two user overloads must not be masked by falling through
/// to intrinsics.
fn pick_best(candidates: &[Candidate], args: &[Type]) -> Result<Option<Resolution>, ResolveError> {
    let mut best: Option<(usize, SmallVec<[u32; 4]>)> = None;
    let mut tied = false;

    for (i, candidate) in candidates.iter().enumerate() {
        let Some(ranks) = rank_vector(&candidate.params, args) else { continue };
        match &best {
            None => best = Some((i, ranks)),
            Some((_, best_ranks)) => match ranks.cmp(best_ranks) {
                std::cmp::Ordering::Less => {
                    best = Some((i, ranks));
                    tied = false;
                }
                std::cmp::Ordering::Equal => tied = true,
                std::cmp::Ordering::Greater => {}
            },
        }
    }

    match best {
        None => Ok(None),
        Some(_) if tied => Err(ResolveError::Ambiguous),
        Some((i, _)) => {
            let winner = &candidates[i];
            Ok(Some(Resolution { callee: winner.callee, ret: winner.ret }))
        }
    }
}

/// Per-argument conversion ranks, sorted descending so lexicographic
/// comparison matches worst-rank-first (§4.D). `None` if any argument is
/// non-viable (rank 0) — such a candidate is excluded entirely rather than
/// kept as an always-losing entry, since it can never win a comparison.
fn rank_vector(params: &[Type], args: &[Type]) -> Option<SmallVec<[u32; 4]>> {
    if params.len() != args.len() {
        return None;
    }
    let mut ranks: SmallVec<[u32; 4]> = SmallVec::with_capacity(args.len());
    for (param, arg) in params.iter().zip(args) {
        let r = rank(arg, param);
        if r == 0 {
            return None;
        }
        ranks.push(r);
    }
    ranks.sort_unstable_by(|a, b| b.cmp(a));
    Some(ranks)
}

/// Whether `callee` refers to `enclosing_function` — used by the expression
/// parser to reject recursive calls (X3500).
#[must_use]
pub fn is_recursive_call(callee: Callee, enclosing_function: Option<usize>) -> bool {
    matches!((callee, enclosing_function), (Callee::User(idx), Some(enclosing)) if idx == enclosing)
}

/// Finds the variable/struct declaration (if any) shadowing `name` — used by
/// the expression parser to emit X3005 ("represents a variable, not a
/// function") before even attempting resolution.
#[must_use]
pub fn shadowing_non_function(name: &str, scope: &Scope, symbols: &SymbolTable) -> Option<Declaration> {
    match symbols.find(name, scope, false) {
        Some(decl @ (Declaration::Var(_) | Declaration::Struct(_))) => Some(decl),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FunctionDecl;
    use crate::diagnostics::{Location, SourceId};
    use crate::symbols::Declaration;
    use crate::types::BaseType;

    fn loc() -> Location {
        Location::new(SourceId::default(), 1, 1)
    }

    fn declare_function(ast: &mut Ast, symbols: &mut SymbolTable, name: &str, params: &[Type], ret: Type) -> usize {
        let param_ids = params.iter().map(|&ty| ast.alloc_var(crate::ast::VarDecl {
            name: "p".to_string(),
            ty,
            semantic: None,
            annotations: Vec::new(),
            initializer: None,
            property_block: None,
            loc: loc(),
            duplicate_qualifier: false,
        })).collect();
        ast.functions.push(FunctionDecl {
            name: name.to_string(),
            return_type: ret,
            params: param_ids,
            body: Vec::new(),
            semantic: None,
            namespace_path: String::new(),
            loc: loc(),
        });
        let idx = ast.functions.len() - 1;
        symbols.insert(name, Declaration::Function(idx), true).unwrap();
        idx
    }

    #[test]
    fn falls_back_to_intrinsics_when_no_user_function_matches() {
        let ast = Ast::new();
        let symbols = SymbolTable::new();
        let scope = symbols.current_scope();
        let args = [Type::vector(BaseType::Float, 4)];
        let resolution = resolve_call("abs", &args, &scope, &symbols, &ast).unwrap();
        assert_eq!(resolution.callee, Callee::Intrinsic(intrinsics::IntrinsicOp::Abs));
    }

    #[test]
    fn user_function_shadows_an_identically_named_intrinsic() {
        let mut ast = Ast::new();
        let mut symbols = SymbolTable::new();
        let idx = declare_function(&mut ast, &mut symbols, "abs", &[Type::scalar(BaseType::Int)], Type::scalar(BaseType::Int));
        let scope = symbols.current_scope();
        let args = [Type::scalar(BaseType::Int)];
        let resolution = resolve_call("abs", &args, &scope, &symbols, &ast).unwrap();
        assert_eq!(resolution.callee, Callee::User(idx));
    }

    #[test]
    fn wrong_arg_count_for_every_candidate_is_undeclared_if_the_name_is_unknown() {
        let ast = Ast::new();
        let symbols = SymbolTable::new();
        let scope = symbols.current_scope();
        let args = [Type::scalar(BaseType::Float)];
        assert_eq!(resolve_call("frobnicate", &args, &scope, &symbols, &ast), Err(ResolveError::Undeclared));
    }

    #[test]
    fn wrong_argument_type_for_a_known_name_is_no_viable_overload() {
        let ast = Ast::new();
        let symbols = SymbolTable::new();
        let scope = symbols.current_scope();
        let args = [Type::scalar(BaseType::Sampler), Type::scalar(BaseType::Sampler)];
        // "abs" exists (rows 1..=4, one float-shaped argument) but never
        // takes two samplers, and no user overload exists either.
        assert_eq!(resolve_call("abs", &args, &scope, &symbols, &ast), Err(ResolveError::NoViableOverload));
    }

    #[test]
    fn two_equally_good_user_overloads_are_ambiguous() {
        let mut ast = Ast::new();
        let mut symbols = SymbolTable::new();
        declare_function(&mut ast, &mut symbols, "f", &[Type::scalar(BaseType::Int)], Type::void());
        declare_function(&mut ast, &mut symbols, "f", &[Type::scalar(BaseType::Int)], Type::void());
        let scope = symbols.current_scope();
        let args = [Type::scalar(BaseType::Int)];
        assert_eq!(resolve_call("f", &args, &scope, &symbols, &ast), Err(ResolveError::Ambiguous));
    }

    #[test]
    fn recursive_call_detection_matches_the_enclosing_function() {
        assert!(is_recursive_call(Callee::User(3), Some(3)));
        assert!(!is_recursive_call(Callee::User(3), Some(4)));
        assert!(!is_recursive_call(Callee::User(3), None));
    }
}
