//! AST arena (spec component C).
//!
//! Append-only pools that allocate typed nodes and return stable, `Copy`
//! handles so parents can reference children without tracking lifetimes
//! individually. Grounded directly on the teacher's index-wrapper idiom:
//! `ouros::namespace::NamespaceId(u32)` and `ouros::intern::StringId(u32)`
//! both wrap a raw index behind a constructor and an `index()` accessor
//! instead of handing out references or raw pointers.

use crate::ast::{ExprNode, FunctionDecl, StmtNode, StructDef, TechniqueDecl, VarDecl};

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(u32::try_from(index).expect("AST arena overflow (more than u32::MAX nodes)"))
            }

            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(ExprId);
arena_id!(StmtId);
arena_id!(VarId);
arena_id!(StructId);

/// Owns every node produced while parsing one compilation unit.
///
/// Top-level declarations (structs, global variables, functions, techniques)
/// are owned directly in their respective vectors — there is exactly one of
/// each, in source order, and nothing else references them by handle except
/// `Type::struct_def` (a [`StructId`]) and variable references (a [`VarId`]).
/// Expression and statement *bodies* are the only part of the tree with
/// internal sharing concerns (an `if`'s `then` branch, a loop's body, ...),
/// so those go through the arena pools and are addressed by [`ExprId`]/[`StmtId`].
#[derive(Debug, Default)]
pub struct Ast {
    exprs: Vec<ExprNode>,
    stmts: Vec<StmtNode>,
    vars: Vec<VarDecl>,
    pub structs: Vec<StructDef>,
    pub functions: Vec<FunctionDecl>,
    pub techniques: Vec<TechniqueDecl>,
    /// Indices (into `vars`) of every global (non-local) variable, in source order.
    pub uniforms: Vec<VarId>,
}

impl Ast {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_expr(&mut self, node: ExprNode) -> ExprId {
        self.exprs.push(node);
        ExprId::new(self.exprs.len() - 1)
    }

    pub fn alloc_stmt(&mut self, node: StmtNode) -> StmtId {
        self.stmts.push(node);
        StmtId::new(self.stmts.len() - 1)
    }

    pub fn alloc_var(&mut self, node: VarDecl) -> VarId {
        self.vars.push(node);
        VarId::new(self.vars.len() - 1)
    }

    pub fn alloc_struct(&mut self, node: StructDef) -> StructId {
        self.structs.push(node);
        StructId::new(self.structs.len() - 1)
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &ExprNode {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprNode {
        &mut self.exprs[id.index()]
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &StmtNode {
        &self.stmts[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut StmtNode {
        &mut self.stmts[id.index()]
    }

    #[must_use]
    pub fn var(&self, id: VarId) -> &VarDecl {
        &self.vars[id.index()]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut VarDecl {
        &mut self.vars[id.index()]
    }

    #[must_use]
    pub fn struct_def(&self, id: StructId) -> &StructDef {
        &self.structs[id.index()]
    }

    /// Total expression-node count, for tests exercising arena growth.
    #[must_use]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, LiteralValue};
    use crate::diagnostics::{Location, SourceId};
    use crate::types::Type;

    fn dummy_loc() -> Location {
        Location::new(SourceId::default(), 1, 1)
    }

    #[test]
    fn handles_stay_stable_as_the_arena_grows() {
        let mut ast = Ast::new();
        let first = ast.alloc_expr(ExprNode {
            kind: ExprKind::Literal(LiteralValue::Bool(smallvec::smallvec![true])),
            ty: Type::scalar(crate::types::BaseType::Bool),
            loc: dummy_loc(),
        });
        for _ in 0..64 {
            ast.alloc_expr(ExprNode {
                kind: ExprKind::Literal(LiteralValue::Bool(smallvec::smallvec![false])),
                ty: Type::scalar(crate::types::BaseType::Bool),
                loc: dummy_loc(),
            });
        }
        assert_eq!(ast.expr_count(), 65);
        match &ast.expr(first).kind {
            ExprKind::Literal(LiteralValue::Bool(v)) => assert_eq!(v.as_slice(), [true]),
            _ => panic!("expected literal"),
        }
    }
}
