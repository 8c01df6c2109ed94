//! Symbol table (spec component E): hierarchical block/namespace scopes and
//! the unqualified-name -> declaration-stack multimap.
//!
//! Grounded on `ouros::namespace` (`Namespace`/`Namespaces`, a stack of
//! scopes with explicit enter/leave operations) generalized from "flat
//! module-level vs. local" to full namespace nesting, and on `ahash` for the
//! name -> entries map (the teacher uses `ahash::AHashMap` everywhere it
//! would otherwise reach for `std::collections::HashMap`).

use ahash::AHashMap;

use crate::arena::{StructId, VarId};

/// `{ namespace_path, level, namespace_level }` (§3). `level` is the
/// block-nesting depth; `namespace_level` counts only namespace boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub namespace_path: String,
    pub level: u32,
    pub namespace_level: u32,
}

/// What an unqualified name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    Var(VarId),
    Struct(StructId),
    /// Index into `Ast::functions`. Functions form an overload set: several
    /// `Declaration::Function` entries may share a name.
    Function(usize),
}

#[derive(Debug, Clone)]
struct Entry {
    scope: Scope,
    decl: Declaration,
    /// Globals are registered at every namespace-prefix cut (§3) and are
    /// never removed by `leave_scope`/`leave_namespace` — only ordinary
    /// block-local declarations are scope-cleaned.
    global: bool,
}

/// Error returned by [`SymbolTable::insert`] when a non-function symbol
/// collides with an existing declaration in the same scope (X3003).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redefinition;

#[derive(Debug, Default)]
pub struct SymbolTable {
    table: AHashMap<String, Vec<Entry>>,
    /// Enclosing-function stack, used to reject recursive calls (X3500):
    /// the innermost entry is the function currently being parsed.
    parent_stack: Vec<usize>,
    namespace_path: String,
    level: u32,
    namespace_level: u32,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current_scope(&self) -> Scope {
        Scope { namespace_path: self.namespace_path.clone(), level: self.level, namespace_level: self.namespace_level }
    }

    pub fn enter_scope(&mut self) {
        self.level += 1;
    }

    /// Leaves the current block scope, removing any non-global symbol entries
    /// declared within it.
    pub fn leave_scope(&mut self) {
        let leaving = self.level;
        self.level -= 1;
        for entries in self.table.values_mut() {
            entries.retain(|e| e.global || e.scope.level < leaving);
        }
    }

    pub fn enter_namespace(&mut self, name: &str) {
        self.namespace_path.push_str(name);
        self.namespace_path.push_str("::");
        self.level += 1;
        self.namespace_level += 1;
    }

    pub fn leave_namespace(&mut self, name: &str) {
        let suffix = format!("{name}::");
        debug_assert!(self.namespace_path.ends_with(&suffix), "mismatched enter/leave_namespace");
        let new_len = self.namespace_path.len() - suffix.len();
        self.namespace_path.truncate(new_len);
        self.namespace_level -= 1;
        self.leave_scope();
    }

    pub fn enter_function(&mut self, function_index: usize) {
        self.parent_stack.push(function_index);
        self.enter_scope();
    }

    pub fn leave_function(&mut self) {
        self.parent_stack.pop();
        self.leave_scope();
    }

    #[must_use]
    pub fn nearest_enclosing_function(&self) -> Option<usize> {
        self.parent_stack.last().copied()
    }

    /// Registers `decl` under `name`. For a function, duplicates are always
    /// allowed (the overload set); for anything else, a collision with an
    /// existing declaration of the same unqualified name in the current
    /// scope is a redefinition. When `global`, `decl` is additionally
    /// registered under every suffix cut of the current namespace path (§3),
    /// so e.g. a symbol declared at `::a::b::f` is also findable as `b::f`
    /// from within `::a` and as `f` from within `::a::b`.
    pub fn insert(&mut self, name: &str, decl: Declaration, global: bool) -> Result<(), Redefinition> {
        if !matches!(decl, Declaration::Function(_)) {
            if let Some(existing) = self.table.get(name) {
                let collides = existing
                    .iter()
                    .any(|e| e.scope.level == self.level && e.scope.namespace_path == self.namespace_path);
                if collides {
                    return Err(Redefinition);
                }
            }
        }

        let scope = self.current_scope();
        if global {
            for key in suffix_cuts(&self.namespace_path, name) {
                self.table.entry(key).or_default().push(Entry { scope: scope.clone(), decl, global: true });
            }
        } else {
            self.table.entry(name.to_string()).or_default().push(Entry { scope, decl, global: false });
        }
        Ok(())
    }

    /// Looks up `name` as seen from `scope`, scanning the most recently
    /// inserted matching entry first. Variables and structs shadow
    /// functions; if only function declarations are visible, the first one
    /// seen is returned (the overload resolver does the real disambiguation).
    /// With `exclusive`, entries shallower than `scope.level` are skipped —
    /// used for the redefinition check, which must only see entries
    /// introduced at-or-below the current block.
    #[must_use]
    pub fn find(&self, name: &str, scope: &Scope, exclusive: bool) -> Option<Declaration> {
        let entries = self.table.get(name)?;
        let mut fallback_function = None;
        for entry in entries.iter().rev() {
            if entry.scope.level > scope.level || entry.scope.namespace_level > scope.namespace_level {
                continue;
            }
            if entry.scope.namespace_level == scope.namespace_level
                && entry.scope.namespace_path != scope.namespace_path
            {
                continue;
            }
            if exclusive && entry.scope.level < scope.level {
                continue;
            }
            match entry.decl {
                Declaration::Function(_) => fallback_function.get_or_insert(entry.decl),
                _ => return Some(entry.decl),
            };
        }
        fallback_function
    }

    /// All function-overload entries visible for `name` from `scope`, most
    /// recently declared first — input to the overload resolver (§4.H).
    #[must_use]
    pub fn find_functions(&self, name: &str, scope: &Scope) -> Vec<usize> {
        let Some(entries) = self.table.get(name) else { return Vec::new() };
        entries
            .iter()
            .rev()
            .filter(|e| e.scope.level <= scope.level && e.scope.namespace_level <= scope.namespace_level)
            .filter(|e| {
                e.scope.namespace_level != scope.namespace_level || e.scope.namespace_path == scope.namespace_path
            })
            .filter_map(|e| match e.decl {
                Declaration::Function(idx) => Some(idx),
                _ => None,
            })
            .collect()
    }
}

fn suffix_cuts(namespace_path: &str, name: &str) -> Vec<String> {
    let full = format!("{namespace_path}{name}");
    let mut keys = vec![full.clone()];
    let mut rest = full.as_str();
    while let Some(idx) = rest.find("::") {
        rest = &rest[idx + 2..];
        keys.push(rest.to_string());
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_symbol_is_findable_at_every_namespace_suffix() {
        let mut table = SymbolTable::new();
        table.enter_namespace("a");
        table.enter_namespace("b");
        table.insert("f", Declaration::Function(0), true).unwrap();
        let scope_inside_b = table.current_scope();
        table.leave_namespace("b");
        let scope_inside_a = table.current_scope();
        table.leave_namespace("a");
        let scope_global = table.current_scope();

        assert!(table.find("a::b::f", &scope_global, false).is_some());
        assert!(table.find("b::f", &scope_inside_a, false).is_some());
        assert!(table.find("f", &scope_inside_b, false).is_some());
    }

    #[test]
    fn block_locals_are_removed_on_scope_leave() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.insert("x", Declaration::Var(VarId::new(0)), false).unwrap();
        let inner_scope = table.current_scope();
        assert!(table.find("x", &inner_scope, false).is_some());
        table.leave_scope();
        let outer_scope = table.current_scope();
        assert!(table.find("x", &outer_scope, false).is_none());
    }

    #[test]
    fn redefinition_is_rejected_but_overloads_are_not() {
        let mut table = SymbolTable::new();
        table.insert("x", Declaration::Var(VarId::new(0)), true).unwrap();
        assert_eq!(table.insert("x", Declaration::Var(VarId::new(1)), true), Err(Redefinition));

        table.insert("f", Declaration::Function(0), true).unwrap();
        assert!(table.insert("f", Declaration::Function(1), true).is_ok());
    }

    #[test]
    fn variables_shadow_functions_in_find() {
        let mut table = SymbolTable::new();
        table.insert("g", Declaration::Function(0), true).unwrap();
        table.enter_scope();
        table.insert("g", Declaration::Var(VarId::new(5)), false).unwrap();
        let scope = table.current_scope();
        assert_eq!(table.find("g", &scope, false), Some(Declaration::Var(VarId::new(5))));
    }
}
