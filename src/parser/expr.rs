//! Expression parser (spec component F).
//!
//! Precedence-climbing binary/assignment/conditional parser over a unary
//! parser that handles prefixes, the `(T)expr` cast form, and postfix
//! field/swizzle/index/call chains. Every constructed node is folded
//! immediately via [`crate::fold`] when all of its operands are literals,
//! so an `Ast` never carries a foldable-but-unfolded subtree (§8 property).
//!
//! Grounded on `examples/original_source/source/FX/Parser.cpp`'s
//! `parse_expression`/`parse_expression_assignment`/`parse_expression_unary`/
//! `parse_expression_multary` family (precedence-climbing over an explicit
//! operator-to-precedence table) and on `resolve.rs`/`fold.rs` for the two
//! points a parsed call/literal subtree gets resolved and reduced.

use smallvec::smallvec;

use ahash::AHashMap;

use crate::ast::{AssignOp, BinaryOp, Callee, ExprKind, ExprNode, LiteralValue, StmtKind, SwizzleSet, UnaryOp};
use crate::arena::{ExprId, VarId};
use crate::diagnostics::{DiagCode, Diagnostics, Location};
use crate::lexer::{Literal, TokenKind};
use crate::resolve::{self, ResolveError};
use crate::symbols::Declaration;
use crate::types::{rank, BaseType, Qualifiers, Type};

use super::Parser;

impl<'a> Parser<'a> {
    /// The comma operator: `a, b, c` evaluates left to right and yields the
    /// type/value of the last operand (§4.F).
    pub(super) fn parse_expression_sequence(&mut self, diags: &mut Diagnostics) -> ExprId {
        let loc = self.loc();
        let first = self.parse_assignment_expression(diags);
        if !matches!(self.peek(), TokenKind::Comma) {
            return first;
        }
        let mut items = vec![first];
        while self.accept(diags, |k| matches!(k, TokenKind::Comma)) {
            items.push(self.parse_assignment_expression(diags));
        }
        let ty = self.ast.expr(*items.last().expect("just pushed")).ty;
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Sequence(items), ty, loc })
    }

    /// Right-associative: `target OP= value`, where a plain `=` is checked
    /// for assignability and conversion rank, and a compound operator is
    /// additionally checked the way the corresponding binary operator would be.
    pub(super) fn parse_assignment_expression(&mut self, diags: &mut Diagnostics) -> ExprId {
        self.enter_expression(diags);
        let loc = self.loc();
        let lhs = self.parse_conditional(diags);
        let result = if let Some(op) = assign_op(self.peek()) {
            self.consume(diags);
            let value = self.parse_assignment_expression(diags);
            self.make_assign(diags, op, lhs, value, loc)
        } else {
            lhs
        };
        self.leave_expression();
        result
    }

    fn enter_expression(&mut self, diags: &mut Diagnostics) {
        self.expr_depth += 1;
        if self.expr_depth > self.limits.max_expression_depth {
            self.error(diags, DiagCode::SyntaxUnexpectedToken, "expression nested too deeply");
        }
    }

    fn leave_expression(&mut self) {
        self.expr_depth -= 1;
    }

    /// `cond ? then : else`, right-associative on the `else` branch so
    /// `a ? b : c ? d : e` parses as `a ? b : (c ? d : e)`.
    fn parse_conditional(&mut self, diags: &mut Diagnostics) -> ExprId {
        let loc = self.loc();
        let cond = self.parse_binary(diags, 1);
        if !self.accept(diags, |k| matches!(k, TokenKind::Question)) {
            return cond;
        }
        let then_branch = self.parse_assignment_expression(diags);
        self.expect(diags, |k| matches!(k, TokenKind::Colon), "':'");
        let else_branch = self.parse_conditional(diags);

        let cond_ty = self.ast.expr(cond).ty;
        if !cond_ty.is_scalar() {
            self.error(diags, DiagCode::ScalarExpected, "condition of '?:' must be scalar");
        }
        let then_ty = self.ast.expr(then_branch).ty;
        let else_ty = self.ast.expr(else_branch).ty;
        let ty = if rank(&else_ty, &then_ty) != 0 {
            then_ty
        } else if rank(&then_ty, &else_ty) != 0 {
            else_ty
        } else {
            self.error(diags, DiagCode::TypeMismatch, "'?:' branches have incompatible types");
            then_ty
        };
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Conditional { cond, then_branch, else_branch }, ty, loc })
    }

    /// Standard precedence climbing: `min_prec` is the lowest-precedence
    /// operator this call is willing to consume (§4.F's eleven-level table,
    /// collapsed to one numeric ladder since every level here is
    /// left-associative).
    fn parse_binary(&mut self, diags: &mut Diagnostics, min_prec: u32) -> ExprId {
        let mut lhs = self.parse_unary(diags);
        loop {
            let Some((op, prec)) = binary_op_and_prec(self.peek()) else { break };
            if prec < min_prec {
                break;
            }
            let loc = self.loc();
            self.consume(diags);
            let rhs = self.parse_binary(diags, prec + 1);
            lhs = self.make_binary(diags, op, lhs, rhs, loc);
        }
        lhs
    }

    fn parse_unary(&mut self, diags: &mut Diagnostics) -> ExprId {
        let loc = self.loc();
        match self.peek().clone() {
            TokenKind::Exclaim => {
                self.consume(diags);
                let operand = self.parse_unary(diags);
                self.make_unary(diags, UnaryOp::Not, operand, loc)
            }
            TokenKind::Plus => {
                self.consume(diags);
                self.parse_unary(diags)
            }
            TokenKind::Minus => {
                self.consume(diags);
                let operand = self.parse_unary(diags);
                self.make_unary(diags, UnaryOp::Negate, operand, loc)
            }
            TokenKind::Tilde => {
                self.consume(diags);
                let operand = self.parse_unary(diags);
                self.make_unary(diags, UnaryOp::BitNot, operand, loc)
            }
            TokenKind::PlusPlus => {
                self.consume(diags);
                let operand = self.parse_unary(diags);
                self.make_unary(diags, UnaryOp::PreIncrement, operand, loc)
            }
            TokenKind::MinusMinus => {
                self.consume(diags);
                let operand = self.parse_unary(diags);
                self.make_unary(diags, UnaryOp::PreDecrement, operand, loc)
            }
            TokenKind::ParenOpen => {
                if let Some(ty) = self.try_parse_cast_prefix(diags) {
                    let operand = self.parse_unary(diags);
                    self.make_cast(diags, ty, operand, loc)
                } else {
                    self.parse_postfix(diags)
                }
            }
            _ => self.parse_postfix(diags),
        }
    }

    /// `(` already seen. Speculatively parses `T)` after it; on success the
    /// cursor sits just past the closing paren and the caller treats what
    /// follows as the cast's operand. On failure the lexer is rewound to
    /// before the `(` so [`Self::parse_postfix`] can reparse it as a group.
    fn try_parse_cast_prefix(&mut self, diags: &mut Diagnostics) -> Option<Type> {
        self.lexer.backup();
        self.consume(diags); // `(`
        if let Some(ty) = self.accept_type_class(diags) {
            if self.accept(diags, |k| matches!(k, TokenKind::ParenClose)) {
                return Some(ty);
            }
        }
        self.lexer.restore(self.source);
        None
    }

    fn parse_postfix(&mut self, diags: &mut Diagnostics) -> ExprId {
        let mut expr = self.parse_primary(diags);
        loop {
            match self.peek().clone() {
                TokenKind::Dot => {
                    self.consume(diags);
                    expr = self.parse_field_or_swizzle(diags, expr);
                }
                TokenKind::BracketOpen => {
                    self.consume(diags);
                    expr = self.parse_index(diags, expr);
                }
                TokenKind::PlusPlus => {
                    let loc = self.loc();
                    self.consume(diags);
                    expr = self.make_unary(diags, UnaryOp::PostIncrement, expr, loc);
                }
                TokenKind::MinusMinus => {
                    let loc = self.loc();
                    self.consume(diags);
                    expr = self.make_unary(diags, UnaryOp::PostDecrement, expr, loc);
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_primary(&mut self, diags: &mut Diagnostics) -> ExprId {
        let loc = self.loc();
        match self.peek().clone() {
            TokenKind::Literal(Literal::Str(_)) => {
                let mut parts = Vec::new();
                while let TokenKind::Literal(Literal::Str(s)) = self.peek().clone() {
                    parts.push(s);
                    self.consume(diags);
                }
                let value = crate::fold::fold_string_run(&parts);
                self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(value), ty: Type::scalar(BaseType::String), loc })
            }
            TokenKind::Literal(lit) => {
                self.consume(diags);
                self.make_numeric_literal(lit, loc)
            }
            TokenKind::True => {
                self.consume(diags);
                self.ast.alloc_expr(ExprNode {
                    kind: ExprKind::Literal(LiteralValue::Bool(smallvec![true])),
                    ty: Type::scalar(BaseType::Bool),
                    loc,
                })
            }
            TokenKind::False => {
                self.consume(diags);
                self.ast.alloc_expr(ExprNode {
                    kind: ExprKind::Literal(LiteralValue::Bool(smallvec![false])),
                    ty: Type::scalar(BaseType::Bool),
                    loc,
                })
            }
            TokenKind::Identifier(name) => {
                self.consume(diags);
                if matches!(self.peek(), TokenKind::ParenOpen) {
                    self.parse_call(diags, &name, loc)
                } else {
                    self.make_variable_reference(diags, &name, loc)
                }
            }
            TokenKind::Shape(shape) => {
                self.consume(diags);
                let ty = Type { rows: shape.rows, cols: shape.cols, ..Type::scalar(shape.basetype) };
                self.parse_constructor_call(diags, ty, loc)
            }
            TokenKind::Vector | TokenKind::Matrix => {
                if let Some(ty) = self.accept_type_class(diags) {
                    self.parse_constructor_call(diags, ty, loc)
                } else {
                    self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a type");
                    self.error_expr(loc)
                }
            }
            TokenKind::ParenOpen => {
                self.consume(diags);
                let inner = self.parse_expression_sequence(diags);
                self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");
                inner
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected an expression");
                if !matches!(self.peek(), TokenKind::Eof) {
                    self.consume(diags);
                }
                self.error_expr(loc)
            }
        }
    }

    fn make_numeric_literal(&mut self, lit: Literal, loc: Location) -> ExprId {
        let (value, ty) = match lit {
            Literal::Int(v) => (LiteralValue::Int(smallvec![v]), Type::scalar(BaseType::Int)),
            Literal::Uint(v) => (LiteralValue::Uint(smallvec![v]), Type::scalar(BaseType::Uint)),
            Literal::Float(v) => (LiteralValue::Float(smallvec![v]), Type::scalar(BaseType::Float)),
            // No basetype distinguishes `double` from `float` (§3's literal
            // type set has only one floating type); the `l`/`L` suffix keeps
            // full `f64` precision through folding, but the node's type is
            // still `Float` so it type-checks like any other float literal.
            Literal::Double(v) => (LiteralValue::Double(smallvec![v]), Type::scalar(BaseType::Float)),
            Literal::Str(_) => unreachable!("string literals are handled by parse_primary directly"),
        };
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(value), ty, loc })
    }

    fn make_variable_reference(&mut self, diags: &mut Diagnostics, name: &str, loc: Location) -> ExprId {
        let scope = self.symbols.current_scope();
        match self.symbols.find(name, &scope, false) {
            Some(Declaration::Var(id)) => {
                let var = self.ast.var(id);
                let ty = var.ty;
                let initializer = var.initializer;
                // Reference folding (§4.J): a `const` variable with a literal
                // initializer reads as a copy of that literal, not an l-value.
                if ty.qualifiers.contains(Qualifiers::CONST) {
                    if let Some(lit) = initializer.and_then(|init| self.as_literal(init)) {
                        return self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(lit), ty, loc });
                    }
                }
                self.ast.alloc_expr(ExprNode { kind: ExprKind::LValue(id), ty, loc })
            }
            Some(Declaration::Struct(_) | Declaration::Function(_)) => {
                self.error(diags, DiagCode::KindMismatch, format!("'{name}' does not name a variable"));
                self.error_expr(loc)
            }
            None => {
                self.error(diags, DiagCode::UndeclaredIdentifier, format!("'{name}' is undeclared"));
                self.error_expr(loc)
            }
        }
    }

    fn parse_call(&mut self, diags: &mut Diagnostics, name: &str, loc: Location) -> ExprId {
        self.consume(diags); // `(`
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::ParenClose) {
            loop {
                args.push(self.parse_assignment_expression(diags));
                if !self.accept(diags, |k| matches!(k, TokenKind::Comma)) {
                    break;
                }
            }
        }
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");

        let scope = self.symbols.current_scope();
        if resolve::shadowing_non_function(name, &scope, &self.symbols).is_some() {
            self.error(diags, DiagCode::KindMismatch, format!("'{name}' does not name a function"));
            return self.error_expr(loc);
        }

        let arg_types: Vec<Type> = args.iter().map(|&id| self.ast.expr(id).ty).collect();
        match resolve::resolve_call(name, &arg_types, &scope, &self.symbols, &self.ast) {
            Ok(resolution) => {
                if resolve::is_recursive_call(resolution.callee, self.symbols.nearest_enclosing_function()) {
                    self.error(diags, DiagCode::RecursiveCall, format!("'{name}' cannot call itself"));
                }
                self.make_call(resolution.callee, resolution.ret, args, loc)
            }
            Err(ResolveError::Undeclared) => {
                self.error(diags, DiagCode::UndeclaredIdentifier, format!("'{name}' is not declared"));
                self.error_expr(loc)
            }
            Err(ResolveError::NoViableOverload) => {
                self.error(diags, DiagCode::NoViableOverload, format!("no overload of '{name}' matches these arguments"));
                self.error_expr(loc)
            }
            Err(ResolveError::Ambiguous) => {
                self.error(diags, DiagCode::AmbiguousCall, format!("call to '{name}' is ambiguous"));
                self.error_expr(loc)
            }
        }
    }

    fn make_call(&mut self, callee: Callee, ret: Type, args: Vec<ExprId>, loc: Location) -> ExprId {
        let literals: Option<Vec<LiteralValue>> = args.iter().map(|&id| self.as_literal(id)).collect();
        if let Some(lits) = &literals {
            let folded = match callee {
                Callee::Intrinsic(op) if crate::fold::is_foldable_intrinsic(op) => match lits.as_slice() {
                    [a] => crate::fold::fold_intrinsic_unary(op, a),
                    [a, b] => crate::fold::fold_intrinsic_binary(op, a, b),
                    _ => None,
                },
                Callee::User(idx) => self.eval_user_call(idx, lits),
                Callee::Intrinsic(_) => None,
            };
            if let Some(value) = folded {
                return self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(value), ty: ret, loc });
            }
        }
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Call { callee, args }, ty: ret, loc })
    }

    /// Call-site folding for a user function invoked with all-literal
    /// arguments (§4.J): binds each parameter to its argument and evaluates
    /// a single `return <expr>;` body against those bindings. `None` for
    /// anything outside that shape — a multi-statement body, a bare
    /// `return;`, or a subexpression [`Self::eval_constant`] can't reduce —
    /// the call is then left as an ordinary `Call` node.
    fn eval_user_call(&self, func_idx: usize, arg_literals: &[LiteralValue]) -> Option<LiteralValue> {
        let func = &self.ast.functions[func_idx];
        let [stmt_id] = func.body.as_slice() else { return None };
        let StmtKind::Return { value: Some(value), discard: false } = &self.ast.stmt(*stmt_id).kind else { return None };

        let mut bindings: AHashMap<VarId, LiteralValue> = AHashMap::default();
        for (&param, lit) in func.params.iter().zip(arg_literals) {
            bindings.insert(param, lit.clone());
        }
        self.eval_constant(*value, &bindings)
    }

    /// Evaluates an already-type-checked expression against a parameter
    /// binding, reusing the same `fold` helpers the parser applies inline as
    /// it builds each node. Only the node shapes [`Self::eval_user_call`]
    /// can actually encounter in a folded body are handled; anything else
    /// (assignment, indexing, field access, ...) bails out with `None`.
    fn eval_constant(&self, id: ExprId, bindings: &AHashMap<VarId, LiteralValue>) -> Option<LiteralValue> {
        let node = self.ast.expr(id);
        match &node.kind {
            ExprKind::Literal(v) => Some(v.clone()),
            ExprKind::LValue(vid) => bindings.get(vid).cloned(),
            ExprKind::Unary { op, operand } => {
                let v = self.eval_constant(*operand, bindings)?;
                crate::fold::fold_unary(*op, &node.ty, &v)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let a = self.eval_constant(*lhs, bindings)?;
                let b = self.eval_constant(*rhs, bindings)?;
                crate::fold::fold_binary(*op, &node.ty, &a, &b)
            }
            ExprKind::Cast { target, operand } => {
                let v = self.eval_constant(*operand, bindings)?;
                Some(crate::fold::fold_cast(target, &v))
            }
            ExprKind::Swizzle { base, indices, .. } => {
                let v = self.eval_constant(*base, bindings)?;
                Some(crate::fold::fold_swizzle(&v, indices))
            }
            ExprKind::Constructor { args } => {
                let mut flat = Vec::new();
                for &arg in args {
                    let v = self.eval_constant(arg, bindings)?;
                    for i in 0..v.component_count() {
                        flat.push(literal_component_f64(&v, i));
                    }
                }
                let combined = LiteralValue::Double(flat.into_iter().collect());
                Some(crate::fold::fold_cast(&node.ty, &combined))
            }
            ExprKind::Conditional { cond, then_branch, else_branch } => {
                let c = self.eval_constant(*cond, bindings)?;
                if literal_component_f64(&c, 0) != 0.0 {
                    self.eval_constant(*then_branch, bindings)
                } else {
                    self.eval_constant(*else_branch, bindings)
                }
            }
            ExprKind::Sequence(items) => {
                let mut last = None;
                for &item in items {
                    last = Some(self.eval_constant(item, bindings)?);
                }
                last
            }
            ExprKind::Call { callee: Callee::Intrinsic(op), args } if crate::fold::is_foldable_intrinsic(*op) => {
                let values: Option<Vec<LiteralValue>> = args.iter().map(|&a| self.eval_constant(a, bindings)).collect();
                match values?.as_slice() {
                    [a] => crate::fold::fold_intrinsic_unary(*op, a),
                    [a, b] => crate::fold::fold_intrinsic_binary(*op, a, b),
                    _ => None,
                }
            }
            ExprKind::Call { callee: Callee::User(idx), args } => {
                let values: Option<Vec<LiteralValue>> = args.iter().map(|&a| self.eval_constant(a, bindings)).collect();
                self.eval_user_call(*idx, &values?)
            }
            ExprKind::Call { .. } | ExprKind::Assign { .. } | ExprKind::MatrixSwizzle { .. } | ExprKind::Field { .. } | ExprKind::Index { .. } | ExprKind::InitializerList(_) => {
                None
            }
        }
    }

    fn parse_constructor_call(&mut self, diags: &mut Diagnostics, target: Type, loc: Location) -> ExprId {
        if !self.expect(diags, |k| matches!(k, TokenKind::ParenOpen), "'('") {
            return self.error_expr(loc);
        }
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::ParenClose) {
            loop {
                args.push(self.parse_assignment_expression(diags));
                if !self.accept(diags, |k| matches!(k, TokenKind::Comma)) {
                    break;
                }
            }
        }
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");

        let mut total_components = 0usize;
        let mut all_numeric = true;
        for &id in &args {
            let t = self.ast.expr(id).ty;
            if !t.is_numeric() {
                all_numeric = false;
            }
            total_components += t.component_count();
        }
        if !all_numeric {
            self.error(diags, DiagCode::NonNumericConstructor, "constructor arguments must be numeric");
        } else if total_components != target.component_count() {
            self.error(
                diags,
                DiagCode::WrongArgCountConstructor,
                format!("expected {} components, found {total_components}", target.component_count()),
            );
        }

        if all_numeric && total_components == target.component_count() {
            let literals: Option<Vec<LiteralValue>> = args.iter().map(|&id| self.as_literal(id)).collect();
            if let Some(lits) = literals {
                let mut flat = Vec::with_capacity(total_components);
                for lit in &lits {
                    for i in 0..lit.component_count() {
                        flat.push(literal_component_f64(lit, i));
                    }
                }
                let combined = LiteralValue::Double(flat.into_iter().collect());
                let folded = crate::fold::fold_cast(&target, &combined);
                return self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(folded), ty: target, loc });
            }
        }

        self.ast.alloc_expr(ExprNode { kind: ExprKind::Constructor { args }, ty: target, loc })
    }

    fn make_cast(&mut self, diags: &mut Diagnostics, dst: Type, operand: ExprId, loc: Location) -> ExprId {
        let src = self.ast.expr(operand).ty;
        if src.is_object() || dst.is_object() || src.is_void() || dst.is_void() {
            self.error(diags, DiagCode::ScalarVectorMatrixExpected, "cannot cast to or from this type");
        } else if rank(&src, &dst) == 0 && src.basetype != BaseType::Struct {
            self.error(diags, DiagCode::TypeConversionFailure, "no conversion exists between these types");
        }
        if let Some(lit) = self.as_literal(operand) {
            let folded = crate::fold::fold_cast(&dst, &lit);
            return self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(folded), ty: dst, loc });
        }
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Cast { target: dst, operand }, ty: dst, loc })
    }

    fn make_unary(&mut self, diags: &mut Diagnostics, op: UnaryOp, operand: ExprId, loc: Location) -> ExprId {
        let operand_ty = self.ast.expr(operand).ty;
        match op {
            UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                self.check_assignable(diags, operand);
                if !operand_ty.is_numeric() {
                    self.error(diags, DiagCode::ScalarVectorMatrixExpected, "increment/decrement requires a numeric operand");
                }
            }
            UnaryOp::BitNot => {
                if !operand_ty.is_integral() {
                    self.error(diags, DiagCode::IntegralTypeRequired, "'~' requires an integral operand");
                }
            }
            UnaryOp::Not | UnaryOp::Negate => {
                if !operand_ty.is_numeric() {
                    self.error(diags, DiagCode::ScalarVectorMatrixExpected, "unary operator requires a numeric operand");
                }
            }
        }

        let ty = if matches!(op, UnaryOp::Not) { Type { basetype: BaseType::Bool, ..operand_ty } } else { operand_ty };

        if let Some(lit) = self.as_literal(operand) {
            if let Some(folded) = crate::fold::fold_unary(op, &ty, &lit) {
                return self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(folded), ty, loc });
            }
        }
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Unary { op, operand }, ty, loc })
    }

    fn make_binary(&mut self, diags: &mut Diagnostics, op: BinaryOp, lhs: ExprId, rhs: ExprId, loc: Location) -> ExprId {
        let lhs_ty = self.ast.expr(lhs).ty;
        let rhs_ty = self.ast.expr(rhs).ty;
        let ty = self.binary_result_type(diags, op, lhs_ty, rhs_ty);

        if let (Some(a), Some(b)) = (self.as_literal(lhs), self.as_literal(rhs)) {
            if let Some(folded) = crate::fold::fold_binary(op, &ty, &a, &b) {
                return self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(folded), ty, loc });
            }
        }
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Binary { op, lhs, rhs }, ty, loc })
    }

    fn binary_result_type(&mut self, diags: &mut Diagnostics, op: BinaryOp, lhs: Type, rhs: Type) -> Type {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            if !lhs.is_scalar() || !rhs.is_scalar() {
                self.error(diags, DiagCode::ScalarExpected, "'&&'/'||' require scalar operands");
            }
            return Type::scalar(BaseType::Bool);
        }
        if matches!(op, BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr | BinaryOp::Shl | BinaryOp::Shr)
            && (!lhs.is_integral() || !rhs.is_integral())
        {
            self.error(diags, DiagCode::IntegralTypeRequired, "bitwise operators require integral operands");
        }

        // `==`/`!=` on structs compares the definition, not component shape:
        // `combine_shape` below sees every struct as a 1x1 scalar and would
        // otherwise accept a comparison between two unrelated struct types.
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) && (lhs.basetype == BaseType::Struct || rhs.basetype == BaseType::Struct) {
            let same_struct = lhs.basetype == BaseType::Struct && rhs.basetype == BaseType::Struct && lhs.struct_def == rhs.struct_def;
            if !same_struct {
                self.error(diags, DiagCode::TypeMismatch, "struct equality requires matching struct definitions on both sides");
            }
            return Type::scalar(BaseType::Bool);
        }

        let Some((rows, cols)) = combine_shape(lhs, rhs) else {
            self.error(diags, DiagCode::TypeMismatch, "operand shapes are not compatible");
            let basetype = higher_basetype(lhs.basetype, rhs.basetype);
            return Type { rows: lhs.rows.max(rhs.rows), cols: lhs.cols.max(rhs.cols), ..Type::scalar(basetype) };
        };

        let basetype = if matches!(op, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne) {
            BaseType::Bool
        } else {
            higher_basetype(lhs.basetype, rhs.basetype)
        };
        Type { rows, cols, ..Type::scalar(basetype) }
    }

    fn make_assign(&mut self, diags: &mut Diagnostics, op: AssignOp, target: ExprId, value: ExprId, loc: Location) -> ExprId {
        self.check_assignable(diags, target);
        let target_ty = self.ast.expr(target).ty;
        let value_ty = self.ast.expr(value).ty;

        if matches!(op, AssignOp::Assign) {
            let r = rank(&value_ty, &target_ty);
            if r == 0 {
                self.error(diags, DiagCode::TypeConversionFailure, "cannot assign this value to the target");
            } else if r != 1 {
                // Any successful conversion short of an exact match is
                // reported as truncation here, whether it narrows a basetype
                // (float -> int) or a shape (float4 -> float2).
                self.warn(diags, DiagCode::ImplicitTruncationWarning, "implicit truncation in assignment");
            }
        } else {
            let _ = self.binary_result_type(diags, compound_to_binary(op), target_ty, value_ty);
        }

        self.ast.alloc_expr(ExprNode { kind: ExprKind::Assign { op, target, value }, ty: target_ty, loc })
    }

    fn check_assignable(&mut self, diags: &mut Diagnostics, target: ExprId) {
        let ty = self.ast.expr(target).ty;
        let assignable = match &self.ast.expr(target).kind {
            ExprKind::LValue(_) | ExprKind::Field { .. } | ExprKind::Index { .. } | ExprKind::MatrixSwizzle { .. } => true,
            ExprKind::Swizzle { assignable, .. } => *assignable,
            _ => false,
        };
        if !assignable || ty.qualifiers.intersects(Qualifiers::CONST | Qualifiers::UNIFORM) {
            self.error(diags, DiagCode::LValueConstOrUniform, "expression is not assignable");
        }
    }

    fn parse_index(&mut self, diags: &mut Diagnostics, base: ExprId) -> ExprId {
        let loc = self.loc();
        let index = self.parse_expression_sequence(diags);
        self.expect(diags, |k| matches!(k, TokenKind::BracketClose), "']'");

        let base_ty = self.ast.expr(base).ty;
        let index_ty = self.ast.expr(index).ty;
        if !index_ty.is_scalar() || !index_ty.is_integral() {
            self.error(diags, DiagCode::NonScalarSubscriptIndex, "subscript index must be a scalar integer");
        }

        let result_ty = if base_ty.is_array() {
            Type { array_length: crate::types::ARRAY_NOT_AN_ARRAY, ..base_ty }
        } else if base_ty.is_matrix() {
            Type::vector(base_ty.basetype, base_ty.cols)
        } else if base_ty.is_vector() {
            Type::scalar(base_ty.basetype)
        } else {
            self.error(diags, DiagCode::NonIndexableSubscriptBase, "expression is not indexable");
            Type::void()
        };

        self.ast.alloc_expr(ExprNode { kind: ExprKind::Index { base, index }, ty: result_ty, loc })
    }

    fn parse_field_or_swizzle(&mut self, diags: &mut Diagnostics, base: ExprId) -> ExprId {
        let loc = self.loc();
        let name = match self.peek().clone() {
            TokenKind::Identifier(n) => {
                self.consume(diags);
                n
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a field or swizzle name");
                return base;
            }
        };
        let base_ty = self.ast.expr(base).ty;

        if base_ty.basetype == BaseType::Struct {
            return self.make_field_access(diags, base, &name, base_ty, loc);
        }
        if base_ty.is_object() {
            self.error(diags, DiagCode::ObjectHasNoMethods, "texture/sampler objects have no members");
            return self.error_expr(loc);
        }
        if base_ty.is_matrix() && name.starts_with('_') {
            return self.make_matrix_swizzle(diags, base, &name, base_ty, loc);
        }
        self.make_vector_swizzle(diags, base, &name, base_ty, loc)
    }

    fn make_field_access(&mut self, diags: &mut Diagnostics, base: ExprId, name: &str, base_ty: Type, loc: Location) -> ExprId {
        let Some(struct_id) = base_ty.struct_def else {
            self.error(diags, DiagCode::StructHasNoMethods, "value has no struct definition");
            return self.error_expr(loc);
        };
        let def = self.ast.struct_def(struct_id);
        let field_index = def.fields.iter().position(|&f| self.ast.var(f).name == name);
        let Some(field_index) = field_index else {
            self.error(diags, DiagCode::UndeclaredIdentifier, format!("'{name}' is not a member of this struct"));
            return self.error_expr(loc);
        };
        let field_ty = self.ast.var(self.ast.struct_def(struct_id).fields[field_index]).ty;
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Field { base, field_index }, ty: field_ty, loc })
    }

    /// Accepts only a single character set (xyzw/rgba/stpq) per swizzle
    /// (§4.F: mixing sets is an error), 1 to 4 characters, each index within
    /// the base vector's (or scalar's) component count.
    fn make_vector_swizzle(&mut self, diags: &mut Diagnostics, base: ExprId, name: &str, base_ty: Type, loc: Location) -> ExprId {
        if !base_ty.is_vector() && !base_ty.is_scalar() {
            self.error(diags, DiagCode::InvalidSubscript, "swizzle requires a vector or scalar operand");
            return self.error_expr(loc);
        }
        if name.is_empty() || name.len() > 4 {
            self.error(diags, DiagCode::InvalidSubscript, "a swizzle must have between 1 and 4 components");
            return self.error_expr(loc);
        }

        let mut indices: smallvec::SmallVec<[u8; 4]> = smallvec::SmallVec::new();
        let mut set = None;
        let mut valid = true;
        for c in name.chars() {
            let (char_set, index) = match c {
                'x' => (SwizzleSet::Xyzw, 0),
                'y' => (SwizzleSet::Xyzw, 1),
                'z' => (SwizzleSet::Xyzw, 2),
                'w' => (SwizzleSet::Xyzw, 3),
                'r' => (SwizzleSet::Rgba, 0),
                'g' => (SwizzleSet::Rgba, 1),
                'b' => (SwizzleSet::Rgba, 2),
                'a' => (SwizzleSet::Rgba, 3),
                's' => (SwizzleSet::Stpq, 0),
                't' => (SwizzleSet::Stpq, 1),
                'p' => (SwizzleSet::Stpq, 2),
                'q' => (SwizzleSet::Stpq, 3),
                _ => {
                    valid = false;
                    break;
                }
            };
            if index >= base_ty.rows {
                valid = false;
                break;
            }
            match set {
                None => set = Some(char_set),
                Some(existing) if existing == char_set => {}
                Some(_) => {
                    valid = false;
                    break;
                }
            }
            indices.push(index);
        }

        if !valid {
            self.error(diags, DiagCode::InvalidSubscript, format!("'{name}' is not a valid swizzle"));
            return self.error_expr(loc);
        }

        let mut seen = 0u8;
        let assignable = indices.iter().all(|&i| {
            let bit = 1 << i;
            let first_time = seen & bit == 0;
            seen |= bit;
            first_time
        });

        let ty = if indices.len() == 1 { Type::scalar(base_ty.basetype) } else { Type::vector(base_ty.basetype, indices.len() as u8) };

        if let Some(lit) = self.as_literal(base) {
            let folded = crate::fold::fold_swizzle(&lit, &indices);
            return self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(folded), ty, loc });
        }
        self.ast.alloc_expr(ExprNode {
            kind: ExprKind::Swizzle { base, indices, set: set.expect("validated non-empty above"), assignable },
            ty,
            loc,
        })
    }

    /// `._mRC` (0-based) or `._RC` (1-based), one or more two/three-character
    /// groups, each selecting a single matrix element.
    fn make_matrix_swizzle(&mut self, diags: &mut Diagnostics, base: ExprId, name: &str, base_ty: Type, loc: Location) -> ExprId {
        let rest = &name[1..];
        let bytes: Vec<char> = rest.chars().collect();
        let zero_based = bytes.first() == Some(&'m');
        let group_len = if zero_based { 3 } else { 2 };

        if bytes.is_empty() || bytes.len() % group_len != 0 {
            self.error(diags, DiagCode::InvalidSubscript, format!("'{name}' is not a valid matrix swizzle"));
            return self.error_expr(loc);
        }

        let mut components: smallvec::SmallVec<[(u8, u8); 4]> = smallvec::SmallVec::new();
        let mut valid = true;
        for group in bytes.chunks(group_len) {
            let digits = if zero_based { &group[1..] } else { group };
            let (Some(r), Some(c)) = (digits[0].to_digit(10), digits[1].to_digit(10)) else {
                valid = false;
                break;
            };
            let (row, col) = if zero_based { (r as u8, c as u8) } else { (r as u8 - 1, c as u8 - 1) };
            if row >= base_ty.rows || col >= base_ty.cols {
                valid = false;
                break;
            }
            components.push((row, col));
        }

        if !valid {
            self.error(diags, DiagCode::InvalidSubscript, format!("'{name}' is not a valid matrix swizzle"));
            return self.error_expr(loc);
        }

        let ty = if components.len() == 1 { Type::scalar(base_ty.basetype) } else { Type::vector(base_ty.basetype, components.len() as u8) };
        self.ast.alloc_expr(ExprNode { kind: ExprKind::MatrixSwizzle { base, components }, ty, loc })
    }

    fn as_literal(&self, id: ExprId) -> Option<LiteralValue> {
        match &self.ast.expr(id).kind {
            ExprKind::Literal(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn error_expr(&mut self, loc: Location) -> ExprId {
        self.ast.alloc_expr(ExprNode { kind: ExprKind::Literal(LiteralValue::Int(smallvec![0])), ty: Type::void(), loc })
    }
}

fn binary_op_and_prec(kind: &TokenKind) -> Option<(BinaryOp, u32)> {
    Some(match kind {
        TokenKind::PipePipe => (BinaryOp::Or, 1),
        TokenKind::AmpersandAmpersand => (BinaryOp::And, 2),
        TokenKind::Pipe => (BinaryOp::BitOr, 3),
        TokenKind::Caret => (BinaryOp::BitXor, 4),
        TokenKind::Ampersand => (BinaryOp::BitAnd, 5),
        TokenKind::EqualEqual => (BinaryOp::Eq, 6),
        TokenKind::ExclaimEqual => (BinaryOp::Ne, 6),
        TokenKind::Less => (BinaryOp::Lt, 7),
        TokenKind::Greater => (BinaryOp::Gt, 7),
        TokenKind::LessEqual => (BinaryOp::Le, 7),
        TokenKind::GreaterEqual => (BinaryOp::Ge, 7),
        TokenKind::LessLess => (BinaryOp::Shl, 8),
        TokenKind::GreaterGreater => (BinaryOp::Shr, 8),
        TokenKind::Plus => (BinaryOp::Add, 9),
        TokenKind::Minus => (BinaryOp::Sub, 9),
        TokenKind::Star => (BinaryOp::Mul, 10),
        TokenKind::Slash => (BinaryOp::Div, 10),
        TokenKind::Percent => (BinaryOp::Mod, 10),
        _ => return None,
    })
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    Some(match kind {
        TokenKind::Equal => AssignOp::Assign,
        TokenKind::StarEqual => AssignOp::Mul,
        TokenKind::SlashEqual => AssignOp::Div,
        TokenKind::PercentEqual => AssignOp::Mod,
        TokenKind::PlusEqual => AssignOp::Add,
        TokenKind::MinusEqual => AssignOp::Sub,
        TokenKind::LessLessEqual => AssignOp::Shl,
        TokenKind::GreaterGreaterEqual => AssignOp::Shr,
        TokenKind::AmpersandEqual => AssignOp::BitAnd,
        TokenKind::CaretEqual => AssignOp::BitXor,
        TokenKind::PipeEqual => AssignOp::BitOr,
        _ => return None,
    })
}

fn compound_to_binary(op: AssignOp) -> BinaryOp {
    match op {
        AssignOp::Assign => unreachable!("plain assignment is handled separately"),
        AssignOp::Mul => BinaryOp::Mul,
        AssignOp::Div => BinaryOp::Div,
        AssignOp::Mod => BinaryOp::Mod,
        AssignOp::Add => BinaryOp::Add,
        AssignOp::Sub => BinaryOp::Sub,
        AssignOp::Shl => BinaryOp::Shl,
        AssignOp::Shr => BinaryOp::Shr,
        AssignOp::BitAnd => BinaryOp::BitAnd,
        AssignOp::BitXor => BinaryOp::BitXor,
        AssignOp::BitOr => BinaryOp::BitOr,
    }
}

fn higher_basetype(a: BaseType, b: BaseType) -> BaseType {
    fn weight(t: BaseType) -> u8 {
        match t {
            BaseType::Bool => 0,
            BaseType::Int => 1,
            BaseType::Uint => 2,
            _ => 3,
        }
    }
    if weight(a) >= weight(b) {
        a
    } else {
        b
    }
}

fn combine_shape(lhs: Type, rhs: Type) -> Option<(u8, u8)> {
    if lhs.rows == rhs.rows && lhs.cols == rhs.cols {
        Some((lhs.rows, lhs.cols))
    } else if lhs.is_scalar() {
        Some((rhs.rows, rhs.cols))
    } else if rhs.is_scalar() {
        Some((lhs.rows, lhs.cols))
    } else {
        None
    }
}

fn literal_component_f64(value: &LiteralValue, i: usize) -> f64 {
    match value {
        LiteralValue::Bool(v) => f64::from(u8::from(v[i])),
        LiteralValue::Int(v) => f64::from(v[i]),
        LiteralValue::Uint(v) => f64::from(v[i]),
        LiteralValue::Float(v) => f64::from(v[i]),
        LiteralValue::Double(v) => v[i],
        LiteralValue::Str(_) => 0.0,
    }
}
