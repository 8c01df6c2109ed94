//! Statement/declaration parser (spec component G), plus the type-class
//! grammar it shares with the expression parser's cast syntax.
//!
//! Grounded on `examples/original_source/source/FX/Parser.cpp`'s
//! `accept_type_class`/`accept_type_qualifiers`/`parse_statement`/
//! `parse_struct`/`parse_technique` family, re-expressed as `Option`-
//! returning methods on [`super::Parser`] instead of the original's
//! out-parameter + bool-return style.

use crate::arena::{StmtId, VarId};
use crate::ast::{
    Annotation, CaseLabel, FunctionDecl, JumpKind, LiteralValue, PassDecl, PassState, PropertyBlock, PropertyKey,
    StmtKind, StmtNode, StructDef, SwitchCase, TechniqueDecl, VarDecl,
};
use crate::diagnostics::{DiagCode, Diagnostics, Location};
use crate::lexer::{Literal, TokenKind};
use crate::symbols::Declaration;
use crate::types::{BaseType, Qualifiers, Type, ARRAY_UNSIZED};

use super::Parser;

impl<'a> Parser<'a> {
    /// Mirrors `accept_type_class`: tries, in order, a struct name, the
    /// generic `vector<T,N>`/`matrix<T,R,C>` forms, the fixed shape-keyword
    /// table, and the object/void/string keywords. Consumes nothing on
    /// failure.
    pub(super) fn accept_type_class(&mut self, diags: &mut Diagnostics) -> Option<Type> {
        if let TokenKind::Identifier(name) = self.peek().clone() {
            let scope = self.symbols.current_scope();
            return match self.symbols.find(&name, &scope, false) {
                Some(Declaration::Struct(id)) => {
                    self.consume(diags);
                    Some(Type::struct_type(id))
                }
                _ => None,
            };
        }

        if self.accept(diags, |k| matches!(k, TokenKind::Vector)) {
            let mut ty = Type::vector(BaseType::Float, 4);
            if self.accept(diags, |k| matches!(k, TokenKind::Less)) {
                let Some(elem) = self.accept_type_class(diags) else {
                    self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected vector element type");
                    return None;
                };
                if !elem.is_scalar() {
                    self.error(diags, DiagCode::BadVectorElementType, "vector element type must be a scalar type");
                    return None;
                }
                ty.basetype = elem.basetype;
                if !self.expect(diags, |k| matches!(k, TokenKind::Comma), "','") {
                    return None;
                }
                let rows = self.expect_int_literal(diags)?;
                if !(1..=4).contains(&rows) {
                    self.error(diags, DiagCode::VectorDimensionOutOfRange, "vector dimension must be between 1 and 4");
                    return None;
                }
                ty.rows = rows as u8;
                if !self.expect(diags, |k| matches!(k, TokenKind::Greater), "'>'") {
                    return None;
                }
            }
            return Some(ty);
        }

        if self.accept(diags, |k| matches!(k, TokenKind::Matrix)) {
            let mut ty = Type::matrix(BaseType::Float, 4, 4);
            if self.accept(diags, |k| matches!(k, TokenKind::Less)) {
                let Some(elem) = self.accept_type_class(diags) else {
                    self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected matrix element type");
                    return None;
                };
                if !elem.is_scalar() {
                    self.error(diags, DiagCode::BadMatrixElementType, "matrix element type must be a scalar type");
                    return None;
                }
                ty.basetype = elem.basetype;
                if !self.expect(diags, |k| matches!(k, TokenKind::Comma), "','") {
                    return None;
                }
                let rows = self.expect_int_literal(diags)?;
                if !(1..=4).contains(&rows) {
                    self.error(diags, DiagCode::MatrixDimensionOutOfRange, "matrix dimensions must be between 1 and 4");
                    return None;
                }
                if !self.expect(diags, |k| matches!(k, TokenKind::Comma), "','") {
                    return None;
                }
                let cols = self.expect_int_literal(diags)?;
                if !(1..=4).contains(&cols) {
                    self.error(diags, DiagCode::MatrixDimensionOutOfRange, "matrix dimensions must be between 1 and 4");
                    return None;
                }
                ty.rows = rows as u8;
                ty.cols = cols as u8;
                if !self.expect(diags, |k| matches!(k, TokenKind::Greater), "'>'") {
                    return None;
                }
            }
            return Some(ty);
        }

        let ty = match self.peek().clone() {
            TokenKind::Void => Type::void(),
            TokenKind::Shape(shape) => Type { rows: shape.rows, cols: shape.cols, ..Type::scalar(shape.basetype) },
            TokenKind::String => Type::scalar(BaseType::String),
            TokenKind::Texture1D => Type { texture_dim: Some(crate::types::TextureDim::D1), ..Type::scalar(BaseType::Texture) },
            TokenKind::Texture2D => Type { texture_dim: Some(crate::types::TextureDim::D2), ..Type::scalar(BaseType::Texture) },
            TokenKind::Texture3D => Type { texture_dim: Some(crate::types::TextureDim::D3), ..Type::scalar(BaseType::Texture) },
            TokenKind::Sampler1D => Type { texture_dim: Some(crate::types::TextureDim::D1), ..Type::scalar(BaseType::Sampler) },
            TokenKind::Sampler2D => Type { texture_dim: Some(crate::types::TextureDim::D2), ..Type::scalar(BaseType::Sampler) },
            TokenKind::Sampler3D => Type { texture_dim: Some(crate::types::TextureDim::D3), ..Type::scalar(BaseType::Sampler) },
            _ => return None,
        };
        self.consume(diags);
        Some(ty)
    }

    fn expect_int_literal(&mut self, diags: &mut Diagnostics) -> Option<i64> {
        match self.peek().clone() {
            TokenKind::Literal(Literal::Int(v)) => {
                self.consume(diags);
                Some(i64::from(v))
            }
            TokenKind::Literal(Literal::Uint(v)) => {
                self.consume(diags);
                Some(i64::from(v))
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected an integer literal");
                None
            }
        }
    }

    pub(super) fn accept_type_qualifiers(&mut self, diags: &mut Diagnostics) -> Qualifiers {
        let mut q = Qualifiers::empty();
        loop {
            let bit = match self.peek() {
                TokenKind::Extern => Qualifiers::EXTERN,
                TokenKind::Static => Qualifiers::STATIC,
                TokenKind::Uniform => Qualifiers::UNIFORM,
                TokenKind::Volatile => Qualifiers::VOLATILE,
                TokenKind::Precise => Qualifiers::PRECISE,
                TokenKind::In => Qualifiers::IN,
                TokenKind::Out => Qualifiers::OUT,
                TokenKind::Inout => Qualifiers::INOUT,
                TokenKind::Const => Qualifiers::CONST,
                TokenKind::Linear => Qualifiers::LINEAR,
                TokenKind::Noperspective => Qualifiers::NOPERSPECTIVE,
                TokenKind::Centroid => Qualifiers::CENTROID,
                TokenKind::Nointerpolation => Qualifiers::NOINTERPOLATION,
                _ => break,
            };
            self.consume(diags);
            q |= bit;
        }
        q
    }

    pub(super) fn error(&mut self, diags: &mut Diagnostics, code: DiagCode, message: impl Into<String>) {
        diags.push(self.loc(), code, message);
    }

    pub(super) fn warn(&mut self, diags: &mut Diagnostics, code: DiagCode, message: impl Into<String>) {
        diags.push(self.loc(), code, message);
    }

    /// One namespace/struct/technique/type-led item at the top level (§4.G).
    pub(super) fn parse_top_level_item(&mut self, diags: &mut Diagnostics) {
        match self.peek().clone() {
            TokenKind::Namespace => self.parse_namespace(diags),
            TokenKind::Struct => {
                if let Some(id) = self.parse_struct(diags) {
                    let name = self.ast.struct_def(id).name.clone();
                    let _ = self.symbols.insert(&name, Declaration::Struct(id), true);
                }
                self.accept(diags, |k| matches!(k, TokenKind::Semicolon));
            }
            TokenKind::Technique => self.parse_technique(diags),
            TokenKind::Eof => {}
            _ => self.parse_type_led_declaration(diags, true),
        }
    }

    fn parse_namespace(&mut self, diags: &mut Diagnostics) {
        self.consume(diags); // `namespace`
        let name = match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.consume(diags);
                name
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a namespace name");
                return;
            }
        };
        if !self.expect(diags, |k| matches!(k, TokenKind::BraceOpen), "'{'") {
            return;
        }
        self.symbols.enter_namespace(&name);
        while !matches!(self.peek(), TokenKind::BraceClose | TokenKind::Eof) {
            self.parse_top_level_item(diags);
        }
        self.accept(diags, |k| matches!(k, TokenKind::BraceClose));
        self.symbols.leave_namespace(&name);
    }

    fn parse_struct(&mut self, diags: &mut Diagnostics) -> Option<crate::arena::StructId> {
        let loc = self.loc();
        self.consume(diags); // `struct`
        let name = match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.consume(diags);
                name
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a struct name");
                return None;
            }
        };
        if !self.expect(diags, |k| matches!(k, TokenKind::BraceOpen), "'{'") {
            return None;
        }

        let mut fields = Vec::new();
        while !matches!(self.peek(), TokenKind::BraceClose | TokenKind::Eof) {
            let qualifiers = self.accept_type_qualifiers(diags);
            let Some(mut ty) = self.accept_type_class(diags) else {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a field type");
                self.lexer.consume_until(diags, |k| matches!(k, TokenKind::Semicolon));
                continue;
            };
            ty.qualifiers = qualifiers;
            if qualifiers.intersects(Qualifiers::IN | Qualifiers::OUT) || ty.is_void() {
                self.error(diags, DiagCode::BadQualifierOnMember, "struct members cannot be void or in/out-qualified");
            }
            loop {
                let field_name = match self.peek().clone() {
                    TokenKind::Identifier(n) => {
                        self.consume(diags);
                        n
                    }
                    _ => {
                        self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a field name");
                        break;
                    }
                };
                let mut field_ty = ty;
                self.parse_array_suffix(diags, &mut field_ty);
                let semantic = self.parse_optional_semantic(diags);
                let field = self.ast.alloc_var(VarDecl {
                    name: field_name,
                    ty: field_ty,
                    semantic,
                    annotations: Vec::new(),
                    initializer: None,
                    property_block: None,
                    loc,
                    duplicate_qualifier: false,
                });
                fields.push(field);
                if !self.accept(diags, |k| matches!(k, TokenKind::Comma)) {
                    break;
                }
            }
            self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        }
        self.expect(diags, |k| matches!(k, TokenKind::BraceClose), "'}'");

        if fields.is_empty() {
            self.warn(diags, DiagCode::EmptyStructWarning, format!("struct '{name}' has no members"));
        }

        Some(self.ast.alloc_struct(StructDef { name, fields, loc }))
    }

    /// Parses `[N]` array-dimension suffixes (§4.G: literal scalar integers
    /// in `[min_array_length, max_array_length]`, or empty brackets for an
    /// unsized array).
    fn parse_array_suffix(&mut self, diags: &mut Diagnostics, ty: &mut Type) {
        if !self.accept(diags, |k| matches!(k, TokenKind::BracketOpen)) {
            return;
        }
        if self.accept(diags, |k| matches!(k, TokenKind::BracketClose)) {
            ty.array_length = ARRAY_UNSIZED;
            return;
        }
        let Some(len) = self.expect_int_literal(diags) else {
            self.error(diags, DiagCode::ArrayDimensionNotLiteral, "array dimension must be a literal scalar integer");
            self.lexer.consume_until(diags, |k| matches!(k, TokenKind::BracketClose));
            return;
        };
        let min = i64::from(self.limits.min_array_length);
        let max = i64::from(self.limits.max_array_length);
        if len < min || len > max {
            self.error(diags, DiagCode::ArrayDimensionOutOfRange, format!("array dimension must be between {min} and {max}"));
        }
        ty.array_length = len as i32;
        self.expect(diags, |k| matches!(k, TokenKind::BracketClose), "']'");
    }

    /// `: SEMANTIC`, upper-cased per §3/§4.G.
    fn parse_optional_semantic(&mut self, diags: &mut Diagnostics) -> Option<String> {
        if !self.accept(diags, |k| matches!(k, TokenKind::Colon)) {
            return None;
        }
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.consume(diags);
                Some(name.to_uppercase())
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a semantic name");
                None
            }
        }
    }

    /// `<T name = literal; ...>` — each value must be a literal (X3011).
    fn parse_annotations(&mut self, diags: &mut Diagnostics) -> Vec<Annotation> {
        let mut out = Vec::new();
        if !self.accept(diags, |k| matches!(k, TokenKind::Less)) {
            return out;
        }
        while !matches!(self.peek(), TokenKind::Greater | TokenKind::Eof) {
            let loc = self.loc();
            self.accept_type_class(diags); // the annotation's declared type is not retained
            let name = match self.peek().clone() {
                TokenKind::Identifier(n) => {
                    self.consume(diags);
                    n
                }
                _ => break,
            };
            if self.expect(diags, |k| matches!(k, TokenKind::Equal), "'='") {
                if let Some(value) = self.parse_literal_value(diags) {
                    out.push(Annotation { name, value, loc });
                } else {
                    self.error(diags, DiagCode::ValueMustBeLiteral, "annotation value must be a literal");
                }
            }
            self.accept(diags, |k| matches!(k, TokenKind::Semicolon));
        }
        self.accept(diags, |k| matches!(k, TokenKind::Greater));
        out
    }

    fn parse_literal_value(&mut self, diags: &mut Diagnostics) -> Option<LiteralValue> {
        use smallvec::smallvec;
        let value = match self.peek().clone() {
            TokenKind::Literal(Literal::Int(v)) => LiteralValue::Int(smallvec![v]),
            TokenKind::Literal(Literal::Uint(v)) => LiteralValue::Uint(smallvec![v]),
            TokenKind::Literal(Literal::Float(v)) => LiteralValue::Float(smallvec![v]),
            TokenKind::Literal(Literal::Double(v)) => LiteralValue::Double(smallvec![v]),
            TokenKind::Literal(Literal::Str(v)) => LiteralValue::Str(v),
            TokenKind::True => LiteralValue::Bool(smallvec![true]),
            TokenKind::False => LiteralValue::Bool(smallvec![false]),
            _ => return None,
        };
        self.consume(diags);
        Some(value)
    }

    /// A type followed by an identifier: either a function definition
    /// (followed by `(`) or a variable declarator list.
    fn parse_type_led_declaration(&mut self, diags: &mut Diagnostics, global: bool) {
        let loc = self.loc();
        let qualifiers = self.accept_type_qualifiers(diags);
        let Some(mut ty) = self.accept_type_class(diags) else {
            self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a type or declaration");
            self.lexer.consume_until(diags, |k| matches!(k, TokenKind::Semicolon));
            return;
        };
        ty.qualifiers = qualifiers;

        let name = match self.peek().clone() {
            TokenKind::Identifier(n) => {
                self.consume(diags);
                n
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a name");
                return;
            }
        };

        if matches!(self.peek(), TokenKind::ParenOpen) {
            self.parse_function_residue(diags, ty, name, loc);
        } else {
            self.parse_variable_declarator_list(diags, ty, name, loc, global);
        }
    }

    fn parse_function_residue(&mut self, diags: &mut Diagnostics, return_type: Type, name: String, loc: Location) {
        self.consume(diags); // `(`
        self.symbols.enter_scope();

        let mut params = Vec::new();
        if !matches!(self.peek(), TokenKind::ParenClose) {
            loop {
                let param_qualifiers = self.accept_type_qualifiers(diags);
                if param_qualifiers.intersects(Qualifiers::EXTERN | Qualifiers::STATIC | Qualifiers::UNIFORM) {
                    self.error(diags, DiagCode::BadQualifierPlacement, "function parameters cannot be extern/static/uniform");
                }
                if param_qualifiers.contains(Qualifiers::OUT) && param_qualifiers.contains(Qualifiers::CONST) {
                    self.error(diags, DiagCode::OutputParamConst, "an output parameter cannot also be const");
                }
                let Some(mut param_ty) = self.accept_type_class(diags) else {
                    self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a parameter type");
                    break;
                };
                param_ty.qualifiers = param_qualifiers;
                let param_name = match self.peek().clone() {
                    TokenKind::Identifier(n) => {
                        self.consume(diags);
                        n
                    }
                    _ => String::new(),
                };
                self.parse_array_suffix(diags, &mut param_ty);
                let semantic = self.parse_optional_semantic(diags);
                let var = self.ast.alloc_var(VarDecl {
                    name: param_name.clone(),
                    ty: param_ty,
                    semantic,
                    annotations: Vec::new(),
                    initializer: None,
                    property_block: None,
                    loc,
                    duplicate_qualifier: false,
                });
                if !param_name.is_empty() {
                    let _ = self.symbols.insert(&param_name, Declaration::Var(var), false);
                }
                params.push(var);
                if !self.accept(diags, |k| matches!(k, TokenKind::Comma)) {
                    break;
                }
            }
        }
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");
        let semantic = self.parse_optional_semantic(diags);
        if return_type.is_void() && semantic.is_some() {
            self.error(diags, DiagCode::VoidFunctionWithSemantic, "a void function cannot have a semantic");
        }

        let namespace_path = self.symbols.current_scope().namespace_path;
        let function_index = self.ast.functions.len();
        self.ast.functions.push(FunctionDecl {
            name: name.clone(),
            return_type,
            params,
            body: Vec::new(),
            semantic,
            namespace_path,
            loc,
        });
        let _ = self.symbols.insert(&name, Declaration::Function(function_index), true);
        self.symbols.enter_function(function_index);

        let body = if matches!(self.peek(), TokenKind::Semicolon) {
            self.consume(diags);
            Vec::new()
        } else {
            self.parse_block_statements(diags)
        };
        self.ast.functions[function_index].body = body;

        self.symbols.leave_function();
        self.symbols.leave_scope(); // the parameter scope opened above
    }

    fn parse_variable_declarator_list(
        &mut self,
        diags: &mut Diagnostics,
        base_ty: Type,
        first_name: String,
        loc: Location,
        global: bool,
    ) -> Vec<VarId> {
        let mut vars = Vec::new();
        let mut name = Some(first_name);
        loop {
            let decl_name = match name.take() {
                Some(n) => n,
                None => match self.peek().clone() {
                    TokenKind::Identifier(n) => {
                        self.consume(diags);
                        n
                    }
                    _ => break,
                },
            };

            let mut ty = base_ty;
            self.parse_array_suffix(diags, &mut ty);

            if global && !ty.is_object() && ty.qualifiers.is_empty() {
                ty.qualifiers = Qualifiers::EXTERN | Qualifiers::UNIFORM;
                self.warn(diags, DiagCode::ImplicitUniformWarning, format!("'{decl_name}' implicitly uniform"));
            }
            if !global {
                if ty.qualifiers.contains(Qualifiers::EXTERN) {
                    self.error(diags, DiagCode::ExternOnLocal, "local variables cannot be extern");
                }
                if ty.qualifiers.contains(Qualifiers::UNIFORM) {
                    self.error(diags, DiagCode::BadQualifierPlacement, "local variables cannot be uniform");
                }
                if ty.is_object() {
                    self.error(diags, DiagCode::VoidOrLocalDisallowed, "textures/samplers cannot be declared locally");
                }
            }

            let semantic = self.parse_optional_semantic(diags);
            let annotations = self.parse_annotations(diags);
            let property_block = if matches!(self.peek(), TokenKind::BraceOpen) {
                Some(self.parse_property_block(diags))
            } else {
                None
            };

            let mut initializer = None;
            if self.accept(diags, |k| matches!(k, TokenKind::Equal)) {
                initializer = Some(self.parse_assignment_expression(diags));
            } else if ty.qualifiers.contains(Qualifiers::CONST) {
                self.error(diags, DiagCode::ConstNoInitializer, "'const' variables require an initializer");
            }

            let var = self.ast.alloc_var(VarDecl {
                name: decl_name.clone(),
                ty,
                semantic,
                annotations,
                initializer,
                property_block,
                loc,
                duplicate_qualifier: false,
            });
            let redefined = self.symbols.insert(&decl_name, Declaration::Var(var), global).is_err();
            if redefined {
                self.error(diags, DiagCode::Redefinition, format!("'{decl_name}' already declared"));
            }
            if global {
                self.ast.uniforms.push(var);
            }
            vars.push(var);

            if !self.accept(diags, |k| matches!(k, TokenKind::Comma)) {
                break;
            }
        }
        self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        vars
    }

    fn parse_property_block(&mut self, diags: &mut Diagnostics) -> PropertyBlock {
        self.consume(diags); // `{`
        let mut block = PropertyBlock::default();
        while !matches!(self.peek(), TokenKind::BraceClose | TokenKind::Eof) {
            let key_name = match self.peek().clone() {
                TokenKind::Identifier(n) => {
                    self.consume(diags);
                    n
                }
                _ => {
                    self.lexer.consume_until(diags, |k| matches!(k, TokenKind::Semicolon));
                    continue;
                }
            };
            let Ok(key) = key_name.parse::<PropertyKey>() else {
                self.error(diags, DiagCode::UndeclaredIdentifier, format!("unrecognized property '{key_name}'"));
                self.lexer.consume_until(diags, |k| matches!(k, TokenKind::Semicolon));
                continue;
            };
            if self.expect(diags, |k| matches!(k, TokenKind::Equal), "'='") {
                let value = self.parse_property_value_expression(diags);
                block.entries.push((key, value));
            }
            self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        }
        self.expect(diags, |k| matches!(k, TokenKind::BraceClose), "'}'");
        block
    }

    /// Property values are either literals or one of a fixed set of enum
    /// identifiers (NONE, POINT, LINEAR, ..., WRAP/REPEAT, formats, ...) —
    /// all represented as string literals so downstream code generators can
    /// match on the spelling (SPEC_FULL.md §B.3: `REPEAT` is kept as a
    /// literal alias of `WRAP` rather than normalized away, matching what
    /// the original tolerates).
    fn parse_property_value_expression(&mut self, diags: &mut Diagnostics) -> crate::arena::ExprId {
        let loc = self.loc();
        if let TokenKind::Identifier(name) = self.peek().clone() {
            self.consume(diags);
            let ty = Type::scalar(BaseType::String);
            return self.ast.alloc_expr(crate::ast::ExprNode {
                kind: crate::ast::ExprKind::Literal(LiteralValue::Str(name)),
                ty,
                loc,
            });
        }
        self.parse_assignment_expression(diags)
    }

    fn parse_technique(&mut self, diags: &mut Diagnostics) {
        let loc = self.loc();
        self.consume(diags); // `technique`
        let name = match self.peek().clone() {
            TokenKind::Identifier(n) => {
                self.consume(diags);
                n
            }
            _ => {
                self.error(diags, DiagCode::SyntaxUnexpectedToken, "expected a technique name");
                return;
            }
        };
        let annotations = self.parse_annotations(diags);
        if !self.expect(diags, |k| matches!(k, TokenKind::BraceOpen), "'{'") {
            return;
        }
        let mut passes = Vec::new();
        while matches!(self.peek(), TokenKind::Pass) {
            if let Some(pass) = self.parse_technique_pass(diags) {
                passes.push(pass);
            }
        }
        self.expect(diags, |k| matches!(k, TokenKind::BraceClose), "'}'");
        self.ast.techniques.push(TechniqueDecl { name, annotations, passes, loc });
    }

    fn parse_technique_pass(&mut self, diags: &mut Diagnostics) -> Option<PassDecl> {
        let loc = self.loc();
        self.consume(diags); // `pass`
        let name = if let TokenKind::Identifier(n) = self.peek().clone() {
            self.consume(diags);
            Some(n)
        } else {
            None
        };
        if !self.expect(diags, |k| matches!(k, TokenKind::BraceOpen), "'{'") {
            return None;
        }
        let mut states = Vec::new();
        while !matches!(self.peek(), TokenKind::BraceClose | TokenKind::Eof) {
            let state_name = match self.peek().clone() {
                TokenKind::Identifier(n) => {
                    self.consume(diags);
                    n
                }
                _ => {
                    self.lexer.consume_until(diags, |k| matches!(k, TokenKind::Semicolon));
                    continue;
                }
            };
            let Ok(state) = state_name.parse::<PassState>() else {
                self.error(diags, DiagCode::UndeclaredIdentifier, format!("unrecognized pass state '{state_name}'"));
                self.lexer.consume_until(diags, |k| matches!(k, TokenKind::Semicolon));
                continue;
            };
            if self.expect(diags, |k| matches!(k, TokenKind::Equal), "'='") {
                let value = self.parse_technique_pass_expression(diags, state);
                states.push((state, value));
            }
            self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        }
        self.expect(diags, |k| matches!(k, TokenKind::BraceClose), "'}'");
        Some(PassDecl { name, states, loc })
    }

    /// `VertexShader`/`PixelShader` expect a function identifier;
    /// `RenderTarget*` a texture variable; everything else a literal or a
    /// recognized pass-state enum spelling. `SRGBWriteEnable` accepts both
    /// `TRUE`/`FALSE` and `1`/`0` (REDESIGN FLAGS (b)).
    fn parse_technique_pass_expression(&mut self, diags: &mut Diagnostics, state: PassState) -> crate::arena::ExprId {
        let loc = self.loc();
        match state {
            PassState::VertexShader | PassState::PixelShader => {
                if let TokenKind::Identifier(name) = self.peek().clone() {
                    self.consume(diags);
                    let scope = self.symbols.current_scope();
                    let ty = match self.symbols.find(&name, &scope, false) {
                        Some(Declaration::Function(idx)) => self.ast.functions[idx].return_type,
                        _ => Type::void(),
                    };
                    return self
                        .ast
                        .alloc_expr(crate::ast::ExprNode { kind: crate::ast::ExprKind::Literal(LiteralValue::Str(name)), ty, loc });
                }
            }
            _ => {
                if let TokenKind::Identifier(name) = self.peek().clone() {
                    self.consume(diags);
                    let ty = Type::scalar(BaseType::String);
                    return self.ast.alloc_expr(crate::ast::ExprNode {
                        kind: crate::ast::ExprKind::Literal(LiteralValue::Str(name)),
                        ty,
                        loc,
                    });
                }
            }
        }
        self.parse_assignment_expression(diags)
    }

    /// Parses `{ stmt* }` as a function/loop body, opening no additional
    /// scope beyond the one the caller already entered.
    pub(super) fn parse_block_statements(&mut self, diags: &mut Diagnostics) -> Vec<StmtId> {
        if !self.expect(diags, |k| matches!(k, TokenKind::BraceOpen), "'{'") {
            return Vec::new();
        }
        let mut stmts = Vec::new();
        while !matches!(self.peek(), TokenKind::BraceClose | TokenKind::Eof) {
            stmts.push(self.parse_statement(diags, true));
        }
        self.expect(diags, |k| matches!(k, TokenKind::BraceClose), "'}'");
        stmts
    }

    /// One statement. `scoped` controls whether a `{ ... }` block opens its
    /// own scope — loop bodies that already opened a scope for their
    /// initializer pass `false` (§4.G).
    pub(super) fn parse_statement(&mut self, diags: &mut Diagnostics, scoped: bool) -> StmtId {
        let loc = self.loc();
        let attributes = self.parse_attributes(diags);

        let kind = match self.peek().clone() {
            TokenKind::Semicolon => {
                self.consume(diags);
                StmtKind::Empty
            }
            TokenKind::BraceOpen => {
                if scoped {
                    self.symbols.enter_scope();
                }
                let stmts = self.parse_block_statements(diags);
                if scoped {
                    self.symbols.leave_scope();
                }
                StmtKind::Block(stmts)
            }
            TokenKind::If => self.parse_if(diags),
            TokenKind::Switch => self.parse_switch(diags),
            TokenKind::For => self.parse_for(diags),
            TokenKind::While => self.parse_while(diags),
            TokenKind::Do => self.parse_do_while(diags),
            TokenKind::Return => self.parse_return(diags),
            TokenKind::Break => {
                self.consume(diags);
                self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
                StmtKind::Jump(JumpKind::Break)
            }
            TokenKind::Continue => {
                self.consume(diags);
                self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
                StmtKind::Jump(JumpKind::Continue)
            }
            TokenKind::Discard => {
                self.consume(diags);
                self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
                StmtKind::Return { value: None, discard: true }
            }
            _ => self.parse_expression_or_declaration_statement(diags),
        };

        self.ast.alloc_stmt(StmtNode { kind, loc, attributes })
    }

    fn parse_attributes(&mut self, diags: &mut Diagnostics) -> Vec<String> {
        let mut attrs = Vec::new();
        while matches!(self.peek(), TokenKind::BracketOpen) {
            self.consume(diags);
            if let TokenKind::Identifier(name) = self.peek().clone() {
                self.consume(diags);
                attrs.push(name);
            }
            self.expect(diags, |k| matches!(k, TokenKind::BracketClose), "']'");
        }
        attrs
    }

    fn parse_if(&mut self, diags: &mut Diagnostics) -> StmtKind {
        self.consume(diags); // `if`
        self.expect(diags, |k| matches!(k, TokenKind::ParenOpen), "'('");
        let cond = self.parse_expression_sequence(diags);
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");
        if !self.ast.expr(cond).ty.is_scalar() {
            self.error(diags, DiagCode::ScalarExpected, "if condition must be scalar");
        }
        let then_branch = self.parse_statement(diags, true);
        let else_branch = if self.accept(diags, |k| matches!(k, TokenKind::Else)) {
            Some(self.parse_statement(diags, true))
        } else {
            None
        };
        StmtKind::If { cond, then_branch, else_branch }
    }

    fn parse_switch(&mut self, diags: &mut Diagnostics) -> StmtKind {
        self.consume(diags); // `switch`
        self.expect(diags, |k| matches!(k, TokenKind::ParenOpen), "'('");
        let test = self.parse_expression_sequence(diags);
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");
        if !self.ast.expr(test).ty.is_scalar() {
            self.error(diags, DiagCode::ScalarExpected, "switch test must be scalar");
        }
        self.expect(diags, |k| matches!(k, TokenKind::BraceOpen), "'{'");

        let mut cases = Vec::new();
        while !matches!(self.peek(), TokenKind::BraceClose | TokenKind::Eof) {
            let mut labels = Vec::new();
            loop {
                if self.accept(diags, |k| matches!(k, TokenKind::Case)) {
                    let value = self.parse_assignment_expression(diags);
                    if !matches!(self.ast.expr(value).kind, crate::ast::ExprKind::Literal(LiteralValue::Int(_) | LiteralValue::Uint(_))) {
                        self.error(diags, DiagCode::TypeMismatch, "case labels must be literal numeric expressions");
                    }
                    labels.push(CaseLabel::Literal(value));
                    self.expect(diags, |k| matches!(k, TokenKind::Colon), "':'");
                } else if self.accept(diags, |k| matches!(k, TokenKind::Default)) {
                    labels.push(CaseLabel::Default);
                    self.expect(diags, |k| matches!(k, TokenKind::Colon), "':'");
                } else {
                    break;
                }
            }
            let mut body = Vec::new();
            while !matches!(self.peek(), TokenKind::Case | TokenKind::Default | TokenKind::BraceClose | TokenKind::Eof) {
                body.push(self.parse_statement(diags, true));
            }
            cases.push(SwitchCase { labels, body });
        }
        self.expect(diags, |k| matches!(k, TokenKind::BraceClose), "'}'");

        if cases.is_empty() {
            self.warn(diags, DiagCode::EmptySwitchWarning, "empty switch statement");
        }
        StmtKind::Switch { test, cases }
    }

    fn parse_for(&mut self, diags: &mut Diagnostics) -> StmtKind {
        self.consume(diags); // `for`
        self.symbols.enter_scope();
        self.expect(diags, |k| matches!(k, TokenKind::ParenOpen), "'('");

        let init = if matches!(self.peek(), TokenKind::Semicolon) {
            self.consume(diags);
            None
        } else {
            Some(self.parse_statement(diags, false))
        };
        let cond = if matches!(self.peek(), TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression_sequence(diags))
        };
        self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        let increment = if matches!(self.peek(), TokenKind::ParenClose) {
            None
        } else {
            Some(self.parse_expression_sequence(diags))
        };
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");

        let body = self.parse_statement(diags, true);
        self.symbols.leave_scope();
        StmtKind::For { init, cond, increment, body }
    }

    fn parse_while(&mut self, diags: &mut Diagnostics) -> StmtKind {
        self.consume(diags); // `while`
        self.expect(diags, |k| matches!(k, TokenKind::ParenOpen), "'('");
        let cond = self.parse_expression_sequence(diags);
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");
        let body = self.parse_statement(diags, true);
        StmtKind::While { cond, body, do_while: false }
    }

    fn parse_do_while(&mut self, diags: &mut Diagnostics) -> StmtKind {
        self.consume(diags); // `do`
        let body = self.parse_statement(diags, true);
        self.expect(diags, |k| matches!(k, TokenKind::While), "'while'");
        self.expect(diags, |k| matches!(k, TokenKind::ParenOpen), "'('");
        let cond = self.parse_expression_sequence(diags);
        self.expect(diags, |k| matches!(k, TokenKind::ParenClose), "')'");
        self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        StmtKind::While { cond, body, do_while: true }
    }

    fn parse_return(&mut self, diags: &mut Diagnostics) -> StmtKind {
        self.consume(diags); // `return`
        let enclosing_return_type = self
            .symbols
            .nearest_enclosing_function()
            .map_or_else(Type::void, |idx| self.ast.functions[idx].return_type);

        if matches!(self.peek(), TokenKind::Semicolon) {
            self.consume(diags);
            if !enclosing_return_type.is_void() {
                self.error(diags, DiagCode::ReturnMissingValue, "missing return value");
            }
            return StmtKind::Return { value: None, discard: false };
        }

        let value = self.parse_expression_sequence(diags);
        self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        if enclosing_return_type.is_void() {
            self.error(diags, DiagCode::ReturnValueInVoidFunction, "a void function cannot return a value");
        } else {
            let value_ty = self.ast.expr(value).ty;
            let r = crate::types::rank(&value_ty, &enclosing_return_type);
            if r == 0 {
                self.error(diags, DiagCode::TypeConversionFailure, "return value does not match the function's return type");
            } else if r != 1 {
                self.warn(diags, DiagCode::ImplicitTruncationWarning, "implicit truncation on return");
            }
        }
        StmtKind::Return { value: Some(value), discard: false }
    }

    /// Either a declarator list (type-led) or an expression statement.
    fn parse_expression_or_declaration_statement(&mut self, diags: &mut Diagnostics) -> StmtKind {
        let loc = self.loc();
        self.lexer.backup();
        let qualifiers_start = self.accept_type_qualifiers(diags);
        if let Some(mut ty) = self.accept_type_class(diags) {
            if let TokenKind::Identifier(name) = self.peek().clone() {
                self.consume(diags);
                ty.qualifiers = qualifiers_start;
                let vars = self.parse_variable_declarator_list(diags, ty, name, loc, false);
                return StmtKind::DeclareVars(vars);
            }
        }
        self.lexer.restore(self.source);

        let expr = self.parse_expression_sequence(diags);
        self.expect(diags, |k| matches!(k, TokenKind::Semicolon), "';'");
        StmtKind::Expr(expr)
    }
}
