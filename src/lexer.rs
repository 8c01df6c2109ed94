//! Lexer (spec component B).
//!
//! The teacher defers all lexing to `ruff_python_parser`, so there is no
//! in-tree tokenizer to generalize; this one is grounded instead on
//! `examples/original_source/source/FX/Parser.cpp`'s `lexer::tokenid`
//! switch and `parser::accept_type_class` (the reserved-word/type-keyword
//! table, including the scalar/vector/matrix-suffix variants), re-expressed
//! as an idiomatic tagged `TokenKind` enum the way the teacher tags its own
//! AST nodes (`expressions.rs::Node`).

use std::str::Chars;

use crate::diagnostics::{DiagCode, Diagnostics, Location, SourceId};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Uint(u32),
    Float(f32),
    Double(f64),
    Str(String),
}

/// One reserved keyword naming a scalar/vector/matrix shape, e.g. `float3x3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeKeyword {
    pub basetype: crate::types::BaseType,
    pub rows: u8,
    pub cols: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    /// An input byte that matches none of the grammar's token forms.
    Unknown,
    Identifier(String),
    Literal(Literal),
    True,
    False,

    // Punctuation
    Exclaim,
    Hash,
    Dollar,
    Percent,
    Ampersand,
    ParenOpen,
    ParenClose,
    Star,
    Plus,
    Comma,
    Minus,
    Dot,
    Slash,
    Colon,
    Semicolon,
    Less,
    Equal,
    Greater,
    Question,
    At,
    BracketOpen,
    Backslash,
    BracketClose,
    Caret,
    BraceOpen,
    Pipe,
    BraceClose,
    Tilde,

    ExclaimEqual,
    PercentEqual,
    AmpersandAmpersand,
    AmpersandEqual,
    StarEqual,
    PlusPlus,
    PlusEqual,
    MinusMinus,
    MinusEqual,
    Arrow,
    Ellipsis,
    SlashEqual,
    ColonColon,
    LessLessEqual,
    LessLess,
    LessEqual,
    EqualEqual,
    GreaterGreaterEqual,
    GreaterGreater,
    GreaterEqual,
    CaretEqual,
    PipeEqual,
    PipePipe,

    // Reserved words
    Namespace,
    Struct,
    Technique,
    Pass,
    For,
    While,
    Do,
    If,
    Else,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Discard,
    Extern,
    Static,
    Uniform,
    Volatile,
    Precise,
    In,
    Out,
    Inout,
    Const,
    Linear,
    Noperspective,
    Centroid,
    Nointerpolation,
    Void,
    /// A scalar/vector/matrix shape keyword (`bool`, `float3`, `int4x4`, ...).
    Shape(ShapeKeyword),
    Vector,
    Matrix,
    String,
    Texture1D,
    Texture2D,
    Texture3D,
    Sampler1D,
    Sampler2D,
    Sampler3D,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Location,
}

impl Token {
    #[must_use]
    pub fn literal_as_int(&self) -> Option<i64> {
        match &self.kind {
            TokenKind::Literal(Literal::Int(v)) => Some(i64::from(*v)),
            TokenKind::Literal(Literal::Uint(v)) => Some(i64::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub fn literal_as_string(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(s) | TokenKind::Literal(Literal::Str(s)) => Some(s),
            _ => None,
        }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    use crate::types::BaseType::{Bool, Float, Int, Uint};
    use TokenKind::{
        Break, Case, Centroid, Const, Continue, Default, Discard, Do, Else, Extern, For, If, In, Inout, Linear,
        Namespace, Nointerpolation, Noperspective, Out, Pass, Precise, Return, Sampler1D, Sampler2D, Sampler3D,
        Shape, Static, Struct, Switch, Technique, Texture1D, Texture2D, Texture3D, Uniform, Void, Volatile, While,
    };

    fn shape(basetype: crate::types::BaseType, rows: u8, cols: u8) -> TokenKind {
        Shape(ShapeKeyword { basetype, rows, cols })
    }

    Some(match word {
        "namespace" => Namespace,
        "struct" => Struct,
        "technique" => Technique,
        "pass" => Pass,
        "for" => For,
        "while" => While,
        "do" => Do,
        "if" => If,
        "else" => Else,
        "switch" => Switch,
        "case" => Case,
        "default" => Default,
        "break" => Break,
        "continue" => Continue,
        "return" => Return,
        "discard" => Discard,
        "extern" => Extern,
        "static" => Static,
        "uniform" => Uniform,
        "volatile" => Volatile,
        "precise" => Precise,
        "in" => In,
        "out" => Out,
        "inout" => Inout,
        "const" => Const,
        "linear" => Linear,
        "noperspective" => Noperspective,
        "centroid" => Centroid,
        "nointerpolation" => Nointerpolation,
        "void" => Void,
        "vector" => TokenKind::Vector,
        "matrix" => TokenKind::Matrix,
        "string" => TokenKind::String,
        "texture1D" => Texture1D,
        "texture2D" => Texture2D,
        "texture3D" => Texture3D,
        "sampler1D" => Sampler1D,
        "sampler2D" => Sampler2D,
        "sampler3D" => Sampler3D,
        "true" => TokenKind::True,
        "false" => TokenKind::False,

        "bool" => shape(Bool, 1, 1),
        "bool2" => shape(Bool, 2, 1),
        "bool3" => shape(Bool, 3, 1),
        "bool4" => shape(Bool, 4, 1),
        "bool2x2" => shape(Bool, 2, 2),
        "bool3x3" => shape(Bool, 3, 3),
        "bool4x4" => shape(Bool, 4, 4),

        "int" => shape(Int, 1, 1),
        "int2" => shape(Int, 2, 1),
        "int3" => shape(Int, 3, 1),
        "int4" => shape(Int, 4, 1),
        "int2x2" => shape(Int, 2, 2),
        "int3x3" => shape(Int, 3, 3),
        "int4x4" => shape(Int, 4, 4),

        "uint" => shape(Uint, 1, 1),
        "uint2" => shape(Uint, 2, 1),
        "uint3" => shape(Uint, 3, 1),
        "uint4" => shape(Uint, 4, 1),
        "uint2x2" => shape(Uint, 2, 2),
        "uint3x3" => shape(Uint, 3, 3),
        "uint4x4" => shape(Uint, 4, 4),

        "float" => shape(Float, 1, 1),
        "float2" => shape(Float, 2, 1),
        "float3" => shape(Float, 3, 1),
        "float4" => shape(Float, 4, 1),
        "float2x2" => shape(Float, 2, 2),
        "float3x3" => shape(Float, 3, 3),
        "float4x4" => shape(Float, 4, 4),

        _ => return None,
    })
}

/// A saved cursor position, restored by [`Lexer::restore`]. Snapshots do not
/// nest — a second `backup()` overwrites the first, matching the original
/// compiler's single `_lexer_backup` slot.
#[derive(Debug, Clone)]
pub struct LexerSnapshot {
    position: usize,
    line: u32,
    column: u32,
    next: Option<Token>,
}

/// Produces [`Token`]s on demand from a source string, with one token of
/// lookahead (`current` is the most recently consumed token; `peek`/`accept`
/// look at the token queued up behind it).
pub struct Lexer<'a> {
    source_id: SourceId,
    chars: std::iter::Peekable<Chars<'a>>,
    position: usize,
    line: u32,
    column: u32,
    current: Option<Token>,
    next: Option<Token>,
    snapshot: Option<LexerSnapshot>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str, source_id: SourceId, diags: &mut Diagnostics) -> Self {
        let mut lexer = Self {
            source_id,
            chars: source.chars().peekable(),
            position: 0,
            line: 1,
            column: 1,
            current: None,
            next: None,
            snapshot: None,
        };
        lexer.next = Some(lexer.scan(diags));
        lexer
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek() {
                        Some('/') => {
                            while !matches!(self.chars.peek(), None | Some('\n')) {
                                self.bump();
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            loop {
                                match self.bump() {
                                    None => break,
                                    Some('*') if self.chars.peek() == Some(&'/') => {
                                        self.bump();
                                        break;
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    fn here(&self) -> Location {
        Location::new(self.source_id, self.line, self.column)
    }

    fn scan(&mut self, diags: &mut Diagnostics) -> Token {
        self.skip_trivia();
        let loc = self.here();

        let Some(&c) = self.chars.peek() else {
            return Token { kind: TokenKind::Eof, loc };
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_is_digit_after_dot()) {
            return self.scan_number(loc);
        }
        if c == '"' {
            return self.scan_string(loc);
        }
        if c.is_alphabetic() || c == '_' {
            return self.scan_identifier_or_keyword(loc);
        }

        self.bump();
        let kind = self.scan_operator(c, diags, loc);
        Token { kind, loc }
    }

    fn peek_is_digit_after_dot(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        matches!(ahead.peek(), Some(c) if c.is_ascii_digit())
    }

    fn scan_identifier_or_keyword(&mut self, loc: Location) -> Token {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = keyword(&word).unwrap_or(TokenKind::Identifier(word));
        Token { kind, loc }
    }

    fn scan_number(&mut self, loc: Location) -> Token {
        let mut text = String::new();
        let mut is_float = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
                self.bump();
            } else if matches!(c, 'e' | 'E') {
                is_float = true;
                text.push(c);
                self.bump();
                if matches!(self.chars.peek(), Some('+' | '-')) {
                    text.push(self.bump().expect("peeked"));
                }
            } else {
                break;
            }
        }

        let literal = match self.chars.peek() {
            Some('f' | 'F') => {
                self.bump();
                Literal::Float(text.parse().unwrap_or(0.0))
            }
            Some('l' | 'L') => {
                self.bump();
                Literal::Double(text.parse().unwrap_or(0.0))
            }
            Some('u' | 'U') => {
                self.bump();
                Literal::Uint(text.parse().unwrap_or(0))
            }
            _ if is_float => Literal::Float(text.parse().unwrap_or(0.0)),
            _ => match text.parse::<i32>() {
                Ok(v) => Literal::Int(v),
                Err(_) => Literal::Uint(text.parse().unwrap_or(0)),
            },
        };

        Token { kind: TokenKind::Literal(literal), loc }
    }

    fn scan_string(&mut self, loc: Location) -> Token {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => break,
                },
                Some(c) => value.push(c),
            }
        }
        Token { kind: TokenKind::Literal(Literal::Str(value)), loc }
    }

    fn scan_operator(&mut self, c: char, diags: &mut Diagnostics, loc: Location) -> TokenKind {
        use TokenKind::{
            Ampersand, AmpersandAmpersand, AmpersandEqual, Arrow, At, BraceClose, BraceOpen, BracketClose,
            BracketOpen, Caret, CaretEqual, Colon, ColonColon, Comma, Dollar, Dot, Ellipsis, Equal, EqualEqual,
            Exclaim, ExclaimEqual, Greater, GreaterEqual, GreaterGreater, GreaterGreaterEqual, Hash, Less, LessEqual,
            LessLess, LessLessEqual, Minus, MinusEqual, MinusMinus, ParenClose, ParenOpen, Percent, PercentEqual,
            Pipe, PipeEqual, PipePipe, Plus, PlusEqual, PlusPlus, Question, Semicolon, Slash, SlashEqual, Star,
            StarEqual, Tilde, Unknown,
        };

        macro_rules! two {
            ($second:expr, $with:expr, $without:expr) => {
                if self.chars.peek() == Some(&$second) {
                    self.bump();
                    $with
                } else {
                    $without
                }
            };
        }

        match c {
            '!' => two!('=', ExclaimEqual, Exclaim),
            '#' => Hash,
            '$' => Dollar,
            '%' => two!('=', PercentEqual, Percent),
            '&' => {
                if self.chars.peek() == Some(&'&') {
                    self.bump();
                    AmpersandAmpersand
                } else {
                    two!('=', AmpersandEqual, Ampersand)
                }
            }
            '(' => ParenOpen,
            ')' => ParenClose,
            '*' => two!('=', StarEqual, Star),
            '+' => {
                if self.chars.peek() == Some(&'+') {
                    self.bump();
                    PlusPlus
                } else {
                    two!('=', PlusEqual, Plus)
                }
            }
            ',' => Comma,
            '-' => {
                if self.chars.peek() == Some(&'-') {
                    self.bump();
                    MinusMinus
                } else if self.chars.peek() == Some(&'>') {
                    self.bump();
                    Arrow
                } else {
                    two!('=', MinusEqual, Minus)
                }
            }
            '.' => {
                let mut ahead = self.chars.clone();
                if ahead.peek() == Some(&'.') {
                    ahead.next();
                    if ahead.peek() == Some(&'.') {
                        self.bump();
                        self.bump();
                        return Ellipsis;
                    }
                }
                Dot
            }
            '/' => two!('=', SlashEqual, Slash),
            ':' => two!(':', ColonColon, Colon),
            ';' => Semicolon,
            '<' => {
                if self.chars.peek() == Some(&'<') {
                    self.bump();
                    two!('=', LessLessEqual, LessLess)
                } else {
                    two!('=', LessEqual, Less)
                }
            }
            '=' => two!('=', EqualEqual, Equal),
            '>' => {
                if self.chars.peek() == Some(&'>') {
                    self.bump();
                    two!('=', GreaterGreaterEqual, GreaterGreater)
                } else {
                    two!('=', GreaterEqual, Greater)
                }
            }
            '?' => Question,
            '@' => At,
            '[' => BracketOpen,
            '\\' => TokenKind::Backslash,
            ']' => BracketClose,
            '^' => two!('=', CaretEqual, Caret),
            '{' => BraceOpen,
            '|' => {
                if self.chars.peek() == Some(&'|') {
                    self.bump();
                    PipePipe
                } else {
                    two!('=', PipeEqual, Pipe)
                }
            }
            '}' => BraceClose,
            '~' => Tilde,
            other => {
                diags.push(loc, DiagCode::SyntaxUnexpectedToken, format!("unexpected character '{other}'"));
                Unknown
            }
        }
    }
}

impl<'a> Lexer<'a> {
    /// The id of the next token, without consuming it.
    #[must_use]
    pub fn peek(&self) -> &TokenKind {
        self.next.as_ref().map_or(&TokenKind::Eof, |t| &t.kind)
    }

    #[must_use]
    pub fn peek_location(&self) -> Location {
        self.next.as_ref().map_or_else(|| self.here(), |t| t.loc)
    }

    /// Advances past the current lookahead token, returning it, and refills
    /// the lookahead slot. The returned token becomes `current`.
    pub fn consume(&mut self, diags: &mut Diagnostics) -> Token {
        let consumed = self.next.take().unwrap_or(Token { kind: TokenKind::Eof, loc: self.here() });
        self.next = Some(self.scan(diags));
        self.current = Some(consumed.clone());
        consumed
    }

    #[must_use]
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Consumes only if the lookahead token matches `matcher`.
    pub fn accept(&mut self, diags: &mut Diagnostics, matcher: impl Fn(&TokenKind) -> bool) -> bool {
        if matcher(self.peek()) {
            self.consume(diags);
            true
        } else {
            false
        }
    }

    /// Consumes if the lookahead matches, else emits X3000 and returns `false`.
    pub fn expect(&mut self, diags: &mut Diagnostics, matcher: impl Fn(&TokenKind) -> bool, want: &str) -> bool {
        if self.accept(diags, matcher) {
            true
        } else {
            let loc = self.peek_location();
            diags.push(
                loc,
                DiagCode::SyntaxUnexpectedToken,
                format!("unexpected '{:?}', expected {want}", self.peek()),
            );
            false
        }
    }

    /// Skips tokens until one matches `matcher` (inclusive) or EOF. The sole
    /// recovery primitive — used after an unrecoverable parse error to
    /// resynchronize at the next statement/declaration boundary.
    pub fn consume_until(&mut self, diags: &mut Diagnostics, matcher: impl Fn(&TokenKind) -> bool) {
        loop {
            if matcher(self.peek()) {
                self.consume(diags);
                return;
            }
            if matches!(self.peek(), TokenKind::Eof) {
                return;
            }
            self.consume(diags);
        }
    }

    /// Snapshots lexer position and lookahead. Does not nest.
    pub fn backup(&mut self) {
        self.snapshot = Some(LexerSnapshot {
            position: self.position,
            line: self.line,
            column: self.column,
            next: self.next.clone(),
        });
    }

    /// Reinstates the most recent [`Self::backup`]. Panics if none was taken
    /// (a parser bug, not a user-facing error).
    pub fn restore(&mut self, source: &'a str) {
        let snap = self.snapshot.take().expect("restore() without a matching backup()");
        self.chars = source[snap.position..].chars().peekable();
        self.position = snap.position;
        self.line = snap.line;
        self.column = snap.column;
        self.next = snap.next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<TokenKind> {
        let mut diags = Diagnostics::new();
        let mut lexer = Lexer::new(src, SourceId::default(), &mut diags);
        let mut out = Vec::new();
        loop {
            let kind = lexer.peek().clone();
            if matches!(kind, TokenKind::Eof) {
                break;
            }
            lexer.consume(&mut diags);
            out.push(kind);
        }
        out
    }

    #[test]
    fn recognizes_compound_operators() {
        let got = tokens("<<= >>= << >> <= >= == != && ||");
        assert_eq!(
            got,
            vec![
                TokenKind::LessLessEqual,
                TokenKind::GreaterGreaterEqual,
                TokenKind::LessLess,
                TokenKind::GreaterGreater,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::ExclaimEqual,
                TokenKind::AmpersandAmpersand,
                TokenKind::PipePipe,
            ]
        );
    }

    #[test]
    fn recognizes_vector_and_matrix_shape_keywords() {
        let got = tokens("float3x3 int4 bool2");
        assert_eq!(
            got,
            vec![
                TokenKind::Shape(ShapeKeyword { basetype: crate::types::BaseType::Float, rows: 3, cols: 3 }),
                TokenKind::Shape(ShapeKeyword { basetype: crate::types::BaseType::Int, rows: 4, cols: 1 }),
                TokenKind::Shape(ShapeKeyword { basetype: crate::types::BaseType::Bool, rows: 2, cols: 1 }),
            ]
        );
    }

    #[test]
    fn consecutive_string_literals_are_separate_tokens_for_the_parser_to_concatenate() {
        let got = tokens(r#" "a" "b" "#);
        assert_eq!(
            got,
            vec![
                TokenKind::Literal(Literal::Str("a".to_string())),
                TokenKind::Literal(Literal::Str("b".to_string())),
            ]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        let got = tokens("1 // comment\n2 /* block\ncomment */ 3");
        assert_eq!(
            got,
            vec![
                TokenKind::Literal(Literal::Int(1)),
                TokenKind::Literal(Literal::Int(2)),
                TokenKind::Literal(Literal::Int(3)),
            ]
        );
    }

    #[test]
    fn backup_and_restore_rewind_the_cursor() {
        let src = "foo bar";
        let mut diags = Diagnostics::new();
        let mut lexer = Lexer::new(src, SourceId::default(), &mut diags);
        lexer.backup();
        let first = lexer.consume(&mut diags);
        assert_eq!(first.kind, TokenKind::Identifier("foo".to_string()));
        lexer.restore(src);
        let replayed = lexer.consume(&mut diags);
        assert_eq!(replayed.kind, TokenKind::Identifier("foo".to_string()));
    }
}
