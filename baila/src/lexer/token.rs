//! Token definitions

use crate::ast::{SourcePos, Span};
use std::fmt;

/// Delimiter a string literal was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    /// `'...'`
    Single,
    /// `"..."`
    Double,
    /// `` `...` ``
    Backtick,
}

impl Quote {
    pub fn from_char(c: char) -> Option<Quote> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            '`' => Some(Quote::Backtick),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
            Quote::Backtick => '`',
        }
    }
}

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Identifier,
    /// Decimal text, possibly with an `f` or `c` suffix
    Number,
    /// Escaped template text, see `parser::template`
    String(Quote),
    Regex,

    // Keywords
    Null,
    True,
    False,
    This,
    Super,
    Var,
    Const,
    Prop,
    Function,
    Class,
    Struct,
    Interface,
    Enum,
    Operator,
    Constructor,
    Deconstructor,
    TypeOf,
    From,
    Import,
    Export,
    Ref,
    If,
    Else,
    Switch,
    For,
    Do,
    While,
    Try,
    Catch,
    Finally,
    Global,
    Public,
    Private,
    Protected,
    Override,
    Sealed,
    Static,
    Async,
    Await,
    Break,
    Continue,
    Throw,
    Return,
    Yield,
    In,
    Is,
    As,

    // Operators
    Plus,
    PlusEq,
    PlusPlus,
    Minus,
    MinusEq,
    MinusMinus,
    Star,
    StarEq,
    StarStar,
    StarStarEq,
    Slash,
    SlashEq,
    SlashSlash,
    SlashSlashEq,
    Percent,
    PercentEq,
    Eq,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Bar,
    BarEq,
    BarBar,
    BarBarEq,
    PipeGt,
    Amp,
    AmpEq,
    AmpAmp,
    AmpAmpEq,
    Tilde,
    Caret,
    CaretEq,
    CaretCaret,
    CaretCaretEq,
    Dot,
    DotDot,
    Comma,
    QuestionDot,
    QuestionQuestion,
    QuestionQuestionEq,
    Lt,
    LtEq,
    Shl,
    ShlEq,
    Gt,
    GtEq,
    Shr,
    ShrEq,
    UShr,
    UShrEq,
    Arrow,
    FatArrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Bang,
    Question,
    Colon,
    ColonColon,
    Semicolon,
    /// `!in`
    NotIn,
    /// `!is`
    NotIs,
    /// `?as`
    QuestionAs,

    Eof,
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("null", TokenKind::Null),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("this", TokenKind::This),
    ("super", TokenKind::Super),
    ("var", TokenKind::Var),
    ("const", TokenKind::Const),
    ("prop", TokenKind::Prop),
    ("property", TokenKind::Prop),
    ("function", TokenKind::Function),
    ("func", TokenKind::Function),
    ("class", TokenKind::Class),
    ("struct", TokenKind::Struct),
    ("interface", TokenKind::Interface),
    ("enum", TokenKind::Enum),
    ("operator", TokenKind::Operator),
    ("constructor", TokenKind::Constructor),
    ("deconstructor", TokenKind::Deconstructor),
    ("typeof", TokenKind::TypeOf),
    ("from", TokenKind::From),
    ("import", TokenKind::Import),
    ("export", TokenKind::Export),
    ("ref", TokenKind::Ref),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("switch", TokenKind::Switch),
    ("for", TokenKind::For),
    ("do", TokenKind::Do),
    ("while", TokenKind::While),
    ("try", TokenKind::Try),
    ("catch", TokenKind::Catch),
    ("finally", TokenKind::Finally),
    ("global", TokenKind::Global),
    ("public", TokenKind::Public),
    ("private", TokenKind::Private),
    ("protected", TokenKind::Protected),
    ("override", TokenKind::Override),
    ("sealed", TokenKind::Sealed),
    ("static", TokenKind::Static),
    ("async", TokenKind::Async),
    ("await", TokenKind::Await),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("throw", TokenKind::Throw),
    ("return", TokenKind::Return),
    ("yield", TokenKind::Yield),
    ("in", TokenKind::In),
    ("is", TokenKind::Is),
    ("as", TokenKind::As),
];

/// Operator spellings. Lookup is by exact spelling; the lexer does the
/// longest-match walk.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("+", TokenKind::Plus),
    ("+=", TokenKind::PlusEq),
    ("++", TokenKind::PlusPlus),
    ("-", TokenKind::Minus),
    ("-=", TokenKind::MinusEq),
    ("--", TokenKind::MinusMinus),
    ("*", TokenKind::Star),
    ("*=", TokenKind::StarEq),
    ("**", TokenKind::StarStar),
    ("**=", TokenKind::StarStarEq),
    ("/", TokenKind::Slash),
    ("/=", TokenKind::SlashEq),
    ("//", TokenKind::SlashSlash),
    ("//=", TokenKind::SlashSlashEq),
    ("%", TokenKind::Percent),
    ("%=", TokenKind::PercentEq),
    ("=", TokenKind::Eq),
    ("==", TokenKind::EqEq),
    ("===", TokenKind::EqEqEq),
    ("!=", TokenKind::NotEq),
    ("!==", TokenKind::NotEqEq),
    ("|", TokenKind::Bar),
    ("|=", TokenKind::BarEq),
    ("||", TokenKind::BarBar),
    ("||=", TokenKind::BarBarEq),
    ("|>", TokenKind::PipeGt),
    ("&", TokenKind::Amp),
    ("&=", TokenKind::AmpEq),
    ("&&", TokenKind::AmpAmp),
    ("&&=", TokenKind::AmpAmpEq),
    ("~", TokenKind::Tilde),
    ("^", TokenKind::Caret),
    ("^=", TokenKind::CaretEq),
    ("^^", TokenKind::CaretCaret),
    ("^^=", TokenKind::CaretCaretEq),
    (".", TokenKind::Dot),
    ("..", TokenKind::DotDot),
    (",", TokenKind::Comma),
    ("?.", TokenKind::QuestionDot),
    ("??", TokenKind::QuestionQuestion),
    ("??=", TokenKind::QuestionQuestionEq),
    ("<", TokenKind::Lt),
    ("<=", TokenKind::LtEq),
    ("<<", TokenKind::Shl),
    ("<<=", TokenKind::ShlEq),
    (">", TokenKind::Gt),
    (">=", TokenKind::GtEq),
    (">>", TokenKind::Shr),
    (">>=", TokenKind::ShrEq),
    (">>>", TokenKind::UShr),
    (">>>=", TokenKind::UShrEq),
    ("->", TokenKind::Arrow),
    ("=>", TokenKind::FatArrow),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("!", TokenKind::Bang),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    ("::", TokenKind::ColonColon),
    (";", TokenKind::Semicolon),
    ("!in", TokenKind::NotIn),
    ("!is", TokenKind::NotIs),
    ("?as", TokenKind::QuestionAs),
];

/// Longest operator spelling, in characters
pub const MAX_OPERATOR_LEN: usize = 4;

pub fn keyword(text: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(spelling, _)| *spelling == text)
        .map(|(_, kind)| *kind)
}

pub fn operator(text: &str) -> Option<TokenKind> {
    OPERATORS
        .iter()
        .find(|(spelling, _)| *spelling == text)
        .map(|(_, kind)| *kind)
}

impl TokenKind {
    /// Closing brackets leave the lexer expecting an operator.
    pub fn closes_group(self) -> bool {
        matches!(self, TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::String(_) => write!(f, "string"),
            TokenKind::Regex => write!(f, "regex"),
            TokenKind::Eof => write!(f, "end of input"),
            other => {
                let spelling = KEYWORDS
                    .iter()
                    .chain(OPERATORS.iter())
                    .find(|(_, kind)| kind == other)
                    .map(|(spelling, _)| *spelling)
                    .unwrap_or("?");
                write!(f, "{spelling}")
            }
        }
    }
}

/// A lexed token. `value` is the identifier/literal text, or the operator
/// spelling for everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: SourcePos,
    pub span: Span,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Identifier with the given text; used for soft keywords like `to`, `get`.
    pub fn is_soft_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.value == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "{}", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(keyword("var"), Some(TokenKind::Var));
        assert_eq!(keyword("func"), Some(TokenKind::Function));
        assert_eq!(keyword("property"), Some(TokenKind::Prop));
        assert_eq!(keyword("varx"), None);
    }

    #[test]
    fn test_operator_lookup() {
        assert_eq!(operator(">>>="), Some(TokenKind::UShrEq));
        assert_eq!(operator("//="), Some(TokenKind::SlashSlashEq));
        assert_eq!(operator("=>"), Some(TokenKind::FatArrow));
        assert_eq!(operator("@"), None);
    }

    #[test]
    fn test_operator_spellings_fit_lookahead() {
        assert!(OPERATORS.iter().all(|(s, _)| s.chars().count() <= MAX_OPERATOR_LEN));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TokenKind::StarStarEq.to_string(), "**=");
        assert_eq!(TokenKind::Function.to_string(), "function");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }

    #[test]
    fn test_quote_roundtrip() {
        for c in ['\'', '"', '`'] {
            assert_eq!(Quote::from_char(c).map(Quote::as_char), Some(c));
        }
        assert_eq!(Quote::from_char('x'), None);
    }
}
