use crate::{
    error::ParserError,
    predicates::{
        ComparisonOperator, EqualityOperator, ListOperator, NullOperator, SegmentOperator,
        SetOperator,
    },
};
use logos::{Lexer as LogosLexer, Logos, SpannedIter};
use rust_decimal::Decimal;
use std::{
    fmt::{Display, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;

#[derive(Default, Error, Debug, Clone, PartialEq)]
pub enum LexicalError {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("failed to parse integer: {0:?}")]
    Integer(ParseIntError),
    #[error("failed to parse float: {0:?}")]
    Float(rust_decimal::Error),
}

/// The tokens of the expression language.
///
/// Operators are lexed straight into the predicate operator they stand for. Operators spelled
/// with several words accept any blank between the words.
#[derive(Clone, Debug, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+", error = LexicalError)]
pub enum Token<'source> {
    #[token("<", |_| ComparisonOperator::LessThan)]
    #[token("<=", |_| ComparisonOperator::LessThanEqual)]
    #[token(">", |_| ComparisonOperator::GreaterThan)]
    #[token(">=", |_| ComparisonOperator::GreaterThanEqual)]
    Comparison(ComparisonOperator),
    #[token("=", |_| EqualityOperator::Equal)]
    #[token("<>", |_| EqualityOperator::NotEqual)]
    Equality(EqualityOperator),
    #[token("in", |_| SetOperator::In)]
    #[regex(r"not[ \t\r\n\f]+in", |_| SetOperator::NotIn)]
    Set(SetOperator),
    #[regex(r"one[ \t\r\n\f]+of", |_| ListOperator::OneOf)]
    #[regex(r"none[ \t\r\n\f]+of", |_| ListOperator::NoneOf)]
    #[regex(r"all[ \t\r\n\f]+of", |_| ListOperator::AllOf)]
    List(ListOperator),
    #[regex(r"is[ \t\r\n\f]+null", |_| NullOperator::IsNull)]
    #[regex(r"is[ \t\r\n\f]+not[ \t\r\n\f]+null", |_| NullOperator::IsNotNull)]
    #[regex(r"is[ \t\r\n\f]+empty", |_| NullOperator::IsEmpty)]
    #[regex(r"is[ \t\r\n\f]+not[ \t\r\n\f]+empty", |_| NullOperator::IsNotEmpty)]
    Null(NullOperator),
    #[token("segment_within", |_| SegmentOperator::Within)]
    #[token("segment_before", |_| SegmentOperator::Before)]
    Segment(SegmentOperator),
    #[token("within_frequency_cap")]
    WithinFrequencyCap,
    #[token("not")]
    #[token("!")]
    Not,
    #[token("and")]
    #[token("&&")]
    And,
    #[token("or")]
    #[token("||")]
    Or,
    #[token("(")]
    OpenParenthesis,
    #[token(")")]
    CloseParenthesis,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token(",")]
    Comma,
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().map_err(LexicalError::Integer))]
    Integer(i64),
    /// `6.` is a float as well as `6.5`.
    #[regex(r"-?[0-9]+\.[0-9]*", parse_float)]
    Float(Decimal),
    #[regex(r#""(\\.|[^"\\])*""#, unquote)]
    #[regex(r#"'(\\.|[^'\\])*'"#, unquote)]
    String(&'source str),
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Boolean(bool),
    #[regex("[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice())]
    Identifier(&'source str),
}

fn parse_float<'source>(
    lex: &mut LogosLexer<'source, Token<'source>>,
) -> Result<Decimal, LexicalError> {
    Decimal::from_str(lex.slice().trim_end_matches('.')).map_err(LexicalError::Float)
}

/// Drop the surrounding quotes; escapes are kept as written.
fn unquote<'source>(lex: &mut LogosLexer<'source, Token<'source>>) -> &'source str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

/// Keywords that the identifier rule can also produce.
fn keyword(identifier: &str) -> Option<Token<'static>> {
    match identifier {
        "not" => Some(Token::Not),
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "in" => Some(Token::Set(SetOperator::In)),
        "segment_within" => Some(Token::Segment(SegmentOperator::Within)),
        "segment_before" => Some(Token::Segment(SegmentOperator::Before)),
        "within_frequency_cap" => Some(Token::WithinFrequencyCap),
        _ => None,
    }
}

impl Display for Token<'_> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comparison(operator) => write!(formatter, "{operator}"),
            Self::Equality(operator) => write!(formatter, "{operator}"),
            Self::Set(operator) => write!(formatter, "{operator}"),
            Self::List(operator) => write!(formatter, "{operator}"),
            Self::Null(operator) => write!(formatter, "{operator}"),
            Self::Segment(operator) => write!(formatter, "{operator}"),
            Self::WithinFrequencyCap => write!(formatter, "within_frequency_cap"),
            Self::Not => write!(formatter, "not"),
            Self::And => write!(formatter, "and"),
            Self::Or => write!(formatter, "or"),
            Self::OpenParenthesis => write!(formatter, "("),
            Self::CloseParenthesis => write!(formatter, ")"),
            Self::OpenBracket => write!(formatter, "["),
            Self::CloseBracket => write!(formatter, "]"),
            Self::Comma => write!(formatter, ","),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::String(value) => write!(formatter, "{value:?}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::Identifier(value) => write!(formatter, "{value}"),
        }
    }
}

pub type Spanned<Tok, Location, Error> = Result<(Location, Tok, Location), Error>;

/// Feeds the tokens with their byte offsets to the generated parser.
pub struct Lexer<'input> {
    tokens: SpannedIter<'input, Token<'input>>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            tokens: Token::lexer(input).spanned(),
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Spanned<Token<'input>, usize, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (token, span) = self.tokens.next()?;
        let token = match token {
            Ok(Token::Identifier(identifier)) => {
                keyword(identifier).unwrap_or(Token::Identifier(identifier))
            }
            Ok(token) => token,
            Err(error) => return Some(Err(ParserError::Lexical(error))),
        };
        Some(Ok((span.start, token, span.end)))
    }
}
