use crate::{domains::DomainError, events::EventError, lexer::LexicalError, lexer::Token};
use lalrpop_util::ParseError;
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum ParserError {
    #[error("failed to lex the expression with {0:?}")]
    Lexical(LexicalError),
    #[error("failed with {0:?}")]
    Domain(DomainError),
}

impl<'input> From<DomainError> for ParseError<usize, Token<'input>, ParserError> {
    fn from(error: DomainError) -> Self {
        ParseError::User {
            error: ParserError::Domain(error),
        }
    }
}

/// A parse failure that does not borrow the expression text.
pub type BETreeParseError = ParseError<usize, String, ParserError>;

#[derive(Debug, PartialEq, Error)]
pub enum BETreeError {
    #[error("failed to parse the expression with {0:?}")]
    Parse(BETreeParseError),
    #[error("failed with {0:?}")]
    Domain(DomainError),
    #[error("failed with {0:?}")]
    Event(EventError),
    #[error("expression {0} has already been inserted")]
    DuplicateExpression(String),
}

impl From<DomainError> for BETreeError {
    fn from(error: DomainError) -> Self {
        Self::Domain(error)
    }
}

impl From<EventError> for BETreeError {
    fn from(error: EventError) -> Self {
        Self::Event(error)
    }
}
