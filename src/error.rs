use thiserror::Error;

/// Errors raised while reading, classifying, or combining netlist cards.
///
/// Unknown element letters and malformed parameter tokens are deliberately
/// not in this list: those degrade to warnings and the card passes through
/// unchanged.
#[derive(Debug, Error)]
pub enum SpiceError {
    #[error("bad unit value '{0}'")]
    InvalidUnit(String),

    #[error("line {0}: continuation line with no card to continue")]
    DanglingContinuation(usize),

    #[error("line {line}: element '{element}' is missing required parameter '{param}'")]
    MissingRequiredParameter {
        element: String,
        line: usize,
        param: &'static str,
    },

    #[error("cannot combine inductors '{a}' and '{b}': values sum to zero")]
    DivideByZero { a: String, b: String },

    #[error("invalid drop mode '{0}', expected one of <, <=, >, >=")]
    InvalidDropMode(String),

    #[error("invalid case mode '{0}', expected keep, lower, or upper")]
    InvalidCaseMode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpiceError>;
