use thiserror::Error;

/// Failure to load a [`crate::Digraph`] from its text form.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("Invalid {expected}: {token:?}")]
    InvalidToken {
        expected: &'static str,
        token: String,
    },
}
