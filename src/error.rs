use std::convert::Infallible;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("invalid operation: {0}")]
	InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Infallible> for Error {
	fn from(value: Infallible) -> Self {
		match value {}
	}
}
