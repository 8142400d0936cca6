#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("value is already being assigned")]
	Reentrant,
	#[error("observable has been disposed")]
	Disposed,
	#[error("invalid settings: {0}")]
	InvalidSettings(String),
}
