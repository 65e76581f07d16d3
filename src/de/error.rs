use std::borrow::Cow;

use crate::error_kind::ErrorKind;

/// Any error that may happen while deserializing a value against a schema.
#[derive(thiserror::Error)]
#[error("{}", inner.value)]
pub struct DeError {
	inner: Box<ErrorInner>,
}

impl std::fmt::Debug for DeError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.inner.io_error.as_ref() {
			Some(io_error) => write!(f, "{}: {}", self.inner.value, io_error),
			None => std::fmt::Debug::fmt(&*self.inner.value, f),
		}
	}
}

struct ErrorInner {
	value: Cow<'static, str>,
	kind: Option<ErrorKind>,
	io_error: Option<std::io::Error>,
}

impl DeError {
	/// If you need a dynamic string use `DeError::custom(format_args!(...))`
	pub(crate) fn new(s: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(s),
				kind: None,
				io_error: None,
			}),
		}
	}

	pub(crate) fn with_kind(kind: ErrorKind, msg: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
				kind: Some(kind),
				io_error: None,
			}),
		}
	}

	pub(crate) fn unexpected_eof() -> Self {
		Self::with_kind(ErrorKind::Truncated, "Unexpected end of slice while deserializing")
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		Self::custom_io(
			"Encountered IO error when attempting to read for deserialization",
			io_error,
		)
	}

	pub(crate) fn custom_io(msg: &'static str, io_error: std::io::Error) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(msg),
				kind: None,
				io_error: Some(io_error),
			}),
		}
	}

	/// If this error was caused by an IO error, return it
	pub fn io_error(&self) -> Option<&std::io::Error> {
		self.inner.io_error.as_ref()
	}

	/// The cross-cutting [`ErrorKind`] this failure corresponds to, if any.
	pub fn kind(&self) -> Option<ErrorKind> {
		self.inner.kind
	}
}

impl serde::de::Error for DeError {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
				kind: None,
				io_error: None,
			}),
		}
	}
}

/// Implemented so that the decimal logical type can reuse `rust_decimal`'s
/// `Serialize` impl to drive zero-alloc deserialization through the same
/// buffer.
impl serde::ser::Error for DeError {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		<Self as serde::de::Error>::custom(msg)
	}
}
