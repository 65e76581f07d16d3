use std::borrow::Cow;

use crate::error_kind::ErrorKind;

/// Any error that may happen while parsing, resolving or freezing a schema.
#[derive(thiserror::Error)]
#[error("{}", inner.message)]
pub struct SchemaError {
	inner: Box<ErrorInner>,
}

struct ErrorInner {
	message: Cow<'static, str>,
	kind: Option<ErrorKind>,
}

impl std::fmt::Debug for SchemaError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&*self.inner.message, f)
	}
}

impl SchemaError {
	pub(crate) fn new(message: &'static str) -> Self {
		Self::with_kind(message, None)
	}

	pub(crate) fn msg(message: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				message: Cow::Owned(message.to_string()),
				kind: None,
			}),
		}
	}

	pub(crate) fn classified(kind: ErrorKind, message: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				message: Cow::Owned(format!("{message}")),
				kind: Some(kind),
			}),
		}
	}

	fn with_kind(message: &'static str, kind: Option<ErrorKind>) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				message: Cow::Borrowed(message),
				kind,
			}),
		}
	}

	/// The cross-cutting [`ErrorKind`] this failure corresponds to, if any.
	pub fn kind(&self) -> Option<ErrorKind> {
		self.inner.kind
	}
}

impl From<std::fmt::Error> for SchemaError {
	fn from(err: std::fmt::Error) -> Self {
		Self::msg(err)
	}
}

impl serde::de::Error for SchemaError {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self::msg(msg)
	}
}
