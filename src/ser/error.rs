use std::borrow::Cow;

use serde::ser::Error as _;

use crate::error_kind::ErrorKind;

/// Any error that may happen while serializing a value against a schema.
#[derive(thiserror::Error)]
#[error("{}", inner.value)]
pub struct SerError {
	inner: Box<ErrorInner>,
}

impl std::fmt::Debug for SerError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&*self.inner.value, f)
	}
}

struct ErrorInner {
	value: Cow<'static, str>,
	kind: Option<ErrorKind>,
}

impl SerError {
	/// If you need a dynamic string use `SerError::custom(format_args!(...))`
	pub(crate) fn new(s: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(s),
				kind: None,
			}),
		}
	}

	pub(crate) fn with_kind(kind: ErrorKind, msg: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
				kind: Some(kind),
			}),
		}
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		Self::custom(format_args!(
			"encountered IO error when attempting to write for serialization: {io_error}"
		))
	}

	pub(crate) fn no_union_branch() -> Self {
		Self::with_kind(
			ErrorKind::NoUnionBranch,
			"value does not match any branch of the union schema",
		)
	}

	pub(crate) fn decimal_out_of_precision(precision: usize) -> Self {
		Self::with_kind(
			ErrorKind::DecimalOutOfPrecision,
			format_args!("decimal value does not fit in {precision} digits of precision"),
		)
	}

	/// The cross-cutting [`ErrorKind`] this failure corresponds to, if any.
	pub fn kind(&self) -> Option<ErrorKind> {
		self.inner.kind
	}
}

impl serde::ser::Error for SerError {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
				kind: None,
			}),
		}
	}
}
