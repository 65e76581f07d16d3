//! Cross-cutting error classification shared by the schema, codec and object
//! container file errors.
//!
//! Every fallible operation in this crate fails with a message (for humans)
//! plus, where the failure corresponds to one of the kinds below, a
//! [`ErrorKind`] that callers can match on without parsing the message.

/// A coarse classification of why an operation failed.
///
/// Not every error carries a kind: some failures (e.g. a malformed UTF-8
/// string coming from [`std::str::from_utf8`]) are reported with enough
/// detail in the message that a dedicated kind would be redundant, but most
/// are tagged so that fuzzing and property tests can assert "decode either
/// succeeds or fails with a defined kind".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
	/// Input ended before a value or block was fully read.
	Truncated,
	/// A VarZigZag integer used more than 10 continuation bytes.
	Overflow,
	/// An object container file did not start with `Obj\x01`.
	BadMagic,
	/// A block's trailing 16 bytes did not match the file's sync marker.
	CorruptSync,
	/// The `avro.codec` metadata named a codec this build does not support.
	UnknownCodec,
	/// A JSON schema referenced a name that was never defined.
	UnknownType,
	/// A union violated the no-duplicates / no-nesting rule.
	InvalidUnion,
	/// No union branch matched the value being serialized.
	NoUnionBranch,
	/// The value being serialized did not match the shape the schema expects.
	SchemaMismatch,
	/// A decoded enum ordinal was not a valid index into its symbol table.
	EnumOutOfRange,
	/// A `string` payload was not valid UTF-8.
	InvalidUtf8,
	/// A decimal value could not be represented within its schema's
	/// declared precision/scale.
	DecimalOutOfPrecision,
}

impl std::fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ErrorKind::Truncated => "truncated",
			ErrorKind::Overflow => "overflow",
			ErrorKind::BadMagic => "bad magic",
			ErrorKind::CorruptSync => "corrupt sync marker",
			ErrorKind::UnknownCodec => "unknown codec",
			ErrorKind::UnknownType => "unknown type",
			ErrorKind::InvalidUnion => "invalid union",
			ErrorKind::NoUnionBranch => "no matching union branch",
			ErrorKind::SchemaMismatch => "schema mismatch",
			ErrorKind::EnumOutOfRange => "enum ordinal out of range",
			ErrorKind::InvalidUtf8 => "invalid utf-8",
			ErrorKind::DecimalOutOfPrecision => "decimal out of precision",
		};
		f.write_str(s)
	}
}
