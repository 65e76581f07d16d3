//! Defines everything necessary for Avro serialization.
//!
//! # For advanced usage
//!
//! You typically want to use top-level functions such as
//! [`to_datum`](crate::to_datum), but access to this may be necessary for
//! more advanced usage.
//!
//! This gives manual access to the type that implements
//! [`serde::Serializer`].
//!
//! Such usage would go as follows:
//! ```
//! use std::sync::Arc;
//!
//! let schema: Arc<avrobin::Schema> = Arc::new(
//! 	r#"
//! {
//! 	"namespace": "test",
//! 	"type": "record",
//! 	"name": "Test",
//! 	"fields": [
//! 		{ "type": "string", "name": "field" }
//! 	]
//! }
//! "#
//! 	.parse()
//! 	.expect("Failed to parse schema"),
//! );
//!
//! #[derive(serde_derive::Serialize, Debug, PartialEq)]
//! struct Test<'a> {
//! 	field: &'a str,
//! }
//!
//! let serializer_config = &mut avrobin::ser::SerializerConfig::new(schema);
//! let mut serializer_state =
//! 	avrobin::ser::SerializerState::from_writer(Vec::new(), serializer_config);
//!
//! serde::Serialize::serialize(&Test { field: "foo" }, serializer_state.serializer())
//! 	.expect("Failed to serialize");
//! let serialized = serializer_state.into_writer();
//!
//! assert_eq!(serialized, &[6, 102, 111, 111]);
//! ```

mod error;
mod serializer;

pub use {error::SerError, serializer::*};

use std::{io::Write, sync::Arc};

use integer_encoding::VarIntWriter;
use serde::ser::*;

use crate::schema::{Schema, SchemaKey};

/// All configuration and state necessary for the serialization to run.
///
/// Notably holds the writer and a `&mut` [`SerializerConfig`].
///
/// Does not implement [`serde::Serializer`] directly (use
/// [`.serializer`](Self::serializer) to obtain that).
pub struct SerializerState<'c, W> {
	writer: W,
	config: &'c mut SerializerConfig,
}

/// Schema + serialization buffers.
///
/// Holds an [`Arc<Schema>`] (rather than borrowing one) so it never needs to
/// be threaded with a lifetime parameter: it can be built once, stored
/// anywhere, and reused across many serializations.
///
/// ```
/// # use std::sync::Arc;
/// # use avrobin::{ser, Schema};
/// let schema: Arc<Schema> = Arc::new(r#""int""#.parse().unwrap());
/// let serializer_config = &mut ser::SerializerConfig::new(schema);
///
/// let mut serialized: Vec<u8> = avrobin::to_datum_vec(&3, serializer_config).unwrap();
/// assert_eq!(serialized, &[6]);
///
/// // reuse config & output buffer across serializations for ideal performance
/// serialized.clear();
/// let serialized = avrobin::to_datum(&4, serialized, serializer_config).unwrap();
/// assert_eq!(serialized, &[8]);
/// ```
pub struct SerializerConfig {
	buffers: Buffers,
	allow_slow_sequence_to_bytes: bool,
	/// `None` only when the object container file writer builds a
	/// `SerializerState` to encode its header against the fixed metadata
	/// schema (see [`schema`](Self::schema)) and overrides the root through
	/// [`serializer_overriding_schema_root`](SerializerState::serializer_overriding_schema_root).
	schema: Option<Arc<Schema>>,
}

impl SerializerConfig {
	/// Build a new `SerializerConfig` with a given `schema`, default options
	/// and empty serialization buffers.
	///
	/// Reusing the same `SerializerConfig` across serializations is ideal for
	/// performance, as it allows the buffers to be reused to avoid
	/// allocations.
	pub fn new(schema: Arc<Schema>) -> Self {
		Self::new_with_optional_schema(Some(schema))
	}

	pub(crate) fn new_with_optional_schema(schema: Option<Arc<Schema>>) -> Self {
		Self {
			schema,
			allow_slow_sequence_to_bytes: false,
			buffers: Buffers::default(),
		}
	}

	/// For when you can't use `serde_bytes` and really need to serialize a
	/// sequence as bytes.
	///
	/// If you need to serialize a `Vec<u8>` or `&[u8]` as `Bytes`/`Fixed`,
	/// [`serde_bytes`](https://docs.rs/serde_bytes/latest/serde_bytes/) is the way to go.
	/// If however you can't use it because e.g. you are transcoding, you
	/// may enable this instead.
	///
	/// It will be slow, because the bytes will be processed one by one.
	pub fn allow_slow_sequence_to_bytes(&mut self) -> &mut Self {
		self.allow_slow_sequence_to_bytes = true;
		self
	}

	/// Get the schema that was used when creating this `SerializerConfig`, or
	/// the fixed header metadata schema if none was set (see
	/// [`new_with_optional_schema`](Self::new_with_optional_schema)).
	pub fn schema(&self) -> &Schema {
		self.schema
			.as_deref()
			.unwrap_or_else(|| crate::object_container_file_encoding::metadata_schema())
	}
}

impl<'c, W: std::io::Write> SerializerState<'c, W> {
	/// Build a `SerializerState` from a writer and a `SerializerConfig`.
	///
	/// Note that the resulting `SerializerState` does not implement
	/// [`serde::Serializer`] directly. Instead, use
	/// [`SerializerState::serializer`] to obtain a `DatumSerializer` that
	/// does.
	pub fn from_writer(writer: W, serializer_config: &'c mut SerializerConfig) -> Self {
		Self {
			writer,
			config: serializer_config,
		}
	}

	/// Obtain the actual [`serde::Serializer`] for this `SerializerState`.
	pub fn serializer<'r>(&'r mut self) -> DatumSerializer<'r, 'c, W> {
		let root = self.config.schema().root();
		DatumSerializer {
			schema_key: root,
			state: self,
		}
	}

	pub(crate) fn serializer_overriding_schema_root<'r>(
		&'r mut self,
		schema_root: SchemaKey,
	) -> DatumSerializer<'r, 'c, W> {
		DatumSerializer {
			schema_key: schema_root,
			state: self,
		}
	}
}

impl<W: std::io::Write> SerializerState<'_, W> {
	pub(crate) fn write_length_delimited(&mut self, buf: &[u8]) -> Result<(), SerError> {
		let len: i64 = buf
			.len()
			.try_into()
			.map_err(|_| SerError::new("Buffer len does not fit i64 for encoding as length-delimited field size"))?;
		self.writer.write_varint(len).map_err(SerError::io)?;
		self.writer.write_all(buf).map_err(SerError::io)
	}
}

impl<W> SerializerState<'_, W> {
	/// Get writer back.
	pub fn into_writer(self) -> W {
		self.writer
	}

	/// Get writer by reference.
	///
	/// This may be useful to observe the state of the inner buffer, notably
	/// when re-using a `SerializerState` to write multiple objects.
	pub fn writer(&self) -> &W {
		&self.writer
	}

	/// Get writer by mutable reference.
	///
	/// This may be useful to clear the inner buffer, when re-using a
	/// `SerializerState`.
	pub fn writer_mut(&mut self) -> &mut W {
		&mut self.writer
	}
}

/// Buffers used during serialization, for reuse across serializations.
///
/// Avro records are written in schema field order, which may differ from the
/// struct's field order; when it does, we must buffer a field's bytes until
/// it is its turn to be written. Keeping the `Vec`s here (instead of
/// allocating fresh ones per record) means a `SerializerConfig` reused
/// across many records only pays for the allocation once.
#[derive(Default)]
struct Buffers {
	field_reordering_buffers: Vec<Vec<u8>>,
	field_reordering_super_buffers: Vec<Vec<Option<Vec<u8>>>>,
}
