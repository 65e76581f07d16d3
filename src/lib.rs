//! # Getting started
//!
//! ```
//! let schema: std::sync::Arc<avrobin::Schema> = std::sync::Arc::new(
//! 	r#"
//! {
//! 	"namespace": "test",
//! 	"type": "record",
//! 	"name": "Test",
//! 	"fields": [
//! 		{
//! 			"type": {
//! 				"type": "string"
//! 			},
//! 			"name": "field"
//! 		}
//! 	]
//! }
//! "#
//! 	.parse()
//! 	.expect("Failed to parse schema"),
//! );
//!
//! #[derive(serde_derive::Serialize, serde_derive::Deserialize, Debug, PartialEq)]
//! struct Test<'a> {
//! 	field: &'a str,
//! }
//!
//! let rust_value = Test { field: "foo" };
//! let avro_datum = &[6, 102, 111, 111];
//!
//! // Avro datum deserialization
//! assert_eq!(
//! 	avrobin::from_datum_slice::<Test>(avro_datum, &schema)
//! 		.expect("Failed to deserialize"),
//! 	rust_value
//! );
//!
//! // Avro datum serialization
//! assert_eq!(
//! 	avrobin::to_datum(
//! 		&rust_value,
//! 		Vec::new(),
//! 		&mut avrobin::ser::SerializerConfig::new(schema.clone())
//! 	)
//! 	.expect("Failed to serialize"),
//! 	avro_datum
//! );
//! ```
//!
//! # Object container file encoding
//!
//! Avro "object container files" hold a header with the embedded schema,
//! followed by an arbitrary number of compressed blocks of rows.
//!
//! See the [`object_container_file_encoding`] module for the reader/writer
//! pair.
//!
//! # Deriving a schema from a Rust type
//!
//! When the Rust type is the source of truth for the wire shape, build the
//! schema straight from it rather than hand-writing JSON:
//!
//! ```
//! use avrobin::schema::derive::BuildSchema;
//!
//! struct Bar {
//! 	a: i32,
//! 	b: String,
//! }
//!
//! impl avrobin::schema::derive::BuildSchemaInner for Bar {
//! 	fn build(
//! 		builder: &mut avrobin::schema::derive::SchemaBuilder,
//! 	) -> avrobin::schema::SchemaKey {
//! 		use avrobin::schema::{Name, Record, RecordField, SchemaNode};
//! 		let key = builder.reserve();
//! 		let a = avrobin::schema::derive::node_idx::<i32>(builder);
//! 		let b = avrobin::schema::derive::node_idx::<String>(builder);
//! 		builder.fill(
//! 			key,
//! 			SchemaNode::new(
//! 				Record {
//! 					name: Name::from_fully_qualified_name("Bar".to_owned()),
//! 					doc: None,
//! 					aliases: Vec::new(),
//! 					fields: vec![
//! 						RecordField::new("a", a, 0),
//! 						RecordField::new("b", b, 1),
//! 					],
//! 				}
//! 				.into(),
//! 			),
//! 		);
//! 		key
//! 	}
//! 	type TypeLookup = Self;
//! }
//!
//! let schema = Bar::schema();
//! assert_eq!(
//! 	schema.node(schema.root()).type_.name().unwrap().fully_qualified_name(),
//! 	"Bar"
//! );
//! ```
//!
//! There is no `#[derive(BuildSchema)]` proc macro in this crate; for
//! everyday structs, derive the schema at runtime instead with
//! [`schema::derive`] trait impls on the field types (primitives,
//! `Vec<T>`, `Option<T>`, fixed-size byte arrays and hash maps are
//! covered out of the box), or hand-assemble a [`schema::SchemaMut`] and
//! [`freeze`](schema::SchemaMut::freeze) it.
//!
//! # Generating source from a schema
//!
//! The inverse direction — schema to source text — lives in [`codegen`],
//! a pure function over the schema model with no dependency on the codec
//! or OCF machinery.
//!
//! # Design
//!
//! The bulk of the (de)serialization cost in a naive Avro implementation
//! comes from re-walking the schema with `HashMap` lookups and heap
//! allocations for every single field of every single record. This crate
//! instead compiles the schema into a `serde::Serializer`/`Deserializer`
//! pair that dispatches on the schema tree directly, so the common path
//! (reading a record field, picking a union branch) is a handful of
//! pointer-chasing comparisons rather than a map lookup.

// Get docs.rs to display all compression methods and corresponding feature flags.
// That is used jointly with `package.metadata.docs.rs` in the `Cargo.toml`
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod codegen;
pub mod de;
pub mod error_kind;
pub mod schema;
pub mod ser;

pub use schema::Schema;

pub mod object_container_file_encoding;

/// Deserialize from an avro "datum" (raw data, no headers...) slice
///
/// This is zero-alloc.
///
/// Your structure may contain `&'a str`s that will end up pointing directly
/// into this slice for ideal performance.
pub fn from_datum_slice<'a, T>(slice: &'a [u8], schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::Deserialize<'a>,
{
	serde::Deserialize::deserialize(de::DeserializerState::from_slice(slice, schema).deserializer())
}

/// Deserialize from an avro "datum" (raw data, no headers...) `impl BufRead`
///
/// If you only have an `impl Read`, wrap it in a
/// [`BufReader`](std::io::BufReader) first.
///
/// If deserializing from a slice, a `Vec`, ... prefer using `from_datum_slice`,
/// as it will be more performant and enable you to borrow `&str`s from the
/// original slice.
pub fn from_datum_reader<R, T>(reader: R, schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::de::DeserializeOwned,
	R: std::io::BufRead,
{
	serde::Deserialize::deserialize(
		de::DeserializerState::from_reader(reader, schema).deserializer(),
	)
}

/// Serialize an avro "datum" (raw data, no headers...)
///
/// to the provided writer
///
/// [`SerializerConfig`](ser::SerializerConfig) can be built from a schema:
/// ```
/// # use std::sync::Arc;
/// # use avrobin::{ser, Schema};
/// let schema: Arc<Schema> = Arc::new(r#""int""#.parse().unwrap());
/// let serializer_config = &mut ser::SerializerConfig::new(schema);
///
/// let mut serialized: Vec<u8> = avrobin::to_datum_vec(&3, serializer_config).unwrap();
/// assert_eq!(serialized, &[6]);
///
/// // reuse config and output buffer across serializations for ideal performance
/// serialized.clear();
/// let serialized = avrobin::to_datum(&4, serialized, serializer_config).unwrap();
/// assert_eq!(serialized, &[8]);
/// ```
pub fn to_datum<T, W>(
	value: &T,
	writer: W,
	serializer_config: &mut ser::SerializerConfig,
) -> Result<W, ser::SerError>
where
	T: serde::Serialize + ?Sized,
	W: std::io::Write,
{
	let mut serializer_state = ser::SerializerState::from_writer(writer, serializer_config);
	serde::Serialize::serialize(value, serializer_state.serializer())?;
	Ok(serializer_state.into_writer())
}

/// Serialize an avro "datum" (raw data, no headers...)
///
/// to a newly allocated Vec
///
/// Note that unless you would otherwise allocate a new `Vec` anyway, it will be
/// more efficient to use [`to_datum`] instead.
///
/// See [`to_datum`] for more details.
pub fn to_datum_vec<T>(
	value: &T,
	serializer_config: &mut ser::SerializerConfig,
) -> Result<Vec<u8>, ser::SerError>
where
	T: serde::Serialize + ?Sized,
{
	to_datum(value, Vec::new(), serializer_config)
}
