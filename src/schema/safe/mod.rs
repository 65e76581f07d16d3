//! The editable, arena-based representation of an Avro schema
//! ([`SchemaMut`]), used for parsing, programmatic construction and
//! [`freeze`](SchemaMut::freeze)-ing into an immutable [`Schema`](super::Schema).

mod canonical_form;
mod check_for_cycles;
mod parsing;
mod rabin;
mod serialize;

use super::{error::SchemaError, Fixed, Name};

pub use check_for_cycles::UnconditionalCycle;

/// An editable representation of an Avro schema.
///
/// References to other nodes are represented as [`SchemaKey`], which index
/// into [`SchemaMut`]. This indirection (rather than a tree of owned nodes)
/// is what lets named types reference themselves or each other cyclically,
/// as [Avro's naming rules](https://avro.apache.org/docs/current/specification/#names)
/// allow.
#[derive(Clone, Debug)]
pub struct SchemaMut {
	/// First node in the array is considered to be the root.
	nodes: Vec<SchemaNode>,
}

impl SchemaMut {
	/// Obtain the underlying arena. The first node (index `0`) is the root.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// Obtain the underlying arena mutably. The first node (index `0`) is
	/// the root.
	pub fn nodes_mut(&mut self) -> &mut Vec<SchemaNode> {
		&mut self.nodes
	}

	/// Obtain the root of the schema (the first node of the arena).
	///
	/// # Panics
	/// If the arena is empty. This can only happen if all nodes were
	/// removed through [`nodes_mut`](Self::nodes_mut), as parsing otherwise
	/// guarantees the arena is non-empty.
	pub fn root(&self) -> &SchemaNode {
		self.nodes
			.first()
			.expect("schema has no nodes - were they all removed through nodes_mut?")
	}

	/// Initialize a [`SchemaMut`] from a set of nodes. The first node
	/// (index `0`) is the root.
	pub fn from_nodes(nodes: Vec<SchemaNode>) -> Self {
		Self { nodes }
	}

	/// Validate this schema and turn it into an immutable [`Schema`](super::Schema).
	///
	/// This fails if a [`SchemaKey`] points outside the arena, if a
	/// `record`/`enum`/`fixed` is cyclic through no array/map/union
	/// indirection (which would make every instance infinitely large), or
	/// if a union violates the no-duplicate/no-nesting rule.
	pub fn freeze(self) -> Result<super::Schema, SchemaError> {
		self.validate()?;
		let json = self.to_json_string();
		Ok(super::Schema::from_nodes_and_json(self.nodes, json))
	}

	fn validate(&self) -> Result<(), SchemaError> {
		for node in &self.nodes {
			node.type_.validate_keys_in_bounds(self.nodes.len())?;
		}
		check_for_cycles::check_for_cycles(self)?;
		Ok(())
	}

	/// Try to get the node at the given [`SchemaKey`] (or `None` if the key
	/// is out of bounds). Use `schema_mut[key]` to panic on invalid keys
	/// instead.
	pub fn get(&self, key: SchemaKey) -> Option<&SchemaNode> {
		self.nodes.get(key.idx)
	}
}

/// The location of a node in a [`SchemaMut`] (an index into its arena).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaKey {
	idx: usize,
}

impl SchemaKey {
	/// Construct a `SchemaKey` from a raw arena index.
	pub const fn from_idx(idx: usize) -> Self {
		Self { idx }
	}
	/// The raw arena index this key points to.
	pub const fn idx(self) -> usize {
		self.idx
	}
	/// The root of the schema: equivalent to `SchemaKey::from_idx(0)`.
	pub const fn root() -> Self {
		Self { idx: 0 }
	}
}
impl std::ops::Index<SchemaKey> for SchemaMut {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &Self::Output {
		&self.nodes[key.idx]
	}
}
impl std::fmt::Debug for SchemaKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.idx, f)
	}
}

/// A node of an Avro schema, stored in a [`SchemaMut`]/[`Schema`](super::Schema).
#[derive(Clone, Debug)]
pub struct SchemaNode {
	/// The underlying regular (non-logical) type of this node.
	pub type_: RegularType,
	/// The logical type this node is annotated with, if any.
	pub logical_type: Option<LogicalType>,
}

impl SchemaNode {
	/// Build a [`SchemaNode`] from a regular type, with no logical type.
	pub fn new(type_: RegularType) -> Self {
		type_.into()
	}

	/// Build a [`SchemaNode`] from a regular type and a logical type.
	pub fn with_logical_type(type_: RegularType, logical_type: LogicalType) -> Self {
		Self {
			type_,
			logical_type: Some(logical_type),
		}
	}
}

/// A primitive or complex type of an Avro schema.
#[derive(Clone, Debug)]
pub enum RegularType {
	/// `null`
	Null,
	/// `boolean`
	Boolean,
	/// `int`
	Int,
	/// `long`
	Long,
	/// `float`
	Float,
	/// `double`
	Double,
	/// `bytes`
	Bytes,
	/// `string`
	String,
	/// `array`
	Array(Array),
	/// `map` (keys are always strings)
	Map(Map),
	/// `union`
	Union(Union),
	/// `record`
	Record(Record),
	/// `enum`
	Enum(Enum),
	/// `fixed`
	Fixed(Fixed),
}

impl RegularType {
	/// The name of this type, if it is a named type (`record`/`enum`/`fixed`).
	pub fn name(&self) -> Option<&Name> {
		match self {
			RegularType::Record(record) => Some(&record.name),
			RegularType::Enum(enum_) => Some(&enum_.name),
			RegularType::Fixed(fixed) => Some(&fixed.name),
			_ => None,
		}
	}

	/// The name of this type, mutably, if it is a named type.
	pub fn name_mut(&mut self) -> Option<&mut Name> {
		match self {
			RegularType::Record(record) => Some(&mut record.name),
			RegularType::Enum(enum_) => Some(&mut enum_.name),
			RegularType::Fixed(fixed) => Some(&mut fixed.name),
			_ => None,
		}
	}

	fn validate_keys_in_bounds(&self, n_nodes: usize) -> Result<(), SchemaError> {
		let check = |key: SchemaKey| -> Result<(), SchemaError> {
			if key.idx >= n_nodes {
				Err(SchemaError::new("SchemaKey refers to a non-existing node"))
			} else {
				Ok(())
			}
		};
		match self {
			RegularType::Array(a) => check(a.items),
			RegularType::Map(m) => check(m.values),
			RegularType::Union(u) => u.variants.iter().copied().try_for_each(check),
			RegularType::Record(r) => r.fields.iter().map(|f| f.type_).try_for_each(check),
			RegularType::Null
			| RegularType::Boolean
			| RegularType::Int
			| RegularType::Long
			| RegularType::Float
			| RegularType::Double
			| RegularType::Bytes
			| RegularType::String
			| RegularType::Enum(_)
			| RegularType::Fixed(_) => Ok(()),
		}
	}
}

/// Component of a [`SchemaMut`]: an `array<items>`.
#[derive(Clone, Debug)]
pub struct Array {
	/// The key of the schema of each item in the array.
	pub items: SchemaKey,
}
impl Array {
	/// `items` is the key of the schema of each item in the array.
	pub fn new(items: SchemaKey) -> Self {
		Self { items }
	}
}

/// Component of a [`SchemaMut`]: a `map<values>` (keys are always strings).
#[derive(Clone, Debug)]
pub struct Map {
	/// The key of the schema of each value in the map.
	pub values: SchemaKey,
}
impl Map {
	/// `values` is the key of the schema of each value in the map.
	pub fn new(values: SchemaKey) -> Self {
		Self { values }
	}
}

/// Component of a [`SchemaMut`]: a `union` of its variants.
#[derive(Clone, Debug)]
pub struct Union {
	/// The keys of the schemas of each variant of this union.
	pub variants: Vec<SchemaKey>,
}
impl Union {
	/// `variants` is the keys of the schemas of each variant of this union.
	pub fn new(variants: Vec<SchemaKey>) -> Self {
		Self { variants }
	}
}

/// Component of a [`SchemaMut`]: a `record` (~ a struct).
#[derive(Clone, Debug)]
pub struct Record {
	/// The list of fields, in declaration order.
	pub fields: Vec<RecordField>,
	/// The fully-qualified name of the record.
	pub name: Name,
	/// Documentation string, if any.
	pub doc: Option<String>,
	/// Alternate fully-qualified names this record may also be known as.
	pub aliases: Vec<String>,
}
impl Record {
	/// `name` is the fully-qualified name; `fields` is the declaration-order
	/// field list.
	pub fn new(name: Name, fields: Vec<RecordField>) -> Self {
		Self {
			fields,
			name,
			doc: None,
			aliases: Vec::new(),
		}
	}
}

/// Component of a [`SchemaMut`]: one field of a [`Record`].
#[derive(Clone, Debug)]
pub struct RecordField {
	/// Name of the field.
	pub name: String,
	/// The key of the schema of this field's type.
	pub type_: SchemaKey,
	/// Documentation string, if any.
	pub doc: Option<String>,
	/// The field's default value (opaque JSON), consulted by the codec only
	/// when the write-side value is missing this field.
	pub default: Option<serde_json::Value>,
	/// The field's ordinal position within the record (0-based). Equal to
	/// its index in [`Record::fields`]; stored redundantly so callers that
	/// only hold a `&RecordField` can still recover it.
	pub position: usize,
}
impl RecordField {
	/// `schema` is the key of the schema of this field's type.
	pub fn new(name: impl Into<String>, schema: SchemaKey, position: usize) -> Self {
		Self {
			name: name.into(),
			type_: schema,
			doc: None,
			default: None,
			position,
		}
	}
}

/// Component of a [`SchemaMut`]: an `enum`.
#[derive(Clone, Debug)]
pub struct Enum {
	/// All the symbols of the enum, in declaration order (their ordinal is
	/// their position).
	pub symbols: Vec<String>,
	/// The fully-qualified name of the enum.
	pub name: Name,
	/// The default symbol used when a reader does not recognize a decoded
	/// ordinal's symbol (schema-resolution concern; stored but not acted
	/// upon by this crate's codec, which never performs resolution).
	pub default: Option<String>,
}
impl Enum {
	/// `name` is the fully-qualified name; `symbols` is the declaration-order
	/// symbol list.
	pub fn new(name: Name, symbols: Vec<String>) -> Self {
		Self {
			symbols,
			name,
			default: None,
		}
	}
}

/// A logical type annotation on top of a base [`RegularType`].
///
/// <https://avro.apache.org/docs/current/specification/#logical-types>
#[derive(Clone, Debug)]
pub enum LogicalType {
	/// `decimal`, annotating `bytes` or `fixed`.
	Decimal(Decimal),
	/// `uuid`, annotating `string`.
	Uuid,
	/// `date`, annotating `int` (days since the Unix epoch).
	Date,
	/// `time-millis`, annotating `int`.
	TimeMillis,
	/// `time-micros`, annotating `long`.
	TimeMicros,
	/// `timestamp-millis`, annotating `long`.
	TimestampMillis,
	/// `timestamp-micros`, annotating `long`.
	TimestampMicros,
	/// `local-timestamp-millis`, annotating `long`.
	LocalTimestampMillis,
	/// `local-timestamp-micros`, annotating `long`.
	LocalTimestampMicros,
	/// `duration`, annotating `fixed(12)`.
	Duration,
	/// A logical type name not recognized by this crate. Per the Avro
	/// specification, unknown logical types degrade silently to their base
	/// type for encoding purposes; this variant only preserves the name for
	/// round-tripping the schema's JSON text.
	Unknown(UnknownLogicalType),
}

/// Component of a [`SchemaMut`]: the `decimal` logical type's parameters.
#[derive(Clone, Debug)]
pub struct Decimal {
	/// Number of digits to the right of the decimal point.
	pub scale: u32,
	/// Number of significant digits.
	pub precision: usize,
}
impl Decimal {
	/// `scale` is the number of digits right of the decimal point;
	/// `precision` is the number of significant digits.
	pub fn new(scale: u32, precision: usize) -> Self {
		Self { precision, scale }
	}
}

/// A logical type name not known to this crate.
#[derive(Clone, Debug)]
pub struct UnknownLogicalType {
	/// The name as it appears in the schema JSON's `logicalType` property.
	pub logical_type_name: String,
}
impl UnknownLogicalType {
	/// `logical_type_name` is the name as it appears in the schema JSON.
	pub fn new(logical_type_name: impl Into<String>) -> Self {
		Self {
			logical_type_name: logical_type_name.into(),
		}
	}
	/// The name as it appears in the schema JSON.
	pub fn as_str(&self) -> &str {
		&self.logical_type_name
	}
}

impl LogicalType {
	/// The name used in schema JSON to refer to this logical type.
	pub fn as_str(&self) -> &str {
		match self {
			LogicalType::Decimal(_) => "decimal",
			LogicalType::Uuid => "uuid",
			LogicalType::Date => "date",
			LogicalType::TimeMillis => "time-millis",
			LogicalType::TimeMicros => "time-micros",
			LogicalType::TimestampMillis => "timestamp-millis",
			LogicalType::TimestampMicros => "timestamp-micros",
			LogicalType::LocalTimestampMillis => "local-timestamp-millis",
			LogicalType::LocalTimestampMicros => "local-timestamp-micros",
			LogicalType::Duration => "duration",
			LogicalType::Unknown(u) => &u.logical_type_name,
		}
	}
}

impl From<RegularType> for SchemaNode {
	fn from(regular_type: RegularType) -> Self {
		Self {
			type_: regular_type,
			logical_type: None,
		}
	}
}

macro_rules! impl_froms_for_regular_type {
	($($variant: ident)*) => {
		$(
			impl From<$variant> for RegularType {
				fn from(variant: $variant) -> Self {
					Self::$variant(variant)
				}
			}
			impl From<$variant> for SchemaNode {
				fn from(variant: $variant) -> Self {
					Self {
						type_: RegularType::$variant(variant),
						logical_type: None,
					}
				}
			}
		)*
	};
}
impl_froms_for_regular_type! { Array Map Union Record Enum Fixed }
