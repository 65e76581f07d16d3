//! The schema model: parsing, named-type resolution, and the immutable
//! [`Schema`] used to drive the codec.

mod error;
pub mod safe;

pub mod derive;

pub use {
	error::SchemaError,
	safe::{
		Array, Decimal, Enum, LogicalType, Map, Record, RecordField, RegularType, SchemaKey,
		SchemaMut, SchemaNode, Union, UnknownLogicalType,
	},
};

/// An immutable, validated Avro schema.
///
/// This is the frozen counterpart of [`SchemaMut`]: once built (by
/// [`SchemaMut::freeze`], by [`parse`](std::str::FromStr::from_str), or by
/// [`derive::BuildSchema::schema`]), it can no longer be mutated, which is
/// what lets the codec and the [`object_container_file_encoding`
/// module](crate::object_container_file_encoding) share it cheaply behind an
/// `Arc` without synchronization.
///
/// Internally this is a single arena (`Vec<SchemaNode>`, addressed by
/// [`SchemaKey`]) rather than a tree: Avro named types can reference
/// themselves or one another cyclically (e.g. a record referring to itself
/// through a union), and an arena with stable indices is the natural way to
/// represent that without reference counting or unsafe self-referential
/// pointers. See `DESIGN.md` for why this crate does not additionally adopt
/// the zero-copy self-referential node layout some Avro implementations use
/// for the hot path.
#[derive(Clone, Debug)]
pub struct Schema {
	nodes: Vec<SchemaNode>,
	json: String,
}

impl Schema {
	/// The root node's key (always index `0`).
	pub fn root(&self) -> SchemaKey {
		SchemaKey::root()
	}

	/// Look up a node by key.
	///
	/// # Panics
	/// If `key` does not belong to this schema.
	pub fn node(&self, key: SchemaKey) -> &SchemaNode {
		&self.nodes[key.idx()]
	}

	/// All nodes in the underlying arena.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// The canonicalized JSON text for this schema (re-serialized, not
	/// necessarily byte-identical to whatever text it was parsed from).
	pub fn json(&self) -> &str {
		&self.json
	}

	pub(crate) fn from_nodes_and_json(nodes: Vec<SchemaNode>, json: String) -> Self {
		Self { nodes, json }
	}
}

impl std::ops::Index<SchemaKey> for Schema {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &SchemaNode {
		self.node(key)
	}
}

impl std::str::FromStr for Schema {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let schema_mut: SchemaMut = s.parse()?;
		schema_mut.freeze()
	}
}

impl TryFrom<SchemaMut> for Schema {
	type Error = SchemaError;
	fn try_from(schema_mut: SchemaMut) -> Result<Self, SchemaError> {
		schema_mut.freeze()
	}
}

/// Schema component for named nodes (`Record`, `Enum`, `Fixed`).
#[derive(Clone, Debug)]
pub struct Fixed {
	/// The size in bytes of the *fixed* type.
	pub size: usize,
	/// The name of the *fixed* type, including the namespace.
	pub name: Name,
}
impl Fixed {
	/// `name` is the name of the *fixed* type, including the namespace;
	/// `size` is the size in bytes of the fixed type.
	pub fn new(name: Name, size: usize) -> Self {
		Self { size, name }
	}
}

/// A fully-qualified Avro name (`namespace` + `name`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}

impl std::fmt::Debug for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.fully_qualified_name, f)
	}
}

impl Name {
	/// The rightmost component of the fully qualified name (e.g. `c` in
	/// `a.b.c`).
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(idx) => &self.fully_qualified_name[idx + 1..],
		}
	}

	/// The namespace component of the fully qualified name (e.g. `a.b` in
	/// `a.b.c`).
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx.map(|idx| &self.fully_qualified_name[..idx])
	}

	/// The fully qualified name (e.g. `a.b.c`).
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}

	/// Build a [`Name`] from a fully qualified name.
	///
	/// If the only `.` in the fully qualified name is at the beginning of
	/// the string, it is stripped: we parse `.x` as `{namespace: None, name:
	/// "x"}`, for consistency with the JSON parser's resolution rule.
	pub fn from_fully_qualified_name(fully_qualified_name: impl Into<String>) -> Self {
		let mut fully_qualified_name = fully_qualified_name.into();
		let namespace_delimiter_idx = match fully_qualified_name.rfind('.') {
			Some(0) => {
				fully_qualified_name.remove(0);
				None
			}
			other => other,
		};
		Name {
			namespace_delimiter_idx,
			fully_qualified_name,
		}
	}

	/// Resolve `name` against `enclosing_namespace`, per the Avro name
	/// resolution rule (§4.2): a name containing a dot is already fully
	/// qualified; otherwise the enclosing namespace (if non-empty) is
	/// prepended.
	pub fn fully_qualify(name: &str, enclosing_namespace: Option<&str>) -> Name {
		if name.contains('.') {
			Name::from_fully_qualified_name(name)
		} else {
			match enclosing_namespace {
				Some(ns) if !ns.is_empty() => Name::from_fully_qualified_name(format!("{ns}.{name}")),
				_ => Name::from_fully_qualified_name(name),
			}
		}
	}
}
