//! Building a [`Schema`] straight from a Rust type, without going through
//! JSON text.
//!
//! This crate does not ship a `#[derive(BuildSchema)]` proc macro; implement
//! [`BuildSchemaInner`] by hand for custom types (the primitive and
//! container impls below show the pattern), or construct a [`SchemaMut`]
//! directly and [`freeze`](SchemaMut::freeze) it.

use std::{any::TypeId, collections::HashMap as StdHashMap};

use crate::schema::{Array, Fixed, Map, Name, RegularType, Schema, SchemaKey, SchemaMut, SchemaNode, Union};

/// A Rust type that knows how to build its own Avro schema.
pub trait BuildSchema {
	/// Build and validate the schema for `Self`.
	fn schema() -> Schema {
		Self::schema_mut()
			.freeze()
			.expect("a type-derived schema should always be internally valid")
	}
	/// Build the (unvalidated) schema for `Self`.
	fn schema_mut() -> SchemaMut;
}

impl<T: BuildSchemaInner> BuildSchema for T {
	fn schema_mut() -> SchemaMut {
		let mut builder = SchemaBuilder::default();
		assert_eq!(T::build(&mut builder).idx(), 0);
		SchemaMut::from_nodes(builder.nodes)
	}
}

/// Arena under construction, plus memoization so recursive/shared types
/// (e.g. `Box<Node>` inside `Node`, or the same `Vec<u8>` appearing twice)
/// only get a single schema node each.
#[derive(Default)]
pub struct SchemaBuilder {
	nodes: Vec<SchemaNode>,
	already_built: StdHashMap<TypeId, SchemaKey>,
}

impl SchemaBuilder {
	/// Reserve a slot ahead of knowing its contents, so self-referential
	/// types can resolve to their own key while still being built.
	pub fn reserve(&mut self) -> SchemaKey {
		let idx = self.nodes.len();
		self.nodes.push(SchemaNode::new(RegularType::Null));
		SchemaKey::from_idx(idx)
	}

	/// Overwrite a previously [`reserve`](Self::reserve)d slot.
	pub fn fill(&mut self, key: SchemaKey, node: impl Into<SchemaNode>) {
		self.nodes[key.idx()] = node.into();
	}
}

/// Implementation detail of [`BuildSchema`]: every type that can appear
/// nested inside another (so needs memoization by [`TypeLookup`](Self::TypeLookup),
/// not just at the top level) implements this instead.
pub trait BuildSchemaInner {
	/// Push (or reuse) this type's node(s) into `builder`, returning its key.
	fn build(builder: &mut SchemaBuilder) -> SchemaKey;
	/// The type used to deduplicate schema nodes for structurally identical
	/// Rust types (e.g. `&str` and `String` should share a node).
	type TypeLookup: std::any::Any;
}

/// Look up (building if necessary) the schema node for `T`, deduplicating
/// by [`BuildSchemaInner::TypeLookup`].
pub fn node_idx<T: BuildSchemaInner>(builder: &mut SchemaBuilder) -> SchemaKey {
	match builder.already_built.entry(TypeId::of::<T::TypeLookup>()) {
		std::collections::hash_map::Entry::Occupied(entry) => *entry.get(),
		std::collections::hash_map::Entry::Vacant(entry) => {
			let expected_idx = SchemaKey::from_idx(builder.nodes.len());
			entry.insert(expected_idx);
			let idx = T::build(builder);
			assert_eq!(idx.idx(), expected_idx.idx());
			idx
		}
	}
}

macro_rules! impl_primitive {
	($($ty:ty, $variant:ident;)+) => {
		$(
			impl BuildSchemaInner for $ty {
				fn build(builder: &mut SchemaBuilder) -> SchemaKey {
					let key = SchemaKey::from_idx(builder.nodes.len());
					builder.nodes.push(SchemaNode::new(RegularType::$variant));
					key
				}
				type TypeLookup = Self;
			}
		)*
	};
}
impl_primitive!(
	(), Null;
	bool, Boolean;
	i32, Int;
	i64, Long;
	f32, Float;
	f64, Double;
	String, String;
	Vec<u8>, Bytes;
);

macro_rules! delegate_impl {
	($($ty:ty, $to:ty;)+) => {
		$(
			impl BuildSchemaInner for $ty {
				fn build(builder: &mut SchemaBuilder) -> SchemaKey {
					<$to as BuildSchemaInner>::build(builder)
				}
				type TypeLookup = <$to as BuildSchemaInner>::TypeLookup;
			}
		)*
	};
}
delegate_impl! {
	&'_ str, String;
	&'_ [u8], Vec<u8>;
}

impl<T: BuildSchemaInner> BuildSchemaInner for Vec<T> {
	fn build(builder: &mut SchemaBuilder) -> SchemaKey {
		let key = builder.reserve();
		let items = node_idx::<T>(builder);
		builder.fill(key, Array::new(items));
		key
	}
	type TypeLookup = Vec<T::TypeLookup>;
}

impl<T: BuildSchemaInner> BuildSchemaInner for &'_ [T] {
	fn build(builder: &mut SchemaBuilder) -> SchemaKey {
		<Vec<T> as BuildSchemaInner>::build(builder)
	}
	type TypeLookup = <Vec<T> as BuildSchemaInner>::TypeLookup;
}

impl<T: BuildSchemaInner> BuildSchemaInner for Option<T> {
	fn build(builder: &mut SchemaBuilder) -> SchemaKey {
		let key = builder.reserve();
		let variants = vec![node_idx::<()>(builder), node_idx::<T>(builder)];
		builder.fill(key, Union::new(variants));
		key
	}
	type TypeLookup = Option<T::TypeLookup>;
}

impl<const N: usize> BuildSchemaInner for [u8; N] {
	fn build(builder: &mut SchemaBuilder) -> SchemaKey {
		let key = SchemaKey::from_idx(builder.nodes.len());
		builder.nodes.push(SchemaNode::new(RegularType::Fixed(Fixed::new(
			Name::from_fully_qualified_name(format!("u8_array_{N}")),
			N,
		))));
		key
	}
	type TypeLookup = Self;
}

impl<V: BuildSchemaInner> BuildSchemaInner for StdHashMap<String, V> {
	fn build(builder: &mut SchemaBuilder) -> SchemaKey {
		let key = builder.reserve();
		let values = node_idx::<V>(builder);
		builder.fill(key, Map::new(values));
		key
	}
	type TypeLookup = StdHashMap<String, V::TypeLookup>;
}

impl<V: BuildSchemaInner> BuildSchemaInner for std::collections::BTreeMap<String, V> {
	fn build(builder: &mut SchemaBuilder) -> SchemaKey {
		<StdHashMap<String, V> as BuildSchemaInner>::build(builder)
	}
	type TypeLookup = <StdHashMap<String, V> as BuildSchemaInner>::TypeLookup;
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::RegularType;

	#[test]
	fn option_of_primitive_is_nullable_union() {
		let schema = Option::<i64>::schema();
		match &schema.node(schema.root()).type_ {
			RegularType::Union(u) => assert_eq!(u.variants.len(), 2),
			_ => panic!("expected union"),
		}
	}

	#[test]
	fn vec_of_string_is_array_of_string() {
		let schema = Vec::<String>::schema();
		match &schema.node(schema.root()).type_ {
			RegularType::Array(a) => {
				assert!(matches!(schema.node(a.items).type_, RegularType::String));
			}
			_ => panic!("expected array"),
		}
	}
}
