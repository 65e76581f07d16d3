//! Matching a Rust value being serialized against one branch of an Avro
//! `union` schema.
//!
//! Adapted from the teacher's `per_type_lookup` cache, but computed on
//! demand instead of memoized on the schema node: [`Schema`] is shared
//! behind an `Arc` across many serializations, so there's no natural place
//! left to cache a per-union lookup table without making the schema
//! interior-mutable. Unions are small in practice, so a linear scan per
//! call is cheap enough.

use crate::schema::{LogicalType, RegularType, Schema, SchemaKey, Union};

/// Indexes for union variants that can be obtained directly from the
/// serialized Rust type, without an explicit name to disambiguate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum UnionVariantLookupKey {
	Null,
	UnitStruct,
	Boolean,
	Integer,
	Integer4,
	Integer8,
	Float4,
	Float8,
	Str,
	SliceU8,
	UnitVariant,
	StructOrMap,
	SeqOrTupleOrTupleStruct,
}

/// What a given schema node would register for, and at what priority
/// (lower is more specific/preferred). Mirrors the registration table the
/// teacher's serializer dispatch relies on.
fn registrations(node: &crate::schema::SchemaNode) -> &'static [(UnionVariantLookupKey, usize)] {
	use UnionVariantLookupKey::*;
	if let Some(logical_type) = &node.logical_type {
		return match logical_type {
			LogicalType::Decimal(_) => &[(Integer, 5), (Integer4, 5), (Integer8, 5), (Float8, 2), (Str, 20)],
			LogicalType::Uuid => &[(Str, 0)],
			LogicalType::Date | LogicalType::TimeMillis => &[(Integer, 0), (Integer4, 0), (Integer8, 1)],
			LogicalType::TimeMicros
			| LogicalType::TimestampMillis
			| LogicalType::TimestampMicros
			| LogicalType::LocalTimestampMillis
			| LogicalType::LocalTimestampMicros => &[(Integer, 0), (Integer4, 1), (Integer8, 0)],
			LogicalType::Duration => &[(StructOrMap, 5), (SeqOrTupleOrTupleStruct, 5), (SliceU8, 5)],
			LogicalType::Unknown(_) => registrations_for_base(&node.type_),
		};
	}
	registrations_for_base(&node.type_)
}

fn registrations_for_base(type_: &RegularType) -> &'static [(UnionVariantLookupKey, usize)] {
	use UnionVariantLookupKey::*;
	match type_ {
		RegularType::Null => &[(Null, 0), (UnitStruct, 0), (UnitVariant, 2)],
		RegularType::Boolean => &[(Boolean, 0)],
		RegularType::Int => &[(Integer, 0), (Integer4, 0), (Integer8, 1)],
		RegularType::Long => &[(Integer, 0), (Integer4, 1), (Integer8, 0)],
		RegularType::Float => &[(Float4, 0), (Float8, 1)],
		RegularType::Double => &[(Float8, 0), (Float4, 1)],
		RegularType::Bytes => &[(Str, 10), (UnitStruct, 10), (SliceU8, 0), (SeqOrTupleOrTupleStruct, 2), (UnitVariant, 10)],
		RegularType::String => &[(Str, 0), (UnitStruct, 0), (SliceU8, 1), (UnitVariant, 1)],
		RegularType::Array(_) => &[(SeqOrTupleOrTupleStruct, 0)],
		RegularType::Map(_) => &[(StructOrMap, 0)],
		RegularType::Union(_) => &[],
		RegularType::Enum(_) => &[(Integer, 10), (Integer4, 10), (Integer8, 10), (UnitStruct, 0), (Str, 5), (UnitVariant, 0)],
		RegularType::Record(_) => &[(StructOrMap, 0)],
		RegularType::Fixed(_) => &[(Str, 15), (SliceU8, 0), (SeqOrTupleOrTupleStruct, 2)],
	}
}

enum State {
	None,
	Some { priority: usize, discriminant: i64, key: SchemaKey },
	Conflict { priority: usize },
}

/// Find the union variant that best matches `target`, by Rust-type shape
/// alone (no name available). Returns `None` if no variant registers for
/// it, or if two variants tie at the same priority.
pub(super) fn find_unnamed(schema: &Schema, union: &Union, target: UnionVariantLookupKey) -> Option<(i64, SchemaKey)> {
	let mut state = State::None;
	for (i, &variant_key) in union.variants.iter().enumerate() {
		for &(key, priority) in registrations(&schema[variant_key]) {
			if key != target {
				continue;
			}
			state = match state {
				State::None => State::Some {
					priority,
					discriminant: i as i64,
					key: variant_key,
				},
				State::Some { priority: old, .. } if priority < old => State::Some {
					priority,
					discriminant: i as i64,
					key: variant_key,
				},
				State::Some { priority: old, .. } if priority == old => State::Conflict { priority: old },
				s @ State::Some { .. } => s,
				State::Conflict { priority: old } if priority < old => State::Some {
					priority,
					discriminant: i as i64,
					key: variant_key,
				},
				s @ State::Conflict { .. } => s,
			};
		}
	}
	match state {
		State::Some { discriminant, key, .. } => Some((discriminant, key)),
		_ => None,
	}
}

/// Find the union variant named `name`, either by a named type's short or
/// fully-qualified name, or by the canonical name of a primitive/container
/// type (so `enum Foo { Int(i64), String(String) }` picks deterministically).
pub(super) fn find_named(schema: &Schema, union: &Union, name: &str) -> Option<(i64, SchemaKey)> {
	for (i, &variant_key) in union.variants.iter().enumerate() {
		let node = &schema[variant_key];
		if let Some(type_name) = node.type_.name() {
			if type_name.name() == name || type_name.fully_qualified_name() == name {
				return Some((i as i64, variant_key));
			}
		}
		if node.logical_type.is_none() {
			let canonical = match &node.type_ {
				RegularType::Null => "Null",
				RegularType::Boolean => "Boolean",
				RegularType::Int => "Int",
				RegularType::Long => "Long",
				RegularType::Float => "Float",
				RegularType::Double => "Double",
				RegularType::Bytes => "Bytes",
				RegularType::String => "String",
				RegularType::Array(_) => "Array",
				RegularType::Map(_) => "Map",
				_ => continue,
			};
			if canonical == name {
				return Some((i as i64, variant_key));
			}
		}
	}
	None
}
