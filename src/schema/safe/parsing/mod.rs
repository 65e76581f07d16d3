//! JSON schema parsing: walks a [`serde_json::Value`] tree, resolving named
//! references against the names introduced earlier (left-to-right) in the
//! same document, and lifting `logicalType` annotations onto their base type.
//!
//! This walks `serde_json::Value` directly rather than hooking a custom
//! [`serde::Deserialize`] visitor onto the arena the way some Avro crates do:
//! simpler to get right without a compiler, and `serde_json::Value` is
//! already a dependency of this crate.

use std::collections::HashSet;

use hashbrown::HashMap;
use serde_json::Value;

use super::{
	Array, Decimal, Enum, Fixed, LogicalType, Map, Record, RecordField, RegularType, SchemaKey,
	SchemaMut, SchemaNode, Union, UnknownLogicalType,
};
use crate::{error_kind::ErrorKind, schema::Name, schema::SchemaError};

impl std::str::FromStr for SchemaMut {
	type Err = SchemaError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value: Value =
			serde_json::from_str(s).map_err(|e| SchemaError::msg(format_args!("invalid schema JSON: {e}")))?;
		let mut state = ParseState {
			nodes: Vec::new(),
			names: HashMap::new(),
		};
		state.parse_value(&value, None)?;
		Ok(SchemaMut::from_nodes(state.nodes))
	}
}

struct ParseState {
	nodes: Vec<SchemaNode>,
	names: HashMap<String, SchemaKey>,
}

fn malformed(msg: impl std::fmt::Display) -> SchemaError {
	SchemaError::msg(format_args!("malformed schema: {msg}"))
}

fn primitive_from_str(s: &str) -> Option<RegularType> {
	Some(match s {
		"null" => RegularType::Null,
		"boolean" => RegularType::Boolean,
		"int" => RegularType::Int,
		"long" => RegularType::Long,
		"float" => RegularType::Float,
		"double" => RegularType::Double,
		"bytes" => RegularType::Bytes,
		"string" => RegularType::String,
		_ => return None,
	})
}

fn logical_type_from_map(map: &serde_json::Map<String, Value>) -> Option<LogicalType> {
	let name = map.get("logicalType")?.as_str()?;
	Some(match name {
		"decimal" => {
			let precision = map.get("precision").and_then(Value::as_u64).unwrap_or(0) as usize;
			let scale = map.get("scale").and_then(Value::as_u64).unwrap_or(0) as u32;
			LogicalType::Decimal(Decimal::new(scale, precision))
		}
		"uuid" => LogicalType::Uuid,
		"date" => LogicalType::Date,
		"time-millis" => LogicalType::TimeMillis,
		"time-micros" => LogicalType::TimeMicros,
		"timestamp-millis" => LogicalType::TimestampMillis,
		"timestamp-micros" => LogicalType::TimestampMicros,
		"local-timestamp-millis" => LogicalType::LocalTimestampMillis,
		"local-timestamp-micros" => LogicalType::LocalTimestampMicros,
		"duration" => LogicalType::Duration,
		other => {
			log::debug!("unrecognized logicalType {other:?}, degrading to base type");
			LogicalType::Unknown(UnknownLogicalType::new(other))
		}
	})
}

/// Two schemas may appear in the same union as long as they're not both the
/// same primitive, both arrays, both maps, or the same named type; two
/// unnamed named-type *kinds* are fine as long as their names differ.
fn union_discriminant(node: &SchemaNode) -> Result<String, SchemaError> {
	Ok(match &node.type_ {
		RegularType::Union(_) => {
			return Err(SchemaError::classified(
				ErrorKind::InvalidUnion,
				"unions may not immediately contain other unions",
			))
		}
		RegularType::Record(r) => format!("record:{}", r.name.fully_qualified_name()),
		RegularType::Enum(e) => format!("enum:{}", e.name.fully_qualified_name()),
		RegularType::Fixed(f) => format!("fixed:{}", f.name.fully_qualified_name()),
		RegularType::Null => "null".into(),
		RegularType::Boolean => "boolean".into(),
		RegularType::Int => "int".into(),
		RegularType::Long => "long".into(),
		RegularType::Float => "float".into(),
		RegularType::Double => "double".into(),
		RegularType::Bytes => "bytes".into(),
		RegularType::String => "string".into(),
		RegularType::Array(_) => "array".into(),
		RegularType::Map(_) => "map".into(),
	})
}

impl ParseState {
	/// Reserves an arena slot before its contents are known, so a
	/// self-referencing named type can resolve to its own key while its
	/// fields are still being parsed, and so the very first node parsed
	/// always lands at index `0` (the root), regardless of how much
	/// recursion its children require.
	fn reserve(&mut self) -> SchemaKey {
		let idx = self.nodes.len();
		self.nodes.push(SchemaNode {
			type_: RegularType::Null,
			logical_type: None,
		});
		SchemaKey::from_idx(idx)
	}

	fn register_name(&mut self, name: &Name, key: SchemaKey) -> Result<(), SchemaError> {
		match self.names.entry(name.fully_qualified_name().to_string()) {
			hashbrown::hash_map::Entry::Occupied(_) => Err(malformed(format_args!(
				"duplicate name `{}`",
				name.fully_qualified_name()
			))),
			hashbrown::hash_map::Entry::Vacant(v) => {
				v.insert(key);
				Ok(())
			}
		}
	}

	fn parse_value(&mut self, value: &Value, ns: Option<&str>) -> Result<SchemaKey, SchemaError> {
		match value {
			Value::String(s) => self.parse_string(s, ns),
			Value::Array(items) => self.parse_union(items, ns),
			Value::Object(map) => {
				let key = self.reserve();
				self.fill_object(key, map, ns)?;
				Ok(key)
			}
			_ => Err(malformed("expected a string, array or object for a schema")),
		}
	}

	/// A bare string is either a primitive type name or a reference to a
	/// named type introduced earlier in the document; unlike every other
	/// case, a pure reference must *not* reserve a new slot; it resolves to
	/// the key the name was already registered under.
	fn parse_string(&mut self, s: &str, ns: Option<&str>) -> Result<SchemaKey, SchemaError> {
		if let Some(regular_type) = primitive_from_str(s) {
			let key = self.reserve();
			self.nodes[key.idx()] = regular_type.into();
			return Ok(key);
		}
		let fq = Name::fully_qualify(s, ns);
		self.names.get(fq.fully_qualified_name()).copied().ok_or_else(|| {
			SchemaError::classified(
				ErrorKind::UnknownType,
				format_args!("unknown type reference `{}`", fq.fully_qualified_name()),
			)
		})
	}

	fn parse_union(&mut self, items: &[Value], ns: Option<&str>) -> Result<SchemaKey, SchemaError> {
		let key = self.reserve();
		let variant_keys = items
			.iter()
			.map(|item| self.parse_value(item, ns))
			.collect::<Result<Vec<_>, _>>()?;
		let mut seen = HashSet::new();
		for &variant_key in &variant_keys {
			let discriminant = union_discriminant(&self.nodes[variant_key.idx()])?;
			if !seen.insert(discriminant) {
				return Err(SchemaError::classified(
					ErrorKind::InvalidUnion,
					"union contains more than one schema of the same type",
				));
			}
		}
		self.nodes[key.idx()] = Union::new(variant_keys).into();
		Ok(key)
	}

	fn fill_object(
		&mut self,
		key: SchemaKey,
		map: &serde_json::Map<String, Value>,
		ns: Option<&str>,
	) -> Result<(), SchemaError> {
		let type_value = map
			.get("type")
			.ok_or_else(|| malformed("object schema is missing a `type` key"))?;
		match type_value {
			Value::String(name) => match name.as_str() {
				"record" => self.fill_record(key, map, ns)?,
				"enum" => self.fill_enum(key, map, ns)?,
				"fixed" => self.fill_fixed(key, map, ns)?,
				"array" => {
					let items = map
						.get("items")
						.ok_or_else(|| malformed("array schema is missing `items`"))?;
					let items_key = self.parse_value(items, ns)?;
					self.nodes[key.idx()] = Array::new(items_key).into();
				}
				"map" => {
					let values = map
						.get("values")
						.ok_or_else(|| malformed("map schema is missing `values`"))?;
					let values_key = self.parse_value(values, ns)?;
					self.nodes[key.idx()] = Map::new(values_key).into();
				}
				other => {
					if let Some(regular_type) = primitive_from_str(other) {
						self.nodes[key.idx()] = regular_type.into();
					} else {
						// An "unnecessarily nested" type object, e.g. `{"type": "ns.Foo"}`:
						// equivalent to the bare reference, typically with a
						// `logicalType` (or other) key layered on top.
						let target_key = self.parse_string(other, ns)?;
						self.nodes[key.idx()] = self.nodes[target_key.idx()].clone();
					}
				}
			},
			Value::Object(_) | Value::Array(_) => {
				let inner_key = self.parse_value(type_value, ns)?;
				self.nodes[key.idx()] = self.nodes[inner_key.idx()].clone();
			}
			_ => return Err(malformed("`type` must be a string, object or array")),
		}
		if let Some(logical_type) = logical_type_from_map(map) {
			if let LogicalType::Decimal(Decimal { precision, scale }) = &logical_type {
				if *precision < 1 || usize::try_from(*scale).unwrap_or(usize::MAX) > *precision {
					return Err(malformed(
						"decimal logical type requires precision >= 1 and 0 <= scale <= precision",
					));
				}
			}
			self.nodes[key.idx()].logical_type = Some(logical_type);
		}
		Ok(())
	}

	fn fill_record(
		&mut self,
		key: SchemaKey,
		map: &serde_json::Map<String, Value>,
		ns: Option<&str>,
	) -> Result<(), SchemaError> {
		let raw_name = map
			.get("name")
			.and_then(Value::as_str)
			.ok_or_else(|| malformed("record is missing `name`"))?;
		let explicit_ns = map.get("namespace").and_then(Value::as_str);
		let name = Name::fully_qualify(raw_name, explicit_ns.or(ns));
		self.register_name(&name, key)?;
		let children_ns = name.namespace().map(str::to_owned);

		let doc = map.get("doc").and_then(Value::as_str).map(String::from);
		let aliases = map
			.get("aliases")
			.and_then(Value::as_array)
			.map(|a| a.iter().filter_map(Value::as_str).map(String::from).collect())
			.unwrap_or_default();

		let fields_json = map
			.get("fields")
			.and_then(Value::as_array)
			.ok_or_else(|| malformed("record is missing `fields`"))?;
		let mut fields = Vec::with_capacity(fields_json.len());
		let mut seen_names = HashSet::new();
		for (position, field_value) in fields_json.iter().enumerate() {
			let field_map = field_value
				.as_object()
				.ok_or_else(|| malformed("record field must be an object"))?;
			let field_name = field_map
				.get("name")
				.and_then(Value::as_str)
				.ok_or_else(|| malformed("record field is missing `name`"))?
				.to_string();
			if !seen_names.insert(field_name.clone()) {
				return Err(malformed(format_args!("duplicate field name `{field_name}`")));
			}
			let field_type = field_map
				.get("type")
				.ok_or_else(|| malformed("record field is missing `type`"))?;
			let field_key = self.parse_value(field_type, children_ns.as_deref())?;
			let mut field = RecordField::new(field_name, field_key, position);
			field.doc = field_map.get("doc").and_then(Value::as_str).map(String::from);
			field.default = field_map.get("default").cloned();
			fields.push(field);
		}
		self.nodes[key.idx()] = Record {
			fields,
			name,
			doc,
			aliases,
		}
		.into();
		Ok(())
	}

	fn fill_enum(
		&mut self,
		key: SchemaKey,
		map: &serde_json::Map<String, Value>,
		ns: Option<&str>,
	) -> Result<(), SchemaError> {
		let raw_name = map
			.get("name")
			.and_then(Value::as_str)
			.ok_or_else(|| malformed("enum is missing `name`"))?;
		let explicit_ns = map.get("namespace").and_then(Value::as_str);
		let name = Name::fully_qualify(raw_name, explicit_ns.or(ns));
		self.register_name(&name, key)?;

		let symbols_json = map
			.get("symbols")
			.and_then(Value::as_array)
			.ok_or_else(|| malformed("enum is missing `symbols`"))?;
		let mut symbols = Vec::with_capacity(symbols_json.len());
		let mut seen = HashSet::new();
		for symbol in symbols_json {
			let symbol = symbol
				.as_str()
				.ok_or_else(|| malformed("enum symbol must be a string"))?
				.to_string();
			if !seen.insert(symbol.clone()) {
				return Err(malformed(format_args!("duplicate enum symbol `{symbol}`")));
			}
			symbols.push(symbol);
		}
		let mut enum_ = Enum::new(name, symbols);
		enum_.default = map.get("default").and_then(Value::as_str).map(String::from);
		self.nodes[key.idx()] = enum_.into();
		Ok(())
	}

	fn fill_fixed(
		&mut self,
		key: SchemaKey,
		map: &serde_json::Map<String, Value>,
		ns: Option<&str>,
	) -> Result<(), SchemaError> {
		let raw_name = map
			.get("name")
			.and_then(Value::as_str)
			.ok_or_else(|| malformed("fixed is missing `name`"))?;
		let explicit_ns = map.get("namespace").and_then(Value::as_str);
		let name = Name::fully_qualify(raw_name, explicit_ns.or(ns));
		self.register_name(&name, key)?;
		let size = map
			.get("size")
			.and_then(Value::as_u64)
			.ok_or_else(|| malformed("fixed is missing `size`"))? as usize;
		self.nodes[key.idx()] = Fixed::new(name, size).into();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> SchemaMut {
		s.parse().unwrap()
	}

	#[test]
	fn primitive() {
		let schema = parse("\"long\"");
		assert!(matches!(schema.root().type_, RegularType::Long));
	}

	#[test]
	fn record_with_self_reference_through_union() {
		let schema = parse(
			r#"{
				"type": "record",
				"name": "LinkedNode",
				"fields": [
					{"name": "value", "type": "long"},
					{"name": "next", "type": ["null", "LinkedNode"]}
				]
			}"#,
		);
		match &schema.root().type_ {
			RegularType::Record(r) => {
				assert_eq!(r.fields.len(), 2);
				let next_type = &schema[r.fields[1].type_].type_;
				match next_type {
					RegularType::Union(u) => assert_eq!(u.variants.len(), 2),
					_ => panic!("expected union"),
				}
			}
			_ => panic!("expected record"),
		}
	}

	#[test]
	fn unknown_reference_fails() {
		let err: SchemaError = "\"com.example.DoesNotExist\"".parse::<SchemaMut>().unwrap_err();
		assert_eq!(err.kind(), Some(ErrorKind::UnknownType));
	}

	#[test]
	fn duplicate_union_branch_rejected() {
		let err = r#"["string", "string"]"#.parse::<SchemaMut>().unwrap_err();
		assert_eq!(err.kind(), Some(ErrorKind::InvalidUnion));
	}

	#[test]
	fn decimal_logical_type_over_bytes() {
		let schema = parse(r#"{"type": "bytes", "logicalType": "decimal", "precision": 9, "scale": 2}"#);
		match &schema.root().logical_type {
			Some(LogicalType::Decimal(d)) => {
				assert_eq!(d.precision, 9);
				assert_eq!(d.scale, 2);
			}
			_ => panic!("expected decimal logical type"),
		}
	}

	#[test]
	fn unrecognized_logical_type_is_preserved_but_degrades() {
		let schema = parse(r#"{"type": "string", "logicalType": "made-up-type"}"#);
		match &schema.root().logical_type {
			Some(LogicalType::Unknown(u)) => assert_eq!(u.as_str(), "made-up-type"),
			_ => panic!("expected unknown logical type"),
		}
		assert!(matches!(schema.root().type_, RegularType::String));
	}

	#[test]
	fn namespace_inheritance() {
		let schema = parse(
			r#"{
				"type": "record",
				"name": "Outer",
				"namespace": "com.example",
				"fields": [
					{"name": "inner", "type": {
						"type": "record",
						"name": "Inner",
						"fields": [{"name": "x", "type": "int"}]
					}}
				]
			}"#,
		);
		match &schema.root().type_ {
			RegularType::Record(r) => {
				let inner = &schema[r.fields[0].type_].type_;
				match inner {
					RegularType::Record(inner_record) => {
						assert_eq!(inner_record.name.fully_qualified_name(), "com.example.Inner");
					}
					_ => panic!("expected record"),
				}
			}
			_ => panic!("expected record"),
		}
	}

	#[test]
	fn decimal_precision_scale_validated() {
		let err = r#"{"type": "bytes", "logicalType": "decimal", "precision": 0, "scale": 0}"#
			.parse::<SchemaMut>()
			.unwrap_err();
		assert!(err.kind().is_none());
	}
}
