//! Re-serializing a [`SchemaMut`] arena back into Avro schema JSON text.
//!
//! Used both to cache [`Schema::json`](crate::schema::Schema::json) when a
//! schema was built programmatically (rather than parsed, in which case we
//! already have text) and to implement `schema_to_json` for callers that
//! construct a schema via [`derive::BuildSchema`](crate::schema::derive::BuildSchema).

use serde_json::{Map, Value};

use super::{LogicalType, RegularType, SchemaKey, SchemaMut};

impl SchemaMut {
	pub(super) fn to_json_string(&self) -> String {
		let mut written = vec![false; self.nodes().len()];
		let value = node_to_json(self, SchemaKey::root(), &mut written);
		serde_json::to_string(&value).expect("schema JSON values are always serializable")
	}
}

fn node_to_json(schema: &SchemaMut, key: SchemaKey, written: &mut [bool]) -> Value {
	let node = &schema[key];
	let mut value = regular_type_to_json(schema, key, written);
	if let Some(logical_type) = &node.logical_type {
		if let Value::Object(ref mut map) = value {
			map.insert("logicalType".into(), Value::String(logical_type.as_str().into()));
			if let LogicalType::Decimal(decimal) = logical_type {
				map.insert("precision".into(), (decimal.precision as u64).into());
				map.insert("scale".into(), decimal.scale.into());
			}
		}
	}
	value
}

fn regular_type_to_json(schema: &SchemaMut, key: SchemaKey, written: &mut [bool]) -> Value {
	match &schema[key].type_ {
		RegularType::Null => Value::String("null".into()),
		RegularType::Boolean => Value::String("boolean".into()),
		RegularType::Int => Value::String("int".into()),
		RegularType::Long => Value::String("long".into()),
		RegularType::Float => Value::String("float".into()),
		RegularType::Double => Value::String("double".into()),
		RegularType::Bytes => Value::String("bytes".into()),
		RegularType::String => Value::String("string".into()),
		RegularType::Array(array) => {
			let mut map = Map::new();
			map.insert("type".into(), "array".into());
			map.insert("items".into(), node_to_json(schema, array.items, written));
			Value::Object(map)
		}
		RegularType::Map(m) => {
			let mut map = Map::new();
			map.insert("type".into(), "map".into());
			map.insert("values".into(), node_to_json(schema, m.values, written));
			Value::Object(map)
		}
		RegularType::Union(union) => Value::Array(
			union
				.variants
				.iter()
				.map(|&v| node_to_json(schema, v, written))
				.collect(),
		),
		RegularType::Enum(e) => {
			if std::mem::replace(&mut written[key.idx()], true) {
				return Value::String(e.name.fully_qualified_name().into());
			}
			let mut map = Map::new();
			map.insert("type".into(), "enum".into());
			map.insert("name".into(), e.name.fully_qualified_name().into());
			map.insert(
				"symbols".into(),
				Value::Array(e.symbols.iter().cloned().map(Value::String).collect()),
			);
			if let Some(default) = &e.default {
				map.insert("default".into(), default.clone().into());
			}
			Value::Object(map)
		}
		RegularType::Fixed(f) => {
			if std::mem::replace(&mut written[key.idx()], true) {
				return Value::String(f.name.fully_qualified_name().into());
			}
			let mut map = Map::new();
			map.insert("type".into(), "fixed".into());
			map.insert("name".into(), f.name.fully_qualified_name().into());
			map.insert("size".into(), (f.size as u64).into());
			Value::Object(map)
		}
		RegularType::Record(r) => {
			if std::mem::replace(&mut written[key.idx()], true) {
				return Value::String(r.name.fully_qualified_name().into());
			}
			let mut map = Map::new();
			map.insert("type".into(), "record".into());
			map.insert("name".into(), r.name.fully_qualified_name().into());
			if let Some(doc) = &r.doc {
				map.insert("doc".into(), doc.clone().into());
			}
			if !r.aliases.is_empty() {
				map.insert(
					"aliases".into(),
					Value::Array(r.aliases.iter().cloned().map(Value::String).collect()),
				);
			}
			map.insert(
				"fields".into(),
				Value::Array(
					r.fields
						.iter()
						.map(|field| {
							let mut field_map = Map::new();
							field_map.insert("name".into(), field.name.clone().into());
							field_map.insert("type".into(), node_to_json(schema, field.type_, written));
							if let Some(doc) = &field.doc {
								field_map.insert("doc".into(), doc.clone().into());
							}
							if let Some(default) = &field.default {
								field_map.insert("default".into(), default.clone());
							}
							Value::Object(field_map)
						})
						.collect(),
				),
			);
			Value::Object(map)
		}
	}
}
