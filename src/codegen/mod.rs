//! Rust source pretty-printer over the schema model.
//!
//! [`emit_source`] walks a [`Schema`](crate::Schema) and produces Rust struct
//! and enum definitions that round-trip through `serde` against the same
//! schema. This module has no dependency on [`crate::de`], [`crate::ser`], or
//! [`crate::object_container_file_encoding`]; it is a pure function of the
//! schema model, matching the "CLI surface" contract: only the function
//! signature is normative, the actual pretty-printer is a trivial walk.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::schema::{LogicalType, RegularType, Schema, SchemaKey};

/// Rust reserved words. An emitted identifier that collides with one of
/// these gets a trailing underscore, per the sanitization rule.
const RESERVED_WORDS: &[&str] = &[
	"as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
	"false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
	"ref", "return", "Self", "self", "static", "struct", "super", "trait", "true", "try", "type",
	"unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
	"override", "priv", "typeof", "unsized", "virtual", "yield", "union",
];

/// Turn an arbitrary Avro name component into a valid Rust identifier:
/// non-identifier characters become `_`, a leading digit gets an `_` prefix,
/// and a reserved word gets a trailing `_`.
///
/// Returns the sanitized identifier; the caller is responsible for emitting
/// a `#[serde(rename = "...")]` when it differs from the original.
fn sanitize_ident(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	for (i, c) in raw.chars().enumerate() {
		let keep = if i == 0 {
			c.is_ascii_alphabetic() || c == '_'
		} else {
			c.is_ascii_alphanumeric() || c == '_'
		};
		out.push(if keep { c } else { '_' });
	}
	if out.is_empty() {
		out.push('_');
	} else if out.as_bytes()[0].is_ascii_digit() {
		out.insert(0, '_');
	}
	if RESERVED_WORDS.contains(&out.as_str()) {
		out.push('_');
	}
	out
}

/// The short (namespace-stripped), Rust-sanitized name of a record/enum/fixed
/// schema node, in `PascalCase` as already written in the schema (this does
/// not re-case the name, only sanitizes it).
fn type_name(name: &crate::schema::Name) -> String {
	sanitize_ident(name.name())
}

fn rename_attr(sanitized: &str, original: &str) -> Option<String> {
	(sanitized != original).then(|| format!("#[serde(rename = {original:?})]\n"))
}

fn doc_comment(doc: &Option<String>, indent: &str) -> String {
	match doc {
		None => String::new(),
		Some(doc) => doc
			.lines()
			.map(|line| format!("{indent}/// {line}\n"))
			.collect(),
	}
}

/// Find every `record`/`enum`/`fixed` node reachable from the root, in an
/// order where each type appears after every other named type its fields (or
/// element/value types) depend on -- so that reading top to bottom is
/// "definitions before uses", matching [`check_for_cycles`](crate::schema)'s
/// traversal but collecting an order instead of rejecting cycles (a record
/// that reaches itself only through a `union`/`array`/`map` is not an error
/// here: Rust struct/enum definitions don't need forward declarations, so
/// the cycle just emits in discovery order).
fn named_types_in_dependency_order(schema: &Schema) -> Vec<SchemaKey> {
	let mut visited = vec![false; schema.nodes().len()];
	let mut order = Vec::new();

	fn visit(schema: &Schema, key: SchemaKey, visited: &mut [bool], order: &mut Vec<SchemaKey>) {
		if visited[key.idx()] {
			return;
		}
		visited[key.idx()] = true;
		match &schema.node(key).type_ {
			RegularType::Array(array) => visit(schema, array.items, visited, order),
			RegularType::Map(map) => visit(schema, map.values, visited, order),
			RegularType::Union(union) => {
				for &variant in &union.variants {
					visit(schema, variant, visited, order);
				}
			}
			RegularType::Record(record) => {
				for field in &record.fields {
					visit(schema, field.type_, visited, order);
				}
				order.push(key);
			}
			RegularType::Enum(_) | RegularType::Fixed(_) => order.push(key),
			RegularType::Null
			| RegularType::Boolean
			| RegularType::Int
			| RegularType::Long
			| RegularType::Float
			| RegularType::Double
			| RegularType::Bytes
			| RegularType::String => {}
		}
	}

	for idx in 0..schema.nodes().len() {
		visit(schema, SchemaKey::from_idx(idx), &mut visited, &mut order);
	}
	order
}

/// Render the Rust type that corresponds to `key` when used inline (as a
/// field type, array element, map value, ...). Named types render as their
/// short sanitized name (the definition is emitted separately, in dependency
/// order); everything else renders inline.
fn inline_type(schema: &Schema, key: SchemaKey) -> String {
	let node = schema.node(key);
	if let Some(logical_type) = &node.logical_type {
		return logical_type_rust(logical_type, &node.type_);
	}
	match &node.type_ {
		RegularType::Null => "()".to_owned(),
		RegularType::Boolean => "bool".to_owned(),
		RegularType::Int => "i32".to_owned(),
		RegularType::Long => "i64".to_owned(),
		RegularType::Float => "f32".to_owned(),
		RegularType::Double => "f64".to_owned(),
		RegularType::Bytes => "Vec<u8>".to_owned(),
		RegularType::String => "String".to_owned(),
		RegularType::Array(array) => format!("Vec<{}>", inline_type(schema, array.items)),
		RegularType::Map(map) => {
			format!("std::collections::HashMap<String, {}>", inline_type(schema, map.values))
		}
		RegularType::Union(union) => union_type(schema, key, union),
		RegularType::Record(record) => type_name(&record.name),
		RegularType::Enum(enum_) => type_name(&enum_.name),
		RegularType::Fixed(fixed) => type_name(&fixed.name),
	}
}

fn is_null(schema: &Schema, key: SchemaKey) -> bool {
	matches!(schema.node(key).type_, RegularType::Null) && schema.node(key).logical_type.is_none()
}

/// `union[null, T]` (in either order) renders as `Option<T>`, matching the
/// Host Type Bridge's "sum of T1..Tn" rule specialized to the common
/// nullable-field case. Any other union renders as a generated `#[serde(untagged)]`
/// enum with one variant per branch.
fn union_type(schema: &Schema, union_key: SchemaKey, union: &crate::schema::Union) -> String {
	let non_null: Vec<SchemaKey> =
		union.variants.iter().copied().filter(|&v| !is_null(schema, v)).collect();
	if non_null.len() == 1 && non_null.len() + 1 == union.variants.len() {
		return format!("Option<{}>", inline_type(schema, non_null[0]));
	}
	// Anonymous (non-nullable) unions don't have a natural Rust name; use
	// the arena index so multiple distinct anonymous unions don't collide.
	format!("Union{}", union_key.idx())
}

fn logical_type_rust(logical_type: &LogicalType, base: &RegularType) -> String {
	match logical_type {
		// `rust_decimal` is already a dependency of this crate's codec, so
		// the generated code reuses it rather than inventing a new one.
		LogicalType::Decimal(_) => "rust_decimal::Decimal".to_owned(),
		LogicalType::Uuid => "String".to_owned(),
		LogicalType::Date => "i32".to_owned(),
		LogicalType::TimeMillis => "i32".to_owned(),
		LogicalType::TimeMicros => "i64".to_owned(),
		LogicalType::TimestampMillis
		| LogicalType::TimestampMicros
		| LogicalType::LocalTimestampMillis
		| LogicalType::LocalTimestampMicros => "i64".to_owned(),
		LogicalType::Duration => "[u32; 3]".to_owned(),
		// Unrecognized logical types degrade silently to their base, per
		// the parsing rule in the base spec.
		LogicalType::Unknown(_) => match base {
			RegularType::Bytes => "Vec<u8>".to_owned(),
			RegularType::Fixed(fixed) => type_name(&fixed.name),
			other => inline_base(other),
		},
	}
}

fn inline_base(regular_type: &RegularType) -> String {
	match regular_type {
		RegularType::Null => "()".to_owned(),
		RegularType::Boolean => "bool".to_owned(),
		RegularType::Int => "i32".to_owned(),
		RegularType::Long => "i64".to_owned(),
		RegularType::Float => "f32".to_owned(),
		RegularType::Double => "f64".to_owned(),
		RegularType::Bytes => "Vec<u8>".to_owned(),
		RegularType::String => "String".to_owned(),
		_ => "()".to_owned(),
	}
}

fn emit_named_type(schema: &Schema, key: SchemaKey, out: &mut String) {
	match &schema.node(key).type_ {
		RegularType::Record(record) => {
			out.push_str(&doc_comment(&record.doc, ""));
			out.push_str("#[derive(Debug, Clone, PartialEq, serde_derive::Serialize, serde_derive::Deserialize)]\n");
			let _ = writeln!(out, "pub struct {} {{", type_name(&record.name));
			for field in &record.fields {
				let sanitized = sanitize_ident(&field.name);
				out.push_str(&doc_comment(&field.doc, "\t"));
				if let Some(attr) = rename_attr(&sanitized, &field.name) {
					out.push('\t');
					out.push_str(&attr);
				}
				let _ = writeln!(out, "\tpub {}: {},", sanitized, inline_type(schema, field.type_));
			}
			out.push_str("}\n\n");
		}
		RegularType::Enum(enum_) => {
			let _ = writeln!(
				out,
				"#[derive(Debug, Clone, Copy, PartialEq, Eq, serde_derive::Serialize, serde_derive::Deserialize)]"
			);
			let _ = writeln!(out, "pub enum {} {{", type_name(&enum_.name));
			for symbol in &enum_.symbols {
				let sanitized = sanitize_ident(symbol);
				if let Some(attr) = rename_attr(&sanitized, symbol) {
					out.push('\t');
					out.push_str(&attr);
				}
				let _ = writeln!(out, "\t{sanitized},");
			}
			out.push_str("}\n\n");
		}
		RegularType::Fixed(fixed) => {
			let _ = writeln!(
				out,
				"#[derive(Debug, Clone, Copy, PartialEq, Eq, serde_derive::Serialize, serde_derive::Deserialize)]"
			);
			let _ = writeln!(out, "pub struct {}(pub [u8; {}]);", type_name(&fixed.name), fixed.size);
			out.push('\n');
		}
		_ => unreachable!("named_types_in_dependency_order only yields Record/Enum/Fixed"),
	}
}

/// Collect anonymous (non-nullable) unions reachable from `root` and emit a
/// `#[serde(untagged)]` enum for each, matching the name [`union_type`] uses
/// inline (`UnionN` where `N` is the union node's arena index).
fn emit_anonymous_unions(schema: &Schema, out: &mut String) {
	let mut seen = BTreeSet::new();
	for idx in 0..schema.nodes().len() {
		let key = SchemaKey::from_idx(idx);
		if let RegularType::Union(union) = &schema.node(key).type_ {
			let non_null: Vec<SchemaKey> =
				union.variants.iter().copied().filter(|&v| !is_null(schema, v)).collect();
			let is_nullable_single = non_null.len() == 1 && non_null.len() + 1 == union.variants.len();
			if is_nullable_single || !seen.insert(idx) {
				continue;
			}
			let _ = writeln!(out, "#[derive(Debug, Clone, PartialEq, serde_derive::Serialize, serde_derive::Deserialize)]");
			out.push_str("#[serde(untagged)]\n");
			let _ = writeln!(out, "pub enum Union{idx} {{");
			for (variant_idx, &variant) in union.variants.iter().enumerate() {
				let _ = writeln!(
					out,
					"\tVariant{variant_idx}({}),",
					inline_type(schema, variant)
				);
			}
			out.push_str("}\n\n");
		}
	}
}

/// Walk `schema` and render Rust struct/enum definitions that round-trip
/// through `serde` against it, wrapped in `mod module_name { ... }` when
/// `module_name` is supplied.
///
/// Named types are emitted in dependency order (definitions before uses);
/// non-identifier characters in names are replaced with `_` and reserved
/// words get a trailing `_`; where the sanitized name differs from the
/// original, a `#[serde(rename = "...")]` is emitted so the generated type
/// still (de)serializes under the schema's real names. Doc strings become
/// `///` comments.
pub fn emit_source(schema: &Schema, module_name: Option<&str>) -> String {
	let mut body = String::new();
	for key in named_types_in_dependency_order(schema) {
		emit_named_type(schema, key, &mut body);
	}
	emit_anonymous_unions(schema, &mut body);

	match module_name {
		None => body,
		Some(module_name) => {
			let mut wrapped = String::new();
			let _ = writeln!(wrapped, "pub mod {} {{", sanitize_ident(module_name));
			for line in body.lines() {
				if line.is_empty() {
					wrapped.push('\n');
				} else {
					let _ = writeln!(wrapped, "\t{line}");
				}
			}
			wrapped.push_str("}\n");
			wrapped
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema(json: &str) -> Schema {
		json.parse().expect("valid schema")
	}

	#[test]
	fn record_with_nullable_and_enum_field() {
		let schema = schema(
			r#"{
				"type": "record",
				"name": "test.Sensor",
				"fields": [
					{ "name": "id", "type": "long" },
					{ "name": "label", "type": ["null", "string"], "default": null },
					{
						"name": "kind",
						"type": { "type": "enum", "name": "Kind", "symbols": ["A", "B"] }
					}
				]
			}"#,
		);
		let source = emit_source(&schema, None);
		assert!(source.contains("pub enum Kind {"));
		assert!(source.contains("pub struct Sensor {"));
		assert!(source.contains("pub label: Option<String>,"));
		// Kind must be emitted before Sensor (dependency order).
		assert!(source.find("enum Kind").unwrap() < source.find("struct Sensor").unwrap());
	}

	#[test]
	fn field_name_sanitization_keeps_serde_rename() {
		let schema = schema(
			r#"{
				"type": "record",
				"name": "R",
				"fields": [{ "name": "type", "type": "int" }]
			}"#,
		);
		let source = emit_source(&schema, None);
		assert!(source.contains("#[serde(rename = \"type\")]"));
		assert!(source.contains("pub type_: i32,"));
	}

	#[test]
	fn module_wrapping() {
		let schema = schema(r#"{"type": "record", "name": "R", "fields": []}"#);
		let source = emit_source(&schema, Some("generated"));
		assert!(source.starts_with("pub mod generated {"));
		assert!(source.trim_end().ends_with('}'));
	}

	#[test]
	fn fixed_type_emits_byte_array_newtype() {
		let schema = schema(r#"{"type": "fixed", "name": "Md5", "size": 16}"#);
		let source = emit_source(&schema, None);
		assert!(source.contains("pub struct Md5(pub [u8; 16]);"));
	}

	#[test]
	fn anonymous_union_becomes_untagged_enum() {
		let schema = schema(r#"{"type": ["string", "int"]}"#);
		let source = emit_source(&schema, None);
		assert!(source.contains("#[serde(untagged)]"));
		assert!(source.contains("pub enum Union0 {"));
		assert!(source.contains("Variant0(String),"));
		assert!(source.contains("Variant1(i32),"));
	}
}
