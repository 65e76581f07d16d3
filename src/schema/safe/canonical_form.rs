use std::fmt::Write;

use super::{rabin::Rabin, RegularType, SchemaKey};
use crate::schema::{Schema, SchemaError};

impl Schema {
	/// The schema's Rabin (CRC-64-AVRO) fingerprint over its Parsing
	/// Canonical Form.
	///
	/// Per [AVRO-1721](https://issues.apache.org/jira/browse/AVRO-1721),
	/// logical types are erased in the canonical form, so two schemas that
	/// only differ by a logical type annotation fingerprint identically.
	/// This mirrors the reference Java implementation, including that the
	/// canonical form text produced along the way is not necessarily valid
	/// JSON (unescaped in corner cases) and is therefore not exposed
	/// publicly — only the final fingerprint is.
	pub fn fingerprint(&self) -> Result<[u8; 8], SchemaError> {
		let mut state = State {
			w: Rabin::default(),
			named_type_written: vec![false; self.nodes().len()],
		};
		state.write(self, self.root())?;
		Ok(state.w.finish())
	}
}

struct State {
	w: Rabin,
	named_type_written: Vec<bool>,
}

impl State {
	fn write(&mut self, schema: &Schema, key: SchemaKey) -> Result<(), SchemaError> {
		let node = &schema[key];
		let mut first = true;
		let result = match &node.type_ {
			RegularType::Null => self.w.write_str("\"null\""),
			RegularType::Boolean => self.w.write_str("\"boolean\""),
			RegularType::Int => self.w.write_str("\"int\""),
			RegularType::Long => self.w.write_str("\"long\""),
			RegularType::Float => self.w.write_str("\"float\""),
			RegularType::Double => self.w.write_str("\"double\""),
			RegularType::Bytes => self.w.write_str("\"bytes\""),
			RegularType::String => self.w.write_str("\"string\""),
			RegularType::Array(array) => {
				self.w.write_str("{\"type\":\"array\",\"items\":")?;
				self.write(schema, array.items)?;
				self.w.write_char('}')
			}
			RegularType::Map(map) => {
				self.w.write_str("{\"type\":\"map\",\"values\":")?;
				self.write(schema, map.values)?;
				self.w.write_char('}')
			}
			RegularType::Union(union) => {
				self.w.write_char('[')?;
				for &variant in &union.variants {
					if !first {
						self.w.write_char(',')?;
					}
					first = false;
					self.write(schema, variant)?;
				}
				self.w.write_char(']')
			}
			RegularType::Enum(enum_) => {
				if self.should_write_full(key.idx()) {
					write!(
						self.w,
						"{{\"name\":\"{}\",\"type\":\"enum\",\"symbols\":[",
						enum_.name.fully_qualified_name()
					)?;
					for symbol in &enum_.symbols {
						if !first {
							self.w.write_char(',')?;
						}
						first = false;
						write!(self.w, "\"{symbol}\"")?;
					}
					self.w.write_str("]}")
				} else {
					write!(self.w, "\"{}\"", enum_.name.fully_qualified_name())
				}
			}
			RegularType::Fixed(fixed) => {
				if self.should_write_full(key.idx()) {
					write!(
						self.w,
						"{{\"name\":\"{}\",\"type\":\"fixed\",\"size\":{}}}",
						fixed.name.fully_qualified_name(),
						fixed.size
					)
				} else {
					write!(self.w, "\"{}\"", fixed.name.fully_qualified_name())
				}
			}
			RegularType::Record(record) => {
				if self.should_write_full(key.idx()) {
					write!(
						self.w,
						"{{\"name\":\"{}\",\"type\":\"record\",\"fields\":[",
						record.name.fully_qualified_name()
					)?;
					for field in &record.fields {
						if !first {
							self.w.write_char(',')?;
						}
						first = false;
						write!(self.w, "{{\"name\":\"{}\",\"type\":", field.name)?;
						self.write(schema, field.type_)?;
						self.w.write_char('}')?;
					}
					self.w.write_str("]}")
				} else {
					write!(self.w, "\"{}\"", record.name.fully_qualified_name())
				}
			}
		};
		result.map_err(|e: std::fmt::Error| SchemaError::msg(format_args!("writing canonical form: {e}")))
	}

	/// Named types are only written in full the first time they're reached;
	/// subsequent references are written as a bare quoted name.
	fn should_write_full(&mut self, idx: usize) -> bool {
		let written = &mut self.named_type_written[idx];
		if *written {
			false
		} else {
			*written = true;
			true
		}
	}
}
