mod allowed_depth;
mod schema_type_name_enum_access;
mod types;
mod unit_variant_enum_access;

use {
	schema_type_name_enum_access::{FavorSchemaTypeNameIfEnumHintDatumDeserializer, SchemaTypeNameEnumAccess},
	types::*,
	unit_variant_enum_access::UnitVariantEnumAccess,
};

pub(crate) use allowed_depth::AllowedDepth;

use super::*;

use crate::schema::{Decimal, LogicalType, RecordField, RegularType, SchemaNode, Union};

/// Can't be instantiated directly - has to be constructed from a
/// [`DeserializerState`]
pub struct DatumDeserializer<'r, 's, R> {
	pub(super) state: &'r mut DeserializerState<'s, R>,
	pub(super) schema_key: SchemaKey,
	pub(super) allowed_depth: AllowedDepth,
}

impl<'r, 's, R> DatumDeserializer<'r, 's, R> {
	fn node(&self) -> &'s SchemaNode {
		&self.state.config().schema()[self.schema_key]
	}
}

impl<'r, 's, 'de, R: ReadSlice<'de>> DatumDeserializer<'r, 's, R> {
	/// Decodes a node ignoring any logical type annotation - used both for
	/// plain nodes and as the fallback for a [`LogicalType::Unknown`], which
	/// the Avro spec says should degrade silently to its base type.
	fn deserialize_regular_any<V>(self, type_: &'s RegularType, visitor: V) -> Result<V::Value, DeError>
	where
		V: Visitor<'de>,
	{
		match type_ {
			RegularType::Null => visitor.visit_unit(),
			RegularType::Boolean => read_bool(self.state, visitor),
			RegularType::Int => visitor.visit_i32(self.state.read_varint()?),
			RegularType::Long => visitor.visit_i64(self.state.read_varint()?),
			RegularType::Float => {
				visitor.visit_f32(f32::from_le_bytes(self.state.read_const_size_buf()?))
			}
			RegularType::Double => {
				visitor.visit_f64(f64::from_le_bytes(self.state.read_const_size_buf()?))
			}
			RegularType::Bytes => read_length_delimited(self.state, BytesVisitor(visitor)),
			RegularType::String => read_length_delimited(self.state, StringVisitor(visitor)),
			RegularType::Array(array) => {
				let elements_schema = array.items;
				visitor.visit_seq(ArraySeqAccess {
					elements_schema,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			RegularType::Map(map) => {
				let elements_schema = map.values;
				visitor.visit_map(MapMapAccess {
					elements_schema,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			RegularType::Union(union) => {
				let schema_key = read_union_discriminant(self.state, union)?;
				DatumDeserializer {
					schema_key,
					state: self.state,
					allowed_depth: self.allowed_depth.dec()?,
				}
				.deserialize_any(visitor)
			}
			// NB: infinite recursion is prevented here by the fact we prevent constructing
			// a schema that contains a record that always ends up containing itself
			RegularType::Record(record) => visitor.visit_map(RecordMapAccess {
				record_fields: record.fields.iter(),
				state: self.state,
				allowed_depth: self.allowed_depth.dec()?,
			}),
			RegularType::Enum(enum_) => read_enum_as_str(self.state, &enum_.symbols, visitor),
			RegularType::Fixed(fixed) => self.state.read_slice(fixed.size, BytesVisitor(visitor)),
		}
	}
}

impl<'de, R: ReadSlice<'de>> Deserializer<'de> for DatumDeserializer<'_, '_, R> {
	type Error = DeError;

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match &node.logical_type {
			None => self.deserialize_regular_any(&node.type_, visitor),
			Some(LogicalType::Decimal(decimal)) => match &node.type_ {
				RegularType::Bytes => {
					read_decimal(self.state, decimal, DecimalBase::Bytes, VisitorHint::Str, visitor)
				}
				RegularType::Fixed(fixed) => read_decimal(
					self.state,
					decimal,
					DecimalBase::Fixed(fixed.size),
					VisitorHint::Str,
					visitor,
				),
				type_ => Err(DeError::custom(format_args!(
					"decimal logical type can only annotate `bytes` or `fixed`, found {type_:?}"
				))),
			},
			Some(LogicalType::Uuid) => read_length_delimited(self.state, StringVisitor(visitor)),
			Some(LogicalType::Date) => visitor.visit_i32(self.state.read_varint()?),
			Some(LogicalType::TimeMillis) => visitor.visit_i32(self.state.read_varint()?),
			Some(LogicalType::TimeMicros) => visitor.visit_i64(self.state.read_varint()?),
			Some(LogicalType::TimestampMillis) => visitor.visit_i64(self.state.read_varint()?),
			Some(LogicalType::TimestampMicros) => visitor.visit_i64(self.state.read_varint()?),
			Some(LogicalType::LocalTimestampMillis) => visitor.visit_i64(self.state.read_varint()?),
			Some(LogicalType::LocalTimestampMicros) => visitor.visit_i64(self.state.read_varint()?),
			Some(LogicalType::Duration) => visitor.visit_map(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
			Some(LogicalType::Unknown(unknown)) => {
				log::warn!(
					"Unknown logical type {:?} on schema node, decoding as its base type",
					unknown.logical_type_name,
				);
				self.deserialize_regular_any(&node.type_, visitor)
			}
		}
	}

	serde::forward_to_deserialize_any! {
		bool i8 i16 i32 u8 u16 u32 f32 char
		unit unit_struct newtype_struct
	}

	fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// Allow deserializing discriminants without making the string lookup for enums
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Enum(_)) => {
				let discriminant: i64 = self.state.read_varint()?;
				visitor.visit_u64(discriminant.try_into().map_err(|e| {
					DeError::custom(format_args!("Got negative enum discriminant: {e}"))
				})?)
			}
			(Some(LogicalType::Decimal(decimal)), RegularType::Bytes) => {
				read_decimal(self.state, decimal, DecimalBase::Bytes, VisitorHint::U64, visitor)
			}
			(Some(LogicalType::Decimal(decimal)), RegularType::Fixed(fixed)) => {
				read_decimal(self.state, decimal, DecimalBase::Fixed(fixed.size), VisitorHint::U64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Long) => visitor.visit_i64(self.state.read_varint()?),
			(Some(LogicalType::Decimal(decimal)), RegularType::Bytes) => {
				read_decimal(self.state, decimal, DecimalBase::Bytes, VisitorHint::I64, visitor)
			}
			(Some(LogicalType::Decimal(decimal)), RegularType::Fixed(fixed)) => {
				read_decimal(self.state, decimal, DecimalBase::Fixed(fixed.size), VisitorHint::I64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(Some(LogicalType::Decimal(decimal)), RegularType::Bytes) => {
				read_decimal(self.state, decimal, DecimalBase::Bytes, VisitorHint::U128, visitor)
			}
			(Some(LogicalType::Decimal(decimal)), RegularType::Fixed(fixed)) => {
				read_decimal(self.state, decimal, DecimalBase::Fixed(fixed.size), VisitorHint::U128, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(Some(LogicalType::Decimal(decimal)), RegularType::Bytes) => {
				read_decimal(self.state, decimal, DecimalBase::Bytes, VisitorHint::I128, visitor)
			}
			(Some(LogicalType::Decimal(decimal)), RegularType::Fixed(fixed)) => {
				read_decimal(self.state, decimal, DecimalBase::Fixed(fixed.size), VisitorHint::I128, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Double) => {
				visitor.visit_f64(f64::from_le_bytes(self.state.read_const_size_buf()?))
			}
			(Some(LogicalType::Decimal(decimal)), RegularType::Bytes) => {
				read_decimal(self.state, decimal, DecimalBase::Bytes, VisitorHint::F64, visitor)
			}
			(Some(LogicalType::Decimal(decimal)), RegularType::Fixed(fixed)) => {
				read_decimal(self.state, decimal, DecimalBase::Fixed(fixed.size), VisitorHint::F64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// If we get hinted on str, we may attempt to deserialize byte arrays as utf-8
		// encoded strings
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::String) => read_length_delimited(self.state, StringVisitor(visitor)),
			(None, RegularType::Bytes) => read_length_delimited(self.state, StringVisitor(visitor)),
			(None, RegularType::Fixed(fixed)) => {
				self.state.read_slice(fixed.size, StringVisitor(visitor))
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_str(visitor)
	}

	fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Bytes) => read_length_delimited(self.state, BytesVisitor(visitor)),
			(Some(LogicalType::Duration), _) => self.state.read_slice(12, BytesVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_bytes(visitor)
	}

	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Null) => visitor.visit_none(),
			(None, RegularType::Union(union)) => {
				let union_discriminant: usize = read_discriminant(self.state)?;
				match union.variants.get(union_discriminant) {
					None => Err(DeError::new("Could not find union discriminant in schema")),
					Some(&variant_schema)
						if matches!(
							self.state.config().schema()[variant_schema].type_,
							RegularType::Null
						) =>
					{
						visitor.visit_none()
					}
					Some(&variant_schema)
						if union.variants.len() == 2
							&& matches!(
								self.state.config().schema()[union.variants[1 - union_discriminant]].type_,
								RegularType::Null
							) =>
					{
						visitor.visit_some(DatumDeserializer {
							state: self.state,
							schema_key: variant_schema,
							allowed_depth: self.allowed_depth.dec()?,
						})
					}
					Some(&variant_schema) => {
						visitor.visit_some(FavorSchemaTypeNameIfEnumHintDatumDeserializer {
							inner: DatumDeserializer {
								state: self.state,
								schema_key: variant_schema,
								allowed_depth: self.allowed_depth.dec()?,
							},
						})
					}
				}
			}
			_ => visitor.visit_some(self),
		}
	}

	fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// TODO deserialize map as [(key,value)]
		// Until then, this can be worked around using the `serde-tuple-vec-map` crate
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Array(array)) => {
				let elements_schema = array.items;
				visitor.visit_seq(ArraySeqAccess {
					elements_schema,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			(Some(LogicalType::Duration), _) => visitor.visit_seq(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// Allows deserializing Duration as (u32, u32, u32)
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Array(array)) => {
				let elements_schema = array.items;
				visitor.visit_seq(ArraySeqAccess {
					elements_schema,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			(Some(LogicalType::Duration), _) if len == 3 => visitor.visit_seq(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_tuple_struct<V>(
		self,
		_: &'static str,
		len: usize,
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_tuple(len, visitor)
	}

	fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// TODO [{key, value}] could be deserialized into a map
		self.deserialize_any(visitor)
	}

	fn deserialize_struct<V>(
		self,
		_: &'static str,
		_: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_map(visitor)
	}

	fn deserialize_enum<V>(
		self,
		_: &'static str,
		_: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Union(union)) => {
				let variant_schema = read_union_discriminant(self.state, union)?;
				visitor.visit_enum(SchemaTypeNameEnumAccess {
					schema_key: variant_schema,
					state: self.state,
					allowed_depth: self.allowed_depth.dec()?,
				})
			}
			(
				None,
				RegularType::Int
				| RegularType::Long
				| RegularType::Bytes
				| RegularType::String
				| RegularType::Enum(_)
				| RegularType::Fixed(_),
			) => visitor.visit_enum(UnitVariantEnumAccess {
				state: self.state,
				schema_key: self.schema_key,
				allowed_depth: self.allowed_depth.dec()?,
			}),
			_ => visitor.visit_enum(SchemaTypeNameEnumAccess {
				schema_key: self.schema_key,
				state: self.state,
				allowed_depth: self.allowed_depth.dec()?,
			}),
		}
	}

	fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Int) => visitor.visit_u64({
				let val: i32 = self.state.read_varint()?;
				val.try_into()
					.map_err(|_| DeError::new("Failed to convert i32 to u64 for enum identifier"))?
			}),
			(None, RegularType::Long) => visitor.visit_u64({
				let val: i64 = self.state.read_varint()?;
				val.try_into()
					.map_err(|_| DeError::new("Failed to convert i64 to u64 for enum identifier"))?
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// The main thing we can skip here for performance is utf8 decoding of strings.
		// However we still need to drive the deserializer mostly normally to properly
		// advance the reader.

		// TODO skip more efficiently using blocks size hints
		// https://stackoverflow.com/a/42247224/3799609

		// Ideally this would also specialize if we have Seek on our generic reader but
		// we don't have specialization

		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::String) => read_length_delimited(self.state, BytesVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}
}
