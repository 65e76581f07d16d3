mod blocks;
mod decimal;
mod extract_for_duration;
mod seq_or_tuple;
mod struct_or_map;
mod union_lookup;

use super::*;

use {
	blocks::BlockWriter,
	decimal::DecimalBase,
	seq_or_tuple::SerializeSeqOrTupleOrTupleStruct,
	struct_or_map::{SerializeMapAsRecordOrMapOrDuration, SerializeStructAsRecordOrMapOrDuration},
	union_lookup::UnionVariantLookupKey,
};

use crate::schema::{LogicalType, RegularType, SchemaNode};

/// Can't be instantiated directly - has to be constructed from a
/// [`SerializerState`]
pub struct DatumSerializer<'r, 'c, W> {
	pub(super) state: &'r mut SerializerState<'c, W>,
	pub(super) schema_key: SchemaKey,
}

impl<'r, 'c, W: Write> Serializer for DatumSerializer<'r, 'c, W> {
	type Ok = ();
	type Error = SerError;

	type SerializeSeq = SerializeSeqOrTupleOrTupleStruct<'r, 'c, W>;
	type SerializeTuple = SerializeSeqOrTupleOrTupleStruct<'r, 'c, W>;
	type SerializeTupleStruct = SerializeSeqOrTupleOrTupleStruct<'r, 'c, W>;
	type SerializeTupleVariant = SerializeSeqOrTupleOrTupleStruct<'r, 'c, W>;
	type SerializeMap = SerializeMapAsRecordOrMapOrDuration<'r, 'c, W>;
	type SerializeStruct = SerializeStructAsRecordOrMapOrDuration<'r, 'c, W>;
	type SerializeStructVariant = SerializeStructAsRecordOrMapOrDuration<'r, 'c, W>;

	fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
		match &self.node().type_ {
			RegularType::Boolean => self.state.writer.write_all(&[v as u8]).map_err(SerError::io),
			RegularType::Union(_) => self.serialize_union_unnamed(UnionVariantLookupKey::Boolean, |ser| ser.serialize_bool(v)),
			type_ => Err(unsupported("bool", type_)),
		}
	}

	fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
		self.serialize_integer(v)
	}

	fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Float) => self.state.writer.write_all(&v.to_le_bytes()).map_err(SerError::io),
			(None, RegularType::Double) => Err(SerError::custom(
				"Attempting to serialize a f32 as Avro Double - the receiver seems to be expecting higher precision, please use f64",
			)),
			(None, RegularType::Union(_)) => self.serialize_union_unnamed(UnionVariantLookupKey::Float4, |ser| ser.serialize_f32(v)),
			(_, type_) => Err(unsupported("f32", type_)),
		}
	}

	fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Double) => return self.state.writer.write_all(&v.to_le_bytes()).map_err(SerError::io),
			(None, RegularType::Float) => return self.state.writer.write_all(&(v as f32).to_le_bytes()).map_err(SerError::io),
			(None, RegularType::Union(_)) => return self.serialize_union_unnamed(UnionVariantLookupKey::Float8, |ser| ser.serialize_f64(v)),
			(Some(LogicalType::Decimal(_)), _) => {}
			(_, type_) => return Err(unsupported("f64", type_)),
		}
		let (decimal, base) = self.decimal_and_base()?;
		let rust_decimal: rust_decimal::Decimal =
			num_traits::FromPrimitive::from_f64(v).ok_or_else(|| SerError::new("f64 cannot be converted to decimal for serialization as Decimal"))?;
		decimal::serialize(self.state, &decimal, base, rust_decimal)
	}

	fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
		self.serialize_str(v.encode_utf8(&mut [0u8; 4]))
	}

	fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::String) | (None, RegularType::Bytes) | (Some(LogicalType::Uuid), _) => return self.state.write_length_delimited(v.as_bytes()),
			(None, RegularType::Enum(enum_)) => {
				let discriminant = enum_
					.symbols
					.iter()
					.position(|s| s == v)
					.ok_or_else(|| SerError::custom(format_args!("Failed to find matching enum variant for {v:?} in {:?}", enum_.name)))?;
				return self
					.state
					.writer
					.write_varint::<i64>(discriminant.try_into().map_err(|_| SerError::new("Number does not fit i64 for encoding as Enum discriminant"))?)
					.map(|_| ())
					.map_err(SerError::io);
			}
			(None, RegularType::Fixed(fixed)) => {
				return if fixed.size != v.len() {
					Err(SerError::new("Can't serialize str as Fixed: str's len does not match Fixed's size"))
				} else {
					self.state.writer.write_all(v.as_bytes()).map_err(SerError::io)
				}
			}
			(None, RegularType::Union(_)) => return self.serialize_union_unnamed(UnionVariantLookupKey::Str, |ser| ser.serialize_str(v)),
			(Some(LogicalType::Decimal(_)), _) => {}
			(_, type_) => return Err(unsupported("str", type_)),
		}
		let (decimal, base) = self.decimal_and_base()?;
		let rust_decimal: rust_decimal::Decimal = v
			.parse()
			.map_err(|parse_err| SerError::custom(format_args!("str cannot be converted to decimal for serialization as Decimal: {parse_err}")))?;
		decimal::serialize(self.state, &decimal, base, rust_decimal)
	}

	fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
		let node = self.node();
		match (&node.logical_type, &node.type_) {
			(None, RegularType::Bytes) | (None, RegularType::String) => self.state.write_length_delimited(v),
			(None, RegularType::Fixed(fixed)) => {
				if fixed.size != v.len() {
					Err(SerError::new("Can't serialize &[u8] as Fixed: slice's len does not match Fixed's size"))
				} else {
					self.state.writer.write_all(v).map_err(SerError::io)
				}
			}
			(Some(LogicalType::Duration), _) => {
				// We assume this is the raw 12-byte value, which is the most
				// efficient way to deserialize a Duration then re-serialize it
				// if you're not doing anything else with it.
				if v.len() != 12 {
					Err(SerError::new("&[u8] can be serialized as Duration, but only if it's of length 12. We got a slice of a different length here."))
				} else {
					self.state.writer.write_all(v).map_err(SerError::io)
				}
			}
			(None, RegularType::Union(_)) => self.serialize_union_unnamed(UnionVariantLookupKey::SliceU8, |ser| ser.serialize_bytes(v)),
			(_, type_) => Err(unsupported("bytes", type_)),
		}
	}

	fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
		self.serialize_unit()
	}

	fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error>
	where
		T: Serialize,
	{
		// If there are union lookups to do, they can be performed directly by
		// the functions that serialize the value
		value.serialize(self)
	}

	fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
		match &self.node().type_ {
			RegularType::Null => Ok(()),
			RegularType::Union(_) => self.serialize_union_unnamed(UnionVariantLookupKey::Null, |_| Ok(())),
			type_ => Err(unsupported("unit", type_)),
		}
	}

	fn serialize_unit_struct(self, name: &'static str) -> Result<Self::Ok, Self::Error> {
		match &self.node().type_ {
			RegularType::Null => Ok(()),
			RegularType::String | RegularType::Bytes | RegularType::Enum(_) => self.serialize_str(name),
			RegularType::Union(_) => self.serialize_union_unnamed(UnionVariantLookupKey::UnitStruct, |ser| ser.serialize_unit_struct(name)),
			type_ => Err(unsupported("unit struct", type_)),
		}
	}

	fn serialize_unit_variant(self, name: &'static str, variant_index: u32, variant: &'static str) -> Result<Self::Ok, Self::Error> {
		match &self.node().type_ {
			RegularType::Null if variant == "Null" => Ok(()),
			RegularType::String | RegularType::Bytes | RegularType::Enum(_) => self.serialize_str(variant),
			RegularType::Union(_) => {
				self.serialize_union_unnamed(UnionVariantLookupKey::UnitVariant, |ser| ser.serialize_unit_variant(name, variant_index, variant))
			}
			type_ => Err(unsupported("unit variant", type_)),
		}
	}

	fn serialize_newtype_struct<T: ?Sized>(self, name: &'static str, value: &T) -> Result<Self::Ok, Self::Error>
	where
		T: Serialize,
	{
		self.serialize_lookup_union_variant_by_name(name, |serializer| value.serialize(serializer))
	}

	fn serialize_newtype_variant<T: ?Sized>(
		self,
		_name: &'static str,
		_variant_index: u32,
		variant: &'static str,
		value: &T,
	) -> Result<Self::Ok, Self::Error>
	where
		T: Serialize,
	{
		self.serialize_lookup_union_variant_by_name(variant, |serializer| value.serialize(serializer))
	}

	fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
		enum Target {
			Array(SchemaKey),
			Duration,
			Bytes,
			Fixed(usize),
			Union,
			Invalid,
		}
		let target = match &self.node().type_ {
			RegularType::Array(array) => Target::Array(array.items),
			RegularType::Bytes if self.node().logical_type.is_none() => Target::Bytes,
			RegularType::Fixed(fixed) if self.node().logical_type.is_none() => Target::Fixed(fixed.size),
			RegularType::Fixed(_) if matches!(self.node().logical_type, Some(LogicalType::Duration)) => Target::Duration,
			RegularType::Union(_) => Target::Union,
			_ => Target::Invalid,
		};
		match target {
			Target::Array(items) => Ok(SerializeSeqOrTupleOrTupleStruct::array(BlockWriter::new(self.state, len.unwrap_or(0))?, items)),
			Target::Duration => {
				if len.is_some_and(|l| l != 3) {
					Err(seq_or_tuple::duration_seq_len_incorrect())
				} else {
					Ok(SerializeSeqOrTupleOrTupleStruct::duration(self.state))
				}
			}
			Target::Bytes => {
				self.state.check_allowed_slow_sequence_to_bytes()?;
				match len {
					None => Ok(SerializeSeqOrTupleOrTupleStruct::buffered_bytes(self.state)),
					Some(len) => SerializeSeqOrTupleOrTupleStruct::bytes(self.state, len),
				}
			}
			Target::Fixed(size) => {
				self.state.check_allowed_slow_sequence_to_bytes()?;
				if len.is_some_and(|l| l != size) {
					Err(SerError::new("Could not serialize sequence, tuple or tuple struct to fixed: advertised size mismatch"))
				} else {
					Ok(SerializeSeqOrTupleOrTupleStruct::fixed(self.state, size))
				}
			}
			Target::Union => self.serialize_union_unnamed(UnionVariantLookupKey::SeqOrTupleOrTupleStruct, |ser| ser.serialize_seq(len)),
			Target::Invalid => Err(unsupported("sequence, tuple or tuple struct", &self.node().type_)),
		}
	}

	fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
		self.serialize_seq(Some(len))
	}

	fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeTupleStruct, Self::Error> {
		self.serialize_seq(Some(len))
	}

	fn serialize_tuple_variant(
		self,
		_name: &'static str,
		_variant_index: u32,
		variant: &'static str,
		len: usize,
	) -> Result<Self::SerializeTupleVariant, Self::Error> {
		self.serialize_lookup_union_variant_by_name(variant, |serializer| serializer.serialize_seq(Some(len)))
	}

	fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
		match &self.node().type_ {
			RegularType::Record(_) => Ok(SerializeMapAsRecordOrMapOrDuration::record(self.state, self.schema_key)),
			RegularType::Map(map) => {
				let values = map.values;
				SerializeMapAsRecordOrMapOrDuration::map(self.state, values, len.unwrap_or(0))
			}
			RegularType::Fixed(_) if matches!(self.node().logical_type, Some(LogicalType::Duration)) => {
				if len.is_some_and(|l| l != 3) {
					return Err(struct_or_map::duration_fields_incorrect());
				}
				SerializeMapAsRecordOrMapOrDuration::duration(self.state)
			}
			RegularType::Union(_) => self.serialize_union_unnamed(UnionVariantLookupKey::StructOrMap, |ser| ser.serialize_map(len)),
			type_ => Err(unsupported("map", type_)),
		}
	}

	fn serialize_struct(self, name: &'static str, len: usize) -> Result<Self::SerializeStruct, Self::Error> {
		self.serialize_struct_or_struct_variant(name, len)
	}

	fn serialize_struct_variant(
		self,
		_name: &'static str,
		_variant_index: u32,
		variant: &'static str,
		len: usize,
	) -> Result<Self::SerializeStructVariant, Self::Error> {
		self.serialize_struct_or_struct_variant(variant, len)
	}
}

fn unsupported(rust_kind: &str, type_: &RegularType) -> SerError {
	SerError::custom(format_args!("Could not serialize {rust_kind} to {type_:?}"))
}

impl<W: std::io::Write> SerializerState<'_, W> {
	pub(super) fn check_allowed_slow_sequence_to_bytes(&self) -> Result<(), SerError> {
		if self.config.allow_slow_sequence_to_bytes {
			Ok(())
		} else {
			Err(SerError::new(
				"Sequence to bytes conversion is not allowed by default because it is much \
					slower than going through `serialize_bytes`, which can be achieved via \
					the `serde_bytes` crate. If this is not an option because e.g. you are \
					transcoding, you can enable the slow sequence-to-bytes conversion by calling \
					`allow_slow_sequence_to_bytes` on the `SerializerConfig`.",
			))
		}
	}
}

impl<'r, 'c, W: Write> DatumSerializer<'r, 'c, W> {
	fn node(&self) -> &SchemaNode {
		&self.state.config.schema()[self.schema_key]
	}

	/// Only valid to call when `self.node().logical_type` is
	/// `Some(LogicalType::Decimal(_))`.
	fn decimal_and_base(&self) -> Result<(crate::schema::Decimal, DecimalBase), SerError> {
		let node = self.node();
		let decimal = match &node.logical_type {
			Some(LogicalType::Decimal(decimal)) => decimal.clone(),
			_ => panic!("internal serializer error: decimal_and_base called on a non-decimal node"),
		};
		let base = match &node.type_ {
			RegularType::Bytes => DecimalBase::Bytes,
			RegularType::Fixed(fixed) => DecimalBase::Fixed(fixed.size),
			_ => return Err(SerError::new("decimal logical type can only annotate `bytes` or `fixed`")),
		};
		Ok((decimal, base))
	}

	fn serialize_union_unnamed<O>(self, variant_lookup: UnionVariantLookupKey, with_serializer: impl FnOnce(Self) -> Result<O, SerError>) -> Result<O, SerError> {
		let schema = self.state.config.schema();
		let union = match &schema[self.schema_key].type_ {
			RegularType::Union(union) => union,
			_ => panic!("internal serializer error: serialize_union_unnamed called on a non-union node"),
		};
		match union_lookup::find_unnamed(schema, union, variant_lookup) {
			None => Err(SerError::custom(format_args!(
				"Could not serialize {:?} to {:?} - \
					if you need to explicit a variant because it can't be figured out \
					automatically, consider using an enum or newtype struct to serialize this field",
				variant_lookup,
				schema[self.schema_key].type_
			))),
			Some((discriminant, variant_key)) => {
				self.state.writer.write_varint(discriminant).map_err(SerError::io)?;
				with_serializer(Self {
					state: self.state,
					schema_key: variant_key,
				})
			}
		}
	}

	fn serialize_integer<N>(self, num: N) -> Result<(), SerError>
	where
		N: TryInto<i64> + TryInto<i32> + TryInto<i128> + Copy,
	{
		enum Target {
			I32,
			I64,
			EnumDiscriminant,
			Union,
			Invalid,
		}
		let node = self.node();
		let target = if let Some(logical_type) = &node.logical_type {
			match logical_type {
				LogicalType::Date | LogicalType::TimeMillis => Target::I32,
				LogicalType::TimeMicros
				| LogicalType::TimestampMillis
				| LogicalType::TimestampMicros
				| LogicalType::LocalTimestampMillis
				| LogicalType::LocalTimestampMicros => Target::I64,
				LogicalType::Decimal(_) => {
					let (decimal, base) = self.decimal_and_base()?;
					return serialize_decimal_integer(self.state, &decimal, base, num);
				}
				_ => Target::Invalid,
			}
		} else {
			match &node.type_ {
				RegularType::Int => Target::I32,
				RegularType::Long => Target::I64,
				RegularType::Enum(_) => Target::EnumDiscriminant,
				RegularType::Union(_) => Target::Union,
				_ => Target::Invalid,
			}
		};
		match target {
			Target::I32 => {
				let n: i32 = num.try_into().map_err(|_| SerError::new("Number does not fit i32 for encoding as Int"))?;
				self.state.writer.write_varint(n).map(|_| ()).map_err(SerError::io)
			}
			Target::I64 => {
				let n: i64 = num.try_into().map_err(|_| SerError::new("Number does not fit i64 for encoding as Long"))?;
				self.state.writer.write_varint(n).map(|_| ()).map_err(SerError::io)
			}
			Target::EnumDiscriminant => {
				let n: i64 = num.try_into().map_err(|_| SerError::new("Number does not fit i64 for encoding as Enum discriminant"))?;
				self.state.writer.write_varint(n).map(|_| ()).map_err(SerError::io)
			}
			Target::Union => {
				let key = match std::mem::size_of::<N>() {
					4 => UnionVariantLookupKey::Integer4,
					8 => UnionVariantLookupKey::Integer8,
					_ => UnionVariantLookupKey::Integer,
				};
				self.serialize_union_unnamed(key, |ser| ser.serialize_integer(num))
			}
			Target::Invalid => Err(unsupported("integer", &self.node().type_)),
		}
	}

	fn serialize_lookup_union_variant_by_name<O>(self, variant_name: &str, f: impl FnOnce(DatumSerializer<'r, 'c, W>) -> Result<O, SerError>) -> Result<O, SerError> {
		let found = match &self.node().type_ {
			RegularType::Union(union) => union_lookup::find_named(self.state.config.schema(), union, variant_name),
			_ => None,
		};
		match found {
			None => f(self),
			Some((discriminant, variant_key)) => {
				self.state.writer.write_varint(discriminant).map_err(SerError::io)?;
				f(DatumSerializer {
					state: self.state,
					schema_key: variant_key,
				})
			}
		}
	}

	fn serialize_struct_or_struct_variant(self, variant_or_struct_name: &str, len: usize) -> Result<SerializeStructAsRecordOrMapOrDuration<'r, 'c, W>, SerError> {
		self.serialize_lookup_union_variant_by_name(variant_or_struct_name, |serializer| match &serializer.node().type_ {
			RegularType::Record(_) => Ok(SerializeStructAsRecordOrMapOrDuration::record(serializer.state, serializer.schema_key)),
			RegularType::Map(map) => {
				let values = map.values;
				SerializeStructAsRecordOrMapOrDuration::map(serializer.state, values, len)
			}
			RegularType::Fixed(_) if matches!(serializer.node().logical_type, Some(LogicalType::Duration)) => {
				if len != 3 {
					return Err(struct_or_map::duration_fields_incorrect());
				}
				SerializeStructAsRecordOrMapOrDuration::duration(serializer.state)
			}
			RegularType::Union(_) => serializer.serialize_union_unnamed(UnionVariantLookupKey::StructOrMap, |ser| ser.serialize_struct_or_struct_variant(variant_or_struct_name, len)),
			type_ => Err(unsupported("struct", type_)),
		})
	}
}

fn serialize_decimal_integer<W: Write, N>(state: &mut SerializerState<'_, W>, decimal: &crate::schema::Decimal, base: DecimalBase, num: N) -> Result<(), SerError>
where
	N: TryInto<i128>,
{
	let n: i128 = num.try_into().map_err(|_| SerError::new("Number does not fit i128 for encoding as Decimal"))?;
	let rust_decimal = rust_decimal::Decimal::from_i128_with_scale(n, 0);
	decimal::serialize(state, decimal, base, rust_decimal)
}
