use super::*;

/// Picks a Rust enum variant by matching the schema node's type name (or, for
/// named types, its unqualified name) against the variant identifiers, then
/// deserializes the variant's payload from the same node.
///
/// Used for union branches (and other non-scalar schema nodes) that can't
/// serve as their own [`VariantAccess`] identifier the way
/// [`UnitVariantEnumAccess`](super::unit_variant_enum_access::UnitVariantEnumAccess)'s
/// scalar nodes can.
pub(super) struct SchemaTypeNameEnumAccess<'r, 's, R> {
	pub(super) state: &'r mut DeserializerState<'s, R>,
	pub(super) schema_key: SchemaKey,
	pub(super) allowed_depth: AllowedDepth,
}

fn schema_type_name(node: &SchemaNode) -> &str {
	match &node.type_ {
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
		RegularType::Union(_) => "Union",
		RegularType::Record(record) => record.name.name(),
		RegularType::Enum(enum_) => enum_.name.name(),
		RegularType::Fixed(fixed) => fixed.name.name(),
	}
}

impl<'de, R: ReadSlice<'de>> EnumAccess<'de> for SchemaTypeNameEnumAccess<'_, '_, R> {
	type Error = DeError;
	type Variant = Self;

	fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
	where
		V: DeserializeSeed<'de>,
	{
		let name = schema_type_name(&self.state.config.schema()[self.schema_key]).to_owned();
		let value = seed.deserialize(serde::de::value::StringDeserializer::new(name))?;
		Ok((value, self))
	}
}

impl<'de, R: ReadSlice<'de>> VariantAccess<'de> for SchemaTypeNameEnumAccess<'_, '_, R> {
	type Error = DeError;

	fn unit_variant(self) -> Result<(), Self::Error> {
		match self.state.config.schema()[self.schema_key].type_ {
			RegularType::Null => Ok(()),
			_ => Err(Error::invalid_type(Unexpected::UnitVariant, &"unit variant")),
		}
	}

	fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		seed.deserialize(DatumDeserializer {
			state: self.state,
			schema_key: self.schema_key,
			allowed_depth: self.allowed_depth,
		})
	}

	fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		Deserializer::deserialize_tuple(
			DatumDeserializer {
				state: self.state,
				schema_key: self.schema_key,
				allowed_depth: self.allowed_depth,
			},
			len,
			visitor,
		)
	}

	fn struct_variant<V>(
		self,
		fields: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		Deserializer::deserialize_struct(
			DatumDeserializer {
				state: self.state,
				schema_key: self.schema_key,
				allowed_depth: self.allowed_depth,
			},
			"",
			fields,
			visitor,
		)
	}
}

/// Wraps a [`DatumDeserializer`] so that, when the value it deserializes
/// turns out to be an `enum`, variant selection always goes through
/// [`SchemaTypeNameEnumAccess`] instead of whichever routing the wrapped
/// node's own [`Deserializer::deserialize_enum`] would otherwise pick.
///
/// Used for `Option<SomeEnum>` fields backed by a union with more than the
/// simple `[null, T]` shape: by the time we get here the union's
/// discriminant has already been consumed, so the inner node is a single,
/// concrete schema node rather than a union, and we still want enum variant
/// selection to go by schema type name rather than by the scalar-identifier
/// shortcut that node kind would otherwise trigger.
pub(super) struct FavorSchemaTypeNameIfEnumHintDatumDeserializer<'r, 's, R> {
	pub(super) inner: DatumDeserializer<'r, 's, R>,
}

impl<'de, R: ReadSlice<'de>> Deserializer<'de>
	for FavorSchemaTypeNameIfEnumHintDatumDeserializer<'_, '_, R>
{
	type Error = DeError;

	fn deserialize_enum<V>(
		self,
		_name: &'static str,
		_variants: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		visitor.visit_enum(SchemaTypeNameEnumAccess {
			state: self.inner.state,
			schema_key: self.inner.schema_key,
			allowed_depth: self.inner.allowed_depth,
		})
	}

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.inner.deserialize_any(visitor)
	}

	serde::forward_to_deserialize_any! {
		bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
		bytes byte_buf option unit unit_struct newtype_struct seq tuple
		tuple_struct map struct identifier ignored_any
	}
}
