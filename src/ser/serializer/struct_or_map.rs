use super::*;

use crate::schema::{Record, RegularType};

pub struct SerializeStructAsRecordOrMapOrDuration<'r, 'c, W> {
	kind: Kind<'r, 'c, W>,
}

enum Kind<'r, 'c, W> {
	Record(KindRecord<'r, 'c, W>),
	Map {
		block_writer: BlockWriter<'r, 'c, W>,
		elements_schema: SchemaKey,
	},
	Duration {
		serializer_state: &'r mut SerializerState<'c, W>,
		values: [u32; 3],
		gotten_values: u8,
	},
}

struct KindRecord<'r, 'c, W> {
	serializer_state: &'r mut SerializerState<'c, W>,
	record_state: RecordState,
}

struct RecordState {
	record_key: SchemaKey,
	current_idx: usize,
	buffers: Vec<Option<Vec<u8>>>,
}

fn record<'a>(schema: &'a Schema, record_key: SchemaKey) -> &'a Record {
	match &schema[record_key].type_ {
		RegularType::Record(record) => record,
		_ => panic!("internal serializer error: record_key did not point to a record"),
	}
}

impl<W> Drop for KindRecord<'_, '_, W> {
	fn drop(&mut self) {
		// In order to avoid allocating even when field reordering is necessary we can
		// preserve the necessary allocations from one record to another (even across
		// serializations).
		if self.record_state.buffers.capacity() > 0 {
			self.serializer_state.config.buffers.field_reordering_buffers.extend(
				self.record_state
					.buffers
					.drain(..)
					.flatten()
					.map(|mut v| {
						v.clear();
						v
					}),
			);
			self.serializer_state
				.config
				.buffers
				.field_reordering_super_buffers
				.push(std::mem::take(&mut self.record_state.buffers));
		}
	}
}

impl<'r, 'c, W: Write> SerializeStructAsRecordOrMapOrDuration<'r, 'c, W> {
	pub(super) fn record(state: &'r mut SerializerState<'c, W>, record_key: SchemaKey) -> Self {
		Self {
			kind: Kind::Record(KindRecord {
				record_state: RecordState {
					record_key,
					current_idx: 0,
					buffers: state
						.config
						.buffers
						.field_reordering_super_buffers
						.pop()
						.map(|v| {
							assert!(v.is_empty());
							v
						})
						.unwrap_or_default(),
				},
				serializer_state: state,
			}),
		}
	}
	pub(super) fn map(state: &'r mut SerializerState<'c, W>, elements_schema: SchemaKey, min_len: usize) -> Result<Self, SerError> {
		Ok(Self {
			kind: Kind::Map {
				block_writer: BlockWriter::new(state, min_len)?,
				elements_schema,
			},
		})
	}
	pub(super) fn duration(state: &'r mut SerializerState<'c, W>) -> Result<Self, SerError> {
		Ok(Self {
			kind: Kind::Duration {
				serializer_state: state,
				values: [0; 3],
				gotten_values: 0,
			},
		})
	}

	fn end(mut self) -> Result<(), SerError> {
		match self.kind {
			Kind::Record(KindRecord {
				ref mut serializer_state,
				ref mut record_state,
			}) => {
				let serializer_state = &mut **serializer_state;
				loop {
					let n_fields = record(serializer_state.config.schema(), record_state.record_key).fields.len();
					if record_state.current_idx < n_fields {
						let schema = serializer_state.config.schema();
						let field = &record(schema, record_state.record_key).fields[record_state.current_idx];
						let missing_field = || SerError::custom(format_args!("Missing field {:?} in record", field.name.as_str()));
						match &schema[field.type_].type_ {
							RegularType::Null => {
								// Always-null fields can be skipped in source
								// without erroring (although providing it with
								// type `()` will result in better perf because
								// we won't need to buffer)
							}
							RegularType::Union(union) => {
								match union_lookup::find_unnamed(schema, union, UnionVariantLookupKey::Null) {
									Some((discriminant, null_key)) if matches!(schema[null_key].type_, RegularType::Null) => {
										// Optional fields can be skipped in source without
										// erroring (although providing `None` explicitly
										// will result in better perf because we won't need
										// to buffer)
										serializer_state.writer.write_varint(discriminant).map_err(SerError::io)?;
									}
									_ => return Err(missing_field()),
								}
							}
							_ => return Err(missing_field()),
						}
						record_state.current_idx += 1;
					} else {
						break;
					}
					while let Some(mut already_serialized) = record_state.buffers.get_mut(record_state.current_idx).and_then(Option::take) {
						serializer_state.writer.write_all(&already_serialized).map_err(SerError::io)?;

						already_serialized.clear();
						serializer_state.config.buffers.field_reordering_buffers.push(already_serialized);

						record_state.current_idx += 1;
					}
				}
				debug_assert!(record_state.buffers.iter().all(Option::is_none));
				record_state.buffers.clear();
			}
			Kind::Map { block_writer, .. } => {
				block_writer.end()?;
			}
			Kind::Duration {
				serializer_state,
				values,
				gotten_values,
			} => {
				if gotten_values != 0b111 {
					return Err(duration_fields_incorrect());
				} else {
					let [a, b, c] = values;
					let [a3, a2, a1, a0] = a.to_le_bytes();
					let [b3, b2, b1, b0] = b.to_le_bytes();
					let [c3, c2, c1, c0] = c.to_le_bytes();
					let values = [a3, a2, a1, a0, b3, b2, b1, b0, c3, c2, c1, c0];

					serializer_state.writer.write_all(&values).map_err(SerError::io)?;
				}
			}
		}
		Ok(())
	}
}

fn field_idx(record: &Record, current_idx: usize, field_name: &str) -> Result<(usize, SchemaKey), SerError> {
	let key_does_not_exist = || SerError::custom(format_args!("Attempting to serialize field that doesn't exist in record: {field_name}"));
	match record.fields.get(current_idx) {
		Some(first) if first.name == field_name => {
			// Fast case: fields are ordered so we don't need to buffer nor search
			Ok((current_idx, first.type_))
		}
		_ => match record.fields.iter().position(|f| f.name == field_name) {
			None => Err(key_does_not_exist()),
			Some(field_idx) => match field_idx.cmp(&current_idx) {
				std::cmp::Ordering::Greater => Ok((field_idx, record.fields[field_idx].type_)),
				std::cmp::Ordering::Less | std::cmp::Ordering::Equal => Err(serializing_same_field_name_twice(field_name)),
			},
		},
	}
}

fn serialize_record_value<'c, W: Write, T: ?Sized>(
	serializer_state: &mut SerializerState<'c, W>,
	record_state: &mut RecordState,
	field_idx: usize,
	field_schema_key: SchemaKey,
	value: &T,
) -> Result<(), SerError>
where
	T: Serialize,
{
	if field_idx == record_state.current_idx {
		// Fast case: fields are ordered so we don't need to buffer nor search
		value.serialize(DatumSerializer {
			state: serializer_state,
			schema_key: field_schema_key,
		})?;
		record_state.current_idx += 1;
		while let Some(mut already_serialized) = record_state.buffers.get_mut(record_state.current_idx).and_then(Option::take) {
			serializer_state.writer.write_all(&already_serialized).map_err(SerError::io)?;

			already_serialized.clear();
			serializer_state.config.buffers.field_reordering_buffers.push(already_serialized);

			record_state.current_idx += 1;
		}
		Ok(())
	} else {
		if record_state.buffers.len() <= field_idx {
			record_state.buffers.resize(field_idx + 1, None);
		}
		let field_buf: &mut Option<Vec<u8>> = match &mut record_state.buffers[field_idx] {
			Some(_) => {
				let name = record(serializer_state.config.schema(), record_state.record_key).fields[field_idx].name.clone();
				return Err(serializing_same_field_name_twice(&name));
			}
			field_buf @ None => field_buf,
		};
		let mut buf_serializer_state = SerializerState {
			writer: serializer_state
				.config
				.buffers
				.field_reordering_buffers
				.pop()
				.map(|v| {
					assert!(v.is_empty());
					v
				})
				.unwrap_or_default(),
			config: serializer_state.config,
		};
		value.serialize(DatumSerializer {
			state: &mut buf_serializer_state,
			schema_key: field_schema_key,
		})?;
		// Put buffer in place after serialization
		// (after instead of before gives one less deref level during inner
		// serialization, and avoids extra monomorphizations if serializing to Vec)
		*field_buf = Some(buf_serializer_state.into_writer());
		Ok(())
	}
}

fn serialize_duration_field<T>(
	values: &mut [u32; 3],
	gotten_values: &mut u8,
	duration_field: extract_for_duration::DurationFieldName,
	value: &T,
) -> Result<(), SerError>
where
	T: Serialize + ?Sized,
{
	let bit = 1u8 << (duration_field as u8);
	if *gotten_values & bit != 0 {
		return Err(SerError::custom(format_args!(
			"{duration_field} is getting serialized twice for serialization as Duration",
		)));
	}
	values[duration_field as usize] = value.serialize(extract_for_duration::ExtractU32ForDuration)?;
	*gotten_values |= bit;
	Ok(())
}

fn serializing_same_field_name_twice(field_name: &str) -> SerError {
	SerError::custom(format_args!(
		"Attempting to serialize field with same field_name twice in record (field_name: {field_name:?})"
	))
}

pub(super) fn duration_fields_incorrect() -> SerError {
	SerError::new("A struct can indeed be serialized as Duration, but only if its fields are months/days/milliseconds")
}

fn write_map_key<W: Write, T: Serialize + ?Sized>(state: &mut SerializerState<'_, W>, key: &T) -> Result<(), SerError> {
	key.serialize(MapKeySerializer { state })
}

impl<'r, 'c, W: Write> SerializeStruct for SerializeStructAsRecordOrMapOrDuration<'r, 'c, W> {
	type Ok = ();

	type Error = SerError;

	fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		match &mut self.kind {
			Kind::Record(KindRecord {
				serializer_state,
				record_state,
			}) => {
				let (field_idx, field_schema_key) = {
					let rec = record(serializer_state.config.schema(), record_state.record_key);
					field_idx(rec, record_state.current_idx, key)?
				};
				serialize_record_value(serializer_state, record_state, field_idx, field_schema_key, value)
			}
			Kind::Map { elements_schema, block_writer } => {
				block_writer.signal_next_record()?;
				write_map_key(block_writer.state, key)?;
				value.serialize(DatumSerializer {
					state: block_writer.state,
					schema_key: *elements_schema,
				})
			}
			Kind::Duration { values, gotten_values, .. } => {
				let duration_field = extract_for_duration::DurationFieldName::from_str(key)?;
				serialize_duration_field(values, gotten_values, duration_field, value)
			}
		}
	}

	fn end(self) -> Result<Self::Ok, Self::Error> {
		self.end()
	}
}

impl<'r, 'c, W: Write> SerializeStructVariant for SerializeStructAsRecordOrMapOrDuration<'r, 'c, W> {
	type Ok = ();

	type Error = SerError;

	fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		<Self as SerializeStruct>::serialize_field(self, key, value)
	}

	fn end(self) -> Result<Self::Ok, Self::Error> {
		<Self as SerializeStruct>::end(self)
	}
}

pub struct SerializeMapAsRecordOrMapOrDuration<'r, 'c, W> {
	inner: SerializeStructAsRecordOrMapOrDuration<'r, 'c, W>,
	key_hint: KeyHint,
}

enum KeyHint {
	None,
	KeyLocation { field_idx: usize, schema_key: SchemaKey },
	DurationField(extract_for_duration::DurationFieldName),
}

impl<'r, 'c, W: Write> SerializeMapAsRecordOrMapOrDuration<'r, 'c, W> {
	pub(super) fn record(state: &'r mut SerializerState<'c, W>, record_key: SchemaKey) -> Self {
		Self {
			inner: SerializeStructAsRecordOrMapOrDuration::record(state, record_key),
			key_hint: KeyHint::None,
		}
	}
	pub(super) fn map(state: &'r mut SerializerState<'c, W>, elements_schema: SchemaKey, min_len: usize) -> Result<Self, SerError> {
		Ok(Self {
			inner: SerializeStructAsRecordOrMapOrDuration::map(state, elements_schema, min_len)?,
			key_hint: KeyHint::None,
		})
	}

	pub(super) fn duration(state: &'r mut SerializerState<'c, W>) -> Result<Self, SerError> {
		Ok(Self {
			inner: SerializeStructAsRecordOrMapOrDuration::duration(state)?,
			key_hint: KeyHint::None,
		})
	}
}

impl<'r, 'c, W: Write> SerializeMap for SerializeMapAsRecordOrMapOrDuration<'r, 'c, W> {
	type Ok = ();
	type Error = SerError;

	fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		match &mut self.inner.kind {
			Kind::Record(KindRecord {
				serializer_state,
				record_state,
			}) => {
				let (field_idx, schema_key) = {
					let rec = record(serializer_state.config.schema(), record_state.record_key);
					key.serialize(FindFieldIndexSerializer {
						record: rec,
						current_idx: record_state.current_idx,
					})?
				};
				self.key_hint = KeyHint::KeyLocation { field_idx, schema_key };
				Ok(())
			}
			Kind::Map { block_writer, .. } => {
				block_writer.signal_next_record()?;
				write_map_key(block_writer.state, key)
			}
			Kind::Duration { .. } => {
				self.key_hint = KeyHint::DurationField(key.serialize(extract_for_duration::ExtractFieldNameForDuration)?);
				Ok(())
			}
		}
	}

	fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
	where
		T: Serialize,
	{
		match &mut self.inner.kind {
			Kind::Record(KindRecord {
				serializer_state,
				record_state,
			}) => match std::mem::replace(&mut self.key_hint, KeyHint::None) {
				KeyHint::KeyLocation { field_idx, schema_key } => serialize_record_value(serializer_state, record_state, field_idx, schema_key, value),
				_ => panic!("serialize_key should have been called before serialize_value"),
			},
			Kind::Map { elements_schema, block_writer } => value.serialize(DatumSerializer {
				state: block_writer.state,
				schema_key: *elements_schema,
			}),
			Kind::Duration { values, gotten_values, .. } => match std::mem::replace(&mut self.key_hint, KeyHint::None) {
				KeyHint::DurationField(duration_field) => serialize_duration_field(values, gotten_values, duration_field, value),
				_ => panic!("serialize_key should have been called before serialize_value"),
			},
		}
	}

	fn serialize_entry<K: ?Sized, V: ?Sized>(&mut self, key: &K, value: &V) -> Result<(), Self::Error>
	where
		K: Serialize,
		V: Serialize,
	{
		match &mut self.inner.kind {
			Kind::Record(KindRecord {
				serializer_state,
				record_state,
			}) => {
				let (field_idx, schema_key) = {
					let rec = record(serializer_state.config.schema(), record_state.record_key);
					key.serialize(FindFieldIndexSerializer {
						record: rec,
						current_idx: record_state.current_idx,
					})?
				};
				serialize_record_value(serializer_state, record_state, field_idx, schema_key, value)
			}
			Kind::Map { elements_schema, block_writer } => {
				block_writer.signal_next_record()?;
				write_map_key(block_writer.state, key)?;
				value.serialize(DatumSerializer {
					state: block_writer.state,
					schema_key: *elements_schema,
				})
			}
			Kind::Duration { values, gotten_values, .. } => {
				let duration_field = key.serialize(extract_for_duration::ExtractFieldNameForDuration)?;
				serialize_duration_field(values, gotten_values, duration_field, value)
			}
		}
	}

	fn end(self) -> Result<Self::Ok, Self::Error> {
		self.inner.end()
	}
}

struct FindFieldIndexSerializer<'a> {
	record: &'a Record,
	current_idx: usize,
}
impl serde::Serializer for FindFieldIndexSerializer<'_> {
	type Ok = (usize, SchemaKey);
	type Error = SerError;

	fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
		field_idx(self.record, self.current_idx, v)
	}

	serde_serializer_quick_unsupported::serializer_unsupported! {
		err = (SerError::new("Key of map being serialized as record should have been an str"));
		bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char bytes none some unit unit_struct
		unit_variant newtype_struct newtype_variant seq tuple tuple_struct tuple_variant map struct
		struct_variant i128 u128
	}
}

struct MapKeySerializer<'r, 'c, W> {
	state: &'r mut SerializerState<'c, W>,
}
impl<W: Write> serde::Serializer for MapKeySerializer<'_, '_, W> {
	type Ok = ();
	type Error = SerError;

	fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
		self.state.write_length_delimited(v.as_bytes())
	}

	serde_serializer_quick_unsupported::serializer_unsupported! {
		err = (SerError::new("Map keys must serialize as str"));
		bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char bytes none some unit unit_struct
		unit_variant newtype_struct newtype_variant seq tuple tuple_struct tuple_variant map struct
		struct_variant i128 u128
	}
}
