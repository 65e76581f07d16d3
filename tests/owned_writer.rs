use {
	avrobin::{
		object_container_file_encoding::{Reader, Writer, WriterBuilder},
		ser::SerializerConfig,
	},
	serde::{Deserialize, Serialize},
	std::sync::Arc,
};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
struct Bar {
	a: i32,
	b: String,
}

fn schema() -> Arc<avrobin::Schema> {
	Arc::new(
		r#"{
			"type": "record",
			"name": "owned_writer.Bar",
			"fields": [
				{ "name": "a", "type": "int" },
				{ "name": "b", "type": "string" }
			]
		}"#
		.parse()
		.unwrap(),
	)
}

fn build_writer() -> Writer<'static, Vec<u8>> {
	WriterBuilder::with_owned_config(SerializerConfig::new(schema()))
		.sync_marker({
			// make test deterministic
			[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]
		})
		.build(Vec::new())
		.unwrap()
}

#[test]
fn test_owned_writer() {
	let values = [
		Bar { a: 1, b: "foo".to_string() },
		Bar { a: 2, b: "bar".to_string() },
	];

	let mut writer = build_writer();
	for b in &values {
		writer.serialize(b).unwrap();
	}

	let finished_written_buffer: Vec<u8> = writer.into_inner().unwrap();

	assert!(finished_written_buffer.starts_with(b"Obj\x01"));
	assert!(finished_written_buffer.ends_with(&[
		1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16
	]));

	let decoded: Vec<Bar> = Reader::from_slice(&finished_written_buffer)
		.unwrap()
		.deserialize_borrowed()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, values);
}

/// `WriterBuilder::with_owned_config` yields a `'static` writer that can be
/// stored alongside other state in a struct without threading a borrowed
/// `SerializerConfig` lifetime through it.
#[test]
fn owned_writer_is_static_and_storable() {
	struct Holder {
		writer: Writer<'static, Vec<u8>>,
	}
	let mut holder = Holder { writer: build_writer() };
	holder.writer.serialize(&Bar { a: 7, b: "baz".to_string() }).unwrap();
	let buf = holder.writer.into_inner().unwrap();
	assert!(buf.starts_with(b"Obj\x01"));
}
