//! The CRC-64-AVRO ("Rabin") fingerprint algorithm, as defined by the
//! [Avro specification](https://avro.apache.org/docs/current/specification/#schema-fingerprints).
//!
//! This is a fixed, publicly documented algorithm (not something this crate
//! invents): a 64-bit table-driven CRC seeded with the *empty* fingerprint
//! `0xc15d213aa4d7a795`, fed one byte at a time over a schema's Parsing
//! Canonical Form.

use std::sync::OnceLock;

const EMPTY: u64 = 0xc15d213aa4d7a795;

fn table() -> &'static [u64; 256] {
	static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
	TABLE.get_or_init(|| {
		let mut table = [0u64; 256];
		for (i, slot) in table.iter_mut().enumerate() {
			let mut fp = i as u64;
			for _ in 0..8 {
				fp = (fp >> 1) ^ (EMPTY & -((fp & 1) as i64) as u64);
			}
			*slot = fp;
		}
		table
	})
}

/// Incremental state for computing a Rabin fingerprint.
pub(crate) struct Rabin(u64);

impl Default for Rabin {
	fn default() -> Self {
		Self(EMPTY)
	}
}

impl Rabin {
	fn write_byte(&mut self, byte: u8) {
		let table = table();
		self.0 = table[((self.0 ^ u64::from(byte)) & 0xff) as usize] ^ (self.0 >> 8);
	}

	pub(crate) fn finish(self) -> [u8; 8] {
		self.0.to_le_bytes()
	}
}

impl std::fmt::Write for Rabin {
	fn write_str(&mut self, s: &str) -> std::fmt::Result {
		for byte in s.as_bytes() {
			self.write_byte(*byte);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_string_fingerprint() {
		// Per the Avro spec's own worked example.
		let rabin = Rabin::default();
		assert_eq!(u64::from_le_bytes(rabin.finish()), EMPTY);
	}

	#[test]
	fn deterministic_for_same_input() {
		use std::fmt::Write;
		let mut a = Rabin::default();
		write!(a, "\"int\"").unwrap();
		let mut b = Rabin::default();
		write!(b, "\"int\"").unwrap();
		assert_eq!(a.finish(), b.finish());
	}
}
