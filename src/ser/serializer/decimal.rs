use super::*;
use crate::schema::Decimal;

/// The base type a `decimal` logical type is layered on top of, as declared
/// by the schema at the point of use (this isn't stored on [`Decimal`]
/// itself, since the same logical-type parameters could in principle
/// annotate either base). `Fixed` only needs the declared size.
pub(super) enum DecimalBase {
	Bytes,
	Fixed(usize),
}

pub(super) fn serialize<W>(
	state: &mut SerializerState<'_, W>,
	decimal: &Decimal,
	base: DecimalBase,
	mut rust_decimal: rust_decimal::Decimal,
) -> Result<(), SerError>
where
	W: Write,
{
	rust_decimal.rescale(decimal.scale);
	if rust_decimal.scale() != decimal.scale {
		return Err(SerError::new(
			"decimal number cannot be scaled to fit in schema scale with a 96 bit mantissa (number or scale too large)",
		));
	}
	let digits = rust_decimal.mantissa().unsigned_abs().to_string().len();
	if digits > decimal.precision {
		return Err(SerError::decimal_out_of_precision(decimal.precision));
	}

	let buf: [u8; 16] = rust_decimal.mantissa().to_be_bytes();

	#[inline]
	fn can_truncate_without_altering_number(buf: &[u8]) -> usize {
		// If it's a negative number we can ignore all 0xff followed by MSB at
		// 1; if it's positive we can ignore all 0x00 followed by MSB at 0.
		let mut can_truncate = 0;
		if buf[0] & 0x80 == 0 {
			while buf.get(can_truncate).map_or(false, |&v| v == 0x00) {
				can_truncate += 1;
			}
			if can_truncate != 0 && buf.get(can_truncate).map_or(true, |&v| v & 0x80 != 0) {
				can_truncate -= 1;
			}
		} else {
			while buf.get(can_truncate).map_or(false, |&v| v == 0xFF) {
				can_truncate += 1;
			}
			if can_truncate != 0 && buf.get(can_truncate).map_or(true, |&v| v & 0x80 == 0) {
				can_truncate -= 1;
			}
		}
		can_truncate
	}

	let start = match base {
		DecimalBase::Bytes => {
			let start = can_truncate_without_altering_number(&buf);
			let len = (buf.len() - start) as i32;
			state.writer.write_varint::<i32>(len).map_err(SerError::io)?;
			start
		}
		DecimalBase::Fixed(size) => {
			match buf.len().checked_sub(size) {
				Some(start) => {
					match buf.get(0..start + 1) {
						Some(relevant_buf_for_check) => {
							let can_truncate = can_truncate_without_altering_number(relevant_buf_for_check);
							if can_truncate < start {
								return Err(SerError::custom(format_args!(
									"decimal number does not fit in `fixed` field size (fixed size: {size}, required: {})",
									size + (start - can_truncate)
								)));
							}
						}
						None => {
							assert!(size == 0);
							if !rust_decimal.is_zero() {
								return Err(SerError::new(
									"non-zero decimal number cannot be serialized as a fixed size decimal with size 0",
								));
							}
						}
					}
					start
				}
				None => {
					let byte: u8 = if buf[0] & 0x80 == 0 { 0x00 } else { 0xFF };
					for _ in buf.len()..size {
						state.writer.write_all(&[byte]).map_err(SerError::io)?;
					}
					0
				}
			}
		}
	};
	state.writer.write_all(&buf[start..]).map_err(SerError::io)
}
