use super::{RegularType, SchemaKey, SchemaMut};
use crate::schema::SchemaError;

/// A named type directly contains itself with no array/map/union
/// indirection to provide a base case, which would make every instance of
/// it infinitely large.
#[derive(Debug)]
pub struct UnconditionalCycle {
	/// The arena indices involved in the cycle, in traversal order.
	pub path: Vec<usize>,
}

impl std::fmt::Display for UnconditionalCycle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "schema contains an unconditional cycle through nodes {:?} (a record field directly re-entering itself with no array/map/union to provide a base case)", self.path)
	}
}

/// Only `record` fields are followed directly: `array`/`map` have an
/// empty-block base case, and `union` may always pick a non-recursive
/// branch (including `null`), so neither can produce an infinitely large
/// value the way a record directly containing itself as a field type would.
pub(super) fn check_for_cycles(schema: &SchemaMut) -> Result<(), SchemaError> {
	#[derive(Clone, Copy, PartialEq)]
	enum Mark {
		Unvisited,
		InProgress,
		Done,
	}
	let mut marks = vec![Mark::Unvisited; schema.nodes().len()];
	let mut path = Vec::new();

	fn visit(
		schema: &SchemaMut,
		key: SchemaKey,
		marks: &mut [Mark],
		path: &mut Vec<usize>,
	) -> Result<(), UnconditionalCycle> {
		match marks[key.idx()] {
			Mark::Done => return Ok(()),
			Mark::InProgress => {
				path.push(key.idx());
				return Err(UnconditionalCycle { path: path.clone() });
			}
			Mark::Unvisited => {}
		}
		marks[key.idx()] = Mark::InProgress;
		path.push(key.idx());
		if let RegularType::Record(record) = &schema[key].type_ {
			for field in &record.fields {
				visit(schema, field.type_, marks, path)?;
			}
		}
		path.pop();
		marks[key.idx()] = Mark::Done;
		Ok(())
	}

	for idx in 0..schema.nodes().len() {
		if marks[idx] == Mark::Unvisited {
			visit(schema, SchemaKey::from_idx(idx), &mut marks, &mut path)
				.map_err(|cycle| SchemaError::msg(cycle))?;
		}
	}
	Ok(())
}
