use std::error::Error;

use vergen_gitcl::{CargoBuilder, Emitter, GitclBuilder};

fn main() -> Result<(), Box<dyn Error>> {
	let cargo = CargoBuilder::all_cargo()?;
	let gitcl = GitclBuilder::default().sha(true).build()?;

	// Without a git checkout the sha falls back to the idempotent placeholder.
	Emitter::default().add_instructions(&cargo)?.add_instructions(&gitcl)?.emit()?;

	Ok(())
}
