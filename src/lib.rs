//! wldkit - WLD world file toolkit
//!
//! Three layers, each a faithful codec for the one below it:
//!
//! - [`raw`]: the binary fragment stream. A [`raw::WldRaw`] holds the
//!   envelope header, the obfuscated name table and every fragment slot
//!   in file order, and re-encodes byte-compatibly.
//! - [`world`]: the tag-addressed logical graph. Stream positions become
//!   tag strings, instance wrappers are folded away, quantized geometry
//!   becomes `f32`.
//! - [`wce`]: the human-editable ASCII script form, written as a root
//!   file plus per-model satellite files.
//!
//! ```no_run
//! use wldkit::archive::DirArchive;
//! use wldkit::wce::WceWriter;
//! use wldkit::world::World;
//!
//! # fn main() -> wldkit::Result<()> {
//! let bytes = std::fs::read("gfaydark.wld")?;
//! let world = World::from_bytes(&bytes)?;
//! let mut out = DirArchive::new("gfaydark_src")?;
//! WceWriter::write(&world, &mut out, "gfaydark.wce")?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod error;
pub mod quant;
pub mod raw;
pub mod wce;
pub mod world;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
