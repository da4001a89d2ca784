//! Command-line interface for the WLD toolkit.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::archive::DirArchive;
use crate::raw::WldRaw;
use crate::wce::{WceReader, WceWriter};
use crate::world::World;

#[derive(Subcommand)]
pub enum Commands {
    /// Unpack a binary WLD file into a directory of WCE scripts
    Unpack {
        /// Source WLD file
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory
        #[arg(short, long)]
        destination: PathBuf,
    },

    /// Pack a WCE script set back into a binary WLD file
    Pack {
        /// Root WCE script
        #[arg(short, long)]
        source: PathBuf,

        /// Output WLD file
        #[arg(short, long)]
        destination: PathBuf,
    },

    /// Summarize a WLD file's envelope and contents
    Info {
        /// WLD file
        #[arg(short, long)]
        source: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Unpack { source, destination } => unpack(source, destination),
            Commands::Pack { source, destination } => pack(source, destination),
            Commands::Info { source } => info(source),
        }
    }
}

fn root_script_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map_or_else(|| "world".to_string(), |s| s.to_string_lossy().to_string());
    format!("{stem}.wce")
}

fn unpack(source: &Path, destination: &Path) -> anyhow::Result<()> {
    println!("Unpacking {} to {}", source.display(), destination.display());
    let bytes = std::fs::read(source)?;
    let world = World::from_bytes(&bytes)?;
    let mut archive = DirArchive::new(destination)?;
    let root = root_script_name(source);
    WceWriter::write(&world, &mut archive, &root)?;
    println!("Wrote {} records, root script {root}", world.record_count());
    Ok(())
}

fn pack(source: &Path, destination: &Path) -> anyhow::Result<()> {
    println!("Packing {} into {}", source.display(), destination.display());
    let dir = source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let root = source
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("source has no file name"))?
        .to_string_lossy();
    let archive = DirArchive::new(dir)?;
    let world = WceReader::read(&archive, &root)?;
    std::fs::write(destination, world.to_bytes()?)?;
    println!("Wrote {} records", world.record_count());
    Ok(())
}

fn info(source: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(source)?;
    let raw = WldRaw::from_bytes(&bytes)?;
    let decoded = raw.fragments.iter().flatten().count();
    println!("{}", source.display());
    println!("  version:       {:?}", raw.version);
    println!("  fragments:     {} ({} decoded)", raw.fragments.len(), decoded);
    println!("  regions:       {}", raw.region_count);
    println!("  name strings:  {}", raw.string_count);

    let world = World::from_raw(&raw)?;
    println!("  records:       {}", world.record_count());
    println!(
        "  meshes: {}  skeletons: {}  materials: {}  actors: {}+{}",
        world.meshes.len(),
        world.skeletons.len(),
        world.materials.len(),
        world.actor_defs.len(),
        world.actor_insts.len()
    );
    Ok(())
}
