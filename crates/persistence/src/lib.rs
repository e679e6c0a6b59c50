#![deny(warnings)]

//! File I/O (C9): readers for the process-library/blocks/netlist text files
//! (§6.1) and writers for the per-run output files (§6.2).

pub mod error;
pub mod read;
pub mod write;

pub use error::{PersistenceError, PersistenceResult};

use sim_core::netlist::{Block, ConnectivityGraph};
use sim_econ::Library;
use std::collections::BTreeMap;
use std::path::Path;

/// Loads a process library from a directory holding `wafer.txt`,
/// `assembly.txt`, `layer.txt`, `io.txt`, and an optional `test.txt`.
pub fn load_library(library_dir: impl AsRef<Path>) -> PersistenceResult<Library> {
    let dir = library_dir.as_ref();
    let wafer_process = read::read_wafer_process(dir.join("wafer.txt"))?;
    let assembly_process = read::read_assembly_process(dir.join("assembly.txt"))?;
    let layers_by_tech = read::read_layers(dir.join("layer.txt"))?;
    let ios = if dir.join("io.txt").exists() { read::read_ios(dir.join("io.txt"))? } else { BTreeMap::new() };
    let test_process = if dir.join("test.txt").exists() { read::read_test_process(dir.join("test.txt"))? } else { None };

    tracing::info!(tech_nodes = layers_by_tech.len(), io_types = ios.len(), "process library loaded");
    Ok(Library { wafer_process, assembly_process, test_process, layers_by_tech, ios })
}

/// Loads the blocks and netlist files for one run, validating the netlist's
/// declared block order against the blocks file.
pub fn load_netlist_inputs(blocks_path: impl AsRef<Path>, netlist_path: impl AsRef<Path>) -> PersistenceResult<(Vec<Block>, ConnectivityGraph)> {
    let blocks = read::read_blocks(blocks_path)?;
    let block_names: Vec<String> = blocks.iter().map(|b| b.name.clone()).collect();
    let connectivity = read::read_netlist(netlist_path, &block_names)?;
    tracing::info!(blocks = blocks.len(), "netlist loaded");
    Ok((blocks, connectivity))
}
