#![deny(warnings)]

//! Core domain models for chiplet cost/yield analysis: the process library
//! (wafer/assembly/test/layer/IO records), the netlist model, and the chip
//! tree that ties them together into an evaluable design.

pub mod assembly;
pub mod chip;
pub mod error;
pub mod io;
pub mod layer;
pub mod netlist;
pub mod tech;
pub mod test_process;
pub mod wafer;

pub use assembly::Assembly;
pub use chip::{Chip, ChipSpec};
pub use error::{CoreError, CoreResult};
pub use io::Io;
pub use layer::Layer;
pub use netlist::{Block, ConnectivityGraph, Matrix};
pub use tech::TechNode;
pub use test_process::TestProcess;
pub use wafer::WaferProcess;
