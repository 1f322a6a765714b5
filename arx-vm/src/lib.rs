//! ARX virtual machine.
//!
//! Loads a `.arxmod` module and executes its instruction stream: data
//! stack and call-frame discipline, linear memory with a dedicated object
//! region, string objects, reference counting with an explicit sweep pass,
//! and class-registry-driven dynamic dispatch. Strictly single-threaded; a
//! VM instance owns all of its state.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod call;
pub mod consts;
mod error;
mod interpreter;
mod loader;
pub mod object;
pub mod registry;
mod state;

pub use error::VmFault;
pub use interpreter::{Interpreter, VmParams};
pub use loader::ModuleImage;
pub use object::{CollectStats, ObjectEntry, ObjectHandle, ObjectManager};
pub use state::{ExecuteState, VmState};
