//! gorepl library.
//!
//! The session model, program assembly, removal commands, toolchain driver
//! and the interactive controller behind the `gorepl` binary.

pub mod assemble;
pub mod colors;
pub mod config;
pub mod logging;
pub mod removal;
pub mod repl;
pub mod session;
pub mod toolchain;
