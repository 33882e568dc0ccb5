//! Shared core: compiles for native and wasm alike.

pub mod abi;
pub mod chain;
pub mod entry;
pub mod errors;
pub mod paths;
