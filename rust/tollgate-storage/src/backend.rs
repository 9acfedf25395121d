mod memory;
pub use memory::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod local;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use local::*;
