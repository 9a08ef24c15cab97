//! Top-level facade crate for Vigil.
//!
//! Re-exports the core primitives and the gateway library so users can depend on a single crate.

pub mod core {
    pub use vigil_core::*;
}

pub mod gateway {
    pub use vigil_gateway::*;
}
