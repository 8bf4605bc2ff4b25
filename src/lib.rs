//! `dxbridge` ties together the shader analysis pass ([`dxbc`]) and the compute pipeline
//! specialization/caching engine ([`pipeline`]).
//!
//! Most users depend on the member crates directly; this umbrella crate exists so the
//! workspace-level integration tests under `tests/` can exercise both halves together.

pub use dxbridge_dxbc as dxbc;
pub use dxbridge_pipeline as pipeline;
