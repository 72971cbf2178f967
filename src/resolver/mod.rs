//! Resolution engine
//!
//! In-process replacement for a module framework's resolver: given a
//! [`ResolveContext`](crate::traits::ResolveContext), produce the wires that
//! satisfy the mandatory modules.

pub mod context;
pub mod engine;
pub mod wire;

pub use context::OrderingContext;
pub use engine::{Resolution, ResolutionEngine};
pub use wire::Wire;
