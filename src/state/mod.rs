//! Live model of the traced program's memory-relevant state.
//!
//! The recorder cannot see the traced program's symbol table; everything it
//! knows about scoping and aliasing is reconstructed here from the flat,
//! ordered notification stream:
//!
//! - [`scopes`] - call-frame stack, pointer bindings, scope-chain resolution
//! - [`variables`] - scalar variables and their last known values
//! - [`arrays`] - array descriptors and the per-element dedup cache
//!
//! None of these registries synchronizes internally or emits events; they
//! answer "what does this notification refer to, and is it a change?" for
//! the recorder, which owns the single critical section and the sink.

pub mod arrays;
pub mod scopes;
pub mod variables;

pub use arrays::{ArrayDescriptor, ArrayId, ArrayRegistry, ElementKey, MAX_DIMS, UNUSED_INDEX};
pub use scopes::{
    BindingOrigin, BindingVisibility, CallFrame, PointerBinding, PointerTarget, ScopeRegistry,
    TOP_LEVEL,
};
pub use variables::{VariableRecord, VariableTracker};
