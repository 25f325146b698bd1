//! # stepscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used
//! types from the stepscope library. Import this module to get quick access
//! to the essential types for recording and reading execution traces.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all stepscope operations
pub use crate::Error;

/// The result type used by sink lifecycle operations
pub use crate::Result;

// ================================================================================================
// Main Entry Point
// ================================================================================================

/// The synchronized front door every probe calls
pub use crate::recorder::Recorder;

// ================================================================================================
// Event Model
// ================================================================================================

/// The immutable, emitted unit of trace output
pub use crate::event::Event;

/// Discriminant for every notification kind
pub use crate::event::EventKind;

/// Kind-specific event payload fields
pub use crate::event::EventBody;

/// Normalized file/line origin of a notification
pub use crate::event::SourceLocation;

/// Stack vs. heap placement of a traced array
pub use crate::event::StorageClass;

/// Tagged scalar union for recorded runtime values
pub use crate::event::TracedValue;

// ================================================================================================
// Aliasing Vocabulary
// ================================================================================================

/// What a pointer name currently refers to
pub use crate::state::scopes::PointerTarget;

/// Frame-local vs. process-wide binding placement
pub use crate::state::scopes::BindingVisibility;

/// How a pointer binding came to exist
pub use crate::state::scopes::BindingOrigin;
