#![doc(html_no_source)]
#![deny(missing_docs)]

//! # stepscope
//!
//! A thread-safe execution-trace state engine: it receives a stream of
//! low-level probe notifications from an instrumented program (function
//! entry/exit, variable declaration/assignment, array creation/mutation,
//! pointer aliasing, heap allocation/free, control-flow markers) and turns
//! them into a structured, ordered JSON event log that a downstream
//! visualizer replays to show the program's memory state evolving line by
//! line.
//!
//! ## Features
//!
//! - **Scope reconstruction** - rebuilds lexical scoping and pointer
//!   aliasing from the flat notification stream alone, with no access to
//!   the traced program's symbol table
//! - **Dense total ordering** - every event carries a gap-free sequence id
//!   assigned under a single critical section, valid from any number of
//!   concurrently probing threads
//! - **Redundancy suppression** - repeated writes of an unchanged value to
//!   the same array element emit nothing
//! - **Crash-tolerant output** - every event is flushed as it is written,
//!   so a killed process leaves a useful document prefix
//! - **Invisible by contract** - probes never fail, never panic outward,
//!   and become silent no-ops whenever the sink is unavailable
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stepscope::prelude::*;
//!
//! let recorder = Recorder::new();
//! recorder.open(std::path::Path::new("trace.json"))?;
//!
//! let loc = SourceLocation::new("demo.c", 5);
//! recorder.function_enter("main", loc.clone());
//! recorder.declare("total", "int", loc.clone());
//! recorder.assign("total", TracedValue::Int(0), loc.clone());
//! recorder.function_exit("main", loc);
//! recorder.close();
//! # Ok::<(), stepscope::Error>(())
//! ```
//!
//! Probe shims that cannot carry a handle (compiler-inserted hooks,
//! allocator overrides) use the process-wide instance instead:
//!
//! ```rust,no_run
//! use stepscope::{Recorder, SourceLocation};
//!
//! Recorder::global().heap_alloc(0x7f00_1000, 64, "malloc", SourceLocation::unknown());
//! ```
//!
//! ## Architecture
//!
//! Data flows one direction: probe → [`Recorder`] front door → state
//! trackers → sink. No component calls back into an earlier one.
//!
//! - [`recorder`] - the synchronized front door; sequencing and dispatch
//! - [`state`] - live model of scopes, variables, pointers and arrays
//! - [`event`] - the immutable event model and its wire format
//! - [`sink`] - append-only JSON document writer
//!
//! ## Ordering Contract
//!
//! Sequence ids in the output are strictly increasing and gap-free; that is
//! the only ordering guarantee consumers may rely on. Timestamps are
//! best-effort wall-clock microseconds and may tie under coarse clocks.
//!
//! ## Error Handling
//!
//! Tracing must never alter or abort the traced program, so the probe
//! surface returns nothing and degrades to silent no-ops when the sink is
//! unavailable. Only host-facing lifecycle calls return [`Result`].

pub mod event;
pub mod recorder;
pub mod sink;
pub mod state;

pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use stepscope::prelude::*;
///
/// let recorder = Recorder::new();
/// recorder.open(std::path::Path::new("trace.json"))?;
/// # Ok::<(), stepscope::Error>(())
/// ```
pub mod prelude;

/// `stepscope` Result type.
///
/// A type alias for [`std::result::Result<T, Error>`] used by the
/// host-facing lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `stepscope` Error type.
///
/// Returned only by sink lifecycle operations; the probe surface itself is
/// infallible by contract.
pub use error::Error;

/// The trace state engine's synchronized entry point.
///
/// See [`recorder::Recorder`] for the full notification surface.
pub use recorder::Recorder;

/// Event model types most consumers need when reading a trace back.
pub use event::{Event, EventBody, EventKind, SourceLocation, StorageClass, TracedValue};

/// Pointer-binding vocabulary used by the aliasing probes.
pub use state::scopes::{BindingOrigin, BindingVisibility, PointerTarget};
