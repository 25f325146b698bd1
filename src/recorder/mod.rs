//! Notification front door: intake, sequencing and dispatch.
//!
//! [`Recorder`] is the single synchronized entry point every probe calls. It
//! owns all mutable engine state - the scope registry, the variable and
//! array trackers, and the sink - behind one `Mutex`, which is the sole
//! synchronization primitive in the system.
//!
//! # Ordering Guarantee
//!
//! Every operation acquires the critical section, assigns the next dense
//! sequence id and a microsecond timestamp, performs its state update, and
//! appends the resulting event(s) before releasing. At most one notification
//! is being processed at any instant system-wide: that is what makes the id
//! sequence dense and gives every tracker single-threaded semantics even
//! though callers are not single-threaded.
//!
//! The emitted order is a valid total order consistent with *some*
//! interleaving of the concurrent calls; it is not guaranteed to match
//! causal order across unrelated threads (two threads racing through an
//! allocator shim may have their `heap_alloc` events appear in either
//! order). The lock is bounded, non-recursive, and never held across a call
//! back into traced code.
//!
//! # Failure Policy
//!
//! If the sink is unavailable (never opened, already closed, or degraded
//! after a write failure), every probe operation is a silent no-op. The
//! guard lives here, at the single entry point, so the never-disturb-the-
//! traced-program contract is enforced in one place rather than scattered
//! through the trackers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stepscope::prelude::*;
//!
//! let recorder = Recorder::new();
//! recorder.open(std::path::Path::new("trace.json"))?;
//!
//! let loc = SourceLocation::new("demo.c", 3);
//! recorder.function_enter("main", loc.clone());
//! recorder.declare("x", "int", loc.clone());
//! recorder.assign("x", TracedValue::Int(42), loc.clone());
//! recorder.function_exit("main", loc);
//! recorder.close();
//! # Ok::<(), stepscope::Error>(())
//! ```

use std::{
    collections::BTreeSet,
    io::Write,
    path::Path,
    sync::{Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    event::{
        format_address, Event, EventBody, EventKind, SourceLocation, StorageClass, TracedValue,
    },
    sink::EventLog,
    state::{
        arrays::{ArrayRegistry, MAX_DIMS},
        scopes::{BindingOrigin, BindingVisibility, PointerBinding, PointerTarget, ScopeRegistry},
        variables::VariableTracker,
    },
    Result,
};

/// Everything the engine mutates, owned as one object behind one lock.
///
/// Cross-component communication is by value (names, ids, payloads); no
/// tracker retains a reference into another tracker's internals.
#[derive(Debug, Default)]
struct RecorderState {
    sequence: u64,
    scopes: ScopeRegistry,
    variables: VariableTracker,
    arrays: ArrayRegistry,
    log: EventLog,
    functions: BTreeSet<String>,
}

impl RecorderState {
    /// Builds one event, stamps it with the next sequence id, and appends it.
    ///
    /// `func` defaults to the current function, `depth` to the current call
    /// depth; function enter/exit override the latter to get the symmetric
    /// after-push / before-pop values.
    fn emit(
        &mut self,
        kind: EventKind,
        addr: Option<u64>,
        func: Option<&str>,
        depth: Option<u32>,
        loc: &SourceLocation,
        body: EventBody,
    ) {
        let event = Event {
            id: self.sequence,
            kind,
            addr: addr.map(format_address),
            func: func
                .map(str::to_string)
                .unwrap_or_else(|| self.scopes.current_function().to_string()),
            depth: depth.unwrap_or_else(|| self.scopes.depth()),
            ts: timestamp_micros(),
            file: loc.file.clone(),
            line: loc.line,
            body,
        };
        self.log.append(&event);
        self.sequence += 1;
    }
}

/// Wall-clock microseconds since the Unix epoch.
///
/// Timestamps may tie or even regress under coarse clocks; sequence-id order
/// is authoritative, not timestamp order.
fn timestamp_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// The trace state engine's synchronized entry point.
///
/// One operation per notification kind; every operation is synchronous,
/// bounded, and safe to call from any thread, including from inside an
/// allocator override triggered deep in unrelated code. See the
/// [module docs](self) for the ordering and failure contracts.
#[derive(Debug, Default)]
pub struct Recorder {
    state: Mutex<RecorderState>,
}

static GLOBAL: OnceLock<Recorder> = OnceLock::new();

impl Recorder {
    /// Creates an engine with no sink attached; probes are no-ops until
    /// [`Recorder::open`] succeeds.
    #[must_use]
    pub fn new() -> Self {
        Recorder::default()
    }

    /// Process-wide recorder instance for probe shims that cannot carry a
    /// handle (compiler-inserted hooks, allocator overrides).
    ///
    /// The instance starts unopened; the host is expected to call
    /// [`Recorder::open`] on it during startup and [`Recorder::close`] at
    /// shutdown.
    #[must_use]
    pub fn global() -> &'static Recorder {
        GLOBAL.get_or_init(Recorder::new)
    }

    /// Recovers the guard even if a traced thread panicked mid-notification;
    /// a poisoned lock must not disable tracing for everyone else.
    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Opens the output document at `destination`.
    ///
    /// Idempotent while open; a no-op after close.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the file cannot be created. Tracing
    /// simply stays disabled in that case.
    pub fn open(&self, destination: &Path) -> Result<()> {
        self.lock().log.open(destination)
    }

    /// Opens the output document over an arbitrary stream.
    ///
    /// Primarily for tests and embedded consumers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the document header cannot be written.
    pub fn open_stream(&self, stream: Box<dyn Write + Send>) -> Result<()> {
        self.lock().log.open_stream(stream)
    }

    /// Finalizes the document exactly once, inside the critical section so a
    /// close can never race an in-flight append.
    pub fn close(&self) {
        let mut state = self.lock();
        let functions: Vec<String> = state.functions.iter().cloned().collect();
        state.log.close(&functions);
    }

    /// Number of events written so far.
    #[must_use]
    pub fn events_recorded(&self) -> u64 {
        self.lock().log.written()
    }

    /// Current call depth (number of live frames).
    #[must_use]
    pub fn call_depth(&self) -> u32 {
        self.lock().scopes.depth()
    }

    /// Resolves a pointer name through the scope chain without recording
    /// anything. Diagnostic accessor; the result reflects the bindings as of
    /// the most recently processed notification.
    #[must_use]
    pub fn resolve_pointer(&self, name: &str) -> Option<PointerTarget> {
        self.lock()
            .scopes
            .resolve(name)
            .map(|binding| binding.target.clone())
    }

    // ------------------------------------------------------------------
    // Scalar variables
    // ------------------------------------------------------------------

    /// Records a variable declaration (value still null).
    pub fn declare(&self, name: &str, var_type: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.depth();
        state.variables.declare(name, var_type, depth);
        state.emit(
            EventKind::Declare,
            None,
            Some(name),
            None,
            &loc,
            EventBody::Declare {
                name: name.to_string(),
                var_type: var_type.to_string(),
                value: TracedValue::Null,
            },
        );
    }

    /// Records a variable assignment.
    ///
    /// Never suppressed: to a step-by-step visualizer a rewrite of an
    /// unchanged value is still a step the learner took.
    pub fn assign(&self, name: &str, value: TracedValue, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.depth();
        state.variables.assign(name, value.clone(), depth);
        state.emit(
            EventKind::Assign,
            None,
            Some(name),
            None,
            &loc,
            EventBody::Assign {
                name: name.to_string(),
                value,
            },
        );
    }

    /// Records a point-in-time value snapshot (the `TRACE_*` probe family).
    ///
    /// Unlike [`Recorder::assign`] this does not model a mutation; it simply
    /// reports what the probe saw, tagged with the value's kind.
    pub fn observe(&self, name: &str, value: TracedValue, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::Observe,
            None,
            Some(name),
            None,
            &loc,
            EventBody::Observe {
                name: name.to_string(),
                value_type: value.type_name(),
                value,
            },
        );
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// Records an array creation.
    ///
    /// `addr` is the array's runtime address as reported by the probe; it
    /// lands in the event's `addr` field while the registry tracks the array
    /// under a process-unique identity. `dims` carries 1-3 dimensions in
    /// source order; anything beyond three is ignored (the probe surface
    /// cannot express it), and malformed sizes pass through verbatim.
    pub fn array_create(
        &self,
        name: &str,
        base_type: &str,
        addr: u64,
        dims: &[u32],
        storage: StorageClass,
        loc: SourceLocation,
    ) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.depth();
        state.arrays.create(name, base_type, dims, storage, depth);
        state.emit(
            EventKind::ArrayCreate,
            Some(addr),
            Some(name),
            None,
            &loc,
            EventBody::ArrayCreate {
                name: name.to_string(),
                base_type: base_type.to_string(),
                dims: dims.iter().take(MAX_DIMS).copied().collect(),
                storage,
            },
        );
    }

    /// Records a whole-array initialization, one event per element.
    ///
    /// Each element's value seeds the dedup cache, so a subsequent explicit
    /// write of the same value to the same index is suppressed.
    pub fn array_bulk_init(&self, name: &str, values: &[i64], loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.depth();
        let id = state.arrays.resolve_or_intern(name, depth);
        for (index, &value) in values.iter().enumerate() {
            let index = i32::try_from(index).unwrap_or(i32::MAX);
            state.arrays.seed(id, &[index], value);
            state.emit(
                EventKind::ArrayIndexAssign,
                None,
                Some(name),
                None,
                &loc,
                EventBody::ArrayIndexAssign {
                    name: name.to_string(),
                    indices: vec![index],
                    value,
                    glyph: None,
                },
            );
        }
    }

    /// Records a string-literal initialization of a character array.
    ///
    /// The literal is expanded to one event per character plus an implicit
    /// terminating zero element. Each character is encoded as its integer
    /// code, with the literal glyph attached where printable. All elements
    /// seed the dedup cache.
    pub fn string_literal_init(&self, name: &str, literal: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.depth();
        let id = state.arrays.resolve_or_intern(name, depth);

        let codes = literal.chars().map(Some).chain(std::iter::once(None));
        for (index, ch) in codes.enumerate() {
            let index = i32::try_from(index).unwrap_or(i32::MAX);
            let value = ch.map_or(0, |c| i64::from(u32::from(c)));
            let glyph = ch
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .map(String::from);
            state.arrays.seed(id, &[index], value);
            state.emit(
                EventKind::ArrayIndexAssign,
                None,
                Some(name),
                None,
                &loc,
                EventBody::ArrayIndexAssign {
                    name: name.to_string(),
                    indices: vec![index],
                    value,
                    glyph,
                },
            );
        }
    }

    /// Records a single-element write, suppressing no-op rewrites.
    ///
    /// If the dedup cache already holds an identical value for this element
    /// no event is emitted and no sequence id is consumed. Out-of-shape
    /// indices are recorded verbatim - bounds are the traced program's own
    /// potential bug, faithfully reported.
    pub fn array_index_assign(&self, name: &str, indices: &[i32], value: i64, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.depth();
        let id = state.arrays.resolve_or_intern(name, depth);
        if !state.arrays.record_write(id, indices, value) {
            return;
        }
        state.emit(
            EventKind::ArrayIndexAssign,
            None,
            Some(name),
            None,
            &loc,
            EventBody::ArrayIndexAssign {
                name: name.to_string(),
                indices: indices.iter().take(MAX_DIMS).copied().collect(),
                value,
                glyph: None,
            },
        );
    }

    // ------------------------------------------------------------------
    // Pointers
    // ------------------------------------------------------------------

    /// Records a pointer aliasing a variable or a decayed array.
    ///
    /// The binding's origin follows from the target kind: a variable target
    /// is an address-of, an array target is a decay. Heap targets created by
    /// allocation go through [`Recorder::pointer_heap_bind`] instead; a heap
    /// target here records pointer arithmetic re-aliasing an existing
    /// object. Visibility is supplied by the caller - the instrumentation
    /// knows whether it probed a global - never inferred.
    pub fn pointer_alias(
        &self,
        name: &str,
        target: PointerTarget,
        visibility: BindingVisibility,
        loc: SourceLocation,
    ) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let origin = match &target {
            PointerTarget::Array(_) => BindingOrigin::ArrayDecay,
            _ => BindingOrigin::AddressOf,
        };
        self.bind_and_emit(
            &mut state,
            EventKind::PointerAlias,
            name,
            target,
            origin,
            visibility,
            &loc,
        );
    }

    /// Records a pointer receiving a freshly allocated heap address.
    pub fn pointer_heap_bind(
        &self,
        name: &str,
        addr: u64,
        visibility: BindingVisibility,
        loc: SourceLocation,
    ) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        self.bind_and_emit(
            &mut state,
            EventKind::PointerHeapBind,
            name,
            PointerTarget::Heap(addr),
            BindingOrigin::HeapAlloc,
            visibility,
            &loc,
        );
    }

    fn bind_and_emit(
        &self,
        state: &mut RecorderState,
        kind: EventKind,
        name: &str,
        target: PointerTarget,
        origin: BindingOrigin,
        visibility: BindingVisibility,
        loc: &SourceLocation,
    ) {
        let addr = match &target {
            PointerTarget::Heap(addr) => Some(*addr),
            _ => None,
        };
        let body = EventBody::PointerBind {
            name: name.to_string(),
            target_kind: target.kind_name(),
            target: target.identifier(),
        };
        state.scopes.bind(
            PointerBinding {
                name: name.to_string(),
                target,
                origin,
            },
            visibility,
        );
        state.emit(kind, addr, Some(name), None, loc, body);
    }

    /// Records a write through a pointer, resolving what it lands on.
    ///
    /// - heap target: a `heap_write` event keyed by the heap address;
    /// - named variable: a forwarded `assign` for that variable, updating
    ///   its last-known value (no separate dereference event);
    /// - decayed array: a first-element write through the array tracker,
    ///   subject to the same dedup as any other element write;
    /// - unresolved (never bound, or its frame already popped): the event is
    ///   still emitted, tagged `unresolved` - the tracer reports the traced
    ///   program's bugs, it does not validate them.
    pub fn pointer_deref_write(&self, name: &str, value: i64, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let target = state
            .scopes
            .resolve(name)
            .map(|binding| binding.target.clone());

        match target {
            Some(PointerTarget::Heap(addr)) => {
                state.emit(
                    EventKind::HeapWrite,
                    Some(addr),
                    Some(name),
                    None,
                    &loc,
                    EventBody::HeapWrite {
                        ptr: name.to_string(),
                        value,
                    },
                );
            }
            Some(PointerTarget::Variable(variable)) => {
                let depth = state.scopes.depth();
                state
                    .variables
                    .assign(&variable, TracedValue::Int(value), depth);
                state.emit(
                    EventKind::Assign,
                    None,
                    Some(variable.as_str()),
                    None,
                    &loc,
                    EventBody::Assign {
                        name: variable.clone(),
                        value: TracedValue::Int(value),
                    },
                );
            }
            Some(PointerTarget::Array(array)) => {
                let depth = state.scopes.depth();
                let id = state.arrays.resolve_or_intern(&array, depth);
                if state.arrays.record_write(id, &[0], value) {
                    state.emit(
                        EventKind::ArrayIndexAssign,
                        None,
                        Some(array.as_str()),
                        None,
                        &loc,
                        EventBody::ArrayIndexAssign {
                            name: array.clone(),
                            indices: vec![0],
                            value,
                            glyph: None,
                        },
                    );
                }
            }
            None => {
                log::debug!("dereference through unresolved pointer '{name}'");
                state.emit(
                    EventKind::PointerDerefWrite,
                    None,
                    Some(name),
                    None,
                    &loc,
                    EventBody::PointerDerefWrite {
                        name: name.to_string(),
                        value,
                        unresolved: true,
                    },
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Call frames
    // ------------------------------------------------------------------

    /// Records a function entry; the event carries the depth after the push.
    pub fn function_enter(&self, name: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.push(name);
        state.functions.insert(name.to_string());
        state.emit(
            EventKind::FuncEnter,
            None,
            Some(name),
            Some(depth),
            &loc,
            EventBody::Empty {},
        );
    }

    /// Records a function exit; the event carries the depth before the pop.
    ///
    /// The popped frame's pointer bindings die with it, and stack arrays it
    /// owned are retired from the dedup cache. An exit with no matching
    /// enter (instrumentation attached mid-run) is recorded at depth 0 and
    /// pops nothing.
    pub fn function_exit(&self, name: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        let depth = state.scopes.depth();
        state.emit(
            EventKind::FuncExit,
            None,
            Some(name),
            Some(depth),
            &loc,
            EventBody::Empty {},
        );
        if state.scopes.pop().is_some() {
            state.arrays.retire_frame(depth);
        }
    }

    // ------------------------------------------------------------------
    // Heap
    // ------------------------------------------------------------------

    /// Records a heap allocation reported by an allocator shim.
    ///
    /// `allocator` names the entry point that produced the block (`malloc`,
    /// `operator new`, …) and is carried in the event's `func` field.
    pub fn heap_alloc(&self, addr: u64, size: u64, allocator: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::HeapAlloc,
            Some(addr),
            Some(allocator),
            None,
            &loc,
            EventBody::HeapAlloc { size },
        );
    }

    /// Records a heap release reported by an allocator shim.
    pub fn heap_free(&self, addr: u64, allocator: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::HeapFree,
            Some(addr),
            Some(allocator),
            None,
            &loc,
            EventBody::Empty {},
        );
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    /// Records a control-flow marker (`if`, `else`, `switch`, …).
    pub fn control_flow(&self, control_type: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::ControlFlow,
            None,
            None,
            None,
            &loc,
            EventBody::ControlFlow {
                control_type: control_type.to_string(),
            },
        );
    }

    /// Records that a loop construct was reached.
    pub fn loop_start(&self, loop_id: u32, loop_type: &str, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::LoopStart,
            None,
            None,
            None,
            &loc,
            EventBody::LoopStart {
                loop_id,
                loop_type: loop_type.to_string(),
            },
        );
    }

    /// Records the outcome of a loop condition evaluation.
    pub fn loop_condition(&self, loop_id: u32, outcome: bool, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::LoopCondition,
            None,
            None,
            None,
            &loc,
            EventBody::LoopCondition { loop_id, outcome },
        );
    }

    /// Records the start of a loop body iteration.
    pub fn loop_body_start(&self, loop_id: u32, loc: SourceLocation) {
        self.loop_marker(EventKind::LoopBodyStart, loop_id, loc);
    }

    /// Records the end of a loop body iteration.
    pub fn loop_iteration_end(&self, loop_id: u32, loc: SourceLocation) {
        self.loop_marker(EventKind::LoopIterationEnd, loop_id, loc);
    }

    /// Records that a loop construct was left.
    pub fn loop_end(&self, loop_id: u32, loc: SourceLocation) {
        self.loop_marker(EventKind::LoopEnd, loop_id, loc);
    }

    fn loop_marker(&self, kind: EventKind, loop_id: u32, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(kind, None, None, None, &loc, EventBody::LoopMarker { loop_id });
    }

    /// Records a function return and the value it produced.
    ///
    /// `destination` names the caller-side variable receiving the result
    /// when the instrumentation knows it.
    pub fn function_return(
        &self,
        value: TracedValue,
        return_type: &str,
        destination: Option<&str>,
        loc: SourceLocation,
    ) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::Return,
            None,
            None,
            None,
            &loc,
            EventBody::Return {
                value,
                return_type: return_type.to_string(),
                destination: destination.map(str::to_string),
            },
        );
    }

    /// Records entry into a lexical block.
    pub fn block_enter(&self, block_depth: u32, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::BlockEnter,
            None,
            None,
            None,
            &loc,
            EventBody::Block { block_depth },
        );
    }

    /// Records exit from a lexical block.
    pub fn block_exit(&self, block_depth: u32, loc: SourceLocation) {
        let mut state = self.lock();
        if !state.log.is_open() {
            return;
        }
        state.emit(
            EventKind::BlockExit,
            None,
            None,
            None,
            &loc,
            EventBody::Block { block_depth },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    use crate::{
        event::{SourceLocation, TracedValue},
        recorder::Recorder,
        state::scopes::{BindingVisibility, PointerTarget},
    };

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn opened_recorder() -> (Recorder, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let recorder = Recorder::new();
        recorder.open_stream(Box::new(buffer.clone())).unwrap();
        (recorder, buffer)
    }

    fn loc() -> SourceLocation {
        SourceLocation::new("test.c", 1)
    }

    fn events(recorder: &Recorder, buffer: &SharedBuffer) -> Vec<serde_json::Value> {
        recorder.close();
        let document: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
        document["events"].as_array().unwrap().clone()
    }

    #[test]
    fn test_probes_are_no_ops_before_open() {
        let recorder = Recorder::new();
        recorder.function_enter("main", loc());
        recorder.assign("x", TracedValue::Int(1), loc());
        assert_eq!(recorder.events_recorded(), 0);
        // No state mutated either: the frame stack never grew.
        assert_eq!(recorder.call_depth(), 0);
    }

    #[test]
    fn test_sequence_ids_are_dense_across_suppression() {
        let (recorder, buffer) = opened_recorder();
        recorder.array_index_assign("arr", &[2], 5, loc());
        recorder.array_index_assign("arr", &[2], 5, loc()); // suppressed
        recorder.assign("x", TracedValue::Int(1), loc());

        let events = events(&recorder, &buffer);
        let ids: Vec<u64> = events.iter().map(|e| e["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_enter_exit_depths_are_symmetric() {
        let (recorder, buffer) = opened_recorder();
        recorder.function_enter("main", loc());
        recorder.function_enter("helper", loc());
        recorder.function_exit("helper", loc());
        recorder.function_exit("main", loc());

        let events = events(&recorder, &buffer);
        let depths: Vec<u64> = events.iter().map(|e| e["depth"].as_u64().unwrap()).collect();
        assert_eq!(depths, vec![1, 2, 2, 1]);
    }

    #[test]
    fn test_heap_deref_emits_heap_write_only() {
        let (recorder, buffer) = opened_recorder();
        recorder.function_enter("main", loc());
        recorder.pointer_heap_bind("p", 0x5000, BindingVisibility::Local, loc());
        recorder.pointer_deref_write("p", 42, loc());

        let events = events(&recorder, &buffer);
        let write = events.last().unwrap();
        assert_eq!(write["type"], "heap_write");
        assert_eq!(write["addr"], "0x5000");
        assert_eq!(write["value"], 42);
        assert!(!events.iter().any(|e| e["type"] == "assign"));
    }

    #[test]
    fn test_variable_deref_forwards_assign() {
        let (recorder, buffer) = opened_recorder();
        recorder.function_enter("main", loc());
        recorder.declare("x", "int", loc());
        recorder.pointer_alias(
            "p",
            PointerTarget::Variable("x".into()),
            BindingVisibility::Local,
            loc(),
        );
        recorder.pointer_deref_write("p", 7, loc());

        let events = events(&recorder, &buffer);
        let assign = events.last().unwrap();
        assert_eq!(assign["type"], "assign");
        assert_eq!(assign["name"], "x");
        assert_eq!(assign["value"], 7);
    }

    #[test]
    fn test_unresolved_deref_is_recorded_not_fatal() {
        let (recorder, buffer) = opened_recorder();
        recorder.pointer_deref_write("q", 7, loc());
        // Processing continues normally afterwards.
        recorder.assign("x", TracedValue::Int(1), loc());

        let events = events(&recorder, &buffer);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["type"], "pointer_deref_write");
        assert_eq!(events[0]["unresolved"], true);
    }

    #[test]
    fn test_string_literal_expansion() {
        let (recorder, buffer) = opened_recorder();
        recorder.string_literal_init("s", "AB", loc());

        let events = events(&recorder, &buffer);
        assert_eq!(events.len(), 3);
        let values: Vec<i64> = events.iter().map(|e| e["value"].as_i64().unwrap()).collect();
        assert_eq!(values, vec![65, 66, 0]);
        assert_eq!(events[0]["glyph"], "A");
        // The terminator has no printable glyph.
        assert!(events[2].get("glyph").is_none());
    }

    #[test]
    fn test_scope_chain_resolution_through_recorder() {
        let (recorder, _buffer) = opened_recorder();
        recorder.function_enter("outer", loc());
        recorder.pointer_alias(
            "p",
            PointerTarget::Variable("x".into()),
            BindingVisibility::Local,
            loc(),
        );
        recorder.function_enter("inner", loc());
        recorder.pointer_alias(
            "p",
            PointerTarget::Variable("y".into()),
            BindingVisibility::Local,
            loc(),
        );

        assert_eq!(
            recorder.resolve_pointer("p"),
            Some(PointerTarget::Variable("y".into()))
        );
        recorder.function_exit("inner", loc());
        assert_eq!(
            recorder.resolve_pointer("p"),
            Some(PointerTarget::Variable("x".into()))
        );
    }

    #[test]
    fn test_global_recorder_is_a_singleton() {
        let first: *const Recorder = Recorder::global();
        let second: *const Recorder = Recorder::global();
        assert_eq!(first, second);
    }
}
