//! Call-frame stack and pointer-alias resolution.
//!
//! This module reconstructs the lexical scoping of the traced program from
//! the order in which `function_enter`/`function_exit`/`bind` notifications
//! arrive, with no access to the program's compiler-level symbol table.
//!
//! # Resolution Algorithm
//!
//! Pointer names resolve through an explicit scope chain: the current frame
//! is searched first, then each enclosing frame outward, then a process-wide
//! table for globals and statics. The first match wins, so an inner binding
//! shadows an outer one with the same name until its frame is popped.
//!
//! Frames are pushed and popped in LIFO order on an explicit `Vec`, never by
//! recursing through host call stacks, so resolution depth is independent of
//! the host's stack limits.
//!
//! # Threading
//!
//! The registry has no internal synchronization; all mutation happens under
//! the recorder's single critical section, which gives it single-threaded
//! semantics.

use std::collections::HashMap;

use crate::event::format_address;

/// Name reported while no traced function is active.
pub const TOP_LEVEL: &str = "top level";

/// What a pointer name currently refers to.
///
/// Keeping the referent as an explicit, inspectable variant rather than a raw
/// address is what lets a dereference notification decide whether the write
/// lands on a named stack variable, a decayed array, or a heap object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    /// The pointer names another variable (created by address-of).
    Variable(String),
    /// The pointer names a heap object at this address.
    Heap(u64),
    /// The pointer decayed from an array and names its first element.
    Array(String),
}

impl PointerTarget {
    /// Wire name of the referent kind (`variable`, `heap`, `array`).
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            PointerTarget::Variable(_) => "variable",
            PointerTarget::Heap(_) => "heap",
            PointerTarget::Array(_) => "array",
        }
    }

    /// Referent identifier as it appears on the wire: a name, or a hex
    /// address for heap targets.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self {
            PointerTarget::Variable(name) | PointerTarget::Array(name) => name.clone(),
            PointerTarget::Heap(addr) => format_address(*addr),
        }
    }
}

/// How a pointer binding came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOrigin {
    /// `p = &x` style address-of aliasing.
    AddressOf,
    /// `p = arr` array-to-pointer decay.
    ArrayDecay,
    /// `p = malloc(...)` style heap allocation.
    HeapAlloc,
}

/// Whether a binding lives in the current frame or the process-wide table.
///
/// The distinction is supplied by the caller (the instrumentation knows
/// whether it emitted the probe for a global), never inferred here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingVisibility {
    /// Binding owned by the current call frame.
    Local,
    /// Binding visible from every frame (globals and statics).
    Global,
}

/// The current referent of one pointer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerBinding {
    /// Pointer name as reported by the probe.
    pub name: String,
    /// Current referent.
    pub target: PointerTarget,
    /// How the binding was created.
    pub origin: BindingOrigin,
}

/// Live record of one function invocation's local pointer bindings.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Function name the frame belongs to.
    pub function: String,
    bindings: HashMap<String, PointerBinding>,
}

impl CallFrame {
    fn new(function: &str) -> Self {
        CallFrame {
            function: function.to_string(),
            bindings: HashMap::new(),
        }
    }

    /// Number of pointer bindings owned by this frame.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

/// Stack of call frames plus the process-wide binding table.
///
/// Owned exclusively by the recorder; frames are never shared or aliased.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    frames: Vec<CallFrame>,
    globals: HashMap<String, PointerBinding>,
}

impl ScopeRegistry {
    /// Creates an empty registry with no active frames.
    #[must_use]
    pub fn new() -> Self {
        ScopeRegistry::default()
    }

    /// Pushes a frame for an entered function and returns the new depth.
    pub fn push(&mut self, function: &str) -> u32 {
        self.frames.push(CallFrame::new(function));
        self.depth()
    }

    /// Pops the current frame and returns it, or `None` at top level.
    ///
    /// An exit notification with no matching enter (instrumentation attached
    /// mid-run) is the caller's problem to record; the registry just refuses
    /// to underflow.
    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Current call depth (number of active frames).
    #[must_use]
    pub fn depth(&self) -> u32 {
        u32::try_from(self.frames.len()).unwrap_or(u32::MAX)
    }

    /// Name of the function the current frame belongs to, or the
    /// [`TOP_LEVEL`] sentinel when the stack is empty.
    #[must_use]
    pub fn current_function(&self) -> &str {
        self.frames
            .last()
            .map_or(TOP_LEVEL, |frame| frame.function.as_str())
    }

    /// Inserts or overwrites a pointer binding.
    ///
    /// `Local` bindings land in the current frame (or the global table when
    /// no frame is active); `Global` bindings always land in the
    /// process-wide table.
    pub fn bind(&mut self, binding: PointerBinding, visibility: BindingVisibility) {
        match (visibility, self.frames.last_mut()) {
            (BindingVisibility::Local, Some(frame)) => {
                frame.bindings.insert(binding.name.clone(), binding);
            }
            _ => {
                self.globals.insert(binding.name.clone(), binding);
            }
        }
    }

    /// Resolves a pointer name to its most recent visible binding.
    ///
    /// Searches the current frame, then each enclosing frame outward, then
    /// the global table. Returns `None` if the name was never bound or every
    /// frame that bound it has been popped.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&PointerBinding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name))
            .or_else(|| self.globals.get(name))
    }
}
