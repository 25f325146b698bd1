//! Event model for the trace log.
//!
//! This module defines the immutable unit of trace output, [`Event`], together
//! with the supporting value types that appear inside event payloads:
//!
//! - [`EventKind`] - the tag identifying what a notification reported
//! - [`EventBody`] - the kind-specific payload fields
//! - [`TracedValue`] - tagged scalar union for recorded runtime values
//! - [`SourceLocation`] - normalized file/line origin of a notification
//! - [`StorageClass`] - stack vs. heap placement of a traced array
//!
//! Events are created exclusively by the recorder's front door, which assigns
//! the dense sequence id and the microsecond timestamp, and are serialized to
//! the sink immediately after creation. Once emitted, an event is never
//! mutated or reordered; sequence-id order is the only ordering guarantee a
//! consumer may rely on (timestamps can tie under coarse clocks).
//!
//! # Wire Format
//!
//! Every event serializes to a single JSON object with a fixed leading field
//! set (`id`, `type`, `addr`, `func`, `depth`, `ts`, `file`, `line`) followed
//! by the kind-specific fields of its [`EventBody`]:
//!
//! ```json
//! {"id":3,"type":"assign","addr":null,"func":"main","depth":1,
//!  "ts":1714670000123456,"file":"src/main.c","line":12,"name":"x","value":42}
//! ```

use serde::{Serialize, Serializer};
use strum::Display;

/// Formats a raw machine address the way it appears on the wire (`0x…`).
///
/// Addresses are embedded as strings rather than numbers so that 64-bit
/// values survive consumers that parse JSON numbers as doubles.
#[must_use]
pub fn format_address(addr: u64) -> String {
    format!("{addr:#x}")
}

/// Source position a notification originated from.
///
/// Paths are normalized to forward slashes on construction so that host
/// platform separators never reach the output document unescaped
/// (`C:\src\main.c` becomes `C:/src/main.c`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Normalized file path of the traced source file.
    pub file: String,
    /// 1-based line number within `file`.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a location, normalizing any backslash separators in `file`.
    #[must_use]
    pub fn new(file: &str, line: u32) -> Self {
        SourceLocation {
            file: file.replace('\\', "/"),
            line,
        }
    }

    /// Placeholder location for probes that carry no source information.
    #[must_use]
    pub fn unknown() -> Self {
        SourceLocation {
            file: String::from("unknown"),
            line: 0,
        }
    }
}

/// A recorded runtime value, tagged by kind.
///
/// The tracker keeps the last known value of every variable as one of these
/// so that later notifications (pointer dereferences in particular) can be
/// resolved against it. On the wire the tag disappears: integers and floats
/// serialize as JSON numbers, addresses as `0x…` strings, strings as JSON
/// strings and `Null` as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum TracedValue {
    /// Signed 64-bit integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Raw machine address, rendered as a hex string.
    Addr(u64),
    /// String value (quotes and escapes are handled by the serializer).
    Str(String),
    /// Declared-but-unassigned marker.
    Null,
}

impl TracedValue {
    /// Human-readable name of the value's kind, used in `observe` payloads.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            TracedValue::Int(_) => "int",
            TracedValue::Float(_) => "double",
            TracedValue::Addr(_) => "pointer",
            TracedValue::Str(_) => "string",
            TracedValue::Null => "null",
        }
    }
}

impl Serialize for TracedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TracedValue::Int(v) => serializer.serialize_i64(*v),
            TracedValue::Float(v) => serializer.serialize_f64(*v),
            TracedValue::Addr(a) => serializer.serialize_str(&format_address(*a)),
            TracedValue::Str(s) => serializer.serialize_str(s),
            TracedValue::Null => serializer.serialize_none(),
        }
    }
}

impl From<i64> for TracedValue {
    fn from(v: i64) -> Self {
        TracedValue::Int(v)
    }
}

impl From<f64> for TracedValue {
    fn from(v: f64) -> Self {
        TracedValue::Float(v)
    }
}

impl From<&str> for TracedValue {
    fn from(v: &str) -> Self {
        TracedValue::Str(v.to_string())
    }
}

/// Where a traced array's backing storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageClass {
    /// Automatic storage owned by a call frame.
    Stack,
    /// Dynamically allocated storage, released by an explicit free.
    Heap,
}

/// Discriminant for every notification kind the engine can record.
///
/// The serialized form (`func_enter`, `array_index_assign`, …) is the `type`
/// field consumers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// Scalar variable declaration (value still null).
    Declare,
    /// Scalar variable assignment, including rewrites of an unchanged value.
    Assign,
    /// Point-in-time value snapshot from a `TRACE_*`-style probe.
    Observe,
    /// Array creation with shape and storage class.
    ArrayCreate,
    /// Write to a single array element (deduplicated).
    ArrayIndexAssign,
    /// Pointer bound to a variable or a decayed array.
    PointerAlias,
    /// Pointer bound to a freshly allocated heap address.
    PointerHeapBind,
    /// Write through a pointer whose target could not be resolved.
    PointerDerefWrite,
    /// Write through a pointer that resolved to a heap object.
    HeapWrite,
    /// Function entry; depth is the value after the push.
    FuncEnter,
    /// Function exit; depth is the value before the pop.
    FuncExit,
    /// Heap allocation reported by an allocator shim.
    HeapAlloc,
    /// Heap release reported by an allocator shim.
    HeapFree,
    /// Generic control-flow marker (if/else/switch branch taken).
    ControlFlow,
    /// A loop construct was reached.
    LoopStart,
    /// A loop condition was evaluated.
    LoopCondition,
    /// A loop body iteration began.
    LoopBodyStart,
    /// A loop body iteration finished.
    LoopIterationEnd,
    /// A loop construct was left.
    LoopEnd,
    /// Function return with the produced value.
    Return,
    /// A lexical block was entered.
    BlockEnter,
    /// A lexical block was left.
    BlockExit,
}

/// Kind-specific payload fields, flattened into the event object.
///
/// Serialization is untagged: only the variant's own fields appear on the
/// wire, next to the fixed leading fields of [`Event`]. The `type` field of
/// the enclosing event identifies which variant was written.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventBody {
    /// Payload for [`EventKind::Declare`].
    Declare {
        /// Variable name.
        name: String,
        /// Declared type as reported by the probe.
        #[serde(rename = "varType")]
        var_type: String,
        /// Always null at declaration time.
        value: TracedValue,
    },
    /// Payload for [`EventKind::Assign`].
    Assign {
        /// Variable name.
        name: String,
        /// Assigned value.
        value: TracedValue,
    },
    /// Payload for [`EventKind::Observe`].
    Observe {
        /// Variable name.
        name: String,
        /// Observed value.
        value: TracedValue,
        /// Kind of the observed value (`int`, `double`, `pointer`, `string`).
        #[serde(rename = "valueType")]
        value_type: &'static str,
    },
    /// Payload for [`EventKind::ArrayCreate`].
    ArrayCreate {
        /// Array name.
        name: String,
        /// Element base type as reported by the probe.
        #[serde(rename = "baseType")]
        base_type: String,
        /// Declared dimensions, 1-3 entries, trailing absent dims omitted.
        dims: Vec<u32>,
        /// Stack or heap placement.
        storage: StorageClass,
    },
    /// Payload for [`EventKind::ArrayIndexAssign`].
    ArrayIndexAssign {
        /// Array name.
        name: String,
        /// Indices in source order, 1-3 entries.
        indices: Vec<i32>,
        /// Stored element value.
        value: i64,
        /// Printable glyph for character elements, when one exists.
        #[serde(skip_serializing_if = "Option::is_none")]
        glyph: Option<String>,
    },
    /// Payload for [`EventKind::PointerAlias`] and
    /// [`EventKind::PointerHeapBind`].
    PointerBind {
        /// Pointer name.
        name: String,
        /// What the pointer now refers to: `variable`, `array` or `heap`.
        #[serde(rename = "targetKind")]
        target_kind: &'static str,
        /// Referent identifier: a variable/array name, or a hex address.
        target: String,
    },
    /// Payload for [`EventKind::PointerDerefWrite`] (unresolved target).
    PointerDerefWrite {
        /// Pointer name as reported; it never resolved to a live binding.
        name: String,
        /// Value the traced program wrote through the pointer.
        value: i64,
        /// Recorded-as-observed marker; always true for this payload.
        unresolved: bool,
    },
    /// Payload for [`EventKind::HeapWrite`].
    HeapWrite {
        /// Pointer name the write went through.
        ptr: String,
        /// Written value.
        value: i64,
    },
    /// Payload for [`EventKind::HeapAlloc`].
    HeapAlloc {
        /// Allocation size in bytes.
        size: u64,
    },
    /// Payload for [`EventKind::ControlFlow`].
    ControlFlow {
        /// Marker kind (`if`, `else`, `switch`, …), passed through verbatim.
        #[serde(rename = "controlType")]
        control_type: String,
    },
    /// Payload for [`EventKind::LoopStart`].
    LoopStart {
        /// Instrumentation-assigned loop identifier.
        #[serde(rename = "loopId")]
        loop_id: u32,
        /// Loop construct kind (`for`, `while`, `do`).
        #[serde(rename = "loopType")]
        loop_type: String,
    },
    /// Payload for [`EventKind::LoopCondition`].
    LoopCondition {
        /// Instrumentation-assigned loop identifier.
        #[serde(rename = "loopId")]
        loop_id: u32,
        /// Whether the condition evaluated to true.
        outcome: bool,
    },
    /// Payload for the remaining per-loop markers (body start, iteration
    /// end, loop end).
    LoopMarker {
        /// Instrumentation-assigned loop identifier.
        #[serde(rename = "loopId")]
        loop_id: u32,
    },
    /// Payload for [`EventKind::Return`].
    Return {
        /// Returned value.
        value: TracedValue,
        /// Declared return type as reported by the probe.
        #[serde(rename = "returnType")]
        return_type: String,
        /// Variable the caller stores the result into, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
    /// Payload for [`EventKind::BlockEnter`] and [`EventKind::BlockExit`].
    Block {
        /// Nesting depth of the lexical block.
        #[serde(rename = "blockDepth")]
        block_depth: u32,
    },
    /// Payload for kinds that carry no extra fields (function enter/exit,
    /// heap free).
    Empty {},
}

/// The immutable, emitted unit of trace output.
///
/// Constructed only inside the recorder's critical section, which guarantees
/// that `id` values observed in the output are strictly increasing and
/// gap-free, starting at 0.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Dense, monotonically increasing sequence id.
    pub id: u64,
    /// Notification kind tag.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Originating machine address (`0x…`) or null.
    pub addr: Option<String>,
    /// Subject or function name the event is attributed to.
    pub func: String,
    /// Call depth at the time of emission.
    pub depth: u32,
    /// Wall-clock timestamp in microseconds since the Unix epoch.
    pub ts: u64,
    /// Normalized source file the notification originated from.
    pub file: String,
    /// Source line the notification originated from.
    pub line: u32,
    /// Kind-specific fields, flattened next to the fixed ones.
    #[serde(flatten)]
    pub body: EventBody,
}

#[cfg(test)]
mod tests {
    use crate::event::{
        format_address, Event, EventBody, EventKind, SourceLocation, StorageClass, TracedValue,
    };

    #[test]
    fn test_location_normalizes_backslashes() {
        let loc = SourceLocation::new("C:\\src\\main.c", 12);
        assert_eq!(loc.file, "C:/src/main.c");
        assert_eq!(loc.line, 12);

        // Forward-slash paths pass through untouched.
        let loc = SourceLocation::new("src/main.c", 3);
        assert_eq!(loc.file, "src/main.c");
    }

    #[test]
    fn test_traced_value_wire_forms() {
        assert_eq!(
            serde_json::to_string(&TracedValue::Int(-7)).unwrap(),
            "-7"
        );
        assert_eq!(
            serde_json::to_string(&TracedValue::Addr(0x7f00)).unwrap(),
            "\"0x7f00\""
        );
        assert_eq!(
            serde_json::to_string(&TracedValue::Str("a\"b".into())).unwrap(),
            "\"a\\\"b\""
        );
        assert_eq!(serde_json::to_string(&TracedValue::Null).unwrap(), "null");
    }

    #[test]
    fn test_traced_value_type_names() {
        assert_eq!(TracedValue::Int(1).type_name(), "int");
        assert_eq!(TracedValue::Float(1.5).type_name(), "double");
        assert_eq!(TracedValue::Addr(1).type_name(), "pointer");
        assert_eq!(TracedValue::Str("s".into()).type_name(), "string");
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&EventKind::FuncEnter).unwrap(),
            "\"func_enter\""
        );
        assert_eq!(
            serde_json::to_string(&EventKind::ArrayIndexAssign).unwrap(),
            "\"array_index_assign\""
        );
        assert_eq!(
            serde_json::to_string(&EventKind::Return).unwrap(),
            "\"return\""
        );
        // Display mirrors the wire name for log messages.
        assert_eq!(EventKind::HeapAlloc.to_string(), "heap_alloc");
    }

    #[test]
    fn test_event_serializes_with_flattened_body() {
        let event = Event {
            id: 3,
            kind: EventKind::Assign,
            addr: None,
            func: "main".into(),
            depth: 1,
            ts: 1000,
            file: "t.c".into(),
            line: 9,
            body: EventBody::Assign {
                name: "x".into(),
                value: TracedValue::Int(42),
            },
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["type"], "assign");
        assert_eq!(json["addr"], serde_json::Value::Null);
        assert_eq!(json["name"], "x");
        assert_eq!(json["value"], 42);
    }

    #[test]
    fn test_empty_body_adds_no_fields() {
        let event = Event {
            id: 0,
            kind: EventKind::FuncExit,
            addr: None,
            func: "main".into(),
            depth: 1,
            ts: 0,
            file: "t.c".into(),
            line: 20,
            body: EventBody::Empty {},
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_storage_class_wire_form() {
        assert_eq!(serde_json::to_string(&StorageClass::Stack).unwrap(), "\"stack\"");
        assert_eq!(StorageClass::Heap.to_string(), "heap");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0), "0x0");
        assert_eq!(format_address(0xdead_beef), "0xdeadbeef");
    }
}
