use thiserror::Error;

/// The generic Error type covering everything this library can return.
///
/// The engine's public probe surface deliberately never returns errors -
/// tracing must be invisible to the traced program - so this type appears
/// only on the host-facing lifecycle operations (opening the sink) and on
/// internal fallible paths that the recorder degrades into silent no-ops.
///
/// # Examples
///
/// ```rust,no_run
/// use stepscope::{Error, Recorder};
///
/// let recorder = Recorder::new();
/// match recorder.open(std::path::Path::new("/no/such/dir/trace.json")) {
///     Ok(()) => println!("tracing to file"),
///     Err(Error::Io(io_err)) => eprintln!("tracing disabled: {io_err}"),
///     Err(e) => eprintln!("tracing disabled: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem or stream I/O failure while opening or writing the sink.
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An event could not be serialized into the output document.
    ///
    /// Practically unreachable for the fixed event shapes this crate emits;
    /// kept separate from [`Error::Io`] so a genuine serializer bug is not
    /// mistaken for a full disk.
    #[error("Event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The sink is not open (never opened, already closed, or dropped after
    /// a write failure).
    #[error("Trace sink is unavailable")]
    SinkUnavailable,
}
