//! Append-only JSON sink for the event log.
//!
//! [`EventLog`] owns the output stream's lifecycle and nothing else: it does
//! not assign ids, look at state, or reorder anything. Events are written in
//! the exact order `append` is called, which the recorder's critical section
//! guarantees to equal sequence-id order.
//!
//! # Document Shape
//!
//! ```json
//! {"version":"1.0","events":[
//!   {"id":0,"type":"func_enter", ... },
//!   {"id":1,"type":"declare", ... }
//! ],"total_events":2,"functions":["main"]}
//! ```
//!
//! Each append is flushed immediately, so a crash of the traced program
//! loses at most the in-flight event and leaves a partial-but-useful prefix.
//! The trailer is written exactly once by `close`, after which every further
//! operation is a no-op.
//!
//! # Failure Policy
//!
//! Tracing must never alter the traced program's behavior. A write failure
//! therefore degrades the sink permanently: the stream is dropped, a single
//! warning goes to the `log` facade, and the remainder of the run records
//! nothing. No error ever reaches the traced program through `append`.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{event::Event, Error, Result};

/// Document format marker written into the header.
pub const FORMAT_VERSION: &str = "1.0";

/// Append-only, write-through JSON event sink.
pub struct EventLog {
    stream: Option<Box<dyn Write + Send>>,
    written: u64,
    closed: bool,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("open", &self.stream.is_some())
            .field("written", &self.written)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        EventLog::new()
    }
}

impl EventLog {
    /// Creates a log with no sink attached; every append is a no-op until
    /// one of the `open` methods succeeds.
    #[must_use]
    pub fn new() -> Self {
        EventLog {
            stream: None,
            written: 0,
            closed: false,
        }
    }

    /// Opens a file destination and writes the document header.
    ///
    /// Idempotent: opening an already-open (or already-closed) log is a
    /// silent no-op, per the never-disturb-the-traced-program contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created or the header
    /// cannot be written. The host may inspect this; the recorder's probe
    /// operations never surface it to traced code.
    pub fn open(&mut self, destination: &Path) -> Result<()> {
        if self.stream.is_some() || self.closed {
            return Ok(());
        }
        let file = File::create(destination)?;
        self.attach(Box::new(BufWriter::new(file)))
    }

    /// Opens an arbitrary stream destination and writes the document header.
    ///
    /// Primarily for tests and in-memory consumers; same idempotence and
    /// error behavior as [`EventLog::open`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the header cannot be written.
    pub fn open_stream(&mut self, stream: Box<dyn Write + Send>) -> Result<()> {
        if self.stream.is_some() || self.closed {
            return Ok(());
        }
        self.attach(stream)
    }

    fn attach(&mut self, mut stream: Box<dyn Write + Send>) -> Result<()> {
        write!(stream, "{{\"version\":\"{FORMAT_VERSION}\",\"events\":[")?;
        stream.flush()?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Returns `true` while the sink can accept events.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Number of events written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Serializes one event to the sink and flushes it.
    ///
    /// Best-effort by contract: with no sink attached this is a no-op, and a
    /// write failure drops the sink for the remainder of the run rather than
    /// surfacing an error.
    pub fn append(&mut self, event: &Event) {
        if self.stream.is_none() {
            return;
        }
        if let Err(err) = self.write_event(event) {
            log::warn!("trace sink failed appending {} event, tracing disabled: {err}", event.kind);
            self.stream = None;
        }
    }

    fn write_event(&mut self, event: &Event) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::SinkUnavailable)?;
        if self.written > 0 {
            stream.write_all(b",\n  ")?;
        } else {
            stream.write_all(b"\n  ")?;
        }
        serde_json::to_writer(&mut *stream, event)?;
        stream.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Writes the trailing summary and finalizes the document.
    ///
    /// `functions` is the set of distinct function names observed, included
    /// in the summary for consumers that index by function. Closing an
    /// unopened or already-closed log is a no-op; the trailer is written at
    /// most once.
    pub fn close(&mut self, functions: &[String]) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        self.closed = true;

        let result: Result<()> = (|| {
            write!(stream, "\n],\"total_events\":{}", self.written)?;
            stream.write_all(b",\"functions\":")?;
            serde_json::to_writer(&mut stream, functions)?;
            stream.write_all(b"}\n")?;
            stream.flush()?;
            Ok(())
        })();

        if let Err(err) = result {
            log::warn!("trace sink failed writing trailer: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    use crate::{
        event::{Event, EventBody, EventKind},
        sink::EventLog,
    };

    /// In-memory stream that stays readable after the log drops it.
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

    fn sample_event(id: u64) -> Event {
        Event {
            id,
            kind: EventKind::FuncEnter,
            addr: None,
            func: "main".into(),
            depth: 1,
            ts: 1000 + id,
            file: "t.c".into(),
            line: 1,
            body: EventBody::Empty {},
        }
    }

    #[test]
    fn test_unopened_log_is_a_no_op() {
        let mut log = EventLog::new();
        assert!(!log.is_open());
        log.append(&sample_event(0));
        assert_eq!(log.written(), 0);
        log.close(&[]);
    }

    #[test]
    fn test_document_is_well_formed_after_close() {
        let buffer = SharedBuffer::default();
        let mut log = EventLog::new();
        log.open_stream(Box::new(buffer.clone())).unwrap();

        log.append(&sample_event(0));
        log.append(&sample_event(1));
        log.close(&["main".to_string()]);

        let document: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(document["version"], "1.0");
        assert_eq!(document["events"].as_array().unwrap().len(), 2);
        assert_eq!(document["total_events"], 2);
        assert_eq!(document["functions"][0], "main");
    }

    #[test]
    fn test_unterminated_document_is_a_useful_prefix() {
        let buffer = SharedBuffer::default();
        let mut log = EventLog::new();
        log.open_stream(Box::new(buffer.clone())).unwrap();
        log.append(&sample_event(0));

        // No close: the prefix still contains the flushed event verbatim.
        let prefix = buffer.contents();
        assert!(prefix.starts_with("{\"version\":\"1.0\",\"events\":["));
        assert!(prefix.contains("\"id\":0"));
        assert!(!prefix.contains("total_events"));
    }

    #[test]
    fn test_open_is_idempotent() {
        let buffer = SharedBuffer::default();
        let mut log = EventLog::new();
        log.open_stream(Box::new(buffer.clone())).unwrap();
        // Second open must not write a second header.
        log.open_stream(Box::new(SharedBuffer::default())).unwrap();
        log.append(&sample_event(0));
        log.close(&[]);

        assert!(serde_json::from_str::<serde_json::Value>(&buffer.contents()).is_ok());
    }

    #[test]
    fn test_close_is_terminal() {
        let buffer = SharedBuffer::default();
        let mut log = EventLog::new();
        log.open_stream(Box::new(buffer.clone())).unwrap();
        log.close(&[]);
        let after_close = buffer.contents();

        // Neither reopening nor appending does anything once closed.
        log.open_stream(Box::new(buffer.clone())).unwrap();
        log.append(&sample_event(0));
        log.close(&[]);
        assert_eq!(buffer.contents(), after_close);
    }

    #[test]
    fn test_write_failure_degrades_silently() {
        struct FailingStream;
        impl Write for FailingStream {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk gone"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut log = EventLog::new();
        // Header write fails; the stream is never attached.
        assert!(log.open_stream(Box::new(FailingStream)).is_err());
        assert!(!log.is_open());
        log.append(&sample_event(0));
        assert_eq!(log.written(), 0);
    }
}
