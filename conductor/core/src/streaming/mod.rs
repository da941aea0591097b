//! Streaming Infrastructure
//!
//! Everything between "a message was sent" and "the reply is complete":
//! the request task, the bounded waits on it, incremental decoding for the
//! live view, and the buffer that becomes the committed entry.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   begin()    ┌──────────────────────────┐
//! │ StreamEngine  │───spawn─────▶│ request task             │
//! │               │              │  open_conversation()     │
//! │ PendingStream │◀────mpsc─────│  body.next() (bounded)   │
//! │  + decoder    │ StreamSignal └──────────────────────────┘
//! └───────┬───────┘
//!         │ apply(signal)
//!         ▼
//!   EngineEvent { Opened | Text | Completed | Failed }
//! ```
//!
//! Only one request can be in flight. Cancelling drops the task, which
//! drops the response body and releases the connection.

mod decoder;
mod engine;
mod pending;

pub use decoder::Utf8StreamDecoder;
pub use engine::{EngineError, EngineEvent, StreamEngine, StreamSignal, StreamTimeouts};
pub use pending::{CompletedStream, PendingStream};
