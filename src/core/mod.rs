//! Core module: Lock-Free Record Queue dengan close-once semantics
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic operations, tidak ada Mutex/RwLock
//! - No-Allocation: Semua slot pre-allocated saat init
//! - Close-Once: Explicit atomic closed flag, satu designated closer

mod ring_buffer;
mod source;

pub use ring_buffer::{RecordQueue, RingBuffer};
pub use source::{RawRecord, ReadError, RecordSource, MAX_RECORD_BYTES};
