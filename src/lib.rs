//! Demeter - Zero-Copy Game of Life Snapshot Viewer
//!
//! Arsitektur:
//! - Lock-Free: Atomic-only MPSC ring buffer dengan close-once semantics
//! - Zero-Copy: Fixed-layout binary samples, decode tanpa parsing
//! - No-Allocation: Frame buffer dan queue slots pre-allocated
//! - Clean Shutdown: Signal handler menutup queue, viewer keluar bersih
//!
//! Data flow: `sim::Producer` -> `core::RingBuffer` -> `viewer::Viewer`
//! (decode -> assemble -> render). Shutdown coordinator berjalan
//! concurrent dan hanya melakukan satu aksi: close pada queue.

pub mod core;
pub mod protocol;
pub mod render;
pub mod shutdown;
pub mod sim;
pub mod viewer;
