//! Render Layer: Deterministic Terminal Grid Output
//!
//! Full redraw per snapshot ke frame buffer yang di-reuse. Tidak ada
//! state antar frame, jadi output murni fungsi dari snapshot.

mod terminal;

pub use terminal::TerminalRenderer;
