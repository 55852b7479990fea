//! Terminal renderer untuk snapshot grid.
//!
//! Escape sequence minimal: cursor home, header index kolom, glyph
//! dua karakter per cell (inverse video untuk hidup), next-line per
//! baris, lalu satu baris status.

use std::fmt::Write;

use crate::protocol::Snapshot;

const CURSOR_HOME: &str = "\x1b[H";
const ALIVE_GLYPH: &str = "\x1b[7m  \x1b[m";
const DEAD_GLYPH: &str = "  ";
const NEXT_LINE: &str = "\x1b[E";

/// Renderer dengan frame buffer pre-allocated yang di-reuse antar
/// frame. Untuk snapshot yang sama, dua render menghasilkan bytes
/// yang identik.
pub struct TerminalRenderer {
    frame: String,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            // 64x64 dengan glyph inverse video muat di bawah 64KB
            frame: String::with_capacity(64 * 1024),
        }
    }

    /// Render satu frame penuh. Buffer di-clear dan diisi ulang;
    /// slice yang dikembalikan valid sampai render berikutnya.
    pub fn render(&mut self, snapshot: &Snapshot) -> &str {
        self.frame.clear();
        let frame = &mut self.frame;

        frame.push_str(CURSOR_HOME);

        // Header: index kolom dua karakter
        for x in 0..snapshot.width() {
            let _ = write!(frame, "{:2}", x);
        }
        frame.push('\n');

        for y in 0..snapshot.height() {
            let _ = write!(frame, "{:2}", y);
            for x in 0..snapshot.width() {
                if snapshot.alive(x, y) {
                    frame.push_str(ALIVE_GLYPH);
                } else {
                    frame.push_str(DEAD_GLYPH);
                }
            }
            frame.push_str(NEXT_LINE);
        }

        match snapshot.generation() {
            Some(generation) => {
                let _ = writeln!(
                    frame,
                    "gen {:>6}  {} x {}",
                    generation,
                    snapshot.width(),
                    snapshot.height()
                );
            }
            None => {
                let _ = writeln!(
                    frame,
                    "gen {:>6}  {} x {}",
                    "-",
                    snapshot.width(),
                    snapshot.height()
                );
            }
        }

        &self.frame
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}
