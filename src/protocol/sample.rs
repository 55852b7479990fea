//! Zero-Copy Life Sample Format
//!
//! Layout (native-endian, bit-exact dengan producer in-kernel):
//! ┌─────────────────────────────────────────────────────┐
//! │ cells (4096 atau 2048 bytes, fixed)                 │
//! ├─────────────────────────────────────────────────────┤
//! │ generation | part (u32)                             │
//! │ width (u32)                                         │
//! │ height (u32)                                        │
//! │ length_in_bytes (u32)                               │
//! └─────────────────────────────────────────────────────┘
//!
//! Record dapat di-cast langsung dari byte buffer tanpa parsing.
//! Consumer WAJIB menolak record yang panjangnya tidak exact.

use std::fmt;
use std::mem;

use thiserror::Error;

/// Kapasitas cell varian single-record.
pub const SAMPLE_CELLS: usize = 4096;
/// Kapasitas cell per fragment di varian two-record.
pub const FRAGMENT_CELLS: usize = 2048;
/// Kapasitas grid hasil assembly dua fragment.
pub const ASSEMBLED_CELLS: usize = FRAGMENT_CELLS * 2;

/// Error decode satu record. Record yang gagal langsung dibuang,
/// tidak ada partial state yang tersisa.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Record lebih pendek dari ukuran fixed schema.
    #[error("short record: {len} bytes, expected {expected}")]
    ShortRecord { len: usize, expected: usize },

    /// Field record tidak konsisten secara struktural.
    #[error("malformed record: {0}")]
    Malformed(&'static str),
}

/// Varian single-record: satu record = satu snapshot grid utuh.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LifeSample {
    pub cells: [u8; SAMPLE_CELLS],
    pub generation: u32,
    pub width: u32,
    pub height: u32,
    pub length_in_bytes: u32,
}

pub const SAMPLE_SIZE: usize = mem::size_of::<LifeSample>();
const _: () = assert!(SAMPLE_SIZE == SAMPLE_CELLS + 16);

impl LifeSample {
    /// Membuat sample dari state grid. Cells dicopy, sisanya nol.
    pub fn new(generation: u32, width: u32, height: u32, cells: &[u8]) -> Self {
        let mut sample = Self {
            cells: [0; SAMPLE_CELLS],
            generation,
            width,
            height,
            length_in_bytes: cells.len() as u32,
        };
        let len = cells.len().min(SAMPLE_CELLS);
        sample.cells[..len].copy_from_slice(&cells[..len]);
        sample
    }

    /// Decode dari raw record. Panjang harus EXACT.
    pub fn decode(record: &[u8]) -> Result<Self, DecodeError> {
        if record.len() < SAMPLE_SIZE {
            return Err(DecodeError::ShortRecord {
                len: record.len(),
                expected: SAMPLE_SIZE,
            });
        }
        if record.len() > SAMPLE_SIZE {
            return Err(DecodeError::Malformed("record larger than fixed layout"));
        }

        // SAFETY: panjang sudah exact, layout repr(C) tanpa padding
        // (cells kelipatan 4 byte), decode native-endian. read_unaligned
        // karena buffer sumber tidak dijamin aligned.
        let sample = unsafe { std::ptr::read_unaligned(record.as_ptr() as *const Self) };
        sample.validate()?;
        Ok(sample)
    }

    fn validate(&self) -> Result<(), DecodeError> {
        let grid = self.width as u64 * self.height as u64;
        if grid > SAMPLE_CELLS as u64 {
            return Err(DecodeError::Malformed("width*height exceeds cell capacity"));
        }
        if self.length_in_bytes as u64 > grid {
            return Err(DecodeError::Malformed("length_in_bytes exceeds width*height"));
        }
        Ok(())
    }

    /// Convert ke bytes (zero-copy)
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: repr(C) tanpa padding, ukuran di-assert compile time
        unsafe { std::slice::from_raw_parts(self as *const Self as *const u8, SAMPLE_SIZE) }
    }
}

impl fmt::Debug for LifeSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifeSample")
            .field("generation", &self.generation)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("length_in_bytes", &self.length_in_bytes)
            .finish()
    }
}

/// Varian two-record: snapshot dipecah jadi dua fragment berurutan.
/// `part` 0 = paruh pertama, 1 = paruh kedua. Fragment kedua membawa
/// dimensi otoritatif grid UTUH, bukan dimensi paruhnya.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LifeFragment {
    pub cells: [u8; FRAGMENT_CELLS],
    pub part: u32,
    pub width: u32,
    pub height: u32,
    pub length_in_bytes: u32,
}

pub const FRAGMENT_SIZE: usize = mem::size_of::<LifeFragment>();
const _: () = assert!(FRAGMENT_SIZE == FRAGMENT_CELLS + 16);

impl LifeFragment {
    /// Membuat fragment dari separuh state grid.
    pub fn new(part: u32, width: u32, height: u32, length_in_bytes: u32, cells: &[u8]) -> Self {
        let mut fragment = Self {
            cells: [0; FRAGMENT_CELLS],
            part,
            width,
            height,
            length_in_bytes,
        };
        let len = cells.len().min(FRAGMENT_CELLS);
        fragment.cells[..len].copy_from_slice(&cells[..len]);
        fragment
    }

    /// Decode dari raw record. Panjang harus EXACT.
    pub fn decode(record: &[u8]) -> Result<Self, DecodeError> {
        if record.len() < FRAGMENT_SIZE {
            return Err(DecodeError::ShortRecord {
                len: record.len(),
                expected: FRAGMENT_SIZE,
            });
        }
        if record.len() > FRAGMENT_SIZE {
            return Err(DecodeError::Malformed("record larger than fixed layout"));
        }

        // SAFETY: sama dengan LifeSample::decode
        let fragment = unsafe { std::ptr::read_unaligned(record.as_ptr() as *const Self) };
        fragment.validate()?;
        Ok(fragment)
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.part > 1 {
            return Err(DecodeError::Malformed("fragment part index out of range"));
        }
        // Dimensi menggambarkan grid hasil assembly, bukan satu fragment
        let grid = self.width as u64 * self.height as u64;
        if grid > ASSEMBLED_CELLS as u64 {
            return Err(DecodeError::Malformed("width*height exceeds cell capacity"));
        }
        if self.length_in_bytes as u64 > grid {
            return Err(DecodeError::Malformed("length_in_bytes exceeds width*height"));
        }
        Ok(())
    }

    /// Convert ke bytes (zero-copy)
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: repr(C) tanpa padding, ukuran di-assert compile time
        unsafe { std::slice::from_raw_parts(self as *const Self as *const u8, FRAGMENT_SIZE) }
    }
}

impl fmt::Debug for LifeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifeFragment")
            .field("part", &self.part)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("length_in_bytes", &self.length_in_bytes)
            .finish()
    }
}
