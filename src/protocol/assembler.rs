//! Snapshot Assembler - state machine reassembly multi-record
//!
//! Mode dipilih sekali saat konstruksi (per versi protocol), bukan
//! branch runtime per record. Di mode fragment, assembler menahan
//! paruh pertama sampai pasangannya datang; error apa pun membuang
//! pending state dan record berikutnya diperlakukan sebagai kandidat
//! paruh pertama yang baru (resynchronize).

use thiserror::Error;

use super::sample::{DecodeError, LifeFragment, LifeSample, FRAGMENT_CELLS};

/// Varian protocol yang aktif, dipilih sekali saat startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// Satu record 4096-cell = satu snapshot utuh.
    SingleRecord,
    /// Dua record 2048-cell berurutan: part 0 lalu part 1.
    TwoRecordFragments,
}

/// Satu state grid utuh, siap render. Immutable setelah emit;
/// assembler tidak memegang referensi apa pun setelahnya.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    cells: Vec<u8>,
    width: u32,
    height: u32,
    generation: Option<u32>,
}

impl Snapshot {
    /// Flat cell buffer, panjang tepat `width * height`.
    #[inline(always)]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Counter generasi. `None` di mode fragment: header fragment
    /// membawa part index, bukan generation.
    #[inline(always)]
    pub fn generation(&self) -> Option<u32> {
        self.generation
    }

    /// Status hidup cell (x, y). Bit 0 adalah state; bit lain reserved
    /// dan diabaikan.
    #[inline(always)]
    pub fn alive(&self, x: u32, y: u32) -> bool {
        self.cells[(x + y * self.width) as usize] & 0x01 != 0
    }
}

/// Error assembly satu record. Semua varian non-fatal untuk loop:
/// record dibuang, assembler siap menerima record berikutnya.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Pasangan fragment putus: paruh kedua hilang, datang tanpa
    /// paruh pertama, atau dimensinya tidak cocok.
    #[error("fragment desync: {0}")]
    FragmentDesync(&'static str),
}

/// State machine reassembly. Satu instance per consumption loop;
/// pending state hanya hidup di antara dua fragment sepasang.
pub struct Assembler {
    mode: AssemblyMode,
    pending: Option<LifeFragment>,
}

impl Assembler {
    pub fn new(mode: AssemblyMode) -> Self {
        Self { mode, pending: None }
    }

    #[inline(always)]
    pub fn mode(&self) -> AssemblyMode {
        self.mode
    }

    /// Apakah ada paruh pertama yang sedang menunggu pasangan.
    #[inline(always)]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Proses satu record utuh.
    ///
    /// `Ok(Some)` saat snapshot lengkap ter-emit, `Ok(None)` saat
    /// paruh pertama ditahan menunggu pasangannya.
    pub fn ingest(&mut self, record: &[u8]) -> Result<Option<Snapshot>, AssembleError> {
        match self.mode {
            AssemblyMode::SingleRecord => self.ingest_single(record).map(Some),
            AssemblyMode::TwoRecordFragments => self.ingest_fragment(record),
        }
    }

    fn ingest_single(&mut self, record: &[u8]) -> Result<Snapshot, AssembleError> {
        let sample = LifeSample::decode(record)?;
        let len = (sample.width * sample.height) as usize;
        Ok(Snapshot {
            cells: sample.cells[..len].to_vec(),
            width: sample.width,
            height: sample.height,
            generation: Some(sample.generation),
        })
    }

    fn ingest_fragment(&mut self, record: &[u8]) -> Result<Option<Snapshot>, AssembleError> {
        let fragment = match LifeFragment::decode(record) {
            Ok(fragment) => fragment,
            Err(e) => {
                // Decode gagal di tengah pasangan: buang pending,
                // resynchronize di record berikutnya
                self.pending = None;
                return Err(e.into());
            }
        };

        if fragment.part == 0 {
            let had_pending = self.pending.replace(fragment).is_some();
            if had_pending {
                // Pasangan sebelumnya tidak pernah lengkap. Fragment
                // baru tetap ditahan sebagai paruh pertama.
                return Err(AssembleError::FragmentDesync(
                    "new first half while a pair was pending",
                ));
            }
            return Ok(None);
        }

        // part == 1 (decoder menolak part > 1)
        let Some(first) = self.pending.take() else {
            return Err(AssembleError::FragmentDesync(
                "second half arrived with no first half",
            ));
        };

        if first.width != fragment.width || first.height != fragment.height {
            return Err(AssembleError::FragmentDesync(
                "fragment dimensions disagree",
            ));
        }

        // Dimensi otoritatif dari fragment kedua
        let len = (fragment.width * fragment.height) as usize;
        let mut cells = Vec::with_capacity(FRAGMENT_CELLS * 2);
        cells.extend_from_slice(&first.cells);
        cells.extend_from_slice(&fragment.cells);
        cells.truncate(len);

        Ok(Some(Snapshot {
            cells,
            width: fragment.width,
            height: fragment.height,
            generation: None,
        }))
    }
}
