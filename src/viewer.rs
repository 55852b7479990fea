//! Consumption loop: Record Source -> Decoder -> Assembler -> Renderer.
//!
//! Queue closed adalah satu-satunya jalur terminasi bersih. Error
//! per-record dilaporkan ke diagnostic sink lalu loop lanjut ke
//! record berikutnya; tidak ada state yang bocor antar iterasi.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::core::{ReadError, RecordSource};
use crate::protocol::{AssembleError, Assembler, AssemblyMode};
use crate::render::TerminalRenderer;

/// Batas fault berturut-turut sebelum source dianggap wedged.
/// Satu read sukses me-reset hitungan.
pub const MAX_CONSECUTIVE_FAULTS: u32 = 64;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// Source terus menerus fault tanpa pernah menghasilkan record.
    #[error("record source wedged after {faults} consecutive faults")]
    SourceWedged { faults: u32 },

    /// Gagal menulis frame ke sink output.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Statistik consumption loop (lock-free).
#[derive(Default)]
pub struct ViewerStats {
    pub records: AtomicU64,
    pub snapshots: AtomicU64,
    pub decode_errors: AtomicU64,
    pub desyncs: AtomicU64,
    pub source_faults: AtomicU64,
}

impl ViewerStats {
    pub fn print_summary(&self) {
        println!("\n📊 Viewer Stats");
        println!(
            "   Records:        {}",
            self.records.load(Ordering::Relaxed)
        );
        println!(
            "   Snapshots:      {}",
            self.snapshots.load(Ordering::Relaxed)
        );
        println!(
            "   Decode errors:  {}",
            self.decode_errors.load(Ordering::Relaxed)
        );
        println!(
            "   Desyncs:        {}",
            self.desyncs.load(Ordering::Relaxed)
        );
        println!(
            "   Source faults:  {}",
            self.source_faults.load(Ordering::Relaxed)
        );
    }
}

/// Loop konsumsi single-threaded: baca record utuh dari source,
/// assemble jadi snapshot, render ke sink.
pub struct Viewer<S, W> {
    source: Arc<S>,
    assembler: Assembler,
    renderer: TerminalRenderer,
    sink: W,
    stats: Arc<ViewerStats>,
}

impl<S: RecordSource, W: Write> Viewer<S, W> {
    pub fn new(source: Arc<S>, mode: AssemblyMode, sink: W) -> Self {
        Self {
            source,
            assembler: Assembler::new(mode),
            renderer: TerminalRenderer::new(),
            sink,
            stats: Arc::new(ViewerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ViewerStats> {
        self.stats.clone()
    }

    /// Ambil sink kembali - dipakai test untuk inspeksi frame.
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Jalankan loop sampai source ditutup.
    ///
    /// `Ok(())` hanya lewat jalur closed. Error per-record tidak
    /// pernah menghentikan loop; hanya sink I/O dan source yang
    /// wedged yang fatal.
    pub fn run(&mut self) -> Result<(), ViewerError> {
        let mut consecutive_faults = 0u32;

        loop {
            let record = match self.source.read() {
                Ok(record) => {
                    consecutive_faults = 0;
                    record
                }
                Err(ReadError::Closed) => {
                    info!("record source closed, exiting");
                    return Ok(());
                }
                Err(ReadError::Fault(reason)) => {
                    self.stats.source_faults.fetch_add(1, Ordering::Relaxed);
                    consecutive_faults += 1;
                    warn!(%reason, consecutive_faults, "record source fault");
                    if consecutive_faults >= MAX_CONSECUTIVE_FAULTS {
                        return Err(ViewerError::SourceWedged {
                            faults: consecutive_faults,
                        });
                    }
                    continue;
                }
            };

            self.stats.records.fetch_add(1, Ordering::Relaxed);

            match self.assembler.ingest(record.as_bytes()) {
                Ok(Some(snapshot)) => {
                    let frame = self.renderer.render(&snapshot);
                    self.sink.write_all(frame.as_bytes())?;
                    self.sink.flush()?;
                    self.stats.snapshots.fetch_add(1, Ordering::Relaxed);
                }
                Ok(None) => {
                    // Paruh pertama ditahan, menunggu pasangannya
                }
                Err(AssembleError::Decode(e)) => {
                    self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "record discarded");
                }
                Err(AssembleError::FragmentDesync(reason)) => {
                    self.stats.desyncs.fetch_add(1, Ordering::Relaxed);
                    warn!(reason, "fragment desync, resynchronizing");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawRecord;
    use crate::protocol::{LifeFragment, LifeSample, FRAGMENT_CELLS};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Source sintetis yang memutar daftar hasil read lalu Closed.
    struct ScriptedSource {
        steps: Mutex<VecDeque<Result<RawRecord, ReadError>>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Result<RawRecord, ReadError>>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
            })
        }
    }

    impl RecordSource for ScriptedSource {
        fn read(&self) -> Result<RawRecord, ReadError> {
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ReadError::Closed))
        }

        fn close(&self) -> bool {
            false
        }
    }

    fn record_of(bytes: &[u8]) -> Result<RawRecord, ReadError> {
        Ok(RawRecord::from_bytes(bytes).unwrap())
    }

    #[test]
    fn test_clean_exit_on_close() {
        let source = ScriptedSource::new(vec![]);
        let mut viewer = Viewer::new(source, AssemblyMode::SingleRecord, Vec::new());

        viewer.run().unwrap();
        assert_eq!(viewer.stats().snapshots.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_malformed_record_never_rendered() {
        let mut bad = LifeSample::new(0, 64, 64, &[0u8; 4096]);
        bad.length_in_bytes = 4097;

        let source = ScriptedSource::new(vec![record_of(bad.as_bytes())]);
        let mut viewer = Viewer::new(source, AssemblyMode::SingleRecord, Vec::new());
        let stats = viewer.stats();

        viewer.run().unwrap();

        assert_eq!(stats.decode_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.snapshots.load(Ordering::Relaxed), 0);
        assert!(viewer.into_sink().is_empty());
    }

    #[test]
    fn test_valid_record_is_rendered() {
        let sample = LifeSample::new(9, 4, 4, &[1u8; 16]);
        let source = ScriptedSource::new(vec![record_of(sample.as_bytes())]);
        let mut viewer = Viewer::new(source, AssemblyMode::SingleRecord, Vec::new());
        let stats = viewer.stats();

        viewer.run().unwrap();

        assert_eq!(stats.snapshots.load(Ordering::Relaxed), 1);
        let sink = viewer.into_sink();
        let frame = String::from_utf8(sink).unwrap();
        assert!(frame.starts_with("\x1b[H"));
        assert!(frame.contains("gen      9"));
    }

    #[test]
    fn test_pending_fragment_then_close_is_clean() {
        let first = LifeFragment::new(0, 64, 64, 4096, &[0u8; FRAGMENT_CELLS]);
        let source = ScriptedSource::new(vec![record_of(first.as_bytes())]);
        let mut viewer = Viewer::new(source, AssemblyMode::TwoRecordFragments, Vec::new());
        let stats = viewer.stats();

        viewer.run().unwrap();

        assert_eq!(stats.records.load(Ordering::Relaxed), 1);
        assert_eq!(stats.snapshots.load(Ordering::Relaxed), 0);
        assert_eq!(stats.desyncs.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_fault_policy_terminates_wedged_source() {
        let steps = (0..MAX_CONSECUTIVE_FAULTS)
            .map(|i| Err(ReadError::Fault(format!("fault {}", i))))
            .collect();
        let source = ScriptedSource::new(steps);
        let mut viewer = Viewer::new(source, AssemblyMode::SingleRecord, Vec::new());
        let stats = viewer.stats();

        match viewer.run() {
            Err(ViewerError::SourceWedged { faults }) => {
                assert_eq!(faults, MAX_CONSECUTIVE_FAULTS);
            }
            other => panic!("expected SourceWedged, got {:?}", other),
        }
        assert_eq!(
            stats.source_faults.load(Ordering::Relaxed),
            MAX_CONSECUTIVE_FAULTS as u64
        );
    }

    #[test]
    fn test_successful_read_resets_fault_counter() {
        let sample = LifeSample::new(0, 4, 4, &[0u8; 16]);
        let mut steps: Vec<Result<RawRecord, ReadError>> = Vec::new();

        // Fault hampir sampai batas, satu record sukses, fault lagi
        for _ in 0..MAX_CONSECUTIVE_FAULTS - 1 {
            steps.push(Err(ReadError::Fault("transient".into())));
        }
        steps.push(record_of(sample.as_bytes()));
        for _ in 0..MAX_CONSECUTIVE_FAULTS - 1 {
            steps.push(Err(ReadError::Fault("transient".into())));
        }

        let source = ScriptedSource::new(steps);
        let mut viewer = Viewer::new(source, AssemblyMode::SingleRecord, Vec::new());

        // Batas tidak pernah tercapai karena counter di-reset
        viewer.run().unwrap();
    }

    #[test]
    fn test_desync_then_recovery_renders_next_pair() {
        let first = LifeFragment::new(0, 64, 64, 4096, &[1u8; FRAGMENT_CELLS]);
        let second = LifeFragment::new(1, 64, 64, 4096, &[1u8; FRAGMENT_CELLS]);

        let source = ScriptedSource::new(vec![
            record_of(second.as_bytes()), // paruh kedua tanpa pasangan
            record_of(first.as_bytes()),
            record_of(second.as_bytes()),
        ]);
        let mut viewer = Viewer::new(source, AssemblyMode::TwoRecordFragments, Vec::new());
        let stats = viewer.stats();

        viewer.run().unwrap();

        assert_eq!(stats.desyncs.load(Ordering::Relaxed), 1);
        assert_eq!(stats.snapshots.load(Ordering::Relaxed), 1);
    }
}
