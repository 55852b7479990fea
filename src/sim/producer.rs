//! Producer thread - stand-in user-space untuk program in-kernel.
//!
//! Tiap tick: langkah generasi, encode record, push ke ring buffer.
//! Queue penuh berarti sample di-drop dan dihitung, sama seperti
//! producer in-kernel saat reservasi ring buffer gagal. Producer tidak
//! pernah menutup queue sendiri - itu tugas shutdown coordinator.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::core::{RawRecord, RecordQueue};
use crate::protocol::AssemblyMode;
use crate::shutdown::ShutdownHandle;

use super::cellmap::{CellMap, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use super::trigger::Trigger;

/// Statistik producer (lock-free).
#[derive(Default)]
pub struct ProducerStats {
    pub generations: AtomicU64,
    pub records_pushed: AtomicU64,
    pub records_dropped: AtomicU64,
}

pub struct Producer {
    queue: Arc<RecordQueue>,
    map: CellMap,
    mode: AssemblyMode,
    trigger: Trigger,
    interval: Duration,
    max_generations: Option<u64>,
    shutdown: ShutdownHandle,
    stats: Arc<ProducerStats>,
}

impl Producer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<RecordQueue>,
        mode: AssemblyMode,
        trigger: Trigger,
        interval: Duration,
        max_generations: Option<u64>,
        seed: u64,
        shutdown: ShutdownHandle,
    ) -> Self {
        let mut map = CellMap::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        map.randomize(seed);
        Self {
            queue,
            map,
            mode,
            trigger,
            interval,
            max_generations,
            shutdown,
            stats: Arc::new(ProducerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ProducerStats> {
        self.stats.clone()
    }

    /// Jalankan producer di thread background.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("demeter-producer".into())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        let queue = self.queue.clone();
        match self.trigger.wait_armed(|| queue.is_closed()) {
            Ok(true) => info!("producer armed"),
            Ok(false) => {
                info!("producer cancelled before start");
                return;
            }
            Err(e) => {
                error!(error = %e, "trigger setup failed");
                // Setup gagal: minta shutdown lewat coordinator supaya
                // viewer tidak menunggu record yang tidak akan datang
                self.shutdown.request();
                return;
            }
        }

        // Publish state awal sebelum generasi pertama supaya board
        // seed langsung terlihat
        self.publish();

        loop {
            if self.queue.is_closed() {
                break;
            }
            if let Some(max) = self.max_generations {
                if self.stats.generations.load(Ordering::Relaxed) >= max {
                    info!(max, "generation limit reached");
                    self.shutdown.request();
                    break;
                }
            }

            thread::sleep(self.interval);
            if self.queue.is_closed() {
                break;
            }

            self.map.next_generation();
            self.stats.generations.fetch_add(1, Ordering::Relaxed);
            self.publish();
        }

        info!("producer exiting");
    }

    fn publish(&mut self) {
        match self.mode {
            AssemblyMode::SingleRecord => {
                let sample = self.map.sample();
                self.push(sample.as_bytes());
            }
            AssemblyMode::TwoRecordFragments => {
                let (first, second) = self.map.fragments();
                // Pasangan harus berurutan tanpa interleave; kalau
                // paruh pertama tidak muat, paruh kedua ikut di-skip
                if self.push(first.as_bytes()) {
                    self.push(second.as_bytes());
                }
            }
        }
    }

    fn push(&self, bytes: &[u8]) -> bool {
        let record = match RawRecord::from_bytes(bytes) {
            Some(record) => record,
            None => return false,
        };
        if self.queue.push(record) {
            self.stats.records_pushed.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            self.stats.records_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("queue full or closed, sample dropped");
            false
        }
    }
}
