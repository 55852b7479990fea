//! Shutdown Coordinator: signal -> atomic flag -> satu designated closer.
//!
//! Signal handler hanya men-set flag (async-signal-safe). Watcher
//! thread yang melakukan aksi: tepat satu `close()` pada record
//! source, lalu keluar. Loop consumer melihat closure sebagai jalur
//! terminasi bersih, bukan error.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::info;

use crate::core::RecordSource;

/// Flag global untuk signal handler. Handler tidak boleh melakukan
/// apa pun selain store ke sini.
static SIGNAL_FLAG: AtomicBool = AtomicBool::new(false);

/// Periode polling watcher thread.
const WATCH_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(unix)]
extern "C" fn on_signal(_sig: libc::c_int) {
    SIGNAL_FLAG.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
fn install_signal_handlers() -> io::Result<()> {
    let handler = on_signal as extern "C" fn(libc::c_int);
    // SAFETY: handler hanya menulis satu AtomicBool (async-signal-safe)
    unsafe {
        if libc::signal(libc::SIGINT, handler as libc::sighandler_t) == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        if libc::signal(libc::SIGTERM, handler as libc::sighandler_t) == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers() -> io::Result<()> {
    // Tanpa signal POSIX, shutdown hanya lewat ShutdownHandle
    Ok(())
}

/// Handle untuk meminta shutdown secara programmatic - dipakai
/// producer saat batas generasi tercapai, dan test.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn request(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn requested(&self) -> bool {
        self.flag.load(Ordering::Acquire) || SIGNAL_FLAG.load(Ordering::Relaxed)
    }
}

/// Coordinator: pasang signal handler, lalu `watch` menjalankan
/// thread yang menunggu flag dan menutup source tepat sekali.
pub struct ShutdownCoordinator {
    local: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Pasang handler SIGINT/SIGTERM dan siapkan flag lokal.
    pub fn install() -> io::Result<Self> {
        install_signal_handlers()?;
        Ok(Self {
            local: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: self.local.clone(),
        }
    }

    /// Jalankan watcher thread. Satu aksi saja saat flag naik:
    /// close source, lalu thread selesai.
    pub fn watch<S>(self, source: Arc<S>) -> io::Result<JoinHandle<()>>
    where
        S: RecordSource + Send + Sync + 'static,
    {
        let handle = self.handle();
        thread::Builder::new()
            .name("demeter-shutdown".into())
            .spawn(move || {
                while !handle.requested() {
                    thread::sleep(WATCH_INTERVAL);
                }
                info!("shutdown requested, closing record source");
                source.close();
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecordQueue;
    use std::time::Instant;

    #[test]
    fn test_watcher_closes_source_on_request() {
        let queue = Arc::new(RecordQueue::new());
        let coordinator = ShutdownCoordinator::install().unwrap();
        let handle = coordinator.handle();
        let watcher = coordinator.watch(queue.clone()).unwrap();

        assert!(!queue.is_closed());
        handle.request();

        let start = Instant::now();
        watcher.join().unwrap();
        assert!(queue.is_closed());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_handles_are_independent() {
        let a = ShutdownCoordinator::install().unwrap();
        let b = ShutdownCoordinator::install().unwrap();

        a.handle().request();
        assert!(a.handle().requested());
        // Coordinator lain tidak ikut terpicu oleh flag lokal a
        assert!(!b.local.load(Ordering::Acquire));
    }
}
