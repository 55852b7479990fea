//! Lock-Free Multi-Producer Single-Consumer (MPSC) Ring Buffer
//!
//! Implementasi bounded queue dengan sequence number per-slot supaya
//! beberapa producer bisa publish tanpa saling menunggu. Tidak ada
//! Mutex, tidak ada alokasi setelah inisialisasi.
//!
//! Close semantics: explicit atomic closed flag. Setelah close, `read`
//! mengembalikan `Closed` langsung - record yang masih antri di-drop,
//! mengikuti perilaku reader ring buffer kernel.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use super::source::{RawRecord, ReadError, RecordSource};

/// Slot dalam ring buffer - data fixed-size plus sequence number
/// untuk publikasi per-slot antar producer.
#[repr(C, align(64))] // Cache line alignment untuk menghindari false sharing
struct Slot<T> {
    seq: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new(seq: usize) -> Self {
        Self {
            seq: AtomicUsize::new(seq),
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Lock-Free MPSC Ring Buffer dengan close-once semantics
///
/// Head dan tail di cache line terpisah untuk menghindari false
/// sharing antara producer dan consumer.
#[repr(C)]
pub struct RingBuffer<T, const N: usize> {
    // Producer side - cache line aligned
    head: CacheLinePadded<AtomicUsize>,
    // Consumer side - cache line aligned
    tail: CacheLinePadded<AtomicUsize>,
    // Di-set sekali oleh designated closer
    closed: CacheLinePadded<AtomicBool>,
    // Pre-allocated buffer di heap - tidak ada alokasi setelah init
    buffer: Box<[Slot<T>]>,
    // Mask untuk operasi modulo yang cepat (N harus power of 2)
    mask: usize,
}

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

// SAFETY: RingBuffer aman untuk Send/Sync karena:
// - Producer mengklaim slot lewat CAS pada head sebelum menulis
// - Sequence number per-slot menjamin data visible sebelum slot published
// - Hanya satu consumer (menulis tail)
unsafe impl<T: Send, const N: usize> Send for RingBuffer<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

/// Berapa kali `read` spin sebelum mundur ke sleep pendek.
const READ_SPIN_LIMIT: u32 = 1024;
/// Backoff sleep saat queue kosong. Closure terlihat paling lambat
/// satu interval ini, tanpa busy-wait penuh.
const READ_BACKOFF: Duration = Duration::from_micros(100);

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Membuat ring buffer baru. N HARUS power of 2.
    ///
    /// Alokasi hanya terjadi sekali saat inisialisasi.
    /// Setelah itu, tidak ada alokasi di hot path.
    ///
    /// # Panics
    /// Panic jika N bukan power of 2 atau N == 0
    pub fn new() -> Self {
        assert!(N > 0 && N.is_power_of_two(), "N must be power of 2");

        // Alokasi buffer di heap untuk menghindari stack overflow
        let mut buffer = Vec::with_capacity(N);
        for i in 0..N {
            buffer.push(Slot::new(i));
        }

        Self {
            head: CacheLinePadded::new(AtomicUsize::new(0)),
            tail: CacheLinePadded::new(AtomicUsize::new(0)),
            closed: CacheLinePadded::new(AtomicBool::new(false)),
            buffer: buffer.into_boxed_slice(),
            mask: N - 1,
        }
    }

    /// Push data ke buffer (producer side, boleh lebih dari satu thread)
    ///
    /// Returns `true` jika berhasil, `false` jika buffer penuh atau
    /// queue sudah ditutup. Zero-allocation, lock-free.
    #[inline(always)]
    pub fn push(&self, value: T) -> bool {
        if self.is_closed() {
            return false;
        }

        let mut head = self.head.value.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[head & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq as isize - head as isize;

            if diff == 0 {
                // Slot bebas - klaim lewat CAS, producer lain retry
                match self.head.value.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: CAS di atas memberi kepemilikan
                        // eksklusif slot ini sampai seq di-publish
                        unsafe {
                            (*slot.data.get()).write(value);
                        }
                        // Release fence: data visible sebelum consumer
                        // melihat sequence baru
                        slot.seq.store(head.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => head = current,
                }
            } else if diff < 0 {
                // Satu lap di belakang consumer - penuh
                return false;
            } else {
                head = self.head.value.load(Ordering::Relaxed);
            }
        }
    }

    /// Pop data dari buffer (consumer side, satu thread saja)
    ///
    /// Returns `Some(T)` jika ada data, `None` jika buffer kosong.
    /// Zero-allocation, lock-free.
    #[inline(always)]
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let slot = &self.buffer[tail & self.mask];
        let seq = slot.seq.load(Ordering::Acquire);

        // Slot ter-publish saat seq == tail + 1
        if (seq as isize) - (tail.wrapping_add(1) as isize) < 0 {
            return None;
        }

        // SAFETY: sequence menjamin producer sudah selesai menulis slot ini
        let value = unsafe { (*slot.data.get()).assume_init_read() };

        // Bebaskan slot untuk lap berikutnya (tail + N)
        slot.seq
            .store(tail.wrapping_add(self.mask + 1), Ordering::Release);
        self.tail
            .value
            .store(tail.wrapping_add(1), Ordering::Release);

        Some(value)
    }

    /// Blocking read: spin sebentar lalu mundur ke sleep pendek.
    ///
    /// Return `Err(Closed)` segera setelah queue ditutup - termasuk
    /// saat masih ada record antri, yang di-drop sesuai kontrak reader.
    pub fn read(&self) -> Result<T, ReadError> {
        let mut spins = 0u32;
        loop {
            if self.is_closed() {
                return Err(ReadError::Closed);
            }
            if let Some(value) = self.pop() {
                return Ok(value);
            }
            if spins < READ_SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
            } else {
                thread::sleep(READ_BACKOFF);
            }
        }
    }

    /// Tutup queue. Idempotent: `true` hanya untuk closer pertama.
    pub fn close(&self) -> bool {
        !self.closed.value.swap(true, Ordering::AcqRel)
    }

    /// Cek apakah queue sudah ditutup
    #[inline(always)]
    pub fn is_closed(&self) -> bool {
        self.closed.value.load(Ordering::Acquire)
    }

    /// Cek apakah buffer kosong
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        let tail = self.tail.value.load(Ordering::Acquire);
        let head = self.head.value.load(Ordering::Acquire);
        tail == head
    }

    /// Jumlah elemen dalam buffer (termasuk slot yang sedang ditulis)
    #[inline(always)]
    pub fn len(&self) -> usize {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// Kapasitas buffer
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }
}

/// Queue record default untuk pipeline viewer.
///
/// 16 slot x ~4KB per record, jauh di atas kedalaman ring buffer
/// yang disediakan producer in-kernel (4 sample).
pub type RecordQueue = RingBuffer<RawRecord, 16>;

impl<const N: usize> RecordSource for RingBuffer<RawRecord, N> {
    fn read(&self) -> Result<RawRecord, ReadError> {
        RingBuffer::read(self)
    }

    fn close(&self) -> bool {
        RingBuffer::close(self)
    }
}
