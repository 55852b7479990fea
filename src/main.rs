//! Demeter Viewer Binary
//!
//! Game of Life lewat ring buffer: producer thread menghasilkan
//! snapshot grid, viewer menggambar ke terminal, Ctrl-C menutup
//! queue dan semua thread keluar bersih.
//!
//! # Usage
//!
//! ```text
//! cargo run --release -- [OPTIONS]
//! ```
//!
//! # Options
//!
//! - `--interval MS` - Jeda antar generasi (default: 500)
//! - `--generations N` - Berhenti setelah N generasi (default: tanpa batas)
//! - `--fragmented` - Pakai protocol two-record (2048 cell per fragment)
//! - `--port PORT` - Tunggu koneksi TCP pertama sebelum mulai
//! - `--seed HEX` - Seed board acak (default: 0x5EED)

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use demeter::core::RecordQueue;
use demeter::protocol::AssemblyMode;
use demeter::shutdown::ShutdownCoordinator;
use demeter::sim::{Producer, Trigger};
use demeter::viewer::Viewer;

/// Konfigurasi viewer
struct ViewerConfig {
    interval_ms: u64,
    generations: Option<u64>,
    fragmented: bool,
    port: Option<u16>,
    seed: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            generations: None,
            fragmented: false,
            port: None,
            seed: 0x5EED,
        }
    }
}

fn run_viewer(config: ViewerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if config.fragmented {
        AssemblyMode::TwoRecordFragments
    } else {
        AssemblyMode::SingleRecord
    };
    let trigger = match config.port {
        Some(port) => Trigger::Port(port),
        None => Trigger::Timer,
    };

    println!("🌱 Demeter - Game of Life over a Lock-Free Ring Buffer");
    println!("======================================================\n");
    println!("Configuration:");
    println!("  Mode:        {:?}", mode);
    println!("  Interval:    {} ms", config.interval_ms);
    match config.port {
        Some(port) => println!(
            "  Trigger:     first connection on port {} (try: nc 127.0.0.1 {})",
            port, port
        ),
        None => println!("  Trigger:     timer"),
    }
    println!("  Seed:        {:#x}\n", config.seed);

    let queue = Arc::new(RecordQueue::new());

    // Coordinator adalah satu-satunya pihak yang menutup queue
    let coordinator = ShutdownCoordinator::install()?;
    let shutdown = coordinator.handle();
    let watcher = coordinator.watch(queue.clone())?;

    let producer = Producer::new(
        queue.clone(),
        mode,
        trigger,
        Duration::from_millis(config.interval_ms),
        config.generations,
        config.seed,
        shutdown.clone(),
    );
    let producer_stats = producer.stats();
    let producer_thread = producer.spawn()?;

    let mut viewer = Viewer::new(queue, mode, io::stdout().lock());
    let viewer_stats = viewer.stats();

    // Clear screen sekali; tiap frame berikutnya cuma cursor home
    print!("\x1b[2J");

    let result = viewer.run();

    // Pastikan semua thread berhenti walau viewer keluar karena error
    shutdown.request();
    let _ = watcher.join();
    let _ = producer_thread.join();

    viewer_stats.print_summary();
    println!(
        "   Generations:    {}",
        producer_stats.generations.load(Ordering::Relaxed)
    );
    println!(
        "   Dropped:        {}",
        producer_stats.records_dropped.load(Ordering::Relaxed)
    );

    result.map_err(Into::into)
}

fn parse_args() -> ViewerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ViewerConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--interval" | "-i" => {
                if i + 1 < args.len() {
                    config.interval_ms = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--generations" | "-g" => {
                if i + 1 < args.len() {
                    config.generations = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--fragmented" | "-f" => {
                config.fragmented = true;
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    config.port = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--seed" | "-s" => {
                if i + 1 < args.len() {
                    let raw = args[i + 1].trim_start_matches("0x");
                    config.seed = u64::from_str_radix(raw, 16).unwrap_or(0x5EED);
                    i += 1;
                }
            }
            "--help" => {
                println!("Demeter - Game of Life over a Lock-Free Ring Buffer\n");
                println!("Usage: demeter [OPTIONS]\n");
                println!("Options:");
                println!("  -i, --interval <MS>     Delay between generations (default: 500)");
                println!("  -g, --generations <N>   Stop after N generations");
                println!("  -f, --fragmented        Two-record protocol (2048 cells per fragment)");
                println!("  -p, --port <PORT>       Wait for a TCP connection before starting");
                println!("  -s, --seed <HEX>        Board seed (default: 5EED)");
                println!("      --help              Show this help");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn main() {
    // Diagnostic sink ke stderr supaya frame di stdout tetap bersih
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = parse_args();

    if let Err(e) = run_viewer(config) {
        eprintln!("❌ Viewer error: {}", e);
        std::process::exit(1);
    }
}
