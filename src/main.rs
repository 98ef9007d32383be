use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;

use metered_stream::{MeterConfig, MeteredStream};

// ─── Demo parameters ─────────────────────────────────────────────

/// Rows written to the throwaway input file.
const DEMO_ROWS: usize = 200_000;

/// Progress report every 512 KiB of payload.
const DEMO_THRESHOLD: u64 = 512 * 1024;

// ─── Name pools for the generated rows ───────────────────────────

static FIRST: &[&str] = &[
    "Emma", "Liam", "Olivia", "Noah", "Ava", "Ethan", "Sophia", "Mason",
    "Isabella", "William", "Mia", "James",
];

static LAST: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller",
    "Davis", "Rodriguez", "Martinez", "Wilson", "Taylor",
];

#[tokio::main]
async fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   📊  STREAM METERING DEMO                       ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Generate a throwaway data file ────────────────────────
    let path = demo_path();
    println!("📝 Writing {} demo rows to {}...", DEMO_ROWS, path.display());
    let bytes_written = write_demo_file(&path).await;
    println!("   ✓ {} bytes", bytes_written);

    // ── 2. Open the file source ──────────────────────────────────
    let file = tokio::fs::File::open(&path)
        .await
        .expect("demo file vanished between write and open");
    let source = ReaderStream::new(file);

    // ── 3. Wrap it in a metering stage ───────────────────────────
    let mut stream = MeteredStream::new(
        source,
        MeterConfig {
            threshold: DEMO_THRESHOLD,
            expected: Some(bytes_written),
            report_chunks: true,
        },
    )
    .expect("non-zero demo threshold");

    stream.core().on_progress(|measure| {
        let json = serde_json::to_string(measure).unwrap_or_default();
        println!("   progress → {}", json);
    });

    // ── 4. Drain into a discard sink ─────────────────────────────
    println!();
    println!("🚿 Streaming through the meter...");
    while let Some(chunk) = stream.next().await {
        // The sink: drop every chunk on the floor.
        let _ = chunk;
    }

    // ── 5. Final summary ─────────────────────────────────────────
    let last = stream.core().peek();
    println!();
    println!("Done.");
    println!("   bytes metered : {}", last.count);
    println!("   elapsed       : {} ms", last.elapsed);
    println!("   rate          : {:.1} bytes/ms", last.rate);

    let _ = tokio::fs::remove_file(&path).await;
}

fn demo_path() -> PathBuf {
    std::env::temp_dir().join("metered-stream-demo.csv")
}

/// Write a CSV of generated user rows and return its byte length.
async fn write_demo_file(path: &PathBuf) -> u64 {
    let mut rng = StdRng::seed_from_u64(42);
    let mut body = String::with_capacity(DEMO_ROWS * 48);

    body.push_str("id,name,email\n");
    for i in 0..DEMO_ROWS {
        let first = FIRST[rng.gen_range(0..FIRST.len())];
        let last = LAST[rng.gen_range(0..LAST.len())];
        body.push_str(&format!(
            "usr_{:08},{} {},{}.{}{}@example.com\n",
            i,
            first,
            last,
            first.to_lowercase(),
            last.to_lowercase(),
            i % 100,
        ));
    }

    let len = body.len() as u64;
    tokio::fs::write(path, body)
        .await
        .expect("failed to write demo file");
    len
}
