//! Download-style progress reporting example

use handoff_rs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct FakeDownload {
    name: &'static str,
    chunks: u32,
    finished: Arc<AtomicUsize>,
}

impl Task for FakeDownload {
    type Params = Duration;
    type Update = u32;
    type Output = u64;

    fn before_start(&self) {
        println!("[{}] queued on {:?}", self.name, thread::current().name());
    }

    fn run_background(&self, per_chunk: Duration, progress: &Progress<u32>) -> std::result::Result<u64, BoxError> {
        if self.chunks == 0 {
            return Err(format!("{}: nothing to download", self.name).into());
        }

        let mut bytes = 0;
        for chunk in 1..=self.chunks {
            thread::sleep(per_chunk);
            bytes += 4096;
            progress.report(chunk * 100 / self.chunks);
        }
        Ok(bytes)
    }

    fn on_progress(&self, percent: u32) {
        println!("[{}] {:>3}%", self.name, percent);
    }

    fn on_complete(&self, outcome: Outcome<u64>) {
        match outcome {
            Ok(bytes) => println!("[{}] done, {} bytes", self.name, bytes),
            Err(e) => println!("[{}] failed: {}", self.name, e),
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

fn main() {
    println!("=== Progress Example ===\n");

    let event_loop = EventLoop::new();
    let config = Config::builder()
        .num_threads(2)
        .thread_name_prefix("download")
        .build()
        .expect("invalid config");
    let runtime = Runtime::new(&config, event_loop.handle()).expect("failed to start runtime");

    let finished = Arc::new(AtomicUsize::new(0));
    let jobs = [("alpha", 5, 40), ("beta", 3, 70), ("gamma", 0, 10), ("delta", 4, 25)];

    for (name, chunks, ms) in jobs {
        runtime
            .spawn(
                FakeDownload {
                    name,
                    chunks,
                    finished: finished.clone(),
                },
                Duration::from_millis(ms),
            )
            .expect("submit failed");
    }

    // the owner loop: callbacks only ever run here
    event_loop.run_until(
        || finished.load(Ordering::SeqCst) == jobs.len(),
        Duration::from_secs(10),
    );

    let stats = runtime.stats();
    println!(
        "\n{} jobs executed on {} workers, {} notifications delivered",
        stats.executed,
        stats.workers,
        runtime.channel().delivered()
    );

    runtime.shutdown();
    println!("\n=== Example Complete ===");
}
