//! `ThreadHeap` as the global allocator with debug logging to a file

use std::sync::mpsc;
use std::thread;
use threadheap::logging::{self, LogConfig, LogFormat, LogOutput};
use threadheap::{stats, ThreadHeap};
use tracing::Level;

#[global_allocator]
static GLOBAL: ThreadHeap = ThreadHeap;

#[test]
fn worker_threads_exit_with_file_logging() {
    let directory = std::env::temp_dir().join(format!("threadheap-log-{}", std::process::id()));
    std::fs::create_dir_all(&directory).expect("log directory");

    let guard = logging::init_with_config(
        LogConfig::default()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_output(LogOutput::File {
                directory: directory.to_string_lossy().into_owned(),
                file_name: "threadheap.log".to_string(),
            }),
    );
    assert!(guard.is_some());

    let before = stats();
    let (tx, rx) = mpsc::channel::<Vec<String>>();
    let workers: Vec<_> = (0..8)
        .map(|w| {
            let tx = tx.clone();
            thread::spawn(move || {
                logging::debug!(worker = w, "worker started");
                let batch = (0..200).map(|i| format!("w{}-{}", w, i)).collect();
                tx.send(batch).expect("send");
            })
        })
        .collect();
    drop(tx);
    for worker in workers {
        worker.join().expect("worker exit");
    }

    // Blocks from exited workers are freed here, on a live thread
    let batches: Vec<Vec<String>> = rx.iter().collect();
    assert_eq!(batches.len(), 8);
    drop(batches);

    let after = stats();
    assert!(after.arenas_retired >= before.arenas_retired + 8);
    assert!(after.arenas_destroyed > before.arenas_destroyed);

    drop(guard);
    let written = std::fs::read_to_string(directory.join("threadheap.log")).expect("log file");
    assert!(written.contains("arena_created"));
}
