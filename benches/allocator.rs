//! Allocator benchmarks
//!
//! Compares the per-thread arena path against the system allocator for
//! same-thread and cross-thread frees.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::mpsc;
use std::thread;
use threadheap::{allocate, allocate_aligned, deallocate, deallocate_aligned, ThreadHeap};

fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free");

    for size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("threadheap", size), &size, |b, &size| {
            b.iter(|| {
                let ptr = allocate(black_box(size)).expect("alloc");
                unsafe { deallocate(ptr.as_ptr()) };
            });
        });

        let layout = Layout::from_size_align(size, 8).unwrap();
        group.bench_with_input(BenchmarkId::new("system", size), &layout, |b, &layout| {
            b.iter(|| unsafe {
                let ptr = System.alloc(black_box(layout));
                System.dealloc(ptr, layout);
            });
        });
    }

    group.finish();
}

fn bench_over_aligned(c: &mut Criterion) {
    c.bench_function("alloc_free_4096_aligned", |b| {
        b.iter(|| {
            let ptr = allocate_aligned(black_box(64), 4096).expect("alloc");
            unsafe { deallocate_aligned(ptr.as_ptr(), 4096) };
        });
    });

    let layout = Layout::from_size_align(64, 4096).unwrap();
    c.bench_function("global_alloc_4096_aligned", |b| {
        b.iter(|| unsafe {
            let ptr = ThreadHeap.alloc(black_box(layout));
            ThreadHeap.dealloc(ptr, layout);
        });
    });
}

fn bench_cross_thread_free(c: &mut Criterion) {
    const BATCH: usize = 1024;

    c.bench_function("cross_thread_free_1024", |b| {
        b.iter(|| {
            let (tx, rx) = mpsc::channel::<Vec<usize>>();
            let consumer = thread::spawn(move || {
                for batch in rx {
                    for addr in batch {
                        unsafe { deallocate(addr as *mut u8) };
                    }
                }
            });

            let batch: Vec<usize> = (0..BATCH)
                .map(|_| allocate(64).expect("alloc").as_ptr() as usize)
                .collect();
            tx.send(batch).expect("send");
            drop(tx);
            consumer.join().expect("consumer");
        });
    });
}

criterion_group!(benches, bench_allocation, bench_over_aligned, bench_cross_thread_free);
criterion_main!(benches);
