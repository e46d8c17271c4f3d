//! Producer/consumer workloads through the public entry points

use std::sync::mpsc;
use std::thread;
use threadheap::allocator::{with_front, AllocationHeader, OverAlignmentRecord};
use threadheap::{allocate, allocate_aligned, deallocate, deallocate_aligned, stats};

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 500;

#[test]
fn producers_allocate_consumer_frees() {
    let before = stats();
    let (tx, rx) = mpsc::channel::<(usize, usize, u8)>();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let tx = tx.clone();
            thread::spawn(move || {
                let arena = with_front(|front| front.arena()).expect("front").as_ptr() as usize;
                for i in 0..PER_PRODUCER {
                    let size = 8 + (i % 200);
                    let ptr = allocate(size).expect("alloc");
                    unsafe { core::ptr::write_bytes(ptr.as_ptr(), id as u8, size) };
                    assert_eq!(unsafe { AllocationHeader::arena_of(ptr.as_ptr()) } as usize, arena);
                    tx.send((ptr.as_ptr() as usize, size, id as u8)).expect("send");
                }
            })
        })
        .collect();
    drop(tx);

    let consumer = thread::spawn(move || {
        let mut freed = 0;
        for (addr, size, fill) in rx {
            let bytes = unsafe { core::slice::from_raw_parts(addr as *const u8, size) };
            assert!(bytes.iter().all(|&b| b == fill), "block contents clobbered");
            unsafe { deallocate(addr as *mut u8) };
            freed += 1;
        }
        freed
    });

    for producer in producers {
        producer.join().expect("producer");
    }
    assert_eq!(consumer.join().expect("consumer"), PRODUCERS * PER_PRODUCER);

    let after = stats();
    assert!(after.arenas_created >= before.arenas_created + PRODUCERS);
    assert!(after.arenas_retired >= before.arenas_retired + PRODUCERS);
    assert!(after.arenas_destroyed >= before.arenas_destroyed + PRODUCERS);
}

#[test]
fn over_aligned_blocks_freed_elsewhere() {
    let blocks: Vec<(usize, usize)> = thread::spawn(|| {
        [32usize, 64, 512, 4096, 65536]
            .iter()
            .map(|&align| {
                let ptr = allocate_aligned(1000, align).expect("aligned alloc");
                assert_eq!(ptr.as_ptr() as usize % align, 0);
                (ptr.as_ptr() as usize, align)
            })
            .collect()
    })
    .join()
    .expect("owner");

    for (addr, align) in blocks {
        unsafe {
            let unaligned = OverAlignmentRecord::read(addr as *mut u8);
            assert!((unaligned as usize) < addr);
            deallocate_aligned(addr as *mut u8, align);
        }
    }
}
