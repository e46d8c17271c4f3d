//! Thread arenas disabled: every thread allocates from the fallback arena

use std::thread;
use threadheap::allocator::{fallback_arena, with_front, AllocationHeader};
use threadheap::config::{self, HeapConfig};
use threadheap::{allocate, allocate_aligned, deallocate, deallocate_aligned, stats};

const BLOCKS: usize = 64;

#[test]
fn shared_only_routes_through_fallback() {
    assert!(config::install(HeapConfig::shared_only()).is_ok());
    assert!(!config::current().thread_arenas);

    let fallback = fallback_arena() as *const _ as usize;
    let before = stats();

    let (blocks, ready) = thread::spawn(move || {
        let blocks: Vec<usize> = (0..BLOCKS)
            .map(|i| {
                let ptr = allocate(24 + i).expect("alloc");
                let owner = unsafe { AllocationHeader::arena_of(ptr.as_ptr()) };
                assert_eq!(owner as usize, fallback);
                ptr.as_ptr() as usize
            })
            .collect();
        (blocks, with_front(|front| front.is_ready()))
    })
    .join()
    .expect("worker");

    // The worker never bound a private arena
    assert_eq!(ready, Some(false));
    assert_eq!(stats().arenas_created, before.arenas_created);
    assert!(stats().fallback_outstanding >= before.fallback_outstanding + BLOCKS);

    let aligned = allocate_aligned(100, 4096).expect("aligned alloc");
    assert_eq!(aligned.as_ptr() as usize % 4096, 0);

    for block in blocks {
        unsafe { deallocate(block as *mut u8) };
    }
    unsafe { deallocate_aligned(aligned.as_ptr(), 4096) };

    assert_eq!(stats().fallback_outstanding, before.fallback_outstanding);
    assert_eq!(stats().arenas_created, before.arenas_created);
}
