//! Scoped fan-out over CPU cores for read-only work.
//!
//! Used for query batches, large flat scans, k-means assignment and IVF
//! add-time assignment. Results always come back in input order so callers
//! see exactly what the sequential loop would have produced.

use crossbeam_utils::thread;
use std::ops::Range;

/// Number of worker threads to fan out to.
pub fn worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Splits `0..len` into at most `worker_count()` contiguous ranges of at least
/// `min_chunk` elements and evaluates `f` on each, in parallel.
pub fn map_ranges<R, F>(len: usize, min_chunk: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(Range<usize>) -> R + Sync,
{
    let max_chunks = len / min_chunk.max(1);
    let workers = worker_count().min(max_chunks);
    if workers <= 1 {
        return vec![f(0..len)];
    }

    let chunk = len.div_ceil(workers);
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = (0..len)
            .step_by(chunk)
            .map(|start| {
                let end = (start + chunk).min(len);
                s.spawn(move |_| f(start..end))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
    .unwrap_or_else(|e| std::panic::resume_unwind(e))
}

/// Applies `f` to every item, spreading items across threads.
pub fn map<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    map_ranges(items.len(), 1, |range| items[range].iter().map(&f).collect::<Vec<R>>())
        .into_iter()
        .flatten()
        .collect()
}
