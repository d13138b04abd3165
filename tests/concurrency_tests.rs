//! # Concurrency Tests using Loom
//!
//! This module uses loom to model the cancellation protocol between the run
//! worker and a canceller: the worker consumes descriptors one at a time and
//! checks the token between tests, so every descriptor ends up either
//! executed or skipped, never lost and never both.

#[cfg(test)]
mod tests {
    use loom::sync::atomic::{AtomicUsize, Ordering};
    use loom::sync::Arc;
    use loom::thread;
    use tokio_util::sync::CancellationToken;

    /// Models the worker/canceller race around the cancellation token.
    ///
    /// The real worker holds the queue behind an async mutex; that model is
    /// too large for loom to explore, so this reduction keeps the essential
    /// shape: a worker that checks `is_cancelled()` before each unit of work,
    /// and a second thread that fires the token at an arbitrary point.
    ///
    /// The invariant checked is the ledger-accounting one: executed + skipped
    /// always equals the number of queued descriptors, for every interleaving.
    #[test]
    fn test_every_descriptor_is_executed_or_skipped() {
        // Loom's exhaustive exploration needs a deep stack for some
        // interleavings.
        const STACK_SIZE: usize = 8 * 1024 * 1024; // 8 MB

        let builder = std::thread::Builder::new()
            .name("loom-test-thread".into())
            .stack_size(STACK_SIZE);

        let handle = builder
            .spawn(|| {
                loom::model(|| {
                    const QUEUED: usize = 2;
                    let executed = Arc::new(AtomicUsize::new(0));
                    let skipped = Arc::new(AtomicUsize::new(0));
                    let token = Arc::new(CancellationToken::new());

                    let worker = {
                        let executed = executed.clone();
                        let skipped = skipped.clone();
                        let token = token.clone();
                        thread::spawn(move || {
                            for remaining in (1..=QUEUED).rev() {
                                // The check the worker performs between tests.
                                if token.is_cancelled() {
                                    skipped.fetch_add(remaining, Ordering::SeqCst);
                                    return;
                                }
                                executed.fetch_add(1, Ordering::SeqCst);
                            }
                        })
                    };

                    let canceller = {
                        let token = token.clone();
                        thread::spawn(move || {
                            token.cancel();
                        })
                    };

                    worker.join().unwrap();
                    canceller.join().unwrap();

                    let executed = executed.load(Ordering::SeqCst);
                    let skipped = skipped.load(Ordering::SeqCst);
                    assert_eq!(
                        executed + skipped,
                        QUEUED,
                        "descriptors lost or double-counted: executed={executed} skipped={skipped}"
                    );
                });
            })
            .unwrap();

        handle.join().unwrap();
    }

    /// Once the token is observed cancelled, it stays cancelled: a worker
    /// that saw the signal can never start another descriptor.
    #[test]
    fn test_cancellation_is_sticky() {
        loom::model(|| {
            let token = Arc::new(CancellationToken::new());
            let observed = Arc::new(AtomicUsize::new(0));

            let t1 = {
                let token = token.clone();
                let observed = observed.clone();
                thread::spawn(move || {
                    token.cancel();
                    if token.is_cancelled() {
                        observed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            };

            t1.join().unwrap();
            // The cancelling thread always observes its own cancel.
            assert_eq!(observed.load(Ordering::SeqCst), 1);
            assert!(token.is_cancelled());
        });
    }
}
