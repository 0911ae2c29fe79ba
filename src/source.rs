//! Position source: off-thread layout generation with an in-process
//! fallback.
//!
//! Generating the particle layouts is the only startup work heavy enough
//! to be worth moving off the render thread. The exchange is one-shot and
//! fire-and-forget: the generator thread computes a [`ParticleSet`] and
//! sends it through a channel, moving buffer ownership with the message.
//! Until the batch arrives the backdrop renders zeroed positions. If the
//! thread cannot be spawned at all, the same batch is computed inline
//! before the caller proceeds; the two paths are functionally identical.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

use crate::geometry::{LayoutParams, ParticleSet};

enum Strategy {
    /// Layouts are being computed on a named background thread.
    Background {
        receiver: Option<Receiver<ParticleSet>>,
        thread: Option<JoinHandle<()>>,
    },
    /// Layouts were computed synchronously and are waiting to be taken.
    Inline { batch: Option<ParticleSet> },
}

/// Supplies the generated particle layouts to the render loop.
///
/// Exactly one batch is ever produced. [`PositionSource::poll`] is called
/// once per frame and yields the batch exactly once, whichever strategy
/// produced it.
pub struct PositionSource {
    strategy: Strategy,
}

impl PositionSource {
    /// Starts generating layouts on a background thread, falling back to
    /// inline generation when the thread cannot be spawned.
    pub fn spawn(count: usize, params: LayoutParams) -> Self {
        let (sender, receiver) = mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("stardust-geometry".into())
            .spawn(move || {
                // A send failure means the source was terminated before
                // the batch arrived; the work is simply discarded.
                let _ = sender.send(ParticleSet::generate(count, &params));
            });

        match spawned {
            Ok(thread) => Self {
                strategy: Strategy::Background {
                    receiver: Some(receiver),
                    thread: Some(thread),
                },
            },
            Err(error) => {
                log::warn!("geometry thread unavailable, generating inline: {error}");
                Self::inline(count, params)
            }
        }
    }

    /// Generates layouts synchronously on the calling thread.
    pub fn inline(count: usize, params: LayoutParams) -> Self {
        Self {
            strategy: Strategy::Inline {
                batch: Some(ParticleSet::generate(count, &params)),
            },
        }
    }

    /// Returns the generated batch once it is available, then `None`
    /// forever after. Never blocks.
    pub fn poll(&mut self) -> Option<ParticleSet> {
        match &mut self.strategy {
            Strategy::Background { receiver, .. } => {
                let live = receiver.as_ref()?;
                match live.try_recv() {
                    Ok(batch) => {
                        // One-shot: drop the channel so later polls are
                        // trivially empty.
                        *receiver = None;
                        Some(batch)
                    }
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => {
                        *receiver = None;
                        None
                    }
                }
            }
            Strategy::Inline { batch } => batch.take(),
        }
    }

    /// True while a background batch has been requested but not yet
    /// received.
    pub fn is_pending(&self) -> bool {
        match &self.strategy {
            Strategy::Background { receiver, .. } => receiver.is_some(),
            Strategy::Inline { batch } => batch.is_some(),
        }
    }

    /// Stops the source. Idempotent: tolerates a thread that already
    /// finished, already failed, or was already terminated.
    pub fn terminate(&mut self) {
        if let Strategy::Background { receiver, thread } = &mut self.strategy {
            // Dropping the receiver makes any in-flight send fail, which
            // lets the generator thread exit promptly.
            *receiver = None;
            if let Some(thread) = thread.take() {
                if thread.join().is_err() {
                    log::warn!("geometry thread panicked before termination");
                }
            }
        }
    }
}

impl Drop for PositionSource {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::PositionSource;
    use crate::geometry::LayoutParams;

    #[test]
    fn inline_source_delivers_exactly_once() {
        let mut source = PositionSource::inline(32, LayoutParams::default());
        assert!(source.is_pending());

        let batch = source.poll().expect("inline batch must be ready");
        assert_eq!(batch.count, 32);
        assert_eq!(batch.cloud.len(), 96);
        assert_eq!(batch.sphere.len(), 96);
        assert_eq!(batch.torus.len(), 96);
        assert_eq!(batch.seeds.len(), 32);

        assert!(source.poll().is_none());
        assert!(!source.is_pending());
    }

    #[test]
    fn background_source_delivers_a_complete_batch() {
        let mut source = PositionSource::spawn(220, LayoutParams::default());

        let deadline = Instant::now() + Duration::from_secs(5);
        let batch = loop {
            if let Some(batch) = source.poll() {
                break batch;
            }
            assert!(Instant::now() < deadline, "batch never arrived");
            std::thread::sleep(Duration::from_millis(1));
        };

        assert_eq!(batch.count, 220);
        assert_eq!(batch.sphere.len(), 660);
        assert!(source.poll().is_none());
    }

    #[test]
    fn terminate_is_idempotent_and_tolerates_a_finished_thread() {
        let mut source = PositionSource::spawn(8, LayoutParams::default());
        source.terminate();
        source.terminate();
        // Polling after termination is a no-op, not a panic.
        assert!(source.poll().is_none());
    }

    #[test]
    fn terminate_before_delivery_discards_the_batch() {
        let mut source = PositionSource::spawn(100_000, LayoutParams::default());
        source.terminate();
        assert!(source.poll().is_none());
        assert!(!source.is_pending());
    }
}
