use crate::signal::StatusLatch;
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Recovers frame-aligned sample windows from a continuous, silence-padded,
/// block-unaligned input stream.
///
/// The loop alternates between two states: while fewer than `frame_size`
/// samples are buffered it pulls raw blocks and compacts leading silence,
/// and once a full frame is buffered it drains exactly `frame_size` samples
/// into one output window. Injected silence is assumed to be exactly zero;
/// genuine signal is assumed never to hit exact zero twice in a row, so the
/// compaction drops one sample whenever the two frontmost samples are both
/// zero.
pub struct FrameSynchronizer {
    frame_size: usize,
    receiving: StatusLatch,
}

impl FrameSynchronizer {
    pub fn new(frame_size: usize, receiving: StatusLatch) -> Self {
        Self { frame_size, receiving }
    }

    /// Runs until cancelled or the input closes. Applies no backpressure
    /// beyond the bounded internal buffer and has no failure path.
    pub async fn synchronize(
        self,
        mut unsynchronized: mpsc::UnboundedReceiver<Vec<f32>>,
        synchronized: mpsc::UnboundedSender<Vec<f32>>,
    ) {
        let capacity = self.frame_size * 2;
        let mut samples: VecDeque<f32> = VecDeque::with_capacity(capacity);

        loop {
            if samples.len() < self.frame_size {
                let Some(block) = unsynchronized.recv().await else {
                    log::debug!("unsynchronized sample queue closed, synchronizer exiting");
                    return;
                };
                samples.extend(block);
                while samples.len() > capacity {
                    samples.pop_front();
                }
                while samples.len() >= 2 && samples[0] == 0.0 && samples[1] == 0.0 {
                    samples.pop_front();
                }
            }

            if samples.len() >= self.frame_size {
                self.receiving.set();
                let window: Vec<f32> = samples.drain(..self.frame_size).collect();
                if synchronized.send(window).is_err() {
                    log::debug!("synchronized sample queue closed, synchronizer exiting");
                    return;
                }
            } else {
                self.receiving.clear();
            }
        }
    }
}
