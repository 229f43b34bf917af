//! Reorder & delivery engine.
//!
//! Synthesis completions arrive out of order and concurrently; the provider
//! must receive audio strictly in sequence, one frame in flight at a time.
//! The engine buffers early arrivals, drains contiguous runs through a
//! single active drain task, and emits a playback marker for every frame
//! handed to the transport.
//!
//! All cross-component interaction goes through [`submit`]/[`abort`]/
//! [`resume`]/[`reset`] — nothing else touches the buffer, the queue, or the
//! flags, and the internal mutex is never held across an await.
//!
//! [`submit`]: DeliveryEngine::submit
//! [`abort`]: DeliveryEngine::abort
//! [`resume`]: DeliveryEngine::resume
//! [`reset`]: DeliveryEngine::reset

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use vozlink_core::MediaTransport;

/// Emitted right after a frame is handed to the transport, before the
/// provider confirms playback. The coordinator's outstanding-marker set is
/// its "currently speaking" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackMark {
    /// Opaque name echoed back by the provider when playback completes.
    pub name: String,
}

#[derive(Debug, Default)]
struct DeliveryState {
    /// Next sequence index eligible for delivery.
    expected: u64,
    /// Early arrivals: holds only indices strictly greater than the range
    /// already queued for delivery.
    buffer: BTreeMap<u64, Vec<u8>>,
    /// Contiguous run awaiting the drain task, FIFO.
    queue: VecDeque<Vec<u8>>,
    /// True while a drain task owns delivery. The single-drain discipline is
    /// what serializes the output stream.
    draining: bool,
    /// Set by `abort()`; cleared by `resume()`/`reset()`.
    aborted: bool,
    /// Bumped by `abort()`/`reset()` so a drain task that was mid-send when
    /// the state changed exits without touching the counters.
    epoch: u64,
}

/// Cheap-clone handle to one session's delivery state.
#[derive(Clone)]
pub struct DeliveryEngine {
    state: Arc<Mutex<DeliveryState>>,
    transport: Arc<dyn MediaTransport>,
    marks: mpsc::UnboundedSender<PlaybackMark>,
}

impl DeliveryEngine {
    /// Create an engine delivering to `transport` and reporting markers on
    /// the returned sender's channel.
    #[must_use]
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        marks: mpsc::UnboundedSender<PlaybackMark>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeliveryState::default())),
            transport,
            marks,
        }
    }

    /// Submit one synthesized chunk.
    ///
    /// `None` bypasses reordering and is sent immediately out-of-band.
    /// An index below `expected` (stale or duplicate) is a no-op, as is any
    /// submission while aborted.
    pub fn submit(&self, sequence: Option<u64>, audio: Vec<u8>) {
        let Some(seq) = sequence else {
            let aborted = self.state.lock().unwrap().aborted;
            if aborted {
                trace!("Dropping out-of-band audio while aborted");
                return;
            }
            let this = self.clone();
            tokio::spawn(async move {
                this.deliver_one(&audio).await;
            });
            return;
        };

        let start_drain = {
            let mut st = self.state.lock().unwrap();
            if st.aborted {
                trace!(seq, "Dropping submission while aborted");
                return;
            }
            if seq < st.expected {
                trace!(seq, expected = st.expected, "Stale submission, ignoring");
                return;
            }
            if seq == st.expected {
                if st.draining {
                    // Duplicate of the chunk currently in flight / at the
                    // head of the queue.
                    trace!(seq, "Duplicate of in-flight chunk, ignoring");
                    return;
                }
                st.queue.push_back(audio);
                st.draining = true;
                Some(st.epoch)
            } else {
                st.buffer.insert(seq, audio);
                None
            }
        };

        if let Some(epoch) = start_drain {
            let this = self.clone();
            tokio::spawn(async move {
                this.drain(epoch).await;
            });
        }
    }

    /// Drop everything pending and refuse further submissions until
    /// [`resume`](Self::resume). `expected` is deliberately left alone — a
    /// brand-new interaction goes through [`reset`](Self::reset) instead,
    /// and in the meantime late stale submissions stay no-ops.
    pub fn abort(&self) {
        let mut st = self.state.lock().unwrap();
        st.aborted = true;
        st.draining = false;
        st.epoch += 1;
        let dropped = st.queue.len() + st.buffer.len();
        st.queue.clear();
        st.buffer.clear();
        debug!(dropped, "Delivery engine aborted");
    }

    /// Accept submissions again. Chunks dropped by `abort` are gone — there
    /// is no replay or retransmission.
    pub fn resume(&self) {
        self.state.lock().unwrap().aborted = false;
    }

    /// Start a fresh interaction: sequence counters and buffers are reset
    /// entirely rather than reused across interactions.
    pub fn reset(&self) {
        let mut st = self.state.lock().unwrap();
        st.epoch += 1;
        st.expected = 0;
        st.draining = false;
        st.aborted = false;
        st.queue.clear();
        st.buffer.clear();
    }

    /// Drain loop: exactly one of these runs at a time per engine epoch.
    async fn drain(self, my_epoch: u64) {
        loop {
            let audio = {
                let mut st = self.state.lock().unwrap();
                if st.epoch != my_epoch {
                    // Superseded by abort()/reset(); the new epoch owns the
                    // draining flag now.
                    return;
                }
                match st.queue.pop_front() {
                    Some(audio) => audio,
                    None => {
                        st.draining = false;
                        return;
                    }
                }
            };

            self.deliver_one(&audio).await;

            let mut st = self.state.lock().unwrap();
            if st.epoch != my_epoch {
                return;
            }
            st.expected += 1;
            // Pull now-contiguous buffered chunks behind what is already
            // queued, in index order.
            let mut next = st.expected + st.queue.len() as u64;
            while let Some(audio) = st.buffer.remove(&next) {
                st.queue.push_back(audio);
                next += 1;
            }
        }
    }

    /// Send one frame and its playback marker. Transport trouble is a soft
    /// failure: log, skip the marker, let the caller keep draining.
    async fn deliver_one(&self, audio: &[u8]) {
        if !self.transport.is_open() {
            warn!("Transport not open, dropping audio frame");
            return;
        }
        if let Err(e) = self.transport.send_media(audio).await {
            warn!(error = %e, "Media send failed, skipping marker");
            return;
        }

        let name = Uuid::new_v4().to_string();
        if let Err(e) = self.transport.send_mark(&name).await {
            warn!(error = %e, "Mark send failed");
            return;
        }
        let _ = self.marks.send(PlaybackMark { name });
    }
}
