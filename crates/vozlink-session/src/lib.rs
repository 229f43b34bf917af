//! Duplex audio session pipeline.
//!
//! One phone call = one [`SessionCoordinator`] driving a cycle of four
//! tightly-coupled pieces around a single invariant — audio reaches the
//! caller strictly in order, at most one frame in flight:
//!
//! ```text
//!   caller audio ─► UtteranceAccumulator ─► (utterance)
//!        ▲                                       │
//!        │                                       ▼
//!   DeliveryEngine ◄─ SynthesisDispatcher ◄─ ReplySegmenter ◄─ model deltas
//! ```
//!
//! Barge-in cuts across the cycle: new caller speech while playback markers
//! are outstanding aborts the delivery engine, invalidates the generation
//! token so in-flight synthesis is discarded on arrival, and clears the
//! provider's playback queue.
#![deny(unused_crate_dependencies)]

pub mod accumulator;
pub mod coordinator;
pub mod delivery;
pub mod dispatcher;
pub mod generation;
pub mod history;
pub mod normalize;
pub mod segmenter;

// Re-export key types for convenience
pub use accumulator::{UtteranceAccumulator, UtteranceEvent};
pub use coordinator::{InboundEvent, SessionCoordinator, SessionState};
pub use delivery::{DeliveryEngine, PlaybackMark};
pub use dispatcher::SynthesisDispatcher;
pub use generation::{GenerationCounter, GenerationToken};
pub use history::ConversationHistory;
pub use normalize::normalize_for_speech;
pub use segmenter::ReplySegmenter;

// Silence unused dev-dependency warnings: these are exercised by tests/
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use tokio_test as _;
