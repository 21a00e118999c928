//! Audio pipeline: payload decode, playback, and mouth animation.

pub mod analyzer;
pub mod decode;

mod animator;
mod session;
mod sink;

pub use analyzer::AnimatorTuning;
pub use animator::{AnimatorEvent, MouthAnimator};
pub use sink::{PlaybackSink, SinkFactory, alsa_sink_factory};
