//! Pyramid driving loop and the public equalizer entry points.

pub(crate) mod equalizer;
pub(crate) mod opts;
pub(crate) mod pyramid;

#[cfg(feature = "gpu")]
pub use equalizer::DeviceOutcome;
pub use equalizer::{Equalizer, RunStats};
pub use opts::EngineOpts;
