//! TikTok Live event sources
//!
//! Two implementations of the core `LiveEventSource` seam:
//!
//! - [`BridgeLiveSource`] consumes the JSON event stream of a webcast bridge
//!   service over WebSocket (the bridge speaks the TikTok webcast protocol
//!   and re-emits plain frames).
//! - [`DemoLiveSource`] simulates a live room for local testing: scripted
//!   shopper messages plus an injection handle.
//!
//! Both run chat through the spam dedup filter before emitting, so
//! downstream consumers never see a repeat of the same (user, message) pair
//! inside the cooldown window.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bridge;
mod demo;

pub use bridge::BridgeLiveSource;
pub use demo::{DemoHandle, DemoLiveSource};
