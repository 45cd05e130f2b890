//! Unloop collector
//!
//! Provides:
//! - `SocialGraphApi` seam and the reqwest-backed Neynar client
//! - Envelope adapter normalizing heterogeneous page shapes
//! - Explicit pagination state machine with a hard page ceiling
//! - Degrade-gracefully collector and the analysis orchestrator

pub mod api;
pub mod collector;
pub mod envelope;
pub mod error;
pub mod neynar;
pub mod orchestrator;
pub mod pager;

pub use api::*;
pub use collector::*;
pub use envelope::*;
pub use error::*;
pub use neynar::*;
pub use orchestrator::*;
pub use pager::*;
