//! mv-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for all other mv-* crates,
//! providing type-safe identifiers, a unified error type, the media file
//! lifecycle model, application configuration, a broadcast event bus, and
//! the [`RecordStore`] persistence seam used by the conversion pipeline.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod media;
pub mod store;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use events::{EventBus, EventPublisher};
pub use ids::*;
pub use media::*;
pub use store::RecordStore;
