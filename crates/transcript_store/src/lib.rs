//! Ordered conversation transcript with tiered durable persistence.
//!
//! Domain events from any transport fold into one [`Transcript`] in arrival
//! order; the [`TranscriptStore`] persists snapshots under both halves of the
//! session identity, degrades retained history under storage quota pressure
//! instead of losing the latest write, and debounces writes while mutations
//! are still arriving.

mod debounce;
mod entry;
mod error;
mod identity;
mod store;
mod tier;

pub use debounce::Debouncer;
pub use entry::{ToolStatus, Transcript, TranscriptEntry};
pub use error::StoreError;
pub use identity::SessionIdentity;
pub use store::{RetentionPolicy, TranscriptStore, DEBOUNCE_DELAY};
pub use tier::{sanitize_key, DurableDirStore, StorageTier, VolatileStore};
