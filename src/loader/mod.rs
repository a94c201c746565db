pub mod document;
pub mod error;
pub mod loader;
pub mod source;

pub use document::{Batch, FeedDocument};
pub use error::{LoadError, TransportCode};
pub use loader::{AsyncLoader, LoadState, LoadStatus, Outcome, Ticket};
pub use source::{FeedSource, JsonSource};
