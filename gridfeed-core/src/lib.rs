//! gridfeed core: records, event dispatch, retry and source adapters.
//!
//! This crate contains the extract/transform side of the pipeline:
//! - The canonical [`Record`](domain::Record) every source is reshaped into
//! - A synchronous publish/subscribe [`EventManager`](events::EventManager)
//! - A bounded fixed-delay [`retry`](retry::retry) combinator
//! - One [`SourceAdapter`](source::SourceAdapter) per external source
//!   (Elexon BMRS, Terna transparency API, IBEX DAM capacities page)

pub mod domain;
pub mod events;
pub mod retry;
pub mod source;

pub use domain::{DateRange, Record, RECORD_COLUMNS};
pub use events::{EventError, EventManager, Subscriber, SubscriberError, DATA_EMIT};
pub use retry::{retry, RetryError, RetryPolicy};
pub use source::{SourceAdapter, SourceError};
