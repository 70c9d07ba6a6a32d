//! Record model types.
//!
//! # Responsibility
//! - Define the canonical record, its item lists and documents.
//! - Keep date composition rules next to the types that carry them.

pub mod dates;
pub mod document;
pub mod item;
pub mod record;

pub use dates::DateParts;
pub use document::{Document, File};
pub use item::{Item, ItemList, Name};
pub use record::{EPrints, Record};
