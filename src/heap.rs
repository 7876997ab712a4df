//! Record-level storage on slotted pages.
//!
//! - [`Field`]: a typed value (32-bit int, 32-bit float, or text)
//! - [`Record`]: an ordered, schema-less sequence of fields with a
//!   whitespace-delimited text serialization
//! - [`SlottedPage`]: a page-sized view placing records behind a fixed
//!   slot directory

mod error;
mod field;
mod page;
mod record;

pub use error::HeapError;
pub use field::{Field, FieldKind};
pub use page::{
    INVALID_VALUE, MAX_RECORD_SIZE, MAX_SLOTS, SLOT_DIRECTORY_SIZE, SLOT_SIZE, Slot, SlotId,
    SlottedPage,
};
pub use record::Record;
