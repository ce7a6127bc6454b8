//! Recurrence rules and their expansion into concrete instances.

mod expand;
mod rule;

pub use expand::{Expansion, expand, expand_all};
pub use rule::{Frequency, RecurrenceRule};
