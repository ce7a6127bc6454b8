//! CalDAV implementation of feedsync's `RemoteStore`.
//!
//! Plain HTTP requests (PROPFIND, REPORT, PUT, DELETE) with basic auth;
//! multistatus responses are read with roxmltree.

mod client;
mod discovery;
mod store;
mod xml;

pub use client::{CalDavClient, CalDavConfig};
pub use discovery::{CalendarEntry, discover_calendars, select_calendar};
pub use store::CalDavStore;
