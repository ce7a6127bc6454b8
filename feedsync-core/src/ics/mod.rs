//! ICS feed parsing and instance generation.
//!
//! This module handles reading feeds and writing single instances according to RFC 5545.

mod generate;
mod parse;
mod timezone;

pub use generate::{RenderOptions, generate_instance};
pub use parse::{ParsedFeed, parse_feed};
pub use timezone::{localize, resolve_tzid};
