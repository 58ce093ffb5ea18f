//! # Tower Defense Development Tools
//!
//! Command-line tools for development:
//! - Configuration validators
//! - Default configuration export

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
