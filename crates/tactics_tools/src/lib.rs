//! # Tactics Development Tools
//!
//! Command-line tools for working on game data:
//! - Data validation
//! - Ability timeline inspection

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod inspect;
pub mod validate;
