//! # Router Module
//!
//! Path matching for endpoint templates.
//!
//! The matcher tests one template against one decoded request path and
//! reports captures plus a specificity level; the dispatcher runs it across
//! the registry and picks the most specific match per method.

pub mod core;

pub use core::{matches, UrlMatch};
