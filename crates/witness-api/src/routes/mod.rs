//! Route modules. Each exposes a `router()` merged by [`crate::app`].

pub mod content;
pub mod reports;
