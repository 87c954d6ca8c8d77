//! Ports (trait boundaries) for external dependencies.
//!
//! These traits are owned by the domain and implemented by adapters such as
//! the progress and metrics observers in [`crate::pipeline`].

pub mod observer;

pub use observer::Observer;
