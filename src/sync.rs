//! Synchronization primitives coordinating producers and consumers.

pub mod sem;
