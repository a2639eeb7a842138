//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the event
//! loop. In particular, it exposes a generational [`Slab`] arena used to hold
//! descriptor entries behind keys that survive removal during dispatch.

mod slab;

pub(crate) use slab::{Key, Slab};
