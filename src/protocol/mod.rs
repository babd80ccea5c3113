//! Reusable provider protocol implementations (spec.md §4.6-§4.7, components C6-C7).
//!
//! Concrete providers in `crate::providers` build on these instead of re-implementing wire
//! formats per vendor.

pub mod anthropic_compat;
pub mod openai_compat;
