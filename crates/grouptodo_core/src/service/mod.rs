//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model transformations and slot persistence into the
//!   store API consumed by presentation layers.

pub mod store;
