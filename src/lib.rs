//! Declarative watch documents.
//!
//! A watch pairs a trigger, an input, a condition, an optional transform and
//! a named set of actions into a single nested document. The same document
//! encoding is used to persist watch definitions and to record past action
//! results. Concrete trigger/input/condition/transform/action kinds are open:
//! they plug into a [`application::WatchRegistry`] keyed by a discriminator
//! string, so new kinds register a factory instead of touching dispatch code.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
