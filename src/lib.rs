//! Action-driven state engine for viewing and processing NMR spectra.
//!
//! The host application turns user gestures into [`Action`]s and feeds them to
//! [`reduce`] (or a [`Store`]). Every action yields a new immutable [`State`]
//! whose untouched branches keep their `Arc` identity, so a rendering layer can
//! skip work by pointer comparison.

pub mod analysis;
pub mod correlation;
pub mod data;
pub mod error;
pub mod log;
pub mod pipeline;
pub mod reducer;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

pub use data::document::{export_document, import_document, NmriumDocument};
pub use error::EngineError;
pub use reducer::action::Action;
pub use reducer::{reduce, reduce_json};
pub use state::State;
pub use store::{Store, StoreEvent, SubscriptionId};
