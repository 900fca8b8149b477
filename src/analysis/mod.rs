//! Peak picking, integration, multiplet and zone detection

pub mod integration;
pub mod multiplets;
pub mod peaks;
pub mod zones;

pub use multiplets::RangeOptions;
pub use peaks::PeakPickingOptions;
pub use zones::ZoneOptions;
