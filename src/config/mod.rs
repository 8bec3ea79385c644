//! Configuration: the user-facing `Settings` file and the explicit
//! `StoreConfig` passed into the store engine.

pub mod settings;

pub use settings::{Settings, StoreConfig};
