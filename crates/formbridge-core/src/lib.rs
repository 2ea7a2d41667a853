//! FormBridge Core: error type, configuration, integration data model.

pub mod config;
pub mod error;
pub mod model;
pub mod value;

pub use config::{DataPaths, FormBridgeConfig};
pub use error::{Error, Result};
pub use model::*;
