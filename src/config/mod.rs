//! Configuration for latch.
//!
//! This module defines the Config struct that represents the optional
//! `config.yaml` stored next to the registry. Unknown fields are ignored and
//! every field has a default, so a missing file is a valid configuration.

mod model;
mod operations;


pub use model::{Config, KdfConfig};
