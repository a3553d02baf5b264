//! Hookway service surface: settings, configuration retrieval and the HTTP
//! transport adapter.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod parameters;
pub mod server;

pub use config::{ConfigSource, Settings};
pub use parameters::{
    resolve_config_document, HttpParameterStore, Parameter, ParameterError, ParameterStore,
};
pub use server::{create_router, start_server};
