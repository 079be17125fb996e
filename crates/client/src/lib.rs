//! Network client for the Pageant Empress offline worker.
//!
//! This crate provides the `Network` abstraction the worker fetches through,
//! its reqwest implementation, and URL helpers for origin checks.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork, Network, NetworkError, UrlError, resolve, same_origin};
