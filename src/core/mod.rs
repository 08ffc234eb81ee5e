//! Core library components.
//!
//! This module contains the resolution engine, the source contract and its
//! implementations, the encrypted cache behind every source, and settings
//! handling.

pub mod cache;
pub mod configurations;
pub mod constants;
pub mod settings;
pub mod source;
pub mod store;
pub mod value;
