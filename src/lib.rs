// src/lib.rs

//! Examination notice monitor library
//!
//! Fetches the examination schedule page, extracts notices, decides which
//! ones are new against a persisted watermark, and fans new notices out to
//! registered observers.

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
