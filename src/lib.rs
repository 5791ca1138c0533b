//! Recordsift - scanned government-document acquisition and indexing.
//!
//! Acquires PDF corpora from remote archives, extracts text through a
//! native-layer-then-OCR cascade, derives structured metadata, and keeps
//! the results searchable through a small read-only HTTP surface.

pub mod cli;
pub mod config;
pub mod extract;
pub mod metadata;
pub mod models;
pub mod repository;
pub mod server;
pub mod services;
pub mod storage;
