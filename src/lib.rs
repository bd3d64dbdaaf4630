#![deny(missing_docs)]

//! Core library for the Read For Me document-to-speech service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Format-specific document text extraction.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Speech synthesis client abstraction and adapters.
pub mod speech;
/// Audio artifact delivery strategies and deferred cleanup.
pub mod storage;
/// Summarization client abstraction and adapters.
pub mod summarization;
/// Shared HTTP transport for the upstream AI provider.
pub mod upstream;
