//! # Finder
//!
//! A small lost and found web service.
//!
//! Submissions arrive as url-encoded forms at `/api/items`, are kept in memory and listed
//! back as JSON. Every other path serves the browser client from a static directory.
//! The HTTP/1.1 layer is implemented from scratch on top of tokio.
//!
//! Refer to the included binary for the complete server.
pub mod app;
pub mod http;
pub mod items;
pub mod logging;
pub mod runtime;
pub mod settings;
