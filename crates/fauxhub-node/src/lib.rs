//! FauxHub server library: router, handlers, configuration, and the
//! listener surface.

pub mod api;
pub mod codeload;
pub mod config;
pub mod error;
pub mod git_http;
pub mod mime;
pub mod observability;
pub mod raw;
pub mod server;
pub mod subdomain;
pub mod web;
