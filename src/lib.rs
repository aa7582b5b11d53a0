#![crate_name = "sliderule"]
#![deny(missing_docs)]

//! Static file serving over HTTP, with byte ranges, conditional caching,
//! gzip, CORS checks, and directory listings.
//!
//! This library exports a high-level interface `FileServer` for running a
//! whole server, and lower-level pieces for embedding the same behavior in
//! an existing hyper setup.
//!
//! ## Basic usage
//!
//! `ServerConfig` holds the settings and follows the builder pattern;
//! `FileServer` wraps it and does the work. `run` binds the configured
//! address and serves until the given shutdown future resolves:
//!
//! ```rust,no_run
//! use sliderule::{FileServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::new("my/doc/root/")
//!         .with_port(8000)
//!         .with_listing(true);
//!
//!     FileServer::new(config)
//!         .run(std::future::pending())
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Advanced usage
//!
//! `FileServer` also implements the `hyper::Service` trait, and its `serve`
//! method answers a single request, so it can sit inside your own service
//! or be called directly:
//!
//! ```rust
//! use sliderule::{FileServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = FileServer::new(ServerConfig::new("my/doc/root/"));
//!
//!     // A dummy request, but normally obtained from hyper.
//!     let request = http::Request::get("/foo/bar.txt")
//!         .header(http::header::RANGE, "bytes=0-99")
//!         .body(())
//!         .unwrap();
//!
//!     // Returns a `hyper::Response`; rejections are already rendered.
//!     let response = server.serve(request).await;
//!     # drop(response);
//! }
//! ```
//!
//! The response side decomposes further: `resolve_target` maps a request
//! path into the document root (refusing escapes), `parse_range` and
//! `is_fresh` make the range and conditional-cache decisions, and the body
//! is produced by `FileBytesStream`, optionally wrapped in a `ByteWindow`
//! (a byte-range slice of the stream) or a `GzipStream`. All of these are
//! exported for custom setups.

mod cache;
mod config;
mod encoding;
mod error;
mod listing;
mod range;
mod resolve;
mod response;
mod service;
mod util;

pub use crate::cache::*;
pub use crate::config::*;
pub use crate::encoding::*;
pub use crate::error::*;
pub use crate::listing::*;
pub use crate::range::*;
pub use crate::resolve::*;
pub use crate::response::*;
pub use crate::service::*;
pub use crate::util::*;
