//! Marketplace listing parser
//!
//! Extracts structured listing data from saved marketplace page snapshots:
//! - JSON-LD product records reconciled with the rendered page
//! - Seller-analytics overlay cards injected by a third-party tool
//! - Results-page listing discovery with threshold filtering
//!
//! Output can be uploaded to a local endpoint or saved as image downloads.
//! A C ABI is exposed for hosts that drive extraction through JSON messages.

pub mod download;
pub mod error;
pub mod extractors;
pub mod ffi;
pub mod filter;
pub mod message;
pub mod model;
pub mod orchestrator;
pub mod page;
pub mod sink;

pub use error::{ErrorKind, ExtractError, ParseWarning, SinkError};
pub use ffi::*;
pub use filter::passes;
pub use model::*;
pub use orchestrator::{extract_all_listings, extract_images, extract_listing};
pub use page::{Page, PageKind};
