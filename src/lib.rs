//! meme-front library
//!
//! A caching front end for an external meme rendering service. The core of
//! the crate is a set of caching and validation services: a template catalog
//! mirrored from the rendering API, a filesystem-backed thumbnail cache,
//! content-addressed short links and overlay blobs, and an upload pipeline
//! that turns untrusted multipart input into a new template directory.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod content_address;
pub mod errors;
pub mod models;
pub mod overlays;
pub mod short_links;
pub mod thumbnails;
pub mod uploads;
pub mod utils;
pub mod web;
