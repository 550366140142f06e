//! airsync Core - protocol logic of the sync client
//!
//! This crate contains everything that does not touch the network:
//! - **Domain types** - `Command`, `ProtocolVersion`, `RawRequest`, `RawResponse`,
//!   sync rounds and the change accumulator
//! - **Query encoding** - plain and base64 request queries
//! - **Body codecs** - content-type dispatch between WBXML, multipart and text
//! - **Port definitions** - `IWbxmlCodec` for the binary XML engine and
//!   `IExchange` for one request/response round trip
//! - **Configuration** - YAML configuration with validation
//!
//! # Architecture
//!
//! The HTTP pipeline, the sync merge loop and the polling helpers live in
//! `airsync-client` and reach this crate only through the types and ports
//! defined here.

pub mod charset;
pub mod codec;
pub mod config;
pub mod domain;
pub mod multipart;
pub mod ports;
pub mod query;
pub mod xml;

pub use domain::errors::{AirSyncError, AirSyncResult};
