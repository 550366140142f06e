//! Port definitions
//!
//! The core depends on two outside collaborators, expressed as traits:
//!
//! - [`IWbxmlCodec`] - the compact binary XML engine (not implemented here)
//! - [`IExchange`] - one request/response round trip with the server,
//!   implemented over HTTP by `airsync-client`

pub mod exchange;
pub mod wbxml;

pub use exchange::IExchange;
pub use wbxml::IWbxmlCodec;
