//! Domain types of the sync protocol
//!
//! - Commands, protocol versions and request parameters
//! - Device identity and credentials
//! - Raw requests and responses exchanged with the server
//! - Sync round parsing and change accumulation
//! - Server capabilities and autodiscover documents
//! - Error types

pub mod autodiscover;
pub mod capabilities;
pub mod command;
pub mod errors;
pub mod identity;
pub mod parameter;
pub mod request;
pub mod response;
pub mod sync;
pub mod version;

pub use autodiscover::AutodiscoverOutcome;
pub use capabilities::ServerCapabilities;
pub use command::Command;
pub use errors::{AirSyncError, AirSyncResult};
pub use identity::{Credentials, DeviceIdentity};
pub use parameter::{ParameterMap, ParameterName, ParameterValue};
pub use request::{HttpMethod, RawRequest};
pub use response::{ExchangeSnapshot, RawResponse};
pub use sync::{
    ChangeKind, ChangeRecord, SyncAccumulator, SyncOutcome, SyncRound, SyncStatus,
};
pub use version::ProtocolVersion;
