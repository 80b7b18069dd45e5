//! mdns-alias - Publish CNAME aliases for the local host over multicast DNS.
//!
//! This crate asks a running avahi-daemon to announce extra `.local` names
//! for this machine, so `printer.local` or `nas.local` resolve to the host
//! alongside its own `<hostname>.local`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         mdns-alias                           │
//! │                                                              │
//! │  ┌──────────────┐  events   ┌──────────────┐                 │
//! │  │ avahi-daemon │──────────▶│   Session    │                 │
//! │  │  (D-Bus)     │           │ (state mach.)│                 │
//! │  └──────────────┘           └──────┬───────┘                 │
//! │         ▲                          │ RUNNING / COLLISION     │
//! │         │ AddRecord / Commit       ▼                         │
//! │         │ Reset / Free       ┌──────────────┐   ┌──────────┐ │
//! │         └────────────────────│  RecordSet   │──▶│ hostname │ │
//! │                              │ (one group)  │   │  labels  │ │
//! │                              └──────────────┘   └──────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! - `RUNNING`: create the entry group if needed and, unless it already holds
//!   records, add one CNAME per alias and commit
//! - `COLLISION` / `REGISTERING`: reset the group so the next `RUNNING`
//!   republishes
//! - `FAILURE`: stop; a supervisor is expected to restart the process
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use mdns_alias::{alias, AliasPublisher, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = Config::default();
//!     let aliases = alias::select_aliases(
//!         ["printer.local"],
//!         &config.publish.suffix,
//!         config.publish.alias_policy,
//!     );
//!
//!     let shutdown = CancellationToken::new();
//!     mdns_alias::signals::cancel_on_signals(shutdown.clone()).unwrap();
//!
//!     AliasPublisher::new(config, aliases).run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod alias;
pub mod avahi;
pub mod config;
pub mod error;
pub mod label;
pub mod metrics;
pub mod records;
pub mod responder;
pub mod server;
pub mod session;
pub mod signals;
pub mod telemetry;

// Re-export main types
pub use alias::AliasRequest;
pub use config::{AliasPolicy, BusKind, Config, PublishConfig, ResponderConfig, TelemetryConfig};
pub use error::{AliasError, ErrorCode, PublishError, ResponderError};
pub use label::EncodedHostname;
pub use records::RecordSet;
pub use responder::{CnameRecord, Responder, ResponderEvent};
pub use server::AliasPublisher;
pub use session::{Session, SessionState};
