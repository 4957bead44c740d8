//! GPS trail recording, durable upload queueing, versioned validation and
//! map plot rendering.
//!
//! # Examples
//!
//! Recording a trail and checking it the way the server will:
//! ```
//! use trails::{
//!     core::session::RecordingSession,
//!     trail::Trail,
//!     types::{ActivityType, DeviceInfo},
//!     validate::parse_trail,
//! };
//!
//! let mut session = RecordingSession::new();
//! session.start(1_000).expect("start");
//! session.record_fix(60.0, 10.0, 1_000).expect("fix");
//! session.record_fix(60.0, 10.0, 2_000).expect("fix"); // dropped as a repeat
//! session.record_fix(60.001, 10.001, 3_000).expect("fix");
//! let trail = Trail::from(
//!     session
//!         .stop(4_000, &DeviceInfo::default(), ActivityType::Walk)
//!         .expect("stop"),
//! );
//! assert_eq!(trail.readings().len(), 2);
//!
//! let body = trail.to_json().expect("encode");
//! let accepted = parse_trail(body.as_bytes()).expect("valid");
//! assert_eq!(accepted.id(), trail.id());
//! assert_eq!(accepted.readings().len(), 2);
//! ```
//!
//! Uploading through the durable queue:
//! ```no_run
//! use std::sync::Arc;
//! use trails::{
//!     config::ClientConfig,
//!     persist::sqlite::SqliteQueue,
//!     runtime::{
//!         handle::spawn_uploader,
//!         pump::{HttpTransport, UploadPump},
//!     },
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = ClientConfig::new("http://localhost:9003", "alice", "secret");
//! let queue = SqliteQueue::open("uploads.db").expect("open sqlite");
//! let transport = HttpTransport::new(&config).expect("transport");
//! let pump = UploadPump::new(Box::new(queue), Arc::new(transport), config.retry.clone());
//! let uploader = spawn_uploader(pump);
//! uploader.enqueue(r#"{"version":2}"#).await.expect("enqueue");
//! let report = uploader.drain().await.expect("drain");
//! println!("uploaded {}, {} left", report.uploaded, report.remaining);
//! uploader.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Server and client settings.
pub mod config;
/// Recording session and waypoint store.
pub mod core;
/// Great-circle math, projection and plot rendering.
pub mod engine;
/// Durable upload queue and per-user trail files.
pub mod persist;
/// Upload pump and its single-task runtime.
pub mod runtime;
/// HTTP router, handlers and request errors.
pub mod server;
/// Versioned trail records.
pub mod trail;
/// Shared primitive types.
pub mod types;
/// Versioned trail validation.
pub mod validate;
