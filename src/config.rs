//! Server and client settings.

use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use tracing::warn;

use crate::{
    engine::plot::DEFAULT_PROXIMITY_M,
    runtime::pump::RetryPolicy,
    types::{ActivityType, DeviceInfo},
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of the per-user trail directories.
    pub data_dir: PathBuf,
    /// Credentials file, `{"version": 1, "users": [{"user", "passwd"}]}`.
    pub users_file: PathBuf,
    pub plot_width: u32,
    pub plot_height: u32,
    /// Waypoint match radius in meters.
    pub proximity_m: f64,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Users whose waypoint stores stay loaded while idle.
    pub waypoint_cache_capacity: usize,
    /// A clean cached store older than this is re-read from disk.
    pub waypoint_cache_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./data");
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9003)),
            users_file: data_dir.join("users.json"),
            data_dir,
            plot_width: 1000,
            plot_height: 1000,
            proximity_m: DEFAULT_PROXIMITY_M,
            max_body_bytes: 10_000_000,
            waypoint_cache_capacity: 256,
            waypoint_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `TRAILS_ADDR`, `TRAILS_DATA_DIR` and `TRAILS_USERS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = env::var("TRAILS_ADDR") {
            match addr.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(err) => warn!(%addr, %err, "ignoring bad TRAILS_ADDR"),
            }
        }
        if let Ok(dir) = env::var("TRAILS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
            config.users_file = config.data_dir.join("users.json");
        }
        if let Ok(users) = env::var("TRAILS_USERS") {
            config.users_file = PathBuf::from(users);
        }
        config
    }
}

/// Settings for recording and uploading on the device.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://trails.example.org`.
    pub server_url: String,
    pub user: String,
    pub secret: String,
    pub device: DeviceInfo,
    pub activity: ActivityType,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        server_url: impl Into<String>,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            user: user.into(),
            secret: secret.into(),
            device: DeviceInfo::default(),
            activity: ActivityType::default(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
