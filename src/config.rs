use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Careledger";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Careledger/ on all platforms (user-visible, per deployment requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Careledger")
}

/// Path of the SQLite database file. `CARELEDGER_DB` overrides the default
/// location under the app data directory.
pub fn database_path() -> PathBuf {
    std::env::var("CARELEDGER_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| app_data_dir().join("careledger.db"))
}

/// Address the API server binds to. `CARELEDGER_ADDR` overrides; the default
/// stays on loopback since the hospital gateway proxies external traffic.
pub fn bind_addr() -> SocketAddr {
    std::env::var("CARELEDGER_ADDR")
        .ok()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8710)))
}

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "careledger=info,tower_http=info"
}
