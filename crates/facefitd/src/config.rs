/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// TCP listen address for the control socket.
    pub listen: String,
    /// Engine request channel depth; requests beyond it queue in the socket.
    pub channel_depth: usize,
}

impl Config {
    /// Load configuration from `FACEFIT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            listen: std::env::var("FACEFIT_LISTEN")
                .unwrap_or_else(|_| "127.0.0.1:12345".to_string()),
            channel_depth: env_usize("FACEFIT_CHANNEL_DEPTH", 4),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
