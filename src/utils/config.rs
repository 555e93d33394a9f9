/// Application configuration
pub struct Config {
    /// Default per-request timeout for live cases (ms)
    pub default_timeout_ms: u64,

    /// TCP connect timeout (ms)
    pub connect_timeout_ms: u64,

    /// Target used when neither the CLI nor the suite names one
    pub default_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            default_base_url: "http://127.0.0.1:8188".to_string(),
        }
    }
}
