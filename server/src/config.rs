use channel_shared::{RegionDataError, RegionDb};
use std::path::PathBuf;

/// Region list used when no data file is configured.
const BUILTIN_REGIONS: &str = include_str!("../data/regions.json");

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub max_connections: usize,
    /// Region new connections are placed in.
    pub start_region: u32,
    /// JSON region list; the built-in list is used when unset.
    pub region_data: Option<PathBuf>,
    /// Disconnect clients that send op codes without a handler.
    pub strict_protocol: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:11020".to_string(),
            max_connections: 1000,
            start_region: 1,
            region_data: None,
            strict_protocol: false,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `CHANNEL_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("CHANNEL_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(max) = std::env::var("CHANNEL_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|_| format!("CHANNEL_MAX_CONNECTIONS is not a number: {}", max))?;
        }
        if let Ok(region) = std::env::var("CHANNEL_START_REGION") {
            config.start_region = region
                .parse()
                .map_err(|_| format!("CHANNEL_START_REGION is not a region id: {}", region))?;
        }
        if let Ok(path) = std::env::var("CHANNEL_REGION_DATA") {
            config.region_data = Some(PathBuf::from(path));
        }
        if let Ok(strict) = std::env::var("CHANNEL_STRICT_PROTOCOL") {
            config.strict_protocol = matches!(strict.as_str(), "1" | "true" | "yes");
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.trim().is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        Ok(())
    }

    /// Region definitions from the configured file, or the built-in list.
    pub fn load_regions(&self) -> Result<RegionDb, RegionDataError> {
        match &self.region_data {
            Some(path) => RegionDb::load(path),
            None => RegionDb::from_json_str(BUILTIN_REGIONS),
        }
    }
}
