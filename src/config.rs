//! Configuration for the call client.

use std::path::PathBuf;

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_ROOM_BASE_URL: &str = "https://scs-radio.daily.co/";
const APP_DIR: &str = "citizen-band";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Rooms live at `room_base_url` joined with the server id.
    pub room_base_url: String,
    pub store_path: PathBuf,
    pub sounds_dir: PathBuf,
    /// Output device by display name; `None` picks the default device.
    pub output_device: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR);
        Self {
            room_base_url: DEFAULT_ROOM_BASE_URL.to_string(),
            store_path: data_dir.join("store.json"),
            sounds_dir: PathBuf::from("audio"),
            output_device: None,
        }
    }
}

impl ClientConfig {
    pub fn room_url(&self, server_id: &str) -> Result<Url> {
        let base = Url::parse(&self.room_base_url)
            .with_context(|| format!("Invalid room base URL {:?}", self.room_base_url))?;
        base.join(server_id)
            .with_context(|| format!("Invalid server id {server_id:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_url() {
        let config = ClientConfig::default();
        assert_eq!(
            config.room_url("trucking-eu").unwrap().as_str(),
            "https://scs-radio.daily.co/trucking-eu"
        );
        assert!(config.store_path.ends_with("citizen-band/store.json"));
    }
}
