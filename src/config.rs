// Auticare: hardware and system configuration
// Target: ESP32-C3 with MAX30105 (IR/temperature), GSR electrodes on ADC1, SSD1306 OLED

use log::{info, warn};
use thiserror::Error;
use url::Url;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 6;
pub const PIN_I2C_SCL: i32 = 7;
pub const PIN_GSR_ADC: i32 = 2; // ADC1 channel 2

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_BAUDRATE_KHZ: u32 = 400; // MAX3010x fast mode
pub const I2C_TIMEOUT_MS: u64 = 100;
pub const I2C_ADDR_MAX3010X: u8 = 0x57;
pub const I2C_ADDR_OLED: u8 = 0x3C;

// ---------------------------------------------------------------------------
// Display (SSD1306 OLED)
// ---------------------------------------------------------------------------
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 32;
pub const SPLASH_MS: u32 = 2000;

// ---------------------------------------------------------------------------
// Heart rate
// ---------------------------------------------------------------------------
pub const RATE_SIZE: usize = 4; // Increase this for more averaging
pub const MIN_PLAUSIBLE_BPM: f32 = 20.0;
pub const MAX_PLAUSIBLE_BPM: f32 = 255.0;
pub const FINGER_IR_THRESHOLD: u32 = 50_000;
pub const RED_LED_AMPLITUDE: u8 = 0x0A; // Low red shows the sensor is running
pub const GREEN_LED_AMPLITUDE: u8 = 0x00;

// ---------------------------------------------------------------------------
// GSR
// ---------------------------------------------------------------------------
pub const GSR_SAMPLE_COUNT: u32 = 10;
pub const GSR_SAMPLE_DELAY_MS: u32 = 5;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const REPORT_INTERVAL_MS: u32 = 1000;
pub const WIFI_MAX_ATTEMPTS: u32 = 20;
pub const WIFI_RETRY_DELAY_MS: u32 = 500;
pub const STACK_REPORTER: usize = 8192;

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------
pub const DEFAULT_API_URL: &str = "http://192.168.100.7:8000/sensor/data";
pub const DEFAULT_DEVICE_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("WiFi SSID is empty")]
    MissingSsid,
    #[error("device id is empty")]
    MissingDeviceId,
    #[error("invalid API URL {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("API URL must be http or https, got {0:?}")]
    UnsupportedScheme(String),
}

/// Everything the firmware needs to reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub api_url: String,
    pub device_id: String,
}

impl Settings {
    /// Values baked in at build time through `AUTICARE_*` environment variables.
    pub fn defaults() -> Self {
        Self {
            wifi_ssid: option_env!("AUTICARE_WIFI_SSID").unwrap_or("").to_string(),
            wifi_password: option_env!("AUTICARE_WIFI_PASSWORD").unwrap_or("").to_string(),
            api_url: option_env!("AUTICARE_API_URL")
                .unwrap_or(DEFAULT_API_URL)
                .to_string(),
            device_id: option_env!("AUTICARE_DEVICE_ID")
                .unwrap_or(DEFAULT_DEVICE_ID)
                .to_string(),
        }
    }

    /// Checks the settings and normalises the API URL.
    pub fn validated(mut self) -> Result<Self, SettingsError> {
        if self.wifi_ssid.trim().is_empty() {
            return Err(SettingsError::MissingSsid);
        }
        if self.device_id.trim().is_empty() {
            return Err(SettingsError::MissingDeviceId);
        }
        let url = Url::parse(self.api_url.trim())
            .map_err(|e| SettingsError::InvalidUrl(self.api_url.clone(), e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::UnsupportedScheme(url.scheme().to_string()));
        }
        self.api_url = url.to_string();
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------
const KEY_SSID: &str = "ssid";
const KEY_PASSWORD: &str = "pw";
const KEY_API_URL: &str = "api_url";
const KEY_DEVICE_ID: &str = "device_id";

/// String key/value storage the settings live in (NVS on the device).
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Settings found in the store, with missing keys taken from `fallback`.
///
/// `None` when the store holds no SSID, i.e. nothing was ever saved.
pub fn stored_settings<S: SettingsStore>(store: &S, fallback: Settings) -> Option<Settings> {
    let wifi_ssid = store.get(KEY_SSID)?;
    Some(Settings {
        wifi_ssid,
        wifi_password: store.get(KEY_PASSWORD).unwrap_or(fallback.wifi_password),
        api_url: store.get(KEY_API_URL).unwrap_or(fallback.api_url),
        device_id: store.get(KEY_DEVICE_ID).unwrap_or(fallback.device_id),
    })
}

pub fn save_settings<S: SettingsStore>(settings: &Settings, store: &mut S) -> anyhow::Result<()> {
    store.set(KEY_SSID, &settings.wifi_ssid)?;
    store.set(KEY_PASSWORD, &settings.wifi_password)?;
    store.set(KEY_API_URL, &settings.api_url)?;
    store.set(KEY_DEVICE_ID, &settings.device_id)?;
    Ok(())
}

/// Validated settings from the store. On first boot the validated `defaults`
/// are written to the store so later boots read them back.
pub fn load_or_seed<S: SettingsStore>(
    store: &mut S,
    defaults: Settings,
) -> Result<Settings, SettingsError> {
    if let Some(stored) = stored_settings(store, defaults.clone()) {
        info!(
            "Settings loaded: ssid={:?}, api_url={}",
            stored.wifi_ssid, stored.api_url
        );
        return stored.validated();
    }
    let settings = defaults.validated()?;
    match save_settings(&settings, store) {
        Ok(()) => info!("Stored build-time settings for {:?}", settings.wifi_ssid),
        Err(e) => warn!("Could not store settings: {e:?}"),
    }
    Ok(settings)
}

#[cfg(target_os = "espidf")]
pub use nvs::open_settings_store;

#[cfg(target_os = "espidf")]
mod nvs {
    use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

    use super::SettingsStore;

    const NAMESPACE: &str = "auticare";

    pub fn open_settings_store(
        nvs: EspNvsPartition<NvsDefault>,
    ) -> anyhow::Result<EspNvs<NvsDefault>> {
        Ok(EspNvs::new(nvs, NAMESPACE, true)?)
    }

    impl SettingsStore for EspNvs<NvsDefault> {
        fn get(&self, key: &str) -> Option<String> {
            let mut buffer = [0_u8; 256];
            self.get_str(key, &mut buffer)
                .ok()
                .flatten()
                .map(str::to_string)
        }

        fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            self.set_str(key, value)?;
            Ok(())
        }
    }
}
