use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::wifi::{
    AsyncWifi, AuthMethod, ClientConfiguration, Configuration as WifiConfiguration, EspWifi,
};
use log::{info, warn};

use crate::config::{Settings, WIFI_MAX_ATTEMPTS, WIFI_RETRY_DELAY_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiStatus {
    Connected,
    Offline,
}

/// Station configuration for the configured network. The channel is looked up
/// with a scan so association does not have to sweep every channel.
async fn station_config(
    wifi: &mut AsyncWifi<EspWifi<'static>>,
    settings: &Settings,
) -> anyhow::Result<ClientConfiguration> {
    let ssid: heapless::String<32> = settings
        .wifi_ssid
        .as_str()
        .try_into()
        .map_err(|_| anyhow::anyhow!("SSID {:?} is too long", settings.wifi_ssid))?;
    let password: heapless::String<64> = settings
        .wifi_password
        .as_str()
        .try_into()
        .map_err(|_| anyhow::anyhow!("WiFi password is too long"))?;
    let auth_method = if password.is_empty() {
        info!("WiFi password is empty, joining an open network");
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    if !wifi.is_started()? {
        wifi.set_configuration(&WifiConfiguration::Client(ClientConfiguration::default()))?;
        wifi.start().await?;
    }
    let channel = wifi
        .scan()
        .await?
        .into_iter()
        .find(|ap| ap.ssid == ssid)
        .map(|ap| ap.channel);
    match channel {
        Some(channel) => info!("{ssid} is on channel {channel}"),
        None => info!("{ssid} not seen in scan, channel unknown"),
    }

    Ok(ClientConfiguration {
        ssid,
        password,
        channel,
        auth_method,
        ..Default::default()
    })
}

async fn join(
    wifi: &mut AsyncWifi<EspWifi<'static>>,
    config: &ClientConfiguration,
) -> anyhow::Result<()> {
    wifi.set_configuration(&WifiConfiguration::Client(config.clone()))?;
    wifi.connect().await?;
    wifi.wait_netif_up().await?;
    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi DHCP info: {ip_info:?}");
    Ok(())
}

/// Joins the configured network, giving up after [`WIFI_MAX_ATTEMPTS`].
///
/// `on_attempt` runs before every try with the zero-based attempt number.
pub async fn wifi_setup<F>(
    wifi: &mut AsyncWifi<EspWifi<'static>>,
    settings: &Settings,
    mut on_attempt: F,
) -> WifiStatus
where
    F: FnMut(u32),
{
    info!("Connecting to {}", settings.wifi_ssid);
    let mut config = None;
    for attempt in 0..WIFI_MAX_ATTEMPTS {
        on_attempt(attempt);
        if config.is_none() {
            match station_config(wifi, settings).await {
                Ok(found) => config = Some(found),
                Err(e) => warn!("WiFi start/scan failed: {e:?}"),
            }
        }
        if let Some(config) = &config {
            match join(wifi, config).await {
                Ok(()) => {
                    info!("WiFi connected after {} attempt(s)", attempt + 1);
                    return WifiStatus::Connected;
                }
                Err(e) => {
                    warn!("WiFi attempt {}/{WIFI_MAX_ATTEMPTS} failed: {e:?}", attempt + 1);
                    let _ = wifi.disconnect().await;
                }
            }
        }
        FreeRtos::delay_ms(WIFI_RETRY_DELAY_MS);
    }
    warn!("Giving up on WiFi, running offline");
    WifiStatus::Offline
}
