use serde::Serialize;

use crate::helpers::readings::SensorData;

pub const DEVICE_ID_HEADER: &str = "X-DEVICE-ID";
pub const CONTENT_TYPE: &str = "application/json";

/// Body the backend expects on its sensor endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Payload {
    pub temperature: f32,
    pub heart_rate: f32,
    pub gsr: u16,
    pub lat: f64,
    pub long: f64,
}

impl From<&SensorData> for Payload {
    fn from(data: &SensorData) -> Self {
        Self {
            temperature: data.temperature,
            heart_rate: data.bpm,
            gsr: data.gsr,
            lat: data.latitude,
            long: data.longitude,
        }
    }
}

impl Payload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(target_os = "espidf")]
pub use client::{spawn_reporter, Postman, Reporter};

#[cfg(target_os = "espidf")]
mod client {
    use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
    use std::thread;

    use anyhow::Context;
    use embedded_svc::http::client::Client;
    use embedded_svc::http::Method;
    use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
    use esp_idf_svc::io::{Read, Write};
    use log::{debug, error, info, warn};

    use super::{Payload, CONTENT_TYPE, DEVICE_ID_HEADER};
    use crate::config::{Settings, STACK_REPORTER};
    use crate::helpers::readings::SensorData;

    pub struct Postman {
        api_url: String,
        device_id: String,
    }

    impl Postman {
        pub fn new(settings: &Settings) -> Self {
            Self {
                api_url: settings.api_url.clone(),
                device_id: settings.device_id.clone(),
            }
        }

        /// POSTs one reading; any HTTP status counts as delivered.
        pub fn post(&self, data: &SensorData) -> anyhow::Result<u16> {
            let body = Payload::from(data).to_json()?;
            info!("Sending POST to: {}", self.api_url);
            info!("Data: {body}");

            let connection = EspHttpConnection::new(&HttpConfiguration {
                use_global_ca_store: true,
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            })?;
            let mut client = Client::wrap(connection);
            let content_length = body.len().to_string();
            let headers = [
                ("Content-Type", CONTENT_TYPE),
                ("Content-Length", content_length.as_str()),
                (DEVICE_ID_HEADER, self.device_id.as_str()),
            ];
            let mut request = client
                .request(Method::Post, &self.api_url, &headers)
                .context("opening request")?;
            request.write_all(body.as_bytes())?;
            request.flush()?;
            let mut response = request.submit()?;

            let status = response.status();
            let mut buf = [0_u8; 256];
            let mut text = String::new();
            loop {
                let size = Read::read(&mut response, &mut buf)?;
                if size == 0 {
                    break;
                }
                text.push_str(&String::from_utf8_lossy(&buf[..size]));
            }
            if (200..300).contains(&status) {
                info!("Server response ({status}): {text}");
            } else {
                warn!("Server answered {status}: {text}");
            }
            Ok(status)
        }
    }

    /// Starts the thread that owns the HTTP client.
    ///
    /// The channel holds a single reading; when the previous POST is still in
    /// flight new readings are dropped instead of stalling the sensor loop.
    pub fn spawn_reporter(postman: Postman) -> anyhow::Result<Reporter> {
        let (tx, rx) = sync_channel::<SensorData>(1);
        thread::Builder::new()
            .name("reporter".into())
            .stack_size(STACK_REPORTER)
            .spawn(move || reporter_task(postman, rx))?;
        Ok(Reporter { tx })
    }

    fn reporter_task(postman: Postman, rx: Receiver<SensorData>) {
        info!("Reporter task started");
        for data in rx {
            if let Err(e) = postman.post(&data) {
                error!("Error on HTTP request: {e:?}");
            }
        }
        warn!("Reporter channel closed, exiting reporter task");
    }

    pub struct Reporter {
        tx: SyncSender<SensorData>,
    }

    impl Reporter {
        pub fn submit(&self, data: SensorData) {
            match self.tx.try_send(data) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("Reporter busy, reading dropped"),
                Err(TrySendError::Disconnected(_)) => warn!("Reporter task is gone"),
            }
        }
    }
}
