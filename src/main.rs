#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::set_max_level(log::LevelFilter::Info);

    let result = esp::run();
    if let Err(e) = &result {
        log::error!("Firmware stopped: {e:#}");
    }
    result
}

#[cfg(target_os = "espidf")]
mod esp {
    use anyhow::anyhow;
    use embedded_hal::i2c::I2c;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::adc::attenuation::DB_11;
    use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
    use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::task::block_on;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::timer::EspTaskTimerService;
    use esp_idf_svc::wifi::{AsyncWifi, EspWifi};
    use log::{error, info, warn};

    use auticare::config::{
        load_or_seed, open_settings_store, Settings, GREEN_LED_AMPLITUDE, RED_LED_AMPLITUDE,
        REPORT_INTERVAL_MS, SPLASH_MS,
    };
    use auticare::display::{draw_connecting, draw_layout, draw_readings, init_oled, Oled};
    use auticare::helpers::gsr::read_gsr;
    use auticare::helpers::i2c_init::{initialize_bus, Pins};
    use auticare::helpers::interval::Interval;
    use auticare::helpers::readings::{LastGood, SensorData, CSV_HEADER};
    use auticare::max3010x::{IrReader, Max3010x, SensorConfig};
    use auticare::postman::{spawn_reporter, Postman};
    use auticare::pulse::{BpmAggregator, InfraredSource};
    use auticare::wifi::{wifi_setup, WifiStatus};
    use auticare::Halt;

    static BUILD_TIMESTAMP: &str = env!("VERGEN_BUILD_TIMESTAMP");
    static RUSTC_VERSION: &str = env!("VERGEN_RUSTC_SEMVER");
    static GIT_COMMIT_HASH: &str = env!("VERGEN_GIT_SHA");

    /// Milliseconds since boot, wraps after ~49 days.
    pub fn now_ms() -> u32 {
        unsafe { (esp_idf_svc::sys::esp_timer_get_time() / 1000) as u32 }
    }

    fn refresh<I: I2c>(oled: &mut Oled<I>) {
        if let Err(e) = oled.flush() {
            warn!("OLED refresh failed: {e:?}");
        }
    }

    pub fn run() -> anyhow::Result<()> {
        info!(
            "Auticare starting. Built on {} with Rustc {} from Commit {}.",
            BUILD_TIMESTAMP, RUSTC_VERSION, GIT_COMMIT_HASH
        );

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;
        let timer_service = EspTaskTimerService::new()?;
        let mut delay = FreeRtos;

        let bus = initialize_bus(Pins {
            sda: peripherals.pins.gpio6,
            scl: peripherals.pins.gpio7,
            i2c: peripherals.i2c0,
        })?;

        // ---- Display ---------------------------------------------------------
        let mut oled = match init_oled(bus.clone_driver()) {
            Ok(oled) => oled,
            Err(e) => {
                error!("OLED init failed: {e:?}");
                return Err(Halt::DisplayNotFound.into());
            }
        };
        FreeRtos::delay_ms(SPLASH_MS);
        draw_layout(&mut oled, false).map_err(|e| anyhow!("Drawing layout failed: {e:?}"))?;
        refresh(&mut oled);

        // ---- WiFi ------------------------------------------------------------
        let settings = match open_settings_store(nvs.clone()) {
            Ok(mut store) => load_or_seed(&mut store, Settings::defaults()),
            Err(e) => {
                warn!("NVS unavailable ({e:?}), using built-in settings");
                Settings::defaults().validated()
            }
        };
        let settings = match settings {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Settings unusable ({e}), running offline");
                None
            }
        };

        let driver = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
        let mut wifi = AsyncWifi::wrap(driver, sysloop, timer_service)?;
        let wifi_status = match &settings {
            Some(settings) => block_on(wifi_setup(&mut wifi, settings, |attempt| {
                let _ = draw_connecting(&mut oled, attempt);
                refresh(&mut oled);
            })),
            None => WifiStatus::Offline,
        };
        info!("WiFi status: {wifi_status:?}");
        draw_layout(&mut oled, wifi_status == WifiStatus::Connected)
            .map_err(|e| anyhow!("Drawing layout failed: {e:?}"))?;
        refresh(&mut oled);

        // ---- Pulse sensor ----------------------------------------------------
        let mut sensor = Max3010x::new(bus.clone_driver());
        if let Err(e) = sensor.probe() {
            error!("Sensor probe failed: {e:?}");
            return Err(Halt::SensorNotFound.into());
        }
        sensor
            .setup(&SensorConfig::default(), &mut delay)
            .map_err(|e| anyhow!("MAX3010x setup failed: {e:?}"))?;
        sensor
            .set_pulse_amplitude_red(RED_LED_AMPLITUDE)
            .map_err(|e| anyhow!("Setting red LED failed: {e:?}"))?;
        sensor
            .set_pulse_amplitude_green(GREEN_LED_AMPLITUDE)
            .map_err(|e| anyhow!("Setting green LED failed: {e:?}"))?;
        sensor
            .enable_die_temp_ready()
            .map_err(|e| anyhow!("Enabling temperature interrupt failed: {e:?}"))?;
        info!("Place your index finger on the sensor with steady pressure.");

        // ---- GSR -------------------------------------------------------------
        let adc = AdcDriver::new(peripherals.adc1)?;
        let adc_config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let mut gsr_channel = AdcChannelDriver::new(&adc, peripherals.pins.gpio2, &adc_config)?;

        let reporter = match (&settings, wifi_status) {
            (Some(settings), WifiStatus::Connected) => {
                Some(spawn_reporter(Postman::new(settings))?)
            }
            _ => None,
        };

        // ---- Main loop -------------------------------------------------------
        info!("{CSV_HEADER}");
        let mut aggregator = BpmAggregator::default();
        let mut report_interval = Interval::new(REPORT_INTERVAL_MS, now_ms());
        let mut last_gsr = LastGood::new("GSR", 0_u16);
        let mut last_temperature = LastGood::new("Temperature", 0.0_f32);

        loop {
            let mut source = IrReader {
                sensor: &mut sensor,
                delay: &mut delay,
            };
            let ir = match source.sample_infrared() {
                Ok(ir) => ir,
                Err(e) => {
                    warn!("IR read failed: {e:?}");
                    continue;
                }
            };
            let now = now_ms();
            let reading = aggregator.update(ir, now);

            if !report_interval.is_due(now) {
                continue;
            }

            let gsr = last_gsr.update(read_gsr(|| adc.read(&mut gsr_channel), &mut delay));
            let temperature = last_temperature.update(sensor.read_temperature(&mut delay));

            let data = SensorData::new(reading, ir, gsr, temperature);
            info!("{}", data.csv_row(now));
            data.log_summary();

            let _ = draw_readings(&mut oled, &data);
            refresh(&mut oled);

            if let Some(reporter) = &reporter {
                reporter.submit(data);
            }
        }
    }
}

/// Host build: drives the same pipeline with a synthetic pulse so the
/// aggregation and report formatting can be watched without hardware.
#[cfg(not(target_os = "espidf"))]
fn main() {
    use auticare::config::REPORT_INTERVAL_MS;
    use auticare::helpers::interval::Interval;
    use auticare::helpers::readings::{SensorData, CSV_HEADER};
    use auticare::postman::Payload;
    use auticare::pulse::BpmAggregator;
    use log::{debug, error, info};

    const SAMPLE_PERIOD_MS: u32 = 10;
    const DURATION_MS: u32 = 15_000;
    const SIMULATED_BPM: f32 = 72.0;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("No sensor on this target, simulating a {SIMULATED_BPM} BPM pulse");
    info!("{CSV_HEADER}");

    let mut aggregator = BpmAggregator::default();
    let mut report_interval = Interval::new(REPORT_INTERVAL_MS, 0);

    for now in (0..DURATION_MS).step_by(SAMPLE_PERIOD_MS as usize) {
        let phase = 2.0 * core::f32::consts::PI * SIMULATED_BPM / 60.0 * now as f32 / 1000.0;
        let ir = (20_000.0 + 200.0 * phase.sin()) as u32;
        let reading = aggregator.update(ir, now);

        if report_interval.is_due(now) {
            let data = SensorData::new(reading, ir, 512, 31.5);
            info!("{}", data.csv_row(now));
            match Payload::from(&data).to_json() {
                Ok(json) => debug!("Payload: {json}"),
                Err(e) => error!("Payload encoding failed: {e}"),
            }
        }
    }
    info!(
        "Simulation done: {:.1} BPM, average {}",
        aggregator.bpm(),
        aggregator.avg_bpm()
    );
}
