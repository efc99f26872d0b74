//! Device simulator
//!
//! Produces random-walk temperature and humidity readings for a fixed set of
//! devices and POSTs them to the hub's ingest endpoint.
//!
//! ```no_run
//! use sensor_hub::simulator::{DeviceSimulator, SimulatorConfig};
//!
//! # async fn example() {
//! let config = SimulatorConfig::default().endpoint("http://127.0.0.1:8080/api/readings");
//! let report = DeviceSimulator::new(config)
//!     .run_until(async { let _ = tokio::signal::ctrl_c().await; })
//!     .await;
//! println!("sent {} readings", report.sent);
//! # }
//! ```

pub mod walk;

use std::future::Future;
use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::reading::Reading;

pub use walk::RandomWalk;

/// Default ingest URL
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/api/readings";

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Ingest URL readings are POSTed to
    pub endpoint: String,
    /// Device ids, one reading each per tick
    pub devices: Vec<String>,
    /// Time between ticks
    pub interval: Duration,
    /// Temperature bounds
    pub temperature: RangeInclusive<i64>,
    /// Humidity bounds
    pub humidity: RangeInclusive<i64>,
    /// Largest change of either metric per tick
    pub step: i64,
    /// RNG seed (None = from entropy)
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            devices: vec!["NYC".to_string(), "LON".to_string(), "TYO".to_string()],
            interval: Duration::from_secs(1),
            temperature: -10..=40,
            humidity: 0..=100,
            step: 2,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Set the ingest URL
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replace the device list
    pub fn devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.devices = devices.into_iter().map(Into::into).collect();
        self
    }

    /// Set the tick interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-tick step
    pub fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Use a fixed RNG seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug)]
struct Device {
    id: String,
    temperature: RandomWalk,
    humidity: RandomWalk,
}

/// Counters returned when the simulator stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorReport {
    /// Readings accepted by the endpoint
    pub sent: u64,
    /// Readings that failed to post
    pub failed: u64,
}

/// Generates readings and posts them to the hub
pub struct DeviceSimulator {
    config: SimulatorConfig,
    devices: Vec<Device>,
    rng: StdRng,
    client: reqwest::Client,
}

impl DeviceSimulator {
    /// Create a simulator
    pub fn new(config: SimulatorConfig) -> Self {
        let devices = config
            .devices
            .iter()
            .map(|id| Device {
                id: id.clone(),
                temperature: RandomWalk::new(config.temperature.clone(), config.step),
                humidity: RandomWalk::new(config.humidity.clone(), config.step),
            })
            .collect();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            config,
            devices,
            rng,
            client,
        }
    }

    /// Configuration
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Advance every device one step
    pub fn tick(&mut self) -> Vec<Reading> {
        let rng = &mut self.rng;
        self.devices
            .iter_mut()
            .map(|device| {
                let temperature = device.temperature.advance(rng);
                let humidity = device.humidity.advance(rng);
                Reading::now(device.id.clone(), temperature, humidity)
            })
            .collect()
    }

    /// Post readings every interval until `shutdown` completes
    ///
    /// A failed post is logged and the loop carries on.
    pub async fn run_until<F>(mut self, shutdown: F) -> SimulatorReport
    where
        F: Future<Output = ()>,
    {
        let mut report = SimulatorReport::default();
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            endpoint = %self.config.endpoint,
            devices = self.devices.len(),
            interval_ms = self.config.interval.as_millis() as u64,
            "Simulator started"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    for reading in self.tick() {
                        match self.post(&reading).await {
                            Ok(()) => {
                                report.sent += 1;
                                tracing::debug!(reading = %reading, "Reading sent");
                            }
                            Err(e) => {
                                report.failed += 1;
                                tracing::warn!(device = %reading.device_id, error = %e, "Failed to send reading");
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(sent = report.sent, failed = report.failed, "Simulator stopped");
        report
    }

    async fn post(&self, reading: &Reading) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.config.endpoint)
            .json(reading)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
