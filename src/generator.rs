// src/generator.rs - Synthetic vital-sign payloads
use crate::{
    error::{RelayError, Result},
    transport::MessageSink,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Which vital the generator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    /// `{"type":"heart_rate","timestamp":..,"value":..}`
    HeartRate,
    /// `{"type":"blood_pressure","timestamp":..,"sys":..,"dia":..}`
    BloodPressure,
}

impl VitalKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            VitalKind::HeartRate => "heart_rate",
            VitalKind::BloodPressure => "blood_pressure",
        }
    }
}

/// Value ranges and pacing for generated readings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub vital: VitalKind,

    /// Lower bound for heart rate or systolic pressure
    pub min: f64,

    /// Upper bound (exclusive) for heart rate or systolic pressure
    pub max: f64,

    /// Diastolic range, blood pressure only
    #[serde(default = "default_dia_min")]
    pub dia_min: f64,
    #[serde(default = "default_dia_max")]
    pub dia_max: f64,

    /// Delay between readings in milliseconds
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
}

fn default_dia_min() -> f64 { 70.0 }
fn default_dia_max() -> f64 { 85.0 }
fn default_interval() -> u64 { 1000 }

impl GeneratorConfig {
    /// Heart rate between 70 and 80 bpm
    pub fn heart_rate() -> Self {
        Self {
            vital: VitalKind::HeartRate,
            min: 70.0,
            max: 80.0,
            dia_min: default_dia_min(),
            dia_max: default_dia_max(),
            interval_ms: default_interval(),
        }
    }

    /// Systolic 110-130, diastolic 70-85 mmHg
    pub fn blood_pressure() -> Self {
        Self {
            vital: VitalKind::BloodPressure,
            min: 110.0,
            max: 130.0,
            ..Self::heart_rate()
        }
    }

    pub fn for_vital(vital: VitalKind) -> Self {
        match vital {
            VitalKind::HeartRate => Self::heart_rate(),
            VitalKind::BloodPressure => Self::blood_pressure(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_range("value", self.min, self.max)?;
        if self.vital == VitalKind::BloodPressure {
            check_range("diastolic", self.dia_min, self.dia_max)?;
        }
        Ok(())
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(RelayError::Config(format!(
            "{} range must be finite, got {}..{}",
            name, min, max
        )));
    }
    if min >= max {
        return Err(RelayError::Config(format!(
            "{} range minimum {} must be below maximum {}",
            name, min, max
        )));
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Outcome of a publish run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishStats {
    pub sent: u64,
    pub failed: u64,
}

impl PublishStats {
    pub fn attempted(&self) -> u64 {
        self.sent + self.failed
    }
}

/// Produces random readings within the configured ranges
pub struct VitalGenerator<R: Rng = StdRng> {
    config: GeneratorConfig,
    rng: R,
}

impl VitalGenerator<StdRng> {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> VitalGenerator<R> {
    pub fn with_rng(config: GeneratorConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Next reading as a JSON object stamped with `timestamp` (seconds)
    pub fn next_reading(&mut self, timestamp: f64) -> serde_json::Value {
        let primary = round2(self.rng.gen_range(self.config.min..self.config.max));
        match self.config.vital {
            VitalKind::HeartRate => json!({
                "type": VitalKind::HeartRate.type_name(),
                "timestamp": timestamp,
                "value": primary,
            }),
            VitalKind::BloodPressure => {
                let dia = round2(self.rng.gen_range(self.config.dia_min..self.config.dia_max));
                json!({
                    "type": VitalKind::BloodPressure.type_name(),
                    "timestamp": timestamp,
                    "sys": primary,
                    "dia": dia,
                })
            }
        }
    }

    /// Next reading serialized for the wire
    pub fn next_payload(&mut self, timestamp: f64) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.next_reading(timestamp))?)
    }

    /// Send `count` readings (forever when `None`) one interval apart
    ///
    /// A failed send is logged and counted and the run goes on; `on_sent` sees
    /// every payload the sink accepted.
    pub async fn publish<F>(
        &mut self,
        sink: &mut dyn MessageSink,
        count: Option<u64>,
        mut on_sent: F,
    ) -> Result<PublishStats>
    where
        F: FnMut(&[u8]),
    {
        let interval = Duration::from_millis(self.config.interval_ms);
        let mut stats = PublishStats::default();

        while count.map_or(true, |count| stats.attempted() < count) {
            let payload = self.next_payload(now_secs())?;
            match sink.send(&payload).await {
                Ok(()) => {
                    stats.sent += 1;
                    info!("Published {}", String::from_utf8_lossy(&payload));
                    on_sent(&payload);
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!("Error sending to {}: {}", sink.describe(), e);
                }
            }

            if count.map_or(true, |count| stats.attempted() < count) && !interval.is_zero() {
                sleep(interval).await;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::transport::ChannelSink;

    fn seeded(config: GeneratorConfig) -> VitalGenerator<StdRng> {
        VitalGenerator::with_rng(config, StdRng::seed_from_u64(7)).unwrap()
    }

    #[test]
    fn test_heart_rate_payload_decodes() {
        let mut generator = seeded(GeneratorConfig::heart_rate());
        for _ in 0..50 {
            let payload = generator.next_payload(1_700_000_000.5).unwrap();
            let sample = decode(&payload).unwrap();

            assert_eq!(sample.vital_type(), Some("heart_rate"));
            assert_eq!(sample.timestamp(), Some(1_700_000_000.5));
            let value = sample.get("value").and_then(|v| v.as_float()).unwrap();
            assert!((70.0..=80.0).contains(&value), "{}", value);
            assert_eq!(round2(value), value);
        }
    }

    #[test]
    fn test_blood_pressure_fields() {
        let mut generator = seeded(GeneratorConfig::blood_pressure());
        let reading = generator.next_reading(1.0);

        assert_eq!(reading["type"], "blood_pressure");
        let sys = reading["sys"].as_f64().unwrap();
        let dia = reading["dia"].as_f64().unwrap();
        assert!((110.0..=130.0).contains(&sys));
        assert!((70.0..=85.0).contains(&dia));
        assert!(reading.get("value").is_none());
    }

    #[test]
    fn test_invalid_ranges() {
        let mut config = GeneratorConfig::heart_rate();
        config.min = 80.0;
        config.max = 80.0;
        assert!(matches!(VitalGenerator::new(config), Err(RelayError::Config(_))));

        let mut config = GeneratorConfig::blood_pressure();
        config.dia_min = 90.0;
        config.dia_max = 60.0;
        assert!(matches!(VitalGenerator::new(config), Err(RelayError::Config(_))));

        let mut config = GeneratorConfig::heart_rate();
        config.max = f64::INFINITY;
        assert!(config.validate().is_err());

        // Diastolic bounds are ignored for heart rate
        let mut config = GeneratorConfig::heart_rate();
        config.dia_min = 90.0;
        config.dia_max = 60.0;
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_publish_continues_after_send_failures() {
        let mut config = GeneratorConfig::heart_rate();
        config.interval_ms = 1;
        let mut generator = seeded(config);

        let (mut sink, forwarded) = ChannelSink::pair(1);
        drop(forwarded);

        let mut seen = 0;
        let stats = generator
            .publish(&mut sink, Some(3), |_| seen += 1)
            .await
            .unwrap();

        assert_eq!(stats, PublishStats { sent: 0, failed: 3 });
        assert_eq!(seen, 0);
    }

    #[tokio::test]
    async fn test_publish_sends_count_readings() {
        let mut config = GeneratorConfig::blood_pressure();
        config.interval_ms = 0;
        let mut generator = seeded(config);
        let (mut sink, mut forwarded) = ChannelSink::pair(4);

        let mut seen = Vec::new();
        let stats = generator
            .publish(&mut sink, Some(2), |payload| seen.push(payload.to_vec()))
            .await
            .unwrap();

        assert_eq!(stats, PublishStats { sent: 2, failed: 0 });
        for expected in &seen {
            assert_eq!(&forwarded.recv().await.unwrap(), expected);
        }
        assert!(forwarded.try_recv().is_err());
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_for_vital() {
        assert_eq!(
            GeneratorConfig::for_vital(VitalKind::BloodPressure).vital,
            VitalKind::BloodPressure
        );
        assert_eq!(VitalKind::HeartRate.type_name(), "heart_rate");
    }
}
