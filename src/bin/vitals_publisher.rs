use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vitals_relay::{
    config::{HttpPostConfig, MqttEndpoint, SinkConfig},
    decoder,
    display::{LogRenderer, Renderer},
    transport::open_sink,
    GeneratorConfig, SeriesBuffer, VitalGenerator, VitalKind,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    Mqtt,
    Http,
}

/// Publish synthetic vital-sign readings
#[derive(Parser, Debug)]
#[command(name = "vitals-publisher", version, about)]
struct Cli {
    #[arg(long, value_enum, default_value = "mqtt")]
    transport: Transport,

    /// MQTT broker host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// MQTT topic
    #[arg(long, default_value = "sensor/data")]
    topic: String,

    /// Ingest endpoint for the HTTP transport
    #[arg(long, default_value = "http://127.0.0.1:5100/add-medical")]
    url: String,

    #[arg(long, value_enum, default_value = "heart-rate")]
    vital: VitalKind,

    /// Lower bound for heart rate or systolic pressure
    #[arg(long)]
    min: Option<f64>,

    /// Upper bound for heart rate or systolic pressure
    #[arg(long)]
    max: Option<f64>,

    #[arg(long)]
    dia_min: Option<f64>,

    #[arg(long)]
    dia_max: Option<f64>,

    /// Delay between readings
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many readings; runs until interrupted when omitted
    #[arg(long)]
    count: Option<u64>,

    /// Also keep the published readings in a local window and log it
    #[arg(long)]
    show: bool,
}

impl Cli {
    fn generator_config(&self) -> GeneratorConfig {
        let mut config = GeneratorConfig::for_vital(self.vital);
        if let Some(min) = self.min {
            config.min = min;
        }
        if let Some(max) = self.max {
            config.max = max;
        }
        if let Some(dia_min) = self.dia_min {
            config.dia_min = dia_min;
        }
        if let Some(dia_max) = self.dia_max {
            config.dia_max = dia_max;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        config
    }

    fn sink_config(&self) -> SinkConfig {
        match self.transport {
            Transport::Mqtt => SinkConfig::Mqtt(MqttEndpoint {
                host: self.host.clone(),
                port: self.port,
                topic: self.topic.clone(),
                ..MqttEndpoint::default()
            }),
            Transport::Http => SinkConfig::Http(HttpPostConfig {
                url: self.url.clone(),
                timeout_secs: 30,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vitals_publisher=info,vitals_relay=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut generator =
        VitalGenerator::new(cli.generator_config()).context("Invalid generator range")?;

    let mut sink = open_sink(&cli.sink_config()).context("Failed to create sink")?;
    sink.connect()
        .await
        .with_context(|| format!("Failed to connect to {}", sink.describe()))?;
    info!("Publishing {:?} readings to {}", cli.vital, sink.describe());

    let mut window = if cli.show {
        Some((SeriesBuffer::new(vitals_relay::series::DEFAULT_CAPACITY)?, LogRenderer))
    } else {
        None
    };

    let stats = generator
        .publish(sink.as_mut(), cli.count, |payload| {
            if let Some((buffer, renderer)) = window.as_mut() {
                match decoder::decode(payload) {
                    Ok(sample) => buffer.append(&sample),
                    Err(e) => warn!("Cannot display {}: {}", String::from_utf8_lossy(payload), e),
                }
                renderer.render(&buffer.snapshot());
            }
        })
        .await?;

    // The MQTT event loop runs on its own task; let it drain queued publishes
    if matches!(cli.transport, Transport::Mqtt) {
        sleep(Duration::from_millis(500)).await;
    }

    info!("Published {} readings, {} failed", stats.sent, stats.failed);
    Ok(())
}
