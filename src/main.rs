use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vitals_relay::{
    config::{MqttEndpoint, SinkConfig, SourceConfig},
    Config, JsonLinesRenderer, Relay, Result,
};

/// Relay vital-sign telemetry and display the most recent samples
#[derive(Parser, Debug)]
#[command(name = "vitals-relay", version, about)]
struct Cli {
    /// YAML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source MQTT broker host
    #[arg(long)]
    host: Option<String>,

    /// Topic to subscribe to (and republish on, for an MQTT sink)
    #[arg(long)]
    topic: Option<String>,

    /// Mirror accepted payloads to this MQTT broker on the same topic
    #[arg(long)]
    sink_host: Option<String>,

    /// Points kept per series
    #[arg(long)]
    capacity: Option<usize>,

    /// Write every snapshot to stdout as a JSON line instead of logging it
    #[arg(long)]
    json_lines: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let SourceConfig::Mqtt(endpoint) = &mut config.source {
            if let Some(host) = &self.host {
                endpoint.host = host.clone();
            }
            if let Some(topic) = &self.topic {
                endpoint.topic = topic.clone();
            }
        }

        if let Some(sink_host) = &self.sink_host {
            let topic = match &config.source {
                SourceConfig::Mqtt(endpoint) => endpoint.topic.clone(),
                SourceConfig::Http(_) => MqttEndpoint::default().topic,
            };
            config.sink = Some(SinkConfig::Mqtt(MqttEndpoint {
                host: sink_host.clone(),
                topic,
                ..MqttEndpoint::default()
            }));
        } else if let (Some(SinkConfig::Mqtt(endpoint)), Some(topic)) =
            (&mut config.sink, &self.topic)
        {
            endpoint.topic = topic.clone();
        }

        if let Some(capacity) = self.capacity {
            config.buffer.capacity = capacity;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout is reserved for --json-lines snapshots
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vitals_relay=info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Vitals relay v{} starting", vitals_relay::VERSION);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    let mut relay = Relay::from_config(&config)?;
    if cli.json_lines {
        relay = relay.with_renderer(Box::new(JsonLinesRenderer::new(std::io::stdout())));
    }

    let mut ctrl_c = Box::pin(signal::ctrl_c());

    tokio::select! {
        _ = &mut ctrl_c => {
            info!("Received shutdown signal");
        }
        res = relay.run() => {
            if let Err(e) = res {
                error!("Relay error: {}", e);
                return Err(e);
            }
        }
    }

    let stats = relay.stats();
    info!(
        "Final stats: {} received, {} decoded, {} decode errors, {} forwarded, {} filtered, uptime: {}s",
        stats.received,
        stats.decoded,
        stats.decode_errors,
        stats.forwarded,
        stats.filtered,
        stats.uptime_secs
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_to_mqtt_source_and_sink() {
        let cli = Cli::parse_from([
            "vitals-relay",
            "--host",
            "sensorweb.us",
            "--topic",
            "/org/bed/vital",
            "--sink-host",
            "127.0.0.1",
            "--capacity",
            "5",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        match &config.source {
            SourceConfig::Mqtt(endpoint) => {
                assert_eq!(endpoint.host, "sensorweb.us");
                assert_eq!(endpoint.topic, "/org/bed/vital");
            }
            other => panic!("unexpected source {:?}", other),
        }
        match &config.sink {
            Some(SinkConfig::Mqtt(endpoint)) => {
                assert_eq!(endpoint.host, "127.0.0.1");
                assert_eq!(endpoint.topic, "/org/bed/vital");
            }
            other => panic!("unexpected sink {:?}", other),
        }
        assert_eq!(config.buffer.capacity, 5);
    }
}
