//! Command line and client configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use directories::ProjectDirs;
use obualert_core::arbitration::{ArbitrationConfig, ExpiryPolicy, PreemptionPolicy};
use obualert_core::preferences::AlertPreferences;
use obualert_core::protocol::{DecoderConfig, WireFormat};

use crate::error::ClientError;

pub const DEFAULT_HOST: &str = "10.0.2.2";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(15);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Raw TCP byte stream of concatenated JSON objects
    Tcp,
    /// WebSocket, one JSON object per message
    Ws,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExpiryMode {
    /// Fixed 5 s
    Fixed,
    /// max(5 s, TTC + 2 s)
    Ttc,
}

#[derive(Parser, Clone, Debug)]
#[command(name = "obualert", author, version, about = "OBU collision-risk alert client", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Transport to the on-board unit
    #[arg(long, value_enum, default_value_t = Mode::Tcp)]
    pub mode: Mode,

    /// OBU host for TCP mode
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// OBU port for TCP mode
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Server URL for WebSocket mode, e.g. ws://host:8080/ws
    #[arg(long)]
    pub url: Option<String>,

    /// User id sent as the `user_id` query parameter in WebSocket mode
    #[arg(long, allow_negative_numbers = true)]
    pub user_id: Option<i64>,

    /// Message shape: auto, driver-alert or combined
    #[arg(long, default_value_t = WireFormat::Auto)]
    pub format: WireFormat,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value_t = DEFAULT_RECONNECT_DELAY.as_secs())]
    pub reconnect_delay: u64,

    /// Seconds before a connection attempt is abandoned
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    pub connect_timeout: u64,

    /// How long an alert stays up after it was shown or refreshed
    #[arg(long, value_enum, default_value_t = ExpiryMode::Fixed)]
    pub expiry: ExpiryMode,

    /// When another object may take over the active alert: tier or urgency
    #[arg(long, default_value_t = PreemptionPolicy::Tier)]
    pub preemption: PreemptionPolicy,

    /// Preferences file (JSON); defaults to the user config directory
    #[arg(long)]
    pub preferences: Option<PathBuf>,

    /// Print collaborator events as JSON lines on stdout
    #[arg(long)]
    pub output: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Tcp { host: String, port: u16 },
    WebSocket { url: String, user_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub transport: TransportConfig,
    pub decoder: DecoderConfig,
    pub arbitration: ArbitrationConfig,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            transport: TransportConfig::Tcp {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            decoder: DecoderConfig::default(),
            arbitration: ArbitrationConfig::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl TryFrom<&Cli> for ClientConfig {
    type Error = ClientError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let transport = match cli.mode {
            Mode::Tcp => TransportConfig::Tcp {
                host: cli.host.clone(),
                port: cli.port,
            },
            Mode::Ws => {
                let url = cli
                    .url
                    .clone()
                    .ok_or_else(|| ClientError::Config("--url is required in ws mode".to_string()))?;
                // A missing id is reported like the -1 sentinel: Invalid User ID
                TransportConfig::WebSocket {
                    url,
                    user_id: cli.user_id.unwrap_or(-1),
                }
            }
        };

        let expiry = match cli.expiry {
            ExpiryMode::Fixed => ExpiryPolicy::default(),
            ExpiryMode::Ttc => ExpiryPolicy::time_to_collision(),
        };

        Ok(ClientConfig {
            transport,
            decoder: DecoderConfig {
                format: cli.format,
                ..Default::default()
            },
            arbitration: ArbitrationConfig {
                preemption: cli.preemption,
                expiry,
            },
            reconnect_delay: Duration::from_secs(cli.reconnect_delay),
            connect_timeout: Duration::from_secs(cli.connect_timeout),
        })
    }
}

/// `<config dir>/preferences.json`, if a home directory can be determined
pub fn default_preferences_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "obualert", "obualert")
        .map(|dirs| dirs.config_dir().join("preferences.json"))
}

/// Load preferences; a missing file means all effects enabled
pub fn load_preferences(path: &Path) -> Result<AlertPreferences, ClientError> {
    match fs::read_to_string(path) {
        Ok(contents) => AlertPreferences::from_json(&contents)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{}: not found, using default preferences", path.display());
            Ok(AlertPreferences::default())
        }
        Err(e) => Err(ClientError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obualert_core::model::RiskTier;
    use obualert_core::preferences::{EffectKind, Preferences};
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["obualert"]);
        let config = ClientConfig::try_from(&cli).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(!cli.output);
    }

    #[test]
    fn test_ws_mode() {
        let cli = Cli::parse_from([
            "obualert",
            "--mode",
            "ws",
            "--url",
            "ws://10.0.2.2:8080/ws",
            "--user-id",
            "12",
            "--format",
            "driver-alert",
            "--expiry",
            "ttc",
            "--preemption",
            "urgency",
            "--reconnect-delay",
            "3",
        ]);
        let config = ClientConfig::try_from(&cli).unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::WebSocket {
                url: "ws://10.0.2.2:8080/ws".to_string(),
                user_id: 12
            }
        );
        assert_eq!(config.decoder.format, WireFormat::DriverAlert);
        assert_eq!(config.arbitration.expiry, ExpiryPolicy::time_to_collision());
        assert_eq!(config.arbitration.preemption, PreemptionPolicy::Urgency);
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_ws_mode_requires_url() {
        let cli = Cli::parse_from(["obualert", "--mode", "ws"]);
        assert!(matches!(ClientConfig::try_from(&cli), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_negative_user_id_parses() {
        let cli = Cli::parse_from(["obualert", "--mode", "ws", "--url", "ws://h/ws", "--user-id", "-1"]);
        let config = ClientConfig::try_from(&cli).unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::WebSocket {
                url: "ws://h/ws".to_string(),
                user_id: -1
            }
        );
    }

    #[test]
    fn test_load_preferences() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert_eq!(load_preferences(&missing).unwrap(), AlertPreferences::default());

        let path = dir.path().join("preferences.json");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, r#"{{"audioEnabled": false, "visual": {{"low": false}}}}"#).unwrap();
        let prefs = load_preferences(&path).unwrap();
        assert!(!prefs.get_preference(RiskTier::High, EffectKind::Audio));
        assert!(!prefs.get_preference(RiskTier::Low, EffectKind::Visual));
        assert!(prefs.get_preference(RiskTier::Medium, EffectKind::Visual));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "not json").unwrap();
        assert!(matches!(load_preferences(&bad), Err(ClientError::Config(_))));
    }
}
