use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Timing constants shared across subsystems.
pub const COMMAND_PREFIX: &str = "!";
pub const DEFAULT_HEALTH_PORT: u16 = 5000;
pub const DEFAULT_HEALTH_BIND: &str = "0.0.0.0";
pub const REST_TIMEOUT_SECS: u64 = 10; // per REST call
pub const AI_TIMEOUT_SECS: u64 = 30; // per generation call
pub const LIVENESS_PROBE_TIMEOUT_SECS: u64 = 5;

// Gateway retry policy. See the connection supervisor.
pub const BASE_RETRY_DELAY_SECS: u64 = 5;
pub const RETRY_MULTIPLIER: u32 = 3;
pub const MAX_RETRY_DELAY_SECS: u64 = 600;
pub const MAX_RETRIES: u32 = 3;
pub const RATE_LIMIT_COOLDOWN_SECS: u64 = 1800;
pub const RETRY_JITTER_MAX_SECS: f64 = 2.0;
pub const LIVENESS_INTERVAL_SECS: u64 = 60;
pub const LIVENESS_STALL_SECS: u64 = 120;

// Dispatcher cooldown bookkeeping.
pub const DEFAULT_LOCAL_COOLDOWN_SECS: u64 = 1;
pub const COOLDOWN_SWEEP_MAX_AGE_SECS: u64 = 300;

/// Top-level config (mentor.toml + MENTOR_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorConfig {
    pub bot: BotConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub staff: StaffConfig,
    #[serde(default)]
    pub oauth: Option<OauthConfig>,
    #[serde(default)]
    pub music: MusicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Discord bot token. The process refuses to start without it.
    pub token: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Presence line shown under the bot's name.
    pub activity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_port")]
    pub port: u16,
    #[serde(default = "default_health_bind")]
    pub bind: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: default_health_port(),
            bind: default_health_bind(),
        }
    }
}

/// Channel ids the bot is wired to. All optional — a missing id disables the
/// feature that needs it rather than failing startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    pub welcome: Option<u64>,
    pub help: Option<u64>,
    pub roles: Option<u64>,
    pub announcement: Option<u64>,
    pub staff: Option<u64>,
    pub mod_log: Option<u64>,
    pub ai: Option<u64>,
    pub voice: Option<u64>,
    pub class11: Option<u64>,
    pub class12: Option<u64>,
    /// Channels where invite commands are allowed.
    #[serde(default)]
    pub bot_commands: Vec<u64>,
}

impl ChannelsConfig {
    /// Channels in which `!11` / `!12` are accepted.
    pub fn subject_channels(&self) -> Vec<u64> {
        [self.class11, self.class12].into_iter().flatten().collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffConfig {
    /// Role ids that may use moderation commands.
    #[serde(default)]
    pub roles: Vec<u64>,
}

/// OAuth settings for the companion web UI. The whole section is optional;
/// without it the auth routes answer 404.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// HMAC key for session cookies.
    pub cookie_secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MusicConfig {
    /// Lookup providers tried in order (e.g. "youtube", "spotify").
    #[serde(default)]
    pub providers: Vec<String>,
}

impl MentorConfig {
    /// Load config: explicit path > MENTOR_CONFIG env > ./mentor.toml.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("MENTOR_CONFIG").ok())
            .unwrap_or_else(|| "mentor.toml".to_string());

        let config: MentorConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MENTOR_").split("_"))
            .extract()
            .map_err(|e| crate::error::MentorError::Config(e.to_string()))?;

        if config.bot.token.is_empty() {
            return Err(crate::error::MentorError::Config(
                "bot.token is empty — set it in mentor.toml or MENTOR_BOT_TOKEN".into(),
            ));
        }

        Ok(config)
    }
}

fn default_prefix() -> String {
    COMMAND_PREFIX.to_string()
}

fn default_ai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o".to_string()
}

fn default_db_path() -> String {
    "./data/mentor.db".to_string()
}

fn default_health_port() -> u16 {
    DEFAULT_HEALTH_PORT
}

fn default_health_bind() -> String {
    DEFAULT_HEALTH_BIND.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_sections() {
        let config: MentorConfig = Figment::new()
            .merge(Toml::string("[bot]\ntoken = \"t\""))
            .extract()
            .unwrap();
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.health.port, 5000);
        assert_eq!(config.database.path, "./data/mentor.db");
        assert!(config.channels.bot_commands.is_empty());
        assert!(config.oauth.is_none());
    }

    #[test]
    fn subject_channels_skip_unset_ids() {
        let channels = ChannelsConfig {
            class11: Some(10),
            class12: None,
            ..Default::default()
        };
        assert_eq!(channels.subject_channels(), vec![10]);
    }
}
