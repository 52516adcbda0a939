use config::{Config, Environment};
use serde::Deserialize;
use url::Url;

use crate::error::StartupError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/api/v1";
pub const DEFAULT_FAQ_PATH: &str = "faq.json";
pub const WEBHOOK_PATH: &str = "webhook";

#[derive(Deserialize, Clone, Debug)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub dashscope_api_key: String,
    pub dashscope_app_id: String,
    pub dashscope_base_url: String,
    pub faq_path: String,
    pub port: u16,
    pub render_external_url: Option<String>,
    pub webhook_secret_token: Option<String>,
}

impl AppConfig {
    /// Reads the process environment (`TELEGRAM_BOT_TOKEN`, `DASHSCOPE_API_KEY`, ...).
    pub fn from_env() -> Result<AppConfig, StartupError> {
        Self::from_source(Environment::default())
    }

    fn from_source(env: Environment) -> Result<AppConfig, StartupError> {
        let config: AppConfig = Config::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("dashscope_base_url", DEFAULT_DASHSCOPE_BASE_URL)?
            .set_default("faq_path", DEFAULT_FAQ_PATH)?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), StartupError> {
        let required = [
            ("TELEGRAM_BOT_TOKEN", &self.telegram_bot_token),
            ("DASHSCOPE_API_KEY", &self.dashscope_api_key),
            ("DASHSCOPE_APP_ID", &self.dashscope_app_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(StartupError::EmptySetting(name));
            }
        }

        self.webhook_url().map(|_| ())
    }

    /// Callback url Telegram should post updates to.
    pub fn webhook_url(&self) -> Result<Url, StartupError> {
        let raw = match self.render_external_url.as_deref().map(str::trim) {
            None | Some("") => return Err(StartupError::MissingSetting("RENDER_EXTERNAL_URL")),
            Some(raw) => raw,
        };

        if !raw.starts_with("https://") {
            return Err(StartupError::InvalidPublicUrl(raw.to_string()));
        }

        let mut url = Url::parse(raw).map_err(|_| StartupError::InvalidPublicUrl(raw.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StartupError::InvalidPublicUrl(raw.to_string()))?
            .pop_if_empty()
            .push(WEBHOOK_PATH);

        Ok(url)
    }
}
