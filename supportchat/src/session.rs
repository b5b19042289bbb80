use miette::{Context, Result};
use shared::ChatSetting;
use tracing::info;

use crate::client::Client;
use crate::config::Config;

/// An authenticated client together with the space's chat setting.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub chat_setting: ChatSetting,
    pub client: Client,
}

impl Session {
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let anonymous = Client::new(&config.api_base_url, &config.identifier)?;

        let access_token = anonymous
            .access_token(&config.fingerprint)
            .await
            .wrap_err("Could not obtain an access token")?
            .token;

        let client = anonymous.with_access_token(&access_token)?;
        let chat_setting = client
            .chat_setting()
            .await
            .wrap_err("Could not load the chat setting")?;

        info!(
            identifier = %config.identifier,
            chat_available = chat_setting.chat_available,
            monthly_limit_exceeded = chat_setting.monthly_limit_exceeded,
            "session ready"
        );

        Ok(Self {
            access_token,
            chat_setting,
            client,
        })
    }
}
