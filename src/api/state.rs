// src/api/state.rs
use crate::api::signature::SignatureVerifier;
use crate::config::AppConfig;
use crate::delivery::DiscordRest;
use crate::errors::Result;
use crate::judge::Judge0Client;
use crate::router::Router;
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router<Judge0Client>>,
    pub discord: DiscordRest,
    pub verifier: Option<Arc<SignatureVerifier>>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::new();
        let judge = Judge0Client::new(client.clone(), config.judge.clone());
        let discord = DiscordRest::new(client, config.platform.clone());

        let mut router = Router::new(judge, config.delivery.clone(), config.dedup_window);
        if config.platform.bot_token.is_some() {
            router = router.with_moderator(Arc::new(discord.clone()));
        }

        let verifier = match &config.platform.public_key {
            Some(key) => Some(Arc::new(SignatureVerifier::from_hex(key)?)),
            None => None,
        };

        Ok(Self {
            router: Arc::new(router),
            discord,
            verifier,
        })
    }
}
