use std::{path::Path, time::Duration};

use anyhow::Context;

use crate::api::Persistence;

/// Optional parts of the forum
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Features {
    pub topics: bool,
    pub federated_sign_in: bool,
    pub email_verification: bool,
    pub email_link_sign_in: bool,
}

impl Default for Features {
    fn default() -> Features {
        Features {
            topics: true,
            federated_sign_in: true,
            email_verification: true,
            email_link_sign_in: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ForumConfig {
    pub features: Features,
    pub persistence: Persistence,
    pub inactivity_timeout_secs: u64,
    pub search_history_len: usize,
    pub trending_len: usize,
    pub profile_posts_len: usize,

    /// Where email sign-in links send the user back to
    pub sign_in_link_url: String,
}

impl Default for ForumConfig {
    fn default() -> ForumConfig {
        ForumConfig {
            features: Features::default(),
            persistence: Persistence::Durable,
            inactivity_timeout_secs: 60 * 60,
            search_history_len: 5,
            trending_len: 5,
            profile_posts_len: 10,
            sign_in_link_url: String::from("http://localhost:3000/finish-sign-in"),
        }
    }
}

impl ForumConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<ForumConfig> {
        let data = std::fs::read(path)
            .with_context(|| format!("reading configuration file {path:?}"))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing configuration file {path:?}"))
    }

    /// Applies `AGORA_PERSISTENCE` and `AGORA_INACTIVITY_SECS` overrides
    pub fn with_env(self) -> anyhow::Result<ForumConfig> {
        self.with_vars(|k| std::env::var(k).ok())
    }

    pub fn with_vars(
        mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<ForumConfig> {
        if let Some(p) = var("AGORA_PERSISTENCE") {
            self.persistence = match &p as &str {
                "session" => Persistence::Session,
                "durable" => Persistence::Durable,
                _ => anyhow::bail!("AGORA_PERSISTENCE must be 'session' or 'durable', got {p:?}"),
            };
        }
        if let Some(secs) = var("AGORA_INACTIVITY_SECS") {
            self.inactivity_timeout_secs = secs
                .parse()
                .with_context(|| format!("parsing AGORA_INACTIVITY_SECS {secs:?}"))?;
        }
        Ok(self)
    }
}
