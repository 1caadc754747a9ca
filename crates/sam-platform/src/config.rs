use anyhow::{Context, Result};
use sam_core::DEFAULT_JOB_TOPIC;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: String,
    pub job_topic: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = lookup("REDIS_URL").context("REDIS_URL is required")?;
        let job_topic = lookup("JOB_TOPIC")
            .filter(|topic| !topic.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_JOB_TOPIC.to_string());

        Ok(Self {
            database_url,
            redis_url,
            job_topic,
        })
    }
}
