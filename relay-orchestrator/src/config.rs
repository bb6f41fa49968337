//! Orchestrator configuration
//!
//! Every external collaborator, timeout and the optional retention sweeper is
//! configured through environment variables, with defaults suitable for a
//! local development setup.

use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::time::Duration;

/// Longest accepted task retention (ten years)
pub const MAX_TASK_RETENTION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Completion time before which terminal tasks are evicted
///
/// `None` when `retention` reaches past the representable range.
pub fn retention_cutoff(now: DateTime<Utc>, retention: Duration) -> Option<DateTime<Utc>> {
    let age = chrono::Duration::from_std(retention).ok()?;
    now.checked_sub_signed(age)
}

/// Hosted summarization model settings
#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub base_url: String,
    pub api_token: Option<String>,
    pub model: String,
    /// Bound on a single inference request
    pub timeout: Duration,
    /// Wait before retrying when the model reports it is warming up
    pub warmup_backoff: Duration,
}

/// Hosted browser automation settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    /// Base of the human-viewable session replay links
    pub replay_base_url: String,
    pub timeout: Duration,
}

impl BrowserSettings {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.project_id.is_some()
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on
    pub bind_addr: SocketAddr,

    pub inference: InferenceSettings,

    pub browser: BrowserSettings,

    /// Bound on plain page fetches
    pub fetch_timeout: Duration,

    /// Bound on a whole workflow run, polled from the transform stage
    pub workflow_timeout: Duration,

    /// Concurrent activity slots of the local workflow engine
    pub workflow_max_activities: usize,

    /// How long terminal tasks are kept. `None` keeps them forever
    pub task_retention: Option<Duration>,

    /// How often the retention sweeper runs
    pub retention_sweep_interval: Duration,

    /// Origins allowed by the CORS layer
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            inference: InferenceSettings {
                base_url: "https://api-inference.huggingface.co".to_string(),
                api_token: None,
                model: "facebook/bart-large-cnn".to_string(),
                timeout: Duration::from_secs(60),
                warmup_backoff: Duration::from_secs(20),
            },
            browser: BrowserSettings {
                base_url: "https://api.browserbase.com".to_string(),
                api_key: None,
                project_id: None,
                replay_base_url: "https://browserbase.com".to_string(),
                timeout: Duration::from_secs(60),
            },
            fetch_timeout: Duration::from_secs(30),
            workflow_timeout: Duration::from_secs(30),
            workflow_max_activities: 10,
            task_retention: None,
            retention_sweep_interval: Duration::from_secs(60),
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables (all optional):
    /// - ORCHESTRATOR_BIND_ADDR (default: 0.0.0.0:8000)
    /// - INFERENCE_BASE_URL, INFERENCE_MODEL
    /// - INFERENCE_API_TOKEN or HUGGINGFACE_API_TOKEN
    /// - INFERENCE_TIMEOUT, INFERENCE_WARMUP_BACKOFF (seconds)
    /// - BROWSER_BASE_URL, BROWSER_REPLAY_BASE_URL
    /// - BROWSERBASE_API_KEY, BROWSERBASE_PROJECT_ID
    /// - BROWSER_TIMEOUT, FETCH_TIMEOUT, WORKFLOW_TIMEOUT (seconds)
    /// - WORKFLOW_MAX_ACTIVITIES (default: 10)
    /// - TASK_RETENTION (seconds, unset keeps tasks forever)
    /// - RETENTION_SWEEP_INTERVAL (seconds, default: 60)
    /// - CORS_ALLOWED_ORIGINS (comma separated)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let seconds = |key: &str| -> anyhow::Result<Option<Duration>> {
            var(key)
                .map(|raw| {
                    raw.parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|_| anyhow::anyhow!("{} must be a number of seconds, got '{}'", key, raw))
                })
                .transpose()
        };

        let bind_addr = match var("ORCHESTRATOR_BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("ORCHESTRATOR_BIND_ADDR is not a socket address: '{}'", raw))?,
            None => defaults.bind_addr,
        };

        let inference = InferenceSettings {
            base_url: var("INFERENCE_BASE_URL").unwrap_or(defaults.inference.base_url),
            api_token: var("INFERENCE_API_TOKEN").or_else(|| var("HUGGINGFACE_API_TOKEN")),
            model: var("INFERENCE_MODEL").unwrap_or(defaults.inference.model),
            timeout: seconds("INFERENCE_TIMEOUT")?.unwrap_or(defaults.inference.timeout),
            warmup_backoff: seconds("INFERENCE_WARMUP_BACKOFF")?
                .unwrap_or(defaults.inference.warmup_backoff),
        };

        let browser = BrowserSettings {
            base_url: var("BROWSER_BASE_URL").unwrap_or(defaults.browser.base_url),
            api_key: var("BROWSERBASE_API_KEY"),
            project_id: var("BROWSERBASE_PROJECT_ID"),
            replay_base_url: var("BROWSER_REPLAY_BASE_URL")
                .unwrap_or(defaults.browser.replay_base_url),
            timeout: seconds("BROWSER_TIMEOUT")?.unwrap_or(defaults.browser.timeout),
        };

        let workflow_max_activities = match var("WORKFLOW_MAX_ACTIVITIES") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("WORKFLOW_MAX_ACTIVITIES must be a number, got '{}'", raw))?,
            None => defaults.workflow_max_activities,
        };

        let cors_allowed_origins = match var("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            None => defaults.cors_allowed_origins,
        };

        Ok(Self {
            bind_addr,
            inference,
            browser,
            fetch_timeout: seconds("FETCH_TIMEOUT")?.unwrap_or(defaults.fetch_timeout),
            workflow_timeout: seconds("WORKFLOW_TIMEOUT")?.unwrap_or(defaults.workflow_timeout),
            workflow_max_activities,
            task_retention: seconds("TASK_RETENTION")?,
            retention_sweep_interval: seconds("RETENTION_SWEEP_INTERVAL")?
                .unwrap_or(defaults.retention_sweep_interval),
            cors_allowed_origins,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("inference base url", &self.inference.base_url),
            ("browser base url", &self.browser.base_url),
            ("browser replay base url", &self.browser.replay_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.inference.model.is_empty() {
            anyhow::bail!("inference model cannot be empty");
        }

        for (name, timeout) in [
            ("inference timeout", self.inference.timeout),
            ("browser timeout", self.browser.timeout),
            ("fetch timeout", self.fetch_timeout),
            ("workflow timeout", self.workflow_timeout),
            ("retention sweep interval", self.retention_sweep_interval),
        ] {
            if timeout.is_zero() {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if self.workflow_max_activities == 0 {
            anyhow::bail!("workflow_max_activities must be greater than 0");
        }

        if self.task_retention.is_some_and(|r| r.is_zero()) {
            anyhow::bail!("task retention must be greater than 0 when set");
        }
        if self.task_retention.is_some_and(|r| r > MAX_TASK_RETENTION) {
            anyhow::bail!(
                "task retention cannot exceed {}s",
                MAX_TASK_RETENTION.as_secs()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.inference.model, "facebook/bart-large-cnn");
        assert_eq!(config.inference.warmup_backoff, Duration::from_secs(20));
        assert_eq!(config.workflow_max_activities, 10);
        assert!(config.task_retention.is_none());
        assert!(!config.browser.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_environment_matches_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, Config::default().bind_addr);
        assert_eq!(config.cors_allowed_origins.len(), 2);
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("ORCHESTRATOR_BIND_ADDR", "127.0.0.1:9000"),
            ("HUGGINGFACE_API_TOKEN", "hf_legacy"),
            ("INFERENCE_TIMEOUT", "5"),
            ("BROWSERBASE_API_KEY", "bb_key"),
            ("BROWSERBASE_PROJECT_ID", "proj"),
            ("TASK_RETENTION", "3600"),
            ("CORS_ALLOWED_ORIGINS", "https://app.example.com, ,http://localhost:5173"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.inference.api_token.as_deref(), Some("hf_legacy"));
        assert_eq!(config.inference.timeout, Duration::from_secs(5));
        assert!(config.browser.is_configured());
        assert_eq!(config.task_retention, Some(Duration::from_secs(3600)));
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://app.example.com", "http://localhost:5173"]
        );
    }

    #[test]
    fn test_primary_token_wins() {
        let config = Config::from_lookup(lookup(&[
            ("INFERENCE_API_TOKEN", "primary"),
            ("HUGGINGFACE_API_TOKEN", "legacy"),
        ]))
        .unwrap();
        assert_eq!(config.inference.api_token.as_deref(), Some("primary"));
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("FETCH_TIMEOUT", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("WORKFLOW_MAX_ACTIVITIES", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ORCHESTRATOR_BIND_ADDR", "localhost")])).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.inference.base_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
        config.inference.base_url = "http://localhost:9999".to_string();

        config.workflow_max_activities = 0;
        assert!(config.validate().is_err());
        config.workflow_max_activities = 1;

        config.fetch_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.fetch_timeout = Duration::from_secs(1);

        config.task_retention = Some(Duration::ZERO);
        assert!(config.validate().is_err());
        config.task_retention = Some(Duration::from_secs(10u64.pow(13)));
        assert!(config.validate().is_err());
        config.task_retention = Some(MAX_TASK_RETENTION);
        assert!(config.validate().is_ok());
        config.task_retention = None;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retention_cutoff_out_of_range() {
        let now = Utc::now();

        assert_eq!(
            retention_cutoff(now, Duration::from_secs(3600)),
            Some(now - chrono::Duration::hours(1))
        );
        assert_eq!(retention_cutoff(now, Duration::from_secs(10u64.pow(13))), None);
        assert_eq!(retention_cutoff(now, Duration::MAX), None);
    }
}
