use std::time::Duration;

use batchline_application::CoordinatorSettings;
use batchline_core::{AppError, AppResult};

/// Runtime configuration for the batch worker, read from the environment.
#[derive(Debug, Clone)]
pub(crate) struct WorkerConfig {
    pub(crate) database_url: String,
    pub(crate) database_max_connections: u32,
    pub(crate) redis_url: Option<String>,
    pub(crate) redis_key_prefix: String,
    pub(crate) worker_id: String,
    pub(crate) run_once: bool,
    pub(crate) report_url: Option<String>,
    pub(crate) report_token: Option<String>,
    pub(crate) environment_auto_stop: JobConfig,
    pub(crate) artifact_expiry: JobConfig,
}

/// Cadence and coordinator tuning for one maintenance job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobConfig {
    pub(crate) enabled: bool,
    pub(crate) interval: Duration,
    pub(crate) settings: CoordinatorSettings,
    pub(crate) concurrency: usize,
    pub(crate) item_timeout: Duration,
    pub(crate) pause: Duration,
}

struct JobDefaults {
    interval_seconds: u64,
    batch_size: u32,
}

impl WorkerConfig {
    pub(crate) fn load() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let env = EnvReader { lookup: &lookup };

        let database_url = env.required("DATABASE_URL")?;
        let database_max_connections = env.parse_u32("DATABASE_MAX_CONNECTIONS", 5)?;
        let redis_url = env.optional("REDIS_URL");
        let redis_key_prefix = env
            .optional("REDIS_KEY_PREFIX")
            .unwrap_or_else(|| "batchline".to_owned());
        let worker_id = env
            .optional("WORKER_ID")
            .unwrap_or_else(|| format!("worker-{}", std::process::id()));
        let run_once = env.parse_bool("WORKER_RUN_ONCE", false)?;
        let report_url = env
            .optional("WORKER_REPORT_URL")
            .map(|value| value.trim_end_matches('/').to_owned());
        let report_token = env.optional("WORKER_REPORT_TOKEN");

        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        if report_token.is_some() && report_url.is_none() {
            return Err(AppError::Validation(
                "WORKER_REPORT_TOKEN requires WORKER_REPORT_URL".to_owned(),
            ));
        }

        let environment_auto_stop = env.job(
            "ENVIRONMENT_AUTO_STOP",
            &JobDefaults {
                interval_seconds: 5 * 60,
                batch_size: 100,
            },
        )?;
        let artifact_expiry = env.job(
            "ARTIFACT_EXPIRY",
            &JobDefaults {
                interval_seconds: 7 * 60,
                batch_size: 500,
            },
        )?;

        Ok(Self {
            database_url,
            database_max_connections,
            redis_url,
            redis_key_prefix,
            worker_id,
            run_once,
            report_url,
            report_token,
            environment_auto_stop,
            artifact_expiry,
        })
    }
}

struct EnvReader<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<'_, F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> AppResult<String> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn parse<T>(&self, name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => value.parse::<T>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn parse_u32(&self, name: &str, default: u32) -> AppResult<u32> {
        self.parse(name, default)
    }

    fn parse_u64(&self, name: &str, default: u64) -> AppResult<u64> {
        self.parse(name, default)
    }

    fn parse_usize(&self, name: &str, default: usize) -> AppResult<usize> {
        self.parse(name, default)
    }

    fn parse_bool(&self, name: &str, default: bool) -> AppResult<bool> {
        match self.optional(name).map(|value| value.to_ascii_lowercase()) {
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(AppError::Validation(format!(
                    "invalid {name} value '{value}': expected true or false"
                ))),
            },
            None => Ok(default),
        }
    }

    fn job(&self, prefix: &str, defaults: &JobDefaults) -> AppResult<JobConfig> {
        let base = CoordinatorSettings::default();
        let interval_seconds =
            self.parse_u64(&format!("{prefix}_INTERVAL_SECONDS"), defaults.interval_seconds)?;
        let settings = CoordinatorSettings {
            batch_size: self.parse_u32(&format!("{prefix}_BATCH_SIZE"), defaults.batch_size)?,
            timeout: Duration::from_secs(
                self.parse_u64(&format!("{prefix}_TIMEOUT_SECONDS"), base.timeout.as_secs())?,
            ),
            max_iterations: self
                .parse_u32(&format!("{prefix}_MAX_ITERATIONS"), base.max_iterations)?,
            lease_ttl: Duration::from_secs(self.parse_u64(
                &format!("{prefix}_LEASE_TTL_SECONDS"),
                base.lease_ttl.as_secs(),
            )?),
            lease_max_retries: self.parse_u32(
                &format!("{prefix}_LEASE_MAX_RETRIES"),
                base.lease_max_retries,
            )?,
            release_lease_on_exit: self.parse_bool(
                &format!("{prefix}_RELEASE_LEASE"),
                base.release_lease_on_exit,
            )?,
            renew_lease_each_batch: self.parse_bool(
                &format!("{prefix}_RENEW_LEASE"),
                base.renew_lease_each_batch,
            )?,
        };
        let config = JobConfig {
            enabled: self.parse_bool(&format!("{prefix}_ENABLED"), true)?,
            interval: Duration::from_secs(interval_seconds),
            settings,
            concurrency: self.parse_usize(&format!("{prefix}_CONCURRENCY"), 8)?,
            item_timeout: Duration::from_secs(
                self.parse_u64(&format!("{prefix}_ITEM_TIMEOUT_SECONDS"), 30)?,
            ),
            pause: Duration::from_millis(self.parse_u64(&format!("{prefix}_PAUSE_MS"), 0)?),
        };

        if config.interval.is_zero() {
            return Err(AppError::Validation(format!(
                "{prefix}_INTERVAL_SECONDS must be greater than zero"
            )));
        }

        if config.concurrency == 0 {
            return Err(AppError::Validation(format!(
                "{prefix}_CONCURRENCY must be greater than zero"
            )));
        }

        if config.item_timeout.is_zero() {
            return Err(AppError::Validation(format!(
                "{prefix}_ITEM_TIMEOUT_SECONDS must be greater than zero"
            )));
        }

        config.settings.validate().map_err(|error| {
            AppError::Validation(format!("invalid {prefix} job settings: {error}"))
        })?;

        Ok(config)
    }
}
