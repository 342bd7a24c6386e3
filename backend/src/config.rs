use std::time::Duration;

use allocation::PlanPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Emit JSON logs instead of the pretty format.
    pub json_logs: bool,

    // =========================
    // Distribution configuration
    // =========================
    /// Quota table used for every lock/unlock decision.
    ///
    /// Only the bounded tiers (`basic`, `premium`) are configurable.
    pub plan_policy: PlanPolicy,

    /// Whether a lead that no subscriber services is still written to the
    /// store.
    ///
    /// Off by default: such leads are skipped before any write.
    pub persist_unmatched_leads: bool,

    /// Store calls slower than this are logged under the `performance` target.
    pub slow_store_call: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://leadflow_dev.db?mode=rwc".to_string(),
            json_logs: false,
            plan_policy: PlanPolicy::default(),
            persist_unmatched_leads: false,
            slow_store_call: Duration::from_millis(100),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Absent or blank keys
    /// keep their defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let database_url = get("DATABASE_URL").unwrap_or(defaults.database_url);

        let json_logs = get("APP_ENV").is_some_and(|v| v.trim() == "production");

        let plan_policy = PlanPolicy {
            basic: parse_or(
                get("BASIC_PLAN_QUOTA"),
                "BASIC_PLAN_QUOTA",
                defaults.plan_policy.basic,
            )?,
            premium: parse_or(
                get("PREMIUM_PLAN_QUOTA"),
                "PREMIUM_PLAN_QUOTA",
                defaults.plan_policy.premium,
            )?,
        };

        let persist_unmatched_leads = match get("PERSIST_UNMATCHED_LEADS") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| anyhow::anyhow!("PERSIST_UNMATCHED_LEADS must be true or false"))?,
            None => defaults.persist_unmatched_leads,
        };

        let slow_store_call = Duration::from_millis(parse_or(
            get("SLOW_STORE_CALL_MS"),
            "SLOW_STORE_CALL_MS",
            defaults.slow_store_call.as_millis() as u64,
        )?);

        let config = Self {
            database_url,
            json_logs,
            plan_policy,
            persist_unmatched_leads,
            slow_store_call,
        };

        tracing::debug!(
            basic_quota = config.plan_policy.basic,
            premium_quota = config.plan_policy.premium,
            persist_unmatched = config.persist_unmatched_leads,
            "configuration loaded"
        );

        Ok(config)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} must be a non-negative integer, got '{v}'")),
        None => Ok(default),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
