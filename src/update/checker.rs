//! Periodic check for a newer platform release

use std::sync::{Arc, LazyLock};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::update::channel::ReleaseChannel;
use crate::update::error::UpdateError;
use crate::update::options::OptionStore;
use crate::update::semver::is_newer;

/// Default interval between two checks in seconds (8 hours)
pub const CHECK_INTERVAL: i64 = 28800;

/// Interval used when a user explicitly asks for a check from the UI
pub const UI_CLICK_CHECK_INTERVAL: i64 = 10;

/// Timeout of the outbound version request
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

pub const LAST_TIME_CHECKED: &str = "UpdateCheck_LastTimeChecked";
pub const LATEST_VERSION: &str = "UpdateCheck_LatestVersion";

/// Version string as served by the update service; `$` only matches at the very end
static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9][0-9a-zA-Z_.-]*$").expect("valid version pattern"));

/// Provides the site-wide default timezone reported with update checks
#[cfg_attr(test, automock)]
pub trait TimezoneProvider: Send + Sync {
    fn default_timezone(&self) -> String;
}

/// Timezone taken from static configuration
#[derive(Debug, Clone)]
pub struct ConfiguredTimezone(pub String);

impl TimezoneProvider for ConfiguredTimezone {
    fn default_timezone(&self) -> String {
        self.0.clone()
    }
}

/// Settings consumed by the update checker
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSettings {
    pub enabled: bool,
    pub channel: ReleaseChannel,
    pub api_service_url: String,
    pub builds_url: String,
    pub current_url: String,
}

impl UpdateSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        let general = &settings.general;
        Self {
            enabled: general.enable_auto_update,
            channel: ReleaseChannel::from_config(general.release_channel.as_deref()),
            api_service_url: general.api_service_url.clone(),
            builds_url: general.builds_url.clone(),
            current_url: general.current_url.clone().unwrap_or_default(),
        }
    }
}

/// Versions identifying the running installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningVersions {
    /// Version of the platform itself
    pub platform: String,
    /// Version of the language runtime it runs on
    pub runtime: String,
}

impl Default for RunningVersions {
    fn default() -> Self {
        Self {
            platform: env!("CARGO_PKG_VERSION").to_string(),
            runtime: env!("CARGO_PKG_RUST_VERSION").to_string(),
        }
    }
}

/// What a call to [`UpdateChecker::check`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Auto-update is turned off
    Disabled,
    /// The last check is recent enough
    Skipped { last_checked: i64 },
    /// A request was made; an empty version means the latest version is unknown
    Checked { latest_version: String },
}

pub struct UpdateChecker<S: OptionStore> {
    store: Arc<S>,
    client: reqwest::Client,
    settings: UpdateSettings,
    versions: RunningVersions,
    timezone: Box<dyn TimezoneProvider>,
}

impl<S: OptionStore> UpdateChecker<S> {
    pub fn new(
        store: Arc<S>,
        settings: UpdateSettings,
        versions: RunningVersions,
        timezone: Box<dyn TimezoneProvider>,
    ) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("piwik-kernel/{}", versions.platform))
            .timeout(SOCKET_TIMEOUT)
            .build()?;

        Ok(Self {
            store,
            client,
            settings,
            versions,
            timezone,
        })
    }

    /// Checks for a newer version if `force` is set or the last check is older
    /// than `interval` seconds (default [`CHECK_INTERVAL`]).
    ///
    /// The check time is stored before the request goes out so concurrent
    /// callers mostly skip; this is best-effort, not a lock. Network failures
    /// and malformed responses store an empty latest version.
    pub async fn check(
        &self,
        force: bool,
        interval: Option<i64>,
        trigger: &str,
    ) -> Result<CheckOutcome, UpdateError> {
        let now = chrono::Utc::now().timestamp();
        self.check_at(now, force, interval, trigger).await
    }

    pub(crate) async fn check_at(
        &self,
        now: i64,
        force: bool,
        interval: Option<i64>,
        trigger: &str,
    ) -> Result<CheckOutcome, UpdateError> {
        if !self.settings.enabled {
            debug!("Auto update disabled, skipping update check");
            return Ok(CheckOutcome::Disabled);
        }

        let interval = interval.unwrap_or(CHECK_INTERVAL);
        let last_checked = self.last_time_checked()?;

        match last_checked {
            Some(last_checked) if !force && now.saturating_sub(interval) <= last_checked => {
                debug!("Last update check at {}, skipping", last_checked);
                return Ok(CheckOutcome::Skipped { last_checked });
            }
            _ => {}
        }

        self.store.set(LAST_TIME_CHECKED, &now.to_string(), true)?;

        let url = self.latest_version_url(trigger);
        let latest_version = self.fetch_latest_version(&url).await;

        self.store.set(LATEST_VERSION, &latest_version, false)?;
        info!(
            "Update check finished, latest version: {}",
            if latest_version.is_empty() {
                "unknown"
            } else {
                latest_version.as_str()
            }
        );

        Ok(CheckOutcome::Checked { latest_version })
    }

    /// URL queried for the latest version on the configured channel
    pub fn latest_version_url(&self, trigger: &str) -> String {
        let builds_url = self.settings.builds_url.trim_end_matches('/');

        match self.settings.channel {
            ReleaseChannel::LatestBeta => format!("{}/LATEST_BETA", builds_url),
            ReleaseChannel::TwoXBeta => format!("{}/LATEST_2X_BETA", builds_url),
            ReleaseChannel::LatestStable | ReleaseChannel::TwoXStable => {
                self.api_latest_version_url(trigger)
            }
        }
    }

    fn api_latest_version_url(&self, trigger: &str) -> String {
        let base = format!(
            "{}/1.0/getLatestVersion/",
            self.settings.api_service_url.trim_end_matches('/')
        );
        let timezone = self.timezone.default_timezone();
        let parameters = [
            ("piwik_version", self.versions.platform.as_str()),
            ("php_version", self.versions.runtime.as_str()),
            ("release_channel", self.settings.channel.as_str()),
            ("url", self.settings.current_url.as_str()),
            ("trigger", trigger),
            ("timezone", timezone.as_str()),
        ];

        match reqwest::Url::parse_with_params(&base, &parameters) {
            Ok(url) => url.to_string(),
            Err(e) => {
                // The request will fail and be recorded as an unknown version
                warn!("Invalid update service URL {}: {}", base, e);
                base
            }
        }
    }

    /// Fetches and validates the version; every failure yields an empty string
    async fn fetch_latest_version(&self, url: &str) -> String {
        debug!("Requesting latest version from {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Update check request failed: {}", e);
                return String::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Update service returned status {}: {}", status, url);
            return String::new();
        }

        match response.text().await {
            Ok(body) => validate_version(body),
            Err(e) => {
                warn!("Failed to read update service response: {}", e);
                String::new()
            }
        }
    }

    fn last_time_checked(&self) -> Result<Option<i64>, UpdateError> {
        let raw = self.store.get(LAST_TIME_CHECKED)?;
        Ok(raw.and_then(|raw| raw.parse().ok()))
    }

    /// Latest version stored by the last check, if any check ran
    pub fn latest_version(&self) -> Result<Option<String>, UpdateError> {
        Ok(self.store.get(LATEST_VERSION)?)
    }

    /// Returns the latest version if it is newer than the running one
    pub fn newest_version_available(&self) -> Result<Option<String>, UpdateError> {
        let latest = self
            .latest_version()?
            .filter(|latest| !latest.is_empty() && is_newer(latest, &self.versions.platform));
        Ok(latest)
    }
}

/// Returns `body` if it looks like a version string, otherwise an empty string
pub fn validate_version(body: String) -> String {
    if VERSION_PATTERN.is_match(&body) {
        body
    } else {
        warn!("Update service returned an invalid version string");
        String::new()
    }
}
