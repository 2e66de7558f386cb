//! Shared setup for integration tests

use std::sync::Arc;

use tempfile::TempDir;

use piwik_kernel::update::channel::ReleaseChannel;
use piwik_kernel::update::checker::{
    ConfiguredTimezone, RunningVersions, UpdateChecker, UpdateSettings,
};
use piwik_kernel::update::options::SqliteOptionStore;

/// URL nothing listens on, so requests fail at the transport level
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub fn option_store(temp_dir: &TempDir) -> Arc<SqliteOptionStore> {
    Arc::new(SqliteOptionStore::new(&temp_dir.path().join("options.db")).unwrap())
}

pub fn update_settings(api_service_url: &str) -> UpdateSettings {
    UpdateSettings {
        enabled: true,
        channel: ReleaseChannel::LatestStable,
        api_service_url: api_service_url.to_string(),
        builds_url: api_service_url.to_string(),
        current_url: String::new(),
    }
}

pub fn checker(
    store: Arc<SqliteOptionStore>,
    settings: UpdateSettings,
    running_version: &str,
) -> UpdateChecker<SqliteOptionStore> {
    UpdateChecker::new(
        store,
        settings,
        RunningVersions {
            platform: running_version.to_string(),
            runtime: "1.85".to_string(),
        },
        Box::new(ConfiguredTimezone("UTC".to_string())),
    )
    .unwrap()
}
