//! Release channels and the URLs they map to

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseChannel {
    #[default]
    LatestStable,
    LatestBeta,
    TwoXStable,
    TwoXBeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid release channel: {0}")]
pub struct InvalidReleaseChannel(pub String);

impl ReleaseChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseChannel::LatestStable => "latest_stable",
            ReleaseChannel::LatestBeta => "latest_beta",
            ReleaseChannel::TwoXStable => "2x_stable",
            ReleaseChannel::TwoXBeta => "2x_beta",
        }
    }

    /// Resolves the configured channel, falling back to `latest_stable`
    /// when the value is missing or not a known channel.
    pub fn from_config(value: Option<&str>) -> Self {
        match value {
            None => Self::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using {}", e, Self::default());
                Self::default()
            }),
        }
    }

    /// Download URL of the release archive for this channel.
    /// Beta channels pin the archive to `version`.
    pub fn archive_url(&self, builds_url: &str, version: &str) -> String {
        let builds_url = builds_url.trim_end_matches('/');
        match self {
            ReleaseChannel::LatestStable => format!("{}/piwik.zip", builds_url),
            ReleaseChannel::LatestBeta => format!("{}/piwik-{}.zip", builds_url, version),
            ReleaseChannel::TwoXStable => format!("{}/piwik2x.zip", builds_url),
            ReleaseChannel::TwoXBeta => format!("{}/piwik2x-{}.zip", builds_url, version),
        }
    }
}

pub fn is_valid_release_channel(value: &str) -> bool {
    value.parse::<ReleaseChannel>().is_ok()
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseChannel {
    type Err = InvalidReleaseChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest_stable" => Ok(ReleaseChannel::LatestStable),
            "latest_beta" => Ok(ReleaseChannel::LatestBeta),
            "2x_stable" => Ok(ReleaseChannel::TwoXStable),
            "2x_beta" => Ok(ReleaseChannel::TwoXBeta),
            other => Err(InvalidReleaseChannel(other.to_string())),
        }
    }
}
