//! Selenium backend selection -- image precedence, networking, version pins.

pub mod legacy;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeleniumError {
    #[error("could not read dependency lockfile {path}: {source}")]
    LockfileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Host OS family, as far as docker networking is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Windows,
    Darwin,
}

impl OsFamily {
    /// Anything that is not Windows or macOS gets the Linux treatment.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::Darwin,
            _ => OsFamily::Linux,
        }
    }
}

/// Every input the image decision depends on. No environment or file access
/// happens past this point.
#[derive(Debug, Clone, Copy)]
pub struct ImageSelection<'a> {
    pub profile: &'a str,
    pub preferred_browser: Option<&'a str>,
    pub explicit_image: Option<&'a str>,
    pub legacy_webdriver: bool,
    pub mobile_app: bool,
}

const CHROME_IMAGE: &str = "selenium/standalone-chrome:3";
const CHROME_APP_IMAGE: &str = "selenium/standalone-chrome:120.0";
const FIREFOX_IMAGE: &str = "selenium/standalone-firefox:3";
const FIREFOX_LEGACY_IMAGE: &str = "selenium/standalone-firefox:2.53.1";

/// Pick the container image for a run.
///
/// Precedence: a non-empty explicit image is returned verbatim; a profile
/// naming a browser maps to that browser's pin; the `default` profile
/// follows the preferred-browser signal, falling back to chrome under the
/// mobile app and firefox otherwise. The legacy pin applies only to the
/// firefox family.
pub fn resolve_image(selection: &ImageSelection) -> String {
    if let Some(image) = selection.explicit_image {
        if !image.is_empty() {
            return image.to_string();
        }
    }

    let browser = if selection.profile == "default" {
        match selection.preferred_browser {
            Some(preferred) if !preferred.is_empty() => preferred,
            _ if selection.mobile_app => "chrome",
            _ => "firefox",
        }
    } else {
        selection.profile
    };

    if browser == "chrome" {
        let image = if selection.mobile_app {
            CHROME_APP_IMAGE
        } else {
            CHROME_IMAGE
        };
        return image.to_string();
    }

    if selection.legacy_webdriver {
        FIREFOX_LEGACY_IMAGE.to_string()
    } else {
        FIREFOX_IMAGE.to_string()
    }
}

/// Resolved backend: which image to run and how the host reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub image: String,
    pub network_mode: &'static str,
    pub webserver_bind: &'static str,
}

impl BackendTarget {
    /// Docker Desktop cannot share the host network, so Windows and macOS
    /// publish the WebDriver port and bind the web server on all interfaces.
    pub fn resolve(selection: &ImageSelection, os: OsFamily) -> Self {
        let (network_mode, webserver_bind) = match os {
            OsFamily::Linux => ("--network=host", "localhost:8000"),
            OsFamily::Windows | OsFamily::Darwin => ("--publish=4444:4444", "0.0.0.0:8000"),
        };
        Self {
            image: resolve_image(selection),
            network_mode,
            webserver_bind,
        }
    }
}
