//! Legacy WebDriver detection.
//!
//! Sites still depending on `instaclick/php-webdriver` can only drive an old
//! Firefox release; the composer lockfile is the source of truth.

use std::fs;
use std::path::Path;

use super::SeleniumError;

const LEGACY_DRIVER: &str = "instaclick/php-webdriver";

/// Whether the site's lockfile pins the superseded WebDriver integration.
///
/// An unreadable lockfile is an error, never `false`: a silent miss here
/// would select a backend image the site cannot talk to.
pub fn uses_legacy_webdriver(lockfile: &Path) -> Result<bool, SeleniumError> {
    let contents =
        fs::read_to_string(lockfile).map_err(|source| SeleniumError::LockfileUnreadable {
            path: lockfile.to_path_buf(),
            source,
        })?;
    Ok(contents.contains(LEGACY_DRIVER))
}
