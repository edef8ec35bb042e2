//! Moodle site and plugin metadata.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;
use walkdir::WalkDir;

/// The Moodle checkout the plugin is installed into.
#[derive(Debug, Clone)]
pub struct MoodleSite {
    pub directory: PathBuf,
}

impl MoodleSite {
    pub fn open(directory: &Path) -> Result<Self> {
        if !directory.is_dir() {
            bail!("Moodle directory {} does not exist", directory.display());
        }
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    /// Scrape a `$CFG->name = '...';` value out of config.php. A missing
    /// file or unset key is `None`.
    pub fn config_value(&self, name: &str) -> Option<String> {
        let config = fs::read_to_string(self.directory.join("config.php")).ok()?;
        let pattern = Regex::new(&format!(
            r#"\$CFG->{}\s*=\s*['"]([^'"]+)['"]"#,
            regex::escape(name)
        ))
        .ok()?;
        pattern
            .captures(&config)
            .map(|captures| captures[1].to_string())
    }

    /// Where Behat writes failure HTML dumps, when the site configures it.
    pub fn behat_faildump_path(&self) -> Option<PathBuf> {
        self.config_value("behat_faildump_path").map(PathBuf::from)
    }

    pub fn composer_lock(&self) -> PathBuf {
        self.directory.join("composer.lock")
    }
}

/// The plugin under test.
#[derive(Debug, Clone)]
pub struct Plugin {
    pub component: String,
    pub directory: PathBuf,
}

impl Plugin {
    /// Identify the plugin from its version.php metadata.
    pub fn discover(directory: &Path) -> Result<Self> {
        let version_file = directory.join("version.php");
        let contents = fs::read_to_string(&version_file)
            .with_context(|| format!("could not read {}", version_file.display()))?;
        let pattern = Regex::new(r#"\$plugin->component\s*=\s*['"]([A-Za-z0-9_]+)['"]"#)?;
        let component = pattern
            .captures(&contents)
            .map(|captures| captures[1].to_string())
            .with_context(|| {
                format!(
                    "no $plugin->component declaration in {}",
                    version_file.display()
                )
            })?;
        Ok(Self {
            component,
            directory: directory.to_path_buf(),
        })
    }

    /// True when the plugin ships any Behat feature files.
    pub fn has_behat_features(&self) -> bool {
        WalkDir::new(self.directory.join("tests").join("behat"))
            .into_iter()
            .filter_map(|entry| entry.ok())
            .any(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "feature")
            })
    }
}
