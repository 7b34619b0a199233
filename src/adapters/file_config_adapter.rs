//! INI file configuration adapter.

use crate::domain::error::PortfolioError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

/// Section and key names are case-insensitive; values are trimmed.
#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
    source: String,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PortfolioError> {
        let source = path.as_ref().display().to_string();
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|reason| PortfolioError::ConfigParse {
                file: source.clone(),
                reason,
            })?;
        Ok(Self { config, source })
    }

    pub fn from_string(content: &str) -> Result<Self, PortfolioError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| PortfolioError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self {
            config,
            source: "<string>".into(),
        })
    }

    /// File path the configuration was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
    }

    fn has_section(&self, section: &str) -> bool {
        let wanted = section.to_lowercase();
        self.config.sections().iter().any(|s| *s == wanted)
    }
}
