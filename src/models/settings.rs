use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Settings file of the field agent (TOML)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub database_path: String,
    pub storage: StorageSettings,
    pub metadata: MetadataSettings,
    pub classifier: Option<ClassifierSettings>,
    pub connectivity: ConnectivitySettings,
    pub retry: RetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_path: "./data/restoration-ops.db".to_string(),
            storage: StorageSettings::default(),
            metadata: MetadataSettings::default(),
            classifier: None,
            connectivity: ConnectivitySettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

/// WebDAV storage for photo binaries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageSettings {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub remote_path: String,
    pub public_base_url: Option<String>,
}

/// REST endpoint of the hosted database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataSettings {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub timeout_secs: u64,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            table: "project_photos".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierSettings {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

fn default_classifier_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectivitySettings {
    /// URL polled to decide reachability; falls back to the metadata base URL
    pub probe_url: Option<String>,
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            probe_url: None,
            probe_interval_secs: 15,
            probe_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_attempts: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_secs: 5,
            max_delay_secs: 300,
            max_attempts: 5,
        }
    }
}

impl AppSettings {
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// URL the connectivity probe polls
    pub fn probe_url(&self) -> Option<&str> {
        self.connectivity
            .probe_url
            .as_deref()
            .or(Some(self.metadata.base_url.as_str()))
            .filter(|url| !url.is_empty())
    }

    /// Checks that everything a drain needs is present
    pub fn validate_remote(&self) -> Result<(), AppError> {
        if self.storage.server_url.trim().is_empty() {
            return Err(AppError::Config("storage.server_url is empty".to_string()));
        }
        if self.metadata.base_url.trim().is_empty() {
            return Err(AppError::Config("metadata.base_url is empty".to_string()));
        }
        if self.metadata.api_key.trim().is_empty() {
            return Err(AppError::Config("metadata.api_key is empty".to_string()));
        }
        if let Some(classifier) = &self.classifier {
            if classifier.endpoint.trim().is_empty() {
                return Err(AppError::Config("classifier.endpoint is empty".to_string()));
            }
        }
        if self.retry.base_delay_secs == 0 || self.retry.max_delay_secs < self.retry.base_delay_secs
        {
            return Err(AppError::Config(
                "retry delays must satisfy 0 < base_delay_secs <= max_delay_secs".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = AppSettings::from_toml("").unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.metadata.table, "project_photos");
        assert!(settings.classifier.is_none());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let settings = AppSettings::from_toml(
            r#"
            [storage]
            server_url = "https://dav.example.com"

            [classifier]
            endpoint = "https://ai.example.com/tag"

            [retry]
            max_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(settings.storage.server_url, "https://dav.example.com");
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.base_delay_secs, 5);
        assert_eq!(settings.classifier.unwrap().timeout_secs, 30);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut settings = AppSettings::default();
        settings.metadata.base_url = "https://api.example.com".to_string();
        let text = settings.to_toml().unwrap();
        assert_eq!(AppSettings::from_toml(&text).unwrap(), settings);
    }

    #[test]
    fn test_probe_url_falls_back_to_metadata() {
        let mut settings = AppSettings::default();
        assert_eq!(settings.probe_url(), None);

        settings.metadata.base_url = "https://api.example.com".to_string();
        assert_eq!(settings.probe_url(), Some("https://api.example.com"));

        settings.connectivity.probe_url = Some("https://status.example.com".to_string());
        assert_eq!(settings.probe_url(), Some("https://status.example.com"));
    }

    #[test]
    fn test_validate_remote_requires_endpoints() {
        let mut settings = AppSettings::default();
        assert!(matches!(settings.validate_remote(), Err(AppError::Config(_))));

        settings.storage.server_url = "https://dav.example.com".to_string();
        settings.metadata.base_url = "https://api.example.com".to_string();
        settings.metadata.api_key = "anon-key".to_string();
        assert!(settings.validate_remote().is_ok());
    }
}
