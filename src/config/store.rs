use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{ApiError, ConfigError};

/// Keys `validate` requires to be present
const REQUIRED_KEYS: [&str; 3] = [
    "features.interviews.enabled",
    "openai.model",
    "interview.recordingQuality.video.width",
];

/// Backend URL for the host the client is served from
pub fn resolve_base_url(hostname: &str, origin: &str) -> String {
    match hostname {
        "localhost" => "http://localhost:5000".to_string(),
        "talentsync.vercel.app" => "https://talentsync-backend.herokuapp.com".to_string(),
        _ => origin.trim_end_matches('/').to_string(),
    }
}

/// A value changed at `key`
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub key: String,
    pub value: Value,
}

impl ConfigChange {
    /// True if the change touches `key`, a parent of it, or a child of it
    pub fn affects(&self, key: &str) -> bool {
        fn nested(child: &str, parent: &str) -> bool {
            child
                .strip_prefix(parent)
                .is_some_and(|rest| rest.starts_with('.'))
        }
        self.key == key || nested(key, &self.key) || nested(&self.key, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Runtime configuration tree with dotted-path access
///
/// `interview.recordingQuality.video.width` addresses nested objects.
pub struct ConfigStore {
    values: RwLock<Value>,
    changes: broadcast::Sender<ConfigChange>,
}

impl ConfigStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            values: RwLock::new(Self::defaults()),
            changes,
        }
    }

    pub fn defaults() -> Value {
        json!({
            "features": {
                "interviews": { "enabled": true, "maxDuration": 3600 },
                "aiAnalysis": { "enabled": true, "providers": ["openai"] }
            },
            "openai": {
                "model": "gpt-4",
                "maxTokens": 1000,
                "apiKeyConfigured": false
            },
            "interview": {
                "recordingQuality": {
                    "audio": { "sampleRate": 48000, "channelCount": 2 },
                    "video": { "width": 1280, "height": 720 }
                }
            }
        })
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let values = self.read();
        let mut current = &*values;
        for segment in key.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// Typed lookup; `None` when missing or of another type
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    /// Set a value, creating intermediate objects
    pub fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::EmptyKey);
        }

        {
            let mut values = self.write();
            let mut current = &mut *values;
            let (last, parents) = segments.split_last().ok_or(ConfigError::EmptyKey)?;

            for segment in parents {
                let object = current.as_object_mut().ok_or_else(|| ConfigError::NotAnObject {
                    key: key.to_string(),
                    segment: segment.to_string(),
                })?;
                current = object
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
            }

            let object = current.as_object_mut().ok_or_else(|| ConfigError::NotAnObject {
                key: key.to_string(),
                segment: last.to_string(),
            })?;
            object.insert(last.to_string(), value.clone());
        }

        debug!("Config {} updated", key);
        self.notify(key, value);
        Ok(())
    }

    /// Deep-merge an object of overrides
    pub fn merge(&self, overrides: Value) -> Result<(), ConfigError> {
        let Value::Object(overrides) = overrides else {
            return Err(ConfigError::InvalidValue {
                key: String::new(),
                reason: "overrides must be an object".to_string(),
            });
        };

        let changed: Vec<String> = overrides.keys().cloned().collect();
        {
            let mut values = self.write();
            deep_merge(&mut values, Value::Object(overrides));
        }

        for key in changed {
            if let Some(value) = self.get(&key) {
                self.notify(&key, value);
            }
        }
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.changes.subscribe()
    }

    pub fn validate(&self) -> Validation {
        let errors: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| self.get(key).map_or(true, |v| v.is_null()))
            .map(|key| format!("Missing required configuration: {}", key))
            .collect();

        Validation {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn reset(&self) {
        let defaults = Self::defaults();
        let keys: Vec<String> = defaults
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        *self.write() = defaults;
        for key in keys {
            if let Some(value) = self.get(&key) {
                self.notify(&key, value);
            }
        }
    }

    pub fn snapshot(&self) -> Value {
        self.read().clone()
    }

    /// Merge `{base_url}/api/config`; defaults stay in place on failure
    pub async fn load_remote(&self, http: &reqwest::Client, base_url: &str) -> Result<(), ApiError> {
        let url = format!("{}/api/config", base_url.trim_end_matches('/'));
        let result = async {
            let response = http
                .get(&url)
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Status(status.as_u16(), "Failed to load configuration".to_string()));
            }
            Ok(response.json::<Value>().await?)
        }
        .await;

        match result {
            Ok(remote) => self.merge(remote).map_err(|e| ApiError::Parse(e.to_string())),
            Err(e) => {
                warn!("Configuration loading failed, keeping defaults: {}", e);
                Err(e)
            }
        }
    }

    fn notify(&self, key: &str, value: Value) {
        let _ = self.changes.send(ConfigChange {
            key: key.to_string(),
            value,
        });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Value> {
        self.values.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Value> {
        self.values.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
