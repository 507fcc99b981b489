use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationMode {
    /// Complete ingest URL, key included
    FullUrl,
    /// Server base plus stream key
    #[default]
    ServerKey,
}

/// Destination fields as the user typed them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationInput {
    pub mode: DestinationMode,
    pub full_url: String,
    pub server: String,
    pub stream_key: String,
}

impl DestinationInput {
    pub fn full_url(url: impl Into<String>) -> Self {
        Self {
            mode: DestinationMode::FullUrl,
            full_url: url.into(),
            ..Default::default()
        }
    }

    pub fn server_key(server: impl Into<String>, stream_key: impl Into<String>) -> Self {
        Self {
            mode: DestinationMode::ServerKey,
            server: server.into(),
            stream_key: stream_key.into(),
            ..Default::default()
        }
    }

    /// Resolve to the ingest URL, or `None` when nothing usable was entered.
    ///
    /// In server+key mode a blank server falls back to `default_server`, and
    /// the base always ends in `/` before the key is appended.
    pub fn resolve(&self, default_server: &str) -> Option<String> {
        match self.mode {
            DestinationMode::FullUrl => {
                let url = self.full_url.trim();
                (!url.is_empty()).then(|| url.to_string())
            }
            DestinationMode::ServerKey => {
                let key = self.stream_key.trim().trim_start_matches('/');
                if key.is_empty() {
                    return None;
                }

                let server = self.server.trim();
                let mut base = if server.is_empty() {
                    default_server.trim().to_string()
                } else {
                    server.to_string()
                };
                if !base.ends_with('/') {
                    base.push('/');
                }
                Some(format!("{}{}", base, key))
            }
        }
    }
}

/// Destination safe to log or display: the last path segment (the key) and
/// any query are masked.
pub fn redact_destination(destination: &str) -> String {
    let Ok(url) = Url::parse(destination) else {
        return "***".to_string();
    };

    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
    let mut segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    if segments.pop().is_some() {
        segments.push("***");
    }
    let path = if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    };

    format!(
        "{}://{}{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        port,
        path
    )
}
