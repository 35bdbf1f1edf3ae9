//! Presentational artifacts built from persisted results.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::config::ArtifactConfig;
use crate::correlation::CorrelationKey;

/// A successfully persisted result, handed back to the dispatching caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredArtifact {
    pub correlation_key: CorrelationKey,
    pub file_name: String,
    /// Storage path relative to the public base URL
    pub stored_path: String,
    pub public_url: String,
    pub byte_len: usize,
}

/// Renders the user-facing markup for a delivered artifact
pub trait ArtifactRenderer: Send + Sync + Debug {
    fn render(&self, artifact: &DeliveredArtifact, base_url: &str) -> String;
}

/// HTML audio card with a background image, player and caption
#[derive(Debug, Clone)]
pub struct AudioCardRenderer {
    background_asset: String,
    mime_type: String,
}

impl AudioCardRenderer {
    pub fn new(background_asset: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            background_asset: background_asset.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self::new(&config.background_asset, &config.mime_type)
    }
}

impl Default for AudioCardRenderer {
    fn default() -> Self {
        Self::from_config(&ArtifactConfig::default())
    }
}

impl ArtifactRenderer for AudioCardRenderer {
    fn render(&self, artifact: &DeliveredArtifact, base_url: &str) -> String {
        let background = escape_html(&public_url(base_url, &self.background_asset));
        let source = escape_html(&artifact.public_url);
        let mime_type = escape_html(&self.mime_type);
        let caption = escape_html(&artifact.file_name);

        format!(
            r#"<div class="card p-0 audio-card" style="background-image: url('{background}');">
  <div class="align-content-center pt-1 pb-2">
    <audio controls style="margin: auto; display: block">
      <source src="{source}" type="{mime_type}">
      Your browser does not support the audio element.
    </audio>
  </div>
</div>
<p style="width: 100%; text-align: center; font-weight: 600" class="text-l">{caption}</p>"#
        )
    }
}

/// Join a base URL and a relative path with exactly one slash between them
pub fn public_url(base_url: &str, stored_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        stored_path.trim_start_matches('/')
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
