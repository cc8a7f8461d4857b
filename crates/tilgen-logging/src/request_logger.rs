use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{ensure_dir, mask_api_key};

/// Writes one text file per completion request/response pair for debugging
#[derive(Debug)]
pub struct RequestLogger {
    logs_dir: PathBuf,
    counter: AtomicU64,
}

impl RequestLogger {
    /// Create a logger writing into `logs_dir` (created if missing)
    pub fn new(logs_dir: &Path) -> Result<Self> {
        let logs_dir = ensure_dir(logs_dir)?;
        Ok(Self {
            logs_dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Returns a stem shared by the request and response files of one call
    pub fn next_stem(&self, model: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{:04}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.3f"),
            seq,
            model.replace('/', "-")
        )
    }

    /// Log HTTP request to file for persistent debugging
    pub fn log_request(
        &self,
        stem: &str,
        url: &str,
        request: &serde_json::Value,
        api_key: &str,
    ) -> Result<PathBuf> {
        let file_path = self.logs_dir.join(format!("req-{}.txt", stem));

        let mut log_content = String::new();
        log_content.push_str("HTTP REQUEST LOG\n");
        log_content.push_str("================\n\n");
        log_content.push_str(&format!("Timestamp: {}\n", Utc::now().to_rfc3339()));

        // Parse URL to show host and port
        if let Ok(parsed_url) = reqwest::Url::parse(url) {
            log_content.push_str(&format!("URL: {}\n", url));
            log_content.push_str(&format!("Host: {}\n", parsed_url.host_str().unwrap_or("unknown")));
            log_content.push_str(&format!(
                "Port: {}\n",
                parsed_url
                    .port_or_known_default()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ));
            log_content.push_str(&format!("Scheme: {}\n\n", parsed_url.scheme()));
        } else {
            log_content.push_str(&format!("URL: {}\n\n", url));
        }

        log_content.push_str("Headers:\n");
        log_content.push_str("  Content-Type: application/json\n");
        log_content.push_str(&format!("  Authorization: Bearer {}\n\n", mask_api_key(api_key)));

        log_content.push_str("Request Body:\n");
        match serde_json::to_string_pretty(request) {
            Ok(json) => {
                log_content.push_str(&json);
                log_content.push('\n');
            }
            Err(e) => {
                log_content.push_str(&format!("Error serializing request: {}\n", e));
            }
        }

        fs::write(&file_path, log_content)
            .with_context(|| format!("Failed to write request log to {}", file_path.display()))?;

        tracing::debug!(path = %file_path.display(), "request logged");
        Ok(file_path)
    }

    /// Log HTTP response to file for persistent debugging
    pub fn log_response(&self, stem: &str, status: reqwest::StatusCode, body: &str) -> Result<PathBuf> {
        let file_path = self.logs_dir.join(format!("resp-{}.txt", stem));

        let mut log_content = String::new();
        log_content.push_str("HTTP RESPONSE LOG\n");
        log_content.push_str("=================\n\n");
        log_content.push_str(&format!("Timestamp: {}\n", Utc::now().to_rfc3339()));
        log_content.push_str(&format!(
            "Status: {} {}\n\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ));

        log_content.push_str("Response Body:\n");
        // Try to pretty-print JSON, fall back to raw text
        match serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
        {
            Some(pretty) => log_content.push_str(&pretty),
            None => log_content.push_str(body),
        }
        log_content.push_str(&format!("\n\n---\nResponse Size: {} bytes\n", body.len()));

        fs::write(&file_path, log_content)
            .with_context(|| format!("Failed to write response log to {}", file_path.display()))?;

        tracing::debug!(path = %file_path.display(), "response logged");
        Ok(file_path)
    }
}
