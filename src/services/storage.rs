use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Where uploaded shipment documents end up.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Store a file and return the URL it can be fetched from.
    async fn store(&self, shipment_id: &str, document: &str, file_name: &str) -> Result<String>;
}

/// Pretends to upload after a fixed delay; nothing is written anywhere.
pub struct SimulatedStorage {
    delay: Duration,
}

impl SimulatedStorage {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

fn clean_file_name(file_name: &str) -> Result<&str> {
    // keep only the last path segment
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        return Err(AppError::Validation("File name is required".into()));
    }
    Ok(name)
}

#[async_trait]
impl DocumentStorage for SimulatedStorage {
    async fn store(&self, shipment_id: &str, document: &str, file_name: &str) -> Result<String> {
        let file_name = clean_file_name(file_name)?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let url = format!(
            "/simulated-uploads/{shipment_id}/{document}-{}-{file_name}",
            Utc::now().timestamp_millis()
        );
        tracing::debug!(%shipment_id, %document, %url, "simulated upload stored");
        Ok(url)
    }
}
