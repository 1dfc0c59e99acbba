//! Connection resilience around the remote store.
//!
//! Bounded retry with a fixed delay for the initial connection, and a
//! version gate that rejects servers below the minimum supported
//! release before any data is sent.

use std::time::Duration;
use tracing::{info, warn};

use crate::constants::MIN_SERVER_VERSION;
use crate::error::{Error, Result};
use crate::remote::RemoteStoreClient;

/// Connect with bounded retry, then verify version compatibility.
///
/// Exhausting every attempt is fatal for the whole process, not for a
/// single file.
pub async fn connect_with_retry(
    client: &dyn RemoteStoreClient,
    address: &str,
    max_attempts: u32,
    retry_delay: Duration,
) -> Result<()> {
    let mut last_failure = None;

    for attempt in 1..=max_attempts {
        match client.connect().await {
            Ok(()) => {
                info!("Connected to {} on attempt {}", address, attempt);
                check_version(client).await?;
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "Connection attempt {}/{} to {} failed: {}",
                    attempt, max_attempts, address, e
                );
                last_failure = Some(e);
                if attempt < max_attempts {
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    if let Some(e) = last_failure {
        warn!("Giving up on {}: {}", address, e);
    }
    Err(Error::ConnectionExhausted {
        address: address.to_string(),
        attempts: max_attempts,
    })
}

/// Verify the server is at or above the minimum supported version
pub async fn check_version(client: &dyn RemoteStoreClient) -> Result<()> {
    let version = client.server_version().await?;
    let (major, minor) = parse_version(&version).ok_or_else(|| Error::IncompatibleServerVersion {
        found: version.clone(),
        minimum: minimum_version_string(),
    })?;

    if (major, minor) < MIN_SERVER_VERSION {
        return Err(Error::IncompatibleServerVersion {
            found: version,
            minimum: minimum_version_string(),
        });
    }

    Ok(())
}

fn minimum_version_string() -> String {
    format!("{}.{}", MIN_SERVER_VERSION.0, MIN_SERVER_VERSION.1)
}

/// Parse "major.minor" (further components ignored) into a comparable pair
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = parts.next().unwrap_or("0").trim().parse().ok()?;
    Some((major, minor))
}
