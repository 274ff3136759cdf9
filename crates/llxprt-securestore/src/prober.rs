use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::Mutex;

use crate::keyring_capability::KeyringCapability;

const PROBE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CachedProbe {
    ok: bool,
    observed_at: Instant,
}

/// Produces a cached truth-value for keyring health via a real round-trip
/// rather than a cheap synchronous check, which is insufficient: a locked
/// keyring often answers "available" until the first real operation.
pub struct AvailabilityProber {
    service: String,
    capability: Option<Arc<dyn KeyringCapability>>,
    cached: Mutex<Option<CachedProbe>>,
}

impl AvailabilityProber {
    pub fn new(service: impl Into<String>, capability: Option<Arc<dyn KeyringCapability>>) -> Self {
        Self {
            service: service.into(),
            capability,
            cached: Mutex::new(None),
        }
    }

    pub async fn is_available(&self) -> bool {
        let mut cached = self.cached.lock().await;
        if let Some(probe) = *cached {
            if probe.observed_at.elapsed() < PROBE_TTL {
                return probe.ok;
            }
        }
        let ok = self.probe_once().await;
        *cached = Some(CachedProbe {
            ok,
            observed_at: Instant::now(),
        });
        ok
    }

    async fn probe_once(&self) -> bool {
        let Some(capability) = &self.capability else {
            return false;
        };

        let test_account = format!("__securestore_probe_{}", random_suffix());
        const TEST_VALUE: &str = "probe";

        if capability
            .set_password(&self.service, &test_account, TEST_VALUE)
            .await
            .is_err()
        {
            return false;
        }

        let round_trip_ok = matches!(
            capability.get_password(&self.service, &test_account).await,
            Ok(value) if value == TEST_VALUE
        );
        let _ = capability.delete_password(&self.service, &test_account).await;
        round_trip_ok
    }

    /// Invalidates the cache so the next call re-probes. Any operation that
    /// observes a transient (timeout) failure mid-session calls this.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        *cached = None;
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring_capability::InMemoryKeyringCapability;

    #[tokio::test]
    async fn unit_probe_reports_true_for_working_capability() {
        let prober = AvailabilityProber::new("svc", Some(InMemoryKeyringCapability::arc()));
        assert!(prober.is_available().await);
    }

    #[tokio::test]
    async fn unit_probe_reports_false_when_capability_absent() {
        let prober = AvailabilityProber::new("svc", None);
        assert!(!prober.is_available().await);
    }

    #[tokio::test]
    async fn functional_invalidate_forces_reprobe() {
        let prober = AvailabilityProber::new("svc", Some(InMemoryKeyringCapability::arc()));
        assert!(prober.is_available().await);
        prober.invalidate().await;
        assert!(prober.cached.lock().await.is_none());
        assert!(prober.is_available().await);
    }
}
