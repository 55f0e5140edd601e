//! TTL cache for the service stack type catalog.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::core::client::Client;
use crate::core::types::ServiceStackType;

/// Catalog churn is low; a short TTL keeps new platform versions
/// visible without hammering the API.
pub const DEFAULT_STACK_TYPE_TTL: Duration = Duration::from_secs(600);

#[derive(Default)]
struct CacheSlot {
    types: Vec<ServiceStackType>,
    fetched_at: Option<Instant>,
}

/// Caches service stack types with a TTL. At most one caller refreshes
/// at a time; concurrent callers are served the previous value.
pub struct StackTypeCache {
    inner: RwLock<CacheSlot>,
    ttl: Duration,
}

impl StackTypeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(CacheSlot::default()),
            ttl,
        }
    }

    /// Returns cached stack types, refreshing from the API when expired.
    /// On API error the last-good value is served (empty if never fetched).
    pub fn get(&self, client: &dyn Client) -> Vec<ServiceStackType> {
        let stale = {
            let slot = self.inner.read().expect("cache lock");
            if let Some(at) = slot.fetched_at
                && at.elapsed() < self.ttl
            {
                return slot.types.clone();
            }
            slot.types.clone()
        };

        // A refresh already in flight keeps the write lock; serve the
        // previous value rather than queueing behind it.
        let Ok(mut slot) = self.inner.try_write() else {
            return stale;
        };
        if let Some(at) = slot.fetched_at
            && at.elapsed() < self.ttl
        {
            return slot.types.clone();
        }

        match client.list_service_stack_types() {
            Ok(types) => {
                slot.types = types.clone();
                slot.fetched_at = Some(Instant::now());
                types
            }
            Err(err) => {
                warn!(error = %err, "stack type refresh failed, serving stale catalog");
                stale
            }
        }
    }
}

impl Default for StackTypeCache {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_TYPE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{PlatformError, codes};
    use crate::core::mock::MockClient;
    use crate::core::types::{ServiceStackType, ServiceStackTypeVersion};

    fn catalog() -> Vec<ServiceStackType> {
        vec![ServiceStackType {
            name: "Node.js".into(),
            category: "USER".into(),
            versions: vec![ServiceStackTypeVersion {
                name: "nodejs@22".into(),
                is_build: false,
                status: "ACTIVE".into(),
            }],
        }]
    }

    fn api_down() -> MockClient {
        MockClient::new().with_error(
            "list_service_stack_types",
            PlatformError::new(codes::API_ERROR, "down", ""),
        )
    }

    #[test]
    fn test_fetches_and_serves_fresh() {
        let cache = StackTypeCache::new(Duration::from_secs(600));
        let client = MockClient::new().with_stack_types(catalog());
        assert_eq!(cache.get(&client).len(), 1);

        // Within TTL the API is not consulted at all.
        assert_eq!(cache.get(&api_down()).len(), 1);
    }

    #[test]
    fn test_stale_fallback_on_error() {
        let cache = StackTypeCache::new(Duration::ZERO);
        let client = MockClient::new().with_stack_types(catalog());
        assert_eq!(cache.get(&client).len(), 1);

        // Expired + failing refresh serves the last-good value.
        let types = cache.get(&api_down());
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Node.js");
    }

    #[test]
    fn test_empty_when_never_fetched() {
        let cache = StackTypeCache::new(Duration::ZERO);
        assert!(cache.get(&api_down()).is_empty());
    }
}
