//! Namespaced escape-hatch options (spec.md §9: "dynamically typed provider options" redesign).
//!
//! `ProviderOptions` replaces a dynamically-typed nested map with a statically typed one:
//! `get::<T>(provider_id, key)` returns `None` both when the key is absent and when it is
//! present but doesn't deserialize as `T`, so callers can't observe the difference between
//! "not set" and "wrong type" — which is exactly the point: unknown/mistyped keys must be
//! silently ignorable by providers that don't recognize them (spec.md §3).

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// `provider_id -> key -> value`.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    by_provider: HashMap<String, HashMap<String, Value>>,
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single key for a provider namespace, overwriting any prior value for that key.
    pub fn set(&mut self, provider_id: impl Into<String>, key: impl Into<String>, value: Value) -> &mut Self {
        self.by_provider.entry(provider_id.into()).or_default().insert(key.into(), value);
        self
    }

    /// Typed read. Returns `None` if the key is unset or fails to deserialize as `T`.
    pub fn get<T: DeserializeOwned>(&self, provider_id: &str, key: &str) -> Option<T> {
        self.by_provider.get(provider_id)?.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Raw `Value` read, for callers that want to branch on shape themselves.
    pub fn get_raw(&self, provider_id: &str, key: &str) -> Option<&Value> {
        self.by_provider.get(provider_id)?.get(key)
    }

    /// All keys set for one provider id, as a flat map (used by protocol layers to merge
    /// `extra_body`/`extra_headers`-shaped options wholesale).
    pub fn namespace(&self, provider_id: &str) -> Option<&HashMap<String, Value>> {
        self.by_provider.get(provider_id)
    }

    /// Merge `other` into `self`; keys present in both namespaces take `other`'s value
    /// (later writes override earlier writes, per spec.md §4.4).
    pub fn merge(&mut self, other: &ProviderOptions) {
        for (provider_id, keys) in &other.by_provider {
            let entry = self.by_provider.entry(provider_id.clone()).or_default();
            for (k, v) in keys {
                entry.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_provider.values().all(|m| m.is_empty())
    }
}
