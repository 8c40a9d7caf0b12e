//! Process-wide cache of facts discovered about servers.
//!
//! Entries are keyed by `host:zone`. Values are free-form strings; callers
//! use [`IS_TRUE`] and [`IS_FALSE`] for flags.

use crate::error::ClientError;
use crate::server_properties::ServerProperties;
use dashmap::DashMap;
use std::collections::HashMap;

/// Whether the server supports the specific-query extensions.
pub const JARGON_SPECIFIC_QUERIES_SUPPORTED: &str = "jargon.specific.queries.supported";

pub const IS_TRUE: &str = "true";
pub const IS_FALSE: &str = "false";

/// Concurrent property cache shared between sessions.
#[derive(Debug, Default)]
pub struct DiscoveredServerPropertiesCache {
    properties: DashMap<String, HashMap<String, String>>,
    server_properties: DashMap<String, ServerProperties>,
}

fn cache_key(host: &str, zone: &str) -> Result<String, ClientError> {
    if host.trim().is_empty() {
        return Err(ClientError::InvalidArgument("blank host".to_string()));
    }
    if zone.trim().is_empty() {
        return Err(ClientError::InvalidArgument("blank zone".to_string()));
    }
    Ok(format!("{}:{}", host.trim(), zone.trim()))
}

fn require(name: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::InvalidArgument(format!("blank {}", name)));
    }
    Ok(())
}

impl DiscoveredServerPropertiesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached property, if present.
    pub fn retrieve_value(
        &self,
        host: &str,
        zone: &str,
        property: &str,
    ) -> Result<Option<String>, ClientError> {
        require("property", property)?;
        let key = cache_key(host, zone)?;
        Ok(self
            .properties
            .get(&key)
            .and_then(|props| props.get(property).cloned()))
    }

    /// Stores a property, replacing any previous value.
    pub fn cache_property(
        &self,
        host: &str,
        zone: &str,
        property: &str,
        value: &str,
    ) -> Result<(), ClientError> {
        require("property", property)?;
        let key = cache_key(host, zone)?;
        tracing::debug!("Caching {}={} for {}", property, value, key);
        self.properties
            .entry(key)
            .or_default()
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    /// Removes one property.
    pub fn delete_cached_property(
        &self,
        host: &str,
        zone: &str,
        property: &str,
    ) -> Result<(), ClientError> {
        require("property", property)?;
        let key = cache_key(host, zone)?;
        if let Some(mut props) = self.properties.get_mut(&key) {
            props.remove(property);
        }
        Ok(())
    }

    /// Removes everything cached for a host and zone.
    pub fn delete_cache(&self, host: &str, zone: &str) -> Result<(), ClientError> {
        let key = cache_key(host, zone)?;
        self.properties.remove(&key);
        self.server_properties.remove(&key);
        Ok(())
    }

    pub fn server_properties(&self, host: &str, zone: &str) -> Option<ServerProperties> {
        let key = cache_key(host, zone).ok()?;
        self.server_properties.get(&key).map(|p| p.clone())
    }

    pub fn cache_server_properties(
        &self,
        host: &str,
        zone: &str,
        properties: ServerProperties,
    ) -> Result<(), ClientError> {
        let key = cache_key(host, zone)?;
        self.server_properties.insert(key, properties);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_and_retrieve() {
        let cache = DiscoveredServerPropertiesCache::new();
        assert_eq!(
            cache
                .retrieve_value("host", "zone", JARGON_SPECIFIC_QUERIES_SUPPORTED)
                .unwrap(),
            None
        );
        cache
            .cache_property("host", "zone", JARGON_SPECIFIC_QUERIES_SUPPORTED, IS_TRUE)
            .unwrap();
        assert_eq!(
            cache
                .retrieve_value(" host ", "zone ", JARGON_SPECIFIC_QUERIES_SUPPORTED)
                .unwrap()
                .as_deref(),
            Some(IS_TRUE)
        );
        assert_eq!(cache.retrieve_value("host", "other", JARGON_SPECIFIC_QUERIES_SUPPORTED).unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let cache = DiscoveredServerPropertiesCache::new();
        cache.cache_property("h", "z", "a", IS_TRUE).unwrap();
        cache.cache_property("h", "z", "b", IS_FALSE).unwrap();
        cache.delete_cached_property("h", "z", "a").unwrap();
        assert_eq!(cache.retrieve_value("h", "z", "a").unwrap(), None);
        assert_eq!(cache.retrieve_value("h", "z", "b").unwrap().as_deref(), Some(IS_FALSE));
        cache.delete_cache("h", "z").unwrap();
        assert_eq!(cache.retrieve_value("h", "z", "b").unwrap(), None);
        cache.delete_cached_property("h", "z", "missing").unwrap();
    }

    #[test]
    fn test_blank_arguments() {
        let cache = DiscoveredServerPropertiesCache::new();
        assert!(matches!(
            cache.retrieve_value("", "z", "p"),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(cache.cache_property("h", "  ", "p", "v").is_err());
        assert!(cache.delete_cached_property("h", "z", "").is_err());
        assert!(cache.delete_cache(" ", "z").is_err());
    }

    #[test]
    fn test_server_properties_memo() {
        let cache = DiscoveredServerPropertiesCache::new();
        assert!(cache.server_properties("h", "z").is_none());
        let props = ServerProperties {
            icat_enabled: true,
            boot_time: None,
            release_version: "rods4.2.8".to_string(),
            api_version: "d".to_string(),
            zone: "z".to_string(),
        };
        cache.cache_server_properties("h", "z", props.clone()).unwrap();
        assert_eq!(cache.server_properties("h", "z"), Some(props));
        cache.delete_cache("h", "z").unwrap();
        assert!(cache.server_properties("h", "z").is_none());
    }
}
