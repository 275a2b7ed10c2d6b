use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use attrivo_core::{AppError, AppResult};
use attrivo_domain::{FieldTypeCapability, FieldTypeDefinition, builtin_field_types};
use tracing::{debug, info};

/// Allow-list or deny-list applied to field type keys.
///
/// A non-empty `enabled` list is authoritative and `disabled` is then ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTypePolicy {
    /// When non-empty, only these keys are available.
    pub enabled: BTreeSet<String>,
    /// Keys that are unavailable while `enabled` is empty.
    pub disabled: BTreeSet<String>,
}

impl FieldTypePolicy {
    /// Returns whether the key is available under this policy.
    #[must_use]
    pub fn allows(&self, key: &str) -> bool {
        if !self.enabled.is_empty() {
            return self.enabled.contains(key);
        }

        !self.disabled.contains(key)
    }
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTypeRegistryConfig {
    /// Enabled and disabled keys.
    pub policy: FieldTypePolicy,
    /// Lifetime of the computed catalog. `None` keeps it until cleared.
    pub cache_ttl: Option<Duration>,
    /// Whether built-in field types are discovered.
    pub discovery_enabled: bool,
}

impl Default for FieldTypeRegistryConfig {
    fn default() -> Self {
        Self {
            policy: FieldTypePolicy::default(),
            cache_ttl: None,
            discovery_enabled: true,
        }
    }
}

type Catalog = Arc<BTreeMap<String, FieldTypeDefinition>>;

#[derive(Debug)]
struct CachedCatalog {
    entries: Catalog,
    built_at: Instant,
}

/// Catalog of field types available to administrators.
///
/// The catalog is computed on first use from the built-in types and the registered
/// ones, filtered by the policy, and cached. Registering new types does not refresh a
/// computed catalog; call [`FieldTypeRegistry::clear_cache`] or wait for the TTL.
#[derive(Debug)]
pub struct FieldTypeRegistry {
    config: FieldTypeRegistryConfig,
    registered: BTreeMap<String, FieldTypeDefinition>,
    cache: RwLock<Option<CachedCatalog>>,
}

impl FieldTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: FieldTypeRegistryConfig) -> Self {
        Self {
            config,
            registered: BTreeMap::new(),
            cache: RwLock::new(None),
        }
    }

    /// Registers extension field types. A key registered twice keeps the last definition,
    /// and registered types replace built-ins with the same key.
    pub fn register(&mut self, definitions: impl IntoIterator<Item = FieldTypeDefinition>) {
        for definition in definitions {
            info!(field_type = %definition.key(), "registered field type");
            self.registered
                .insert(definition.key().to_owned(), definition);
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FieldTypeRegistryConfig {
        &self.config
    }

    /// Returns whether a key passes the enabled and disabled lists.
    #[must_use]
    pub fn is_allowed(&self, key: &str) -> bool {
        self.config.policy.allows(key)
    }

    /// Returns an available field type.
    pub fn get(&self, key: &str) -> AppResult<FieldTypeDefinition> {
        if !self.is_allowed(key) {
            return Err(AppError::Configuration(format!(
                "field type '{key}' is disabled"
            )));
        }

        self.catalog()?.get(key).cloned().ok_or_else(|| {
            AppError::Configuration(format!("field type '{key}' is not registered"))
        })
    }

    /// Lists available field types having every requested capability, ordered by
    /// priority, then key.
    pub fn list(
        &self,
        capabilities: &[FieldTypeCapability],
    ) -> AppResult<Vec<FieldTypeDefinition>> {
        let catalog = self.catalog()?;
        let mut listed: Vec<FieldTypeDefinition> = catalog
            .values()
            .filter(|definition| {
                capabilities
                    .iter()
                    .all(|capability| definition.has_capability(*capability))
            })
            .cloned()
            .collect();

        listed.sort_by(|left, right| {
            left.priority()
                .cmp(&right.priority())
                .then_with(|| left.key().cmp(right.key()))
        });

        Ok(listed)
    }

    /// Drops the computed catalog.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.take().is_some() {
            debug!("cleared field type catalog");
        }
    }

    fn catalog(&self) -> AppResult<Catalog> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = cache.as_ref()
                && self.is_fresh(cached)
            {
                return Ok(Arc::clone(&cached.entries));
            }
        }

        let entries = Arc::new(self.build_catalog()?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(CachedCatalog {
            entries: Arc::clone(&entries),
            built_at: Instant::now(),
        });

        Ok(entries)
    }

    fn is_fresh(&self, cached: &CachedCatalog) -> bool {
        self.config
            .cache_ttl
            .is_none_or(|ttl| cached.built_at.elapsed() < ttl)
    }

    fn build_catalog(&self) -> AppResult<BTreeMap<String, FieldTypeDefinition>> {
        let mut entries = BTreeMap::new();

        if self.config.discovery_enabled {
            for definition in builtin_field_types()? {
                entries.insert(definition.key().to_owned(), definition);
            }
        }

        for (key, definition) in &self.registered {
            entries.insert(key.clone(), definition.clone());
        }

        entries.retain(|key, _| self.config.policy.allows(key));

        debug!(
            field_type_count = entries.len(),
            discovery_enabled = self.config.discovery_enabled,
            "computed field type catalog"
        );

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use attrivo_core::AppError;
    use attrivo_domain::{
        DataType, FieldTypeCapability, FieldTypeDefinition, FieldTypeDefinitionInput,
    };

    use super::{FieldTypePolicy, FieldTypeRegistry, FieldTypeRegistryConfig};

    fn custom_type(key: &str, priority: i32) -> FieldTypeDefinition {
        FieldTypeDefinition::new(FieldTypeDefinitionInput {
            key: key.to_owned(),
            label: "Rating".to_owned(),
            data_type: DataType::Numeric,
            priority,
            searchable: false,
            sortable: true,
            filterable: true,
            encryptable: false,
            accepts_arbitrary_values: false,
            without_user_options: false,
            default_validation_rules: Vec::new(),
            available_validation_rules: vec!["min".to_owned(), "max".to_owned()],
        })
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn builtins_are_discovered_by_default() {
        let registry = FieldTypeRegistry::new(FieldTypeRegistryConfig::default());
        let select = registry.get("select").unwrap_or_else(|_| unreachable!());
        assert_eq!(select.data_type(), DataType::SingleChoice);
        assert!(registry.get("tags_input").is_ok());
    }

    #[test]
    fn unknown_key_is_configuration_error() {
        let registry = FieldTypeRegistry::new(FieldTypeRegistryConfig::default());
        assert!(matches!(
            registry.get("hologram"),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn enabled_list_is_authoritative() {
        let registry = FieldTypeRegistry::new(FieldTypeRegistryConfig {
            policy: FieldTypePolicy {
                enabled: ["text", "select"].into_iter().map(str::to_owned).collect(),
                disabled: ["select"].into_iter().map(str::to_owned).collect(),
            },
            ..FieldTypeRegistryConfig::default()
        });

        assert!(registry.get("select").is_ok());
        assert!(registry.get("number").is_err());
        assert!(!registry.is_allowed("number"));

        let keys: Vec<String> = registry
            .list(&[])
            .unwrap_or_else(|_| unreachable!())
            .iter()
            .map(|definition| definition.key().to_owned())
            .collect();
        assert_eq!(keys, vec!["text".to_owned(), "select".to_owned()]);
    }

    #[test]
    fn disabled_list_applies_without_enabled_list() {
        let registry = FieldTypeRegistry::new(FieldTypeRegistryConfig {
            policy: FieldTypePolicy {
                enabled: Default::default(),
                disabled: ["currency"].into_iter().map(str::to_owned).collect(),
            },
            ..FieldTypeRegistryConfig::default()
        });

        assert!(matches!(
            registry.get("currency"),
            Err(AppError::Configuration(_))
        ));
        assert!(registry.get("number").is_ok());
    }

    #[test]
    fn list_filters_by_capability_and_orders_by_priority() {
        let registry = FieldTypeRegistry::new(FieldTypeRegistryConfig::default());
        let choiceable = registry
            .list(&[FieldTypeCapability::Choiceable])
            .unwrap_or_else(|_| unreachable!());

        assert!(!choiceable.is_empty());
        assert!(
            choiceable
                .iter()
                .all(|definition| definition.data_type().is_choice())
        );
        assert!(
            choiceable
                .windows(2)
                .all(|pair| pair[0].priority() <= pair[1].priority())
        );
    }

    #[test]
    fn registration_is_visible_after_cache_clear() {
        let mut registry = FieldTypeRegistry::new(FieldTypeRegistryConfig::default());
        assert!(registry.get("text").is_ok());

        registry.register([custom_type("rating", 5)]);
        assert!(registry.get("rating").is_err());

        registry.clear_cache();
        let rating = registry.get("rating").unwrap_or_else(|_| unreachable!());
        assert_eq!(rating.priority(), 5);
    }

    #[test]
    fn expired_catalog_is_recomputed() {
        let mut registry = FieldTypeRegistry::new(FieldTypeRegistryConfig {
            cache_ttl: Some(Duration::ZERO),
            ..FieldTypeRegistryConfig::default()
        });
        assert!(registry.get("text").is_ok());

        registry.register([custom_type("rating", 5)]);
        assert!(registry.get("rating").is_ok());
    }

    #[test]
    fn discovery_can_be_switched_off() {
        let mut registry = FieldTypeRegistry::new(FieldTypeRegistryConfig {
            discovery_enabled: false,
            ..FieldTypeRegistryConfig::default()
        });
        registry.register([custom_type("rating", 5), custom_type("rating", 7)]);

        let listed = registry.list(&[]).unwrap_or_else(|_| unreachable!());
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].priority(), 7);
        assert!(registry.get("text").is_err());
    }
}
