use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use attrivo_application::{ColumnConstraints, FieldTypePolicy, FieldTypeRegistryConfig};
use attrivo_core::{AppError, AppResult, TenantId};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEVELOPMENT_ENCRYPTION_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub database_url: String,
    pub tenant_id: Option<TenantId>,
    pub encryption_key: String,
    pub registry: FieldTypeRegistryConfig,
    pub constraints: ColumnConstraints,
    pub entity_type: String,
    pub rows_path: PathBuf,
}

impl ImporterConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(env::args().skip(1), |name| env::var(name).ok())
    }

    fn from_lookup(
        args: impl IntoIterator<Item = String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let mut args = args.into_iter();
        let entity_type = args
            .next()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(usage)?;
        let rows_path = args.next().map(PathBuf::from).ok_or_else(usage)?;

        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let tenant_id = lookup("IMPORT_TENANT_ID")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map(|value| {
                Uuid::parse_str(value.as_str())
                    .map(TenantId::from_uuid)
                    .map_err(|error| {
                        AppError::Validation(format!(
                            "invalid IMPORT_TENANT_ID value '{value}': {error}"
                        ))
                    })
            })
            .transpose()?;

        let encryption_key = lookup("FIELD_VALUE_ENCRYPTION_KEY")
            .unwrap_or_else(|| DEVELOPMENT_ENCRYPTION_KEY.to_owned());

        let registry = FieldTypeRegistryConfig {
            policy: FieldTypePolicy {
                enabled: parse_key_list(lookup("FIELD_TYPES_ENABLED")),
                disabled: parse_key_list(lookup("FIELD_TYPES_DISABLED")),
            },
            cache_ttl: parse_optional::<u64>(&lookup, "FIELD_TYPE_CACHE_TTL_SECONDS")?
                .map(Duration::from_secs),
            discovery_enabled: parse_optional::<bool>(&lookup, "FIELD_TYPE_DISCOVERY")?
                .unwrap_or(true),
        };

        let defaults = ColumnConstraints::default();
        let string_max_length = parse_optional::<u64>(&lookup, "STRING_COLUMN_MAX_LENGTH")?
            .unwrap_or(defaults.string_max_length);
        if string_max_length == 0 || string_max_length > defaults.string_column_capacity {
            return Err(AppError::Validation(format!(
                "STRING_COLUMN_MAX_LENGTH must be between 1 and {}",
                defaults.string_column_capacity
            )));
        }
        let constraints = ColumnConstraints {
            string_max_length,
            text_max_length: parse_optional::<u64>(&lookup, "TEXT_COLUMN_MAX_LENGTH")?,
            ..defaults
        };

        Ok(Self {
            database_url,
            tenant_id,
            encryption_key,
            registry,
            constraints,
            entity_type,
            rows_path,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn usage() -> AppError {
    AppError::Validation("usage: attrivo-importer <entity-type> <rows.json>".to_owned())
}

fn parse_key_list(value: Option<String>) -> BTreeSet<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).map(|value| value.trim().to_owned()) {
        Some(value) if !value.is_empty() => value.parse::<T>().map(Some).map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use attrivo_core::AppError;

    use super::{DEVELOPMENT_ENCRYPTION_KEY, ImporterConfig};

    fn load(pairs: &[(&str, &str)]) -> Result<ImporterConfig, AppError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ImporterConfig::from_lookup(
            ["company".to_owned(), "rows.json".to_owned()],
            move |name| env.get(name).cloned(),
        )
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/attrivo")])
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(config.entity_type, "company");
        assert!(config.tenant_id.is_none());
        assert_eq!(config.encryption_key, DEVELOPMENT_ENCRYPTION_KEY);
        assert!(config.registry.discovery_enabled);
        assert!(config.registry.cache_ttl.is_none());
        assert_eq!(config.constraints.string_max_length, 255);
    }

    #[test]
    fn field_type_lists_and_limits_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/attrivo"),
            ("FIELD_TYPES_ENABLED", "text, select ,,"),
            ("FIELD_TYPE_CACHE_TTL_SECONDS", "60"),
            ("FIELD_TYPE_DISCOVERY", "false"),
            ("TEXT_COLUMN_MAX_LENGTH", "65535"),
        ])
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(
            config.registry.policy.enabled.iter().collect::<Vec<_>>(),
            vec!["select", "text"]
        );
        assert_eq!(config.registry.cache_ttl, Some(Duration::from_secs(60)));
        assert!(!config.registry.discovery_enabled);
        assert_eq!(config.constraints.text_max_length, Some(65535));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let missing = load(&[]);
        assert!(
            matches!(missing, Err(AppError::Validation(message)) if message.contains("DATABASE_URL"))
        );

        let tenant = load(&[
            ("DATABASE_URL", "postgres://localhost/attrivo"),
            ("IMPORT_TENANT_ID", "tenant-a"),
        ]);
        assert!(
            matches!(tenant, Err(AppError::Validation(message)) if message.contains("IMPORT_TENANT_ID"))
        );

        let ttl = load(&[
            ("DATABASE_URL", "postgres://localhost/attrivo"),
            ("FIELD_TYPE_CACHE_TTL_SECONDS", "soon"),
        ]);
        assert!(
            matches!(ttl, Err(AppError::Validation(message)) if message.contains("FIELD_TYPE_CACHE_TTL_SECONDS"))
        );
    }

    #[test]
    fn string_length_cannot_exceed_column_width() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/attrivo"),
            ("STRING_COLUMN_MAX_LENGTH", "512"),
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.constraints.string_max_length, 512);

        for value in ["0", "513"] {
            let result = load(&[
                ("DATABASE_URL", "postgres://localhost/attrivo"),
                ("STRING_COLUMN_MAX_LENGTH", value),
            ]);
            assert!(
                matches!(result, Err(AppError::Validation(message)) if message.contains("STRING_COLUMN_MAX_LENGTH")),
                "{value}"
            );
        }
    }

    #[test]
    fn positional_arguments_are_required() {
        let result = ImporterConfig::from_lookup(["company".to_owned()], |_| {
            Some("postgres://localhost/attrivo".to_owned())
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
