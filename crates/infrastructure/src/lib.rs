//! Infrastructure adapters for custom field ports.

#![forbid(unsafe_code)]

mod aes_value_encryptor;
mod in_memory_field_definition_repository;
mod in_memory_field_value_repository;
mod postgres_field_definition_repository;
mod postgres_field_value_repository;

pub use aes_value_encryptor::AesValueEncryptor;
pub use in_memory_field_definition_repository::InMemoryFieldDefinitionRepository;
pub use in_memory_field_value_repository::InMemoryFieldValueRepository;
pub use postgres_field_definition_repository::PostgresFieldDefinitionRepository;
pub use postgres_field_value_repository::PostgresFieldValueRepository;
