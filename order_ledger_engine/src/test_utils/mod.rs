//! Support code for the integration tests: throwaway SQLite databases with the schema applied.
pub mod prepare_env;
