use anyhow::Context;
use serde::Deserialize;

const CONFIG_FILE: &str = "library_api";
const ENV_PREFIX: &str = "LIBRARY_API";

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct DatabaseSettings {
    pub use_in_memory: bool,
    pub host: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub jaeger_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
/// Service configuration, layered from defaults, an optional `library_api.toml`
/// and `LIBRARY_API__SECTION__KEY` environment variables
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(config::File::with_name(CONFIG_FILE).required(false))
    }

    fn load_from<S>(file: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.use_in_memory", false)?
            .set_default("database.host", "127.0.0.1")?
            .set_default("database.username", "postgres")?
            .set_default("database.password", "postgres")?
            .set_default("telemetry.service_name", "library_api")?
            .set_default("telemetry.jaeger_enabled", true)?
            .add_source(file)
            // Plain variables used by the deployment scripts
            .set_override_option(
                "database.use_in_memory",
                std::env::var("USE_IN_MEMORY_DB")
                    .ok()
                    .map(|value| value.to_lowercase() == "true"),
            )?
            .set_override_option("database.host", std::env::var("DB_HOST").ok())?
            .set_override_option("database.username", std::env::var("DB_USERNAME").ok())?
            .set_override_option("database.password", std::env::var("DB_PASSWORD").ok())?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn defaults_are_used_without_sources() {
        let settings = Settings::load_from(config::File::with_name("not_existing").required(false))
            .expect("Failed to load settings");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.telemetry.service_name, "library_api");
    }

    #[test]
    #[serial_test::serial]
    fn file_overrides_defaults() {
        let file = config::File::from_str(
            r#"
            [server]
            port = 9000

            [database]
            use_in_memory = true
            "#,
            config::FileFormat::Toml,
        );
        let settings = Settings::load_from(file).expect("Failed to load settings");
        assert_eq!(settings.server.port, 9000);
        assert!(settings.database.use_in_memory);
        assert_eq!(settings.database.username, "postgres");
    }

    #[test]
    #[serial_test::serial]
    fn plain_database_variables_win_over_prefixed_ones() {
        std::env::set_var("DB_HOST", "flat-host");
        std::env::set_var("LIBRARY_API__DATABASE__HOST", "prefixed-host");
        std::env::set_var("LIBRARY_API__DATABASE__USERNAME", "prefixed-user");
        std::env::set_var("LIBRARY_API__SERVER__PORT", "9100");

        let settings = Settings::load_from(config::File::with_name("not_existing").required(false));

        std::env::remove_var("DB_HOST");
        std::env::remove_var("LIBRARY_API__DATABASE__HOST");
        std::env::remove_var("LIBRARY_API__DATABASE__USERNAME");
        std::env::remove_var("LIBRARY_API__SERVER__PORT");

        let settings = settings.expect("Failed to load settings");
        assert_eq!(settings.database.host, "flat-host");
        assert_eq!(settings.database.username, "prefixed-user");
        assert_eq!(settings.server.port, 9100);
    }
}
