use std::path::PathBuf;

use super::parsing::{
    env_optional, env_or_default, is_supported_upload_extension, parse_bool, parse_cors_origins,
    parse_environment, parse_grading_api_mode, parse_string_list, parse_u16, parse_u32,
    parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, GradingSettings, RuntimeSettings,
    S3Settings, ServerHost, ServerPort, ServerSettings, Settings, StorageSettings,
    TelemetrySettings,
};

const DEFAULT_GRADING_ENGINE_URL: &str = "http://127.0.0.1:8000";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("SMARTGRADE_HOST", "0.0.0.0");
        let port = env_or_default("SMARTGRADE_PORT", "3000");

        let environment = parse_environment(
            env_optional("SMARTGRADE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("SMARTGRADE_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "SmartGrade API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = env_or_default("API_PREFIX", "/api");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "smartgrade");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "smartgrade_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "20"),
        )?;

        let explicit_engine_url = env_optional("GRADING_ENGINE_URL")
            .or_else(|| env_optional("FASTAPI_SERVER_URL"))
            .or_else(|| env_optional("FLASK_SERVER_URL"));
        let base_url_explicit = explicit_engine_url.is_some();
        let grading_base_url =
            explicit_engine_url.unwrap_or_else(|| DEFAULT_GRADING_ENGINE_URL.to_string());
        let api_mode = parse_grading_api_mode(env_optional("GRADING_ENGINE_API"))?;
        let versioned_marker = env_or_default("GRADING_ENGINE_VERSIONED_MARKER", ":8000");
        let grade_timeout_seconds = parse_u64(
            "GRADING_TIMEOUT_SECONDS",
            env_or_default("GRADING_TIMEOUT_SECONDS", "120"),
        )?;
        let health_timeout_seconds = parse_u64(
            "GRADING_HEALTH_TIMEOUT_SECONDS",
            env_or_default("GRADING_HEALTH_TIMEOUT_SECONDS", "5"),
        )?;
        let report_timeout_seconds = parse_u64(
            "GRADING_REPORT_TIMEOUT_SECONDS",
            env_or_default("GRADING_REPORT_TIMEOUT_SECONDS", "60"),
        )?;
        let key_timeout_seconds = parse_u64(
            "GRADING_KEY_TIMEOUT_SECONDS",
            env_or_default("GRADING_KEY_TIMEOUT_SECONDS", "60"),
        )?;
        let validate_marks =
            env_optional("GRADING_VALIDATE_MARKS").map(|value| parse_bool(&value)).unwrap_or(true);

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "20"))?;
        let allowed_upload_extensions = parse_string_list(
            env_optional("ALLOWED_UPLOAD_EXTENSIONS"),
            &["pdf", "png", "jpg", "jpeg"],
        );
        let blob_fetch_timeout_seconds = parse_u64(
            "BLOB_FETCH_TIMEOUT_SECONDS",
            env_or_default("BLOB_FETCH_TIMEOUT_SECONDS", "30"),
        )?;
        let persistence_timeout_seconds = parse_u64(
            "PERSISTENCE_TIMEOUT_SECONDS",
            env_or_default("PERSISTENCE_TIMEOUT_SECONDS", "30"),
        )?;
        let staging_dir = env_optional("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("smartgrade-staging"));
        let staging_stale_after_seconds = parse_u64(
            "STAGING_STALE_AFTER_SECONDS",
            env_or_default("STAGING_STALE_AFTER_SECONDS", "3600"),
        )?;

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://s3.amazonaws.com");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "smartgrade-uploads");
        let s3_region = env_or_default("S3_REGION", "us-east-1");
        let s3_public_url = env_optional("S3_PUBLIC_URL");

        let log_level = env_or_default("SMARTGRADE_LOG_LEVEL", "info");
        let json =
            env_optional("SMARTGRADE_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            grading: GradingSettings {
                base_url: grading_base_url,
                base_url_explicit,
                api_mode,
                versioned_marker,
                grade_timeout_seconds,
                health_timeout_seconds,
                report_timeout_seconds,
                key_timeout_seconds,
                validate_marks,
            },
            storage: StorageSettings {
                max_upload_size_mb,
                allowed_upload_extensions,
                blob_fetch_timeout_seconds,
                persistence_timeout_seconds,
                staging_dir,
                staging_stale_after_seconds,
            },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
                public_url: s3_public_url,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_upload_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_UPLOAD_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.storage.allowed_upload_extensions {
            if !is_supported_upload_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_UPLOAD_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        let timeouts = [
            ("GRADING_TIMEOUT_SECONDS", self.grading.grade_timeout_seconds),
            ("GRADING_HEALTH_TIMEOUT_SECONDS", self.grading.health_timeout_seconds),
            ("GRADING_REPORT_TIMEOUT_SECONDS", self.grading.report_timeout_seconds),
            ("GRADING_KEY_TIMEOUT_SECONDS", self.grading.key_timeout_seconds),
            ("BLOB_FETCH_TIMEOUT_SECONDS", self.storage.blob_fetch_timeout_seconds),
            ("PERSISTENCE_TIMEOUT_SECONDS", self.storage.persistence_timeout_seconds),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::InvalidValue { field, value: "0".to_string() });
            }
        }

        if self.storage.staging_stale_after_seconds <= self.grading.grade_timeout_seconds {
            return Err(ConfigError::InvalidValue {
                field: "STAGING_STALE_AFTER_SECONDS",
                value: self.storage.staging_stale_after_seconds.to_string(),
            });
        }

        if self.grading.versioned_marker.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "GRADING_ENGINE_VERSIONED_MARKER",
                value: String::from("<empty>"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if !self.s3.is_configured() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }
        if !self.grading.base_url_explicit {
            return Err(ConfigError::MissingSecret("GRADING_ENGINE_URL"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::core::config::GradingApiMode;
    use crate::test_support;

    #[tokio::test]
    async fn defaults_load_outside_strict_mode() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.api().api_prefix, "/api");
        assert_eq!(settings.grading().grade_timeout_seconds, 120);
        assert_eq!(settings.grading().health_timeout_seconds, 5);
        assert_eq!(settings.grading().api_mode, GradingApiMode::Auto);
        assert!(settings.grading().validate_marks);
        assert_eq!(settings.storage().blob_fetch_timeout_seconds, 30);
        assert_eq!(settings.storage().staging_stale_after_seconds, 3600);
    }

    #[tokio::test]
    async fn staging_staleness_must_outlast_a_grading_call() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("STAGING_STALE_AFTER_SECONDS", "60");

        let result = Settings::load();
        std::env::remove_var("STAGING_STALE_AFTER_SECONDS");

        let err = result.expect_err("stale window shorter than grading timeout");
        assert!(err.to_string().contains("STAGING_STALE_AFTER_SECONDS"));
    }

    #[tokio::test]
    async fn engine_url_falls_back_to_legacy_variables() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("FLASK_SERVER_URL", "http://grader.internal:5000");

        let settings = Settings::load().expect("settings");
        std::env::remove_var("FLASK_SERVER_URL");

        assert_eq!(settings.grading().base_url, "http://grader.internal:5000");
        assert!(settings.grading().base_url_explicit);
    }

    #[tokio::test]
    async fn zero_timeout_is_rejected() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("BLOB_FETCH_TIMEOUT_SECONDS", "0");

        let result = Settings::load();
        std::env::remove_var("BLOB_FETCH_TIMEOUT_SECONDS");

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn strict_mode_requires_engine_url_and_storage() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("SMARTGRADE_STRICT_CONFIG", "1");
        std::env::set_var("DATABASE_URL", "postgresql://u:p@localhost/db");

        let result = Settings::load();
        std::env::set_var("SMARTGRADE_STRICT_CONFIG", "0");

        let err = result.expect_err("strict mode must fail without secrets");
        assert!(err.to_string().contains("S3_ACCESS_KEY"));
    }
}
