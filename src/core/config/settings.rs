use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment,
    parse_positive_i64, parse_u16, parse_u32, parse_u64,
};
use super::types::{
    ApiSettings, CatalogSettings, ConfigError, CorsSettings, DatabaseSettings, GradingSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

const DEV_SECRET_KEY: &str = "gradeflow-dev-secret";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADEFLOW_HOST", "0.0.0.0");
        let port = env_or_default("GRADEFLOW_PORT", "8000");

        let environment = parse_environment(
            env_optional("GRADEFLOW_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("GRADEFLOW_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Gradeflow API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        // Tokens are minted by the auth service; both sides must share this key.
        let secret_key = env_optional("SECRET_KEY");
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "gradeflow");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "gradeflow_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DB_MAX_CONNECTIONS", env_or_default("DB_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let catalog_base_url = env_or_default("CATALOG_BASE_URL", "http://localhost:5000/api");
        let catalog_api_token = env_or_default("CATALOG_API_TOKEN", "");
        let catalog_timeout_seconds =
            parse_u64("CATALOG_TIMEOUT_SECONDS", env_or_default("CATALOG_TIMEOUT_SECONDS", "10"))?;

        let lock_ttl_seconds =
            parse_u64("GRADE_LOCK_TTL_SECONDS", env_or_default("GRADE_LOCK_TTL_SECONDS", "30"))?;
        let lock_sweep_interval_seconds = parse_u64(
            "LOCK_SWEEP_INTERVAL_SECONDS",
            env_or_default("LOCK_SWEEP_INTERVAL_SECONDS", "15"),
        )?;
        let default_page_limit =
            parse_positive_i64("DEFAULT_PAGE_LIMIT", env_or_default("DEFAULT_PAGE_LIMIT", "10"))?;
        let max_page_limit =
            parse_positive_i64("MAX_PAGE_LIMIT", env_or_default("MAX_PAGE_LIMIT", "100"))?;

        let log_level = env_or_default("GRADEFLOW_LOG_LEVEL", "info");
        let json = env_optional("GRADEFLOW_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        if strict_config && secret_key.is_none() {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                secret_key: secret_key.unwrap_or_else(|| DEV_SECRET_KEY.to_string()),
                algorithm,
            },
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
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            catalog: CatalogSettings {
                base_url: catalog_base_url,
                api_token: catalog_api_token,
                timeout_seconds: catalog_timeout_seconds,
            },
            grading: GradingSettings {
                lock_ttl_seconds,
                lock_sweep_interval_seconds,
                default_page_limit,
                max_page_limit,
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

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn catalog(&self) -> &CatalogSettings {
        &self.catalog
    }

    pub(crate) fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.grading.default_page_limit > self.grading.max_page_limit {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_PAGE_LIMIT",
                value: self.grading.default_page_limit.to_string(),
            });
        }

        if self.grading.lock_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "GRADE_LOCK_TTL_SECONDS",
                value: String::from("0"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.catalog.api_token.is_empty() {
            return Err(ConfigError::MissingSecret("CATALOG_API_TOKEN"));
        }

        Ok(())
    }
}
