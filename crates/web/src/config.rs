use std::path::PathBuf;
use std::str::FromStr;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set for the {backend} backend")]
    Missing {
        var: &'static str,
        backend: &'static str,
    },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which backend the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process store with a seeded demo account.
    Memory,
    /// Self-hosted Postgres with local file storage; auth via the hosted service.
    Postgres,
    /// Hosted backend-as-a-service for everything.
    Hosted,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
            Self::Hosted => "hosted",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            "hosted" => Ok(Self::Hosted),
            other => Err(format!("unknown backend '{other}', expected memory, postgres or hosted")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostedSettings {
    pub url: String,
    pub anon_key: String,
    pub bucket: String,
}

/// Account created at start-up in memory mode.
#[derive(Debug, Clone)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub backend: BackendKind,
    /// Set whenever `HOSTED_URL` and `HOSTED_ANON_KEY` are present.
    pub hosted: Option<HostedSettings>,
    pub database_url: Option<String>,
    /// Root of the local object store (postgres backend).
    pub storage_dir: PathBuf,
    /// Public base URL under which `storage_dir` is served.
    pub storage_public_url: String,
    pub demo: DemoAccount,
}

impl WebConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                 | Default                         |
    /// |-------------------------|---------------------------------|
    /// | `HOST`                  | `127.0.0.1`                     |
    /// | `PORT`                  | `3000`                          |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`         |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                            |
    /// | `BACKEND`               | `memory`                        |
    /// | `HOSTED_URL`            | required for hosted, postgres   |
    /// | `HOSTED_ANON_KEY`       | required for hosted, postgres   |
    /// | `HOSTED_STORAGE_BUCKET` | `note-images`                   |
    /// | `DATABASE_URL`          | required for postgres           |
    /// | `STORAGE_DIR`           | `./storage`                     |
    /// | `STORAGE_PUBLIC_URL`    | `http://127.0.0.1:3000/files`   |
    /// | `DEMO_EMAIL`            | `demo@example.com`              |
    /// | `DEMO_PASSWORD`         | `demo-password`                 |
    /// | `DEMO_NAME`             | `Demo`                          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "127.0.0.1");
        let port = parse::<u16>("PORT", var("PORT", "3000"))?;
        let request_timeout_secs =
            parse::<u64>("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS", "30"))?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let backend = parse::<BackendKind>("BACKEND", var("BACKEND", "memory"))?;

        let hosted = match (lookup("HOSTED_URL"), lookup("HOSTED_ANON_KEY")) {
            (Some(url), Some(anon_key)) if !url.trim().is_empty() => Some(HostedSettings {
                url,
                anon_key,
                bucket: var("HOSTED_STORAGE_BUCKET", "note-images"),
            }),
            _ => None,
        };
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        match backend {
            BackendKind::Memory => {}
            BackendKind::Hosted | BackendKind::Postgres => {
                if hosted.is_none() {
                    return Err(ConfigError::Missing {
                        var: "HOSTED_URL and HOSTED_ANON_KEY",
                        backend: backend.as_str(),
                    });
                }
                if backend == BackendKind::Postgres && database_url.is_none() {
                    return Err(ConfigError::Missing {
                        var: "DATABASE_URL",
                        backend: backend.as_str(),
                    });
                }
            }
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            backend,
            hosted,
            database_url,
            storage_dir: PathBuf::from(var("STORAGE_DIR", "./storage")),
            storage_public_url: var("STORAGE_PUBLIC_URL", "http://127.0.0.1:3000/files"),
            demo: DemoAccount {
                email: var("DEMO_EMAIL", "demo@example.com"),
                password: var("DEMO_PASSWORD", "demo-password"),
                name: var("DEMO_NAME", "Demo"),
            },
        })
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.clone(),
        reason: e.to_string(),
    })
}
