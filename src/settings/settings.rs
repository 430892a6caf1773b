use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use warp::http::Uri;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub database: Database,
    pub auth: Auth,
    pub upload: Upload,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    // TLS is enabled only when both are set
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Mysql,
}

#[derive(Deserialize)]
pub struct Database {
    pub backend: DatabaseBackend,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend)
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct Auth {
    pub issuer: String,
    pub audience: String,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub password: PasswordCost,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("password", &self.password)
            .finish_non_exhaustive()
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Deserialize)]
pub struct PasswordCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize)]
pub struct Upload {
    pub dir: String,
    pub max_file_size: u64,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Read the settings file, then let `INKWELL__SECTION__KEY` environment
/// variables override single values (e.g. `INKWELL__AUTH__ACCESS_SECRET`).
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("INKWELL").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    if settings.auth.access_secret.is_empty() || settings.auth.refresh_secret.is_empty() {
        return Err(anyhow!("auth secrets must be set"));
    }
    if settings.auth.access_secret == settings.auth.refresh_secret {
        return Err(anyhow!("access and refresh secrets must differ"));
    }
    if settings.database.backend == DatabaseBackend::Mysql && settings.database.url.is_none() {
        return Err(anyhow!("database.url is required for the mysql backend"));
    }
    if let Some(origin) = &settings.http.cors_origin {
        check_cors_origin(origin)?;
    }

    Ok(settings)
}

/// An origin is `scheme://host[:port]` with an http(s) scheme and nothing
/// after the authority.
pub fn check_cors_origin(origin: &str) -> Result<()> {
    let uri: Uri = origin
        .parse()
        .map_err(|e| anyhow!("http.cors_origin {:?} is not a valid origin: {}", origin, e))?;

    let scheme_ok = matches!(uri.scheme_str(), Some("http") | Some("https"));
    let path_ok = matches!(uri.path(), "" | "/") && uri.query().is_none();
    if !scheme_ok || uri.authority().is_none() || !path_ok || origin.ends_with('/') {
        return Err(anyhow!(
            "http.cors_origin {:?} must look like scheme://host[:port]",
            origin
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_settings_parse() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/settings/dev.toml");
        let settings = parse_settings(Some(path)).unwrap();

        assert_eq!(settings.database.backend, DatabaseBackend::Memory);
        assert_eq!(settings.auth.access_ttl_secs, 15 * 60);
        assert_eq!(settings.auth.refresh_ttl_secs, 7 * 24 * 60 * 60);
        assert_eq!(settings.upload.max_file_size, 5 * 1024 * 1024);
    }

    #[test]
    fn cors_origin_must_be_scheme_and_host() {
        assert!(check_cors_origin("http://localhost:5173").is_ok());
        assert!(check_cors_origin("https://inkwell.example.com").is_ok());

        for bad in [
            "localhost:5173",
            "ftp://inkwell.example.com",
            "https://inkwell.example.com/app",
            "https://inkwell.example.com/",
            "https://",
            "not an origin",
            "",
        ] {
            assert!(check_cors_origin(bad).is_err(), "{:?} accepted", bad);
        }
    }

    #[test]
    fn malformed_cors_origin_fails_to_load() {
        let dir = std::env::temp_dir().join(format!("inkwell-settings-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let dev = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/settings/dev.toml"
        ))
        .unwrap();
        let broken = dev.replace(
            "cors_origin = \"http://localhost:5173\"",
            "cors_origin = \"http://bad origin\"",
        );
        assert_ne!(dev, broken);
        let path = dir.join("broken.toml");
        std::fs::write(&path, broken).unwrap();

        let err = parse_settings(path.to_str()).unwrap_err();
        assert!(err.to_string().contains("cors_origin"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn debug_output_hides_secrets() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/settings/dev.toml");
        let settings = parse_settings(Some(path)).unwrap();

        let printed = format!("{:?}", settings);
        assert!(!printed.contains(&settings.auth.access_secret));
        assert!(!printed.contains(&settings.auth.refresh_secret));
    }
}
