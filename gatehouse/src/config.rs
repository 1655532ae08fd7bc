//! Application configuration.
//!
//! Configuration is assembled with [figment](https://docs.rs/figment): a YAML
//! file (path from `--config`) merged with `GATEHOUSE_`-prefixed environment
//! variables, where `__` separates nesting levels. For example
//! `GATEHOUSE_AUTH__SESSION__COOKIE_NAME` overrides
//! `auth.session.cookie_name`.
//!
//! Every struct carries serde defaults, so an empty file (or no file at all)
//! yields a fully usable development configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::types::Role;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "gatehouse", about = "Session authentication and capability gating service")]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "GATEHOUSE_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long, default_value_t = false)]
    pub validate: bool,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address to bind the HTTP listener to
    pub host: String,
    /// Port to bind the HTTP listener to
    pub port: u16,
    /// Authentication and authorization settings
    pub auth: AuthConfig,
    /// Users installed into the reference user store at boot.
    ///
    /// Intended for development and for deployments that provision their
    /// principals statically; applications backed by a real user store leave
    /// this empty.
    pub seed_users: Vec<SeedUser>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            auth: AuthConfig::default(),
            seed_users: Vec::new(),
        }
    }
}

/// Authentication and authorization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Session cookie configuration
    pub session: SessionConfig,
    /// Password hashing and validation rules
    pub password: PasswordConfig,
    /// Capability name -> minimum role required to pass that gate.
    ///
    /// Entries here are registered into the gate registry at boot. Gates
    /// needing predicates beyond a role threshold are defined in code.
    pub capabilities: BTreeMap<String, Role>,
    /// Where unauthenticated requests are redirected (the sign-in form)
    pub sign_in_path: String,
    /// Where freshly signed-in users are redirected
    pub landing_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            password: PasswordConfig::default(),
            capabilities: BTreeMap::new(),
            sign_in_path: "/sign-in".to_string(),
            landing_path: "/".to_string(),
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Session timeout duration
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Cookie name for session token
    pub cookie_name: String,
    /// Set Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("Strict", "Lax", or "None")
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8 * 60 * 60),
            cookie_name: "gatehouse_session".to_string(),
            cookie_secure: true,
            cookie_same_site: "Strict".to_string(),
        }
    }
}

/// Password validation rules and Argon2 parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            argon2_memory_kib: 19456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// A user record provisioned into the reference store at boot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    /// Login identifier (email address or username)
    pub identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: Role,
    /// Plaintext password, hashed at boot and never stored.
    /// A seed user without a password cannot sign in.
    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("GATEHOUSE_").split("__"))
    }

    /// Check cross-field consistency rules that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let password = &self.auth.password;
        if password.min_length > password.max_length {
            return Err(format!(
                "Config validation: password.min_length ({}) cannot be greater than password.max_length ({})",
                password.min_length, password.max_length
            ));
        }
        if password.argon2_memory_kib < 8 * password.argon2_parallelism {
            return Err(format!(
                "Config validation: argon2_memory_kib ({}) must be at least 8 * argon2_parallelism ({})",
                password.argon2_memory_kib, password.argon2_parallelism
            ));
        }
        if password.argon2_iterations == 0 || password.argon2_parallelism == 0 {
            return Err("Config validation: argon2 iterations and parallelism must be non-zero".to_string());
        }

        let session = &self.auth.session;
        if session.timeout.is_zero() {
            return Err("Config validation: session timeout must be non-zero".to_string());
        }
        if session.cookie_name.is_empty() {
            return Err("Config validation: session cookie_name must not be empty".to_string());
        }
        if !matches!(session.cookie_same_site.as_str(), "Strict" | "Lax" | "None") {
            return Err(format!(
                "Config validation: cookie_same_site must be one of Strict, Lax, None (got '{}')",
                session.cookie_same_site
            ));
        }

        for user in &self.seed_users {
            if user.identifier.is_empty() {
                return Err("Config validation: seed user identifier must not be empty".to_string());
            }
            if let Some(pwd) = &user.password {
                if pwd.len() < password.min_length || pwd.len() > password.max_length {
                    return Err(format!(
                        "Config validation: seed user '{}' password length is outside [{}, {}]",
                        user.identifier, password.min_length, password.max_length
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn test_args(path: &str) -> Args {
        Args {
            config: PathBuf::from(path),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_from_empty_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "")?;
            let config = Config::load(&test_args("config.yaml")).expect("load default config");
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.auth.session.cookie_name, "gatehouse_session");
            assert!(config.auth.capabilities.is_empty());
            assert!(config.seed_users.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_yaml_capabilities_and_seed_users() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
port: 9001
auth:
  capabilities:
    edit: privileged
    view: standard
  session:
    timeout: 1h
    cookie_secure: false
seed_users:
  - identifier: admin@example.com
    display_name: Admin
    role: privileged
    password: correct-horse
"#,
            )?;
            let config = Config::load(&test_args("config.yaml")).expect("load config");
            assert_eq!(config.port, 9001);
            assert_eq!(config.auth.capabilities.get("edit"), Some(&Role::Privileged));
            assert_eq!(config.auth.capabilities.get("view"), Some(&Role::Standard));
            assert_eq!(config.auth.session.timeout, Duration::from_secs(3600));
            assert!(!config.auth.session.cookie_secure);
            assert_eq!(config.seed_users.len(), 1);
            assert_eq!(config.seed_users[0].role, Role::Privileged);
            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 9001")?;
            jail.set_env("GATEHOUSE_AUTH__SESSION__COOKIE_NAME", "other_session");
            jail.set_env("GATEHOUSE_PORT", "9002");
            let config = Config::load(&test_args("config.yaml")).expect("load config");
            assert_eq!(config.port, 9002);
            assert_eq!(config.auth.session.cookie_name, "other_session");
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_inverted_password_bounds() {
        let mut config = Config::default();
        config.auth.password.min_length = 64;
        config.auth.password.max_length = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.auth.session.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_same_site() {
        let mut config = Config::default();
        config.auth.session.cookie_same_site = "sometimes".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_bounds_seed_password() {
        let mut config = Config::default();
        config.seed_users.push(SeedUser {
            identifier: "a@example.com".to_string(),
            display_name: None,
            role: Role::Standard,
            password: Some("short".to_string()),
        });
        assert!(config.validate().is_err());
    }
}
