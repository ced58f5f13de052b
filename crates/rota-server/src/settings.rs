//! Runtime configuration: an optional TOML file layered with `ROTA_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rota_api::IdentityEntry;
use rota_core::mutation::OwnershipPolicy;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Who may update or delete a restaurant.
  #[serde(default)]
  pub ownership:  OwnershipPolicy,
  /// Accepted bearer tokens, by digest.
  #[serde(default)]
  pub identities: Vec<IdentityEntry>,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("rota.db") }

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = config::Config::builder()
      .add_source(config::File::from(path).required(false));
    Self::build(builder)
  }

  fn build(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> anyhow::Result<Self> {
    let settings = builder
      .add_source(config::Environment::with_prefix("ROTA"))
      .build()
      .context("failed to read configuration")?;
    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    Ok(Self { store_path: expand_tilde(&cfg.store_path), ..cfg })
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::FileFormat;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    let builder = config::Config::builder()
      .add_source(config::File::from_str(toml, FileFormat::Toml));
    ServerConfig::build(builder).unwrap()
  }

  #[test]
  fn full_file_deserialises() {
    let cfg = from_toml(
      r#"
        host = "0.0.0.0"
        port = 9000
        store_path = "/var/lib/rota/rota.db"
        ownership = "owner-only"

        [[identities]]
        uid = "alice"
        token_sha256 = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/rota/rota.db"));
    assert_eq!(cfg.ownership, OwnershipPolicy::OwnerOnly);
    assert_eq!(cfg.identities.len(), 1);
    assert_eq!(cfg.identities[0].uid, "alice");
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.ownership, OwnershipPolicy::Open);
    assert!(cfg.identities.is_empty());
  }

  #[test]
  fn tilde_expands_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/rota.db")), PathBuf::from(home).join("rota.db"));
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }
}
