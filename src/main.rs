use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use keyrotate::config::Config;
use keyrotate::diagnostics::AuditSink;
use keyrotate::rotation::{KeyRotationService, RandomTokenGenerator};
use keyrotate::store::{MemorySecretStore, SecretStore, VaultKvStore};
use keyrotate::utils;

#[derive(Parser)]
#[command(name = "keyrotate", version, about = "Rotate API keys in a versioned secret store")]
struct AppCli {
    /// Config file path (JSON); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Vault,
    /// Process-local store, nothing is persisted
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store a new version of one key
    Rotate {
        key_id: String,
        #[arg(long, value_enum, default_value_t = StoreKind::Vault)]
        store: StoreKind,
        /// Print the new key to stdout
        #[arg(long, default_value_t = false)]
        print: bool,
    },
}

fn build_store(kind: StoreKind, config: &Config) -> Result<Arc<dyn SecretStore>> {
    match kind {
        StoreKind::Vault => {
            let store = VaultKvStore::from_settings_and_env(&config.vault)?
                .ok_or_else(|| {
                    anyhow!("Vault is not configured (set VAULT_ADDRESS and VAULT_TOKEN)")
                })?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => Ok(Arc::new(MemorySecretStore::new())),
    }
}

async fn run<W: Write>(args: AppCli, out: &mut W) -> Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match args.command {
        Commands::Rotate {
            key_id,
            store,
            print,
        } => {
            let generator = RandomTokenGenerator::from_settings(&config.generator)
                .context("building secret generator")?;
            let store = build_store(store, &config)?;
            let service = KeyRotationService::new(store, Arc::new(AuditSink::new()))
                .with_generator(Arc::new(generator))
                .with_path_prefix(config.path_prefix.clone());

            let result = service.rotate_key(key_id.as_str()).await?;
            info!(key_id = result.id(), "key rotated");
            if print {
                writeln!(out, "{}", result.key())?;
            } else {
                writeln!(out, "{}", result.id())?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init();

    let args = AppCli::parse();
    run(args, &mut std::io::stdout().lock()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyrotate::RotationError;
    use tempfile::NamedTempFile;

    async fn run_cli(argv: &[&str]) -> Result<String> {
        let args = AppCli::try_parse_from(argv.iter().copied())?;
        let mut out = Vec::new();
        run(args, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn rotate_with_memory_store_prints_id() {
        let out = run_cli(&["keyrotate", "rotate", "svc", "--store", "memory"])
            .await
            .unwrap();
        assert_eq!(out, "svc\n");
    }

    #[tokio::test]
    async fn rotate_print_uses_configured_generator() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"path_prefix": "apikeys", "generator": {{"length": 20, "alphabet": "hex"}}}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let out = run_cli(&[
            "keyrotate", "-c", path.as_str(), "rotate", "svc", "--store", "memory", "--print",
        ])
        .await
        .unwrap();

        let key = out.trim_end();
        assert_eq!(key.len(), 20);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn blank_key_id_fails_with_invalid_argument() {
        let err = run_cli(&["keyrotate", "rotate", "   ", "--store", "memory"])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RotationError>(),
            Some(RotationError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn vault_store_requires_environment() {
        std::env::remove_var("VAULT_ADDRESS");
        std::env::remove_var("VAULT_TOKEN");

        let err = run_cli(&["keyrotate", "rotate", "svc"]).await.unwrap_err();
        assert!(err.to_string().contains("Vault is not configured"));
    }

    #[test]
    fn unknown_store_kind_is_rejected() {
        assert!(AppCli::try_parse_from(["keyrotate", "rotate", "svc", "--store", "disk"]).is_err());
    }
}
