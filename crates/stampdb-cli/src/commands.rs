use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as Json};
use stampdb_store::{FileProviderConfig, FileStampProvider, Store, StoreConfig};
use tracing::debug;

use crate::cli::*;
use crate::render::{entry_json, parse_scalar, to_json};

/// Settings read from `--config`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub provider: FileProviderConfig,
    pub store: StoreConfig,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let session = Session { config, format: cli.format };
    match cli.command {
        Command::Dump(args) => cmd_dump(&session, args),
        Command::Keys(args) => cmd_keys(&session, args),
        Command::Get(args) => cmd_get(&session, args),
        Command::Set(args) => cmd_set(&session, args),
        Command::Remove(args) => cmd_remove(&session, args),
    }
}

/// Settings shared by every subcommand of one invocation.
struct Session {
    config: CliConfig,
    format: OutputFormat,
}

impl Session {
    fn open(&self, path: &Path) -> Store<FileStampProvider> {
        debug!(path = %path.display(), "opening document");
        let provider = FileStampProvider::with_config(path, self.config.provider.clone());
        Store::with_config(provider, HashMap::new(), self.config.store.clone())
    }
}

fn cmd_dump(session: &Session, args: PathArgs) -> anyhow::Result<()> {
    let store = session.open(&args.path);
    let entries = store.snapshot();
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();

    match session.format {
        OutputFormat::Json => {
            let object: JsonMap<String, Json> = keys
                .iter()
                .map(|k| ((*k).clone(), to_json(&entries[*k])))
                .collect();
            println!("{}", serde_json::to_string_pretty(&Json::Object(object))?);
        }
        OutputFormat::Text => {
            if keys.is_empty() {
                println!("{}", "(empty)".dimmed());
            }
            for key in keys {
                let value = &entries[key];
                println!("{} {} {}", key.bold(), format!("({})", value.kind()).dimmed(), value);
            }
        }
    }
    Ok(())
}

fn cmd_keys(session: &Session, args: PathArgs) -> anyhow::Result<()> {
    let keys = session.open(&args.path).keys();
    match session.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&keys)?),
        OutputFormat::Text => {
            for key in keys {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn cmd_get(session: &Session, args: GetArgs) -> anyhow::Result<()> {
    let value = session.open(&args.path).get(&args.key);
    match session.format {
        OutputFormat::Json => println!("{}", entry_json(&args.key, value.as_ref())),
        OutputFormat::Text => match value {
            Some(v) => println!("{} = {} {}", args.key.bold(), v, format!("({})", v.kind()).dimmed()),
            None => println!("{} = (not set)", args.key.bold()),
        },
    }
    Ok(())
}

fn cmd_set(session: &Session, args: SetArgs) -> anyhow::Result<()> {
    let value = parse_scalar(args.kind.into(), &args.value)?;
    let store = session.open(&args.path);
    store.set(args.key.clone(), value.clone());
    store
        .try_commit()
        .with_context(|| format!("failed to commit {}", args.path.display()))?;
    match session.format {
        OutputFormat::Json => println!("{}", entry_json(&args.key, Some(&value))),
        OutputFormat::Text => println!("{} Set {} = {}", "✓".green(), args.key.bold(), value),
    }
    Ok(())
}

/// Prints the removed entry, or `null` / "(not set)" if the key was absent.
/// Nothing is written back when the key was absent.
fn cmd_remove(session: &Session, args: RemoveArgs) -> anyhow::Result<()> {
    let store = session.open(&args.path);
    let previous = store.remove(&args.key);
    if previous.is_some() {
        store
            .try_commit()
            .with_context(|| format!("failed to commit {}", args.path.display()))?;
    }
    match (session.format, previous) {
        (OutputFormat::Json, previous) => {
            println!("{}", entry_json(&args.key, previous.as_ref()))
        }
        (OutputFormat::Text, Some(v)) => {
            println!("{} Removed {} (was {})", "✓".green(), args.key.bold(), v)
        }
        (OutputFormat::Text, None) => println!("{} = (not set)", args.key.bold()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use stampdb_codec::Value;

    fn session() -> Session {
        Session {
            config: CliConfig::default(),
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn set_then_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.bin");

        cmd_set(
            &session(),
            SetArgs {
                path: path.clone(),
                key: "count".into(),
                value: "7".into(),
                kind: ScalarKind::Long,
            },
        )
        .unwrap();
        assert_eq!(Store::open(&path).get("count"), Some(Value::Long(7)));

        cmd_remove(&session(), RemoveArgs { path: path.clone(), key: "count".into() }).unwrap();
        assert!(Store::open(&path).is_empty());
    }

    #[test]
    fn remove_missing_key_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.bin");
        cmd_remove(&session(), RemoveArgs { path: path.clone(), key: "k".into() }).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn run_command_from_parsed_args() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.bin");
        let path_arg = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["stampdb", "set", path_arg, "on", "true", "--kind", "bool"])
            .unwrap();
        run_command(cli).unwrap();
        let cli = Cli::try_parse_from(["stampdb", "--format", "json", "get", path_arg, "on"])
            .unwrap();
        run_command(cli).unwrap();

        assert_eq!(Store::open(&path).get("on"), Some(Value::Bool(true)));
    }

    #[test]
    fn set_rejects_unparsable_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.bin");
        let args = SetArgs {
            path: path.clone(),
            key: "k".into(),
            value: "nope".into(),
            kind: ScalarKind::Int,
        };
        assert!(cmd_set(&session(), args).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stampdb.toml");
        fs::write(
            &path,
            "[provider]\nsync_mode = \"every_commit\"\npermissions = 420\n\n[store]\nthread_name = \"cli\"\n",
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.provider.sync_mode, stampdb_store::SyncMode::EveryCommit);
        assert_eq!(config.provider.permissions, Some(0o644));
        assert!(config.provider.create_dirs);
        assert_eq!(config.store.thread_name, "cli");
    }

    #[test]
    fn missing_config_uses_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.store, StoreConfig::default());
    }
}
