use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stampdb_codec::ValueKind;

#[derive(Parser)]
#[command(
    name = "stampdb",
    about = "Inspect and edit stampdb documents",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with `[provider]` and `[store]` settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print every entry in a document
    Dump(PathArgs),
    /// List the keys of a document
    Keys(PathArgs),
    /// Print one entry
    Get(GetArgs),
    /// Set one entry and commit
    Set(SetArgs),
    /// Remove one entry and commit
    Remove(RemoveArgs),
}

#[derive(Args)]
pub struct PathArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub path: PathBuf,
    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub path: PathBuf,
    pub key: String,
    pub value: String,
    /// Kind to store the value as
    #[arg(short, long, default_value = "string")]
    pub kind: ScalarKind,
}

#[derive(Args)]
pub struct RemoveArgs {
    pub path: PathBuf,
    pub key: String,
}

/// Kinds that can be written from a single command-line argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ScalarKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    String,
}

impl From<ScalarKind> for ValueKind {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Byte => ValueKind::Byte,
            ScalarKind::Short => ValueKind::Short,
            ScalarKind::Int => ValueKind::Int,
            ScalarKind::Long => ValueKind::Long,
            ScalarKind::Float => ValueKind::Float,
            ScalarKind::Double => ValueKind::Double,
            ScalarKind::Bool => ValueKind::Bool,
            ScalarKind::Char => ValueKind::Char,
            ScalarKind::String => ValueKind::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_kind() {
        let cli = Cli::try_parse_from(["stampdb", "set", "db.bin", "count", "7", "--kind", "int"])
            .unwrap();
        match cli.command {
            Command::Set(args) => {
                assert_eq!(args.key, "count");
                assert_eq!(args.value, "7");
                assert_eq!(args.kind, ScalarKind::Int);
            }
            _ => panic!("expected set"),
        }
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["stampdb", "dump", "db.bin", "--format", "json", "-v"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn set_defaults_to_string() {
        let cli = Cli::try_parse_from(["stampdb", "set", "db.bin", "k", "v"]).unwrap();
        let Command::Set(args) = cli.command else {
            panic!("expected set");
        };
        assert_eq!(ValueKind::from(args.kind), ValueKind::String);
    }
}
