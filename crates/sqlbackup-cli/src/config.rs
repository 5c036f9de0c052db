//! Configuration file loading and precedence
//!
//! Values come from, in order of precedence: command-line flags (or their
//! `SQLBACKUP_*` environment variables), the TOML config file, then the
//! built-in defaults.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use sqlbackup_dump::BackupOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Args;

const CONFIG_FILE_NAME: &str = ".sqlbackup.toml";

/// Contents of the TOML config file; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub credentials: Option<String>,
    pub drop: Option<bool>,
    pub output: Option<PathBuf>,
    pub tables: Vec<String>,
    pub exclude: Vec<String>,
    pub ping_timeout_secs: Option<u64>,
    pub metadata_timeout_secs: Option<u64>,
    pub query_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid config file")
    }

    /// Load the config file.
    ///
    /// An explicitly named file must exist; the default file is optional.
    /// Returns the path that was read alongside its contents.
    pub fn load(explicit: Option<&Path>) -> Result<Option<(PathBuf, Self)>> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(None),
            },
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(Some((path, config)))
    }
}

/// Fully resolved run settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: String,
    /// `None` writes the script to stdout
    pub output: Option<PathBuf>,
    pub backup: BackupOptions,
}

impl Settings {
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        let Some(credentials) = args.credentials.clone().or(file.credentials) else {
            bail!("requires credentials: user/password@connect_string");
        };

        let tables = if args.tables.is_empty() { file.tables } else { args.tables.clone() };
        let exclude = if args.exclude.is_empty() { file.exclude } else { args.exclude.clone() };

        let defaults = BackupOptions::default();
        let seconds = |flag: Option<u64>, from_file: Option<u64>, default: Duration| {
            flag.or(from_file).map(Duration::from_secs).unwrap_or(default)
        };

        let backup = BackupOptions::default()
            .with_drop_first(args.drop || file.drop.unwrap_or(false))
            .with_tables(tables)
            .with_excluded_tables(exclude)
            .with_ping_timeout(seconds(
                args.ping_timeout,
                file.ping_timeout_secs,
                defaults.ping_timeout,
            ))
            .with_metadata_timeout(seconds(
                args.metadata_timeout,
                file.metadata_timeout_secs,
                defaults.metadata_timeout,
            ))
            .with_query_timeout(seconds(
                args.query_timeout,
                file.query_timeout_secs,
                defaults.query_timeout,
            ));

        Ok(Self {
            credentials,
            output: args.output.clone().or(file.output),
            backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};
    use std::io::Write;

    /// Parse flags only; `SQLBACKUP_*` variables in the caller's shell are ignored.
    fn args(argv: &[&str]) -> Args {
        let command = Args::command().mut_args(|arg| arg.env(None::<&'static str>));
        let matches = command
            .try_get_matches_from(std::iter::once("sqlbackup").chain(argv.iter().copied()))
            .unwrap();
        Args::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_flags_keep_their_environment_variables() {
        let command = Args::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|env| env.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("credentials").as_deref(), Some("SQLBACKUP_CREDENTIALS"));
        assert_eq!(env_of("tables").as_deref(), Some("SQLBACKUP_TABLES"));
        assert_eq!(env_of("verbose"), None);

        let parsed = args(&[]);
        assert_eq!(parsed.credentials, None);
        assert!(parsed.tables.is_empty());
    }

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::from_toml(
            r#"
            credentials = "scott/tiger@XEPDB1"
            drop = true
            output = "backup.sql"
            tables = ["EMP", "DEPT"]
            exclude = ["AUDIT_LOG"]
            ping_timeout_secs = 10
            metadata_timeout_secs = 30
            query_timeout_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.credentials.as_deref(), Some("scott/tiger@XEPDB1"));
        assert_eq!(config.drop, Some(true));
        assert_eq!(config.output, Some(PathBuf::from("backup.sql")));
        assert_eq!(config.tables, vec!["EMP", "DEPT"]);
        assert_eq!(config.exclude, vec!["AUDIT_LOG"]);
        assert_eq!(config.query_timeout_secs, Some(600));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(FileConfig::from_toml("droop = true").is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let settings =
            Settings::resolve(&args(&["scott/tiger@XEPDB1"]), FileConfig::default()).unwrap();

        assert_eq!(settings.credentials, "scott/tiger@XEPDB1");
        assert_eq!(settings.output, None);
        assert!(!settings.backup.drop_first);
        assert_eq!(settings.backup.ping_timeout, Duration::from_secs(55));
        assert_eq!(settings.backup.query_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            credentials: Some("file/pw@FILEDB".into()),
            tables: vec!["FROM_FILE".into()],
            query_timeout_secs: Some(30),
            ping_timeout_secs: Some(5),
            ..Default::default()
        };
        let settings = Settings::resolve(
            &args(&["cli/pw@CLIDB", "--table", "EMP", "--query-timeout", "900"]),
            file,
        )
        .unwrap();

        assert_eq!(settings.credentials, "cli/pw@CLIDB");
        assert_eq!(settings.backup.include_tables, vec!["EMP"]);
        assert_eq!(settings.backup.query_timeout, Duration::from_secs(900));
        assert_eq!(settings.backup.ping_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_file_supplies_missing_values() {
        let file = FileConfig {
            credentials: Some("scott/tiger".into()),
            drop: Some(true),
            output: Some(PathBuf::from("out.sql")),
            ..Default::default()
        };
        let settings = Settings::resolve(&args(&[]), file).unwrap();

        assert_eq!(settings.credentials, "scott/tiger");
        assert!(settings.backup.drop_first);
        assert_eq!(settings.output, Some(PathBuf::from("out.sql")));
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        let err = Settings::resolve(&args(&["-d"]), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("requires credentials"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "drop = true\ntables = [\"EMP\"]").unwrap();

        let (path, config) = FileConfig::load(Some(file.path())).unwrap().unwrap();
        assert_eq!(path, file.path());
        assert_eq!(config.drop, Some(true));
        assert_eq!(config.tables, vec!["EMP"]);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(FileConfig::load(Some(&missing)).is_err());
    }
}
