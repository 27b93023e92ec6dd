use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "notes-app")]
#[command(about = "Runs the notes service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Start the HTTP server (default)
    #[default]
    Serve,
    /// Create the database tables and exit
    InitDb,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notes-app")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

const MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    public_url: Option<String>,
}

fn default_database() -> String {
    "notes_app.db".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for App {
    fn default() -> Self {
        App {
            database: default_database(),
            port: default_port(),
            public_url: None,
        }
    }
}

impl App {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Absolute base URL used when building share links, without a trailing slash.
    pub fn get_public_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(str::to_owned)
    }

    /// Resolves the configured database location. Accepts a bare path or a
    /// `sqlite:///` URL; relative paths are placed under `base_dir`.
    pub fn database_path(&self, base_dir: &Path) -> PathBuf {
        let raw = self.database.trim();
        let raw = raw.strip_prefix("sqlite:///").unwrap_or(raw);

        if raw == MEMORY_DATABASE {
            return PathBuf::from(MEMORY_DATABASE);
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let yaml_str =
            fs::read_to_string(path).with_context(|| format!("failed to read config file {path}"))?;
        let expanded = Config::substitute_env_vars(&yaml_str);
        let config: Config = serde_yaml::from_str(&expanded)
            .with_context(|| format!("failed to parse config file {path}"))?;
        Ok(config)
    }

    /// Reads the config file when it exists, otherwise builds one from the
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("config path is not valid UTF-8: {:?}", path))?;
            return Config::new(path);
        }

        tracing::info!(path = ?path, "no config file found, using environment");
        Config::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let mut app = App::default();

        if let Ok(database) = env::var("DATABASE_URL") {
            app.database = database;
        }
        if let Ok(port) = env::var("PORT") {
            app.port = port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {port:?}"))?;
        }
        if let Ok(public_url) = env::var("PUBLIC_URL") {
            app.public_url = Some(public_url);
        }

        Ok(Config { app })
    }

    /// Expands `${VAR}` and `${VAR:-default}` references.
    fn substitute_env_vars(yaml_str: &str) -> String {
        let mut output = String::with_capacity(yaml_str.len());
        let mut rest = yaml_str;

        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };

            output.push_str(&rest[..start]);
            let reference = &rest[start + 2..start + len];
            let value = match reference.split_once(":-") {
                Some((name, fallback)) => env::var(name).unwrap_or_else(|_| fallback.to_string()),
                None => env::var(reference).unwrap_or_else(|_| {
                    tracing::warn!("environment variable '{}' not found", reference);
                    String::new()
                }),
            };
            output.push_str(&value);
            rest = &rest[start + len + 1..];
        }

        output.push_str(rest);
        output
    }
}
