use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use structopt::StructOpt;
use thiserror::Error;

use gerrit_translator_cdevents as cdevents;

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub translator: TranslatorConfig,
    pub cdevents: CdEventsConfig,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Origin URL for events delivered without one.
    pub default_origin_url: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CdEventsConfig {
    pub spec_version: String,
}

impl Default for CdEventsConfig {
    fn default() -> Self {
        Self {
            spec_version: cdevents::SPEC_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open config file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Gerrit events to CDEvents translator
#[derive(StructOpt, Debug, Clone)]
#[structopt(rename_all = "kebab-case")]
pub struct Args {
    /// Print more
    #[structopt(short, long)]
    pub verbose: bool,
    /// Be silent
    #[structopt(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
    /// YAML configuration file
    #[structopt(long, short, parse(from_os_str))]
    pub config: Option<PathBuf>,
    /// URL of the Gerrit instance, sent as the X-Origin-Url header
    #[structopt(long)]
    pub origin_url: Option<String>,
    /// Read one event per line, as printed by `gerrit stream-events`
    #[structopt(long)]
    pub stream: bool,
    /// File containing the event; standard input if omitted
    #[structopt(parse(from_os_str))]
    pub input: Option<PathBuf>,
}

pub fn parse_args() -> Args {
    Args::from_args()
}

pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Open {
        path: path.to_owned(),
        source,
    })?;
    serde_yaml::from_reader(file).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}
