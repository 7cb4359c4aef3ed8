use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::Context;
use log::LevelFilter;
use tokio::sync::OnceCell;

pub const PROGNAME: &str = "zktree";
pub const CONFIG_NAME: &str = "config.toml";

static CONF: OnceCell<Config> = OnceCell::const_new();

#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    connect_timeout_secs: u64,
    fetch_timeout_secs: Option<u64>,
    max_in_flight: Option<usize>,
    log_level: String,
    log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connect_timeout_secs: 10,
            fetch_timeout_secs: None,
            max_in_flight: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Reads `explicit`, or the default config file if there is one.
pub fn init_config(explicit: Option<&Path>) -> anyhow::Result<()> {
    let conf = match explicit {
        Some(path) => read(path)?,
        None => match conf_dir().map(|dir| dir.join(CONFIG_NAME)) {
            Some(path) if path.exists() => read(&path)?,
            _ => Config::default(),
        },
    };

    CONF.set(conf).context("setting the global conf variable")?;
    Ok(())
}

fn read(path: &Path) -> anyhow::Result<Config> {
    let conts = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;
    parse(&conts).with_context(|| format!("in config file {:?}", path))
}

fn parse(conts: &str) -> anyhow::Result<Config> {
    let conf: Config = toml::from_str(conts).context("parsing config file as TOML")?;

    if LevelFilter::from_str(&conf.log_level).is_err() {
        anyhow::bail!("'{}' is not a log level", conf.log_level);
    }
    if conf.max_in_flight == Some(0) {
        anyhow::bail!("max_in_flight must be at least 1");
    }
    Ok(conf)
}

fn get_instance() -> &'static Config {
    CONF.get().expect("Config was not initialized")
}

pub fn connect_timeout() -> Duration {
    Duration::from_secs(get_instance().connect_timeout_secs)
}

pub fn fetch_timeout() -> Option<Duration> {
    get_instance().fetch_timeout_secs.map(Duration::from_secs)
}

pub fn max_in_flight() -> Option<usize> {
    get_instance().max_in_flight
}

pub fn log_level() -> LevelFilter {
    LevelFilter::from_str(&get_instance().log_level)
        .expect("has been checked while reading the config")
}

pub fn log_file() -> Option<&'static Path> {
    get_instance().log_file.as_deref()
}

pub fn conf_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(PROGNAME))
}

/// `-v` steps the level up from the configured one.
pub fn raise(level: LevelFilter, steps: u8) -> LevelFilter {
    LevelFilter::iter()
        .skip_while(|l| *l != level)
        .nth(steps as usize)
        .unwrap_or(LevelFilter::max())
}
