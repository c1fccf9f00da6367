use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{
    App,
    Arg,
    ArgMatches,
};
use thiserror::Error;

use hashdrop::digest::HashAlgorithm;
use hashdrop::state::{
    Config,
    SHORT_HASH_MIN,
};
use hashdrop::user::DEFAULT_COST;

/// Environment variable which, when set, replaces the command line arguments.
pub const OPTIONS_ENV: &str = "HASHDROP_OPTIONS";

const BIND_HOST: &str = "0.0.0.0";
const BIND_PORT: u16 = 8000;
const THREADS: usize = 4;

pub struct Settings {
    pub host: String,
    pub port: u16,
    pub threads: usize,
    pub config: Config,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Clap(#[from] clap::Error),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

fn parse_value<T: FromStr>(arg: &ArgMatches, name: &'static str) -> Result<Option<T>, SettingsError> {
    match arg.value_of(name) {
        Some(v) => {
            match T::from_str(v) {
                Ok(r) => Ok(Some(r)),
                Err(_) => Err(SettingsError::Invalid(name, v.to_string())),
            }
        },
        None => Ok(None),
    }
}

impl Settings {

    pub fn new() -> Settings {
        Settings {
            host: BIND_HOST.to_string(),
            port: BIND_PORT,
            threads: THREADS,
            config: Config::default(),
        }
    }

    fn app() -> App<'static, 'static> {
        let mut o = App::new("hashdrop");
        o = o.version(env!("CARGO_PKG_VERSION"));
        o = o.about("Content-addressed file drop server");
        o = o.arg(
            Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .help("Host or ip to bind server to")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("port")
                .long("port")
                .short("p")
                .value_name("PORT")
                .help("Port to bind server to")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("storedir")
                .long("storedir")
                .short("s")
                .value_name("DIR")
                .help("Directory to store uploaded files in")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("prefix")
                .long("prefix")
                .value_name("URL")
                .help("Prefix of URL to send to uploading client")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("hash")
                .long("hash")
                .value_name("ALGO")
                .help("Hash algorithm to use for URL generation (sha1, sha256, sha512)")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("min_alias")
                .long("min-alias")
                .value_name("LENGTH")
                .help("Minimum number of hex characters in a short URL")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("cost")
                .long("cost")
                .value_name("COST")
                .help("bcrypt work factor for new secrets")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("no_usercache")
                .long("no-usercache")
                .help("Do not keep verified secrets in memory")
                );
        o = o.arg(
            Arg::with_name("threads")
                .long("threads")
                .short("t")
                .value_name("COUNT")
                .help("Number of request worker threads")
                .takes_value(true)
                );
        o
    }

    fn apply_matches(&mut self, arg: &ArgMatches) -> Result<(), SettingsError> {
        if let Some(v) = arg.value_of("host") {
            self.host = v.to_string();
        }
        if let Some(v) = parse_value(arg, "port")? {
            self.port = v;
        }
        if let Some(v) = parse_value::<usize>(arg, "threads")? {
            if v == 0 {
                return Err(SettingsError::Invalid("threads", v.to_string()));
            }
            self.threads = v;
        }
        if let Some(v) = arg.value_of("storedir") {
            self.config.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = arg.value_of("prefix") {
            self.config.url_prefix = v.to_string();
        }
        if let Some(v) = parse_value::<HashAlgorithm>(arg, "hash")? {
            self.config.hash = v;
        }
        self.config.short_hash_min = parse_value(arg, "min_alias")?.unwrap_or(SHORT_HASH_MIN);
        self.config.cost = parse_value(arg, "cost")?.unwrap_or(DEFAULT_COST);
        self.config.user_cache = !arg.is_present("no_usercache");
        Ok(())
    }

    /// Parse settings from an argument list. The first item is the program name.
    pub fn from_iter<I, T>(args: I) -> Result<Settings, SettingsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let arg_matches = Settings::app().get_matches_from_safe(args)?;
        let mut settings = Settings::new();
        settings.apply_matches(&arg_matches)?;
        Ok(settings)
    }

    /// Parse settings from the environment override if set, or else from the command line.
    pub fn from_env() -> Result<Settings, SettingsError> {
        match env::var(OPTIONS_ENV) {
            Ok(v) if !v.trim().is_empty() => {
                let mut args = vec!("hashdrop".to_string());
                args.extend(v.split_whitespace().map(|s| s.to_string()));
                Settings::from_iter(args)
            },
            _ => Settings::from_iter(env::args_os()),
        }
    }
}
