//! Implementation of the `nexmo-jwt` command.
use crate::claims::{ClaimError, ClaimValue};
use crate::file_reader::{FileReader, LocalFile};
use crate::generator::GeneratorError;
use crate::jwt::builder::{ConfigurationError, JwtBuilder};
use crate::logging::LoggingError;
use crate::scope::Scope;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, Level};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to initialize logs: {0}")]
    Logging(#[from] LoggingError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Build(#[from] ConfigurationError),

    #[error("{0}")]
    Generate(#[from] GeneratorError),
}

impl From<ClaimError> for CliError {
    fn from(err: ClaimError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<CliError> for ExitCode {
    /// Converts the error to an exit code following the [BSD guidelines].
    ///
    /// [BSD guidelines]: https://man.freebsd.org/cgi/man.cgi?query=sysexits&manpath=FreeBSD+4.3-RELEASE
    fn from(value: CliError) -> Self {
        match value {
            CliError::Config(_) | CliError::Build(_) => Self::from(78),
            CliError::Generate(_) => Self::from(65),
            CliError::Logging(_) => Self::from(70),
        }
    }
}

/// Generates a signed JWT for a Nexmo application and prints it.
#[derive(Debug, clap::Parser)]
#[command(name = "nexmo-jwt")]
pub struct Args {
    /// YAML file with the token configuration. Flags take precedence over its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Application the token is issued for.
    #[arg(long)]
    pub application_id: Option<String>,

    /// Path to the application's PKCS#8 private key.
    #[arg(long)]
    pub private_key_path: Option<PathBuf>,

    /// Subject (sub) claim.
    #[arg(long)]
    pub subject: Option<String>,

    /// Sets the expiration (exp) claim relative to now, e.g. `15m`.
    #[arg(long, value_parser = parse_duration_arg)]
    pub expires_in: Option<Duration>,

    /// Sets the not before (nbf) claim relative to now.
    #[arg(long, value_parser = parse_duration_arg)]
    pub not_before_in: Option<Duration>,

    /// Additional claim as `key=value`. Values are read as JSON when possible.
    #[arg(long = "claim", value_parser = parse_claim_arg)]
    pub claims: Vec<(String, ClaimValue)>,

    /// Scopes granted through the `acl` claim.
    #[arg(long = "scope", value_enum)]
    pub scopes: Vec<Scope>,

    /// Log level, logs are written to stderr.
    #[arg(long, default_value = "warn")]
    pub log_level: Level,
}

// helper needed because the arguments from the duration_str's parse function and the one expected by the clap
// `value_parser` argument have incompatible lifetimes.
fn parse_duration_arg(arg: &str) -> Result<Duration, String> {
    duration_str::parse(arg)
}

fn parse_claim_arg(arg: &str) -> Result<(String, ClaimValue), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("invalid claim `{arg}`, expected `key=value`"))?;
    if key.is_empty() {
        return Err(format!("invalid claim `{arg}`, the key is empty"));
    }
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(json) => ClaimValue::try_from(json).map_err(|err| err.to_string())?,
        Err(_) => ClaimValue::from(value),
    };
    Ok((key.to_string(), value))
}

/// Token configuration as read from the `--config` file.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "duration_str::deserialize_option_duration")]
    pub expires_in: Option<Duration>,
    #[serde(default, deserialize_with = "duration_str::deserialize_option_duration")]
    pub not_before_in: Option<Duration>,
    #[serde(default)]
    pub claims: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

impl TokenConfig {
    pub fn load<R: FileReader>(reader: &R, path: &Path) -> Result<Self, CliError> {
        let content = reader
            .read(path)
            .map_err(|err| CliError::Config(format!("reading {}: {err}", path.display())))?;
        serde_yaml::from_str(&content)
            .map_err(|err| CliError::Config(format!("parsing {}: {err}", path.display())))
    }

    /// Applies the values given as flags on top of the file ones.
    pub fn with_args(mut self, args: Args) -> Result<Self, CliError> {
        if args.application_id.is_some() {
            self.application_id = args.application_id;
        }
        if args.private_key_path.is_some() {
            self.private_key_path = args.private_key_path;
        }
        if args.subject.is_some() {
            self.subject = args.subject;
        }
        if args.expires_in.is_some() {
            self.expires_in = args.expires_in;
        }
        if args.not_before_in.is_some() {
            self.not_before_in = args.not_before_in;
        }
        for (key, value) in args.claims {
            let value = serde_json::to_value(&value)
                .map_err(|err| CliError::Config(format!("claim `{key}`: {err}")))?;
            self.claims.insert(key, value);
        }
        if !args.scopes.is_empty() {
            self.scopes = args.scopes;
        }
        Ok(self)
    }

    /// Fills a builder with this configuration, relative times are computed from `now`.
    pub fn builder<R: FileReader>(
        &self,
        reader: &R,
        now: DateTime<Utc>,
    ) -> Result<JwtBuilder, CliError> {
        let mut builder = JwtBuilder::new();
        if let Some(application_id) = &self.application_id {
            builder.application_id(application_id);
        }
        if let Some(path) = &self.private_key_path {
            builder.private_key_path_with(reader, path)?;
        }
        if !self.scopes.is_empty() {
            builder.scopes(&self.scopes);
        }
        for (key, value) in &self.claims {
            let value = ClaimValue::try_from(value.clone())?;
            builder.add_claim(key, value);
        }
        if let Some(subject) = &self.subject {
            builder.subject(subject);
        }
        if let Some(expires_in) = self.expires_in {
            builder.expires_at(offset_from(now, expires_in)?);
        }
        if let Some(not_before_in) = self.not_before_in {
            builder.not_before(offset_from(now, not_before_in)?);
        }
        Ok(builder)
    }
}

fn offset_from(now: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, CliError> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| CliError::Config(format!("duration {duration:?} is out of range")))
}

/// Builds and signs the token described by the arguments.
pub fn run(args: Args) -> Result<String, CliError> {
    let config = match &args.config {
        Some(path) => TokenConfig::load(&LocalFile, path)?,
        None => TokenConfig::default(),
    };
    let config = config.with_args(args)?;
    debug!(?config, "token configuration");

    let jwt = config.builder(&LocalFile, Utc::now())?.build()?;
    Ok(jwt.generate()?)
}
