use anyhow::Result;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, clap::Args)]
pub struct LogArgs {
    #[clap(
        long,
        default_value = "front_door=info,warn",
        env = "FRONT_DOOR_LOG"
    )]
    pub log_level: LogFilter,

    #[clap(long, default_value = "plain")]
    pub log_format: LogFormat,
}

/// A validated `tracing-subscriber` filter directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter(String);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid log format '{0}'; expected 'plain' or 'json'")]
pub struct InvalidLogFormat(String);

// === impl LogArgs ===

impl LogArgs {
    /// Installs the global subscriber.
    pub fn try_init(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.log_level.0)?;
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        match self.log_format {
            LogFormat::Plain => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        }
        .map_err(|error| anyhow::anyhow!(error))
    }
}

// === impl LogFilter ===

impl FromStr for LogFilter {
    type Err = tracing_subscriber::filter::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvFilter::try_new(s)?;
        Ok(Self(s.to_string()))
    }
}

impl std::fmt::Display for LogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// === impl LogFormat ===

impl FromStr for LogFormat {
    type Err = InvalidLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("plain") {
            return Ok(Self::Plain);
        }
        if s.eq_ignore_ascii_case("json") {
            return Ok(Self::Json);
        }
        Err(InvalidLogFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cmd {
        #[clap(flatten)]
        log: LogArgs,
    }

    #[test]
    fn formats() {
        assert_eq!("plain".parse::<LogFormat>().unwrap(), LogFormat::Plain);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn filters() {
        assert!("front_door=debug,warn".parse::<LogFilter>().is_ok());
        assert!("front_door=loud".parse::<LogFilter>().is_err());
    }

    #[test]
    fn parses_flags() {
        let cmd = Cmd::try_parse_from([
            "front-door",
            "--log-level=front_door_routing=trace",
            "--log-format=json",
        ])
        .unwrap();
        assert_eq!(cmd.log.log_level.to_string(), "front_door_routing=trace");
        assert_eq!(cmd.log.log_format, LogFormat::Json);

        assert!(Cmd::try_parse_from(["front-door", "--log-format=xml"]).is_err());
    }
}
