use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::num::NonZeroUsize;
use core::time::Duration;
use primestream::MIN_COUNT;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Runtime configuration for the `primestream-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "primestream-server",
    version,
    about = "An HTTP service for prime factorization and streaming the first N primes"
)]
pub struct CliArgs {
    /// Port to listen on.
    ///
    /// Environment variable: `VCAP_APP_PORT`
    #[arg(long, env = "VCAP_APP_PORT", default_value_t = 4001)]
    pub port: u16,

    /// Address to bind.
    ///
    /// Environment variable: `LISTEN_HOST`
    #[arg(long, env = "LISTEN_HOST", default_value_t = String::from("0.0.0.0"))]
    pub host: String,

    /// Directory holding `index.html` and the stylesheets.
    ///
    /// Environment variable: `PUBLIC_DIR`
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// Largest number of primes a single request may stream.
    ///
    /// Environment variable: `MAX_COUNT`
    #[arg(long, env = "MAX_COUNT", default_value_t = 1_000_000)]
    pub max_count: usize,

    /// Number of primes rendered per line of the streamed page.
    ///
    /// Environment variable: `LINE_WIDTH`
    #[arg(long, env = "LINE_WIDTH", default_value_t = 15)]
    pub line_width: usize,

    /// Rendered segments buffered between the stream consumer and the HTTP
    /// body.
    ///
    /// Lower values make the consumer (and through it the producer) react to
    /// a slow client sooner.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for in-flight streams during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Log output format.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human readable output.
    Pretty,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub public_dir: PathBuf,
    pub max_count: usize,
    pub line_width: NonZeroUsize,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: Duration,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let host: IpAddr = args
            .host
            .parse()
            .with_context(|| format!("invalid LISTEN_HOST: {}", args.host))?;

        let Some(line_width) = NonZeroUsize::new(args.line_width) else {
            bail!("LINE_WIDTH must be greater than 0");
        };

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.max_count < MIN_COUNT {
            bail!(
                "MAX_COUNT ({}) must be at least {}",
                args.max_count,
                MIN_COUNT
            );
        }

        Ok(Self {
            listen_addr: SocketAddr::new(host, args.port),
            public_dir: args.public_dir,
            max_count: args.max_count,
            line_width,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            log_format: args.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = core::iter::once("primestream-server").chain(args.iter().copied());
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]).unwrap();

        assert_eq!(config.listen_addr.port(), 4001);
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert_eq!(config.max_count, 1_000_000);
        assert_eq!(config.line_width.get(), 15);
        assert_eq!(config.stream_buffer_size, 8);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = parse(&[
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--line-width",
            "10",
            "--max-count",
            "500",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.line_width.get(), 10);
        assert_eq!(config.max_count, 500);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_zero_line_width() {
        let err = parse(&["--line-width", "0"]).unwrap_err();
        assert!(err.to_string().contains("LINE_WIDTH"));
    }

    #[test]
    fn rejects_zero_stream_buffer() {
        assert!(parse(&["--stream-buffer-size", "0"]).is_err());
    }

    #[test]
    fn rejects_max_count_below_minimum() {
        assert!(parse(&["--max-count", "2"]).is_err());
    }

    #[test]
    fn rejects_invalid_host() {
        assert!(parse(&["--host", "not-an-ip"]).is_err());
    }
}
