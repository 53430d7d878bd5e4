use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Cortex LLM gateway
#[derive(Debug, Parser)]
#[command(name = "cortex", about = "OpenAI-compatible gateway with provider routing and circuit breaking")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cortex.toml", env = "CORTEX_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "CORTEX_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter directive, e.g. `info` or `cortex_llm=debug`
    #[arg(long, default_value = "info", env = "CORTEX_LOG")]
    pub log: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        temp_env::with_vars_unset(["CORTEX_CONFIG", "CORTEX_LISTEN", "CORTEX_LOG"], || {
            let args = Args::try_parse_from(["cortex"]).unwrap();

            assert_eq!(args.config, PathBuf::from("cortex.toml"));
            assert_eq!(args.listen, None);
            assert_eq!(args.log, "info");
        });
    }

    #[test]
    fn flags_override_environment() {
        temp_env::with_var("CORTEX_LISTEN", Some("127.0.0.1:9000"), || {
            let args = Args::try_parse_from(["cortex", "-c", "/etc/cortex.toml", "--listen", "0.0.0.0:80"]).unwrap();

            assert_eq!(args.config, PathBuf::from("/etc/cortex.toml"));
            assert_eq!(args.listen, Some("0.0.0.0:80".parse().unwrap()));
        });
    }
}
