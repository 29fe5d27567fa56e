//! CLI argument parsing

use clap::Parser;
use sqlpacket_core::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sqlpacket")]
#[command(
    version,
    about = "Capture database traffic on local interfaces and forward it to an analysis server",
    long_about = None
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// List capture devices and exit
    #[arg(long)]
    pub list_interfaces: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sqlpacket"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("etc/config.yaml"));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.list_interfaces);
        assert_eq!(cli.log_directive(), "info");
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::try_parse_from(["sqlpacket", "-c", "/etc/sqlpacket.yaml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/sqlpacket.yaml"));

        let cli = Cli::try_parse_from(["sqlpacket", "--config", "agent.yaml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("agent.yaml"));
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["sqlpacket", "-v"]).unwrap();
        assert_eq!(cli.log_directive(), "debug");

        let cli = Cli::try_parse_from(["sqlpacket", "-vvv"]).unwrap();
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.log_directive(), "trace");
    }

    #[test]
    fn test_list_interfaces() {
        let cli = Cli::try_parse_from(["sqlpacket", "--list-interfaces"]).unwrap();
        assert!(cli.list_interfaces);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["sqlpacket", "--interface", "eth0"]).is_err());
    }
}
