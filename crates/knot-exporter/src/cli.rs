//! Command-line flags.
//!
//! Value flags are optional so an unset flag falls through to the config
//! file and then to the built-in default.

use std::path::PathBuf;

use clap::Parser;
use knot_collector::BuildInfo;

#[derive(Debug, Parser)]
#[command(
    name = "knot-exporter",
    about = "Prometheus exporter for Knot DNS",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print build information and exit.
    #[arg(short = 'V', long)]
    pub version: bool,

    /// Address to listen on [default: 127.0.0.1].
    #[arg(long)]
    pub web_listen_addr: Option<String>,

    /// Port to listen on [default: 9433].
    #[arg(long)]
    pub web_listen_port: Option<u16>,

    /// Knot control socket [default: /run/knot/knot.sock].
    #[arg(long)]
    pub knot_socket_path: Option<PathBuf>,

    /// Control socket timeout in milliseconds, 0 disables [default: 2000].
    #[arg(long)]
    pub knot_socket_timeout: Option<u64>,

    /// Disable memory usage collection.
    #[arg(long)]
    pub no_meminfo: bool,

    /// Disable global statistics collection.
    #[arg(long)]
    pub no_global_stats: bool,

    /// Disable zone statistics collection.
    #[arg(long)]
    pub no_zone_stats: bool,

    /// Disable zone status timers collection.
    #[arg(long)]
    pub no_zone_status: bool,

    /// Disable zone serial collection.
    #[arg(long)]
    pub no_zone_serial: bool,

    /// Enable SOA timer collection (one zone-read per scrape).
    #[arg(long)]
    pub zone_timers: bool,

    /// Debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Start without checking the socket and listen address.
    #[arg(long)]
    pub skip_validation: bool,

    /// TOML config file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Multi-line build report printed by `--version`.
pub fn version_text(build: &BuildInfo) -> String {
    format!(
        "Knot DNS Exporter\n  \
         Version:      {}\n  \
         Build time:   {}\n  \
         Git commit:   {}\n  \
         Control lib:  knot-ctl {}\n  \
         Platform:     {}\n",
        build.version, build.build_time, build.git_commit, build.ctl_version, build.platform
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_no_flags() {
        let cli = Cli::try_parse_from(["knot-exporter"]).unwrap();
        assert!(cli.web_listen_addr.is_none());
        assert!(cli.knot_socket_timeout.is_none());
        assert!(!cli.no_meminfo);
        assert!(!cli.zone_timers);
        assert!(cli.config.is_none());
        assert!(!cli.version);
    }

    #[test]
    fn version_flag_is_ours() {
        assert!(Cli::try_parse_from(["knot-exporter", "--version"]).unwrap().version);
        assert!(Cli::try_parse_from(["knot-exporter", "-V"]).unwrap().version);
    }

    #[test]
    fn version_text_lists_build_info() {
        let build = BuildInfo {
            version: "1.2.3".into(),
            build_time: "2024-01-01T00:00:00Z".into(),
            git_commit: "abc1234".into(),
            ctl_version: "0.1.0".into(),
            platform: "linux/x86_64".into(),
        };

        let text = version_text(&build);

        assert_eq!(
            text,
            "Knot DNS Exporter\n  \
             Version:      1.2.3\n  \
             Build time:   2024-01-01T00:00:00Z\n  \
             Git commit:   abc1234\n  \
             Control lib:  knot-ctl 0.1.0\n  \
             Platform:     linux/x86_64\n"
        );
    }

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "knot-exporter",
            "--web-listen-addr",
            "0.0.0.0",
            "--web-listen-port",
            "9999",
            "--knot-socket-path",
            "/tmp/knot.sock",
            "--knot-socket-timeout",
            "0",
            "--no-meminfo",
            "--no-global-stats",
            "--no-zone-stats",
            "--no-zone-status",
            "--no-zone-serial",
            "--zone-timers",
            "--debug",
            "--skip-validation",
            "--config",
            "/etc/knot-exporter.toml",
        ])
        .unwrap();

        assert_eq!(cli.web_listen_addr.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.web_listen_port, Some(9999));
        assert_eq!(cli.knot_socket_path, Some(PathBuf::from("/tmp/knot.sock")));
        assert_eq!(cli.knot_socket_timeout, Some(0));
        assert!(cli.no_meminfo && cli.no_global_stats && cli.no_zone_stats);
        assert!(cli.no_zone_status && cli.no_zone_serial);
        assert!(cli.zone_timers && cli.debug && cli.skip_validation);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/knot-exporter.toml")));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Cli::try_parse_from(["knot-exporter", "--web-listen-port", "70000"]).is_err());
    }
}
