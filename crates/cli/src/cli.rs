use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "webvnc")]
#[command(about = "Serve noVNC locally and bridge WebSocket traffic to a remote VNC server")]
#[command(version)]
pub struct Cli {
    /// Remote VNC server host or IP (e.g. 192.168.1.10)
    #[arg(long)]
    pub host: String,

    /// Remote VNC server port
    #[arg(long, default_value_t = 5900)]
    pub port: u16,

    /// VNC password forwarded to the client page (not validated here)
    #[arg(long)]
    pub password: Option<String>,

    /// Local port for the noVNC UI and WebSocket proxy (0 = pick automatically)
    #[arg(long, default_value_t = 0)]
    pub local_port: u16,

    /// Do not open the browser automatically
    #[arg(long)]
    pub no_open: bool,

    /// Show websockify output and enable debug logging
    #[arg(long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_required() {
        assert!(Cli::try_parse_from(["webvnc"]).is_err());
        assert!(Cli::try_parse_from(["webvnc", "--port", "5901"]).is_err());
    }

    #[test]
    fn defaults_match_the_documented_surface() {
        let cli = Cli::try_parse_from(["webvnc", "--host", "192.168.1.10"]).unwrap();
        assert_eq!(cli.host, "192.168.1.10");
        assert_eq!(cli.port, 5900);
        assert_eq!(cli.password, None);
        assert_eq!(cli.local_port, 0);
        assert!(!cli.no_open);
        assert!(!cli.verbose);
    }

    #[test]
    fn all_flags_parse() {
        let cli = Cli::try_parse_from([
            "webvnc",
            "--host",
            "vnc.internal",
            "--port",
            "5901",
            "--password",
            "secret",
            "--local-port",
            "6081",
            "--no-open",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.host, "vnc.internal");
        assert_eq!(cli.port, 5901);
        assert_eq!(cli.password.as_deref(), Some("secret"));
        assert_eq!(cli.local_port, 6081);
        assert!(cli.no_open);
        assert!(cli.verbose);
    }
}
