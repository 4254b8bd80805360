// Command-line surface. Parsing only; the command bodies live in `ui`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI Splunkbase client
#[derive(Parser, Debug)]
#[command(name = "sbclient", version, about)]
pub struct Cli {
    /// Splunkbase username
    #[arg(short = 'U', long, env = "SPLUNKBASE_USERNAME")]
    pub username: String,

    /// Splunkbase password (prompted for when omitted)
    #[arg(short = 'P', long, env = "SPLUNKBASE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare an installed app against the latest release on Splunkbase
    CheckAppForUpdate {
        /// Restrict to app versions compatible with a given Splunk version
        #[arg(long)]
        splunk_version: Option<String>,

        /// Directory of the installed app; its name is the app name
        app_dir: PathBuf,
    },

    /// Download an app release
    DownloadApp {
        /// Path and filename location to save the app ("-" for stdout)
        #[arg(long)]
        output_path: Option<String>,

        /// Version of app to download, default is latest
        #[arg(long)]
        version: Option<String>,

        /// Extract the downloaded package into the current directory
        #[arg(long)]
        extract: bool,

        app_name: String,
    },

    /// Show the latest release of an app
    GetLatestVersion {
        /// Restrict to app versions compatible with a given Splunk version
        #[arg(long)]
        splunk_version: Option<String>,

        app_name: String,
    },

    /// Print the raw metadata document of an app
    DumpMetadata {
        /// Treat APP as a numeric Splunkbase id instead of a name
        #[arg(long)]
        id: bool,

        app: String,
    },
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
    fn test_parse_download() {
        let cli = Cli::try_parse_from([
            "sbclient",
            "-U",
            "admin",
            "-P",
            "pw",
            "download-app",
            "--version",
            "1.0.0",
            "--output-path",
            "-",
            "my_app",
        ])
        .unwrap();
        assert_eq!(cli.username, "admin");
        match cli.command {
            Command::DownloadApp {
                output_path,
                version,
                extract,
                app_name,
            } => {
                assert_eq!(output_path.as_deref(), Some("-"));
                assert_eq!(version.as_deref(), Some("1.0.0"));
                assert!(!extract);
                assert_eq!(app_name, "my_app");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
