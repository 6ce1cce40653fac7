//! Root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Tagged HTTP requests and resumable downloads from the terminal.
#[derive(Parser, Debug)]
#[command(name = "fetchline")]
#[command(about = "Tagged HTTP requests and resumable downloads")]
#[command(version)]
pub struct Cli {
    /// Directory holding the session database
    #[arg(long = "data-dir", global = true, env = "FETCHLINE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL prepended to relative request paths
    #[arg(long = "base-url", global = true, env = "FETCHLINE_BASE_URL")]
    pub base_url: Option<String>,

    /// Whole-request timeout in seconds (downloads are never timed out)
    #[arg(long, global = true, env = "FETCHLINE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::DownloadCommand;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "fetchline",
            "--verbose",
            "--data-dir",
            "/tmp/fl",
            "download",
            "count",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/fl")));
        assert!(matches!(
            cli.command,
            Some(Commands::Download {
                command: DownloadCommand::Count
            })
        ));
    }

    #[test]
    fn test_get_collects_repeated_pairs() {
        let cli = Cli::parse_from([
            "fetchline",
            "get",
            "/users",
            "-H",
            "Accept: application/json",
            "-q",
            "page=2",
            "-q",
            "limit=10",
            "--tag",
            "users",
        ]);
        let Some(Commands::Get(args)) = cli.command else {
            panic!("expected get");
        };
        assert_eq!(args.url, "/users");
        assert_eq!(args.tag, "users");
        assert_eq!(args.headers.len(), 1);
        assert_eq!(args.query, vec!["page=2".to_string(), "limit=10".to_string()]);
    }
}
