use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tidyshelf_config::{BackendKind, Overrides};
use tidyshelf_reconcile::Options;

/// Keep Calibre read-order tags and audiobook titles in line with their
/// metadata.
///
/// Without `--audiobook` or `--readorder`, both are processed.
#[derive(Debug, Parser)]
#[command(name = "tidyshelf", version)]
pub struct Cli {
    /// Add or remove the "(audiobook)" title marker to match the
    /// `format:audiobook` tag
    #[arg(short, long)]
    pub audiobook: bool,
    /// Make `readorder:<value>` tags match the read-order custom column
    #[arg(short, long, aliases = ["readOrder", "read-order"])]
    pub readorder: bool,
    /// Report changes without writing them
    #[arg(short, long)]
    pub dry_run: bool,
    /// Calibre library directory
    #[arg(short, long, value_name = "PATH")]
    pub library: Option<PathBuf>,
    /// Catalog backend: calibredb or sqlite
    #[arg(short, long, value_name = "BACKEND")]
    pub backend: Option<BackendKind>,
    /// Configuration file (toml, yaml or json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// More log output; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn options(&self) -> Options {
        Options::from_flags(self.readorder, self.audiobook, self.dry_run)
    }

    pub fn overrides(&self) -> Overrides {
        Overrides { library: self.library.clone(), backend: self.backend }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tidyshelf").chain(args.iter().copied())).unwrap()
    }

    #[rstest]
    #[case(&[], true, true)]
    #[case(&["-a"], false, true)]
    #[case(&["--audiobook"], false, true)]
    #[case(&["-r"], true, false)]
    #[case(&["--readorder"], true, false)]
    #[case(&["--readOrder"], true, false)]
    #[case(&["--read-order"], true, false)]
    #[case(&["-a", "-r"], true, true)]
    fn test_selection(#[case] args: &[&str], #[case] read_order: bool, #[case] audiobooks: bool) {
        let options = parse(args).options();
        assert_eq!((options.read_order, options.audiobooks), (read_order, audiobooks));
        assert!(!options.dry_run);
    }

    #[test]
    fn test_dry_run() {
        assert!(parse(&["-d"]).options().dry_run);
        assert!(parse(&["--dry-run", "-a"]).options().dry_run);
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&["-l", "/books", "--backend", "sqlite", "-c", "tidyshelf.toml"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.library, Some(PathBuf::from("/books")));
        assert_eq!(overrides.backend, Some(BackendKind::Sqlite));
        assert_eq!(cli.config, Some(PathBuf::from("tidyshelf.toml")));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["tidyshelf", "--backend", "jdbc"]).is_err());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["tidyshelf", "--everything"]).is_err());
    }

    #[rstest]
    #[case(&[], "warn")]
    #[case(&["-v"], "info")]
    #[case(&["-vv"], "debug")]
    #[case(&["-vvvv"], "trace")]
    fn test_log_level(#[case] args: &[&str], #[case] expected: &str) {
        assert_eq!(parse(args).log_level(), expected);
    }
}
