use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "mkdown",
    version,
    about = "Plain text and markdown notes kept in a single notes directory"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the notes directory
    #[clap(long, value_parser)]
    pub notes_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the mkdown application
    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_markdown_note() {
        let cli = Cli::parse_from(["mkdown", "--notes-dir", "/tmp/x", "new", "My Note", "-k", "markdown"]);
        assert_eq!(cli.notes_dir, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::New { title, kind, .. } => {
                assert_eq!(title, "My Note");
                assert_eq!(kind, crate::NoteKind::Markdown);
            }
            _ => panic!("expected new"),
        }
    }

    #[test]
    fn write_rejects_content_and_file_together() {
        let result = Cli::try_parse_from(["mkdown", "write", "abc", "-c", "text", "-f", "x.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn settings_accepts_repeated_set() {
        let cli = Cli::parse_from(["mkdown", "settings", "-s", "font_size=14", "-s", "save_on_file_exit=false"]);
        match cli.command {
            Commands::Settings { set } => assert_eq!(set.len(), 2),
            _ => panic!("expected settings"),
        }
    }
}
