// Command-line arguments for the operator shell.

use clap::{Parser, Subcommand};
use courtside_core::model::MatchId;

#[derive(Debug, Parser)]
#[command(name = "courtside", version)]
#[command(about = "Inspect, recompute and publish doubles match lineups")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the board, court outcomes and aggregate.
    Show { match_id: MatchId },
    /// Re-save the persisted state so the aggregate is derived again.
    Recompute { match_id: MatchId },
    /// Re-save and fire the publish notification.
    Publish { match_id: MatchId },
}

impl Command {
    pub fn match_id(&self) -> MatchId {
        match *self {
            Command::Show { match_id }
            | Command::Recompute { match_id }
            | Command::Publish { match_id } => match_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("courtside").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn parses_each_command() {
        assert_eq!(parse(&["show", "12"]).unwrap(), Command::Show { match_id: 12 });
        assert_eq!(
            parse(&["recompute", "3"]).unwrap(),
            Command::Recompute { match_id: 3 }
        );
        assert_eq!(parse(&["publish", "8"]).unwrap().match_id(), 8);
    }

    #[test]
    fn rejects_missing_or_extra_arguments() {
        assert!(parse(&[]).is_err());
        assert_eq!(
            parse(&["show"]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
        assert!(parse(&["show", "1", "2"]).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse(&["show", "abc"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["delete", "1"]).unwrap_err().kind(),
            ErrorKind::InvalidSubcommand
        );
    }

    #[test]
    fn help_and_version_are_available() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(
            parse(&["--version"]).unwrap_err().kind(),
            ErrorKind::DisplayVersion
        );
        let help = parse(&["publish", "--help"]).unwrap_err().to_string();
        assert!(help.contains("MATCH_ID"));
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
