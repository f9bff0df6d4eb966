//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "apiary",
    about = "Addressed cell store with tiered caching and transactional publishing",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured data directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seed the configured volumes into the grid
    Seed(SeedArgs),
    /// Publish one cell, binding its addresses in a single transaction
    Publish(PublishArgs),
    /// Resolve an address to its grid coordinate
    Resolve(ResolveArgs),
    /// Show the cell recorded at a coordinate
    Show(ShowArgs),
    /// List the addresses bound to a coordinate
    Addresses(AddressesArgs),
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Seed into this grid instead of the configured one.
    #[arg(long)]
    pub grid: Option<String>,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Address to bind, repeatable, primary first.
    #[arg(short, long = "address", required = true)]
    pub addresses: Vec<String>,

    /// Column of the target coordinate.
    #[arg(long, allow_negative_numbers = true)]
    pub x: i64,

    /// Row of the target coordinate.
    #[arg(long, allow_negative_numbers = true)]
    pub y: i64,

    /// Read the source markup from this file.
    #[arg(long, conflicts_with = "source")]
    pub source_file: Option<PathBuf>,

    /// Inline source markup.
    #[arg(long)]
    pub source: Option<String>,

    /// Grid to publish into.
    #[arg(long)]
    pub grid: Option<String>,

    /// Durable replica acks to require, defaults to the configured quorum.
    #[arg(long)]
    pub quorum: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Address to look up.
    pub address: String,

    /// Grid to search.
    #[arg(long)]
    pub grid: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Column of the coordinate.
    #[arg(allow_negative_numbers = true)]
    pub x: i64,

    /// Row of the coordinate.
    #[arg(allow_negative_numbers = true)]
    pub y: i64,

    /// Grid to search.
    #[arg(long)]
    pub grid: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddressesArgs {
    /// Column of the coordinate.
    #[arg(allow_negative_numbers = true)]
    pub x: i64,

    /// Row of the coordinate.
    #[arg(allow_negative_numbers = true)]
    pub y: i64,

    /// Grid to search.
    #[arg(long)]
    pub grid: Option<String>,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seed() {
        let cli = Cli::try_parse_from(["apiary", "seed"]).unwrap();
        assert!(matches!(cli.command, Command::Seed(_)));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.verbose);
    }

    #[test]
    fn parses_seed_with_grid_override() {
        let cli = Cli::try_parse_from(["apiary", "seed", "--grid", "staging"]).unwrap();
        match cli.command {
            Command::Seed(args) => assert_eq!(args.grid.as_deref(), Some("staging")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_publish_with_repeated_addresses() {
        let cli = Cli::try_parse_from([
            "apiary", "publish", "-a", "Book/Page100", "-a", "Book", "--x", "0", "--y", "2",
            "--source", "<p>hi</p>", "--quorum", "2",
        ])
        .unwrap();
        match cli.command {
            Command::Publish(args) => {
                assert_eq!(args.addresses, vec!["Book/Page100", "Book"]);
                assert_eq!(args.x, 0);
                assert_eq!(args.y, 2);
                assert_eq!(args.source.as_deref(), Some("<p>hi</p>"));
                assert!(args.source_file.is_none());
                assert_eq!(args.quorum, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn publish_requires_an_address() {
        let result = Cli::try_parse_from(["apiary", "publish", "--x", "0", "--y", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn publish_rejects_inline_source_next_to_a_file() {
        let result = Cli::try_parse_from([
            "apiary",
            "publish",
            "-a",
            "Book",
            "--x",
            "0",
            "--y",
            "0",
            "--source",
            "<p></p>",
            "--source-file",
            "page.html",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_resolve_address() {
        let cli = Cli::try_parse_from(["apiary", "resolve", "Book/Chapter5"]).unwrap();
        match cli.command {
            Command::Resolve(args) => {
                assert_eq!(args.address, "Book/Chapter5");
                assert!(args.grid.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_show_coordinates() {
        let cli = Cli::try_parse_from(["apiary", "show", "3", "1"]).unwrap();
        match cli.command {
            Command::Show(args) => {
                assert_eq!((args.x, args.y), (3, 1));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_negative_coordinates() {
        let cli = Cli::try_parse_from(["apiary", "addresses", "-2", "-7"]).unwrap();
        match cli.command {
            Command::Addresses(args) => assert_eq!((args.x, args.y), (-2, -7)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "apiary",
            "resolve",
            "Book",
            "--format",
            "json",
            "--verbose",
            "--config",
            "apiary.toml",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("apiary.toml")));
    }
}
