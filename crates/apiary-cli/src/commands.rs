//! Command implementations. Each command opens a [`PlatformContext`] from
//! the global flags and drives the lifecycle, seeder, or directory.

use anyhow::{bail, Context as _};
use colored::Colorize;

use apiary_cells::{AddressDirectory, PlatformConfig, PlatformContext, PublishRequest};
use apiary_txn::Quorum;
use apiary_types::{CancelToken, CellAddress, CellAddressMapping, GridCoordinate, GridKind};

use crate::cli::{
    AddressesArgs, Cli, Command, OutputFormat, PublishArgs, ResolveArgs, SeedArgs, ShowArgs,
};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let context = open_context(&cli)?;
    match &cli.command {
        Command::Seed(args) => cmd_seed(&context, args, cli.format),
        Command::Publish(args) => cmd_publish(&context, args, cli.format),
        Command::Resolve(args) => cmd_resolve(&context, args, cli.format),
        Command::Show(args) => cmd_show(&context, args, cli.format),
        Command::Addresses(args) => cmd_addresses(&context, args, cli.format),
    }
}

fn open_context(cli: &Cli) -> anyhow::Result<PlatformContext> {
    let mut config = match &cli.config {
        Some(path) => PlatformConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PlatformConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(PlatformContext::open(&config)?)
}

fn grid_or_configured(
    context: &PlatformContext,
    flag: Option<&String>,
) -> anyhow::Result<GridKind> {
    match flag {
        Some(name) => Ok(name.parse()?),
        None => Ok(context.config().grid),
    }
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

fn cmd_seed(
    context: &PlatformContext,
    args: &SeedArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let lifecycle = context.lifecycle();
    let mut seeder = context.seeder(&lifecycle);
    if let Some(grid) = &args.grid {
        seeder = seeder.with_grid(grid.parse()?);
    }

    let report = seeder.run(&context.config().volumes, &CancelToken::new());

    match format {
        OutputFormat::Json => {
            let failures: Vec<_> = report
                .failures
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "volume": f.volume,
                        "page": f.page,
                        "error": f.error.to_string(),
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "attempted": report.attempted,
                    "succeeded": report.succeeded,
                    "failures": failures,
                })
            );
        }
        OutputFormat::Text => {
            for failure in &report.failures {
                println!(
                    "{} {}/Page{}: {}",
                    "✗".red().bold(),
                    failure.volume,
                    failure.page,
                    failure.error,
                );
            }
            let mark = if report.is_clean() {
                "✓".green().bold()
            } else {
                "✗".red().bold()
            };
            println!(
                "{} seeded {} of {} cells",
                mark, report.succeeded, report.attempted,
            );
        }
    }

    if !report.is_clean() {
        bail!(
            "{} of {} cells failed to seed",
            report.failures.len(),
            report.attempted
        );
    }
    Ok(())
}

fn cmd_publish(
    context: &PlatformContext,
    args: &PublishArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let grid = grid_or_configured(context, args.grid.as_ref())?;
    let mut addresses = Vec::with_capacity(args.addresses.len());
    for raw in &args.addresses {
        addresses.push(CellAddress::parse(raw)?);
    }
    let source = match (&args.source, &args.source_file) {
        (Some(inline), None) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading source from {}", path.display()))?,
        _ => bail!("pass exactly one of --source and --source-file"),
    };
    let quorum = match args.quorum {
        Some(n) => Quorum::new(n).context("quorum must be at least 1")?,
        None => context.quorum(),
    };

    let request = PublishRequest {
        grid,
        coordinate: GridCoordinate::new(args.x, args.y),
        addresses,
        privileges: context.config().privileges,
        source,
        quorum,
    };
    let receipt = context.lifecycle().publish(&request, &CancelToken::new())?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "mapping": receipt.mapping.to_string(),
                "created": receipt.created,
                "rebound": receipt.rebound,
                "version": receipt.cell_version,
            })
        ),
        OutputFormat::Text => {
            let action = if receipt.created {
                "created"
            } else if receipt.rebound {
                "rebound"
            } else {
                "republished"
            };
            println!(
                "{} {} ({}, version {})",
                "✓".green().bold(),
                receipt.mapping.to_string().cyan(),
                action,
                receipt.cell_version,
            );
        }
    }
    Ok(())
}

fn cmd_resolve(
    context: &PlatformContext,
    args: &ResolveArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let grid = grid_or_configured(context, args.grid.as_ref())?;
    let address = CellAddress::parse(&args.address)?;
    let directory = AddressDirectory::new(context.store().as_ref());
    let found = directory.resolve(grid, &address)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "grid": grid.to_string(),
                "address": address.to_string(),
                "coordinate": found.map(|c| [c.x, c.y]),
            })
        ),
        OutputFormat::Text => match found {
            Some(coordinate) => println!(
                "{} {} maps to {}",
                "✓".green().bold(),
                address.to_string().cyan(),
                coordinate.to_string().yellow(),
            ),
            None => println!(
                "{} {} is unbound on the {} grid",
                "·".dimmed(),
                address.to_string().cyan(),
                grid,
            ),
        },
    }
    Ok(())
}

fn cmd_show(
    context: &PlatformContext,
    args: &ShowArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let grid = grid_or_configured(context, args.grid.as_ref())?;
    let mapping = CellAddressMapping::at(grid, args.x, args.y);
    let directory = AddressDirectory::new(context.store().as_ref());
    let Some(cell) = directory.cell_at(mapping)? else {
        match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({ "mapping": mapping.to_string(), "exists": false })
            ),
            OutputFormat::Text => {
                println!("{} no cell at {}", "·".dimmed(), mapping.to_string().cyan())
            }
        }
        return Ok(());
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "mapping": cell.mapping.to_string(),
                "exists": true,
                "version": cell.version,
                "status": cell.status,
                "privileges": cell.privileges.to_string(),
                "source_chars": cell.source.as_ref().map(|c| c.char_count()),
                "compiled_chars": cell.compiled.as_ref().map(|c| c.char_count()),
                "addresses": cell
                    .addresses
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            })
        ),
        OutputFormat::Text => {
            println!(
                "{} {} version {}",
                "✓".green().bold(),
                cell.mapping.to_string().cyan(),
                cell.version,
            );
            println!("  status      {}", cell.status);
            println!("  privileges  {}", cell.privileges);
            match (&cell.source, &cell.compiled) {
                (Some(source), Some(compiled)) => {
                    println!("  source      {} chars", source.char_count());
                    println!("  compiled    {} chars", compiled.char_count());
                }
                _ => println!("  {}", "never compiled".dimmed()),
            }
            println!("  addresses");
            for address in &cell.addresses {
                println!("    {address}");
            }
        }
    }
    Ok(())
}

fn cmd_addresses(
    context: &PlatformContext,
    args: &AddressesArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let grid = grid_or_configured(context, args.grid.as_ref())?;
    let coordinate = GridCoordinate::new(args.x, args.y);
    let directory = AddressDirectory::new(context.store().as_ref());
    let addresses = directory.addresses_of(grid, coordinate)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "mapping": CellAddressMapping::new(grid, coordinate).to_string(),
                "addresses": addresses.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        ),
        OutputFormat::Text => {
            if addresses.is_empty() {
                println!(
                    "{} no cell at {}",
                    "·".dimmed(),
                    CellAddressMapping::new(grid, coordinate).to_string().cyan(),
                );
            } else {
                for address in &addresses {
                    println!("{address}");
                }
            }
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
        let config_path = dir.join("apiary.toml");
        let data_dir = dir.join("data");
        let text = format!(
            r#"
data_dir = {data_dir:?}

[[volume]]
title = "Pocket"
chapter = 1
page_count = 2
start_image_index = 40
"#
        );
        std::fs::write(&config_path, text).unwrap();
        config_path
    }

    fn run(config: &std::path::Path, tail: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["apiary", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(tail);
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn seed_then_inspect_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());

        run(&config, &["seed"]).unwrap();
        run(&config, &["resolve", "Pocket/Page101"]).unwrap();
        run(&config, &["show", "1", "0", "--format", "json"]).unwrap();
        run(&config, &["addresses", "0", "0"]).unwrap();
    }

    #[test]
    fn resolving_an_unbound_address_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());

        run(&config, &["resolve", "Nowhere"]).unwrap();
    }

    #[test]
    fn publish_places_a_cell_where_the_flags_say() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());

        run(
            &config,
            &[
                "publish",
                "-a",
                "Garden",
                "-a",
                "Garden/Gate",
                "--x",
                "4",
                "--y",
                "9",
                "--source",
                "<p>welcome</p>",
            ],
        )
        .unwrap();
        run(&config, &["resolve", "Garden/Gate"]).unwrap();
        run(&config, &["show", "4", "9"]).unwrap();
    }

    #[test]
    fn publish_without_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());

        let result = run(&config, &["publish", "-a", "Garden", "--x", "0", "--y", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_grid_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());

        let result = run(&config, &["resolve", "Pocket", "--grid", "sideways"]);
        assert!(result.is_err());
    }
}
