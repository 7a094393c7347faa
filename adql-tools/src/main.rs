#![warn(clippy::panic)]
use adql_geography::Region;
use adql_mssql::ast::SpatialFunction;
use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(name = "adql-geo", version)]
struct AdqlGeo {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    logging: adql_logging::Options,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a hex encoded SQL Server geography value and print it as STC-S
    Decode {
        /// The serialized value, with or without a leading `0x`
        hex: String,

        /// Print the region as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Encode a JSON region into a SQL Server geography value, printed as hex
    Encode { region: String },
    /// Print the WKT SQL Server would be given for a JSON region
    Wkt { region: String },
    /// Translate a JSON geometry function into T-SQL
    Translate { function: String },
}

fn parse_region(json: &str) -> anyhow::Result<Region> {
    serde_json::from_str(json).context("Invalid region")
}

impl Command {
    fn run(&self) -> anyhow::Result<String> {
        match self {
            Command::Decode { hex, json } => {
                let digits = hex
                    .strip_prefix("0x")
                    .or_else(|| hex.strip_prefix("0X"))
                    .unwrap_or(hex);
                let bytes = hex::decode(digits).context("Invalid hex")?;
                debug!(len = bytes.len(), "Decoding geography value");
                match adql_geography::decode(&bytes)? {
                    None => Ok("no region".to_owned()),
                    Some(region) if *json => Ok(serde_json::to_string(&region)?),
                    Some(region) => Ok(region.to_string()),
                }
            }
            Command::Encode { region } => {
                let region = parse_region(region)?;
                Ok(hex::encode_upper(adql_geography::encode(&region)?))
            }
            Command::Wkt { region } => {
                let region = parse_region(region)?;
                adql_geography::region_to_wkt(&region)
                    .ok_or_else(|| anyhow!("A {} region has no WKT representation", region.kind()))
            }
            Command::Translate { function } => {
                let function: SpatialFunction =
                    serde_json::from_str(function).context("Invalid geometry function")?;
                Ok(adql_mssql::translate(&function)?)
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let options = AdqlGeo::parse();
    options.logging.init()?;
    println!("{}", options.command.run()?);
    Ok(())
}
