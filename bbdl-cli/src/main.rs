//! bbdl CLI: offline tooling around the request/response file formats.
//!
//! Commands:
//! - `build`: write a request file from a TOML options file
//! - `parse`: decode a response file to JSON on stdout
//! - `fields`: list catalog fields in (or outside) license categories
//! - `categories`: group fields by license category
//! - `import-catalog`: reduce the vendor `fields.csv` to the catalog format

use anyhow::{bail, Context, Result};
use bbdl_core::catalog::{from_categories, import_vendor_csv, to_categories};
use bbdl_core::codec::scalar::parse_date;
use bbdl_core::request;
use bbdl_core::response::decode_file;
use bbdl_core::{Codec, CsvFieldCatalog, Identifier, Options, RequestSpec};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bbdl", about = "bbdl: Bloomberg Data License request/response tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a request file.
    Build {
        /// TOML options file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Dotted path of the options table inside the config, e.g. bbg.data.ftp.
        #[arg(long)]
        site: Option<String>,

        /// Field mnemonics, in request order.
        #[arg(long = "field", required = true)]
        fields: Vec<String>,

        /// Identifiers: `IBM US Equity`, `459200101|CUSIP`, `459200101|CUSIP|FIELD|VALUE`.
        #[arg(long = "identifier", required = true)]
        identifiers: Vec<String>,

        /// Destination of the request file.
        #[arg(long)]
        output: PathBuf,

        /// Start of a historical date range.
        #[arg(long)]
        begdate: Option<String>,

        /// End of a historical date range. Defaults to begdate.
        #[arg(long)]
        enddate: Option<String>,

        /// Use the BVAL pricing header.
        #[arg(long, default_value_t = false)]
        bval: bool,

        /// Extra header lines (KEY=VALUE).
        #[arg(long = "header")]
        headers: Vec<String>,
    },
    /// Decode a response file and print JSON.
    Parse {
        /// Field catalog CSV.
        #[arg(long)]
        catalog: PathBuf,

        /// Response file (already decompressed).
        response: PathBuf,

        /// Decode registered bulk fields into named records.
        #[arg(long, default_value_t = false)]
        custom_mappings: bool,

        /// Collapse sequence values to scalars.
        #[arg(long, default_value_t = false)]
        unwrap: bool,

        #[arg(long, default_value_t = '|')]
        delimiter: char,
    },
    /// List catalog fields by license category.
    Fields {
        #[arg(long)]
        catalog: PathBuf,

        #[arg(long = "category", required = true)]
        categories: Vec<String>,

        /// Fields NOT in the given categories.
        #[arg(long, default_value_t = false)]
        invert: bool,
    },
    /// Group fields by license category.
    Categories {
        #[arg(long)]
        catalog: PathBuf,

        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Reduce the vendor fields.csv to the catalog format.
    ImportCatalog { input: PathBuf, output: PathBuf },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            site,
            fields,
            identifiers,
            output,
            begdate,
            enddate,
            bval,
            headers,
        } => {
            let spec = RequestSpec {
                bval,
                headers,
                begdate: parse_opt_date(begdate.as_deref())?,
                enddate: parse_opt_date(enddate.as_deref())?,
            };
            run_build(config.as_deref(), site.as_deref(), &fields, &identifiers, &output, spec)
        }
        Commands::Parse {
            catalog,
            response,
            custom_mappings,
            unwrap,
            delimiter,
        } => run_parse(&catalog, &response, custom_mappings, unwrap, delimiter),
        Commands::Fields {
            catalog,
            categories,
            invert,
        } => {
            let catalog = load_catalog(&catalog)?;
            let categories: Vec<&str> = categories.iter().map(|s| s.as_str()).collect();
            print_json(&from_categories(&catalog, &categories, invert))
        }
        Commands::Categories { catalog, fields } => {
            let catalog = load_catalog(&catalog)?;
            print_json(&to_categories(&catalog, &fields))
        }
        Commands::ImportCatalog { input, output } => {
            let count = import_vendor_csv(&input, &output)?;
            info!(fields = count, "wrote {}", output.display());
            Ok(())
        }
    }
}

fn parse_opt_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| parse_date(s).with_context(|| format!("invalid date '{s}'")))
        .transpose()
}

fn load_catalog(path: &Path) -> Result<CsvFieldCatalog> {
    let catalog = CsvFieldCatalog::from_file(path)?;
    if catalog.is_empty() {
        bail!("catalog {} has no fields", path.display());
    }
    Ok(catalog)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn run_build(
    config: Option<&Path>,
    site: Option<&str>,
    fields: &[String],
    identifiers: &[String],
    output: &Path,
    spec: RequestSpec,
) -> Result<()> {
    let options = match config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            match site {
                Some(site) => Options::from_toml_site(&content, site)?,
                None => Options::from_toml(&content)?,
            }
        }
        None if site.is_some() => bail!("--site requires --config"),
        None => Options::default().validated()?,
    };
    let options = options.specialize(spec)?;

    let identifiers = identifiers
        .iter()
        .map(|s| Identifier::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    let path = request::build(&identifiers, fields, output, &options)?;
    info!(
        fields = fields.len(),
        identifiers = identifiers.len(),
        history = options.is_history(),
        "request written"
    );
    println!("{}", path.display());
    Ok(())
}

fn run_parse(
    catalog: &Path,
    response: &Path,
    custom_mappings: bool,
    unwrap: bool,
    delimiter: char,
) -> Result<()> {
    let catalog = load_catalog(catalog)?;
    let codec = Codec::new(&catalog).with_custom_mappings(custom_mappings);
    let mut result = decode_file(response, &codec, delimiter)
        .with_context(|| format!("decode {}", response.display()))?;
    if unwrap {
        result.unwrap_single_element_lists();
    }
    info!(
        rows = result.data.len(),
        errors = result.errors.len(),
        columns = result.columns().len(),
        "decoded"
    );
    print_json(&result)
}
