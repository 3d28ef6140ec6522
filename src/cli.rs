// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::io;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{crate_authors, crate_description, crate_version};
use clap::{Arg, ArgMatches, Command};
use strum::VariantNames;

use crate::app_config::{CompleteAppConfig, OutputFormat};
use crate::core::api::cloudant::Cloudant;
use crate::core::commands;

/// Rows per request for streamed subcommands.
const DEFAULT_PAGE_SIZE: &str = "100";

/// Value of a required argument.
fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("Missing required argument {}", name))
}

fn page_size(matches: &ArgMatches) -> Result<usize> {
    let raw = required(matches, "page-size")?;
    raw.parse()
        .with_context(|| format!("Page size must be a positive number, got {}", raw))
}

/// Match commands
pub async fn cli_match(config: config::Config, cli_matches: ArgMatches) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Handle config subcommand first, because it doesn't need any valid configuration, and is helpful for debugging bad config!
    if let Some(("config", _config_matches)) = cli_matches.subcommand() {
        return commands::print_config(&mut out, config);
    }

    let format = cli_matches
        .value_of("format")
        .map(OutputFormat::from_str)
        .transpose()?
        .unwrap_or_default();

    // Every other command talks to Cloudant
    let app_config: CompleteAppConfig = config.try_into()?;
    let cdt = Cloudant::from_config(&app_config.cloudant)?;

    match cli_matches.subcommand() {
        Some(("create-db", matches)) => {
            let database = required(matches, "database")?;
            commands::create_database(&cdt, &mut out, format, database).await
        }
        Some(("delete-db", matches)) => {
            let database = required(matches, "database")?;
            commands::delete_database(&cdt, &mut out, format, database).await
        }
        Some(("db-info", matches)) => {
            let database = required(matches, "database")?;
            commands::database_info(&cdt, &mut out, format, database).await
        }
        Some(("ls-dbs", _matches)) => commands::list_databases(&cdt, &mut out, format).await,
        Some(("read", matches)) => {
            let database = required(matches, "database")?;
            let docid = required(matches, "docid")?;
            commands::read_doc(&cdt, &mut out, format, database, docid).await
        }
        Some(("insert", matches)) => {
            let database = required(matches, "database")?;
            let data = required(matches, "json")?;
            commands::insert(&cdt, &mut out, format, database, data).await
        }
        Some(("update", matches)) => {
            let database = required(matches, "database")?;
            let docid = required(matches, "docid")?;
            let revid = required(matches, "rev")?;
            let body = required(matches, "json")?;
            commands::update_doc(&cdt, &mut out, format, database, docid, revid, body).await
        }
        Some(("delete", matches)) => {
            let database = required(matches, "database")?;
            let docid = required(matches, "docid")?;
            let revid = required(matches, "rev")?;
            commands::delete_doc(&cdt, &mut out, format, database, docid, revid).await
        }
        Some(("all-docs", matches)) => {
            let database = required(matches, "database")?;
            let options = commands::AllDocsOptions {
                keys: matches
                    .values_of("key")
                    .map(|keys| keys.map(String::from).collect())
                    .unwrap_or_default(),
                include_docs: matches.is_present("include-docs"),
                stream: matches.is_present("stream"),
                page_size: page_size(matches)?,
            };
            commands::all_docs(&cdt, &mut out, format, database, &options).await
        }
        Some(("view", matches)) => {
            let database = required(matches, "database")?;
            let ddoc = required(matches, "ddoc")?;
            let viewname = required(matches, "view")?;
            let keys: Vec<String> = matches
                .values_of("key")
                .map(|keys| keys.map(String::from).collect())
                .unwrap_or_default();
            commands::view_query(&cdt, &mut out, format, database, ddoc, viewname, &keys).await
        }
        Some(("changes", matches)) => {
            let database = required(matches, "database")?;
            commands::changes(&cdt, &mut out, database, page_size(matches)?).await
        }
        _ => {
            // Arguments are required by default (in Clap).
            // This section should never execute.
            unreachable!("No matching subcommand!");
        }
    }
}

fn database_arg() -> Arg<'static> {
    Arg::new("database")
        .required(true)
        .value_name("DB")
        .help("Database name")
}

fn docid_arg() -> Arg<'static> {
    Arg::new("docid")
        .required(true)
        .value_name("DOCID")
        .help("Document id")
}

fn rev_arg() -> Arg<'static> {
    Arg::new("rev")
        .required(true)
        .value_name("REV")
        .help("Current revision of the document")
}

fn page_size_arg() -> Arg<'static> {
    Arg::new("page-size")
        .long("page-size")
        .value_name("N")
        .help("Rows fetched per request")
        .default_value(DEFAULT_PAGE_SIZE)
        .takes_value(true)
}

fn key_arg(help: &'static str) -> Arg<'static> {
    Arg::new("key")
        .short('k')
        .long("key")
        .value_name("KEY")
        .help(help)
        .takes_value(true)
        .multiple_occurrences(true)
}

/// Configure Clap
/// This function will configure clap and match arguments
pub fn cli_config() -> Result<ArgMatches> {
    let default_format: &'static str = OutputFormat::default().into();

    let cli_app = Command::new("settee")
        .arg_required_else_help(true)
        .version(crate_version!())
        .about(crate_description!())
        .author(crate_authors!("\n"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Set a custom config file")
                .takes_value(true),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .default_value(default_format)
                .possible_values(OutputFormat::VARIANTS.iter().copied())
                .takes_value(true),
        )
        .subcommand(
            Command::new("create-db")
                .about("Create a database (no-op if it exists)")
                .arg(database_arg()),
        )
        .subcommand(
            Command::new("delete-db")
                .about("Delete a database")
                .arg(database_arg()),
        )
        .subcommand(
            Command::new("db-info")
                .about("Show database metadata")
                .arg(database_arg()),
        )
        .subcommand(Command::new("ls-dbs").about("List all databases"))
        .subcommand(
            Command::new("read")
                .about("Read a document")
                .arg(database_arg())
                .arg(docid_arg()),
        )
        .subcommand(
            Command::new("insert")
                .about("Create a document, or one per element of a JSON array")
                .arg(database_arg())
                .arg(Arg::new("json").required(true).value_name("JSON")),
        )
        .subcommand(
            Command::new("update")
                .about("Replace a document revision")
                .arg(database_arg())
                .arg(docid_arg())
                .arg(rev_arg())
                .arg(Arg::new("json").required(true).value_name("JSON")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a document revision")
                .arg(database_arg())
                .arg(docid_arg())
                .arg(rev_arg()),
        )
        .subcommand(
            Command::new("all-docs")
                .about("List documents in a database")
                .arg(database_arg())
                .arg(key_arg("Only this document id (repeatable)"))
                .arg(
                    Arg::new("include-docs")
                        .long("include-docs")
                        .help("Include document bodies"),
                )
                .arg(
                    Arg::new("stream")
                        .long("stream")
                        .help("Page through results, printing one row per line"),
                )
                .arg(page_size_arg()),
        )
        .subcommand(
            Command::new("view")
                .about("Query a view")
                .arg(database_arg())
                .arg(Arg::new("ddoc").required(true).value_name("DDOC"))
                .arg(Arg::new("view").required(true).value_name("VIEW"))
                .arg(key_arg("Only this key, as JSON (repeatable)")),
        )
        .subcommand(
            Command::new("changes")
                .about("Print the changes feed, one change per line")
                .arg(database_arg())
                .arg(page_size_arg()),
        )
        .subcommand(Command::new("config").about("Show Configuration"));

    // Get matches
    let cli_matches = cli_app.get_matches();

    Ok(cli_matches)
}
