// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::io::Write;

use anyhow::{Context, Result};
use futures::{Stream, TryStreamExt};
use log::info;
use serde_json::{json, Value};

use super::api::cloudant::{Cloudant, NO_PARAMS};
use crate::app_config::{CompleteAppConfig, OutputFormat};

/// Print one json value in the requested format.
pub fn print_value<W: Write>(out: &mut W, value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(value)?)?,
        OutputFormat::Pretty => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
    }
    Ok(())
}

/// Print every row of a stream, one compact json value per line.
async fn print_stream<W, S>(out: &mut W, mut rows: S) -> Result<()>
where
    W: Write,
    S: Stream<Item = Result<Value>> + Unpin,
{
    let mut count = 0;
    while let Some(row) = rows.try_next().await? {
        writeln!(out, "{}", serde_json::to_string(&row)?)?;
        count += 1;
    }
    info!("streamed {} rows", count);
    Ok(())
}

/// Parse a command-line argument as json.
pub fn parse_json(name: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .with_context(|| format!("Argument {} isn't valid JSON: {}", name, raw))
}

pub async fn create_database<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
) -> Result<()> {
    let (response, created) = cdt.create_database(database).await?;
    if !created {
        info!("database {} already exists", database);
    }
    print_value(
        out,
        &json!({ "created": created, "response": response }),
        format,
    )
}

pub async fn delete_database<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
) -> Result<()> {
    print_value(out, &cdt.delete_database(database).await?, format)
}

pub async fn database_info<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
) -> Result<()> {
    print_value(out, &cdt.database_info(database).await?, format)
}

pub async fn list_databases<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
) -> Result<()> {
    let databases = cdt.list_databases().await?;
    print_value(out, &json!(databases), format)
}

pub async fn read_doc<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
    docid: &str,
) -> Result<()> {
    print_value(out, &cdt.read_doc(database, docid, NO_PARAMS).await?, format)
}

/// Insert one document, or several if `data` is a json array.
pub async fn insert<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
    data: &str,
) -> Result<()> {
    let data = parse_json("JSON", data)?;
    print_value(out, &cdt.insert(database, data).await?, format)
}

pub async fn update_doc<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
    docid: &str,
    revid: &str,
    body: &str,
) -> Result<()> {
    let body = parse_json("JSON", body)?;
    let result = cdt.update_doc(database, docid, revid, body).await?;
    print_value(out, &result, format)
}

pub async fn delete_doc<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
    docid: &str,
    revid: &str,
) -> Result<()> {
    print_value(out, &cdt.delete_doc(database, docid, revid).await?, format)
}

/// Options for the `all-docs` subcommand.
#[derive(Debug, Default)]
pub struct AllDocsOptions {
    /// Only these document ids.
    pub keys: Vec<String>,
    pub include_docs: bool,
    /// Print rows one per line, fetching `page_size` at a time.
    pub stream: bool,
    pub page_size: usize,
}

pub async fn all_docs<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
    options: &AllDocsOptions,
) -> Result<()> {
    let params: &[(&str, &str)] = if options.include_docs {
        &[("include_docs", "true")]
    } else {
        NO_PARAMS
    };

    match (options.stream, options.keys.as_slice()) {
        (true, []) => {
            let rows = cdt.all_docs_streamed(database, options.page_size, params);
            print_stream(out, rows).await
        }
        (true, keys) => {
            let rows = cdt.all_docs_keys_streamed(database, keys, params);
            print_stream(out, rows).await
        }
        (false, []) => print_value(out, &cdt.all_docs(database, params).await?, format),
        (false, [key]) => print_value(
            out,
            &cdt.all_docs_key(database, key, params).await?,
            format,
        ),
        (false, keys) => print_value(
            out,
            &cdt.all_docs_keys(database, keys, params).await?,
            format,
        ),
    }
}

/// Query a view. Each of `keys` is parsed as json, since view keys can be
/// any json value.
pub async fn view_query<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    format: OutputFormat,
    database: &str,
    ddoc: &str,
    viewname: &str,
    keys: &[String],
) -> Result<()> {
    let result = if keys.is_empty() {
        cdt.view_query(database, ddoc, viewname, NO_PARAMS).await?
    } else {
        let keys = keys
            .iter()
            .map(|key| parse_json("--key", key))
            .collect::<Result<Vec<_>>>()?;
        cdt.view_query_keys(database, ddoc, viewname, &keys, NO_PARAMS)
            .await?
    };
    print_value(out, &result, format)
}

pub async fn changes<W: Write>(
    cdt: &Cloudant,
    out: &mut W,
    database: &str,
    page_size: usize,
) -> Result<()> {
    print_stream(out, cdt.changes_streamed(database, page_size)).await
}

/// Show the configuration file, without secrets.
pub fn print_config<W: Write>(out: &mut W, config: config::Config) -> Result<()> {
    let app_config: CompleteAppConfig = config.try_into()?;
    write!(out, "{}", toml::to_string(&app_config.redacted())?)?;

    Ok(())
}
