//! Settee is a minimal client for the Cloudant/CouchDB HTTP API, usable as a
//! library or from the command line.
//!
//! Settee is deliberately little more than a URL constructor: each call builds
//! one endpoint URL and JSON body, sends it through a single authenticated
//! session, and hands back the deserialized JSON response. Documents are plain
//! [serde_json::Value]s. Where the API offers several ways to do something,
//! settee picks one: creating, updating and deleting documents all go through
//! the `_bulk_docs` endpoint.
//!
//! Out of scope: index management, replication, full API coverage, and typed
//! optional parameters. Query parameters are passed through as-is.
//!
//! # Library usage
//!
//! ```no_run
//! use settee::{Cloudant, NO_PARAMS};
//! use serde_json::json;
//! use url::Url;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cdt = Cloudant::new(
//!     Url::parse("https://account.cloudant.com")?,
//!     "account",
//!     "password",
//! )?;
//!
//! let (_info, _created) = cdt.create_database("animals").await?;
//! let result = cdt.insert("animals", json!({"name": "aardvark"})).await?;
//! let doc = cdt
//!     .read_doc("animals", result["id"].as_str().unwrap(), NO_PARAMS)
//!     .await?;
//! cdt.delete_doc("animals", result["id"].as_str().unwrap(), doc["_rev"].as_str().unwrap())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! `_all_docs` and `_changes` can also be walked a row at a time with
//! [Cloudant::all_docs_streamed] and [Cloudant::changes_streamed], which
//! fetch one page per request.
//!
//! # Installation
//!
//! If you have [Rust installed](https://rustup.rs/), you can install the
//! `settee` binary with:
//!
//! ```shell
//! cargo install --path .
//! ```
//!
//! # Usage
//!
//! View CLI help with `settee help` or `settee help <subcommand>`.
//!
//! ## Configuration
//!
//! The CLI requires a configuration file naming the server and credentials:
//!
//! ```toml
//! [cloudant]
//! url = "https://account.cloudant.com"
//! username = "account"
//! password = "secret"
//! # Optional, seconds
//! timeout = 30
//! ```
//!
//! To use the configuration file with settee, either:
//!
//! - Place the configuration file at `~/.config/settee/settee.toml`
//! - Use the `--config path/to/settee.toml` flag
//!
//! Any value can be overridden with an environment variable, e.g.
//! `SETTEE__CLOUDANT__PASSWORD=secret` (note the double underscores).
//!
//! ## Commands
//!
//! | Command | Request |
//! |-|-|
//! | `settee config` | none, echoes config with the password redacted |
//! | `settee create-db <db>` | `PUT /<db>` |
//! | `settee delete-db <db>` | `DELETE /<db>` |
//! | `settee db-info <db>` | `GET /<db>` |
//! | `settee ls-dbs` | `GET /_all_dbs` |
//! | `settee read <db> <docid>` | `GET /<db>/<docid>` |
//! | `settee insert <db> <json>` | `POST /<db>/_bulk_docs` |
//! | `settee update <db> <docid> <rev> <json>` | `POST /<db>/_bulk_docs` |
//! | `settee delete <db> <docid> <rev>` | `POST /<db>/_bulk_docs` |
//! | `settee all-docs <db> [--key K]... [--include-docs] [--stream]` | `GET` or `POST /<db>/_all_docs` |
//! | `settee view <db> <ddoc> <view> [--key JSON]...` | `GET` or `POST /<db>/_design/<ddoc>/_view/<view>` |
//! | `settee changes <db>` | `GET /<db>/_changes`, paged |
//!
//! Output is pretty-printed JSON; `--format json` prints compact JSON.
//! Streamed output (`all-docs --stream`, `changes`) is always one compact JSON
//! value per line.
//!
//! ## Examples
//!
//! ```shell
//! # Create three documents in one request
//! settee insert animals '[{"name": "aardvark"}, {"name": "badger"}, {"name": "cat"}]'
//!
//! # Update a document
//! settee update animals aardvark 1-2c8f1c '{"name": "aardvark", "diet": "ants"}'
//!
//! # Dump every document, 500 per request
//! settee all-docs animals --include-docs --stream --page-size 500
//! ```
//!
//! # Troubleshooting
//!
//! Set `RUST_LOG=debug` to see every request settee sends and every response
//! body it receives.
//!
//! | Error                                      | Resolution |
//! |-                                           |-           |
//! | Configuration file not found               | Place a config file at `~/.config/settee/settee.toml` or pass `--config`. |
//! | HTTP status client error (401 Unauthorized) | Check `cloudant.username` and `cloudant.password`. |
//! | HTTP status client error (429 Too Many Requests) | The account's rate limit was hit. Settee doesn't retry; try again later. |

#[cfg(not(debug_assertions))]
use human_panic::setup_panic;

pub mod app_config;
mod cli;
pub mod core;

use anyhow::Result;

pub use crate::core::api::cloudant::{Cloudant, NO_PARAMS};

#[doc(hidden)]
/// Main entrypoint
pub fn run() -> Result<()> {
    // Human Panic. Only enabled when *not* debugging.
    //
    // Example of what panic message looks like:
    // https://docs.rs/human-panic/1.0.3/human_panic/
    #[cfg(not(debug_assertions))]
    {
        setup_panic!();
    }

    // Better Panic. Only enabled *when* debugging.
    #[cfg(debug_assertions)]
    {
        better_panic::Settings::debug()
            .most_recent_first(false)
            .lineno_suffix(true)
            .verbosity(better_panic::Verbosity::Full)
            .install();
    }

    env_logger::init();

    // Get CLI arguments and flags (one may have provided the config file to use)
    let cli_matches = cli::cli_config()?;

    let mut settings = config::Config::default();
    // Use cmdline arg config file if provided, otherwise require config file at default ~/.config/... path
    if let Some(config_file) = cli_matches.value_of("config") {
        settings.merge(config::File::with_name(config_file))?;
    } else {
        settings.merge(config::File::with_name(&shellexpand::tilde(
            app_config::DEFAULT_CONFIG_PATH,
        )))?;
    }

    // Override with environment variables, if present
    // Example of overriding: SETTEE__CLOUDANT__PASSWORD=abc
    // (Note double underscore to reach into lower struct levels!)
    settings.merge(config::Environment::with_prefix(app_config::ENV_PREFIX).separator("__"))?;

    // Every request is awaited in turn; the runtime only drives the HTTP client.
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(cli::cli_match(settings, cli_matches))
}
