//! Client for the Cloudant/CouchDB HTTP API and the commands built on it.

pub mod api;
pub(crate) mod commands;
pub mod models;
