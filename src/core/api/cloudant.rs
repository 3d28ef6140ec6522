//! Interact with a Cloudant/CouchDB server.
//!
//! Every method builds one endpoint URL (plus query parameters and JSON body),
//! sends it through the shared authenticated session and returns the
//! deserialized response. Document writes of all kinds go through
//! `_bulk_docs`.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use reqwest::{header, Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::app_config::CloudantConfig;

/// Request timeout used when none is configured, in seconds.
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Empty query parameter list, for calls that need none.
pub const NO_PARAMS: &[(&str, &str)] = &[];

/// Document id prefixes that CouchDB routes as their own path segment.
const RESERVED_PREFIXES: &[&str] = &["_design/", "_local/"];

/// A Cloudant account (or CouchDB server) and the session used to talk to it.
#[derive(Clone, Debug)]
pub struct Cloudant {
    /// Server URL; only scheme, host and port are used.
    base_url: Url,
    /// HTTP client carrying auth, user-agent and timeout.
    client: reqwest::Client,
}

impl Cloudant {
    /// Configure the session with basic auth, user-agent, and headers.
    ///
    /// A `timeout` of 0 seconds means [DEFAULT_TIMEOUT].
    pub fn new_with_params(
        base_url: Url,
        username: &str,
        password: &str,
        timeout: u64,
    ) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            bail!("Cloudant URL can't have a path: {}", base_url);
        }

        let timeout = match timeout {
            0 => DEFAULT_TIMEOUT,
            secs => secs,
        };

        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"),);
        let credentials = base64::encode(format!("{}:{}", username, password));
        let mut auth = header::HeaderValue::from_str(&format!("Basic {}", credentials))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .default_headers(headers)
                .timeout(Duration::from_secs(timeout))
                .build()?,
            base_url,
        })
    }

    pub fn new(base_url: Url, username: &str, password: &str) -> Result<Self> {
        Self::new_with_params(base_url, username, password, DEFAULT_TIMEOUT)
    }

    pub fn from_config(config: &CloudantConfig) -> Result<Self> {
        Self::new_with_params(
            config.url.clone(),
            &config.username,
            &config.password,
            config.timeout.unwrap_or(DEFAULT_TIMEOUT),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL whose path is exactly `segments`, each percent-encoded.
    ///
    /// The base URL's own path, query and fragment are dropped.
    pub(crate) fn endpoint<I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| anyhow!("Cloudant URL can't have a path: {}", self.base_url))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// Send a request without looking at the response status.
    pub(crate) async fn send<Q>(
        &self,
        method: Method,
        url: Url,
        params: &Q,
        body: Option<&Value>,
    ) -> Result<Response>
    where
        Q: Serialize + ?Sized,
    {
        debug!("building {} request for: {}", method, url);
        let mut req_builder = self.client.request(method, url).query(params);
        if let Some(body) = body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder.send().await?;
        debug!("status: {}", response.status());
        Ok(response)
    }

    /// Send a request, failing on any non-success status.
    pub(crate) async fn request<Q>(
        &self,
        method: Method,
        url: Url,
        params: &Q,
        body: Option<&Value>,
    ) -> Result<Response>
    where
        Q: Serialize + ?Sized,
    {
        let response = self.send(method, url, params, body).await?;
        check_status(response).await
    }

    /// Create a database.
    ///
    /// Returns the server's response and whether the database was newly
    /// created. An existing database (412 Precondition Failed) is not an
    /// error; it returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error for any other non-success status (e.g. 401 for bad
    /// credentials, 429 when rate limited) or if the response isn't json.
    pub async fn create_database(&self, database: &str) -> Result<(Value, bool)> {
        let url = self.endpoint(&[database])?;
        let response = self.send(Method::PUT, url, NO_PARAMS, None).await?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            debug!("database {} already exists", database);
            return Ok((decode(response).await?, false));
        }

        let response = check_status(response).await?;
        Ok((decode(response).await?, true))
    }

    pub async fn delete_database(&self, database: &str) -> Result<Value> {
        let url = self.endpoint(&[database])?;
        let response = self.request(Method::DELETE, url, NO_PARAMS, None).await?;
        decode(response).await
    }

    /// Metadata about a database (document count, update sequence, sizes).
    pub async fn database_info(&self, database: &str) -> Result<Value> {
        let url = self.endpoint(&[database])?;
        let response = self.request(Method::GET, url, NO_PARAMS, None).await?;
        decode(response).await
    }

    /// Names of all databases on the server.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["_all_dbs"])?;
        let response = self.request(Method::GET, url, NO_PARAMS, None).await?;
        decode(response).await
    }

    /// Fetch a single document. `params` are passed through as query
    /// parameters, e.g. `&[("revs_info", "true")]`.
    pub async fn read_doc<Q>(&self, database: &str, docid: &str, params: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(doc_path(database, docid))?;
        let response = self.request(Method::GET, url, params, None).await?;
        decode(response).await
    }

    /// Write a batch of documents in one request.
    ///
    /// Returns the server's per-document result array.
    pub async fn bulk_docs<Q>(&self, database: &str, docs: &[Value], params: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(&[database, "_bulk_docs"])?;
        let body = json!({ "docs": docs });
        let response = self.request(Method::POST, url, params, Some(&body)).await?;
        decode(response).await
    }

    /// Create one document, returning its `{"ok", "id", "rev"}` result.
    pub async fn create_doc(&self, database: &str, doc: Value) -> Result<Value> {
        let results = self.bulk_docs(database, &[doc], NO_PARAMS).await?;
        first_result(results)
    }

    /// Create many documents, returning one result per document.
    pub async fn create_docs(&self, database: &str, docs: Vec<Value>) -> Result<Value> {
        self.bulk_docs(database, &docs, NO_PARAMS).await
    }

    /// Create either one document or, if `data` is an array, each of its
    /// elements.
    pub async fn insert(&self, database: &str, data: Value) -> Result<Value> {
        match data {
            Value::Array(docs) => self.create_docs(database, docs).await,
            doc => self.create_doc(database, doc).await,
        }
    }

    /// Replace revision `revid` of document `docid` with `body`.
    ///
    /// # Errors
    ///
    /// Returns an error without sending anything if `body` isn't a json
    /// object. A revision conflict is reported by the server inside the result
    /// (`"error": "conflict"`), not as an error.
    pub async fn update_doc(
        &self,
        database: &str,
        docid: &str,
        revid: &str,
        body: Value,
    ) -> Result<Value> {
        let mut fields = match body {
            Value::Object(fields) => fields,
            other => bail!("Document body must be a JSON object, got: {}", other),
        };
        fields.insert("_id".to_owned(), Value::from(docid));
        fields.insert("_rev".to_owned(), Value::from(revid));

        let results = self
            .bulk_docs(database, &[Value::Object(fields)], NO_PARAMS)
            .await?;
        first_result(results)
    }

    /// Delete revision `revid` of document `docid` by writing a tombstone.
    pub async fn delete_doc(&self, database: &str, docid: &str, revid: &str) -> Result<Value> {
        self.update_doc(database, docid, revid, json!({ "_deleted": true }))
            .await
    }

    /// Query the primary index.
    pub async fn all_docs<Q>(&self, database: &str, params: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(&[database, "_all_docs"])?;
        let response = self.request(Method::GET, url, params, None).await?;
        decode(response).await
    }

    /// Query the primary index for one document id.
    pub async fn all_docs_key<Q>(&self, database: &str, key: &str, params: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        self.all_docs_keys(database, &[key], params).await
    }

    /// Query the primary index for a list of document ids.
    pub async fn all_docs_keys<S, Q>(&self, database: &str, keys: &[S], params: &Q) -> Result<Value>
    where
        S: Serialize,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(&[database, "_all_docs"])?;
        let body = keys_body(keys)?;
        let response = self.request(Method::POST, url, params, Some(&body)).await?;
        decode(response).await
    }

    /// Query the view `viewname` of design document `ddoc`.
    pub async fn view_query<Q>(
        &self,
        database: &str,
        ddoc: &str,
        viewname: &str,
        params: &Q,
    ) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(&[database, "_design", ddoc, "_view", viewname])?;
        let response = self.request(Method::GET, url, params, None).await?;
        decode(response).await
    }

    /// Query a view for a list of keys.
    pub async fn view_query_keys<S, Q>(
        &self,
        database: &str,
        ddoc: &str,
        viewname: &str,
        keys: &[S],
        params: &Q,
    ) -> Result<Value>
    where
        S: Serialize,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(&[database, "_design", ddoc, "_view", viewname])?;
        let body = keys_body(keys)?;
        let response = self.request(Method::POST, url, params, Some(&body)).await?;
        decode(response).await
    }
}

/// Path segments for a document, keeping `_design/` and `_local/` ids as two
/// segments.
pub(crate) fn doc_path<'a>(database: &'a str, docid: &'a str) -> Vec<&'a str> {
    for prefix in RESERVED_PREFIXES {
        if let Some(name) = docid.strip_prefix(*prefix) {
            return vec![database, prefix.trim_end_matches('/'), name];
        }
    }
    vec![database, docid]
}

pub(crate) fn keys_body<S: Serialize>(keys: &[S]) -> Result<Value> {
    Ok(json!({ "keys": serde_json::to_value(keys)? }))
}

/// Turn a non-success status into an error carrying the response body.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.error_for_status_ref().map(|_| ());
    if let Err(e) = status {
        let content = response.text().await.unwrap_or_default();
        debug!("error content: {}", content);
        return Err(anyhow::Error::new(e).context(format!("Cloudant responded: {}", content)));
    }
    Ok(response)
}

/// Deserialize a response body, keeping the raw body in the error.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let content = response.text().await?;
    debug!("content: {}", content);

    serde_json::from_str(&content)
        .with_context(|| format!("JSON from Cloudant was malformed: {}", &content))
}

/// The first element of a `_bulk_docs` result array.
fn first_result(results: Value) -> Result<Value> {
    match results {
        Value::Array(results) if !results.is_empty() => {
            Ok(results.into_iter().next().unwrap_or_default())
        }
        other => Err(anyhow!(
            "Cloudant returned no result for the written document: {}",
            other
        )),
    }
}
