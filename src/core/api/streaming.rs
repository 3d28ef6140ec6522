// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Row-at-a-time access to `_all_docs` and `_changes`.
//!
//! Each stream requests one page when polled and yields its rows one by one,
//! so large databases can be walked without holding every row in memory.

use anyhow::{anyhow, Result};
use futures::stream::{self, unfold, Stream, TryStreamExt};
use log::debug;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::cloudant::{decode, keys_body, Cloudant};
use crate::core::models::{row_id, AllDocsPage, ChangesPage};

/// Where the next `_all_docs` page starts.
#[derive(Debug)]
enum AllDocsState {
    /// Fetch a page starting at this document id (or the beginning).
    Next(Option<String>),
    Done,
}

/// Where the next `_changes` page starts.
#[derive(Debug)]
enum ChangesState {
    Since(String),
    Done,
}

type Params = Vec<(String, String)>;

/// Query parameters the `_all_docs` pager sets itself.
const PAGING_PARAMS: &[&str] = &["limit", "startkey"];

fn owned_params(params: &[(&str, &str)]) -> Params {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Caller parameters minus the ones paging overrides.
fn page_params(params: &[(&str, &str)]) -> Params {
    params
        .iter()
        .filter(|(k, _)| {
            let paging = PAGING_PARAMS.contains(k);
            if paging {
                debug!("ignoring {} parameter, set per page", k);
            }
            !paging
        })
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Flatten a stream of row pages into a stream of rows.
fn rows<'a, S>(pages: S) -> impl Stream<Item = Result<Value>> + Unpin + Send + 'a
where
    S: Stream<Item = Result<Vec<Value>>> + Send + 'a,
{
    Box::pin(
        pages
            .map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<Value, anyhow::Error>)))
            .try_flatten(),
    )
}

impl Cloudant {
    async fn all_docs_page(
        &self,
        database: &str,
        limit: usize,
        startkey: Option<&str>,
        params: &[(String, String)],
    ) -> Result<AllDocsPage> {
        let url = self.endpoint(&[database, "_all_docs"])?;
        let mut query = params.to_vec();
        query.push(("limit".to_owned(), limit.to_string()));
        if let Some(startkey) = startkey {
            // Keys are json, so a document id goes over the wire quoted.
            query.push(("startkey".to_owned(), serde_json::to_string(startkey)?));
        }

        let response = self.request(Method::GET, url, &query, None).await?;
        decode(response).await
    }

    async fn changes_page(&self, database: &str, since: &str, limit: usize) -> Result<ChangesPage> {
        let url = self.endpoint(&[database, "_changes"])?;
        let query = [("since", since.to_owned()), ("limit", limit.to_string())];

        let response = self.request(Method::GET, url, &query, None).await?;
        decode(response).await
    }

    /// Stream every row of the primary index, `page_size` rows per request.
    ///
    /// Each request asks for one extra row; its id is where the next page
    /// starts. `params` are sent with every page (e.g. `include_docs`); any
    /// `limit` or `startkey` among them is dropped in favour of the pager's.
    pub fn all_docs_streamed<'a>(
        &'a self,
        database: &str,
        page_size: usize,
        params: &[(&str, &str)],
    ) -> impl Stream<Item = Result<Value>> + Unpin + Send + 'a {
        let database = database.to_owned();
        let params = page_params(params);

        let pages = unfold(AllDocsState::Next(None), move |state| {
            let database = database.clone();
            let params = params.clone();
            async move {
                let startkey = match state {
                    AllDocsState::Done => return None,
                    AllDocsState::Next(startkey) => startkey,
                };
                if page_size == 0 {
                    let e = anyhow!("Page size must be at least 1");
                    return Some((Err(e), AllDocsState::Done));
                }
                let limit = match page_size.checked_add(1) {
                    Some(limit) => limit,
                    None => {
                        let e = anyhow!("Page size too large: {}", page_size);
                        return Some((Err(e), AllDocsState::Done));
                    }
                };
                debug!("fetching _all_docs page of {} from {:?}", database, startkey);

                match self
                    .all_docs_page(&database, limit, startkey.as_deref(), &params)
                    .await
                {
                    Err(e) => Some((Err(e), AllDocsState::Done)),
                    Ok(mut page) => {
                        let next = if page.rows.len() > page_size {
                            let extra = page.rows.split_off(page_size);
                            match row_id(&extra[0]) {
                                Some(id) => AllDocsState::Next(Some(id.to_owned())),
                                None => AllDocsState::Done,
                            }
                        } else {
                            AllDocsState::Done
                        };
                        Some((Ok(page.rows), next))
                    }
                }
            }
        });
        rows(pages)
    }

    /// Stream the rows of a single `_all_docs` keys query.
    pub fn all_docs_keys_streamed<'a, S>(
        &'a self,
        database: &str,
        keys: &[S],
        params: &[(&str, &str)],
    ) -> impl Stream<Item = Result<Value>> + Unpin + Send + 'a
    where
        S: Serialize,
    {
        self.keys_rows(database.to_owned(), keys_body(keys), owned_params(params))
    }

    fn keys_rows<'a>(
        &'a self,
        database: String,
        body: Result<Value>,
        params: Params,
    ) -> impl Stream<Item = Result<Value>> + Unpin + Send + 'a {
        let page = stream::once(async move {
            let body = body?;
            let url = self.endpoint(&[database.as_str(), "_all_docs"])?;
            let response = self
                .request(Method::POST, url, &params, Some(&body))
                .await?;
            let page: AllDocsPage = decode(response).await?;
            Ok::<_, anyhow::Error>(page.rows)
        });
        rows(page)
    }

    /// Stream the database's changes feed from the beginning, `page_size`
    /// changes per request.
    ///
    /// The stream ends once the server has no more changes; it does not wait
    /// for new ones.
    pub fn changes_streamed<'a>(
        &'a self,
        database: &str,
        page_size: usize,
    ) -> impl Stream<Item = Result<Value>> + Unpin + Send + 'a {
        let database = database.to_owned();

        let pages = unfold(ChangesState::Since("0".to_owned()), move |state| {
            let database = database.clone();
            async move {
                let since = match state {
                    ChangesState::Done => return None,
                    ChangesState::Since(since) => since,
                };
                if page_size == 0 {
                    let e = anyhow!("Page size must be at least 1");
                    return Some((Err(e), ChangesState::Done));
                }
                debug!("fetching _changes of {} since {}", database, since);

                match self.changes_page(&database, &since, page_size).await {
                    Err(e) => Some((Err(e), ChangesState::Done)),
                    Ok(page) if page.results.is_empty() => None,
                    Ok(page) => {
                        let next = if page.results.len() < page_size {
                            ChangesState::Done
                        } else {
                            ChangesState::Since(page.next_since())
                        };
                        Some((Ok(page.results), next))
                    }
                }
            }
        });
        rows(pages)
    }
}
