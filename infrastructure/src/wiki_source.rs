//! Azure DevOps Wiki as an ingest source: walks the page tree and fetches
//! each page's content as plain text.

use crate::config::WikiConfig;
use crate::document_reader::HTML_WRAP_WIDTH;
use crate::http::{join_url, read_json, transport_error};
use domain::error::{CollaboratorError, CollaboratorResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;

const CONCURRENT_PAGE_FETCHES: usize = 4;
const ROOT_PATH: &str = "/";

/// Listing either wraps pages in `value` or returns the root page itself.
#[derive(Deserialize)]
#[serde(untagged)]
enum PagesResponse {
    List { value: Vec<PageNode> },
    Single(PageNode),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageNode {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    sub_pages: Vec<PageNode>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub path: String,
    pub text: String,
}

impl WikiPage {
    /// Index label for the page, e.g. `Wiki: /Network/VPN`.
    pub fn source(&self) -> String {
        format!("Wiki: {}", self.path)
    }
}

pub struct WikiSource {
    client: Arc<Client>,
    config: WikiConfig,
}

impl WikiSource {
    pub fn new(client: Arc<Client>, config: WikiConfig) -> Self {
        Self { client, config }
    }

    fn pages_url(&self) -> String {
        join_url(
            &self.config.base_url,
            &format!(
                "{}/{}/_apis/wiki/wikis/{}/pages",
                self.config.organization, self.config.project, self.config.wiki
            ),
        )
    }

    fn get(&self) -> RequestBuilder {
        self.client
            .get(self.pages_url())
            .basic_auth("", Some(&self.config.pat))
            .query(&[("api-version", self.config.api_version.as_str())])
    }

    /// Every page path in the wiki, depth first, root excluded.
    pub async fn page_paths(&self) -> CollaboratorResult<Vec<String>> {
        let response = self
            .get()
            .query(&[("recursionLevel", "full")])
            .send()
            .await
            .map_err(transport_error)?;
        let roots = match read_json::<PagesResponse>(response).await? {
            PagesResponse::List { value } => value,
            PagesResponse::Single(page) => vec![page],
        };
        let mut paths = Vec::new();
        collect_paths(&roots, &mut paths);
        paths.retain(|path| path != ROOT_PATH);
        Ok(paths)
    }

    /// Plain text of one page. HTML bodies are rendered to text; markdown
    /// passes through so blank-line paragraphs survive.
    pub async fn page_text(&self, path: &str) -> CollaboratorResult<String> {
        let response = self
            .get()
            .query(&[
                ("path", path.trim_start_matches('/')),
                ("includeContent", "true"),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        let page: PageNode = read_json(response).await?;
        Ok(page_body_to_text(page.content.as_deref().unwrap_or_default()))
    }

    /// All non-empty pages, in tree order.
    pub async fn fetch_pages(&self) -> CollaboratorResult<Vec<WikiPage>> {
        let paths = self.page_paths().await?;
        tracing::info!(wiki = %self.config.wiki, pages = paths.len(), "listed wiki pages");
        let pages: Vec<WikiPage> = stream::iter(paths)
            .map(|path| async move {
                let text = self.page_text(&path).await?;
                Ok::<_, CollaboratorError>(WikiPage { path, text })
            })
            .buffered(CONCURRENT_PAGE_FETCHES)
            .try_collect()
            .await?;
        Ok(pages
            .into_iter()
            .filter(|page| !page.text.trim().is_empty())
            .collect())
    }
}

fn collect_paths(pages: &[PageNode], paths: &mut Vec<String>) {
    for page in pages {
        if let Some(path) = &page.path {
            paths.push(path.clone());
        }
        collect_paths(&page.sub_pages, paths);
    }
}

fn page_body_to_text(body: &str) -> String {
    if body.trim_start().starts_with('<') {
        html2text::from_read(body.as_bytes(), HTML_WRAP_WIDTH)
    } else {
        body.to_string()
    }
}
