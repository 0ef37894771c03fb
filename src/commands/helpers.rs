// Shapes and helpers shared by several commands: the project dock, comment
// threads, and the text clean-up applied to rich-text fields.

use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::ApiClient;

/// Field deserializer that reads `null` as the type's default.
pub fn nullable<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Creator {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DockItem {
    pub name: String,
    pub url: String,
}

/// Project payload, reduced to what commands navigate through.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectDetail {
    pub id: i64,
    pub name: String,
    pub dock: Vec<DockItem>,
}

impl ProjectDetail {
    /// URL of the dock tool called `name` (`chat`, `todoset`, `vault`, ...).
    pub fn dock_url(&self, name: &str) -> Result<&str> {
        self.dock
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.url.as_str())
            .ok_or_else(|| anyhow!("no {name} found in this project"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    pub created_at: String,
    pub creator: Creator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentOutput {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
}

impl From<Comment> for CommentOutput {
    fn from(comment: Comment) -> Self {
        CommentOutput {
            id: comment.id,
            author: coalesce(&[comment.creator.name.as_str(), "Unknown"]).to_string(),
            content: strip_html(&comment.content),
            created_at: comment.created_at,
        }
    }
}

pub fn fetch_project(cl: &ApiClient, project_id: &str) -> Result<ProjectDetail> {
    Ok(cl.get_as(&format!("/projects/{project_id}.json"))?)
}

/// Load the project, then follow its dock entry `name` (an absolute URL).
pub fn fetch_dock<T: DeserializeOwned>(
    cl: &ApiClient,
    project_id: &str,
    name: &str,
) -> Result<(ProjectDetail, T)> {
    let project = fetch_project(cl, project_id)?;
    let tool = cl.get_as(project.dock_url(name)?)?;
    Ok((project, tool))
}

/// Every comment on a recording, across all pages.
pub fn fetch_comments(cl: &ApiClient, comments_url: &str) -> Result<Vec<CommentOutput>> {
    let comments: Vec<Comment> = cl.get_all_as(comments_url)?;
    Ok(comments.into_iter().map(CommentOutput::from).collect())
}

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Rich text to a single line of plain text.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = HTML_TAG.replace_all(html, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// First non-empty value, or "".
pub fn coalesce<'a>(values: &[&'a str]) -> &'a str {
    values.iter().copied().find(|v| !v.is_empty()).unwrap_or("")
}

/// Numeric form of an id taken from the command line; 0 if it isn't one.
pub fn numeric_id(id: &str) -> i64 {
    id.trim().parse().unwrap_or(0)
}

/// Comma-separated person ids; anything unparsable is skipped.
pub fn parse_id_list(list: &str) -> Vec<i64> {
    list.split(',').filter_map(|s| s.trim().parse().ok()).collect()
}
