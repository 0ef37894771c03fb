use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{nullable, strip_html, Creator};
use super::{parse_args, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Bucket {
    #[serde(deserialize_with = "nullable")]
    name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Hit {
    id: i64,
    #[serde(deserialize_with = "nullable")]
    title: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(deserialize_with = "nullable")]
    plain_text_content: String,
    #[serde(deserialize_with = "nullable")]
    app_url: String,
    #[serde(deserialize_with = "nullable")]
    creator: Creator,
    #[serde(deserialize_with = "nullable")]
    bucket: Bucket,
}

#[derive(Debug, Serialize)]
struct HitOutput {
    id: i64,
    title: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    snippet: String,
    project: String,
    creator: String,
    url: String,
}

#[derive(Parser, Debug, Default)]
#[command(name = "search")]
struct SearchArgs {
    query: Option<String>,
    /// Recording type, e.g. `Todo` or `Message`.
    #[arg(long = "type")]
    kind: Option<String>,
    /// Limit results to one project.
    #[arg(long)]
    project: Option<String>,
}

/// `/search.json` with the query string encoded.
fn search_path(query: &str, kind: Option<&str>, project: Option<&str>) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    params.append_pair("q", query);
    if let Some(kind) = kind.filter(|k| !k.is_empty()) {
        params.append_pair("type", kind);
    }
    if let Some(project) = project.filter(|p| !p.is_empty()) {
        params.append_pair("bucket_id", project);
    }
    format!("/search.json?{}", params.finish())
}

#[derive(Default)]
pub struct Search;

impl Command for Search {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let args: SearchArgs = parse_args("search", args)?;
        let Some(query) = args.query.filter(|q| !q.is_empty()) else {
            bail!("search query required");
        };

        let path = search_path(&query, args.kind.as_deref(), args.project.as_deref());
        let hits: Vec<Hit> = ctx.client()?.get_all_as(&path)?;
        let results: Vec<HitOutput> = hits
            .into_iter()
            .map(|h| HitOutput {
                id: h.id,
                title: h.title,
                kind: h.kind,
                snippet: strip_html(&h.plain_text_content),
                project: h.bucket.name,
                creator: h.creator.name,
                url: h.app_url,
            })
            .collect();
        Ok(json!({ "query": query, "results": results }))
    }
}
