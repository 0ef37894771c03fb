use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{fetch_comments, fetch_dock, nullable, strip_html, Creator};
use super::messages::ViewArgs;
use super::{parse_args, Command, Context};

/// The project's Docs & Files tool.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Vault {
    pub id: i64,
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub documents_url: String,
    #[serde(deserialize_with = "nullable")]
    pub uploads_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub comments_count: i64,
    #[serde(deserialize_with = "nullable")]
    pub comments_url: String,
    #[serde(deserialize_with = "nullable")]
    pub app_url: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
}

#[derive(Default)]
pub struct Docs;

impl Command for Docs {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let cl = ctx.client()?;
        let (project, vault): (_, Vault) = fetch_dock(cl, &project_id, "vault")?;
        let documents: Vec<Document> = cl.get_all_as(&vault.documents_url)?;

        let documents: Vec<Value> = documents
            .into_iter()
            .map(|d| {
                json!({
                    "id": d.id,
                    "title": d.title,
                    "creator": d.creator.name,
                    "updated_at": d.updated_at,
                })
            })
            .collect();
        Ok(json!({
            "project_id": project.id,
            "vault_id": vault.id,
            "documents": documents,
        }))
    }
}

#[derive(Default)]
pub struct DocView;

impl Command for DocView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: ViewArgs = parse_args("doc", &rest)?;
        let Some(doc_id) = args.id else {
            bail!("document_id required");
        };

        let cl = ctx.client()?;
        let doc: Document = cl.get_as(&format!("/buckets/{project_id}/documents/{doc_id}.json"))?;
        let mut out = json!({
            "id": doc.id,
            "title": doc.title,
            "content": strip_html(&doc.content),
            "creator": doc.creator.name,
            "created_at": doc.created_at,
            "updated_at": doc.updated_at,
            "comments_count": doc.comments_count,
            "url": doc.app_url,
        });
        if args.comments && !doc.comments_url.is_empty() {
            let comments = fetch_comments(cl, &doc.comments_url)?;
            if !comments.is_empty() {
                out["comments"] = serde_json::to_value(comments)?;
            }
        }
        Ok(out)
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "doc-create")]
struct DocCreateArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewDocument {
    title: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Default)]
pub struct DocCreate;

impl Command for DocCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: DocCreateArgs = parse_args("doc-create", &rest)?;
        let Some(title) = args.title.filter(|t| !t.is_empty()) else {
            bail!("--title required");
        };

        let cl = ctx.client()?;
        let (_, vault): (_, Vault) = fetch_dock(cl, &project_id, "vault")?;
        let created: Document = cl.post_as(
            &vault.documents_url,
            &NewDocument {
                title,
                status: "active",
                content: args.content.filter(|c| !c.is_empty()),
            },
        )?;
        Ok(json!({
            "status": "ok",
            "id": created.id,
            "title": created.title,
            "message": format!("Document '{}' created", created.title),
        }))
    }
}
