use anyhow::{bail, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};

use super::helpers::{fetch_dock, nullable, Creator};
use super::{parse_args, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    pub lines_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatLine {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    pub created_at: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
}

#[derive(Default)]
pub struct Campfire;

impl Command for Campfire {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let cl = ctx.client()?;
        let (project, chat): (_, Chat) = fetch_dock(cl, &project_id, "chat")?;
        let lines: Vec<ChatLine> = cl.get_all_as(&chat.lines_url)?;

        let lines: Vec<Value> = lines
            .into_iter()
            .map(|l| {
                json!({
                    "id": l.id,
                    "content": l.content,
                    "creator": l.creator.name,
                    "created_at": l.created_at,
                })
            })
            .collect();
        Ok(json!({
            "project_id": project.id,
            "campfire_id": chat.id,
            "lines": lines,
        }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "campfire-post")]
struct PostArgs {
    #[arg(long)]
    content: Option<String>,
}

#[derive(Default)]
pub struct CampfirePost;

impl Command for CampfirePost {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: PostArgs = parse_args("campfire-post", &rest)?;
        let Some(content) = args.content.filter(|c| !c.is_empty()) else {
            bail!("--content required");
        };

        let cl = ctx.client()?;
        let (_, chat): (_, Chat) = fetch_dock(cl, &project_id, "chat")?;
        let created: ChatLine = cl.post_as(&chat.lines_url, &json!({ "content": content }))?;
        Ok(json!({
            "status": "ok",
            "id": created.id,
            "content": created.content,
            "message": "Message posted to campfire",
        }))
    }
}
