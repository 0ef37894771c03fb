// Status changes that apply to any recording (to-do, message, document, ...).

use anyhow::Result;
use serde_json::{json, Value};

use super::{required, Command, Context};

/// Move a recording to `status` (`archived`, `active` or `trashed`).
fn set_status(ctx: &Context, args: &[String], status: &str, done: &str) -> Result<Value> {
    let (project_id, rest) = ctx.split_project(args)?;
    let recording_id = required(&rest, "recording_id")?;
    ctx.client()?.put_empty(&format!(
        "/buckets/{project_id}/recordings/{recording_id}/status/{status}.json"
    ))?;
    Ok(json!({
        "status": "ok",
        "recording_id": recording_id,
        "message": done,
    }))
}

#[derive(Default)]
pub struct Archive;

impl Command for Archive {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        set_status(ctx, args, "archived", "Recording archived")
    }
}

#[derive(Default)]
pub struct Unarchive;

impl Command for Unarchive {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        set_status(ctx, args, "active", "Recording unarchived")
    }
}

#[derive(Default)]
pub struct Trash;

impl Command for Trash {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        set_status(ctx, args, "trashed", "Recording trashed")
    }
}
