// Message board categories ("message types"): a name plus an emoji icon,
// scoped to one project.

use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{nullable, numeric_id};
use super::{parse_args, required, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageType {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub icon: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Default)]
pub struct MessageTypes;

impl Command for MessageTypes {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let types: Vec<MessageType> = ctx
            .client()?
            .get_all_as(&format!("/buckets/{project_id}/categories.json"))?;

        let types: Vec<Value> = types
            .into_iter()
            .map(|t| json!({ "id": t.id, "name": t.name, "icon": t.icon }))
            .collect();
        Ok(json!({ "project_id": numeric_id(&project_id), "message_types": types }))
    }
}

#[derive(Default)]
pub struct MessageTypeView;

impl Command for MessageTypeView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let type_id = required(&rest, "message_type_id")?;
        let t: MessageType = ctx
            .client()?
            .get_as(&format!("/buckets/{project_id}/categories/{type_id}.json"))?;
        Ok(json!({
            "id": t.id,
            "name": t.name,
            "icon": t.icon,
            "created_at": t.created_at,
            "updated_at": t.updated_at,
        }))
    }
}

#[derive(Parser, Debug, Default)]
struct TypeArgs {
    id: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// Emoji shown next to the category.
    #[arg(long)]
    icon: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct TypeFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
}

impl TypeArgs {
    fn fields(self) -> (Option<String>, TypeFields) {
        let fields = TypeFields {
            name: self.name.filter(|v| !v.is_empty()),
            icon: self.icon.filter(|v| !v.is_empty()),
        };
        (self.id, fields)
    }
}

fn changed(status: &str, t: MessageType) -> Value {
    json!({
        "status": "ok",
        "id": t.id,
        "name": t.name,
        "icon": t.icon,
        "message": format!("Message type '{}' {status}", t.name),
    })
}

#[derive(Default)]
pub struct MessageTypeCreate;

impl Command for MessageTypeCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let (stray, fields) = parse_args::<TypeArgs>("message-type-create", &rest)?.fields();
        if let Some(stray) = stray {
            bail!("unexpected argument '{stray}'");
        }
        if fields.name.is_none() {
            bail!("--name required");
        }
        if fields.icon.is_none() {
            bail!("--icon required (emoji)");
        }

        let created: MessageType = ctx
            .client()?
            .post_as(&format!("/buckets/{project_id}/categories.json"), &fields)?;
        Ok(changed("created", created))
    }
}

#[derive(Default)]
pub struct MessageTypeUpdate;

impl Command for MessageTypeUpdate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let (type_id, fields) = parse_args::<TypeArgs>("message-type-update", &rest)?.fields();
        let Some(type_id) = type_id else {
            bail!("message_type_id required");
        };
        if fields.name.is_none() && fields.icon.is_none() {
            bail!("at least one of --name or --icon required");
        }

        let updated: MessageType = ctx
            .client()?
            .put_as(&format!("/buckets/{project_id}/categories/{type_id}.json"), &fields)?;
        Ok(changed("updated", updated))
    }
}

#[derive(Default)]
pub struct MessageTypeDelete;

impl Command for MessageTypeDelete {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let type_id = required(&rest, "message_type_id")?;
        ctx.client()?
            .delete(&format!("/buckets/{project_id}/categories/{type_id}.json"))?;
        Ok(json!({ "status": "ok", "type_id": type_id, "message": "Message type deleted" }))
    }
}
