// Message board posts and the comments hanging off any recording.

use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{fetch_comments, fetch_dock, nullable, strip_html, Comment, CommentOutput, Creator};
use super::{parse_args, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageBoard {
    pub id: i64,
    pub messages_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub subject: String,
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

#[derive(Debug, Serialize)]
struct MessageDetail {
    id: i64,
    subject: String,
    content: String,
    creator: String,
    created_at: String,
    updated_at: String,
    comments_count: i64,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comments: Vec<CommentOutput>,
}

#[derive(Default)]
pub struct Messages;

impl Command for Messages {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let cl = ctx.client()?;
        let (project, board): (_, MessageBoard) = fetch_dock(cl, &project_id, "message_board")?;
        let messages: Vec<Message> = cl.get_all_as(&board.messages_url)?;

        let messages: Vec<Value> = messages
            .into_iter()
            .map(|m| {
                json!({
                    "id": m.id,
                    "subject": m.subject,
                    "creator": m.creator.name,
                    "created_at": m.created_at,
                    "comments_count": m.comments_count,
                })
            })
            .collect();
        Ok(json!({
            "project_id": project.id,
            "message_board_id": board.id,
            "messages": messages,
        }))
    }
}

/// `<id> [--comments]`, shared by the commands that show one recording.
#[derive(Parser, Debug, Default)]
pub(crate) struct ViewArgs {
    pub id: Option<String>,
    /// Include the comment thread.
    #[arg(long)]
    pub comments: bool,
}

#[derive(Default)]
pub struct MessageView;

impl Command for MessageView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: ViewArgs = parse_args("message", &rest)?;
        let Some(message_id) = args.id else {
            bail!("message_id required");
        };

        let cl = ctx.client()?;
        let message: Message = cl.get_as(&format!("/buckets/{project_id}/messages/{message_id}.json"))?;
        let comments = if args.comments && !message.comments_url.is_empty() {
            fetch_comments(cl, &message.comments_url)?
        } else {
            Vec::new()
        };

        Ok(serde_json::to_value(MessageDetail {
            id: message.id,
            subject: message.subject,
            content: strip_html(&message.content),
            creator: message.creator.name,
            created_at: message.created_at,
            updated_at: message.updated_at,
            comments_count: message.comments_count,
            url: message.app_url,
            comments,
        })?)
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "message-create")]
struct MessageCreateArgs {
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewMessage {
    subject: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Default)]
pub struct MessageCreate;

impl Command for MessageCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: MessageCreateArgs = parse_args("message-create", &rest)?;
        let Some(subject) = args.subject.filter(|s| !s.is_empty()) else {
            bail!("--subject required");
        };

        let cl = ctx.client()?;
        let (_, board): (_, MessageBoard) = fetch_dock(cl, &project_id, "message_board")?;
        let payload = NewMessage {
            subject,
            status: "active",
            content: args.content.filter(|c| !c.is_empty()),
        };
        let created: Message = cl.post_as(&board.messages_url, &payload)?;

        Ok(json!({
            "status": "ok",
            "id": created.id,
            "subject": created.subject,
            "message": format!("Message '{}' created", created.subject),
        }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "comment-add")]
struct CommentAddArgs {
    recording_id: Option<String>,
    #[arg(long)]
    content: Option<String>,
}

#[derive(Default)]
pub struct CommentAdd;

impl Command for CommentAdd {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: CommentAddArgs = parse_args("comment-add", &rest)?;
        let Some(recording_id) = args.recording_id else {
            bail!("recording_id required");
        };
        let Some(content) = args.content.filter(|c| !c.is_empty()) else {
            bail!("--content required");
        };

        let created: Comment = ctx.client()?.post_as(
            &format!("/buckets/{project_id}/recordings/{recording_id}/comments.json"),
            &json!({ "content": content }),
        )?;
        Ok(json!({
            "status": "ok",
            "id": created.id,
            "recording_id": recording_id,
            "message": format!("Comment added to recording {recording_id}"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_omits_empty_content() {
        let msg = NewMessage {
            subject: "Kickoff".into(),
            status: "active",
            content: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"subject": "Kickoff", "status": "active"})
        );
    }

    #[test]
    fn view_args_accept_flag_before_id() {
        let args: Vec<String> = ["--comments", "42"].iter().map(|s| s.to_string()).collect();
        let parsed: ViewArgs = parse_args("message", &args).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("42"));
        assert!(parsed.comments);
    }
}
