// Files: raw attachment upload (yields the sgid used to embed it in rich
// text) and the uploads stored in a project vault.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{fetch_comments, nullable, numeric_id, strip_html, CommentOutput, Creator};
use super::messages::ViewArgs;
use super::{parse_args, required, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Upload {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub content_type: String,
    pub byte_size: i64,
    #[serde(deserialize_with = "nullable")]
    pub width: i64,
    #[serde(deserialize_with = "nullable")]
    pub height: i64,
    #[serde(deserialize_with = "nullable")]
    pub download_url: String,
    #[serde(deserialize_with = "nullable")]
    pub app_url: String,
    pub comments_count: i64,
    #[serde(deserialize_with = "nullable")]
    pub comments_url: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
}

#[derive(Debug, Serialize)]
struct UploadDetail {
    id: i64,
    title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    content_type: String,
    byte_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    width: i64,
    #[serde(skip_serializing_if = "is_zero")]
    height: i64,
    download_url: String,
    url: String,
    creator: String,
    created_at: String,
    updated_at: String,
    comments_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comments: Vec<CommentOutput>,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain; charset=utf-8"),
    ("md", "text/markdown; charset=utf-8"),
    ("csv", "text/csv; charset=utf-8"),
    ("html", "text/html; charset=utf-8"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("mp4", "video/mp4"),
    ("mp3", "audio/mpeg"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
];

/// Content type from the file extension, `application/octet-stream` if unknown.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

fn attachment_path(file_name: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("name", file_name)
        .finish();
    format!("/attachments.json?{query}")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Attachment {
    attachable_sgid: String,
}

#[derive(Default)]
pub struct UploadFile;

impl Command for UploadFile {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let file = Path::new(required(args, "file path")?);
        let data = std::fs::read(file)
            .with_context(|| format!("failed to read file {}", file.display()))?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let reply = ctx
            .client()?
            .upload(&attachment_path(&file_name), data, content_type_for(file))?;
        let attachment: Attachment = serde_json::from_value(reply)?;
        if attachment.attachable_sgid.is_empty() {
            bail!("upload response did not include an attachable_sgid");
        }

        Ok(json!({
            "status": "ok",
            "attachable_sgid": attachment.attachable_sgid,
            "message": format!("File '{file_name}' uploaded"),
        }))
    }
}

#[derive(Default)]
pub struct Uploads;

impl Command for Uploads {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let vault_id = required(&rest, "vault_id")?;
        let uploads: Vec<Upload> = ctx
            .client()?
            .get_all_as(&format!("/buckets/{project_id}/vaults/{vault_id}/uploads.json"))?;

        let uploads: Vec<Value> = uploads
            .into_iter()
            .map(|u| {
                json!({
                    "id": u.id,
                    "title": u.title,
                    "content_type": u.content_type,
                    "byte_size": u.byte_size,
                    "creator": u.creator.name,
                    "created_at": u.created_at,
                })
            })
            .collect();
        Ok(json!({
            "project_id": numeric_id(&project_id),
            "vault_id": numeric_id(vault_id),
            "uploads": uploads,
        }))
    }
}

#[derive(Default)]
pub struct UploadView;

impl Command for UploadView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: ViewArgs = parse_args("upload-view", &rest)?;
        let Some(upload_id) = args.id else {
            bail!("upload_id required");
        };

        let cl = ctx.client()?;
        let upload: Upload = cl.get_as(&format!("/buckets/{project_id}/uploads/{upload_id}.json"))?;
        let comments = if args.comments && !upload.comments_url.is_empty() {
            fetch_comments(cl, &upload.comments_url)?
        } else {
            Vec::new()
        };

        Ok(serde_json::to_value(UploadDetail {
            id: upload.id,
            title: upload.title,
            description: strip_html(&upload.description),
            content_type: upload.content_type,
            byte_size: upload.byte_size,
            width: upload.width,
            height: upload.height,
            download_url: upload.download_url,
            url: upload.app_url,
            creator: upload.creator.name,
            created_at: upload.created_at,
            updated_at: upload.updated_at,
            comments_count: upload.comments_count,
            comments,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for(Path::new("shot.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("/tmp/report.pdf")), "application/pdf");
        assert_eq!(content_type_for(Path::new("blob.xyz")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("Makefile")), "application/octet-stream");
    }

    #[test]
    fn attachment_name_is_encoded() {
        assert_eq!(
            attachment_path("my notes.txt"),
            "/attachments.json?name=my+notes.txt"
        );
    }
}
