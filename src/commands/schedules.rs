// Project schedule: calendar entries listed through the `schedule` dock
// entry, viewed and created individually.

use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{fetch_comments, fetch_dock, nullable, strip_html, CommentOutput, Creator};
use super::messages::ViewArgs;
use super::{parse_args, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub entries_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleEntry {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub summary: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub starts_at: String,
    #[serde(deserialize_with = "nullable")]
    pub ends_at: String,
    pub all_day: bool,
    pub created_at: String,
    pub updated_at: String,
    pub comments_count: i64,
    #[serde(deserialize_with = "nullable")]
    pub comments_url: String,
    #[serde(deserialize_with = "nullable")]
    pub app_url: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
    #[serde(deserialize_with = "nullable")]
    pub participants: Vec<Creator>,
}

#[derive(Debug, Serialize)]
struct EntryDetail {
    id: i64,
    summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    starts_at: String,
    ends_at: String,
    all_day: bool,
    creator: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    participants: Vec<String>,
    created_at: String,
    updated_at: String,
    comments_count: i64,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comments: Vec<CommentOutput>,
}

#[derive(Default)]
pub struct ScheduleView;

impl Command for ScheduleView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let cl = ctx.client()?;
        let (project, schedule): (_, Schedule) = fetch_dock(cl, &project_id, "schedule")?;
        let entries: Vec<ScheduleEntry> = cl.get_all_as(&schedule.entries_url)?;

        let entries: Vec<Value> = entries
            .into_iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "summary": e.summary,
                    "starts_at": e.starts_at,
                    "ends_at": e.ends_at,
                    "all_day": e.all_day,
                })
            })
            .collect();
        Ok(json!({
            "project_id": project.id,
            "schedule_id": schedule.id,
            "entries": entries,
        }))
    }
}

#[derive(Default)]
pub struct EntryView;

impl Command for EntryView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: ViewArgs = parse_args("event", &rest)?;
        let Some(entry_id) = args.id else {
            bail!("entry_id required");
        };

        let cl = ctx.client()?;
        let entry: ScheduleEntry =
            cl.get_as(&format!("/buckets/{project_id}/schedule_entries/{entry_id}.json"))?;
        let comments = if args.comments && !entry.comments_url.is_empty() {
            fetch_comments(cl, &entry.comments_url)?
        } else {
            Vec::new()
        };

        Ok(serde_json::to_value(EntryDetail {
            id: entry.id,
            summary: entry.summary,
            description: strip_html(&entry.description),
            starts_at: entry.starts_at,
            ends_at: entry.ends_at,
            all_day: entry.all_day,
            creator: entry.creator.name,
            participants: entry.participants.into_iter().map(|p| p.name).collect(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            comments_count: entry.comments_count,
            url: entry.app_url,
            comments,
        })?)
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "event-create")]
struct EntryCreateArgs {
    #[arg(long)]
    summary: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// ISO 8601 start time.
    #[arg(long)]
    starts_at: Option<String>,
    /// ISO 8601 end time.
    #[arg(long)]
    ends_at: Option<String>,
    #[arg(long)]
    all_day: bool,
}

#[derive(Debug, PartialEq, Serialize)]
struct NewEntry {
    summary: String,
    starts_at: String,
    ends_at: String,
    all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl NewEntry {
    fn from_args(args: EntryCreateArgs) -> Result<Self> {
        let Some(summary) = args.summary.filter(|s| !s.is_empty()) else {
            bail!("--summary required");
        };
        let Some(starts_at) = args.starts_at.filter(|s| !s.is_empty()) else {
            bail!("--starts-at required");
        };
        let Some(ends_at) = args.ends_at.filter(|s| !s.is_empty()) else {
            bail!("--ends-at required");
        };
        Ok(NewEntry {
            summary,
            starts_at,
            ends_at,
            all_day: args.all_day,
            description: args.description.filter(|d| !d.is_empty()),
        })
    }
}

#[derive(Default)]
pub struct EntryCreate;

impl Command for EntryCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let payload = NewEntry::from_args(parse_args("event-create", &rest)?)?;

        let cl = ctx.client()?;
        let (_, schedule): (_, Schedule) = fetch_dock(cl, &project_id, "schedule")?;
        let created: ScheduleEntry = cl.post_as(&schedule.entries_url, &payload)?;
        Ok(json!({
            "status": "ok",
            "id": created.id,
            "summary": created.summary,
            "message": format!("Event '{}' created", created.summary),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_args(args: &[&str]) -> EntryCreateArgs {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_args("event-create", &args).unwrap()
    }

    #[test]
    fn new_entry_from_flags() {
        let entry = NewEntry::from_args(entry_args(&[
            "--summary",
            "Offsite",
            "--starts-at",
            "2024-05-01T09:00:00Z",
            "--ends-at",
            "2024-05-01T17:00:00Z",
            "--all-day",
        ]))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "summary": "Offsite",
                "starts_at": "2024-05-01T09:00:00Z",
                "ends_at": "2024-05-01T17:00:00Z",
                "all_day": true
            })
        );
    }

    #[test]
    fn new_entry_checks_required_flags_in_order() {
        let err = NewEntry::from_args(entry_args(&["--starts-at", "x"])).unwrap_err();
        assert_eq!(err.to_string(), "--summary required");
        let err = NewEntry::from_args(entry_args(&["--summary", "s", "--starts-at", "x"])).unwrap_err();
        assert_eq!(err.to_string(), "--ends-at required");
    }
}
