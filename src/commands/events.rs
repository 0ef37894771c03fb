// Activity feed: account-wide, per project, or per recording.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{nullable, numeric_id, Creator};
use super::{required, Command, Context};
use crate::api::ApiClient;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RecordingRef {
    id: i64,
    #[serde(deserialize_with = "nullable")]
    title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct BucketRef {
    id: i64,
    #[serde(deserialize_with = "nullable")]
    name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Event {
    id: i64,
    action: String,
    created_at: String,
    #[serde(deserialize_with = "nullable")]
    recording_type: String,
    #[serde(deserialize_with = "nullable")]
    creator: Creator,
    #[serde(deserialize_with = "nullable")]
    recording: RecordingRef,
    #[serde(deserialize_with = "nullable")]
    bucket: BucketRef,
}

#[derive(Debug, Serialize)]
struct EventSummary {
    id: i64,
    action: String,
    recording_type: String,
    recording_id: i64,
    recording_title: String,
    project_id: i64,
    project_name: String,
    creator: String,
    created_at: String,
}

impl From<Event> for EventSummary {
    fn from(e: Event) -> Self {
        EventSummary {
            id: e.id,
            action: e.action,
            recording_type: e.recording_type,
            recording_id: e.recording.id,
            recording_title: e.recording.title,
            project_id: e.bucket.id,
            project_name: e.bucket.name,
            creator: e.creator.name,
            created_at: e.created_at,
        }
    }
}

fn list_events(cl: &ApiClient, path: &str) -> Result<Vec<EventSummary>> {
    let events: Vec<Event> = cl.get_all_as(path)?;
    Ok(events.into_iter().map(EventSummary::from).collect())
}

#[derive(Default)]
pub struct Events;

impl Command for Events {
    fn run(&self, ctx: &Context, _args: &[String]) -> Result<Value> {
        let events = list_events(ctx.client()?, "/events.json")?;
        Ok(json!({ "count": events.len(), "events": events }))
    }
}

#[derive(Default)]
pub struct EventsProject;

impl Command for EventsProject {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let events = list_events(ctx.client()?, &format!("/buckets/{project_id}/events.json"))?;
        Ok(json!({
            "project_id": numeric_id(&project_id),
            "count": events.len(),
            "events": events,
        }))
    }
}

#[derive(Default)]
pub struct EventsRecording;

impl Command for EventsRecording {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let recording_id = required(&rest, "recording_id")?;
        let events = list_events(
            ctx.client()?,
            &format!("/buckets/{project_id}/recordings/{recording_id}/events.json"),
        )?;
        Ok(json!({
            "project_id": numeric_id(&project_id),
            "recording_id": numeric_id(recording_id),
            "count": events.len(),
            "events": events,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_summary_flattens_bucket_and_recording() {
        let event: Event = serde_json::from_value(json!({
            "id": 1,
            "action": "completed",
            "recording_type": "Todo",
            "created_at": "2024-01-01T00:00:00Z",
            "creator": {"id": 2, "name": "Ada"},
            "recording": {"id": 3, "title": "Ship"},
            "bucket": {"id": 4, "name": "Launch", "type": "Project"}
        }))
        .unwrap();
        let out = serde_json::to_value(EventSummary::from(event)).unwrap();
        assert_eq!(out["recording_title"], "Ship");
        assert_eq!(out["project_name"], "Launch");
        assert_eq!(out["project_id"], 4);
        assert_eq!(out["creator"], "Ada");
    }
}
