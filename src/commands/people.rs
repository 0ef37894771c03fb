// People directory: everyone on the account, a project's members, the
// current user, and project access changes.

use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{nullable, numeric_id, parse_id_list};
use super::{parse_args, required, Command, Context};
use crate::api::ApiClient;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Company {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Person {
    pub id: i64,
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub email_address: String,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub bio: String,
    #[serde(deserialize_with = "nullable")]
    pub location: String,
    pub admin: bool,
    pub owner: bool,
    pub client: bool,
    pub employee: bool,
    #[serde(deserialize_with = "nullable")]
    pub time_zone: String,
    #[serde(deserialize_with = "nullable")]
    pub avatar_url: String,
    #[serde(deserialize_with = "nullable")]
    pub created_at: String,
    #[serde(deserialize_with = "nullable")]
    pub company: Company,
}

/// One line of a people listing.
#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub admin: bool,
    pub owner: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
}

impl From<Person> for PersonSummary {
    fn from(p: Person) -> Self {
        PersonSummary {
            id: p.id,
            name: p.name,
            email: p.email_address,
            title: p.title,
            admin: p.admin,
            owner: p.owner,
            company: p.company.name,
            location: p.location,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonDetail {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bio: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
    pub admin: bool,
    pub owner: bool,
    pub client: bool,
    pub employee: bool,
    pub time_zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub avatar_url: String,
    pub created_at: String,
}

impl From<Person> for PersonDetail {
    fn from(p: Person) -> Self {
        PersonDetail {
            id: p.id,
            name: p.name,
            email: p.email_address,
            title: p.title,
            bio: p.bio,
            location: p.location,
            admin: p.admin,
            owner: p.owner,
            client: p.client,
            employee: p.employee,
            time_zone: p.time_zone,
            company: p.company.name,
            avatar_url: p.avatar_url,
            created_at: p.created_at,
        }
    }
}

fn list_people(cl: &ApiClient, path: &str) -> Result<Vec<PersonSummary>> {
    let people: Vec<Person> = cl.get_all_as(path)?;
    Ok(people.into_iter().map(PersonSummary::from).collect())
}

#[derive(Default)]
pub struct People;

impl Command for People {
    fn run(&self, ctx: &Context, _args: &[String]) -> Result<Value> {
        let people = list_people(ctx.client()?, "/people.json")?;
        Ok(json!({ "count": people.len(), "people": people }))
    }
}

#[derive(Default)]
pub struct PeoplePingable;

impl Command for PeoplePingable {
    fn run(&self, ctx: &Context, _args: &[String]) -> Result<Value> {
        let people = list_people(ctx.client()?, "/circles/people.json")?;
        Ok(json!({ "count": people.len(), "people": people }))
    }
}

#[derive(Default)]
pub struct PersonView;

impl Command for PersonView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let person_id = required(args, "person_id")?;
        let person: Person = ctx.client()?.get_as(&format!("/people/{person_id}.json"))?;
        Ok(serde_json::to_value(PersonDetail::from(person))?)
    }
}

#[derive(Default)]
pub struct MyProfile;

impl Command for MyProfile {
    fn run(&self, ctx: &Context, _args: &[String]) -> Result<Value> {
        let person: Person = ctx.client()?.get_as("/my/profile.json")?;
        Ok(serde_json::to_value(PersonDetail::from(person))?)
    }
}

#[derive(Default)]
pub struct PeopleProject;

impl Command for PeopleProject {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let people = list_people(ctx.client()?, &format!("/projects/{project_id}/people.json"))?;
        Ok(json!({
            "project_id": numeric_id(&project_id),
            "count": people.len(),
            "people": people,
        }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "project-access")]
struct AccessArgs {
    /// Comma-separated person ids to add.
    #[arg(long)]
    grant: Option<String>,
    /// Comma-separated person ids to remove.
    #[arg(long)]
    revoke: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AccessChange {
    granted: Vec<Person>,
    revoked: Vec<Person>,
}

#[derive(Default)]
pub struct ProjectAccess;

impl Command for ProjectAccess {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: AccessArgs = parse_args("project-access", &rest)?;

        let mut payload = serde_json::Map::new();
        if let Some(grant) = args.grant.as_deref().filter(|s| !s.is_empty()) {
            payload.insert("grant".into(), json!(parse_id_list(grant)));
        }
        if let Some(revoke) = args.revoke.as_deref().filter(|s| !s.is_empty()) {
            payload.insert("revoke".into(), json!(parse_id_list(revoke)));
        }
        if payload.is_empty() {
            bail!("at least one of --grant or --revoke required (comma-separated person IDs)");
        }

        let cl = ctx.client()?;
        let reply = cl.put(&format!("/projects/{project_id}/people/users.json"), &payload)?;
        let change: AccessChange = if reply.is_null() {
            AccessChange::default()
        } else {
            serde_json::from_value(reply)?
        };

        let mut out = json!({ "status": "ok", "message": "Project access updated" });
        let names = |people: Vec<Person>| people.into_iter().map(|p| p.name).collect::<Vec<_>>();
        if !change.granted.is_empty() {
            out["granted"] = json!(names(change.granted));
        }
        if !change.revoked.is_empty() {
            out["revoked"] = json!(names(change.revoked));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_drops_empty_optional_fields() {
        let person: Person = serde_json::from_value(json!({
            "id": 7,
            "name": "Ada",
            "email_address": "ada@example.com",
            "admin": true
        }))
        .unwrap();
        let out = serde_json::to_value(PersonSummary::from(person)).unwrap();
        assert_eq!(
            out,
            json!({"id": 7, "name": "Ada", "email": "ada@example.com", "admin": true, "owner": false})
        );
    }

    #[test]
    fn detail_flattens_company() {
        let person: Person = serde_json::from_value(json!({
            "id": 1,
            "name": "Grace",
            "company": {"id": 3, "name": "Navy"},
            "time_zone": "UTC"
        }))
        .unwrap();
        let out = serde_json::to_value(PersonDetail::from(person)).unwrap();
        assert_eq!(out["company"], "Navy");
        assert_eq!(out["time_zone"], "UTC");
        assert!(out.get("bio").is_none());
    }
}
