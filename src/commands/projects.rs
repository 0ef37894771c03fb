use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::helpers::nullable;
use super::{Command, Context};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub status: String,
}

#[derive(Default)]
pub struct Projects;

impl Command for Projects {
    fn run(&self, ctx: &Context, _args: &[String]) -> Result<Value> {
        let projects: Vec<Project> = ctx.client()?.get_all_as("/projects.json")?;
        Ok(serde_json::to_value(projects)?)
    }
}
