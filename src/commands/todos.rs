// To-do lists and to-dos. Lists are found through the project's `todoset`
// dock entry; to-dos are addressed by bucket (project) and id.

use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{fetch_dock, nullable, numeric_id, parse_id_list, strip_html, Creator};
use super::{parse_args, required, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TodoSet {
    pub id: i64,
    pub todolists_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Todolist {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub completed_ratio: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Todo {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub completed: bool,
    pub due_on: Option<String>,
    pub starts_on: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
    #[serde(deserialize_with = "nullable")]
    pub assignees: Vec<Creator>,
}

impl Todo {
    fn assignee_names(&self) -> Vec<String> {
        self.assignees.iter().map(|a| a.name.clone()).collect()
    }
}

#[derive(Debug, Serialize)]
struct TodoSummary {
    id: i64,
    content: String,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_on: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TodoDetail {
    id: i64,
    content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    starts_on: Option<String>,
    creator: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<String>,
}

#[derive(Default)]
pub struct Todolists;

impl Command for Todolists {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let cl = ctx.client()?;
        let (project, todoset): (_, TodoSet) = fetch_dock(cl, &project_id, "todoset")?;
        let lists: Vec<Todolist> = cl.get_all_as(&todoset.todolists_url)?;

        let lists: Vec<Value> = lists
            .into_iter()
            .map(|l| {
                json!({
                    "id": l.id,
                    "title": l.title,
                    "completed_ratio": l.completed_ratio,
                    "completed": l.completed,
                })
            })
            .collect();
        Ok(json!({
            "project_id": project.id,
            "todoset_id": todoset.id,
            "todolists": lists,
        }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "todos")]
struct TodosArgs {
    todolist_id: Option<String>,
    /// List completed to-dos instead of open ones.
    #[arg(long)]
    completed: bool,
}

#[derive(Default)]
pub struct Todos;

impl Command for Todos {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: TodosArgs = parse_args("todos", &rest)?;
        let Some(todolist_id) = args.todolist_id else {
            bail!("usage: basecamp todos [project_id] <todolist_id> [--completed]");
        };

        let mut path = format!("/buckets/{project_id}/todolists/{todolist_id}/todos.json");
        if args.completed {
            path.push_str("?completed=true");
        }
        let todos: Vec<Todo> = ctx.client()?.get_all_as(&path)?;

        let todos: Vec<TodoSummary> = todos
            .into_iter()
            .map(|t| TodoSummary {
                id: t.id,
                content: strip_html(&t.content),
                completed: t.completed,
                assignees: t.assignee_names(),
                due_on: t.due_on,
            })
            .collect();
        Ok(json!({ "todolist_id": numeric_id(&todolist_id), "todos": todos }))
    }
}

#[derive(Default)]
pub struct TodoView;

impl Command for TodoView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let todo_id = required(&rest, "todo_id")?;
        let todo: Todo = ctx
            .client()?
            .get_as(&format!("/buckets/{project_id}/todos/{todo_id}.json"))?;

        let detail = TodoDetail {
            id: todo.id,
            content: strip_html(&todo.content),
            description: strip_html(&todo.description),
            completed: todo.completed,
            creator: todo.creator.name.clone(),
            assignees: todo.assignee_names(),
            due_on: todo.due_on,
            starts_on: todo.starts_on,
        };
        Ok(serde_json::to_value(detail)?)
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "todo-create")]
struct TodoCreateArgs {
    todolist_id: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Due date, `YYYY-MM-DD`.
    #[arg(long)]
    due: Option<String>,
    /// Comma-separated person ids.
    #[arg(long)]
    assignees: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewTodo {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_on: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignee_ids: Vec<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    notify: bool,
}

impl NewTodo {
    fn from_args(args: TodoCreateArgs) -> Result<Self> {
        let content = args.content.filter(|c| !c.is_empty());
        let Some(content) = content else {
            bail!("--content is required");
        };
        let assignee_ids = args.assignees.as_deref().map(parse_id_list).unwrap_or_default();
        Ok(NewTodo {
            content,
            description: args.description.filter(|d| !d.is_empty()),
            due_on: args.due.filter(|d| !d.is_empty()),
            notify: !assignee_ids.is_empty(),
            assignee_ids,
        })
    }
}

#[derive(Default)]
pub struct TodoCreate;

impl Command for TodoCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let mut args: TodoCreateArgs = parse_args("todo-create", &rest)?;
        let Some(todolist_id) = args.todolist_id.take() else {
            bail!("usage: basecamp todo-create [project_id] <todolist_id> --content <text> [--due <date>] [--description <text>]");
        };
        let payload = NewTodo::from_args(args)?;

        let todo: Todo = ctx.client()?.post_as(
            &format!("/buckets/{project_id}/todolists/{todolist_id}/todos.json"),
            &payload,
        )?;
        Ok(json!({
            "status": "ok",
            "id": todo.id,
            "content": strip_html(&todo.content),
            "message": "Todo created",
        }))
    }
}

#[derive(Default)]
pub struct TodoComplete;

impl Command for TodoComplete {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let todo_id = required(&rest, "todo_id")?;
        ctx.client()?
            .post_empty(&format!("/buckets/{project_id}/todos/{todo_id}/completion.json"))?;
        Ok(json!({ "status": "ok", "todo_id": todo_id, "message": "Todo completed" }))
    }
}

#[derive(Default)]
pub struct TodoUncomplete;

impl Command for TodoUncomplete {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let todo_id = required(&rest, "todo_id")?;
        ctx.client()?
            .delete(&format!("/buckets/{project_id}/todos/{todo_id}/completion.json"))?;
        Ok(json!({ "status": "ok", "todo_id": todo_id, "message": "Todo uncompleted" }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "todo-reposition")]
struct RepositionArgs {
    todo_id: Option<String>,
    /// New 1-indexed position in the list.
    #[arg(long)]
    position: Option<u32>,
}

#[derive(Default)]
pub struct TodoReposition;

impl Command for TodoReposition {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: RepositionArgs = parse_args("todo-reposition", &rest)?;
        let Some(todo_id) = args.todo_id else {
            bail!("todo_id required");
        };
        let Some(position) = args.position.filter(|p| *p > 0) else {
            bail!("--position required (1-indexed)");
        };

        ctx.client()?.put(
            &format!("/buckets/{project_id}/todos/{todo_id}/position.json"),
            &json!({ "position": position }),
        )?;
        Ok(json!({
            "status": "ok",
            "todo_id": todo_id,
            "position": position,
            "message": format!("Todo repositioned to {position}"),
        }))
    }
}

/// A named section inside a to-do list; the API serves it as a todolist.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TodolistGroup {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    pub position: i64,
    #[serde(deserialize_with = "nullable")]
    pub color: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
struct GroupSummary {
    id: i64,
    name: String,
    position: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    color: String,
}

impl From<TodolistGroup> for GroupSummary {
    fn from(g: TodolistGroup) -> Self {
        GroupSummary {
            id: g.id,
            name: g.name,
            position: g.position,
            color: g.color,
        }
    }
}

#[derive(Default)]
pub struct TodolistGroups;

impl Command for TodolistGroups {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let todolist_id = required(&rest, "todolist_id")?;
        let groups: Vec<TodolistGroup> = ctx
            .client()?
            .get_all_as(&format!("/buckets/{project_id}/todolists/{todolist_id}/groups.json"))?;

        let groups: Vec<GroupSummary> = groups.into_iter().map(GroupSummary::from).collect();
        Ok(json!({
            "project_id": numeric_id(&project_id),
            "todolist_id": numeric_id(todolist_id),
            "groups": groups,
        }))
    }
}

#[derive(Default)]
pub struct TodolistGroupView;

impl Command for TodolistGroupView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let group_id = required(&rest, "group_id")?;
        let group: TodolistGroup = ctx
            .client()?
            .get_as(&format!("/buckets/{project_id}/todolists/{group_id}.json"))?;

        let (created_at, updated_at) = (group.created_at.clone(), group.updated_at.clone());
        let mut out = serde_json::to_value(GroupSummary::from(group))?;
        out["created_at"] = json!(created_at);
        out["updated_at"] = json!(updated_at);
        Ok(out)
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "todolist-group-create")]
struct GroupCreateArgs {
    todolist_id: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewGroup {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

#[derive(Default)]
pub struct TodolistGroupCreate;

impl Command for TodolistGroupCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: GroupCreateArgs = parse_args("todolist-group-create", &rest)?;
        let Some(todolist_id) = args.todolist_id else {
            bail!("todolist_id required");
        };
        let Some(name) = args.name.filter(|n| !n.is_empty()) else {
            bail!("--name required");
        };

        let group: TodolistGroup = ctx.client()?.post_as(
            &format!("/buckets/{project_id}/todolists/{todolist_id}/groups.json"),
            &NewGroup {
                name,
                color: args.color.filter(|c| !c.is_empty()),
            },
        )?;
        Ok(json!({
            "status": "ok",
            "id": group.id,
            "name": group.name,
            "message": format!("Group '{}' created", group.name),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_args(args: &[&str]) -> TodoCreateArgs {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_args("todo-create", &args).unwrap()
    }

    #[test]
    fn new_todo_payload_with_assignees() {
        let todo = NewTodo::from_args(create_args(&[
            "55",
            "--content",
            "Ship it",
            "--due",
            "2024-03-01",
            "--assignees",
            "1, 2,bogus",
        ]))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&todo).unwrap(),
            json!({
                "content": "Ship it",
                "due_on": "2024-03-01",
                "assignee_ids": [1, 2],
                "notify": true
            })
        );
    }

    #[test]
    fn new_todo_minimal_payload() {
        let todo = NewTodo::from_args(create_args(&["55", "--content", "Just this"])).unwrap();
        assert_eq!(serde_json::to_value(&todo).unwrap(), json!({"content": "Just this"}));
    }

    #[test]
    fn new_todo_requires_content() {
        let err = NewTodo::from_args(create_args(&["55"])).unwrap_err();
        assert_eq!(err.to_string(), "--content is required");
    }

    #[test]
    fn group_summary_omits_missing_color() {
        let group: TodolistGroup = serde_json::from_value(json!({
            "id": 8,
            "name": "Phase 1",
            "position": 1,
            "color": null
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(GroupSummary::from(group)).unwrap(),
            json!({"id": 8, "name": "Phase 1", "position": 1})
        );
    }

    #[test]
    fn todo_with_null_due_date() {
        let todo: Todo = serde_json::from_value(json!({
            "id": 3,
            "content": "<b>Write</b> docs",
            "due_on": null,
            "assignees": [{"id": 1, "name": "Ada"}]
        }))
        .unwrap();
        assert_eq!(todo.due_on, None);
        assert_eq!(todo.assignee_names(), vec!["Ada".to_string()]);
    }
}
