// Card tables (kanban boards): columns, cards, moves, and the steps
// (checklist items) inside a card. A project's board is found through its
// `kanban_board` dock entry; everything below it is addressed by id.

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{
    coalesce, fetch_comments, fetch_dock, nullable, numeric_id, strip_html, CommentOutput, Creator,
};
use super::messages::ViewArgs;
use super::{parse_args, required, Command, Context};
use crate::api::ApiClient;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Column {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub color: String,
    pub cards_count: i64,
    #[serde(deserialize_with = "nullable", skip_serializing)]
    pub cards_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CardTable {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub lists: Vec<Column>,
}

impl CardTable {
    /// Column whose title matches `name`, ignoring case.
    fn column_named(&self, name: &str) -> Result<&Column> {
        self.lists
            .iter()
            .find(|c| c.title.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let available: Vec<&str> = self.lists.iter().map(|c| c.title.as_str()).collect();
                anyhow!(
                    "column '{name}' not found. Available columns: {}",
                    available.join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Step {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    pub completed: bool,
    pub due_on: Option<String>,
    pub position: i64,
    #[serde(deserialize_with = "nullable")]
    pub assignees: Vec<Creator>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Card {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(deserialize_with = "nullable")]
    pub app_url: String,
    pub comments_count: i64,
    #[serde(deserialize_with = "nullable")]
    pub comments_url: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
    #[serde(deserialize_with = "nullable")]
    pub assignees: Vec<Creator>,
    #[serde(deserialize_with = "nullable")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Serialize)]
struct StepOutput {
    id: i64,
    title: String,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_on: Option<String>,
    position: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<String>,
}

impl From<Step> for StepOutput {
    fn from(step: Step) -> Self {
        StepOutput {
            id: step.id,
            title: step.title,
            completed: step.completed,
            due_on: step.due_on.filter(|d| !d.is_empty()),
            position: step.position,
            assignees: step.assignees.into_iter().map(|a| a.name).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CardDetail {
    id: i64,
    title: String,
    creator: String,
    created_at: String,
    updated_at: String,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<String>,
    description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    steps: Vec<StepOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comments: Vec<CommentOutput>,
}

fn fetch_card_table(cl: &ApiClient, project_id: &str, board_id: &str) -> Result<CardTable> {
    Ok(cl.get_as(&format!("/buckets/{project_id}/card_tables/{board_id}.json"))?)
}

#[derive(Default)]
pub struct Boards;

impl Command for Boards {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let (project, board): (_, CardTable) =
            fetch_dock(ctx.client()?, &project_id, "kanban_board")?;

        let columns: Vec<Value> = board
            .lists
            .iter()
            .map(|c| json!({ "title": c.title, "cards_count": c.cards_count }))
            .collect();
        Ok(json!({
            "project_id": project.id,
            "project_name": project.name,
            "board_id": board.id,
            "board_title": board.title,
            "columns": columns,
        }))
    }
}

#[derive(Default)]
pub struct Columns;

impl Command for Columns {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let board_id = required(&rest, "board_id")?;
        let board = fetch_card_table(ctx.client()?, &project_id, board_id)?;
        Ok(json!({
            "board_id": board.id,
            "board_title": board.title,
            "columns": board.lists,
        }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "cards")]
struct CardsArgs {
    board_id: Option<String>,
    /// Only columns whose title contains this text.
    #[arg(long)]
    column: Option<String>,
}

#[derive(Default)]
pub struct Cards;

impl Command for Cards {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: CardsArgs = parse_args("cards", &rest)?;
        let Some(board_id) = args.board_id else {
            bail!("usage: basecamp cards [project_id] <board_id> [--column <name>]");
        };
        let filter = args.column.map(|c| c.to_lowercase()).filter(|c| !c.is_empty());

        let cl = ctx.client()?;
        let board = fetch_card_table(cl, &project_id, &board_id)?;

        let mut columns = Vec::new();
        for column in &board.lists {
            if let Some(filter) = &filter {
                if !column.title.to_lowercase().contains(filter.as_str()) {
                    continue;
                }
            }
            if column.cards_count == 0 {
                continue;
            }
            let cards: Vec<Card> = cl.get_all_as(&column.cards_url)?;
            let cards: Vec<Value> = cards
                .into_iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "title": c.title,
                        "creator": coalesce(&[c.creator.name.as_str(), "Unknown"]),
                    })
                })
                .collect();
            columns.push(json!({ "column": column.title, "cards": cards }));
        }

        Ok(json!({
            "board_id": board.id,
            "board_title": board.title,
            "columns": columns,
        }))
    }
}

#[derive(Default)]
pub struct CardView;

impl Command for CardView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: ViewArgs = parse_args("card", &rest)?;
        let Some(card_id) = args.id else {
            bail!("usage: basecamp card [project_id] <card_id> [--comments]");
        };

        let cl = ctx.client()?;
        let card: Card = cl.get_as(&format!("/buckets/{project_id}/card_tables/cards/{card_id}.json"))?;
        let comments = if args.comments && card.comments_count > 0 {
            fetch_comments(cl, &card.comments_url)?
        } else {
            Vec::new()
        };

        let description =
            strip_html(coalesce(&[card.content.as_str(), card.description.as_str(), "No description"]));
        Ok(serde_json::to_value(CardDetail {
            id: card.id,
            title: card.title,
            creator: card.creator.name,
            created_at: card.created_at,
            updated_at: card.updated_at,
            url: card.app_url,
            assignees: card.assignees.into_iter().map(|a| a.name).collect(),
            description,
            steps: card.steps.into_iter().map(StepOutput::from).collect(),
            comments,
        })?)
    }
}

/// Body for creating or editing a card; unset fields are left out.
#[derive(Debug, Default, Serialize)]
struct CardFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_on: Option<String>,
}

impl CardFields {
    fn new(title: Option<String>, content: Option<String>, due: Option<String>) -> Self {
        CardFields {
            title: title.filter(|v| !v.is_empty()),
            content: content.filter(|v| !v.is_empty()),
            due_on: due.filter(|v| !v.is_empty()),
        }
    }

    fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.due_on.is_none()
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "card-create")]
struct CardCreateArgs {
    board_id: Option<String>,
    /// Column id to create the card in.
    #[arg(long)]
    column: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// Due date, `YYYY-MM-DD`.
    #[arg(long)]
    due: Option<String>,
}

#[derive(Default)]
pub struct CardCreate;

impl Command for CardCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: CardCreateArgs = parse_args("card-create", &rest)?;
        if args.board_id.is_none() {
            bail!("board_id required");
        }
        let Some(column_id) = args.column.filter(|c| !c.is_empty()) else {
            bail!("--column required (column ID)");
        };
        let fields = CardFields::new(args.title, args.content, args.due);
        if fields.title.is_none() {
            bail!("--title required");
        }

        let created: Card = ctx.client()?.post_as(
            &format!("/buckets/{project_id}/card_tables/lists/{column_id}/cards.json"),
            &fields,
        )?;
        Ok(json!({
            "status": "ok",
            "id": created.id,
            "title": created.title,
            "message": format!("Card '{}' created", created.title),
        }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "card-update")]
struct CardUpdateArgs {
    card_id: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    due: Option<String>,
}

#[derive(Default)]
pub struct CardUpdate;

impl Command for CardUpdate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: CardUpdateArgs = parse_args("card-update", &rest)?;
        let Some(card_id) = args.card_id else {
            bail!("card_id required");
        };
        let fields = CardFields::new(args.title, args.content, args.due);
        if fields.is_empty() {
            bail!("at least one of --title, --content, or --due required");
        }

        let updated: Card = ctx
            .client()?
            .put_as(&format!("/buckets/{project_id}/card_tables/cards/{card_id}.json"), &fields)?;
        Ok(json!({
            "status": "ok",
            "id": updated.id,
            "title": updated.title,
            "message": format!("Card '{}' updated", updated.title),
        }))
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "move")]
struct MoveArgs {
    board_id: Option<String>,
    card_id: Option<String>,
    /// Target column title.
    #[arg(long)]
    to: Option<String>,
}

#[derive(Default)]
pub struct Move;

impl Command for Move {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: MoveArgs = parse_args("move", &rest)?;
        let (Some(board_id), Some(card_id)) = (args.board_id, args.card_id) else {
            bail!("usage: basecamp move [project_id] <board_id> <card_id> --to <column>");
        };
        let Some(target) = args.to.filter(|t| !t.is_empty()) else {
            bail!("--to <column> flag is required");
        };

        let cl = ctx.client()?;
        let board = fetch_card_table(cl, &project_id, &board_id)?;
        let column = board.column_named(&target)?;

        cl.post(
            &format!("/buckets/{project_id}/card_tables/cards/{card_id}/moves.json"),
            &json!({ "column_id": column.id }),
        )?;
        Ok(json!({
            "status": "ok",
            "card_id": card_id,
            "column": column.title,
            "message": format!("Card {card_id} moved to '{}'", column.title),
        }))
    }
}

/// Body for creating or editing a step.
#[derive(Debug, Default, Serialize)]
struct StepFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_on: Option<String>,
    /// Comma-separated person ids, passed through as given.
    #[serde(skip_serializing_if = "Option::is_none")]
    assignees: Option<String>,
}

#[derive(Parser, Debug, Default)]
struct StepArgs {
    id: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    due: Option<String>,
    #[arg(long)]
    assignees: Option<String>,
}

impl StepArgs {
    fn fields(self) -> (Option<String>, StepFields) {
        let fields = StepFields {
            title: self.title.filter(|v| !v.is_empty()),
            due_on: self.due.filter(|v| !v.is_empty()),
            assignees: self.assignees.filter(|v| !v.is_empty()),
        };
        (self.id, fields)
    }
}

#[derive(Default)]
pub struct StepCreate;

impl Command for StepCreate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let (card_id, fields) = parse_args::<StepArgs>("step-create", &rest)?.fields();
        let Some(card_id) = card_id else {
            bail!("card_id required");
        };
        if fields.title.is_none() {
            bail!("--title required");
        }

        let created: Step = ctx.client()?.post_as(
            &format!("/buckets/{project_id}/card_tables/cards/{card_id}/steps.json"),
            &fields,
        )?;
        Ok(json!({
            "status": "ok",
            "id": created.id,
            "title": created.title,
            "message": format!("Step '{}' created", created.title),
        }))
    }
}

#[derive(Default)]
pub struct StepUpdate;

impl Command for StepUpdate {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let (step_id, fields) = parse_args::<StepArgs>("step-update", &rest)?.fields();
        let Some(step_id) = step_id else {
            bail!("step_id required");
        };
        if fields.title.is_none() && fields.due_on.is_none() && fields.assignees.is_none() {
            bail!("at least one of --title, --due, or --assignees required");
        }

        let updated: Step = ctx
            .client()?
            .put_as(&format!("/buckets/{project_id}/card_tables/steps/{step_id}.json"), &fields)?;
        Ok(json!({
            "status": "ok",
            "id": updated.id,
            "title": updated.title,
            "message": format!("Step '{}' updated", updated.title),
        }))
    }
}

fn set_step_completion(ctx: &Context, args: &[String], on: bool) -> Result<Value> {
    let (project_id, rest) = ctx.split_project(args)?;
    let step_id = required(&rest, "step_id")?;
    let completion = if on { "on" } else { "off" };
    ctx.client()?.put(
        &format!("/buckets/{project_id}/card_tables/steps/{step_id}/completions.json"),
        &json!({ "completion": completion }),
    )?;
    let message = if on { "Step completed" } else { "Step uncompleted" };
    Ok(json!({ "status": "ok", "step_id": step_id, "message": message }))
}

#[derive(Default)]
pub struct StepComplete;

impl Command for StepComplete {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        set_step_completion(ctx, args, true)
    }
}

#[derive(Default)]
pub struct StepUncomplete;

impl Command for StepUncomplete {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        set_step_completion(ctx, args, false)
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "step-reposition")]
struct StepRepositionArgs {
    card_id: Option<String>,
    step_id: Option<String>,
    #[arg(long)]
    position: Option<u32>,
}

#[derive(Default)]
pub struct StepReposition;

impl Command for StepReposition {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: StepRepositionArgs = parse_args("step-reposition", &rest)?;
        let Some(card_id) = args.card_id else {
            bail!("card_id required");
        };
        let Some(step_id) = args.step_id else {
            bail!("step_id required");
        };
        let Some(position) = args.position else {
            bail!("--position required");
        };

        ctx.client()?.post(
            &format!("/buckets/{project_id}/card_tables/cards/{card_id}/positions.json"),
            &json!({ "source_id": numeric_id(&step_id), "position": position }),
        )?;
        Ok(json!({
            "status": "ok",
            "step_id": step_id,
            "position": position,
            "message": format!("Step repositioned to {position}"),
        }))
    }
}
