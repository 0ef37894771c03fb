// Automatic check-ins: the project's questionnaire, its questions, and the
// answers people post to them.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::helpers::{fetch_comments, fetch_dock, nullable, numeric_id, strip_html, CommentOutput, Creator};
use super::messages::ViewArgs;
use super::{parse_args, required, Command, Context};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Questionnaire {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub questions_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Question {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    /// Cadence as the API reports it; kept verbatim.
    pub schedule: Value,
    pub paused: bool,
    #[serde(deserialize_with = "nullable")]
    pub answers_url: String,
    pub comments_count: i64,
    #[serde(deserialize_with = "nullable")]
    pub comments_url: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
    #[serde(deserialize_with = "nullable")]
    pub app_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Answer {
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    #[serde(deserialize_with = "nullable")]
    pub group_on: String,
    pub comments_count: i64,
    #[serde(deserialize_with = "nullable")]
    pub comments_url: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
    #[serde(deserialize_with = "nullable")]
    pub app_url: String,
}

/// Shared tail of the question and answer views; `fields` leads the object.
#[derive(Debug, Serialize)]
struct Detail {
    #[serde(flatten)]
    fields: Value,
    creator: String,
    created_at: String,
    updated_at: String,
    comments_count: i64,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comments: Vec<CommentOutput>,
}

#[derive(Default)]
pub struct QuestionnaireView;

impl Command for QuestionnaireView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let (project, questionnaire): (_, Questionnaire) =
            fetch_dock(ctx.client()?, &project_id, "questionnaire")?;
        Ok(json!({
            "project_id": project.id,
            "project_name": project.name,
            "questionnaire_id": questionnaire.id,
            "title": questionnaire.title,
        }))
    }
}

#[derive(Default)]
pub struct Questions;

impl Command for Questions {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, _) = ctx.split_project(args)?;
        let cl = ctx.client()?;
        let (project, questionnaire): (_, Questionnaire) =
            fetch_dock(cl, &project_id, "questionnaire")?;
        let questions: Vec<Question> = cl.get_all_as(&questionnaire.questions_url)?;

        let questions: Vec<Value> = questions
            .into_iter()
            .map(|q| {
                json!({
                    "id": q.id,
                    "title": q.title,
                    "schedule": q.schedule,
                    "paused": q.paused,
                })
            })
            .collect();
        Ok(json!({
            "project_id": project.id,
            "questionnaire_id": questionnaire.id,
            "questions": questions,
        }))
    }
}

#[derive(Default)]
pub struct QuestionView;

impl Command for QuestionView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: ViewArgs = parse_args("question", &rest)?;
        let Some(question_id) = args.id else {
            bail!("question_id required");
        };

        let cl = ctx.client()?;
        let q: Question = cl.get_as(&format!("/buckets/{project_id}/questions/{question_id}.json"))?;
        let comments = if args.comments && !q.comments_url.is_empty() {
            fetch_comments(cl, &q.comments_url)?
        } else {
            Vec::new()
        };

        Ok(serde_json::to_value(Detail {
            fields: json!({
                "id": q.id,
                "title": q.title,
                "schedule": q.schedule,
                "paused": q.paused,
            }),
            creator: q.creator.name,
            created_at: q.created_at,
            updated_at: q.updated_at,
            comments_count: q.comments_count,
            url: q.app_url,
            comments,
        })?)
    }
}

#[derive(Default)]
pub struct QuestionAnswers;

impl Command for QuestionAnswers {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let question_id = required(&rest, "question_id")?;

        let cl = ctx.client()?;
        let q: Question = cl.get_as(&format!("/buckets/{project_id}/questions/{question_id}.json"))?;
        let answers: Vec<Answer> = cl.get_all_as(&q.answers_url)?;

        let answers: Vec<Value> = answers
            .into_iter()
            .map(|a| {
                json!({
                    "id": a.id,
                    "content": strip_html(&a.content),
                    "group_on": a.group_on,
                    "creator": a.creator.name,
                    "created_at": a.created_at,
                })
            })
            .collect();
        Ok(json!({ "question_id": numeric_id(question_id), "answers": answers }))
    }
}

#[derive(Default)]
pub struct AnswerView;

impl Command for AnswerView {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let (project_id, rest) = ctx.split_project(args)?;
        let args: ViewArgs = parse_args("question-answer", &rest)?;
        let Some(answer_id) = args.id else {
            bail!("answer_id required");
        };

        let cl = ctx.client()?;
        let a: Answer = cl.get_as(&format!("/buckets/{project_id}/question_answers/{answer_id}.json"))?;
        let comments = if args.comments && !a.comments_url.is_empty() {
            fetch_comments(cl, &a.comments_url)?
        } else {
            Vec::new()
        };

        Ok(serde_json::to_value(Detail {
            fields: json!({
                "id": a.id,
                "content": strip_html(&a.content),
                "group_on": a.group_on,
            }),
            creator: a.creator.name,
            created_at: a.created_at,
            updated_at: a.updated_at,
            comments_count: a.comments_count,
            url: a.app_url,
            comments,
        })?)
    }
}
