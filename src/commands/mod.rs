// Command layer: a fixed table from command name to constructor, plus the
// shared `Context` every command runs with. Commands return the JSON value
// to print; the dispatcher owns all output and the exit code.

pub mod auth;
pub mod campfire;
pub mod cards;
pub mod documents;
pub mod events;
pub mod helpers;
pub mod message_types;
pub mod messages;
pub mod people;
pub mod projects;
pub mod questionnaires;
pub mod recordings;
pub mod schedules;
pub mod search;
pub mod setup;
pub mod todos;
pub mod uploads;

use std::cell::OnceCell;
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use serde_json::Value;

use crate::api::ApiClient;
use crate::config::{self, Paths};
use crate::error::Error;
use crate::ui;

/// One CLI subcommand.
pub trait Command {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value>;
}

/// Registry entry; `factory` builds a fresh command per invocation.
pub struct CommandEntry {
    pub name: &'static str,
    pub args: &'static str,
    pub summary: &'static str,
    pub section: &'static str,
    pub factory: fn() -> Box<dyn Command>,
}

fn make<C: Command + Default + 'static>() -> Box<dyn Command> {
    Box::new(C::default())
}

macro_rules! entry {
    ($section:expr, $name:expr, $args:expr, $summary:expr, $ty:ty) => {
        CommandEntry {
            name: $name,
            args: $args,
            summary: $summary,
            section: $section,
            factory: make::<$ty>,
        }
    };
}

pub static COMMANDS: &[CommandEntry] = &[
    entry!("Setup", "init", "", "Configure credentials", setup::Init),
    entry!("Setup", "register", "", "Show values for registering an OAuth app", setup::Register),
    entry!("Setup", "auth", "", "Authenticate with OAuth", auth::Auth),
    entry!("Projects", "projects", "", "List all projects", projects::Projects),
    entry!("Boards", "boards", "[project_id]", "Show the project's card table", cards::Boards),
    entry!("Boards", "columns", "[project_id] <board_id>", "List columns in a board", cards::Columns),
    entry!("Boards", "cards", "[project_id] <board_id>", "List cards (--column <name> to filter)", cards::Cards),
    entry!("Boards", "card", "[project_id] <card_id>", "View card details (--comments for comments)", cards::CardView),
    entry!("Boards", "card-create", "[project_id] <board_id>", "Create card (--column, --title required)", cards::CardCreate),
    entry!("Boards", "card-update", "[project_id] <card_id>", "Update card (--title, --content, --due)", cards::CardUpdate),
    entry!("Boards", "move", "[project_id] <board_id> <card_id>", "Move card (--to <column> required)", cards::Move),
    entry!("Steps", "step-create", "[project_id] <card_id>", "Create step (--title required)", cards::StepCreate),
    entry!("Steps", "step-update", "[project_id] <step_id>", "Update step (--title, --due, --assignees)", cards::StepUpdate),
    entry!("Steps", "step-complete", "[project_id] <step_id>", "Mark step as complete", cards::StepComplete),
    entry!("Steps", "step-uncomplete", "[project_id] <step_id>", "Mark step as incomplete", cards::StepUncomplete),
    entry!("Steps", "step-reposition", "[project_id] <card_id> <step_id>", "Reposition step (--position required)", cards::StepReposition),
    entry!("Todos", "todolists", "[project_id]", "List todo lists", todos::Todolists),
    entry!("Todos", "todos", "[project_id] <todolist_id>", "List todos (--completed for completed)", todos::Todos),
    entry!("Todos", "todo", "[project_id] <todo_id>", "View todo details", todos::TodoView),
    entry!("Todos", "todo-create", "[project_id] <todolist_id>", "Create todo (--content required)", todos::TodoCreate),
    entry!("Todos", "todo-complete", "[project_id] <todo_id>", "Mark todo as complete", todos::TodoComplete),
    entry!("Todos", "todo-uncomplete", "[project_id] <todo_id>", "Mark todo as incomplete", todos::TodoUncomplete),
    entry!("Todos", "todo-reposition", "[project_id] <todo_id>", "Move todo within its list (--position required)", todos::TodoReposition),
    entry!("Todos", "todolist-groups", "[project_id] <todolist_id>", "List groups in a todo list", todos::TodolistGroups),
    entry!("Todos", "todolist-group", "[project_id] <group_id>", "View a todo list group", todos::TodolistGroupView),
    entry!("Todos", "todolist-group-create", "[project_id] <todolist_id>", "Create group (--name required, --color)", todos::TodolistGroupCreate),
    entry!("Messages", "messages", "[project_id]", "List messages", messages::Messages),
    entry!("Messages", "message", "[project_id] <message_id>", "View message (--comments for comments)", messages::MessageView),
    entry!("Messages", "message-create", "[project_id]", "Create message (--subject required)", messages::MessageCreate),
    entry!("Messages", "message-types", "[project_id]", "List message types", message_types::MessageTypes),
    entry!("Messages", "message-type", "[project_id] <type_id>", "View message type", message_types::MessageTypeView),
    entry!("Messages", "message-type-create", "[project_id]", "Create message type (--name, --icon required)", message_types::MessageTypeCreate),
    entry!("Messages", "message-type-update", "[project_id] <type_id>", "Update message type (--name, --icon)", message_types::MessageTypeUpdate),
    entry!("Messages", "message-type-delete", "[project_id] <type_id>", "Delete message type", message_types::MessageTypeDelete),
    entry!("Comments", "comment-add", "[project_id] <recording_id>", "Add comment to recording (--content required)", messages::CommentAdd),
    entry!("Documents", "docs", "[project_id]", "List documents", documents::Docs),
    entry!("Documents", "doc", "[project_id] <doc_id>", "View document (--comments for comments)", documents::DocView),
    entry!("Documents", "doc-create", "[project_id]", "Create document (--title required, --content)", documents::DocCreate),
    entry!("Schedule", "schedule", "[project_id]", "List schedule entries", schedules::ScheduleView),
    entry!("Schedule", "event", "[project_id] <entry_id>", "View schedule entry (--comments for comments)", schedules::EntryView),
    entry!("Schedule", "event-create", "[project_id]", "Create entry (--summary, --starts-at, --ends-at required)", schedules::EntryCreate),
    entry!("Check-ins", "questionnaire", "[project_id]", "Show the project's check-ins", questionnaires::QuestionnaireView),
    entry!("Check-ins", "questions", "[project_id]", "List check-in questions", questionnaires::Questions),
    entry!("Check-ins", "question", "[project_id] <question_id>", "View question (--comments for comments)", questionnaires::QuestionView),
    entry!("Check-ins", "question-answers", "[project_id] <question_id>", "List answers to a question", questionnaires::QuestionAnswers),
    entry!("Check-ins", "question-answer", "[project_id] <answer_id>", "View answer (--comments for comments)", questionnaires::AnswerView),
    entry!("Campfire", "campfire", "[project_id]", "List campfire messages", campfire::Campfire),
    entry!("Campfire", "campfire-post", "[project_id]", "Post to campfire (--content required)", campfire::CampfirePost),
    entry!("Search", "search", "<query>", "Search across all projects (--type, --project)", search::Search),
    entry!("People", "people", "", "List all people", people::People),
    entry!("People", "person", "<person_id>", "View person details", people::PersonView),
    entry!("People", "people-pingable", "", "List pingable people", people::PeoplePingable),
    entry!("People", "people-project", "[project_id]", "List people on a project", people::PeopleProject),
    entry!("People", "my-profile", "", "View your own profile", people::MyProfile),
    entry!("People", "project-access", "[project_id]", "Grant/revoke project access (--grant, --revoke ids)", people::ProjectAccess),
    entry!("Uploads", "upload", "<file>", "Upload a file (returns attachable_sgid)", uploads::UploadFile),
    entry!("Uploads", "uploads", "[project_id] <vault_id>", "List uploads in a vault", uploads::Uploads),
    entry!("Uploads", "upload-view", "[project_id] <upload_id>", "View upload (--comments for comments)", uploads::UploadView),
    entry!("Recordings", "archive", "[project_id] <recording_id>", "Archive a recording", recordings::Archive),
    entry!("Recordings", "unarchive", "[project_id] <recording_id>", "Unarchive a recording", recordings::Unarchive),
    entry!("Recordings", "trash", "[project_id] <recording_id>", "Trash a recording", recordings::Trash),
    entry!("Activity", "events", "", "List all events across all projects", events::Events),
    entry!("Activity", "events-project", "[project_id]", "List events in a project", events::EventsProject),
    entry!("Activity", "events-recording", "[project_id] <recording_id>", "List events for a recording", events::EventsRecording),
];

pub fn find(name: &str) -> Option<&'static CommandEntry> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// What every command runs against: where config lives, where we were
/// invoked from, and the API client (built on first use).
pub struct Context {
    paths: Paths,
    cwd: PathBuf,
    client: OnceCell<ApiClient>,
}

impl Context {
    pub fn new(paths: Paths, cwd: PathBuf) -> Self {
        Context {
            paths,
            cwd,
            client: OnceCell::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot determine working directory")?;
        Ok(Self::new(Paths::from_env(), cwd))
    }

    /// Use an already-built client instead of loading config and token.
    pub fn with_client(self, client: ApiClient) -> Self {
        let _ = self.client.set(client);
        self
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn client(&self) -> Result<&ApiClient> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = ApiClient::from_paths(&self.paths)?;
        Ok(self.client.get_or_init(|| client))
    }

    /// Project id from `.basecamp.yml`, in which case `args` is returned
    /// whole, or else the first positional argument.
    pub fn split_project(&self, args: &[String]) -> Result<(String, Vec<String>)> {
        if let Some(id) = config::find_project_id(&self.cwd)? {
            return Ok((id, args.to_vec()));
        }
        match args.split_first() {
            Some((id, rest)) => Ok((id.clone(), rest.to_vec())),
            None => bail!(
                "project_id required: provide as argument or create .basecamp.yml with project_id"
            ),
        }
    }
}

/// First positional after the project id, or an error naming it.
pub fn required<'a>(rest: &'a [String], what: &str) -> Result<&'a str> {
    match rest.first() {
        Some(v) => Ok(v.as_str()),
        None => bail!("{what} required"),
    }
}

/// Parse a command's flags. Positionals come first, flags may follow in any
/// order; clap rejects unknown flags.
pub fn parse_args<A: Parser>(name: &str, args: &[String]) -> Result<A> {
    Ok(A::try_parse_from(std::iter::once(name).chain(args.iter().map(String::as_str)))?)
}

/// Run `args` (without the binary name) and return the process exit code.
pub fn execute(args: &[String], version: &str) -> i32 {
    let Some(name) = args.first() else {
        print!("{}", help_text(version));
        return 1;
    };

    match name.as_str() {
        "version" | "--version" | "-v" => {
            println!("{version}");
            return 0;
        }
        "help" | "--help" | "-h" => {
            print!("{}", help_text(version));
            return 0;
        }
        _ => {}
    }

    let Some(entry) = find(name) else {
        ui::print_error(&anyhow::anyhow!("unknown command: {name}"));
        return 1;
    };

    let outcome = Context::from_env().and_then(|ctx| (entry.factory)().run(&ctx, &args[1..]));
    match outcome {
        Ok(value) => match ui::print_json(&value) {
            Ok(()) => 0,
            Err(e) => {
                ui::print_error(&e);
                1
            }
        },
        Err(err) => report(err),
    }
}

fn report(err: anyhow::Error) -> i32 {
    if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
        use clap::error::ErrorKind;
        if matches!(clap_err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            let _ = clap_err.print();
            return 0;
        }
        eprintln!("{}", ui::error_json(clap_err.render().to_string().trim()));
        return 1;
    }
    tracing::debug!(error = ?err, "command failed");
    if err.downcast_ref::<Error>().is_some_and(Error::needs_reauth) {
        tracing::warn!("credentials missing or rejected; run 'basecamp auth' to sign in again");
    }
    ui::print_error(&err);
    1
}

pub fn help_text(version: &str) -> String {
    let mut out = format!(
        "basecamp - Basecamp CLI {version}\n\nUsage: basecamp <command> [arguments] [flags]\n"
    );
    let mut section = "";
    for entry in COMMANDS {
        if entry.section != section {
            section = entry.section;
            out.push_str(&format!("\n{section}:\n"));
        }
        let usage = format!("{} {}", entry.name, entry.args);
        out.push_str(&format!("  {:<40}{}\n", usage.trim_end(), entry.summary));
    }
    out.push_str(&format!("\n  {:<40}{}\n", "version", "Show version"));
    out.push_str(
        "\nProject ID can be omitted if .basecamp.yml exists in current or parent directory:\n  project_id: 12345678\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn registry_names_are_unique() {
        let mut seen = HashSet::new();
        for entry in COMMANDS {
            assert!(seen.insert(entry.name), "duplicate command {}", entry.name);
        }
        assert!(find("auth").is_some());
        assert!(find("nope").is_none());
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text("1.2.3");
        assert!(help.contains("Basecamp CLI 1.2.3"));
        for entry in COMMANDS {
            assert!(help.contains(entry.name), "{} missing from help", entry.name);
        }
    }

    #[test]
    fn project_id_from_first_argument() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::new(Paths::in_dir(dir.path()), dir.path().to_path_buf());
        let (project, rest) = ctx.split_project(&strings(&["111", "222"])).unwrap();
        assert_eq!(project, "111");
        assert_eq!(rest, strings(&["222"]));
    }

    #[test]
    fn project_id_from_project_file_keeps_all_args() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(config::PROJECT_FILE), "project_id: 999\n").unwrap();
        let ctx = Context::new(Paths::in_dir(dir.path()), dir.path().to_path_buf());
        let (project, rest) = ctx.split_project(&strings(&["222"])).unwrap();
        assert_eq!(project, "999");
        assert_eq!(rest, strings(&["222"]));
    }

    #[test]
    fn missing_project_id_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::new(Paths::in_dir(dir.path()), dir.path().to_path_buf());
        let err = ctx.split_project(&[]).unwrap_err();
        assert!(err.to_string().starts_with("project_id required"));
    }

    #[test]
    fn client_without_config_fails_fast() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::new(Paths::in_dir(dir.path()), dir.path().to_path_buf());
        let err = ctx.client().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::Error>(),
            Some(crate::Error::ConfigNotFound)
        ));
    }

    #[test]
    fn unknown_command_exits_with_error() {
        assert_eq!(execute(&strings(&["definitely-not-a-command"]), "dev"), 1);
        assert_eq!(execute(&strings(&["version"]), "dev"), 0);
        assert_eq!(execute(&[], "dev"), 1);
    }

    #[derive(Parser, Debug)]
    struct Sample {
        positionals: Vec<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        comments: bool,
    }

    #[test]
    fn positionals_then_flags() {
        let parsed: Sample =
            parse_args("sample", &strings(&["12", "34", "--content", "hello", "--comments"])).unwrap();
        assert_eq!(parsed.positionals, strings(&["12", "34"]));
        assert_eq!(parsed.content.as_deref(), Some("hello"));
        assert!(parsed.comments);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = parse_args::<Sample>("sample", &strings(&["--bogus"])).unwrap_err();
        assert!(err.downcast_ref::<clap::Error>().is_some());
    }
}
