// Commands end to end against a mock Basecamp: dock navigation, pagination,
// project-file lookup and the JSON each command returns.

use std::path::PathBuf;

use basecamp_cli::api::ApiClient;
use basecamp_cli::commands::{find, Context};
use basecamp_cli::config::{Paths, PROJECT_FILE};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Run command `name` with `args` from `cwd`, on a blocking thread.
async fn run(server: &MockServer, cwd: PathBuf, name: &'static str, args: &[&str]) -> anyhow::Result<Value> {
    let uri = server.uri();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let ctx = Context::new(Paths::in_dir(&cwd), cwd.clone())
            .with_client(ApiClient::new(uri, "tok").unwrap());
        let entry = find(name).expect("command registered");
        (entry.factory)().run(&ctx, &args)
    })
    .await
    .unwrap()
}

async fn mount_project(server: &MockServer, project_id: u64) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path(format!("/projects/{project_id}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": project_id,
            "name": "Launch",
            "dock": [
                {"name": "todoset", "url": format!("{base}/buckets/{project_id}/todosets/10.json")},
                {"name": "chat", "url": format!("{base}/buckets/{project_id}/chats/20.json")},
                {"name": "schedule", "url": format!("{base}/buckets/{project_id}/schedules/30.json")}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn todolists_follow_the_dock_and_pages() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_project(&server, 111).await;
    Mock::given(method("GET"))
        .and(path("/buckets/111/todosets/10.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10,
            "todolists_url": format!("{base}/buckets/111/todosets/10/todolists.json")
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buckets/111/todosets/10/todolists.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "title": "Later", "completed_ratio": "0/1", "completed": false}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buckets/111/todosets/10/todolists.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    {"id": 1, "title": "Now", "completed_ratio": "2/3", "completed": false, "description": null}
                ]))
                .insert_header(
                    "link",
                    format!(r#"<{base}/buckets/111/todosets/10/todolists.json?page=2>; rel="next""#),
                ),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = run(&server, dir.path().to_path_buf(), "todolists", &["111"])
        .await
        .unwrap();
    assert_eq!(
        out,
        json!({
            "project_id": 111,
            "todoset_id": 10,
            "todolists": [
                {"id": 1, "title": "Now", "completed_ratio": "2/3", "completed": false},
                {"id": 2, "title": "Later", "completed_ratio": "0/1", "completed": false}
            ]
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn project_file_supplies_the_project_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/buckets/777/todos/42/completion.json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(PROJECT_FILE), "project_id: 777\n").unwrap();
    let nested = dir.path().join("src");
    std::fs::create_dir_all(&nested).unwrap();

    let out = run(&server, nested, "todo-complete", &["42"]).await.unwrap();
    assert_eq!(
        out,
        json!({"status": "ok", "todo_id": "42", "message": "Todo completed"})
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_dock_tool_is_an_error() {
    let server = MockServer::start().await;
    mount_project(&server, 5).await;

    let dir = TempDir::new().unwrap();
    let err = run(&server, dir.path().to_path_buf(), "docs", &["5"])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no vault found in this project");
}

#[tokio::test(flavor = "multi_thread")]
async fn campfire_post_goes_to_lines_url() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_project(&server, 111).await;
    Mock::given(method("GET"))
        .and(path("/buckets/111/chats/20.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 20,
            "lines_url": format!("{base}/buckets/111/chats/20/lines.json")
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/buckets/111/chats/20/lines.json"))
        .and(body_json(json!({"content": "hello team"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 99,
            "content": "hello team",
            "creator": {"id": 1, "name": "Ada"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = run(
        &server,
        dir.path().to_path_buf(),
        "campfire-post",
        &["111", "--content", "hello team"],
    )
    .await
    .unwrap();
    assert_eq!(
        out,
        json!({"status": "ok", "id": 99, "content": "hello team", "message": "Message posted to campfire"})
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn message_with_comments() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/buckets/1/messages/2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2,
            "subject": "Kickoff",
            "content": "<div>Welcome <b>all</b></div>",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "comments_count": 1,
            "comments_url": format!("{base}/buckets/1/recordings/2/comments.json"),
            "app_url": "https://3.basecamp.com/1/buckets/1/messages/2",
            "creator": {"id": 1, "name": "Ada"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buckets/1/recordings/2/comments.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "content": "<p>Thanks!</p>", "created_at": "2024-01-03T00:00:00Z", "creator": {"id": 2, "name": "Grace"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = run(&server, dir.path().to_path_buf(), "message", &["1", "2", "--comments"])
        .await
        .unwrap();
    assert_eq!(out["content"], "Welcome all");
    assert_eq!(out["creator"], "Ada");
    assert_eq!(
        out["comments"],
        json!([{"id": 7, "author": "Grace", "content": "Thanks!", "created_at": "2024-01-03T00:00:00Z"}])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn api_errors_reach_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/people/3.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"Not found"}"#))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = run(&server, dir.path().to_path_buf(), "person", &["3"])
        .await
        .unwrap_err();
    let api = err.downcast_ref::<basecamp_cli::Error>().unwrap();
    assert_eq!(api.status(), Some(404));
}

async fn mount_board(server: &MockServer) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/buckets/111/card_tables/40.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 40,
            "title": "Sprint",
            "lists": [
                {"id": 41, "title": "Triage", "color": null, "cards_count": 0,
                 "cards_url": format!("{base}/buckets/111/card_tables/lists/41/cards.json")},
                {"id": 42, "title": "In Progress", "color": "blue", "cards_count": 2,
                 "cards_url": format!("{base}/buckets/111/card_tables/lists/42/cards.json")},
                {"id": 43, "title": "Done", "color": "green", "cards_count": 1,
                 "cards_url": format!("{base}/buckets/111/card_tables/lists/43/cards.json")}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn cards_skip_empty_and_filtered_columns() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("GET"))
        .and(path("/buckets/111/card_tables/lists/42/cards.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Login page", "creator": {"id": 1, "name": "Ada"}},
            {"id": 2, "title": "Signup page", "creator": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buckets/111/card_tables/lists/43/cards.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = run(
        &server,
        dir.path().to_path_buf(),
        "cards",
        &["111", "40", "--column", "progress"],
    )
    .await
    .unwrap();
    assert_eq!(
        out,
        json!({
            "board_id": 40,
            "board_title": "Sprint",
            "columns": [{
                "column": "In Progress",
                "cards": [
                    {"id": 1, "title": "Login page", "creator": "Ada"},
                    {"id": 2, "title": "Signup page", "creator": "Unknown"}
                ]
            }]
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn move_resolves_column_by_title() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("POST"))
        .and(path("/buckets/111/card_tables/cards/9/moves.json"))
        .and(body_json(json!({"column_id": 43})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = run(&server, dir.path().to_path_buf(), "move", &["111", "40", "9", "--to", "done"])
        .await
        .unwrap();
    assert_eq!(
        out,
        json!({"status": "ok", "card_id": "9", "column": "Done", "message": "Card 9 moved to 'Done'"})
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn move_to_unknown_column_fails_without_posting() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = run(&server, dir.path().to_path_buf(), "move", &["111", "40", "9", "--to", "Blocked"])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "column 'Blocked' not found. Available columns: Triage, In Progress, Done"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn step_complete_turns_completion_on() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/buckets/111/card_tables/steps/5/completions.json"))
        .and(body_json(json!({"completion": "on"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = run(&server, dir.path().to_path_buf(), "step-complete", &["111", "5"])
        .await
        .unwrap();
    assert_eq!(out, json!({"status": "ok", "step_id": "5", "message": "Step completed"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn event_create_posts_to_schedule_entries() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_project(&server, 111).await;
    Mock::given(method("GET"))
        .and(path("/buckets/111/schedules/30.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 30,
            "title": "Schedule",
            "entries_url": format!("{base}/buckets/111/schedules/30/entries.json")
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/buckets/111/schedules/30/entries.json"))
        .and(body_json(json!({
            "summary": "Launch review",
            "starts_at": "2024-06-01T15:00:00Z",
            "ends_at": "2024-06-01T16:00:00Z",
            "all_day": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 77,
            "summary": "Launch review"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = run(
        &server,
        dir.path().to_path_buf(),
        "event-create",
        &[
            "111",
            "--summary",
            "Launch review",
            "--starts-at",
            "2024-06-01T15:00:00Z",
            "--ends-at",
            "2024-06-01T16:00:00Z",
        ],
    )
    .await
    .unwrap();
    assert_eq!(
        out,
        json!({"status": "ok", "id": 77, "summary": "Launch review", "message": "Event 'Launch review' created"})
    );
}
