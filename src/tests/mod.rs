use std::cell::RefCell;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::client::{ApiClient, ApiError, ClientOptions};
use crate::drain::{self, DrainObserver, PageSource};
use crate::model::{PageResponse, User};
use crate::runner::{Mode, Options, Runner};

#[derive(Debug, thiserror::Error)]
#[error("scripted failure on page {0}")]
struct ScriptedError(u32);

/// Serves pre-built pages by requested number and remembers every request.
struct ScriptedSource {
    pages: Vec<PageResponse<Value>>,
    fail_on: Option<u32>,
    requested: RefCell<Vec<u32>>,
}

impl ScriptedSource {
    fn new(pages: Vec<PageResponse<Value>>) -> Self {
        Self {
            pages,
            fail_on: None,
            requested: RefCell::new(Vec::new()),
        }
    }

    fn failing_on(mut self, page: u32) -> Self {
        self.fail_on = Some(page);
        self
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.borrow().clone()
    }
}

impl PageSource<Value> for ScriptedSource {
    type Error = ScriptedError;

    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<PageResponse<Value>, ScriptedError>> {
        self.requested.borrow_mut().push(page);
        let result = if self.fail_on == Some(page) {
            Err(ScriptedError(page))
        } else {
            self.pages
                .get(page as usize - 1)
                .cloned()
                .ok_or(ScriptedError(page))
        };
        std::future::ready(result)
    }
}

fn ids(n: std::ops::RangeInclusive<u64>) -> Vec<Value> {
    n.map(|id| json!({ "id": id })).collect()
}

fn even_pages(total: u32, per_page: u64) -> Vec<PageResponse<Value>> {
    (1..=total)
        .map(|page| {
            let start = u64::from(page - 1) * per_page + 1;
            PageResponse::new(page, total, ids(start..=start + per_page - 1))
        })
        .collect()
}

#[tokio::test]
async fn drain_concatenates_two_pages_in_order() {
    let source = ScriptedSource::new(vec![
        PageResponse::new(1, 2, ids(1..=2)),
        PageResponse::new(2, 2, ids(3..=3)),
    ]);
    let records: Vec<Value> = drain::drain(&source).await;
    assert_eq!(records, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
    assert_eq!(source.requested(), vec![1, 2]);
}

#[tokio::test]
async fn drain_length_is_sum_of_page_sizes() {
    for total in 1..=6u32 {
        let source = ScriptedSource::new(even_pages(total, 4));
        let records: Vec<Value> = drain::drain(&source).await;
        assert_eq!(records.len(), total as usize * 4);
        let got: Vec<u64> = records.iter().filter_map(|r| r["id"].as_u64()).collect();
        let want: Vec<u64> = (1..=u64::from(total) * 4).collect();
        assert_eq!(got, want);
        assert_eq!(source.requested(), (1..=total).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn single_page_issues_exactly_one_fetch() {
    let source = ScriptedSource::new(vec![PageResponse::new(1, 1, ids(1..=6))]);
    let records: Vec<Value> = drain::drain(&source).await;
    assert_eq!(records.len(), 6);
    assert_eq!(source.requested(), vec![1]);
}

#[tokio::test]
async fn failure_on_first_page_yields_empty() {
    let source = ScriptedSource::new(even_pages(3, 2)).failing_on(1);
    let records: Vec<Value> = drain::drain(&source).await;
    assert!(records.is_empty());
    assert_eq!(source.requested(), vec![1]);
}

#[tokio::test]
async fn failure_mid_drain_discards_earlier_pages() {
    let source = ScriptedSource::new(even_pages(4, 3)).failing_on(3);
    let records: Vec<Value> = drain::drain(&source).await;
    assert!(records.is_empty());
    assert_eq!(source.requested(), vec![1, 2, 3]);
}

#[tokio::test]
async fn try_drain_reports_failing_page() {
    let source = ScriptedSource::new(even_pages(4, 1)).failing_on(2);
    let err = drain::try_drain::<Value, _, _>(&source, &drain::NoopObserver)
        .await
        .unwrap_err();
    assert_eq!(err.page, 2);
    assert_eq!(err.source.0, 2);
    assert!(err.to_string().contains("page 2"));
}

#[tokio::test]
async fn empty_intermediate_page_still_advances() {
    let source = ScriptedSource::new(vec![
        PageResponse::new(1, 3, ids(1..=1)),
        PageResponse::new(2, 3, Vec::new()),
        PageResponse::new(3, 3, ids(2..=2)),
    ]);
    let records: Vec<Value> = drain::drain(&source).await;
    assert_eq!(records, vec![json!({"id": 1}), json!({"id": 2})]);
    assert_eq!(source.requested(), vec![1, 2, 3]);
}

#[tokio::test]
async fn termination_follows_server_reported_page() {
    // Asked for page 1, the server answers as if it were the last page.
    let source = ScriptedSource::new(vec![
        PageResponse::new(2, 2, ids(1..=2)),
        PageResponse::new(2, 2, ids(3..=4)),
    ]);
    let records: Vec<Value> = drain::drain(&source).await;
    assert_eq!(records.len(), 2);
    assert_eq!(source.requested(), vec![1]);
}

#[tokio::test]
async fn closures_are_page_sources() {
    let calls = RefCell::new(0u32);
    let source = |page: u32| {
        *calls.borrow_mut() += 1;
        std::future::ready(Ok::<_, ScriptedError>(PageResponse::new(
            page,
            3,
            vec![json!({ "id": page })],
        )))
    };
    let records: Vec<Value> = drain::drain(&source).await;
    assert_eq!(records.len(), 3);
    assert_eq!(*calls.borrow(), 3);
}

#[derive(Default)]
struct RecordingObserver {
    seen: RefCell<Vec<(u32, u32, usize)>>,
}

impl DrainObserver for RecordingObserver {
    fn on_page(&self, page: u32, total_pages: u32, records: usize) {
        self.seen.borrow_mut().push((page, total_pages, records));
    }
}

#[tokio::test]
async fn observer_sees_every_page() {
    let source = ScriptedSource::new(vec![
        PageResponse::new(1, 2, ids(1..=2)),
        PageResponse::new(2, 2, ids(3..=3)),
    ]);
    let observer = RecordingObserver::default();
    let records: Vec<Value> = drain::drain_with_observer(&source, &observer).await;
    assert_eq!(records.len(), 3);
    assert_eq!(*observer.seen.borrow(), vec![(1, 2, 2), (2, 2, 1)]);
}

struct Route {
    path: &'static str,
    status: u16,
    body: String,
}

fn route(path: &'static str, status: u16, body: Value) -> Route {
    Route {
        path,
        status,
        body: body.to_string(),
    }
}

fn raw_route(path: &'static str, status: u16, body: &str) -> Route {
    Route {
        path,
        status,
        body: body.to_string(),
    }
}

/// Minimal HTTP/1.1 server answering GETs from a fixed route table.
/// Returns the base URL (`http://127.0.0.1:PORT/api`) and the captured request heads.
async fn serve(routes: Vec<Route>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let routes = Arc::clone(&routes);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                let path = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("")
                    .to_string();
                log.lock().unwrap().push(head);

                let (status, body) = routes
                    .iter()
                    .find(|r| r.path == path)
                    .map(|r| (r.status, r.body.clone()))
                    .unwrap_or((404, "{}".to_string()));
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/api"), seen)
}

fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(&ClientOptions {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        ..ClientOptions::default()
    })
    .unwrap()
}

fn user_json(id: u64, first: &str, last: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{}.{}@reqres.in", first.to_lowercase(), last.to_lowercase()),
        "first_name": first,
        "last_name": last,
        "avatar": format!("https://reqres.in/img/faces/{id}-image.jpg"),
    })
}

#[tokio::test]
async fn http_drain_walks_all_pages_with_api_key() {
    let (base, seen) = serve(vec![
        route(
            "/api/users?page=1",
            200,
            json!({"page": 1, "per_page": 2, "total": 3, "total_pages": 2,
                   "data": [user_json(1, "George", "Bluth"), user_json(2, "Janet", "Weaver")]}),
        ),
        route(
            "/api/users?page=2",
            200,
            json!({"page": 2, "per_page": 2, "total": 3, "total_pages": 2,
                   "data": [user_json(3, "Emma", "Wong")],
                   "support": {"url": "https://reqres.in/#support-heading"}}),
        ),
    ])
    .await;

    let users: Vec<User> = client_for(&base).fetch_all().await;
    let got: Vec<u64> = users.iter().map(|u| u.id).collect();
    assert_eq!(got, vec![1, 2, 3]);
    assert_eq!(users[1].first_name(), "Janet");

    let heads = seen.lock().unwrap().clone();
    assert_eq!(heads.len(), 2);
    for head in heads {
        assert!(head.to_lowercase().contains("x-api-key: reqres-free-v1"));
    }
}

#[tokio::test]
async fn http_drain_server_error_mid_drain_is_empty() {
    let (base, _) = serve(vec![
        route(
            "/api/users?page=1",
            200,
            json!({"page": 1, "total_pages": 2, "data": [user_json(1, "George", "Bluth")]}),
        ),
        raw_route("/api/users?page=2", 500, "{\"error\":\"boom\"}"),
    ])
    .await;

    let client = client_for(&base);
    let err = drain::try_drain::<User, _, _>(&client, &drain::NoopObserver)
        .await
        .unwrap_err();
    assert_eq!(err.page, 2);
    assert!(err.source.is_transport());
    assert_eq!(err.source.status(), Some(500));

    let users: Vec<User> = client.fetch_all().await;
    assert!(users.is_empty());
}

#[tokio::test]
async fn http_drain_malformed_body_is_decode_error() {
    let (base, _) = serve(vec![raw_route("/api/users?page=1", 200, "<html>oops</html>")]).await;

    let client = client_for(&base);
    let err = client.get_page::<User>(1).await.unwrap_err();
    assert!(err.is_decode());
    assert!(!err.is_transport());

    let users: Vec<User> = client.fetch_all().await;
    assert!(users.is_empty());
}

#[tokio::test]
async fn fetch_one_returns_record_unchanged() {
    let mut record = user_json(2, "Janet", "Weaver");
    record["job"] = json!("leader");
    let (base, _) = serve(vec![route("/api/users/2", 200, json!({ "data": record.clone() }))]).await;

    let client = client_for(&base);
    let raw: Option<Value> = client.fetch_one(2).await;
    assert_eq!(raw, Some(record.clone()));

    let user: User = client.fetch_one(2).await.unwrap();
    assert_eq!(user.first_name(), "Janet");
    assert_eq!(serde_json::to_value(&user).unwrap(), record);
}

#[tokio::test]
async fn fetch_one_missing_data_is_none() {
    let (base, _) = serve(vec![
        route("/api/users/5", 200, json!({})),
        route("/api/users/6", 200, json!({ "data": null })),
        route("/api/users/23", 404, json!({})),
    ])
    .await;

    let client = client_for(&base);
    assert!(client.fetch_one::<User>(5).await.is_none());
    assert!(client.fetch_one::<User>(6).await.is_none());
    assert!(client.fetch_one::<User>(23).await.is_none());
    assert!(matches!(client.try_fetch_one::<User>(23).await, Ok(None)));
}

#[tokio::test]
async fn fetch_one_decode_error_is_none() {
    let (base, _) = serve(vec![raw_route("/api/users/2", 200, "{\"data\": [1, 2]}")]).await;

    let client = client_for(&base);
    assert!(matches!(
        client.try_fetch_one::<User>(2).await,
        Err(ApiError::Decode { .. })
    ));
    assert!(client.fetch_one::<User>(2).await.is_none());
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{addr}/api"));
    let err = client.try_fetch_one::<User>(1).await.unwrap_err();
    assert!(err.is_transport());
    assert!(client.fetch_one::<User>(1).await.is_none());
    assert!(client.fetch_all::<User>().await.is_empty());
}

#[tokio::test]
async fn extra_header_is_sent() {
    let (base, seen) = serve(vec![route(
        "/api/users?page=1",
        200,
        json!({"page": 1, "total_pages": 1, "data": []}),
    )])
    .await;

    let client = ApiClient::new(&ClientOptions {
        base_url: base,
        api_key: None,
        header: Some("X-Trace: abc123".to_string()),
        ..ClientOptions::default()
    })
    .unwrap();
    let users: Vec<User> = client.fetch_all().await;
    assert!(users.is_empty());

    let head = seen.lock().unwrap()[0].to_lowercase();
    assert!(head.contains("x-trace: abc123"));
    assert!(!head.contains("x-api-key"));
}

#[tokio::test]
async fn runner_fetches_single_user() {
    let (base, _) = serve(vec![route(
        "/api/users/3",
        200,
        json!({ "data": user_json(3, "Emma", "Wong") }),
    )])
    .await;

    let mut options = Options {
        mode: Mode::User(3),
        ..Options::default()
    };
    options.client.base_url = base;
    let runner = Runner::new(options).unwrap();
    let result = runner.run().await;
    assert_eq!(result.user().map(|u| u.full_name()), Some("Emma Wong".to_string()));
}

#[tokio::test]
async fn runner_lists_all_users() {
    let (base, _) = serve(vec![
        route(
            "/api/users?page=1",
            200,
            json!({"page": 1, "total_pages": 2, "data": [user_json(1, "George", "Bluth")]}),
        ),
        route(
            "/api/users?page=2",
            200,
            json!({"page": 2, "total_pages": 2, "data": [user_json(2, "Janet", "Weaver")]}),
        ),
    ])
    .await;

    let mut options = Options {
        mode: Mode::Table,
        ..Options::default()
    };
    options.client.base_url = base;
    let result = Runner::new(options).unwrap().run().await;
    assert_eq!(result.users.len(), 2);
    assert!(result.user().is_none());
}

#[tokio::test]
async fn http_drain_keeps_records_with_null_or_missing_fields() {
    let (base, _) = serve(vec![route(
        "/api/users?page=1",
        200,
        json!({"page": 1, "total_pages": 1, "data": [
            user_json(1, "George", "Bluth"),
            {"id": 2, "first_name": "Janet", "email": null},
            {"id": 3},
        ]}),
    )])
    .await;

    let users: Vec<User> = client_for(&base).fetch_all().await;
    let got: Vec<u64> = users.iter().map(|u| u.id).collect();
    assert_eq!(got, vec![1, 2, 3]);
    assert_eq!(users[1].email(), "");
    assert_eq!(users[2].display_name(), "unknown user");
    assert_eq!(serde_json::to_value(&users[2]).unwrap(), json!({ "id": 3 }));
}

#[tokio::test]
async fn rate_limited_client_spaces_requests() {
    let page = |n: u32| {
        json!({"page": n, "total_pages": 3, "data": [user_json(u64::from(n), "User", "Paged")]})
    };
    let (base, seen) = serve(vec![
        route("/api/users?page=1", 200, page(1)),
        route("/api/users?page=2", 200, page(2)),
        route("/api/users?page=3", 200, page(3)),
    ])
    .await;

    let client = ApiClient::new(&ClientOptions {
        base_url: base,
        timeout_seconds: 5,
        rate: 2,
        ..ClientOptions::default()
    })
    .unwrap();

    let started = std::time::Instant::now();
    let users: Vec<User> = client.fetch_all().await;
    let elapsed = started.elapsed();

    let got: Vec<u64> = users.iter().map(|u| u.id).collect();
    assert_eq!(got, vec![1, 2, 3]);
    assert_eq!(seen.lock().unwrap().len(), 3);
    // Two requests per second: the third has to wait for a fresh cell.
    assert!(elapsed >= std::time::Duration::from_millis(400), "{elapsed:?}");
}
