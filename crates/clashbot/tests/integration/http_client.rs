/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! `HttpContestClient` against an in-process stub of the service.

use clashbot::{ClientError, ContestClient, ErrorClass, HttpContestClient, OrchestratorConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    cookie: Option<String>,
    body: Value,
}

struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Serves `routes` (path -> status, body); anything else answers 404.
    async fn start(routes: Vec<(&str, u16, Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
        let addr = listener.local_addr().expect("listener local addr");
        let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, status, body)| (path.to_string(), (status, body.to_string())))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move { handle_conn(stream, &routes, &recorded).await });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn header(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

async fn handle_conn(
    mut stream: TcpStream,
    routes: &HashMap<String, (u16, String)>,
    recorded: &Mutex<Vec<Recorded>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = header(&head, "content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    let body_end = buf.len().min(header_end + content_length);
    let body = serde_json::from_slice(&buf[header_end..body_end]).unwrap_or(Value::Null);
    recorded.lock().push(Recorded {
        path: path.clone(),
        cookie: header(&head, "cookie"),
        body,
    });

    let (status, body) = routes
        .get(&path)
        .cloned()
        .unwrap_or((404, r#"{"error":"not found"}"#.to_string()));
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn client(server: &StubServer) -> HttpContestClient {
    let config = OrchestratorConfig::builder()
        .user_id("1234321")
        .session_token("test-session")
        .base_url(server.base_url())
        .build()
        .expect("valid config");
    HttpContestClient::new(&config).expect("client builds")
}

#[tokio::test]
async fn test_list_pending_matches_sends_empty_args_and_cookie() {
    let server = StubServer::start(vec![(
        "/services/ClashOfCode/findPendingClashes",
        200,
        json!([{"publicHandle": "abc", "mode": "SHORTEST"}, {"publicHandle": "def"}]),
    )])
    .await;

    let pending = client(&server).list_pending_matches().await.unwrap();
    let handles: Vec<_> = pending.iter().map(|m| m.public_handle.as_str()).collect();
    assert_eq!(handles, vec!["abc", "def"]);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, json!([]));
    assert_eq!(requests[0].cookie.as_deref(), Some("cgSession=test-session"));
}

#[tokio::test]
async fn test_join_sends_user_id_and_null() {
    let server =
        StubServer::start(vec![("/services/ClashOfCode/playClash", 200, json!({}))]).await;

    client(&server).join_match("abc").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].path, "/services/ClashOfCode/playClash");
    assert_eq!(requests[0].body, json!(["1234321", null]));
}

#[tokio::test]
async fn test_fetch_match_content_chains_both_session_calls() {
    let server = StubServer::start(vec![
        (
            "/services/ClashOfCode/startClashTestSession",
            200,
            json!({"handle": "ts-1"}),
        ),
        (
            "/services/TestSession/startTestSession",
            200,
            json!({
                "currentQuestion": {
                    "question": {"id": 737259, "title": "Reverse", "statement": "Reverse the input"}
                }
            }),
        ),
    ])
    .await;

    let content = client(&server).fetch_match_content("abc").await.unwrap();
    assert_eq!(content.test_session_handle, "ts-1");
    assert_eq!(content.puzzle.question_id, "737259");
    assert_eq!(content.puzzle.title.as_deref(), Some("Reverse"));

    let bodies: Vec<_> = server.requests().into_iter().map(|r| r.body).collect();
    assert_eq!(bodies, vec![json!(["1234321", "abc"]), json!(["ts-1"])]);
}

#[tokio::test]
async fn test_missing_session_handle_is_unexpected_payload() {
    let server = StubServer::start(vec![(
        "/services/ClashOfCode/startClashTestSession",
        200,
        json!({"other": 1}),
    )])
    .await;

    let err = client(&server).fetch_match_content("abc").await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedPayload { .. }));
    assert_eq!(err.class(), ErrorClass::ClientSide);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_submit_and_share_bodies() {
    let server = StubServer::start(vec![
        ("/services/TestSession/submit", 200, json!(1)),
        (
            "/services/ClashOfCode/shareCodinGamerSolutionByHandle",
            200,
            json!(null),
        ),
    ])
    .await;
    let client = client(&server);

    client.submit_solution("ts-1", "echo 1", "Bash").await.unwrap();
    client.share_solution("abc").await.unwrap();

    let requests = server.requests();
    assert_eq!(
        requests[0].body,
        json!(["ts-1", {"code": "echo 1", "programmingLanguageId": "Bash"}, null])
    );
    assert_eq!(requests[1].body, json!(["1234321", "abc"]));
}

#[tokio::test]
async fn test_report_and_solution_decode() {
    let server = StubServer::start(vec![
        (
            "/services/ClashOfCode/findClashReportInfoByHandle",
            200,
            json!({
                "publicHandle": "abc",
                "finished": true,
                "players": [
                    {"codingamerNickname": "a", "score": 100, "solutionShared": true, "submissionId": 11},
                    {"codingamerNickname": "b", "score": 0, "solutionShared": false}
                ]
            }),
        ),
        (
            "/services/Solution/findSolution",
            200,
            json!({"code": "rev", "programmingLanguageId": "Bash", "pseudo": "a"}),
        ),
    ])
    .await;
    let client = client(&server);

    let report = client.fetch_match_report("abc").await.unwrap();
    assert_eq!(report.harvestable_submissions(), vec![11]);

    let solution = client.fetch_submitted_code(11).await.unwrap();
    assert_eq!(solution.code, "rev");
    assert_eq!(solution.pseudo.as_deref(), Some("a"));

    let bodies: Vec<_> = server.requests().into_iter().map(|r| r.body).collect();
    assert_eq!(bodies, vec![json!(["abc"]), json!(["1234321", 11])]);
}

#[tokio::test]
async fn test_4xx_is_client_side_and_5xx_generic() {
    let server = StubServer::start(vec![
        (
            "/services/ClashOfCode/playClash",
            422,
            json!({"id": 501, "message": "Clash already started"}),
        ),
        ("/services/ClashOfCode/findPendingClashes", 503, json!({})),
    ])
    .await;
    let client = client(&server);

    let err = client.join_match("abc").await.unwrap_err();
    match &err {
        ClientError::Status { status, body, .. } => {
            assert_eq!(*status, 422);
            assert!(body.contains("already started"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(err.class(), ErrorClass::ClientSide);

    let err = client.list_pending_matches().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Generic);
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let server = StubServer::start(vec![(
        "/services/ClashOfCode/findPendingClashes",
        200,
        json!({"not": "a list"}),
    )])
    .await;

    let err = client(&server).list_pending_matches().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
    assert_eq!(err.class(), ErrorClass::Generic);
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = OrchestratorConfig::builder()
        .user_id("1234321")
        .session_token("test-session")
        .base_url(format!("http://{}", addr))
        .build()
        .unwrap();
    let err = HttpContestClient::new(&config)
        .unwrap()
        .list_pending_matches()
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.class(), ErrorClass::Generic);
}
