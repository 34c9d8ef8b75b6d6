//! The real GitHub client against a local HTTP mock.

use serde_json::json;
use todo_organizer::{
	Comment, IssueTracker, NetworkError, RealIssueTracker, ReconcileOptions, Tag,
	reconcile::{self, ACK_MESSAGE},
};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{body_json, header, method, path, query_param},
};

use crate::common::{repo, settings_for};

fn tracker(server: &MockServer) -> RealIssueTracker {
	RealIssueTracker::new(&settings_for(&server.uri())).unwrap()
}

fn issue_json(number: u64, title: &str) -> serde_json::Value {
	json!({ "id": number + 9000, "number": number, "title": title, "body": null, "state": "open" })
}

#[tokio::test]
async fn test_list_sends_auth_and_filters_pull_requests() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/repos/owner/repo/issues"))
		.and(query_param("state", "open"))
		.and(header("Authorization", "token test-token"))
		.and(header("Accept", "application/vnd.github+json"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([
			issue_json(1, "Fix Login Bug"),
			{ "id": 2, "number": 2, "title": "a pull request", "body": "", "state": "open", "pull_request": { "url": "x" } },
		])))
		.expect(1)
		.mount(&server)
		.await;

	let issues = tracker(&server).list_open_issues(&repo()).await.unwrap();

	assert_eq!(issues.len(), 1);
	assert_eq!(issues[0].number, 1);
	assert_eq!(issues[0].title, "Fix Login Bug");
	assert_eq!(issues[0].body, "");
}

#[tokio::test]
async fn test_list_follows_pages() {
	let server = MockServer::start().await;
	let full_page: Vec<_> = (1..=100).map(|n| issue_json(n, &format!("issue {n}"))).collect();
	Mock::given(method("GET"))
		.and(path("/repos/owner/repo/issues"))
		.and(query_param("page", "1"))
		.respond_with(ResponseTemplate::new(200).set_body_json(full_page))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/repos/owner/repo/issues"))
		.and(query_param("page", "2"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([issue_json(101, "last")])))
		.expect(1)
		.mount(&server)
		.await;

	let issues = tracker(&server).list_open_issues(&repo()).await.unwrap();

	assert_eq!(issues.len(), 101);
	assert_eq!(issues[100].title, "last");
}

#[tokio::test]
async fn test_create_comment_and_close_requests() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/repos/owner/repo/issues"))
		.and(body_json(json!({ "title": "t", "body": "b", "labels": ["TODO"] })))
		.respond_with(ResponseTemplate::new(201).set_body_json(issue_json(3, "t")))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/repos/owner/repo/issues/7/comments"))
		.and(body_json(json!({ "body": ACK_MESSAGE })))
		.respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("PATCH"))
		.and(path("/repos/owner/repo/issues/7"))
		.and(body_json(json!({ "state": "closed" })))
		.respond_with(ResponseTemplate::new(200).set_body_json(issue_json(7, "x")))
		.expect(1)
		.mount(&server)
		.await;

	let tracker = tracker(&server);
	let repo = repo();
	tracker.create_issue(&repo, "t", "b").await.unwrap();
	tracker.comment_on_issue(&repo, 7, ACK_MESSAGE).await.unwrap();
	tracker.close_issue(&repo, 7).await.unwrap();
}

#[tokio::test]
async fn test_error_status_is_surfaced() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/repos/owner/repo/issues/7/comments"))
		.respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
		.mount(&server)
		.await;

	let err = tracker(&server).comment_on_issue(&repo(), 7, "hi").await.unwrap_err();

	assert!(matches!(&err, NetworkError::Status { body, .. } if body == "Not Found"));
	assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
}

#[tokio::test]
async fn test_reconcile_continues_past_server_error() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/repos/owner/repo/issues"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([issue_json(5, "Fix Login Bug")])))
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/repos/owner/repo/issues"))
		.respond_with(ResponseTemplate::new(500))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/repos/owner/repo/issues/5/comments"))
		.respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
		.expect(1)
		.mount(&server)
		.await;

	let comments = [Comment::new(Tag::Todo, "refactor parser", "a.rs", 0, 0), Comment::new(Tag::Todo, "fix login bug", "a.rs", 40, 3)];
	let report = reconcile::run(&tracker(&server), &repo(), &comments, &ReconcileOptions::default()).await.unwrap();

	assert_eq!(report.failed, 1);
	assert_eq!(report.updated, 1);
}

#[tokio::test]
async fn test_unreachable_listing_aborts() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/repos/owner/repo/issues"))
		.respond_with(ResponseTemplate::new(502))
		.mount(&server)
		.await;

	let result = reconcile::run(&tracker(&server), &repo(), &[Comment::new(Tag::Todo, "x", "a.rs", 0, 0)], &ReconcileOptions::default()).await;

	assert!(matches!(result, Err(NetworkError::Status { .. })));
	let requests = server.received_requests().await.unwrap();
	assert_eq!(requests.len(), 1, "no writes after a failed listing");
}
