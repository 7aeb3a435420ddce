//! End-to-end tests for machine submission and task polling.

use blockchain_forge::provisioning::{ProviderDispatcher, TaskState};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

mod common;

use common::{client, start_server, wait_terminal, StubBehavior, StubDriver};

async fn submit(client: &reqwest::Client, server: &common::TestServer, body: Value) -> reqwest::Response {
    client
        .post(server.url("/api/create-machine"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn submit_ok(client: &reqwest::Client, server: &common::TestServer, body: Value) -> String {
    let res = submit(client, server, body).await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["msg"], "task submitted");
    body["taskId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_aws_success_reports_address() {
    let aws = StubDriver::new("aws", StubBehavior::Address("1.2.3.4".into()));
    let server = start_server(ProviderDispatcher::new().with_driver(aws.clone())).await;
    let client = client();

    let id = submit_ok(&client, &server, json!({ "cloudType": "aws", "region": "us-east-1" })).await;
    let task = wait_terminal(&client, &server, &id).await;

    assert_eq!(task["status"], "done");
    assert_eq!(task["result"], "1.2.3.4");
    assert!(task.get("error").is_none());
    assert_eq!(aws.calls(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_gcp_failure_reports_driver_message() {
    let gcp = StubDriver::new("gcp", StubBehavior::Error("quota exceeded".into()));
    let server = start_server(ProviderDispatcher::new().with_driver(gcp)).await;
    let client = client();

    let id = submit_ok(&client, &server, json!({ "cloudType": "gcp" })).await;
    let task = wait_terminal(&client, &server, &id).await;

    assert_eq!(task["status"], "failed");
    assert_eq!(task["error"], "quota exceeded");
    assert_eq!(task["provider"], "gcp");
    assert!(task.get("result").is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_unsupported_cloud_type_fails_without_dispatch() {
    let spy = StubDriver::new("aws", StubBehavior::Address("1.2.3.4".into()));
    let server = start_server(ProviderDispatcher::new().with_driver(spy.clone())).await;
    let client = client();

    let id = submit_ok(&client, &server, json!({ "cloudType": "digitalocean" })).await;
    let task = wait_terminal(&client, &server, &id).await;

    assert_eq!(task["status"], "failed");
    assert_eq!(task["error"], "unsupported cloud type: 'digitalocean'");
    assert_eq!(spy.calls(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_submit_does_not_wait_for_driver() {
    let slow = StubDriver::delayed("aws", StubBehavior::Address("5.6.7.8".into()), Duration::from_secs(2));
    let server = start_server(ProviderDispatcher::new().with_driver(slow)).await;
    let client = client();

    let started = Instant::now();
    let id = submit_ok(&client, &server, json!({ "cloudType": "aws" })).await;
    assert!(started.elapsed() < Duration::from_secs(1), "submit blocked on the driver");

    let task: Value = client
        .get(server.url("/api/task-status"))
        .query(&[("id", id.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(task["status"], "pending");
    assert_eq!(task["id"], id.as_str());
    assert_eq!(task["cloudType"], "aws");

    let task = wait_terminal(&client, &server, &id).await;
    assert_eq!(task["result"], "5.6.7.8");

    server.stop().await;
}

#[tokio::test]
async fn test_panicking_driver_marks_task_failed() {
    let boom = StubDriver::new("azure", StubBehavior::Panic);
    let server = start_server(ProviderDispatcher::new().with_driver(boom)).await;
    let client = client();

    let id = submit_ok(&client, &server, json!({ "cloudType": "azure" })).await;
    let task = wait_terminal(&client, &server, &id).await;

    assert_eq!(task["status"], "failed");
    assert!(task["error"].as_str().unwrap().contains("stub driver exploded"));

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_submissions_are_independent() {
    let aws = StubDriver::delayed("aws", StubBehavior::EchoMachineName, Duration::from_millis(50));
    let gcp = StubDriver::delayed("gcp", StubBehavior::Error("quota exceeded".into()), Duration::from_millis(50));
    let dispatcher = ProviderDispatcher::new().with_driver(aws.clone()).with_driver(gcp.clone());
    let server = start_server(dispatcher).await;
    let client = client();

    let submissions = (0..20).map(|i| {
        let cloud = if i % 2 == 0 { "aws" } else { "gcp" };
        let address = format!("10.0.0.{}", i);
        let client = client.clone();
        let server = &server;
        async move {
            let body = json!({ "cloudType": cloud, "machineName": address });
            (cloud, address, submit_ok(&client, server, body).await)
        }
    });
    let ids = futures_util::future::join_all(submissions).await;

    let mut unique: Vec<&String> = ids.iter().map(|(_, _, id)| id).collect();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 20);

    for (cloud, address, id) in &ids {
        let task = wait_terminal(&client, &server, id).await;
        assert_eq!(task["id"], id.as_str());
        assert_eq!(task["cloudType"], *cloud);
        match *cloud {
            "aws" => {
                assert_eq!(task["status"], "done");
                assert_eq!(task["result"], address.as_str());
                assert!(task.get("error").is_none());
            }
            _ => {
                assert_eq!(task["status"], "failed");
                assert_eq!(task["error"], "quota exceeded");
                assert_eq!(task["provider"], "gcp");
                assert!(task.get("result").is_none());
            }
        }
    }
    assert_eq!(aws.calls(), 10);
    assert_eq!(gcp.calls(), 10);

    server.stop().await;
}

#[tokio::test]
async fn test_missing_cloud_type_rejected() {
    let server = start_server(ProviderDispatcher::new()).await;
    let client = client();

    let res = submit(&client, &server, json!({ "region": "us-east-1" })).await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing required field 'cloudType'");

    let health: Value = client.get(server.url("/api/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["tasks"]["total"], 0);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let server = start_server(ProviderDispatcher::new()).await;
    let client = client();

    let res = client
        .post(server.url("/api/create-machine"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    server.stop().await;
}

#[tokio::test]
async fn test_task_status_errors() {
    let server = start_server(ProviderDispatcher::new()).await;
    let client = client();

    let res = client.get(server.url("/api/task-status")).send().await.unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .get(server.url("/api/task-status"))
        .query(&[("id", uuid::Uuid::new_v4().to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "task not found");

    let res = client
        .get(server.url("/api/task-status"))
        .query(&[("id", "not-a-task")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn test_request_id_echoed() {
    let server = start_server(ProviderDispatcher::new()).await;
    let client = client();

    let res = client
        .get(server.url("/api/health"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    let res = client.get(server.url("/api/health")).send().await.unwrap();
    assert!(!res.headers()["x-request-id"].is_empty());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_drains_running_workers() {
    let slow = StubDriver::delayed("aws", StubBehavior::Address("1.1.1.1".into()), Duration::from_millis(300));
    let server = start_server(ProviderDispatcher::new().with_driver(slow.clone())).await;
    let client = client();

    let id = submit_ok(&client, &server, json!({ "cloudType": "aws" })).await;
    let provisioner = server.provisioner.clone();
    assert_eq!(provisioner.poll(Some(&id)).unwrap().state, TaskState::Pending);

    server.stop().await;

    assert_eq!(slow.calls(), 1);
    let task = provisioner.poll(Some(&id)).unwrap();
    assert_eq!(task.state, TaskState::Done { result: "1.1.1.1".into() });
    assert!(task.finished_at.is_some());
    assert_eq!(provisioner.store().pending(), 0);
}
