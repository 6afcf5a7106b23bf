//! Contract suite end-to-end against a local stub of the deployed service.
//!
//! The stub implements the observed HTTP contract: `PUT /register?userId=`
//! answers with the registration JSON, `GET /?userId=` serves the success or
//! failure verification page depending on prior registration.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use harness::contract;
use harness::exit_codes;
use harness::paths::ProjectPaths;
use harness::report;
use harness::resolve::{ConfigSource, OutputResolver};
use harness::scenario::{ScenarioStatus, SuiteCtx, run_suite};
use harness::suites;
use tiny_http::{Header, Method, Response, Server};

/// Fixed outputs for tests, standing in for environment/terraform resolution.
struct StaticOutputs(Vec<(&'static str, String)>);

impl ConfigSource for StaticOutputs {
    fn resolve(&self, name: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .0
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.clone()))
    }
}

fn json_response(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(format!("{{\"message\": \"{message}\"}}"))
        .with_status_code(status)
        .with_header(
            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).expect("header"),
        )
}

fn html_response(body: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body).with_header(
        Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
            .expect("header"),
    )
}

fn handle(request: tiny_http::Request, registered: &Mutex<HashSet<String>>) {
    let url = request.url().to_string();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    let user_id = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("userId="))
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let response = match (request.method(), path) {
        (&Method::Put, "/register") => match user_id {
            Some(id) => {
                registered.lock().expect("lock").insert(id);
                json_response(200, "Registered User Successfully")
            }
            None => json_response(200, "Error: userId parameter is required"),
        },
        (&Method::Get, "/") => match user_id {
            Some(id) if registered.lock().expect("lock").contains(&id) => {
                html_response("<h1>User Verification Successful</h1><p>Welcome!</p>")
            }
            _ => html_response("<h1>User Verification Failed</h1><p>User not found</p>"),
        },
        _ => json_response(404, "Error: not found"),
    };
    let _ = request.respond(response);
}

/// Start the stub service on an ephemeral port and return its base URL.
fn spawn_stub() -> String {
    let server = Server::http("127.0.0.1:0").expect("bind stub server");
    let addr = server.server_addr().to_ip().expect("ip addr");
    let registered: Arc<Mutex<HashSet<String>>> = Arc::default();
    thread::spawn(move || {
        for request in server.incoming_requests() {
            handle(request, &registered);
        }
    });
    format!("http://{addr}")
}

fn stub_ctx(base: &str) -> SuiteCtx {
    SuiteCtx {
        resolver: OutputResolver::from_sources(vec![Box::new(StaticOutputs(vec![
            ("api_gateway_url", base.to_string()),
            (
                "lambda_function_name",
                "user-service-hello-world".to_string(),
            ),
            (
                "lambda_function_arn",
                "arn:aws:lambda:us-east-1:123456789012:function:user-service-hello-world"
                    .to_string(),
            ),
        ]))]),
        client: contract::client().expect("client"),
        paths: ProjectPaths::new(Path::new(".")),
        // The stub store is strongly consistent; no grace needed.
        grace: Duration::ZERO,
    }
}

#[test]
fn contract_suite_passes_against_conforming_service() {
    let base = spawn_stub();
    let ctx = stub_ctx(&base);

    let run = run_suite(&suites::contract_suite(), &ctx);
    assert!(run.fatal.is_none());
    for result in &run.results {
        assert_eq!(
            result.status,
            ScenarioStatus::Passed,
            "{}: {}",
            result.name,
            result.message
        );
    }
    assert_eq!(report::exit_code(&[run]), exit_codes::OK);
}

#[test]
fn smoke_suite_passes_against_conforming_service() {
    let base = spawn_stub();
    let ctx = stub_ctx(&base);

    let run = run_suite(&suites::smoke_suite(), &ctx);
    assert!(run.fatal.is_none());
    for result in &run.results {
        assert_eq!(
            result.status,
            ScenarioStatus::Passed,
            "{}: {}",
            result.name,
            result.message
        );
    }
}

#[test]
fn suite_runs_are_idempotent() {
    let base = spawn_stub();
    let ctx = stub_ctx(&base);

    let outcome = |ctx: &SuiteCtx| -> Vec<(String, ScenarioStatus)> {
        run_suite(&suites::contract_suite(), ctx)
            .results
            .into_iter()
            .map(|result| (result.name, result.status))
            .collect()
    };

    assert_eq!(outcome(&ctx), outcome(&ctx));
}

#[test]
fn unresolvable_endpoint_is_fatal_before_any_request() {
    let ctx = SuiteCtx {
        resolver: OutputResolver::from_sources(vec![Box::new(StaticOutputs(Vec::new()))]),
        client: contract::client().expect("client"),
        paths: ProjectPaths::new(Path::new(".")),
        grace: Duration::ZERO,
    };

    let run = run_suite(&suites::contract_suite(), &ctx);
    assert!(run.results.is_empty());
    let fatal = run.fatal.as_ref().expect("fatal");
    assert!(fatal.to_string().contains("api_gateway_url"));
    assert_eq!(report::exit_code(&[run]), exit_codes::FATAL);
}

#[test]
fn transport_errors_fail_the_scenario_without_crashing() {
    // Nothing listens here; connection errors must become failed results.
    let ctx = stub_ctx("http://127.0.0.1:9");

    let run = run_suite(&suites::contract_suite(), &ctx);
    assert!(run.fatal.is_none());
    assert_eq!(run.results.len(), suites::contract_suite().scenarios.len());
    for result in &run.results {
        assert_eq!(result.status, ScenarioStatus::Failed, "{}", result.name);
        assert!(!result.message.is_empty());
    }
}
