//! Black-box HTTP contract scenarios against the deployed service.
//!
//! Each scenario resolves the endpoint fresh, mints its own identifier, and
//! asserts over a captured response. The assertion helpers (`check_*`) are
//! pure functions over [`HttpCapture`] so the verdict logic is testable
//! without a network.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::ident;
use crate::scenario::{FatalError, ScenarioResult, ScenarioStatus, SuiteCtx};

/// Bound on any single HTTP request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Grace period for eventual consistency of the user store between
/// registration and verification.
pub const CONSISTENCY_GRACE: Duration = Duration::from_secs(2);

/// Name of the output holding the deployed endpoint base URL.
pub const ENDPOINT_OUTPUT: &str = "api_gateway_url";

pub const REGISTER_SUCCESS: &str = "Registered User Successfully";
pub const HELLO_WORLD: &str = "Hello world";
pub const VERIFY_SUCCESS: &str = "User Verification Successful";
pub const VERIFY_WELCOME: &str = "Welcome!";
pub const VERIFY_FAILED: &str = "User Verification Failed";
pub const VERIFY_NOT_FOUND: &str = "User not found";
/// Marker the service puts in JSON `message` fields when rejecting a request.
pub const ERROR_MARKER: &str = "Error";

/// Blocking client with the harness-wide request timeout.
pub fn client() -> Result<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("build blocking client")
}

/// Materialized response a contract check asserts against.
#[derive(Debug, Clone)]
pub struct HttpCapture {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl HttpCapture {
    fn from_response(response: reqwest::blocking::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().context("read response body")?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    fn is_html(&self) -> bool {
        self.content_type.contains("text/html")
    }
}

fn get(ctx: &SuiteCtx, url: &str) -> Result<HttpCapture> {
    debug!(url, "GET");
    let response = ctx
        .client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?;
    HttpCapture::from_response(response)
}

fn put(ctx: &SuiteCtx, url: &str) -> Result<HttpCapture> {
    debug!(url, "PUT");
    let response = ctx
        .client
        .put(url)
        .send()
        .with_context(|| format!("PUT {url}"))?;
    HttpCapture::from_response(response)
}

/// The `message` field of a JSON body, or a descriptive error.
fn json_message(body: &str) -> Result<String, String> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| format!("response is not valid JSON: {err}"))?;
    match value.get("message").and_then(Value::as_str) {
        Some(message) => Ok(message.to_string()),
        None => Err(format!("response missing `message` field: {body}")),
    }
}

// ---------------------------------------------------------------------------
// Verdicts (pure)
// ---------------------------------------------------------------------------

pub fn check_registration(name: &str, capture: &HttpCapture) -> ScenarioResult {
    if capture.status != 200 {
        return ScenarioResult::failed(
            name,
            format!("expected status 200, got {}", capture.status),
        );
    }
    let message = match json_message(&capture.body) {
        Ok(message) => message,
        Err(reason) => return ScenarioResult::failed(name, reason),
    };
    if !message.contains(REGISTER_SUCCESS) {
        return ScenarioResult::failed(
            name,
            format!("message does not indicate success: {message}"),
        );
    }
    ScenarioResult::passed(name)
}

pub fn check_verification_success(name: &str, capture: &HttpCapture) -> ScenarioResult {
    if capture.status != 200 {
        return ScenarioResult::failed(
            name,
            format!("expected status 200, got {}", capture.status),
        );
    }
    if !capture.is_html() {
        return ScenarioResult::failed(
            name,
            format!("expected HTML content, got: {}", capture.content_type),
        );
    }
    for marker in [VERIFY_SUCCESS, VERIFY_WELCOME] {
        if !capture.body.contains(marker) {
            return ScenarioResult::failed(name, format!("body missing `{marker}`"));
        }
    }
    ScenarioResult::passed(name)
}

pub fn check_verification_failure(name: &str, capture: &HttpCapture) -> ScenarioResult {
    if capture.status != 200 {
        return ScenarioResult::failed(
            name,
            format!("expected status 200, got {}", capture.status),
        );
    }
    if !capture.is_html() {
        return ScenarioResult::failed(
            name,
            format!("expected HTML content, got: {}", capture.content_type),
        );
    }
    for marker in [VERIFY_FAILED, VERIFY_NOT_FOUND] {
        if !capture.body.contains(marker) {
            return ScenarioResult::failed(name, format!("body missing `{marker}`"));
        }
    }
    ScenarioResult::passed(name)
}

/// Missing `userId` on registration: a non-200 status and a 200 JSON error
/// message are both correct rejections; the service's error contract allows
/// either.
pub fn check_invalid_registration(name: &str, capture: &HttpCapture) -> ScenarioResult {
    if capture.status != 200 {
        return ScenarioResult::passed(name);
    }
    match json_message(&capture.body) {
        Ok(message) if message.contains(ERROR_MARKER) => ScenarioResult::passed(name),
        Ok(message) => {
            ScenarioResult::failed(name, format!("expected error message, got: {message}"))
        }
        Err(reason) => ScenarioResult::failed(name, reason),
    }
}

/// Missing `userId` on verification: non-200, failure HTML, or a JSON error
/// message all count as correct rejection.
pub fn check_invalid_verification(name: &str, capture: &HttpCapture) -> ScenarioResult {
    if capture.status != 200 {
        return ScenarioResult::passed(name);
    }
    if capture.is_html()
        && (capture.body.contains(VERIFY_FAILED) || capture.body.contains(VERIFY_NOT_FOUND))
    {
        return ScenarioResult::passed(name);
    }
    if let Ok(message) = json_message(&capture.body)
        && message.contains(ERROR_MARKER)
    {
        return ScenarioResult::passed(name);
    }
    ScenarioResult::failed(
        name,
        format!("expected error response, got: {}", capture.body),
    )
}

/// The root path must answer: either the original hello-world JSON or the
/// verification page the later service variant serves there.
pub fn check_root_answers(name: &str, capture: &HttpCapture) -> ScenarioResult {
    if capture.status != 200 {
        return ScenarioResult::failed(
            name,
            format!("expected status 200, got {}", capture.status),
        );
    }
    if let Ok(message) = json_message(&capture.body)
        && message.contains(HELLO_WORLD)
    {
        return ScenarioResult::passed(name);
    }
    if capture.is_html() && capture.body.contains(VERIFY_FAILED) {
        return ScenarioResult::passed(name);
    }
    ScenarioResult::failed(
        name,
        format!("unexpected root response: {}", capture.body),
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn register_once(name: &str, ctx: &SuiteCtx, base: &str) -> ScenarioResult {
    let user_id = ident::fresh_user_id();
    debug!(user_id, "registering user");
    match put(ctx, &format!("{base}/register?userId={user_id}")) {
        Ok(capture) => check_registration(name, &capture),
        Err(err) => ScenarioResult::from_error(name, &err),
    }
}

fn register_then_verify(name: &str, ctx: &SuiteCtx, base: &str) -> ScenarioResult {
    let user_id = ident::fresh_user_id();
    debug!(user_id, "registering user before verification");
    let registered = match put(ctx, &format!("{base}/register?userId={user_id}")) {
        Ok(capture) => capture,
        Err(err) => return ScenarioResult::from_error(name, &err),
    };
    if registered.status != 200 {
        return ScenarioResult::failed(
            name,
            format!("registration returned status {}", registered.status),
        );
    }
    thread::sleep(ctx.grace);
    match get(ctx, &format!("{base}/?userId={user_id}")) {
        Ok(capture) => check_verification_success(name, &capture),
        Err(err) => ScenarioResult::from_error(name, &err),
    }
}

/// Valid registration with a fresh identifier.
#[instrument(skip_all)]
pub fn registration_valid(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    Ok(register_once("registration_valid", ctx, &base))
}

/// Register, wait out the consistency grace, verify.
#[instrument(skip_all)]
pub fn verification_success(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    Ok(register_then_verify("verification_success", ctx, &base))
}

/// Verification of an identifier guaranteed never registered.
#[instrument(skip_all)]
pub fn verification_failure(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "verification_failure";
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    let user_id = ident::never_registered_user_id();
    Ok(match get(ctx, &format!("{base}/?userId={user_id}")) {
        Ok(capture) => check_verification_failure(name, &capture),
        Err(err) => ScenarioResult::from_error(name, &err),
    })
}

/// Registration without the required `userId` parameter.
#[instrument(skip_all)]
pub fn registration_invalid(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "registration_invalid";
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    Ok(match put(ctx, &format!("{base}/register")) {
        Ok(capture) => check_invalid_registration(name, &capture),
        Err(err) => ScenarioResult::from_error(name, &err),
    })
}

/// Verification without the required `userId` parameter.
#[instrument(skip_all)]
pub fn verification_invalid(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "verification_invalid";
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    Ok(match get(ctx, &format!("{base}/")) {
        Ok(capture) => check_invalid_verification(name, &capture),
        Err(err) => ScenarioResult::from_error(name, &err),
    })
}

/// Registration run twice in succession, each with its own fresh identifier.
/// Proves the scenario carries no hidden global side effect.
#[instrument(skip_all)]
pub fn idempotency(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "idempotency";
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    let first = register_once(name, ctx, &base);
    let second = register_once(name, ctx, &base);
    Ok(
        if first.status == ScenarioStatus::Passed && second.status == ScenarioStatus::Passed {
            ScenarioResult::passed(name)
        } else if first.status != ScenarioStatus::Passed {
            ScenarioResult::failed(name, format!("first registration: {}", first.message))
        } else {
            ScenarioResult::failed(name, format!("second registration: {}", second.message))
        },
    )
}

/// Full register-then-verify cycle on an identifier no other scenario uses.
/// Proves no scenario depends on shared mutable fixtures.
#[instrument(skip_all)]
pub fn independence(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    Ok(register_then_verify("independence", ctx, &base))
}

/// Smoke check: the root path answers at all.
#[instrument(skip_all)]
pub fn hello_world(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "hello_world";
    let base = ctx.resolver.resolve(ENDPOINT_OUTPUT)?;
    Ok(match get(ctx, &format!("{base}/")) {
        Ok(capture) => check_root_answers(name, &capture),
        Err(err) => ScenarioResult::from_error(name, &err),
    })
}

/// Smoke check: the function outputs exist and carry the expected name.
#[instrument(skip_all)]
pub fn lambda_function_named(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "lambda_function_named";
    let function_name = ctx.resolver.resolve("lambda_function_name")?;
    let function_arn = ctx.resolver.resolve("lambda_function_arn")?;
    debug!(function_name, function_arn, "resolved function outputs");
    Ok(if function_name.contains("hello-world") {
        ScenarioResult::passed(name)
    } else {
        ScenarioResult::failed(
            name,
            format!("function name should contain `hello-world`: {function_name}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioStatus;

    fn json(status: u16, message: &str) -> HttpCapture {
        HttpCapture {
            status,
            content_type: "application/json".to_string(),
            body: format!("{{\"message\": \"{message}\"}}"),
        }
    }

    fn html(status: u16, body: &str) -> HttpCapture {
        HttpCapture {
            status,
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn registration_requires_success_phrase() {
        let ok = check_registration("t", &json(200, "Registered User Successfully"));
        assert_eq!(ok.status, ScenarioStatus::Passed);

        let wrong_message = check_registration("t", &json(200, "created"));
        assert_eq!(wrong_message.status, ScenarioStatus::Failed);

        let wrong_status = check_registration("t", &json(502, "Registered User Successfully"));
        assert!(wrong_status.message.contains("502"));
    }

    #[test]
    fn registration_rejects_non_json_body() {
        let capture = html(200, "<html></html>");
        let result = check_registration("t", &capture);
        assert_eq!(result.status, ScenarioStatus::Failed);
        assert!(result.message.contains("not valid JSON"));
    }

    #[test]
    fn verification_success_needs_both_markers() {
        let ok = html(200, "<h1>User Verification Successful</h1><p>Welcome!</p>");
        assert_eq!(
            check_verification_success("t", &ok).status,
            ScenarioStatus::Passed
        );

        let missing_welcome = html(200, "<h1>User Verification Successful</h1>");
        let result = check_verification_success("t", &missing_welcome);
        assert!(result.message.contains("Welcome!"));
    }

    #[test]
    fn verification_success_rejects_json_content_type() {
        let capture = json(200, "User Verification Successful Welcome!");
        let result = check_verification_success("t", &capture);
        assert!(result.message.contains("expected HTML"));
    }

    #[test]
    fn verification_failure_needs_failure_markers() {
        let ok = html(200, "<h1>User Verification Failed</h1><p>User not found</p>");
        assert_eq!(
            check_verification_failure("t", &ok).status,
            ScenarioStatus::Passed
        );

        let success_page = html(200, "<h1>User Verification Successful</h1><p>Welcome!</p>");
        assert_eq!(
            check_verification_failure("t", &success_page).status,
            ScenarioStatus::Failed
        );
    }

    #[test]
    fn invalid_registration_accepts_either_rejection_path() {
        assert_eq!(
            check_invalid_registration("t", &json(400, "Bad Request")).status,
            ScenarioStatus::Passed
        );
        assert_eq!(
            check_invalid_registration("t", &json(200, "Error: userId is required")).status,
            ScenarioStatus::Passed
        );
        assert_eq!(
            check_invalid_registration("t", &json(200, "Registered User Successfully")).status,
            ScenarioStatus::Failed
        );
    }

    #[test]
    fn invalid_verification_accepts_all_three_rejection_paths() {
        assert_eq!(
            check_invalid_verification("t", &json(403, "nope")).status,
            ScenarioStatus::Passed
        );
        assert_eq!(
            check_invalid_verification("t", &html(200, "User Verification Failed")).status,
            ScenarioStatus::Passed
        );
        assert_eq!(
            check_invalid_verification("t", &json(200, "Error: missing userId")).status,
            ScenarioStatus::Passed
        );
        assert_eq!(
            check_invalid_verification("t", &html(200, "Welcome!")).status,
            ScenarioStatus::Failed
        );
    }

    #[test]
    fn root_accepts_hello_json_or_failure_page() {
        assert_eq!(
            check_root_answers("t", &json(200, "Hello world")).status,
            ScenarioStatus::Passed
        );
        assert_eq!(
            check_root_answers("t", &html(200, "User Verification Failed")).status,
            ScenarioStatus::Passed
        );
        assert_eq!(
            check_root_answers("t", &json(500, "Hello world")).status,
            ScenarioStatus::Failed
        );
    }
}
