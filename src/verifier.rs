//! Request-time verification: extract, check, fill, dispatch.
//!
//! Verification is a synchronous transform over data already present on the
//! request. It owns no shared state beyond the read-only [`EndpointConfig`]
//! it is given, so concurrent requests never interact.

use std::collections::{BTreeMap, HashSet};

use serde_json::json;

use crate::callback::{ErrorHandler, Response, SuccessHandler, Verdict, FAILURE_STATUS};
use crate::config::{Diagnostics, EndpointConfig};
use crate::error::{FailureKind, ParamErrors, ParamFailure};
use crate::logging::VerifyLog;
use crate::param::ParamSpec;
use crate::value::{coerce, RawValue, Value};
use crate::web::{ParamRequest, RequestSources};

/// Final per-request value map handed to the route handler.
pub type FilledParams = BTreeMap<String, Value>;

/// Top-level message of the diagnostics failure body.
pub const FAILURE_MESSAGE: &str = "Required parameters are missing";

/// Collects and coerces values from the request's source bags.
///
/// Bags are walked in `param_order`; the first bag holding a key claims it
/// and later bags are not consulted for that key, even when the claimed value
/// fails to parse. Declared parameters are coerced per their spec (an
/// unparsable value is left out); undeclared keys pass through as strings.
pub fn extract<S>(config: &EndpointConfig, sources: &S) -> FilledParams
where
    S: RequestSources + ?Sized,
{
    let mut values = FilledParams::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for bag_name in &config.param_order {
        let Some(bag) = sources.source(bag_name) else {
            continue;
        };
        for key in bag.keys() {
            if claimed.contains(key) {
                continue;
            }
            let Some(raw) = bag.get_raw(key) else {
                continue;
            };
            claimed.insert(key.to_string());

            let value = match config.param(key) {
                Some(spec) => coerce(spec.param_type, spec.array, &raw),
                None => Some(pass_through(raw)),
            };
            if let Some(value) = value {
                values.insert(key.to_string(), value);
            }
        }
    }

    values
}

fn pass_through(raw: RawValue) -> Value {
    match raw {
        RawValue::Single(s) => Value::String(s),
        RawValue::Many(items) => Value::List(items.into_iter().map(Value::String).collect()),
    }
}

/// Checks every declared parameter and returns all failures.
///
/// Per parameter, a custom validator replaces the built-in checks. Otherwise
/// the first applicable rule wins: required, then max, then min.
pub fn check(config: &EndpointConfig, values: &FilledParams) -> ParamErrors {
    let mut errors = ParamErrors::new();
    for (name, spec) in &config.params {
        if let Some(kind) = check_param(spec, values.get(name)) {
            errors.record(name.clone(), ParamFailure::new(spec.param_type, kind));
        }
    }
    errors
}

fn check_param(spec: &ParamSpec, value: Option<&Value>) -> Option<FailureKind> {
    if let Some(validator) = &spec.validate {
        return validator.call(spec, value).map(FailureKind::Rejected);
    }

    match value {
        Some(value) if !value.is_empty_list() => range_failure(spec, value),
        _ => spec.required.then_some(FailureKind::NotSet),
    }
}

fn range_failure(spec: &ParamSpec, value: &Value) -> Option<FailureKind> {
    let measure = match value {
        Value::List(items) => return items.iter().find_map(|item| range_failure(spec, item)),
        Value::String(s) => s.chars().count() as f64,
        Value::Number(n) => *n,
        Value::Bool(_) => return None,
    };

    if let Some(max) = spec.max {
        if measure > max {
            return Some(FailureKind::AboveMax { max });
        }
    }
    if let Some(min) = spec.min {
        if measure < min {
            return Some(FailureKind::BelowMin { min });
        }
    }
    None
}

/// Substitutes compiled defaults for declared parameters that have no value.
///
/// Parameters without a default stay absent. Running it twice is a no-op.
pub fn fill_params(config: &EndpointConfig, values: &mut FilledParams) {
    for (name, spec) in &config.params {
        if values.contains_key(name) {
            continue;
        }
        if let Some(default) = &spec.default {
            values.insert(name.clone(), default.clone());
        }
    }
}

/// Runs extraction, checks and default filling for one request.
///
/// # Errors
///
/// Returns every failing parameter when at least one check fails.
///
/// # Examples
///
/// ```
/// use param_gate::web::RequestAdapter;
/// use param_gate::{merge_endpoint_config, verify, EndpointDecl, RouterConfig, Value};
///
/// let config = merge_endpoint_config(
///     &RouterConfig::new(),
///     EndpointDecl::new().param("var1", "number").param("var2", "string(foo)"),
/// )
/// .unwrap();
///
/// let mut req = RequestAdapter::new("GET", "/test");
/// req.add_query_param("var1", "25");
///
/// let params = verify(&config, &req).unwrap();
/// assert_eq!(params["var1"], Value::Number(25.0));
/// assert_eq!(params["var2"], Value::from("foo"));
/// ```
pub fn verify<S>(config: &EndpointConfig, sources: &S) -> Result<FilledParams, ParamErrors>
where
    S: RequestSources + ?Sized,
{
    let mut values = extract(config, sources);
    let errors = check(config, &values);
    if !errors.is_empty() {
        return Err(errors);
    }
    fill_params(config, &mut values);
    Ok(values)
}

/// Verifies a request and decides how the chain proceeds.
///
/// On failure the resolved error handler receives the full error map; without
/// one, a fixed 422 response is produced whose body is present only in
/// diagnostics mode. On success the filled parameters are attached under the
/// endpoint's `param_map` slot, then the success handler runs, or the chain
/// continues.
pub fn run<R: ParamRequest>(config: &EndpointConfig, req: &mut R, diagnostics: Diagnostics) -> Verdict {
    let method = req.method().to_string();
    let path = req.route_path().to_string();
    let log = VerifyLog::new(&method, &path);

    match verify(config, &*req) {
        Err(errors) => {
            let names: Vec<&str> = errors.iter().map(|(name, _)| name).collect();
            log.debug(format_args!("rejected parameters: {}", names.join(", ")));

            match error_handler(config, &errors) {
                Some(handler) => {
                    log.trace(format_args!("dispatching to error handler"));
                    handler.call(&errors, req)
                }
                None => Verdict::Respond(failure_response(&errors, diagnostics)),
            }
        }
        Ok(params) => {
            req.attach(&config.param_map, params.clone());
            match success_handler(config) {
                Some(handler) => {
                    log.trace(format_args!("dispatching to success handler"));
                    handler.call(&params, req)
                }
                None => Verdict::Continue,
            }
        }
    }
}

/// The response sent when no error handler is configured.
pub fn failure_response(errors: &ParamErrors, diagnostics: Diagnostics) -> Response {
    if diagnostics.is_enabled() {
        Response::json(
            FAILURE_STATUS,
            json!({ "error": FAILURE_MESSAGE, "params": errors }),
        )
    } else {
        Response::empty(FAILURE_STATUS)
    }
}

/// Own handler of the first failing parameter that declares one, else the
/// endpoint's (itself falling back to the global one).
fn error_handler<'a>(config: &'a EndpointConfig, errors: &ParamErrors) -> Option<&'a ErrorHandler> {
    config
        .params
        .iter()
        .filter(|(name, _)| errors.contains(name))
        .find_map(|(_, spec)| spec.error.as_ref())
        .or(config.error.as_ref())
}

/// Own handler of the first parameter that declares one, else the endpoint's.
fn success_handler(config: &EndpointConfig) -> Option<&SuccessHandler> {
    config
        .params
        .iter()
        .find_map(|(_, spec)| spec.success.as_ref())
        .or(config.success.as_ref())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::callback::Validator;
    use crate::config::{merge_endpoint_config, EndpointDecl, RouterConfig};
    use crate::param::ParamObject;
    use crate::value::ParamType;
    use crate::web::RequestAdapter;

    fn endpoint(decl: EndpointDecl) -> EndpointConfig {
        merge_endpoint_config(&RouterConfig::new(), decl).unwrap()
    }

    fn failure(errors: &ParamErrors, name: &str) -> FailureKind {
        errors.get(name).unwrap().kind.clone()
    }

    #[test]
    fn earlier_bag_wins() {
        let config = endpoint(EndpointDecl::new().param("id", "number"));
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("id", "2");
        req.add_body_param("id", "1");

        let params = verify(&config, &req).unwrap();
        assert_eq!(params["id"], Value::Number(1.0));
    }

    #[test]
    fn unparsable_value_claims_the_key() {
        let config = endpoint(EndpointDecl::new().param("id", "number"));
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_body_param("id", "abc");
        req.add_query_param("id", "7");

        let errors = verify(&config, &req).unwrap_err();
        assert_eq!(failure(&errors, "id"), FailureKind::NotSet);
    }

    #[test]
    fn bags_outside_param_order_are_ignored() {
        let config = endpoint(EndpointDecl::new().param_order(["query"]).param("id", "number"));
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_cookie("id", "3");

        assert!(verify(&config, &req).is_err());
    }

    #[test]
    fn undeclared_keys_pass_through() {
        let config = endpoint(EndpointDecl::new().param("id", "number"));
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("id", "1");
        req.add_query_param("extra", "raw");
        req.add_query_param("tags", "a");
        req.add_query_param("tags", "b");

        let params = verify(&config, &req).unwrap();
        assert_eq!(params["extra"], Value::from("raw"));
        assert_eq!(params["tags"], Value::List(vec![Value::from("a"), Value::from("b")]));
    }

    #[test]
    fn every_failing_param_is_reported() {
        let config = endpoint(
            EndpointDecl::new()
                .param("a", "number")
                .param("b", "string")
                .param("c", "bool(true)"),
        );
        let errors = verify(&config, &RequestAdapter::new("GET", "/x")).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains("a"));
        assert!(errors.contains("b"));
        assert!(!errors.contains("c"));
    }

    #[test]
    fn range_checks_on_numbers_and_string_length() {
        let config = endpoint(
            EndpointDecl::new()
                .param("age", ParamObject::new("number").min(10.0).max(99.0))
                .param("name", ParamObject::new("string").min(2.0).max(4.0)),
        );

        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("age", "100");
        req.add_query_param("name", "a");
        let errors = verify(&config, &req).unwrap_err();
        assert_eq!(failure(&errors, "age"), FailureKind::AboveMax { max: 99.0 });
        assert_eq!(failure(&errors, "name"), FailureKind::BelowMin { min: 2.0 });

        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("age", "10");
        req.add_query_param("name", "abcd");
        assert!(verify(&config, &req).is_ok());
    }

    #[test]
    fn string_length_counts_characters() {
        let config = endpoint(EndpointDecl::new().param("s", ParamObject::new("string").max(2.0)));
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("s", "éé");
        assert!(verify(&config, &req).is_ok());
    }

    #[test]
    fn max_is_checked_before_min() {
        // Inverted bounds make both rules apply.
        let config = endpoint(
            EndpointDecl::new().param("n", ParamObject::new("number").min(10.0).max(5.0)),
        );
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("n", "7");
        let errors = verify(&config, &req).unwrap_err();
        assert_eq!(failure(&errors, "n"), FailureKind::AboveMax { max: 5.0 });
    }

    #[test]
    fn list_bounds_apply_per_element() {
        let config = endpoint(
            EndpointDecl::new().param("ids", ParamObject::new("number").array(true).max(10.0)),
        );
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("ids", "1,20,3");
        let errors = verify(&config, &req).unwrap_err();
        assert_eq!(failure(&errors, "ids"), FailureKind::AboveMax { max: 10.0 });
    }

    #[test]
    fn validator_replaces_builtin_checks() {
        let config = endpoint(
            EndpointDecl::new()
                .param(
                    "code",
                    ParamObject::new("string")
                        .max(1.0)
                        .validate(Validator::new(|_, v| match v {
                            Some(Value::String(s)) if s.starts_with('x') => None,
                            _ => Some("must start with x".to_string()),
                        })),
                )
                .param("other", "number"),
        );

        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("code", "xyz");
        req.add_query_param("other", "1");
        assert!(verify(&config, &req).is_ok(), "max must not apply when a validator is set");

        let errors = verify(&config, &RequestAdapter::new("GET", "/x")).unwrap_err();
        assert_eq!(
            failure(&errors, "code"),
            FailureKind::Rejected("must start with x".to_string())
        );
        assert_eq!(failure(&errors, "other"), FailureKind::NotSet);
    }

    #[test]
    fn validator_can_accept_missing_required_value() {
        let config = endpoint(
            EndpointDecl::new()
                .validate(Validator::new(|_, _| None))
                .param("id", "number"),
        );
        let params = verify(&config, &RequestAdapter::new("GET", "/x")).unwrap();
        assert!(!params.contains_key("id"));
    }

    #[test]
    fn defaults_fill_absent_values_only() {
        let config = endpoint(
            EndpointDecl::new()
                .param("page", "number(1)")
                .param("size", "number(20)")
                .param("q", "string()"),
        );
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("size", "50");

        let params = verify(&config, &req).unwrap();
        assert_eq!(params["page"], Value::Number(1.0));
        assert_eq!(params["size"], Value::Number(50.0));
        assert!(!params.contains_key("q"));
    }

    #[test]
    fn unparsable_optional_value_gets_default() {
        let config = endpoint(EndpointDecl::new().param("flag", "bool(true)"));
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("flag", "maybe");
        assert_eq!(verify(&config, &req).unwrap()["flag"], Value::Bool(true));
    }

    #[test]
    fn run_attaches_params_and_continues() {
        let config = endpoint(EndpointDecl::new().param_map("arguments").param("id", "number"));
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_path_param("id", "9");

        let verdict = run(&config, &mut req, Diagnostics::Disabled);
        assert!(verdict.is_continue());
        assert_eq!(req.attached("arguments").unwrap()["id"], Value::Number(9.0));
    }

    #[test]
    fn run_hides_error_body_without_diagnostics() {
        let config = endpoint(EndpointDecl::new().param("id", "number"));
        let mut req = RequestAdapter::new("GET", "/x");

        let verdict = run(&config, &mut req, Diagnostics::Disabled);
        assert_eq!(verdict, Verdict::Respond(Response::empty(422)));
        assert!(req.attached("args").is_none());
    }

    #[test]
    fn run_reports_error_body_in_diagnostics_mode() {
        let config = endpoint(EndpointDecl::new().param("id", "number"));
        let mut req = RequestAdapter::new("GET", "/x");

        let verdict = run(&config, &mut req, Diagnostics::Enabled);
        let response = verdict.response().unwrap();
        assert_eq!(response.status, 422);
        assert_eq!(
            response.body,
            Some(json!({
                "error": "Required parameters are missing",
                "params": { "id": { "type": "number", "error": "not set" } }
            }))
        );
    }

    #[test]
    fn param_error_handler_wins_over_endpoint() {
        let decl = EndpointDecl::new()
            .on_error(ErrorHandler::new(|_, _| Verdict::Respond(Response::empty(400))))
            .param("a", "number")
            .param(
                "b",
                ParamObject::new("number")
                    .on_error(ErrorHandler::new(|_, _| Verdict::Respond(Response::empty(418)))),
            );
        let config = endpoint(decl);

        // Only `b` fails: its own handler runs.
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("a", "1");
        assert_eq!(run(&config, &mut req, Diagnostics::Disabled).response().unwrap().status, 418);

        // Both fail: `a` has no handler of its own, so `b`'s still wins.
        let mut req = RequestAdapter::new("GET", "/x");
        assert_eq!(run(&config, &mut req, Diagnostics::Disabled).response().unwrap().status, 418);

        // Only `a` fails: the endpoint handler runs.
        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("b", "2");
        assert_eq!(run(&config, &mut req, Diagnostics::Disabled).response().unwrap().status, 400);
    }

    #[test]
    fn param_success_handler_wins_over_global() {
        let global = RouterConfig::new()
            .on_success(SuccessHandler::new(|_, _| Verdict::Respond(Response::empty(201))));
        let decl = EndpointDecl::new().param("a", "number()").param(
            "b",
            ParamObject::new("number")
                .required(false)
                .on_success(SuccessHandler::new(|_, _| Verdict::Respond(Response::empty(202)))),
        );
        let config = merge_endpoint_config(&global, decl).unwrap();

        let mut req = RequestAdapter::new("GET", "/x");
        assert_eq!(run(&config, &mut req, Diagnostics::Disabled).response().unwrap().status, 202);

        let config = merge_endpoint_config(&global, EndpointDecl::new().param("a", "number()")).unwrap();
        let mut req = RequestAdapter::new("GET", "/x");
        assert_eq!(run(&config, &mut req, Diagnostics::Disabled).response().unwrap().status, 201);
    }

    #[test]
    fn error_handler_receives_full_map() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let global = RouterConfig::new().on_error(ErrorHandler::new(move |errors, _| {
            counter.store(errors.len(), Ordering::SeqCst);
            Verdict::Continue
        }));
        let config = merge_endpoint_config(
            &global,
            EndpointDecl::new().param("a", "number").param("b", "string"),
        )
        .unwrap();

        let mut req = RequestAdapter::new("GET", "/x");
        assert!(run(&config, &mut req, Diagnostics::Disabled).is_continue());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn success_handler_sees_filled_params() {
        let decl = EndpointDecl::new()
            .on_success(SuccessHandler::new(|params, req| {
                assert!(req.source("query").is_some());
                Verdict::Respond(Response::json(200, json!({ "page": params["page"] })))
            }))
            .param("page", "number(3)");
        let config = endpoint(decl);

        let mut req = RequestAdapter::new("GET", "/x");
        req.add_query_param("unrelated", "1");
        let verdict = run(&config, &mut req, Diagnostics::Disabled);
        assert_eq!(verdict, Verdict::Respond(Response::json(200, json!({ "page": 3 }))));
        assert!(req.attached("args").is_some(), "params are attached before the success handler");
    }

    #[test]
    fn success_handler_runs_for_endpoints_without_params() {
        let config = endpoint(
            EndpointDecl::new().on_success(SuccessHandler::new(|_, _| {
                Verdict::Respond(Response::empty(204))
            })),
        );
        let mut req = RequestAdapter::new("GET", "/x");
        assert_eq!(run(&config, &mut req, Diagnostics::Disabled).response().unwrap().status, 204);
    }

    #[test]
    fn failure_type_is_declared_type() {
        let config = endpoint(EndpointDecl::new().param("flag", "boolean"));
        let errors = verify(&config, &RequestAdapter::new("GET", "/x")).unwrap_err();
        assert_eq!(errors.get("flag").unwrap().param_type, ParamType::Bool);
    }

    mod proptests {
        use super::*;
        use crate::test_utils::arb_param_name;
        use proptest::prelude::*;

        proptest! {
            /// Filling an already filled map changes nothing.
            #[test]
            fn fill_is_idempotent(
                page in proptest::option::of(0u32..1000),
                name in proptest::option::of("[a-z]{1,8}"),
            ) {
                let config = endpoint(
                    EndpointDecl::new()
                        .param("page", "number(1)")
                        .param("name", "string(anon)")
                        .param("opt", "bool()"),
                );
                let mut req = RequestAdapter::new("GET", "/x");
                if let Some(page) = page {
                    req.add_query_param("page", page.to_string());
                }
                if let Some(name) = name {
                    req.add_query_param("name", name);
                }

                let mut once = verify(&config, &req).unwrap();
                let snapshot = once.clone();
                fill_params(&config, &mut once);
                prop_assert_eq!(once, snapshot);
            }

            /// The earlier bag in `param_order` wins regardless of the later value.
            #[test]
            fn earlier_source_wins(
                key in arb_param_name(),
                first in 0i64..10_000,
                second in 0i64..10_000,
            ) {
                let config = endpoint(
                    EndpointDecl::new()
                        .param_order(["query", "body"])
                        .param(key.clone(), "number"),
                );
                let mut req = RequestAdapter::new("POST", "/x");
                req.add_query_param(key.clone(), first.to_string());
                req.add_body_param(key.clone(), second.to_string());

                let params = verify(&config, &req).unwrap();
                prop_assert_eq!(&params[&key], &Value::Number(first as f64));
            }
        }
    }
}
