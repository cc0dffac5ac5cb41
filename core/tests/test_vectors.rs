//! Verify template expansion and request building against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Request bodies are compared as parsed JSON (not raw strings) so field
//! ordering never causes false negatives.

use std::sync::{Arc, Mutex};

use remote_core::{
    Arguments, Bindings, Body, ConfigError, Expander, HttpMethod, InterfaceDecl, ListExpander,
    MapExpander, RemoteClient, Request, Response, SimpleExpander, Target, TransportError,
    UriTemplate,
};
use serde_json::Value;

fn expander(shape: &str) -> Box<dyn Expander> {
    match shape {
        "scalar" => Box::new(SimpleExpander),
        "sequence" => Box::new(ListExpander),
        "map" => Box::new(MapExpander),
        other => panic!("unknown shape: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Template expansion
// ---------------------------------------------------------------------------

#[test]
fn expansion_test_vectors() {
    let raw = include_str!("../../test-vectors/expansion.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let template = UriTemplate::parse(case["template"].as_str().unwrap())
            .unwrap_or_else(|e| panic!("{name}: {e}"));

        let owned: Vec<(&str, &Value, Box<dyn Expander>)> = case["bindings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| {
                (
                    b["name"].as_str().unwrap(),
                    &b["value"],
                    expander(b["shape"].as_str().unwrap()),
                )
            })
            .collect();
        let mut bindings = Bindings::new();
        for (variable, value, expander) in &owned {
            bindings.push(variable, value, expander.as_ref());
        }

        assert_eq!(
            template.expand(&bindings),
            case["expected"].as_str().unwrap(),
            "{name}"
        );
    }
}

#[test]
fn invalid_template_vectors() {
    let raw = include_str!("../../test-vectors/expansion.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["invalid"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let template = case["template"].as_str().unwrap();
        assert!(UriTemplate::parse(template).is_err(), "{name}: {template} should not parse");
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    s.parse().unwrap_or_else(|_| panic!("unknown method: {s}"))
}

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let sent: Arc<Mutex<Vec<Request>>> = Arc::default();
    let recorder = Arc::clone(&sent);
    let client = RemoteClient::builder(Target::new("api", vectors["root"].as_str().unwrap()).unwrap())
        .interface(InterfaceDecl::from_json(include_str!("../../test-vectors/blog-interface.json")).unwrap())
        .client(Arc::new(move |request: &Request| -> Result<Response, TransportError> {
            recorder.lock().unwrap().push(request.clone());
            Ok(Response::builder().status(200).body(Body::from_bytes("{}")).build())
        }))
        .build()
        .unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let args = Arguments::from(case["args"].as_array().unwrap().clone());
        client
            .invoke(case["method"].as_str().unwrap(), &args)
            .unwrap_or_else(|e| panic!("{name}: {e}"));

        let req = sent.lock().unwrap().pop().unwrap();
        let expected = &case["expected_request"];
        assert_eq!(req.method(), parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.uri(), expected["uri"].as_str().unwrap(), "{name}: uri");

        let headers: Vec<(String, String)> = req
            .headers()
            .iter()
            .flat_map(|h| h.values.iter().map(move |v| (h.name.clone(), v.clone())))
            .collect();
        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(headers, expected_headers, "{name}: headers");

        let body = req.content().map(|c| serde_json::from_slice::<Value>(c).unwrap());
        assert_eq!(body.unwrap_or(Value::Null), expected["body"], "{name}: body");

        let options = req.options();
        assert_eq!(
            options.connect_timeout.as_millis() as u64,
            expected["connect_timeout_ms"].as_u64().unwrap(),
            "{name}: connect timeout"
        );
        assert_eq!(
            options.read_timeout.as_millis() as u64,
            expected["read_timeout_ms"].as_u64().unwrap(),
            "{name}: read timeout"
        );
    }
}

// ---------------------------------------------------------------------------
// Interface validation
// ---------------------------------------------------------------------------

fn error_kind(err: &ConfigError) -> &'static str {
    match err {
        ConfigError::Template { .. } => "template",
        ConfigError::AmbiguousBody { .. } => "ambiguous_body",
        ConfigError::BodyAndNamed { .. } => "body_and_named",
        ConfigError::NestedAsync { .. } => "nested_async",
        ConfigError::DuplicateMethod(_) => "duplicate_method",
        ConfigError::UnknownExpander { .. } => "unknown_expander",
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_interface_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["invalid_interfaces"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let interface: InterfaceDecl = serde_json::from_value(case["interface"].clone()).unwrap();
        let err = RemoteClient::builder(Target::new("api", "http://api.test").unwrap())
            .interface(interface)
            .client(Arc::new(|_: &Request| -> Result<Response, TransportError> {
                Err(TransportError::new("unused"))
            }))
            .build()
            .err()
            .unwrap_or_else(|| panic!("{name}: should not build"));
        assert_eq!(error_kind(&err), case["error"].as_str().unwrap(), "{name}");
    }
}
