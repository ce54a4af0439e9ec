use http::{Method, StatusCode};
use serde_json::Value;
use veneer::middleware::{self, Middleware, Next};
use veneer::{Body, Error, HttpError, RawResponse, Request, Response, ServerRequest};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct Annotate;

impl Middleware for Annotate {
    fn handle(&self, mut request: Request, next: &Next<'_>) -> veneer::Result<Response> {
        request.set("test", "value");
        let mut response = next(request)?;
        response.write(":after")?;
        Ok(response)
    }
}

fn echo_attribute(req: ServerRequest) -> veneer::Result<RawResponse> {
    let value = req.attributes().get("test").and_then(Value::as_str).unwrap_or_default().to_owned();
    Ok(RawResponse::default().with_body(Body::from(format!("test:{value}"))))
}

#[test]
fn wraps_the_handler_on_both_sides() {
    init_tracing();

    let res = Annotate.process(ServerRequest::default(), &echo_attribute).unwrap();
    assert_eq!(res.body().to_string_lossy().unwrap(), "test:value:after");
}

#[test]
fn closure_stage_can_short_circuit() {
    init_tracing();

    let guard = middleware::from_fn(|req: Request, next: &Next<'_>| {
        if req.is_method("post") {
            return next(req);
        }
        let mut res = Response::new(RawResponse::default());
        res.status(StatusCode::METHOD_NOT_ALLOWED, None);
        Ok(res)
    });

    let res = guard.process(ServerRequest::default(), &echo_attribute).unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(res.body().is_empty());

    let post = ServerRequest::default().with_method(Method::POST);
    let res = guard.process(post, &echo_attribute).unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body().to_string_lossy().unwrap(), "test:");
}

#[test]
fn http_errors_become_responses_in_the_stage() {
    init_tracing();

    let handler = |_: ServerRequest| -> veneer::Result<RawResponse> {
        Err(Error::NotFound("Request attribute not found: ['album']".into()))
    };
    let rescue = middleware::from_fn(|req: Request, next: &Next<'_>| match next(req) {
        Err(Error::NotFound(_)) => {
            let err = HttpError::not_found();
            let mut res = Response::new(RawResponse::default());
            res.status(err.status(), None);
            res.body(Body::from(err.title()))?;
            Ok(res)
        }
        other => other,
    });

    let res = rescue.process(ServerRequest::default(), &handler).unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body().to_string_lossy().unwrap(), "404 Not Found");
}
