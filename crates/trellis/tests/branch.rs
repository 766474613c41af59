//! Route-builder matching semantics observed end to end: method
//! discrimination, parameter binding and overwrite behavior.

use futures::executor::block_on;
use serde_json::json;

use trellis::{App, Branch, Client, HandlerArg, Response, StatusCode};

fn client(branch: &Branch<()>) -> Client<()> {
    Client::new(App::new(branch, |_req, _cookies| async { Ok(()) }))
}

#[test]
fn methods_discriminate_at_the_same_path() {
    let branch = Branch::<()>::init()
        .get("/:f", |_arg: HandlerArg<()>| async {
            Ok(Response::empty(StatusCode::OK))
        })
        .post("/:f", |_arg: HandlerArg<()>| async {
            Ok(Response::empty(StatusCode::CREATED))
        });
    let client = client(&branch);

    assert_eq!(block_on(client.get("/abc").send()).status(), StatusCode::OK);
    assert_eq!(
        block_on(client.post("/def").send()).status(),
        StatusCode::CREATED
    );
    // A different method at a matching shape is a plain miss.
    assert_eq!(
        block_on(client.put("/ghi").send()).status(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn segment_counts_must_match_exactly() {
    let branch = Branch::<()>::init()
        .get("/:f/test", |_arg: HandlerArg<()>| async {
            Ok(Response::empty(StatusCode::OK))
        })
        .post("/part/:f/part/:s", |_arg: HandlerArg<()>| async {
            Ok(Response::empty(StatusCode::CREATED))
        });
    let client = client(&branch);

    assert_eq!(
        block_on(client.get("/abc/test").send()).status(),
        StatusCode::OK
    );
    assert_eq!(
        block_on(client.get("/abc/notest").send()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        block_on(client.post("/abc/test").send()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        block_on(client.post("/part/abc/part/efg").send()).status(),
        StatusCode::CREATED
    );
    assert_eq!(
        block_on(client.post("/part/abc/part/efg/part").send()).status(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn re_registration_overwrites_handler_and_param_names() {
    let branch = Branch::<()>::init()
        .get("/:before", |_arg: HandlerArg<()>| async {
            Ok(Response::empty(StatusCode::OK))
        })
        .get("/:after", |_arg: HandlerArg<()>| async {
            Ok(Response::empty(StatusCode::BAD_REQUEST))
        });

    let response = block_on(client(&branch).get("/abc").send());
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn overwritten_param_names_win_in_the_param_map() {
    let branch = Branch::<()>::init()
        .get("/:one/:two", |arg: HandlerArg<()>| async move {
            Ok(Response::json_value(StatusCode::OK, &arg.params))
        })
        .get("/:three/:four", |arg: HandlerArg<()>| async move {
            Ok(Response::json_value(StatusCode::OK, &arg.params))
        });

    let response = block_on(client(&branch).get("/foo/bar").send());
    assert_eq!(
        response.json_value(),
        Some(json!({"three": "foo", "four": "bar"}))
    );
}

#[test]
fn per_method_param_names_do_not_interfere() {
    let branch = Branch::<()>::init()
        .get("/:one/:two", |arg: HandlerArg<()>| async move {
            Ok(Response::json_value(StatusCode::from_u16(240), &arg.params))
        })
        .post("/:three/:four", |arg: HandlerArg<()>| async move {
            Ok(Response::json_value(StatusCode::from_u16(241), &arg.params))
        });
    let client = client(&branch);

    let get = block_on(client.get("/abc/def").send());
    assert_eq!(get.status().as_u16(), 240);
    assert_eq!(get.json_value(), Some(json!({"one": "abc", "two": "def"})));

    let post = block_on(client.post("/hij/klm").send());
    assert_eq!(post.status().as_u16(), 241);
    assert_eq!(
        post.json_value(),
        Some(json!({"three": "hij", "four": "klm"}))
    );
}
