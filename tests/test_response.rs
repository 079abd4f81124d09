use polyport::http::response::{NOT_FOUND_PAGE, Response, ResponseBuilder, StatusCode};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::PayloadTooLarge.as_u16(), 413);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(
        StatusCode::PayloadTooLarge.reason_phrase(),
        "Payload Too Large"
    );
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
}

#[test]
fn test_response_builder_basic() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(b"Hello, World!".to_vec())
        .build();

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"Hello, World!".to_vec());
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(body.clone())
        .build();

    let content_length = response.headers.get("Content-Length").unwrap();
    assert_eq!(content_length, &body.len().to_string());
}

#[test]
fn test_response_builder_preserves_custom_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "999")
        .body(b"test".to_vec())
        .build();

    // Should keep the custom value
    assert_eq!(response.headers.get("Content-Length").unwrap(), "999");
}

#[test]
fn test_response_builder_header_set() {
    let set = vec![
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ("X-Frame-Options".to_string(), "DENY".to_string()),
    ];
    let response = ResponseBuilder::new(StatusCode::Ok)
        .headers(set.iter())
        .body(b"{}".to_vec())
        .build();

    assert_eq!(response.headers.len(), 3); // 2 from the set + 1 auto (Content-Length)
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
}

#[test]
fn test_response_builder_empty_body() {
    let response = ResponseBuilder::new(StatusCode::Ok).build();

    assert_eq!(response.body.len(), 0);
    assert_eq!(response.headers.get("Content-Length").unwrap(), "0");
}

#[test]
fn test_response_ok_helper() {
    let response = Response::ok(b"test content".to_vec());

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"test content".to_vec());
}

#[test]
fn test_response_not_found_helper() {
    let response = Response::not_found();

    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.body, NOT_FOUND_PAGE.as_bytes());
    assert!(NOT_FOUND_PAGE.contains("<title>Page not found</title>"));
    assert_eq!(
        response.header("Content-Length"),
        Some(NOT_FOUND_PAGE.len().to_string().as_str())
    );
}

#[test]
fn test_response_with_headers_overlays() {
    let set = vec![("Access-Control-Max-Age".to_string(), "2592000".to_string())];
    let response = Response::internal_error().with_headers(set.iter());

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(response.header("Access-Control-Max-Age"), Some("2592000"));
}

#[test]
fn test_explicit_lowercase_content_length_is_not_duplicated() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("content-length", "2")
        .body(b"hi".to_vec())
        .build();

    let lengths: Vec<_> = response
        .headers
        .keys()
        .filter(|k| k.eq_ignore_ascii_case("Content-Length"))
        .collect();
    assert_eq!(lengths, vec!["content-length"]);
}

#[test]
fn test_set_header_replaces_other_casing() {
    let mut response = ResponseBuilder::new(StatusCode::Ok)
        .header("connection", "keep-alive")
        .build();

    response.set_header("Connection", "close");

    assert_eq!(response.header("connection"), Some("close"));
    assert_eq!(
        response
            .headers
            .keys()
            .filter(|k| k.eq_ignore_ascii_case("connection"))
            .count(),
        1
    );
}

#[test]
fn test_with_headers_overrides_case_insensitively() {
    let standard = [("Access-Control-Allow-Origin".to_string(), "*".to_string())];
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("access-control-allow-origin", "https://elsewhere.test")
        .build()
        .with_headers(standard.iter());

    assert_eq!(response.headers.len(), 2);
    assert_eq!(response.header("ACCESS-CONTROL-ALLOW-ORIGIN"), Some("*"));
}
