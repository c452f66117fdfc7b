use burrow::http::response::{Response, ResponseBuilder, StatusCode};
use burrow::http::writer::{MessageWriter, serialize_response};
use tokio::io::{AsyncReadExt, duplex};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::BadGateway.as_u16(), 502);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::BadGateway.reason_phrase(), "Bad Gateway");
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::BadGateway)
        .body(body.clone())
        .build();

    let content_length = response
        .headers
        .iter()
        .find(|(k, _)| k == "Content-Length")
        .map(|(_, v)| v.as_str());
    assert_eq!(content_length, Some("16"));
}

#[test]
fn test_response_builder_replaces_header() {
    let response = ResponseBuilder::new(StatusCode::BadRequest)
        .header("Content-Type", "text/html")
        .header("content-type", "text/plain")
        .build();

    // content-type + auto Content-Length
    assert_eq!(response.headers.len(), 2);
    assert_eq!(response.headers[0], ("content-type".to_string(), "text/plain".to_string()));
}

#[test]
fn test_response_builder_preserves_custom_content_length() {
    let response = ResponseBuilder::new(StatusCode::BadRequest)
        .header("Content-Length", "999")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.headers.len(), 1);
    assert_eq!(response.headers[0].1, "999");
}

#[test]
fn test_local_unreachable_is_well_formed() {
    let response = Response::local_unreachable();
    let bytes = serialize_response(&response);
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
    assert!(text.contains("Connection: close\r\n"));

    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let declared: usize = head
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(declared, body.len());
}

#[tokio::test]
async fn test_message_writer_writes_everything() {
    let (mut client, mut server) = duplex(16);
    let response = Response::bad_request();
    let expected = serialize_response(&response);

    let reader = tokio::spawn(async move {
        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        out
    });

    let mut writer = MessageWriter::response(&response);
    let written = writer.write_to_stream(&mut client).await.unwrap();
    assert_eq!(written, expected.len());
    drop(client);

    assert_eq!(reader.await.unwrap(), expected);
}
