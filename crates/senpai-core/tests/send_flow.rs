use senpai_core::{
    AskClient, ChatSession, FileCandidate, RevealProgress, Theme, SEND_FAILURE_TEXT,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one request, answering with `body` as JSON. Returns the raw
/// request bytes.
async fn serve_once(listener: TcpListener, body: &'static str) -> Vec<u8> {
    let (mut socket, _) = listener.accept().await.expect("accept");
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = socket.read(&mut buf).await.expect("read");
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
        if request_complete(&request) {
            break;
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await.expect("write");
    socket.shutdown().await.ok();
    request
}

fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = find(request, b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let body = &request[header_end + 4..];

    match head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        Some(length) => body.len() >= length,
        None => body.ends_with(b"0\r\n\r\n"),
    }
}

/// Talks to the loopback listener directly, ignoring any proxy settings.
fn local_client(addr: std::net::SocketAddr) -> AskClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    AskClient::with_client(&format!("http://{}", addr), http)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[tokio::test]
async fn test_successful_send_reveals_reply() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_once(
        listener,
        r#"{"response": "**Halo** dari server", "image_url": "https://img.example/x.png"}"#,
    ));

    let mut session = ChatSession::new(Theme::Dark);
    session.input = "apa kabar?".to_string();
    session
        .stage(FileCandidate::new("notes.txt", "text/plain", b"isi catatan".to_vec()))
        .unwrap();

    let client = local_client(addr);
    let outbound = session.begin_send().expect("send starts");
    let result = client.ask(&outbound).await;
    let index = session.complete_send(result).expect("reply to reveal");

    let request = String::from_utf8_lossy(&server.await.unwrap()).to_string();
    assert!(request.starts_with("POST /ask HTTP/1.1"));
    assert!(request.contains("name=\"message\""));
    assert!(request.contains("apa kabar?"));
    assert!(request.contains("name=\"files\"; filename=\"notes.txt\""));
    assert!(request.contains("isi catatan"));

    while session.advance_reveal(index) == RevealProgress::Advanced {}
    let reply = &session.messages()[index];
    assert_eq!(reply.visible_text(), "**Halo** dari server");
    assert!(reply.image.is_some());
    assert!(!session.interaction_disabled());
}

#[tokio::test]
async fn test_unreachable_backend_shows_failure_message() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut session = ChatSession::default();
    session.input = "halo".to_string();
    let outbound = session.begin_send().unwrap();

    let client = local_client(addr);
    let result = client.ask(&outbound).await;
    assert!(result.is_err());
    assert!(session.complete_send(result).is_none());

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, SEND_FAILURE_TEXT);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_missing_backend_url_fails_the_turn() {
    let mut session = ChatSession::default();
    session.input = "halo".to_string();
    let outbound = session.begin_send().unwrap();

    let result = AskClient::new("").ask(&outbound).await;
    session.complete_send(result);
    assert_eq!(session.messages().last().unwrap().text, SEND_FAILURE_TEXT);
}
