//! Webhook retry behaviour against a scripted HTTP endpoint: two 500s
//! followed by a 200 must succeed on exactly the third attempt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use maxclaw::services::{DeliveryResult, Notifier};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Whether a buffered HTTP request contains its full body per its
/// Content-Length header.
fn request_complete(raw: &[u8]) -> bool {
    let Some(header_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&raw[..header_end]);
    let content_length: usize = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

/// Minimal HTTP endpoint that answers from a fixed status script.
async fn scripted_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let hit = hits_clone.fetch_add(1, Ordering::SeqCst);
            let status = statuses
                .get(hit)
                .copied()
                .unwrap_or(*statuses.last().unwrap());

            // Drain the full request so the client never sees a broken
            // pipe mid-write.
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        request.extend_from_slice(&buf[..n]);
                        if request_complete(&request) {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            let reason = match status {
                200 => "OK",
                429 => "Too Many Requests",
                500 => "Internal Server Error",
                _ => "Error",
            };
            let response =
                format!("HTTP/1.1 {status} {reason}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{addr}/hook"), hits)
}

fn fast_notifier() -> Notifier {
    // TEST_MODE shrinks the back-off base to 10 ms.
    std::env::set_var("TEST_MODE", "1");
    Notifier::new()
}

#[tokio::test]
async fn delivery_succeeds_on_third_attempt_after_two_500s() {
    let (url, hits) = scripted_server(vec![500, 500, 200]).await;
    let notifier = fast_notifier();

    let start = std::time::Instant::now();
    let result = notifier.deliver(&url, json!({"ping": true}), &[]).await;

    assert_eq!(result, DeliveryResult::Delivered { attempts: 3 });
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    // Linear back-off: base*1 + base*2 with the 10 ms test base.
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn http_429_is_retried() {
    let (url, hits) = scripted_server(vec![429, 200]).await;
    let notifier = fast_notifier();

    let result = notifier.deliver(&url, json!({}), &[]).await;
    assert_eq!(result, DeliveryResult::Delivered { attempts: 2 });
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn at_most_three_requests_are_ever_made() {
    let (url, hits) = scripted_server(vec![500, 500, 500, 500]).await;
    let notifier = fast_notifier();

    let result = notifier.deliver(&url, json!({}), &[]).await;
    assert!(matches!(result, DeliveryResult::Failed { attempts: 3, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
