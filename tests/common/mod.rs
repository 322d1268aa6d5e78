//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use osm_subareas::config::UpstreamConfig;

/// Start a canned OSM API: answers `relation/{id}/full.json` from the
/// given map and 404s everything else.
pub async fn start_fixture_upstream(relations: HashMap<u64, String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let relations = Arc::new(relations);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let relations = relations.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let request = String::from_utf8_lossy(&buf[..n]);
                        let path = request
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let id = path
                            .strip_prefix("/api/0.6/relation/")
                            .and_then(|rest| rest.strip_suffix("/full.json"))
                            .and_then(|id| id.parse::<u64>().ok());

                        let response = match id.and_then(|id| relations.get(&id)) {
                            Some(body) => format!(
                                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                body.len(),
                                body
                            ),
                            None => {
                                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                                    .to_string()
                            }
                        };
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Upstream config pointed at a fixture server.
pub fn fixture_upstream_config(addr: SocketAddr) -> UpstreamConfig {
    UpstreamConfig {
        endpoint: format!("http://{addr}"),
        timeout_secs: 5,
        max_retries: 0,
        backoff_base_ms: 1,
        backoff_max_ms: 10,
    }
}

/// A `relation/{id}/full.json` document: the relation with the given
/// tags and sub-area children, plus (optionally) the nodes and way of a
/// unit square at `square_at`.
pub fn relation_doc(
    id: u64,
    tags: &[(&str, &str)],
    children: &[u64],
    square_at: Option<(f64, f64)>,
) -> String {
    let mut elements = Vec::new();
    let mut members = Vec::new();

    if let Some((x, y)) = square_at {
        let base = id * 1000;
        let corners = [(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0)];
        for (i, (cx, cy)) in corners.iter().enumerate() {
            elements.push(json!({
                "type": "node",
                "id": base + i as u64 + 1,
                "lon": cx,
                "lat": cy,
            }));
        }
        elements.push(json!({
            "type": "way",
            "id": base,
            "nodes": [base + 1, base + 2, base + 3, base + 4, base + 1],
        }));
        members.push(json!({"type": "way", "ref": base, "role": "outer"}));
    }

    for child in children {
        members.push(json!({"type": "relation", "ref": child, "role": "subarea"}));
    }

    let tag_object: serde_json::Map<String, serde_json::Value> = tags
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();

    elements.push(json!({
        "type": "relation",
        "id": id,
        "members": members,
        "tags": tag_object,
    }));

    json!({"version": "0.6", "elements": elements}).to_string()
}
