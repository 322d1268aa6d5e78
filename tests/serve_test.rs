//! HTTP front-end tests: artifact serving, rate limiting, on-miss resolution.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use osm_subareas::config::AppConfig;
use osm_subareas::osm::RelationId;
use osm_subareas::output::{OutputStore, ResolutionRequest};
use osm_subareas::GeoServer;
use tokio::net::TcpListener;

mod common;

async fn write_artifact(out_dir: &Path) -> String {
    let store = OutputStore::new();
    let req = ResolutionRequest {
        root: RelationId(1),
        raw: false,
        separate: false,
        out_dir: out_dir.to_path_buf(),
    };
    store.write(&req, &[]).await.unwrap();
    req.artifact_name()
}

async fn start_server(config: AppConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GeoServer::new(&config).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    addr
}

fn base_config(out_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.resolve.out_dir = out_dir.to_string_lossy().into_owned();
    config
}

#[tokio::test]
async fn serves_artifact_with_cors_and_content_type() {
    let out = tempfile::tempdir().unwrap();
    let artifact = write_artifact(out.path()).await;
    let addr = start_server(base_config(out.path())).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://{addr}/static/{artifact}"))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/geo+json"
    );
    let body = res.text().await.unwrap();
    assert!(body.contains("FeatureCollection"));
}

#[tokio::test]
async fn configured_origin_is_reflected() {
    let out = tempfile::tempdir().unwrap();
    let artifact = write_artifact(out.path()).await;
    let mut config = base_config(out.path());
    config.server.origin = "http://maps.example.com".to_string();
    let addr = start_server(config).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://{addr}/static/{artifact}"))
        .header("Origin", "http://maps.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.headers().get("access-control-allow-origin").unwrap(),
        "http://maps.example.com"
    );
}

#[tokio::test]
async fn unknown_artifact_is_404() {
    let out = tempfile::tempdir().unwrap();
    let addr = start_server(base_config(out.path())).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://{addr}/static/relation-9-normalized-combined.geojson"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = client
        .get(format!("http://{addr}/static/garbage.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn burst_exhaustion_yields_429() {
    let out = tempfile::tempdir().unwrap();
    let artifact = write_artifact(out.path()).await;
    let mut config = base_config(out.path());
    config.server.burst = 3;
    config.server.rate = 0.5;
    let addr = start_server(config).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let url = format!("http://{addr}/static/{artifact}");
    for _ in 0..3 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 429);
}

#[tokio::test]
async fn resolve_on_miss_produces_and_serves_artifact() {
    let mut relations = HashMap::new();
    relations.insert(
        1,
        common::relation_doc(1, &[("name", "Rootland")], &[2], None),
    );
    relations.insert(
        2,
        common::relation_doc(
            2,
            &[("name", "Only Province"), ("admin_level", "4")],
            &[],
            Some((0.0, 0.0)),
        ),
    );
    let upstream = common::start_fixture_upstream(relations).await;

    let out = tempfile::tempdir().unwrap();
    let mut config = base_config(out.path());
    config.upstream = common::fixture_upstream_config(upstream);
    config.server.resolve_on_miss = true;
    let addr = start_server(config).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://{addr}/static/relation-1-normalized-combined.geojson"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert!(body.contains("Only Province"));
    assert!(out
        .path()
        .join("relation-1-normalized-combined.geojson")
        .exists());
}

#[tokio::test]
async fn resolve_on_miss_unknown_root_is_404() {
    let upstream = common::start_fixture_upstream(HashMap::new()).await;

    let out = tempfile::tempdir().unwrap();
    let mut config = base_config(out.path());
    config.upstream = common::fixture_upstream_config(upstream);
    config.server.resolve_on_miss = true;
    let addr = start_server(config).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://{addr}/static/relation-77-normalized-combined.geojson"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
