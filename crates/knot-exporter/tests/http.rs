//! HTTP surface tests against a scripted control socket.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use knot_collector::{BuildInfo, CollectorConfig, KnotCollector, KnotDescriptors, ProcessMemory};
use knot_ctl::{CtlConnector, CtlData, CtlError, CtlResult, CtlSession, CtlType};
use knot_exporter::build_router;
use tower::ServiceExt;

#[derive(Debug)]
struct Replay {
    units: VecDeque<(CtlType, CtlData)>,
}

impl CtlSession for Replay {
    fn set_timeout(&mut self, _timeout: Option<Duration>) {}

    fn send_command(&mut self, _cmd: &str) -> CtlResult<()> {
        Ok(())
    }

    fn send_command_with_type(&mut self, _cmd: &str, _rtype: &str) -> CtlResult<()> {
        Ok(())
    }

    fn receive(&mut self) -> CtlResult<(CtlType, CtlData)> {
        self.units.pop_front().ok_or(CtlError::Closed)
    }

    fn close(&mut self) {}
}

/// Hands out one replay per connect, then refuses.
struct ReplayConnector {
    responses: Mutex<VecDeque<Vec<(CtlType, CtlData)>>>,
}

impl ReplayConnector {
    fn new(responses: Vec<Vec<(CtlType, CtlData)>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

impl CtlConnector for ReplayConnector {
    fn connect(&self, path: &Path) -> CtlResult<Box<dyn CtlSession>> {
        match self.responses.lock().unwrap().pop_front() {
            Some(mut units) => {
                units.push((CtlType::Block, CtlData::default()));
                Ok(Box::new(Replay { units: units.into() }))
            }
            None => Err(CtlError::Connect {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            }),
        }
    }
}

struct NoProcesses;

impl ProcessMemory for NoProcesses {
    fn list_monitored_process_ids(&self) -> Vec<u32> {
        Vec::new()
    }

    fn resident_memory_bytes(&self, _pid: u32) -> u64 {
        0
    }
}

fn global_stat(item: &str, id: &str, value: &str) -> (CtlType, CtlData) {
    (
        CtlType::Data,
        CtlData {
            section: "server".into(),
            item: item.into(),
            id: id.into(),
            data: value.into(),
            ..CtlData::default()
        },
    )
}

fn test_build() -> BuildInfo {
    BuildInfo {
        version: "1.2.3".into(),
        build_time: "2024-01-01T00:00:00Z".into(),
        git_commit: "abc1234".into(),
        ctl_version: "0.1.0".into(),
        platform: "linux/x86_64".into(),
    }
}

fn router_with(responses: Vec<Vec<(CtlType, CtlData)>>) -> axum::Router {
    let config = CollectorConfig {
        collect_zone_stats: false,
        collect_zone_status: false,
        collect_zone_serial: false,
        ..CollectorConfig::default()
    };
    let collector = KnotCollector::new(
        config,
        Arc::new(ReplayConnector::new(responses)),
        Arc::new(NoProcesses),
        Arc::new(KnotDescriptors::new()),
    )
    .with_build_info(test_build());
    build_router(Arc::new(collector))
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, String, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn metrics_renders_collected_statistics() {
    let router = router_with(vec![vec![
        global_stat("query.total", "udp", "1000"),
        global_stat("query.total", "tcp", "500"),
    ]]);

    let (status, content_type, body) = get(router, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/plain; version=0.0.4; charset=utf-8");
    assert!(body.contains("# TYPE knot_build_info gauge"));
    assert!(body.contains(
        r#"knot_build_info{version="1.2.3",build_time="2024-01-01T00:00:00Z",git_commit="abc1234",ctl_version="0.1.0",platform="linux/x86_64"} 1"#
    ));
    assert!(body.contains("# TYPE knot_stats_query_total gauge"));
    assert!(body.contains(r#"knot_stats_query_total{module="server",type="udp"} 1000"#));
    assert!(body.contains(r#"knot_stats_query_total{module="server",type="tcp"} 500"#));
    assert!(body.contains("# TYPE knot_stats_query_total_total counter"));
}

#[tokio::test]
async fn metrics_succeeds_when_knot_is_down() {
    let router = router_with(Vec::new());

    let (status, _, body) = get(router, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("knot_build_info{"));
    assert!(!body.contains("knot_stats_"));
}

#[tokio::test]
async fn health_reports_reachable_server() {
    let router = router_with(vec![vec![(
        CtlType::Data,
        CtlData {
            data: "Running".into(),
            ..CtlData::default()
        },
    )]]);

    let (status, _, body) = get(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn health_reports_unreachable_server() {
    let (status, _, body) = get(router_with(Vec::new()), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.starts_with("knot unreachable"));
}

#[tokio::test]
async fn index_links_routes() {
    let (status, content_type, body) = get(router_with(Vec::new()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"));
    assert!(body.contains(r#"href="/metrics""#));
    assert!(body.contains(r#"href="/health""#));
    assert!(body.contains("1.2.3"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (status, _, _) = get(router_with(Vec::new()), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
