//! One full cycle, from a stub provider through HTTP to a mock collector.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server};
use shamva_collector::shared::config::ConfigFile;
use shamva_collector::{
    AgentContext, AsyncDataCollector, CollectionError, CycleOutcome, CycleRunner,
    HttpDeliveryClient, MetricsSnapshot, PowerStatus, TokioSleeper,
};

struct FixedProvider;

fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        hostname: String::from("edge-7"),
        platform: String::from("debian"),
        cpu_percent: 3.25,
        load_avg_1: 0.1,
        memory_percent: 20.0,
        memory_used_gb: 1.5,
        memory_total_gb: 7.5,
        disk_percent: 40.0,
        disk_free_gb: 60.0,
        disk_total_gb: 100.0,
        network_sent_mb: 12.0,
        network_recv_mb: 48.0,
        network_sent_mbps: 0.0,
        network_recv_mbps: 0.25,
        top_process_name: None,
        top_process_cpu: None,
        total_processes: 97,
        temperature_celsius: Some(41.5),
        power_status: Some(PowerStatus::Charging),
        battery_percent: Some(88.0),
        network_connected: true,
        network_interface: Some(String::from("wlan0")),
        uptime_seconds: 3_600,
    }
}

#[async_trait]
impl AsyncDataCollector<MetricsSnapshot> for FixedProvider {
    async fn collect(&mut self) -> Result<MetricsSnapshot, CollectionError> {
        Ok(snapshot())
    }

    async fn validate(&self) -> Result<(), CollectionError> {
        Ok(())
    }
}

fn context(endpoint: String, max_retries: i64) -> AgentContext {
    let mut file = ConfigFile::default();
    file.collector.max_retries = max_retries;
    file.collector.initial_delay = String::from("10ms");
    file.shamva.endpoint = endpoint;
    file.shamva.agent_token = String::from("pipeline-token");
    file.shamva.timeout = String::from("5s");
    AgentContext::new(file.resolve().unwrap()).unwrap()
}

fn http_runner(ctx: &AgentContext) -> CycleRunner<FixedProvider, HttpDeliveryClient, TokioSleeper> {
    let client = HttpDeliveryClient::new(ctx).unwrap();
    CycleRunner::new(ctx, FixedProvider, client, TokioSleeper)
}

#[tokio::test]
async fn cycle_delivers_snapshot_to_collector() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/public/metrics")
        .match_header("authorization", "Bearer pipeline-token")
        .match_body(Matcher::PartialJsonString(String::from(concat!(
            r#"{"timestamp":"2025-06-01T12:00:00Z","hostname":"edge-7","#,
            r#""power_status":"Charging","top_process_name":null}"#,
        ))))
        .with_status(200)
        .with_body(r#"{"success":true,"error":null}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = context(format!("{}/public/metrics", server.url()), 3);
    let mut runner = http_runner(&ctx);

    assert_eq!(runner.run_cycle().await, CycleOutcome::Delivered { attempts: 1 });
    mock.assert_async().await;
}

#[tokio::test]
async fn cycle_retries_server_errors_until_exhausted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/public/metrics")
        .with_status(500)
        .with_body("boom")
        .expect(3)
        .create_async()
        .await;

    let ctx = context(format!("{}/public/metrics", server.url()), 3);
    let mut runner = http_runner(&ctx);

    assert_eq!(runner.run_cycle().await, CycleOutcome::Exhausted { attempts: 3 });
    mock.assert_async().await;
}

#[tokio::test]
async fn cycle_stops_on_rejection() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/public/metrics")
        .with_status(422)
        .with_body(r#"{"error":"cpu_percent out of range"}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = context(format!("{}/public/metrics", server.url()), 5);
    let mut runner = http_runner(&ctx);

    assert_eq!(
        runner.run_cycle().await,
        CycleOutcome::Rejected { status: 422, attempts: 1 }
    );
    mock.assert_async().await;
}
