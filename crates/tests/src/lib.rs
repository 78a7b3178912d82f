//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（wire 格式）
//! - 端到端测试：配置 -> StoreClient -> Communicator -> 自监控
//! - 调度循环串行写入与计数单调性

#[cfg(test)]
mod contract_tests {
    use chrono::{TimeZone, Utc};
    use contracts::{Command, Entity, Message, Property, Sample, Series, Severity};
    use serde_json::json;

    #[test]
    fn test_series_wire_shape() {
        let series = Series {
            entity: "host1".to_string(),
            metric: "cpu_busy".to_string(),
            tags: [("dc".to_string(), "eu".to_string())].into(),
            data: vec![Sample { t: 1_700_000_000_000, v: 12.5 }],
        };

        assert_eq!(
            serde_json::to_value(&series).unwrap(),
            json!({
                "entity": "host1",
                "metric": "cpu_busy",
                "tags": {"dc": "eu"},
                "data": [{"t": 1_700_000_000_000_i64, "v": 12.5}]
            })
        );
    }

    #[test]
    fn test_message_wire_shape_omits_unset_fields() {
        let mut message = Message::new("host1", "disk full");
        message.severity = Some(Severity::new("CRITICAL"));

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["severity"], "CRITICAL");
        assert!(value.get("source").is_none());
        assert!(value.get("type").is_none());
        assert!(value.get("date").is_none());
    }

    #[test]
    fn test_property_and_entity_wire_shape() {
        let property = Property {
            prop_type: "disk".to_string(),
            entity: "host1".to_string(),
            key: [("id".to_string(), "sda".to_string())].into(),
            tags: Default::default(),
            date: Some(Utc.timestamp_millis_opt(0).unwrap()),
        };
        let value = serde_json::to_value(&property).unwrap();
        assert_eq!(value["type"], "disk");
        assert_eq!(value["key"]["id"], "sda");

        let mut entity = Entity::new("host1");
        entity.set_tag("os", "linux");
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({"name": "host1", "tags": {"os": "linux"}})
        );
    }

    #[test]
    fn test_command_kind_tagging() {
        let command: Command = serde_json::from_value(json!({
            "kind": "entity_tag",
            "entity": "host1",
            "tags": {"os": "linux"}
        }))
        .unwrap();
        assert!(matches!(command, Command::EntityTag(ref c) if c.tags["os"] == "linux"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{EntityTagCommand, MessageCommand, PropertyCommand, SeriesCommand};
    use dispatcher::{
        Chunk, Communicator, CommunicatorConfig, ConfiguredStore, MockStoreClient, StoreOp,
    };
    use observability::SelfMetricsSummary;

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn read_records(path: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// End-to-end test: TOML config -> file store -> Communicator
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析配置
    /// 2. ConfiguredStore 创建文件 store
    /// 3. Communicator 调度循环写入并计数
    #[tokio::test]
    async fn test_e2e_file_store_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("store.jsonl");
        let toml = format!(
            r#"
[store]
url = "file:///var/lib/atsd"
kind = "file"
params = {{ path = "{}" }}

[dispatcher]
backoff_initial_ms = 10
backoff_ceiling_ms = 1000
"#,
            out.display()
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let store = ConfiguredStore::from_config(&config.store).unwrap();
        let communicator =
            Communicator::spawn(Arc::new(store), CommunicatorConfig::from(&config.dispatcher));

        let chunk: Chunk = vec![
            SeriesCommand::new("host1", Some(ts(1000))).with_metric("cpu", 1.0),
            SeriesCommand::new("host1", Some(ts(2000)))
                .with_metric("cpu", 2.0)
                .with_metric("mem", 50.0),
        ]
        .into();

        communicator
            .queued_send_data(
                vec![chunk],
                vec![EntityTagCommand::new("host1").with_tag("os", "linux")],
                vec![PropertyCommand::new("disk", "host1").with_key("id", "sda")],
                vec![MessageCommand::new("host1", "started").with_tag("severity", "NORMAL")],
            )
            .await
            .unwrap();

        let values = communicator.self_metric_values();
        let counters = Arc::clone(communicator.counters());
        communicator.shutdown().await;

        // Submission order: property, entity tags, message, then chunks
        let records = read_records(&out);
        let ops: Vec<_> = records.iter().map(|r| r["op"].as_str().unwrap()).collect();
        assert_eq!(
            ops,
            vec!["property", "entity_update", "message", "series", "series"]
        );
        assert_eq!(records[2]["body"]["severity"], "NORMAL");

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.series_sent, 2);
        assert_eq!(snapshot.entity_tag_sent, 1);
        assert_eq!(snapshot.property_sent, 1);
        assert_eq!(snapshot.message_sent, 1);

        assert!(values.iter().all(|v| v.transport() == Some("file")));
    }

    #[tokio::test]
    async fn test_self_metrics_summary_after_run() {
        let store = Arc::new(MockStoreClient::new("tcp://atsd.local:8081".parse().unwrap()));
        let communicator = Communicator::spawn(Arc::clone(&store), CommunicatorConfig::default());

        communicator
            .queued_send_data(
                vec![],
                vec![],
                vec![],
                vec![MessageCommand::new("a", "1"), MessageCommand::new("b", "2")],
            )
            .await
            .unwrap();

        let counters = Arc::clone(communicator.counters());
        communicator.shutdown().await;

        let mut summary = SelfMetricsSummary::new();
        summary.update(&counters.self_metric_values("tcp"));
        observability::record_self_metrics(&counters.self_metric_values("tcp"));

        assert_eq!(summary.get("tcp", "message-commands.sent"), Some(2));
        assert_eq!(summary.get("tcp", "message-commands.dropped"), Some(0));
        assert_eq!(summary.get("tcp", "series-commands.sent"), Some(0));
    }

    /// Retry waits follow the configured backoff, capped at the ceiling
    #[tokio::test(start_paused = true)]
    async fn test_configured_backoff_ceiling() {
        let config = ConfigLoader::load_from_str(
            r#"{
                "store": {"url": "https://atsd.local"},
                "dispatcher": {"backoff_initial_ms": 100, "backoff_ceiling_ms": 250}
            }"#,
            ConfigFormat::Json,
        )
        .unwrap();

        let store = Arc::new(
            MockStoreClient::new(config.store.url.clone()).fail_next(StoreOp::InsertSeries, 4),
        );
        let communicator =
            Communicator::spawn(Arc::clone(&store), CommunicatorConfig::from(&config.dispatcher));

        let start = tokio::time::Instant::now();
        communicator
            .queued_send_data(
                vec![vec![SeriesCommand::new("e", Some(ts(0))).with_metric("m", 1.0)].into()],
                vec![],
                vec![],
                vec![],
            )
            .await
            .unwrap();
        let counters = Arc::clone(communicator.counters());
        communicator.shutdown().await;
        let elapsed = start.elapsed();

        // 100 + 200 + 250 + 250
        assert!(elapsed >= Duration::from_millis(800), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(820), "elapsed {elapsed:?}");
        assert_eq!(store.calls(StoreOp::InsertSeries), 5);
        assert_eq!(counters.series.sent(), 1);
    }

    #[tokio::test]
    async fn test_prior_send_bypasses_loop() {
        let store = Arc::new(
            MockStoreClient::new("https://atsd.local".parse().unwrap())
                .fail_always(StoreOp::InsertProperties),
        );
        let communicator = Communicator::spawn(Arc::clone(&store), CommunicatorConfig::default());

        communicator
            .prior_send_data(
                vec![SeriesCommand::new("e", Some(ts(5))).with_metric("m", 1.0)],
                vec![EntityTagCommand::new("e")],
                vec![PropertyCommand::new("t", "e")],
                vec![MessageCommand::new("e", "hi")],
            )
            .await
            .unwrap();

        assert_eq!(store.calls(StoreOp::InsertProperties), 1);
        assert_eq!(store.series().len(), 1);
        assert_eq!(store.messages().len(), 1);
        assert_eq!(communicator.counters().snapshot(), Default::default());

        communicator.shutdown().await;
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use contracts::{
        Chunk, ContractError, Entity, Message, Property, SeriesCommand, Series, StoreClient,
    };
    use dispatcher::{Communicator, CommunicatorConfig};
    use url::Url;

    /// Store that takes a while per write and tracks overlapping writes
    struct SlowStore {
        url: Url,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        series_written: AtomicU64,
    }

    impl SlowStore {
        fn new(delay: Duration) -> Self {
            Self {
                url: "https://slow.local".parse().unwrap(),
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                series_written: AtomicU64::new(0),
            }
        }

        async fn write(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl StoreClient for SlowStore {
        fn url(&self) -> &Url {
            &self.url
        }

        async fn update_entity(&self, _entity: &Entity) -> Result<(), ContractError> {
            self.write().await;
            Ok(())
        }

        async fn create_entity(&self, _entity: &Entity) -> Result<(), ContractError> {
            self.write().await;
            Ok(())
        }

        async fn insert_properties(&self, _properties: &[Property]) -> Result<(), ContractError> {
            self.write().await;
            Ok(())
        }

        async fn insert_messages(&self, _messages: &[Message]) -> Result<(), ContractError> {
            self.write().await;
            Ok(())
        }

        async fn insert_series(&self, series: &[Series]) -> Result<(), ContractError> {
            self.write().await;
            self.series_written
                .fetch_add(series.len() as u64, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_one_write_in_flight_with_many_producers() {
        let store = Arc::new(SlowStore::new(Duration::from_millis(2)));
        let communicator = Arc::new(Communicator::spawn(
            Arc::clone(&store),
            CommunicatorConfig::default(),
        ));
        let ts = Utc.timestamp_millis_opt(1000).unwrap();

        let mut producers = Vec::new();
        for p in 0..4 {
            let communicator = Arc::clone(&communicator);
            producers.push(tokio::spawn(async move {
                let chunks: Vec<Chunk> = (0..5)
                    .map(|i| {
                        vec![SeriesCommand::new(format!("p{p}"), Some(ts))
                            .with_metric(format!("m{i}"), i as f64)]
                        .into()
                    })
                    .collect();
                communicator
                    .queued_send_data(chunks, vec![], vec![], vec![])
                    .await
                    .unwrap();
            }));
        }

        // Counters never decrease while producers run
        let counters = Arc::clone(communicator.counters());
        let watcher = tokio::spawn(async move {
            let mut last = 0;
            for _ in 0..50 {
                let now = counters.series.sent();
                assert!(now >= last);
                last = now;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });

        for producer in producers {
            producer.await.unwrap();
        }
        watcher.await.unwrap();

        let communicator = Arc::try_unwrap(communicator)
            .ok()
            .expect("producers released their handles");
        let counters = Arc::clone(communicator.counters());
        communicator.shutdown().await;

        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(store.series_written.load(Ordering::SeqCst), 20);
        assert_eq!(counters.series.sent(), 20);
    }
}
