use super::super::common;
use anyhow::Result;
use mysqld_exporter::collectors::Collector;
use mysqld_exporter::collectors::status::{StatusCollector, StatusSource};
use prometheus::{Encoder, TextEncoder};

fn encode(families: &[prometheus::proto::MetricFamily]) -> String {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[tokio::test]
async fn test_global_status_rows_are_streamed() -> Result<()> {
    let Some(source) = common::live_source().await else {
        return Ok(());
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    source.stream(tx).await?;

    let mut names = Vec::new();
    while let Some(row) = rx.recv().await {
        names.push(row.name);
    }

    assert!(names.iter().any(|n| n.eq_ignore_ascii_case("Uptime")));
    assert!(names.iter().any(|n| n.eq_ignore_ascii_case("Com_select")));
    assert!(names.iter().all(|n| !n.is_empty()));

    Ok(())
}

#[tokio::test]
async fn test_status_collector_collects_metrics() -> Result<()> {
    let Some(source) = common::live_source().await else {
        return Ok(());
    };

    let collector = StatusCollector::new();
    let families = collector.collect(&source).await?;
    let text = encode(&families);

    for name in [
        "mysql_uptime",
        "mysql_threads_connected",
        "mysql_commands_total",
        "mysql_exporter_last_scrape_duration_seconds",
    ] {
        assert!(
            families.iter().any(|f| f.name() == name),
            "metric {name} should exist"
        );
    }

    assert!(text.contains("mysql_commands_total{command=\"select\"}"));
    assert!(text.contains("mysql_exporter_last_scrape_error 0"));
    assert!(!collector.last_outcome().errored);

    Ok(())
}

#[tokio::test]
async fn test_status_collector_never_shrinks() -> Result<()> {
    let Some(source) = common::live_source().await else {
        return Ok(());
    };

    let collector = StatusCollector::new();
    let first = collector.collect(&source).await?;
    let second = collector.collect(&source).await?;

    for family in &first {
        assert!(
            second.iter().any(|f| f.name() == family.name()),
            "{} disappeared after the second scrape",
            family.name()
        );
    }
    assert_eq!(collector.scrapes_total(), 2);
    assert!(encode(&second).contains("mysql_exporter_scrapes_total 2"));

    Ok(())
}

#[tokio::test]
async fn test_describe_grows_after_scrape() -> Result<()> {
    let Some(source) = common::live_source().await else {
        return Ok(());
    };

    let collector = StatusCollector::new();
    let before = collector.describe().len();
    collector.collect(&source).await?;

    assert!(collector.describe().len() > before);

    Ok(())
}
