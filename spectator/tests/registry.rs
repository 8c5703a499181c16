use std::{fs, sync::Arc, time::Duration};

use spectator::{
    writer::{MemoryWriter, Writer},
    Config, Registry, Tags,
};
use tempfile::TempDir;

fn memory_registry() -> (Arc<MemoryWriter>, Registry) {
    let memory = Arc::new(MemoryWriter::new());
    let writer: Arc<dyn Writer> = memory.clone();
    (memory, Registry::with_writer(Config::default(), writer))
}

fn assert_single_line(memory: &MemoryWriter, expected: &str) {
    assert_eq!(memory.lines(), vec![expected.to_string()]);
}

#[test]
fn age_gauge() {
    let (memory, registry) = memory_registry();
    registry.age_gauge("test_age_gauge", Tags::new()).set(100);
    assert_single_line(&memory, "A:test_age_gauge:100");
}

#[test]
fn counter() {
    let (memory, registry) = memory_registry();
    registry.counter("test_counter", Tags::new()).increment();
    assert_single_line(&memory, "c:test_counter:1");
}

#[test]
fn distribution_summary() {
    let (memory, registry) = memory_registry();
    registry.distribution_summary("test_distributionsummary", Tags::new()).record(300);
    assert_single_line(&memory, "d:test_distributionsummary:300");
}

#[test]
fn gauge() {
    let (memory, registry) = memory_registry();
    registry.gauge("test_gauge", Tags::new()).set(100.0);
    assert_single_line(&memory, "g:test_gauge:100.000000");
}

#[test]
fn gauge_with_ttl() {
    let (memory, registry) = memory_registry();
    registry.gauge_with_ttl("test_gauge_ttl", Tags::new(), Duration::from_secs(60)).set(100.1);
    assert_single_line(&memory, "g,60:test_gauge_ttl:100.100000");
}

#[test]
fn max_gauge() {
    let (memory, registry) = memory_registry();
    registry.max_gauge("test_maxgauge", Tags::new()).set(200.0);
    assert_single_line(&memory, "m:test_maxgauge:200.000000");
}

#[test]
fn monotonic_counter() {
    let (memory, registry) = memory_registry();
    registry.monotonic_counter("test_monotonic_counter", Tags::new()).set(1.0);
    assert_single_line(&memory, "C:test_monotonic_counter:1.000000");
}

#[test]
fn monotonic_counter_uint() {
    let (memory, registry) = memory_registry();
    registry.monotonic_counter_uint("test_monotonic_counter_uint", Tags::new()).set(1);
    assert_single_line(&memory, "U:test_monotonic_counter_uint:1");
}

#[test]
fn percentile_distribution_summary() {
    let (memory, registry) = memory_registry();
    registry.percentile_distribution_summary("test_percentiledistributionsummary", Tags::new()).record(400);
    assert_single_line(&memory, "D:test_percentiledistributionsummary:400");
}

#[test]
fn percentile_timer() {
    let (memory, registry) = memory_registry();
    registry.percentile_timer("test_percentiletimer", Tags::new()).record(Duration::from_millis(500));
    assert_single_line(&memory, "T:test_percentiletimer:0.500000");
}

#[test]
fn timer() {
    let (memory, registry) = memory_registry();
    registry.timer("test_timer", Tags::new()).record(Duration::from_millis(100));
    assert_single_line(&memory, "t:test_timer:0.100000");
}

#[test]
fn default_config_builds_registry() {
    let registry = Registry::new(Config::default());
    assert!(registry.is_ok());
}

#[test]
fn invalid_location_is_rejected() {
    let result = Config::builder().with_location("bogus").build();
    assert!(result.is_err());
}

#[test]
fn file_destination_end_to_end() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let path = temp_dir.path().join("spectatord.txt");

    let config = Config::builder()
        .with_location(format!("file://{}", path.display()))
        .with_common_tag("nf.app", "test")
        .build()
        .expect("invalid configuration");
    let registry = Registry::new(config).expect("failed to create registry");

    registry.counter("requests", Tags::new()).add(3);
    registry.counter("requests", Tags::new()).add(-3);
    registry.gauge("queue", Tags::new()).set(1.5);
    registry.close();

    assert_eq!(fs::read_to_string(&path).unwrap(), "c:requests,nf.app=test:3\ng:queue,nf.app=test:1.500000\n");
}
