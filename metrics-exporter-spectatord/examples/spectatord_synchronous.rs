use std::{thread, time::Duration};

use metrics::{counter, gauge, histogram};
use metrics_exporter_spectatord::SpectatordBuilder;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

fn main() {
    tracing_subscriber::fmt::init();

    let registry = SpectatordBuilder::from_env()
        .with_location("udp://127.0.0.1:1234")
        .with_buffer_size(1024)
        .with_common_tags([("nf.app", "spectatord_synchronous")])
        .install()
        .expect("failed to install SpectatorD recorder");

    counter!("idle_metric").increment(1);
    gauge!("testing").set(42.0);

    let server_loops = counter!("tcp_server_loops", "system" => "foo");
    let server_loop_delta_ms = histogram!("tcp_server_loop_delta_ms", "system" => "foo");
    let latency = registry.percentile_timer("tcp_server_latency", [("system", "foo")]);

    let mut rng = Xoshiro256StarStar::try_from_rng(&mut rand::rng()).unwrap();

    // Loop over and over, pretending to do some work.
    for _ in 0..10_000 {
        server_loops.increment(1);
        server_loop_delta_ms.record(rng.random_range(0.0..1000.0));
        latency.record(Duration::from_micros(rng.random_range(50..5000)));

        let gauge = gauge!("lucky_iterations");
        if rand::random_bool(0.75) {
            gauge.increment(1.0);
        } else {
            gauge.decrement(1.0);
        }

        thread::sleep(Duration::from_millis(1));
    }

    registry.close();
}
