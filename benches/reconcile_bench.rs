//! Reconciliation throughput.
//!
//! Measures a steady-state pass (every record matched, nothing swept) over
//! directories of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use alertr_core::directory::{Directory, Node, Sensor, ServerOption};
use alertr_core::pipeline::Reconciler;
use alertr_core::{EventLog, PassContext, Snapshot};

fn snapshot(nodes: i64, sensors_per_node: i64) -> Snapshot {
    Snapshot {
        options: vec![ServerOption {
            kind: "alertSystemActive".to_string(),
            value: "1".to_string(),
            checked: false,
        }],
        nodes: (0..nodes)
            .map(|node_id| Node {
                node_id,
                hostname: format!("host-{}", node_id),
                connected: true,
                ..Default::default()
            })
            .collect(),
        sensors: (0..nodes * sensors_per_node)
            .map(|sensor_id| Sensor {
                sensor_id,
                node_id: sensor_id / sensors_per_node,
                description: format!("sensor-{}", sensor_id),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn bench_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_steady_state");
    let ctx = PassContext::at(1_700_000_000);

    for nodes in [10i64, 50, 200] {
        let snap = snapshot(nodes, 4);
        let mut directory = Directory::new();
        let mut events = EventLog::new();
        Reconciler::new(&mut directory, &mut events, &ctx)
            .reconcile(snap.clone())
            .unwrap_or_else(|e| panic!("seed snapshot rejected: {e}"));

        group.bench_with_input(BenchmarkId::from_parameter(nodes), &snap, |b, snap| {
            b.iter(|| {
                Reconciler::new(&mut directory, &mut events, &ctx)
                    .reconcile(black_box(snap.clone()))
                    .unwrap_or_else(|e| panic!("snapshot rejected: {e}"));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_steady_state);
criterion_main!(benches);
