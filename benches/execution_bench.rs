use criterion::{criterion_group, criterion_main, Criterion};
use hil_runner::core::execution::{execute, FunctionTable, Verdict};
use hil_runner::core::models::{DescriptorId, TestDescriptor, TestKind, TestSpec};
use hil_runner::hardware::registry::RegistryBuilder;
use hil_runner::hardware::sim::SimPowerSupply;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

fn bench_execute_function(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let registry = Arc::new(
        RegistryBuilder::new()
            .power(Arc::new(SimPowerSupply::new()))
            .connect_all(),
    );
    let mut table = FunctionTable::new();
    table.register("noop", |_ctx| Ok(Verdict::Pass));
    let functions = Arc::new(table);
    let evidence = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();

    let descriptor = TestDescriptor {
        id: DescriptorId(0),
        spec: TestSpec {
            name: "bench".to_string(),
            kind: TestKind::Function,
            reference: "noop".to_string(),
            params: BTreeMap::new(),
            timeout: Duration::from_secs(10),
            retries: 0,
            device: None,
        },
    };

    c.bench_function("execute_function", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = execute(
                &descriptor,
                &registry,
                &functions,
                evidence.path(),
                &cancel,
            )
            .await;
        });
    });
}

criterion_group!(benches, bench_execute_function);
criterion_main!(benches);
