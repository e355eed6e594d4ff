//! Row decoding throughput benchmark.
//!
//! Measures end-to-end invocation of a SQL tool against an in-memory source
//! for growing result sets using Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;
use toolbox_core::sources::{ColumnInfo, MemoryPool, MemoryResult, MemorySource, RawValue, SourceMap};
use toolbox_core::tools::decode::MYSQL_WIRE_POLICY;
use toolbox_core::tools::{singlestore, AccessToken, Claims, InvocationContext};

const TOOL: &str = r#"
kind: singlestore-sql
source: bench
description: Benchmark query.
statement: SELECT id, doc, name, payload FROM items WHERE id > ?
parameters:
  - name: min_id
    type: integer
    description: Lower bound
"#;

fn result_of(rows: usize) -> MemoryResult {
    MemoryResult::new(
        vec![
            ColumnInfo::new("id", "BIGINT"),
            ColumnInfo::new("doc", "JSON"),
            ColumnInfo::new("name", "VARCHAR"),
            ColumnInfo::new("payload", "BLOB"),
        ],
        (0..rows)
            .map(|i| {
                vec![
                    RawValue::Value(json!(i)),
                    RawValue::Bytes(format!(r#"{{"n":{},"tags":["a","b"]}}"#, i).into_bytes()),
                    RawValue::Bytes(format!("item-{}", i).into_bytes()),
                    RawValue::Bytes(vec![0xAB; 32]),
                ]
            })
            .collect(),
    )
}

fn bench_decode_row(c: &mut Criterion) {
    let result = result_of(1);
    let plan = MYSQL_WIRE_POLICY.plan(&result.columns);

    c.bench_function("decode_row", |b| {
        b.iter(|| {
            MYSQL_WIRE_POLICY
                .decode_row(&result.columns, &plan, black_box(result.rows[0].clone()))
                .unwrap()
        });
    });
}

fn bench_invoke(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let row_counts: &[usize] = &[1, 100, 1000, 10_000];

    let mut group = c.benchmark_group("invoke");
    for &rows in row_counts {
        let pool = Arc::new(MemoryPool::new(result_of(rows)));
        let mut sources = SourceMap::new();
        sources.insert("bench".to_string(), Arc::new(MemorySource::singlestore(pool)));

        let doc: serde_yaml::Value = serde_yaml::from_str(TOOL).unwrap();
        let tool = singlestore::new_config("bench", doc)
            .unwrap()
            .initialize(&sources)
            .unwrap();
        let input = json!({"min_id": 0}).as_object().cloned().unwrap();
        let params = tool.parse_params(&input, &Claims::new()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(rows), &params, |b, p| {
            b.iter(|| {
                rt.block_on(async {
                    tool.invoke(&InvocationContext::new(), black_box(p), &AccessToken::default())
                        .await
                        .unwrap()
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode_row, bench_invoke);
criterion_main!(benches);
