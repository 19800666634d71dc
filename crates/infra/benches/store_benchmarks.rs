use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

use demeter_core::{PageRequest, TenantId};
use demeter_infra::store::{Filter, InMemoryStore, Store};
use demeter_inventory::{BatchStatus, CreateStockBatchRequest, StockBatch, allocate_fefo};
use demeter_products::{CreateProductRequest, Product, ProductId};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn tenant() -> TenantId {
    TenantId::parse("bench-tenant").unwrap()
}

fn batch(product_id: ProductId, i: usize) -> StockBatch {
    let now = Utc::now();
    StockBatch::create(
        CreateStockBatchRequest {
            product_id,
            batch_code: format!("B-{i:06}"),
            quantity: Decimal::from(10 + (i % 7) as i64),
            unit: "pots".into(),
            warehouse_id: None,
            bin_id: None,
            custom_attributes: None,
            entry_date: Some(now - Duration::days(i as i64)),
            expiry_date: Some(now + Duration::days(((i * 13) % 90) as i64 + 1)),
        },
        now,
    )
    .unwrap()
}

/// Store with one product and `batches` stock batches for it.
fn seeded(rt: &Runtime, batches: usize) -> (InMemoryStore, ProductId) {
    let store = InMemoryStore::new();
    let product = Product::create(
        CreateProductRequest {
            sku: "BENCH".into(),
            name: "Bench plant".into(),
            description: None,
            category_id: None,
            state: None,
            custom_attributes: None,
        },
        Utc::now(),
    )
    .unwrap();
    rt.block_on(async {
        let mut tx = store.begin(&tenant()).await.unwrap();
        tx.insert(&product).await.unwrap();
        for i in 0..batches {
            tx.insert(&batch(product.id, i)).await.unwrap();
        }
        tx.commit().await.unwrap();
    });
    (store, product.id)
}

fn bench_insert_commit(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("insert_commit");
    for size in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let (store, product_id) = seeded(&rt, 0);
            let mut next = 0usize;
            b.iter(|| {
                rt.block_on(async {
                    let mut tx = store.begin(&tenant()).await.unwrap();
                    for _ in 0..size {
                        next += 1;
                        tx.insert(&batch(product_id, next)).await.unwrap();
                    }
                    tx.commit().await.unwrap();
                })
            });
        });
    }
    group.finish();
}

fn bench_filtered_page(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("filtered_page");
    for size in [100usize, 1_000, 10_000] {
        let (store, product_id) = seeded(&rt, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let mut tx = store.begin(&tenant()).await.unwrap();
                    let page = tx
                        .page::<StockBatch>(
                            vec![
                                Filter::eq("productId", product_id),
                                Filter::eq("status", BatchStatus::Active.as_str()),
                            ],
                            PageRequest::new(0, 20).unwrap(),
                        )
                        .await
                        .unwrap();
                    black_box(page.total_elements)
                })
            });
        });
    }
    group.finish();
}

fn bench_fefo_allocation(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("fefo_allocation");
    for size in [10usize, 100, 1_000] {
        let (store, product_id) = seeded(&rt, size);
        let batches: Vec<StockBatch> = rt.block_on(async {
            let mut tx = store.begin(&tenant()).await.unwrap();
            tx.find_all::<StockBatch>(Vec::new()).await.unwrap()
        });
        let requested = Decimal::from((size * 5) as i64);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(allocate_fefo(&batches, product_id, requested, Utc::now()).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert_commit, bench_filtered_page, bench_fefo_allocation);
criterion_main!(benches);
