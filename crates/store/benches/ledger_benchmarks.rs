use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stockbook_core::{EntityName, ItemId, OwnerId, RecordId};
use stockbook_store::{CategoryRepo, InMemoryStore, ItemRepo, RecordRepo, StockIssue, StockReceipt};
use tokio::runtime::Runtime;

fn bench_owner() -> OwnerId {
    OwnerId::new("bench-user")
}

fn seeded_item(rt: &Runtime, store: &InMemoryStore) -> ItemId {
    rt.block_on(async {
        let owner = bench_owner();
        let category = CategoryRepo::create(store, &owner, &EntityName::new("Pantry").unwrap())
            .await
            .unwrap();
        ItemRepo::create(store, &owner, category.row.id, &EntityName::new("Rice").unwrap())
            .await
            .unwrap()
            .id
    })
}

fn drained_source(rt: &Runtime, store: &InMemoryStore, item: ItemId, children: i64) -> RecordId {
    rt.block_on(async {
        let owner = bench_owner();
        let source = store
            .append_in(StockReceipt {
                owner: owner.clone(),
                item_id: item,
                quantity: children * 2,
                price: 100,
                expiration_date: None,
            })
            .await
            .unwrap();
        for _ in 0..children {
            store
                .append_out(StockIssue {
                    owner: owner.clone(),
                    item_id: item,
                    quantity: 1,
                    source_record_id: source.id,
                })
                .await
                .unwrap();
        }
        source.id
    })
}

fn bench_append_in(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let item = seeded_item(&rt, &store);
    let owner = bench_owner();

    c.bench_function("ledger_append_in", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .append_in(StockReceipt {
                        owner: owner.clone(),
                        item_id: item,
                        quantity: black_box(1),
                        price: 100,
                        expiration_date: None,
                    })
                    .await
                    .unwrap()
            })
        })
    });
}

fn bench_remaining_quantity(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let item = seeded_item(&rt, &store);
    let source = drained_source(&rt, &store, item, 1_000);
    let owner = bench_owner();

    c.bench_function("ledger_remaining_quantity_1000_children", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .remaining_quantity(&owner, black_box(source))
                    .await
                    .unwrap()
            })
        })
    });
}

fn bench_net_quantity(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let item = seeded_item(&rt, &store);
    drained_source(&rt, &store, item, 1_000);
    let owner = bench_owner();

    c.bench_function("ledger_net_quantity_1000_entries", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .net_quantity(&owner, black_box(item))
                    .await
                    .unwrap()
            })
        })
    });
}

fn bench_history(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let item = seeded_item(&rt, &store);
    drained_source(&rt, &store, item, 1_000);
    let owner = bench_owner();

    c.bench_function("ledger_history_1000_entries", |b| {
        b.iter(|| rt.block_on(async { store.history(&owner).await.unwrap() }))
    });
}

criterion_group!(
    benches,
    bench_append_in,
    bench_remaining_quantity,
    bench_net_quantity,
    bench_history
);
criterion_main!(benches);
