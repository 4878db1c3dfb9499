//! Postgres store round trips.
//!
//! Needs a scratch database: set `PACKSHIP_TEST_DATABASE_URL`. Without it the
//! tests return early.

use packship_core::OrderId;
use packship_infra::{OrderService, OrderStore, PackCatalogStore, PostgresStore, StoreError};
use packship_packing::PackSize;

async fn connect() -> Option<PostgresStore> {
    let url = std::env::var("PACKSHIP_TEST_DATABASE_URL").ok()?;
    let store = PostgresStore::connect(&url).await.expect("connect to test database");
    store.migrate().await.expect("run migrations");
    Some(store)
}

/// One test drives the shared scratch database so catalog changes do not
/// race with order creation.
#[tokio::test]
async fn postgres_store_round_trips() {
    let Some(store) = connect().await else {
        eprintln!("PACKSHIP_TEST_DATABASE_URL not set; skipping");
        return;
    };

    catalog_replace_is_wholesale(&store).await;
    order_round_trips(&store).await;
    duplicate_insert_conflicts_and_leaves_no_partial_lines(&store).await;
}

async fn catalog_replace_is_wholesale(store: &PostgresStore) {
    let sizes: Vec<PackSize> = [53, 31, 23]
        .into_iter()
        .map(|s| PackSize::new(s).unwrap())
        .collect();
    store.replace_pack_sizes(&sizes).await.unwrap();
    assert_eq!(store.list_pack_sizes().await.unwrap(), sizes);
}

async fn order_round_trips(store: &PostgresStore) {
    let service = OrderService::new(store.clone(), store.clone());
    service
        .seed_pack_sizes(&[250, 500, 1000, 2000, 5000], true)
        .await
        .unwrap();

    let order = service.create_order(12001).await.unwrap();
    let loaded = store.get_order(order.id_typed()).await.unwrap().unwrap();

    assert_eq!(loaded.id_typed(), order.id_typed());
    assert_eq!(loaded.number_of_items(), 12001);
    let lines: Vec<(u64, u64)> = loaded
        .shipping()
        .iter()
        .map(|l| (l.pack_size.items(), l.quantity))
        .collect();
    assert_eq!(lines, vec![(5000, 2), (2000, 1), (250, 1)]);

    let listed = store.list_orders().await.unwrap();
    assert!(listed.iter().any(|o| o.id_typed() == order.id_typed()));
    let shipping = store.list_shipping().await.unwrap();
    assert!(shipping.iter().any(|l| l.order_id == order.id_typed()));

    assert!(store.get_order(OrderId::new()).await.unwrap().is_none());
    store.health().await.unwrap();
}

async fn duplicate_insert_conflicts_and_leaves_no_partial_lines(store: &PostgresStore) {
    let service = OrderService::new(store.clone(), store.clone());
    let order = service.create_order(501).await.unwrap();

    let err = store.create_order(&order).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let loaded = store.get_order(order.id_typed()).await.unwrap().unwrap();
    assert_eq!(loaded.shipping().len(), 2);
}
