use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use packship_core::OrderId;
use packship_orders::{Order, ShippingLine};
use packship_packing::PackSize;

use super::r#trait::{OrderStore, PackCatalogStore, StoreError};

#[derive(Debug, Default)]
struct OrdersState {
    by_id: HashMap<OrderId, Order>,
    /// Insertion order, oldest first.
    sequence: Vec<OrderId>,
}

/// In-memory catalog and order store.
///
/// Intended for tests/dev and the default `memory` deployment.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    packs: RwLock<BTreeSet<PackSize>>,
    orders: RwLock<OrdersState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a pack catalog.
    pub fn with_pack_sizes(sizes: impl IntoIterator<Item = PackSize>) -> Self {
        Self {
            packs: RwLock::new(sizes.into_iter().collect()),
            orders: RwLock::default(),
        }
    }

    /// Orders newest first; equal timestamps fall back to reverse insertion.
    fn newest_first(state: &OrdersState) -> Vec<Order> {
        let mut orders: Vec<Order> = state
            .sequence
            .iter()
            .rev()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        orders
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl PackCatalogStore for InMemoryStore {
    async fn list_pack_sizes(&self) -> Result<Vec<PackSize>, StoreError> {
        let packs = self.packs.read().map_err(|_| poisoned())?;
        Ok(packs.iter().rev().copied().collect())
    }

    async fn replace_pack_sizes(&self, sizes: &[PackSize]) -> Result<(), StoreError> {
        let mut packs = self.packs.write().map_err(|_| poisoned())?;
        *packs = sizes.iter().copied().collect();
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let id = order.id_typed();
        let mut state = self.orders.write().map_err(|_| poisoned())?;

        if state.by_id.contains_key(&id) {
            return Err(StoreError::Conflict(format!("order {id} already exists")));
        }

        // Order and lines land under one write lock.
        state.by_id.insert(id, order.clone());
        state.sequence.push(id);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.orders.read().map_err(|_| poisoned())?;
        Ok(state.by_id.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let state = self.orders.read().map_err(|_| poisoned())?;
        Ok(Self::newest_first(&state))
    }

    async fn list_shipping(&self) -> Result<Vec<ShippingLine>, StoreError> {
        let state = self.orders.read().map_err(|_| poisoned())?;
        let mut lines: Vec<ShippingLine> = Self::newest_first(&state)
            .into_iter()
            .flat_map(Order::into_shipping)
            .collect();
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lines)
    }

    async fn health(&self) -> Result<(), StoreError> {
        self.packs.read().map_err(|_| poisoned())?;
        self.orders.read().map_err(|_| poisoned())?;
        Ok(())
    }
}
