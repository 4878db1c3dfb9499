use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use packship_core::{DomainError, DomainResult, Entity, OrderId, ShippingLineId};
use packship_packing::{PackAssignment, PackSize};

/// Shipping line: how many packs of one size an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLine {
    pub id: ShippingLineId,
    pub order_id: OrderId,
    pub pack_size: PackSize,
    /// Number of packs of `pack_size` (always >= 1).
    pub quantity: u64,
    pub created_at: DateTime<Utc>,
}

impl ShippingLine {
    pub fn items(&self) -> u64 {
        self.pack_size.items() * self.quantity
    }
}

impl Entity for ShippingLine {
    type Id = ShippingLineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub number_of_items: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Entity: Order.
///
/// An order owns its shipping lines. Lines are kept largest pack size first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    number_of_items: u64,
    shipping: Vec<ShippingLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Assemble a new order from the selector's output.
    ///
    /// One shipping line per pack size in the assignment, carrying the number
    /// of packs of that size.
    pub fn assemble(cmd: &CreateOrder, assignment: &PackAssignment) -> DomainResult<Self> {
        if cmd.number_of_items == 0 {
            return Err(DomainError::validation("number_of_items must be positive"));
        }
        if assignment.requested() != cmd.number_of_items {
            return Err(DomainError::invariant(format!(
                "assignment was computed for {} items, order requests {}",
                assignment.requested(),
                cmd.number_of_items
            )));
        }

        let shipping = assignment
            .iter()
            .map(|(pack_size, quantity)| ShippingLine {
                id: ShippingLineId::new(),
                order_id: cmd.order_id,
                pack_size,
                quantity,
                created_at: cmd.occurred_at,
            })
            .collect();

        Ok(Self {
            id: cmd.order_id,
            number_of_items: cmd.number_of_items,
            shipping,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    /// Rebuild an order loaded from storage.
    ///
    /// Lines may arrive in any order; they are re-sorted largest pack first.
    /// An order with no lines at all is accepted as-is. Once lines exist they
    /// must cover `number_of_items`.
    pub fn rehydrate(
        id: OrderId,
        number_of_items: u64,
        mut shipping: Vec<ShippingLine>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if number_of_items == 0 {
            return Err(DomainError::invariant("stored order has no items"));
        }
        if let Some(line) = shipping.iter().find(|l| l.order_id != id) {
            return Err(DomainError::invariant(format!(
                "shipping line {} belongs to order {}, not {}",
                line.id, line.order_id, id
            )));
        }
        if shipping.iter().any(|l| l.quantity == 0) {
            return Err(DomainError::invariant("shipping line with zero packs"));
        }
        if !shipping.is_empty() {
            let shipped = shipping
                .iter()
                .try_fold(0u64, |acc, l| {
                    l.pack_size
                        .items()
                        .checked_mul(l.quantity)
                        .and_then(|n| acc.checked_add(n))
                })
                .ok_or_else(|| DomainError::invariant("shipped item count overflows"))?;
            if shipped < number_of_items {
                return Err(DomainError::invariant(format!(
                    "shipping lines cover {shipped} of {number_of_items} items"
                )));
            }
        }

        shipping.sort_by(|a, b| b.pack_size.cmp(&a.pack_size));

        Ok(Self {
            id,
            number_of_items,
            shipping,
            created_at,
            updated_at,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn number_of_items(&self) -> u64 {
        self.number_of_items
    }

    pub fn shipping(&self) -> &[ShippingLine] {
        &self.shipping
    }

    pub fn into_shipping(self) -> Vec<ShippingLine> {
        self.shipping
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Items actually shipped across all lines.
    pub fn shipped_items(&self) -> u64 {
        self.shipping.iter().map(ShippingLine::items).sum()
    }

    /// Items shipped beyond what was ordered. Zero for orders stored without
    /// shipping lines.
    pub fn surplus(&self) -> u64 {
        self.shipped_items().saturating_sub(self.number_of_items)
    }

    pub fn pack_count(&self) -> u64 {
        self.shipping.iter().map(|l| l.quantity).sum()
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packship_packing::solve;
    use proptest::prelude::*;

    const CATALOG: [u64; 5] = [250, 500, 1000, 2000, 5000];

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(number_of_items: u64) -> CreateOrder {
        CreateOrder {
            order_id: OrderId::new(),
            number_of_items,
            occurred_at: test_time(),
        }
    }

    fn size(items: u64) -> PackSize {
        PackSize::new(items).unwrap()
    }

    #[test]
    fn assemble_emits_one_line_per_pack_size() {
        let cmd = create_cmd(12001);
        let assignment = solve(&CATALOG, 12001).unwrap();

        let order = Order::assemble(&cmd, &assignment).unwrap();

        assert_eq!(order.id(), &cmd.order_id);
        assert_eq!(order.number_of_items(), 12001);
        let lines: Vec<(u64, u64)> = order
            .shipping()
            .iter()
            .map(|l| (l.pack_size.items(), l.quantity))
            .collect();
        assert_eq!(lines, vec![(5000, 2), (2000, 1), (250, 1)]);
        assert!(order.shipping().iter().all(|l| l.order_id == cmd.order_id));
        assert_eq!(order.surplus(), 249);
        assert_eq!(order.pack_count(), 4);
        assert_eq!(order.created_at(), cmd.occurred_at);
    }

    #[test]
    fn assemble_rejects_mismatched_assignment() {
        let cmd = create_cmd(501);
        let assignment = solve(&CATALOG, 250).unwrap();

        let err = Order::assemble(&cmd, &assignment).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("computed for 250 items") => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn assemble_rejects_zero_items() {
        let cmd = create_cmd(0);
        let assignment = solve(&CATALOG, 1).unwrap();
        assert!(matches!(
            Order::assemble(&cmd, &assignment),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn line_ids_are_distinct() {
        let cmd = create_cmd(501);
        let order = Order::assemble(&cmd, &solve(&CATALOG, 501).unwrap()).unwrap();
        assert_ne!(order.shipping()[0].id, order.shipping()[1].id);
    }

    #[test]
    fn rehydrate_sorts_lines_largest_first() {
        let order_id = OrderId::new();
        let now = test_time();
        let line = |items: u64| ShippingLine {
            id: ShippingLineId::new(),
            order_id,
            pack_size: size(items),
            quantity: 1,
            created_at: now,
        };

        let order = Order::rehydrate(order_id, 501, vec![line(250), line(500)], now, now).unwrap();
        let sizes: Vec<u64> = order.shipping().iter().map(|l| l.pack_size.items()).collect();
        assert_eq!(sizes, vec![500, 250]);
        assert_eq!(order.surplus(), 249);
    }

    #[test]
    fn rehydrate_rejects_foreign_lines() {
        let now = test_time();
        let foreign = ShippingLine {
            id: ShippingLineId::new(),
            order_id: OrderId::new(),
            pack_size: size(250),
            quantity: 1,
            created_at: now,
        };

        let err = Order::rehydrate(OrderId::new(), 1, vec![foreign], now, now).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn rehydrate_rejects_lines_short_of_the_order() {
        let now = test_time();
        let id = OrderId::new();
        let short = ShippingLine {
            id: ShippingLineId::new(),
            order_id: id,
            pack_size: size(250),
            quantity: 2,
            created_at: now,
        };

        match Order::rehydrate(id, 600, vec![short.clone()], now, now) {
            Err(DomainError::InvariantViolation(msg)) => {
                assert!(msg.contains("cover 500 of 600"), "{msg}")
            }
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
        let exact = Order::rehydrate(id, 500, vec![short], now, now).unwrap();
        assert_eq!(exact.surplus(), 0);
    }

    #[test]
    fn order_without_lines_has_no_surplus() {
        let now = test_time();
        let order = Order::rehydrate(OrderId::new(), 10, vec![], now, now).unwrap();
        assert_eq!(order.surplus(), 0);
        assert_eq!(order.pack_count(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: assembly preserves the assignment exactly (same sizes,
        /// same counts, same shipped total).
        #[test]
        fn assembly_preserves_assignment(requested in 1u64..30_000) {
            let assignment = solve(&CATALOG, requested).unwrap();
            let order = Order::assemble(&create_cmd(requested), &assignment).unwrap();

            prop_assert_eq!(order.shipping().len(), assignment.len());
            for line in order.shipping() {
                prop_assert_eq!(line.quantity, assignment.count_of(line.pack_size));
            }
            prop_assert_eq!(order.shipped_items(), assignment.total_items());
            prop_assert_eq!(order.surplus(), assignment.surplus());
            prop_assert_eq!(order.pack_count(), assignment.pack_count());
        }
    }
}
