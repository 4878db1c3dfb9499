use serde::Deserialize;
use serde_json::json;

use packship_orders::{Order, ShippingLine};
use packship_packing::PackSize;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Signed so negative input gets a validation error rather than a
    /// deserialization failure.
    pub number_of_items: Option<i64>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn shipping_line_to_json(line: &ShippingLine) -> serde_json::Value {
    json!({
        "id": line.id.to_string(),
        "order_id": line.order_id.to_string(),
        "pack_size": line.pack_size.items(),
        "quantity": line.quantity,
        "created_at": line.created_at.to_rfc3339(),
    })
}

pub fn order_to_json(order: &Order) -> serde_json::Value {
    json!({
        "id": order.id_typed().to_string(),
        "number_of_items": order.number_of_items(),
        "shipped_items": order.shipped_items(),
        "surplus": order.surplus(),
        "pack_count": order.pack_count(),
        "shipping": order.shipping().iter().map(shipping_line_to_json).collect::<Vec<_>>(),
        "created_at": order.created_at().to_rfc3339(),
        "updated_at": order.updated_at().to_rfc3339(),
    })
}

pub fn pack_sizes_to_json(sizes: &[PackSize]) -> serde_json::Value {
    json!({
        "pack_sizes": sizes.iter().map(|s| s.items()).collect::<Vec<_>>(),
    })
}
