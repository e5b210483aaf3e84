// 🧾 Receipt Model
// The structured record extracted from one purchase document

use serde::{Deserialize, Serialize};

// ============================================================================
// RECEIPT ITEM
// ============================================================================

/// One purchased line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    /// Item name as printed on the receipt
    pub name: String,

    /// Units purchased
    pub quantity: u32,

    /// Price of a single unit
    pub price: f64,
}

impl ReceiptItem {
    pub fn new(name: impl Into<String>, quantity: u32, price: f64) -> Self {
        ReceiptItem {
            name: name.into(),
            quantity,
            price,
        }
    }
}

// ============================================================================
// RECEIPT
// ============================================================================

/// Receipt - built once from a model response, never mutated afterwards.
///
/// `total` is expected to roughly match the item prices but nothing
/// enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,

    /// YYYY-MM-DD, as requested from the model (not guaranteed)
    pub transaction_date: String,

    pub total: f64,

    pub items: Vec<ReceiptItem>,
}

impl Receipt {
    pub fn new(
        store_name: impl Into<String>,
        transaction_date: impl Into<String>,
        total: f64,
        items: Vec<ReceiptItem>,
    ) -> Self {
        Receipt {
            store_name: store_name.into(),
            transaction_date: transaction_date.into(),
            total,
            items,
        }
    }

    /// Sum of quantity * unit price over all items.
    pub fn items_subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.quantity as f64 * item.price)
            .sum()
    }
}
