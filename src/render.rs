// 🖼️ Receipt Presentation
// Display strings shared by the terminal UI and the scan command

use crate::receipt::{Receipt, ReceiptItem};
use chrono::NaiveDate;

pub const SINGLE_ITEM_LABEL: &str = "Single Item";
pub const NO_ITEMS_MESSAGE: &str = "No items were extracted.";

/// `$12.50`
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// `2024-03-02` -> `March 2, 2024`. Anything else is shown as-is.
pub fn format_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// `Qty: N` for more than one unit, a generic label otherwise
pub fn quantity_label(quantity: u32) -> String {
    if quantity > 1 {
        format!("Qty: {}", quantity)
    } else {
        SINGLE_ITEM_LABEL.to_string()
    }
}

/// First letter of every word upper-cased, the rest left alone
pub fn capitalize_words(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub name: String,
    pub quantity: String,
    pub price: String,
}

impl From<&ReceiptItem> for ItemRow {
    fn from(item: &ReceiptItem) -> Self {
        ItemRow {
            name: capitalize_words(&item.name),
            quantity: quantity_label(item.quantity),
            price: format_currency(item.price),
        }
    }
}

/// Everything the result screen shows, already formatted
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptView {
    pub store_name: String,
    pub date: String,
    pub total: String,
    pub items: Vec<ItemRow>,
}

impl From<&Receipt> for ReceiptView {
    fn from(receipt: &Receipt) -> Self {
        ReceiptView {
            store_name: receipt.store_name.clone(),
            date: format_date(&receipt.transaction_date),
            total: format_currency(receipt.total),
            items: receipt.items.iter().map(ItemRow::from).collect(),
        }
    }
}

impl ReceiptView {
    /// Plain-text rendering for the scan command
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.store_name));
        out.push_str(&format!("  Date:  {}\n", self.date));
        out.push_str(&format!("  Total: {}\n", self.total));
        out.push_str("\nPurchased Items\n");

        if self.items.is_empty() {
            out.push_str(&format!("  {}\n", NO_ITEMS_MESSAGE));
        }

        let name_width = self.items.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
        for row in &self.items {
            out.push_str(&format!(
                "  {:<name_width$}  {:<12}  {:>10}\n",
                row.name,
                row.quantity,
                row.price,
                name_width = name_width
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Receipt {
        Receipt::new(
            "Acme Mart",
            "2024-03-02",
            12.5,
            vec![ReceiptItem::new("Milk", 2, 3.25)],
        )
    }

    #[test]
    fn test_acme_example() {
        let view = ReceiptView::from(&acme());

        assert_eq!(view.total, "$12.50");
        assert_eq!(
            view.items,
            vec![ItemRow {
                name: "Milk".to_string(),
                quantity: "Qty: 2".to_string(),
                price: "$3.25".to_string(),
            }]
        );
    }

    #[test]
    fn test_quantity_label() {
        assert_eq!(quantity_label(1), "Single Item");
        assert_eq!(quantity_label(2), "Qty: 2");
        assert_eq!(quantity_label(12), "Qty: 12");
        assert_eq!(quantity_label(0), "Single Item");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-02"), "March 2, 2024");
        assert_eq!(format_date("2023-12-25"), "December 25, 2023");
        assert_eq!(format_date("03/02/2024"), "03/02/2024");
        assert_eq!(format_date("unknown"), "unknown");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(3.256), "$3.26");
        assert_eq!(format_currency(1234.5), "$1234.50");
    }

    #[test]
    fn test_to_text() {
        let text = ReceiptView::from(&acme()).to_text();

        assert!(text.starts_with("Acme Mart\n"));
        assert!(text.contains("Date:  March 2, 2024"));
        assert!(text.contains("Total: $12.50"));
        assert!(text.contains("Milk"));
        assert!(text.contains("Qty: 2"));
        assert!(text.contains("$3.25"));
    }

    #[test]
    fn test_capitalize_words() {
        assert_eq!(capitalize_words("organic whole milk"), "Organic Whole Milk");
        assert_eq!(capitalize_words("Milk"), "Milk");
        assert_eq!(capitalize_words("BREAD  roll"), "BREAD  Roll");
        assert_eq!(capitalize_words("épi bread"), "Épi Bread");
        assert_eq!(capitalize_words(""), "");
    }

    #[test]
    fn test_item_names_are_capitalized() {
        let receipt = Receipt::new(
            "Corner Shop",
            "2024-01-01",
            4.0,
            vec![ReceiptItem::new("sourdough loaf", 1, 4.0)],
        );
        let view = ReceiptView::from(&receipt);

        assert_eq!(view.items[0].name, "Sourdough Loaf");
        assert!(view.to_text().contains("Sourdough Loaf"));
    }

    #[test]
    fn test_to_text_aligns_multibyte_names() {
        let receipt = Receipt::new(
            "Corner Café",
            "2024-01-01",
            9.0,
            vec![
                ReceiptItem::new("Café", 2, 4.0),
                ReceiptItem::new("Milk", 1, 1.0),
            ],
        );
        let text = ReceiptView::from(&receipt).to_text();

        let column = |needle: &str| {
            let line = text.lines().find(|l| l.contains(needle)).unwrap();
            line[..line.find(needle).unwrap()].chars().count()
        };
        assert_eq!(column("Qty: 2"), column("Single Item"));
    }

    #[test]
    fn test_to_text_no_items() {
        let receipt = Receipt::new("Corner Shop", "2024-01-01", 0.0, vec![]);
        assert!(ReceiptView::from(&receipt).to_text().contains(NO_ITEMS_MESSAGE));
    }
}
