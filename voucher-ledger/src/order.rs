//! Order building and the item-summary serialization format
//!
//! An order is accumulated in memory against one branch's menu; nothing here
//! touches storage. The stored `"name xQty, name xQty"` string survives for
//! display and export; `OrderLine` is the structured form used at the
//! redemption boundary.

use serde::{Deserialize, Serialize};

use crate::types::{Branch, MenuEntry};

/// One `(item name, quantity)` pair of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Menu item name
    pub name: String,

    /// Requested quantity
    pub quantity: u32,
}

impl OrderLine {
    /// Create a new line
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Parse an item summary into order lines.
///
/// Tokens are comma-separated `"<name> x<quantity>"` entries. The name is
/// everything before the first `" x"` delimiter. Tokens without the
/// delimiter, and tokens whose quantity is not a non-negative integer, are
/// silently skipped.
pub fn parse_item_summary(summary: &str) -> Vec<OrderLine> {
    summary
        .split(',')
        .filter_map(|token| {
            let token = token.trim();
            let (name, qty) = token.split_once(" x")?;
            let quantity = qty.trim().parse::<u32>().ok()?;
            Some(OrderLine::new(name, quantity))
        })
        .collect()
}

/// Serialize order lines into the stored summary string. Lines with zero
/// quantity are omitted.
pub fn format_item_summary(lines: &[OrderLine]) -> String {
    lines
        .iter()
        .filter(|line| line.quantity > 0)
        .map(|line| format!("{} x{}", line.name, line.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

/// An in-progress order against one branch's menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    branch: Branch,
    menu: Vec<MenuEntry>,
    lines: Vec<OrderLine>,
}

impl Order {
    /// Start an empty order for a branch, given that branch's menu
    pub fn new(branch: Branch, menu: Vec<MenuEntry>) -> Self {
        Self {
            branch,
            menu,
            lines: Vec::new(),
        }
    }

    /// Branch this order is placed at
    pub fn branch(&self) -> Branch {
        self.branch
    }

    /// Menu the order is built against
    pub fn menu(&self) -> &[MenuEntry] {
        &self.menu
    }

    /// Set the quantity for an item, inserting a line on first mention.
    /// Names not on the menu are accepted and price as zero.
    pub fn set_quantity(&mut self, name: &str, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|line| line.name == name) {
            line.quantity = quantity;
        } else {
            self.lines.push(OrderLine::new(name, quantity));
        }
    }

    /// Current quantity for an item (zero if never set)
    pub fn quantity(&self, name: &str) -> u32 {
        self.lines
            .iter()
            .find(|line| line.name == name)
            .map(|line| line.quantity)
            .unwrap_or(0)
    }

    /// All lines in insertion order, including zero quantities
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Lines with a positive quantity, in insertion order
    pub fn ordered_lines(&self) -> Vec<OrderLine> {
        self.lines
            .iter()
            .filter(|line| line.quantity > 0)
            .cloned()
            .collect()
    }

    /// Advisory total: sum of positive quantities times branch price
    pub fn total(&self) -> i64 {
        self.lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| i64::from(line.quantity) * self.price_of(&line.name))
            .sum()
    }

    /// Serialized summary of the positive-quantity lines
    pub fn summary(&self) -> String {
        format_item_summary(&self.lines)
    }

    /// Drop all lines
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn price_of(&self, name: &str) -> i64 {
        self.menu
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.price)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Vec<MenuEntry> {
        vec![
            MenuEntry {
                name: "Nasi Goreng".to_string(),
                price: 15_000,
                category: "Makanan".to_string(),
            },
            MenuEntry {
                name: "Es Teh".to_string(),
                price: 5_000,
                category: "Minuman".to_string(),
            },
        ]
    }

    #[test]
    fn test_parse_summary() {
        let lines = parse_item_summary("Nasi Goreng x2, Es Teh x1");
        assert_eq!(
            lines,
            vec![
                OrderLine::new("Nasi Goreng", 2),
                OrderLine::new("Es Teh", 1),
            ]
        );
    }

    #[test]
    fn test_parse_skips_malformed_tokens() {
        let lines = parse_item_summary("Nasi Goreng x2, BadToken, Es Teh xbanyak");
        assert_eq!(lines, vec![OrderLine::new("Nasi Goreng", 2)]);

        assert!(parse_item_summary("").is_empty());
        assert!(parse_item_summary("  ,  ,").is_empty());
    }

    #[test]
    fn test_summary_round_trip() {
        let lines = vec![
            OrderLine::new("Ayam Bakar", 1),
            OrderLine::new("Es Teh", 3),
        ];
        let summary = format_item_summary(&lines);
        assert_eq!(summary, "Ayam Bakar x1, Es Teh x3");
        assert_eq!(parse_item_summary(&summary), lines);
    }

    #[test]
    fn test_format_omits_zero_quantities() {
        let lines = vec![
            OrderLine::new("Ayam Bakar", 0),
            OrderLine::new("Es Teh", 2),
        ];
        assert_eq!(format_item_summary(&lines), "Es Teh x2");
    }

    #[test]
    fn test_order_total_and_summary() {
        let mut order = Order::new(Branch::Sedati, menu());
        order.set_quantity("Nasi Goreng", 2);
        order.set_quantity("Es Teh", 1);
        assert_eq!(order.total(), 35_000);
        assert_eq!(order.summary(), "Nasi Goreng x2, Es Teh x1");

        order.set_quantity("Nasi Goreng", 0);
        assert_eq!(order.total(), 5_000);
        assert_eq!(order.summary(), "Es Teh x1");
        assert_eq!(order.lines().len(), 2);
        assert_eq!(order.ordered_lines().len(), 1);
    }

    #[test]
    fn test_order_unknown_item_prices_as_zero() {
        let mut order = Order::new(Branch::Tawangsari, menu());
        order.set_quantity("Menu Hantu", 4);
        assert_eq!(order.total(), 0);
        assert_eq!(order.quantity("Menu Hantu"), 4);
    }
}
