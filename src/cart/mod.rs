//! Shopping cart for the customer-facing menu, persisted under `cart.json`.

use std::num::NonZeroU32;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app_system::{SuppressedKind, Suppressor};
use crate::cache::JsonFile;
use crate::domain::OrderItem;
use crate::error::CacheError;

pub const CART_FILE: &str = "cart.json";

/// Cart line; same shape and subtotal rule as an order item.
pub type CartLine = OrderItem;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds `qty` of a product; a line with the same name and price absorbs it.
    pub fn add(&mut self, product_name: impl Into<String>, qty: NonZeroU32, unit_price: Decimal) {
        let product_name = product_name.into();
        match self
            .lines
            .iter_mut()
            .find(|line| line.product_name == product_name && line.unit_price == unit_price)
        {
            Some(line) => {
                let qty = line.qty.saturating_add(qty.get());
                *line = CartLine::new(product_name, qty, unit_price);
            }
            None => self.lines.push(CartLine::new(product_name, qty, unit_price)),
        }
    }

    pub fn increment(&mut self, index: usize) {
        self.set_qty(index, |qty| qty.saturating_add(1));
    }

    /// Never drops below one; use [`Cart::remove`] to delete a line.
    pub fn decrement(&mut self, index: usize) {
        self.set_qty(index, |qty| NonZeroU32::new(qty.get() - 1).unwrap_or(qty));
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|line| line.subtotal).sum()
    }

    fn set_qty(&mut self, index: usize, change: impl FnOnce(NonZeroU32) -> NonZeroU32) {
        if let Some(line) = self.lines.get_mut(index) {
            *line = CartLine::new(line.product_name.clone(), change(line.qty), line.unit_price);
        }
    }
}

/// Local persistence of the cart, failing soft on read like the order cache.
pub struct CartStore {
    file: JsonFile,
    suppressor: Suppressor,
}

impl CartStore {
    pub fn new(data_dir: impl AsRef<Path>, suppressor: Suppressor) -> Self {
        Self {
            file: JsonFile::new(data_dir.as_ref().join(CART_FILE)),
            suppressor,
        }
    }

    pub async fn load(&self) -> Cart {
        match self.file.read::<Cart>().await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                self.suppressor.report(SuppressedKind::Load, &e);
                Cart::default()
            }
        }
    }

    pub async fn save(&self, cart: &Cart) -> Result<(), CacheError> {
        self.file.write(cart).await?;
        debug!(lines = cart.lines().len(), "Cart saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_add_merges_same_product_and_price() {
        let mut cart = Cart::default();
        cart.add("Handroll Salmón", qty(1), Decimal::from(4500));
        cart.add("Handroll Salmón", qty(2), Decimal::from(4500));
        cart.add("Handroll Salmón", qty(1), Decimal::from(4000));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].qty, qty(3));
        assert_eq!(cart.lines()[0].subtotal, Decimal::from(13500));
        assert_eq!(cart.total(), Decimal::from(17500));
    }

    #[test]
    fn test_decrement_floors_at_one() {
        let mut cart = Cart::default();
        cart.add("Ceviche", qty(2), Decimal::from(6000));

        cart.decrement(0);
        cart.decrement(0);

        assert_eq!(cart.lines()[0].qty, qty(1));
        assert_eq!(cart.total(), Decimal::from(6000));
    }

    #[test]
    fn test_increment_remove_and_clear() {
        let mut cart = Cart::default();
        cart.add("Gyoza", qty(1), Decimal::from(3000));
        cart.add("Ceviche", qty(1), Decimal::from(6000));

        cart.increment(0);
        assert_eq!(cart.lines()[0].subtotal, Decimal::from(6000));

        cart.remove(0);
        cart.remove(5);
        cart.increment(5);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product_name, "Ceviche");

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_cart_store_round_trip_and_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (suppressor, log) = Suppressor::recording();
        let store = CartStore::new(dir.path(), suppressor);

        assert!(store.load().await.is_empty());

        let mut cart = Cart::default();
        cart.add("Gyoza", qty(2), Decimal::from(3000));
        store.save(&cart).await.unwrap();
        assert_eq!(store.load().await, cart);

        tokio::fs::write(dir.path().join(CART_FILE), b"[{]").await.unwrap();
        assert!(store.load().await.is_empty());
        assert_eq!(log.count(SuppressedKind::Load), 1);
    }

    #[test]
    fn test_legacy_cart_json_recomputes_subtotals() {
        let cart: Cart = serde_json::from_str(
            r#"[{"product_name":"Gyoza","qty":3,"unit_price":3000,"subtotal":1}]"#,
        )
        .unwrap();
        assert_eq!(cart.total(), Decimal::from(9000));
    }
}
