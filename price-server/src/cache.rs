use bazaar_common::{format_price, ProductPrice, Side};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// In-memory table of the latest quote per product.
///
/// Written only by the refresher, read by the HTTP handlers. Each write is a
/// single map insert of a complete `ProductPrice`, so readers see either no
/// entry or a whole pair. Guards are never held across an `.await`.
#[derive(Debug, Default)]
pub struct PriceTable {
    prices: RwLock<HashMap<String, ProductPrice>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    // A writer can only panic between whole inserts, so a poisoned map is
    // still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ProductPrice>> {
        self.prices.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the latest quote, returning the one it replaced
    pub fn upsert(&self, product_id: impl Into<String>, price: ProductPrice) -> Option<ProductPrice> {
        let product_id = product_id.into();
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(product_id, price)
    }

    pub fn get(&self, product_id: &str) -> Option<ProductPrice> {
        self.read().get(product_id).copied()
    }

    /// One side of a cached quote, formatted while the read lock is held
    pub fn format_side(&self, product_id: &str, side: Side) -> Option<String> {
        self.read()
            .get(product_id)
            .map(|price| format_price(price.side(side)))
    }

    /// Every cached quote as `id,buy,sell` lines, in map order
    pub fn render_csv(&self) -> String {
        let prices = self.read();
        let mut out = String::with_capacity(prices.len() * 32);
        for (product_id, price) in prices.iter() {
            out.push_str(&price.csv_line(product_id));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_upsert_replaces_whole_quote() {
        let table = PriceTable::new();
        assert!(table.upsert("ENCHANTED_COAL", ProductPrice::new(1.0, 2.0)).is_none());

        let previous = table.upsert("ENCHANTED_COAL", ProductPrice::new(3.0, 4.0));
        assert_eq!(previous, Some(ProductPrice::new(1.0, 2.0)));
        assert_eq!(table.get("ENCHANTED_COAL"), Some(ProductPrice::new(3.0, 4.0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_format_side() {
        let table = PriceTable::new();
        table.upsert("ENCHANTED_COAL", ProductPrice::new(11.25, 12.5));

        assert_eq!(table.format_side("ENCHANTED_COAL", Side::Buy).as_deref(), Some("11.25"));
        assert_eq!(table.format_side("ENCHANTED_COAL", Side::Sell).as_deref(), Some("12.50"));
        assert_eq!(table.format_side("COAL", Side::Buy), None);
    }

    #[test]
    fn test_render_csv_one_line_per_entry() {
        let table = PriceTable::new();
        assert_eq!(table.render_csv(), "");

        table.upsert("A", ProductPrice::new(1.0, 2.0));
        table.upsert("B", ProductPrice::new(3.333, 4.0));

        let csv = table.render_csv();
        let mut lines: Vec<&str> = csv.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["A,1.00,2.00", "B,3.33,4.00"]);
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_poisoned_lock_still_readable() {
        let table = Arc::new(PriceTable::new());
        table.upsert("A", ProductPrice::new(1.0, 2.0));

        let poisoner = table.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.prices.write().unwrap();
            panic!("writer died");
        })
        .join();

        assert!(table.prices.is_poisoned());
        assert_eq!(table.get("A"), Some(ProductPrice::new(1.0, 2.0)));
        table.upsert("A", ProductPrice::new(5.0, 6.0));
        assert_eq!(table.get("A"), Some(ProductPrice::new(5.0, 6.0)));
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_pairs() {
        let table = Arc::new(PriceTable::new());
        table.upsert("A", ProductPrice::new(0.0, 0.0));

        let writer = {
            let table = table.clone();
            std::thread::spawn(move || {
                for i in 1..=2_000 {
                    let v = i as f64;
                    table.upsert("A", ProductPrice::new(v, -v));
                }
            })
        };

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let price = table.get("A").unwrap();
                        assert_eq!(price.buy, -price.sell);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
