use std::fmt;

/// Which side of a quote a client is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known quote for one product.
///
/// Prices are named from the client's point of view: `buy` is what a client
/// pays to buy the product right now, `sell` is what a client receives when
/// selling it right now. The value is replaced as a whole on every refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductPrice {
    pub buy: f64,
    pub sell: f64,
}

impl ProductPrice {
    pub fn new(buy: f64, sell: f64) -> Self {
        Self { buy, sell }
    }

    pub fn side(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.buy,
            Side::Sell => self.sell,
        }
    }

    /// One `id,buy,sell` record, newline terminated.
    pub fn csv_line(&self, product_id: &str) -> String {
        format!(
            "{},{},{}\n",
            product_id,
            format_price(self.buy),
            format_price(self.sell)
        )
    }
}

/// Two decimal digits, the format every outward-facing price uses.
pub fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}
