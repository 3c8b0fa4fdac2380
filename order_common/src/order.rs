//! Order model and its wire encoding.
//!
//! On the wire an order is three whitespace-separated tokens,
//! `"<side> <price> <quantity>"`, where side is `0` for Buy and `1` for Sell.
//! Price and quantity are carried as the text the user typed; range and
//! precision are checked by the server, not here.
use std::fmt;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::error::ClientError;

/// Direction of an order. `Display` yields the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Side {
    /// Wire code `0`; also parsed from `buy` / `b`.
    #[strum(to_string = "0", serialize = "buy", serialize = "b")]
    Buy,
    /// Wire code `1`; also parsed from `sell` / `s`.
    #[strum(to_string = "1", serialize = "sell", serialize = "s")]
    Sell,
}

impl Side {
    /// Upper-case name used in human-readable feed lines.
    pub fn name(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Parse a side typed by a user or read off the wire.
    pub fn parse_input(raw: &str) -> Result<Side, ClientError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClientError::InvalidOrder("side must not be empty".to_string()));
        }
        trimmed.parse::<Side>().map_err(|_| {
            ClientError::InvalidOrder(format!("unknown side '{}', use 0 (Buy) or 1 (Sell)", trimmed))
        })
    }
}

/// A buy/sell instruction with pre-formatted price and quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    side: Side,
    price: String,
    quantity: String,
}

impl Order {
    /// Build an order, trimming the numeric fields.
    ///
    /// Fails with `InvalidOrder` when a field is empty or contains whitespace,
    /// since either would break the three-token wire tuple.
    pub fn new(side: Side, price: &str, quantity: &str) -> Result<Self, ClientError> {
        Ok(Order {
            side,
            price: Order::check_field("price", price)?,
            quantity: Order::check_field("quantity", quantity)?,
        })
    }

    /// Parse the three raw prompt answers (side, price, quantity).
    pub fn from_fields(side: &str, price: &str, quantity: &str) -> Result<Self, ClientError> {
        let side = Side::parse_input(side)?;
        Order::new(side, price, quantity)
    }

    /// Trim a price or quantity answer and check it is one non-empty token.
    pub fn check_field(field: &str, raw: &str) -> Result<String, ClientError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClientError::InvalidOrder(format!("{} must not be empty", field)));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ClientError::InvalidOrder(format!(
                "{} must be a single token, got '{}'",
                field, trimmed
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Order side.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Price text as it will be sent.
    pub fn price(&self) -> &str {
        &self.price
    }

    /// Quantity text as it will be sent.
    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    /// Wire payload: `"<side> <price> <quantity>"`, no trailing delimiter.
    pub fn encode(&self) -> String {
        format!("{} {} {}", self.side, self.price, self.quantity)
    }

    /// Parse a wire payload back into an order.
    pub fn decode(payload: &str) -> Result<Self, ClientError> {
        let tokens: Vec<&str> = payload.split_whitespace().collect();
        match tokens.as_slice() {
            [side, price, quantity] => Order::from_fields(side, price, quantity),
            _ => Err(ClientError::InvalidOrder(format!(
                "expected 3 tokens, got {}",
                tokens.len()
            ))),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Order {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Order::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Side::Buy, "100.5", "10")]
    #[case(Side::Sell, "0.00001", "250000")]
    #[case(Side::Buy, "1e3", "7")]
    #[case(Side::Sell, "-3", "abc")]
    fn encoded_tokens_recover_fields(
        #[case] side: Side,
        #[case] price: &str,
        #[case] quantity: &str,
    ) {
        let order = Order::new(side, price, quantity).unwrap();
        let encoded = order.encode();
        let tokens: Vec<&str> = encoded.split_whitespace().collect();
        let side_code = side.to_string();
        assert_eq!(tokens, vec![side_code.as_str(), price, quantity]);
        assert_eq!(Order::decode(&encoded).unwrap(), order);
    }

    #[test]
    fn encodes_buy_as_zero_without_trailer() {
        let order = Order::new(Side::Buy, "100.5", "10").unwrap();
        assert_eq!(order.encode(), "0 100.5 10");
        let order = Order::new(Side::Sell, " 99 ", "\t3").unwrap();
        assert_eq!(order.encode(), "1 99 3");
    }

    #[rstest]
    #[case("0", Side::Buy)]
    #[case("BUY", Side::Buy)]
    #[case("b", Side::Buy)]
    #[case("1", Side::Sell)]
    #[case("Sell", Side::Sell)]
    #[case(" s ", Side::Sell)]
    fn side_accepts_codes_and_names(#[case] raw: &str, #[case] expected: Side) {
        assert_eq!(Side::parse_input(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("", "1", "1")]
    #[case("2", "1", "1")]
    #[case("0", "", "1")]
    #[case("0", "1", "   ")]
    #[case("0", "1 2", "1")]
    fn rejects_unusable_fields(#[case] side: &str, #[case] price: &str, #[case] quantity: &str) {
        assert!(matches!(
            Order::from_fields(side, price, quantity),
            Err(ClientError::InvalidOrder(_))
        ));
    }

    #[test]
    fn decode_requires_three_tokens() {
        assert!(Order::decode("0 100").is_err());
        assert!(Order::decode("0 100 1 extra").is_err());
        let order: Order = "1 42 5\n".parse().unwrap();
        assert_eq!(order.side(), Side::Sell);
        assert_eq!(order.price(), "42");
        assert_eq!(order.quantity(), "5");
    }
}
