//! Notification protocol spoken between the market server and its buyers.
//!
//! Every message is one JSON object per line, tagged by a `type` field and
//! terminated by a single `\n`. Receivers split on newlines, ignore empty
//! lines, and parse each complete line independently. Unknown fields are
//! ignored so the vocabulary can grow without breaking old clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};

/// Messages a buyer sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Handshake announcing the buyer's display name.
    #[serde(rename = "JOIN")]
    Join {
        #[serde(default)]
        name: String,
    },

    /// Request a snapshot of all known inventory.
    #[serde(rename = "LIST")]
    List,

    /// Attempt to purchase `amount` units of `item` from the active sale.
    #[serde(rename = "BUY")]
    Buy {
        item: String,
        /// Signed so that a non-positive request can be received and
        /// rejected rather than failing to parse.
        #[serde(default = "default_buy_amount")]
        amount: i64,
    },

    /// The buyer is leaving the market.
    #[serde(rename = "LEAVE")]
    Leave,
}

fn default_buy_amount() -> i64 {
    1
}

/// Messages the server sends to buyers, individually or by broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Acknowledges a `JOIN`.
    #[serde(rename = "WELCOME")]
    Welcome,

    /// Full inventory snapshot: item name to remaining quantity.
    #[serde(rename = "LIST_RESPONSE")]
    ListResponse { inventory: BTreeMap<String, u64> },

    /// A new item has opened for sale (also sent to late joiners).
    #[serde(rename = "ITEM")]
    Item {
        item: String,
        amount_left: u64,
        time_left: u64,
    },

    /// Advisory countdown tick for the active sale.
    #[serde(rename = "TIME_LEFT")]
    TimeLeft { time_left: u64 },

    /// Remaining quantity changed after a successful purchase.
    #[serde(rename = "UPDATE")]
    Update { item: String, amount_left: u64 },

    /// The active item sold out before its deadline.
    #[serde(rename = "SOLD_OUT")]
    SoldOut { item: String },

    /// A purchase succeeded, sent to the purchaser only.
    #[serde(rename = "CONFIRM")]
    Confirm { item: String, amount_bought: u64 },

    /// A purchase was rejected, sent to the purchaser only.
    #[serde(rename = "FAIL")]
    Fail { message: String },
}

/// Serialize a message as a newline-terminated JSON line.
pub fn to_line<M: Serialize>(message: &M) -> MarketResult<String> {
    let mut line = serde_json::to_string(message)
        .map_err(|e| MarketError::Protocol(format!("Failed to encode message: {e}")))?;
    line.push('\n');
    Ok(line)
}

/// Parse one JSON line into a message.
pub fn from_line<M: for<'de> Deserialize<'de>>(line: &str) -> MarketResult<M> {
    serde_json::from_str(line.trim())
        .map_err(|e| MarketError::Protocol(format!("Failed to decode line: {e}")))
}
