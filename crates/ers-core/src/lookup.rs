//! # Off-chain Lookup Signal
//!
//! The structured "go fetch this elsewhere and call me back" rejection a
//! resolver raises for data it cannot answer from ledger state alone. A
//! client catching [`OffchainLookup`] queries each gateway URL with
//! `call_data`, then resubmits the gateway's response together with
//! `extra_data` to the method named by `callback`.

use crate::hex;
use crate::primitives::Address;

/// Gateway URL placeholder replaced with the lower-case sender address.
pub const SENDER_PLACEHOLDER: &str = "{sender}";

/// Gateway URL placeholder replaced with the `0x`-prefixed call data.
pub const DATA_PLACEHOLDER: &str = "{data}";

/// A request to resolve data off-chain and retry through a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffchainLookup {
    /// The contract raising the lookup; the callback must go back to it.
    pub sender: Address,
    /// Gateway URL templates, tried in order.
    pub urls: Vec<String>,
    /// Request payload for the gateway.
    pub call_data: Vec<u8>,
    /// Selector of the verification callback.
    pub callback: [u8; 4],
    /// Opaque context echoed back to the callback unchanged.
    pub extra_data: Vec<u8>,
}

impl OffchainLookup {
    /// Expand every URL template with this lookup's sender and call data.
    pub fn gateway_requests(&self) -> Vec<String> {
        let sender = self.sender.to_hex();
        let data = hex::encode_prefixed(&self.call_data);
        self.urls
            .iter()
            .map(|u| {
                u.replace(SENDER_PLACEHOLDER, &sender)
                    .replace(DATA_PLACEHOLDER, &data)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_requests_expand_placeholders() {
        let lookup = OffchainLookup {
            sender: Address::new([0x11; 20]),
            urls: vec![
                "https://gw.test/{sender}/{data}.json".to_string(),
                "https://backup.test/lookup".to_string(),
            ],
            call_data: vec![0xab, 0xcd],
            callback: [0; 4],
            extra_data: Vec::new(),
        };
        let reqs = lookup.gateway_requests();
        assert_eq!(
            reqs[0],
            format!("https://gw.test/0x{}/0xabcd.json", "11".repeat(20))
        );
        assert_eq!(reqs[1], "https://backup.test/lookup");
    }
}
