//! Relay error classification
//!
//! The relay reports failures as free text only. Everything that inspects that
//! text lives here, as pure functions over `(message, stack)`, so the rules
//! can be checked against recorded errors without any network.

use once_cell::sync::Lazy;
use regex::Regex;
use solana_sdk::{pubkey::Pubkey, system_program};

/// Markers of an expired transaction or expired signing step
const STALE_MARKERS: &[&str] = &[
    "transactiontooold",
    "transaction too old",
    "blockhash not found",
    "block height exceeded",
    "transaction expired",
];

/// Markers of an account the RPC could not see
const ACCOUNT_NOT_FOUND_MARKERS: &[&str] = &[
    "accountnotfound",
    "account not found",
    "could not find account",
    "account does not exist",
];

/// The relay's multi-step protocol stages an intermediate "chunk" account
const CHUNK_MARKERS: &[&str] = &["chunk"];

/// The relay gave up after its own internal retries
const RELAY_EXHAUSTED_MARKERS: &[&str] = &[
    "retries exhausted",
    "exhausted retries",
    "max retries",
    "maximum retries",
    "all retry attempts failed",
];

static BASE58_CANDIDATE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b[1-9A-HJ-NP-Za-km-z]{32,44}\b").ok());

/// Known transient failure classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    StaleTransaction {
        /// Expired while the relay was creating its intermediate chunk
        during_chunk_creation: bool,
        /// Relay reports its internal retries already ran out
        relay_retries_exhausted: bool,
    },
    AccountNotIndexed {
        /// Public keys named in message and stack, first occurrence order
        addresses: Vec<Pubkey>,
        /// Chunk-creation markers present
        relay_marker: bool,
    },
    Unknown,
}

impl ErrorClass {
    /// Label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClass::StaleTransaction { .. } => "stale_transaction",
            ErrorClass::AccountNotIndexed { .. } => "account_not_indexed",
            ErrorClass::Unknown => "unknown",
        }
    }
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| haystack.contains(m))
}

/// Classify a relay failure. Staleness wins over account-not-found.
pub fn classify_error(message: &str, stack: Option<&str>) -> ErrorClass {
    let mut text = message.to_string();
    if let Some(stack) = stack {
        text.push('\n');
        text.push_str(stack);
    }
    let lowered = text.to_lowercase();
    let relay_marker = contains_any(&lowered, CHUNK_MARKERS);

    if contains_any(&lowered, STALE_MARKERS) {
        return ErrorClass::StaleTransaction {
            during_chunk_creation: relay_marker,
            relay_retries_exhausted: contains_any(&lowered, RELAY_EXHAUSTED_MARKERS),
        };
    }

    if contains_any(&lowered, ACCOUNT_NOT_FOUND_MARKERS) {
        return ErrorClass::AccountNotIndexed {
            addresses: extract_addresses(&text),
            relay_marker,
        };
    }

    ErrorClass::Unknown
}

/// Base58 public keys appearing in `text`, deduplicated, in order
pub fn extract_addresses(text: &str) -> Vec<Pubkey> {
    let Some(re) = BASE58_CANDIDATE.as_ref() else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for candidate in re.find_iter(text) {
        let Ok(bytes) = bs58::decode(candidate.as_str()).into_vec() else {
            continue;
        };
        let Ok(array) = <[u8; 32]>::try_from(bytes.as_slice()) else {
            continue;
        };
        let key = Pubkey::new_from_array(array);
        if !found.contains(&key) {
            found.push(key);
        }
    }
    found
}

/// Accounts of the transfer itself, as opposed to relay-managed ones
#[derive(Debug, Clone, Copy)]
pub struct TransferParties {
    pub sender: Pubkey,
    pub sender_holding: Option<Pubkey>,
    pub recipient: Pubkey,
    pub recipient_holding: Option<Pubkey>,
    /// Token mint of the active network
    pub token_mint: Pubkey,
}

impl TransferParties {
    fn is_recipient_side(&self, key: &Pubkey) -> bool {
        *key == self.recipient || Some(*key) == self.recipient_holding
    }

    fn is_transfer_side(&self, key: &Pubkey) -> bool {
        *key == self.sender || Some(*key) == self.sender_holding || *key == self.token_mint
    }
}

/// Which account an account-not-found error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingAccount {
    Recipient,
    /// Intermediate account created by the relay
    RelayManaged { address: Option<Pubkey> },
    Unidentified,
}

fn is_well_known_program(key: &Pubkey) -> bool {
    *key == system_program::id()
        || *key == spl_token::id()
        || *key == spl_associated_token_account::id()
}

/// Attribute an account-not-found error
///
/// Only a relay chunk marker makes the error relay-managed; a foreign address
/// on its own (a mint from another network, say) stays unidentified.
pub fn identify_missing_account(
    addresses: &[Pubkey],
    relay_marker: bool,
    parties: &TransferParties,
) -> MissingAccount {
    if addresses.iter().any(|a| parties.is_recipient_side(a)) {
        return MissingAccount::Recipient;
    }
    if !relay_marker {
        return MissingAccount::Unidentified;
    }

    let address = addresses
        .iter()
        .find(|a| !parties.is_transfer_side(a) && !is_well_known_program(a))
        .copied();
    MissingAccount::RelayManaged { address }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK_STACK: &str = "Error: AccountNotFound\n    at createChunk (node_modules/sdk/dist/index.js:812:19)\n    at async signAndSendTransaction (index.js:1204:7)";

    fn parties() -> TransferParties {
        TransferParties {
            sender: Pubkey::new_unique(),
            sender_holding: Some(Pubkey::new_unique()),
            recipient: Pubkey::new_unique(),
            recipient_holding: Some(Pubkey::new_unique()),
            token_mint: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_stale_corpus() {
        let corpus = [
            "Transaction simulation failed: Error processing Instruction 1: custom program error: TransactionTooOld",
            "failed to send transaction: Transaction simulation failed: Blockhash not found",
            "Signature 5h3k... has expired: block height exceeded",
            "Transaction expired before confirmation",
            "Program log: AnchorError occurred. Error Code: TransactionTooOld. Error Number: 6018.",
        ];
        for msg in corpus {
            assert!(
                matches!(classify_error(msg, None), ErrorClass::StaleTransaction { .. }),
                "{}",
                msg
            );
        }
    }

    #[test]
    fn test_stale_flags() {
        let class = classify_error("TransactionTooOld", Some("at createChunk (index.js:10)"));
        assert_eq!(
            class,
            ErrorClass::StaleTransaction {
                during_chunk_creation: true,
                relay_retries_exhausted: false,
            }
        );

        let class = classify_error("Max retries reached: Blockhash not found", None);
        assert_eq!(
            class,
            ErrorClass::StaleTransaction {
                during_chunk_creation: false,
                relay_retries_exhausted: true,
            }
        );
    }

    #[test]
    fn test_stale_takes_precedence() {
        let class = classify_error("AccountNotFound after TransactionTooOld", None);
        assert_eq!(class.label(), "stale_transaction");
    }

    #[test]
    fn test_account_not_found_extracts_addresses() {
        let chunk = Pubkey::new_unique();
        let msg = format!(
            "Transaction simulation failed: Attempt to load a program that does not exist; AccountNotFound: {}",
            chunk
        );
        match classify_error(&msg, Some(CHUNK_STACK)) {
            ErrorClass::AccountNotIndexed {
                addresses,
                relay_marker,
            } => {
                assert_eq!(addresses, vec![chunk]);
                assert!(relay_marker);
            }
            other => panic!("unexpected class {:?}", other),
        }
    }

    #[test]
    fn test_account_not_found_variants() {
        for msg in [
            "could not find account",
            "Error: Account does not exist 11111111111111111111111111111111",
            "account not found",
        ] {
            assert_eq!(classify_error(msg, None).label(), "account_not_indexed", "{}", msg);
        }
    }

    #[test]
    fn test_unknown_corpus() {
        for msg in [
            "429 Too Many Requests",
            "User rejected the request",
            "custom program error: 0x1",
            "insufficient funds for fee",
            "",
        ] {
            assert_eq!(classify_error(msg, None), ErrorClass::Unknown, "{}", msg);
        }
    }

    #[test]
    fn test_extract_ignores_non_keys() {
        let key = Pubkey::new_unique();
        let text = format!("sig 5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW key {} again {}", key, key);
        assert_eq!(extract_addresses(&text), vec![key]);
    }

    #[test]
    fn test_identify_recipient() {
        let p = parties();
        assert_eq!(
            identify_missing_account(&[p.recipient], false, &p),
            MissingAccount::Recipient
        );
        assert_eq!(
            identify_missing_account(&[p.recipient_holding.unwrap()], true, &p),
            MissingAccount::Recipient
        );
    }

    #[test]
    fn test_identify_relay_managed() {
        let p = parties();
        let chunk = Pubkey::new_unique();
        assert_eq!(
            identify_missing_account(&[p.sender, system_program::id(), chunk], true, &p),
            MissingAccount::RelayManaged { address: Some(chunk) }
        );
        assert_eq!(
            identify_missing_account(&[], true, &p),
            MissingAccount::RelayManaged { address: None }
        );
        // the mint is never polled as a relay account
        assert_eq!(
            identify_missing_account(&[p.token_mint, chunk], true, &p),
            MissingAccount::RelayManaged { address: Some(chunk) }
        );
        assert_eq!(
            identify_missing_account(&[p.token_mint], true, &p),
            MissingAccount::RelayManaged { address: None }
        );
    }

    #[test]
    fn test_identify_unidentified() {
        let p = parties();
        assert_eq!(identify_missing_account(&[], false, &p), MissingAccount::Unidentified);
        assert_eq!(
            identify_missing_account(&[p.sender, spl_token::id()], false, &p),
            MissingAccount::Unidentified
        );
    }

    #[test]
    fn test_foreign_address_without_marker_is_unidentified() {
        let p = parties();
        assert_eq!(
            identify_missing_account(&[Pubkey::new_unique()], false, &p),
            MissingAccount::Unidentified
        );
        assert_eq!(
            identify_missing_account(&[p.token_mint], false, &p),
            MissingAccount::Unidentified
        );
    }
}
