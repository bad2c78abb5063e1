//! Holding-account derivation and existence probes

use crate::metrics::metrics;
use crate::rpc_manager::LedgerRpc;
use crate::types::AccountPresence;
use solana_sdk::{commitment_config::CommitmentLevel, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;
use tracing::{debug, warn};

/// Associated token account of `owner` for `mint`
///
/// Derivation is a PDA of (owner, token program, mint) and works the same for
/// program-controlled (off-curve) owners such as smart wallets.
pub fn holding_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// Ask the ledger whether `address` exists
///
/// Never fails: query errors come back as `Unknown`, with rate limits logged
/// quietly since they are expected on public endpoints.
pub async fn probe_account(
    rpc: &dyn LedgerRpc,
    address: &Pubkey,
    commitment: CommitmentLevel,
) -> AccountPresence {
    match rpc.get_account_info(address, commitment).await {
        Ok(Some(_)) => AccountPresence::Exists,
        Ok(None) => AccountPresence::Missing,
        Err(e) if e.is_rate_limited() => {
            metrics().rate_limited_responses.inc();
            debug!(account = %address, endpoint = rpc.endpoint(), "Account probe rate limited");
            AccountPresence::Unknown
        }
        Err(e) => {
            warn!(account = %address, error = %e, "Account probe failed");
            AccountPresence::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedgerRpc;

    #[test]
    fn test_holding_account_for_off_curve_owner() {
        let mint = Pubkey::new_unique();
        // PDA owner, guaranteed off-curve
        let (owner, _) = Pubkey::find_program_address(&[b"smart_wallet"], &Pubkey::new_unique());
        assert!(!owner.is_on_curve());

        let ata = holding_account(&owner, &mint);
        assert_eq!(ata, holding_account(&owner, &mint));
        assert_ne!(ata, holding_account(&Pubkey::new_unique(), &mint));
    }

    #[tokio::test]
    async fn test_probe_maps_results() {
        let rpc = MockLedgerRpc::new();
        let present = Pubkey::new_unique();
        let absent = Pubkey::new_unique();
        rpc.add_account(present);

        assert_eq!(
            probe_account(&rpc, &present, CommitmentLevel::Confirmed).await,
            AccountPresence::Exists
        );
        assert_eq!(
            probe_account(&rpc, &absent, CommitmentLevel::Confirmed).await,
            AccountPresence::Missing
        );

        rpc.fail_account_queries_with("429 Too Many Requests");
        assert_eq!(
            probe_account(&rpc, &present, CommitmentLevel::Confirmed).await,
            AccountPresence::Unknown
        );
    }
}
