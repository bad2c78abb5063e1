//! Instruction planning and ordering validation
//!
//! Builds the ordered instruction list for a validated transfer:
//! - native: a single system transfer
//! - token: optional idempotent creation of the recipient's holding account,
//!   followed by a checked token transfer
//!
//! Plans are never cached. The relay binds nonce state to each call, so every
//! submission attempt gets a freshly built plan with its own id.

use crate::registry::{AssetRegistry, TOKEN_DECIMALS};
use crate::rpc_manager::LedgerRpc;
use crate::tx_builder::accounts::{holding_account, probe_account};
use crate::tx_builder::errors::TransactionBuilderError;
use crate::types::{AccountPresence, AssetKind, ValidatedTransfer};
use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentLevel, instruction::Instruction, pubkey::Pubkey,
    system_instruction, system_program,
};
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Ordered instructions for one submission attempt
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    /// Unique per build; two attempts never share a plan
    pub id: Uuid,

    /// The ordered list of instructions for the transaction
    pub instructions: Vec<Instruction>,

    /// Recipient's holding account (token transfers only)
    pub recipient_holding: Option<Pubkey>,

    /// Whether the plan creates the recipient's holding account
    pub creates_holding_account: bool,
}

impl InstructionPlan {
    pub fn new(
        instructions: Vec<Instruction>,
        recipient_holding: Option<Pubkey>,
        creates_holding_account: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instructions,
            recipient_holding,
            creates_holding_account,
        }
    }
}

/// Native transfer: sender -> recipient, lamports
pub fn plan_native_transfer(sender: &Pubkey, recipient: &Pubkey, lamports: u64) -> InstructionPlan {
    InstructionPlan::new(
        vec![system_instruction::transfer(sender, recipient, lamports)],
        None,
        false,
    )
}

/// Token transfer between the owners' holding accounts
///
/// When `create_recipient_holding` is set the idempotent creation instruction
/// (paid by the sender) is placed before the transfer.
pub fn plan_token_transfer(
    sender: &Pubkey,
    recipient: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    create_recipient_holding: bool,
) -> Result<InstructionPlan, TransactionBuilderError> {
    let source = holding_account(sender, mint);
    let destination = holding_account(recipient, mint);

    let mut instructions = Vec::with_capacity(2);

    if create_recipient_holding {
        instructions.push(create_associated_token_account_idempotent(
            sender,
            recipient,
            mint,
            &spl_token::id(),
        ));
    }

    let transfer = spl_token::instruction::transfer_checked(
        &spl_token::id(),
        &source,
        mint,
        &destination,
        sender,
        &[],
        amount,
        TOKEN_DECIMALS,
    )
    .map_err(|e| TransactionBuilderError::instruction_failed("spl_token", e.to_string()))?;
    instructions.push(transfer);

    Ok(InstructionPlan::new(
        instructions,
        Some(destination),
        create_recipient_holding,
    ))
}

fn is_holding_creation(ix: &Instruction) -> bool {
    ix.program_id == spl_associated_token_account::id()
}

fn is_transfer(ix: &Instruction) -> bool {
    if ix.program_id == spl_token::id() {
        return true;
    }
    // SystemInstruction::Transfer has discriminator 2 (u32 little-endian)
    ix.program_id == system_program::id() && ix.data.len() >= 4 && ix.data[..4] == [2, 0, 0, 0]
}

/// Validate plan structure
///
/// - the list is non-empty and holds exactly one transfer
/// - every holding-account creation comes before the transfer
pub fn sanity_check_ix_order(instructions: &[Instruction]) -> Result<(), TransactionBuilderError> {
    if instructions.is_empty() {
        return Err(TransactionBuilderError::invalid_order(
            "Instruction list is empty",
        ));
    }

    let transfers: Vec<usize> = instructions
        .iter()
        .enumerate()
        .filter(|(_, ix)| is_transfer(ix))
        .map(|(idx, _)| idx)
        .collect();

    let transfer_idx = match transfers.as_slice() {
        [idx] => *idx,
        [] => {
            return Err(TransactionBuilderError::invalid_order(
                "Plan contains no transfer instruction",
            ))
        }
        many => {
            return Err(TransactionBuilderError::invalid_order(format!(
                "Plan contains {} transfer instructions (positions {:?}); exactly one allowed",
                many.len(),
                many
            )))
        }
    };

    if let Some((idx, _)) = instructions
        .iter()
        .enumerate()
        .find(|(idx, ix)| *idx > transfer_idx && is_holding_creation(ix))
    {
        return Err(TransactionBuilderError::invalid_order(format!(
            "Holding account creation at position {} follows the transfer at position {}",
            idx, transfer_idx
        )));
    }

    Ok(())
}

/// Source of instruction plans for the submission loop
#[async_trait]
pub trait TransferInstructionBuilder: Send + Sync {
    /// Build a fresh plan; called once per submission attempt
    async fn build(&self, transfer: &ValidatedTransfer) -> Result<InstructionPlan, TransactionBuilderError>;
}

/// Builder that checks the ledger for the recipient's holding account
pub struct LedgerInstructionBuilder {
    rpc: Arc<dyn LedgerRpc>,
    registry: AssetRegistry,
}

impl LedgerInstructionBuilder {
    pub fn new(rpc: Arc<dyn LedgerRpc>, registry: AssetRegistry) -> Self {
        Self { rpc, registry }
    }
}

#[async_trait]
impl TransferInstructionBuilder for LedgerInstructionBuilder {
    async fn build(&self, transfer: &ValidatedTransfer) -> Result<InstructionPlan, TransactionBuilderError> {
        let plan = match transfer.asset {
            AssetKind::Native => {
                plan_native_transfer(&transfer.sender, &transfer.recipient, transfer.base_units)
            }
            AssetKind::FungibleToken => {
                let mint = self.registry.token_mint();
                let destination = holding_account(&transfer.recipient, &mint);

                // Unknown (rate limit, transport) is treated as missing: the
                // creation instruction is idempotent, a failed transfer is not.
                let presence =
                    probe_account(self.rpc.as_ref(), &destination, CommitmentLevel::Confirmed).await;
                let needs_creation = presence != AccountPresence::Exists;
                debug!(
                    holding_account = %destination,
                    presence = ?presence,
                    needs_creation,
                    "Recipient holding account checked"
                );

                plan_token_transfer(
                    &transfer.sender,
                    &transfer.recipient,
                    &mint,
                    transfer.base_units,
                    needs_creation,
                )?
            }
        };

        sanity_check_ix_order(&plan.instructions)?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedgerRpc;
    use crate::types::Network;
    use solana_sdk::instruction::AccountMeta;

    fn token_transfer(sender: Pubkey, recipient: Pubkey) -> ValidatedTransfer {
        ValidatedTransfer {
            sender,
            recipient,
            asset: AssetKind::FungibleToken,
            base_units: 2_500_000,
            fee_asset: AssetKind::FungibleToken,
            network: Network::Test,
        }
    }

    #[test]
    fn test_plan_native_transfer() {
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let plan = plan_native_transfer(&sender, &recipient, 100_000_000);

        assert_eq!(plan.instructions.len(), 1);
        assert_eq!(plan.instructions[0].program_id, system_program::id());
        assert_eq!(plan.instructions[0].accounts[0].pubkey, sender);
        assert_eq!(plan.instructions[0].accounts[1].pubkey, recipient);
        assert!(plan.recipient_holding.is_none());
        assert!(sanity_check_ix_order(&plan.instructions).is_ok());
    }

    #[test]
    fn test_plan_token_transfer_with_creation() {
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let plan = plan_token_transfer(&sender, &recipient, &mint, 1_000_000, true).unwrap();

        assert_eq!(plan.instructions.len(), 2);
        assert_eq!(plan.instructions[0].program_id, spl_associated_token_account::id());
        assert_eq!(plan.instructions[1].program_id, spl_token::id());
        assert_eq!(plan.recipient_holding, Some(holding_account(&recipient, &mint)));
        assert!(plan.creates_holding_account);
        assert!(sanity_check_ix_order(&plan.instructions).is_ok());
    }

    #[test]
    fn test_plan_token_transfer_without_creation() {
        let plan = plan_token_transfer(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            1,
            false,
        )
        .unwrap();
        assert_eq!(plan.instructions.len(), 1);
        assert!(!plan.creates_holding_account);
    }

    #[test]
    fn test_plans_get_distinct_ids() {
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let a = plan_native_transfer(&sender, &recipient, 1);
        let b = plan_native_transfer(&sender, &recipient, 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_sanity_check_empty_list() {
        assert!(sanity_check_ix_order(&[]).is_err());
    }

    #[test]
    fn test_sanity_check_creation_after_transfer() {
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let mut plan = plan_token_transfer(&sender, &recipient, &mint, 1, true).unwrap();
        plan.instructions.reverse();

        match sanity_check_ix_order(&plan.instructions) {
            Err(TransactionBuilderError::InvalidInstructionOrder(msg)) => {
                assert!(msg.contains("follows the transfer"))
            }
            other => panic!("Expected InvalidInstructionOrder, got {:?}", other),
        }
    }

    #[test]
    fn test_sanity_check_rejects_double_transfer() {
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let ix = system_instruction::transfer(&sender, &recipient, 1);
        let result = sanity_check_ix_order(&[ix.clone(), ix]);
        assert!(matches!(
            result,
            Err(TransactionBuilderError::InvalidInstructionOrder(msg)) if msg.contains("exactly one")
        ));
    }

    #[test]
    fn test_sanity_check_rejects_missing_transfer() {
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1, 2, 3, 4],
            vec![AccountMeta::new(Pubkey::new_unique(), false)],
        );
        assert!(sanity_check_ix_order(&[ix]).is_err());
    }

    #[tokio::test]
    async fn test_builder_skips_creation_when_holding_exists() {
        let registry = AssetRegistry::for_network(Network::Test);
        let rpc = Arc::new(MockLedgerRpc::new());
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        rpc.add_account(holding_account(&recipient, &registry.token_mint()));

        let builder = LedgerInstructionBuilder::new(rpc.clone(), registry);
        let plan = builder.build(&token_transfer(sender, recipient)).await.unwrap();

        assert_eq!(plan.instructions.len(), 1);
        assert_eq!(rpc.account_query_count(), 1);
    }

    #[tokio::test]
    async fn test_builder_creates_holding_when_missing() {
        let registry = AssetRegistry::for_network(Network::Test);
        let rpc = Arc::new(MockLedgerRpc::new());
        let builder = LedgerInstructionBuilder::new(rpc, registry);

        let plan = builder
            .build(&token_transfer(Pubkey::new_unique(), Pubkey::new_unique()))
            .await
            .unwrap();

        assert_eq!(plan.instructions.len(), 2);
        assert!(plan.creates_holding_account);
    }

    #[tokio::test]
    async fn test_builder_native_makes_no_rpc_calls() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let builder =
            LedgerInstructionBuilder::new(rpc.clone(), AssetRegistry::for_network(Network::Test));
        let transfer = ValidatedTransfer {
            asset: AssetKind::Native,
            base_units: 100_000_000,
            ..token_transfer(Pubkey::new_unique(), Pubkey::new_unique())
        };

        let plan = builder.build(&transfer).await.unwrap();
        assert_eq!(plan.instructions.len(), 1);
        assert_eq!(rpc.account_query_count(), 0);
    }
}
