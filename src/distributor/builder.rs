//! Pure transaction construction
//!
//! Assembles one unsigned transaction from the planned transfer steps:
//! per recipient, in input order, an optional create-account instruction
//! immediately followed by a checked transfer. Amounts are expressed in
//! integer minor units plus the token's declared decimals so no second
//! rounding surface exists at the protocol boundary. The builder never
//! touches the network; signing and submission happen in the engine.

use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, signature::Keypair, signer::Signer,
    system_instruction, transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};

use super::errors::DistributionError;
use super::provisioning::TransferStep;

/// Build the unsigned distribution transaction.
///
/// `source` owns the debited token account and funds any account
/// creations; `fee_payer` pays the transaction fee and may be the same
/// key. A zero-amount step still gets its transfer instruction, keeping an
/// auditable record of intended-but-empty distribution.
pub fn build_distribution_transaction(
    steps: &[TransferStep],
    source: &Pubkey,
    fee_payer: &Pubkey,
    mint: &Pubkey,
    decimals: u32,
) -> Result<Transaction, DistributionError> {
    let instructions = transfer_instructions(steps, source, mint, decimals)?;
    Ok(Transaction::new_with_payer(&instructions, Some(fee_payer)))
}

/// Build the unsigned claim transaction for a single recipient.
///
/// Same creation/transfer pairing as a distribution, plus an optional
/// lamport transfer from the source wallet so the recipient leaves the
/// claim gas-funded. The lamport leg rides in the same atomic submission;
/// a claim never lands without its gas.
pub fn build_claim_transaction(
    step: &TransferStep,
    source: &Pubkey,
    fee_payer: &Pubkey,
    mint: &Pubkey,
    decimals: u32,
    gas_lamports: Option<u64>,
) -> Result<Transaction, DistributionError> {
    let mut instructions =
        transfer_instructions(std::slice::from_ref(step), source, mint, decimals)?;
    if let Some(lamports) = gas_lamports {
        instructions.push(system_instruction::transfer(
            source,
            &step.recipient,
            lamports,
        ));
    }
    Ok(Transaction::new_with_payer(&instructions, Some(fee_payer)))
}

fn transfer_instructions(
    steps: &[TransferStep],
    source: &Pubkey,
    mint: &Pubkey,
    decimals: u32,
) -> Result<Vec<Instruction>, DistributionError> {
    if steps.is_empty() {
        return Err(DistributionError::configuration(
            "cannot build a transaction with no transfer steps",
        ));
    }
    let decimals = u8::try_from(decimals).map_err(|_| {
        DistributionError::configuration(format!("token decimals out of range: {decimals}"))
    })?;

    let source_token_account = get_associated_token_address(source, mint);

    // Worst case: one creation plus one transfer per step.
    let mut instructions: Vec<Instruction> = Vec::with_capacity(steps.len() * 2);
    for step in steps {
        if step.needs_creation {
            instructions.push(create_associated_token_account(
                source,
                &step.recipient,
                mint,
                &spl_token::id(),
            ));
        }
        let transfer = spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &source_token_account,
            mint,
            &step.token_account,
            source,
            &[],
            step.amount,
            decimals,
        )
        .map_err(|e| DistributionError::internal(format!("transfer instruction: {e}")))?;
        instructions.push(transfer);
    }
    Ok(instructions)
}

/// The deduplicated signer set for a distribution.
///
/// When source and fee payer are the same key only one signature is
/// required; passing the keypair twice would make signing fail.
pub fn dedup_signers<'a>(source: &'a Keypair, fee_payer: &'a Keypair) -> Vec<&'a Keypair> {
    if source.pubkey() == fee_payer.pubkey() {
        vec![source]
    } else {
        vec![source, fee_payer]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(amount: u64, needs_creation: bool) -> TransferStep {
        let recipient = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        TransferStep {
            recipient,
            token_account: get_associated_token_address(&recipient, &mint),
            amount,
            needs_creation,
        }
    }

    fn steps_for_mint(mint: &Pubkey, specs: &[(u64, bool)]) -> Vec<TransferStep> {
        specs
            .iter()
            .map(|&(amount, needs_creation)| {
                let recipient = Pubkey::new_unique();
                TransferStep {
                    recipient,
                    token_account: get_associated_token_address(&recipient, mint),
                    amount,
                    needs_creation,
                }
            })
            .collect()
    }

    #[test]
    fn test_creation_precedes_its_transfer() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let steps = steps_for_mint(&mint, &[(100, true), (200, false), (300, true)]);

        let tx = build_distribution_transaction(&steps, &source, &source, &mint, 3).unwrap();

        // Expected program sequence: [ata, token, token, ata, token]
        let programs: Vec<Pubkey> = tx
            .message
            .instructions
            .iter()
            .map(|ix| *ix.program_id(&tx.message.account_keys))
            .collect();
        assert_eq!(programs.len(), 5);
        assert_eq!(programs[0], spl_associated_token_account::id());
        assert_eq!(programs[1], spl_token::id());
        assert_eq!(programs[2], spl_token::id());
        assert_eq!(programs[3], spl_associated_token_account::id());
        assert_eq!(programs[4], spl_token::id());
    }

    #[test]
    fn test_zero_amount_transfer_still_emitted() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let steps = steps_for_mint(&mint, &[(500, false), (0, true)]);

        let tx = build_distribution_transaction(&steps, &source, &source, &mint, 3).unwrap();

        // Two transfers plus one creation: the zero-amount recipient keeps
        // both halves of its instruction pair.
        assert_eq!(tx.message.instructions.len(), 3);
    }

    #[test]
    fn test_fee_payer_is_message_payer() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let fee_payer = Pubkey::new_unique();
        let steps = steps_for_mint(&mint, &[(1, false)]);

        let tx = build_distribution_transaction(&steps, &source, &fee_payer, &mint, 3).unwrap();
        assert_eq!(tx.message.account_keys[0], fee_payer);
    }

    #[test]
    fn test_rebuild_is_structurally_identical() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let steps = steps_for_mint(&mint, &[(10, true), (20, false)]);

        let first = build_distribution_transaction(&steps, &source, &source, &mint, 3).unwrap();
        let second = build_distribution_transaction(&steps, &source, &source, &mint, 3).unwrap();
        assert_eq!(first.message, second.message);
    }

    #[test]
    fn test_empty_steps_rejected() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        assert!(matches!(
            build_distribution_transaction(&[], &source, &source, &mint, 3),
            Err(DistributionError::Configuration(_))
        ));
    }

    #[test]
    fn test_oversized_decimals_rejected() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let steps = vec![step(1, false)];
        assert!(matches!(
            build_distribution_transaction(&steps, &source, &source, &mint, 300),
            Err(DistributionError::Configuration(_))
        ));
    }

    #[test]
    fn test_claim_gas_leg_follows_token_transfer() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let claim_step = step(1_500, true);

        let tx =
            build_claim_transaction(&claim_step, &source, &source, &mint, 3, Some(1_000_000))
                .unwrap();

        // create, transfer_checked, system transfer
        assert_eq!(tx.message.instructions.len(), 3);
        let last = &tx.message.instructions[2];
        assert_eq!(
            *last.program_id(&tx.message.account_keys),
            solana_sdk::system_program::id()
        );
        // SystemInstruction::Transfer: u32 index 2 then u64 lamports, LE.
        assert_eq!(&last.data[..4], &2u32.to_le_bytes());
        assert_eq!(&last.data[4..12], &1_000_000u64.to_le_bytes());
        // Lamports go to the recipient wallet, not the token account.
        let to = tx.message.account_keys[last.accounts[1] as usize];
        assert_eq!(to, claim_step.recipient);
    }

    #[test]
    fn test_claim_without_gas_has_no_system_instruction() {
        let mint = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let claim_step = step(500, false);

        let tx = build_claim_transaction(&claim_step, &source, &source, &mint, 3, None).unwrap();

        assert_eq!(tx.message.instructions.len(), 1);
        assert_eq!(
            *tx.message.instructions[0].program_id(&tx.message.account_keys),
            spl_token::id()
        );
    }

    #[test]
    fn test_dedup_signers() {
        let source = Keypair::new();
        let fee_payer = Keypair::new();

        assert_eq!(dedup_signers(&source, &source).len(), 1);

        let signers = dedup_signers(&source, &fee_payer);
        assert_eq!(signers.len(), 2);
        assert_eq!(signers[0].pubkey(), source.pubkey());
        assert_eq!(signers[1].pubkey(), fee_payer.pubkey());
    }
}
