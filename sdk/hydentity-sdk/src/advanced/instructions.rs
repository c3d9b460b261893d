use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::core::constants::{SNS_NAME_PROGRAM_ID, SPL_TOKEN_PROGRAM_ID};
use crate::error::Result;
use crate::utils::{
    derive_delegate_pda, derive_policy_pda, derive_vault_authority_pda, derive_vault_pda,
    instruction_discriminator,
};

/// Partial policy update; `None` fields are left unchanged by the program.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePolicyParams {
    pub enabled: Option<bool>,
    pub min_splits: Option<u8>,
    pub max_splits: Option<u8>,
    pub min_delay_seconds: Option<u32>,
    pub max_delay_seconds: Option<u32>,
    pub distribution: Option<u8>,
    pub privacy_mode: Option<u8>,
    pub destination_mode: Option<u8>,
    pub destinations: Option<Vec<[u8; 32]>>,
}

#[derive(BorshSerialize)]
struct AddDelegateArgs {
    expires_at: i64,
    permissions: u8,
}

/// Shared by `withdraw_direct` and `deposit_to_umbra`
#[derive(BorshSerialize)]
struct TransferArgs {
    amount: u64,
    mint: Option<[u8; 32]>,
}

fn encode(name: &str, args: &impl BorshSerialize) -> Result<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    args.serialize(&mut data)?;
    Ok(data)
}

pub fn initialize_vault(
    program_id: &Pubkey,
    owner: &Pubkey,
    name_account: &Pubkey,
) -> Instruction {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (vault_authority, _) = derive_vault_authority_pda(program_id, name_account);
    let (policy, _) = derive_policy_pda(program_id, name_account);

    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new_readonly(*name_account, false),
        AccountMeta::new(vault, false),
        AccountMeta::new(vault_authority, false),
        AccountMeta::new(policy, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: instruction_discriminator("initialize_vault").to_vec(),
    }
}

/// `authority` is the owner, or a delegate whose session PDA is passed along.
pub fn update_policy(
    program_id: &Pubkey,
    authority: &Pubkey,
    name_account: &Pubkey,
    params: &UpdatePolicyParams,
    delegate_session: Option<Pubkey>,
) -> Result<Instruction> {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (policy, _) = derive_policy_pda(program_id, name_account);

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new_readonly(*name_account, false),
        AccountMeta::new_readonly(vault, false),
        AccountMeta::new(policy, false),
        // Anchor reads an absent optional account as the program id
        AccountMeta::new_readonly(delegate_session.unwrap_or(*program_id), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: encode("update_policy", params)?,
    })
}

pub fn add_delegate(
    program_id: &Pubkey,
    owner: &Pubkey,
    name_account: &Pubkey,
    delegate: &Pubkey,
    expires_at: i64,
    permissions: u8,
) -> Result<Instruction> {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (session, _) = derive_delegate_pda(program_id, name_account, delegate);

    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new_readonly(*name_account, false),
        AccountMeta::new_readonly(vault, false),
        AccountMeta::new_readonly(*delegate, false),
        AccountMeta::new(session, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: encode(
            "add_delegate",
            &AddDelegateArgs {
                expires_at,
                permissions,
            },
        )?,
    })
}

pub fn revoke_delegate(
    program_id: &Pubkey,
    owner: &Pubkey,
    name_account: &Pubkey,
    delegate: &Pubkey,
) -> Instruction {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (session, _) = derive_delegate_pda(program_id, name_account, delegate);

    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new_readonly(*name_account, false),
        AccountMeta::new_readonly(vault, false),
        AccountMeta::new_readonly(*delegate, false),
        AccountMeta::new(session, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: instruction_discriminator("revoke_delegate").to_vec(),
    }
}

/// SOL withdrawal straight from the vault to `destination` (no privacy routing).
pub fn withdraw_direct(
    program_id: &Pubkey,
    owner: &Pubkey,
    name_account: &Pubkey,
    destination: &Pubkey,
    amount: u64,
) -> Result<Instruction> {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (vault_authority, _) = derive_vault_authority_pda(program_id, name_account);

    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new_readonly(*name_account, false),
        AccountMeta::new(vault, false),
        AccountMeta::new(vault_authority, false),
        AccountMeta::new(*destination, false),
        // No token accounts on the SOL path
        AccountMeta::new_readonly(*program_id, false),
        AccountMeta::new_readonly(*program_id, false),
        AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: encode("withdraw_direct", &TransferArgs { amount, mint: None })?,
    })
}

/// SOL deposit from the vault into the pool account `pool` owned by
/// `pool_program`. `authority` is the owner, or a delegate holding the
/// deposit permission whose session PDA is passed along.
pub fn deposit_to_umbra(
    program_id: &Pubkey,
    authority: &Pubkey,
    name_account: &Pubkey,
    pool_program: &Pubkey,
    pool: &Pubkey,
    amount: u64,
    delegate_session: Option<Pubkey>,
) -> Result<Instruction> {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (vault_authority, _) = derive_vault_authority_pda(program_id, name_account);
    let (policy, _) = derive_policy_pda(program_id, name_account);

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new_readonly(*name_account, false),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new_readonly(policy, false),
        AccountMeta::new_readonly(delegate_session.unwrap_or(*program_id), false),
        AccountMeta::new_readonly(*pool_program, false),
        AccountMeta::new(*pool, false),
        // No token accounts on the SOL path
        AccountMeta::new_readonly(*program_id, false),
        AccountMeta::new_readonly(*program_id, false),
        AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: encode("deposit_to_umbra", &TransferArgs { amount, mint: None })?,
    })
}

/// Record that the SNS name now belongs to the vault authority.
pub fn mark_domain_transferred(
    program_id: &Pubkey,
    owner: &Pubkey,
    name_account: &Pubkey,
) -> Instruction {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (vault_authority, _) = derive_vault_authority_pda(program_id, name_account);

    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new_readonly(*name_account, false),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(vault_authority, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: instruction_discriminator("mark_domain_transferred").to_vec(),
    }
}

/// Hand the SNS name back from the vault authority to `destination`.
/// Only valid after `mark_domain_transferred`.
pub fn reclaim_domain(
    program_id: &Pubkey,
    owner: &Pubkey,
    name_account: &Pubkey,
    destination: &Pubkey,
) -> Instruction {
    let (vault, _) = derive_vault_pda(program_id, name_account);
    let (vault_authority, _) = derive_vault_authority_pda(program_id, name_account);

    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(*name_account, false),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new_readonly(*destination, false),
        AccountMeta::new_readonly(SNS_NAME_PROGRAM_ID, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: instruction_discriminator("reclaim_domain").to_vec(),
    }
}
