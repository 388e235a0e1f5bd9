use std::mem::size_of;

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, TokenAccount};

use crate::states::*;
use crate::{
    BUSHEL_BASKET, BUSHEL_BASKET_MINT, BUSHEL_CONTEXT, BUSHEL_GROUP, BUSHEL_TOKEN,
};

/// Initialize the group, i.e. the initial data for the market.
/// Should only be done once by the owner of the market. The quote transaction
/// pool is handed over to the program authority here.
#[derive(Accounts)]
#[instruction(bump_group: u8)]
pub struct InitializeGroup<'info> {
    #[account(mut, signer)]
    pub owner: AccountInfo<'info>,

    #[account(init,
        seeds = [BUSHEL_GROUP, &owner.key.to_bytes()],
        bump = bump_group,
        payer = owner,
        space = 8 + size_of::<BushelGroup>())]
    pub bushel_group: AccountLoader<'info, BushelGroup>,

    pub quote_token_mint: Box<Account<'info, Mint>>,

    #[account(mut,
              constraint = quote_transaction_pool.mint == quote_token_mint.key(),
              constraint = quote_transaction_pool.owner == *owner.key)]
    pub quote_transaction_pool: Box<Account<'info, TokenAccount>>,

    pub system_program: Program<'info, System>,
    pub token_program: AccountInfo<'info>,
}

/// Add a new token to the market.
/// Registers the oracle bindings and the custody pool, and opens the
/// program's open orders account on the token's serum market.
#[derive(Accounts)]
#[instruction(bump: u8)]
pub struct AddToken<'info> {
    #[account(mut, signer)]
    pub owner: AccountInfo<'info>,

    #[account(mut)]
    pub bushel_group: AccountLoader<'info, BushelGroup>,

    pub mint: Account<'info, Mint>,
    pub price_oracle: AccountInfo<'info>,
    pub product_oracle: AccountInfo<'info>,
    #[account(mut,
              constraint = token_pool.owner == *owner.key,
              constraint = token_pool.mint == mint.key())]
    pub token_pool: Account<'info, TokenAccount>,

    pub market: AccountInfo<'info>,
    #[account(init,
              seeds = [BUSHEL_TOKEN, &mint.key().to_bytes()],
              bump = bump,
              payer = owner,
              space = 8 + size_of::<TokenEntry>())]
    pub token_entry: Box<Account<'info, TokenEntry>>,
    #[account(mut)]
    pub open_orders_account: AccountInfo<'info>,
    pub bushel_authority: AccountInfo<'info>,
    pub token_program: AccountInfo<'info>,
    pub system_program: Program<'info, System>,
    pub dex_program: AccountInfo<'info>,
    pub rent: AccountInfo<'info>,
}

/// Create a new basket.
/// All components and amounts are passed by instruction. This creates the
/// basket record and a dedicated share mint that is minted on every buy.
#[derive(Accounts)]
#[instruction(basket_number: u64, basket_bump: u8, basket_mint_bump: u8)]
pub struct AddBasket<'info> {
    #[account(mut, signer)]
    pub client: AccountInfo<'info>,

    #[account(mut)]
    pub group: AccountLoader<'info, BushelGroup>,

    #[account(init,
              seeds = [BUSHEL_BASKET, &basket_number.to_le_bytes()],
              bump = basket_bump,
              payer = client,
              space = 8 + size_of::<Basket>())]
    pub basket: Box<Account<'info, Basket>>,

    #[account(init,
              seeds = [BUSHEL_BASKET_MINT, &basket_number.to_le_bytes()],
              bump = basket_mint_bump,
              payer = client,
              owner = token::ID,
              space = Mint::LEN)]
    pub basket_mint: AccountInfo<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, anchor_spl::token::Token>,
    pub rent: Sysvar<'info, Rent>,
}

// Permissionless instruction which should be called to refresh one token's
// price cache from its oracle.
#[derive(Accounts)]
pub struct UpdatePrice<'info> {
    pub group: AccountLoader<'info, BushelGroup>,
    #[account(mut)]
    pub token_entry: Box<Account<'info, TokenEntry>>,
    #[account(constraint = token_entry.price_oracle == oracle_ai.key())]
    pub oracle_ai: AccountInfo<'info>,
}

// Permissionless instruction which recomputes a basket's aggregate price from
// the component caches. Pass one token entry per component, in component
// order, as the remaining accounts.
#[derive(Accounts)]
pub struct UpdateBasketPrice<'info> {
    #[account(mut)]
    pub basket: Box<Account<'info, Basket>>,
}

/// Creates a context for a basket trade {buying, selling}.
/// To trade a basket first create a trade context with this instruction, then
/// process it once per component token, then finalize. Quote tokens (buy) or
/// basket shares (sell) are taken during init so every later leg is funded
/// regardless of execution order. Only init requires the client's signature.
/// The trade spans several transactions because the venue accounts of all
/// component markets do not fit in one call.
#[derive(Accounts)]
#[instruction(order_id: u8, context_bump: u8)]
pub struct InitTradeContext<'info> {
    pub group: AccountLoader<'info, BushelGroup>,

    #[account(signer, mut)]
    pub user: AccountInfo<'info>,

    pub basket: Box<Account<'info, Basket>>,

    // user quote token account i.e. usdc account
    #[account(mut,
              constraint = quote_token_account.owner == *user.key,
              constraint = quote_token_account.mint == quote_token_mint.key())]
    pub quote_token_account: Account<'info, TokenAccount>,

    // basket share account belonging to the user
    #[account(mut,
              constraint = basket_token_account.owner == *user.key,
              constraint = basket_token_account.mint == basket.basket_mint)]
    pub basket_token_account: Account<'info, TokenAccount>,

    pub quote_token_mint: Account<'info, Mint>,

    #[account(mut, constraint = basket.basket_mint == basket_token_mint.key())]
    pub basket_token_mint: Account<'info, Mint>,

    #[account(init,
              seeds = [BUSHEL_CONTEXT, &user.key.to_bytes(), &[order_id]],
              bump = context_bump,
              payer = user,
              space = 8 + size_of::<TradeContext>())]
    pub trade_context: AccountLoader<'info, TradeContext>,

    #[account(mut)]
    pub quote_transaction_pool: Account<'info, TokenAccount>,

    pub token_program: AccountInfo<'info>,
    pub system_program: Program<'info, System>,
}

/// Process one token and its market for a context.
/// Buys or sells one component of the basket; the token side settles in the
/// custody pool, the quote side in the quote transaction pool. Permissionless
/// as it is driven by an offchain crank, in any component order.
#[derive(Accounts)]
pub struct ProcessTokenForContext<'info> {
    #[account(mut)]
    pub trade_context: AccountLoader<'info, TradeContext>,
    #[account(constraint = token_entry.token_mint == token_mint.key())]
    pub token_entry: Box<Account<'info, TokenEntry>>,

    pub token_mint: Account<'info, Mint>,

    pub basket: Box<Account<'info, Basket>>,

    // accounts related to the serum market
    #[account(mut)]
    pub market: AccountInfo<'info>,
    #[account(mut)]
    pub open_orders: AccountInfo<'info>,
    #[account(mut)]
    pub request_queue: AccountInfo<'info>,
    #[account(mut)]
    pub event_queue: AccountInfo<'info>,
    #[account(mut)]
    pub bids: AccountInfo<'info>,
    #[account(mut)]
    pub asks: AccountInfo<'info>,
    #[account(mut)]
    pub token_vault: AccountInfo<'info>,
    #[account(mut)]
    pub quote_token_vault: AccountInfo<'info>,
    pub vault_signer: AccountInfo<'info>,
    // custody pool for this token
    #[account(mut)]
    pub token_pool: AccountInfo<'info>,
    // pool where all quote tokens of in-flight contexts are kept
    #[account(mut)]
    pub quote_transaction_pool: Box<Account<'info, TokenAccount>>,

    pub bushel_authority: AccountInfo<'info>,
    // Programs.
    pub dex_program: AccountInfo<'info>,
    pub token_program: AccountInfo<'info>,
    // Sysvars.
    pub rent: AccountInfo<'info>,
}

/// Finalize and close the context.
/// Verifies every component was treated, settles the quote remainder with the
/// client and mints or burns basket shares. Context rent returns to the user.
/// Permissionless as it is called by the offchain crank.
#[derive(Accounts)]
pub struct FinalizeContext<'info> {
    pub group: AccountLoader<'info, BushelGroup>,

    #[account(mut, close = user)]
    pub trade_context: AccountLoader<'info, TradeContext>,

    pub basket: Box<Account<'info, Basket>>,

    #[account(mut,
              constraint = quote_token_account.owner == user.key())]
    pub quote_token_account: Account<'info, TokenAccount>,

    #[account(mut,
              constraint = basket_token_account.owner == user.key(),
              constraint = basket_token_account.mint == basket.basket_mint)]
    pub basket_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub quote_transaction_pool: Account<'info, TokenAccount>,

    pub bushel_authority: AccountInfo<'info>,

    #[account(mut, constraint = basket.basket_mint == basket_token_mint.key())]
    pub basket_token_mint: Account<'info, Mint>,
    #[account(mut)]
    pub user: AccountInfo<'info>,
    pub token_program: AccountInfo<'info>,
    pub system_program: Program<'info, System>,
}

/// Flag a context for unwinding when a trade cannot complete.
/// Permissionless; the offchain crank reverts any context that was not fully
/// treated within its slot budget. The unwind itself drains through
/// `process_token_for_context`, one inverse leg per touched component.
#[derive(Accounts)]
pub struct RevertTradeContext<'info> {
    #[account(mut)]
    pub trade_context: AccountLoader<'info, TradeContext>,

    pub basket: Box<Account<'info, Basket>>,
    pub quote_transaction_pool: AccountInfo<'info>,
}
