use anchor_lang::prelude::*;

pub mod errors;
pub mod exchange;
pub mod instructions;
pub mod pricing;
pub mod processor;
pub mod states;

pub use crate::errors::*;
pub use crate::instructions::*;
pub use crate::states::*;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

pub const MAX_NB_TOKENS: usize = 20;
pub const MAX_NB_COMPONENTS: usize = 10;
pub const MAX_NAME_LEN: usize = 10;
pub const BASKET_NAME_LEN: usize = 128;
pub const BASKET_DESC_LEN: usize = 256;
// basket shares and basket prices always carry 6 decimal places
pub const BASKET_SHARE_DECIMALS: u8 = 6;
pub const BASKET_SHARE_UNIT: u64 = 1_000_000;
pub const QUOTE_PRICE_EXP: i32 = -6;
// a cached oracle reading older than this may not price a forward leg
pub const PRICE_STALENESS_SLOTS: u64 = 120;
// a context older than this may only be reverted
pub const CONTEXT_TTL_SLOTS: u64 = 1200;

pub const BUSHEL_GROUP: &[u8] = b"bushel_group";
pub const BUSHEL_TOKEN: &[u8] = b"bushel_token";
pub const BUSHEL_BASKET: &[u8] = b"bushel_basket";
pub const BUSHEL_BASKET_MINT: &[u8] = b"bushel_basket_mint";
pub const BUSHEL_CONTEXT: &[u8] = b"bushel_context";
pub const BUSHEL_AUTHORITY: &[u8] = b"bushel_auth";

#[program]
pub mod bushel {
    use super::*;

    pub fn initialize_group(
        ctx: Context<InitializeGroup>,
        _bump_group: u8,
        quote_mint_name: String,
    ) -> ProgramResult {
        processor::initialize_group(ctx, quote_mint_name)
    }

    pub fn add_token(ctx: Context<AddToken>, _bump: u8, name: String) -> ProgramResult {
        processor::add_token(ctx, name)
    }

    pub fn add_basket(
        ctx: Context<AddBasket>,
        basket_number: u64,
        _basket_bump: u8,
        _basket_mint_bump: u8,
        basket_name: String,
        basket_desc: String,
        basket_components: Vec<BasketComponent>,
    ) -> ProgramResult {
        processor::add_basket(ctx, basket_number, basket_name, basket_desc, basket_components)
    }

    pub fn update_price(ctx: Context<UpdatePrice>) -> ProgramResult {
        processor::update_price(ctx)
    }

    pub fn update_basket_price(ctx: Context<UpdateBasketPrice>) -> ProgramResult {
        processor::update_basket_price(ctx)
    }

    pub fn init_trade_context(
        ctx: Context<InitTradeContext>,
        order_id: u8,
        _context_bump: u8,
        side: TradeSide,
        basket_share_amount: u64,
        worst_price_bound: u64,
    ) -> ProgramResult {
        processor::init_trade_context(ctx, order_id, side, basket_share_amount, worst_price_bound)
    }

    pub fn process_token_for_context(ctx: Context<ProcessTokenForContext>) -> ProgramResult {
        processor::process_token_for_context(ctx)
    }

    pub fn revert_trade_context(ctx: Context<RevertTradeContext>) -> ProgramResult {
        processor::revert_trade_context(ctx)
    }

    pub fn finalize_context(ctx: Context<FinalizeContext>) -> ProgramResult {
        processor::finalize_context(ctx)
    }
}
