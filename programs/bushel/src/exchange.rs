use std::num::NonZeroU64;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_error::ProgramError;
use anchor_spl::dex;
use anchor_spl::dex::serum_dex::instruction::SelfTradeBehavior;
use anchor_spl::dex::serum_dex::matching::{OrderType, Side};
use anchor_spl::dex::serum_dex::state::MarketState;
use fixed::types::U64F64;
use fixed_macro::types::U64F64 as u64f64;

use crate::errors::BushelError;
use crate::instructions::ProcessTokenForContext;

// price slack applied on top of the confidence-padded expected cost, so a leg
// still fills when the book moved a little since the last oracle crank
pub const LEG_PRICE_HEADROOM: U64F64 = u64f64!(1.05);
pub const LEG_PRICE_FLOOR: U64F64 = u64f64!(0.95);

/// One sized venue order, expressed in the market's lot units.
pub struct LegOrder {
    pub side: Side,
    pub limit_price_lots: NonZeroU64,
    pub max_coin_lots: NonZeroU64,
    pub max_native_pc_qty: NonZeroU64,
}

impl LegOrder {
    pub fn is_bid(&self) -> bool {
        matches!(self.side, Side::Bid)
    }
}

pub fn headroom_budget(cost: u64) -> Result<u64, BushelError> {
    U64F64::from_num(cost)
        .checked_mul(LEG_PRICE_HEADROOM)
        .ok_or(BushelError::MathOverflow)?
        .checked_to_num::<u64>()
        .ok_or(BushelError::MathOverflow)
}

pub fn floor_receive(cost: u64) -> Result<u64, BushelError> {
    U64F64::from_num(cost)
        .checked_mul(LEG_PRICE_FLOOR)
        .ok_or(BushelError::MathOverflow)?
        .checked_to_num::<u64>()
        .ok_or(BushelError::MathOverflow)
}

// native pc per native coin, converted to pc-lots per coin-lot
fn price_lots(
    native_pc: u64,
    native_coin: u64,
    coin_lot_size: u64,
    pc_lot_size: u64,
    round_up: bool,
) -> Result<u64, BushelError> {
    if native_coin == 0 || coin_lot_size == 0 || pc_lot_size == 0 {
        return Err(BushelError::OrderSizeTooSmall);
    }
    let numerator = U64F64::from_num(native_pc)
        .checked_mul(U64F64::from_num(coin_lot_size))
        .ok_or(BushelError::MathOverflow)?;
    let denominator = U64F64::from_num(native_coin)
        .checked_mul(U64F64::from_num(pc_lot_size))
        .ok_or(BushelError::MathOverflow)?;
    let ratio = numerator
        .checked_div(denominator)
        .ok_or(BushelError::MathOverflow)?;
    let rounded = if round_up { ratio.ceil() } else { ratio.floor() };
    rounded
        .checked_to_num::<u64>()
        .ok_or(BushelError::MathOverflow)
}

/// Size a bid acquiring `coin_amount` native units with at most `budget`
/// native quote including fees. Coin lots round up so the target amount is
/// always covered; the budget stays the hard spend cap.
pub fn bid_order(
    budget: u64,
    coin_amount: u64,
    coin_lot_size: u64,
    pc_lot_size: u64,
) -> Result<LegOrder, BushelError> {
    if coin_lot_size == 0 {
        return Err(BushelError::OrderSizeTooSmall);
    }
    let limit = price_lots(budget, coin_amount, coin_lot_size, pc_lot_size, true)?;
    let lots = coin_amount
        .checked_add(coin_lot_size - 1)
        .ok_or(BushelError::MathOverflow)?
        / coin_lot_size;
    Ok(LegOrder {
        side: Side::Bid,
        limit_price_lots: NonZeroU64::new(limit).ok_or(BushelError::OrderSizeTooSmall)?,
        max_coin_lots: NonZeroU64::new(lots).ok_or(BushelError::OrderSizeTooSmall)?,
        max_native_pc_qty: NonZeroU64::new(budget).ok_or(BushelError::OrderSizeTooSmall)?,
    })
}

/// Size an ask disposing of `coin_amount` native units for at least
/// `min_receive` native quote. Coin lots round down so custody is never
/// oversold.
pub fn ask_order(
    min_receive: u64,
    coin_amount: u64,
    coin_lot_size: u64,
    pc_lot_size: u64,
) -> Result<LegOrder, BushelError> {
    if coin_lot_size == 0 {
        return Err(BushelError::OrderSizeTooSmall);
    }
    let limit = price_lots(min_receive, coin_amount, coin_lot_size, pc_lot_size, false)?.max(1);
    let lots = coin_amount / coin_lot_size;
    Ok(LegOrder {
        side: Side::Ask,
        limit_price_lots: NonZeroU64::new(limit).ok_or(BushelError::OrderSizeTooSmall)?,
        max_coin_lots: NonZeroU64::new(lots).ok_or(BushelError::OrderSizeTooSmall)?,
        max_native_pc_qty: NonZeroU64::new(u64::MAX).ok_or(BushelError::MathOverflow)?,
    })
}

pub fn market_lot_sizes(
    market: &AccountInfo,
    dex_program: &Pubkey,
) -> Result<(u64, u64), ProgramError> {
    let state =
        MarketState::load(market, dex_program).map_err(|_| BushelError::ExchangeVenueError)?;
    let coin_lot_size = { state.coin_lot_size };
    let pc_lot_size = { state.pc_lot_size };
    Ok((coin_lot_size, pc_lot_size))
}

/// Immediate-or-cancel order against the component's market, placed by the
/// program authority over the program's open orders account.
pub fn submit_order<'info>(
    accounts: &ProcessTokenForContext<'info>,
    order_payer: AccountInfo<'info>,
    order: &LegOrder,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    let cpi_accounts = dex::NewOrderV3 {
        market: accounts.market.clone(),
        open_orders: accounts.open_orders.clone(),
        request_queue: accounts.request_queue.clone(),
        event_queue: accounts.event_queue.clone(),
        market_bids: accounts.bids.clone(),
        market_asks: accounts.asks.clone(),
        order_payer_token_account: order_payer,
        open_orders_authority: accounts.bushel_authority.clone(),
        coin_vault: accounts.token_vault.clone(),
        pc_vault: accounts.quote_token_vault.clone(),
        token_program: accounts.token_program.clone(),
        rent: accounts.rent.clone(),
    };
    let cpi = CpiContext::new_with_signer(accounts.dex_program.clone(), cpi_accounts, signer_seeds);
    dex::new_order_v3(
        cpi,
        order.side,
        order.limit_price_lots,
        order.max_coin_lots,
        order.max_native_pc_qty,
        SelfTradeBehavior::DecrementTake,
        OrderType::ImmediateOrCancel,
        0,
        65_535,
    )
}

/// Flush the filled leg out of the open orders account: base side into the
/// custody pool, quote side into the quote transaction pool.
pub fn settle_leg<'info>(
    accounts: &ProcessTokenForContext<'info>,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    let cpi_accounts = dex::SettleFunds {
        market: accounts.market.clone(),
        open_orders: accounts.open_orders.clone(),
        open_orders_authority: accounts.bushel_authority.clone(),
        coin_vault: accounts.token_vault.clone(),
        pc_vault: accounts.quote_token_vault.clone(),
        coin_wallet: accounts.token_pool.clone(),
        pc_wallet: accounts.quote_transaction_pool.to_account_info(),
        vault_signer: accounts.vault_signer.clone(),
        token_program: accounts.token_program.clone(),
    };
    let cpi = CpiContext::new_with_signer(accounts.dex_program.clone(), cpi_accounts, signer_seeds);
    dex::settle_funds(cpi)
}
