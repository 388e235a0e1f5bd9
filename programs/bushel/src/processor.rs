use std::mem::size_of;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::{clock::Clock, sysvar::Sysvar};
use anchor_spl::dex;
use anchor_spl::token::{self, Burn, InitializeMint, MintTo, SetAuthority, Transfer};
use pyth_client::{Price, PriceStatus, PriceType};
use spl_token::instruction::AuthorityType;

use crate::check;
use crate::errors::BushelError;
use crate::exchange;
use crate::instructions::*;
use crate::pricing::{self, ComponentQuote, PricePad};
use crate::states::*;
use crate::{
    BASKET_DESC_LEN, BASKET_NAME_LEN, BASKET_SHARE_DECIMALS, BUSHEL_AUTHORITY, MAX_NAME_LEN,
    MAX_NB_COMPONENTS, MAX_NB_TOKENS, PRICE_STALENESS_SLOTS, QUOTE_PRICE_EXP,
};

pub fn initialize_group(ctx: Context<InitializeGroup>, quote_mint_name: String) -> ProgramResult {
    check!(
        quote_mint_name.len() <= MAX_NAME_LEN,
        BushelError::NameBufferOverflow
    );
    {
        let mut group = ctx.accounts.bushel_group.load_init()?;
        group.owner = *ctx.accounts.owner.key;
        group.quote_mint = ctx.accounts.quote_token_mint.key();
        group.quote_transaction_pool = ctx.accounts.quote_transaction_pool.key();
        group.token_count = 0;
        group.number_of_baskets = 0;
        group.quote_mint_name[..quote_mint_name.len()]
            .clone_from_slice(quote_mint_name.as_bytes());
    }

    // the pool settles every context's quote side, so it moves under the
    // program authority right away
    let (authority, _bump) = Pubkey::find_program_address(&[BUSHEL_AUTHORITY], ctx.program_id);
    let cpi_accounts = SetAuthority {
        account_or_mint: ctx.accounts.quote_transaction_pool.to_account_info(),
        current_authority: ctx.accounts.owner.clone(),
    };
    let cpi = CpiContext::new(ctx.accounts.token_program.clone(), cpi_accounts);
    token::set_authority(cpi, AuthorityType::AccountOwner, Some(authority))?;
    Ok(())
}

pub fn add_token(ctx: Context<AddToken>, name: String) -> ProgramResult {
    check!(name.len() <= MAX_NAME_LEN, BushelError::NameBufferOverflow);
    let token_index = {
        let mut group = ctx.accounts.bushel_group.load_mut()?;
        let current = group.token_count;
        check!(
            (current as usize) < MAX_NB_TOKENS,
            BushelError::TokenCountLimitReached
        );
        group.token_count = current
            .checked_add(1)
            .ok_or(BushelError::MathOverflow)?;
        current
    };

    let (authority, authority_bump) =
        Pubkey::find_program_address(&[BUSHEL_AUTHORITY], ctx.program_id);
    check!(
        authority == *ctx.accounts.bushel_authority.key,
        BushelError::UnknownAuthority
    );

    {
        let entry = &mut ctx.accounts.token_entry;
        entry.magic = TOKEN_ENTRY_MAGIC;
        entry.id = token_index;
        entry.token_mint = ctx.accounts.mint.key();
        entry.price_oracle = *ctx.accounts.price_oracle.key;
        entry.product_oracle = *ctx.accounts.product_oracle.key;
        entry.token_pool = ctx.accounts.token_pool.key();
        entry.market = *ctx.accounts.market.key;
        entry.token_open_orders = *ctx.accounts.open_orders_account.key;
        entry.token_name[..name.len()].clone_from_slice(name.as_bytes());
        entry.token_decimal = ctx.accounts.mint.decimals;
        entry.cache = PriceCache::default();
    }

    {
        // custody pool moves under the program authority
        let cpi_accounts = SetAuthority {
            account_or_mint: ctx.accounts.token_pool.to_account_info(),
            current_authority: ctx.accounts.owner.clone(),
        };
        let cpi = CpiContext::new(ctx.accounts.token_program.clone(), cpi_accounts);
        token::set_authority(cpi, AuthorityType::AccountOwner, Some(authority))?;
    }
    {
        // program-owned open orders on the token's market
        let authority_seeds: &[&[u8]] = &[BUSHEL_AUTHORITY, &[authority_bump]];
        let cpi_accounts = dex::InitOpenOrders {
            open_orders: ctx.accounts.open_orders_account.clone(),
            authority: ctx.accounts.bushel_authority.clone(),
            market: ctx.accounts.market.clone(),
            rent: ctx.accounts.rent.clone(),
        };
        let cpi = CpiContext::new_with_signer(
            ctx.accounts.dex_program.clone(),
            cpi_accounts,
            &[authority_seeds],
        );
        dex::init_open_orders(cpi)?;
    }
    msg!(
        "token {} registered at index {}",
        ctx.accounts.token_entry.name(),
        token_index
    );
    Ok(())
}

pub fn add_basket(
    ctx: Context<AddBasket>,
    basket_number: u64,
    basket_name: String,
    basket_desc: String,
    basket_components: Vec<BasketComponent>,
) -> ProgramResult {
    check!(
        basket_components.len() >= 2,
        BushelError::ComponentCountUnderflow
    );
    check!(
        basket_components.len() <= MAX_NB_COMPONENTS,
        BushelError::ComponentCountOverflow
    );
    check!(
        basket_name.len() <= BASKET_NAME_LEN,
        BushelError::NameBufferOverflow
    );
    check!(
        basket_desc.len() <= BASKET_DESC_LEN,
        BushelError::NameBufferOverflow
    );
    {
        let mut group = ctx.accounts.group.load_mut()?;
        check!(
            group.number_of_baskets == basket_number,
            BushelError::BasketNbMismatch
        );
        group.number_of_baskets = basket_number
            .checked_add(1)
            .ok_or(BushelError::MathOverflow)?;
    }

    let basket = &mut ctx.accounts.basket;
    basket.magic = BASKET_MAGIC;
    basket.basket_name[..basket_name.len()].copy_from_slice(basket_name.as_bytes());
    basket.desc[..basket_desc.len()].copy_from_slice(basket_desc.as_bytes());
    basket.number_of_components = basket_components.len() as u8;
    basket.basket_mint = *ctx.accounts.basket_mint.key;
    for (index, component) in basket_components.iter().enumerate() {
        basket.components[index] = *component;
    }
    basket.last_price = 0;
    basket.confidence = 0;
    basket.decimal = BASKET_SHARE_DECIMALS;

    let (authority, _bump) = Pubkey::find_program_address(&[BUSHEL_AUTHORITY], ctx.program_id);
    {
        let cpi = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            InitializeMint {
                mint: ctx.accounts.basket_mint.clone(),
                rent: ctx.accounts.rent.to_account_info(),
            },
        );
        token::initialize_mint(cpi, BASKET_SHARE_DECIMALS, &authority, Some(&authority))?;
    }
    msg!("basket {} created", basket_number);
    Ok(())
}

pub fn update_price(ctx: Context<UpdatePrice>) -> ProgramResult {
    check!(
        ctx.accounts.token_entry.magic == TOKEN_ENTRY_MAGIC,
        BushelError::AccountsMismatch
    );
    {
        let group = ctx.accounts.group.load()?;
        check!(
            ctx.accounts.token_entry.id < group.token_count,
            BushelError::TokenNotFound
        );
    }
    let clock = Clock::get()?;
    let oracle_data = ctx.accounts.oracle_ai.try_borrow_data()?;
    check!(
        oracle_data.len() >= size_of::<Price>(),
        BushelError::OracleFormat
    );
    let oracle = pyth_client::cast::<Price>(&oracle_data);
    check!(oracle.magic == pyth_client::MAGIC, BushelError::OracleFormat);
    check!(
        oracle.ver == pyth_client::VERSION_2,
        BushelError::OracleFormat
    );
    check!(
        matches!(oracle.ptype, PriceType::Price),
        BushelError::OracleFormat
    );
    check!(
        matches!(oracle.agg.status, PriceStatus::Trading),
        BushelError::OracleNotTrading
    );
    let price = oracle.agg.price;
    check!(price > 0, BushelError::PriceEqualOrLessThanZero);
    // confidence should be within 10% of the price
    let threshold = (price as u64)
        .checked_div(10)
        .ok_or(BushelError::MathOverflow)?;
    check!(
        oracle.agg.conf < threshold,
        BushelError::LowConfidenceInOracle
    );

    let entry = &mut ctx.accounts.token_entry;
    entry.cache.last_price = price as u64;
    entry.cache.last_confidence = oracle.agg.conf;
    entry.cache.last_exp = oracle.expo;
    entry.cache.last_updated_slot = clock.slot;
    msg!("price cached for {}", entry.name());
    Ok(())
}

pub fn update_basket_price(ctx: Context<UpdateBasketPrice>) -> ProgramResult {
    let clock = Clock::get()?;
    let basket = &mut ctx.accounts.basket;
    check!(basket.magic == BASKET_MAGIC, BushelError::UnknownBasket);
    let component_count = basket.number_of_components as usize;
    check!(
        ctx.remaining_accounts.len() == component_count,
        BushelError::OracleRefCountMismatch
    );

    let mut quotes = Vec::with_capacity(component_count);
    for (index, oracle_ref) in ctx.remaining_accounts.iter().enumerate() {
        let entry: Account<TokenEntry> = Account::try_from(oracle_ref)?;
        check!(
            entry.magic == TOKEN_ENTRY_MAGIC,
            BushelError::AccountsMismatch
        );
        check!(
            entry.token_mint == basket.components[index].token_mint,
            BushelError::TokenNotFound
        );
        let cache = entry.cache;
        check!(cache.last_price > 0, BushelError::PriceEqualOrLessThanZero);
        check!(
            clock.slot.saturating_sub(cache.last_updated_slot) <= PRICE_STALENESS_SLOTS,
            BushelError::StalePrice
        );
        quotes.push(ComponentQuote {
            price: cache.last_price,
            confidence: cache.last_confidence,
            exponent: cache.last_exp,
        });
    }
    basket.reprice(&quotes)?;
    let last_price = basket.last_price;
    let confidence = basket.confidence;
    msg!(
        "basket {} priced at {} with confidence {}",
        basket.name(),
        last_price,
        confidence
    );
    Ok(())
}

pub fn init_trade_context(
    ctx: Context<InitTradeContext>,
    order_id: u8,
    side: TradeSide,
    basket_share_amount: u64,
    worst_price_bound: u64,
) -> ProgramResult {
    let clock = Clock::get()?;
    check!(
        ctx.accounts.basket.magic == BASKET_MAGIC,
        BushelError::UnknownBasket
    );
    {
        let group = ctx.accounts.group.load()?;
        check!(
            group.quote_mint == ctx.accounts.quote_token_mint.key(),
            BushelError::AccountsMismatch
        );
        check!(
            group.quote_transaction_pool == ctx.accounts.quote_transaction_pool.key(),
            BushelError::AccountsMismatch
        );
    }
    {
        let mut context = ctx.accounts.trade_context.load_init()?;
        context.begin(
            &ctx.accounts.basket,
            ctx.accounts.basket.key(),
            side,
            basket_share_amount,
            worst_price_bound,
            clock.slot,
            ctx.accounts.quote_token_account.key(),
            ctx.accounts.basket_token_account.key(),
            ctx.accounts.quote_transaction_pool.key(),
        )?;
    }

    match side {
        TradeSide::Buy => {
            // worst case cost escrows up front so every later leg is funded
            check!(
                ctx.accounts.quote_token_account.amount >= worst_price_bound,
                BushelError::InsufficientClientBalance
            );
            let cpi_accounts = Transfer {
                from: ctx.accounts.quote_token_account.to_account_info(),
                to: ctx.accounts.quote_transaction_pool.to_account_info(),
                authority: ctx.accounts.user.clone(),
            };
            let cpi = CpiContext::new(ctx.accounts.token_program.clone(), cpi_accounts);
            token::transfer(cpi, worst_price_bound)?;
        }
        TradeSide::Sell => {
            // shares burn up front; finalize mints them back if the trade
            // unwinds
            check!(
                ctx.accounts.basket_token_account.amount >= basket_share_amount,
                BushelError::InsufficientClientBalance
            );
            let cpi_accounts = Burn {
                mint: ctx.accounts.basket_token_mint.to_account_info(),
                to: ctx.accounts.basket_token_account.to_account_info(),
                authority: ctx.accounts.user.clone(),
            };
            let cpi = CpiContext::new(ctx.accounts.token_program.clone(), cpi_accounts);
            token::burn(cpi, basket_share_amount)?;
        }
    }
    msg!("trade context {} opened", order_id);
    Ok(())
}

enum LegPlan {
    // component needs no venue interaction, only its flag resolved
    Resolve,
    Acquire(u64),
    Dispose(u64),
}

pub fn process_token_for_context(ctx: Context<ProcessTokenForContext>) -> ProgramResult {
    let clock = Clock::get()?;
    let entry = &ctx.accounts.token_entry;
    check!(
        entry.magic == TOKEN_ENTRY_MAGIC,
        BushelError::AccountsMismatch
    );
    check!(
        entry.token_pool == *ctx.accounts.token_pool.key,
        BushelError::AccountsMismatch
    );
    check!(
        entry.market == *ctx.accounts.market.key,
        BushelError::UnknownMarket
    );
    check!(
        entry.token_open_orders == *ctx.accounts.open_orders.key,
        BushelError::UnknownOpenOrders
    );
    check!(
        ctx.accounts.basket.magic == BASKET_MAGIC,
        BushelError::UnknownBasket
    );

    let (authority, authority_bump) =
        Pubkey::find_program_address(&[BUSHEL_AUTHORITY], ctx.program_id);
    check!(
        authority == *ctx.accounts.bushel_authority.key,
        BushelError::UnknownAuthority
    );

    // plan the leg under a read borrow; the context is only written after the
    // venue interaction went through, so a failed leg leaves it untouched
    let (index, reverting, plan, quote_left) = {
        let context = ctx.accounts.trade_context.load()?;
        check!(
            context.magic == TRADE_CONTEXT_MAGIC,
            BushelError::AccountsMismatch
        );
        check!(
            context.basket == ctx.accounts.basket.key(),
            BushelError::UnknownBasket
        );
        check!(
            context.quote_transaction_pool == ctx.accounts.quote_transaction_pool.key(),
            BushelError::AccountsMismatch
        );
        let index = context.component_index(&entry.token_mint)?;
        let side = context.side()?;
        let reverting = context.is_reverting();
        if reverting {
            context.expect_unwindable(index)?;
        } else {
            context.expect_pending(index)?;
            check!(
                !context.expired(clock.slot),
                BushelError::StaleOrExpiredContext
            );
        }
        let amounts = context.component_amounts;
        let amount = amounts[index];
        let plan = if amount == 0 {
            LegPlan::Resolve
        } else if reverting {
            match context.state_of(index)? {
                // never executed forward, nothing to unwind
                ComponentState::Pending => LegPlan::Resolve,
                _ => match side {
                    TradeSide::Buy => LegPlan::Dispose(amount),
                    TradeSide::Sell => LegPlan::Acquire(amount),
                },
            }
        } else {
            match side {
                TradeSide::Buy => LegPlan::Acquire(amount),
                TradeSide::Sell => LegPlan::Dispose(amount),
            }
        };
        (index, reverting, plan, context.quote_amount_left)
    };

    if let LegPlan::Resolve = plan {
        let mut context = ctx.accounts.trade_context.load_mut()?;
        if reverting {
            context.mark_unwound(index)?;
        } else {
            context.mark_swapped(index)?;
        }
        msg!("component {} resolved without venue interaction", index);
        return Ok(());
    }

    // forward legs must price off a fresh cache; unwind legs are never
    // blocked, a stale price only widens the headroom they already carry
    let cache = entry.cache;
    if !reverting {
        check!(
            clock.slot.saturating_sub(cache.last_updated_slot) <= PRICE_STALENESS_SLOTS,
            BushelError::StalePrice
        );
    }
    check!(cache.last_price > 0, BushelError::PriceEqualOrLessThanZero);
    let quote = ComponentQuote {
        price: cache.last_price,
        confidence: cache.last_confidence,
        exponent: cache.last_exp,
    };

    let (coin_lot_size, pc_lot_size) =
        exchange::market_lot_sizes(&ctx.accounts.market, ctx.accounts.dex_program.key)?;

    let order = match plan {
        LegPlan::Acquire(amount) => {
            let cost = pricing::expected_component_cost(
                amount,
                entry.token_decimal,
                &quote,
                QUOTE_PRICE_EXP,
                PricePad::Above,
            )?;
            // an unwinding buyback is funded by the pool, escrow only caps
            // forward legs
            let budget = if reverting {
                exchange::headroom_budget(cost)?
            } else {
                exchange::headroom_budget(cost)?.min(quote_left)
            };
            exchange::bid_order(budget, amount, coin_lot_size, pc_lot_size)?
        }
        LegPlan::Dispose(amount) => {
            let cost = pricing::expected_component_cost(
                amount,
                entry.token_decimal,
                &quote,
                QUOTE_PRICE_EXP,
                PricePad::Below,
            )?;
            let floor = exchange::floor_receive(cost)?;
            exchange::ask_order(floor, amount, coin_lot_size, pc_lot_size)?
        }
        LegPlan::Resolve => return Ok(()),
    };

    let quote_pool_before =
        token::accessor::amount(&ctx.accounts.quote_transaction_pool.to_account_info())?;
    let token_pool_before = token::accessor::amount(&ctx.accounts.token_pool)?;

    let authority_seeds: &[&[u8]] = &[BUSHEL_AUTHORITY, &[authority_bump]];
    let signer = &[authority_seeds];
    let order_payer = if order.is_bid() {
        ctx.accounts.quote_transaction_pool.to_account_info()
    } else {
        ctx.accounts.token_pool.clone()
    };
    exchange::submit_order(&ctx.accounts, order_payer, &order, signer)?;
    exchange::settle_leg(&ctx.accounts, signer)?;

    let quote_pool_after =
        token::accessor::amount(&ctx.accounts.quote_transaction_pool.to_account_info())?;
    let token_pool_after = token::accessor::amount(&ctx.accounts.token_pool)?;

    let mut context = ctx.accounts.trade_context.load_mut()?;
    match plan {
        LegPlan::Acquire(amount) => {
            let received = token_pool_after
                .checked_sub(token_pool_before)
                .ok_or(BushelError::MathOverflow)?;
            // a partial fill rolls the whole leg back
            check!(received >= amount, BushelError::ExchangeVenueError);
            let spent = quote_pool_before
                .checked_sub(quote_pool_after)
                .ok_or(BushelError::MathOverflow)?;
            if reverting {
                context.spend_quote_saturating(spent);
                context.mark_unwound(index)?;
            } else {
                context.spend_quote(spent)?;
                context.mark_swapped(index)?;
            }
            msg!("acquired {} base units for {} quote", received, spent);
        }
        LegPlan::Dispose(amount) => {
            let sent = token_pool_before
                .checked_sub(token_pool_after)
                .ok_or(BushelError::MathOverflow)?;
            check!(sent > 0 && sent <= amount, BushelError::ExchangeVenueError);
            let received = quote_pool_after
                .checked_sub(quote_pool_before)
                .ok_or(BushelError::MathOverflow)?;
            context.collect_quote(received)?;
            if reverting {
                context.mark_unwound(index)?;
            } else {
                context.mark_swapped(index)?;
            }
            msg!("disposed {} base units for {} quote", sent, received);
        }
        LegPlan::Resolve => {}
    }
    Ok(())
}

pub fn revert_trade_context(ctx: Context<RevertTradeContext>) -> ProgramResult {
    let mut context = ctx.accounts.trade_context.load_mut()?;
    check!(
        context.magic == TRADE_CONTEXT_MAGIC,
        BushelError::AccountsMismatch
    );
    check!(
        context.basket == ctx.accounts.basket.key(),
        BushelError::UnknownBasket
    );
    check!(
        context.quote_transaction_pool == *ctx.accounts.quote_transaction_pool.key,
        BushelError::AccountsMismatch
    );
    context.start_revert()?;
    msg!("context flagged for unwind");
    Ok(())
}

pub fn finalize_context(ctx: Context<FinalizeContext>) -> ProgramResult {
    let (side, reverting, share_amount, quote_left, initial_quote) = {
        let context = ctx.accounts.trade_context.load()?;
        check!(
            context.magic == TRADE_CONTEXT_MAGIC,
            BushelError::AccountsMismatch
        );
        check!(
            context.basket == ctx.accounts.basket.key(),
            BushelError::UnknownBasket
        );
        check!(
            context.quote_token_account == ctx.accounts.quote_token_account.key(),
            BushelError::AccountsMismatch
        );
        check!(
            context.basket_token_account == ctx.accounts.basket_token_account.key(),
            BushelError::AccountsMismatch
        );
        check!(
            context.quote_transaction_pool == ctx.accounts.quote_transaction_pool.key(),
            BushelError::AccountsMismatch
        );
        let complete = if context.is_reverting() {
            context.all_components(ComponentState::Unwound)
        } else {
            context.all_components(ComponentState::Swapped)
        };
        check!(complete, BushelError::NotAllTokensTreatedBeforeFinalize);
        (
            context.side()?,
            context.is_reverting(),
            context.amount,
            context.quote_amount_left,
            context.initial_quote_amount,
        )
    };
    {
        let group = ctx.accounts.group.load()?;
        check!(
            group.quote_transaction_pool == ctx.accounts.quote_transaction_pool.key(),
            BushelError::AccountsMismatch
        );
    }
    let (authority, authority_bump) =
        Pubkey::find_program_address(&[BUSHEL_AUTHORITY], ctx.program_id);
    check!(
        authority == *ctx.accounts.bushel_authority.key,
        BushelError::UnknownAuthority
    );
    let authority_seeds: &[&[u8]] = &[BUSHEL_AUTHORITY, &[authority_bump]];
    let signer = &[authority_seeds];

    match (side, reverting) {
        (TradeSide::Buy, false) => {
            // slippage surplus goes back to the client, never to the pool
            if quote_left > 0 {
                let cpi = CpiContext::new_with_signer(
                    ctx.accounts.token_program.clone(),
                    Transfer {
                        from: ctx.accounts.quote_transaction_pool.to_account_info(),
                        to: ctx.accounts.quote_token_account.to_account_info(),
                        authority: ctx.accounts.bushel_authority.clone(),
                    },
                    signer,
                );
                token::transfer(cpi, quote_left)?;
            }
            let cpi = CpiContext::new_with_signer(
                ctx.accounts.token_program.clone(),
                MintTo {
                    mint: ctx.accounts.basket_token_mint.to_account_info(),
                    to: ctx.accounts.basket_token_account.to_account_info(),
                    authority: ctx.accounts.bushel_authority.clone(),
                },
                signer,
            );
            token::mint_to(cpi, share_amount)?;
            msg!(
                "buy settled, {} shares minted, {} quote returned",
                share_amount,
                quote_left
            );
        }
        (TradeSide::Sell, false) => {
            // the worst price check lands here, once total proceeds are known
            check!(quote_left >= initial_quote, BushelError::MinimumReceiveNotMet);
            let cpi = CpiContext::new_with_signer(
                ctx.accounts.token_program.clone(),
                Transfer {
                    from: ctx.accounts.quote_transaction_pool.to_account_info(),
                    to: ctx.accounts.quote_token_account.to_account_info(),
                    authority: ctx.accounts.bushel_authority.clone(),
                },
                signer,
            );
            token::transfer(cpi, quote_left)?;
            msg!("sell settled for {} quote", quote_left);
        }
        (TradeSide::Buy, true) => {
            // exact refund; any unwind shortfall is drawn from the pool's
            // insurance buffer rather than the client
            let cpi = CpiContext::new_with_signer(
                ctx.accounts.token_program.clone(),
                Transfer {
                    from: ctx.accounts.quote_transaction_pool.to_account_info(),
                    to: ctx.accounts.quote_token_account.to_account_info(),
                    authority: ctx.accounts.bushel_authority.clone(),
                },
                signer,
            );
            token::transfer(cpi, initial_quote)?;
            msg!("buy unwound, {} quote refunded", initial_quote);
        }
        (TradeSide::Sell, true) => {
            let cpi = CpiContext::new_with_signer(
                ctx.accounts.token_program.clone(),
                MintTo {
                    mint: ctx.accounts.basket_token_mint.to_account_info(),
                    to: ctx.accounts.basket_token_account.to_account_info(),
                    authority: ctx.accounts.bushel_authority.clone(),
                },
                signer,
            );
            token::mint_to(cpi, share_amount)?;
            msg!("sell unwound, {} shares restored", share_amount);
        }
    }
    Ok(())
}
