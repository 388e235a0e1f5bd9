use anchor_lang::prelude::*;
use std::convert::TryFrom;

use crate::errors::BushelError;
use crate::pricing;
use crate::{BASKET_SHARE_UNIT, CONTEXT_TTL_SLOTS, MAX_NB_COMPONENTS, QUOTE_PRICE_EXP};

/// Bushel group
/// Holds the data common for the whole market: the quote currency and the
/// pool through which every trade context settles its quote side.
#[account(zero_copy)]
pub struct BushelGroup {
    pub owner: Pubkey,
    pub quote_mint: Pubkey, // usdc public key
    // pool holding quote tokens of in-flight contexts plus the insurance buffer
    pub quote_transaction_pool: Pubkey,
    pub token_count: u64,
    pub number_of_baskets: u64,
    pub quote_mint_name: [u8; 10],
}

/// One listed underlying: oracle bindings, custody pool, serum market and the
/// last normalized oracle reading.
#[account()]
pub struct TokenEntry {
    pub magic: u32,
    pub id: u64,
    pub token_mint: Pubkey,
    pub price_oracle: Pubkey,
    pub product_oracle: Pubkey,
    pub token_pool: Pubkey, // custody pool for this token
    pub market: Pubkey,
    pub token_open_orders: Pubkey,
    pub token_name: [u8; 10],
    pub token_decimal: u8, // number of decimal places (1 SOL -> 10^9 lamports = 9)
    pub cache: PriceCache,
}

impl TokenEntry {
    pub fn name(&self) -> &str {
        std::str::from_utf8(&self.token_name)
            .unwrap_or("")
            .trim_end_matches('\0')
    }
}

/// Last oracle reading for a token, persisted so pricing does not depend on
/// the oracle crank cadence.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Default, Copy)]
#[repr(C)]
pub struct PriceCache {
    pub last_price: u64,
    pub last_exp: i32,
    pub last_confidence: u64,
    pub last_updated_slot: u64,
}

/// State to define a basket
#[account()]
pub struct Basket {
    pub magic: u32,
    pub basket_name: [u8; 128],
    pub desc: [u8; 256],
    pub number_of_components: u8,
    pub components: [BasketComponent; 10],
    pub basket_mint: Pubkey,
    pub last_price: u64,
    pub confidence: u64,
    pub decimal: u8, // always 6
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Default, Copy)]
#[repr(C)]
pub struct BasketComponent {
    pub token_mint: Pubkey,
    pub amount: u64, // target amount per one basket share
    pub decimal: u8,
}

impl Basket {
    pub fn name(&self) -> &str {
        std::str::from_utf8(&self.basket_name)
            .unwrap_or("")
            .trim_end_matches('\0')
    }

    /// Recompute the aggregate price from one quote per component.
    pub fn reprice(&mut self, quotes: &[pricing::ComponentQuote]) -> Result<(), BushelError> {
        let n = self.number_of_components as usize;
        let (price, confidence) =
            pricing::basket_aggregate(&self.components[..n], quotes, QUOTE_PRICE_EXP)?;
        self.last_price = price;
        self.confidence = confidence;
        self.decimal = crate::BASKET_SHARE_DECIMALS;
        Ok(())
    }

    /// Quote value of `share_amount` basket shares at the last aggregate price.
    pub fn share_value(&self, share_amount: u64) -> Result<u64, BushelError> {
        pricing::mul_div(self.last_price, share_amount, BASKET_SHARE_UNIT)
    }

    pub fn share_confidence(&self, share_amount: u64) -> Result<u64, BushelError> {
        pricing::mul_div(self.confidence, share_amount, BASKET_SHARE_UNIT)
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TryFrom<u8> for TradeSide {
    type Error = BushelError;

    fn try_from(value: u8) -> Result<Self, BushelError> {
        match value {
            0 => Ok(TradeSide::Buy),
            1 => Ok(TradeSide::Sell),
            _ => Err(BushelError::AccountsMismatch),
        }
    }
}

/// Where a component stands inside a trade context. A forward leg moves
/// Pending -> Swapped, an unwind leg moves Pending|Swapped -> Unwound.
/// Flags are never reset, so every venue interaction runs exactly once.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ComponentState {
    Pending = 0,
    Swapped = 1,
    Unwound = 2,
}

impl TryFrom<u8> for ComponentState {
    type Error = BushelError;

    fn try_from(value: u8) -> Result<Self, BushelError> {
        match value {
            0 => Ok(ComponentState::Pending),
            1 => Ok(ComponentState::Swapped),
            2 => Ok(ComponentState::Unwound),
            _ => Err(BushelError::AccountsMismatch),
        }
    }
}

/// A single client's in-progress buy or sell of basket shares, persisted so
/// the per-token venue legs can run as separate transactions and be retried
/// or unwound without losing the accounting.
#[account(zero_copy)]
pub struct TradeContext {
    pub magic: u32,
    pub side: u8, // TradeSide
    pub reverting: u8,
    pub number_of_components: u8,
    pub basket: Pubkey,
    pub quote_token_account: Pubkey,
    pub basket_token_account: Pubkey,
    pub quote_transaction_pool: Pubkey,
    // amount of basket shares being traded
    pub amount: u64,
    // quote escrowed at init (buy) or the minimum receive bound (sell)
    pub initial_quote_amount: u64,
    // quote in the pool attributable to this context
    pub quote_amount_left: u64,
    pub created_on_slot: u64,
    pub token_mints: [Pubkey; 10],
    pub component_amounts: [u64; 10],
    pub component_state: [u8; 10], // ComponentState
}

/// Target amount of one component for `share_amount` shares, truncating in
/// the protocol's favor.
pub fn component_trade_amount(
    component_amount: u64,
    share_amount: u64,
) -> Result<u64, BushelError> {
    pricing::mul_div(component_amount, share_amount, BASKET_SHARE_UNIT)
}

impl TradeContext {
    /// Populate a freshly allocated context and validate the worst price
    /// bound against the basket's last aggregate price and confidence.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        basket: &Basket,
        basket_key: Pubkey,
        side: TradeSide,
        share_amount: u64,
        worst_price_bound: u64,
        slot: u64,
        quote_token_account: Pubkey,
        basket_token_account: Pubkey,
        quote_transaction_pool: Pubkey,
    ) -> Result<(), BushelError> {
        if share_amount == 0 {
            return Err(BushelError::InvalidBasketShareAmount);
        }
        if basket.last_price == 0 {
            return Err(BushelError::BasketNotPriced);
        }
        let value = basket.share_value(share_amount)?;
        let confidence = basket.share_confidence(share_amount)?;
        match side {
            TradeSide::Buy => {
                let ceiling = value
                    .checked_add(confidence)
                    .ok_or(BushelError::MathOverflow)?;
                if worst_price_bound < ceiling {
                    return Err(BushelError::TooLowMaximumBuyPrice);
                }
            }
            TradeSide::Sell => {
                if worst_price_bound > value.saturating_sub(confidence) {
                    return Err(BushelError::TooHighMinimumSellPrice);
                }
            }
        }

        self.magic = TRADE_CONTEXT_MAGIC;
        self.side = side as u8;
        self.reverting = 0;
        self.basket = basket_key;
        self.amount = share_amount;
        self.quote_token_account = quote_token_account;
        self.basket_token_account = basket_token_account;
        self.quote_transaction_pool = quote_transaction_pool;
        self.created_on_slot = slot;
        self.number_of_components = basket.number_of_components;
        let mut token_mints = [Pubkey::default(); MAX_NB_COMPONENTS];
        let mut component_amounts = [0u64; MAX_NB_COMPONENTS];
        for index in 0..basket.number_of_components as usize {
            let component = basket.components[index];
            token_mints[index] = component.token_mint;
            component_amounts[index] = component_trade_amount(component.amount, share_amount)?;
        }
        self.token_mints = token_mints;
        self.component_amounts = component_amounts;
        self.component_state = [ComponentState::Pending as u8; MAX_NB_COMPONENTS];
        self.initial_quote_amount = worst_price_bound;
        self.quote_amount_left = match side {
            TradeSide::Buy => worst_price_bound,
            TradeSide::Sell => 0,
        };
        Ok(())
    }

    pub fn side(&self) -> Result<TradeSide, BushelError> {
        TradeSide::try_from(self.side)
    }

    pub fn is_reverting(&self) -> bool {
        self.reverting != 0
    }

    pub fn expired(&self, slot: u64) -> bool {
        slot.saturating_sub(self.created_on_slot) > CONTEXT_TTL_SLOTS
    }

    pub fn component_index(&self, mint: &Pubkey) -> Result<usize, BushelError> {
        let mints = self.token_mints;
        mints[..self.number_of_components as usize]
            .iter()
            .position(|candidate| candidate == mint)
            .ok_or(BushelError::TokenNotFound)
    }

    pub fn state_of(&self, index: usize) -> Result<ComponentState, BushelError> {
        let states = self.component_state;
        ComponentState::try_from(states[index])
    }

    /// Gate for a forward leg: the component must never have been touched.
    pub fn expect_pending(&self, index: usize) -> Result<(), BushelError> {
        match self.state_of(index)? {
            ComponentState::Pending => Ok(()),
            _ => Err(BushelError::TokenAlreadyTreated),
        }
    }

    /// Gate for an unwind leg: a component already unwound may not run again.
    pub fn expect_unwindable(&self, index: usize) -> Result<(), BushelError> {
        match self.state_of(index)? {
            ComponentState::Unwound => Err(BushelError::TokenAlreadyTreated),
            _ => Ok(()),
        }
    }

    pub fn mark_swapped(&mut self, index: usize) -> Result<(), BushelError> {
        self.expect_pending(index)?;
        self.component_state[index] = ComponentState::Swapped as u8;
        Ok(())
    }

    pub fn mark_unwound(&mut self, index: usize) -> Result<(), BushelError> {
        self.expect_unwindable(index)?;
        self.component_state[index] = ComponentState::Unwound as u8;
        Ok(())
    }

    pub fn all_components(&self, state: ComponentState) -> bool {
        let states = self.component_state;
        states[..self.number_of_components as usize]
            .iter()
            .all(|&candidate| candidate == state as u8)
    }

    pub fn start_revert(&mut self) -> Result<(), BushelError> {
        if self.is_reverting() {
            return Err(BushelError::ContextAlreadyReverting);
        }
        self.reverting = 1;
        Ok(())
    }

    /// Strict debit: a leg can never consume more quote than the context owns.
    pub fn spend_quote(&mut self, amount: u64) -> Result<(), BushelError> {
        let left = self.quote_amount_left;
        self.quote_amount_left = left.checked_sub(amount).ok_or(BushelError::MathOverflow)?;
        Ok(())
    }

    /// Debit with a floor at zero. Used when unwinding a sell, where venue
    /// spread may cost more than the collected proceeds; the difference is
    /// absorbed by the pool's insurance buffer.
    pub fn spend_quote_saturating(&mut self, amount: u64) {
        let left = self.quote_amount_left;
        self.quote_amount_left = left.saturating_sub(amount);
    }

    pub fn collect_quote(&mut self, amount: u64) -> Result<(), BushelError> {
        let left = self.quote_amount_left;
        self.quote_amount_left = left.checked_add(amount).ok_or(BushelError::MathOverflow)?;
        Ok(())
    }

    pub fn meets_minimum_receive(&self) -> bool {
        self.quote_amount_left >= self.initial_quote_amount
    }
}

pub const TRADE_CONTEXT_MAGIC: u32 = 0x4243_5458;
pub const BASKET_MAGIC: u32 = 0x4253_4b54;
pub const TOKEN_ENTRY_MAGIC: u32 = 0x4254_4f4b;

#[cfg(test)]
mod tests {
    use super::*;

    fn component(mint: Pubkey, amount: u64) -> BasketComponent {
        BasketComponent {
            token_mint: mint,
            amount,
            decimal: 6,
        }
    }

    // btc/eth/sol style recipe: 0.01 + 0.1 + 2 units, all 6 decimals,
    // priced at 1200 quote per share with a 1% confidence.
    fn test_basket(mints: &[Pubkey; 3]) -> Basket {
        let mut components = [BasketComponent::default(); MAX_NB_COMPONENTS];
        components[0] = component(mints[0], 10_000);
        components[1] = component(mints[1], 100_000);
        components[2] = component(mints[2], 2_000_000);
        Basket {
            magic: BASKET_MAGIC,
            basket_name: [0u8; 128],
            desc: [0u8; 256],
            number_of_components: 3,
            components,
            basket_mint: Pubkey::new_unique(),
            last_price: 1_200_000_000,
            confidence: 12_000_000,
            decimal: 6,
        }
    }

    fn blank_context() -> TradeContext {
        TradeContext {
            magic: 0,
            side: 0,
            reverting: 0,
            number_of_components: 0,
            basket: Pubkey::default(),
            quote_token_account: Pubkey::default(),
            basket_token_account: Pubkey::default(),
            quote_transaction_pool: Pubkey::default(),
            amount: 0,
            initial_quote_amount: 0,
            quote_amount_left: 0,
            created_on_slot: 0,
            token_mints: [Pubkey::default(); MAX_NB_COMPONENTS],
            component_amounts: [0; MAX_NB_COMPONENTS],
            component_state: [0; MAX_NB_COMPONENTS],
        }
    }

    fn open_context(
        basket: &Basket,
        side: TradeSide,
        share_amount: u64,
        bound: u64,
    ) -> TradeContext {
        let mut context = blank_context();
        context
            .begin(
                basket,
                Pubkey::new_unique(),
                side,
                share_amount,
                bound,
                5,
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                Pubkey::new_unique(),
            )
            .unwrap();
        context
    }

    #[test]
    fn begin_buy_computes_component_amounts() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        let amounts = context.component_amounts;
        assert_eq!(amounts[0], 10_000);
        assert_eq!(amounts[1], 100_000);
        assert_eq!(amounts[2], 2_000_000);
        let initial = context.initial_quote_amount;
        let left = context.quote_amount_left;
        assert_eq!(initial, 1_224_120_000);
        assert_eq!(left, 1_224_120_000);
        assert!(context.all_components(ComponentState::Pending));
        assert_eq!(context.component_index(&mints[2]).unwrap(), 2);
    }

    #[test]
    fn begin_truncates_fractional_share_amounts() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let context = open_context(&basket, TradeSide::Buy, 600_000, 1_224_120_000);
        let amounts = context.component_amounts;
        assert_eq!(amounts[0], 6_000);
        assert_eq!(amounts[1], 60_000);
        assert_eq!(amounts[2], 1_200_000);
    }

    #[test]
    fn begin_rejects_zero_share_amount() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = blank_context();
        let result = context.begin(
            &basket,
            Pubkey::new_unique(),
            TradeSide::Buy,
            0,
            1_224_120_000,
            5,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        assert!(matches!(result, Err(BushelError::InvalidBasketShareAmount)));
    }

    #[test]
    fn begin_rejects_bound_inside_confidence_band() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = blank_context();
        // one share is worth 1_200_000_000 with 12_000_000 confidence
        let result = context.begin(
            &basket,
            Pubkey::new_unique(),
            TradeSide::Buy,
            1_000_000,
            1_200_000_000,
            5,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        assert!(matches!(result, Err(BushelError::TooLowMaximumBuyPrice)));

        let mut context = blank_context();
        let result = context.begin(
            &basket,
            Pubkey::new_unique(),
            TradeSide::Sell,
            1_000_000,
            1_190_000_000,
            5,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        assert!(matches!(result, Err(BushelError::TooHighMinimumSellPrice)));
    }

    #[test]
    fn begin_rejects_unpriced_basket() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let mut basket = test_basket(&mints);
        basket.last_price = 0;
        let mut context = blank_context();
        let result = context.begin(
            &basket,
            Pubkey::new_unique(),
            TradeSide::Buy,
            1_000_000,
            1_224_120_000,
            5,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        assert!(matches!(result, Err(BushelError::BasketNotPriced)));
    }

    #[test]
    fn forward_buy_conserves_quote_per_leg() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        let spends = [401_000_000u64, 399_500_000, 400_250_000];
        let mut total_spent = 0u64;
        for (index, spend) in spends.iter().enumerate() {
            context.expect_pending(index).unwrap();
            context.spend_quote(*spend).unwrap();
            context.mark_swapped(index).unwrap();
            total_spent += spend;
            let left = context.quote_amount_left;
            let initial = context.initial_quote_amount;
            assert_eq!(total_spent + left, initial);
        }
        assert!(context.all_components(ComponentState::Swapped));
    }

    #[test]
    fn second_leg_on_same_component_is_rejected() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        context.mark_swapped(1).unwrap();
        let snapshot = context.component_state;
        assert!(matches!(
            context.mark_swapped(1),
            Err(BushelError::TokenAlreadyTreated)
        ));
        assert!(matches!(
            context.expect_pending(1),
            Err(BushelError::TokenAlreadyTreated)
        ));
        let states = context.component_state;
        assert_eq!(snapshot, states);
    }

    #[test]
    fn leg_cannot_overdraw_the_escrow() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        let result = context.spend_quote(1_224_120_001);
        assert!(matches!(result, Err(BushelError::MathOverflow)));
        let left = context.quote_amount_left;
        assert_eq!(left, 1_224_120_000);
    }

    #[test]
    fn partial_buy_reverts_back_to_initial_quote() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Buy, 1_000_000, 2_024_120_000);
        // two of three legs executed forward
        context.spend_quote(404_000_000).unwrap();
        context.mark_swapped(0).unwrap();
        context.spend_quote(398_000_000).unwrap();
        context.mark_swapped(1).unwrap();

        context.start_revert().unwrap();
        assert!(context.is_reverting());

        // the untouched component resolves without a venue interaction
        assert_eq!(context.state_of(2).unwrap(), ComponentState::Pending);
        context.mark_unwound(2).unwrap();
        // the executed legs unwind symmetrically
        context.collect_quote(404_000_000).unwrap();
        context.mark_unwound(0).unwrap();
        context.collect_quote(398_000_000).unwrap();
        context.mark_unwound(1).unwrap();

        assert!(context.all_components(ComponentState::Unwound));
        let left = context.quote_amount_left;
        let initial = context.initial_quote_amount;
        assert_eq!(left, initial);
    }

    #[test]
    fn unwound_component_cannot_run_again() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        context.mark_swapped(0).unwrap();
        context.start_revert().unwrap();
        context.mark_unwound(0).unwrap();
        assert!(matches!(
            context.expect_unwindable(0),
            Err(BushelError::TokenAlreadyTreated)
        ));
        assert!(matches!(
            context.mark_unwound(0),
            Err(BushelError::TokenAlreadyTreated)
        ));
    }

    #[test]
    fn revert_can_only_start_once() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        context.start_revert().unwrap();
        assert!(matches!(
            context.start_revert(),
            Err(BushelError::ContextAlreadyReverting)
        ));
    }

    #[test]
    fn sell_accumulates_proceeds_toward_the_bound() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Sell, 900_000, 1_024_120_000);
        let left = context.quote_amount_left;
        let initial = context.initial_quote_amount;
        assert_eq!(left, 0);
        assert_eq!(initial, 1_024_120_000);
        context.collect_quote(360_000_000).unwrap();
        context.mark_swapped(0).unwrap();
        assert!(!context.meets_minimum_receive());
        context.collect_quote(358_000_000).unwrap();
        context.mark_swapped(1).unwrap();
        context.collect_quote(359_000_000).unwrap();
        context.mark_swapped(2).unwrap();
        assert!(context.meets_minimum_receive());
        assert!(context.all_components(ComponentState::Swapped));
    }

    #[test]
    fn sell_unwind_spend_floors_at_zero() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let mut context = open_context(&basket, TradeSide::Sell, 900_000, 1_024_120_000);
        context.collect_quote(360_000_000).unwrap();
        context.mark_swapped(0).unwrap();
        context.start_revert().unwrap();
        // the buyback costs more than the collected proceeds
        context.spend_quote_saturating(365_000_000);
        context.mark_unwound(0).unwrap();
        let left = context.quote_amount_left;
        assert_eq!(left, 0);
    }

    #[test]
    fn context_expires_for_forward_legs() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        assert!(!context.expired(5 + CONTEXT_TTL_SLOTS));
        assert!(context.expired(6 + CONTEXT_TTL_SLOTS));
    }

    #[test]
    fn unknown_mint_is_not_a_component() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);
        let context = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        assert!(matches!(
            context.component_index(&Pubkey::new_unique()),
            Err(BushelError::TokenNotFound)
        ));
    }

    #[test]
    fn buy_then_sell_round_trips_the_quote_balance() {
        let mints = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let basket = test_basket(&mints);

        // buy one share at fair value
        let mut buy = open_context(&basket, TradeSide::Buy, 1_000_000, 1_224_120_000);
        for (index, spend) in [400_000_000u64, 400_000_000, 400_000_000]
            .iter()
            .enumerate()
        {
            buy.spend_quote(*spend).unwrap();
            buy.mark_swapped(index).unwrap();
        }
        assert!(buy.all_components(ComponentState::Swapped));
        let refund = buy.quote_amount_left;
        let escrow = buy.initial_quote_amount;
        let buy_cost = escrow - refund;
        assert_eq!(buy_cost, 1_200_000_000);

        // sell the same share at the same prices
        let mut sell = open_context(&basket, TradeSide::Sell, 1_000_000, 1_024_120_000);
        for (index, proceeds) in [400_000_000u64, 400_000_000, 400_000_000]
            .iter()
            .enumerate()
        {
            sell.collect_quote(*proceeds).unwrap();
            sell.mark_swapped(index).unwrap();
        }
        assert!(sell.all_components(ComponentState::Swapped));
        assert!(sell.meets_minimum_receive());
        let payout = sell.quote_amount_left;
        // absent venue spread the client ends where they started
        assert_eq!(payout, buy_cost);
    }

    #[test]
    fn component_amount_truncates_toward_zero() {
        assert_eq!(component_trade_amount(10_000, 600_000).unwrap(), 6_000);
        assert_eq!(component_trade_amount(3, 500_000).unwrap(), 1);
        assert_eq!(component_trade_amount(1, 500_000).unwrap(), 0);
    }
}
