use std::convert::TryFrom;

use crate::errors::BushelError;
use crate::states::BasketComponent;

/// Normalized oracle reading for one component, price and confidence sharing
/// the same decimal exponent.
#[derive(Clone, Copy, Debug)]
pub struct ComponentQuote {
    pub price: u64,
    pub confidence: u64,
    pub exponent: i32,
}

/// How to bias a price with its confidence interval when sizing an order.
#[derive(Clone, Copy, Debug)]
pub enum PricePad {
    None,
    Above,
    Below,
}

fn pow10(exp: u32) -> Result<u128, BushelError> {
    10u128.checked_pow(exp).ok_or(BushelError::MathOverflow)
}

/// a * b / divisor in 128 bit, truncating toward zero, failing closed.
pub fn mul_div(a: u64, b: u64, divisor: u64) -> Result<u64, BushelError> {
    if divisor == 0 {
        return Err(BushelError::MathOverflow);
    }
    let product = (a as u128)
        .checked_mul(b as u128)
        .ok_or(BushelError::MathOverflow)?;
    u64::try_from(product / divisor as u128).map_err(|_| BushelError::MathOverflow)
}

/// Re-express a mantissa from one decimal exponent into another, truncating
/// toward zero so the computation stays reproducible bit for bit.
pub fn rescale(value: u64, from_exp: i32, to_exp: i32) -> Result<u64, BushelError> {
    if from_exp >= to_exp {
        let factor = pow10((from_exp - to_exp) as u32)?;
        let scaled = (value as u128)
            .checked_mul(factor)
            .ok_or(BushelError::MathOverflow)?;
        u64::try_from(scaled).map_err(|_| BushelError::MathOverflow)
    } else {
        let divisor = pow10((to_exp - from_exp) as u32)?;
        u64::try_from(value as u128 / divisor).map_err(|_| BushelError::MathOverflow)
    }
}

/// Quote value of `amount` native units of a token at a cached price,
/// optionally padded by the confidence interval. Result carries `out_exp`.
pub fn expected_component_cost(
    amount: u64,
    token_decimal: u8,
    quote: &ComponentQuote,
    out_exp: i32,
    pad: PricePad,
) -> Result<u64, BushelError> {
    let price = match pad {
        PricePad::None => quote.price,
        PricePad::Above => quote
            .price
            .checked_add(quote.confidence)
            .ok_or(BushelError::MathOverflow)?,
        PricePad::Below => quote.price.saturating_sub(quote.confidence),
    };
    let scaled = rescale(price, quote.exponent, out_exp)?;
    let unit = pow10(token_decimal as u32)?;
    let cost = (amount as u128)
        .checked_mul(scaled as u128)
        .ok_or(BushelError::MathOverflow)?
        / unit;
    u64::try_from(cost).map_err(|_| BushelError::MathOverflow)
}

/// Aggregate price and confidence of one basket share.
///
/// Confidences add linearly rather than in quadrature: components are not
/// assumed independent, so the wider margin is the safe one.
pub fn basket_aggregate(
    components: &[BasketComponent],
    quotes: &[ComponentQuote],
    out_exp: i32,
) -> Result<(u64, u64), BushelError> {
    if components.len() != quotes.len() {
        return Err(BushelError::OracleRefCountMismatch);
    }
    let mut total_price = 0u128;
    let mut total_confidence = 0u128;
    for (component, quote) in components.iter().zip(quotes.iter()) {
        let price = rescale(quote.price, quote.exponent, out_exp)?;
        let confidence = rescale(quote.confidence, quote.exponent, out_exp)?;
        let unit = pow10(component.decimal as u32)?;
        let price_part = (component.amount as u128)
            .checked_mul(price as u128)
            .ok_or(BushelError::MathOverflow)?
            / unit;
        let confidence_part = (component.amount as u128)
            .checked_mul(confidence as u128)
            .ok_or(BushelError::MathOverflow)?
            / unit;
        total_price = total_price
            .checked_add(price_part)
            .ok_or(BushelError::MathOverflow)?;
        total_confidence = total_confidence
            .checked_add(confidence_part)
            .ok_or(BushelError::MathOverflow)?;
    }
    let price = u64::try_from(total_price).map_err(|_| BushelError::MathOverflow)?;
    let confidence = u64::try_from(total_confidence).map_err(|_| BushelError::MathOverflow)?;
    Ok((price, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::prelude::Pubkey;

    fn component(amount: u64, decimal: u8) -> BasketComponent {
        BasketComponent {
            token_mint: Pubkey::new_unique(),
            amount,
            decimal,
        }
    }

    fn quote(price: u64, exponent: i32) -> ComponentQuote {
        ComponentQuote {
            price,
            confidence: price / 100,
            exponent,
        }
    }

    #[test]
    fn aggregates_three_component_basket() {
        // 0.01 btc at 40000, 0.1 eth at 4000, 2 sol at 200 -> 1200 per share
        let components = [
            component(10_000, 6),
            component(100_000, 6),
            component(2_000_000, 6),
        ];
        let quotes = [
            quote(40_000_000_000, -6),
            quote(4_000_000_000, -6),
            quote(200_000_000, -6),
        ];
        let (price, confidence) = basket_aggregate(&components, &quotes, -6).unwrap();
        assert_eq!(price, 1_200_000_000);
        assert_eq!(confidence, 12_000_000);
    }

    #[test]
    fn aggregate_rejects_mismatched_quote_count() {
        let components = [component(10_000, 6), component(100_000, 6)];
        let quotes = [quote(40_000_000_000, -6)];
        assert!(matches!(
            basket_aggregate(&components, &quotes, -6),
            Err(BushelError::OracleRefCountMismatch)
        ));
    }

    #[test]
    fn rescale_moves_between_exponents() {
        // same exponent is the identity
        assert_eq!(rescale(1_234, -6, -6).unwrap(), 1_234);
        // finer source exponent divides, truncating
        assert_eq!(rescale(123_456, -8, -6).unwrap(), 1_234);
        // coarser source exponent multiplies
        assert_eq!(rescale(1_234, -6, -8).unwrap(), 123_400);
    }

    #[test]
    fn rescale_fails_closed_on_overflow() {
        assert!(matches!(
            rescale(u64::MAX, 0, -12),
            Err(BushelError::MathOverflow)
        ));
    }

    #[test]
    fn cost_padding_shifts_by_confidence() {
        let reading = ComponentQuote {
            price: 40_000_000_000,
            confidence: 400_000_000,
            exponent: -6,
        };
        let base = expected_component_cost(10_000, 6, &reading, -6, PricePad::None).unwrap();
        let above = expected_component_cost(10_000, 6, &reading, -6, PricePad::Above).unwrap();
        let below = expected_component_cost(10_000, 6, &reading, -6, PricePad::Below).unwrap();
        assert_eq!(base, 400_000_000);
        assert_eq!(above, 404_000_000);
        assert_eq!(below, 396_000_000);
    }

    #[test]
    fn cost_truncates_toward_zero() {
        let reading = ComponentQuote {
            price: 5,
            confidence: 0,
            exponent: -6,
        };
        assert_eq!(
            expected_component_cost(1, 6, &reading, -6, PricePad::None).unwrap(),
            0
        );
    }

    #[test]
    fn mul_div_overflow_fails_closed() {
        assert!(matches!(
            mul_div(u64::MAX, u64::MAX, 1),
            Err(BushelError::MathOverflow)
        ));
        assert!(matches!(mul_div(1, 1, 0), Err(BushelError::MathOverflow)));
        assert_eq!(mul_div(10_000, 600_000, 1_000_000).unwrap(), 6_000);
    }
}
