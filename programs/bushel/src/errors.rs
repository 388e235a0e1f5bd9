use anchor_lang::prelude::*;

#[error]
pub enum BushelError {
    #[msg("Name is longer than the 10 byte limit")]
    NameBufferOverflow,
    #[msg("Token limit reached")]
    TokenCountLimitReached,
    #[msg("Unknown authority")]
    UnknownAuthority,
    #[msg("Current maximum component count is 10")]
    ComponentCountOverflow,
    #[msg("There should be at least 2 basket components")]
    ComponentCountUnderflow,
    #[msg("While adding a new basket the number should match the basket count")]
    BasketNbMismatch,
    #[msg("Token not found in the token list")]
    TokenNotFound,
    #[msg("Oracle account is malformed")]
    OracleFormat,
    #[msg("Oracle has no valid aggregate price")]
    OracleNotTrading,
    #[msg("Price should be greater than 0")]
    PriceEqualOrLessThanZero,
    #[msg("Confidence interval is too wide")]
    LowConfidenceInOracle,
    #[msg("Cached price is older than the staleness bound")]
    StalePrice,
    #[msg("One token entry per basket component must be passed, in component order")]
    OracleRefCountMismatch,
    #[msg("Basket has never been priced")]
    BasketNotPriced,
    #[msg("Too low maximum buy price may result into trade failure")]
    TooLowMaximumBuyPrice,
    #[msg("Too high minimum sell price may result into trade failure")]
    TooHighMinimumSellPrice,
    #[msg("Accounts mismatch")]
    AccountsMismatch,
    #[msg("Unknown basket")]
    UnknownBasket,
    #[msg("Unknown market")]
    UnknownMarket,
    #[msg("Unknown open orders")]
    UnknownOpenOrders,
    #[msg("Basket share amount should be greater than 0")]
    InvalidBasketShareAmount,
    #[msg("Client balance cannot cover the escrowed amount")]
    InsufficientClientBalance,
    #[msg("Token was already treated for this context")]
    TokenAlreadyTreated,
    #[msg("Not all tokens were treated before calling finalize")]
    NotAllTokensTreatedBeforeFinalize,
    #[msg("Context is already reverting")]
    ContextAlreadyReverting,
    #[msg("Context is too old for further forward legs, revert it")]
    StaleOrExpiredContext,
    #[msg("Exchange venue rejected or could not fill the order")]
    ExchangeVenueError,
    #[msg("Order does not reach the venue lot granularity")]
    OrderSizeTooSmall,
    #[msg("Accumulated proceeds are below the minimum receive bound")]
    MinimumReceiveNotMet,
    #[msg("Math overflow")]
    MathOverflow,
}

#[macro_export]
macro_rules! check {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
