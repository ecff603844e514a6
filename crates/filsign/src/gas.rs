//! # Gas Estimation
//!
//! [`GasEstimator::set_gas`] fills a message's gas fields from the node's
//! estimates and then bounds the total fee with [`cap_gas_fee`]:
//!
//! 1. `GasEstimateMessageGas`: the returned limit is scaled by the
//!    overestimation factor and truncated; fee cap and premium are taken
//!    as returned.
//! 2. `GasEstimateGasPremium` over the premium window with the final limit.
//! 3. When the fee cap is still zero, `GasEstimateFeeCap` over the fee cap
//!    window. A failure here is logged and the fee cap is left as it was.
//! 4. The fee ceiling.
//!
//! Failures of steps 1 and 2 abort the enclosing operation.

use filsign_chain::{Message, TokenAmount};
use filsign_core::config::GasConfig;
use filsign_core::error::{GatewayResult, ValidationError};

use crate::gateway::NodeGateway;

/// Default multiplier on the node's gas limit estimate.
pub const DEFAULT_OVERESTIMATION: f64 = 1.5;

/// Default inclusion target for the premium estimate, in blocks.
pub const DEFAULT_PREMIUM_BLOCKS: u64 = 10;

/// Default inclusion target for the fee cap estimate, in blocks.
pub const DEFAULT_FEE_CAP_BLOCKS: u64 = 20;

/// Fills and bounds message gas fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GasEstimator {
    max_fee: TokenAmount,
    overestimation: f64,
    premium_blocks: u64,
    fee_cap_blocks: u64,
}

impl GasEstimator {
    /// Estimator with the default windows and factor and the given ceiling.
    #[must_use]
    pub const fn new(max_fee: TokenAmount) -> Self {
        Self {
            max_fee,
            overestimation: DEFAULT_OVERESTIMATION,
            premium_blocks: DEFAULT_PREMIUM_BLOCKS,
            fee_cap_blocks: DEFAULT_FEE_CAP_BLOCKS,
        }
    }

    /// Estimator from the `[gas]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `max_fee` is not an attoFIL integer or
    /// `overestimation` is not a finite factor of at least 1.
    pub fn from_config(config: &GasConfig) -> Result<Self, ValidationError> {
        let max_fee = TokenAmount::parse_atto(&config.max_fee)?;
        if !config.overestimation.is_finite() || config.overestimation < 1.0 {
            return Err(ValidationError::invalid_input(
                "gas.overestimation",
                format!("must be at least 1, got {}", config.overestimation),
            ));
        }
        Ok(Self {
            max_fee,
            overestimation: config.overestimation,
            premium_blocks: config.premium_blocks,
            fee_cap_blocks: config.fee_cap_blocks,
        })
    }

    /// The fee ceiling in attoFIL.
    #[must_use]
    pub const fn max_fee(&self) -> &TokenAmount {
        &self.max_fee
    }

    /// Runs the estimation pipeline on `message`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error of the gas limit or premium estimate.
    pub async fn set_gas<G>(&self, gateway: &G, message: &mut Message) -> GatewayResult<()>
    where
        G: NodeGateway + ?Sized,
    {
        let estimate = gateway.gas_estimate_message_gas(message).await?;
        message.gas_limit = self.overestimate(estimate.gas_limit);
        message.gas_fee_cap = estimate.gas_fee_cap;
        message.gas_premium = estimate.gas_premium;

        message.gas_premium = gateway
            .gas_estimate_gas_premium(self.premium_blocks, &message.from, message.gas_limit)
            .await?;

        if message.gas_fee_cap.is_zero() {
            match gateway
                .gas_estimate_fee_cap(message, self.fee_cap_blocks)
                .await
            {
                Ok(fee_cap) => message.gas_fee_cap = fee_cap,
                Err(err) => tracing::warn!(
                    error = %err,
                    "fee cap estimate failed, keeping current fee cap"
                ),
            }
        }

        cap_gas_fee(message, &self.max_fee);

        tracing::debug!(
            gas_limit = message.gas_limit,
            gas_fee_cap = %message.gas_fee_cap.atto(),
            gas_premium = %message.gas_premium.atto(),
            "gas set"
        );
        Ok(())
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss
    )]
    fn overestimate(&self, gas_limit: i64) -> i64 {
        (gas_limit as f64 * self.overestimation) as i64
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(TokenAmount::from_whole(10))
    }
}

/// Bounds `gas_limit * gas_fee_cap` by `max_fee`.
///
/// When the product exceeds the ceiling the fee cap becomes
/// `max_fee / gas_limit` and the premium is clamped to the new fee cap.
/// Messages under the ceiling, or without a positive gas limit, are left
/// unchanged.
///
/// ```
/// use filsign::gas::cap_gas_fee;
/// use filsign_chain::{Address, Message, TokenAmount};
///
/// let mut msg = Message::new(Address::new_id(1), Address::new_id(2), 0, TokenAmount::zero(), vec![]);
/// msg.gas_limit = 1_000;
/// msg.gas_fee_cap = TokenAmount::from(50_u64);
/// msg.gas_premium = TokenAmount::from(40_u64);
///
/// cap_gas_fee(&mut msg, &TokenAmount::from(30_000_u64));
/// assert_eq!(msg.gas_fee_cap, TokenAmount::from(30_u64));
/// assert_eq!(msg.gas_premium, TokenAmount::from(30_u64));
/// ```
pub fn cap_gas_fee(message: &mut Message, max_fee: &TokenAmount) {
    let Ok(limit) = u64::try_from(message.gas_limit) else {
        return;
    };
    if limit == 0 || message.max_fee() <= *max_fee {
        return;
    }

    message.gas_fee_cap = max_fee.div_floor(limit);
    if message.gas_premium > message.gas_fee_cap {
        message.gas_premium = message.gas_fee_cap.clone();
    }
}
