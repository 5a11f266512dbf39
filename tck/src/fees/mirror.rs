use serde::{Deserialize, Serialize};

/// `custom_fees` object of a mirror token record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorCustomFees {
    /// Consensus timestamp the schedule took effect at
    #[serde(default)]
    pub created_timestamp: Option<String>,
    /// Fixed fees
    #[serde(default)]
    pub fixed_fees: Vec<MirrorFixedFee>,
    /// Fractional fees, fungible tokens only
    #[serde(default)]
    pub fractional_fees: Vec<MirrorFractionalFee>,
    /// Royalty fees, non-fungible tokens only
    #[serde(default)]
    pub royalty_fees: Vec<MirrorRoyaltyFee>,
}

impl MirrorCustomFees {
    /// Fees of every kind together
    pub fn len(&self) -> usize {
        self.fixed_fees.len() + self.fractional_fees.len() + self.royalty_fees.len()
    }

    /// True when the schedule has no fee
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Numerator over denominator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorFraction {
    /// Numerator
    pub numerator: i64,
    /// Denominator
    pub denominator: i64,
}

/// Fixed fee as indexed by the mirror
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorFixedFee {
    /// Collectors pay no custom fee
    #[serde(default)]
    pub all_collectors_are_exempt: bool,
    /// Amount in the smallest unit of the denomination
    pub amount: i64,
    /// Account receiving the fee
    #[serde(default)]
    pub collector_account_id: Option<String>,
    /// Denomination, absent for the native currency
    #[serde(default)]
    pub denominating_token_id: Option<String>,
}

/// Fractional fee as indexed by the mirror
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorFractionalFee {
    /// Collectors pay no custom fee
    #[serde(default)]
    pub all_collectors_are_exempt: bool,
    /// Fraction of the transferred amount
    pub amount: MirrorFraction,
    /// Account receiving the fee
    #[serde(default)]
    pub collector_account_id: Option<String>,
    /// Token the fee is charged in
    #[serde(default)]
    pub denominating_token_id: Option<String>,
    /// Upper bound, absent or 0 when unbounded
    #[serde(default)]
    pub maximum: Option<i64>,
    /// Lower bound
    #[serde(default)]
    pub minimum: i64,
    /// True when the fee is charged on top of the transfer
    #[serde(default)]
    pub net_of_transfers: bool,
}

/// Royalty fee as indexed by the mirror
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRoyaltyFee {
    /// Collectors pay no custom fee
    #[serde(default)]
    pub all_collectors_are_exempt: bool,
    /// Fraction of the exchanged value
    pub amount: MirrorFraction,
    /// Account receiving the fee
    #[serde(default)]
    pub collector_account_id: Option<String>,
    /// Charged when no value is exchanged
    #[serde(default)]
    pub fallback_fee: Option<MirrorFallbackFee>,
}

/// Fixed fallback of a royalty fee
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorFallbackFee {
    /// Amount in the smallest unit of the denomination
    pub amount: i64,
    /// Denomination, absent for the native currency
    #[serde(default)]
    pub denominating_token_id: Option<String>,
}
