//! Custom fee schedules as reported by the consensus and mirror sources,
//! and the rules for deciding that both describe the same fees.
//!
//! The two sources disagree on casing, on how amounts are written and on
//! how an unbounded maximum or the native denomination is expressed.
//! Comparison goes through a canonical form so those differences do not
//! count as mismatches.

mod mirror;

pub use mirror::*;

use serde::{Deserialize, Serialize};

/// Fee assessed on a token transfer, as the SDK reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFee {
    /// Account receiving the fee
    pub fee_collector_account_id: String,
    /// Collectors are exempt from every custom fee of the token
    #[serde(default)]
    pub fee_collectors_exempt: bool,
    /// Fee-specific fields
    #[serde(flatten)]
    pub kind: CustomFeeKind,
}

/// The three fee shapes; serialized under a `fixedFee`, `fractionalFee`
/// or `royaltyFee` member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomFeeKind {
    /// Flat amount
    FixedFee(FixedFee),
    /// Share of the transferred amount
    FractionalFee(FractionalFee),
    /// Share of the exchanged value on NFT transfers
    RoyaltyFee(RoyaltyFee),
}

/// Flat fee amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedFee {
    /// Amount in the smallest unit of the denomination
    #[serde(with = "amount")]
    pub amount: i64,
    /// Denomination, absent for the native currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominating_token_id: Option<String>,
}

/// Whether a fractional fee is deducted from or added to the transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssessmentMethod {
    /// Deducted from the transferred amount
    #[default]
    Inclusive,
    /// Charged to the sender on top of the transfer
    Exclusive,
}

/// Fraction of the transferred amount, clamped to `[minimum, maximum]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FractionalFee {
    /// Numerator
    #[serde(with = "amount")]
    pub numerator: i64,
    /// Denominator
    #[serde(with = "amount")]
    pub denominator: i64,
    /// Lower bound
    #[serde(default, with = "amount")]
    pub minimum_amount: i64,
    /// Upper bound; absent or 0 when unbounded
    #[serde(default, with = "amount::option", skip_serializing_if = "Option::is_none")]
    pub maximum_amount: Option<i64>,
    /// Inclusive or exclusive assessment
    #[serde(default)]
    pub assessment_method: AssessmentMethod,
}

/// Fraction of the exchanged value with an optional fixed fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoyaltyFee {
    /// Numerator
    #[serde(with = "amount")]
    pub numerator: i64,
    /// Denominator
    #[serde(with = "amount")]
    pub denominator: i64,
    /// Charged when no value is exchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_fee: Option<FixedFee>,
}

impl CustomFee {
    /// Fixed fee paid to `collector`
    pub fn fixed(
        collector: impl Into<String>,
        amount: i64,
        denominating_token_id: Option<String>,
    ) -> Self {
        Self {
            fee_collector_account_id: collector.into(),
            fee_collectors_exempt: false,
            kind: CustomFeeKind::FixedFee(FixedFee {
                amount,
                denominating_token_id,
            }),
        }
    }

    /// Same fee with collectors exempt
    pub fn exempt(mut self) -> Self {
        self.fee_collectors_exempt = true;
        self
    }

    // Unify the spellings of "unbounded" and "native currency"
    fn canonical(&self) -> CustomFee {
        let mut fee = self.clone();
        match &mut fee.kind {
            CustomFeeKind::FixedFee(fixed) => canonical_fixed(fixed),
            CustomFeeKind::FractionalFee(fractional) => {
                fractional.maximum_amount = max_bound(fractional.maximum_amount);
            }
            CustomFeeKind::RoyaltyFee(royalty) => {
                if let Some(fallback) = &mut royalty.fallback_fee {
                    canonical_fixed(fallback);
                }
            }
        }
        fee
    }
}

fn canonical_fixed(fixed: &mut FixedFee) {
    fixed.denominating_token_id =
        denomination(fixed.denominating_token_id.as_deref()).map(str::to_string);
}

fn max_bound(maximum: Option<i64>) -> Option<i64> {
    maximum.filter(|max| *max != 0)
}

fn denomination(token_id: Option<&str>) -> Option<&str> {
    token_id.filter(|id| !id.is_empty())
}

/// Two consensus-side fees describe the same fee
pub fn consensus_fee_matches(expected: &CustomFee, actual: &CustomFee) -> bool {
    expected.canonical() == actual.canonical()
}

/// Every expected fee appears in `actual` exactly once, in any order
pub fn consensus_fees_match(expected: &[CustomFee], actual: &[CustomFee]) -> bool {
    expected.len() == actual.len()
        && one_to_one(expected, actual, |e, a| consensus_fee_matches(e, a))
}

/// Some mirror entry of the same kind describes `expected`
pub fn mirror_fee_matches(expected: &CustomFee, mirror: &MirrorCustomFees) -> bool {
    mirror_entries(mirror)
        .iter()
        .any(|entry| entry.matches(expected))
}

/// Both sources report the same fee schedule.
///
/// Requires equal fee counts and a one-to-one pairing; order within and
/// across the mirror's per-kind lists is irrelevant.
pub fn fee_schedules_agree(consensus: &[CustomFee], mirror: &MirrorCustomFees) -> bool {
    let entries = mirror_entries(mirror);
    consensus.len() == entries.len()
        && one_to_one(consensus, &entries, |fee, entry| entry.matches(fee))
}

fn one_to_one<A, B>(left: &[A], right: &[B], matches: impl Fn(&A, &B) -> bool) -> bool {
    let mut used = vec![false; right.len()];
    left.iter().all(|l| {
        let found = right
            .iter()
            .enumerate()
            .position(|(i, r)| !used[i] && matches(l, r));
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

enum MirrorFee<'a> {
    Fixed(&'a MirrorFixedFee),
    Fractional(&'a MirrorFractionalFee),
    Royalty(&'a MirrorRoyaltyFee),
}

fn mirror_entries(mirror: &MirrorCustomFees) -> Vec<MirrorFee<'_>> {
    mirror
        .fixed_fees
        .iter()
        .map(MirrorFee::Fixed)
        .chain(mirror.fractional_fees.iter().map(MirrorFee::Fractional))
        .chain(mirror.royalty_fees.iter().map(MirrorFee::Royalty))
        .collect()
}

impl MirrorFee<'_> {
    fn matches(&self, expected: &CustomFee) -> bool {
        let (collector, exempt) = match self {
            Self::Fixed(fee) => (&fee.collector_account_id, fee.all_collectors_are_exempt),
            Self::Fractional(fee) => (&fee.collector_account_id, fee.all_collectors_are_exempt),
            Self::Royalty(fee) => (&fee.collector_account_id, fee.all_collectors_are_exempt),
        };
        if collector.as_deref() != Some(expected.fee_collector_account_id.as_str())
            || exempt != expected.fee_collectors_exempt
        {
            return false;
        }

        match (self, &expected.kind) {
            (Self::Fixed(fee), CustomFeeKind::FixedFee(fixed)) => {
                fee.amount == fixed.amount
                    && denomination(fee.denominating_token_id.as_deref())
                        == denomination(fixed.denominating_token_id.as_deref())
            }
            (Self::Fractional(fee), CustomFeeKind::FractionalFee(fractional)) => {
                fee.amount.numerator == fractional.numerator
                    && fee.amount.denominator == fractional.denominator
                    && fee.minimum == fractional.minimum_amount
                    && max_bound(fee.maximum) == max_bound(fractional.maximum_amount)
                    && fee.net_of_transfers
                        == (fractional.assessment_method == AssessmentMethod::Exclusive)
            }
            (Self::Royalty(fee), CustomFeeKind::RoyaltyFee(royalty)) => {
                fee.amount.numerator == royalty.numerator
                    && fee.amount.denominator == royalty.denominator
                    && match (&fee.fallback_fee, &royalty.fallback_fee) {
                        (None, None) => true,
                        (Some(mirror), Some(expected)) => {
                            mirror.amount == expected.amount
                                && denomination(mirror.denominating_token_id.as_deref())
                                    == denomination(expected.denominating_token_id.as_deref())
                        }
                        _ => false,
                    }
            }
            _ => false,
        }
    }
}

// JSON-RPC carries 64-bit amounts as strings; numbers are accepted too.
mod amount {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(i64),
        Text(String),
    }

    impl RawAmount {
        fn parse(self) -> Result<i64, String> {
            match self {
                Self::Number(n) => Ok(n),
                Self::Text(s) => s
                    .trim()
                    .parse()
                    .map_err(|e| format!("invalid amount '{}': {}", s, e)),
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        RawAmount::deserialize(deserializer)?
            .parse()
            .map_err(D::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
            Option::<RawAmount>::deserialize(deserializer)?
                .map(RawAmount::parse)
                .transpose()
                .map_err(D::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fractional(max: Option<i64>, method: AssessmentMethod) -> CustomFee {
        CustomFee {
            fee_collector_account_id: "0.0.9".into(),
            fee_collectors_exempt: false,
            kind: CustomFeeKind::FractionalFee(FractionalFee {
                numerator: 1,
                denominator: 10,
                minimum_amount: 1,
                maximum_amount: max,
                assessment_method: method,
            }),
        }
    }

    fn mirror_fractional(max: Option<i64>, net_of_transfers: bool) -> MirrorFractionalFee {
        MirrorFractionalFee {
            all_collectors_are_exempt: false,
            amount: MirrorFraction {
                numerator: 1,
                denominator: 10,
            },
            collector_account_id: Some("0.0.9".into()),
            denominating_token_id: Some("0.0.1234".into()),
            maximum: max,
            minimum: 1,
            net_of_transfers,
        }
    }

    #[test]
    fn test_consensus_json_shape() {
        let fee: CustomFee = serde_json::from_value(json!({
            "feeCollectorAccountId": "0.0.5",
            "feeCollectorsExempt": true,
            "fixedFee": { "amount": "10", "denominatingTokenId": "0.0.7" }
        }))
        .unwrap();
        assert_eq!(
            fee,
            CustomFee::fixed("0.0.5", 10, Some("0.0.7".into())).exempt()
        );

        let value = serde_json::to_value(&fee).unwrap();
        assert_eq!(value["fixedFee"]["amount"], "10");
    }

    #[test]
    fn test_numeric_amounts_are_accepted() {
        let fee: CustomFee = serde_json::from_value(json!({
            "feeCollectorAccountId": "0.0.5",
            "fractionalFee": {
                "numerator": 1,
                "denominator": "3",
                "minimumAmount": 0,
                "maximumAmount": "0",
                "assessmentMethod": "exclusive"
            }
        }))
        .unwrap();
        assert_eq!(fee, {
            let mut expected = fractional(Some(0), AssessmentMethod::Exclusive);
            expected.fee_collector_account_id = "0.0.5".into();
            if let CustomFeeKind::FractionalFee(f) = &mut expected.kind {
                f.denominator = 3;
                f.minimum_amount = 0;
            }
            expected
        });
    }

    #[test]
    fn test_zero_and_absent_maximum_are_equivalent() {
        let unbounded = fractional(None, AssessmentMethod::Inclusive);
        let zero = fractional(Some(0), AssessmentMethod::Inclusive);
        assert!(consensus_fee_matches(&unbounded, &zero));
        assert!(!consensus_fee_matches(
            &unbounded,
            &fractional(Some(5), AssessmentMethod::Inclusive)
        ));

        let mirror = MirrorCustomFees {
            fractional_fees: vec![mirror_fractional(Some(0), false)],
            ..Default::default()
        };
        assert!(mirror_fee_matches(&unbounded, &mirror));
    }

    #[test]
    fn test_assessment_method_maps_to_net_of_transfers() {
        let mirror = MirrorCustomFees {
            fractional_fees: vec![mirror_fractional(None, true)],
            ..Default::default()
        };
        assert!(mirror_fee_matches(
            &fractional(None, AssessmentMethod::Exclusive),
            &mirror
        ));
        assert!(!mirror_fee_matches(
            &fractional(None, AssessmentMethod::Inclusive),
            &mirror
        ));
    }

    #[test]
    fn test_fixed_fee_denomination() {
        let hbar = CustomFee::fixed("0.0.5", 100, None);
        let mirror = MirrorCustomFees {
            fixed_fees: vec![MirrorFixedFee {
                amount: 100,
                collector_account_id: Some("0.0.5".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(mirror_fee_matches(&hbar, &mirror));
        assert!(mirror_fee_matches(
            &CustomFee::fixed("0.0.5", 100, Some(String::new())),
            &mirror
        ));
        assert!(!mirror_fee_matches(
            &CustomFee::fixed("0.0.5", 100, Some("0.0.7".into())),
            &mirror
        ));
        assert!(!mirror_fee_matches(&hbar.clone().exempt(), &mirror));
    }

    #[test]
    fn test_royalty_fallback() {
        let royalty = CustomFee {
            fee_collector_account_id: "0.0.5".into(),
            fee_collectors_exempt: false,
            kind: CustomFeeKind::RoyaltyFee(RoyaltyFee {
                numerator: 1,
                denominator: 20,
                fallback_fee: Some(FixedFee {
                    amount: 3,
                    denominating_token_id: None,
                }),
            }),
        };
        let mut entry = MirrorRoyaltyFee {
            all_collectors_are_exempt: false,
            amount: MirrorFraction {
                numerator: 1,
                denominator: 20,
            },
            collector_account_id: Some("0.0.5".into()),
            fallback_fee: Some(MirrorFallbackFee {
                amount: 3,
                denominating_token_id: None,
            }),
        };
        let schedule = |entry: &MirrorRoyaltyFee| MirrorCustomFees {
            royalty_fees: vec![entry.clone()],
            ..Default::default()
        };

        assert!(mirror_fee_matches(&royalty, &schedule(&entry)));
        entry.fallback_fee = None;
        assert!(!mirror_fee_matches(&royalty, &schedule(&entry)));
    }

    #[test]
    fn test_kind_mismatch_never_matches() {
        let mirror = MirrorCustomFees {
            fractional_fees: vec![mirror_fractional(None, false)],
            ..Default::default()
        };
        assert!(!mirror_fee_matches(&CustomFee::fixed("0.0.9", 1, None), &mirror));
    }

    #[test]
    fn test_schedules_need_one_to_one_pairing() {
        let fee = CustomFee::fixed("0.0.5", 1, None);
        let entry = MirrorFixedFee {
            amount: 1,
            collector_account_id: Some("0.0.5".into()),
            ..Default::default()
        };

        let one = MirrorCustomFees {
            fixed_fees: vec![entry.clone()],
            ..Default::default()
        };
        let two = MirrorCustomFees {
            fixed_fees: vec![entry.clone(), entry],
            ..Default::default()
        };

        assert!(fee_schedules_agree(&[fee.clone()], &one));
        assert!(!fee_schedules_agree(&[fee.clone(), fee.clone()], &one));
        assert!(!fee_schedules_agree(&[fee.clone()], &two));
        assert!(fee_schedules_agree(&[fee.clone(), fee], &two));
        assert!(fee_schedules_agree(&[], &MirrorCustomFees::default()));
    }

    #[test]
    fn test_schedule_order_is_irrelevant() {
        let fixed = CustomFee::fixed("0.0.5", 1, None);
        let frac = fractional(None, AssessmentMethod::Inclusive);
        let mirror = MirrorCustomFees {
            fixed_fees: vec![MirrorFixedFee {
                amount: 1,
                collector_account_id: Some("0.0.5".into()),
                ..Default::default()
            }],
            fractional_fees: vec![mirror_fractional(None, false)],
            ..Default::default()
        };

        assert!(fee_schedules_agree(&[frac.clone(), fixed.clone()], &mirror));
        assert!(consensus_fees_match(
            &[frac.clone(), fixed.clone()],
            &[fixed, frac]
        ));
    }

    #[test]
    fn test_mirror_json_shape() {
        let fees: MirrorCustomFees = serde_json::from_value(json!({
            "created_timestamp": "1700000000.000000001",
            "fixed_fees": [{
                "all_collectors_are_exempt": false,
                "amount": 10,
                "collector_account_id": "0.0.5",
                "denominating_token_id": null
            }],
            "fractional_fees": [{
                "all_collectors_are_exempt": true,
                "amount": { "numerator": 1, "denominator": 10 },
                "collector_account_id": "0.0.6",
                "denominating_token_id": "0.0.1234",
                "maximum": null,
                "minimum": 1,
                "net_of_transfers": false
            }]
        }))
        .unwrap();

        assert_eq!(fees.len(), 2);
        assert!(fees.royalty_fees.is_empty());
        assert_eq!(fees.fractional_fees[0].maximum, None);
    }
}
