use serde::{Deserialize, Serialize};

/// Platform-fee / seller-payout split for one captured total. Never
/// persisted as its own entity; only the resulting subaccount routing is
/// recorded on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitComputation {
    pub total_cents: i32,
    pub platform_fee_cents: i32,
    pub seller_amount_cents: i32,
}

impl SplitComputation {
    /// `platform_fee = round(total * fee_rate)` (half up), seller gets the
    /// remainder, so `platform_fee + seller_amount == total` by
    /// construction.
    pub fn compute(total_cents: i32, fee_rate: f64) -> Self {
        let platform_fee_cents = (total_cents as f64 * fee_rate).round() as i32;
        Self {
            total_cents,
            platform_fee_cents,
            seller_amount_cents: total_cents - platform_fee_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r400_at_ten_percent() {
        let split = SplitComputation::compute(40000, 0.10);
        assert_eq!(split.platform_fee_cents, 4000);
        assert_eq!(split.seller_amount_cents, 36000);
    }

    #[test]
    fn split_always_sums_to_total() {
        for total in [1, 99, 101, 12345, 40000, 999999] {
            for rate in [0.0, 0.05, 0.10, 0.125, 0.15] {
                let split = SplitComputation::compute(total, rate);
                assert_eq!(
                    split.platform_fee_cents + split.seller_amount_cents,
                    split.total_cents,
                    "total={total} rate={rate}"
                );
            }
        }
    }

    #[test]
    fn rounding_is_half_up() {
        // 15 * 0.10 = 1.5 -> 2
        let split = SplitComputation::compute(15, 0.10);
        assert_eq!(split.platform_fee_cents, 2);
        assert_eq!(split.seller_amount_cents, 13);
    }
}
