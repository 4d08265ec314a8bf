//! Integration tests for liquidity deposits, withdrawals and depth increases

mod common;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::*;
use lslmsr_market::{Arm, Asset, Ledger, MarketError, MarketEvent, OptionKind};

#[test_log::test]
fn test_first_deposit_costs_b_ln_buckets() {
    let mut fx = Fixture::new(depth_params(OptionKind::Call, dec!(0.01)));
    let ctx = fx.owner();

    let receipt = fx.market.deposit(&ctx, dec!(10), Decimal::MAX).unwrap();

    // 10 ln 5, rounded up
    assert_eq!(receipt.amount, dec!(16.094379124341003747));
    assert_eq!(receipt.fee, Decimal::ZERO);
    assert_eq!(receipt.depth, dec!(10));
    assert_eq!(fx.market.depth().unwrap(), dec!(10));
    assert_eq!(fx.balance(Asset::LiquidityShare, OWNER), dec!(10));
    assert_eq!(fx.market.ledger().total_supply(Asset::LiquidityShare), dec!(10));
    assert_eq!(fx.pool(), receipt.amount);
    assert!(matches!(
        fx.market.events(),
        [MarketEvent::LiquidityChanged { .. }]
    ));
}

#[test]
fn test_put_deposit_scaled_by_max_strike() {
    let mut fx = Fixture::new(depth_params(OptionKind::Put, Decimal::ZERO));
    let ctx = fx.owner();
    let receipt = fx.market.deposit(&ctx, dec!(1), Decimal::MAX).unwrap();
    assert_close(
        receipt.amount,
        dec!(965.66274746046022476),
        dec!(0.000000000000000002),
    );
}

#[test]
fn test_ls_curve_rejects_depth_changes() {
    let mut fx = ls_market(OptionKind::Call, dec!(0.01), dec!(0.05));
    let ctx = fx.owner();
    assert_eq!(
        fx.market.deposit(&ctx, dec!(1), Decimal::MAX),
        Err(MarketError::LiquidityNotAdjustable)
    );
    assert_eq!(
        fx.market.withdraw(&ctx, dec!(1), Decimal::ZERO),
        Err(MarketError::LiquidityNotAdjustable)
    );
    let zeros = vec![Decimal::ZERO; 4];
    assert_eq!(
        fx.market.increase_liquidity(&ctx, dec!(5), &zeros, &zeros, Decimal::MAX),
        Err(MarketError::LiquidityNotAdjustable)
    );
}

#[test]
fn test_withdraw_everything_with_no_positions() {
    let mut fx = depth_market(OptionKind::Call, dec!(0.01), dec!(10));
    let ctx = fx.owner();

    let receipt = fx.market.withdraw(&ctx, dec!(10), Decimal::ZERO).unwrap();

    assert_eq!(receipt.amount, dec!(16.094379124341003746));
    assert_eq!(receipt.depth, Decimal::ZERO);
    assert_eq!(fx.pool(), dec!(0.000000000000000001));
    assert_eq!(fx.collateral(OWNER), FUNDS - dec!(0.000000000000000001));
}

#[test]
fn test_withdraw_limits() {
    let mut fx = depth_market(OptionKind::Call, dec!(0.01), dec!(10));
    let owner = fx.owner();
    let alice = fx.ctx(ALICE);
    fx.market.buy(&alice, Arm::Long, 1, dec!(1), Decimal::MAX).unwrap();

    assert_eq!(
        fx.market.withdraw(&owner, dec!(10), Decimal::ZERO),
        Err(MarketError::InsufficientLiquidity {
            depth: dec!(10),
            requested: dec!(10),
        })
    );
    let err = fx.market.withdraw(&owner, dec!(11), Decimal::ZERO).unwrap_err();
    assert!(matches!(
        err,
        MarketError::InsufficientBalance { asset: Asset::LiquidityShare, .. }
    ));
    assert_eq!(
        fx.market.withdraw(&alice, dec!(1), Decimal::ZERO),
        Err(MarketError::Unauthorized(ALICE.into()))
    );
    assert_eq!(
        fx.market.withdraw(&owner, Decimal::ZERO, Decimal::ZERO),
        Err(MarketError::SharesMustBePositive(Decimal::ZERO))
    );
}

#[test]
fn test_partial_withdraw_keeps_pool_solvent() {
    let mut fx = depth_market(OptionKind::Call, dec!(0.01), dec!(10));
    let owner = fx.owner();
    let alice = fx.ctx(ALICE);
    fx.market.buy(&alice, Arm::Long, 0, dec!(4), Decimal::MAX).unwrap();
    fx.market.buy(&alice, Arm::Short, 3, dec!(2), Decimal::MAX).unwrap();

    let receipt = fx.market.withdraw(&owner, dec!(6), Decimal::ZERO).unwrap();
    assert!(receipt.amount > Decimal::ZERO);
    assert_eq!(fx.market.depth().unwrap(), dec!(4));
    assert!(fx.pool() >= fx.market.current_cost().unwrap());

    // Positions can still be sold back at the thinner depth
    fx.market.sell(&alice, Arm::Long, 0, dec!(4), Decimal::ZERO).unwrap();
    assert!(fx.pool() >= fx.market.current_cost().unwrap());
}

#[test]
fn test_liquidity_sandwich_does_not_profit() {
    let mut fx = depth_market(OptionKind::Call, dec!(0.01), dec!(10));
    let ctx = fx.owner();
    let start = fx.collateral(OWNER);

    fx.market.deposit(&ctx, dec!(100), Decimal::MAX).unwrap();
    fx.market.buy(&ctx, Arm::Long, 2, dec!(50), Decimal::MAX).unwrap();
    fx.market.sell(&ctx, Arm::Long, 2, dec!(50), Decimal::ZERO).unwrap();
    fx.market.withdraw(&ctx, dec!(100), Decimal::ZERO).unwrap();

    // Two fees of 0.5 plus at most a few units of rounding
    let net = fx.collateral(OWNER) - start;
    assert!(net <= dec!(-1.0), "net {net}");
    assert!(net >= dec!(-1.00000000000000001), "net {net}");
}

#[test]
fn test_deposit_slippage_and_expiry() {
    let mut fx = depth_market(OptionKind::Call, Decimal::ZERO, dec!(10));
    let ctx = fx.owner();

    let err = fx.market.deposit(&ctx, dec!(10), dec!(1)).unwrap_err();
    assert!(matches!(err, MarketError::SlippageExceeded { limit, .. } if limit == dec!(1)));

    fx.expire();
    assert_eq!(
        fx.market.deposit(&ctx, dec!(10), Decimal::MAX),
        Err(MarketError::AlreadyExpired)
    );
}

#[test]
fn test_only_owner_provides_liquidity() {
    let mut fx = depth_market(OptionKind::Call, dec!(0.01), dec!(10));
    let carol = fx.ctx(CAROL);

    assert_eq!(
        fx.market.deposit(&carol, dec!(5), Decimal::MAX),
        Err(MarketError::Unauthorized(CAROL.into()))
    );
    assert_eq!(fx.market.depth().unwrap(), dec!(10));
    assert_eq!(fx.collateral(CAROL), FUNDS);
    assert_eq!(fx.balance(Asset::LiquidityShare, CAROL), Decimal::ZERO);
}

#[test_log::test]
fn test_provider_recovers_residual_after_settlement() {
    let mut fx = Fixture::new(depth_params(OptionKind::Call, dec!(0.01)));
    let owner = fx.owner();
    let alice = fx.ctx(ALICE);
    let bob = fx.ctx(BOB);

    let deposit = fx.market.deposit(&owner, dec!(10), Decimal::MAX).unwrap();
    fx.market.buy(&alice, Arm::Long, 0, dec!(0.01), Decimal::MAX).unwrap();
    fx.market.buy(&bob, Arm::Short, 2, dec!(1), Decimal::MAX).unwrap();
    let traded_in = fx.pool() - deposit.amount;

    fx.settle_at(dec!(444));
    assert_eq!(
        fx.market.withdraw(&owner, dec!(10), Decimal::ZERO),
        Err(MarketError::AlreadyExpired)
    );
    fx.finish_dispute_period();

    let alice_out = fx.market.redeem(&alice, Arm::Long, 0).unwrap().payout;
    let bob_out = fx.market.redeem(&bob, Arm::Short, 2).unwrap().payout;
    assert_eq!(alice_out, dec!(0.003243243243243243));
    assert_eq!(bob_out, dec!(1));

    let owner_before = fx.collateral(OWNER);
    let collected = fx.market.collect_fees(&owner).unwrap();
    assert_eq!(fx.collateral(OWNER), owner_before + collected);

    // Holders take their payoffs; the rest of the subsidy goes back to the provider
    assert_eq!(collected, deposit.amount + traded_in - alice_out - bob_out - fx.pool());
    assert!(collected > deposit.amount - dec!(1));
    assert!(fx.pool() <= dec!(0.000000000000000001));
    assert_eq!(fx.market.collect_fees(&owner).unwrap(), Decimal::ZERO);
}

#[test]
fn test_increase_liquidity_with_positions() {
    let mut fx = Fixture::new(depth_params(OptionKind::Call, dec!(0.01)));
    let ctx = fx.owner();
    let long = [dec!(2), dec!(0), dec!(0), dec!(0)];
    let short = [Decimal::ZERO; 4];

    let receipt = fx
        .market
        .increase_liquidity(&ctx, dec!(10), &long, &short, Decimal::MAX)
        .unwrap();

    // C([0,2,2,2,2], 10) rounded up, plus 2 * 1%
    assert_eq!(receipt.amount, dec!(17.745105641483443792));
    assert_eq!(receipt.fee, dec!(0.02));
    assert_eq!(receipt.shares, dec!(10));
    assert_eq!(fx.balance(Asset::LiquidityShare, OWNER), dec!(10));
    assert_eq!(fx.balance(Asset::Long(0), OWNER), dec!(2));
    assert_eq!(fx.market.long_supply(0), dec!(2));
    assert_eq!(fx.market.fees_accrued(), dec!(0.02));
}

#[test]
fn test_increase_liquidity_validation() {
    let mut fx = depth_market(OptionKind::Call, Decimal::ZERO, dec!(10));
    let owner = fx.owner();
    let alice = fx.ctx(ALICE);
    let zeros = vec![Decimal::ZERO; 4];

    assert_eq!(
        fx.market.increase_liquidity(&alice, dec!(20), &zeros, &zeros, Decimal::MAX),
        Err(MarketError::Unauthorized(ALICE.into()))
    );
    assert_eq!(
        fx.market.increase_liquidity(&owner, dec!(20), &zeros[..3], &zeros, Decimal::MAX),
        Err(MarketError::LengthMismatch {
            expected: 4,
            actual: 3,
        })
    );
    assert_eq!(
        fx.market.increase_liquidity(&owner, dec!(10), &zeros, &zeros, Decimal::MAX),
        Err(MarketError::LiquidityMustIncrease {
            current: dec!(10),
            requested: dec!(10),
        })
    );

    let receipt = fx
        .market
        .increase_liquidity(&owner, dec!(20), &zeros, &zeros, Decimal::MAX)
        .unwrap();
    assert_eq!(receipt.shares, dec!(10));
    assert_eq!(fx.market.depth().unwrap(), dec!(20));
    assert_eq!(fx.market.ledger().total_supply(Asset::LiquidityShare), dec!(20));
}
