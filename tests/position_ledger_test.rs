mod common;

use common::*;
use stakeledger::domain::{EventKind, PositionStatus, Valuation, SECONDS_PER_DAY};
use stakeledger::{AssetId, LedgerError, PositionKey, RewardRate, Timestamp};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_reward_after_100_seconds_at_two_dollars() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 100 * ONE_ETH);

    assert_ok!(h.ledger.deposit(&ctx(&alice(), 0), &AssetId::native(), 100 * ONE_ETH).await);

    let reward = assert_ok!(
        h.ledger
            .get_updated_reward(&alice(), &AssetId::native(), Timestamp::new(100))
            .await
    );
    assert_eq!(reward, 2000);

    let view = h
        .ledger
        .get_position(&alice(), &AssetId::native(), Timestamp::new(100))
        .await
        .unwrap();
    assert_eq!(view.status, PositionStatus::Open);
    assert_eq!(view.position.accrued_reward, 0);
    assert_eq!(view.usd_value, 20_000);
    assert_eq!(h.wallet(&alice(), &AssetId::native()), 0);
}

#[tokio::test]
async fn test_read_projection_is_idempotent_and_does_not_write() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), ONE_ETH);
    h.ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), ONE_ETH)
        .await
        .unwrap();

    let key = PositionKey::new(alice(), AssetId::native());
    let stored_before = h.repo.get_position(&key).await.unwrap();
    let seq_before = h.repo.current_seq().await.unwrap();

    let now = Timestamp::new(500);
    let first = h.ledger.get_updated_reward(&alice(), &AssetId::native(), now).await.unwrap();
    let second = h.ledger.get_updated_reward(&alice(), &AssetId::native(), now).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        h.ledger.get_position(&alice(), &AssetId::native(), now).await.unwrap(),
        h.ledger.get_position(&alice(), &AssetId::native(), now).await.unwrap()
    );

    assert_eq!(h.repo.get_position(&key).await.unwrap(), stored_before);
    assert_eq!(h.repo.current_seq().await.unwrap(), seq_before);
}

#[tokio::test]
async fn test_repeated_deposits_sum_and_keep_last_price() {
    let h = setup().await;
    h.register_native().await;
    h.fund(&alice(), &AssetId::native(), 100 * ONE_ETH);

    let deposits = [(30, 150u128, 0i64), (20, 175, 10), (50, 210, 20)];
    for (amount, price, at) in deposits {
        h.set_price(ETH_FEED, price, 2, at);
        h.ledger
            .deposit(&ctx(&alice(), at), &AssetId::native(), amount * ONE_ETH)
            .await
            .unwrap();
    }

    let key = PositionKey::new(alice(), AssetId::native());
    let position = h.repo.get_position(&key).await.unwrap().unwrap();
    assert_eq!(position.principal, 100 * ONE_ETH);
    assert_eq!(position.valuation, Valuation::new(210, 2));
    assert_eq!(position.opened_at, Timestamp::new(0));
    assert_eq!(position.last_accrual_at, Timestamp::new(20));
}

#[tokio::test]
async fn test_second_deposit_revalues_without_touching_settled_reward() {
    let h = setup().await;
    h.register_native().await;
    h.fund(&alice(), &AssetId::native(), 100 * ONE_ETH);

    h.set_price(ETH_FEED, 200, 2, 0);
    h.ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 50 * ONE_ETH)
        .await
        .unwrap();

    h.set_price(ETH_FEED, 400, 2, 100);
    let receipt = h
        .ledger
        .deposit(&ctx(&alice(), 100), &AssetId::native(), 50 * ONE_ETH)
        .await
        .unwrap();

    // first window: $100 for 100s at 0.0001
    assert_eq!(receipt.position.principal, 100 * ONE_ETH);
    assert_eq!(receipt.position.valuation, Valuation::new(400, 2));
    assert_eq!(receipt.position.accrued_reward, 1000);

    // second window: $400 for 100s on top
    let reward = h
        .ledger
        .get_updated_reward(&alice(), &AssetId::native(), Timestamp::new(200))
        .await
        .unwrap();
    assert_eq!(reward, 1000 + 4000);
}

#[tokio::test]
async fn test_split_windows_never_exceed_single_window() {
    let single = setup().await;
    let split = setup().await;
    for h in [&single, &split] {
        h.register_native().await;
        h.set_price(ETH_FEED, 333, 2, 0);
        h.fund(&alice(), &AssetId::native(), ONE_ETH);
        h.ledger
            .deposit(&ctx(&alice(), 0), &AssetId::native(), ONE_ETH)
            .await
            .unwrap();
    }

    let mut boundaries = 0u128;
    for at in (10..100).step_by(10) {
        split
            .ledger
            .update_reward(&ctx(&bob(), at), &alice(), &AssetId::native())
            .await
            .unwrap();
        boundaries += 1;
    }

    let end = Timestamp::new(100);
    let joined = single.ledger.get_updated_reward(&alice(), &AssetId::native(), end).await.unwrap();
    let pieces = split.ledger.get_updated_reward(&alice(), &AssetId::native(), end).await.unwrap();

    assert_eq!(joined, 33);
    assert!(pieces <= joined);
    assert!(joined - pieces <= boundaries);
}

#[tokio::test]
async fn test_update_reward_checkpoints_without_moving_funds() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 100 * ONE_ETH);
    h.ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 100 * ONE_ETH)
        .await
        .unwrap();

    let position = h
        .ledger
        .update_reward(&ctx(&alice(), 100), &alice(), &AssetId::native())
        .await
        .unwrap();
    assert_eq!(position.accrued_reward, 2000);
    assert_eq!(position.last_accrual_at, Timestamp::new(100));
    assert_eq!(position.principal, 100 * ONE_ETH);
    assert_eq!(h.custody.custody_balance(&stakeledger::AssetKind::Native), 100 * ONE_ETH);

    // a checkpoint on a never-opened key writes nothing
    let empty = h
        .ledger
        .update_reward(&ctx(&bob(), 100), &bob(), &AssetId::native())
        .await
        .unwrap();
    assert!(empty.is_vacant());
    assert!(h
        .repo
        .get_position(&PositionKey::new(bob(), AssetId::native()))
        .await
        .unwrap()
        .is_none());
    assert!(h.ledger.events(&bob(), None).await.unwrap().is_empty());

    let events = h.ledger.events(&alice(), None).await.unwrap();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Deposited, EventKind::RewardUpdated]);
    assert_eq!(events[1].amount, 2000);
    assert_eq!(events[1].reward_after, 2000);
}

#[tokio::test]
async fn test_withdraw_bounds() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 100);

    let err = assert_err!(h.ledger.withdraw(&ctx(&alice(), 0), &AssetId::native(), 1).await);
    assert!(matches!(
        err,
        LedgerError::InsufficientPosition { requested: 1, available: 0 }
    ));

    h.ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 100)
        .await
        .unwrap();

    let err = assert_err!(h.ledger.withdraw(&ctx(&alice(), 1), &AssetId::native(), 101).await);
    assert!(matches!(
        err,
        LedgerError::InsufficientPosition { requested: 101, available: 100 }
    ));
    assert!(h.ledger.withdraw(&ctx(&alice(), 1), &AssetId::native(), 0).await.is_err());

    let receipt = assert_ok!(h.ledger.withdraw(&ctx(&alice(), 2), &AssetId::native(), 40).await);
    assert_eq!(receipt.amount, 40);
    assert_eq!(receipt.position.principal, 60);
    assert_eq!(h.wallet(&alice(), &AssetId::native()), 40);
}

#[tokio::test]
async fn test_full_withdrawal_closes_position_and_claim_still_pays() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 100 * ONE_ETH);
    h.ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 100 * ONE_ETH)
        .await
        .unwrap();

    let receipt = h
        .ledger
        .withdraw(&ctx(&alice(), 100), &AssetId::native(), 100 * ONE_ETH)
        .await
        .unwrap();
    assert_eq!(receipt.position.status(), PositionStatus::Closed);
    assert_eq!(receipt.position.principal, 0);
    assert_eq!(receipt.position.accrued_reward, 2000);

    // nothing accrues on a closed position
    let later = Timestamp::new(10_000);
    assert_eq!(
        h.ledger.get_updated_reward(&alice(), &AssetId::native(), later).await.unwrap(),
        2000
    );

    let claim = h
        .ledger
        .claim_reward(&ctx(&alice(), 200), &AssetId::native())
        .await
        .unwrap();
    assert_eq!(claim.amount, 2000);
    assert_eq!(claim.position.accrued_reward, 0);
    assert_eq!(
        stakeledger::RewardTokenLedger::balance_of(&h.token, &alice()).await.unwrap(),
        2000
    );

    let err = h
        .ledger
        .claim_reward(&ctx(&alice(), 300), &AssetId::native())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NothingToClaim));

    // the zero record is retained
    let views = h.ledger.get_user_positions(&alice(), later).await.unwrap();
    assert_eq!(views.len(), 1);
    assert!(views[0].position.is_vacant());
}

#[tokio::test]
async fn test_reopening_vacant_position_resets_opened_at() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 2 * ONE_ETH);

    h.ledger.deposit(&ctx(&alice(), 0), &AssetId::native(), ONE_ETH).await.unwrap();
    h.ledger.withdraw(&ctx(&alice(), 100), &AssetId::native(), ONE_ETH).await.unwrap();
    h.ledger.claim_reward(&ctx(&alice(), 100), &AssetId::native()).await.unwrap();

    h.set_price(ETH_FEED, 200, 2, 5 * SECONDS_PER_DAY);
    let receipt = h
        .ledger
        .deposit(&ctx(&alice(), 5 * SECONDS_PER_DAY), &AssetId::native(), ONE_ETH)
        .await
        .unwrap();
    assert_eq!(receipt.position.opened_at, Timestamp::new(5 * SECONDS_PER_DAY));

    let view = h
        .ledger
        .get_position(&alice(), &AssetId::native(), Timestamp::new(8 * SECONDS_PER_DAY + 1))
        .await
        .unwrap();
    assert_eq!(view.days_staked, 3);
}

#[tokio::test]
async fn test_stale_oracle_blocks_deposit_only() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 2 * ONE_ETH);
    h.ledger.deposit(&ctx(&alice(), 0), &AssetId::native(), ONE_ETH).await.unwrap();

    let stale_at = MAX_STALENESS_SECS as i64 + 1;
    let err = h
        .ledger
        .deposit(&ctx(&alice(), stale_at), &AssetId::native(), ONE_ETH)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::OracleUnavailable(_)));

    assert_ok!(h.ledger.claim_reward(&ctx(&alice(), stale_at), &AssetId::native()).await);
    assert_ok!(
        h.ledger
            .withdraw(&ctx(&alice(), stale_at), &AssetId::native(), ONE_ETH)
            .await
    );

    h.oracle.remove_price(&stakeledger::OracleHandle::new(ETH_FEED));
    let err = h
        .ledger
        .deposit(&ctx(&alice(), stale_at), &AssetId::native(), ONE_ETH)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::OracleUnavailable(_)));
}

#[tokio::test]
async fn test_deposit_input_checks() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);

    let err = h.ledger.deposit(&ctx(&alice(), 0), &AssetId::native(), 0).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount));

    let err = h.ledger.deposit(&ctx(&alice(), 0), &usdc(), 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnknownAsset(_)));

    // strict custody: alice holds nothing
    let err = h
        .ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TransferFailed(_)));
    assert!(h
        .repo
        .get_position(&PositionKey::new(alice(), AssetId::native()))
        .await
        .unwrap()
        .is_none());
    assert!(h.ledger.events(&alice(), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_paused_and_disabled_block_deposits_only() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 10);
    h.ledger.deposit(&ctx(&alice(), 0), &AssetId::native(), 5).await.unwrap();

    h.admin.pause(&ctx(&owner(), 1)).unwrap();
    let err = h.ledger.deposit(&ctx(&alice(), 1), &AssetId::native(), 1).await.unwrap_err();
    assert!(matches!(err, LedgerError::Paused));
    assert_ok!(h.ledger.withdraw(&ctx(&alice(), 1), &AssetId::native(), 1).await);
    h.admin.unpause(&ctx(&owner(), 2)).unwrap();

    h.registry
        .set_disabled(&ctx(&owner(), 2), &AssetId::native(), true)
        .await
        .unwrap();
    let err = h.ledger.deposit(&ctx(&alice(), 2), &AssetId::native(), 1).await.unwrap_err();
    assert!(matches!(err, LedgerError::AssetDisabled(_)));
    assert_ok!(h.ledger.withdraw(&ctx(&alice(), 2), &AssetId::native(), 1).await);

    h.registry
        .set_disabled(&ctx(&owner(), 3), &AssetId::native(), false)
        .await
        .unwrap();
    assert_ok!(h.ledger.deposit(&ctx(&alice(), 3), &AssetId::native(), 1).await);
}

#[tokio::test]
async fn test_events_follow_operation_order() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 100 * ONE_ETH);

    h.ledger.deposit(&ctx(&alice(), 0), &AssetId::native(), 100 * ONE_ETH).await.unwrap();
    h.ledger.withdraw(&ctx(&alice(), 50), &AssetId::native(), 40 * ONE_ETH).await.unwrap();
    h.ledger.claim_reward(&ctx(&alice(), 100), &AssetId::native()).await.unwrap();

    let events = h.ledger.events(&alice(), None).await.unwrap();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![EventKind::Deposited, EventKind::Withdrawn, EventKind::RewardClaimed]
    );
    assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));

    // 1000 for the first 50s on $200, 600 for the next 50s on $120
    assert_eq!(events[1].reward_after, 1000);
    assert_eq!(events[2].amount, 1600);
    assert_eq!(events[2].reward_after, 0);
    assert_eq!(events[2].principal_after, 60 * ONE_ETH);

    let tail = h.ledger.events(&alice(), Some(events[1].seq)).await.unwrap();
    assert_eq!(tail.len(), 2);
}

#[tokio::test]
async fn test_user_positions_and_per_asset_rate() {
    let h = setup().await;
    h.register_native().await;
    h.registry
        .register(
            &ctx(&owner(), 0),
            stakeledger::AssetDescriptor::new(
                usdc(),
                6,
                "USDC",
                stakeledger::OracleHandle::new(USDC_FEED),
                Timestamp::new(0),
            )
            .with_reward_rate(RewardRate::new(2, 4)),
        )
        .await
        .unwrap();
    h.set_price(ETH_FEED, 200, 2, 0);
    h.set_price(USDC_FEED, 100_000_000, 8, 0);
    h.fund(&alice(), &AssetId::native(), ONE_ETH);
    h.fund(&alice(), &usdc(), 100_000_000);

    h.ledger.deposit(&ctx(&alice(), 0), &usdc(), 100_000_000).await.unwrap();
    h.ledger.deposit(&ctx(&alice(), 0), &AssetId::native(), ONE_ETH).await.unwrap();

    let views = h.ledger.get_user_positions(&alice(), Timestamp::new(100)).await.unwrap();
    assert_eq!(views.len(), 2);
    assert!(views[0].position.asset_id.is_native());
    assert_eq!(views[1].position.asset_id, usdc());

    // $2 at 0.0001 for 100s
    assert_eq!(views[0].reward, 20);
    // $100 (scale 8) at 0.0002 for 100s
    assert_eq!(views[1].reward_rate, RewardRate::new(2, 4));
    assert_eq!(views[1].reward, 2000);
}

#[tokio::test]
async fn test_large_stake_on_eighteen_decimal_feed_can_exit() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 2000 * ONE_ETH, 18, 0);
    h.fund(&alice(), &AssetId::native(), 1000 * ONE_ETH);

    h.ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 1000 * ONE_ETH)
        .await
        .unwrap();

    let view = h
        .ledger
        .get_position(&alice(), &AssetId::native(), Timestamp::new(100))
        .await
        .unwrap();
    assert_eq!(view.usd_value, 2_000_000 * ONE_ETH);
    // $2,000,000 at 0.0001/s for 100s is $20,000 in milli-units
    assert_eq!(view.reward, 20_000_000);

    let receipt = h
        .ledger
        .withdraw(&ctx(&alice(), 100), &AssetId::native(), 1000 * ONE_ETH)
        .await
        .unwrap();
    assert_eq!(receipt.position.accrued_reward, 20_000_000);
    assert_eq!(h.wallet(&alice(), &AssetId::native()), 1000 * ONE_ETH);

    let claimed = h
        .ledger
        .claim_reward(&ctx(&alice(), 100), &AssetId::native())
        .await
        .unwrap();
    assert_eq!(claimed.amount, 20_000_000);
}

#[tokio::test]
async fn test_deposit_rejects_stake_that_cannot_be_valued() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, u128::MAX / 2, 0, 0);
    h.fund(&alice(), &AssetId::native(), 10 * ONE_ETH);

    let err = h
        .ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 10 * ONE_ETH)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Overflow));
    assert_eq!(h.wallet(&alice(), &AssetId::native()), 10 * ONE_ETH);
    assert!(h
        .repo
        .get_position(&PositionKey::new(alice(), AssetId::native()))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_rejected_withdrawal_push_leaves_position_unchanged() {
    let h = setup().await;
    h.register_native().await;
    h.set_price(ETH_FEED, 200, 2, 0);
    h.fund(&alice(), &AssetId::native(), 100);
    h.ledger
        .deposit(&ctx(&alice(), 0), &AssetId::native(), 100)
        .await
        .unwrap();

    let key = PositionKey::new(alice(), AssetId::native());
    let before = h.repo.get_position(&key).await.unwrap().unwrap();

    h.custody.set_failing(true);
    let err = h
        .ledger
        .withdraw(&ctx(&alice(), 50), &AssetId::native(), 60)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TransferFailed(_)));

    assert_eq!(h.repo.get_position(&key).await.unwrap().unwrap(), before);
    assert_eq!(h.wallet(&alice(), &AssetId::native()), 0);
    let kinds: Vec<EventKind> = h
        .ledger
        .events(&alice(), None)
        .await
        .unwrap()
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![EventKind::Deposited]);

    h.custody.set_failing(false);
    let receipt = h
        .ledger
        .withdraw(&ctx(&alice(), 50), &AssetId::native(), 60)
        .await
        .unwrap();
    assert_eq!(receipt.position.principal, 40);
    assert_eq!(h.wallet(&alice(), &AssetId::native()), 60);
}
