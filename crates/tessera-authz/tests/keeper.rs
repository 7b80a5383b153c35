//! Keeper behaviour: capabilities, queries, pruning and genesis

use proptest::prelude::*;
use tessera_authz::msgs::MSG_EXEC_TYPE_URL;
use tessera_authz::{
    pack, GenericAuthorization, GenesisState, GrantAuthorization, MsgExec, PageRequest,
    SendAuthorization, StakeAuthorization, StakeAuthorizationType, Validators,
    BLOCK_PRUNE_LIMIT,
};
use tessera_core::msgs::bank::MSG_SEND_TYPE_URL;
use tessera_core::msgs::staking::{MSG_DELEGATE_TYPE_URL, MSG_UNDELEGATE_TYPE_URL};
use tessera_core::msgs::MsgDelegate;
use tessera_core::config::QueryConfig;
use tessera_core::{Address, Coin, Coins, Msg, MsgRouter, TesseraError, Timestamp};
use tessera_testkit::{create_incremental_accounts, init_test_tracing, TestEnv};

const HOUR: u64 = 3_600;

fn grant_generic(
    env: &mut TestEnv,
    granter: &Address,
    grantee: &Address,
    msg_type_url: &str,
    expiration: Option<Timestamp>,
) {
    env.with_ctx(|ctx, app| {
        app.keeper.grant(
            ctx,
            granter,
            grantee,
            Box::new(GenericAuthorization::new(msg_type_url)),
            expiration,
        )
    })
    .unwrap();
}

fn delegate(env: &TestEnv, delegator: &Address, validator: &str, amount: u128) -> Box<dyn Msg> {
    Box::new(MsgDelegate {
        delegator_address: env.app.addr(delegator),
        validator_address: validator.to_string(),
        amount: Coin::new("stake", amount),
    })
}

#[test]
fn stake_authorization_tracks_allowance_and_validators() {
    init_test_tracing();
    let mut env = TestEnv::new();
    let addrs = create_incremental_accounts(2);
    let (granter, grantee) = (&addrs[0], &addrs[1]);
    env.fund(granter, &Coins::from(Coin::new("stake", 1_000)));

    let authorization = StakeAuthorization::new(
        Some(Coin::new("stake", 100)),
        Validators::AllowList(vec!["val1".into()]),
        StakeAuthorizationType::Delegate,
    );
    env.with_ctx(|ctx, app| {
        app.keeper
            .grant(ctx, granter, grantee, Box::new(authorization), None)
    })
    .unwrap();

    let exec = |env: &mut TestEnv, msg: Box<dyn Msg>| {
        let exec = MsgExec::new(env.app.addr(grantee), vec![msg]);
        env.with_ctx(|ctx, app| app.router.dispatch(ctx, &exec))
    };

    let msg = delegate(&env, granter, "val1", 40);
    exec(&mut env, msg).unwrap();
    let bonded = env
        .app
        .router
        .delegation(&env.store, granter, "val1")
        .unwrap();
    assert_eq!(bonded, 40);

    let msg = delegate(&env, granter, "val2", 1);
    let err = exec(&mut env, msg).unwrap_err();
    assert!(matches!(err, TesseraError::Denied { .. }));

    let msg = delegate(&env, granter, "val1", 61);
    let err = exec(&mut env, msg).unwrap_err();
    assert!(matches!(err, TesseraError::Denied { .. }));

    let msg = delegate(&env, granter, "val1", 60);
    exec(&mut env, msg).unwrap();
    assert_eq!(env.grant_count(), 0);
}

#[test]
fn queries_paginate_by_store_key() {
    let mut env = TestEnv::new();
    let addrs = create_incremental_accounts(2);
    for url in [MSG_SEND_TYPE_URL, MSG_DELEGATE_TYPE_URL, MSG_UNDELEGATE_TYPE_URL] {
        grant_generic(&mut env, &addrs[0], &addrs[1], url, None);
    }
    let granter = env.app.addr(&addrs[0]);
    let grantee = env.app.addr(&addrs[1]);

    let first = env
        .with_ctx(|ctx, app| {
            app.keeper
                .query_grants(ctx, &granter, &grantee, None, &PageRequest::with_limit(2))
        })
        .unwrap();
    assert_eq!(first.grants.len(), 2);
    let next_key = first.pagination.next_key.clone().unwrap();

    let second = env
        .with_ctx(|ctx, app| {
            let page = PageRequest {
                key: Some(next_key),
                limit: 2,
            };
            app.keeper.query_grants(ctx, &granter, &grantee, None, &page)
        })
        .unwrap();
    assert_eq!(second.grants.len(), 1);
    assert!(second.pagination.next_key.is_none());

    let mut seen: Vec<_> = first
        .grants
        .iter()
        .chain(&second.grants)
        .map(|g| g.authorization.clone())
        .collect();
    seen.dedup();
    assert_eq!(seen.len(), 3);
}

#[test]
fn query_limits_must_allow_progress() {
    let mut env = TestEnv::new();
    let addrs = create_incremental_accounts(2);
    for url in [MSG_SEND_TYPE_URL, MSG_DELEGATE_TYPE_URL] {
        grant_generic(&mut env, &addrs[0], &addrs[1], url, None);
    }

    let stalled = QueryConfig {
        default_page_limit: 0,
        max_page_limit: 0,
    };
    let err = env.app.keeper.clone().with_query_config(stalled).unwrap_err();
    assert!(matches!(err, TesseraError::Config { .. }));

    let single = QueryConfig {
        default_page_limit: 1,
        max_page_limit: 1,
    };
    let keeper = env.app.keeper.clone().with_query_config(single).unwrap();
    let granter = env.app.addr(&addrs[0]);
    let grantee = env.app.addr(&addrs[1]);
    let mut page = PageRequest::with_limit(50);
    let mut seen = 0;
    loop {
        let result = env
            .with_ctx(|ctx, _| keeper.query_grants(ctx, &granter, &grantee, None, &page))
            .unwrap();
        assert_eq!(result.grants.len(), 1);
        seen += 1;
        match result.pagination.next_key {
            Some(key) => page.key = Some(key),
            None => break,
        }
    }
    assert_eq!(seen, 2);
}

#[test]
fn single_type_query_reports_missing_grant() {
    let mut env = TestEnv::new();
    let addrs = create_incremental_accounts(2);
    grant_generic(&mut env, &addrs[0], &addrs[1], MSG_SEND_TYPE_URL, None);
    let granter = env.app.addr(&addrs[0]);
    let grantee = env.app.addr(&addrs[1]);

    let found = env
        .with_ctx(|ctx, app| {
            app.keeper.query_grants(
                ctx,
                &granter,
                &grantee,
                Some(MSG_SEND_TYPE_URL),
                &PageRequest::default(),
            )
        })
        .unwrap();
    assert_eq!(found.grants.len(), 1);
    assert_eq!(found.grants[0].granter, granter);

    let err = env
        .with_ctx(|ctx, app| {
            app.keeper.query_grants(
                ctx,
                &granter,
                &grantee,
                Some(MSG_DELEGATE_TYPE_URL),
                &PageRequest::default(),
            )
        })
        .unwrap_err();
    assert!(matches!(err, TesseraError::NotFound { .. }));
    assert!(err.message().contains(MSG_DELEGATE_TYPE_URL));
}

#[test]
fn granter_and_grantee_queries_skip_expired_grants() {
    let mut env = TestEnv::new();
    let addrs = create_incremental_accounts(3);
    let soon = Some(env.now().saturating_add_secs(HOUR));
    grant_generic(&mut env, &addrs[0], &addrs[1], MSG_SEND_TYPE_URL, soon);
    grant_generic(&mut env, &addrs[0], &addrs[2], MSG_SEND_TYPE_URL, None);
    grant_generic(&mut env, &addrs[2], &addrs[1], MSG_SEND_TYPE_URL, None);

    let granter = env.app.addr(&addrs[0]);
    let grantee = env.app.addr(&addrs[1]);
    let counts = |env: &mut TestEnv| {
        env.with_ctx(|ctx, app| {
            let page = PageRequest::default();
            let by_granter = app.keeper.query_granter_grants(ctx, &granter, &page).unwrap();
            let by_grantee = app.keeper.query_grantee_grants(ctx, &grantee, &page).unwrap();
            (by_granter.grants.len(), by_grantee.grants.len())
        })
    };

    assert_eq!(counts(&mut env), (2, 2));
    env.advance(HOUR);
    assert_eq!(counts(&mut env), (1, 1));
    // still stored until pruned
    assert_eq!(env.grant_count(), 3);
}

#[test]
fn begin_blocker_prunes_a_bounded_batch() {
    let mut env = TestEnv::new();
    let addrs = create_incremental_accounts(BLOCK_PRUNE_LIMIT + 6);
    let expiration = Some(env.now().saturating_add_secs(HOUR));
    for grantee in &addrs[1..] {
        grant_generic(&mut env, &addrs[0], grantee, MSG_SEND_TYPE_URL, expiration);
    }
    env.advance(HOUR);

    let pruned = env.with_ctx(|ctx, app| app.keeper.begin_blocker(ctx)).unwrap();
    assert_eq!(pruned, BLOCK_PRUNE_LIMIT as u64);
    let pruned = env.with_ctx(|ctx, app| app.keeper.begin_blocker(ctx)).unwrap();
    assert_eq!(pruned, 5);
    assert_eq!(env.grant_count(), 0);
}

#[test]
fn genesis_round_trips_and_skips_expired_entries() {
    let mut source = TestEnv::new();
    let addrs = create_incremental_accounts(3);
    let later = Some(source.now().saturating_add_secs(HOUR));
    grant_generic(&mut source, &addrs[0], &addrs[1], MSG_SEND_TYPE_URL, later);
    source
        .with_ctx(|ctx, app| {
            let limit = Coins::from(Coin::new("steak", 7));
            app.keeper.grant(
                ctx,
                &addrs[0],
                &addrs[2],
                Box::new(SendAuthorization::new(limit, Vec::new())),
                None,
            )
        })
        .unwrap();

    let mut exported = source
        .with_ctx(|ctx, app| app.keeper.export_genesis(ctx))
        .unwrap();
    assert_eq!(exported.authorization.len(), 2);

    let stale = GrantAuthorization {
        granter: source.app.addr(&addrs[1]),
        grantee: source.app.addr(&addrs[2]),
        authorization: pack(&GenericAuthorization::new(MSG_EXEC_TYPE_URL)).unwrap(),
        expiration: Some(source.now()),
    };
    let document = exported.to_json().unwrap();
    let mut with_stale = GenesisState::from_json(&document).unwrap();
    with_stale.authorization.push(stale);

    let mut target = TestEnv::new();
    target
        .with_ctx(|ctx, app| app.keeper.init_genesis(ctx, &with_stale))
        .unwrap();
    let reexported = target
        .with_ctx(|ctx, app| app.keeper.export_genesis(ctx))
        .unwrap();

    exported.authorization.sort_by(|a, b| a.grantee.cmp(&b.grantee));
    let mut reexported = reexported;
    reexported.authorization.sort_by(|a, b| a.grantee.cmp(&b.grantee));
    assert_eq!(reexported, exported);
}

#[test]
fn genesis_rejects_unknown_authorization_types() {
    let mut env = TestEnv::new();
    let addrs = create_incremental_accounts(2);
    let mut authorization = pack(&GenericAuthorization::new(MSG_SEND_TYPE_URL)).unwrap();
    authorization.type_url = "/unknown.Authorization".into();
    let state = GenesisState {
        authorization: vec![GrantAuthorization {
            granter: env.app.addr(&addrs[0]),
            grantee: env.app.addr(&addrs[1]),
            authorization,
            expiration: None,
        }],
    };
    assert!(env
        .with_ctx(|ctx, app| app.keeper.init_genesis(ctx, &state))
        .is_err());
    assert_eq!(env.grant_count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pruning_removes_exactly_the_expired_grants(
        offsets in prop::collection::vec(prop::option::of(1u64..100), 1..12),
        as_of in 0u64..120,
    ) {
        let mut env = TestEnv::new();
        let addrs = create_incremental_accounts(offsets.len() + 1);
        let start = env.now();
        for (grantee, offset) in addrs[1..].iter().zip(&offsets) {
            let expiration = offset.map(|secs| start.saturating_add_secs(secs));
            grant_generic(&mut env, &addrs[0], grantee, MSG_SEND_TYPE_URL, expiration);
        }

        let cutoff = start.saturating_add_secs(as_of);
        let expected = offsets
            .iter()
            .filter(|o| o.is_some_and(|secs| secs <= as_of))
            .count() as u64;

        let pruned = env
            .with_ctx(|ctx, app| app.keeper.prune_expired_grants(ctx, cutoff, None))
            .unwrap();
        prop_assert_eq!(pruned, expected);
        prop_assert_eq!(env.grant_count() as u64, offsets.len() as u64 - expected);

        let again = env
            .with_ctx(|ctx, app| app.keeper.prune_expired_grants(ctx, cutoff, None))
            .unwrap();
        prop_assert_eq!(again, 0);

        let survivors_live = env
            .app
            .grants()
            .iter_all(&env.store)
            .all(|entry| !entry.unwrap().1.is_expired(cutoff));
        prop_assert!(survivors_live);
    }
}
