//! Ordering, debounce, coalescing, and timeout behavior.
//!
//! These tests run on a paused clock and use the testkit's latency gates to
//! park gateway calls mid-flight, completing them in whatever order the
//! scenario needs. The invariant under test: only the response carrying the
//! newest request token for its lane may touch the aggregate.

mod common;

use common::{session, session_with};
use domicilio_app::{AddressResolver, ResolutionStatus, ResolverConfig, SettlementKind};
use domicilio_testkit::{wait_until, COL_JUAREZ};
use std::time::Duration;

async fn wait_for_status(resolver: &AddressResolver, status: ResolutionStatus) {
    let resolver = resolver.clone();
    wait_until(move || {
        let resolver = resolver.clone();
        async move { resolver.snapshot().await.status == status }
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_never_applies_even_if_it_arrives_last() {
    let s = session();
    s.gateway.hold_calls(true);

    // First lookup dispatches and parks inside the gateway.
    s.resolver.enter_postal_code("06600").await;
    s.gateway.wait_for_parked(1).await;

    // The user keeps typing; a second lookup dispatches and parks too.
    s.resolver.enter_postal_code("06700").await;
    s.gateway.wait_for_parked(2).await;

    // Deliver out of order: newest first, stale one last.
    s.gateway.release(1).await;
    wait_for_status(&s.resolver, ResolutionStatus::AwaitingSettlementChoice).await;
    s.gateway.release(0).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    // The stale 06600 response must not have touched anything.
    let snapshot = s.resolver.snapshot().await;
    assert_eq!(snapshot.status, ResolutionStatus::AwaitingSettlementChoice);
    assert_eq!(snapshot.selection.postal_code(), "06700");
    assert_eq!(snapshot.selection.settlement_id(), None);
    assert_eq!(snapshot.settlement_candidates.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_typing_dispatches_a_single_lookup() {
    let s = session();

    for fragment in ["0", "06", "066", "0660", "06600"] {
        s.resolver.enter_postal_code(fragment).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    wait_for_status(&s.resolver, ResolutionStatus::Resolved).await;

    assert_eq!(s.gateway.call_count("lookup_postal_code").await, 1);
    assert_eq!(s.resolver.snapshot().await.selection.settlement_id(), Some(COL_JUAREZ));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_complete_code_is_never_dispatched() {
    let s = session();

    s.resolver.enter_postal_code("06600").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    // Replaced within the quiet period; only 06700 may reach the catalog.
    s.resolver.enter_postal_code("06700").await;
    wait_for_status(&s.resolver, ResolutionStatus::AwaitingSettlementChoice).await;

    assert_eq!(s.gateway.call_count("lookup_postal_code").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_identical_lookups_coalesce_across_forms() {
    let s = session();
    let second_form = AddressResolver::new(s.cache.clone(), ResolverConfig::default());
    s.gateway.hold_calls(true);

    s.resolver.enter_postal_code("06600").await;
    second_form.enter_postal_code("06600").await;

    // Both forms miss the cache in the same window; one gateway call serves
    // both.
    s.gateway.wait_for_parked(1).await;
    s.gateway.hold_calls(false);
    s.gateway.release_all().await;

    wait_for_status(&s.resolver, ResolutionStatus::Resolved).await;
    wait_for_status(&second_form, ResolutionStatus::Resolved).await;
    assert_eq!(s.gateway.call_count("lookup_postal_code").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_timeout_reports_recoverable_error() {
    let s = session_with(
        ResolverConfig::default().with_lookup_timeout(Duration::from_secs(2)),
    );
    s.gateway.hold_calls(true);

    s.resolver.enter_postal_code("06600").await;
    s.gateway.wait_for_parked(1).await;

    // Nobody releases the call; the resolver gives up at its time budget.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let snapshot = s.resolver.snapshot().await;
    assert_eq!(snapshot.status, ResolutionStatus::Error);
    assert_eq!(snapshot.selection.postal_code(), "06600");
    assert_eq!(snapshot.selection.state_id(), None);

    // A later user-triggered edit retries and succeeds.
    s.gateway.hold_calls(false);
    s.gateway.release_all().await;
    s.resolver.enter_postal_code("06600").await;
    wait_for_status(&s.resolver, ResolutionStatus::Resolved).await;
}

#[tokio::test(start_paused = true)]
async fn test_custom_settlement_result_discarded_after_edit() {
    let s = session();
    s.resolver.enter_postal_code("06600").await;
    wait_for_status(&s.resolver, ResolutionStatus::Resolved).await;
    s.resolver.enable_custom_settlement("Colonia Nueva").await;

    s.gateway.hold_calls(true);
    let resolver = s.resolver.clone();
    let handle = tokio::spawn(async move {
        resolver.create_custom_settlement(SettlementKind::Colonia).await
    });
    s.gateway.wait_for_parked(1).await;

    // The user edits the postal code while the catalog write is in flight.
    s.resolver.enter_postal_code("06700").await;
    s.gateway.release(0).await;

    let created = handle.await.unwrap().unwrap();
    assert!(created.is_none(), "moved-on selection must not adopt the settlement");
    let snapshot = s.resolver.snapshot().await;
    assert_eq!(snapshot.selection.settlement_id(), None);
    assert_eq!(snapshot.selection.settlement_custom(), Some("Colonia Nueva"));

    s.gateway.hold_calls(false);
    s.gateway.release_all().await;
}

#[tokio::test(start_paused = true)]
async fn test_cache_is_shared_across_forms() {
    let s = session();
    s.resolver.enter_postal_code("06600").await;
    wait_for_status(&s.resolver, ResolutionStatus::Resolved).await;

    // A second form resolving the same code is served from the cache.
    let second_form = AddressResolver::new(s.cache.clone(), ResolverConfig::default());
    second_form.enter_postal_code("06600").await;
    wait_for_status(&second_form, ResolutionStatus::Resolved).await;

    assert_eq!(s.gateway.call_count("lookup_postal_code").await, 1);
}
