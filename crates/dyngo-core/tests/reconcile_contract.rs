//! Contract Test: Record Reconciliation
//!
//! Constraints verified:
//! - A missing record is created exactly once
//! - A stale record is edited in place, keeping its id
//! - A record that already matches triggers no writes
//! - Several matching records are refused without any writes
//! - Records of the other type are ignored
//!
//! If this test fails, providers may duplicate or clobber records.

mod common;

use common::*;
use dyngo_core::error::Error;
use dyngo_core::fqdn::Fqdn;
use dyngo_core::reconcile::{Reconciler, reconcile};
use dyngo_core::traits::{DnsProvider, RecordType, SyncOutcome};
use std::net::IpAddr;

#[tokio::test]
async fn missing_record_is_created_once() {
    let api = MockRecordApi::new();
    let fqdn = Fqdn::parse("home.example.com");
    let ip = IpAddr::V4(v4("203.0.113.7"));

    let outcome = reconcile(&api, &fqdn, ip).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Created { new_ip: ip });
    assert_eq!(api.create_calls(), 1);
    assert_eq!(api.update_calls(), 0);

    let records = api.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type, RecordType::A);
    assert_eq!(records[0].name, "home");
    assert_eq!(records[0].value, "203.0.113.7");
}

#[tokio::test]
async fn second_pass_with_same_address_is_a_no_op() {
    let api = MockRecordApi::new();
    let fqdn = Fqdn::parse("home.example.com");
    let ip = IpAddr::V4(v4("203.0.113.7"));

    reconcile(&api, &fqdn, ip).await.unwrap();
    let second = reconcile(&api, &fqdn, ip).await.unwrap();

    assert_eq!(second, SyncOutcome::Unchanged { current_ip: ip });
    assert_eq!(api.create_calls(), 1, "second pass must not create again");
    assert_eq!(api.update_calls(), 0);
    assert_eq!(api.records().len(), 1);
}

#[tokio::test]
async fn stale_record_is_updated_in_place() {
    let api = MockRecordApi::new().with_record("rec-42", RecordType::A, "home", "198.51.100.1");
    let fqdn = Fqdn::parse("home.example.com");
    let ip = IpAddr::V4(v4("203.0.113.7"));

    let outcome = reconcile(&api, &fqdn, ip).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Updated {
            previous: "198.51.100.1".to_string(),
            new_ip: ip,
        }
    );
    assert_eq!(api.update_calls(), 1);
    assert_eq!(api.create_calls(), 0);

    let records = api.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "rec-42", "record id must be preserved");
    assert_eq!(records[0].value, "203.0.113.7");
}

#[tokio::test]
async fn ipv6_values_compare_as_addresses() {
    let api = MockRecordApi::new().with_record(
        "rec-6",
        RecordType::Aaaa,
        "home",
        "2001:0db8:0000:0000:0000:0000:0000:0001",
    );
    let fqdn = Fqdn::parse("home.example.com");
    let ip = IpAddr::V6(v6("2001:db8::1"));

    let outcome = reconcile(&api, &fqdn, ip).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Unchanged { current_ip: ip });
    assert_eq!(api.update_calls(), 0);
}

#[tokio::test]
async fn ambiguous_record_set_is_refused() {
    let api = MockRecordApi::new()
        .with_record("rr-1", RecordType::A, "home", "198.51.100.1")
        .with_record("rr-2", RecordType::A, "home", "198.51.100.2");
    let fqdn = Fqdn::parse("home.example.com");
    let ip = IpAddr::V4(v4("203.0.113.7"));

    let err = reconcile(&api, &fqdn, ip).await.unwrap_err();
    assert!(
        matches!(err, Error::AmbiguousRecord { count: 2, .. }),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(api.create_calls(), 0);
    assert_eq!(api.update_calls(), 0);

    let values: Vec<String> = api.records().into_iter().map(|r| r.value).collect();
    assert_eq!(values, vec!["198.51.100.1", "198.51.100.2"]);
}

#[tokio::test]
async fn records_of_other_type_are_ignored() {
    // An AAAA record with the same name must not be mistaken for the A record
    let api = MockRecordApi::new().with_record("rec-6", RecordType::Aaaa, "home", "2001:db8::1");
    let fqdn = Fqdn::parse("home.example.com");
    let ip = IpAddr::V4(v4("203.0.113.7"));

    let outcome = reconcile(&api, &fqdn, ip).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Created { new_ip: ip });
    assert_eq!(api.records().len(), 2);
}

#[tokio::test]
async fn apex_records_use_the_apex_marker() {
    let api = MockRecordApi::new();
    let fqdn = Fqdn::parse("example.com");
    let ip = IpAddr::V4(v4("203.0.113.7"));

    reconcile(&api, &fqdn, ip).await.unwrap();
    assert_eq!(api.records()[0].name, "@");
}

#[tokio::test]
async fn session_failure_aborts_before_listing() {
    let api = MockRecordApi::unreachable();
    let fqdn = Fqdn::parse("home.example.com");

    let result = reconcile(&api, &fqdn, IpAddr::V4(v4("203.0.113.7"))).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(api.open_calls(), 1);
    assert_eq!(api.list_calls(), 0);
}

#[tokio::test]
async fn reconciler_exposes_provider_interface() {
    let api = MockRecordApi::new();
    let provider = Reconciler::new(
        api.clone(),
        Fqdn::parse("home.example.com"),
        &tracing::Span::none(),
    );

    let a = provider.sync_a_record(v4("203.0.113.7")).await.unwrap();
    let aaaa = provider.sync_aaaa_record(v6("2001:db8::7")).await.unwrap();

    assert!(a.changed());
    assert!(aaaa.changed());

    let types: Vec<RecordType> = api.records().into_iter().map(|r| r.record_type).collect();
    assert_eq!(types, vec![RecordType::A, RecordType::Aaaa]);

    // Both families are independent: a second pass changes nothing
    assert!(!provider.sync_a_record(v4("203.0.113.7")).await.unwrap().changed());
    assert!(!provider.sync_aaaa_record(v6("2001:db8::7")).await.unwrap().changed());
    assert_eq!(api.create_calls(), 2);

    assert_eq!(provider.fqdn().zone(), "example.com");
    assert_eq!(provider.fqdn().record(), "home");
    assert_eq!(provider.api().records().len(), 2, "accessor sees the same backend");
}
