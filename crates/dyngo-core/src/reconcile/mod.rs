//! Record reconciliation
//!
//! Given a target name and a freshly observed address, decide whether the
//! provider-side record has to be created, left alone or edited.
//!
//! ```text
//! matching records   action
//! ----------------   ------------------------------------------
//!        0           create type/name/value
//!        1, equal    nothing (Unchanged)
//!        1, differs  edit value, keep record id
//!       >1           refuse with Error::AmbiguousRecord
//! ```
//!
//! More than one match is never resolved by picking one: that would
//! silently rewrite one member of a round-robin set.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{Instrument, debug, error, info, warn};

use crate::error::{Error, Result};
use crate::fqdn::Fqdn;
use crate::traits::{DnsProvider, ProviderKind, RecordApi, RecordType, SyncOutcome};

/// Run one reconciliation pass of `fqdn` against `api`
pub async fn reconcile<A: RecordApi + ?Sized>(
    api: &A,
    fqdn: &Fqdn,
    value: IpAddr,
) -> Result<SyncOutcome> {
    let record_type = RecordType::for_ip(&value);

    let session = api.open(fqdn).await.inspect_err(|e| {
        error!(provider = %api.kind(), zone = fqdn.zone(), "could not open provider session: {}", e);
    })?;

    debug!(
        zone = fqdn.zone(),
        record = fqdn.record(),
        "searching for {} record",
        record_type
    );

    let records = api
        .list_records(&session, fqdn, record_type)
        .await
        .inspect_err(|e| error!("could not list domain records: {}", e))?;

    // Backends filter on name; make sure the type matches as well
    let matching: Vec<_> = records
        .into_iter()
        .filter(|r| r.record_type == record_type)
        .collect();

    debug!("{} matching records found", matching.len());

    match matching.as_slice() {
        [] => {
            info!("no matching record found, will attempt to create");
            api.create_record(&session, fqdn, record_type, &value)
                .await
                .inspect_err(|e| error!("could not create a new domain record: {}", e))?;
            info!(%value, "new record successfully created");
            Ok(SyncOutcome::Created { new_ip: value })
        }
        [record] if record.points_to(&value) => {
            info!(id = %record.id, %value, "record does not need to be updated");
            Ok(SyncOutcome::Unchanged { current_ip: value })
        }
        [record] => {
            debug!(id = %record.id, current = %record.value, "found matching record");
            api.update_record(&session, record, &value)
                .await
                .inspect_err(|e| {
                    error!(id = %record.id, "could not update domain record: {}", e)
                })?;
            info!(id = %record.id, previous = %record.value, %value, "record successfully updated");
            Ok(SyncOutcome::Updated {
                previous: record.value.clone(),
                new_ip: value,
            })
        }
        several => {
            let ids: Vec<&str> = several.iter().map(|r| r.id.as_str()).collect();
            warn!(?ids, "refusing to update: {} records match", several.len());
            Err(Error::AmbiguousRecord {
                name: fqdn.name().to_string(),
                record_type: record_type.to_string(),
                count: several.len(),
            })
        }
    }
}

/// A [`DnsProvider`] built from a [`RecordApi`] and one target name
pub struct Reconciler<A> {
    api: A,
    fqdn: Fqdn,
    span: tracing::Span,
}

impl<A: RecordApi> Reconciler<A> {
    /// Wrap `api` to keep `fqdn` in sync
    ///
    /// `parent` is the logging context the provider records under.
    pub fn new(api: A, fqdn: Fqdn, parent: &tracing::Span) -> Self {
        let span = tracing::info_span!(
            parent: parent,
            "provider",
            provider = %api.kind(),
            record = %fqdn
        );
        Self { api, fqdn, span }
    }

    /// The managed name
    pub fn fqdn(&self) -> &Fqdn {
        &self.fqdn
    }

    /// The wrapped backend
    pub fn api(&self) -> &A {
        &self.api
    }

    async fn sync(&self, value: IpAddr) -> Result<SyncOutcome> {
        let span = tracing::info_span!(parent: &self.span, "sync", record_type = %RecordType::for_ip(&value));
        reconcile(&self.api, &self.fqdn, value).instrument(span).await
    }
}

impl<A> std::fmt::Debug for Reconciler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").field("fqdn", &self.fqdn).finish()
    }
}

#[async_trait]
impl<A: RecordApi> DnsProvider for Reconciler<A> {
    async fn sync_a_record(&self, ip: Ipv4Addr) -> Result<SyncOutcome> {
        self.sync(IpAddr::V4(ip)).await
    }

    async fn sync_aaaa_record(&self, ip: Ipv6Addr) -> Result<SyncOutcome> {
        self.sync(IpAddr::V6(ip)).await
    }

    fn name(&self) -> ProviderKind {
        self.api.kind()
    }
}
