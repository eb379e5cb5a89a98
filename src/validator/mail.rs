// src/validator/mail.rs
// =============================================================================
// This validator checks mailto: links.
//
// We can't know whether a mailbox exists without sending mail, but we can
// check that the domain accepts mail at all: it must publish at least one
// MX record.
//
//   mailto:user@example.com          -> MX lookup for example.com
//   mailto:user@example.com?subject= -> same, the query is ignored
//   mailto:not-an-address            -> invalid, no lookup
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{cancellable, Validator};
use crate::error::CheckError;
use crate::link::{FailureDetail, Verdict};

const ADDRESS: &str =
    r"^mailto:[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@(?P<domain>[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*)";

// Counts the MX records of a domain
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn mx_count(&self, domain: &str) -> Result<usize, CheckError>;
}

// The real resolver, configured from the system (/etc/resolv.conf etc.)
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn from_system_conf() -> Result<Self> {
        let resolver =
            TokioAsyncResolver::tokio_from_system_conf().context("fail to read the system DNS configuration")?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl MxResolver for DnsResolver {
    async fn mx_count(&self, domain: &str) -> Result<usize, CheckError> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => Ok(lookup.iter().count()),
            // NXDOMAIN or an empty answer: the domain has no MX records
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Ok(0),
            Err(e) => Err(CheckError::Dns(e.to_string())),
        }
    }
}

pub struct MailValidator {
    resolver: Arc<dyn MxResolver>,
    address: Regex,
}

impl MailValidator {
    pub fn new(resolver: Arc<dyn MxResolver>) -> Result<Self> {
        let address = Regex::new(ADDRESS).with_context(|| format!("fail to compile the expression '{}'", ADDRESS))?;
        Ok(Self { resolver, address })
    }

    fn domain<'t>(&self, target: &'t str) -> Option<&'t str> {
        self.address
            .captures(target)
            .and_then(|captures| captures.name("domain"))
            .map(|domain| domain.as_str())
    }
}

#[async_trait]
impl Validator for MailValidator {
    fn name(&self) -> &'static str {
        "mail"
    }

    fn claims(&self, target: &str) -> bool {
        target.starts_with("mailto:")
    }

    async fn check(&self, ctx: &CancellationToken, _source: &Path, target: &str) -> Result<Verdict, CheckError> {
        let Some(domain) = self.domain(target) else {
            return Ok(Verdict::invalid_because(FailureDetail::new("malformed email address")));
        };

        let records = cancellable(ctx, self.resolver.mx_count(domain)).await?;
        if records == 0 {
            return Ok(Verdict::invalid_because(FailureDetail::new(format!(
                "no MX records for '{}'",
                domain
            ))));
        }
        Ok(Verdict::valid())
    }
}
