// src/dispatch.rs
// =============================================================================
// The dispatcher routes every link to the validator responsible for it.
//
// How it works:
// 1. For each record, ask the validators in order "is this yours?"
// 2. The first one saying yes checks the link; nobody else is asked
// 3. A record nobody claims is dropped from the output
// 4. A validator error doesn't stop the loop: it's collected and we move on
// 5. At the end, any collected error fails the whole batch
//
// Point 5 means one flaky DNS server throws away every result of the run.
//
// Records are processed one at a time, in the order the scanner produced
// them. The headless browser behind the web validator serves one page at
// a time.
// =============================================================================

use tokio_util::sync::CancellationToken;

use crate::error::{CheckError, DispatchError, DispatchFailure};
use crate::link::LinkRecord;
use crate::validator::Validator;

pub struct Dispatcher {
    validators: Vec<Box<dyn Validator>>,
}

impl Dispatcher {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    // The first validator claiming `target`, if any
    fn authority(&self, target: &str) -> Option<&dyn Validator> {
        self.validators
            .iter()
            .map(|validator| validator.as_ref())
            .find(|validator| validator.claims(target))
    }

    pub async fn process(
        &self,
        ctx: &CancellationToken,
        records: Vec<LinkRecord>,
    ) -> Result<Vec<LinkRecord>, DispatchError> {
        if self.validators.is_empty() {
            return Err(DispatchError::NoValidators);
        }

        let total = records.len();
        let mut processed = 0;
        let mut failures = Vec::new();
        let mut results = Vec::with_capacity(total);

        for record in records {
            let Some(validator) = self.authority(&record.target) else {
                tracing::debug!("no validator claims {}", record.target);
                continue;
            };

            match validator.check(ctx, &record.source, &record.target).await {
                Ok(verdict) => {
                    tracing::debug!(
                        validator = validator.name(),
                        valid = verdict.valid,
                        "{} in {}",
                        record.target,
                        record.source.display()
                    );
                    results.push(record.annotate(verdict));
                }
                Err(error) => {
                    tracing::warn!("{} failed on {}: {}", validator.name(), record.target, error);
                    failures.push(DispatchFailure {
                        source: record.source,
                        target: record.target,
                        error,
                    });
                }
            }

            processed += 1;
            tracing::info!("{} of {} entries processed", processed, total);
        }

        if failures.is_empty() {
            Ok(results)
        } else {
            Err(DispatchError::Failures(failures))
        }
    }

    // Lets every validator release what it holds (the browser, mostly).
    // Every validator gets closed even if an earlier one fails.
    pub async fn close(&self) -> Vec<(&'static str, CheckError)> {
        let mut failures = Vec::new();
        for validator in &self.validators {
            if let Err(error) = validator.close().await {
                failures.push((validator.name(), error));
            }
        }
        failures
    }
}
