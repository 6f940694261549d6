//! Refresh of a single (provider, service) pair.

use std::iter;

use cloudinfo_provider::{InstanceType, PriceModel, Region, Zone};
use futures::stream::{self, StreamExt};
use log::{debug, warn};

use crate::errors::FetchFailure;
use crate::fetch::{FetchTarget, KeyFetcher};
use crate::store::StoreKey;

/// Keys written by a refresh and the first real failure it hit.
#[derive(Default)]
struct Tally {
    written: usize,
    first_error: Option<FetchFailure>,
}

impl Tally {
    fn absorb(&mut self, failure: FetchFailure) {
        if failure.is_absent() {
            debug!("Skipping absent entry: {}", failure);
            return;
        }
        if self.first_error.is_none() {
            self.first_error = Some(failure);
        }
    }

    fn merge(&mut self, result: Result<usize, FetchFailure>) {
        match result {
            Ok(written) => self.written += written,
            Err(failure) => self.absorb(failure),
        }
    }

    fn finish(self) -> Result<usize, FetchFailure> {
        match self.first_error {
            Some(failure) => Err(failure),
            None => Ok(self.written),
        }
    }
}

/// Walks one service of one provider: regions, then zones and instance
/// types per region, then attributes and prices per instance type.
///
/// Sibling fetches keep running after one of them fails; the first failure
/// is what the refresh reports.
pub(crate) struct ServiceScraper {
    fetcher: KeyFetcher,
}

impl ServiceScraper {
    pub fn new(fetcher: KeyFetcher) -> Self {
        Self { fetcher }
    }

    fn ceiling(&self, provider: &str) -> usize {
        self.fetcher
            .registry()
            .limits(provider)
            .map(|limits| limits.max_concurrency.max(1))
            .unwrap_or(1)
    }

    pub async fn scrape(&self, provider: &str, service: &str) -> Result<usize, FetchFailure> {
        let (regions, _) = self
            .fetcher
            .refresh_as::<Vec<Region>>(&FetchTarget::regions(provider, service))
            .await?;

        let mut tally = Tally {
            written: 1,
            ..Tally::default()
        };
        let results: Vec<_> = stream::iter(regions.into_iter().map(|region| region.id))
            .map(|region| async move { self.scrape_region(provider, service, &region).await })
            .buffer_unordered(self.ceiling(provider))
            .collect()
            .await;
        for result in results {
            tally.merge(result);
        }

        tally.finish()
    }

    async fn scrape_region(
        &self,
        provider: &str,
        service: &str,
        region: &str,
    ) -> Result<usize, FetchFailure> {
        let zones_target = FetchTarget::zones(provider, service, region);
        let types_target = FetchTarget::instance_types(provider, service, region);
        let (zones, types) = futures::join!(
            self.fetcher.refresh_as::<Vec<Zone>>(&zones_target),
            self.fetcher.refresh_as::<Vec<InstanceType>>(&types_target),
        );

        let mut tally = Tally::default();
        let zones = match zones {
            Ok((zones, _)) => {
                tally.written += 1;
                zones
            }
            Err(failure) => {
                tally.absorb(failure);
                Vec::new()
            }
        };
        let (types, listed_at) = match types {
            Ok(listing) => {
                tally.written += 1;
                listing
            }
            Err(failure) => {
                tally.absorb(failure);
                return tally.finish();
            }
        };

        // Attributes come with the listing; no extra provider calls.
        for instance_type in &types {
            let key = StoreKey::attributes(provider, service, region, &instance_type.name);
            match self
                .fetcher
                .store_derived(&key, &instance_type.attributes, listed_at)
                .await
            {
                Ok(outcome) if outcome.is_applied() => tally.written += 1,
                Ok(_) => {}
                Err(e) => warn!("Failed to store {}: {}", key, e),
            }
        }

        let targets: Vec<FetchTarget> = types
            .iter()
            .flat_map(|instance_type| {
                let name = instance_type.name.as_str();
                iter::once(FetchTarget::price(
                    provider,
                    service,
                    region,
                    None,
                    name,
                    PriceModel::OnDemand,
                ))
                .chain(zones.iter().map(move |zone| {
                    FetchTarget::price(
                        provider,
                        service,
                        region,
                        Some(&zone.id),
                        name,
                        PriceModel::Spot,
                    )
                }))
            })
            .collect();

        let prices: Vec<_> = stream::iter(targets)
            .map(|target| {
                let fetcher = self.fetcher.clone();
                async move { fetcher.refresh(&target).await }
            })
            .buffer_unordered(self.ceiling(provider))
            .collect()
            .await;
        for price in prices {
            tally.merge(price.map(|_| 1));
        }

        tally.finish()
    }
}
