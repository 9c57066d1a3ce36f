//! Managed disk prices.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{
    CATEGORY_STORAGE, CatalogImporter, ImportEnv, fetch_document, prepare_document,
    storage_price_code,
};
use crate::catalog::{DiskOffer, ManagedDiskCatalog, ValueWrapper};
use crate::context::RunContext;
use crate::cost::{Cost, round3};
use crate::decoder::{DiskRole, disk_rules};
use crate::error::CatalogResult;
use crate::models::{Rate, StorageOptimized, StorageType};
use crate::purge::purge_stale;
use crate::resolver::resolve_region;
use crate::upsert::{upsert_entity, upsert_price};

pub const DISK_PATH: &str = "/managed-disks/calculator/";

const TRANSACTIONS_OFFER: &str = "transactions";
/// Published per 10,000 transactions, stored per million.
const TRANSACTION_SCALE: f64 = 100.0;
const STANDARD_IOPS: u32 = 500;
const STANDARD_THROUGHPUT: u32 = 60;

pub struct DiskImporter;

#[async_trait]
impl CatalogImporter for DiskImporter {
    fn name(&self) -> &'static str {
        CATEGORY_STORAGE
    }

    #[instrument(skip_all, fields(namespace = %context.namespace))]
    async fn install(&self, env: &ImportEnv<'_>, context: &mut RunContext) -> CatalogResult<()> {
        let store = env.store;
        let namespace = context.namespace.clone();
        context.storage_types.ensure_loaded(store, &namespace).await?;
        context.storage_prices.ensure_loaded(store, &namespace).await?;

        let catalog: ManagedDiskCatalog = fetch_document(env, DISK_PATH).await?;
        prepare_document(env, context, &catalog.document).await?;
        let offers: BTreeMap<String, DiskOffer> = catalog.document.decode_offers();
        let transactions = offers
            .get(TRANSACTIONS_OFFER)
            .map(|offer| offer.prices.clone())
            .unwrap_or_default();

        let rules = disk_rules()?;
        for (offer_id, offer) in &offers {
            let (code, premium) = match rules.decode(offer_id) {
                Some(DiskRole::Snapshot { code }) => {
                    upsert_entity(
                        &mut context.storage_types,
                        &code,
                        merge_snapshot_type,
                        store,
                        &namespace,
                        context.force,
                    )
                    .await?;
                    (code, offer_id.starts_with("premium"))
                }
                Some(DiskRole::Disk {
                    code,
                    premium,
                    standard,
                }) => {
                    upsert_entity(
                        &mut context.storage_types,
                        &code,
                        |t| merge_disk_type(t, offer, premium, standard),
                        store,
                        &namespace,
                        context.force,
                    )
                    .await?;
                    (code, premium)
                }
                Some(DiskRole::Transactions) | Some(DiskRole::Ignored) | None => {
                    debug!(offer = %offer_id, "Skipped disk offer");
                    continue;
                }
            };
            install_disk_prices(env, context, &code, premium, offer, &transactions).await?;
        }

        let purged = purge_stale(&mut context.storage_prices, store, &namespace).await?;
        context.stats_mut(CATEGORY_STORAGE).purged += purged;
        info!(
            prices = context.storage_prices.len(),
            types = context.storage_types.len(),
            "Storage import finished"
        );
        Ok(())
    }
}

async fn install_disk_prices(
    env: &ImportEnv<'_>,
    context: &mut RunContext,
    type_code: &str,
    premium: bool,
    offer: &DiskOffer,
    transactions: &BTreeMap<String, ValueWrapper>,
) -> CatalogResult<()> {
    for (region, value) in &offer.prices {
        if !context.patterns.is_enabled_region(region) {
            continue;
        }
        resolve_region(context, env.store, env.reference, region).await?;
        let mut cost = Cost::monthly(value.value, 0);
        if !premium {
            let transaction = transactions
                .get(region)
                .map_or(0.0, |t| round3(t.value * TRANSACTION_SCALE));
            cost = cost.with_transaction(transaction);
        }
        let outcome = upsert_price(
            &mut context.storage_prices,
            &storage_price_code(region, type_code),
            |p| {
                p.region = region.clone();
                p.type_code = type_code.to_string();
            },
            &cost,
            env.store,
            &context.namespace,
            context.force,
        )
        .await?;
        context.stats_mut(CATEGORY_STORAGE).record(outcome);
    }
    Ok(())
}

fn merge_snapshot_type(storage_type: &mut StorageType) {
    storage_type.name = storage_type.code.clone();
    storage_type.latency = Some(Rate::Worst);
    storage_type.minimal = 0.0;
    storage_type.optimized = Some(StorageOptimized::Durability);
    storage_type.iops = 0;
    storage_type.throughput = 0;
}

fn merge_disk_type(storage_type: &mut StorageType, disk: &DiskOffer, premium: bool, standard: bool) {
    storage_type.name = storage_type.code.clone();
    storage_type.latency = Some(if premium { Rate::Best } else { Rate::Medium });
    storage_type.minimal = disk.size;
    storage_type.maximal = Some(disk.size);
    storage_type.optimized = premium.then_some(StorageOptimized::Iops);
    storage_type.instance_type = Some("%".to_string());
    storage_type.iops = if standard && disk.iops == 0 {
        STANDARD_IOPS
    } else {
        disk.iops
    };
    storage_type.throughput = if standard && disk.throughput == 0 {
        STANDARD_THROUGHPUT
    } else {
        disk.throughput
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(size: f64, iops: u32, throughput: u32) -> DiskOffer {
        DiskOffer {
            size,
            iops,
            throughput,
            ..DiskOffer::default()
        }
    }

    #[test]
    fn test_standard_disk_defaults() {
        let mut storage_type = StorageType {
            code: "s4".to_string(),
            ..StorageType::default()
        };
        merge_disk_type(&mut storage_type, &disk(32.0, 0, 0), false, true);
        assert_eq!(storage_type.iops, 500);
        assert_eq!(storage_type.throughput, 60);
        assert_eq!(storage_type.latency, Some(Rate::Medium));
        assert_eq!(storage_type.optimized, None);
        assert_eq!(storage_type.maximal, Some(32.0));
        assert_eq!(storage_type.instance_type.as_deref(), Some("%"));
    }

    #[test]
    fn test_premium_disk() {
        let mut storage_type = StorageType {
            code: "p10".to_string(),
            ..StorageType::default()
        };
        merge_disk_type(&mut storage_type, &disk(128.0, 500, 100), true, false);
        assert_eq!(storage_type.latency, Some(Rate::Best));
        assert_eq!(storage_type.optimized, Some(StorageOptimized::Iops));
        assert_eq!(storage_type.minimal, 128.0);
        assert_eq!(storage_type.throughput, 100);
    }

    #[test]
    fn test_snapshot_type() {
        let mut storage_type = StorageType {
            code: "standardhdd-snapshot".to_string(),
            iops: 10,
            ..StorageType::default()
        };
        merge_snapshot_type(&mut storage_type);
        assert_eq!(storage_type.name, "standardhdd-snapshot");
        assert_eq!(storage_type.latency, Some(Rate::Worst));
        assert_eq!(storage_type.optimized, Some(StorageOptimized::Durability));
        assert_eq!(storage_type.iops, 0);
    }
}
