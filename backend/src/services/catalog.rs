//! Catalog resolver: turns free-text supplier/product names into canonical
//! cross-tenant (market) and tenant-scoped (master) records, creating them
//! on first sight.

use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{
    MarketMasterArticle, MarketSupplier, MasterArticle, Supplier, SupplierBlock, SupplierLabel,
};

use crate::config::CatalogConfig;
use crate::error::{AppError, AppResult};
use crate::store::{Query, Store};

/// Catalog resolver over the persistence collaborator
#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
    supplier_pattern: Regex,
    product_pattern: Regex,
}

impl<S: Store + Clone> CatalogService<S> {
    pub fn new(store: S) -> Self {
        // Default patterns are compiled from constants and cannot fail
        Self::from_config(store, &CatalogConfig::default()).expect("default catalog patterns")
    }

    pub fn from_config(store: S, config: &CatalogConfig) -> AppResult<Self> {
        let supplier_pattern = Regex::new(&config.supplier_name_pattern)
            .map_err(|e| AppError::Configuration(format!("supplier name pattern: {}", e)))?;
        let product_pattern = Regex::new(&config.product_name_pattern)
            .map_err(|e| AppError::Configuration(format!("product name pattern: {}", e)))?;
        Ok(Self {
            store,
            supplier_pattern,
            product_pattern,
        })
    }

    /// Clean a raw supplier name with the stored pattern
    pub fn clean_supplier_name(&self, raw: &str) -> String {
        clean(&self.supplier_pattern, raw)
    }

    /// Clean a raw product name with the stored pattern
    pub fn clean_product_name(&self, raw: &str) -> String {
        clean(&self.product_pattern, raw)
    }

    /// Resolve a market supplier by cleaned name, creating it on first sight
    pub async fn resolve_market_supplier(
        &self,
        raw_name: &str,
        label: SupplierLabel,
    ) -> AppResult<MarketSupplier> {
        let name = self.clean_supplier_name(raw_name);
        if name.is_empty() {
            return Err(AppError::validation("supplier name is empty after cleaning"));
        }

        let existing: Vec<MarketSupplier> = self.store.get_all(Query::new()).await?;
        if let Some(found) = existing
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(&name))
        {
            return Ok(found);
        }

        tracing::info!(supplier = %name, "creating market supplier");
        self.store
            .create(MarketSupplier {
                id: Uuid::new_v4(),
                name,
                label,
                created_at: Utc::now(),
            })
            .await
            .map_err(Into::into)
    }

    /// Resolve the tenant-scoped alias of a market supplier, creating it on
    /// first sight from the payload's supplier block
    pub async fn resolve_supplier(
        &self,
        establishment_id: Uuid,
        market_supplier: &MarketSupplier,
        block: &SupplierBlock,
    ) -> AppResult<Supplier> {
        let existing: Vec<Supplier> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", establishment_id)
                    .eq("market_supplier_id", market_supplier.id),
            )
            .await?;
        if let Some(found) = existing.into_iter().next() {
            return Ok(found);
        }

        self.store
            .create(Supplier {
                id: Uuid::new_v4(),
                establishment_id,
                market_supplier_id: market_supplier.id,
                name: market_supplier.name.clone(),
                label: market_supplier.label,
                siret: block.siret.clone(),
                vat_number: block.vat_number.clone(),
                emails: block.emails.clone(),
                phones: block.phones.clone(),
                address: block.address.clone(),
                created_at: Utc::now(),
            })
            .await
            .map_err(Into::into)
    }

    /// Resolve a market master article under a market supplier by cleaned
    /// name, creating it on first sight
    pub async fn resolve_market_master_article(
        &self,
        market_supplier_id: Uuid,
        raw_name: &str,
        unit: &str,
        unit_price: Decimal,
    ) -> AppResult<MarketMasterArticle> {
        let name = self.clean_product_name(raw_name);
        if name.is_empty() {
            return Err(AppError::validation("product name is empty after cleaning"));
        }

        let existing: Vec<MarketMasterArticle> = self
            .store
            .get_all(Query::new().eq("market_supplier_id", market_supplier_id))
            .await?;
        if let Some(found) = existing
            .into_iter()
            .find(|a| a.name.eq_ignore_ascii_case(&name))
        {
            return Ok(found);
        }

        self.store
            .create(MarketMasterArticle {
                id: Uuid::new_v4(),
                market_supplier_id,
                name,
                unit: unit.to_string(),
                current_unit_price: unit_price,
                created_at: Utc::now(),
            })
            .await
            .map_err(Into::into)
    }

    /// Resolve the tenant-scoped master article aliasing a market master
    /// article, creating it on first sight
    pub async fn resolve_master_article(
        &self,
        establishment_id: Uuid,
        supplier_id: Uuid,
        market_master_article: &MarketMasterArticle,
        unit_price: Decimal,
    ) -> AppResult<MasterArticle> {
        let existing: Vec<MasterArticle> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", establishment_id)
                    .eq("market_master_article_id", market_master_article.id),
            )
            .await?;
        if let Some(found) = existing.into_iter().next() {
            return Ok(found);
        }

        tracing::debug!(article = %market_master_article.name, "creating master article");
        self.store
            .create(MasterArticle {
                id: Uuid::new_v4(),
                establishment_id,
                supplier_id,
                market_master_article_id: market_master_article.id,
                name: market_master_article.name.clone(),
                unit: market_master_article.unit.clone(),
                current_unit_price: unit_price,
                created_at: Utc::now(),
            })
            .await
            .map_err(Into::into)
    }
}

/// Strip the stored pattern, collapse whitespace, trim
fn clean(pattern: &Regex, raw: &str) -> String {
    let stripped = pattern.replace_all(raw, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
