//! Supplier merge engine: folds N source market suppliers into one target,
//! deduplicating canonical products across and within tenants.
//!
//! Two-phase, remap-before-delete. Phase one works the market layer:
//! same-named products move their aliases onto the target's product and
//! disappear, distinct products are re-parented. Phase two works each
//! touched tenant: supplier aliases and master articles are merged by the
//! same duplicate-name rule, and every ingredient, ledger entry, financial
//! row and invoice referencing a merged record is remapped to its survivor.
//! Variations pointing at a removed product are soft-deleted so the audit
//! trail survives. Total recorded purchase value is conserved: purchase
//! observations are only ever remapped, never dropped.

use std::collections::HashSet;

use uuid::Uuid;

use shared::models::{
    FinancialIngredient, Ingredient, IngredientHistory, Invoice, MarketMasterArticle,
    MarketSupplier, MasterArticle, MergeRequest, MergeStatus, Supplier, Variation,
};

use crate::error::{AppError, AppResult};
use crate::store::{Query, Store};

/// What one merge run touched
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub merged_market_articles: usize,
    pub merged_master_articles: usize,
    pub merged_suppliers: usize,
    pub soft_deleted_variations: usize,
}

/// Supplier merge engine
#[derive(Clone)]
pub struct MergeService<S> {
    store: S,
}

impl<S: Store + Clone> MergeService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Execute an accepted merge request
    pub async fn execute(&self, request_id: Uuid) -> AppResult<MergeOutcome> {
        let request: MergeRequest = self
            .store
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("MergeRequest"))?;

        if request.status != MergeStatus::Accepted {
            return Err(AppError::validation(format!(
                "merge request {} is not accepted",
                request.id
            )));
        }

        let target: MarketSupplier = self
            .store
            .get_by_id(request.target_market_supplier_id)
            .await?
            .ok_or_else(|| AppError::not_found("MarketSupplier"))?;

        let mut outcome = MergeOutcome::default();

        for source_id in &request.source_market_supplier_ids {
            if *source_id == target.id {
                continue;
            }
            let source: MarketSupplier = self
                .store
                .get_by_id(*source_id)
                .await?
                .ok_or_else(|| AppError::not_found("MarketSupplier"))?;

            self.merge_market_layer(&source, &target, &mut outcome).await?;
            self.merge_tenant_layer(&source, &target, &mut outcome).await?;

            self.store.delete::<MarketSupplier>(source.id).await?;
            tracing::info!(source = %source.name, target = %target.name, "market supplier merged");
        }

        let mut done = request;
        done.status = MergeStatus::Completed;
        self.store.update(done).await?;
        Ok(outcome)
    }

    /// Phase one: canonical products under the source supplier
    async fn merge_market_layer(
        &self,
        source: &MarketSupplier,
        target: &MarketSupplier,
        outcome: &mut MergeOutcome,
    ) -> AppResult<()> {
        let target_products: Vec<MarketMasterArticle> = self
            .store
            .get_all(Query::new().eq("market_supplier_id", target.id))
            .await?;
        let source_products: Vec<MarketMasterArticle> = self
            .store
            .get_all(Query::new().eq("market_supplier_id", source.id))
            .await?;

        for product in source_products {
            match find_by_name(&target_products, &product.name) {
                Some(survivor) => {
                    // Same-named product already under the target: re-point
                    // the tenant aliases and drop the duplicate
                    let aliases: Vec<MasterArticle> = self
                        .store
                        .get_all(Query::new().eq("market_master_article_id", product.id))
                        .await?;
                    for mut alias in aliases {
                        alias.market_master_article_id = survivor.id;
                        self.store
                            .update(alias)
                            .await?
                            .ok_or_else(|| AppError::not_found("MasterArticle"))?;
                    }
                    self.store.delete::<MarketMasterArticle>(product.id).await?;
                    outcome.merged_market_articles += 1;
                }
                None => {
                    let mut moved = product;
                    moved.market_supplier_id = target.id;
                    self.store
                        .update(moved)
                        .await?
                        .ok_or_else(|| AppError::not_found("MarketMasterArticle"))?;
                }
            }
        }
        Ok(())
    }

    /// Phase two: tenant-scoped suppliers and master articles
    async fn merge_tenant_layer(
        &self,
        source: &MarketSupplier,
        target: &MarketSupplier,
        outcome: &mut MergeOutcome,
    ) -> AppResult<()> {
        let source_aliases: Vec<Supplier> = self
            .store
            .get_all(Query::new().eq("market_supplier_id", source.id))
            .await?;

        let establishments: HashSet<Uuid> = source_aliases
            .iter()
            .map(|s| s.establishment_id)
            .collect();

        for establishment_id in establishments {
            let merged: Vec<Supplier> = source_aliases
                .iter()
                .filter(|s| s.establishment_id == establishment_id)
                .cloned()
                .collect();

            let target_alias: Option<Supplier> = self
                .store
                .get_all(
                    Query::new()
                        .eq("establishment_id", establishment_id)
                        .eq("market_supplier_id", target.id),
                )
                .await?
                .into_iter()
                .next();

            match target_alias {
                Some(survivor) => {
                    for supplier in merged {
                        self.fold_supplier(&supplier, &survivor, outcome).await?;
                    }
                }
                None => {
                    // No alias of the target in this tenant yet: the source
                    // alias survives, re-pointed at the target
                    for mut supplier in merged {
                        supplier.market_supplier_id = target.id;
                        self.store
                            .update(supplier)
                            .await?
                            .ok_or_else(|| AppError::not_found("Supplier"))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Fold one tenant supplier into the surviving alias, merging same-named
    /// master articles and remapping everything that referenced them
    async fn fold_supplier(
        &self,
        merged: &Supplier,
        survivor: &Supplier,
        outcome: &mut MergeOutcome,
    ) -> AppResult<()> {
        let survivor_articles: Vec<MasterArticle> = self
            .store
            .get_all(Query::new().eq("supplier_id", survivor.id))
            .await?;
        let merged_articles: Vec<MasterArticle> = self
            .store
            .get_all(Query::new().eq("supplier_id", merged.id))
            .await?;

        for article in merged_articles {
            match find_by_name(&survivor_articles, &article.name) {
                Some(surviving_article) => {
                    self.remap_master_article(article.id, surviving_article.id)
                        .await?;
                    self.store.delete::<MasterArticle>(article.id).await?;
                    outcome.merged_master_articles += 1;
                    outcome.soft_deleted_variations +=
                        self.soft_delete_variations(article.id).await?;
                }
                None => {
                    let mut moved = article;
                    moved.supplier_id = survivor.id;
                    self.store
                        .update(moved)
                        .await?
                        .ok_or_else(|| AppError::not_found("MasterArticle"))?;
                }
            }
        }

        // Invoices follow the surviving supplier
        let invoices: Vec<Invoice> = self
            .store
            .get_all(Query::new().eq("supplier_id", merged.id))
            .await?;
        for mut invoice in invoices {
            invoice.supplier_id = survivor.id;
            self.store
                .update(invoice)
                .await?
                .ok_or_else(|| AppError::not_found("Invoice"))?;
        }

        self.store.delete::<Supplier>(merged.id).await?;
        outcome.merged_suppliers += 1;
        Ok(())
    }

    /// Re-point every purchase observation, ingredient, ledger entry and
    /// financial row from a removed master article to its survivor
    async fn remap_master_article(&self, from: Uuid, to: Uuid) -> AppResult<()> {
        let articles: Vec<shared::models::Article> = self
            .store
            .get_all(Query::new().eq("master_article_id", from))
            .await?;
        for mut article in articles {
            article.master_article_id = to;
            self.store
                .update(article)
                .await?
                .ok_or_else(|| AppError::not_found("Article"))?;
        }

        let ingredients: Vec<Ingredient> = self
            .store
            .get_all(Query::new().eq("variant", "ARTICLE").eq("master_article_id", from))
            .await?;
        for mut ingredient in ingredients {
            ingredient.kind = shared::models::IngredientKind::Article {
                master_article_id: to,
            };
            self.store
                .update(ingredient)
                .await?
                .ok_or_else(|| AppError::not_found("Ingredient"))?;
        }

        let histories: Vec<IngredientHistory> = self
            .store
            .get_all(Query::new().eq("master_article_id", from))
            .await?;
        for mut entry in histories {
            entry.master_article_id = Some(to);
            self.store
                .update(entry)
                .await?
                .ok_or_else(|| AppError::not_found("IngredientHistory"))?;
        }

        let financials: Vec<FinancialIngredient> = self
            .store
            .get_all(Query::new().eq("master_article_id", from))
            .await?;
        for mut row in financials {
            row.master_article_id = Some(to);
            self.store
                .update(row)
                .await?
                .ok_or_else(|| AppError::not_found("FinancialIngredient"))?;
        }

        Ok(())
    }

    /// Soft-delete the variations of a removed master article
    async fn soft_delete_variations(&self, master_article_id: Uuid) -> AppResult<usize> {
        let variations: Vec<Variation> = self
            .store
            .get_all(Query::new().eq("master_article_id", master_article_id))
            .await?;
        let mut count = 0;
        for mut variation in variations {
            if variation.deleted {
                continue;
            }
            variation.deleted = true;
            self.store
                .update(variation)
                .await?
                .ok_or_else(|| AppError::not_found("Variation"))?;
            count += 1;
        }
        Ok(count)
    }
}

/// Case-insensitive name lookup on trimmed names
fn find_by_name<'a, T: Named>(candidates: &'a [T], name: &str) -> Option<&'a T> {
    let key = name.trim();
    candidates
        .iter()
        .find(|c| c.name().trim().eq_ignore_ascii_case(key))
}

trait Named {
    fn name(&self) -> &str;
}

impl Named for MarketMasterArticle {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for MasterArticle {
    fn name(&self) -> &str {
        &self.name
    }
}
