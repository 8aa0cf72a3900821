//! Invoice import orchestrator.
//!
//! Drives one `ImportJob` from its structured payload to a terminal state:
//! supplier/product resolution, invoice upsert, blended purchase
//! observations, import-triggered ledger writes with cost propagation, and
//! price-variation detection with best-effort alerting.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{
    Article, Establishment, ImportJob, Ingredient, Invoice, InvoicePayload, JobStatus,
    MarketMasterArticle, MasterArticle, SupplierLabel, Trigger, Variation,
};
use shared::validation::validate_invoice_payload;

use crate::error::{AppError, AppResult};
use crate::events::DomainEvent;
use crate::external::AlertDispatcher;
use crate::store::{Direction, Query, Store};

use super::catalog::CatalogService;
use super::propagation::{DirtyIngredient, PropagationContext, PropagationService};

/// What one import run produced
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub invoice_id: Option<Uuid>,
    pub articles_written: usize,
    pub recipes_recomputed: Vec<Uuid>,
    pub events: Vec<DomainEvent>,
}

/// One blended purchase observation in the making
struct BlendedLine {
    master_article: MasterArticle,
    market_master_article_id: Uuid,
    quantity: Decimal,
    amount: Decimal,
    discounts: Decimal,
    duties_and_taxes: Decimal,
}

/// Invoice import orchestrator
#[derive(Clone)]
pub struct ImportService<S> {
    store: S,
    catalog: CatalogService<S>,
    propagation: PropagationService<S>,
    alerts: AlertDispatcher,
}

impl<S: Store + Clone> ImportService<S> {
    pub fn new(
        store: S,
        catalog: CatalogService<S>,
        propagation: PropagationService<S>,
        alerts: AlertDispatcher,
    ) -> Self {
        Self {
            store,
            catalog,
            propagation,
            alerts,
        }
    }

    /// Run one pending job to a terminal state.
    ///
    /// The inner pipeline issues independent persistence calls with no
    /// cross-step transaction; a mid-pipeline failure leaves already-written
    /// rows in place, the job is marked `error` and the failure is returned.
    pub async fn run_job(&self, job_id: Uuid) -> AppResult<ImportOutcome> {
        let job: ImportJob = self
            .store
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::not_found("ImportJob"))?;

        if job.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "import job {} is already {}",
                job.id,
                job.status.as_str()
            )));
        }

        tracing::info!(job = %job.id, establishment = %job.establishment_id, "running import job");

        match self.execute(&job).await {
            Ok(outcome) => {
                let mut done = job;
                done.status = JobStatus::Completed;
                done.error_message = None;
                self.store.update(done).await?;
                Ok(outcome)
            }
            Err(err) => {
                // Surface the failure as the job's terminal state; losing
                // the status write must not mask the original error
                let mut failed = job;
                failed.status = JobStatus::Error;
                failed.error_message = Some(err.to_string());
                if let Err(update_err) = self.store.update(failed).await {
                    tracing::error!(error = %update_err, "failed to mark import job as errored");
                }
                Err(err)
            }
        }
    }

    async fn execute(&self, job: &ImportJob) -> AppResult<ImportOutcome> {
        let payload = &job.payload;
        validate_invoice_payload(payload).map_err(AppError::validation)?;

        let establishment: Establishment = self
            .store
            .get_by_id(job.establishment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Establishment"))?;

        // Supplier resolution: market entry + tenant alias
        let label = payload.supplier.label.unwrap_or(SupplierLabel::Food);
        let market_supplier = self
            .catalog
            .resolve_market_supplier(&payload.supplier.raw_name, label)
            .await?;
        let supplier = self
            .catalog
            .resolve_supplier(establishment.id, &market_supplier, &payload.supplier)
            .await?;

        let invoice = self.resolve_invoice(job, &supplier.id, payload).await?;

        // Resolve every line, blending lines that share a master article
        // into one quantity-weighted observation
        let mut blended: HashMap<Uuid, BlendedLine> = HashMap::new();
        for line in &payload.lines {
            let market_article = self
                .catalog
                .resolve_market_master_article(
                    market_supplier.id,
                    &line.product_name,
                    &line.unit,
                    line.unit_price_excl_tax,
                )
                .await?;
            let master_article = self
                .catalog
                .resolve_master_article(
                    establishment.id,
                    supplier.id,
                    &market_article,
                    line.unit_price_excl_tax,
                )
                .await?;

            let entry = blended
                .entry(master_article.id)
                .or_insert_with(|| BlendedLine {
                    master_article,
                    market_master_article_id: market_article.id,
                    quantity: Decimal::ZERO,
                    amount: Decimal::ZERO,
                    discounts: Decimal::ZERO,
                    duties_and_taxes: Decimal::ZERO,
                });
            entry.quantity += line.quantity;
            entry.amount += line.quantity * line.unit_price_excl_tax;
            entry.discounts += line.discounts.unwrap_or(Decimal::ZERO);
            entry.duties_and_taxes += line.duties_and_taxes.unwrap_or(Decimal::ZERO);
        }

        let mut outcome = ImportOutcome {
            invoice_id: Some(invoice.id),
            ..Default::default()
        };
        let mut dirty: Vec<DirtyIngredient> = Vec::new();

        for (master_article_id, line) in blended {
            let blended_price = if line.quantity.is_zero() {
                Decimal::ZERO
            } else {
                line.amount / line.quantity
            };

            // Baseline for the variation: the observation immediately
            // preceding the invoice date; a first-ever purchase has nothing
            // to vary against
            let previous_price = self.price_before(master_article_id, invoice.date).await?;

            let article = self
                .upsert_article(&invoice, &line, blended_price)
                .await?;
            outcome.articles_written += 1;

            self.refresh_price_caches(&line, blended_price).await?;

            // Ledger + propagation for every ingredient using this article
            let referencing: Vec<Ingredient> = self
                .store
                .get_all(
                    Query::new()
                        .eq("establishment_id", establishment.id)
                        .eq("variant", "ARTICLE")
                        .eq("master_article_id", master_article_id),
                )
                .await?;
            for ingredient in referencing {
                dirty.push(DirtyIngredient {
                    ingredient_id: ingredient.id,
                    gross_unit_price: Some(blended_price),
                    source_article_id: Some(article.id),
                });
            }

            if let Some(previous_price) = previous_price {
                if previous_price != blended_price {
                    let event = self
                        .record_variation(
                            &establishment,
                            &line.master_article,
                            invoice.date,
                            previous_price,
                            blended_price,
                            market_supplier.label,
                        )
                        .await?;
                    outcome.events.push(event);
                }
            }
        }

        let ctx = PropagationContext {
            trigger: Trigger::Import,
            date: invoice.date,
            invoice_id: Some(invoice.id),
        };
        let propagation = self.propagation.propagate_ingredients(dirty, &ctx).await?;
        outcome.recipes_recomputed = propagation.recipes_recomputed;

        // Best-effort alerting: gated on the establishment's configuration,
        // failures logged inside the dispatcher
        for event in &outcome.events {
            self.alerts.dispatch(&establishment, event).await;
        }

        tracing::info!(
            invoice = %invoice.id,
            articles = outcome.articles_written,
            recipes = outcome.recipes_recomputed.len(),
            "import completed"
        );
        Ok(outcome)
    }

    /// Resolve the invoice by natural key, updating totals when it exists
    async fn resolve_invoice(
        &self,
        job: &ImportJob,
        supplier_id: &Uuid,
        payload: &InvoicePayload,
    ) -> AppResult<Invoice> {
        let existing: Vec<Invoice> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", job.establishment_id)
                    .eq("supplier_id", *supplier_id)
                    .eq("invoice_number", payload.invoice.invoice_number.clone()),
            )
            .await?;

        if let Some(mut invoice) = existing.into_iter().next() {
            invoice.date = payload.invoice.invoice_date;
            invoice.total_excl_tax = payload.invoice.total_excl_tax;
            invoice.total_incl_tax = payload.invoice.total_incl_tax;
            invoice.total_vat = payload.invoice.total_vat;
            return self
                .store
                .update(invoice)
                .await?
                .ok_or_else(|| AppError::not_found("Invoice"));
        }

        self.store
            .create(Invoice {
                id: Uuid::new_v4(),
                establishment_id: job.establishment_id,
                supplier_id: *supplier_id,
                invoice_number: payload.invoice.invoice_number.clone(),
                date: payload.invoice.invoice_date,
                total_excl_tax: payload.invoice.total_excl_tax,
                total_incl_tax: payload.invoice.total_incl_tax,
                total_vat: payload.invoice.total_vat,
                created_at: Utc::now(),
            })
            .await
            .map_err(Into::into)
    }

    /// Latest observed unit price strictly before a date
    async fn price_before(
        &self,
        master_article_id: Uuid,
        date: chrono::NaiveDate,
    ) -> AppResult<Option<Decimal>> {
        let Some(cutoff) = date.pred_opt() else {
            return Ok(None);
        };
        let previous: Vec<Article> = self
            .store
            .get_all(
                Query::new()
                    .eq("master_article_id", master_article_id)
                    .lte("date", cutoff)
                    .order_by("date", Direction::Desc)
                    .limit(1),
            )
            .await?;
        Ok(previous.into_iter().next().map(|a| a.unit_price))
    }

    /// One article per (master article, invoice): re-imports overwrite the
    /// existing observation instead of stacking a duplicate fact
    async fn upsert_article(
        &self,
        invoice: &Invoice,
        line: &BlendedLine,
        blended_price: Decimal,
    ) -> AppResult<Article> {
        let total = Article::compute_total(
            line.quantity,
            blended_price,
            line.discounts,
            line.duties_and_taxes,
        );

        let existing: Vec<Article> = self
            .store
            .get_all(
                Query::new()
                    .eq("invoice_id", invoice.id)
                    .eq("master_article_id", line.master_article.id),
            )
            .await?;

        if let Some(mut article) = existing.into_iter().next() {
            article.date = invoice.date;
            article.quantity = line.quantity;
            article.unit_price = blended_price;
            article.discounts = line.discounts;
            article.duties_and_taxes = line.duties_and_taxes;
            article.total = total;
            return self
                .store
                .update(article)
                .await?
                .ok_or_else(|| AppError::not_found("Article"));
        }

        self.store
            .create(Article {
                id: Uuid::new_v4(),
                establishment_id: invoice.establishment_id,
                master_article_id: line.master_article.id,
                invoice_id: invoice.id,
                date: invoice.date,
                quantity: line.quantity,
                unit_price: blended_price,
                discounts: line.discounts,
                duties_and_taxes: line.duties_and_taxes,
                total,
                created_at: Utc::now(),
            })
            .await
            .map_err(Into::into)
    }

    /// Refresh the tenant and market unit-price caches
    async fn refresh_price_caches(
        &self,
        line: &BlendedLine,
        blended_price: Decimal,
    ) -> AppResult<()> {
        let mut master = line.master_article.clone();
        master.current_unit_price = blended_price;
        self.store
            .update(master)
            .await?
            .ok_or_else(|| AppError::not_found("MasterArticle"))?;

        let market: Option<MarketMasterArticle> = self
            .store
            .get_by_id(line.market_master_article_id)
            .await?;
        if let Some(mut market) = market {
            market.current_unit_price = blended_price;
            self.store.update(market).await?;
        }
        Ok(())
    }

    /// Write the variation row and build the corresponding event
    async fn record_variation(
        &self,
        establishment: &Establishment,
        master_article: &MasterArticle,
        date: chrono::NaiveDate,
        old_unit_price: Decimal,
        new_unit_price: Decimal,
        supplier_label: SupplierLabel,
    ) -> AppResult<DomainEvent> {
        let percentage = Variation::percentage_between(old_unit_price, new_unit_price);

        // A replayed invoice refreshes the variation it already produced
        // for that date instead of stacking a duplicate
        let existing: Vec<Variation> = self
            .store
            .get_all(
                Query::new()
                    .eq("master_article_id", master_article.id)
                    .eq("date", date),
            )
            .await?;
        if let Some(mut variation) = existing.into_iter().next() {
            variation.old_unit_price = old_unit_price;
            variation.new_unit_price = new_unit_price;
            variation.percentage = percentage;
            self.store.update(variation).await?;
        } else {
            self.store
                .create(Variation {
                    id: Uuid::new_v4(),
                    establishment_id: establishment.id,
                    master_article_id: master_article.id,
                    article_name: master_article.name.clone(),
                    date,
                    old_unit_price,
                    new_unit_price,
                    percentage,
                    deleted: false,
                    created_at: Utc::now(),
                })
                .await?;
        }

        Ok(DomainEvent::PriceVariationDetected {
            establishment_id: establishment.id,
            master_article_id: master_article.id,
            article_name: master_article.name.clone(),
            supplier_label,
            date,
            old_unit_price,
            new_unit_price,
            percentage,
        })
    }
}
