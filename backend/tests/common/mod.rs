//! Shared fixtures for the engine integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use fcm_backend::external::{AlertDispatcher, AlertError, AlertSender};
use fcm_backend::services::{
    CatalogService, DeletionService, DuplicationService, EditingService, FinancialService,
    ImportService, LedgerService, LiveScoreService, MergeService, PropagationService,
};
use fcm_backend::store::{MemoryStore, Store};
use shared::models::{
    Establishment, ImportJob, Ingredient, IngredientKind, InvoiceBlock, InvoiceLine,
    InvoicePayload, JobStatus, MarketMasterArticle, MarketSupplier, MasterArticle, Recipe,
    SmsScope, Supplier, SupplierBlock, SupplierLabel, VariationTrigger,
};

pub fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Alert sender that records every delivered message
#[derive(Clone, Default)]
pub struct RecordingAlerts {
    pub messages: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AlertSender for RecordingAlerts {
    async fn send(&self, message: &str) -> Result<(), AlertError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// The whole engine wired over one in-memory store
pub struct Engine {
    pub store: MemoryStore,
    pub ledger: LedgerService<MemoryStore>,
    pub propagation: PropagationService<MemoryStore>,
    pub catalog: CatalogService<MemoryStore>,
    pub import: ImportService<MemoryStore>,
    pub editing: EditingService<MemoryStore>,
    pub deletion: DeletionService<MemoryStore>,
    pub duplication: DuplicationService<MemoryStore>,
    pub merge: MergeService<MemoryStore>,
    pub financial: FinancialService<MemoryStore>,
    pub live_score: LiveScoreService<MemoryStore>,
    pub sent_alerts: Arc<Mutex<Vec<String>>>,
}

pub fn engine() -> Engine {
    let store = MemoryStore::new();
    let alerts = RecordingAlerts::default();
    let sent_alerts = alerts.messages.clone();

    let ledger = LedgerService::new(store.clone());
    let propagation = PropagationService::new(store.clone(), ledger.clone());
    let catalog = CatalogService::new(store.clone());
    let import = ImportService::new(
        store.clone(),
        catalog.clone(),
        propagation.clone(),
        AlertDispatcher::new(Arc::new(alerts)),
    );
    let editing = EditingService::new(store.clone(), propagation.clone());
    let deletion = DeletionService::new(store.clone(), ledger.clone(), propagation.clone());
    let duplication = DuplicationService::new(store.clone(), ledger.clone());
    let merge = MergeService::new(store.clone());
    let live_score = LiveScoreService::new(store.clone());
    let financial = FinancialService::new(store.clone(), ledger.clone(), live_score.clone());

    Engine {
        store,
        ledger,
        propagation,
        catalog,
        import,
        editing,
        deletion,
        duplication,
        merge,
        financial,
        live_score,
        sent_alerts,
    }
}

pub async fn establishment(
    store: &MemoryStore,
    active_sms: bool,
    sms_scope: SmsScope,
    sms_variation_trigger: VariationTrigger,
) -> Establishment {
    store
        .create(Establishment {
            id: Uuid::new_v4(),
            name: "Chez Test".to_string(),
            active_sms,
            sms_scope,
            sms_variation_trigger,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub async fn recipe(
    store: &MemoryStore,
    establishment_id: Uuid,
    name: &str,
    portion_count: Decimal,
    saleable: bool,
    active: bool,
    sale_price_per_portion: Option<Decimal>,
) -> Recipe {
    store
        .create(Recipe {
            id: Uuid::new_v4(),
            establishment_id,
            name: name.to_string(),
            portion_count,
            saleable,
            active,
            sale_price_per_portion,
            purchase_cost_total: Decimal::ZERO,
            purchase_cost_per_portion: Decimal::ZERO,
            margin: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub async fn article_ingredient(
    store: &MemoryStore,
    establishment_id: Uuid,
    recipe_id: Uuid,
    master_article_id: Uuid,
    name: &str,
    quantity: Decimal,
    percentage_loss: Decimal,
) -> Ingredient {
    store
        .create(Ingredient {
            id: Uuid::new_v4(),
            establishment_id,
            recipe_id,
            name: name.to_string(),
            kind: IngredientKind::Article { master_article_id },
            quantity,
            percentage_loss,
            unit_cost: Decimal::ZERO,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub async fn sub_recipe_ingredient(
    store: &MemoryStore,
    establishment_id: Uuid,
    recipe_id: Uuid,
    sub_recipe_id: Uuid,
    quantity: Decimal,
) -> Ingredient {
    store
        .create(Ingredient {
            id: Uuid::new_v4(),
            establishment_id,
            recipe_id,
            name: "sub".to_string(),
            kind: IngredientKind::SubRecipe { sub_recipe_id },
            quantity,
            percentage_loss: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub async fn fixed_ingredient(
    store: &MemoryStore,
    establishment_id: Uuid,
    recipe_id: Uuid,
    name: &str,
) -> Ingredient {
    store
        .create(Ingredient {
            id: Uuid::new_v4(),
            establishment_id,
            recipe_id,
            name: name.to_string(),
            kind: IngredientKind::Fixed,
            quantity: Decimal::ONE,
            percentage_loss: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

/// A full market supplier + tenant supplier pair
pub async fn supplier_pair(
    store: &MemoryStore,
    establishment_id: Uuid,
    name: &str,
    label: SupplierLabel,
) -> (MarketSupplier, Supplier) {
    let market = store
        .create(MarketSupplier {
            id: Uuid::new_v4(),
            name: name.to_string(),
            label,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let supplier = store
        .create(Supplier {
            id: Uuid::new_v4(),
            establishment_id,
            market_supplier_id: market.id,
            name: name.to_string(),
            label,
            siret: None,
            vat_number: None,
            emails: vec![],
            phones: vec![],
            address: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    (market, supplier)
}

/// A full market + tenant master article pair
pub async fn master_article_pair(
    store: &MemoryStore,
    establishment_id: Uuid,
    market_supplier_id: Uuid,
    supplier_id: Uuid,
    name: &str,
    unit_price: Decimal,
) -> (MarketMasterArticle, MasterArticle) {
    let market = store
        .create(MarketMasterArticle {
            id: Uuid::new_v4(),
            market_supplier_id,
            name: name.to_string(),
            unit: "kg".to_string(),
            current_unit_price: unit_price,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let master = store
        .create(MasterArticle {
            id: Uuid::new_v4(),
            establishment_id,
            supplier_id,
            market_master_article_id: market.id,
            name: name.to_string(),
            unit: "kg".to_string(),
            current_unit_price: unit_price,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    (market, master)
}

pub fn line(product_name: &str, quantity: Decimal, unit_price: Decimal) -> InvoiceLine {
    InvoiceLine {
        product_name: product_name.to_string(),
        unit: "kg".to_string(),
        quantity,
        unit_price_excl_tax: unit_price,
        line_total_excl_tax: quantity * unit_price,
        discounts: None,
        duties_and_taxes: None,
    }
}

pub fn payload(
    supplier_name: &str,
    invoice_number: &str,
    invoice_date: NaiveDate,
    lines: Vec<InvoiceLine>,
) -> InvoicePayload {
    let total: Decimal = lines.iter().map(|l| l.line_total_excl_tax).sum();
    InvoicePayload {
        invoice: InvoiceBlock {
            invoice_number: invoice_number.to_string(),
            invoice_date,
            total_excl_tax: total,
            total_incl_tax: total * dec("1.1"),
            total_vat: total * dec("0.1"),
        },
        supplier: SupplierBlock {
            raw_name: supplier_name.to_string(),
            label: None,
            siret: None,
            vat_number: None,
            emails: vec![],
            phones: vec![],
            address: None,
        },
        lines,
    }
}

pub async fn import_job(
    store: &MemoryStore,
    establishment_id: Uuid,
    payload: InvoicePayload,
) -> ImportJob {
    store
        .create(ImportJob {
            id: Uuid::new_v4(),
            establishment_id,
            status: JobStatus::Pending,
            payload,
            error_message: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}
