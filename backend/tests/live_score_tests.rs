//! Rolling live-score tests
//!
//! Covers the 30-day window, the staleness penalty, and the per-dimension
//! upsert behavior.

mod common;

use common::*;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use fcm_backend::error::AppError;
use fcm_backend::store::{Query, Store};
use shared::models::{
    LiveScore, RecipeSales, ReportInput, ScoreKind, SmsScope, Variation, VariationTrigger,
};
use shared::types::ReportMonth;

async fn seed_report(engine: &Engine, establishment_id: Uuid, month: ReportMonth) {
    let plat = recipe(
        &engine.store,
        establishment_id,
        "Plat",
        dec("1"),
        true,
        true,
        Some(dec("10")),
    )
    .await;
    let ingredient = article_ingredient(
        &engine.store,
        establishment_id,
        plat.id,
        Uuid::new_v4(),
        "Tomate",
        dec("1"),
        dec("0"),
    )
    .await;
    engine
        .editing
        .edit_ingredient(
            establishment_id,
            ingredient.id,
            month.first_day(),
            fcm_backend::services::editing::IngredientEdit {
                gross_unit_price: Some(dec("2.50")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    engine
        .financial
        .build_monthly_report(
            establishment_id,
            ReportInput {
                month,
                sales_mix: vec![RecipeSales {
                    recipe_id: plat.id,
                    units_sold: 100,
                }],
                labor_costs: dec("200"),
                fixed_costs: dec("100"),
                variable_costs: dec("50"),
                other_costs: dec("50"),
                employees_count: 2,
            },
        )
        .await
        .unwrap();
}

async fn seed_variation(engine: &Engine, establishment_id: Uuid, date: &str, percentage: &str) {
    engine
        .store
        .create(Variation {
            id: Uuid::new_v4(),
            establishment_id,
            master_article_id: Uuid::new_v4(),
            article_name: "Tomate".to_string(),
            date: d(date),
            old_unit_price: dec("1.00"),
            new_unit_price: dec("1.00") * (Decimal::ONE + dec(percentage) / Decimal::ONE_HUNDRED),
            percentage: dec(percentage),
            deleted: false,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}

fn score_of(scores: &[LiveScore], kind: ScoreKind) -> Decimal {
    scores.iter().find(|s| s.kind == kind).unwrap().value
}

#[tokio::test]
async fn fresh_report_scores_without_penalty() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    // Report for July, scored as of August 8: exactly the preceding month
    seed_report(&engine, est.id, ReportMonth::new(2026, 7).unwrap()).await;
    let scores = engine
        .live_score
        .refresh_at(est.id, d("2026-08-08"))
        .await
        .unwrap();

    assert_eq!(scores.len(), 4);
    // No variations in the window: the purchase dimension carries the
    // report's score; margins are healthy
    assert_eq!(score_of(&scores, ScoreKind::Purchase), Decimal::from(100));
    assert_eq!(score_of(&scores, ScoreKind::Recipe), Decimal::from(100));
    assert_eq!(score_of(&scores, ScoreKind::Financial), Decimal::from(100));
    assert_eq!(score_of(&scores, ScoreKind::Global), Decimal::from(100));
}

#[tokio::test]
async fn stale_report_takes_a_fixed_penalty_on_every_dimension() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    // Latest report is May; as of August 8 that is two months behind
    seed_report(&engine, est.id, ReportMonth::new(2026, 5).unwrap()).await;
    let scores = engine
        .live_score
        .refresh_at(est.id, d("2026-08-08"))
        .await
        .unwrap();

    for kind in ScoreKind::ALL {
        assert_eq!(score_of(&scores, kind), Decimal::from(90));
    }
}

#[tokio::test]
async fn recent_variations_drive_the_purchase_dimension() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    seed_report(&engine, est.id, ReportMonth::new(2026, 7).unwrap()).await;

    // Turbulent prices inside the window, plus one outside it
    seed_variation(&engine, est.id, "2026-08-01", "30").await;
    seed_variation(&engine, est.id, "2026-07-20", "-50").await;
    seed_variation(&engine, est.id, "2026-01-05", "300").await;

    let scores = engine
        .live_score
        .refresh_at(est.id, d("2026-08-08"))
        .await
        .unwrap();

    // Mean |variation| over the window = (30 + 50) / 2 = 40% -> noisy
    assert_eq!(score_of(&scores, ScoreKind::Purchase), Decimal::from(10));
    // The other dimensions stay healthy
    assert_eq!(score_of(&scores, ScoreKind::Recipe), Decimal::from(100));
}

#[tokio::test]
async fn soft_deleted_variations_are_ignored() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    seed_report(&engine, est.id, ReportMonth::new(2026, 7).unwrap()).await;
    seed_variation(&engine, est.id, "2026-08-01", "200").await;

    // Flag it deleted: the window must skip it
    let mut variation = engine
        .store
        .get_all::<Variation>(Query::new())
        .await
        .unwrap()
        .remove(0);
    variation.deleted = true;
    engine.store.update(variation).await.unwrap();

    let scores = engine
        .live_score
        .refresh_at(est.id, d("2026-08-08"))
        .await
        .unwrap();
    assert_eq!(score_of(&scores, ScoreKind::Purchase), Decimal::from(100));
}

#[tokio::test]
async fn refresh_upserts_one_row_per_dimension() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    seed_report(&engine, est.id, ReportMonth::new(2026, 7).unwrap()).await;
    engine
        .live_score
        .refresh_at(est.id, d("2026-08-01"))
        .await
        .unwrap();
    engine
        .live_score
        .refresh_at(est.id, d("2026-08-08"))
        .await
        .unwrap();

    let rows: Vec<LiveScore> = engine.store.get_all(Query::new()).await.unwrap();
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn refresh_without_any_report_is_not_found() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    let result = engine.live_score.refresh_at(est.id, d("2026-08-08")).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
