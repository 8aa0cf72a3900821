//! Article / invoice deletion tests
//!
//! Covers the cascade rules: sourced history rows disappear, caches are
//! re-derived from survivors, and a master article losing its last support
//! takes its ingredients, emptied recipes and their histories with it,
//! transitively through SUBRECIPE edges.

mod common;

use common::*;

use fcm_backend::store::{Query, Store};
use shared::models::{
    Article, Ingredient, IngredientHistory, MarketMasterArticle, MasterArticle, Recipe,
    RecipeHistory, SmsScope, SupplierLabel, VariationTrigger,
};

#[tokio::test]
async fn deleting_the_last_support_cascades_to_catalog_and_recipes() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    let job = import_job(
        &engine.store,
        est.id,
        payload(
            "Metro",
            "F-001",
            d("2026-03-02"),
            vec![line("Safran", dec("1"), dec("5.00"))],
        ),
    )
    .await;
    engine.import.run_job(job.id).await.unwrap();

    let master: MasterArticle = engine
        .store
        .get_all::<MasterArticle>(Query::new())
        .await
        .unwrap()
        .remove(0);

    // One recipe whose only ingredient uses the article
    let risotto = recipe(&engine.store, est.id, "Risotto", dec("2"), true, true, None).await;
    article_ingredient(
        &engine.store, est.id, risotto.id, master.id, "Safran", dec("1"), dec("0"),
    )
    .await;

    let article: Article = engine
        .store
        .get_all::<Article>(Query::new())
        .await
        .unwrap()
        .remove(0);

    let outcome = engine.deletion.delete_article(est.id, article.id).await.unwrap();
    assert_eq!(outcome.removed_master_articles, vec![master.id]);
    assert_eq!(outcome.removed_recipes, vec![risotto.id]);

    // Nothing dangling: catalog, ingredients, histories all gone
    assert!(engine
        .store
        .get_all::<MasterArticle>(Query::new())
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .store
        .get_all::<MarketMasterArticle>(Query::new())
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .store
        .get_all::<Ingredient>(Query::new())
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .store
        .get_all::<IngredientHistory>(Query::new())
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .store
        .get_all::<RecipeHistory>(Query::new())
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .store
        .get_by_id::<Recipe>(risotto.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn cascade_follows_sub_recipe_edges() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    let job = import_job(
        &engine.store,
        est.id,
        payload(
            "Metro",
            "F-002",
            d("2026-03-02"),
            vec![line("Fond brun", dec("2"), dec("4.00"))],
        ),
    )
    .await;
    engine.import.run_job(job.id).await.unwrap();

    let master: MasterArticle = engine
        .store
        .get_all::<MasterArticle>(Query::new())
        .await
        .unwrap()
        .remove(0);

    // base's only ingredient is the article; parent's only ingredient is base
    let base = recipe(&engine.store, est.id, "Base", dec("1"), false, true, None).await;
    article_ingredient(&engine.store, est.id, base.id, master.id, "Fond", dec("1"), dec("0")).await;
    let parent = recipe(&engine.store, est.id, "Sauce", dec("1"), true, true, None).await;
    sub_recipe_ingredient(&engine.store, est.id, parent.id, base.id, dec("1")).await;

    let article: Article = engine
        .store
        .get_all::<Article>(Query::new())
        .await
        .unwrap()
        .remove(0);

    let outcome = engine.deletion.delete_article(est.id, article.id).await.unwrap();

    // Both recipes emptied and removed, transitively
    assert!(outcome.removed_recipes.contains(&base.id));
    assert!(outcome.removed_recipes.contains(&parent.id));
    assert!(engine
        .store
        .get_all::<Ingredient>(Query::new())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn survivors_are_recomputed_not_removed() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;
    let (market, supplier) =
        supplier_pair(&engine.store, est.id, "Metro", SupplierLabel::Food).await;
    let (_, master) = master_article_pair(
        &engine.store,
        est.id,
        market.id,
        supplier.id,
        "Tomate",
        dec("2.00"),
    )
    .await;

    let salade = recipe(&engine.store, est.id, "Salade", dec("1"), true, true, Some(dec("8"))).await;
    let tomate = article_ingredient(
        &engine.store, est.id, salade.id, master.id, "Tomate", dec("1"), dec("0"),
    )
    .await;

    // Two purchases on different dates
    for (number, date, price) in [("F-010", "2026-03-01", "2.00"), ("F-011", "2026-04-01", "3.00")] {
        let job = import_job(
            &engine.store,
            est.id,
            payload("Metro", number, d(date), vec![line("Tomate", dec("5"), dec(price))]),
        )
        .await;
        engine.import.run_job(job.id).await.unwrap();
    }

    let salade_after: Recipe = engine.store.get_by_id(salade.id).await.unwrap().unwrap();
    assert_eq!(salade_after.purchase_cost_per_portion, dec("3.00"));

    // Delete the April purchase; the March snapshot survives and wins back
    let april: Article = engine
        .store
        .get_all::<Article>(Query::new().eq("date", d("2026-04-01")))
        .await
        .unwrap()
        .remove(0);
    let outcome = engine.deletion.delete_article(est.id, april.id).await.unwrap();

    assert!(outcome.removed_master_articles.is_empty());
    assert!(outcome.removed_recipes.is_empty());
    assert_eq!(outcome.recipes_recomputed, vec![salade.id]);

    let ingredient: Ingredient = engine.store.get_by_id(tomate.id).await.unwrap().unwrap();
    assert_eq!(ingredient.unit_cost, dec("2.00"));

    let history: Vec<IngredientHistory> = engine
        .store
        .get_all(Query::new().eq("ingredient_id", tomate.id))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].date, d("2026-03-01"));
}

#[tokio::test]
async fn deleting_an_invoice_removes_its_articles_and_the_invoice() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    let job = import_job(
        &engine.store,
        est.id,
        payload(
            "Metro",
            "F-020",
            d("2026-03-02"),
            vec![
                line("Tomate", dec("10"), dec("2.00")),
                line("Oignon", dec("5"), dec("1.00")),
            ],
        ),
    )
    .await;
    let outcome = engine.import.run_job(job.id).await.unwrap();
    let invoice_id = outcome.invoice_id.unwrap();

    engine.deletion.delete_invoice(est.id, invoice_id).await.unwrap();

    assert!(engine
        .store
        .get_all::<Article>(Query::new())
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .store
        .get_by_id::<shared::models::Invoice>(invoice_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn deleting_a_foreign_article_is_not_found() {
    let engine = engine();
    let est = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;
    let other = establishment(&engine.store, false, SmsScope::Food, VariationTrigger::All).await;

    let job = import_job(
        &engine.store,
        est.id,
        payload(
            "Metro",
            "F-030",
            d("2026-03-02"),
            vec![line("Tomate", dec("10"), dec("2.00"))],
        ),
    )
    .await;
    engine.import.run_job(job.id).await.unwrap();

    let article: Article = engine
        .store
        .get_all::<Article>(Query::new())
        .await
        .unwrap()
        .remove(0);

    let result = engine.deletion.delete_article(other.id, article.id).await;
    assert!(matches!(result, Err(fcm_backend::error::AppError::NotFound(_))));
}
