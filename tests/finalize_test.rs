//! Order finalizer integration tests
//!
//! Run against a real file-backed SQLite database so the transactional
//! guarantees under test are the ones production sees.

mod common;

use common::{product_stock_and_active, seed_order, seed_product, setup_state};
use shop_server::db::models::OrderStatus;
use shop_server::payments::finalize::FinalizeError;
use shop_server::PaymentProvider;

#[tokio::test]
async fn finalize_marks_paid_and_decrements_stock() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Ceramic mug", 4750, 3).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    let result = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, Some("txn_abc"), Some(4750))
        .await
        .expect("finalize");

    assert!(result.newly_paid);
    assert_eq!(result.order.status, OrderStatus::Paid);
    assert_eq!(result.order.external_txn_id.as_deref(), Some("txn_abc"));
    assert_eq!(result.order.payment_provider, Some(PaymentProvider::Card));
    assert_eq!(result.order.amount_total, 4750);

    let (stock, active) = product_stock_and_active(&state.db, &product_id).await;
    assert_eq!(stock, 2);
    assert!(active);
}

#[tokio::test]
async fn repeated_finalize_is_a_no_op() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Ceramic mug", 4750, 3).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    let first = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, Some("txn_abc"), Some(4750))
        .await
        .expect("first finalize");
    assert!(first.newly_paid);

    // Duplicate delivery of the same confirmation
    let second = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, Some("txn_abc"), Some(4750))
        .await
        .expect("second finalize");

    assert!(!second.newly_paid);
    assert_eq!(second.order.status, OrderStatus::Paid);
    assert_eq!(second.order.external_txn_id.as_deref(), Some("txn_abc"));

    let (stock, _) = product_stock_and_active(&state.db, &product_id).await;
    assert_eq!(stock, 2, "stock must be decremented exactly once");
}

#[tokio::test]
async fn already_paid_order_keeps_first_transaction_id() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Poster", 1200, 5).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, Some("txn_first"), None)
        .await
        .expect("first finalize");

    // A second confirmation with a different txn id (possible double
    // payment) must not overwrite the recorded one.
    let second = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Wallet, Some("txn_other"), None)
        .await
        .expect("second finalize");

    assert!(!second.newly_paid);
    assert_eq!(second.order.external_txn_id.as_deref(), Some("txn_first"));
    assert_eq!(second.order.payment_provider, Some(PaymentProvider::Card));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_finalize_decrements_once() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Tote bag", 1800, 4).await;
    let order_id = seed_order(&state, &[(&product_id, 2)]).await;

    let f1 = state.finalizer.clone();
    let f2 = state.finalizer.clone();
    let (id1, id2) = (order_id.clone(), order_id.clone());

    let (a, b) = tokio::join!(
        tokio::spawn(async move {
            f1.finalize(&id1, PaymentProvider::Card, Some("txn_race"), None)
                .await
        }),
        tokio::spawn(async move {
            f2.finalize(&id2, PaymentProvider::Wallet, Some("txn_race"), None)
                .await
        }),
    );
    let a = a.expect("join").expect("finalize a");
    let b = b.expect("join").expect("finalize b");

    // Exactly one of the two performed the transition
    assert!(a.newly_paid ^ b.newly_paid);

    let (stock, _) = product_stock_and_active(&state.db, &product_id).await;
    assert_eq!(stock, 2);

    let order = state
        .orders()
        .find_by_id(&order_id)
        .await
        .expect("reload")
        .expect("order exists");
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn stock_reaching_zero_deactivates_product() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Last print", 9900, 1).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    state
        .finalizer
        .finalize(&order_id, PaymentProvider::Wallet, Some("CAP-1"), None)
        .await
        .expect("finalize");

    let (stock, active) = product_stock_and_active(&state.db, &product_id).await;
    assert_eq!(stock, 0);
    assert!(!active, "sold-out product must leave the catalog");
}

#[tokio::test]
async fn oversold_quantity_clamps_stock_at_zero() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Sticker pack", 300, 2).await;
    let order_id = seed_order(&state, &[(&product_id, 5)]).await;

    let result = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, Some("txn_over"), None)
        .await
        .expect("finalize");
    assert!(result.newly_paid);

    let (stock, active) = product_stock_and_active(&state.db, &product_id).await;
    assert_eq!(stock, 0, "stock never goes negative");
    assert!(!active);
}

#[tokio::test]
async fn missing_product_does_not_block_finalize() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Discontinued", 2500, 3).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    // Product removed from the catalog between checkout and payment
    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(&product_id)
        .execute(&state.db)
        .await
        .expect("delete product");

    let result = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, Some("txn_gone"), None)
        .await
        .expect("finalize must survive the dangling reference");

    assert!(result.newly_paid);
    assert_eq!(result.order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn amount_mismatch_is_tolerated() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Mug", 4750, 3).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    // Provider asserts a slightly different amount; finalize proceeds
    let result = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Wallet, Some("CAP-2"), Some(4749))
        .await
        .expect("finalize");

    assert!(result.newly_paid);
    assert_eq!(result.order.amount_total, 4750);
}

#[tokio::test]
async fn missing_transaction_id_gets_placeholder() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Mug", 4750, 3).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    let result = state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, None, None)
        .await
        .expect("finalize");

    assert_eq!(
        result.order.external_txn_id.as_deref(),
        Some(format!("local-{order_id}").as_str())
    );
}

#[tokio::test]
async fn finalize_unknown_order_is_not_found() {
    let (state, _dir) = setup_state().await;

    let err = state
        .finalizer
        .finalize("no-such-order", PaymentProvider::Card, Some("txn"), None)
        .await
        .expect_err("must fail");

    assert!(matches!(err, FinalizeError::NotFound(_)));
}

#[tokio::test]
async fn shipping_line_appends_once() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Mug", 4255, 3).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    let after_first = state
        .orders()
        .append_shipping(&order_id, 495)
        .await
        .expect("first append");
    assert_eq!(after_first.amount_total, 4750);

    let after_second = state
        .orders()
        .append_shipping(&order_id, 495)
        .await
        .expect("second append");
    assert_eq!(after_second.amount_total, 4750, "append must be idempotent");

    let items = state.orders().find_items(&order_id).await.expect("items");
    let shipping_lines = items.iter().filter(|i| i.product_id.is_none()).count();
    assert_eq!(shipping_lines, 1);
}

#[tokio::test]
async fn shipping_cannot_be_added_after_payment() {
    let (state, _dir) = setup_state().await;
    let product_id = seed_product(&state, "Mug", 4750, 3).await;
    let order_id = seed_order(&state, &[(&product_id, 1)]).await;

    state
        .finalizer
        .finalize(&order_id, PaymentProvider::Card, Some("txn_paid"), None)
        .await
        .expect("finalize");

    let err = state
        .orders()
        .append_shipping(&order_id, 495)
        .await
        .expect_err("paid order total is frozen");
    assert!(matches!(
        err,
        shop_server::db::repository::RepoError::Conflict(_)
    ));
}
