mod common;

use assert_matches::assert_matches;
use common::TestApp;
use garment_factory_api::{
    entities::stock_transaction::TransactionType, errors::ServiceError,
    services::stock_ledger::StockReference,
};

#[tokio::test]
async fn stock_in_and_out_write_ledger_rows() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let ledger = &app.services().ledger;
    let product = app.seed_product("TEE-WHT-M", 10, 0).await;

    let received = ledger
        .stock_in(&ctx, product.id, 25, None, Some("Supplier delivery".into()))
        .await
        .expect("stock in");
    assert_eq!(received.product.current_stock, 35);
    let row = received.transaction.expect("ledger row");
    assert_eq!(row.transaction_type, TransactionType::In.to_string());
    assert_eq!(row.quantity, 25);
    assert_eq!(row.previous_quantity, 10);
    assert_eq!(row.new_quantity, 35);
    assert_eq!(row.created_by, ctx.actor_id);

    let job = app.seed_job(5).await;
    let withdrawn = ledger
        .stock_out(
            &ctx,
            product.id,
            5,
            Some(StockReference::production_job(job.id)),
            None,
        )
        .await
        .expect("stock out");
    assert_eq!(withdrawn.product.current_stock, 30);
    let row = withdrawn.transaction.expect("ledger row");
    assert_eq!(row.reference_id, Some(job.id));

    let history = ledger.list_transactions(product.id).await.expect("history");
    assert_eq!(history.len(), 3, "opening stock + in + out");
}

#[tokio::test]
async fn opening_stock_is_received_through_the_ledger() {
    let app = TestApp::new().await;
    let product = app.seed_product("POLO-BLK-S", 50, 0).await;
    assert_eq!(product.current_stock, 50);

    let history = app
        .services()
        .ledger
        .list_transactions(product.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    let opening = &history[0];
    assert_eq!(opening.transaction_type, TransactionType::In.to_string());
    assert_eq!(opening.quantity, 50);
    assert_eq!(opening.previous_quantity, 0);
    assert_eq!(opening.new_quantity, 50);
    assert_eq!(opening.note.as_deref(), Some("Opening stock"));

    let empty = app.seed_product("POLO-BLK-M", 0, 0).await;
    assert!(app
        .services()
        .ledger
        .list_transactions(empty.id)
        .await
        .expect("history")
        .is_empty());
}

#[tokio::test]
async fn opening_stock_at_minimum_raises_a_low_stock_notification() {
    let app = TestApp::new().await;
    let product = app.seed_product("BAG-CNV", 3, 5).await;

    let mut found = false;
    for _ in 0..50 {
        let rows = app
            .services()
            .notifications
            .list_notifications(false)
            .await
            .expect("notifications");
        if rows
            .iter()
            .any(|n| n.kind == "low_stock" && n.entity_id == Some(product.id))
        {
            found = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(found, "low stock notification was not stored");
}

#[tokio::test]
async fn equal_in_and_out_restore_the_starting_stock() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let ledger = &app.services().ledger;
    let product = app.seed_product("SOCK-WHT", 17, 0).await;

    for qty in [1, 17, 250] {
        ledger
            .stock_in(&ctx, product.id, qty, None, None)
            .await
            .expect("stock in");
        let out = ledger
            .stock_out(&ctx, product.id, qty, None, None)
            .await
            .expect("stock out");
        assert_eq!(out.product.current_stock, 17);
    }
    assert_eq!(
        ledger.list_transactions(product.id).await.expect("history").len(),
        7
    );
}

#[tokio::test]
async fn stock_out_beyond_on_hand_leaves_stock_untouched() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let ledger = &app.services().ledger;
    let product = app.seed_product("HOOD-GRY-XL", 4, 0).await;

    let err = ledger
        .stock_out(&ctx, product.id, 5, None, None)
        .await
        .expect_err("overdraw must fail");
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let after = app
        .services()
        .products
        .get_product(product.id)
        .await
        .expect("product");
    assert_eq!(after.current_stock, 4);
    let history = ledger.list_transactions(product.id).await.expect("history");
    assert_eq!(history.len(), 1, "only the opening stock row");
    assert_eq!(history[0].new_quantity, 4);
}

#[tokio::test]
async fn adjust_sets_absolute_quantity_and_records_the_delta() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let ledger = &app.services().ledger;
    let product = app.seed_product("INK-PLA-RED", 50, 0).await;

    let adjusted = ledger
        .stock_adjust(&ctx, product.id, 42, Some("Cycle count".into()))
        .await
        .expect("adjust");
    assert_eq!(adjusted.product.current_stock, 42);
    let row = adjusted.transaction.expect("ledger row");
    assert_eq!(row.transaction_type, TransactionType::Adjust.to_string());
    assert_eq!(row.previous_quantity, 50);
    assert_eq!(row.new_quantity, 42);

    let err = ledger
        .stock_adjust(&ctx, product.id, -1, None)
        .await
        .expect_err("negative stock is rejected");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let ledger = &app.services().ledger;
    let product = app.seed_product("TOTE-NAT", 10, 0).await;

    assert_matches!(
        ledger.stock_in(&ctx, product.id, 0, None, None).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        ledger.stock_out(&ctx, product.id, -3, None, None).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn movements_on_unknown_products_are_not_found() {
    let app = TestApp::new().await;
    let err = app
        .services()
        .ledger
        .stock_in(&app.ctx(), uuid::Uuid::new_v4(), 1, None, None)
        .await
        .expect_err("unknown product");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn dropping_to_minimum_raises_a_low_stock_notification() {
    let app = TestApp::new().await;
    let product = app.seed_product("CAP-NAVY", 12, 10).await;

    app.services()
        .ledger
        .stock_out(&app.ctx(), product.id, 3, None, None)
        .await
        .expect("stock out");

    // The event processor writes the notification asynchronously.
    let mut found = false;
    for _ in 0..50 {
        let rows = app
            .services()
            .notifications
            .list_notifications(false)
            .await
            .expect("notifications");
        if rows
            .iter()
            .any(|n| n.kind == "low_stock" && n.entity_id == Some(product.id))
        {
            found = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(found, "low stock notification was not stored");
}
