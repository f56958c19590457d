mod common;

use assert_matches::assert_matches;
use common::TestApp;
use garment_factory_api::{
    entities::stock_reservation::ReservationStatus,
    errors::ServiceError,
    services::reservations::{BatchPolicy, ReservationItem},
};

#[tokio::test]
async fn reservation_reduces_availability_without_moving_stock() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let reservations = &app.services().reservations;
    let product = app.seed_product("SKU-1", 100, 0).await;
    let job = app.seed_job(40).await;

    let reservation = reservations
        .create_reservation(&ctx, job.id, product.id, 40)
        .await
        .expect("reserve 40");
    assert_eq!(reservation.status, ReservationStatus::Reserved.to_string());

    let stock = reservations
        .available_quantity(product.id)
        .await
        .expect("availability");
    assert_eq!(stock.current_stock, 100);
    assert_eq!(stock.reserved, 40);
    assert_eq!(stock.available, 60);

    let err = reservations
        .create_reservation(&ctx, job.id, product.id, 70)
        .await
        .expect_err("70 exceeds the 60 available");
    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(
        reservations.list_for_product(product.id).await.expect("rows").len(),
        1,
        "rejected reservation must not insert a row"
    );

    let released = reservations
        .release_reservation(&ctx, reservation.id)
        .await
        .expect("release");
    assert_eq!(released.status, ReservationStatus::Released.to_string());
    assert!(released.released_at.is_some());

    let stock = reservations
        .available_quantity(product.id)
        .await
        .expect("availability");
    assert_eq!(stock.available, 100);
}

#[tokio::test]
async fn closed_reservations_cannot_be_closed_again() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let reservations = &app.services().reservations;
    let product = app.seed_product("SKU-2", 10, 0).await;
    let job = app.seed_job(5).await;

    let reservation = reservations
        .create_reservation(&ctx, job.id, product.id, 5)
        .await
        .expect("reserve");
    reservations
        .mark_used(&ctx, reservation.id)
        .await
        .expect("mark used");

    assert_matches!(
        reservations.release_reservation(&ctx, reservation.id).await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert_matches!(
        reservations.mark_used(&ctx, reservation.id).await,
        Err(ServiceError::InvalidStatus(_))
    );
}

#[tokio::test]
async fn reservation_requires_existing_job_and_positive_quantity() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let reservations = &app.services().reservations;
    let product = app.seed_product("SKU-3", 10, 0).await;
    let job = app.seed_job(5).await;

    assert_matches!(
        reservations
            .create_reservation(&ctx, uuid::Uuid::new_v4(), product.id, 1)
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        reservations.create_reservation(&ctx, job.id, product.id, 0).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn all_or_nothing_batch_rolls_back_on_failure() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let reservations = &app.services().reservations;
    let shirts = app.seed_product("TEE-BLK-L", 100, 0).await;
    let ink = app.seed_product("INK-PLA-WHT", 5, 0).await;
    let job = app.seed_job(50).await;

    let err = reservations
        .reserve_for_job(
            &ctx,
            job.id,
            vec![
                ReservationItem {
                    product_id: shirts.id,
                    quantity: 50,
                },
                ReservationItem {
                    product_id: ink.id,
                    quantity: 10,
                },
            ],
            BatchPolicy::AllOrNothing,
        )
        .await
        .expect_err("ink is short");
    assert_matches!(err, ServiceError::InsufficientStock(_));

    assert!(reservations.list_for_job(job.id).await.expect("rows").is_empty());
    let stock = reservations
        .available_quantity(shirts.id)
        .await
        .expect("availability");
    assert_eq!(stock.available, 100);
}

#[tokio::test]
async fn best_effort_batch_keeps_earlier_reservations() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let reservations = &app.services().reservations;
    let shirts = app.seed_product("TEE-RED-S", 100, 0).await;
    let ink = app.seed_product("INK-PLA-BLK", 5, 0).await;
    let job = app.seed_job(50).await;

    let batch = reservations
        .reserve_for_job(
            &ctx,
            job.id,
            vec![
                ReservationItem {
                    product_id: shirts.id,
                    quantity: 50,
                },
                ReservationItem {
                    product_id: ink.id,
                    quantity: 10,
                },
            ],
            BatchPolicy::BestEffort,
        )
        .await
        .expect("best effort returns partial result");

    assert_eq!(batch.reserved.len(), 1);
    assert_eq!(batch.reserved[0].product_id, shirts.id);
    let failure = batch.failure.expect("second item failed");
    assert_eq!(failure.product_id, ink.id);
    assert_eq!(reservations.list_for_job(job.id).await.expect("rows").len(), 1);
}

#[tokio::test]
async fn consuming_job_materials_withdraws_stock_and_marks_used() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let services = app.services();
    let shirts = app.seed_product("TEE-WHT-L", 30, 0).await;
    let job = app.seed_job(20).await;

    services
        .reservations
        .create_reservation(&ctx, job.id, shirts.id, 20)
        .await
        .expect("reserve");

    let used = services
        .reservations
        .consume_for_job(&ctx, job.id)
        .await
        .expect("consume");
    assert_eq!(used.len(), 1);
    assert_eq!(used[0].status, ReservationStatus::Used.to_string());

    let product = services.products.get_product(shirts.id).await.expect("product");
    assert_eq!(product.current_stock, 10);

    let history = services
        .ledger
        .list_transactions(shirts.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 2, "opening stock + consumption");
    let consumed: Vec<_> = history
        .iter()
        .filter(|t| t.reference_id == Some(job.id))
        .collect();
    assert_eq!(consumed.len(), 1);
    assert_eq!(consumed[0].quantity, 20);
    assert_eq!(consumed[0].previous_quantity, 30);

    // Used reservations no longer count against availability.
    let stock = services
        .reservations
        .available_quantity(shirts.id)
        .await
        .expect("availability");
    assert_eq!(stock.reserved, 0);
    assert_eq!(stock.available, 10);
}

#[tokio::test]
async fn each_reservation_change_writes_one_audit_row() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let services = app.services();
    let product = app.seed_product("SKU-AUD", 50, 0).await;
    let job = app.seed_job(20).await;

    let released = services
        .reservations
        .create_reservation(&ctx, job.id, product.id, 10)
        .await
        .expect("reserve");
    let used = services
        .reservations
        .create_reservation(&ctx, job.id, product.id, 5)
        .await
        .expect("reserve");

    let rows = services
        .audit
        .list_for_entity("stock_reservation", released.id)
        .await
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].action, "reserve");
    assert_eq!(rows[0].entity_id, released.id);
    assert!(rows[0].old_data.is_none());
    assert_eq!(rows[0].new_data.as_ref().expect("new")["status"], "reserved");

    services
        .reservations
        .release_reservation(&ctx, released.id)
        .await
        .expect("release");
    services
        .reservations
        .mark_used(&ctx, used.id)
        .await
        .expect("mark used");

    for (id, action, status) in [
        (released.id, "release", "released"),
        (used.id, "mark_used", "used"),
    ] {
        let rows = services
            .audit
            .list_for_entity("stock_reservation", id)
            .await
            .expect("rows");
        assert_eq!(rows.len(), 2, "{}", action);
        let last = &rows[1];
        assert_eq!(last.action, action);
        assert_eq!(last.entity_id, id);
        assert_eq!(last.old_data.as_ref().expect("old")["status"], "reserved");
        assert_eq!(last.new_data.as_ref().expect("new")["status"], status);
    }

    // A rejected change leaves the trail alone.
    assert!(services
        .reservations
        .release_reservation(&ctx, used.id)
        .await
        .is_err());
    assert_eq!(
        services
            .audit
            .list_for_entity("stock_reservation", used.id)
            .await
            .expect("rows")
            .len(),
        2
    );
}
