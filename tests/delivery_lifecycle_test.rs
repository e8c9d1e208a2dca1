mod common;

use assert_matches::assert_matches;
use common::{dispatcher, next_weekday, TestApp};
use delivery_management::{
    entities::{delivery_document::DeliveryState, VehicleClass},
    errors::{RuleViolation, ServiceError},
    services::deliveries::{CreateDelivery, DeliveryFilter, UpdateDelivery},
};

const WEDNESDAY: u8 = 2;

async fn draft(app: &TestApp, city: &str) -> delivery_management::entities::delivery_document::Model {
    let transfer = app.seed_delivery_transfer(city).await;
    app.services()
        .deliveries
        .create(
            &dispatcher(),
            CreateDelivery {
                name: None,
                picking_id: transfer.id,
                planning_id: None,
                delivery_date: Some(next_weekday(WEDNESDAY)),
                vehicle_type: Some(VehicleClass::Anadolu),
                route_info: None,
            },
        )
        .await
        .expect("create draft")
}

#[tokio::test]
async fn names_come_from_the_delivery_sequence() {
    let app = TestApp::new().await;
    let first = draft(&app, "Kadıköy").await;
    let second = draft(&app, "Üsküdar").await;
    assert_eq!(first.name, "DLV/00001");
    assert_eq!(second.name, "DLV/00002");
}

#[tokio::test]
async fn gateway_failures_do_not_block_transitions() {
    let app = TestApp::new().await;
    app.sms.fail_sends(true);
    let doc = draft(&app, "Kadıköy").await;
    let deliveries = &app.services().deliveries;

    deliveries.confirm(&dispatcher(), doc.id).await.expect("confirm");
    let doc = deliveries.dispatch(doc.id).await.expect("dispatch despite gateway error");
    assert_eq!(doc.state, DeliveryState::OnRoad);
    assert!(doc.sms_sent_on_road);
    assert_matches!(
        deliveries.dispatch(doc.id).await,
        Err(ServiceError::Rule(RuleViolation::IllegalTransition { .. }))
    );

    let doc = deliveries.complete(doc.id).await.expect("complete despite gateway error");
    assert_eq!(doc.state, DeliveryState::Delivered);
    assert!(doc.sms_sent_delivered);

    let stored = deliveries.get(doc.id).await.expect("get");
    assert_eq!(stored.state, DeliveryState::Delivered);
    assert!(app.sms.messages().is_empty());
}

#[tokio::test]
async fn full_lifecycle_sends_each_message_once() {
    let app = TestApp::new().await;
    let doc = draft(&app, "Kadıköy").await;
    let deliveries = &app.services().deliveries;

    let doc = deliveries.confirm(&dispatcher(), doc.id).await.expect("confirm");
    assert_eq!(doc.state, DeliveryState::Ready);

    let doc = deliveries.dispatch(doc.id).await.expect("dispatch");
    assert_eq!(doc.state, DeliveryState::OnRoad);
    assert!(doc.sms_sent_on_road);

    let doc = deliveries.complete(doc.id).await.expect("complete");
    assert_eq!(doc.state, DeliveryState::Delivered);
    assert!(doc.sms_sent_delivered);

    let messages = app.sms.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].number, "+90 555 000 00 00");
    assert!(messages[0].body.contains("yola çıkmıştır"));
    assert!(messages[0].body.contains(&doc.name));
    assert!(messages[1].body.contains("teslimatınız tamamlanmıştır"));

    let err = deliveries.cancel(doc.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Rule(RuleViolation::IllegalTransition { .. }));
    assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn reset_clears_message_flags() {
    let app = TestApp::new().await;
    let doc = draft(&app, "Kadıköy").await;
    let deliveries = &app.services().deliveries;

    deliveries.confirm(&dispatcher(), doc.id).await.expect("confirm");
    deliveries.dispatch(doc.id).await.expect("dispatch");
    let reset = deliveries.reset_to_draft(doc.id).await.expect("reset");
    assert_eq!(reset.state, DeliveryState::Draft);
    assert!(!reset.sms_sent_on_road);

    deliveries.confirm(&dispatcher(), doc.id).await.expect("confirm again");
    deliveries.dispatch(doc.id).await.expect("dispatch again");
    assert_eq!(app.sms.messages().len(), 2);
}

#[tokio::test]
async fn transitions_out_of_order_are_refused() {
    let app = TestApp::new().await;
    let doc = draft(&app, "Kadıköy").await;
    let deliveries = &app.services().deliveries;

    assert_matches!(
        deliveries.dispatch(doc.id).await,
        Err(ServiceError::Rule(RuleViolation::IllegalTransition { .. }))
    );
    assert_matches!(
        deliveries.complete(doc.id).await,
        Err(ServiceError::Rule(RuleViolation::IllegalTransition { .. }))
    );
    let unchanged = deliveries.get(doc.id).await.expect("get");
    assert_eq!(unchanged.state, DeliveryState::Draft);
    assert!(app.sms.messages().is_empty());
}

#[tokio::test]
async fn confirm_requires_date_and_vehicle() {
    let app = TestApp::new().await;
    let transfer = app.seed_delivery_transfer("Kadıköy").await;
    let doc = app
        .services()
        .deliveries
        .create(
            &dispatcher(),
            CreateDelivery {
                name: Some("MANUAL-1".into()),
                picking_id: transfer.id,
                planning_id: None,
                delivery_date: Some(next_weekday(WEDNESDAY)),
                vehicle_type: None,
                route_info: None,
            },
        )
        .await
        .expect("vehicle can be chosen later");
    assert_eq!(doc.name, "MANUAL-1");

    let err = app.services().deliveries.confirm(&dispatcher(), doc.id).await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::Rule(RuleViolation::MissingField { ref field }) if field == "vehicle_type"
    );
}

#[tokio::test]
async fn schedule_fields_freeze_after_confirmation() {
    let app = TestApp::new().await;
    let doc = draft(&app, "Kadıköy").await;
    let deliveries = &app.services().deliveries;
    deliveries.confirm(&dispatcher(), doc.id).await.expect("confirm");

    let err = deliveries
        .update(
            &dispatcher(),
            doc.id,
            UpdateDelivery {
                vehicle_type: Some(VehicleClass::Avrupa),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Rule(RuleViolation::NotEditable { .. }));

    // Free-text fields stay editable.
    let updated = deliveries
        .update(
            &dispatcher(),
            doc.id,
            UpdateDelivery {
                route_info: Some("Arka kapıdan teslim".into()),
                ..Default::default()
            },
        )
        .await
        .expect("route info is editable");
    assert_eq!(updated.route_info.as_deref(), Some("Arka kapıdan teslim"));
}

#[tokio::test]
async fn draft_update_is_revalidated() {
    let app = TestApp::new().await;
    let doc = draft(&app, "Kadıköy").await;

    let monday = next_weekday(0);
    let err = app
        .services()
        .deliveries
        .update(
            &dispatcher(),
            doc.id,
            UpdateDelivery {
                delivery_date: Some(monday),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Rule(RuleViolation::DistrictDayMismatch { .. }));
}

#[tokio::test]
async fn landline_is_used_without_mobile() {
    let app = TestApp::new().await;
    let partner = app.seed_partner("Sabit Hat", "Kadıköy", None).await;
    let transfer = app
        .seed_transfer_with(
            Some(partner.id),
            delivery_management::entities::stock_transfer::PickingType::Outgoing,
            delivery_management::entities::stock_transfer::TransferState::Done,
        )
        .await;
    let doc = app
        .services()
        .deliveries
        .create(
            &dispatcher(),
            CreateDelivery {
                name: None,
                picking_id: transfer.id,
                planning_id: None,
                delivery_date: Some(next_weekday(WEDNESDAY)),
                vehicle_type: Some(VehicleClass::Anadolu),
                route_info: None,
            },
        )
        .await
        .expect("create");

    app.services().deliveries.confirm(&dispatcher(), doc.id).await.expect("confirm");
    let doc = app.services().deliveries.dispatch(doc.id).await.expect("dispatch");
    assert_eq!(doc.state, DeliveryState::OnRoad);
    assert_eq!(app.sms.messages()[0].number, "+90 216 000 00 00");
}

#[tokio::test]
async fn list_filters_by_state_and_district() {
    let app = TestApp::new().await;
    let a = draft(&app, "Kadıköy").await;
    draft(&app, "Üsküdar").await;
    app.services().deliveries.confirm(&dispatcher(), a.id).await.expect("confirm");

    let ready = app
        .services()
        .deliveries
        .list(DeliveryFilter {
            state: Some(DeliveryState::Ready),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].id, a.id);

    let uskudar = app
        .services()
        .deliveries
        .list(DeliveryFilter {
            district: Some("Üsküdar".into()),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(uskudar.len(), 1);
}
