mod common;

use assert_matches::assert_matches;
use chrono::{Datelike, Utc};
use common::{dispatcher, TestApp};
use delivery_management::{
    entities::{
        stock_transfer::{PickingType, TransferState},
        VehicleClass,
    },
    errors::{RuleViolation, ServiceError},
};

/// A district that accepts deliveries today, or `None` on Sundays.
fn district_for_today() -> Option<&'static str> {
    match Utc::now().date_naive().weekday().num_days_from_monday() {
        0 => Some("Tuzla"),
        1 => Some("Kadıköy"),
        2 => Some("Kadıköy"),
        3 => Some("Kadıköy"),
        4 => Some("Sultanbeyli"),
        5 => Some("Şile"),
        _ => None,
    }
}

#[tokio::test]
async fn selection_creates_one_document_per_transfer() {
    let Some(district) = district_for_today() else {
        return;
    };
    let app = TestApp::new().await;
    let transfer = app.seed_delivery_transfer(district).await;
    let selection = &app.services().vehicle_selection;

    let first = selection
        .select_vehicle(&dispatcher(), transfer.id, VehicleClass::KucukArac2)
        .await
        .expect("select vehicle");
    assert!(first.created);
    assert!(first.transfer.has_vehicle_selected);
    assert!(first.transfer.is_delivery_ready());
    assert_eq!(first.deliveries.len(), 1);
    assert_eq!(first.deliveries[0].delivery_date, Some(Utc::now().date_naive()));
    assert_eq!(first.deliveries[0].vehicle_type, Some(VehicleClass::KucukArac2));

    let second = selection
        .select_vehicle(&dispatcher(), transfer.id, VehicleClass::Anadolu)
        .await
        .expect("select again");
    assert!(!second.created);
    assert_eq!(second.deliveries.len(), 1);
    assert_eq!(second.deliveries[0].id, first.deliveries[0].id);
    // The existing document keeps its vehicle.
    assert_eq!(second.deliveries[0].vehicle_type, Some(VehicleClass::KucukArac2));
}

#[tokio::test]
async fn ineligible_transfers_are_left_unflagged() {
    let app = TestApp::new().await;
    let partner = app.seed_partner("Tedarikçi", "Kadıköy", None).await;
    let incoming = app
        .seed_transfer_with(Some(partner.id), PickingType::Incoming, TransferState::Done)
        .await;

    let err = app
        .services()
        .vehicle_selection
        .select_vehicle(&dispatcher(), incoming.id, VehicleClass::Anadolu)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Rule(RuleViolation::TransferNotEligible { .. }));
}
