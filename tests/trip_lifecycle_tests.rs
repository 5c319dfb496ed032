mod common;

use std::time::Duration;

use uuid::Uuid;

use common::{check_in, check_out, vehicle, Harness};
use fleet_fuel_ledger::config::{LedgerConfig, OpenTripPolicy};
use fleet_fuel_ledger::models::{DeviceInfo, FuelRecordKind, TripFilter};
use fleet_fuel_ledger::repositories::LedgerStore;
use fleet_fuel_ledger::utils::errors::AppError;

#[tokio::test]
async fn test_fleet_scenario_consume_refuel_delete() {
    let v = vehicle(10.0);
    let h = Harness::new(vec![v.clone()], LedgerConfig::default());
    let employee = Uuid::new_v4();

    let entry = h
        .trips
        .open_trip(v.id, employee, check_in(5_000.0), DeviceInfo::default())
        .await
        .unwrap();
    let closed = h.trips.close_trip(v.id, employee, check_out(5_120.0)).await.unwrap();
    assert_eq!(closed.entry.id, entry.id);
    assert_eq!(closed.entry.distance_driven, Some(120.0));
    assert_eq!(closed.fuel_record.trip_id, Some(entry.id));
    assert_eq!((closed.fuel_record.previous_fuel, closed.fuel_record.new_fuel), (0.0, -12.0));

    let refuel = h.ledger.append_manual_refuel(v.id, 20.0).await.unwrap();
    assert_eq!((refuel.previous_fuel, refuel.new_fuel), (-12.0, 8.0));

    let compensation = h.trips.delete_trip(entry.id).await.unwrap();
    assert_eq!(compensation.kind, FuelRecordKind::Compensation);
    assert_eq!((compensation.previous_fuel, compensation.new_fuel), (8.0, 20.0));

    assert!(matches!(h.trips.get_trip(entry.id).await, Err(AppError::NotFound(_))));
    assert_eq!(h.ledger.current_balance(v.id).await.unwrap(), Some(20.0));
    assert!(h.ledger.verify_chain(v.id).await.unwrap().is_linked);
}

#[tokio::test]
async fn test_lower_checkout_odometer_is_rejected() {
    let v = vehicle(10.0);
    let h = Harness::new(vec![v.clone()], LedgerConfig::default());
    let employee = Uuid::new_v4();
    h.trips
        .open_trip(v.id, employee, check_in(2_000.0), DeviceInfo::default())
        .await
        .unwrap();

    let result = h.trips.close_trip(v.id, employee, check_out(1_999.0)).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(h.ledger.history(v.id, None).await.unwrap().is_empty());

    // El viaje sigue abierto y puede cerrarse correctamente
    let closed = h.trips.close_trip(v.id, employee, check_out(2_000.0)).await.unwrap();
    assert_eq!(closed.fuel_record.new_fuel, 0.0);
}

#[tokio::test]
async fn test_failed_close_is_partial_write_and_retry_reuses_record() {
    let v = vehicle(10.0);
    let h = Harness::new(vec![v.clone()], LedgerConfig::default());
    let employee = Uuid::new_v4();
    let entry = h
        .trips
        .open_trip(v.id, employee, check_in(0.0), DeviceInfo::default())
        .await
        .unwrap();

    h.store.set_fail_close(true);
    let err = h.trips.close_trip(v.id, employee, check_out(100.0)).await.unwrap_err();
    let record_id = match err {
        AppError::PartialWrite { record_id, .. } => record_id,
        other => panic!("expected PartialWrite, got {:?}", other),
    };
    assert!(h.trips.get_trip(entry.id).await.unwrap().is_open());

    let report = h.trips.reconcile().await.unwrap();
    assert!(report.completed_deletions.is_empty());
    assert_eq!(report.pending_closures.len(), 1);
    assert_eq!(report.pending_closures[0].trip_id, entry.id);
    assert_eq!(report.pending_closures[0].fuel_record_id, record_id);

    h.store.set_fail_close(false);
    let closed = h.trips.close_trip(v.id, employee, check_out(100.0)).await.unwrap();
    assert_eq!(closed.fuel_record.id, record_id);
    assert!(!closed.entry.is_open());
    assert_eq!(h.ledger.history(v.id, None).await.unwrap().len(), 1);
    assert_eq!(h.ledger.current_balance(v.id).await.unwrap(), Some(-10.0));
}

#[tokio::test]
async fn test_concurrent_double_close_returns_the_same_record() {
    let v = vehicle(10.0);
    let h = Harness::new(vec![v.clone()], LedgerConfig::default());
    let employee = Uuid::new_v4();
    let entry = h
        .trips
        .open_trip(v.id, employee, check_in(1_000.0), DeviceInfo::default())
        .await
        .unwrap();

    // Ambos check-outs ven el viaje abierto antes de que el primero escriba
    h.store.set_latest_delay(Duration::from_millis(50));
    let (first, second) = tokio::join!(
        h.trips.close_trip(v.id, employee, check_out(1_120.0)),
        h.trips.close_trip(v.id, employee, check_out(1_120.0)),
    );
    h.store.set_latest_delay(Duration::ZERO);

    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.fuel_record.id, second.fuel_record.id);
    assert_eq!(first.entry.id, entry.id);
    assert_eq!(second.entry.id, entry.id);
    assert_eq!(second.entry.distance_driven, Some(120.0));

    assert_eq!(h.ledger.history(v.id, None).await.unwrap().len(), 1);
    assert!(!h.trips.get_trip(entry.id).await.unwrap().is_open());
    assert!(h.trips.reconcile().await.unwrap().pending_closures.is_empty());
}

#[tokio::test]
async fn test_failed_delete_is_finished_by_reconcile() {
    let v = vehicle(10.0);
    let h = Harness::new(vec![v.clone()], LedgerConfig::default());
    let employee = Uuid::new_v4();
    let entry = h
        .trips
        .open_trip(v.id, employee, check_in(0.0), DeviceInfo::default())
        .await
        .unwrap();
    h.trips.close_trip(v.id, employee, check_out(120.0)).await.unwrap();

    h.store.set_fail_delete(true);
    let err = h.trips.delete_trip(entry.id).await.unwrap_err();
    assert!(matches!(err, AppError::PartialWrite { .. }));
    assert!(h.trips.get_trip(entry.id).await.is_ok());
    assert_eq!(h.ledger.current_balance(v.id).await.unwrap(), Some(0.0));

    h.store.set_fail_delete(false);
    let report = h.trips.reconcile().await.unwrap();
    assert_eq!(report.completed_deletions, vec![entry.id]);
    assert!(matches!(h.trips.get_trip(entry.id).await, Err(AppError::NotFound(_))));

    // Nada más que reconciliar y sin compensaciones duplicadas
    let again = h.trips.reconcile().await.unwrap();
    assert!(again.completed_deletions.is_empty());
    assert_eq!(h.ledger.history(v.id, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_retry_reuses_compensation() {
    let v = vehicle(10.0);
    let h = Harness::new(vec![v.clone()], LedgerConfig::default());
    let employee = Uuid::new_v4();
    let entry = h
        .trips
        .open_trip(v.id, employee, check_in(0.0), DeviceInfo::default())
        .await
        .unwrap();
    h.trips.close_trip(v.id, employee, check_out(50.0)).await.unwrap();

    h.store.set_fail_delete(true);
    let first = h.trips.delete_trip(entry.id).await.unwrap_err();
    let AppError::PartialWrite { record_id, .. } = first else {
        panic!("expected PartialWrite, got {:?}", first);
    };

    h.store.set_fail_delete(false);
    let compensation = h.trips.delete_trip(entry.id).await.unwrap();
    assert_eq!(compensation.id, record_id);
    assert_eq!(h.ledger.current_balance(v.id).await.unwrap(), Some(0.0));
    assert!(matches!(h.trips.delete_trip(entry.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_open_trip_policies() {
    let v = vehicle(10.0);
    let employee = Uuid::new_v4();

    let reject = Harness::new(
        vec![v.clone()],
        LedgerConfig {
            open_trip_policy: OpenTripPolicy::Reject,
            ..LedgerConfig::default()
        },
    );
    reject
        .trips
        .open_trip(v.id, employee, check_in(0.0), DeviceInfo::default())
        .await
        .unwrap();
    assert!(matches!(
        reject
            .trips
            .open_trip(v.id, employee, check_in(0.0), DeviceInfo::default())
            .await,
        Err(AppError::Conflict(_))
    ));

    let newest_wins = Harness::new(vec![v.clone()], LedgerConfig::default());
    newest_wins
        .trips
        .open_trip(v.id, employee, check_in(0.0), DeviceInfo::default())
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newest = newest_wins
        .trips
        .open_trip(v.id, employee, check_in(10.0), DeviceInfo::default())
        .await
        .unwrap();
    assert_eq!(newest_wins.store.count_trips(true).await.unwrap(), 2);

    let closed = newest_wins
        .trips
        .close_trip(v.id, employee, check_out(30.0))
        .await
        .unwrap();
    assert_eq!(closed.entry.id, newest.id);
    assert_eq!(closed.fuel_record.new_fuel, -2.0);
}

#[tokio::test]
async fn test_list_trips_filters_and_orders_newest_first() {
    let v = vehicle(10.0);
    let other = vehicle(10.0);
    let h = Harness::new(vec![v.clone(), other.clone()], LedgerConfig::default());
    let employee = Uuid::new_v4();

    let first = h
        .trips
        .open_trip(v.id, employee, check_in(0.0), DeviceInfo::default())
        .await
        .unwrap();
    h.trips.close_trip(v.id, employee, check_out(10.0)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = h
        .trips
        .open_trip(v.id, employee, check_in(10.0), DeviceInfo::default())
        .await
        .unwrap();
    h.trips
        .open_trip(other.id, Uuid::new_v4(), check_in(0.0), DeviceInfo::default())
        .await
        .unwrap();

    let by_vehicle = h
        .trips
        .list_trips(&TripFilter {
            vehicle_id: Some(v.id),
            ..TripFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(
        by_vehicle.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    let open_only = h
        .trips
        .list_trips(&TripFilter {
            vehicle_id: Some(v.id),
            open_only: true,
            ..TripFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(open_only.len(), 1);
    assert_eq!(open_only[0].id, second.id);

    let paged = h
        .trips
        .list_trips(&TripFilter {
            limit: Some(1),
            offset: Some(1),
            ..TripFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
}

#[tokio::test]
async fn test_unknown_or_inactive_vehicle_cannot_open_trip() {
    let mut parked = vehicle(10.0);
    parked.is_active = false;
    let h = Harness::new(vec![parked.clone()], LedgerConfig::default());

    assert!(matches!(
        h.trips
            .open_trip(Uuid::new_v4(), Uuid::new_v4(), check_in(0.0), DeviceInfo::default())
            .await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        h.trips
            .open_trip(parked.id, Uuid::new_v4(), check_in(0.0), DeviceInfo::default())
            .await,
        Err(AppError::InvalidInput(_))
    ));

    // Reactivado en el registro, ya puede abrir viajes
    parked.is_active = true;
    h.registry.upsert(parked.clone()).await;
    assert!(h
        .trips
        .open_trip(parked.id, Uuid::new_v4(), check_in(0.0), DeviceInfo::default())
        .await
        .is_ok());
}
