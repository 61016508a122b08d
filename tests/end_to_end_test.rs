use std::sync::Arc;
use std::time::Duration;

use fleet_core::{
    models::{OrderRef, OrderState, PointRef, ProcState, VehicleRef},
    AppConfig, Dispatcher, TransportOrderService, VehicleService,
};
use fleet_dispatch::{Application, ShutdownManager};
use fleet_infrastructure::PlantModelFile;
use fleet_testing_utils::wait_for;

const PLANT: &str = r#"
    [[points]]
    name = "A"

    [[points]]
    name = "B"

    [[points]]
    name = "C"

    [[points]]
    name = "P"
    type = "PARK"

    [[paths]]
    name = "A--B"
    source = "A"
    destination = "B"
    length = 1000

    [[paths]]
    name = "B--C"
    source = "B"
    destination = "C"
    length = 1000

    [[paths]]
    name = "C--P"
    source = "C"
    destination = "P"
    length = 200

    [[vehicles]]
    name = "Vehicle-01"
    position = "A"

    [[transport_orders]]
    name = "TOrder-1"
    destinations = [
        { target = { point = "B" }, operation = "NOP" },
        { target = { point = "C" }, operation = "NOP" },
    ]
"#;

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.loopback.millis_per_cost_unit = 0.001;
    config.dispatcher.idle_vehicle_redispatching_interval_ms = 50;
    config
}

#[tokio::test]
async fn test_loopback_vehicle_completes_order_and_parks() {
    let plant = PlantModelFile::from_toml(PLANT).unwrap();
    let app = Application::with_plant(fast_config(), plant).unwrap();
    let pool = app.pool().clone();

    app.dispatcher().initialize().unwrap();
    app.dispatcher().dispatch().unwrap();

    let order = OrderRef::new("TOrder-1");
    let finished = wait_for(
        || {
            pool.fetch_transport_order(&order)
                .is_some_and(|o| o.state == OrderState::Finished)
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(finished);

    let vehicle_ref = VehicleRef::new("Vehicle-01");
    let parked = wait_for(
        || {
            pool.fetch_vehicle(&vehicle_ref).is_some_and(|v| {
                v.current_position == Some(PointRef::new("P"))
                    && v.proc_state == ProcState::Idle
            })
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(parked);

    let vehicle = pool.fetch_vehicle(&vehicle_ref).unwrap();
    assert!(vehicle.transport_order.is_none());
    assert!(vehicle.energy_level < 100);

    app.dispatcher().terminate();
    app.dispatcher().wait_for_termination().await;
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() {
    let plant = PlantModelFile::from_toml(PLANT).unwrap();
    let app = Arc::new(Application::with_plant(fast_config(), plant).unwrap());
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = app.clone();
        let rx = shutdown.subscribe().await;
        tokio::spawn(async move { app.run(rx).await })
    };

    let pool = app.pool().clone();
    let order = OrderRef::new("TOrder-1");
    assert!(
        wait_for(
            || pool
                .fetch_transport_order(&order)
                .is_some_and(|o| o.state != OrderState::Dispatchable),
            Duration::from_secs(5),
        )
        .await
    );

    shutdown.shutdown().await;
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok());
    assert!(!app.dispatcher().is_initialized());
}

#[test]
fn test_invalid_config_is_rejected() {
    let plant = PlantModelFile::from_toml(PLANT).unwrap();
    let mut config = fast_config();
    config.dispatcher.order_priorities.clear();

    assert!(Application::with_plant(config, plant).is_err());
}

#[test]
fn test_missing_plant_file_is_reported() {
    let mut config = fast_config();
    config.plant.model_file = "/nonexistent/plant.toml".to_string();

    assert!(Application::new(config).is_err());
}

#[test]
fn test_sample_configuration_is_consistent() {
    let config = AppConfig::load(Some("config/fleet.toml")).unwrap();
    let plant = PlantModelFile::load(&config.plant.model_file).unwrap();

    assert!(Application::with_plant(config, plant).is_ok());
}
