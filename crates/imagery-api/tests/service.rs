//! Service startup and shutdown ordering tests.

mod common;

use std::time::Duration;

use tokio::sync::mpsc;

use common::{publishing_config, Calls, FakeInit, Release};
use imagery_api::service::checks;
use imagery_api::{
    Acquired, Dependency, DependencyError, HealthError, Service, ServiceConfig, ServiceError,
};

fn errors() -> mpsc::Sender<ServiceError> {
    mpsc::channel(1).0
}

#[tokio::test]
async fn store_failure_stops_startup() {
    let init = FakeInit {
        fail_store: true,
        ..FakeInit::default()
    };

    let failure = Service::run(publishing_config(), &init, errors())
        .await
        .err()
        .unwrap();

    assert!(matches!(
        failure.error,
        ServiceError::Acquire {
            dependency: Dependency::Store,
            ..
        }
    ));
    assert_eq!(failure.acquired(), Acquired::default());
    assert_eq!(Calls::get(&init.calls.permissions_created), 0);
    assert_eq!(Calls::get(&init.calls.producers_created), 0);
    assert_eq!(Calls::get(&init.calls.health_created), 0);
    assert_eq!(Calls::get(&init.calls.add_check), 0);
}

#[tokio::test]
async fn producer_failure_keeps_earlier_acquisitions() {
    let init = FakeInit {
        fail_published_producer: true,
        ..FakeInit::default()
    };

    let failure = Service::run(publishing_config(), &init, errors())
        .await
        .err()
        .unwrap();

    assert!(matches!(
        failure.error,
        ServiceError::Acquire {
            dependency: Dependency::PublishedProducer,
            ..
        }
    ));
    let acquired = failure.acquired();
    assert!(acquired.store);
    assert!(acquired.permissions);
    assert!(acquired.uploaded_producer);
    assert!(!acquired.published_producer);
    assert!(!acquired.health_monitor);
    assert!(!acquired.listener);

    // The partially started service can still be released.
    failure.service.close(Duration::from_secs(1)).await.unwrap();
    assert_eq!(Calls::get(&init.calls.store_close), 1);
    assert_eq!(Calls::get(&init.calls.producer_close), 1);
    assert_eq!(Calls::get(&init.calls.listener_shutdown), 0);
}

#[tokio::test]
async fn publishing_startup_registers_every_check() {
    let init = FakeInit::default();

    let service = Service::run(publishing_config(), &init, errors())
        .await
        .unwrap();

    assert_eq!(
        service.acquired,
        Acquired {
            listener: true,
            store: true,
            permissions: true,
            uploaded_producer: true,
            published_producer: true,
            health_monitor: true,
        }
    );
    assert_eq!(
        init.registered_checks(),
        vec![
            checks::STORE,
            checks::UPLOADED_PRODUCER,
            checks::PUBLISHED_PRODUCER,
            checks::PERMISSIONS,
        ]
    );
    assert_eq!(Calls::get(&init.calls.health_start), 1);

    service.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn web_startup_skips_producers() {
    let init = FakeInit::default();
    let config = ServiceConfig {
        publishing: false,
        ..publishing_config()
    };

    let service = Service::run(config, &init, errors()).await.unwrap();

    assert!(!service.acquired.permissions);
    assert!(!service.acquired.uploaded_producer);
    assert!(!service.acquired.published_producer);
    assert_eq!(Calls::get(&init.calls.producers_created), 0);
    assert_eq!(init.registered_checks(), vec![checks::STORE]);

    service.close(Duration::from_secs(1)).await.unwrap();
    assert_eq!(Calls::get(&init.calls.producer_close), 0);
}

#[tokio::test]
async fn listener_failure_reaches_error_channel() {
    let init = FakeInit {
        fail_serve: true,
        ..FakeInit::default()
    };
    let (errors_tx, mut errors_rx) = mpsc::channel(1);

    let service = Service::run(publishing_config(), &init, errors_tx)
        .await
        .unwrap();

    let error = tokio::time::timeout(Duration::from_secs(1), errors_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        error,
        ServiceError::Listener(DependencyError::Unavailable(_))
    ));

    service.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn registration_failures_are_collected() {
    let init = FakeInit {
        reject_checks: vec![
            checks::STORE.to_string(),
            checks::PERMISSIONS.to_string(),
        ],
        ..FakeInit::default()
    };

    let failure = Service::run(publishing_config(), &init, errors())
        .await
        .err()
        .unwrap();

    // Every check was attempted despite the first rejection.
    assert_eq!(Calls::get(&init.calls.add_check), 4);
    match &failure.error {
        ServiceError::RegisterChecks(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(matches!(&errors[0], HealthError::Rejected { name, .. } if name == checks::STORE));
        }
        other => panic!("expected RegisterChecks, got {other:?}"),
    }
    assert_eq!(Calls::get(&init.calls.health_start), 0);
}

#[tokio::test]
async fn shutdown_attempts_every_release_despite_failure() {
    let init = FakeInit {
        store_release: Release::Fail,
        ..FakeInit::default()
    };

    let service = Service::run(publishing_config(), &init, errors())
        .await
        .unwrap();
    let result = service.close(Duration::from_secs(1)).await;

    match result {
        Err(ServiceError::Shutdown(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].dependency, Dependency::Store);
        }
        other => panic!("expected Shutdown, got {other:?}"),
    }

    // health stop, listener shutdown, store close and both producer closes
    assert_eq!(Calls::get(&init.calls.health_stop), 1);
    assert_eq!(Calls::get(&init.calls.listener_shutdown), 1);
    assert_eq!(Calls::get(&init.calls.store_close), 1);
    assert_eq!(Calls::get(&init.calls.producer_close), 2);
}

#[tokio::test]
async fn shutdown_times_out_on_hanging_release() {
    let init = FakeInit {
        store_release: Release::Hang,
        ..FakeInit::default()
    };

    let service = Service::run(publishing_config(), &init, errors())
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    let result = service.close(Duration::from_millis(50)).await;

    assert!(matches!(result, Err(ServiceError::ShutdownTimeout)));
    assert!(started.elapsed() < Duration::from_secs(5));
    // Producers are never reached while the store close hangs.
    assert_eq!(Calls::get(&init.calls.producer_close), 0);
}

#[tokio::test]
async fn clean_shutdown_succeeds() {
    let init = FakeInit::default();

    let service = Service::run(publishing_config(), &init, errors())
        .await
        .unwrap();

    assert!(service.close(Duration::from_secs(1)).await.is_ok());
    assert_eq!(Calls::get(&init.calls.producer_close), 2);
}
