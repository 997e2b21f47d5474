mod support;

use std::sync::Arc;
use std::time::Duration;

use glue_rt::{is_registered, CallbackId, Glue, GlueConfig, GlueError, GlueState, StateHandler};
use parking_lot::Mutex;

use support::fake::FakeGlue;
use support::{init_logger, wait_until};

fn init_id(fake: &FakeGlue) -> CallbackId {
    let (_, cookie) = fake.state.lock().init.expect("init was not called");
    CallbackId::from_cookie(cookie as *mut _).expect("init cookie")
}

fn recorder() -> (Arc<Mutex<Vec<GlueState>>>, StateHandler) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Box::new(move |state: GlueState, _: &str| sink.lock().push(state)))
}

#[tokio::test]
async fn connecting_then_initialized_resolves_true() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());
    let (seen, handler) = recorder();

    let handshake = glue.initialize("tests", Some(handler));
    assert!(handshake.is_pending());
    let id = init_id(&fake);
    assert!(is_registered(id));

    let library = fake.fire_init_from_thread(vec![GlueState::Connecting, GlueState::Initialized]);
    assert!(handshake.await);
    library.join().unwrap();

    assert_eq!(*seen.lock(), [GlueState::Connecting, GlueState::Initialized]);
    assert!(!is_registered(id));
    assert_eq!(fake.state.lock().app_name.as_deref(), Some("tests"));
}

#[tokio::test]
async fn connecting_then_disconnected_resolves_false() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());
    let (seen, handler) = recorder();

    let handshake = glue.initialize("tests", Some(handler));
    let library = fake.fire_init_from_thread(vec![GlueState::Connecting, GlueState::Disconnected]);
    assert!(!handshake.await);
    library.join().unwrap();

    assert_eq!(*seen.lock(), [GlueState::Connecting, GlueState::Disconnected]);
    assert!(!is_registered(init_id(&fake)));
}

#[tokio::test]
async fn failing_init_call_resolves_false_without_callbacks() {
    init_logger();
    let fake = FakeGlue::new();
    fake.set_call_status(-3);
    let glue = Glue::new(fake.clone());

    let handshake = glue.initialize("tests", None);
    assert!(!handshake.is_pending());
    assert!(!handshake.await);
    assert!(!is_registered(init_id(&fake)));
}

#[tokio::test]
async fn intermediate_states_do_not_resolve() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());

    let handshake = glue.initialize("tests", None);
    fake.fire_init(GlueState::Connecting, "connecting");
    fake.fire_init(GlueState::Connected, "connected");

    let outcome = tokio::time::timeout(Duration::from_millis(50), handshake).await;
    assert!(outcome.is_err(), "handshake resolved before a terminal state");
}

#[tokio::test]
async fn states_after_resolution_are_dropped() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());
    let (seen, handler) = recorder();

    let handshake = glue.initialize("tests", Some(handler));
    fake.fire_init(GlueState::Initialized, "ready");
    assert!(handshake.await);

    // the library keeps the old cookie
    fake.fire_init(GlueState::Disconnected, "gone");
    assert_eq!(*seen.lock(), [GlueState::Initialized]);
}

#[tokio::test]
async fn panicking_state_handler_still_resolves() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());

    let handshake = glue.initialize("tests", Some(Box::new(|_: GlueState, _: &str| panic!("observer failed"))));
    let library = fake.fire_init_from_thread(vec![GlueState::Initialized]);
    assert!(handshake.await);
    library.join().unwrap();
}

#[tokio::test]
async fn dropping_the_handshake_unregisters() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());

    let handshake = glue.initialize("tests", None);
    let id = init_id(&fake);
    assert!(is_registered(id));
    drop(handshake);
    assert!(!is_registered(id));

    // a late state is tolerated
    fake.fire_init(GlueState::Initialized, "late");
}

#[tokio::test]
async fn timeout_is_reported() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());

    let err = glue
        .initialize_with_timeout("tests", None, Duration::from_millis(30))
        .await
        .unwrap_err();
    assert!(matches!(err, GlueError::HandshakeTimeout(_)));
    assert!(!is_registered(init_id(&fake)));
}

#[tokio::test]
async fn disconnection_is_a_failed_handshake() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());

    let library = {
        let fake = fake.clone();
        std::thread::spawn(move || {
            assert!(wait_until(|| fake.state.lock().init.is_some()));
            fake.fire_init(GlueState::Disconnected, "refused");
        })
    };
    let err = glue
        .initialize_with_timeout("tests", None, Duration::from_secs(2))
        .await
        .unwrap_err();
    library.join().unwrap();
    assert!(matches!(err, GlueError::HandshakeFailed));
}

#[tokio::test]
async fn configured_initialization_uses_config() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());
    let config = GlueConfig::from_toml_str("[app]\nname = \"configured\"\n[handshake]\ntimeout_ms = 2000\n").unwrap();

    let library = {
        let fake = fake.clone();
        std::thread::spawn(move || {
            assert!(wait_until(|| fake.state.lock().init.is_some()));
            fake.fire_init(GlueState::Initialized, "ready");
        })
    };
    glue.initialize_configured(&config, None).await.unwrap();
    library.join().unwrap();
    assert_eq!(fake.state.lock().app_name.as_deref(), Some("configured"));
}

#[test]
fn blocking_initialization() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());

    let library = {
        let fake = fake.clone();
        std::thread::spawn(move || {
            assert!(wait_until(|| fake.state.lock().init.is_some()));
            fake.fire_init(GlueState::Connecting, "connecting");
            fake.fire_init(GlueState::Initialized, "ready");
        })
    };
    glue.initialize_blocking("blocking", None, Duration::from_secs(2)).unwrap();
    library.join().unwrap();
    assert!(!is_registered(init_id(&fake)));
}

#[test]
fn blocking_initialization_times_out() {
    init_logger();
    let fake = FakeGlue::new();
    let glue = Glue::new(fake.clone());

    let err = glue
        .initialize_blocking("blocking", None, Duration::from_millis(30))
        .unwrap_err();
    assert!(matches!(err, GlueError::HandshakeTimeout(d) if d == Duration::from_millis(30)));
    assert!(!is_registered(init_id(&fake)));
}

#[test]
fn blocking_initialization_with_failing_call() {
    init_logger();
    let fake = FakeGlue::new();
    fake.set_call_status(1);
    let glue = Glue::new(fake.clone());

    let err = glue
        .initialize_blocking("blocking", None, Duration::from_secs(2))
        .unwrap_err();
    assert!(matches!(err, GlueError::HandshakeFailed));
}

#[test]
fn app_name_with_nul_is_rejected() {
    init_logger();
    let glue = Glue::new(FakeGlue::new());
    let err = glue
        .initialize_blocking("bad\0name", None, Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(err, GlueError::Codec(_)));
}
