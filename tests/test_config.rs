use std::sync::Mutex;

use polyport::config::{Config, Port};
use polyport::{Server, ServerError};

// Tests that touch the process environment take this lock.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const ENV_KEYS: [&str; 5] = [
    "PORT",
    "ORIGIN",
    "PUBLIC_DIR",
    "CLASSIFY_TIMEOUT_MS",
    "MAX_BODY_BYTES",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = Config::load().unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.origin, "*");
    assert!(cfg.public_dir.is_none());
    assert_eq!(cfg.classify_timeout_ms, 10_000);
}

#[test]
fn test_config_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    unsafe {
        std::env::set_var("PORT", "3000");
        std::env::set_var("ORIGIN", "https://example.com");
        std::env::set_var("MAX_BODY_BYTES", "1024");
    }

    let cfg = Config::load().unwrap();
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.origin, "https://example.com");
    assert_eq!(cfg.max_body_bytes, 1024);

    clear_env();
}

#[test]
fn test_config_rejects_non_integer_port_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    for bad in ["abc", "3.5", "-1", "70000"] {
        unsafe {
            std::env::set_var("PORT", bad);
        }
        assert!(
            matches!(Config::load(), Err(ServerError::InvalidPort { .. })),
            "PORT={bad} should be rejected"
        );
    }

    clear_env();
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml_str(
        "port: 9000\norigin: https://app.test\npublic_dir: ./public\n",
    )
    .unwrap();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.origin, "https://app.test");
    assert_eq!(cfg.public_dir.as_deref(), Some(std::path::Path::new("./public")));
    assert_eq!(cfg.max_body_bytes, Config::default().max_body_bytes);
}

#[test]
fn test_config_from_yaml_rejects_bad_port() {
    assert!(matches!(
        Config::from_yaml_str("port: abc\n"),
        Err(ServerError::Config(_))
    ));
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.port, cfg2.port);
}

#[test]
fn test_port_validation() {
    assert_eq!(Port::try_from(0).unwrap().get(), 0);
    assert_eq!(Port::try_from("8080").unwrap().get(), 8080);
    assert!(Port::try_from("abc").is_err());
    assert!(Port::try_from("3.5").is_err());
    assert!(Port::try_from(3.5).is_err());
    assert!(Port::try_from(-1).is_err());
    assert!(Port::try_from(65_536u32).is_err());
}

#[test]
fn test_server_construction_validates_port() {
    assert!(matches!(
        Server::new("abc"),
        Err(ServerError::InvalidPort { .. })
    ));
    assert!(matches!(
        Server::new(3.5),
        Err(ServerError::InvalidPort { .. })
    ));

    let server = Server::with_origin(4000, "https://a.test").unwrap();
    assert_eq!(server.port(), 4000);
}

#[test]
fn test_server_from_config_with_missing_public_dir() {
    let cfg = Config {
        public_dir: Some("/definitely/not/here".into()),
        ..Config::default()
    };

    assert!(matches!(
        Server::from_config(&cfg),
        Err(ServerError::DirectoryNotFound(_))
    ));
}
