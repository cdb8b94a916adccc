//! Registry behaviour under concurrent use

use std::sync::{Arc, Barrier};
use std::thread;

use fpe_registry::{FpeError, FpeRegistry, MockEngine, ProfileConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn profile(identity: &str, format: &str) -> ProfileConfig {
    ProfileConfig::new(
        "https://policy.example.com/policy/clientPolicy.xml",
        "/opt/fpe/trustStore",
        "/opt/fpe/cache",
        identity,
        "s3cret",
        format,
    )
}

fn same_shape(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.chars().zip(b.chars()).all(|(x, y)| {
            (x.is_ascii_digit() && y.is_ascii_digit())
                || (x.is_ascii_alphabetic() && y.is_ascii_alphabetic())
                || x == y
        })
}

#[test]
fn test_fpe_dev_scenario() -> anyhow::Result<()> {
    init_tracing();
    let registry = FpeRegistry::new(Arc::new(MockEngine::new()));
    registry.register("fpe-dev", profile("developer@example.com", "alphanumeric"))?;

    let plaintext = "12-10-2005 10:27:33";
    let cipher = registry.encrypt_by_id("fpe-dev", plaintext)?;
    assert!(same_shape(plaintext, &cipher), "{} vs {}", plaintext, cipher);
    assert_eq!(registry.decrypt_by_id("fpe-dev", &cipher)?, plaintext);

    assert_eq!(registry.delete_all(), 1);
    assert!(registry.encrypt_by_id("fpe-dev", plaintext).unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_format_preserved_for_mixed_text() -> anyhow::Result<()> {
    let registry = FpeRegistry::new(Arc::new(MockEngine::new()));
    registry.register("names", profile("developer@example.com", "alphanumeric"))?;
    registry.register("digits", profile("developer@example.com", "numeric"))?;

    for plaintext in ["John Smith", "AB-123-cd", "555 0100", "x"] {
        let cipher = registry.encrypt_by_id("names", plaintext)?;
        assert!(same_shape(plaintext, &cipher));
        assert_eq!(registry.decrypt_by_id("names", &cipher)?, plaintext);
    }

    let ssn = registry.encrypt_by_id("digits", "078-05-1120")?;
    assert!(same_shape("078-05-1120", &ssn));
    assert!(matches!(
        registry.encrypt_by_id("digits", "ABC"),
        Err(FpeError::Transform { .. })
    ));
    Ok(())
}

#[test]
fn test_concurrent_transforms_with_register() {
    init_tracing();
    const THREADS: usize = 8;
    const IDS: usize = 4;
    const ROUNDS: usize = 250;

    let engine = Arc::new(MockEngine::new());
    let registry = Arc::new(FpeRegistry::new(Arc::clone(&engine)));
    for i in 0..IDS {
        registry
            .register(
                format!("profile-{}", i),
                profile(&format!("user{}@example.com", i), "alphanumeric"),
            )
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(THREADS + 1));
    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    let id = format!("profile-{}", (t + round) % IDS);
                    let plaintext = format!("{}-{:05}-{}", t, round, "ZZtop");
                    let cipher = registry.encrypt_by_id(&id, &plaintext).unwrap();
                    assert_eq!(registry.decrypt_by_id(&id, &cipher).unwrap(), plaintext);
                }
            })
        })
        .collect();

    let writer = {
        let registry = Arc::clone(&registry);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            registry
                .register("late", profile("late@example.com", "numeric"))
                .unwrap();
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    writer.join().unwrap();

    assert_eq!(registry.len(), IDS + 1);
    assert_eq!(engine.live_libraries(), IDS + 1);
    assert_eq!(engine.transform_calls(), (THREADS * ROUNDS * 2) as u64);
}

#[test]
fn test_lookups_during_replace_see_old_or_new() {
    let engine = Arc::new(MockEngine::new());
    let registry = Arc::new(FpeRegistry::new(Arc::clone(&engine)));
    registry.register("rotating", profile("v0@example.com", "alphanumeric")).unwrap();

    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..500 {
                let cipher = registry.encrypt_by_id("rotating", "4111111111111111").unwrap();
                assert_eq!(cipher.len(), 16);
            }
        })
    };

    for version in 1..=20 {
        registry
            .register(
                "rotating",
                profile(&format!("v{}@example.com", version), "alphanumeric"),
            )
            .unwrap();
    }
    reader.join().unwrap();

    assert_eq!(engine.live_libraries(), 1);
    assert_eq!(engine.libraries_destroyed(), 20);
}

#[test]
fn test_concurrent_delete_all_releases_each_handle_once() {
    let engine = Arc::new(MockEngine::new());
    let registry = Arc::new(FpeRegistry::new(Arc::clone(&engine)));
    for i in 0..16 {
        registry
            .register(format!("p{}", i), profile("dev@example.com", "numeric"))
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.delete_all())
        })
        .collect();
    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 16);
    assert_eq!(engine.libraries_destroyed(), 16);
    assert_eq!(engine.transforms_destroyed(), 32);
}
