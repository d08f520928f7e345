use std::sync::{Arc, Barrier};
use std::thread;

use engine_core::{
    ContextConfig, EngineContext, EngineError, NativeEngine, RetryExhaustion, SignatureEngine,
    DEFAULT_MAX_FIPS_ATTEMPTS,
};
use software_engine::{SoftwareEngine, SoftwareEngineConfig, ENGINE_VERSION};

fn engine_with(config: SoftwareEngineConfig) -> Arc<SoftwareEngine> {
    let _ = telemetry::init_logging(&telemetry::LogConfig::default());
    Arc::new(SoftwareEngine::new(config))
}

fn flaky(failures: u32) -> Arc<SoftwareEngine> {
    engine_with(SoftwareEngineConfig {
        fips_self_test_failures: failures,
        ..SoftwareEngineConfig::default()
    })
}

// ============================================================================
// FIPS initialization
// ============================================================================

#[test]
fn test_fips_self_test_flakes_are_retried() {
    let engine = flaky(3);
    let context = EngineContext::create(engine, true).unwrap();

    assert!(context.is_fips());
    assert!(context.handle().is_valid());
    assert!(context.fips_approved_mode().unwrap());
}

#[test]
fn test_fips_flake_on_every_attempt_fails() {
    let engine = flaky(DEFAULT_MAX_FIPS_ATTEMPTS);
    let error = EngineContext::create(engine.clone(), true).unwrap_err();

    assert!(matches!(error, EngineError::Init(_)));
    // All attempts were consumed, so the next FIPS context comes up first time.
    assert!(EngineContext::create(engine, true).is_ok());
}

#[test]
fn test_last_flake_before_limit_still_succeeds() {
    let engine = flaky(DEFAULT_MAX_FIPS_ATTEMPTS - 1);
    assert!(EngineContext::create(engine, true).is_ok());
}

#[test]
fn test_engine_without_fips_support_fails_init() {
    let engine = engine_with(SoftwareEngineConfig {
        fips_capable: false,
        ..SoftwareEngineConfig::default()
    });

    match EngineContext::create(engine.clone(), true) {
        Err(EngineError::Init(message)) => {
            assert!(message.to_lowercase().contains("not in fips mode"), "{}", message)
        }
        other => panic!("expected Init error, got {:?}", other),
    }

    let plain = EngineContext::create(engine, false).unwrap();
    assert!(!plain.fips_approved_mode().unwrap());
}

#[test]
fn test_legacy_exhaustion_yields_invalid_handle() {
    let engine = flaky(2);
    let config = ContextConfig {
        max_fips_attempts: 2,
        on_exhausted_retries: RetryExhaustion::InvalidHandle,
        ..ContextConfig::default().without_validation()
    };

    let context = EngineContext::create_with_config(engine, true, &config).unwrap();
    assert!(!context.handle().is_valid());

    // Operations on the dead context surface as engine failures, not panics.
    assert!(SignatureEngine::new(Arc::new(context), "SHA256").is_err());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_location_mismatch_fails_init() {
    let engine = engine_with(SoftwareEngineConfig {
        install_path: "/usr/lib/engine".to_string(),
        expected_install_path: Some("/opt/engine".to_string()),
        ..SoftwareEngineConfig::default()
    });

    let config = ContextConfig {
        validate_location: true,
        ..ContextConfig::default()
    };
    assert!(matches!(
        EngineContext::create_with_config(engine.clone(), false, &config),
        Err(EngineError::Init(_))
    ));

    let skipped = ContextConfig::default().without_validation();
    assert!(EngineContext::create_with_config(engine, false, &skipped).is_ok());
}

#[test]
fn test_version_mismatch_fails_only_when_enabled() {
    let engine = engine_with(SoftwareEngineConfig {
        expected_version: Some("0.0.0-other".to_string()),
        ..SoftwareEngineConfig::default()
    });

    let without = ContextConfig {
        validate_version: false,
        ..ContextConfig::default()
    };
    assert!(EngineContext::create_with_config(engine.clone(), false, &without).is_ok());

    let with = ContextConfig {
        validate_version: true,
        ..ContextConfig::default()
    };
    assert!(matches!(
        EngineContext::create_with_config(engine, false, &with),
        Err(EngineError::Init(_))
    ));
}

#[test]
fn test_matching_expectations_pass_validation() {
    let engine = engine_with(SoftwareEngineConfig {
        install_path: "/opt/engine".to_string(),
        expected_install_path: Some("/opt/engine".to_string()),
        expected_version: Some(ENGINE_VERSION.to_string()),
        ..SoftwareEngineConfig::default()
    });
    let config = ContextConfig {
        validate_location: true,
        validate_version: true,
        ..ContextConfig::default()
    };

    assert!(EngineContext::create_with_config(engine, false, &config).is_ok());
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_metadata_accessors() {
    let engine = engine_with(SoftwareEngineConfig {
        install_path: "/opt/engine".to_string(),
        ..SoftwareEngineConfig::default()
    });
    let context = EngineContext::create(engine.clone(), false).unwrap();

    assert_eq!(context.version().unwrap(), ENGINE_VERSION);
    assert_eq!(context.install_path().unwrap(), "/opt/engine");
    assert_eq!(context.library_build_date(), engine_core::library_build_date(engine.as_ref()));
    assert_eq!(
        context.to_string(),
        format!("EngineContext [isFIPS=false, id={}]", context.handle())
    );
}

#[test]
fn test_concurrent_metadata_readers_agree() {
    let engine = engine_with(SoftwareEngineConfig::default());
    let context = Arc::new(EngineContext::create(engine, false).unwrap());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let context = Arc::clone(&context);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let version = context.version().unwrap().as_ptr() as usize;
                let path = context.install_path().unwrap().as_ptr() as usize;
                (version, path)
            })
        })
        .collect();

    let observed: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // Every reader got the same cached allocation.
    assert!(observed.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_contexts_are_independent() {
    let engine = engine_with(SoftwareEngineConfig::default());
    let first = EngineContext::create(engine.clone(), false).unwrap();
    let second = EngineContext::create(engine.clone(), true).unwrap();

    assert_ne!(first.handle(), second.handle());
    assert!(!first.fips_approved_mode().unwrap());
    assert!(second.fips_approved_mode().unwrap());
    assert!(engine.validate_library_location(first.handle()).is_ok());
}
