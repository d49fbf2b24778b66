use super::*;
use serial_test::serial;

#[test]
fn defaults_match_spec_table() {
    let config = Config::default();
    assert_eq!(config.cache.ceiling, 10_000);
    assert_eq!(config.cache.ttl, Duration::from_secs(604_800));
    assert_eq!(config.warming.batch_size, 10);
    assert_eq!(config.migration.batch_size, 50);
    assert_eq!(config.migration.max_retries, 3);
    assert!(config.migration.verify);
    assert!(config.migration.enable_rollback);
    assert_eq!(config.compat.cache_ttl_hours, 24);
}

#[test]
#[serial]
fn from_env_overrides_defaults() {
    // SAFETY: guarded by `serial_test` so no other test observes env mutation races.
    unsafe {
        std::env::set_var(Config::ENV_CACHE_CEILING, "500");
    }
    let config = Config::from_env().expect("valid config");
    assert_eq!(config.cache.ceiling, 500);
    unsafe {
        std::env::remove_var(Config::ENV_CACHE_CEILING);
    }
}

#[test]
#[serial]
fn from_env_rejects_unparseable_values() {
    unsafe {
        std::env::set_var(Config::ENV_CACHE_CEILING, "not-a-number");
    }
    let result = Config::from_env();
    assert!(result.is_err());
    unsafe {
        std::env::remove_var(Config::ENV_CACHE_CEILING);
    }
}

#[test]
fn validate_rejects_zero_ceiling() {
    let mut config = Config::default();
    config.cache.ceiling = 0;
    assert!(config.validate().is_err());
}

#[test]
fn normalization_parses_known_values() {
    assert_eq!(
        "whitespace+lowercase".parse::<CacheNormalization>().unwrap(),
        CacheNormalization::WhitespaceLowercase
    );
    assert!("garbage".parse::<CacheNormalization>().is_err());
}
