use backend_lib::config::{ConfigError, Settings};
use figment::Jail;

#[test]
fn test_load_from_file_and_env() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "service.toml",
            r#"
            bind_addr = "127.0.0.1:9000"
            log_format = "json"

            [database]
            url = "postgres://accounts@db/accounts"

            [token]
            secret = "from-file"
            expire_minutes = 15
            "#,
        )?;
        jail.set_env("ACCOUNT_TOKEN__SECRET", "from-env");
        jail.set_env("ACCOUNT_CACHE__URL", "redis://cache:6379");

        let settings = Settings::load_from("service.toml").expect("settings load");
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.log_format, "json");
        assert_eq!(settings.database.url, "postgres://accounts@db/accounts");
        assert_eq!(settings.token.secret, "from-env");
        assert_eq!(settings.token.expire_minutes, 15);
        assert_eq!(settings.cache.url.as_deref(), Some("redis://cache:6379"));
        Ok(())
    });
}

#[test]
fn test_missing_file_uses_defaults() {
    Jail::expect_with(|jail| {
        jail.set_env("ACCOUNT_TOKEN__SECRET", "only-env");

        let settings = Settings::load_from("does-not-exist.toml").expect("settings load");
        assert_eq!(settings.token.secret, "only-env");
        assert_eq!(settings.token.algorithm, "HS256");
        assert!(settings.cache.url.is_none());
        Ok(())
    });
}

#[test]
fn test_invalid_algorithm_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("ACCOUNT_TOKEN__SECRET", "secret");
        jail.set_env("ACCOUNT_TOKEN__ALGORITHM", "ES256");

        assert!(matches!(
            Settings::load_from("does-not-exist.toml"),
            Err(ConfigError::Invalid(_))
        ));
        Ok(())
    });
}
