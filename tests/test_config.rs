use std::time::Duration;

use burrow::addr::Addr;
use burrow::config::Config;

#[test]
fn test_config_defaults_from_minimal_yaml() {
    let cfg = Config::from_yaml_str(
        "local_port: 3000\nkey: secret\nbroker: tunnel.example.com\n",
    )
    .unwrap();

    assert_eq!(cfg.local_host, "127.0.0.1");
    assert_eq!(cfg.local_port, 3000);
    assert_eq!(cfg.pool_size, 5);
    assert_eq!(cfg.pipe_chunk_size, 1024);
    assert_eq!(cfg.response_chunk_size, 64);
    assert_eq!(cfg.max_header_bytes, 8192);
    assert_eq!(cfg.retry_interval(), Duration::from_secs(3));
}

#[test]
fn test_config_overrides_from_yaml() {
    let cfg = Config::from_yaml_str(
        r#"
local_host: 10.0.0.2
local_port: 8080
key: secret
broker: "http://tunnel.example.com:9000"
pool_size: 1
pipe_chunk_size: 7
retry_interval_ms: 50
"#,
    )
    .unwrap();

    assert_eq!(cfg.local_addr(), Addr::new("10.0.0.2", 8080));
    assert_eq!(cfg.pool_size, 1);
    assert_eq!(cfg.pipe_chunk_size, 7);
    assert_eq!(cfg.retry_interval(), Duration::from_millis(50));
}

#[test]
fn test_config_missing_required_field() {
    let result = Config::from_yaml_str("local_port: 3000\nkey: secret\n");
    assert!(result.is_err());
}

#[test]
fn test_config_rejects_zero_pool_size() {
    let result = Config::from_yaml_str(
        "local_port: 3000\nkey: secret\nbroker: b\npool_size: 0\n",
    );
    assert!(result.is_err());
}

#[test]
fn test_config_rejects_zero_chunk_size() {
    let mut cfg = Config::new(3000, "secret", "broker");
    cfg.pipe_chunk_size = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_rejects_zero_max_header_bytes() {
    let mut cfg = Config::new(3000, "secret", "broker");
    cfg.max_header_bytes = 0;
    assert!(cfg.validate().is_err());

    let yaml = "local_port: 3000\nkey: secret\nbroker: broker\nmax_header_bytes: 0\n";
    assert!(Config::from_yaml_str(yaml).is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::new(3000, "secret", "broker:7000");
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.broker, cfg2.broker);
    assert_eq!(cfg1.key, cfg2.key);
}

#[test]
fn test_config_load_from_env() {
    unsafe {
        std::env::remove_var("BURROW_CONFIG");
        std::env::set_var("BURROW_LOCAL_PORT", "4000");
        std::env::set_var("BURROW_KEY", "env-secret");
        std::env::set_var("BURROW_BROKER", "broker.example.com:7000");
    }

    let cfg = Config::load().unwrap();
    assert_eq!(cfg.local_port, 4000);
    assert_eq!(cfg.key, "env-secret");
    assert_eq!(cfg.broker, "broker.example.com:7000");
    assert_eq!(cfg.local_host, "127.0.0.1");

    unsafe {
        std::env::set_var("BURROW_LOCAL_PORT", "not-a-port");
    }
    assert!(Config::load().is_err());

    unsafe {
        std::env::remove_var("BURROW_LOCAL_PORT");
        std::env::remove_var("BURROW_KEY");
        std::env::remove_var("BURROW_BROKER");
    }
}

#[test]
fn test_addr_parse_forms() {
    assert_eq!(Addr::parse("broker.io").unwrap(), Addr::new("broker.io", 80));
    assert_eq!(
        Addr::parse("broker.io:7000").unwrap(),
        Addr::new("broker.io", 7000)
    );
    assert_eq!(
        Addr::parse("http://broker.io:9000/").unwrap(),
        Addr::new("broker.io", 9000)
    );
    assert_eq!(
        Addr::parse("https://broker.io").unwrap(),
        Addr::new("broker.io", 443)
    );
    assert!(Addr::parse("broker.io:notaport").is_err());
    assert!(Addr::parse("").is_err());
}

#[test]
fn test_addr_parse_ipv6_literals() {
    assert_eq!(Addr::parse("[::1]:8080").unwrap(), Addr::new("::1", 8080));
    assert_eq!(Addr::parse("::1").unwrap(), Addr::new("::1", 80));
    assert_eq!(Addr::parse("[::1]").unwrap(), Addr::new("::1", 80));
    assert_eq!(
        Addr::parse("http://[::1]:9000/").unwrap(),
        Addr::new("::1", 9000)
    );
    assert!(Addr::parse("[::1").is_err());

    assert_eq!(Addr::new("::1", 8080).to_string(), "[::1]:8080");
}

#[test]
fn test_addr_parse_keeps_scheme() {
    let (scheme, addr) = Addr::parse_with_scheme("https://broker.io").unwrap();
    assert_eq!(scheme, "https");
    assert_eq!(addr.port, 443);

    let (scheme, addr) = Addr::parse_with_scheme("broker.io:7000").unwrap();
    assert_eq!(scheme, "http");
    assert_eq!(addr.port, 7000);
}

#[tokio::test]
async fn test_addr_resolves_ipv6_literal() {
    let resolved = Addr::parse("[::1]:7000").unwrap().resolve().await.unwrap();
    assert_eq!(resolved, "[::1]:7000");
}

#[tokio::test]
async fn test_addr_resolves_ip_literal() {
    let resolved = Addr::new("127.0.0.1", 7000).resolve().await.unwrap();
    assert_eq!(resolved, "127.0.0.1:7000");
}
