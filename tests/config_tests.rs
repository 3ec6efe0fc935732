use std::fs;
use std::path::PathBuf;

use paygate::error::{ConfigError, Error};
use paygate::infrastructure::config::Config;
use tempfile::TempDir;

fn write_temp_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).expect("write temp config");
    (dir, path)
}

#[test]
fn config_loads_full_file() {
    let toml = r#"
[logging]
level = "debug"
format = "json"

[chain]
rpc_url = "https://sepolia.base.org"
chain_id = 84532

[llm]
default_model = "llama-3.2-3b"

[monitor]
poll_initial_ms = 250
stuck_ceiling_secs = 30

[allowance]
follow_up_delays_ms = [500, 2000]

[deposit]
min_deposit = "0.05"

[query]
gas_limit = 300000
"#;

    let (_dir, path) = write_temp_config(toml);
    let config = Config::load(&path).expect("config loads");

    assert_eq!(config.logging.format, "json");
    assert_eq!(config.chain.chain_id, 84532);
    assert_eq!(config.llm.default_model, "llama-3.2-3b");
    assert_eq!(config.monitor.stuck_ceiling_secs, 30);
    assert_eq!(config.allowance.follow_up_delays_ms, vec![500, 2000]);
    assert_eq!(config.deposit.min_deposit.to_string(), "0.05");
    assert_eq!(config.query.gas_limit, 300_000);
}

#[test]
fn config_rejects_shrinking_backoff() {
    let (_dir, path) = write_temp_config("[monitor]\npoll_multiplier = 0.5\n");

    match Config::load(&path) {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "poll_multiplier",
            ..
        })) => {}
        Err(err) => panic!("Expected invalid multiplier error, got {err}"),
        Ok(_) => panic!("Expected invalid multiplier to be rejected"),
    }
}

#[test]
fn config_rejects_bad_contract_address() {
    let (_dir, path) = write_temp_config("[chain]\nquery_tool = \"0x1234\"\n");

    match Config::load(&path) {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => {
            assert_eq!(field, "query_tool");
        }
        Err(err) => panic!("Expected invalid address error, got {err}"),
        Ok(_) => panic!("Expected invalid address to be rejected"),
    }
}

#[test]
fn config_rejects_unlisted_default_model() {
    let toml = "[llm]\ndefault_model = \"gpt-9\"\nmodels = [\"mistral-31-24b\"]\n";
    let (_dir, path) = write_temp_config(toml);

    assert!(matches!(
        Config::load(&path),
        Err(Error::Config(ConfigError::InvalidValue {
            field: "default_model",
            ..
        }))
    ));
}

#[test]
fn config_reports_toml_syntax_errors() {
    let (_dir, path) = write_temp_config("[chain\nchain_id = 1\n");

    assert!(matches!(
        Config::load(&path),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn config_missing_file_is_read_error() {
    let dir = tempfile::tempdir().expect("create temp dir");

    assert!(matches!(
        Config::load(dir.path().join("absent.toml")),
        Err(Error::Config(ConfigError::ReadFile(_)))
    ));
}
