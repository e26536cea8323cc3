// tests/watch_config.rs
use listing_watcher::config::watch::ENV_CONFIG_PATH;
use listing_watcher::WatchConfig;
use std::{env, fs};

#[test]
fn load_toml_and_json_files() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("watch.toml");
    fs::write(
        &p_toml,
        r#"
poll_interval_secs = 120

[[sources]]
name = "Jobs"
url = "https://site.test/jobs"
"#,
    )
    .unwrap();
    let t = WatchConfig::load_from(&p_toml).unwrap();
    assert_eq!(t.poll_interval_secs, 120);
    assert_eq!(t.sources.len(), 1);

    let p_json = dir.path().join("watch.json");
    fs::write(
        &p_json,
        r#"{"sources":[{"name":"A","url":"https://a.test"},{"name":"B","url":"https://b.test"}]}"#,
    )
    .unwrap();
    let j = WatchConfig::load_from(&p_json).unwrap();
    assert_eq!(j.poll_interval_secs, 300);
    assert_eq!(j.sources[1].name, "B");

    let p_bad = dir.path().join("bad.toml");
    fs::write(&p_bad, "sources = []").unwrap();
    assert!(WatchConfig::load_from(&p_bad).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    for k in [ENV_CONFIG_PATH, "CHECK_INTERVAL_SECS", "FETCH_TIMEOUT_SECS", "CHAT_ID", "TELEGRAM_CHAT_ID"] {
        env::remove_var(k);
    }

    // 1) Nothing on disk -> built-in defaults
    let d = WatchConfig::load_default().unwrap();
    assert_eq!(d, WatchConfig::default());

    // 2) Fallback TOML in ./config/
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/watch.toml"),
        "poll_interval_secs = 90\n[[sources]]\nname = \"X\"\nurl = \"https://x.test\"\n",
    )
    .unwrap();
    assert_eq!(WatchConfig::load_default().unwrap().poll_interval_secs, 90);

    // 3) Env path wins; a missing path is an error
    let p_env = tmp.path().join("other.json");
    fs::write(&p_env, r#"{"poll_interval_secs":15,"sources":[{"name":"Y","url":"https://y.test"}]}"#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    let e = WatchConfig::load_default().unwrap();
    assert_eq!(e.poll_interval_secs, 15);
    assert_eq!(e.sources[0].name, "Y");

    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(WatchConfig::load_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}
