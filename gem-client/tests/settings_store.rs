use std::io::Write;

use gem_client::settings_store::{
    MAX_SETTINGS_BYTES, SettingsStore, load_settings_from_path, save_settings_to_path,
};
use gem_core::{MailMethod, Settings};

#[test]
fn save_then_load_roundtrips() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("settings.json");

    let settings = Settings {
        preferred_mail: Some(MailMethod::Gmail),
        blacklisted_apps: vec!["keepass".into(), "zoom".into()],
        blacklisted_windows: vec!["Incognito".into(), "Online Banking".into()],
    };
    save_settings_to_path(&path, &settings).expect("save settings");

    let loaded = load_settings_from_path(&path).expect("load settings");
    assert_eq!(loaded, settings);
}

#[test]
fn missing_or_corrupt_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("settings.json");

    let store = SettingsStore::load(&path);
    assert_eq!(store.settings(), &Settings::default());

    std::fs::write(&path, "{ definitely not json").expect("write corrupt file");
    let store = SettingsStore::load(&path);
    assert_eq!(store.settings().preferred_mail, None);
    assert!(store.settings().blacklisted_apps.is_empty());
}

#[test]
fn oversized_file_is_refused() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("settings.json");

    let mut file = std::fs::File::create(&path).expect("create settings.json");
    file.write_all(&vec![b' '; (MAX_SETTINGS_BYTES as usize) + 1024])
        .expect("write oversized settings.json");
    drop(file);

    let err = load_settings_from_path(&path).expect_err("oversized file should error");
    assert!(err.to_string().contains("too large"), "unexpected error: {err}");
}

#[test]
fn added_entries_are_persisted_immediately() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("config").join("settings.json");

    let mut store = SettingsStore::load(&path);
    assert!(store.add_app("  discord ").expect("add app"));
    assert!(store.add_window("Password Manager").expect("add window"));
    assert!(!store.add_app("   ").expect("blank app is ignored"));

    let fresh = SettingsStore::load(&path);
    assert_eq!(fresh.settings().blacklisted_apps, vec!["discord"]);
    assert_eq!(fresh.settings().blacklisted_windows, vec!["Password Manager"]);
}

#[test]
fn removing_only_entry_keeps_an_empty_list() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("settings.json");

    let mut store = SettingsStore::load(&path);
    store.add_app("spotify").expect("add app");
    assert!(store.remove_app(0).expect("remove app"));
    assert!(!store.remove_app(0).expect("nothing left to remove"));

    let raw = std::fs::read_to_string(&path).expect("read settings.json");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["blacklistedApps"], serde_json::json!([]));
    assert_eq!(value["blacklistedWindows"], serde_json::json!([]));

    let fresh = SettingsStore::load(&path);
    assert!(fresh.settings().blacklisted_apps.is_empty());
}

#[test]
fn mail_choice_survives_list_edits() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("settings.json");

    let mut store = SettingsStore::load(&path);
    store.set_mail(MailMethod::Outlook).expect("set mail");
    store.add_window("Bank").expect("add window");
    store.remove_window(0).expect("remove window");

    let fresh = SettingsStore::load(&path);
    assert_eq!(fresh.settings().preferred_mail, Some(MailMethod::Outlook));
}
