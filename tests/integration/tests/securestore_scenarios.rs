//! End-to-end credential-storage scenarios exercised across crate
//! boundaries the way a real startup path would.

use llxprt_provider_keys::interactive::{AlwaysConfirm, NonInteractive, ScriptedPrompt};
use llxprt_provider_keys::{execute_key_command, KeyCommandOutcome, ProviderKeyStorage};
use llxprt_resolver::{resolve_auth_source, AuthSourceInputs, AuthSourceKind};
use llxprt_securestore::{FallbackPolicy, KeyringCapability};

fn storage_without_keyring(dir: &std::path::Path, policy: FallbackPolicy) -> ProviderKeyStorage {
    ProviderKeyStorage::with_capability(dir, policy, None)
}

#[tokio::test]
async fn scenario_1_keyring_absent_allow_policy_round_trips_through_fallback_file() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let storage = storage_without_keyring(tempdir.path(), FallbackPolicy::Allow);

    storage.save_key("anthropic", "sk-a1b2").await.expect("save");
    let enc_path = tempdir.path().join("anthropic.enc");
    assert!(enc_path.exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&enc_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    let contents = std::fs::read_to_string(&enc_path).expect("read envelope");
    let envelope: serde_json::Value = serde_json::from_str(&contents).expect("valid json");
    assert_eq!(envelope["v"], 1);

    assert_eq!(storage.get_key("anthropic").await.unwrap().as_deref(), Some("sk-a1b2"));
}

#[tokio::test]
async fn scenario_2_keyring_absent_deny_policy_refuses_without_writing_a_file() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let storage = storage_without_keyring(tempdir.path(), FallbackPolicy::Deny);

    let error = storage.save_key("anthropic", "sk-a1b2").await.expect_err("should refuse");
    let llxprt_provider_keys::ProviderKeyError::Store(store_error) = error else {
        panic!("expected a store-level error");
    };
    assert_eq!(store_error.code, llxprt_securestore::SecureStoreErrorCode::Unavailable);
    assert!(!store_error.remediation().is_empty());
    assert!(!tempdir.path().join("anthropic.enc").exists());
}

#[tokio::test]
async fn scenario_3_resolver_precedence_picks_raw_cli_key() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let storage = storage_without_keyring(tempdir.path(), FallbackPolicy::Allow);

    let inputs = AuthSourceInputs {
        raw_key_from_cli: Some("R".to_string()),
        key_name_from_cli: Some("K".to_string()),
        inline_key_from_profile: Some("I".to_string()),
        env_var_value: Some("E".to_string()),
        ..Default::default()
    };

    let resolved = resolve_auth_source(&inputs, &storage).await.expect("resolves");
    assert_eq!(resolved.api_key, "R");
    assert_eq!(resolved.source.kind, AuthSourceKind::RawCliKey);
}

#[tokio::test]
async fn scenario_4_named_key_miss_does_not_fall_through_to_inline_key() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let storage = storage_without_keyring(tempdir.path(), FallbackPolicy::Allow);

    let inputs = AuthSourceInputs {
        key_name_from_cli: Some("nope".to_string()),
        inline_key_from_profile: Some("I".to_string()),
        ..Default::default()
    };

    let error = resolve_auth_source(&inputs, &storage).await.expect_err("should fail");
    assert_eq!(
        error.to_string(),
        "Named key 'nope' not found. Use '/key save nope <key>' to store it."
    );
}

#[tokio::test]
async fn scenario_5_list_union_of_keyring_and_fallback_keys() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let capability = llxprt_securestore::InMemoryKeyringCapability::arc();
    let storage = ProviderKeyStorage::with_capability(tempdir.path(), FallbackPolicy::Allow, Some(capability.clone()));

    capability.set_password("llxprt-code-provider-keys", "a", "v").await.unwrap();
    capability.set_password("llxprt-code-provider-keys", "b", "v").await.unwrap();
    storage.save_key("b", "v").await.unwrap();
    storage.save_key("c", "v").await.unwrap();

    assert_eq!(
        storage.list_keys().await.unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[tokio::test]
async fn scenario_6_interactive_save_overwrite_leaves_prior_value_until_confirmed() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let storage = storage_without_keyring(tempdir.path(), FallbackPolicy::Allow);
    storage.save_key("k", "v1").await.unwrap();

    let outcome = execute_key_command("save k v2", &storage, &NonInteractive).await;
    assert!(matches!(outcome, KeyCommandOutcome::Error(_)));
    assert_eq!(storage.get_key("k").await.unwrap().as_deref(), Some("v1"));

    let confirmed = ScriptedPrompt { interactive: true, confirms: true };
    let outcome = execute_key_command("save k v2", &storage, &confirmed).await;
    assert!(matches!(outcome, KeyCommandOutcome::Message(_)));
    assert_eq!(storage.get_key("k").await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test]
async fn functional_key_command_surface_save_load_show_delete_round_trip() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let storage = storage_without_keyring(tempdir.path(), FallbackPolicy::Allow);

    let outcome = execute_key_command("save anthropic sk-a1b2c3d4", &storage, &AlwaysConfirm).await;
    assert!(matches!(outcome, KeyCommandOutcome::Message(_)));

    let outcome = execute_key_command("load anthropic", &storage, &AlwaysConfirm).await;
    assert_eq!(outcome, KeyCommandOutcome::SetEphemeralKey("sk-a1b2c3d4".to_string()));

    let outcome = execute_key_command("show anthropic", &storage, &AlwaysConfirm).await;
    let KeyCommandOutcome::Message(text) = outcome else { panic!("expected message") };
    assert!(!text.contains("a1b2c3d4"));

    let outcome = execute_key_command("delete anthropic", &storage, &AlwaysConfirm).await;
    assert_eq!(outcome, KeyCommandOutcome::Message("Deleted key 'anthropic'".to_string()));

    let outcome = execute_key_command("load anthropic", &storage, &AlwaysConfirm).await;
    assert!(matches!(outcome, KeyCommandOutcome::Error(_)));
}

#[tokio::test]
async fn functional_full_startup_path_resolver_into_key_storage() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let storage = storage_without_keyring(tempdir.path(), FallbackPolicy::Allow);
    execute_key_command("save work sk-work-value", &storage, &AlwaysConfirm).await;

    let inputs = AuthSourceInputs {
        key_name_from_cli: Some("work".to_string()),
        env_var_value: Some("fallback-env-value".to_string()),
        ..Default::default()
    };
    let resolved = resolve_auth_source(&inputs, &storage).await.expect("resolves");
    assert_eq!(resolved.api_key, "sk-work-value");
    assert_eq!(resolved.source.kind, AuthSourceKind::CliKeyName);
}
