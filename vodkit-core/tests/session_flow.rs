//! Session lifecycle against in-memory providers: login, restore, logout and
//! the delayed subscription reload.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use vodkit_contracts::features::{AccountOperation, AccountServiceFeatures};
use vodkit_core::state::{SessionStatus, SubscriptionView};
use vodkit_core::{AccountError, VodkitApp};
use vodkit_model::{
    AccessModel, SubscriptionStatus, SubscriptionSwitch, UpdateCustomerArgs,
};

mod common;

use common::{
    Calls, EMAIL, Harness, HarnessOptions, WRONG_PASSWORD, all_features, item,
    subscription,
};

fn with_features(features: AccountServiceFeatures) -> Harness {
    Harness::new(HarnessOptions {
        features,
        ..HarnessOptions::default()
    })
}

#[tokio::test]
async fn login_publishes_customer_and_reloads_subscription_once() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    *h.subscription.active.lock() = Some(subscription(SubscriptionStatus::Active));
    h.start().await?;

    h.login().await?;

    let state = h.app.stores().account.current();
    assert_eq!(state.user, Some(h.account.customer()));
    assert_eq!(state.status, SessionStatus::Authenticated);
    assert!(!state.loading.is_set());
    assert_eq!(h.subscription.active_calls(), 1);
    assert_eq!(state.subscription.map(|s| s.subscription_id), Some(7));
    assert!(h.hook_calls() >= 1);
    Ok(())
}

#[tokio::test]
async fn non_subscription_access_skips_subscription_fetch() -> Result<()> {
    let h = Harness::new(HarnessOptions {
        access_model: AccessModel::Authvod,
        ..HarnessOptions::default()
    });
    h.start().await?;

    h.login().await?;

    assert_eq!(h.subscription.active_calls(), 0);
    assert!(h.app.stores().account.with_state(|s| s.subscription_loaded));
    assert_eq!(h.hook_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_returned_as_data() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.start().await?;

    let response = h.controller().login(EMAIL, WRONG_PASSWORD, "").await?;

    assert_eq!(response.first_error(), Some("Invalid credentials"));
    let state = h.app.stores().account.current();
    assert!(state.user.is_none());
    assert_eq!(state.status, SessionStatus::Anonymous);
    assert!(!state.loading.is_set());
    Ok(())
}

#[tokio::test]
async fn logout_clears_session_even_when_signout_fails() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.start().await?;
    h.app.favorites().save_item(item("a")).await?;

    h.account.remote.lock().favorites = common::favorites(&["c"]);
    h.account.remote.lock().fail_logout = true;
    h.login().await?;
    assert_eq!(h.favorite_ids(), ["c"]);

    h.controller().logout().await;

    let state = h.app.stores().account.current();
    assert!(state.user.is_none());
    assert!(state.subscription.is_none());
    assert!(state.customer_consents.is_none());
    assert_eq!(Calls::get(&h.account.calls.logout), 1);
    assert_eq!(h.favorite_ids(), ["a"]);
    Ok(())
}

#[tokio::test]
async fn stored_session_is_restored_at_startup() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    {
        let mut remote = h.account.remote.lock();
        remote.session = true;
        remote.favorites = common::favorites(&["b", "d"]);
    }

    h.start().await?;

    let state = h.app.stores().account.current();
    assert_eq!(state.user.map(|u| u.id), Some(common::CUSTOMER_ID.to_string()));
    assert!(state.auth.is_some());
    assert_eq!(h.favorite_ids(), ["b", "d"]);
    Ok(())
}

#[tokio::test]
async fn rejected_token_at_startup_signs_out() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    {
        let mut remote = h.account.remote.lock();
        remote.session = true;
        remote.reject_token = true;
    }

    h.start().await?;

    assert!(h.app.stores().account.with_state(|s| s.user.is_none()));
    assert_eq!(Calls::get(&h.account.calls.logout), 1);
    Ok(())
}

#[tokio::test]
async fn transient_restore_failure_keeps_current_state() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.start().await?;
    h.login().await?;

    h.account.remote.lock().offline = true;
    h.controller().load_user_data().await;

    let state = h.app.stores().account.current();
    assert!(state.user.is_some());
    assert_eq!(state.status, SessionStatus::Authenticated);
    assert_eq!(Calls::get(&h.account.calls.logout), 0);
    Ok(())
}

#[tokio::test]
async fn delete_account_is_gated_by_feature_flag() -> Result<()> {
    let h = Harness::new(HarnessOptions {
        features: AccountServiceFeatures {
            can_delete_account: false,
            ..all_features()
        },
        ..HarnessOptions::default()
    });
    h.start().await?;
    h.login().await?;

    let err = h
        .controller()
        .delete_account_data("secret")
        .await
        .expect_err("feature disabled");

    assert!(matches!(err, AccountError::FeatureDisabled("Delete account")));
    assert!(err.is_capability_missing());
    assert_eq!(Calls::get(&h.account.calls.delete_account), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delayed_reload_after_logout_leaves_state_signed_out() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    *h.subscription.active.lock() = Some(subscription(SubscriptionStatus::Active));
    h.start().await?;
    h.login().await?;
    assert_eq!(h.subscription.active_calls(), 1);

    let pending = h.controller().schedule_reload(Duration::from_millis(2000));
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.controller().logout().await;
    pending.await?;

    let state = h.app.stores().account.current();
    assert!(state.user.is_none());
    assert!(state.subscription.is_none());
    assert!(!state.loading.is_set());
    assert_eq!(h.subscription.active_calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delayed_reload_runs_for_the_same_session() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.start().await?;
    h.login().await?;
    assert!(h.app.stores().account.with_state(|s| s.subscription.is_none()));

    *h.subscription.active.lock() = Some(subscription(SubscriptionStatus::Active));
    h.controller()
        .schedule_reload(Duration::from_millis(2000))
        .await?;

    assert_eq!(h.subscription.active_calls(), 2);
    assert!(h.app.stores().account.with_state(|s| s.subscription.is_some()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelling_reloads_after_grace_period() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    *h.subscription.active.lock() = Some(subscription(SubscriptionStatus::Active));
    h.start().await?;
    h.login().await?;

    let updated = h
        .controller()
        .update_subscription(SubscriptionStatus::Cancelled)
        .await?;

    assert_eq!(updated.map(|s| s.status), Some(SubscriptionStatus::Cancelled));
    assert_eq!(h.subscription.active_calls(), 2);
    let view = h.app.stores().account.with_state(|s| s.subscription_view());
    assert_eq!(view, SubscriptionView::Cancelled);
    Ok(())
}

#[tokio::test]
async fn long_names_are_rejected_before_the_provider_is_called() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.start().await?;
    h.login().await?;

    let response = h
        .controller()
        .update_user(UpdateCustomerArgs {
            first_name: Some("x".repeat(51)),
            ..Default::default()
        })
        .await?;

    assert_eq!(
        response.first_error(),
        Some("First name can not be longer than 50 characters.")
    );
    assert_eq!(Calls::get(&h.account.calls.update_customer), 0);
    Ok(())
}

#[tokio::test]
async fn profile_update_keeps_embedded_shelves() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.account.remote.lock().favorites = common::favorites(&["e"]);
    h.start().await?;
    h.login().await?;

    let response = h
        .controller()
        .update_user(UpdateCustomerArgs {
            first_name: Some("Grace".to_string()),
            ..Default::default()
        })
        .await?;

    assert!(response.is_ok());
    let user = h.app.stores().account.with_state(|s| s.user.clone()).unwrap();
    assert_eq!(user.first_name.as_deref(), Some("Grace"));
    assert!(user.external_data.is_some());
    Ok(())
}

#[tokio::test]
async fn entitlement_check_is_a_pass_through() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.start().await?;

    assert!(h.controller().check_entitlements(Some("S1")).await?);
    assert!(!h.controller().check_entitlements(Some("S2")).await?);
    assert!(!h.controller().check_entitlements(None).await?);
    Ok(())
}

#[tokio::test]
async fn app_without_integration_runs_anonymously() -> Result<()> {
    let storage = std::sync::Arc::new(vodkit_core::storage::MemoryPreferenceStore::new());
    let catalog = std::sync::Arc::new(common::FakeCatalog::with_ids(&["a"]));
    let app = VodkitApp::with_services(
        vodkit_core::AppConfig {
            integration: None,
            ..common::config(48)
        },
        None,
        storage,
        catalog,
    );
    app.initialize(None, None).await?;

    assert!(matches!(
        app.require_account(),
        Err(AccountError::IntegrationMissing)
    ));
    assert_eq!(app.features(), vodkit_contracts::features::DEFAULT_FEATURES);
    assert!(app.favorites().save_item(item("a")).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn loading_stays_raised_until_login_finishes() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.account.remote.lock().favorites = common::favorites(&["c"]);
    h.start().await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&seen);
    let account = h.app.stores().account.clone();
    h.catalog.on_lookup(move || {
        observed.lock().push(account.with_state(|s| s.loading.is_set()));
    });

    h.login().await?;

    let seen = seen.lock().clone();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|loading| *loading), "loading dropped early: {seen:?}");
    assert!(!h.app.stores().account.with_state(|s| s.loading.is_set()));
    Ok(())
}

#[tokio::test]
async fn pending_switch_resolves_the_target_offer() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    let mut active = subscription(SubscriptionStatus::Active);
    active.pending_switch_id = Some("sw-1".to_string());
    *h.subscription.active.lock() = Some(active);
    *h.checkout.switch.lock() = Some(SubscriptionSwitch {
        from_offer_id: "S1".to_string(),
        to_offer_id: "S2".to_string(),
        switch_direction: "upgrade".to_string(),
        status: None,
    });
    h.start().await?;

    h.login().await?;

    let state = h.app.stores().account.current();
    assert_eq!(
        state.pending_offer.as_ref().map(|offer| offer.offer_id.clone()),
        Some("S2".to_string())
    );
    assert_eq!(state.subscription_view(), SubscriptionView::PendingSwitch);
    assert_eq!(h.checkout.switch_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_switch_lookup_still_completes_the_reload() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    let mut active = subscription(SubscriptionStatus::Active);
    active.pending_switch_id = Some("sw-1".to_string());
    *h.subscription.active.lock() = Some(active);
    h.checkout
        .switch_lookup_fails
        .store(true, std::sync::atomic::Ordering::SeqCst);
    h.start().await?;

    h.login().await?;

    let state = h.app.stores().account.current();
    assert_eq!(h.checkout.switch_calls(), 1);
    assert!(state.pending_offer.is_none());
    assert!(state.subscription_loaded);
    assert!(!state.subscription_reloading.is_set());
    assert_eq!(state.subscription.map(|s| s.subscription_id), Some(7));
    assert!(h.hook_calls() >= 1);
    Ok(())
}

#[tokio::test]
async fn export_needs_both_the_operation_and_the_feature() -> Result<()> {
    let h = with_features(AccountServiceFeatures {
        can_export_account_data: false,
        ..all_features()
    });
    h.start().await?;
    h.login().await?;

    let err = h
        .controller()
        .export_account_data()
        .await
        .expect_err("feature disabled");
    assert!(matches!(err, AccountError::FeatureDisabled("Export account")));

    let h = Harness::new(HarnessOptions::default());
    h.account
        .remote
        .lock()
        .unsupported
        .push(AccountOperation::ExportAccountData);
    h.start().await?;
    h.login().await?;

    let err = h
        .controller()
        .export_account_data()
        .await
        .expect_err("operation missing");
    assert!(matches!(
        err,
        AccountError::OperationUnavailable {
            operation: "exportAccountData",
            service: "account"
        }
    ));
    assert_eq!(Calls::get(&h.account.calls.export_account_data), 0);

    h.account.remote.lock().unsupported.clear();
    assert!(h.controller().export_account_data().await?.is_ok());
    assert_eq!(Calls::get(&h.account.calls.export_account_data), 1);
    Ok(())
}

#[tokio::test]
async fn social_logins_need_both_the_operation_and_the_feature() -> Result<()> {
    let h = with_features(AccountServiceFeatures {
        has_social_urls: false,
        ..all_features()
    });
    h.start().await?;

    let err = h
        .controller()
        .get_social_login_urls("https://app.example.com/")
        .await
        .expect_err("feature disabled");
    assert!(matches!(err, AccountError::FeatureDisabled("Social logins")));

    let h = Harness::new(HarnessOptions::default());
    h.account
        .remote
        .lock()
        .unsupported
        .push(AccountOperation::GetSocialUrls);
    h.start().await?;

    let err = h
        .controller()
        .get_social_login_urls("https://app.example.com/")
        .await
        .expect_err("operation missing");
    assert!(matches!(
        err,
        AccountError::OperationUnavailable {
            operation: "getSocialUrls",
            ..
        }
    ));
    assert_eq!(Calls::get(&h.account.calls.social_urls), 0);

    h.account.remote.lock().unsupported.clear();
    let urls = h
        .controller()
        .get_social_login_urls("https://app.example.com/")
        .await?;
    assert_eq!(urls.len(), 1);
    assert_eq!(Calls::get(&h.account.calls.social_urls), 1);
    Ok(())
}

#[tokio::test]
async fn email_change_is_refused_when_unsupported() -> Result<()> {
    let h = with_features(AccountServiceFeatures {
        can_update_email: false,
        ..all_features()
    });
    h.start().await?;
    h.login().await?;

    let err = h
        .controller()
        .update_user(UpdateCustomerArgs {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        })
        .await
        .expect_err("email change refused");

    assert!(matches!(err, AccountError::EmailUpdateUnsupported));
    assert_eq!(Calls::get(&h.account.calls.update_customer), 0);
    let email = h.app.stores().account.with_state(|s| s.user.clone().map(|u| u.email));
    assert_eq!(email.as_deref(), Some(EMAIL));
    Ok(())
}

#[tokio::test]
async fn profile_update_without_customer_is_refused() -> Result<()> {
    let h = Harness::new(HarnessOptions::default());
    h.start().await?;

    let err = h
        .controller()
        .update_user(UpdateCustomerArgs {
            first_name: Some("Grace".to_string()),
            ..Default::default()
        })
        .await
        .expect_err("nobody signed in");

    assert!(matches!(err, AccountError::NotLoggedIn));
    assert_eq!(Calls::get(&h.account.calls.update_customer), 0);
    assert!(!h.app.stores().account.with_state(|s| s.loading.is_set()));
    Ok(())
}
