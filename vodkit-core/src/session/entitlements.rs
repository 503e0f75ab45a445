//! Subscription reload and entitlement checks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vodkit_contracts::account::{Notification, NotificationHandler};
use vodkit_contracts::features::{CheckoutOperation, SubscriptionOperation};
use vodkit_contracts::subscription::{
    UpdateCardDetailsArgs, UpdateSubscriptionArgs,
};
use vodkit_model::{Offer, Subscription, SubscriptionStatus};

use super::AccountController;
use crate::error::{AccountError, AccountResult, ensure_operation};
use crate::state::LoadingGuard;

/// Grace period before re-reading subscriptions after a purchase or status
/// change, so the provider can settle.
pub const UPDATE_SUBSCRIPTION_RELOAD_DELAY: Duration = Duration::from_secs(2);

const RELOAD_EVENTS: [&str; 3] =
    ["access.granted", "access.revoked", "subscribe.success"];

impl AccountController {
    /// Re-read subscription, transactions and active payment.
    ///
    /// The reload is bound to the session that requested it. If the session
    /// changes while it is pending, the result is discarded.
    pub async fn reload_subscriptions(
        &self,
        delay: Duration,
    ) -> AccountResult<()> {
        let epoch = self.epoch.current();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.reload_for_epoch(epoch).await
    }

    /// Spawn [`reload_subscriptions`](Self::reload_subscriptions) in the
    /// background. Failures are logged.
    pub fn schedule_reload(&self, delay: Duration) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            if let Err(err) = controller.reload_subscriptions(delay).await {
                warn!(error = %err, "scheduled subscription reload failed");
            }
        })
    }

    async fn reload_for_epoch(&self, epoch: u64) -> AccountResult<()> {
        if !self.epoch.is_current(epoch) {
            debug!(epoch, "session changed; dropping subscription reload");
            return Ok(());
        }

        let account = &self.stores.account;
        let _loading = LoadingGuard::engage(account, |s| &mut s.loading);
        let _reloading =
            LoadingGuard::engage(account, |s| &mut s.subscription_reloading);

        if !self.access_model().is_subscription_based() {
            account.update(|state| state.subscription_loaded = true);
            self.refresh_entitlements().await;
            return Ok(());
        }

        let customer_id = account
            .with_state(|state| state.customer_id().map(str::to_owned))
            .ok_or(AccountError::NotLoggedIn)?;

        let subscriptions = &self.services.subscription;
        let (subscription, transactions, active_payment) = futures::try_join!(
            subscriptions.get_active_subscription(&customer_id),
            subscriptions.get_all_transactions(&customer_id),
            subscriptions.get_active_payment(&customer_id),
        )?;

        let pending_offer = match &subscription {
            Some(subscription) => self.resolve_pending_offer(subscription).await,
            None => None,
        };

        if !self.epoch.is_current(epoch) {
            debug!(epoch, "session changed during reload; discarding result");
            return Ok(());
        }

        account.update(|state| {
            state.subscription = subscription;
            state.transactions = transactions;
            state.active_payment = active_payment;
            state.pending_offer = pending_offer;
            state.subscription_loaded = true;
        });

        self.refresh_entitlements().await;
        Ok(())
    }

    /// Offer a pending plan switch will move to. Best effort.
    async fn resolve_pending_offer(
        &self,
        subscription: &Subscription,
    ) -> Option<Offer> {
        let switch_id = subscription.pending_switch_id.as_deref()?;
        match self.fetch_pending_offer(switch_id).await {
            Ok(offer) => offer,
            Err(err) => {
                warn!(switch_id, error = %err, "failed to resolve pending subscription switch");
                None
            }
        }
    }

    async fn fetch_pending_offer(
        &self,
        switch_id: &str,
    ) -> AccountResult<Option<Offer>> {
        let checkout = &self.services.checkout;
        for operation in [
            CheckoutOperation::GetSubscriptionSwitch,
            CheckoutOperation::GetOffer,
        ] {
            ensure_operation(
                checkout.supports(operation),
                operation.name(),
                "checkout",
            )?;
        }

        let switch = checkout.get_subscription_switch(switch_id).await?;
        let Some(switch) = switch.response_data else {
            return Ok(None);
        };

        let offer = checkout.get_offer(&switch.to_offer_id).await?;
        Ok(offer.response_data)
    }

    /// Whether the current customer may access content behind `offer_id`.
    pub async fn check_entitlements(
        &self,
        offer_id: Option<&str>,
    ) -> AccountResult<bool> {
        let Some(offer_id) = offer_id else {
            return Ok(false);
        };

        let response =
            self.services.checkout.get_entitlements(offer_id).await?;
        Ok(response.is_ok() && response.response_data.access_granted)
    }

    /// Cancel or renew the current subscription, then reload it once the
    /// provider has settled.
    pub async fn update_subscription(
        &self,
        status: SubscriptionStatus,
    ) -> AccountResult<Option<Subscription>> {
        let user = self.current_user()?;
        let subscription = self
            .stores
            .account
            .with_state(|state| state.subscription.clone())
            .ok_or(AccountError::NoActiveSubscription)?;

        let response = self
            .services
            .subscription
            .update_subscription(UpdateSubscriptionArgs {
                customer_id: user.id,
                offer_id: subscription.offer_id,
                status,
                unsubscribe_url: subscription.unsubscribe_url,
            })
            .await?;

        if let Some(message) = response.first_error() {
            return Err(AccountError::Rejected(message.to_string()));
        }

        info!(?status, "subscription updated");
        self.reload_subscriptions(UPDATE_SUBSCRIPTION_RELOAD_DELAY)
            .await?;
        Ok(response.response_data)
    }

    pub async fn update_card_details(
        &self,
        args: UpdateCardDetailsArgs,
    ) -> AccountResult<()> {
        let subscriptions = &self.services.subscription;
        ensure_operation(
            subscriptions.supports(SubscriptionOperation::UpdateCardDetails),
            SubscriptionOperation::UpdateCardDetails.name(),
            "subscription",
        )?;
        let user = self.current_user()?;

        let response = subscriptions.update_card_details(args).await?;
        if let Some(message) = response.first_error() {
            return Err(AccountError::Rejected(message.to_string()));
        }

        let active_payment = subscriptions.get_active_payment(&user.id).await?;
        self.stores
            .account
            .update(|state| state.active_payment = active_payment);
        Ok(())
    }

    /// Receipt document for one transaction.
    pub async fn get_receipt(&self, transaction_id: &str) -> AccountResult<String> {
        let subscriptions = &self.services.subscription;
        ensure_operation(
            subscriptions.supports(SubscriptionOperation::FetchReceipt),
            SubscriptionOperation::FetchReceipt.name(),
            "subscription",
        )?;

        let response = subscriptions.fetch_receipt(transaction_id).await?;
        match response.first_error() {
            Some(message) => Err(AccountError::Rejected(message.to_string())),
            None => Ok(response.response_data),
        }
    }

    pub(super) fn notification_handler(&self) -> NotificationHandler {
        let controller = self.clone();
        Arc::new(move |notification: Notification| {
            if !RELOAD_EVENTS.contains(&notification.kind.as_str()) {
                return;
            }
            debug!(kind = %notification.kind, "account event received");
            match tokio::runtime::Handle::try_current() {
                Ok(_) => {
                    controller.schedule_reload(UPDATE_SUBSCRIPTION_RELOAD_DELAY);
                }
                Err(_) => {
                    warn!(kind = %notification.kind, "no runtime to reload subscriptions on");
                }
            }
        })
    }
}
