//! Connected-account session.
//!
//! Account changes are delivered through [`AccountSubscription`]; dropping
//! the subscription is the unsubscribe.

use tokio::sync::watch;
use tracing::info;

use crate::models::Address;

pub struct WalletSession {
    account: watch::Sender<Option<Address>>,
}

impl WalletSession {
    pub fn new(account: Option<Address>) -> Self {
        let (account, _) = watch::channel(account);
        Self { account }
    }

    pub fn disconnected() -> Self {
        Self::new(None)
    }

    pub fn account(&self) -> Option<Address> {
        self.account.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.account.borrow().is_some()
    }

    pub fn connect(&self, account: Address) {
        info!(account = %account.truncated(), "Wallet connected");
        self.account.send_replace(Some(account));
    }

    pub fn disconnect(&self) {
        if self.account.send_replace(None).is_some() {
            info!("Wallet disconnected");
        }
    }

    pub fn subscribe(&self) -> AccountSubscription {
        AccountSubscription {
            receiver: self.account.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.account.receiver_count()
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::disconnected()
    }
}

pub struct AccountSubscription {
    receiver: watch::Receiver<Option<Address>>,
}

impl AccountSubscription {
    /// Waits for the next account change. `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<Option<Address>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn current(&self) -> Option<Address> {
        self.receiver.borrow().clone()
    }
}
