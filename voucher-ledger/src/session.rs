//! Redemption session state machine
//!
//! A [`RedeemSession`] walks a customer through redemption in three steps:
//! code entry, order building, and payment confirmation. The session holds
//! no locks and persists nothing; the balance it displays is a snapshot,
//! and the authoritative checks run inside [`VoucherLedger::redeem`] at
//! confirmation time. A failed confirmation drops the session back to the
//! order-building step with the order intact, so the caller can retry.
//!
//! [`SessionStore`] keeps concurrent sessions keyed by random ids, one per
//! connected client.

use crate::{
    order::Order,
    types::{Branch, RedemptionReceipt, Voucher},
    Error, Result, VoucherLedger,
};
use chrono::NaiveDate;
use dashmap::DashMap;
use uuid::Uuid;

/// Where a session currently stands
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Waiting for a voucher code
    AwaitingCode,

    /// Code accepted; quantities are being chosen
    BuildingOrder {
        /// Eligibility snapshot of the voucher
        voucher: Voucher,
        /// Branch, menu, and chosen quantities
        order: Order,
    },

    /// Order closed; waiting for the final confirmation
    ConfirmingPayment {
        /// Eligibility snapshot of the voucher
        voucher: Voucher,
        /// The order as it will be committed
        order: Order,
        /// Total price at the time the order was closed
        total: i64,
    },
}

/// One customer's redemption walk-through
#[derive(Debug, Clone)]
pub struct RedeemSession {
    state: SessionState,
}

impl RedeemSession {
    /// Start a fresh session awaiting a code
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingCode,
        }
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The voucher snapshot, once a code has been accepted
    pub fn voucher(&self) -> Option<&Voucher> {
        match &self.state {
            SessionState::AwaitingCode => None,
            SessionState::BuildingOrder { voucher, .. }
            | SessionState::ConfirmingPayment { voucher, .. } => Some(voucher),
        }
    }

    /// The order being built, once a code has been accepted
    pub fn order(&self) -> Option<&Order> {
        match &self.state {
            SessionState::AwaitingCode => None,
            SessionState::BuildingOrder { order, .. }
            | SessionState::ConfirmingPayment { order, .. } => Some(order),
        }
    }

    /// Accept a voucher code and move to order building.
    ///
    /// Runs the eligibility checks and loads the menu of the default
    /// branch ([`Branch::Sedati`]). Allowed from any state; entering a new
    /// code discards whatever was in progress.
    pub fn enter_code(
        &mut self,
        ledger: &VoucherLedger,
        code: &str,
        today: NaiveDate,
    ) -> Result<&Voucher> {
        let voucher = ledger.check_eligibility(code, today)?;
        let menu = ledger.repository().get_menu(Branch::Sedati)?;

        self.state = SessionState::BuildingOrder {
            voucher,
            order: Order::new(Branch::Sedati, menu),
        };

        match &self.state {
            SessionState::BuildingOrder { voucher, .. } => Ok(voucher),
            _ => unreachable!(),
        }
    }

    /// Switch branch while building the order.
    ///
    /// Reloads the menu for the new branch and clears all quantities,
    /// since prices differ per branch.
    pub fn select_branch(&mut self, ledger: &VoucherLedger, branch: Branch) -> Result<()> {
        match &mut self.state {
            SessionState::BuildingOrder { order, .. } => {
                let menu = ledger.repository().get_menu(branch)?;
                *order = Order::new(branch, menu);
                Ok(())
            }
            _ => Err(Error::SessionStep(
                "branch can only change while building the order".to_string(),
            )),
        }
    }

    /// Set the requested quantity of one menu item.
    ///
    /// The name must be on the current branch's menu; unknown names are
    /// rejected rather than priced at zero.
    pub fn set_quantity(&mut self, name: &str, quantity: u32) -> Result<()> {
        match &mut self.state {
            SessionState::BuildingOrder { order, .. } => {
                if !order.menu().iter().any(|entry| entry.name == name) {
                    return Err(Error::UnknownMenuItem(name.to_string()));
                }
                order.set_quantity(name, quantity);
                Ok(())
            }
            _ => Err(Error::SessionStep(
                "quantities can only change while building the order".to_string(),
            )),
        }
    }

    /// Close the order and move to payment confirmation.
    ///
    /// Rejects a zero-total order and a total above the voucher's last
    /// known balance. The balance check here is advisory; the commit in
    /// [`RedeemSession::confirm`] re-checks under the voucher's lock.
    pub fn proceed_to_payment(&mut self) -> Result<i64> {
        let (voucher, order) = match &self.state {
            SessionState::BuildingOrder { voucher, order } => (voucher.clone(), order.clone()),
            _ => {
                return Err(Error::SessionStep(
                    "payment needs a built order".to_string(),
                ))
            }
        };

        let total = order.total();
        if total <= 0 {
            return Err(Error::InvalidAmount(total));
        }
        if total > voucher.balance {
            return Err(Error::InsufficientBalance {
                balance: voucher.balance,
            });
        }

        self.state = SessionState::ConfirmingPayment {
            voucher,
            order,
            total,
        };
        Ok(total)
    }

    /// Commit the redemption.
    ///
    /// On success the session resets to awaiting a code. On failure the
    /// session returns to order building with the order intact and the
    /// error is passed through.
    pub fn confirm(&mut self, ledger: &VoucherLedger) -> Result<RedemptionReceipt> {
        let state = std::mem::replace(&mut self.state, SessionState::AwaitingCode);

        let (voucher, order, total) = match state {
            SessionState::ConfirmingPayment {
                voucher,
                order,
                total,
            } => (voucher, order, total),
            other => {
                self.state = other;
                return Err(Error::SessionStep(
                    "nothing to confirm yet".to_string(),
                ));
            }
        };

        match ledger.redeem_order(&voucher.code, total, order.branch(), &order.ordered_lines()) {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                self.state = SessionState::BuildingOrder { voucher, order };
                Err(e)
            }
        }
    }

    /// Step back: confirmation returns to order building, order building
    /// returns to code entry. A no-op while awaiting a code.
    pub fn back(&mut self) {
        let state = std::mem::replace(&mut self.state, SessionState::AwaitingCode);
        if let SessionState::ConfirmingPayment { voucher, order, .. } = state {
            self.state = SessionState::BuildingOrder { voucher, order };
        }
    }

    /// Abandon everything and await a new code
    pub fn reset(&mut self) {
        self.state = SessionState::AwaitingCode;
    }
}

impl Default for RedeemSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrent session store keyed by random session ids
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<Uuid, RedeemSession>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a session and return its id
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, RedeemSession::new());
        id
    }

    /// Run `f` against one session under its shard lock
    pub fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut RedeemSession) -> Result<T>,
    ) -> Result<T> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::SessionNotFound(id))?;
        f(session.value_mut())
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
