//! Voucher issue and redemption

use super::codes::{generate_voucher_code, normalize_phone, normalize_voucher_code};
use super::error::{Entity, LedgerError, LedgerResult};
use super::money::{to_decimal, to_f64, validate_face_value};
use super::Ledger;
use crate::auth::CurrentUser;
use crate::auth::permissions::VOUCHERS_ISSUE;
use shared::models::{
    LedgerTransaction, TransactionType, Voucher, VoucherStatus, Wallet,
};
use shared::util::{now_millis, snowflake_id};

/// Attempts at finding an unused code before giving up
pub const MAX_CODE_ATTEMPTS: usize = 5;

impl Ledger {
    /// Issue a new active voucher
    ///
    /// `face_value` defaults to the configured value when `None`.
    pub fn issue_voucher(
        &self,
        user: &CurrentUser,
        face_value: Option<f64>,
    ) -> LedgerResult<Voucher> {
        self.issue_voucher_with(user, face_value, generate_voucher_code)
    }

    /// Issue with an injectable code generator
    pub(crate) fn issue_voucher_with<G>(
        &self,
        user: &CurrentUser,
        face_value: Option<f64>,
        mut next_code: G,
    ) -> LedgerResult<Voucher>
    where
        G: FnMut() -> LedgerResult<String>,
    {
        self.authorize(user, VOUCHERS_ISSUE)?;
        let face_value = validate_face_value(
            face_value.unwrap_or(self.settings.default_face_value),
            self.settings.max_face_value,
        )?;

        let voucher_id = snowflake_id();
        let issued_at = now_millis();

        let txn = self.storage.begin_write()?;
        let mut code = None;
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let candidate = next_code()?;
            if self.storage.voucher_id_by_code_txn(&txn, &candidate)?.is_none() {
                code = Some(candidate);
                break;
            }
            tracing::warn!(attempt, "Voucher code collision, regenerating");
        }
        let Some(code) = code else {
            return Err(LedgerError::Persistence(format!(
                "could not allocate a unique voucher code after {} attempts",
                MAX_CODE_ATTEMPTS
            )));
        };

        let voucher = Voucher {
            id: voucher_id,
            code,
            face_value,
            status: VoucherStatus::Active,
            issued_by: user.id,
            issued_at,
            redeemed_by: None,
            redeemed_at: None,
            voided_at: None,
        };
        self.storage.store_voucher_txn(&txn, &voucher)?;
        txn.commit().map_err(super::StorageError::from)?;

        tracing::info!(
            voucher_id = voucher.id,
            face_value = voucher.face_value,
            staff_id = user.id,
            "Voucher issued"
        );
        Ok(voucher)
    }

    /// Look up a voucher by its redemption code
    ///
    /// Only the code is accepted. Ids are time-ordered and must not open a
    /// voucher to whoever guesses one.
    pub fn get_voucher(&self, code: &str) -> LedgerResult<Voucher> {
        let normalized = normalize_voucher_code(code);
        let voucher_id = self
            .storage
            .voucher_id_by_code(&normalized)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Voucher, code.to_string()))?;
        self.storage
            .get_voucher(voucher_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Voucher, code.to_string()))
    }

    /// Void an unredeemed voucher (lost or misprinted QR)
    ///
    /// Voiding twice returns the voided voucher unchanged; a used voucher
    /// cannot be voided.
    pub fn void_voucher(
        &self,
        user: &CurrentUser,
        code: &str,
        reason: Option<String>,
    ) -> LedgerResult<Voucher> {
        self.authorize(user, VOUCHERS_ISSUE)?;
        let code = normalize_voucher_code(code);
        let now = now_millis();

        let txn = self.storage.begin_write()?;
        let voucher_id = self
            .storage
            .voucher_id_by_code_txn(&txn, &code)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Voucher, code.clone()))?;
        let mut voucher = self
            .storage
            .get_voucher_txn(&txn, voucher_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Voucher, code.clone()))?;

        match voucher.status {
            VoucherStatus::Voided => return Ok(voucher),
            VoucherStatus::Used => return Err(LedgerError::AlreadyRedeemed(code)),
            VoucherStatus::Active => {}
        }

        voucher.status = VoucherStatus::Voided;
        voucher.voided_at = Some(now);
        self.storage.store_voucher_txn(&txn, &voucher)?;
        txn.commit().map_err(super::StorageError::from)?;

        tracing::info!(
            voucher_id = voucher.id,
            staff_id = user.id,
            reason = reason.as_deref().unwrap_or("-"),
            "Voucher voided"
        );
        Ok(voucher)
    }

    /// Redeem a voucher into the wallet of `phone`
    ///
    /// Creates the wallet on first redemption. Voucher status, wallet balance
    /// and the credit entry change in one transaction.
    pub fn redeem_voucher(&self, code: &str, phone: &str) -> LedgerResult<Wallet> {
        let phone = normalize_phone(phone)?;
        let code = normalize_voucher_code(code);

        // redb 不支持嵌套写事务，事务外预先生成
        let new_wallet_id = snowflake_id();
        let tx_id = snowflake_id();
        let now = now_millis();

        let txn = self.storage.begin_write()?;

        let voucher_id = self
            .storage
            .voucher_id_by_code_txn(&txn, &code)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Voucher, code.clone()))?;
        let mut voucher = self
            .storage
            .get_voucher_txn(&txn, voucher_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Voucher, code.clone()))?;
        if !voucher.status.is_redeemable() {
            return Err(LedgerError::AlreadyRedeemed(code));
        }

        let mut wallet = match self.storage.wallet_id_by_phone_txn(&txn, &phone)? {
            Some(wallet_id) => self
                .storage
                .get_wallet_txn(&txn, wallet_id)?
                .ok_or_else(|| LedgerError::NotFound(Entity::Wallet, wallet_id.to_string()))?,
            None => {
                tracing::info!(wallet_id = new_wallet_id, "Creating wallet on first redemption");
                Wallet {
                    id: new_wallet_id,
                    client_phone: phone.clone(),
                    balance: 0.0,
                    activated_at: None,
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        wallet.balance = to_f64(to_decimal(wallet.balance) + to_decimal(voucher.face_value));
        wallet.activated_at.get_or_insert(now);
        wallet.updated_at = now;

        let entry = LedgerTransaction {
            id: tx_id,
            wallet_id: wallet.id,
            order_id: None,
            voucher_id: Some(voucher.id),
            amount: voucher.face_value,
            transaction_type: TransactionType::Credit,
            description: format!("Voucher {}", voucher.code),
            created_at: now,
        };

        voucher.status = VoucherStatus::Used;
        voucher.redeemed_by = Some(phone);
        voucher.redeemed_at = Some(now);

        self.storage.store_wallet_txn(&txn, &wallet)?;
        self.storage.append_transaction_txn(&txn, &entry)?;
        self.storage.store_voucher_txn(&txn, &voucher)?;
        txn.commit().map_err(super::StorageError::from)?;

        tracing::info!(
            voucher_id = voucher.id,
            wallet_id = wallet.id,
            amount = voucher.face_value,
            balance = wallet.balance,
            "Voucher redeemed"
        );
        Ok(wallet)
    }
}
