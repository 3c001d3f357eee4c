//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use stockpass_core::{
    extend_expiry, referral_bonus_days, Account, AccountId, InviteCode, OrderNo, OrderStatus,
    PaymentOrder, Plan, PlanId, Settlement,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::KeyLocks;
use crate::schema::{all_column_families, cf, meta};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    locks: KeyLocks,
}

/// Namespace a lock key by entity so keys from different column families
/// never alias each other in the lock table.
fn lock_key(entity: &str, key: &[u8]) -> Vec<u8> {
    let mut namespaced = Vec::with_capacity(entity.len() + 1 + key.len());
    namespaced.extend_from_slice(entity.as_bytes());
    namespaced.push(b'/');
    namespaced.extend_from_slice(key);
    namespaced
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            locks: KeyLocks::new(),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Allocate the next integer id from a meta counter.
    fn alloc_id(&self, counter_key: &[u8]) -> Result<u64> {
        let lock = self.locks.lock_for(&lock_key(cf::META, counter_key));
        let _held = lock.guard();

        let cf_meta = self.cf(cf::META)?;
        let next = self
            .db
            .get_cf(&cf_meta, counter_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map_or(Ok(1u64), |bytes| {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Serialization("bad counter encoding".into()))?;
                Ok(u64::from_be_bytes(arr))
            })?;

        self.db
            .put_cf(&cf_meta, counter_key, (next + 1).to_be_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(next)
    }

    /// Read an account, failing with `NotFound` when absent.
    fn require_account(&self, account_id: AccountId) -> Result<Account> {
        self.get_account(account_id)?.ok_or(StoreError::NotFound {
            entity: "account",
            id: account_id.to_string(),
        })
    }

    /// Write an account record (no index maintenance).
    fn put_account(&self, account: &Account) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let value = Self::serialize(account)?;
        self.db
            .put_cf(&cf_accounts, keys::account_key(account.id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Mutate one account under its per-account lock.
    fn with_account_locked<T>(
        &self,
        account_id: AccountId,
        f: impl FnOnce(&mut Account) -> T,
    ) -> Result<T> {
        let key = keys::account_key(account_id);
        let lock = self.locks.lock_for(&lock_key(cf::ACCOUNTS, &key));
        let _held = lock.guard();

        let mut account = self.require_account(account_id)?;
        let out = f(&mut account);
        self.put_account(&account)?;
        Ok(out)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn create_account(
        &self,
        name: &str,
        password_hash: &str,
        phone: Option<String>,
        referred_by: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> Result<Account> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidArgument("name must not be empty".into()));
        }

        let name_key = keys::account_name_key(name);
        let lock = self.locks.lock_for(&lock_key(cf::ACCOUNTS_BY_NAME, &name_key));
        let _held = lock.guard();

        let cf_names = self.cf(cf::ACCOUNTS_BY_NAME)?;
        if self
            .db
            .get_cf(&cf_names, &name_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some()
        {
            return Err(StoreError::DuplicateName { name: name.into() });
        }

        let id = AccountId::new(self.alloc_id(meta::NEXT_ACCOUNT_ID)?);
        let account = Account::new(
            id,
            name.to_string(),
            password_hash.to_string(),
            phone,
            referred_by,
            now,
        );

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, keys::account_key(id), Self::serialize(&account)?);
        batch.put_cf(&cf_names, &name_key, id.to_be_bytes());

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(account_id = %id, name = %name, "Account created");
        Ok(account)
    }

    fn get_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf_accounts, keys::account_key(account_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let cf_names = self.cf(cf::ACCOUNTS_BY_NAME)?;
        let Some(id_bytes) = self
            .db
            .get_cf(&cf_names, keys::account_name_key(name))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let id = AccountId::from_be_bytes(&id_bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.get_account(id)
    }

    fn get_account_by_referral_code(&self, referral_code: &str) -> Result<Option<Account>> {
        // Referral lookups happen once per registration; a scan is fine at
        // this scale.
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        for item in self.db.iterator_cf(&cf_accounts, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let account: Account = Self::deserialize(&value)?;
            if account.referral_code == referral_code {
                return Ok(Some(account));
            }
        }
        Ok(None)
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(&cf_accounts, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            accounts.push(Self::deserialize(&value)?);
        }
        Ok(accounts)
    }

    fn update_expiry(
        &self,
        account_id: AccountId,
        new_expires_at: DateTime<Utc>,
        admin_override: bool,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let new_expiry = self.with_account_locked(account_id, |account| {
            account.expires_at = if admin_override {
                new_expires_at
            } else {
                account.expires_at.max(new_expires_at)
            };
            account.updated_at = now;
            account.expires_at
        })?;

        tracing::info!(
            account_id = %account_id,
            new_expiry = %new_expiry,
            admin_override = %admin_override,
            "Account expiry updated"
        );
        Ok(new_expiry)
    }

    fn set_password(
        &self,
        account_id: AccountId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_account_locked(account_id, |account| {
            account.password_hash = password_hash.to_string();
            account.updated_at = now;
        })?;
        tracing::info!(account_id = %account_id, "Password updated");
        Ok(())
    }

    fn set_active(&self, account_id: AccountId, is_active: bool, now: DateTime<Utc>) -> Result<()> {
        self.with_account_locked(account_id, |account| {
            account.is_active = is_active;
            account.updated_at = now;
        })?;
        tracing::info!(account_id = %account_id, is_active = %is_active, "Account active flag updated");
        Ok(())
    }

    fn add_to_watchlist(
        &self,
        account_id: AccountId,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_account_locked(account_id, |account| {
            account.watchlist.insert(symbol.to_string());
            account.updated_at = now;
        })
    }

    fn remove_from_watchlist(
        &self,
        account_id: AccountId,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_account_locked(account_id, |account| {
            account.watchlist.remove(symbol);
            account.updated_at = now;
        })
    }

    fn delete_account(&self, account_id: AccountId) -> Result<()> {
        let key = keys::account_key(account_id);
        let lock = self.locks.lock_for(&lock_key(cf::ACCOUNTS, &key));
        let _held = lock.guard();

        let account = self.require_account(account_id)?;

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_names = self.cf(cf::ACCOUNTS_BY_NAME)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_accounts, &key);
        batch.delete_cf(&cf_names, keys::account_name_key(&account.name));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(account_id = %account_id, "Account deleted");
        Ok(())
    }

    // =========================================================================
    // Invite Code Operations
    // =========================================================================

    fn generate_invites(
        &self,
        count: u32,
        duration_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<InviteCode>> {
        if count == 0 {
            return Err(StoreError::InvalidArgument("count must be positive".into()));
        }
        if duration_days == 0 {
            return Err(StoreError::InvalidArgument(
                "duration_days must be positive".into(),
            ));
        }

        let cf_codes = self.cf(cf::INVITE_CODES)?;
        let mut batch = WriteBatch::default();
        let mut generated = Vec::with_capacity(count as usize);

        for _ in 0..count {
            // Collision-check against existing codes; regenerate on the
            // (vanishingly rare) hit.
            let invite = loop {
                let candidate = InviteCode::generate(duration_days, now);
                let exists = self
                    .db
                    .get_cf(&cf_codes, keys::invite_code_key(&candidate.code))
                    .map_err(|e| StoreError::Database(e.to_string()))?
                    .is_some();
                if !exists && !generated.iter().any(|c: &InviteCode| c.code == candidate.code) {
                    break candidate;
                }
            };

            batch.put_cf(
                &cf_codes,
                keys::invite_code_key(&invite.code),
                Self::serialize(&invite)?,
            );
            generated.push(invite);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(count = %count, duration_days = %duration_days, "Invite codes generated");
        Ok(generated)
    }

    fn get_invite(&self, code: &str) -> Result<Option<InviteCode>> {
        let cf_codes = self.cf(cf::INVITE_CODES)?;
        self.db
            .get_cf(&cf_codes, keys::invite_code_key(code))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_invites(&self) -> Result<Vec<InviteCode>> {
        let cf_codes = self.cf(cf::INVITE_CODES)?;
        let mut codes: Vec<InviteCode> = Vec::new();
        for item in self.db.iterator_cf(&cf_codes, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            codes.push(Self::deserialize(&value)?);
        }
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    fn redeem_invite(
        &self,
        code: &str,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let code_key = keys::invite_code_key(code);
        let code_lock = self.locks.lock_for(&lock_key(cf::INVITE_CODES, &code_key));
        let _code_held = code_lock.guard();

        let mut invite = self.get_invite(code)?.ok_or(StoreError::NotFound {
            entity: "invite code",
            id: code.to_string(),
        })?;

        if invite.is_used {
            return Err(StoreError::CodeAlreadyUsed { code: code.into() });
        }

        let account_key = keys::account_key(account_id);
        let account_lock = self.locks.lock_for(&lock_key(cf::ACCOUNTS, &account_key));
        let _account_held = account_lock.guard();

        let mut account = self.require_account(account_id)?;
        let new_expiry = account.extend(invite.duration_days, now);
        invite.consume(account_id, now);

        let cf_codes = self.cf(cf::INVITE_CODES)?;
        let cf_accounts = self.cf(cf::ACCOUNTS)?;

        // Code consumption and the grant it produced commit together.
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_codes, &code_key, Self::serialize(&invite)?);
        batch.put_cf(&cf_accounts, &account_key, Self::serialize(&account)?);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            account_id = %account_id,
            duration_days = %invite.duration_days,
            new_expiry = %new_expiry,
            "Invite code redeemed"
        );
        Ok(new_expiry)
    }

    // =========================================================================
    // Plan Operations
    // =========================================================================

    fn create_plan(
        &self,
        name: &str,
        duration_days: u32,
        price_cents: i64,
        description: &str,
        sort_order: i32,
        now: DateTime<Utc>,
    ) -> Result<Plan> {
        if duration_days == 0 {
            return Err(StoreError::InvalidArgument(
                "duration_days must be positive".into(),
            ));
        }
        if price_cents < 0 {
            return Err(StoreError::InvalidArgument(
                "price must not be negative".into(),
            ));
        }

        let plan = Plan {
            id: PlanId::new(self.alloc_id(meta::NEXT_PLAN_ID)?),
            name: name.to_string(),
            duration_days,
            price_cents,
            description: description.to_string(),
            sort_order,
            is_active: true,
            created_at: now,
        };

        let cf_plans = self.cf(cf::PLANS)?;
        self.db
            .put_cf(&cf_plans, keys::plan_key(plan.id), Self::serialize(&plan)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(plan_id = %plan.id, name = %name, "Plan created");
        Ok(plan)
    }

    fn get_plan(&self, plan_id: PlanId) -> Result<Option<Plan>> {
        let cf_plans = self.cf(cf::PLANS)?;
        self.db
            .get_cf(&cf_plans, keys::plan_key(plan_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_plans(&self, include_inactive: bool) -> Result<Vec<Plan>> {
        let cf_plans = self.cf(cf::PLANS)?;
        let mut plans: Vec<Plan> = Vec::new();
        for item in self.db.iterator_cf(&cf_plans, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let plan: Plan = Self::deserialize(&value)?;
            if include_inactive || plan.is_active {
                plans.push(plan);
            }
        }
        plans.sort_by_key(|p| p.sort_order);
        Ok(plans)
    }

    // =========================================================================
    // Payment Order Operations
    // =========================================================================

    fn create_order(
        &self,
        account_id: AccountId,
        plan_id: PlanId,
        now: DateTime<Utc>,
    ) -> Result<PaymentOrder> {
        let _account = self.require_account(account_id)?;
        let plan = self.get_plan(plan_id)?.ok_or(StoreError::NotFound {
            entity: "plan",
            id: plan_id.to_string(),
        })?;
        if !plan.is_active {
            return Err(StoreError::InvalidArgument("plan is not for sale".into()));
        }

        let order = PaymentOrder::new(account_id, &plan, now);

        let cf_orders = self.cf(cf::ORDERS)?;
        self.db
            .put_cf(
                &cf_orders,
                keys::order_key(&order.out_trade_no),
                Self::serialize(&order)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            out_trade_no = %order.out_trade_no,
            account_id = %account_id,
            plan_id = %plan_id,
            price_cents = %order.price_cents,
            "Order created"
        );
        Ok(order)
    }

    fn get_order(&self, out_trade_no: &OrderNo) -> Result<Option<PaymentOrder>> {
        let cf_orders = self.cf(cf::ORDERS)?;
        self.db
            .get_cf(&cf_orders, keys::order_key(out_trade_no))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_orders(&self) -> Result<Vec<PaymentOrder>> {
        let cf_orders = self.cf(cf::ORDERS)?;
        let mut orders: Vec<PaymentOrder> = Vec::new();
        // Order keys embed a ULID, so forward iteration is oldest-first.
        for item in self.db.iterator_cf(&cf_orders, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            orders.push(Self::deserialize(&value)?);
        }
        orders.reverse();
        Ok(orders)
    }

    fn settle_order(
        &self,
        out_trade_no: &OrderNo,
        trade_no: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Settlement> {
        let order_key = keys::order_key(out_trade_no);
        let order_lock = self.locks.lock_for(&lock_key(cf::ORDERS, &order_key));
        let _order_held = order_lock.guard();

        let mut order = self.get_order(out_trade_no)?.ok_or(StoreError::NotFound {
            entity: "order",
            id: out_trade_no.to_string(),
        })?;

        match order.status {
            OrderStatus::Paid => {
                // Idempotent replay: return the previously-computed result
                // without touching any account.
                let new_expiry = order.settled_expiry.ok_or_else(|| {
                    StoreError::Database(format!(
                        "settled order missing settled_expiry: {out_trade_no}"
                    ))
                })?;
                tracing::info!(out_trade_no = %out_trade_no, "Settlement replayed");
                return Ok(Settlement {
                    out_trade_no: out_trade_no.clone(),
                    new_expiry,
                    replayed: true,
                });
            }
            OrderStatus::Expired | OrderStatus::Failed => {
                return Err(StoreError::OrderNotPayable {
                    out_trade_no: out_trade_no.to_string(),
                    status: format!("{:?}", order.status).to_lowercase(),
                });
            }
            OrderStatus::Pending => {}
        }

        let buyer_id = order.account_id;
        let buyer_key = keys::account_key(buyer_id);

        // Self-referral carries no bonus; it would also self-deadlock on
        // the account lock.
        let mut buyer = self.require_account(buyer_id)?;
        let referrer_id = buyer.referred_by.filter(|id| *id != buyer_id);

        // Acquire account locks in ascending id order to stay deadlock-free
        // against settlements racing in the opposite direction.
        let mut ids_to_lock = vec![buyer_id];
        if let Some(referrer_id) = referrer_id {
            ids_to_lock.push(referrer_id);
        }
        ids_to_lock.sort_unstable();
        let account_locks: Vec<_> = ids_to_lock
            .iter()
            .map(|id| {
                self.locks
                    .lock_for(&lock_key(cf::ACCOUNTS, &keys::account_key(*id)))
            })
            .collect();
        let _account_guards: Vec<_> = account_locks.iter().map(|lock| lock.guard()).collect();

        // Re-read under the locks.
        buyer = self.require_account(buyer_id)?;
        let new_expiry = buyer.extend(order.duration_days, now);

        let referrer = match referrer_id {
            Some(id) => match self.get_account(id)? {
                Some(mut referrer) => {
                    let bonus = referral_bonus_days(order.duration_days);
                    let referrer_expiry = referrer.extend(bonus, now);
                    tracing::info!(
                        referrer_id = %id,
                        bonus_days = %bonus,
                        new_expiry = %referrer_expiry,
                        "Referral bonus granted"
                    );
                    Some(referrer)
                }
                None => {
                    // Referrer was hard-deleted; the purchase still settles.
                    tracing::warn!(referrer_id = %id, "Referrer no longer exists, skipping bonus");
                    None
                }
            },
            None => None,
        };

        order.status = OrderStatus::Paid;
        order.paid_at = Some(now);
        order.trade_no = trade_no.map(ToString::to_string);
        order.settled_expiry = Some(new_expiry);

        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_accounts = self.cf(cf::ACCOUNTS)?;

        // The status transition, the buyer's grant, and the referral bonus
        // commit as one unit: a crash can never apply one without the others.
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_orders, &order_key, Self::serialize(&order)?);
        batch.put_cf(&cf_accounts, &buyer_key, Self::serialize(&buyer)?);
        if let Some(referrer) = &referrer {
            batch.put_cf(
                &cf_accounts,
                keys::account_key(referrer.id),
                Self::serialize(referrer)?,
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            out_trade_no = %out_trade_no,
            account_id = %buyer_id,
            duration_days = %order.duration_days,
            new_expiry = %new_expiry,
            "Order settled"
        );

        Ok(Settlement {
            out_trade_no: out_trade_no.clone(),
            new_expiry,
            replayed: false,
        })
    }

    fn expire_stale_orders(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize> {
        let cf_orders = self.cf(cf::ORDERS)?;

        // Collect candidates first, then re-check each under its lock so
        // a settlement racing this sweep always wins.
        let mut candidates = Vec::new();
        for item in self.db.iterator_cf(&cf_orders, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let order: PaymentOrder = Self::deserialize(&value)?;
            if order.status == OrderStatus::Pending && order.created_at + ttl <= now {
                candidates.push(order.out_trade_no);
            }
        }

        let mut expired = 0;
        for out_trade_no in candidates {
            let order_key = keys::order_key(&out_trade_no);
            let lock = self.locks.lock_for(&lock_key(cf::ORDERS, &order_key));
            let _held = lock.guard();

            let Some(mut order) = self.get_order(&out_trade_no)? else {
                continue;
            };
            if order.status != OrderStatus::Pending {
                continue;
            }

            order.status = OrderStatus::Expired;
            self.db
                .put_cf(&cf_orders, &order_key, Self::serialize(&order)?)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            expired += 1;
        }

        if expired > 0 {
            tracing::info!(expired = %expired, "Stale pending orders expired");
        }
        Ok(expired)
    }
}
