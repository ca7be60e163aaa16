//! Aggregate roots for the sample ledger.

use eventview_core::aggregate::{AggregateRoot, Emitter};
use eventview_core::error::DomainError;
use uuid::Uuid;

use super::events::{AccountEvent, AccountOpened, FundsDeposited, FundsWithdrawn};

/// The aggregate root for a bank account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Name of the holder, once opened.
    owner: Option<String>,
    /// Balance in minor units.
    balance: i64,
}

impl Account {
    /// Name of the holder, or `None` before the account is opened.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Balance in minor units.
    #[must_use]
    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// Opens the account, producing an `Opened` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the account is already open or the
    /// owner is blank, and any refusal from the emitter.
    pub fn open(&mut self, owner: &str, emitter: &Emitter<'_>) -> Result<(), DomainError> {
        if self.owner.is_some() {
            return Err(DomainError::Validation(format!("account {} is already open", self.id)));
        }
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(DomainError::Validation("account owner must not be blank".into()));
        }
        emitter.emit(
            self,
            AccountEvent::Opened(AccountOpened {
                account_id: self.id,
                owner: owner.to_owned(),
            }),
        )
    }

    /// Pays `amount` into the account, producing a `Deposited` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the account is not open or the
    /// amount is not positive, and any refusal from the emitter.
    pub fn deposit(&mut self, amount: i64, emitter: &Emitter<'_>) -> Result<(), DomainError> {
        self.ensure_open()?;
        ensure_positive(amount)?;
        emitter.emit(
            self,
            AccountEvent::Deposited(FundsDeposited {
                account_id: self.id,
                amount,
            }),
        )
    }

    /// Takes `amount` out of the account, producing a `Withdrawn` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the account is not open, the
    /// amount is not positive or exceeds the balance, and any refusal from the
    /// emitter.
    pub fn withdraw(&mut self, amount: i64, emitter: &Emitter<'_>) -> Result<(), DomainError> {
        self.ensure_open()?;
        ensure_positive(amount)?;
        if amount > self.balance {
            return Err(DomainError::Validation(format!(
                "account {} cannot cover {amount}: balance is {}",
                self.id, self.balance
            )));
        }
        emitter.emit(
            self,
            AccountEvent::Withdrawn(FundsWithdrawn {
                account_id: self.id,
                amount,
            }),
        )
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.owner.is_none() {
            return Err(DomainError::Validation(format!("account {} is not open", self.id)));
        }
        Ok(())
    }
}

fn ensure_positive(amount: i64) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::Validation(format!("amount must be positive, got {amount}")));
    }
    Ok(())
}

impl AggregateRoot for Account {
    const AGGREGATE_TYPE: &'static str = "account";
    type Event = AccountEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            owner: None,
            balance: 0,
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        if let AccountEvent::Opened(payload) = event {
            self.owner = Some(payload.owner.clone());
        }
        self.balance += event.balance_delta();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use eventview_core::aggregate::VersionSequence;
    use eventview_core::unit_of_work::RecordingUnitOfWork;
    use eventview_test_support::FixedClock;

    use super::*;

    struct Harness {
        sequence: VersionSequence,
        uow: RecordingUnitOfWork,
        clock: FixedClock,
    }

    impl Harness {
        fn for_account(account: &Account) -> Self {
            Self {
                sequence: VersionSequence::after(account.version()),
                uow: RecordingUnitOfWork::new(),
                clock: FixedClock::default(),
            }
        }

        fn emitter(&self) -> Emitter<'_> {
            Emitter::new(&self.sequence, &self.uow, &self.clock, Uuid::nil())
        }
    }

    fn opened_account() -> Account {
        let mut account = Account::new(Uuid::new_v4());
        account.apply(&AccountEvent::Opened(AccountOpened {
            account_id: account.id,
            owner: "Ada".into(),
        }));
        account
    }

    #[test]
    fn test_open_records_owner_and_emits_event() {
        // Arrange
        let mut account = Account::new(Uuid::new_v4());
        let harness = Harness::for_account(&account);

        // Act
        account.open("  Ada ", &harness.emitter()).unwrap();

        // Assert
        assert_eq!(account.owner(), Some("Ada"));
        let emitted = harness.uow.emitted_events();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].event_type, "account.opened");
        assert_eq!(emitted[0].aggregate_type, "account");
        assert_eq!(emitted[0].sequence_number, 1);
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let mut account = opened_account();
        let harness = Harness::for_account(&account);

        let err = account.open("Grace", &harness.emitter()).unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(account.owner(), Some("Ada"));
    }

    #[test]
    fn test_deposit_and_withdraw_move_balance() {
        let mut account = opened_account();
        let harness = Harness::for_account(&account);

        account.deposit(100, &harness.emitter()).unwrap();
        account.withdraw(40, &harness.emitter()).unwrap();

        assert_eq!(account.balance(), 60);
        assert_eq!(account.version(), 3);
        let sequence_numbers: Vec<i64> = harness
            .uow
            .emitted_events()
            .iter()
            .map(|e| e.sequence_number)
            .collect();
        assert_eq!(sequence_numbers, vec![2, 3]);
    }

    #[test]
    fn test_overdraft_is_rejected_without_emitting() {
        let mut account = opened_account();
        let harness = Harness::for_account(&account);

        let err = account.withdraw(1, &harness.emitter()).unwrap_err();

        assert!(err.to_string().contains("cannot cover 1"));
        assert!(harness.uow.emitted_events().is_empty());
    }

    #[test]
    fn test_deposit_on_unopened_account_is_rejected() {
        let mut account = Account::new(Uuid::new_v4());
        let harness = Harness::for_account(&account);

        let err = account.deposit(5, &harness.emitter()).unwrap_err();

        assert!(err.to_string().contains("is not open"));
    }

    #[test]
    fn test_non_positive_amount_is_rejected() {
        let mut account = opened_account();
        let harness = Harness::for_account(&account);

        assert!(account.deposit(0, &harness.emitter()).is_err());
        assert!(account.withdraw(-3, &harness.emitter()).is_err());
        assert_eq!(account.balance(), 0);
    }
}
