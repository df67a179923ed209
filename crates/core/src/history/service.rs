//! Building and checking balance history rows.

use chrono::{DateTime, NaiveDate, Utc};
use coffer_shared::types::{BalanceHistoryId, Money, MoneyError, OwnerId, SignedMoney};
use thiserror::Error;

use crate::error::WalletError;
use crate::history::types::ShipperBalanceHistory;

/// A break in a shipper's balance history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContinuityError {
    /// A row does not open at the previous row's final balance.
    #[error("Row for {date} opens at {found}, previous day closed at {expected}")]
    OpeningMismatch {
        /// The offending day.
        date: NaiveDate,
        /// Previous row's final balance.
        expected: SignedMoney,
        /// This row's opening balance.
        found: SignedMoney,
    },

    /// A row's final balance does not follow from its figures.
    #[error("Row for {0} has an inconsistent final balance")]
    ArithmeticMismatch(NaiveDate),

    /// Rows are not in strictly increasing date order.
    #[error("Row for {0} is out of order")]
    OutOfOrder(NaiveDate),
}

/// Stateless service for the balance history report.
pub struct BalanceHistoryService;

impl BalanceHistoryService {
    /// `opening + collected - deposited + bonus`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the result does not fit.
    pub fn final_balance(
        opening: SignedMoney,
        collected: Money,
        deposited: Money,
        bonus: Money,
    ) -> Result<SignedMoney, MoneyError> {
        opening
            .checked_add(collected.as_signed()?)?
            .checked_sub(deposited.as_signed()?)?
            .checked_add(bonus.as_signed()?)
    }

    /// Builds the row that follows `latest` for the same shipper.
    ///
    /// The first row of a shipper opens at zero.
    ///
    /// # Errors
    ///
    /// - `DuplicateBalanceHistory` if `date` equals the latest row's date
    /// - `BalanceHistoryOutOfOrder` if `date` precedes it
    /// - `AmountOverflow` if the final balance does not fit
    pub fn next_row(
        latest: Option<&ShipperBalanceHistory>,
        shipper_id: OwnerId,
        date: NaiveDate,
        collected: Money,
        deposited: Money,
        bonus: Money,
        now: DateTime<Utc>,
    ) -> Result<ShipperBalanceHistory, WalletError> {
        if let Some(latest) = latest {
            if latest.date == date {
                return Err(WalletError::DuplicateBalanceHistory { shipper_id, date });
            }
            if date < latest.date {
                return Err(WalletError::BalanceHistoryOutOfOrder {
                    latest: latest.date,
                    requested: date,
                });
            }
        }

        let opening_balance = latest.map_or(SignedMoney::ZERO, |row| row.final_balance);
        Ok(ShipperBalanceHistory {
            id: BalanceHistoryId::new(),
            shipper_id,
            date,
            opening_balance,
            collected,
            deposited,
            bonus,
            final_balance: Self::final_balance(opening_balance, collected, deposited, bonus)?,
            created_at: now,
        })
    }

    /// Checks a date-ordered slice of one shipper's rows.
    ///
    /// The first row's opening balance is taken as given, so any contiguous window of the
    /// history can be verified.
    ///
    /// # Errors
    ///
    /// Returns the first `ContinuityError` found.
    pub fn verify_continuity(rows: &[ShipperBalanceHistory]) -> Result<(), ContinuityError> {
        for row in rows {
            let expected =
                Self::final_balance(row.opening_balance, row.collected, row.deposited, row.bonus);
            if expected != Ok(row.final_balance) {
                return Err(ContinuityError::ArithmeticMismatch(row.date));
            }
        }

        for pair in rows.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if current.date <= previous.date {
                return Err(ContinuityError::OutOfOrder(current.date));
            }
            if current.opening_balance != previous.final_balance {
                return Err(ContinuityError::OpeningMismatch {
                    date: current.date,
                    expected: previous.final_balance,
                    found: current.opening_balance,
                });
            }
        }
        Ok(())
    }
}
