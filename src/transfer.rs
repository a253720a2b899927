//! Moving money between two participant balances
use crate::error::{LedgerError, Result, ValidationError};
use crate::model::Participant;
use crate::store::{Record, Ref, Resolve, WriteSet};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub payer: String,
    pub payee: String,
    pub amount: Decimal,
}

/// Debits `payer` and credits `payee` by `amount`. There is no floor: a payer
/// may end up with a negative balance.
pub fn transfer(payer: &mut Participant, payee: &mut Participant, amount: Decimal) -> Result<Transfer> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::NegativeValue {
            field: "transfer amount",
            value: amount,
        }
        .into());
    }
    if payer.key() == payee.key() {
        return Err(LedgerError::invalid_transition(
            payer.key().kind(),
            payer.id.clone(),
            "cannot transfer to itself",
        ));
    }

    let debited = payer
        .account_balance
        .checked_sub(amount)
        .ok_or(ValidationError::AmountOverflow("payer balance"))?;
    let credited = payee
        .account_balance
        .checked_add(amount)
        .ok_or(ValidationError::AmountOverflow("payee balance"))?;

    payer.account_balance = debited;
    payee.account_balance = credited;

    Ok(Transfer {
        payer: payer.id.clone(),
        payee: payee.id.clone(),
        amount,
    })
}

/// Loads both parties into `write_set`, applies the transfer and stages both
/// balances, so they commit together with the rest of the transition.
pub fn transfer_between<P, Q>(
    write_set: &mut WriteSet<'_>,
    payer: &Ref<P>,
    payee: &Ref<Q>,
    amount: Decimal,
) -> Result<Transfer>
where
    P: Resolve<Target = Participant>,
    Q: Resolve<Target = Participant>,
{
    let mut from = write_set.resolve(payer)?;
    let mut to = write_set.resolve(payee)?;

    let receipt = transfer(&mut from, &mut to, amount)?;

    write_set.update(&from)?;
    write_set.update(&to)?;

    tracing::debug!(payer = %receipt.payer, payee = %receipt.payee, amount = %receipt.amount, "balance transfer staged");
    Ok(receipt)
}
