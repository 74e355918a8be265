//! Two-step "add expense" conversation, one per chat identity.
//!
//! The dialog only collects input. Recording happens once the caller has a
//! [`ExpenseDraft`] in hand, so a failed write never leaves a half-finished
//! conversation behind.

use crate::error::ErrorCode;
use crate::model::{NewExpense, parse_amount};
use chrono::NaiveDate;
use std::collections::HashMap;

pub const ASK_AMOUNT: &str = "How much was the expense? (e.g., 12.50)";
pub const ASK_DESCRIPTION: &str = "What was it for? (e.g., Toilet paper)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    #[error("no expense dialog in progress")]
    NoActiveDialog,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("expected {expected}, the dialog is waiting for something else")]
    UnexpectedStep { expected: &'static str },
}

impl DialogError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoActiveDialog | Self::UnexpectedStep { .. } => ErrorCode::NoActiveDialog,
            Self::InvalidAmount(_) => ErrorCode::InvalidAmount,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState {
    AwaitingAmount { payer: String },
    AwaitingDescription { payer: String, amount: f64 },
}

/// A finished conversation, ready to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub payer: String,
    pub amount: f64,
    pub description: String,
}

impl ExpenseDraft {
    #[must_use]
    pub fn into_expense(self, date: NaiveDate) -> NewExpense {
        NewExpense {
            payer: self.payer,
            amount: self.amount,
            description: self.description,
            date,
        }
    }
}

/// What a free-text message did to the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogEvent {
    /// Amount accepted; ask for a description next.
    AskDescription { amount: f64 },
    Completed(ExpenseDraft),
    /// A command interrupted the dialog.
    Cancelled,
    /// Nothing in progress for this identity; the text is not ours.
    Ignored,
}

/// Open conversations keyed by verified identity.
#[derive(Debug, Default)]
pub struct ExpenseDialogs {
    open: HashMap<String, DialogState>,
}

impl ExpenseDialogs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin (or restart) a dialog for `identity`, paid by `payer`. Returns the
    /// prompt to show.
    pub fn start_expense_dialog(&mut self, identity: &str, payer: &str) -> &'static str {
        self.open.insert(
            identity.to_string(),
            DialogState::AwaitingAmount {
                payer: payer.to_string(),
            },
        );
        ASK_AMOUNT
    }

    #[must_use]
    pub fn state(&self, identity: &str) -> Option<&DialogState> {
        self.open.get(identity)
    }

    /// # Errors
    ///
    /// [`DialogError::InvalidAmount`] keeps the dialog waiting for an amount.
    pub fn submit_amount(&mut self, identity: &str, text: &str) -> Result<f64, DialogError> {
        let state = self
            .open
            .get_mut(identity)
            .ok_or(DialogError::NoActiveDialog)?;
        let DialogState::AwaitingAmount { payer } = state else {
            return Err(DialogError::UnexpectedStep {
                expected: "a description",
            });
        };
        let amount = parse_amount(text).map_err(DialogError::InvalidAmount)?;
        *state = DialogState::AwaitingDescription {
            payer: std::mem::take(payer),
            amount,
        };
        Ok(amount)
    }

    /// Finish the dialog. The dialog is closed on success.
    ///
    /// # Errors
    ///
    /// Fails when no dialog is open or it is still waiting for an amount.
    pub fn submit_description(
        &mut self,
        identity: &str,
        text: &str,
    ) -> Result<ExpenseDraft, DialogError> {
        match self.open.get(identity) {
            None => Err(DialogError::NoActiveDialog),
            Some(DialogState::AwaitingAmount { .. }) => Err(DialogError::UnexpectedStep {
                expected: "an amount",
            }),
            Some(DialogState::AwaitingDescription { .. }) => {
                let Some(DialogState::AwaitingDescription { payer, amount }) =
                    self.open.remove(identity)
                else {
                    return Err(DialogError::NoActiveDialog);
                };
                Ok(ExpenseDraft {
                    payer,
                    amount,
                    description: text.trim().to_string(),
                })
            }
        }
    }

    /// Route a free-text message. Text starting with `/` cancels.
    ///
    /// # Errors
    ///
    /// Propagates [`DialogError::InvalidAmount`]; the dialog stays open.
    pub fn submit_text(&mut self, identity: &str, text: &str) -> Result<DialogEvent, DialogError> {
        let awaiting_amount = match self.open.get(identity) {
            None => return Ok(DialogEvent::Ignored),
            Some(state) => matches!(state, DialogState::AwaitingAmount { .. }),
        };
        if text.trim_start().starts_with('/') {
            self.open.remove(identity);
            tracing::debug!("expense dialog cancelled by command");
            return Ok(DialogEvent::Cancelled);
        }
        if awaiting_amount {
            let amount = self.submit_amount(identity, text)?;
            Ok(DialogEvent::AskDescription { amount })
        } else {
            Ok(DialogEvent::Completed(self.submit_description(identity, text)?))
        }
    }

    /// Drop any dialog for `identity`; returns whether one was open.
    pub fn cancel(&mut self, identity: &str) -> bool {
        self.open.remove(identity).is_some()
    }
}
