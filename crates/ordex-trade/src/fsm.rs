//! Legal lifecycle transitions.
//!
//! The transition table is the contract; [`advance`] is the only way the
//! lifecycle moves a trade between states, so an illegal hop is a bug
//! caught at the transition, not three states later.

use crate::error::{TradeError, TradeResult};
use ordex_core::{TradeRecord, TradeStatus};

/// Whether `from -> to` is a legal lifecycle move.
pub fn can_transition(from: TradeStatus, to: TradeStatus) -> bool {
    use TradeStatus::*;
    // Error is reachable from every non-terminal state.
    if to == Error {
        return from != Closed;
    }
    matches!(
        (from, to),
        (Init, LeverageSet)
            | (LeverageSet, EntryPlaced)
            | (EntryPlaced, EntryFilled)
            | (EntryFilled, ExitPlaced)
            | (ExitPlaced, Running)
            | (Running, TpHit)
            | (Running, SlHit)
            | (Running, HedgeActive)
            | (Running, Closed)
            | (HedgeActive, Running)
            | (HedgeActive, Closed)
            | (TpHit, Closed)
            | (SlHit, ReentryAttempt)
            | (SlHit, Closed)
            | (ReentryAttempt, EntryPlaced)
            | (ReentryAttempt, Closed)
            | (Error, Closed)
    )
}

/// Move a trade to `to`, or fail without touching it.
pub fn advance(record: &mut TradeRecord, to: TradeStatus) -> TradeResult<()> {
    let from = record.status;
    if !can_transition(from, to) {
        return Err(TradeError::IllegalTransition { from, to });
    }
    tracing::info!(
        trade_id = %record.trade_id,
        symbol = %record.symbol,
        %from,
        %to,
        "trade transition"
    );
    record.status = to;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordex_core::{Direction, TradeId};

    fn record_in(status: TradeStatus) -> TradeRecord {
        let mut r = TradeRecord::new(TradeId::new("BTCUSDT"), "BTCUSDT".into(), Direction::Long);
        r.status = status;
        r
    }

    #[test]
    fn test_happy_path_chain() {
        use TradeStatus::*;
        let chain = [
            LeverageSet,
            EntryPlaced,
            EntryFilled,
            ExitPlaced,
            Running,
            TpHit,
            Closed,
        ];
        let mut record = record_in(Init);
        for next in chain {
            advance(&mut record, next).unwrap();
        }
        assert!(record.status.is_terminal());
    }

    #[test]
    fn test_error_reachable_from_anywhere_but_closed() {
        use TradeStatus::*;
        for from in [
            Init,
            LeverageSet,
            EntryPlaced,
            EntryFilled,
            ExitPlaced,
            Running,
            TpHit,
            SlHit,
            HedgeActive,
            ReentryAttempt,
            Error,
        ] {
            assert!(can_transition(from, Error), "{from} -> Error");
        }
        assert!(!can_transition(Closed, Error));
    }

    #[test]
    fn test_reentry_loops_back_to_entry() {
        use TradeStatus::*;
        let mut record = record_in(Running);
        advance(&mut record, SlHit).unwrap();
        advance(&mut record, ReentryAttempt).unwrap();
        advance(&mut record, EntryPlaced).unwrap();
        assert_eq!(record.status, EntryPlaced);
    }

    #[test]
    fn test_illegal_hop_rejected() {
        use TradeStatus::*;
        let mut record = record_in(Init);
        let err = advance(&mut record, Running).unwrap_err();
        assert!(matches!(err, TradeError::IllegalTransition { .. }));
        assert_eq!(record.status, Init);
    }
}
