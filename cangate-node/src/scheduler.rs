//! Periodic send scheduling
use cangate_common::{actions::Action, error::ActionError, rule::ActionRule, traits::Hardware};
use defmt_or_log::warn;

use crate::dispatcher::{ActionDispatcher, ActionOutcome};
use crate::rule_store::RuleStore;

/// Returns true if `rule` is a periodic send whose interval has elapsed at `now_ms`
///
/// The elapsed time is computed with wrapping arithmetic, so a millisecond counter rolling over
/// does not stall the schedule. Disabled rules and rules with a zero interval are never due.
pub fn is_due(rule: &ActionRule, now_ms: u32) -> bool {
    match rule.action {
        Action::CanSendPeriodic { interval_ms, .. } if rule.enabled && interval_ms != 0 => {
            now_ms.wrapping_sub(rule.last_execute_ms) >= interval_ms
        }
        _ => false,
    }
}

/// Run every periodic rule which is due, in slot order
///
/// Each attempt is reported to `on_result`. A failed send leaves the rule's bookkeeping untouched,
/// so it is retried on the next tick. Returns the number of rules sent successfully.
pub fn tick<const N: usize, H: Hardware>(
    store: &mut RuleStore<N>,
    dispatcher: &mut ActionDispatcher<H>,
    now_ms: u32,
    mut on_result: impl FnMut(&ActionRule, Result<ActionOutcome, ActionError>),
) -> usize {
    let mut count = 0;
    for rule in store.iter_mut() {
        if !is_due(rule, now_ms) {
            continue;
        }
        let result = dispatcher.execute(rule, None, now_ms);
        match result {
            Ok(_) => count += 1,
            Err(_) => warn!("Periodic rule {} failed", rule.id),
        }
        on_result(rule, result);
    }
    count
}
