//! Fixed capacity rule table
use cangate_common::{
    error::ActionError,
    platform::PlatformProfile,
    rule::ActionRule,
};
use defmt_or_log::{debug, info};

/// Most rules a store can hold; one per nonzero id
pub const MAX_RULES: usize = u8::MAX as usize;

/// A table of up to `N` rules, kept in slot order
///
/// Ids are unique among stored rules. Rules added with id 0 are assigned the next value of a
/// counter which runs 1..=255 and then wraps back to 1, skipping ids still in use.
#[derive(Debug, Clone)]
pub struct RuleStore<const N: usize> {
    slots: [Option<ActionRule>; N],
    capacity: usize,
    next_id: u8,
}

impl<const N: usize> Default for RuleStore<N> {
    fn default() -> Self {
        Self::new(N)
    }
}

impl<const N: usize> RuleStore<N> {
    /// Create an empty store holding at most `capacity` rules
    ///
    /// `capacity` is capped at `N`, and at 255 since ids are 8 bits.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: [None; N],
            capacity: capacity.min(N).min(MAX_RULES),
            next_id: 1,
        }
    }

    /// Maximum number of rules
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored rules
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns true when no slot is free
    pub fn is_full(&self) -> bool {
        self.free_slot().is_none()
    }

    /// The id the next auto-assigned rule would receive, ignoring ids in use
    pub fn next_id(&self) -> u8 {
        self.next_id
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots[..self.capacity].iter().position(|s| s.is_none())
    }

    fn index_of(&self, id: u8) -> Option<usize> {
        if id == 0 {
            return None;
        }
        self.slots
            .iter()
            .position(|s| matches!(s, Some(rule) if rule.id == id))
    }

    fn advance(id: u8) -> u8 {
        if id == u8::MAX {
            1
        } else {
            id + 1
        }
    }

    fn assign_id(&mut self) -> u8 {
        let mut id = self.next_id;
        // Capacity is at most 255 and a free slot exists, so some id is unused
        while self.index_of(id).is_some() {
            id = Self::advance(id);
        }
        self.next_id = Self::advance(id);
        id
    }

    /// Add a rule, returning its id
    ///
    /// A rule with id 0 is given a fresh id. A rule whose id is already stored replaces the
    /// stored rule in its slot.
    pub fn add(&mut self, rule: ActionRule, platform: &PlatformProfile) -> Result<u8, ActionError> {
        let kind = rule.kind();
        if !platform.supports(kind) {
            return Err(ActionError::PlatformUnsupported { kind });
        }

        if let Some(index) = self.index_of(rule.id) {
            debug!("Replacing rule {} in slot {}", rule.id, index);
            self.slots[index] = Some(rule);
            return Ok(rule.id);
        }

        let index = self.free_slot().ok_or(ActionError::Full)?;
        let mut rule = rule;
        if rule.id == 0 {
            rule.id = self.assign_id();
        }
        info!("Added rule {} ({}) in slot {}", rule.id, kind.name(), index);
        self.slots[index] = Some(rule);
        Ok(rule.id)
    }

    /// Remove a rule, returning it
    pub fn remove(&mut self, id: u8) -> Result<ActionRule, ActionError> {
        let index = self.index_of(id).ok_or(ActionError::NotFound { id })?;
        let rule = self.slots[index].take().ok_or(ActionError::NotFound { id })?;
        info!("Removed rule {}", id);
        Ok(rule)
    }

    /// Enable or disable a rule
    pub fn set_enabled(&mut self, id: u8, enabled: bool) -> Result<(), ActionError> {
        let rule = self.get_mut(id).ok_or(ActionError::NotFound { id })?;
        rule.enabled = enabled;
        info!("Rule {} enabled: {}", id, enabled);
        Ok(())
    }

    /// Get a rule by id
    pub fn get(&self, id: u8) -> Option<&ActionRule> {
        self.index_of(id).and_then(|i| self.slots[i].as_ref())
    }

    /// Get a mutable rule by id
    pub fn get_mut(&mut self, id: u8) -> Option<&mut ActionRule> {
        self.index_of(id).and_then(move |i| self.slots[i].as_mut())
    }

    /// Iterate stored rules in slot order
    pub fn iter(&self) -> impl Iterator<Item = &ActionRule> + Clone + '_ {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Iterate stored rules mutably in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ActionRule> + '_ {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }

    /// Call `f` on every stored rule in slot order
    pub fn for_each(&self, mut f: impl FnMut(&ActionRule)) {
        for rule in self.iter() {
            f(rule);
        }
    }

    /// Remove all rules and restart id assignment at 1
    pub fn clear(&mut self) {
        self.slots = [None; N];
        self.next_id = 1;
        info!("Cleared all rules");
    }

    /// Replace the table contents with previously stored rules
    ///
    /// Rules keep their ids, and periodic bookkeeping restarts from zero. Rules with id 0, with
    /// an id already restored, or beyond capacity are skipped. The id counter restarts after the
    /// highest restored id. Returns the number of rules restored.
    pub fn restore(&mut self, rules: impl IntoIterator<Item = ActionRule>) -> usize {
        self.slots = [None; N];
        let mut count = 0;
        let mut highest = 0;
        for mut rule in rules {
            if rule.id == 0 || self.index_of(rule.id).is_some() {
                continue;
            }
            let Some(index) = self.free_slot() else {
                break;
            };
            rule.last_execute_ms = 0;
            rule.execute_count = 0;
            highest = highest.max(rule.id);
            self.slots[index] = Some(rule);
            count += 1;
        }
        self.next_id = Self::advance(highest);
        info!("Restored {} rules, next id {}", count, self.next_id);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangate_common::actions::{Action, ActionKind};

    fn toggle(id: u8) -> ActionRule {
        ActionRule::new(id, 0x100, 0x7FF, Action::GpioToggle { pin: 13 })
    }

    #[test]
    fn test_add_assigns_ids() {
        let mut store = RuleStore::<4>::new(4);
        let platform = PlatformProfile::SAMD51;
        assert_eq!(Ok(1), store.add(toggle(0), &platform));
        assert_eq!(Ok(2), store.add(toggle(0), &platform));
        assert_eq!(2, store.count());

        assert!(store.remove(1).is_ok());
        assert_eq!(1, store.count());
        // Ids are not reused until the counter wraps
        assert_eq!(Ok(3), store.add(toggle(0), &platform));
        assert_eq!(Some(3), store.get(3).map(|r| r.id));
        assert_eq!(Err(ActionError::NotFound { id: 1 }), store.remove(1));
    }

    #[test]
    fn test_full_and_unsupported() {
        let mut store = RuleStore::<8>::new(2);
        let platform = PlatformProfile::RP2040;
        store.add(toggle(0), &platform).unwrap();
        store.add(toggle(0), &platform).unwrap();
        assert_eq!(Err(ActionError::Full), store.add(toggle(0), &platform));

        let neo = ActionRule::new(0, 0x100, 0x7FF, Action::NeopixelOff);
        assert_eq!(
            Err(ActionError::PlatformUnsupported {
                kind: ActionKind::NeopixelOff
            }),
            store.add(neo, &platform)
        );
    }

    #[test]
    fn test_duplicate_id_replaces_slot() {
        let mut store = RuleStore::<4>::new(4);
        let platform = PlatformProfile::SAMD51;
        store.add(toggle(7), &platform).unwrap();
        store.add(toggle(8), &platform).unwrap();
        let replacement = ActionRule::new(7, 0x200, 0x7FF, Action::GpioSet { pin: 2 });
        assert_eq!(Ok(7), store.add(replacement, &platform));
        assert_eq!(2, store.count());
        assert_eq!(0x200, store.get(7).unwrap().can_id);
        // Slot order is preserved
        assert_eq!(vec![7, 8], store.iter().map(|r| r.id).collect::<Vec<_>>());
    }

    #[test]
    fn test_id_wraps_and_skips_in_use() {
        let mut store = RuleStore::<4>::new(4);
        let platform = PlatformProfile::SAMD51;
        store.add(toggle(1), &platform).unwrap();
        store.restore([toggle(1), toggle(254)]);
        assert_eq!(255, store.next_id());
        assert_eq!(Ok(255), store.add(toggle(0), &platform));
        // Wraps to 1, which is in use
        assert_eq!(Ok(2), store.add(toggle(0), &platform));
    }

    #[test]
    fn test_capacity_limited_to_id_space() {
        let mut store = RuleStore::<300>::new(300);
        assert_eq!(MAX_RULES, store.capacity());
        let platform = PlatformProfile::SAMD51;
        for id in 1..=u8::MAX {
            assert_eq!(Ok(id), store.add(toggle(id), &platform));
        }
        assert!(store.is_full());
        assert_eq!(Err(ActionError::Full), store.add(toggle(0), &platform));
    }

    #[test]
    fn test_enable_and_clear() {
        let mut store = RuleStore::<4>::default();
        let platform = PlatformProfile::SAMD51;
        let id = store.add(toggle(0), &platform).unwrap();
        store.set_enabled(id, false).unwrap();
        assert!(!store.get(id).unwrap().enabled);
        assert_eq!(
            Err(ActionError::NotFound { id: 99 }),
            store.set_enabled(99, true)
        );
        store.clear();
        assert_eq!(0, store.count());
        assert_eq!(Ok(1), store.add(toggle(0), &platform));
    }

    #[test]
    fn test_restore_skips_bad_rules() {
        let mut store = RuleStore::<2>::new(2);
        let mut periodic = toggle(4);
        periodic.execute_count = 10;
        let n = store.restore([toggle(0), periodic, toggle(4), toggle(5), toggle(6)]);
        assert_eq!(2, n);
        assert_eq!(0, store.get(4).unwrap().execute_count);
        assert_eq!(6, store.next_id());
    }
}
