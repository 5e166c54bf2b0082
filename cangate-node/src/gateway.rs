//! Gateway object tying the rule table to the dispatcher
use cangate_common::{
    actions::ActionKind,
    error::{ActionError, PinMode},
    messages::CanMessage,
    params::ActionDefinition,
    platform::PlatformProfile,
    rule::{parse_rule, ActionRule, MAX_RULE_TEXT_LEN},
    traits::{FrameSource, Hardware},
};
use defmt_or_log::{debug, info, warn};

use crate::data_buffer::ActionDataBuffer;
use crate::dispatcher::{ActionDispatcher, ActionOutcome};
use crate::matcher;
use crate::rule_store::RuleStore;
use crate::scheduler;
use crate::storage::RuleStorage;

/// The result of one rule execution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionReport {
    /// The rule which ran
    pub rule_id: u8,
    /// Its action kind
    pub kind: ActionKind,
    /// Raw identifier of the triggering frame, or `None` when run by the scheduler
    pub frame_id: Option<u32>,
    /// What happened
    pub result: Result<ActionOutcome, ActionError>,
}

impl ActionReport {
    /// Returns true if the action succeeded
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A CAN automation gateway
///
/// Holds up to `N` rules; the platform's `max_rules` may lower that further. All processing is
/// done in the caller's context by [`on_frame`](Self::on_frame), [`tick`](Self::tick) or
/// [`process`](Self::process), and must not be interleaved with rule mutations from another
/// context.
#[allow(missing_debug_implementations)]
pub struct Gateway<'a, H: Hardware, const N: usize> {
    platform: PlatformProfile,
    store: RuleStore<N>,
    dispatcher: ActionDispatcher<H>,
    storage: Option<&'a mut dyn RuleStorage>,
    mbox: Option<&'a dyn FrameSource>,
}

impl<'a, H: Hardware, const N: usize> Gateway<'a, H, N> {
    /// Create a gateway with an empty rule table
    pub fn new(hardware: H, platform: PlatformProfile) -> Self {
        let dispatcher = ActionDispatcher::new(hardware, &platform);
        let store = RuleStore::new(platform.max_rules as usize);
        info!(
            "Gateway on {} ({}), {} rule slots",
            platform.board_name,
            platform.chip,
            store.capacity()
        );
        Self {
            platform,
            store,
            dispatcher,
            storage: None,
            mbox: None,
        }
    }

    /// Create a gateway from a loaded config file
    ///
    /// Pins listed in the config are reserved in addition to the platform's. Default rules are
    /// not installed; pass them to [`load_defaults`](Self::load_defaults) once stored rules have
    /// been loaded.
    #[cfg(feature = "std")]
    pub fn from_config(hardware: H, config: &cangate_common::gateway_config::GatewayConfig) -> Self {
        let mut gateway = Self::new(hardware, config.platform);
        gateway.reserve_pins(&config.reserved_pins);
        gateway
    }

    /// Attach persistent storage, used by every rule mutation
    pub fn with_storage(mut self, storage: &'a mut dyn RuleStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Attach the mailbox drained by [`process`](Self::process)
    pub fn with_mbox(mut self, mbox: &'a dyn FrameSource) -> Self {
        self.mbox = Some(mbox);
        self
    }

    /// Mark additional pins as owned by board hardware
    pub fn reserve_pins(&mut self, pins: &[u8]) {
        for pin in pins {
            self.dispatcher.pins_mut().reserve(*pin);
        }
    }

    /// Replace the rule table with the rules held in storage
    ///
    /// Stored rules whose kind this platform does not support are dropped before the table
    /// capacity is applied. Returns the number of rules loaded; 0 when no storage is attached.
    pub fn load_rules(&mut self) -> usize {
        let Some(storage) = self.storage.as_deref_mut() else {
            return 0;
        };
        let platform = &self.platform;
        let mut loaded: heapless::Vec<ActionRule, N> = heapless::Vec::new();
        storage.load(usize::MAX, &mut |rule| {
            if !platform.supports(rule.kind()) {
                warn!("Dropping stored rule {}: unsupported action", rule.id);
                return;
            }
            if loaded.push(rule).is_err() {
                warn!("Dropping stored rule {}: table full", rule.id);
            }
        });
        self.store.restore(loaded)
    }

    /// Install `rules` if the rule table is empty
    ///
    /// Rules which cannot be added are skipped with a warning. Returns the number installed.
    pub fn load_defaults(&mut self, rules: &[ActionRule]) -> usize {
        if self.store.count() != 0 {
            return 0;
        }
        let mut count = 0;
        for rule in rules {
            match self.store.add(*rule, &self.platform) {
                Ok(_) => count += 1,
                Err(_) => warn!("Skipping default rule for {}", rule.kind().name()),
            }
        }
        if count > 0 {
            self.save();
        }
        count
    }

    /// Write the rule table to storage
    ///
    /// Returns false if storage is attached and the save failed.
    pub fn save(&mut self) -> bool {
        let Some(storage) = self.storage.as_deref_mut() else {
            return true;
        };
        let rules: heapless::Vec<ActionRule, N> = self.store.iter().copied().collect();
        let ok = storage.save(&rules);
        if !ok {
            warn!("Failed to save {} rules", rules.len());
        }
        ok
    }

    /// Run every enabled rule matching `frame`, in slot order
    ///
    /// A failing rule does not stop later rules from running. Each execution is reported to
    /// `report`. Returns the number of rules which matched.
    pub fn on_frame(
        &mut self,
        frame: &CanMessage,
        now_ms: u32,
        mut report: impl FnMut(ActionReport),
    ) -> usize {
        let frame_id = frame.id().raw();
        let mut count = 0;
        for rule in self.store.iter_mut() {
            if !matcher::triggers(frame, rule) {
                continue;
            }
            count += 1;
            let result = self.dispatcher.execute(rule, Some(frame), now_ms);
            match result {
                Ok(_) => debug!("Rule {} ran {}", rule.id, rule.kind().name()),
                Err(_) => warn!("Rule {} failed {}", rule.id, rule.kind().name()),
            }
            report(ActionReport {
                rule_id: rule.id,
                kind: rule.kind(),
                frame_id: Some(frame_id),
                result,
            });
        }
        count
    }

    /// Run periodic rules which are due
    ///
    /// Returns the number of successful sends.
    pub fn tick(&mut self, now_ms: u32, mut report: impl FnMut(ActionReport)) -> usize {
        scheduler::tick(&mut self.store, &mut self.dispatcher, now_ms, |rule, result| {
            report(ActionReport {
                rule_id: rule.id,
                kind: rule.kind(),
                frame_id: None,
                result,
            })
        })
    }

    /// Drain the attached mailbox through [`on_frame`](Self::on_frame), then [`tick`](Self::tick)
    ///
    /// Returns the number of frames taken from the mailbox.
    pub fn process(&mut self, now_ms: u32, mut report: impl FnMut(ActionReport)) -> usize {
        let mut frames = 0;
        if let Some(mbox) = self.mbox {
            while let Some(frame) = mbox.take_frame() {
                self.on_frame(&frame, now_ms, &mut report);
                frames += 1;
            }
        }
        self.tick(now_ms, &mut report);
        frames
    }

    /// Add a rule, returning its id, and save the table
    pub fn add_rule(&mut self, rule: ActionRule) -> Result<u8, ActionError> {
        let id = self.store.add(rule, &self.platform)?;
        self.save();
        Ok(id)
    }

    /// Parse a rule from its text form and add it
    pub fn parse_and_add_rule(&mut self, text: &str) -> Result<u8, ActionError> {
        let rule = parse_rule(text)?;
        self.add_rule(rule)
    }

    /// Remove a rule and save the table
    pub fn remove_rule(&mut self, id: u8) -> Result<(), ActionError> {
        self.store.remove(id)?;
        self.save();
        Ok(())
    }

    /// Enable or disable a rule and save the table
    pub fn set_rule_enabled(&mut self, id: u8, enabled: bool) -> Result<(), ActionError> {
        self.store.set_enabled(id, enabled)?;
        self.save();
        Ok(())
    }

    /// Remove every rule and save the empty table
    pub fn clear_rules(&mut self) {
        self.store.clear();
        self.save();
    }

    /// Get a rule by id
    pub fn rule(&self, id: u8) -> Option<&ActionRule> {
        self.store.get(id)
    }

    /// Number of rules stored
    pub fn rule_count(&self) -> usize {
        self.store.count()
    }

    /// The rule table
    pub fn rules(&self) -> &RuleStore<N> {
        &self.store
    }

    /// Render every rule in its text form, in slot order
    pub fn list_rules(&self) -> impl Iterator<Item = heapless::String<MAX_RULE_TEXT_LEN>> + '_ {
        self.store.iter().map(|r| r.to_text())
    }

    /// The platform profile in use
    pub fn platform(&self) -> &PlatformProfile {
        &self.platform
    }

    /// Action kinds rules may use on this platform
    pub fn supported_actions(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.platform.supported_actions()
    }

    /// Action definitions declared by the hardware
    pub fn definitions(&self) -> &'static [ActionDefinition] {
        self.dispatcher.hardware().definitions()
    }

    /// The hardware's definition for `kind`
    pub fn definition(&self, kind: ActionKind) -> Option<&'static ActionDefinition> {
        self.dispatcher.hardware().definition(kind)
    }

    /// The current owner of `pin`
    pub fn pin_mode(&self, pin: u8) -> Option<PinMode> {
        self.dispatcher.pins().mode(pin)
    }

    /// The data buffer filled by buffered read actions
    pub fn buffer(&self) -> &ActionDataBuffer {
        self.dispatcher.buffer()
    }

    /// Invalidate the data buffer
    pub fn clear_buffer(&mut self) {
        self.dispatcher.buffer_mut().clear();
    }

    /// Access the hardware
    pub fn hardware(&self) -> &H {
        self.dispatcher.hardware()
    }

    /// Mutably access the hardware
    pub fn hardware_mut(&mut self) -> &mut H {
        self.dispatcher.hardware_mut()
    }
}
