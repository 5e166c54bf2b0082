//! Frame to rule matching
use cangate_common::{messages::CanMessage, rule::ActionRule};

/// Returns true if `frame` satisfies the rule's identifier and payload patterns
///
/// The enabled flag is not considered here. Identifier bits outside `can_id_mask` are ignored, so
/// a zero mask matches every frame. When `data_length` is nonzero the frame must carry at least
/// that many bytes, each equal to the rule's under `data_mask`.
pub fn matches(frame: &CanMessage, rule: &ActionRule) -> bool {
    let mask = rule.can_id_mask;
    if frame.id().raw() & mask != rule.can_id & mask {
        return false;
    }

    let len = rule.data_length as usize;
    if len == 0 {
        return true;
    }
    let data = frame.data();
    if data.len() < len || len > rule.data.len() {
        return false;
    }
    data[..len]
        .iter()
        .zip(rule.data.iter().zip(rule.data_mask.iter()))
        .all(|(d, (want, m))| d & m == want & m)
}

/// Returns true if the rule is enabled and matches `frame`
pub fn triggers(frame: &CanMessage, rule: &ActionRule) -> bool {
    rule.enabled && matches(frame, rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangate_common::{actions::Action, messages::CanId};

    fn rule(can_id: u32, mask: u32) -> ActionRule {
        ActionRule::new(1, can_id, mask, Action::GpioToggle { pin: 13 })
    }

    #[test]
    fn test_id_mask() {
        let r = rule(0x100, 0x7FF);
        assert!(matches(&CanMessage::new(CanId::std(0x100), &[]), &r));
        assert!(!matches(&CanMessage::new(CanId::std(0x101), &[]), &r));

        let r = rule(0x100, 0x700);
        assert!(matches(&CanMessage::new(CanId::std(0x1FF), &[]), &r));
        assert!(!matches(&CanMessage::new(CanId::std(0x200), &[]), &r));
    }

    #[test]
    fn test_zero_mask_matches_everything() {
        let r = rule(0x123, 0);
        for id in [0, 0x7FF, 0x1234_5678] {
            let frame = CanMessage::new(CanId::from_raw(id), &[1, 2, 3]);
            assert!(matches(&frame, &r));
        }
    }

    #[test]
    fn test_data_pattern() {
        let r = rule(0x100, 0x7FF).with_data(&[0x01, 0xF0], &[0xFF, 0xF0]);
        let id = CanId::std(0x100);
        assert!(matches(&CanMessage::new(id, &[0x01, 0xF7, 0x99]), &r));
        assert!(!matches(&CanMessage::new(id, &[0x02, 0xF7]), &r));
        assert!(!matches(&CanMessage::new(id, &[0x01, 0x07]), &r));
        // Too short
        assert!(!matches(&CanMessage::new(id, &[0x01]), &r));
    }

    #[test]
    fn test_no_data_length_ignores_payload() {
        let mut r = rule(0x100, 0x7FF);
        r.data = [0xAA; 8];
        r.data_mask = [0xFF; 8];
        assert!(matches(&CanMessage::new(CanId::std(0x100), &[]), &r));
        assert!(matches(&CanMessage::new(CanId::std(0x100), &[1]), &r));
    }

    #[test]
    fn test_disabled_rule_does_not_trigger() {
        let mut r = rule(0x100, 0x7FF);
        let frame = CanMessage::new(CanId::std(0x100), &[]);
        assert!(triggers(&frame, &r));
        r.enabled = false;
        assert!(matches(&frame, &r));
        assert!(!triggers(&frame, &r));
    }
}
