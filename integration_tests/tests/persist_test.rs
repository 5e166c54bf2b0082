use cangate_common::{
    actions::{Action, CanPayload},
    messages::{CanId, CanMessage},
    platform::PlatformProfile,
    rule::ActionRule,
};
use cangate_node::{storage::ImageStorage, Gateway};
use integration_tests::{mem_storage::MemBackend, sim_hardware::SimHardware};

type TestGateway<'a> = Gateway<'a, SimHardware, 32>;

fn new_gateway<'a>(platform: PlatformProfile) -> TestGateway<'a> {
    Gateway::new(SimHardware::new(&platform), platform)
}

#[test]
fn test_rules_survive_restart() {
    let platform = PlatformProfile::SAMD51;
    let mut storage = ImageStorage::new(MemBackend::default());

    let listed: Vec<String> = {
        let mut gateway = new_gateway(platform).with_storage(&mut storage);
        gateway
            .parse_and_add_rule("0:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13")
            .unwrap();
        gateway
            .parse_and_add_rule("0:0x200:0x7FF:01:FF:1:CAN_SEND_PERIODIC:fixed:0x300:DE,AD:250")
            .unwrap();
        let id = gateway
            .parse_and_add_rule("0:0x201:0x7FF:::0:NEOPIXEL:candata")
            .unwrap();
        gateway.set_rule_enabled(id, false).unwrap();
        gateway.list_rules().map(|s| s.as_str().to_owned()).collect()
    };
    // One save per mutation
    assert_eq!(4, storage.backend().writes);

    let mut gateway = new_gateway(platform).with_storage(&mut storage);
    assert_eq!(3, gateway.load_rules());
    let reloaded: Vec<String> = gateway.list_rules().map(|s| s.as_str().to_owned()).collect();
    assert_eq!(listed, reloaded);
    assert!(!gateway.rule(3).unwrap().enabled);

    gateway.on_frame(&CanMessage::new(CanId::std(0x100), &[]), 0, |_| ());
    assert_eq!(1, gateway.hardware().gpio_calls().len());

    // Ids continue after the highest loaded id
    let id = gateway
        .add_rule(ActionRule::new(0, 0x400, 0x7FF, Action::GpioSet { pin: 1 }))
        .unwrap();
    assert_eq!(4, id);
}

#[test]
fn test_corrupt_image_loads_nothing() {
    let platform = PlatformProfile::SAMD51;
    let mut storage = ImageStorage::new(MemBackend::default());
    {
        let mut gateway = new_gateway(platform).with_storage(&mut storage);
        gateway
            .add_rule(ActionRule::new(0, 0x100, 0x7FF, Action::GpioSet { pin: 1 }))
            .unwrap();
    }
    let image = storage.backend_mut().image.as_mut().unwrap();
    let mid = image.len() / 2;
    image[mid] ^= 0x55;

    let mut gateway = new_gateway(platform).with_storage(&mut storage);
    assert_eq!(0, gateway.load_rules());
    assert_eq!(0, gateway.rule_count());
}

#[test]
fn test_load_without_image() {
    let mut storage = ImageStorage::new(MemBackend::default());
    let mut gateway = new_gateway(PlatformProfile::ESP32).with_storage(&mut storage);
    assert_eq!(0, gateway.load_rules());
}

#[test]
fn test_unsupported_rules_dropped_on_load() {
    let mut storage = ImageStorage::new(MemBackend::default());
    {
        let mut gateway = new_gateway(PlatformProfile::SAMD51).with_storage(&mut storage);
        gateway
            .parse_and_add_rule("0:0x100:0x7FF:::0:NEOPIXEL_OFF:fixed")
            .unwrap();
        gateway
            .parse_and_add_rule("0:0x100:0x7FF:::0:GPIO_SET:fixed:2")
            .unwrap();
    }
    // RP2040 has no neopixel
    let mut gateway = new_gateway(PlatformProfile::RP2040).with_storage(&mut storage);
    assert_eq!(1, gateway.load_rules());
    assert!(gateway.rule(1).is_none());
    assert!(gateway.rule(2).is_some());
}

#[test]
fn test_capacity_applies_after_unsupported_rules_dropped() {
    let mut storage = ImageStorage::new(MemBackend::default());
    let capacity = PlatformProfile::RP2040.max_rules;
    {
        let mut gateway = new_gateway(PlatformProfile::SAMD51).with_storage(&mut storage);
        for _ in 0..capacity {
            gateway
                .parse_and_add_rule("0:0x100:0x7FF:::0:NEOPIXEL_OFF:fixed")
                .unwrap();
        }
        gateway
            .parse_and_add_rule("0:0x101:0x7FF:::0:GPIO_SET:fixed:2")
            .unwrap();
    }
    // The neopixel rules fill a whole RP2040 table but are all dropped
    let mut gateway = new_gateway(PlatformProfile::RP2040).with_storage(&mut storage);
    assert_eq!(1, gateway.load_rules());
    let id = capacity + 1;
    assert_eq!(Action::GpioSet { pin: 2 }, gateway.rule(id).unwrap().action);

    gateway.on_frame(&CanMessage::new(CanId::std(0x101), &[]), 0, |_| ());
    assert_eq!(1, gateway.hardware().gpio_calls().len());
}

#[test]
fn test_defaults_only_for_empty_table() {
    let platform = PlatformProfile::SAMD51;
    let defaults = [
        ActionRule::new(0, 0x100, 0x7FF, Action::GpioToggle { pin: 13 }),
        ActionRule::new(
            0,
            0x200,
            0x7FF,
            Action::CanSend(CanPayload::new(0x201, &[1])),
        ),
    ];
    let mut storage = ImageStorage::new(MemBackend::default());
    {
        let mut gateway = new_gateway(platform).with_storage(&mut storage);
        assert_eq!(0, gateway.load_rules());
        assert_eq!(2, gateway.load_defaults(&defaults));
        assert_eq!(2, gateway.rule_count());
        // A second call does nothing
        assert_eq!(0, gateway.load_defaults(&defaults));
        gateway.remove_rule(1).unwrap();
    }
    assert_eq!(2, storage.backend().writes);

    let mut gateway = new_gateway(platform).with_storage(&mut storage);
    assert_eq!(1, gateway.load_rules());
    assert_eq!(0, gateway.load_defaults(&defaults));
    assert_eq!(1, gateway.rule_count());
}

#[test]
fn test_failed_save_keeps_mutation() {
    let mut storage = ImageStorage::new(MemBackend {
        fail_writes: true,
        ..Default::default()
    });
    let mut gateway = new_gateway(PlatformProfile::SAMD51).with_storage(&mut storage);
    let id = gateway
        .add_rule(ActionRule::new(0, 0x100, 0x7FF, Action::GpioSet { pin: 1 }))
        .unwrap();
    assert!(gateway.rule(id).is_some());
    assert!(!gateway.save());
    drop(gateway);
    assert!(storage.backend().image.is_none());
}
