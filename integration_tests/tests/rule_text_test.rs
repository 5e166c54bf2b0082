use assertables::assert_contains;
use cangate_common::{
    error::{ActionError, PinMode},
    format_rule,
    gateway_config::GatewayConfig,
    messages::{CanId, CanMessage},
    parse_rule,
    platform::PlatformProfile,
};
use cangate_node::Gateway;
use integration_tests::sim_hardware::SimHardware;

#[test]
fn test_listed_rules_parse_back() {
    let platform = PlatformProfile::SAMD51;
    let mut gateway: Gateway<SimHardware, 16> = Gateway::new(SimHardware::new(&platform), platform);
    for text in [
        "0:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13",
        "0:0x18FF0000:0x1FFF0000:01,02:FF,0F:2:PWM_CONFIGURE:fixed:6:1000:50:8",
        "0:0x300:0x7FF:::0:NEOPIXEL:candata",
        "0:0x301::::0:I2C_WRITE:fixed:20:21:0x40:0x01:0x80",
        "0:0x302:0x7FF:::0:BUFFER_SEND:fixed:0x555:4:1",
    ] {
        gateway.parse_and_add_rule(text).unwrap();
    }

    let listed: Vec<String> = gateway.list_rules().map(|s| s.as_str().to_owned()).collect();
    assert_eq!(5, listed.len());
    assert_eq!("1:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13", listed[0]);
    for (text, rule) in listed.iter().zip(gateway.rules().iter()) {
        assert_eq!(*rule, parse_rule(text).unwrap());
        assert_eq!(text.as_str(), format_rule(rule).as_str());
    }
}

#[test]
fn test_malformed_rules_rejected() {
    let platform = PlatformProfile::ESP32;
    let mut gateway: Gateway<SimHardware, 16> = Gateway::new(SimHardware::new(&platform), platform);
    let err = gateway.parse_and_add_rule("0:0x100:0x7FF").unwrap_err();
    assert_eq!(
        ActionError::InvalidParam {
            reason: "too few fields"
        },
        err
    );
    assert_contains!(err.to_string(), "too few fields");

    let err = gateway
        .parse_and_add_rule("0:0x100:0x7FF:::0:GPIO_SET:maybe:3")
        .unwrap_err();
    assert_contains!(err.to_string(), "unknown parameter source");
    assert_eq!(0, gateway.rule_count());
}

#[test]
fn test_gateway_from_config() {
    const TOML: &str = r#"
        platform = "rp2040"
        max_rules = 4
        reserved_pins = [9]
        default_rules = [
            "0:0x100:0x7FF:::0:GPIO_SET:fixed:9",
            "0:0x101:0x7FF:::0:GPIO_SET:fixed:10",
        ]
    "#;
    let config = GatewayConfig::load_from_str(TOML).unwrap();
    let mut gateway: Gateway<SimHardware, 16> =
        Gateway::from_config(SimHardware::new(&config.platform), &config);
    assert_eq!(4, gateway.rules().capacity());
    assert_eq!(Some(PinMode::Reserved), gateway.pin_mode(9));
    // Platform reserved pins are kept
    assert_eq!(Some(PinMode::Reserved), gateway.pin_mode(4));

    assert_eq!(2, gateway.load_defaults(&config.default_rules));

    let mut results = Vec::new();
    for id in [0x100, 0x101] {
        gateway.on_frame(&CanMessage::new(CanId::std(id), &[]), 0, |r| {
            results.push(r.result)
        });
    }
    assert!(results[0].is_err());
    assert!(results[1].is_ok());
    assert_eq!(vec![(cangate_common::traits::GpioOp::Set, 10)], gateway.hardware().gpio_calls());
}
