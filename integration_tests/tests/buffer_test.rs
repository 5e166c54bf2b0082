use cangate_common::{
    error::ActionError,
    messages::{CanId, CanMessage},
    platform::PlatformProfile,
};
use cangate_node::{ActionOutcome, ActionReport, Gateway};
use integration_tests::sim_hardware::{HwCall, SimHardware};

fn gateway<'a>() -> Gateway<'a, SimHardware, 32> {
    let platform = PlatformProfile::SAMD51;
    let mut hw = SimHardware::new(&platform);
    hw.adc_values.insert(2, 0x0ABC);
    hw.levels.insert(3, true);
    hw.i2c_regs.insert((0x40, 0x10), 0x11);
    hw.i2c_regs.insert((0x40, 0x11), 0x22);
    Gateway::new(hw, platform)
}

fn trigger(gateway: &mut Gateway<'_, SimHardware, 32>, id: u16) -> Vec<ActionReport> {
    trigger_with(gateway, id, &[])
}

fn trigger_with(
    gateway: &mut Gateway<'_, SimHardware, 32>,
    id: u16,
    data: &[u8],
) -> Vec<ActionReport> {
    let mut reports = Vec::new();
    gateway.on_frame(&CanMessage::new(CanId::std(id), data), 0, |r| reports.push(r));
    reports
}

#[test]
fn test_collect_and_send() {
    let mut gateway = gateway();
    for text in [
        "0:0x100:0x7FF:::0:I2C_READ_BUFFER:fixed:20:21:0x40:0x10:2:0",
        "0:0x100:0x7FF:::0:ADC_READ_BUFFER:fixed:2:2",
        "0:0x100:0x7FF:::0:GPIO_READ_BUFFER:fixed:3:4",
        "0:0x101:0x7FF:::0:BUFFER_SEND:fixed:0x500:8:1",
    ] {
        gateway.parse_and_add_rule(text).unwrap();
    }

    let reports = trigger(&mut gateway, 0x100);
    assert!(reports.iter().all(|r| r.is_ok()));
    assert_eq!(5, gateway.buffer().used_length());
    assert_eq!(Some(0xBC), gateway.buffer().read_byte(2));

    let reports = trigger(&mut gateway, 0x101);
    assert_eq!(Ok(ActionOutcome::BufferSent { length: 5 }), reports[0].result);
    let sent = gateway.hardware().sent_frames();
    assert_eq!(1, sent.len());
    assert_eq!(CanId::std(0x500), sent[0].id());
    assert_eq!(&[0x11, 0x22, 0xBC, 0x0A, 1], sent[0].data());

    // clear_after emptied the buffer
    assert_eq!(0, gateway.buffer().used_length());
}

#[test]
fn test_send_truncates_to_requested_length() {
    let mut gateway = gateway();
    gateway
        .parse_and_add_rule("0:0x100:0x7FF:::0:ADC_READ_BUFFER:fixed:2:0")
        .unwrap();
    gateway
        .parse_and_add_rule("0:0x101:0x7FF:::0:BUFFER_SEND:fixed:0x501:1:0")
        .unwrap();
    trigger(&mut gateway, 0x100);
    let reports = trigger(&mut gateway, 0x101);
    assert_eq!(Ok(ActionOutcome::BufferSent { length: 1 }), reports[0].result);
    assert_eq!(&[0xBC], gateway.hardware().sent_frames()[0].data());
    // Not cleared
    assert_eq!(2, gateway.buffer().used_length());

    gateway.clear_buffer();
    assert_eq!(0, gateway.buffer().used_length());
}

#[test]
fn test_empty_buffer_sends_empty_frame() {
    let mut gateway = gateway();
    gateway
        .parse_and_add_rule("0:0x101:0x7FF:::0:BUFFER_SEND:fixed:0x502:8:0")
        .unwrap();
    let reports = trigger(&mut gateway, 0x101);
    assert_eq!(Ok(ActionOutcome::BufferSent { length: 0 }), reports[0].result);
    assert!(gateway.hardware().sent_frames()[0].data().is_empty());
}

#[test]
fn test_overflow_is_rejected_before_reading() {
    let mut gateway = gateway();
    gateway
        .parse_and_add_rule("0:0x100:0x7FF:::0:ADC_READ_BUFFER:fixed:2:7")
        .unwrap();
    gateway
        .parse_and_add_rule("0:0x100:0x7FF:::0:I2C_READ_BUFFER:fixed:20:21:0x40:0x10:4:6")
        .unwrap();
    let reports = trigger(&mut gateway, 0x100);
    assert_eq!(
        Err(ActionError::BufferOverflow { slot: 7, length: 2 }),
        reports[0].result
    );
    assert_eq!(
        Err(ActionError::BufferOverflow { slot: 6, length: 4 }),
        reports[1].result
    );
    assert!(gateway.hardware().calls.is_empty());
    assert_eq!(0, gateway.buffer().used_length());
}

#[test]
fn test_buffer_clear_rule() {
    let mut gateway = gateway();
    gateway
        .parse_and_add_rule("0:0x100:0x7FF:::0:GPIO_READ_BUFFER:fixed:3:0")
        .unwrap();
    gateway
        .parse_and_add_rule("0:0x102:0x7FF:::0:BUFFER_CLEAR:fixed")
        .unwrap();
    trigger(&mut gateway, 0x100);
    assert!(gateway.buffer().is_slot_used(0));
    trigger(&mut gateway, 0x102);
    assert!(!gateway.buffer().is_slot_used(0));
}

#[test]
fn test_frame_parameters_fill_and_send() {
    let mut gateway = gateway();
    for text in [
        "0:0x200:0x7FF:::0:I2C_READ_BUFFER:candata",
        "0:0x201:0x7FF:::0:GPIO_READ_BUFFER:candata",
        "0:0x202:0x7FF:::0:BUFFER_SEND:candata",
    ] {
        gateway.parse_and_add_rule(text).unwrap();
    }

    // The address byte keeps only its low 7 bits
    let reports = trigger_with(&mut gateway, 0x200, &[20, 21, 0xC0, 0x10, 2, 0]);
    assert_eq!(Ok(ActionOutcome::Completed), reports[0].result);
    let reports = trigger_with(&mut gateway, 0x201, &[3, 2]);
    assert_eq!(Ok(ActionOutcome::Completed), reports[0].result);
    assert_eq!(
        vec![
            HwCall::I2cRead {
                addr: 0x40,
                reg: 0x10,
                count: 2
            },
            HwCall::GpioRead(3),
        ],
        gateway.hardware().calls
    );
    assert_eq!(Some(0x11), gateway.buffer().read_byte(0));
    assert_eq!(Some(0x22), gateway.buffer().read_byte(1));
    assert_eq!(Some(1), gateway.buffer().read_byte(2));

    // u32 id, length at byte 4, clear flag in bit 0 of byte 5
    let reports = trigger_with(&mut gateway, 0x202, &[0x00, 0x05, 0, 0, 8, 0x02]);
    assert_eq!(Ok(ActionOutcome::BufferSent { length: 3 }), reports[0].result);
    assert_eq!(3, gateway.buffer().used_length());

    let reports = trigger_with(&mut gateway, 0x202, &[0x01, 0x05, 0, 0, 2, 0x03]);
    assert_eq!(Ok(ActionOutcome::BufferSent { length: 2 }), reports[0].result);
    assert_eq!(0, gateway.buffer().used_length());

    let sent = gateway.hardware().sent_frames();
    assert_eq!(CanId::std(0x500), sent[0].id());
    assert_eq!(&[0x11, 0x22, 1], sent[0].data());
    assert_eq!(CanId::std(0x501), sent[1].id());
    assert_eq!(&[0x11, 0x22], sent[1].data());
}

#[test]
fn test_esp32_adc_from_frame() {
    let platform = PlatformProfile::ESP32;
    let mut hw = SimHardware::new(&platform);
    hw.adc_values.insert(34, 0x0123);
    let mut gateway: Gateway<SimHardware, 32> = Gateway::new(hw, platform);
    gateway
        .parse_and_add_rule("0:0x300:0x7FF:::0:ADC_READ_BUFFER:candata")
        .unwrap();

    let reports = trigger_with(&mut gateway, 0x300, &[34, 2]);
    assert_eq!(Ok(ActionOutcome::Completed), reports[0].result);
    assert_eq!(vec![HwCall::AdcRead(34)], gateway.hardware().calls);
    assert_eq!(Some(0x23), gateway.buffer().read_byte(2));
    assert_eq!(Some(0x01), gateway.buffer().read_byte(3));

    // Slot clamps to the last position with room for two bytes
    trigger_with(&mut gateway, 0x300, &[34, 9]);
    assert_eq!(Some(0x23), gateway.buffer().read_byte(6));
    assert_eq!(Some(0x01), gateway.buffer().read_byte(7));
}

#[test]
fn test_rp2040_buffer_from_frame() {
    let platform = PlatformProfile::RP2040;
    let mut hw = SimHardware::new(&platform);
    hw.adc_values.insert(26, 0x0FFF);
    let mut gateway: Gateway<SimHardware, 32> = Gateway::new(hw, platform);
    for text in [
        "0:0x100:0x7FF:::0:ADC_READ_BUFFER:candata",
        "0:0x101:0x7FF:::0:GPIO_READ_BUFFER:candata",
        "0:0x102:0x7FF:::0:BUFFER_SEND:candata",
    ] {
        gateway.parse_and_add_rule(text).unwrap();
    }

    trigger_with(&mut gateway, 0x100, &[26, 0]);
    trigger_with(&mut gateway, 0x101, &[2, 2]);
    let reports = trigger_with(&mut gateway, 0x102, &[0x10, 0x03, 0, 0, 3, 1]);
    assert_eq!(Ok(ActionOutcome::BufferSent { length: 3 }), reports[0].result);

    let sent = gateway.hardware().sent_frames();
    assert_eq!(CanId::std(0x310), sent[0].id());
    assert_eq!(&[0xFF, 0x0F, 0], sent[0].data());
    assert_eq!(0, gateway.buffer().used_length());
}
