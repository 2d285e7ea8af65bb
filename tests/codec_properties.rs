//! Property tests for the frame codec.

use proptest::prelude::*;
use sbrick_protocol::constants::*;
use sbrick_protocol::protocol::*;
use sbrick_protocol::{Classifier, Direction, Port, PortId, PortMode, SBrickError, SensorCategory};

fn any_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Clockwise), Just(Direction::CounterClockwise)]
}

fn any_mode() -> impl Strategy<Value = PortMode> {
    prop_oneof![Just(PortMode::Output), Just(PortMode::Input)]
}

fn port(id: u8, direction: Direction, power: u8, mode: PortMode) -> Port {
    Port {
        direction,
        power,
        mode,
        ..Port::new(PortId::new(id).unwrap())
    }
}

proptest! {
    #[test]
    fn clamp_power_is_bounded_magnitude(power in any::<i32>()) {
        let clamped = clamp_power(power);
        prop_assert_eq!(u32::from(clamped), power.unsigned_abs().min(255));
    }

    #[test]
    fn drive_frame_layout(id in 0u8..4, direction in any_direction(), power in 0i32..=255) {
        let frame = encode_drive(id, direction, power).unwrap();
        prop_assert_eq!(frame, vec![DRIVE_CMD, id, direction.as_byte(), power as u8]);
    }

    #[test]
    fn drive_rejects_out_of_range_power(power in prop_oneof![i32::MIN..0, 256..i32::MAX]) {
        let rejected = matches!(
            encode_drive(0, Direction::Clockwise, power),
            Err(SBrickError::InvalidArgument(_))
        );
        prop_assert!(rejected);
    }

    #[test]
    fn quick_drive_packs_scaled_power_and_direction(
        settings in proptest::collection::vec((any_direction(), any::<u8>(), any_mode()), 4),
    ) {
        let slots = [0u8, 1, 2, 3].map(|i| {
            let (direction, power, mode) = settings[usize::from(i)];
            Some(port(i, direction, power, mode))
        });
        let frame = encode_quick_drive(&slots);

        for (byte, (direction, power, mode)) in frame.iter().zip(&settings) {
            if *mode == PortMode::Input {
                prop_assert_eq!(*byte, 0);
                continue;
            }
            let scaled = u16::from(*power) * 127 / 255;
            prop_assert_eq!(*byte >> 1, scaled as u8);
            prop_assert_eq!(*byte & 1, direction.as_byte());
            prop_assert!(*byte >> 1 <= MAX_QUICK_DRIVE_POWER);
        }
    }

    #[test]
    fn stop_frame_lists_only_outputs(modes in proptest::collection::vec(any_mode(), 4)) {
        let ports: Vec<Port> = modes
            .iter()
            .enumerate()
            .map(|(i, m)| port(i as u8, Direction::Clockwise, 0, *m))
            .collect();
        let outputs: Vec<u8> = ports
            .iter()
            .filter(|p| p.mode == PortMode::Output)
            .map(|p| p.id.hardware_id())
            .collect();

        match encode_stop(&ports) {
            None => {
                prop_assert!(outputs.is_empty());
            }
            Some(frame) => {
                prop_assert_eq!(frame[0], BREAK_CMD);
                prop_assert_eq!(&frame[1..], outputs.as_slice());
            }
        }
    }

    #[test]
    fn temperature_round_trips(celsius in -40.0f64..100.0) {
        let raw = ((celsius + TEMPERATURE_OFFSET) * TEMPERATURE_DIVISOR).round() as i16;
        let decoded = decode_temperature(decode_adc_sample(&raw.to_le_bytes()).unwrap());
        prop_assert!((decoded - celsius).abs() < 0.01);
    }

    #[test]
    fn battery_percent_tracks_voltage(raw in 0i16..=i16::MAX) {
        let volts = decode_voltage(raw);
        let percent = decode_battery_percent(volts);
        prop_assert!(volts >= 0.0);
        prop_assert_eq!(percent, (volts / MAX_VOLT * 100.0).round() as u8);
    }

    #[test]
    fn short_sensor_frames_are_rejected(bytes in proptest::collection::vec(any::<u8>(), 0..SENSOR_FRAME_LEN)) {
        let rejected = matches!(
            decode_sensor_frame(&bytes, Classifier::Default),
            Err(SBrickError::InvalidResponse { .. })
        );
        prop_assert!(rejected);
    }

    #[test]
    fn wedo_classification_follows_tilt_range(reference in 1u16..4096, channel_a in 0u16..4096) {
        let frame: Vec<u8> = [reference, channel_a, 0]
            .iter()
            .flat_map(|w| (w << SENSOR_SHIFT).to_le_bytes())
            .collect();
        let sample = decode_sensor_frame(&frame, Classifier::Wedo).unwrap();

        let type_id = (f64::from(channel_a) / f64::from(reference) * 255.0).round() as u32;
        prop_assert_eq!(sample.type_id, Some(type_id));
        if WEDO_TILT_RANGE.contains(&type_id) {
            prop_assert_eq!(sample.category, SensorCategory::Tilt);
        } else {
            prop_assert_eq!(sample.category, SensorCategory::Motion);
        }
    }
}
