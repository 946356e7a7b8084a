mod common;

use common::{MockPlc, CIO, DM, W};
use fins_engine::{
    codes, BcdKind, FinsError, ForceAction, MultiReadItem, MultiReadKind, MultiReadValue, PlcMode,
    Session, SignedBcd, TransferCapacity,
};

fn connect(plc: &MockPlc) -> Session {
    Session::connect(plc.config()).unwrap()
}

#[test]
fn test_read_write_words() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.write_u16("D100", &[0x1234, 0x5678]).unwrap();
    assert_eq!(plc.words(DM, 100, 2), vec![0x1234, 0x5678]);
    assert_eq!(session.read_u16("D100", 2).unwrap(), vec![0x1234, 0x5678]);

    let requests = plc.requests();
    assert_eq!((requests[0].mrc, requests[0].src), (0x01, 0x02));
    assert_eq!(
        requests[0].body,
        [0x82, 0x00, 0x64, 0x00, 0x00, 0x02, 0x12, 0x34, 0x56, 0x78]
    );
    assert_eq!(requests[1].body, [0x82, 0x00, 0x64, 0x00, 0x00, 0x02]);
}

#[test]
fn test_signed_words() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.write_i16("W10", &[-1, 300]).unwrap();
    assert_eq!(plc.words(W, 10, 2), vec![0xFFFF, 300]);
    assert_eq!(session.read_i16("W10", 2).unwrap(), vec![-1, 300]);
}

#[test]
fn test_read_over_capacity_takes_two_messages() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    let words: Vec<u16> = (0..270).collect();
    plc.set_words(DM, 0, &words);

    assert_eq!(session.read_u16("D0", 270).unwrap(), words);

    let requests = plc.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, [0x82, 0x00, 0x00, 0x00, 0x01, 0x0D]);
    assert_eq!(requests[1].body, [0x82, 0x01, 0x0D, 0x00, 0x00, 0x01]);
}

#[test]
fn test_write_over_capacity_takes_two_messages() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    let words: Vec<u16> = (1000..1270).collect();

    session.write_u16("D0", &words).unwrap();

    let requests = plc.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(&requests[0].body[..6], [0x82, 0x00, 0x00, 0x00, 0x01, 0x0B]);
    assert_eq!(&requests[1].body[..6], [0x82, 0x01, 0x0B, 0x00, 0x00, 0x03]);
    assert_eq!(plc.words(DM, 0, 270), words);
}

#[test]
fn test_ethernet_capacity() {
    let plc = MockPlc::start();
    let config = plc.config().with_capacity(TransferCapacity::ETHERNET);
    let mut session = Session::connect(config).unwrap();

    assert_eq!(session.read_u16("D0", 999).unwrap().len(), 999);
    assert_eq!(plc.requests().len(), 1);
}

#[test]
fn test_double_words_low_word_first() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.write_u32("D10", &[0x1234_5678]).unwrap();
    assert_eq!(plc.words(DM, 10, 2), vec![0x5678, 0x1234]);
    assert_eq!(session.read_u32("D10", 1).unwrap(), vec![0x1234_5678]);

    session.write_i32("D20", &[-2, 100_000]).unwrap();
    assert_eq!(plc.words(DM, 20, 4), vec![0xFFFE, 0xFFFF, 0x86A0, 0x0001]);
    assert_eq!(session.read_i32("D20", 2).unwrap(), vec![-2, 100_000]);
}

#[test]
fn test_floats() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.write_f32("D30", &[1.5, -21.25]).unwrap();
    // 1.5 = 0x3FC0_0000
    assert_eq!(plc.words(DM, 30, 2), vec![0x0000, 0x3FC0]);
    assert_eq!(session.read_f32("D30", 2).unwrap(), vec![1.5, -21.25]);

    session.write_f64("D40", &[std::f64::consts::PI]).unwrap();
    assert_eq!(session.read_f64("D40", 1).unwrap(), vec![std::f64::consts::PI]);
    assert_eq!(plc.words(DM, 43, 1), vec![0x4009]);
}

#[test]
fn test_bits_carry_into_next_word() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.write_bits("W3.14", &[true, true, true]).unwrap();
    assert_eq!(plc.words(W, 3, 2), vec![0xC000, 0x0001]);
    assert_eq!(plc.requests()[0].body, [0x31, 0x00, 0x03, 0x0E, 0x00, 0x03, 1, 1, 1]);

    let bits = session.read_bits("W3.13", 4).unwrap();
    assert_eq!(bits, vec![false, true, true, true]);
}

#[test]
fn test_bcd_reads_keep_invalid_elements() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    plc.set_words(DM, 0, &[0x1234, 0x12A4, 0x9999]);

    let values = session.read_bcd16("D0", 3).unwrap();
    assert_eq!(values, vec![Some(1234), None, Some(9999)]);

    plc.set_words(DM, 10, &[0x5678, 0x1234]);
    assert_eq!(session.read_bcd32("D10", 1).unwrap(), vec![Some(12_345_678)]);
}

#[test]
fn test_signed_bcd() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.write_sbcd16("D20", SignedBcd::NibbleF, &[-123, 456]).unwrap();
    assert_eq!(plc.words(DM, 20, 2), vec![0xF123, 0x0456]);
    assert_eq!(
        session.read_sbcd16("D20", SignedBcd::NibbleF, 2).unwrap(),
        vec![Some(-123), Some(456)]
    );

    session
        .write_bcd("D30", BcdKind::Signed16(SignedBcd::NibbleFA), &[-1234])
        .unwrap();
    assert_eq!(plc.words(DM, 30, 1), vec![0xA234]);

    session.write_sbcd32("D40", SignedBcd::NibbleF, &[-1_234_567]).unwrap();
    assert_eq!(
        session.read_sbcd32("D40", SignedBcd::NibbleF, 1).unwrap(),
        vec![Some(-1_234_567)]
    );
}

#[test]
fn test_bcd_write_validates_before_sending() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    let err = session.write_bcd16("D0", &[1, 10_000]).unwrap_err();
    assert!(matches!(err, FinsError::InvalidParameter { .. }));
    assert_eq!(err.code(), codes::INVALID_PARAMETER_AREA);

    let err = session
        .write_sbcd16("D0", SignedBcd::SignBit, &[-1000])
        .unwrap_err();
    assert!(matches!(err, FinsError::InvalidParameter { .. }));

    assert!(plc.requests().is_empty());
    assert_eq!(session.error_count(), 0);
}

#[test]
fn test_fill() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.fill("D500", 10, 0xABCD).unwrap();
    assert_eq!(plc.words(DM, 500, 11)[..10], [0xABCD; 10]);
    assert_eq!(plc.words(DM, 510, 1), vec![0]);

    let requests = plc.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        [0x82, 0x01, 0xF4, 0x00, 0x00, 0x0A, 0xAB, 0xCD]
    );

    let err = session.fill("D0", 70_000, 0).unwrap_err();
    assert_eq!(err.code(), codes::INVALID_PARAMETER_AREA);
}

#[test]
fn test_fill_needs_fill_area() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    let err = session.fill("A100", 1, 0).unwrap_err();
    assert!(matches!(err, FinsError::AreaNotFound { .. }));
    assert_eq!(err.code(), codes::INVALID_FILL_AREA);
}

#[test]
fn test_transfer() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    plc.set_words(DM, 100, &[1, 2, 3, 4, 5]);

    session.transfer("D100", "D200", 5).unwrap();
    assert_eq!(plc.words(DM, 200, 5), vec![1, 2, 3, 4, 5]);
    assert_eq!(
        plc.requests()[0].body,
        [0x82, 0x00, 0x64, 0x00, 0x82, 0x00, 0xC8, 0x00, 0x00, 0x05]
    );

    // the lower auxiliary area is not a transfer destination
    let err = session.transfer("D100", "A100", 1).unwrap_err();
    assert_eq!(err.code(), codes::INVALID_WRITE_AREA);
}

#[test]
fn test_read_multiple() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    plc.set_words(W, 3, &[0xBEEF]);
    plc.set_words(CIO, 0, &[0x0002]);
    plc.set_words(DM, 10, &[0x5678, 0x1234, 0x0000, 0x3FC0, 0x0042]);

    let values = session
        .read_multiple(&[
            MultiReadItem::new("W3", MultiReadKind::Word),
            MultiReadItem::new("CIO0.1", MultiReadKind::Bit),
            MultiReadItem::new("D10", MultiReadKind::U32),
            MultiReadItem::new("D12", MultiReadKind::F32),
            MultiReadItem::new("D14", MultiReadKind::Bcd(BcdKind::Unsigned16)),
        ])
        .unwrap();

    assert_eq!(
        values,
        vec![
            MultiReadValue::Word(0xBEEF),
            MultiReadValue::Bit(true),
            MultiReadValue::U32(0x1234_5678),
            MultiReadValue::F32(1.5),
            MultiReadValue::Bcd(Some(42)),
        ]
    );

    let requests = plc.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body.len(), 7 * 4);
    assert_eq!(&requests[0].body[..8], [0xB1, 0x00, 0x03, 0x00, 0x30, 0x00, 0x00, 0x01]);
}

#[test]
fn test_read_multiple_batches() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    let items: Vec<_> = (0..30)
        .map(|i| MultiReadItem::new(format!("D{i}"), MultiReadKind::Word))
        .collect();
    assert_eq!(session.read_multiple(&items).unwrap().len(), 30);

    let requests = plc.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body.len(), 24 * 4);
    assert_eq!(requests[1].body.len(), 6 * 4);
}

#[test]
fn test_read_multiple_never_splits_an_item() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    plc.set_words(DM, 100, &[0, 0, 0, 0x3FF8]);

    let mut items: Vec<_> = (0..5)
        .map(|i| MultiReadItem::new(format!("D{}", i * 4), MultiReadKind::F64))
        .collect();
    items.push(MultiReadItem::new("D0", MultiReadKind::Word));
    items.push(MultiReadItem::new("D100", MultiReadKind::F64));

    let values = session.read_multiple(&items).unwrap();
    assert_eq!(values[6], MultiReadValue::F64(1.5));

    // 5 * 4 + 1 = 21 wire items, the last four do not fit
    let requests = plc.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body.len(), 21 * 4);
    assert_eq!(requests[1].body.len(), 4 * 4);
}

#[test]
fn test_read_multiple_signed() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    plc.set_words(DM, 0, &[0xFFFE, 0x7960, 0xFFFE]);

    let values = session
        .read_multiple(&[
            MultiReadItem::new("D0", MultiReadKind::I16),
            MultiReadItem::new("D1", MultiReadKind::I32),
        ])
        .unwrap();
    assert_eq!(values, vec![MultiReadValue::I16(-2), MultiReadValue::I32(-100_000)]);
    assert_eq!(plc.requests()[0].body.len(), 3 * 4);
}

#[test]
fn test_index_registers() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.write_i32("IR2", &[-100_000]).unwrap();
    assert_eq!(plc.with(|s| s.registers[2]), 0xFFFE_7960);
    // one 4 byte register, not two words
    assert_eq!(
        plc.requests()[0].body,
        [0xDC, 0x01, 0x02, 0x00, 0x00, 0x01, 0xFF, 0xFE, 0x79, 0x60]
    );

    plc.with(|s| s.registers[..2].copy_from_slice(&[1, 0x1234_5678]));
    assert_eq!(
        session.read_u32("IR0", 3).unwrap(),
        vec![1, 0x1234_5678, 0xFFFE_7960]
    );
    assert_eq!(plc.requests()[1].body, [0xDC, 0x01, 0x00, 0x00, 0x00, 0x03]);

    let values = session
        .read_multiple(&[
            MultiReadItem::new("IR1", MultiReadKind::U32),
            MultiReadItem::new("D0", MultiReadKind::Word),
        ])
        .unwrap();
    assert_eq!(values, vec![MultiReadValue::U32(0x1234_5678), MultiReadValue::Word(0)]);
    assert_eq!(plc.requests()[2].body.len(), 2 * 4);
}

#[test]
fn test_word_access_to_index_registers_is_rejected() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    let err = session.read_u16("IR0", 1).unwrap_err();
    assert!(matches!(err, FinsError::InvalidParameter { .. }));
    let err = session.write_i16("IR0", &[1]).unwrap_err();
    assert!(matches!(err, FinsError::InvalidParameter { .. }));
    let err = session
        .read_multiple(&[MultiReadItem::new("IR0", MultiReadKind::Word)])
        .unwrap_err();
    assert!(matches!(err, FinsError::InvalidParameter { .. }));

    assert!(plc.requests().is_empty());
}

#[test]
fn test_forced_set_reset() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session
        .forced_set_reset(&[("CIO0.1", ForceAction::Set), ("W2.0", ForceAction::Reset)])
        .unwrap();
    assert_eq!(
        plc.requests()[0].body,
        [0x00, 0x02, 0x00, 0x01, 0x30, 0x00, 0x00, 0x01, 0x00, 0x00, 0x31, 0x00, 0x02, 0x00]
    );

    let values = session
        .read_multiple(&[
            MultiReadItem::new("CIO0.1", MultiReadKind::BitForced),
            MultiReadItem::new("CIO0", MultiReadKind::WordForced),
            MultiReadItem::new("CIO0.2", MultiReadKind::BitForced),
        ])
        .unwrap();
    assert_eq!(
        values,
        vec![
            MultiReadValue::BitForced {
                value: true,
                forced: true
            },
            MultiReadValue::WordForced {
                value: 0x0002,
                forced_mask: 0x0002
            },
            MultiReadValue::BitForced {
                value: false,
                forced: false
            },
        ]
    );

    session.forced_cancel().unwrap();
    let values = session
        .read_multiple(&[MultiReadItem::new("CIO0.1", MultiReadKind::BitForced)])
        .unwrap();
    assert_eq!(
        values,
        vec![MultiReadValue::BitForced {
            value: true,
            forced: false
        }]
    );
}

#[test]
fn test_force_needs_force_area() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    let err = session
        .forced_set_reset(&[("D0.1", ForceAction::Set)])
        .unwrap_err();
    assert!(matches!(err, FinsError::AreaNotFound { .. }));
    assert_eq!(err.code(), codes::INVALID_WRITE_AREA);
    assert!(plc.requests().is_empty());
}

#[test]
fn test_run_and_stop() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    session.run(PlcMode::Monitor).unwrap();
    assert_eq!(plc.with(|s| s.mode), Some(0x02));
    assert_eq!(plc.requests()[0].body, [0xFF, 0xFF, 0x02]);

    session.stop().unwrap();
    assert_eq!(plc.with(|s| s.mode), None);
}

#[test]
fn test_zero_counts_do_no_io() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    assert!(session.read_u16("not an address", 0).unwrap().is_empty());
    assert!(session.read_f64("D0", 0).unwrap().is_empty());
    session.write_u16("D0", &[]).unwrap();
    session.fill("D0", 0, 1).unwrap();
    session.transfer("D0", "D1", 0).unwrap();
    assert!(session.read_multiple(&[]).unwrap().is_empty());
    session.forced_set_reset(&[]).unwrap();

    assert!(plc.requests().is_empty());
    assert_eq!(session.next_service_id(), 0);
}

#[test]
fn test_address_errors_follow_direction() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);

    let err = session.read_u16("D100.", 1).unwrap_err();
    assert!(matches!(err, FinsError::InvalidAddress { .. }));
    assert_eq!(err.code(), codes::INVALID_READ_ADDRESS);

    let err = session.write_u16("D100x", &[1]).unwrap_err();
    assert_eq!(err.code(), codes::INVALID_WRITE_ADDRESS);

    let err = session.write_u16("  ", &[1]).unwrap_err();
    assert_eq!(err.code(), codes::NO_WRITE_ADDRESS);

    // the lower auxiliary area is read-only
    let err = session.write_u16("A100", &[1]).unwrap_err();
    assert_eq!(err.code(), codes::INVALID_WRITE_AREA);
    assert_eq!(session.read_u16("A100", 1).unwrap(), vec![0]);

    let err = session.read_u16("DM40000", 1).unwrap_err();
    assert_eq!(err.code(), codes::INVALID_READ_AREA);

    assert_eq!(session.error_count(), 0);
    assert_eq!(plc.requests().len(), 1);
}

#[test]
fn test_plc_error_stops_chunked_read() {
    let plc = MockPlc::start();
    let mut session = connect(&plc);
    plc.opts(|o| o.end_code = Some(0x1103));

    let err = session.read_u16("D0", 600).unwrap_err();
    assert!(matches!(err, FinsError::PlcError { .. }));
    assert_eq!(plc.requests().len(), 1);
}
