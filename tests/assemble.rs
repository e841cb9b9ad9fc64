use snesasm::code_generator::disassemble;
use snesasm::{assemble, Config, ErrorKind, FlagState};

fn assemble_default(source: &str) -> snesasm::Result<Vec<u8>> {
    assemble(source, &Config::default())
}

#[test]
fn switch_to_native_mode() {
    let source = "
        .org $8000
    reset:
        SEI
        CLC
        XCE             ; native mode, still 8-bit
        REP #$30        ; 16-bit A, X and Y
        LDA #$1234
        LDX #$0000
        SEP #$20        ; 8-bit A
        LDA #$12
        LDY #$0010
        STP
    ";
    assert_eq!(
        Ok(vec![
            0x78, 0x18, 0xFB, 0xC2, 0x30, 0xA9, 0x34, 0x12, 0xA2, 0x00, 0x00, 0xE2, 0x20, 0xA9,
            0x12, 0xA0, 0x10, 0x00, 0xDB,
        ]),
        assemble_default(source)
    );
}

#[test]
fn emulation_forces_eight_bit_immediates() {
    // REP has no effect on the widths in emulation mode
    assert_eq!(
        Ok(vec![0xC2, 0x30, 0xA9, 0x34]),
        assemble_default("REP #$30\nLDA #$34")
    );
    assert!(assemble_default("LDA #$1234").is_err());
}

#[test]
fn php_plp_restore_widths() {
    let source = "
        .mode m8x8
        PHP
        REP #$30
        LDA #$1234
        PLP
        LDA #$12
        LDX #$34
    ";
    assert_eq!(
        Ok(vec![0x08, 0xC2, 0x30, 0xA9, 0x34, 0x12, 0x28, 0xA9, 0x12, 0xA2, 0x34]),
        assemble_default(source)
    );
}

#[test]
fn constants_drive_width_changes() {
    let source = "
        .mode m8x8
        REP #WIDE
        LDA #$1234
    WIDE .equ $20
    ";
    assert_eq!(Ok(vec![0xC2, 0x20, 0xA9, 0x34, 0x12]), assemble_default(source));
}

#[test]
fn mode_directive_for_subroutines() {
    let source = "
        .mode m16x16
        JSR clear
        RTS
    clear:
        .entry m8x16
        LDA #0
        LDX #0
        RTS
    ";
    assert_eq!(
        Ok(vec![0x20, 0x04, 0x00, 0x60, 0xA9, 0x00, 0xA2, 0x00, 0x00, 0x60]),
        assemble_default(source)
    );
}

#[test]
fn call_target_inherits_callers_state() {
    let source = "
        .mode m16x8
        JSR helper
        RTS
    helper:
        LDA #1
        RTS
    ";
    assert_eq!(
        Ok(vec![0x20, 0x04, 0x00, 0x60, 0xA9, 0x01, 0x00, 0x60]),
        assemble_default(source)
    );
}

#[test]
fn add_and_sub_expand() {
    let source = "
        .mode m16x16
        ADD #$0100
        SUB counter
    counter: .dw 0
    ";
    assert_eq!(
        Ok(vec![0x18, 0x69, 0x00, 0x01, 0x38, 0xED, 0x08, 0x00, 0x00, 0x00]),
        assemble_default(source)
    );
}

#[test]
fn origin_and_long_addressing() {
    let config = Config::default().with_origin(0x80_8000);
    let source = "
    main:
        JSL main
        JMP main
        BRL main
    ";
    assert_eq!(
        Ok(vec![0x22, 0x00, 0x80, 0x80, 0x4C, 0x00, 0x80, 0x82, 0xF6, 0xFF]),
        assemble(source, &config)
    );
}

#[test]
fn output_disassembles_to_source() {
    let source = "
        CLC
        XCE
        REP #$10
        LDX #$1234
        LDA #$56
        BNE -2
        RTL
    ";
    let bytes = assemble_default(source).unwrap();
    let listing: Vec<String> = disassemble(&bytes, FlagState::emulation())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        vec!["CLC", "XCE", "REP #$10", "LDX #$1234", "LDA #$56", "BNE -2", "RTL"],
        listing
    );
}

#[test]
fn diagnostics_carry_file_and_offset() {
    let config = Config::default().with_path("boot.s");
    let e = assemble("  NOP\n  LDA #$12\n  JMP missing\n", &config).unwrap_err();
    assert_eq!(ErrorKind::UndefinedSymbol("missing".to_owned()), *e.kind());
    assert_eq!("boot.s:17: undefined symbol \"missing\"", e.to_string());

    let e = assemble("  .mode m24\n", &config).unwrap_err();
    assert_eq!(
        ErrorKind::UnknownName {
            kind: "flag state",
            name: "m24".to_owned()
        },
        *e.kind()
    );
    assert_eq!(Some(8), e.location().offset);
}

#[test]
fn initial_state_comes_from_config() {
    let config = Config::default().with_initial_state(FlagState::from_name("m16x16").unwrap());
    assert_eq!(Ok(vec![0xA9, 0x00, 0x01]), assemble("LDA #$100", &config));
}
