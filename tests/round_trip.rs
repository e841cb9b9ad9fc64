use snesasm::code_generator::{decode, decode_opcode, encode};
use snesasm::parser::{assemble_tokens, tokenize, AddressingMode, LineItem};
use snesasm::{FlagState, Location};

fn states() -> Vec<FlagState> {
    ["emu", "m16x16", "m8x16", "m16x8"]
        .iter()
        .map(|name| FlagState::from_name(name).unwrap())
        .collect()
}

#[test]
fn rendered_instructions_reassemble() {
    for state in states() {
        for opcode in 0..=255u8 {
            let (instruction, _) = decode(&[opcode, 0x12, 0x34, 0x56], &state).unwrap();
            let text = instruction.to_string();
            let tokens = tokenize(&text, &Location::default()).unwrap();
            let items = assemble_tokens(&tokens).unwrap();
            assert_eq!(
                vec![LineItem::Instruction(instruction.clone())],
                items,
                "{} in {}",
                text,
                state
            );
        }
    }
}

#[test]
fn every_opcode_encodes_to_itself() {
    let emu = FlagState::emulation();
    for opcode in 0..=255u8 {
        let instruction = decode_opcode(opcode);
        let bytes = encode(&instruction, &emu).unwrap();
        assert_eq!(opcode, bytes[0]);
        let expected = match instruction.addressing_mode {
            AddressingMode::ImmediateM | AddressingMode::ImmediateX => 2,
            mode => 1 + mode.fixed_operand_size().unwrap(),
        };
        assert_eq!(expected, bytes.len(), "{}", instruction);
    }
}
