//! Exercises `Machine::step` against a hand-assembled v3 story image
//! covering arithmetic, printing, and the quit opcode end to end.

use zmachine::cpu::{HaltReason, Machine, StepOutcome};
use zmachine::display_headless::HeadlessDisplay;
use zmachine::memory::Memory;

const INITIAL_PC: u16 = 0x40;

fn build_story(program: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; 0x40 + program.len()];
    image[0x00] = 3; // version
    image[0x04] = 0x00; // high mem (unused by these tests)
    image[0x05] = 0x40;
    image[0x06] = (INITIAL_PC >> 8) as u8;
    image[0x07] = (INITIAL_PC & 0xFF) as u8;
    image[0x0C] = 0x00; // globals table
    image[0x0D] = 0x40;
    image[0x0E] = 0x00; // base of static memory: everything is "dynamic" here
    image[0x0F] = 0x40;
    image[0x40..].copy_from_slice(program);
    image
}

fn run_to_halt(program: &[u8]) -> (HaltReason, String) {
    let bytes = build_story(program);
    let memory = Memory::load(bytes).expect("story loads");
    let mut machine = Machine::new(memory);
    let mut display = HeadlessDisplay::new().expect("headless display");

    loop {
        match machine.step(&mut display).expect("step succeeds") {
            StepOutcome::Running => continue,
            StepOutcome::Halted(reason) => {
                display.force_refresh().ok();
                return (reason, display.get_output());
            }
            StepOutcome::NeedsLineInput { .. } | StepOutcome::NeedsCharInput { .. } => {
                panic!("program should not require input")
            }
        }
    }
}

#[test]
fn add_print_num_new_line_quit() {
    // add 2 3 -> sp
    // print_num sp
    // new_line
    // quit
    let program = [
        0x54, 0x02, 0x03, 0x00, // long form, 2OP:0x14 add, store to stack
        0xE6, 0xBF, 0x00, // variable form, VAR:0x06 print_num, operand = stack
        0xBB, // short form OP0, new_line
        0xBA, // short form OP0, quit
    ];
    let (reason, output) = run_to_halt(&program);
    assert_eq!(reason, HaltReason::Quit);
    assert_eq!(output.trim(), "5");
}

#[test]
fn je_branch_skips_the_false_arm() {
    // je 7 7 ?true   (branch forward, landing exactly on the trailing quit)
    // print_num 111  (skipped)
    // new_line       (skipped)
    // quit
    let program = [
        0x01, 0x07, 0x07, 0xC6, // long form je 7 7, branch true, single-byte offset 6
        0xE6, 0x7F, 0x6F, // print_num #111 (small constant) -- should be skipped
        0xBB, // new_line -- should be skipped
        0xBA, // quit
    ];
    let (reason, output) = run_to_halt(&program);
    assert_eq!(reason, HaltReason::Quit);
    assert_eq!(output.trim(), "");
}

#[test]
fn je_branches_when_the_first_operand_matches_any_of_the_rest() {
    // je 5 1 2 5 ?true   (variable-form je with 4 operands; branches because
    // the first operand equals the last, not the immediately following one)
    // print_num 111      (skipped)
    // new_line           (skipped)
    // quit
    let program = [
        0xC1, 0x55, 0x05, 0x01, 0x02, 0x05, 0xC6, // var form je 5 1 2 5, branch true, offset 6
        0xE6, 0x7F, 0x6F, // print_num #111 -- should be skipped
        0xBB, // new_line -- should be skipped
        0xBA, // quit
    ];
    let (reason, output) = run_to_halt(&program);
    assert_eq!(reason, HaltReason::Quit);
    assert_eq!(output.trim(), "");
}

#[test]
fn call_pushes_a_frame_and_returns_its_value() {
    // main (at 0x40): call_vs routine -> sp ; print_num sp ; new_line ; quit
    // routine (at 0x4C): one local, no args; store #9 -> local1; ret local1
    let routine_addr: u16 = 0x4C;
    let packed = routine_addr / 2;
    let program = [
        0xE0, 0x7F, packed as u8, 0x00, // var form call_vs routine (small const) -> sp
        0xE6, 0xBF, 0x00, // print_num sp
        0xBB, // new_line
        0xBA, // quit
        0xB4, 0xB4, 0xB4, // padding up to the routine's address
        0x01, 0x00, 0x00, // routine header: 1 local, default value 0
        0x0D, 0x01, 0x09, // store #9 -> local1 (long form 2OP:0x0D, small constants)
        0xAB, 0x01, // ret local1 (short form OP1:0x0B, variable operand)
    ];
    assert_eq!(0x40 + 9, routine_addr as usize - 3); // sanity check on the hand-laid-out padding
    let (reason, output) = run_to_halt(&program);
    assert_eq!(reason, HaltReason::Quit);
    assert_eq!(output.trim(), "9");
}
