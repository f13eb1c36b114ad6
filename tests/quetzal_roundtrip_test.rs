//! Saves a mid-execution call-frame stack to a Quetzal file and restores
//! it into a fresh `Memory`/`Stack` pair, end to end.

use zmachine::memory::Memory;
use zmachine::quetzal::save::{MemoryEncoding, SaveGame};
use zmachine::quetzal::restore::RestoreGame;
use zmachine::stack::{Stack, MAX_LOCALS};

fn minimal_v3_story() -> Vec<u8> {
    let mut bytes = vec![0u8; 0x200];
    bytes[0x00] = 3;
    bytes[0x0E] = 0x01; // static memory starts at 0x100
    bytes[0x12..0x18].copy_from_slice(b"960521");
    bytes
}

fn save_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("zmachine-test-{name}-{}.qzl", std::process::id()))
}

#[test]
fn uncompressed_save_restores_dynamic_memory_and_frames() {
    let mut memory = Memory::load(minimal_v3_story()).unwrap();
    memory.write_byte(0x80, 0x42).unwrap();

    let mut stack = Stack::new();
    stack.call(0, None, [0; MAX_LOCALS], 0, &[]);
    stack.call(0x55, Some(3), [0; MAX_LOCALS], 2, &[10, 20]);
    stack.push(99).unwrap();

    let path = save_path("uncompressed");
    SaveGame::write_to_file(&memory, &stack, 0x1000, MemoryEncoding::Uncompressed, &path).unwrap();

    let mut restored_memory = Memory::load(minimal_v3_story()).unwrap();
    let mut restored_stack = Stack::new();
    let restore = RestoreGame::from_file(&path).unwrap();
    let resumed_pc = restore.restore(&mut restored_memory, &mut restored_stack).unwrap();

    std::fs::remove_file(&path).ok();

    assert_eq!(resumed_pc, 0x1000);
    assert_eq!(restored_memory.read_byte(0x80).unwrap(), 0x42);
    assert_eq!(restored_stack.frames.len(), 2);
    assert_eq!(restored_stack.get_local(1).unwrap(), 10);
    assert_eq!(restored_stack.get_local(2).unwrap(), 20);
}

#[test]
fn compressed_save_round_trips_the_same_as_uncompressed() {
    let mut memory = Memory::load(minimal_v3_story()).unwrap();
    memory.write_byte(0x90, 0x7E).unwrap();
    memory.write_byte(0x91, 0x00).unwrap(); // untouched byte, exercises the XOR-RLE zero run

    let mut stack = Stack::new();
    stack.call(0, None, [0; MAX_LOCALS], 0, &[]);

    let path = save_path("compressed");
    SaveGame::write_to_file(&memory, &stack, 0x2000, MemoryEncoding::Compressed, &path).unwrap();

    let mut restored_memory = Memory::load(minimal_v3_story()).unwrap();
    let mut restored_stack = Stack::new();
    let restore = RestoreGame::from_file(&path).unwrap();
    let resumed_pc = restore.restore(&mut restored_memory, &mut restored_stack).unwrap();

    std::fs::remove_file(&path).ok();

    assert_eq!(resumed_pc, 0x2000);
    assert_eq!(restored_memory.read_byte(0x90).unwrap(), 0x7E);
    assert_eq!(restored_memory.dynamic_region(), memory.dynamic_region());
}
