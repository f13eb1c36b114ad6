//! Fetch/decode/execute loop and the opcode dispatch table.
//!
//! The core loop only ever blocks on local state (`Memory`, `Stack`); any
//! opcode that needs terminal input returns a [`StepOutcome`] instead of
//! reading from stdin directly, which keeps the engine usable headlessly.

use crate::dictionary::Dictionary;
use crate::display_trait::ZMachineDisplay;
use crate::error::{ZError, ZResult};
use crate::instruction::{Instruction, OperandCount, OperandType};
use crate::memory::Memory;
use crate::object;
use crate::quetzal::restore::RestoreGame;
use crate::quetzal::save::{MemoryEncoding, SaveGame};
use crate::stack::{Stack, MAX_LOCALS};
use crate::text;
use crate::zrand::ZRand;
use log::{debug, trace};
use std::io::{self, Write};
use std::path::PathBuf;

fn prompt_for_save_path() -> PathBuf {
    print!("Enter save filename: ");
    let _ = io::stdout().flush();
    let mut filename = String::new();
    if io::stdin().read_line(&mut filename).is_err() {
        return PathBuf::from("game.sav");
    }
    let filename = filename.trim();
    let filename = if filename.is_empty() { "game" } else { filename };
    let filename = if filename.ends_with(".sav") || filename.ends_with(".qzl") { filename.to_string() } else { format!("{filename}.sav") };
    PathBuf::from(filename)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    Quit,
    GameOver,
}

pub enum StepOutcome {
    Running,
    NeedsLineInput { text_buffer: u32, parse_buffer: u32, max_len: usize },
    NeedsCharInput { store_var: u8 },
    Halted(HaltReason),
}

pub struct Machine {
    pub memory: Memory,
    pub stack: Stack,
    pub pc: u32,
    pub rand: ZRand,
    dictionary: Option<Dictionary>,
    instruction_count: u64,
}

impl Machine {
    pub fn new(memory: Memory) -> Self {
        let pc = memory.header.initial_pc as u32;
        let mut stack = Stack::new();
        stack.call(0, None, [0; MAX_LOCALS], 0, &[]); // the implicit "main" frame
        Machine { memory, stack, pc, rand: ZRand::new_uniform(), dictionary: None, instruction_count: 0 }
    }

    fn dictionary(&mut self) -> ZResult<&Dictionary> {
        if self.dictionary.is_none() {
            self.dictionary = Some(Dictionary::load(&self.memory)?);
        }
        Ok(self.dictionary.as_ref().unwrap())
    }

    fn version(&self) -> u8 {
        self.memory.version()
    }

    fn read_variable(&mut self, var: u8) -> ZResult<u16> {
        match var {
            0 => self.stack.pop(),
            1..=15 => self.stack.get_local(var),
            _ => self.memory.read_global(var),
        }
    }

    fn write_variable(&mut self, var: u8, value: u16) -> ZResult<()> {
        match var {
            0 => self.stack.push(value),
            1..=15 => self.stack.set_local(var, value),
            _ => self.memory.write_global(var, value),
        }
    }

    fn resolve_operands(&mut self, inst: &Instruction) -> ZResult<Vec<u16>> {
        let mut out = Vec::with_capacity(inst.operands.len());
        for (i, raw) in inst.operands.iter().enumerate() {
            let v = match inst.operand_types[i] {
                OperandType::Variable => self.read_variable(*raw as u8)?,
                _ => *raw,
            };
            out.push(v);
        }
        Ok(out)
    }

    fn do_branch(&mut self, inst: &Instruction, condition: bool) -> ZResult<()> {
        let Some(ref branch) = inst.branch else { return Ok(()) };
        if condition == branch.on_true {
            match branch.offset {
                0 => self.do_return(0)?,
                1 => self.do_return(1)?,
                n => self.pc = (self.pc as i64 + n as i64 - 2) as u32,
            }
        }
        Ok(())
    }

    fn do_return(&mut self, value: u16) -> ZResult<()> {
        let (pc, store) = self.stack.ret()?;
        self.pc = pc;
        if let Some(var) = store {
            self.write_variable(var, value)?;
        }
        Ok(())
    }

    fn do_call(
        &mut self,
        routine_packed: u16,
        args: &[u16],
        store_var: Option<u8>,
        return_pc: u32,
    ) -> ZResult<()> {
        if routine_packed == 0 {
            // calling address 0 returns false immediately, per the standard.
            if let Some(var) = store_var {
                self.write_variable(var, 0)?;
            }
            return Ok(());
        }
        let addr = self.memory.packed_address(routine_packed);
        let num_locals = self.memory.read_byte(addr)?;
        if num_locals as usize > MAX_LOCALS {
            return Err(ZError::execution(addr, "routine declares more than 15 locals"));
        }
        let mut locals = [0u16; MAX_LOCALS];
        let mut offset = addr + 1;
        if self.version() <= 4 {
            for slot in locals.iter_mut().take(num_locals as usize) {
                *slot = self.memory.read_word(offset)?;
                offset += 2;
            }
        }
        self.stack.call(return_pc, store_var, locals, num_locals, args);
        self.pc = offset;
        Ok(())
    }

    fn print_str(&mut self, display: &mut dyn ZMachineDisplay, s: &str) -> ZResult<()> {
        display.print(s).map_err(|e| ZError::Io(e.to_string()))
    }

    /// Execute one instruction, advancing the program counter.
    pub fn step(&mut self, display: &mut dyn ZMachineDisplay) -> ZResult<StepOutcome> {
        let version = self.version();
        let inst = Instruction::decode(self.memory.raw(), self.pc as usize, version)?;
        self.pc += inst.size as u32;
        self.instruction_count += 1;
        trace!("#{} pc={:#06x} {}", self.instruction_count, self.pc, inst.format_with_version(version));

        let operands = self.resolve_operands(&inst)?;
        self.execute(&inst, &operands, display)
    }

    fn execute(&mut self, inst: &Instruction, ops: &[u16], display: &mut dyn ZMachineDisplay) -> ZResult<StepOutcome> {
        let version = self.version();
        let opcode = inst.opcode;

        match inst.form {
            crate::instruction::InstructionForm::Extended => {
                return self.execute_extended(inst, ops, display);
            }
            _ => {}
        }

        match (inst.operand_count, opcode) {
            // Note: the variable form of a 2OP opcode already decodes with
            // `operand_count == OP2` (only the opcode byte's top bits pick
            // VAR vs OP2), so no separate re-dispatch is needed here.

            // ---- 2OP ----
            (OperandCount::OP2, 0x01) => self.do_branch(inst, ops[1..].iter().any(|&o| o == ops[0]))?, // je
            (OperandCount::OP2, 0x02) => self.do_branch(inst, (ops[0] as i16) < (ops[1] as i16))?, // jl
            (OperandCount::OP2, 0x03) => self.do_branch(inst, (ops[0] as i16) > (ops[1] as i16))?, // jg
            (OperandCount::OP2, 0x04) => {
                // dec_chk
                let var = ops[0] as u8;
                let value = (self.read_variable(var)? as i16).wrapping_sub(1);
                self.write_variable(var, value as u16)?;
                self.do_branch(inst, value < ops[1] as i16)?;
            }
            (OperandCount::OP2, 0x05) => {
                // inc_chk
                let var = ops[0] as u8;
                let value = (self.read_variable(var)? as i16).wrapping_add(1);
                self.write_variable(var, value as u16)?;
                self.do_branch(inst, value > ops[1] as i16)?;
            }
            (OperandCount::OP2, 0x06) => {
                // jin
                let parent = object::get_parent(&self.memory, ops[0])?;
                self.do_branch(inst, parent == ops[1])?;
            }
            (OperandCount::OP2, 0x07) => self.do_branch(inst, ops[0] & ops[1] == ops[1])?, // test
            (OperandCount::OP2, 0x08) => self.store(inst, ops[0] | ops[1])?,               // or
            (OperandCount::OP2, 0x09) => self.store(inst, ops[0] & ops[1])?,               // and
            (OperandCount::OP2, 0x0A) => {
                let has = object::get_attribute(&self.memory, ops[0], ops[1] as u8)?;
                self.do_branch(inst, has)?;
            }
            (OperandCount::OP2, 0x0B) => object::set_attribute(&mut self.memory, ops[0], ops[1] as u8)?,
            (OperandCount::OP2, 0x0C) => object::clear_attribute(&mut self.memory, ops[0], ops[1] as u8)?,
            (OperandCount::OP2, 0x0D) => self.write_variable(ops[0] as u8, ops[1])?, // store
            (OperandCount::OP2, 0x0E) => object::insert_obj(&mut self.memory, ops[0], ops[1])?,
            (OperandCount::OP2, 0x0F) => {
                let addr = self.memory.header.global_variables as u32; // unused; loadw uses array operand directly
                let _ = addr;
                let word_addr = ops[0] as u32 + ops[1] as u32 * 2;
                let v = self.memory.read_word(word_addr)?;
                self.store(inst, v)?;
            }
            (OperandCount::OP2, 0x10) => {
                let byte_addr = ops[0] as u32 + ops[1] as u32;
                let v = self.memory.read_byte(byte_addr)? as u16;
                self.store(inst, v)?;
            }
            (OperandCount::OP2, 0x11) => {
                let v = object::get_property(&self.memory, ops[0], ops[1] as u8)?;
                self.store(inst, v)?;
            }
            (OperandCount::OP2, 0x12) => {
                let v = object::get_prop_addr(&self.memory, ops[0], ops[1] as u8)?;
                self.store(inst, v as u16)?;
            }
            (OperandCount::OP2, 0x13) => {
                let v = object::get_next_property(&self.memory, ops[0], ops[1] as u8)?;
                self.store(inst, v as u16)?;
            }
            (OperandCount::OP2, 0x14) => self.store(inst, ((ops[0] as i16).wrapping_add(ops[1] as i16)) as u16)?,
            (OperandCount::OP2, 0x15) => self.store(inst, ((ops[0] as i16).wrapping_sub(ops[1] as i16)) as u16)?,
            (OperandCount::OP2, 0x16) => self.store(inst, ((ops[0] as i16).wrapping_mul(ops[1] as i16)) as u16)?,
            (OperandCount::OP2, 0x17) => {
                if ops[1] == 0 {
                    return Err(ZError::execution(self.pc, "division by zero"));
                }
                self.store(inst, ((ops[0] as i16).wrapping_div(ops[1] as i16)) as u16)?;
            }
            (OperandCount::OP2, 0x18) => {
                if ops[1] == 0 {
                    return Err(ZError::execution(self.pc, "modulo by zero"));
                }
                self.store(inst, ((ops[0] as i16).wrapping_rem(ops[1] as i16)) as u16)?;
            }
            (OperandCount::OP2, 0x19) => {
                let return_pc = self.pc;
                self.do_call(ops[0], &ops[1..], inst.store_var, return_pc)?;
            }
            (OperandCount::OP2, 0x1A) => {
                let return_pc = self.pc;
                self.do_call(ops[0], &ops[1..], None, return_pc)?;
            }
            (OperandCount::OP2, 0x1B) => debug!("set_colour {} {} (ignored, no colour terminal)", ops[0], ops[1]),
            (OperandCount::OP2, 0x1C) => {
                // throw: unwind to the frame that made the `catch` call
                let (pc, store) = self.stack.throw_to(ops[1] as usize)?;
                self.pc = pc;
                if let Some(var) = store {
                    self.write_variable(var, ops[0])?;
                }
            }

            // ---- 1OP ----
            (OperandCount::OP1, 0x00) => self.do_branch(inst, ops[0] == 0)?, // jz
            (OperandCount::OP1, 0x01) => {
                let sib = object::get_sibling(&self.memory, ops[0])?;
                self.store(inst, sib)?;
                self.do_branch(inst, sib != 0)?;
            }
            (OperandCount::OP1, 0x02) => {
                let child = object::get_child(&self.memory, ops[0])?;
                self.store(inst, child)?;
                self.do_branch(inst, child != 0)?;
            }
            (OperandCount::OP1, 0x03) => {
                let v = object::get_parent(&self.memory, ops[0])?;
                self.store(inst, v)?;
            }
            (OperandCount::OP1, 0x04) => {
                let len = if ops[0] == 0 { 0 } else { object::get_prop_len(&self.memory, ops[0] as u32)? };
                self.store(inst, len as u16)?;
            }
            (OperandCount::OP1, 0x05) => {
                let var = ops[0] as u8;
                let v = (self.read_variable(var)? as i16).wrapping_add(1);
                self.write_variable(var, v as u16)?;
            }
            (OperandCount::OP1, 0x06) => {
                let var = ops[0] as u8;
                let v = (self.read_variable(var)? as i16).wrapping_sub(1);
                self.write_variable(var, v as u16)?;
            }
            (OperandCount::OP1, 0x07) => {
                let abbrev = self.memory.header.abbrev_table as usize;
                let (s, _) = text::decode_string(self.memory.raw(), ops[0] as usize, abbrev)?;
                self.print_str(display, &s)?;
            }
            (OperandCount::OP1, 0x08) => {
                let return_pc = self.pc;
                self.do_call(ops[0], &[], inst.store_var, return_pc)?;
            }
            (OperandCount::OP1, 0x09) => object::remove_obj(&mut self.memory, ops[0])?,
            (OperandCount::OP1, 0x0A) => {
                let name = object::short_name(&self.memory, ops[0])?;
                self.print_str(display, &name)?;
            }
            (OperandCount::OP1, 0x0B) => {
                let v = ops[0];
                self.do_return(v)?;
            }
            (OperandCount::OP1, 0x0C) => {
                let n = ops[0] as i16;
                self.pc = (self.pc as i64 + n as i64 - 2) as u32;
            }
            (OperandCount::OP1, 0x0D) => {
                let abbrev = self.memory.header.abbrev_table as usize;
                let addr = self.memory.packed_address(ops[0]);
                let s = text::decode_string_at_packed_addr(self.memory.raw(), addr, abbrev)?;
                self.print_str(display, &s)?;
            }
            (OperandCount::OP1, 0x0E) => {
                // `load` peeks the stack rather than popping it, unlike a
                // normal variable read, when the target variable is 0.
                let var = ops[0] as u8;
                let v = if var == 0 { self.stack.peek()? } else { self.read_variable(var)? };
                self.store(inst, v)?;
            }
            (OperandCount::OP1, 0x0F) => {
                if version <= 4 {
                    self.store(inst, !ops[0])?;
                } else {
                    // call_1n
                    let return_pc = self.pc;
                    self.do_call(ops[0], &[], None, return_pc)?;
                }
            }

            // ---- 0OP ----
            (OperandCount::OP0, 0x00) => self.do_return(1)?, // rtrue
            (OperandCount::OP0, 0x01) => self.do_return(0)?, // rfalse
            (OperandCount::OP0, 0x02) => {
                if let Some(ref s) = inst.text {
                    self.print_str(display, s)?;
                }
            }
            (OperandCount::OP0, 0x03) => {
                if let Some(ref s) = inst.text {
                    self.print_str(display, s)?;
                }
                self.do_return(1)?;
            }
            (OperandCount::OP0, 0x04) => {} // nop
            (OperandCount::OP0, 0x05) => return self.op_save(inst),
            (OperandCount::OP0, 0x06) => return self.op_restore(inst),
            (OperandCount::OP0, 0x07) => {
                let pc = self.memory.header.initial_pc as u32;
                self.pc = pc;
                self.stack = Stack::new();
                self.stack.call(0, None, [0; MAX_LOCALS], 0, &[]);
            }
            (OperandCount::OP0, 0x08) => {
                let v = self.stack.pop()?;
                if let Some(var) = inst.store_var {
                    self.write_variable(var, v)?;
                }
            }
            (OperandCount::OP0, 0x09) => {
                if version <= 4 {
                    self.stack.pop()?;
                } else {
                    // catch: store current frame index
                    let idx = self.stack.frame_index() as u16;
                    self.store(inst, idx)?;
                }
            }
            (OperandCount::OP0, 0x0A) => return Ok(StepOutcome::Halted(HaltReason::Quit)),
            (OperandCount::OP0, 0x0B) => self.print_str(display, "\n")?,
            (OperandCount::OP0, 0x0C) => debug!("show_status (status line managed by the display backend)"),
            (OperandCount::OP0, 0x0D) => self.do_branch(inst, self.memory.verify_checksum())?,
            (OperandCount::OP0, 0x0F) => debug!("piracy check (always genuine)"),

            // ---- VAR ----
            (OperandCount::VAR, 0x00) => {
                let return_pc = self.pc;
                self.do_call(ops[0], &ops[1..], inst.store_var, return_pc)?;
            }
            (OperandCount::VAR, 0x01) => {
                let addr = ops[0] as u32 + ops[1] as u32 * 2;
                self.memory.write_word(addr, ops[2])?;
            }
            (OperandCount::VAR, 0x02) => {
                let addr = ops[0] as u32 + ops[1] as u32;
                self.memory.write_byte(addr, ops[2] as u8)?;
            }
            (OperandCount::VAR, 0x03) => object::put_property(&mut self.memory, ops[0], ops[1] as u8, ops[2])?,
            (OperandCount::VAR, 0x04) => {
                let text_buffer = ops[0] as u32;
                let parse_buffer = ops.get(1).copied().unwrap_or(0) as u32;
                let max_len = self.memory.read_byte(text_buffer)? as usize;
                return Ok(StepOutcome::NeedsLineInput { text_buffer, parse_buffer, max_len });
            }
            (OperandCount::VAR, 0x05) => {
                if let Some(ch) = text::zscii_to_unicode(ops[0]) {
                    self.print_str(display, &ch.to_string())?;
                }
            }
            (OperandCount::VAR, 0x06) => self.print_str(display, &(ops[0] as i16).to_string())?,
            (OperandCount::VAR, 0x07) => {
                let v = self.rand.random_opcode(ops[0] as i16);
                self.store(inst, v)?;
            }
            (OperandCount::VAR, 0x08) => self.stack.push(ops[0])?,
            (OperandCount::VAR, 0x09) => {
                let v = self.stack.pop()?;
                self.write_variable(ops[0] as u8, v)?;
            }
            (OperandCount::VAR, 0x0A) => debug!("split_window {} (no upper window in this backend)", ops[0]),
            (OperandCount::VAR, 0x0B) => debug!("set_window {}", ops[0]),
            (OperandCount::VAR, 0x0C) => {
                let return_pc = self.pc;
                self.do_call(ops[0], &ops[1..], inst.store_var, return_pc)?;
            }
            (OperandCount::VAR, 0x0D) => debug!("erase_window {} (no-op)", ops[0] as i16),
            (OperandCount::VAR, 0x0E) => debug!("erase_line (no-op)"),
            (OperandCount::VAR, 0x0F) => debug!("set_cursor {} {} (no-op)", ops[0], ops[1]),
            (OperandCount::VAR, 0x10) => {
                // get_cursor writes (row, col) into the table its operand points
                // to; this backend has no movable cursor, so it always reports (1,1).
                let table = ops[0] as u32;
                self.memory.write_word(table, 1)?;
                self.memory.write_word(table + 2, 1)?;
            }
            (OperandCount::VAR, 0x11) => debug!("set_text_style {} (no-op)", ops[0]),
            (OperandCount::VAR, 0x12) => debug!("buffer_mode {} (no-op)", ops[0]),
            (OperandCount::VAR, 0x13) => debug!("output_stream {} (only stream 1 supported)", ops[0] as i16),
            (OperandCount::VAR, 0x14) => debug!("input_stream {} (only keyboard supported)", ops[0]),
            (OperandCount::VAR, 0x15) => debug!("sound_effect (no audio backend)"),
            (OperandCount::VAR, 0x16) => return Ok(StepOutcome::NeedsCharInput { store_var: inst.store_var.unwrap_or(0) }),
            (OperandCount::VAR, 0x17) => self.op_scan_table(inst, ops)?,
            (OperandCount::VAR, 0x18) => self.store(inst, !ops[0])?, // not (v5+)
            (OperandCount::VAR, 0x19) => {
                let return_pc = self.pc;
                self.do_call(ops[0], &ops[1..], None, return_pc)?;
            }
            (OperandCount::VAR, 0x1A) => {
                let return_pc = self.pc;
                self.do_call(ops[0], &ops[1..], None, return_pc)?;
            }
            (OperandCount::VAR, 0x1B) => self.op_tokenise(ops)?,
            (OperandCount::VAR, 0x1C) => debug!("encode_text (unsupported, no-op)"),
            (OperandCount::VAR, 0x1D) => self.op_copy_table(ops)?,
            (OperandCount::VAR, 0x1E) => debug!("print_table (unsupported, no-op)"),
            (OperandCount::VAR, 0x1F) => {
                let supplied = self.stack.frames.last().map(|f| f.args_supplied.count_ones()).unwrap_or(0);
                self.do_branch(inst, (ops[0] as u32) <= supplied)?;
            }

            (count, op) => return Err(ZError::execution(self.pc, format!("unimplemented opcode {op:#04x} ({count:?})"))),
        }

        Ok(StepOutcome::Running)
    }

    fn store(&mut self, inst: &Instruction, value: u16) -> ZResult<()> {
        if let Some(var) = inst.store_var {
            self.write_variable(var, value)?;
        }
        Ok(())
    }

    fn op_scan_table(&mut self, inst: &Instruction, ops: &[u16]) -> ZResult<()> {
        let x = ops[0];
        let table = ops[1] as u32;
        let len = ops[2];
        let form = ops.get(3).copied().unwrap_or(0x82);
        let entry_size = (form & 0x7F).max(1) as u32;
        let words = form & 0x80 != 0;
        let mut addr = table;
        let mut found = 0u32;
        for _ in 0..len {
            let v = if words { self.memory.read_word(addr)? } else { self.memory.read_byte(addr)? as u16 };
            if v == x {
                found = addr;
                break;
            }
            addr += entry_size;
        }
        self.store(inst, found as u16)?;
        self.do_branch(inst, found != 0)
    }

    fn op_copy_table(&mut self, ops: &[u16]) -> ZResult<()> {
        let src = ops[0] as u32;
        let dst = ops[1] as u32;
        let size = ops[2] as i16;
        if dst == 0 {
            for i in 0..size.unsigned_abs() as u32 {
                self.memory.write_byte(src + i, 0)?;
            }
            return Ok(());
        }
        let len = size.unsigned_abs() as u32;
        if size < 0 || dst <= src {
            for i in 0..len {
                let b = self.memory.read_byte(src + i)?;
                self.memory.write_byte(dst + i, b)?;
            }
        } else {
            for i in (0..len).rev() {
                let b = self.memory.read_byte(src + i)?;
                self.memory.write_byte(dst + i, b)?;
            }
        }
        Ok(())
    }

    fn op_tokenise(&mut self, ops: &[u16]) -> ZResult<()> {
        let text_buffer = ops[0] as u32;
        let parse_buffer = ops[1] as u32;
        let dict = self.dictionary()?.clone();
        dict.parse_text(&mut self.memory, text_buffer, parse_buffer, 2, false)
    }

    fn execute_extended(&mut self, inst: &Instruction, ops: &[u16], display: &mut dyn ZMachineDisplay) -> ZResult<StepOutcome> {
        match inst.ext_opcode.unwrap_or(0) {
            0x00 => return self.op_save(inst),
            0x01 => return self.op_restore(inst),
            0x02 => {
                let n = ops[1] as i16;
                let v = if n >= 0 { (ops[0] as u16).wrapping_shl(n as u32) } else { (ops[0] as u16).wrapping_shr((-n) as u32) };
                self.store(inst, v)?;
            }
            0x03 => {
                let n = ops[1] as i16;
                let v = if n >= 0 { (ops[0] as i16).wrapping_shl(n as u32) } else { (ops[0] as i16).wrapping_shr((-n) as u32) };
                self.store(inst, v as u16)?;
            }
            0x04 => self.store(inst, 1)?, // set_font: report success, ignore
            0x09 => self.store(inst, u16::MAX)?, // save_undo: unsupported, report -1
            0x0A => self.store(inst, 0)?,        // restore_undo: unsupported, fails
            0x0B => {
                if let Some(c) = char::from_u32(ops[0] as u32) {
                    self.print_str(display, &c.to_string())?;
                }
            }
            0x0C => self.store(inst, 1)?, // check_unicode: claim support
            other => debug!("unimplemented extended opcode {other:#04x} (no-op)"),
        }
        Ok(StepOutcome::Running)
    }

    fn op_save(&mut self, inst: &Instruction) -> ZResult<StepOutcome> {
        let path = prompt_for_save_path();
        let result = SaveGame::write_to_file(&self.memory, &self.stack, self.pc, MemoryEncoding::Compressed, &path);
        let ok = result.is_ok();
        if let Err(e) = result {
            debug!("save failed: {e}");
        }
        if self.version() <= 3 {
            self.do_branch(inst, ok)?;
        } else {
            self.store(inst, ok as u16)?;
        }
        Ok(StepOutcome::Running)
    }

    fn op_restore(&mut self, inst: &Instruction) -> ZResult<StepOutcome> {
        let outcome = RestoreGame::load_from_prompt()
            .and_then(|r| r.restore(&mut self.memory, &mut self.stack));
        match outcome {
            Ok(_pc) => {
                // v1-3: restore always resumes the instruction after `restore`,
                // which is already where `self.pc` points; v4+ stores success.
                if self.version() > 3 {
                    self.store(inst, 2)?;
                }
            }
            Err(e) => {
                debug!("restore failed: {e}");
                if self.version() <= 3 {
                    self.do_branch(inst, false)?;
                } else {
                    self.store(inst, 0)?;
                }
            }
        }
        Ok(StepOutcome::Running)
    }

    /// Finish a `sread`/`aread` that returned [`StepOutcome::NeedsLineInput`].
    pub fn complete_line_input(&mut self, text_buffer: u32, parse_buffer: u32, line: &str) -> ZResult<()> {
        let version = self.version();
        let lowered: String = line.chars().map(|c| c.to_ascii_lowercase()).collect();
        let start = if version <= 4 { 1 } else { 2 };
        self.memory.write_byte(text_buffer + 1, lowered.len().min(255) as u8)?;
        for (i, ch) in lowered.bytes().enumerate() {
            self.memory.write_byte(text_buffer + start + i as u32, ch)?;
        }
        if parse_buffer != 0 {
            let dict = self.dictionary()?.clone();
            dict.parse_text(&mut self.memory, text_buffer, parse_buffer, start, false)?;
        }
        Ok(())
    }

    /// Finish a `read_char` that returned [`StepOutcome::NeedsCharInput`].
    pub fn complete_char_input(&mut self, store_var: u8, ch: char) -> ZResult<()> {
        let code = text::unicode_to_zscii(ch).unwrap_or(0);
        self.write_variable(store_var, code)
    }
}
