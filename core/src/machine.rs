//! The IJVM machine: operand stack, local-variable frame, and the
//! fetch-execute dispatch loop.

use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{LoadError, RuntimeError};
use crate::image::{self, Image};
use crate::opcode::{self, Op};

/// Minimum size of the backing stack array, in words (spec §3).
const STACK_SIZE: usize = 65_536;

/// Locals reserved for the synthetic outer frame that exists before any
/// `INVOKEVIRTUAL` — see spec §4.1 and the Open Question in DESIGN.md.
const OUTER_FRAME_LOCALS: usize = 10;

/// A loaded, running (or halted) IJVM machine.
///
/// The machine owns its text, constant pool, and backing stack array
/// exclusively; none of its state is shared across threads. Construct one
/// with [`Machine::load`] or [`Machine::from_image`], drive it with
/// [`Machine::run`] or [`Machine::step`], and inspect it with the read-only
/// accessors below.
pub struct Machine {
    text: Vec<u8>,
    constant_pool: Vec<u8>,
    stack: Vec<i32>,

    pc: usize,
    sp: usize,
    lv: usize,
    halted: bool,
    wide: bool,
    last_error: Option<RuntimeError>,

    input: Box<dyn Read + Send>,
    output: Box<dyn Write + Send>,
}

impl Machine {
    /// Load a binary image from `path` and build a machine ready to run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let image = image::load(path)?;
        Ok(Self::from_image(image))
    }

    /// Build a machine from an already-parsed [`Image`].
    pub fn from_image(image: Image) -> Self {
        let stack = vec![0i32; STACK_SIZE];
        let lv = 0;
        let sp = lv + (OUTER_FRAME_LOCALS - 1);

        Machine {
            text: image.text,
            constant_pool: image.constant_pool,
            stack,
            pc: 0,
            sp,
            lv,
            halted: false,
            wide: false,
            last_error: None,
            input: Box::new(io::stdin()),
            output: Box::new(io::stdout()),
        }
    }

    /// Tear down the machine, releasing its allocations. Idempotent: safe
    /// to call more than once, and the machine is simply unusable
    /// afterwards (any further `step`/`run` sees `finished() == true`).
    pub fn destroy(&mut self) {
        let _ = self.output.flush();
        self.text = Vec::new();
        self.constant_pool = Vec::new();
        self.stack = Vec::new();
        self.pc = 0;
        self.sp = 0;
        self.lv = 0;
        self.halted = true;
        self.wide = false;
        self.last_error = None;
    }

    /// Rebind the input stream.
    pub fn set_input(&mut self, input: impl Read + Send + 'static) {
        self.input = Box::new(input);
    }

    /// Rebind the output stream.
    pub fn set_output(&mut self, output: impl Write + Send + 'static) {
        self.output = Box::new(output);
    }

    /// Run until `finished()`.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Execute exactly one opcode (or, for `WIDE`, one opcode plus the
    /// modified opcode that follows it) and return whether execution should
    /// continue.
    pub fn step(&mut self) -> bool {
        if self.finished() {
            return false;
        }

        let opcode_byte = self.text[self.pc];
        let op = match opcode::decode(opcode_byte) {
            Some(op) => op,
            None => {
                self.halted = true;
                self.last_error = Some(RuntimeError::UnknownOpcode(opcode_byte));
                return false;
            }
        };

        self.dispatch(op);
        !self.halted
    }

    // -- Inspectors (pure reads) --------------------------------------------

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn text_ptr(&self) -> &[u8] {
        &self.text
    }

    pub fn text_size(&self) -> usize {
        self.text.len()
    }

    pub fn current_opcode(&self) -> u8 {
        self.text.get(self.pc).copied().unwrap_or(0)
    }

    pub fn tos(&self) -> i32 {
        self.stack[self.sp]
    }

    pub fn stack_depth(&self) -> usize {
        self.sp - self.lv
    }

    /// A read-only view of the live frame, from the first local to the
    /// current stack top.
    pub fn stack_view(&self) -> &[i32] {
        &self.stack[self.lv..=self.sp]
    }

    pub fn get_local(&self, i: usize) -> i32 {
        self.stack[self.lv + i]
    }

    pub fn get_constant(&self, i: usize) -> i32 {
        self.constant(i)
    }

    pub fn finished(&self) -> bool {
        self.halted || self.pc >= self.text.len()
    }

    /// The reason the machine halted, if it was not a clean `HALT`/`ERR`.
    pub fn last_error(&self) -> Option<RuntimeError> {
        self.last_error
    }

    // -- Decoder (C2) --------------------------------------------------------

    fn byte_operand(&self, off: usize) -> i8 {
        self.text[self.pc + off] as i8
    }

    fn ubyte_operand(&self, off: usize) -> u8 {
        self.text[self.pc + off]
    }

    fn short_operand(&self, off: usize) -> i16 {
        let bytes = [self.text[self.pc + off], self.text[self.pc + off + 1]];
        i16::from_be_bytes(bytes)
    }

    fn ushort_operand(&self, off: usize) -> u16 {
        let bytes = [self.text[self.pc + off], self.text[self.pc + off + 1]];
        u16::from_be_bytes(bytes)
    }

    fn constant(&self, i: usize) -> i32 {
        let base = i * 4;
        let bytes = [
            self.constant_pool[base],
            self.constant_pool[base + 1],
            self.constant_pool[base + 2],
            self.constant_pool[base + 3],
        ];
        i32::from_be_bytes(bytes)
    }

    // -- Stack/frame engine (C3) ---------------------------------------------

    fn push(&mut self, w: i32) {
        let next = self.sp + 1;
        if next >= self.stack.len() {
            self.halted = true;
            self.last_error = Some(RuntimeError::StackOverflow);
            return;
        }
        self.sp = next;
        self.stack[self.sp] = w;
    }

    fn pop(&mut self) -> i32 {
        let w = self.stack[self.sp];
        self.sp -= 1;
        w
    }

    fn local(&self, i: usize) -> i32 {
        self.stack[self.lv + i]
    }

    fn set_local(&mut self, i: usize, w: i32) {
        self.stack[self.lv + i] = w;
    }

    // -- I/O adapter (C5) ------------------------------------------------------

    fn read_input_byte(&mut self) -> u8 {
        let mut buf = [0u8; 1];
        match self.input.read(&mut buf) {
            Ok(1) => buf[0],
            _ => 0,
        }
    }

    fn write_output_byte(&mut self, b: u8) {
        let _ = self.output.write_all(&[b]);
        let _ = self.output.flush();
    }

    // -- Dispatcher (C4) ---------------------------------------------------

    fn dispatch(&mut self, op: Op) {
        match op {
            Op::Nop => {
                self.pc += 1;
            }
            Op::BiPush => {
                let b = self.byte_operand(1) as i32;
                self.push(b);
                self.pc += 2;
            }
            Op::LdcW => {
                let i = self.ushort_operand(1) as usize;
                let v = self.constant(i);
                self.push(v);
                self.pc += 3;
            }
            Op::ILoad => {
                if self.wide {
                    let i = self.ushort_operand(1) as usize;
                    let v = self.local(i);
                    self.push(v);
                    self.pc += 3;
                } else {
                    let i = self.ubyte_operand(1) as usize;
                    let v = self.local(i);
                    self.push(v);
                    self.pc += 2;
                }
            }
            Op::IStore => {
                if self.wide {
                    let i = self.ushort_operand(1) as usize;
                    let v = self.pop();
                    self.set_local(i, v);
                    self.pc += 3;
                } else {
                    let i = self.ubyte_operand(1) as usize;
                    let v = self.pop();
                    self.set_local(i, v);
                    self.pc += 2;
                }
            }
            Op::IInc => {
                let i = self.ubyte_operand(1) as usize;
                let v = self.byte_operand(2) as i32;
                let cur = self.local(i);
                self.set_local(i, cur.wrapping_add(v));
                self.pc += 3;
            }
            Op::Pop => {
                self.pop();
                self.pc += 1;
            }
            Op::Dup => {
                let v = self.tos();
                self.push(v);
                self.pc += 1;
            }
            Op::Swap => {
                let a = self.pop();
                let b = self.pop();
                self.push(a);
                self.push(b);
                self.pc += 1;
            }
            Op::IAdd => {
                let b = self.pop();
                let a = self.pop();
                self.push(a.wrapping_add(b));
                self.pc += 1;
            }
            Op::ISub => {
                let b = self.pop();
                let a = self.pop();
                self.push(a.wrapping_sub(b));
                self.pc += 1;
            }
            Op::IAnd => {
                let b = self.pop();
                let a = self.pop();
                self.push(a & b);
                self.pc += 1;
            }
            Op::IOr => {
                let b = self.pop();
                let a = self.pop();
                self.push(a | b);
                self.pc += 1;
            }
            Op::Goto => {
                let off = self.short_operand(1) as i64;
                self.pc = (self.pc as i64 + off) as usize;
            }
            Op::IfEq => {
                let off = self.short_operand(1) as i64;
                let v = self.pop();
                self.pc = if v == 0 {
                    (self.pc as i64 + off) as usize
                } else {
                    self.pc + 3
                };
            }
            Op::IfLt => {
                let off = self.short_operand(1) as i64;
                let v = self.pop();
                self.pc = if v < 0 {
                    (self.pc as i64 + off) as usize
                } else {
                    self.pc + 3
                };
            }
            Op::IfIcmpEq => {
                let off = self.short_operand(1) as i64;
                let b = self.pop();
                let a = self.pop();
                self.pc = if a == b {
                    (self.pc as i64 + off) as usize
                } else {
                    self.pc + 3
                };
            }
            Op::In => {
                let b = self.read_input_byte();
                self.push(b as i32);
                self.pc += 1;
            }
            Op::Out => {
                let v = self.pop();
                self.write_output_byte((v & 0xFF) as u8);
                self.pc += 1;
            }
            Op::Halt => {
                self.halted = true;
            }
            Op::Err => {
                // Treated identically to HALT; see DESIGN.md for the Open
                // Question this resolves.
                self.halted = true;
            }
            Op::Wide => {
                self.wide = true;
                self.pc += 1;
                self.step();
                self.wide = false;
            }
            Op::InvokeVirtual => self.invoke_virtual(),
            Op::IReturn => self.ireturn(),
        }
    }

    fn invoke_virtual(&mut self) {
        let m = self.ushort_operand(1) as usize;
        let method_addr = self.constant(m) as usize;

        let prev_pc = self.pc;
        let prev_lv = self.lv;

        self.pc = method_addr;
        let num_args = self.ushort_operand(0) as usize;
        let num_locals = self.ushort_operand(2) as usize;

        self.lv = self.sp + 1 - num_args;
        self.sp += num_locals;

        self.push(prev_pc as i32);
        self.push(prev_lv as i32);

        let saved_pc_index = (self.sp - 1) - self.lv;
        self.set_local(0, saved_pc_index as i32);

        self.pc = method_addr + 4;
    }

    fn ireturn(&mut self) {
        let result = self.pop();

        let l0 = self.local(0) as usize;
        let saved_pc = self.local(l0) as usize;
        let saved_lv = self.local(l0 + 1) as usize;

        self.sp = self.lv;
        self.stack[self.sp] = result;
        self.lv = saved_lv;
        self.pc = saved_pc + 3;
    }
}
