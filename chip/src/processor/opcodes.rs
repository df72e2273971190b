use crate::{
    definitions::{cpu, display::fontset},
    display::Display,
    opcode::{ArithmeticOp, Instruction, Operation, ProgramCounter, ProgramCounterStep},
    quirks::ShiftSource,
    timer::TimedWorker,
    ProcessError,
};

use super::Processor;

/// The amount of pixels in a single sprite row
const BYTE: usize = 8;

impl<W: TimedWorker> Processor<W> {
    /// will run the instruction and move the program counter accordingly
    pub(super) fn calc(&mut self, instruction: Instruction) -> Result<Operation, ProcessError> {
        let (step, operation) = self.execute(instruction)?;
        self.step(step);
        Ok(operation)
    }

    fn execute(
        &mut self,
        instruction: Instruction,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        let mut operation = Operation::None;

        let step = match instruction {
            Instruction::Sys { .. } => ProgramCounterStep::Next,
            Instruction::Clear => {
                self.display.clear();
                operation = Operation::Draw;
                ProgramCounterStep::Next
            }
            Instruction::Return => {
                let pc = self.memory.pop_stack()?;
                log::debug!("return to {:#06X}", pc);
                ProgramCounterStep::Jump(pc)
            }
            Instruction::Jump { nnn } => ProgramCounterStep::Jump(nnn),
            Instruction::Call { nnn } => {
                // the program counter already points to the instruction after the call
                self.memory.push_stack(self.program_counter);
                ProgramCounterStep::Jump(nnn)
            }
            Instruction::SkipEqual { x, nn } => ProgramCounterStep::cond(self.registers[x] == nn),
            Instruction::SkipNotEqual { x, nn } => {
                ProgramCounterStep::cond(self.registers[x] != nn)
            }
            Instruction::SkipEqualRegister { x, y } => {
                ProgramCounterStep::cond(self.registers[x] == self.registers[y])
            }
            Instruction::Load { x, nn } => {
                self.registers[x] = nn;
                ProgramCounterStep::Next
            }
            Instruction::Add { x, nn } => {
                // let VX overflow, but ignore carry
                self.registers[x] = self.registers[x].wrapping_add(nn);
                ProgramCounterStep::Next
            }
            Instruction::Arithmetic { op, x, y } => {
                self.arithmetic(op, x, y);
                ProgramCounterStep::Next
            }
            Instruction::SkipNotEqualRegister { x, y } => {
                ProgramCounterStep::cond(self.registers[x] != self.registers[y])
            }
            Instruction::LoadIndex { nnn } => {
                self.index_register = nnn;
                ProgramCounterStep::Next
            }
            Instruction::JumpOffset { nnn } => {
                ProgramCounterStep::Jump(nnn + self.registers[0] as u16)
            }
            Instruction::Random { x, nn } => {
                // using a fill bytes call here, as the trait RngCore does not
                // support random u8.
                let mut rand = [0u8; 1];
                self.rng.fill_bytes(&mut rand);
                self.registers[x] = rand[0] & nn;
                ProgramCounterStep::Next
            }
            Instruction::Draw { x, y, n } => {
                self.draw(x, y, n)?;
                operation = Operation::Draw;
                ProgramCounterStep::Next
            }
            Instruction::SkipKeyPressed { x } => {
                ProgramCounterStep::cond(self.keypad.is_key_pressed(self.registers[x]))
            }
            Instruction::SkipKeyNotPressed { x } => {
                ProgramCounterStep::cond(!self.keypad.is_key_pressed(self.registers[x]))
            }
            Instruction::GetDelayTimer { x } => {
                self.registers[x] = self.delay_timer.value();
                ProgramCounterStep::Next
            }
            Instruction::AwaitKeyPress { x } => match self.keypad.pressed_key_code() {
                Some(key) => {
                    self.registers[x] = key;
                    ProgramCounterStep::Next
                }
                None => {
                    // hand control back to the host until a key is down
                    operation = Operation::Wait;
                    ProgramCounterStep::Repeat
                }
            },
            Instruction::SetDelayTimer { x } => {
                self.delay_timer.set_value(self.registers[x]);
                ProgramCounterStep::Next
            }
            Instruction::SetSoundTimer { x } => {
                self.sound_timer.set_value(self.registers[x]);
                ProgramCounterStep::Next
            }
            Instruction::AddVxToI { x } => {
                self.index_register = self.index_register.wrapping_add(self.registers[x] as u16);
                ProgramCounterStep::Next
            }
            Instruction::SetIToSprite { x } => {
                let character = self.registers[x] as u16;
                self.index_register =
                    fontset::LOCATION as u16 + character * fontset::CHARACTER_SIZE as u16;
                ProgramCounterStep::Next
            }
            Instruction::StoreBcd { x } => {
                let i = self.index_register as usize;
                let r = self.registers[x];

                self.memory.write(i, r / 100)?; // 246u8 / 100 => 2
                self.memory.write(i + 1, r / 10 % 10)?; // 246u8 / 10 => 24 % 10 => 4
                self.memory.write(i + 2, r % 10)?; // 246u8 % 10 => 6
                ProgramCounterStep::Next
            }
            Instruction::StoreV0ToVx { x } => {
                let index = self.index_register as usize;
                for (offset, value) in self.registers[..=x].iter().enumerate() {
                    self.memory.write(index + offset, *value)?;
                }
                self.advance_index(x);
                ProgramCounterStep::Next
            }
            Instruction::FillV0ToVx { x } => {
                let index = self.index_register as usize;
                for offset in 0..=x {
                    self.registers[offset] = self.memory.read(index + offset)?;
                }
                self.advance_index(x);
                ProgramCounterStep::Next
            }
        };

        Ok((step, operation))
    }

    /// The `8XYN` family, the flag is always written after `VX` so it
    /// wins if `X` is `F`.
    fn arithmetic(&mut self, op: ArithmeticOp, x: usize, y: usize) {
        let vx = self.registers[x];
        let vy = self.registers[y];

        let (result, flag) = match op {
            ArithmeticOp::Assign => (vy, None),
            ArithmeticOp::Or => (vx | vy, Some(0)),
            ArithmeticOp::And => (vx & vy, Some(0)),
            ArithmeticOp::Xor => (vx ^ vy, Some(0)),
            ArithmeticOp::Add => {
                let (sum, carry) = vx.overflowing_add(vy);
                (sum, Some(carry as u8))
            }
            ArithmeticOp::Sub => (vx.wrapping_sub(vy), Some((vx > vy) as u8)),
            ArithmeticOp::ShiftRight => (self.shift_source(vx, vy) >> 1, Some(vx & 0x1)),
            ArithmeticOp::SubN => (vy.wrapping_sub(vx), Some((vy > vx) as u8)),
            ArithmeticOp::ShiftLeft => {
                const SHIFT_SIGNIFICANT: u8 = 7;
                const AND_SIGNIFICANT: u8 = 1 << SHIFT_SIGNIFICANT;
                (
                    self.shift_source(vx, vy) << 1,
                    Some((vx & AND_SIGNIFICANT) >> SHIFT_SIGNIFICANT),
                )
            }
        };

        self.registers[x] = result;
        if let Some(flag) = flag {
            self.registers[cpu::register::LAST] = flag;
        }
    }

    #[inline]
    fn shift_source(&self, vx: u8, vy: u8) -> u8 {
        match self.quirks.shift {
            ShiftSource::Vy => vy,
            ShiftSource::Vx => vx,
        }
    }

    #[inline]
    fn advance_index(&mut self, x: usize) {
        let step = self.quirks.load_store.step(x);
        self.index_register = self.index_register.wrapping_add(step);
    }

    /// Draws a sprite at coordinate `(VX, VY)` that has a width of `8` pixels and a height of `N`
    /// pixels. Each row of `8` pixels is read as bit-coded starting from memory location `I`; `I`
    /// value doesn’t change after the execution of this instruction. `VF` is set to `1` if any
    /// screen pixels are flipped from set to unset when the sprite is drawn, and to `0` if that
    /// doesn’t happen. Pixels leaving the screen wrap around to the other side.
    fn draw(&mut self, x: usize, y: usize, n: u8) -> Result<(), ProcessError> {
        let coorx = self.registers[x] as usize;
        let coory = self.registers[y] as usize;
        let index = self.index_register as usize;

        self.registers[cpu::register::LAST] = 0;

        for row in 0..n as usize {
            let sprite = self.memory.read(index + row)?;

            for column in 0..BYTE {
                let mask = 0x80 >> column;
                if sprite & mask == 0 {
                    continue;
                }

                let pixel = Display::index(coorx + column, coory + row);
                if self.display.is_pixel_on(pixel)? {
                    self.registers[cpu::register::LAST] = 1;
                }
                self.display.toggle_pixel(pixel)?;
            }
        }

        Ok(())
    }
}
