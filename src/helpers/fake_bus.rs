//! Register-file I2C fake and a no-op delay for driver tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};

const MODE_CONFIG: u8 = 0x09;
const RESET_BIT: u8 = 0x40;
const FIFO_DATA: u8 = 0x07;
const FIFO_READ_PTR: u8 = 0x06;
const FIFO_WRITE_PTR: u8 = 0x04;
const DIE_TEMP_CONFIG: u8 = 0x21;
const INT_STAT2: u8 = 0x01;

#[derive(Default)]
struct State {
    registers: Vec<u8>,
    fifo: VecDeque<u8>,
    pointer: u8,
    writes: Vec<(u8, Vec<u8>)>,
    nack: bool,
}

/// Behaves like a MAX3010x register map and records every write.
#[derive(Clone)]
pub struct FakeBus {
    state: Rc<RefCell<State>>,
}

impl FakeBus {
    pub fn new() -> Self {
        let state = State {
            registers: vec![0; 256],
            ..State::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn set_register(&self, register: u8, value: u8) {
        self.state.borrow_mut().registers[register as usize] = value;
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state.borrow().registers[register as usize]
    }

    pub fn push_fifo(&self, bytes: &[u8]) {
        self.state.borrow_mut().fifo.extend(bytes.iter().copied());
    }

    /// Every write as `(address, bytes)`, in bus order.
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.borrow().writes.clone()
    }

    pub fn set_nack(&self, nack: bool) {
        self.state.borrow_mut().nack = nack;
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for FakeBus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.nack {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    state.writes.push((address, bytes.to_vec()));
                    let Some((&register, values)) = bytes.split_first() else {
                        continue;
                    };
                    state.pointer = register;
                    for &value in values {
                        let register = state.pointer;
                        let value = match register {
                            MODE_CONFIG => value & !RESET_BIT,
                            _ => value,
                        };
                        state.registers[register as usize] = value;
                        if register == DIE_TEMP_CONFIG && value & 0x01 != 0 {
                            state.registers[INT_STAT2 as usize] |= 0x02;
                        }
                        state.pointer = state.pointer.wrapping_add(1);
                    }
                }
                Operation::Read(buffer) => {
                    if state.pointer == FIFO_DATA {
                        for byte in buffer.iter_mut() {
                            *byte = state.fifo.pop_front().unwrap_or(0);
                        }
                        let write_ptr = state.registers[FIFO_WRITE_PTR as usize];
                        state.registers[FIFO_READ_PTR as usize] = write_ptr;
                    } else {
                        for byte in buffer.iter_mut() {
                            *byte = state.registers[state.pointer as usize];
                            state.pointer = state.pointer.wrapping_add(1);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
