//! Utilidades comunes de test: bus I2C simulado por mapa de registros

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource};
use icm42688_rs::register::{bank0, bits};

/// Operación registrada en el bus simulado
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Write { addr: u8, reg: u8, value: u8 },
    Read { addr: u8, reg: u8, len: usize },
}

impl Operation {
    pub fn addr(&self) -> u8 {
        match self {
            Operation::Write { addr, .. } | Operation::Read { addr, .. } => *addr,
        }
    }
}

/// Modelo de un dispositivo en el bus
#[derive(Debug, Clone)]
struct DeviceModel {
    registers: HashMap<u8, u8>,
    fifo: VecDeque<[u8; 16]>,
    data_registers: [u8; 12],
}

impl DeviceModel {
    fn new(whoami: u8) -> Self {
        let mut registers = HashMap::new();
        registers.insert(bank0::WHO_AM_I, whoami);
        Self {
            registers,
            fifo: VecDeque::new(),
            data_registers: [0; 12],
        }
    }

    fn read(&mut self, reg: u8, buf: &mut [u8]) {
        match reg {
            bank0::FIFO_DATA => {
                // El último paquete se repite mientras no se encolen más
                let packet = if self.fifo.len() > 1 {
                    self.fifo.pop_front()
                } else {
                    self.fifo.front().copied()
                }
                .unwrap_or([0; 16]);
                for (dst, src) in buf.iter_mut().zip(packet.iter()) {
                    *dst = *src;
                }
            }
            bank0::ACCEL_DATA_X1 => {
                for (dst, src) in buf.iter_mut().zip(self.data_registers.iter()) {
                    *dst = *src;
                }
            }
            _ => {
                for (i, dst) in buf.iter_mut().enumerate() {
                    *dst = self
                        .registers
                        .get(&reg.wrapping_add(i as u8))
                        .copied()
                        .unwrap_or(0);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: HashMap<u8, DeviceModel>,
    operations: Vec<Operation>,
    /// Lecturas que fallarán por registro (contador restante)
    failing_reads: HashMap<u8, u32>,
    /// Registros cuya escritura falla siempre
    failing_writes: HashSet<u8>,
    /// Registros cuya lectura provoca un pánico
    panicking_reads: HashSet<u8>,
}

/// Bus I2C simulado. Los clones comparten estado.
#[derive(Debug, Clone, Default)]
pub struct MockI2c {
    state: Rc<RefCell<MockState>>,
}

impl MockI2c {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus con un ICM42688 en `addr`
    pub fn with_sensor(addr: u8) -> Self {
        let bus = Self::new();
        bus.add_device(addr, bits::WHO_AM_I_VALUE);
        bus
    }

    pub fn add_device(&self, addr: u8, whoami: u8) {
        self.state
            .borrow_mut()
            .devices
            .insert(addr, DeviceModel::new(whoami));
    }

    pub fn set_register(&self, addr: u8, reg: u8, value: u8) {
        if let Some(device) = self.state.borrow_mut().devices.get_mut(&addr) {
            device.registers.insert(reg, value);
        }
    }

    pub fn register(&self, addr: u8, reg: u8) -> Option<u8> {
        self.state
            .borrow()
            .devices
            .get(&addr)
            .and_then(|d| d.registers.get(&reg).copied())
    }

    pub fn push_fifo(&self, addr: u8, accel: [i16; 3], gyro: [i16; 3]) {
        if let Some(device) = self.state.borrow_mut().devices.get_mut(&addr) {
            device.fifo.push_back(fifo_packet(accel, gyro));
        }
    }

    pub fn set_data_registers(&self, addr: u8, accel: [i16; 3], gyro: [i16; 3]) {
        if let Some(device) = self.state.borrow_mut().devices.get_mut(&addr) {
            device.data_registers = data_registers(accel, gyro);
        }
    }

    /// Las próximas `count` lecturas de `reg` fallan
    pub fn fail_reads(&self, reg: u8, count: u32) {
        self.state.borrow_mut().failing_reads.insert(reg, count);
    }

    /// Toda lectura de `reg` provoca un pánico dentro de la transacción
    pub fn panic_on_read(&self, reg: u8) {
        self.state.borrow_mut().panicking_reads.insert(reg);
    }

    /// Toda escritura a `reg` falla
    pub fn fail_writes(&self, reg: u8) {
        self.state.borrow_mut().failing_writes.insert(reg);
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.state.borrow_mut().operations.clear();
    }

    pub fn reads_of(&self, addr: u8, reg: u8) -> usize {
        self.state
            .borrow()
            .operations
            .iter()
            .filter(|op| matches!(op, Operation::Read { addr: a, reg: r, .. } if *a == addr && *r == reg))
            .count()
    }

    pub fn writes_to(&self, reg: u8) -> Vec<(u8, u8)> {
        self.state
            .borrow()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::Write { addr, reg: r, value } if *r == reg => Some((*addr, *value)),
                _ => None,
            })
            .collect()
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl i2c::I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        if !state.devices.contains_key(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut pointer = 0u8;
        for op in operations.iter_mut() {
            match op {
                i2c::Operation::Write(bytes) => {
                    let Some((&reg, values)) = bytes.split_first() else {
                        continue;
                    };
                    pointer = reg;
                    for (i, &value) in values.iter().enumerate() {
                        let reg = reg.wrapping_add(i as u8);
                        state.operations.push(Operation::Write {
                            addr: address,
                            reg,
                            value,
                        });
                        if state.failing_writes.contains(&reg) {
                            return Err(ErrorKind::Other);
                        }
                        if let Some(device) = state.devices.get_mut(&address) {
                            device.registers.insert(reg, value);
                        }
                    }
                }
                i2c::Operation::Read(buf) => {
                    state.operations.push(Operation::Read {
                        addr: address,
                        reg: pointer,
                        len: buf.len(),
                    });
                    if state.panicking_reads.contains(&pointer) {
                        panic!("lectura de 0x{:02x} interrumpida", pointer);
                    }
                    if let Some(remaining) = state.failing_reads.get_mut(&pointer) {
                        if *remaining > 0 {
                            *remaining -= 1;
                            return Err(ErrorKind::Other);
                        }
                    }
                    if let Some(device) = state.devices.get_mut(&address) {
                        device.read(pointer, buf);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Proveedor de esperas que registra cada pausa en milisegundos
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    pauses_ms: Rc<RefCell<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses_ms(&self) -> Vec<u32> {
        self.pauses_ms.borrow().clone()
    }

    pub fn total_ms(&self) -> u64 {
        self.pauses_ms.borrow().iter().map(|&ms| ms as u64).sum()
    }

    pub fn clear(&self) {
        self.pauses_ms.borrow_mut().clear();
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.pauses_ms.borrow_mut().push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.pauses_ms.borrow_mut().push(ms);
    }
}

fn encode(accel: [i16; 3], gyro: [i16; 3]) -> [u8; 12] {
    let mut out = [0u8; 12];
    // El acelerómetro viaja desplazado un bit a la izquierda
    for (i, v) in accel.iter().map(|v| v << 1).chain(gyro).enumerate() {
        out[2 * i..2 * i + 2].copy_from_slice(&v.to_be_bytes());
    }
    out
}

/// Paquete FIFO que se decodifica en `accel`/`gyro` (|accel| <= 16383)
pub fn fifo_packet(accel: [i16; 3], gyro: [i16; 3]) -> [u8; 16] {
    let mut packet = [0u8; 16];
    packet[0] = 0x68;
    packet[1..13].copy_from_slice(&encode(accel, gyro));
    packet
}

/// Ráfaga de registros de datos que se decodifica en `accel`/`gyro`
pub fn data_registers(accel: [i16; 3], gyro: [i16; 3]) -> [u8; 12] {
    encode(accel, gyro)
}
