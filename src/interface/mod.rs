//! Módulo de abstracción para interfaces de comunicación con el dispositivo ICM42688

use embedded_hal::i2c::I2c;

use crate::device::Icm42688Error;

/// Frecuencia de bus por defecto cuando la configuración indica 0
pub const DEFAULT_BUS_FREQUENCY_HZ: u32 = 400_000;

/// Error genérico para interfaces de comunicación
#[derive(Debug, Clone)]
pub enum InterfaceError<E> {
    /// Error de comunicación I2C
    I2cError(E),
    /// Parámetro inválido
    InvalidParameter,
}

/// Trait para abstraer la comunicación con el dispositivo ICM42688
pub trait Interface {
    /// Tipo de error que puede producir la interfaz
    type Error;

    /// Escribe un registro
    fn write_reg(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Lee un registro (o una ráfaga a partir de él)
    fn read_reg(&mut self, reg: u8, data: &mut [u8]) -> Result<(), Self::Error>;

    /// Dirección de 7 bits del dispositivo en el bus
    fn address(&self) -> u8;

    /// Cambia la dirección del dispositivo (usado por el fallback de arranque)
    fn set_address(&mut self, addr: u8);

    /// Frecuencia de reloj del bus en Hz
    fn frequency_hz(&self) -> u32 {
        DEFAULT_BUS_FREQUENCY_HZ
    }
}

/// Implementación de Interface para I2C
pub struct I2cInterface<I2C> {
    i2c: I2C,
    addr: u8,
    freq: u32,
}

impl<I2C: I2c> I2cInterface<I2C> {
    /// Crea una nueva interfaz I2C
    ///
    /// Una frecuencia de 0 selecciona el valor por defecto (400 kHz).
    pub fn new(i2c: I2C, addr: u8, freq: u32) -> Self {
        let freq = if freq == 0 { DEFAULT_BUS_FREQUENCY_HZ } else { freq };
        Self { i2c, addr, freq }
    }

    /// Consume la interfaz y devuelve el dispositivo I2C subyacente
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Interface for I2cInterface<I2C> {
    type Error = InterfaceError<I2C::Error>;

    fn write_reg(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut buffer = [0u8; 17];
        buffer[0] = reg;

        if data.len() > 16 {
            return Err(InterfaceError::InvalidParameter);
        }

        buffer[1..data.len() + 1].copy_from_slice(data);

        self.i2c
            .write(self.addr, &buffer[0..data.len() + 1])
            .map_err(InterfaceError::I2cError)
    }

    fn read_reg(&mut self, reg: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        if data.is_empty() {
            return Err(InterfaceError::InvalidParameter);
        }
        self.i2c
            .write_read(self.addr, &[reg], data)
            .map_err(InterfaceError::I2cError)
    }

    fn address(&self) -> u8 {
        self.addr
    }

    fn set_address(&mut self, addr: u8) {
        self.addr = addr;
    }

    fn frequency_hz(&self) -> u32 {
        self.freq
    }
}

// Conversión de errores de la interfaz a Icm42688Error
impl<E: core::fmt::Debug> From<InterfaceError<E>> for Icm42688Error {
    fn from(error: InterfaceError<E>) -> Self {
        match error {
            InterfaceError::I2cError(e) => {
                log::debug!("icm42688: error de bus: {:?}", e);
                Icm42688Error::Bus
            }
            InterfaceError::InvalidParameter => Icm42688Error::InvalidArgument,
        }
    }
}
