//! Lectura de muestras del ICM42688
//!
//! Dos rutas de lectura:
//!  1) FIFO: un paquete fijo de 16 bytes desde el puerto FIFO_DATA. Es la ruta
//!     preferida y la única que usa la lectura pública de muestras.
//!  2) Registros de datos: ráfaga de 12 bytes desde ACCEL_DATA_X1. Solo la usa
//!     la auto-verificación de escalas.
//!
//! Disposición del paquete FIFO:
//!
//! | Bytes  | Contenido                                   |
//! |--------|---------------------------------------------|
//! | 0      | cabecera/contador (se descarta)             |
//! | 1..=6  | accel X, Y, Z (big-endian, `>> 1` con signo) |
//! | 7..=12 | gyro X, Y, Z (big-endian, sin desplazamiento)|
//! | 13..16 | sin uso                                     |
//!
//! El acelerómetro llega alineado un bit a la izquierda; el desplazamiento
//! aritmético conserva el signo.

use embedded_hal::delay::DelayNs;

use crate::device::{Icm42688, Icm42688Error};
use crate::interface::Interface;
use crate::register::bank0;
use crate::types::RawSample;

/// Tamaño de un paquete del FIFO
pub const FIFO_PACKET_LEN: usize = 16;
/// Tamaño de la ráfaga de registros de datos
pub const DATA_REGISTERS_LEN: usize = 12;

#[inline]
fn be_i16(bytes: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

/// Decodifica seis ejes a partir de `offset`: tres de accel (con `>> 1`) y tres de gyro
fn decode_axes(bytes: &[u8], offset: usize) -> RawSample {
    let accel = [
        be_i16(bytes, offset) >> 1,
        be_i16(bytes, offset + 2) >> 1,
        be_i16(bytes, offset + 4) >> 1,
    ];
    let gyro = [
        be_i16(bytes, offset + 6),
        be_i16(bytes, offset + 8),
        be_i16(bytes, offset + 10),
    ];
    RawSample::new(accel, gyro)
}

/// Decodifica un paquete FIFO de 16 bytes
pub fn decode_fifo_packet(packet: &[u8]) -> Result<RawSample, Icm42688Error> {
    if packet.len() < FIFO_PACKET_LEN {
        return Err(Icm42688Error::PacketInvalid);
    }
    Ok(decode_axes(packet, 1))
}

/// Decodifica una ráfaga de 12 bytes de los registros de datos
pub fn decode_data_registers(raw: &[u8]) -> Result<RawSample, Icm42688Error> {
    if raw.len() < DATA_REGISTERS_LEN {
        return Err(Icm42688Error::PacketInvalid);
    }
    Ok(decode_axes(raw, 0))
}

impl<I, D> Icm42688<I, D>
where
    I: Interface,
    D: DelayNs,
    Icm42688Error: From<I::Error>,
{
    /// Lee un paquete del FIFO y lo decodifica
    pub fn read_fifo_sample(&mut self) -> Result<RawSample, Icm42688Error> {
        let mut packet = [0u8; FIFO_PACKET_LEN];
        self.read_regs(bank0::FIFO_DATA, &mut packet)?;
        let sample = decode_fifo_packet(&packet)?;
        self.last_sample = Some(sample);
        Ok(sample)
    }

    /// Lectura directa de los registros de datos (ruta de verificación)
    pub fn read_direct_sample(&mut self) -> Result<RawSample, Icm42688Error> {
        let mut raw = [0u8; DATA_REGISTERS_LEN];
        self.read_regs(bank0::ACCEL_DATA_X1, &mut raw)?;
        decode_data_registers(&raw)
    }
}
