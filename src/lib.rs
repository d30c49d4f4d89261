//! Biblioteca Rust para el sensor de movimiento InvenSense ICM42688
//!
//! Esta biblioteca proporciona el arranque del ICM42688 sobre I2C (reset,
//! comprobación de identidad con cambio de dirección y configuración), la
//! lectura de muestras del FIFO, la resolución de escalas y un pipeline de
//! acondicionamiento (sesgo, filtro paso bajo y vigilancia de escala).

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

// Importaciones internas
pub mod acquisition;
pub mod base;
pub mod conditioning;
pub mod config;
pub mod conversion;
pub mod device;
pub mod fifo;
pub mod handle;
pub mod interface;
pub mod register;
pub mod types;

// Re-exports públicos
pub use acquisition::{stop_on_signals, Acquisition};
pub use conditioning::{ConditionedSample, Conditioner, Outcome, ScaleCorrection};
pub use config::{DeviceConfig, PipelineConfig};
pub use conversion::{accel_raw_to_g, gyro_raw_to_dps};
pub use device::{BringUpState, Icm42688, Icm42688Error};
pub use handle::{probe, InitError, SensorHandle};
pub use types::{AccelFullScale, GyroFullScale, RawSample, ScalePair};

use crate::interface::I2cInterface;

/// Crea un dispositivo ICM42688 sin arrancar usando el bus I2C
pub fn new_i2c_device<I, D>(i2c: I, delay: D, config: DeviceConfig) -> Icm42688<I2cInterface<I>, D>
where
    I: I2c,
    D: DelayNs,
{
    let interface = I2cInterface::new(i2c, config.address, config.frequency_hz);
    Icm42688::new(interface, delay, config)
}

/// Abre un bus I2C de Linux y registra el sensor probando 0x68 y 0x69
#[cfg(feature = "linux")]
pub fn open_linux(
    path: &str,
    config: DeviceConfig,
) -> Result<SensorHandle<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay>, Icm42688Error> {
    let i2c = linux_embedded_hal::I2cdev::new(path).map_err(|e| {
        log::error!("icm42688: no se pudo abrir {}: {}", path, e);
        Icm42688Error::Bus
    })?;
    probe(
        i2c,
        linux_embedded_hal::Delay,
        &[register::address::PRIMARY, register::address::SECONDARY],
        config,
    )
    .map_err(|e| e.error)
}
