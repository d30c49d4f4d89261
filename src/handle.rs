//! Handle de dispositivo con acceso exclusivo
//!
//! `SensorHandle` es el objeto que el componente consumidor recibe tras un
//! arranque correcto. Serializa todas las operaciones sobre el dispositivo
//! con un `Mutex` y guarda la última muestra leída. Si el arranque falla no
//! se crea ningún handle: el bus y el proveedor de esperas se devuelven al
//! llamador dentro de [`InitError`].

use core::fmt;
use std::sync::{Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::config::DeviceConfig;
use crate::device::{Icm42688, Icm42688Error};
use crate::interface::I2cInterface;
use crate::types::{AccelFullScale, GyroFullScale, RawSample, ScalePair};

/// Error de arranque. Devuelve la propiedad del bus y de las esperas.
pub struct InitError<I2C, D> {
    pub i2c: I2C,
    pub delay: D,
    pub error: Icm42688Error,
}

impl<I2C, D> InitError<I2C, D> {
    /// Recupera el bus y el proveedor de esperas
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C, D> fmt::Debug for InitError<I2C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.error, f)
    }
}

impl<I2C, D> fmt::Display for InitError<I2C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

type Device<I2C, D> = Icm42688<I2cInterface<I2C>, D>;

/// Handle de un ICM42688 listo para usar
pub struct SensorHandle<I2C, D> {
    device: Mutex<Device<I2C, D>>,
    address: u8,
    frequency_hz: u32,
}

impl<I2C, D> SensorHandle<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Crea el dispositivo y ejecuta el arranque completo.
    ///
    /// En caso de fallo no queda ningún estado parcial: se devuelve el bus.
    pub fn register(i2c: I2C, delay: D, config: DeviceConfig) -> Result<Self, InitError<I2C, D>> {
        let interface = I2cInterface::new(i2c, config.address, config.frequency_hz);
        let mut device = Icm42688::new(interface, delay, config);

        match device.initialize() {
            Ok(()) => Ok(Self {
                address: device.address(),
                frequency_hz: device.frequency_hz(),
                device: Mutex::new(device),
            }),
            Err(error) => {
                let (interface, delay) = device.release();
                Err(InitError {
                    i2c: interface.release(),
                    delay,
                    error,
                })
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Device<I2C, D>>, Icm42688Error> {
        self.device.lock().map_err(|_| Icm42688Error::Device)
    }

    /// Inicio de sesión de lectura: descarta la muestra en caché
    pub fn open(&self) -> Result<(), Icm42688Error> {
        self.lock()?.last_sample = None;
        Ok(())
    }

    /// Fin de sesión de lectura: descarta la muestra en caché
    pub fn close(&self) -> Result<(), Icm42688Error> {
        self.lock()?.last_sample = None;
        Ok(())
    }

    /// Lee una muestra del FIFO.
    ///
    /// Un paquete inválido se informa como `NotReady` (reintentar).
    pub fn read_sample(&self) -> Result<RawSample, Icm42688Error> {
        let mut device = self.lock()?;
        device.read_fifo_sample().map_err(|e| match e {
            Icm42688Error::PacketInvalid => Icm42688Error::NotReady,
            other => other,
        })
    }

    /// Lee una muestra y la copia en `buf`.
    ///
    /// `buf` debe tener al menos [`RawSample::SIZE`] bytes; si no, se rechaza
    /// sin acceder al bus. Nunca se escribe parcialmente.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, Icm42688Error> {
        if buf.len() < RawSample::SIZE {
            return Err(Icm42688Error::InvalidArgument);
        }
        let sample = self.read_sample()?;
        buf[..RawSample::SIZE].copy_from_slice(bytemuck::bytes_of(&sample));
        Ok(RawSample::SIZE)
    }

    /// Par de escalas actual (accel LSB/g, gyro LSB/dps x10)
    pub fn scales(&self) -> Result<ScalePair, Icm42688Error> {
        self.lock()?.resolve_scales()
    }

    /// Selector de escala del acelerómetro
    pub fn accel_fullscale(&self) -> Result<AccelFullScale, Icm42688Error> {
        self.lock()?.get_accel_fullscale()
    }

    /// Selector de escala del giroscopio
    pub fn gyro_fullscale(&self) -> Result<GyroFullScale, Icm42688Error> {
        self.lock()?.get_gyro_fullscale()
    }

    /// Byte raw de ACCEL_CONFIG0
    pub fn accel_config_raw(&self) -> Result<u8, Icm42688Error> {
        self.lock()?.accel_config_raw()
    }

    /// Byte raw de GYRO_CONFIG0
    pub fn gyro_config_raw(&self) -> Result<u8, Icm42688Error> {
        self.lock()?.gyro_config_raw()
    }

    /// Vuelve a ejecutar el arranque; sobre un dispositivo listo no hace nada
    pub fn initialize(&self) -> Result<(), Icm42688Error> {
        self.lock()?.initialize()
    }
}

impl<I2C, D> SensorHandle<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Dirección I2C fijada en el arranque
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Frecuencia de bus fijada en el arranque
    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Última muestra leída
    pub fn last_sample(&self) -> Result<Option<RawSample>, Icm42688Error> {
        Ok(self.lock()?.last_sample)
    }

    /// Desmonta el handle y devuelve el bus y el proveedor de esperas
    pub fn release(self) -> (I2C, D) {
        let device = self
            .device
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (interface, delay) = device.release();
        (interface.release(), delay)
    }
}

/// Prueba varias direcciones en orden y devuelve el primer handle que arranca.
///
/// Cada intento incluye el cambio automático a la dirección alternativa.
/// Si ninguno arranca se devuelve el error del último intento.
pub fn probe<I2C, D>(
    i2c: I2C,
    delay: D,
    addresses: &[u8],
    config: DeviceConfig,
) -> Result<SensorHandle<I2C, D>, InitError<I2C, D>>
where
    I2C: I2c,
    D: DelayNs,
{
    let mut i2c = i2c;
    let mut delay = delay;
    let mut error = Icm42688Error::InvalidArgument;

    for &addr in addresses {
        let cfg = DeviceConfig {
            address: addr,
            ..config.clone()
        };
        match SensorHandle::register(i2c, delay, cfg) {
            Ok(handle) => {
                log::info!("icm42688: registrado @0x{:02x}", handle.address());
                return Ok(handle);
            }
            Err(e) => {
                log::debug!("icm42688: sin dispositivo @0x{:02x}: {}", addr, e.error);
                error = e.error;
                (i2c, delay) = e.release();
            }
        }
    }

    Err(InitError { i2c, delay, error })
}
