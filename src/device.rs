//! Núcleo del driver ICM42688: acceso a registros y máquina de estados de arranque

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::config::DeviceConfig;
use crate::interface::Interface;
use crate::register::{address, bank0, bits};
use crate::types::RawSample;

/// Estructura del dispositivo
pub struct Icm42688<I, D> {
    pub(crate) interface: I,
    pub(crate) delay: D,
    pub(crate) config: DeviceConfig,
    pub(crate) state: BringUpState,
    pub(crate) last_sample: Option<RawSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icm42688Error {
    /// Fallo de la transacción en el bus
    Bus,
    /// WHO_AM_I no coincide tras agotar reintentos y el cambio de dirección
    IdentityMismatch { found: u8 },
    /// Paquete del FIFO más corto de lo esperado
    PacketInvalid,
    /// No hay muestra disponible todavía; reintentar
    NotReady,
    /// Argumento inválido (buffer demasiado pequeño, etc.)
    InvalidArgument,
    /// Estado del dispositivo inválido (no inicializado, lock envenenado)
    Device,
}

impl fmt::Display for Icm42688Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Icm42688Error::Bus => write!(f, "error de transacción en el bus"),
            Icm42688Error::IdentityMismatch { found } => write!(
                f,
                "WHO_AM_I inválido: 0x{:02x} (esperado 0x{:02x})",
                found,
                bits::WHO_AM_I_VALUE
            ),
            Icm42688Error::PacketInvalid => write!(f, "paquete FIFO inválido"),
            Icm42688Error::NotReady => write!(f, "muestra no disponible, reintentar"),
            Icm42688Error::InvalidArgument => write!(f, "argumento inválido"),
            Icm42688Error::Device => write!(f, "estado del dispositivo inválido"),
        }
    }
}

impl std::error::Error for Icm42688Error {}

/// Estados de la máquina de arranque
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpState {
    /// Sin inicializar o reset pendiente
    Reset,
    /// Verificando WHO_AM_I
    IdentityCheck,
    /// Cambiando a la dirección alternativa
    AddressFallback,
    /// Programando registros base
    Configure,
    /// Listo para leer muestras
    Ready,
    /// Fallo irrecuperable
    Failed,
}

impl<I, D> Icm42688<I, D>
where
    I: Interface,
    D: DelayNs,
    Icm42688Error: From<I::Error>,
{
    /// Crea una nueva instancia sin inicializar
    pub fn new(interface: I, delay: D, config: DeviceConfig) -> Self {
        Self {
            interface,
            delay,
            config,
            state: BringUpState::Reset,
            last_sample: None,
        }
    }

    /// Lee un registro
    pub fn read_reg(&mut self, reg: u8) -> Result<u8, Icm42688Error> {
        let mut data = [0u8];
        self.interface.read_reg(reg, &mut data)?;
        Ok(data[0])
    }

    /// Lee varios registros consecutivos (o una ráfaga de un puerto)
    pub fn read_regs(&mut self, reg: u8, data: &mut [u8]) -> Result<(), Icm42688Error> {
        self.interface.read_reg(reg, data)?;
        Ok(())
    }

    /// Escribe un registro
    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Icm42688Error> {
        self.interface.write_reg(reg, &[value])?;
        Ok(())
    }

    /// Arranque completo: reset, verificación de identidad (con cambio de
    /// dirección si falla) y configuración base.
    ///
    /// Llamarlo sobre un dispositivo ya listo no hace nada.
    pub fn initialize(&mut self) -> Result<(), Icm42688Error> {
        if self.state == BringUpState::Ready {
            return Ok(());
        }

        let primary = self.config.address;
        self.interface.set_address(primary);
        let mut fallback_used = false;
        self.state = BringUpState::Reset;

        loop {
            log::debug!(
                "icm42688: estado {:?} @0x{:02x}",
                self.state,
                self.interface.address()
            );
            self.state = match self.state {
                BringUpState::Reset => match self.soft_reset() {
                    Ok(()) => BringUpState::IdentityCheck,
                    Err(e) => return self.fail(e),
                },
                BringUpState::IdentityCheck => match self.check_identity() {
                    Ok(()) => BringUpState::Configure,
                    Err(_) if !fallback_used => BringUpState::AddressFallback,
                    Err(e) => return self.fail(e),
                },
                BringUpState::AddressFallback => {
                    fallback_used = true;
                    let alt = address::alternate(primary);
                    log::warn!(
                        "icm42688: sin respuesta válida en 0x{:02x}, probando 0x{:02x}",
                        primary,
                        alt
                    );
                    self.interface.set_address(alt);
                    BringUpState::Reset
                }
                BringUpState::Configure => match self.configure_default() {
                    Ok(()) => BringUpState::Ready,
                    Err(e) => return self.fail(e),
                },
                BringUpState::Ready => {
                    log::info!(
                        "icm42688: listo en 0x{:02x} ({} Hz)",
                        self.interface.address(),
                        self.interface.frequency_hz()
                    );
                    return Ok(());
                }
                BringUpState::Failed => return Err(Icm42688Error::Device),
            };
        }
    }

    fn fail(&mut self, error: Icm42688Error) -> Result<(), Icm42688Error> {
        log::error!("icm42688: arranque fallido: {}", error);
        self.state = BringUpState::Failed;
        Err(error)
    }

    /// Reset software vía DEVICE_CONFIG y espera a que el dispositivo responda
    pub fn soft_reset(&mut self) -> Result<(), Icm42688Error> {
        self.write_reg(bank0::DEVICE_CONFIG, bits::DEVICE_RESET)?;
        self.delay.delay_ms(self.config.reset_settle_ms);
        Ok(())
    }

    /// Verifica WHO_AM_I con reintentos; los errores de bus cuentan como intento fallido
    pub fn check_identity(&mut self) -> Result<(), Icm42688Error> {
        let retry = self.config.identity_retry;
        let mut last = 0xFF;
        let Self {
            interface, delay, ..
        } = self;

        let result = retry.run(delay, |_| {
            let mut id = [0u8];
            if interface.read_reg(bank0::WHO_AM_I, &mut id).is_err() {
                return Err(());
            }
            last = id[0];
            if id[0] == bits::WHO_AM_I_VALUE {
                Ok(())
            } else {
                Err(())
            }
        });

        result.map_err(|_| {
            log::warn!(
                "icm42688: WHO_AM_I agotó reintentos, último=0x{:02x} (esperado 0x{:02x})",
                last,
                bits::WHO_AM_I_VALUE
            );
            Icm42688Error::IdentityMismatch { found: last }
        })
    }

    /// Configuración base: modo LN, ODR/FS y FIFO en modo stream.
    ///
    /// Los fallos al habilitar el FIFO solo se registran: existe una ruta de
    /// lectura directa de registros.
    pub fn configure_default(&mut self) -> Result<(), Icm42688Error> {
        self.write_reg(bank0::PWR_MGMT0, self.config.power_mode)?;
        self.write_reg(bank0::GYRO_CONFIG0, self.config.gyro_config0)?;
        self.write_reg(bank0::ACCEL_CONFIG0, self.config.accel_config0)?;

        if let Err(e) = self.write_reg(bank0::FIFO_CONFIG_INIT, self.config.fifo_config_init) {
            log::warn!("icm42688: no se pudo activar el FIFO: {}", e);
        }
        if let Err(e) = self.write_reg(bank0::FIFO_CONFIGURATION, self.config.fifo_sources) {
            log::warn!("icm42688: no se pudieron seleccionar las fuentes del FIFO: {}", e);
        }

        self.delay.delay_ms(self.config.configure_settle_ms);
        Ok(())
    }
}

impl<I, D> Icm42688<I, D>
where
    I: Interface,
{
    /// Estado actual de la máquina de arranque
    pub fn state(&self) -> BringUpState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BringUpState::Ready
    }

    /// Dirección I2C en uso
    pub fn address(&self) -> u8 {
        self.interface.address()
    }

    /// Frecuencia de bus en Hz
    pub fn frequency_hz(&self) -> u32 {
        self.interface.frequency_hz()
    }

    /// Última muestra leída
    pub fn last_sample(&self) -> Option<RawSample> {
        self.last_sample
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Consume el dispositivo y devuelve la interfaz y el proveedor de esperas
    pub fn release(self) -> (I, D) {
        (self.interface, self.delay)
    }
}
