//! Configuración del dispositivo y del pipeline de acondicionamiento

use crate::base::Retry;
use crate::register::{address, bits};

/// Configuración de arranque del ICM42688
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Dirección I2C de 7 bits (primaria; la alternativa se prueba si falla)
    pub address: u8,
    /// Frecuencia de bus en Hz (0 = 400 kHz)
    pub frequency_hz: u32,
    /// Espera tras el reset software (ms)
    pub reset_settle_ms: u32,
    /// Reintentos de lectura de WHO_AM_I
    pub identity_retry: Retry,
    /// Valor a escribir en PWR_MGMT0
    pub power_mode: u8,
    /// Valor a escribir en GYRO_CONFIG0 (ODR + FS_SEL)
    pub gyro_config0: u8,
    /// Valor a escribir en ACCEL_CONFIG0 (ODR + FS_SEL)
    pub accel_config0: u8,
    /// Valor a escribir en FIFO_CONFIG_INIT
    pub fifo_config_init: u8,
    /// Valor a escribir en FIFO_CONFIGURATION
    pub fifo_sources: u8,
    /// Espera tras la configuración (ms)
    pub configure_settle_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: address::PRIMARY,
            frequency_hz: 0,
            reset_settle_ms: 200,
            identity_retry: Retry::new(50, 20),
            power_mode: bits::PWR_LN_GYRO_ACCEL,
            gyro_config0: bits::CONFIG0_BASELINE,
            accel_config0: bits::CONFIG0_BASELINE,
            fifo_config_init: bits::FIFO_STREAM_MODE,
            fifo_sources: bits::FIFO_SOURCES_ACCEL_GYRO_TEMP,
            configure_settle_ms: 100,
        }
    }
}

impl DeviceConfig {
    /// Configuración por defecto con otra dirección
    pub fn with_address(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }
}

/// Banda abierta (min, max) de norma de aceleración en g
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormBand {
    pub min: f32,
    pub max: f32,
}

impl NormBand {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, norm: f32) -> bool {
        norm > self.min && norm < self.max
    }
}

/// Límite superior (exclusivo) para duplicar el factor del acelerómetro
pub const ACCEL_SCALE_MAX: u32 = 65536;
/// Límite inferior (exclusivo) para dividir a la mitad el factor del acelerómetro
pub const ACCEL_SCALE_MIN: u32 = 512;

/// Configuración del pipeline de acondicionamiento
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tasa de la media móvil exponencial del sesgo (lenta)
    pub bias_beta: f32,
    /// Coeficiente del filtro paso bajo de primer orden
    pub filter_alpha: f32,
    /// Umbral de estabilidad del giroscopio (dps)
    pub gyro_stable_dps: f32,
    /// Tolerancia de estabilidad |norma - 1g|
    pub accel_norm_tolerance_g: f32,
    /// Banda de norma que sugiere factor a la mitad del correcto
    pub high_norm_band: NormBand,
    /// Banda de norma que sugiere factor al doble del correcto
    pub low_norm_band: NormBand,
    /// Tramas consecutivas en banda anómala antes de corregir
    pub anomaly_trigger_frames: u32,
    /// Emitir una salida cada N muestras aceptadas
    pub output_every: u32,
    /// Pausa tras descartar la primera muestra (ms)
    pub startup_discard_ms: u32,
    /// Pausa tras una lectura fallida (ms)
    pub read_backoff_ms: u32,
    /// Pausa tras fallar la consulta de escalas (ms)
    pub scale_retry_ms: u32,
    /// Intervalo entre muestras (ms)
    pub sample_interval_ms: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bias_beta: 0.005,
            filter_alpha: 0.15,
            gyro_stable_dps: 1.0,
            accel_norm_tolerance_g: 0.02,
            high_norm_band: NormBand::new(1.7, 2.3),
            low_norm_band: NormBand::new(0.45, 0.65),
            anomaly_trigger_frames: 5,
            output_every: 10,
            startup_discard_ms: 10,
            read_backoff_ms: 10,
            scale_retry_ms: 100,
            sample_interval_ms: 100,
        }
    }
}
