//! Funciones de conversión y resolución de escalas del ICM42688
//!
//! Este módulo lee la configuración de escala completa del dispositivo, la
//! traduce a factores de conversión (cuentas por unidad física) y convierte
//! datos raw a g y grados por segundo.

use embedded_hal::delay::DelayNs;

use crate::config::{NormBand, ACCEL_SCALE_MAX, ACCEL_SCALE_MIN};
use crate::device::{Icm42688, Icm42688Error};
use crate::interface::Interface;
use crate::register::bank0;
use crate::types::{AccelFullScale, GyroFullScale, ScalePair};

/// Norma que indica un factor de acelerómetro a la mitad del correcto
pub const RESOLVER_HIGH_BAND: NormBand = NormBand::new(1.7, 2.2);
/// Norma que indica un factor de acelerómetro al doble del correcto
pub const RESOLVER_LOW_BAND: NormBand = NormBand::new(0.45, 0.65);

/// Convierte datos brutos de acelerómetro a g
///
/// # Arguments
/// * `raw` - Valores brutos del acelerómetro [x, y, z]
/// * `lsb_per_g` - Cuentas por g
pub fn accel_raw_to_g(raw: [i16; 3], lsb_per_g: f32) -> [f32; 3] {
    [
        raw[0] as f32 / lsb_per_g,
        raw[1] as f32 / lsb_per_g,
        raw[2] as f32 / lsb_per_g,
    ]
}

/// Convierte datos brutos de giroscopio a grados/segundo
///
/// # Arguments
/// * `raw` - Valores brutos del giroscopio [x, y, z]
/// * `lsb_per_dps` - Cuentas por grado/segundo
pub fn gyro_raw_to_dps(raw: [i16; 3], lsb_per_dps: f32) -> [f32; 3] {
    [
        raw[0] as f32 / lsb_per_dps,
        raw[1] as f32 / lsb_per_dps,
        raw[2] as f32 / lsb_per_dps,
    ]
}

/// Norma euclídea de un vector de tres ejes
pub fn norm3(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Duplica el factor si queda por debajo del límite superior
pub fn double_accel_scale(lsb_per_g: u32) -> Option<u32> {
    (lsb_per_g < ACCEL_SCALE_MAX).then(|| lsb_per_g * 2)
}

/// Divide el factor a la mitad si queda por encima del límite inferior
pub fn halve_accel_scale(lsb_per_g: u32) -> Option<u32> {
    (lsb_per_g > ACCEL_SCALE_MIN).then(|| lsb_per_g / 2)
}

/// Corrección puntual del factor del acelerómetro a partir de la norma
/// medida en reposo. Devuelve el factor sin cambios si la norma es plausible.
pub fn verify_accel_scale(lsb_per_g: u32, norm_g: f32) -> u32 {
    if RESOLVER_HIGH_BAND.contains(norm_g) {
        if let Some(doubled) = double_accel_scale(lsb_per_g) {
            return doubled;
        }
    } else if RESOLVER_LOW_BAND.contains(norm_g) {
        if let Some(halved) = halve_accel_scale(lsb_per_g) {
            return halved;
        }
    }
    lsb_per_g
}

impl<I, D> Icm42688<I, D>
where
    I: Interface,
    D: DelayNs,
    Icm42688Error: From<I::Error>,
{
    /// Valor raw de ACCEL_CONFIG0 (diagnóstico, no modifica el dispositivo)
    pub fn accel_config_raw(&mut self) -> Result<u8, Icm42688Error> {
        self.read_reg(bank0::ACCEL_CONFIG0)
    }

    /// Valor raw de GYRO_CONFIG0 (diagnóstico, no modifica el dispositivo)
    pub fn gyro_config_raw(&mut self) -> Result<u8, Icm42688Error> {
        self.read_reg(bank0::GYRO_CONFIG0)
    }

    /// Selector de escala completa del acelerómetro (bits [5:4])
    pub fn get_accel_fullscale(&mut self) -> Result<AccelFullScale, Icm42688Error> {
        let raw = self.accel_config_raw()?;
        let fs = AccelFullScale::from_config_byte(raw);
        log::info!(
            "icm42688: ACCEL_CONFIG0=0x{:02x} (raw), FS_SEL={}",
            raw,
            fs as u8
        );
        Ok(fs)
    }

    /// Selector de escala completa del giroscopio (bits [5:4])
    pub fn get_gyro_fullscale(&mut self) -> Result<GyroFullScale, Icm42688Error> {
        let raw = self.gyro_config_raw()?;
        let fs = GyroFullScale::from_config_byte(raw);
        log::info!(
            "icm42688: GYRO_CONFIG0=0x{:02x} (raw), FS_SEL={}",
            raw,
            fs as u8
        );
        Ok(fs)
    }

    /// Resuelve el par de escalas actual.
    ///
    /// Tras leer la configuración se toma una lectura directa de registros y,
    /// si la norma del acelerómetro sugiere un factor a la mitad o al doble
    /// del correcto, se corrige una sola vez. Si la lectura de verificación
    /// falla se devuelven los valores de la tabla.
    pub fn resolve_scales(&mut self) -> Result<ScalePair, Icm42688Error> {
        let accel_raw = self.accel_config_raw()?;
        let gyro_raw = self.gyro_config_raw()?;
        let mut scales = ScalePair::new(
            AccelFullScale::from_config_byte(accel_raw),
            GyroFullScale::from_config_byte(gyro_raw),
        );

        match self.read_direct_sample() {
            Ok(sample) => {
                let accel = accel_raw_to_g(sample.accel(), scales.accel_lsb_per_g());
                let norm = norm3(accel);
                let verified = verify_accel_scale(scales.accel_lsb_per_g, norm);
                if verified != scales.accel_lsb_per_g {
                    log::info!(
                        "icm42688: escala accel corregida {} -> {} (|a|={:.3}g)",
                        scales.accel_lsb_per_g,
                        verified,
                        norm
                    );
                    scales.accel_lsb_per_g = verified;
                }
            }
            Err(e) => log::debug!("icm42688: verificación de escala omitida: {}", e),
        }

        Ok(scales)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_factors() {
        assert_eq!(accel_raw_to_g([16384, -8192, 0], 16384.0), [1.0, -0.5, 0.0]);
        let dps = gyro_raw_to_dps([164, -328, 0], 16.4);
        assert!((dps[0] - 10.0).abs() < 1e-4);
        assert!((dps[1] + 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_norm3() {
        assert!((norm3([3.0, 4.0, 0.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_verify_doubles_when_norm_near_two() {
        assert_eq!(verify_accel_scale(8192, 2.0), 16384);
        // Fuera de la banda (límite abierto en 2.2)
        assert_eq!(verify_accel_scale(8192, 2.2), 8192);
    }

    #[test]
    fn test_verify_halves_when_norm_near_half() {
        assert_eq!(verify_accel_scale(16384, 0.5), 8192);
        assert_eq!(verify_accel_scale(16384, 0.45), 16384);
    }

    #[test]
    fn test_verify_respects_caps() {
        assert_eq!(verify_accel_scale(65536, 2.0), 65536);
        assert_eq!(verify_accel_scale(32768, 2.0), 65536);
        assert_eq!(verify_accel_scale(512, 0.5), 512);
        assert_eq!(verify_accel_scale(1024, 0.5), 512);
    }

    #[test]
    fn test_verify_keeps_plausible_norm() {
        assert_eq!(verify_accel_scale(2048, 1.0), 2048);
    }
}
