//! Definiciones de tipos y constantes comunes para el ICM42688

use bytemuck::{Pod, Zeroable};

use crate::register::bits;

/// Escalas completas del giroscopio según el selector de bits [5:4]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GyroFullScale {
    /// ±2000 dps (16.4 LSB/dps)
    Fs2000Dps = 0,
    /// ±1000 dps (32.8 LSB/dps)
    Fs1000Dps = 1,
    /// ±500 dps (65.6 LSB/dps)
    Fs500Dps = 2,
    /// ±250 dps (131.0 LSB/dps)
    Fs250Dps = 3,
}

impl Default for GyroFullScale {
    fn default() -> Self {
        GyroFullScale::Fs2000Dps
    }
}

impl From<u8> for GyroFullScale {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => GyroFullScale::Fs2000Dps,
            1 => GyroFullScale::Fs1000Dps,
            2 => GyroFullScale::Fs500Dps,
            _ => GyroFullScale::Fs250Dps,
        }
    }
}

impl GyroFullScale {
    /// Extrae el selector de un byte GYRO_CONFIG0
    pub fn from_config_byte(byte: u8) -> Self {
        Self::from((byte & bits::FS_SEL_MASK) >> bits::FS_SEL_SHIFT)
    }

    /// LSB por grado/segundo multiplicado por 10 (16.4 -> 164)
    pub fn lsb_per_dps_x10(self) -> u32 {
        match self {
            GyroFullScale::Fs2000Dps => 164,
            GyroFullScale::Fs1000Dps => 328,
            GyroFullScale::Fs500Dps => 656,
            GyroFullScale::Fs250Dps => 1310,
        }
    }
}

/// Escalas completas del acelerómetro según el selector de bits [5:4]
///
/// El mapeo de referencia asigna los selectores 0 y 2 al mismo factor
/// (16384 LSB/g). Se conserva tal cual: es la calibración empírica del
/// hardware de referencia.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccelFullScale {
    /// ±2g
    Fs2G = 0,
    /// ±4g
    Fs4G = 1,
    /// Selector 2, tratado como ±2g
    Fs2GAlias = 2,
    /// ±16g
    Fs16G = 3,
}

impl Default for AccelFullScale {
    fn default() -> Self {
        AccelFullScale::Fs2G
    }
}

impl From<u8> for AccelFullScale {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => AccelFullScale::Fs2G,
            1 => AccelFullScale::Fs4G,
            2 => AccelFullScale::Fs2GAlias,
            _ => AccelFullScale::Fs16G,
        }
    }
}

impl AccelFullScale {
    /// Extrae el selector de un byte ACCEL_CONFIG0
    pub fn from_config_byte(byte: u8) -> Self {
        Self::from((byte & bits::FS_SEL_MASK) >> bits::FS_SEL_SHIFT)
    }

    /// LSB por g
    pub fn lsb_per_g(self) -> u32 {
        match self {
            AccelFullScale::Fs2G => 16384,
            AccelFullScale::Fs4G => 8192,
            AccelFullScale::Fs2GAlias => 16384,
            AccelFullScale::Fs16G => 2048,
        }
    }
}

/// Muestra cruda de seis ejes en cuentas del sensor
///
/// La disposición en memoria es fija (`repr(C)`, seis `i16` sin relleno),
/// por lo que se puede copiar directamente a un buffer de bytes del usuario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RawSample {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_x: i16,
    pub gyro_y: i16,
    pub gyro_z: i16,
}

impl RawSample {
    /// Tamaño en bytes de una muestra
    pub const SIZE: usize = core::mem::size_of::<RawSample>();

    pub fn new(accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self {
            accel_x: accel[0],
            accel_y: accel[1],
            accel_z: accel[2],
            gyro_x: gyro[0],
            gyro_y: gyro[1],
            gyro_z: gyro[2],
        }
    }

    pub fn accel(&self) -> [i16; 3] {
        [self.accel_x, self.accel_y, self.accel_z]
    }

    pub fn gyro(&self) -> [i16; 3] {
        [self.gyro_x, self.gyro_y, self.gyro_z]
    }

    /// Reconstruye una muestra desde un buffer de al menos `SIZE` bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&bytes[..Self::SIZE]))
    }
}

/// Par de factores de conversión
///
/// * `accel_lsb_per_g`: cuentas por g (entero)
/// * `gyro_lsb_per_dps_x10`: cuentas por grado/segundo con una décima de precisión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalePair {
    pub accel_lsb_per_g: u32,
    pub gyro_lsb_per_dps_x10: u32,
}

impl ScalePair {
    pub fn new(accel: AccelFullScale, gyro: GyroFullScale) -> Self {
        Self {
            accel_lsb_per_g: accel.lsb_per_g(),
            gyro_lsb_per_dps_x10: gyro.lsb_per_dps_x10(),
        }
    }

    pub fn accel_lsb_per_g(&self) -> f32 {
        self.accel_lsb_per_g as f32
    }

    pub fn gyro_lsb_per_dps(&self) -> f32 {
        self.gyro_lsb_per_dps_x10 as f32 / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_selector_two_aliases_to_2g() {
        // bits [5:4] = 10
        let sel = AccelFullScale::from_config_byte(0b0010_0000);
        assert_eq!(sel, AccelFullScale::Fs2GAlias);
        assert_eq!(sel.lsb_per_g(), 16384);
        assert_eq!(sel.lsb_per_g(), AccelFullScale::Fs2G.lsb_per_g());
    }

    #[test]
    fn test_accel_table() {
        let table: Vec<u32> = (0u8..4)
            .map(|s| AccelFullScale::from_config_byte(s << 4).lsb_per_g())
            .collect();
        assert_eq!(table, vec![16384, 8192, 16384, 2048]);
    }

    #[test]
    fn test_gyro_table() {
        let table: Vec<u32> = (0u8..4)
            .map(|s| GyroFullScale::from_config_byte(s << 4).lsb_per_dps_x10())
            .collect();
        assert_eq!(table, vec![164, 328, 656, 1310]);
    }

    #[test]
    fn test_baseline_config_byte() {
        // 0x66 = 0b0110_0110 -> selector 2
        assert_eq!(AccelFullScale::from_config_byte(0x66).lsb_per_g(), 16384);
        assert_eq!(GyroFullScale::from_config_byte(0x66).lsb_per_dps_x10(), 656);
    }

    #[test]
    fn test_raw_sample_layout() {
        assert_eq!(RawSample::SIZE, 12);
        let s = RawSample::new([1, -2, 3], [-4, 5, -6]);
        let bytes = bytemuck::bytes_of(&s);
        assert_eq!(RawSample::from_bytes(bytes), Some(s));
        assert_eq!(RawSample::from_bytes(&bytes[..11]), None);
    }

    #[test]
    fn test_scale_pair_gyro_tenths() {
        let pair = ScalePair { accel_lsb_per_g: 2048, gyro_lsb_per_dps_x10: 164 };
        assert!((pair.gyro_lsb_per_dps() - 16.4).abs() < 1e-6);
        assert_eq!(pair.accel_lsb_per_g(), 2048.0);
    }
}
