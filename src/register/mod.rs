//! Definiciones de registros para el ICM42688
//!
//! Solo se usan registros del Banco 0, que es el banco activo tras un reset.
//! Las direcciones son absolutas.

/// Registros del Banco 0
pub mod bank0 {
    // Registros de control del dispositivo
    pub const DEVICE_CONFIG: u8 = 0x11;
    pub const FIFO_CONFIG_INIT: u8 = 0x16;

    // Registros de datos del acelerómetro (AX_H, AX_L, AY_H, ... GZ_L contiguos)
    pub const ACCEL_DATA_X1: u8 = 0x1F;
    pub const ACCEL_DATA_X0: u8 = 0x20;
    pub const ACCEL_DATA_Y1: u8 = 0x21;
    pub const ACCEL_DATA_Y0: u8 = 0x22;
    pub const ACCEL_DATA_Z1: u8 = 0x23;
    pub const ACCEL_DATA_Z0: u8 = 0x24;

    // Registros de datos del giroscopio
    pub const GYRO_DATA_X1: u8 = 0x25;
    pub const GYRO_DATA_X0: u8 = 0x26;
    pub const GYRO_DATA_Y1: u8 = 0x27;
    pub const GYRO_DATA_Y0: u8 = 0x28;
    pub const GYRO_DATA_Z1: u8 = 0x29;
    pub const GYRO_DATA_Z0: u8 = 0x2A;

    // Puerto de datos del FIFO
    pub const FIFO_DATA: u8 = 0x30;

    // Registros de energía y configuración de sensores
    pub const PWR_MGMT0: u8 = 0x4E;
    pub const GYRO_CONFIG0: u8 = 0x4F;
    pub const ACCEL_CONFIG0: u8 = 0x50;

    // Selección de fuentes del FIFO
    pub const FIFO_CONFIGURATION: u8 = 0x5F;

    // Registro de identificación
    pub const WHO_AM_I: u8 = 0x75;
}

/// Valores y bits útiles para configuración y control
pub mod bits {
    /// DEVICE_CONFIG bit 0: reset software
    pub const DEVICE_RESET: u8 = 0x01;

    /// Valor esperado en WHO_AM_I
    pub const WHO_AM_I_VALUE: u8 = 0x47;

    /// PWR_MGMT0: GYRO_MODE [3:2] = 11 (LN), ACCEL_MODE [1:0] = 11 (LN)
    pub const PWR_LN_GYRO_ACCEL: u8 = 0x0F;

    /// Valor de ODR + FS_SEL validado en la placa para GYRO_CONFIG0 / ACCEL_CONFIG0
    pub const CONFIG0_BASELINE: u8 = 0x66;

    /// FIFO_CONFIG_INIT: modo stream
    pub const FIFO_STREAM_MODE: u8 = 0x40;

    /// FIFO_CONFIGURATION: accel + gyro (+ temp) dentro del paquete
    pub const FIFO_SOURCES_ACCEL_GYRO_TEMP: u8 = 0x07;

    /// Máscara del selector de escala completa, bits [5:4]
    pub const FS_SEL_MASK: u8 = 0x30;
    pub const FS_SEL_SHIFT: u8 = 4;
}

/// Direcciones I2C del dispositivo (pin AD0 a masa o a VDD)
pub mod address {
    pub const PRIMARY: u8 = 0x68;
    pub const SECONDARY: u8 = 0x69;

    /// Devuelve la dirección alternativa del par 0x68/0x69.
    ///
    /// Cualquier otra dirección se considera primaria y su alternativa es 0x68.
    pub fn alternate(addr: u8) -> u8 {
        if addr == PRIMARY {
            SECONDARY
        } else {
            PRIMARY
        }
    }
}
