//! Pipeline de acondicionamiento de muestras
//!
//! Convierte muestras raw a unidades físicas con las escalas cacheadas y
//! aplica, en orden:
//!
//! 1. Descarte de la primera muestra (transitorio de arranque).
//! 2. Vigilancia de escala: 5 tramas seguidas con |a| en (1.7, 2.3) o en
//!    (0.45, 0.65) duplican o dividen a la mitad el factor del acelerómetro,
//!    una sola vez por sesión.
//! 3. Detección de reposo: max|gyro| < 1 dps y ||a| - 1g| < 0.02 g.
//! 4. Estimación de sesgo por EMA lenta, solo en reposo. El eje Z estima la
//!    desviación respecto a 1 g.
//! 5. Eliminación del sesgo en todas las muestras.
//! 6. Filtro paso bajo de primer orden, inicializado con la primera muestra.
//! 7. Salida limitada a una de cada N muestras aceptadas.

use core::fmt;

use crate::base::Throttle;
use crate::config::PipelineConfig;
use crate::conversion::{
    accel_raw_to_g, double_accel_scale, gyro_raw_to_dps, halve_accel_scale, norm3,
};
use crate::types::{RawSample, ScalePair};

/// Muestra filtrada y sin sesgo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionedSample {
    /// Aceleración (g) [x, y, z]
    pub accel: [f32; 3],
    /// Velocidad angular (dps) [x, y, z]
    pub gyro: [f32; 3],
    /// Marca de tiempo en microsegundos
    pub timestamp_us: u64,
}

impl fmt::Display for ConditionedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AX={:.2}g AY={:.2}g AZ={:.2}g | GX={:.1}dps GY={:.1}dps GZ={:.1}dps",
            self.accel[0], self.accel[1], self.accel[2], self.gyro[0], self.gyro[1], self.gyro[2]
        )
    }
}

/// Corrección aplicada por la vigilancia de escala
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleCorrection {
    /// Factor anterior (LSB/g)
    pub from: u32,
    /// Factor nuevo (LSB/g)
    pub to: u32,
    /// Norma de la muestra recalculada con el factor nuevo
    pub norm_g: f32,
}

/// Resultado de procesar una muestra
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Primera muestra de la sesión, descartada
    Discarded,
    /// Faltan las escalas; la muestra no se ha procesado
    AwaitingScales,
    /// Muestra aceptada; el filtro se actualizó pero no toca emitir
    Filtered,
    /// Muestra aceptada y salida emitida
    Output(ConditionedSample),
}

#[derive(Debug, Clone, Default)]
struct ScaleWatchdog {
    high_count: u32,
    low_count: u32,
    corrected: bool,
    correction: Option<ScaleCorrection>,
}

/// Estado del pipeline de acondicionamiento
#[derive(Debug, Clone)]
pub struct Conditioner {
    config: PipelineConfig,
    scales: Option<ScalePair>,
    startup_discarded: bool,
    /// Sesgos [ax, ay, az, gx, gy, gz]
    bias: [f32; 6],
    /// Salidas filtradas [ax, ay, az, gx, gy, gz]
    filtered: [f32; 6],
    filter_initialized: bool,
    watchdog: ScaleWatchdog,
    throttle: Throttle,
    accepted: u64,
}

impl Default for Conditioner {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Conditioner {
    pub fn new(config: PipelineConfig) -> Self {
        let throttle = Throttle::new(config.output_every);
        Self {
            config,
            scales: None,
            startup_discarded: false,
            bias: [0.0; 6],
            filtered: [0.0; 6],
            filter_initialized: false,
            watchdog: ScaleWatchdog::default(),
            throttle,
            accepted: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Cachea las escalas resueltas por el dispositivo
    pub fn set_scales(&mut self, scales: ScalePair) {
        self.scales = Some(scales);
    }

    pub fn scales(&self) -> Option<ScalePair> {
        self.scales
    }

    pub fn has_scales(&self) -> bool {
        self.scales.is_some()
    }

    pub fn bias(&self) -> [f32; 6] {
        self.bias
    }

    pub fn filtered(&self) -> [f32; 6] {
        self.filtered
    }

    pub fn is_filter_initialized(&self) -> bool {
        self.filter_initialized
    }

    /// Muestras aceptadas (las que llegan al filtro)
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Corrección aplicada por la vigilancia de escala, si la hubo
    pub fn scale_correction(&self) -> Option<ScaleCorrection> {
        self.watchdog.correction
    }

    /// Procesa una muestra raw
    pub fn process(&mut self, raw: &RawSample, timestamp_us: u64) -> Outcome {
        if !self.startup_discarded {
            self.startup_discarded = true;
            log::debug!("icm42688: primera muestra descartada");
            return Outcome::Discarded;
        }

        let Some(scales) = self.scales else {
            return Outcome::AwaitingScales;
        };

        let mut accel = accel_raw_to_g(raw.accel(), scales.accel_lsb_per_g());
        let gyro = gyro_raw_to_dps(raw.gyro(), scales.gyro_lsb_per_dps());
        let mut norm = norm3(accel);

        if let Some(lsb_per_g) = self.watch_scale(norm) {
            accel = accel_raw_to_g(raw.accel(), lsb_per_g as f32);
            norm = norm3(accel);
            if let Some(correction) = self.watchdog.correction.as_mut() {
                correction.norm_g = norm;
            }
        }

        let gyro_abs_max = gyro.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        let stable = gyro_abs_max < self.config.gyro_stable_dps
            && (norm - 1.0).abs() < self.config.accel_norm_tolerance_g;

        if stable {
            let beta = self.config.bias_beta;
            let targets = [
                accel[0],
                accel[1],
                accel[2] - 1.0,
                gyro[0],
                gyro[1],
                gyro[2],
            ];
            for (bias, target) in self.bias.iter_mut().zip(targets) {
                *bias = (1.0 - beta) * *bias + beta * target;
            }
        }

        let values = [
            accel[0] - self.bias[0],
            accel[1] - self.bias[1],
            accel[2] - self.bias[2],
            gyro[0] - self.bias[3],
            gyro[1] - self.bias[4],
            gyro[2] - self.bias[5],
        ];

        if self.filter_initialized {
            let alpha = self.config.filter_alpha;
            for (filtered, value) in self.filtered.iter_mut().zip(values) {
                *filtered = alpha * value + (1.0 - alpha) * *filtered;
            }
        } else {
            self.filtered = values;
            self.filter_initialized = true;
        }

        self.accepted += 1;

        if self.throttle.tick() {
            let f = self.filtered;
            Outcome::Output(ConditionedSample {
                accel: [f[0], f[1], f[2]],
                gyro: [f[3], f[4], f[5]],
                timestamp_us,
            })
        } else {
            Outcome::Filtered
        }
    }

    /// Vigilancia de escala del acelerómetro. Devuelve el factor nuevo si
    /// esta trama dispara la corrección.
    fn watch_scale(&mut self, norm: f32) -> Option<u32> {
        if self.watchdog.corrected {
            return None;
        }
        let current = self.scales?.accel_lsb_per_g;
        let trigger = self.config.anomaly_trigger_frames;

        let corrected = if self.config.high_norm_band.contains(norm) {
            self.watchdog.low_count = 0;
            self.watchdog.high_count += 1;
            if self.watchdog.high_count >= trigger {
                double_accel_scale(current)
            } else {
                None
            }
        } else if self.config.low_norm_band.contains(norm) {
            self.watchdog.high_count = 0;
            self.watchdog.low_count += 1;
            if self.watchdog.low_count >= trigger {
                halve_accel_scale(current)
            } else {
                None
            }
        } else {
            self.watchdog.high_count = 0;
            self.watchdog.low_count = 0;
            None
        }?;

        if let Some(scales) = self.scales.as_mut() {
            scales.accel_lsb_per_g = corrected;
        }
        self.watchdog.corrected = true;
        self.watchdog.high_count = 0;
        self.watchdog.low_count = 0;
        self.watchdog.correction = Some(ScaleCorrection {
            from: current,
            to: corrected,
            norm_g: norm,
        });
        log::info!(
            "icm42688: escala accel de la aplicación {} -> {} (|a|={:.3}g)",
            current,
            corrected,
            norm
        );
        Some(corrected)
    }
}
