//! Bucle de adquisición
//!
//! Consume muestras del [`SensorHandle`], las pasa por el [`Conditioner`] y
//! entrega las salidas limitadas al llamador. Las lecturas fallidas se
//! saltan sin tocar el estado del pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::base::TimeSource;
use crate::conditioning::{ConditionedSample, Conditioner, Outcome};
use crate::config::PipelineConfig;
use crate::device::Icm42688Error;
use crate::handle::SensorHandle;

/// Registra SIGINT y SIGTERM sobre un flag compartido.
///
/// El flag pasa a `true` cuando llega cualquiera de las dos señales.
pub fn stop_on_signals() -> std::io::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&stop))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&stop))?;
    Ok(stop)
}

/// Consumidor del handle con su propio estado de acondicionamiento
pub struct Acquisition<'a, I2C, HD, D, T> {
    handle: &'a SensorHandle<I2C, HD>,
    conditioner: Conditioner,
    delay: D,
    clock: T,
}

impl<'a, I2C, HD, D, T> Acquisition<'a, I2C, HD, D, T>
where
    I2C: I2c,
    HD: DelayNs,
    D: DelayNs,
    T: TimeSource,
{
    pub fn new(handle: &'a SensorHandle<I2C, HD>, config: PipelineConfig, delay: D, clock: T) -> Self {
        Self {
            handle,
            conditioner: Conditioner::new(config),
            delay,
            clock,
        }
    }

    pub fn conditioner(&self) -> &Conditioner {
        &self.conditioner
    }

    /// Una iteración del bucle.
    ///
    /// Devuelve el error de la lectura o de la consulta de escalas cuando la
    /// iteración se salta; en ese caso ya se ha aplicado la pausa de reintento.
    /// Tras una lectura fallida también se respeta el intervalo entre muestras.
    pub fn step(&mut self) -> Result<Outcome, Icm42688Error> {
        let config = self.conditioner.config().clone();

        let sample = match self.handle.read_sample() {
            Ok(sample) => sample,
            Err(e) => {
                log::debug!("icm42688: lectura fallida, se reintenta: {}", e);
                self.delay.delay_ms(config.read_backoff_ms);
                self.delay.delay_ms(config.sample_interval_ms);
                return Err(e);
            }
        };
        let timestamp_us = self.clock.get_timestamp_us();
        let corrected_before = self.conditioner.scale_correction().is_some();

        let mut outcome = self.conditioner.process(&sample, timestamp_us);

        if outcome == Outcome::Discarded {
            self.delay.delay_ms(config.startup_discard_ms);
            return Ok(outcome);
        }

        if outcome == Outcome::AwaitingScales {
            match self.handle.scales() {
                Ok(scales) => {
                    log::info!(
                        "icm42688: escalas accel={} LSB/g gyro={} LSB/dps",
                        scales.accel_lsb_per_g,
                        scales.gyro_lsb_per_dps()
                    );
                    self.conditioner.set_scales(scales);
                    outcome = self.conditioner.process(&sample, timestamp_us);
                }
                Err(e) => {
                    log::warn!("icm42688: no se pudieron obtener las escalas: {}", e);
                    self.delay.delay_ms(config.scale_retry_ms);
                    return Err(e);
                }
            }
        }

        if !corrected_before {
            if let Some(correction) = self.conditioner.scale_correction() {
                match self.handle.accel_config_raw() {
                    Ok(raw) => log::info!(
                        "icm42688: ACCEL_CONFIG0=0x{:02x}, factor {} -> {} LSB/g",
                        raw,
                        correction.from,
                        correction.to
                    ),
                    Err(e) => log::debug!("icm42688: ACCEL_CONFIG0 no disponible: {}", e),
                }
            }
        }

        self.delay.delay_ms(config.sample_interval_ms);
        Ok(outcome)
    }

    /// Ejecuta el bucle hasta que `stop` pase a `true`.
    ///
    /// Abre y cierra la sesión de lectura del handle. Devuelve el número de
    /// salidas entregadas a `sink`.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut sink: F) -> Result<u64, Icm42688Error>
    where
        F: FnMut(&ConditionedSample),
    {
        self.handle.open()?;
        let mut emitted = 0;

        while !stop.load(Ordering::Relaxed) {
            if let Ok(Outcome::Output(sample)) = self.step() {
                sink(&sample);
                emitted += 1;
            }
        }

        self.handle.close()?;
        log::info!("icm42688: adquisición detenida ({} salidas)", emitted);
        Ok(emitted)
    }
}
