//! Funcionalidades y traits base para módulos del sensor

use embedded_hal::delay::DelayNs;

/// Trait para obtener un timestamp en microsegundos.
/// Permite implementar diferentes fuentes (sistema o contador externo).
pub trait TimeSource {
    /// Retorna el timestamp (en microsegundos)
    fn get_timestamp_us(&self) -> u64;
}

/// Implementación por defecto usando el reloj del sistema.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn get_timestamp_us(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default()
    }
}

/// Fuente de tiempo fija, útil cuando el timestamp lo aporta otro componente.
pub struct FixedTimeSource {
    pub timestamp_us: u64,
}

impl TimeSource for FixedTimeSource {
    fn get_timestamp_us(&self) -> u64 {
        self.timestamp_us
    }
}

/// Bucle de reintentos acotado: intenta, espera, abandona tras N intentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    /// Número máximo de intentos (al menos uno)
    pub attempts: u32,
    /// Espera entre intentos fallidos en milisegundos
    pub backoff_ms: u32,
}

impl Retry {
    pub const fn new(attempts: u32, backoff_ms: u32) -> Self {
        Self { attempts, backoff_ms }
    }

    /// Ejecuta `op` hasta que devuelva `Ok` o se agoten los intentos.
    ///
    /// `op` recibe el índice del intento (desde 0). Se espera `backoff_ms`
    /// después de cada intento fallido, incluido el último. Devuelve el
    /// último error si ningún intento tuvo éxito.
    pub fn run<T, E, D, F>(&self, delay: &mut D, mut op: F) -> Result<T, E>
    where
        D: DelayNs,
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            let result = op(attempt);
            if result.is_ok() {
                return result;
            }
            delay.delay_ms(self.backoff_ms);
            attempt += 1;
            if attempt >= attempts {
                return result;
            }
        }
    }
}

/// Limitador de salida: deja pasar uno de cada `every` eventos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    every: u32,
    count: u32,
}

impl Throttle {
    pub const fn new(every: u32) -> Self {
        Self { every, count: 0 }
    }

    /// Registra un evento; devuelve `true` en el N-ésimo y reinicia la cuenta.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.every.max(1) {
            self.count = 0;
            true
        } else {
            false
        }
    }

    /// Eventos acumulados desde la última salida
    pub fn pending(&self) -> u32 {
        self.count
    }
}
