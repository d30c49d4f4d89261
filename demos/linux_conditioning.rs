use icm42688_rs::{
    base::SystemTimeSource, open_linux, stop_on_signals, Acquisition, DeviceConfig,
    PipelineConfig,
};
use linux_embedded_hal::Delay;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("ICM42688 - Ejemplo de acondicionamiento");

    let bus = std::env::args().nth(1).unwrap_or_else(|| "/dev/i2c-1".to_string());

    // Flag que se activa con Ctrl+C o SIGTERM
    let stop = match stop_on_signals() {
        Ok(stop) => stop,
        Err(e) => {
            eprintln!("Error al registrar las señales: {}", e);
            return;
        }
    };

    let handle = match open_linux(&bus, DeviceConfig::default()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error al registrar el sensor en {}: {}", bus, e);
            return;
        }
    };
    println!(
        "Sensor registrado en 0x{:02x} ({} Hz)",
        handle.address(),
        handle.frequency_hz()
    );

    match handle.scales() {
        Ok(scales) => println!(
            "Escalas: accel={} LSB/g gyro={:.1} LSB/dps",
            scales.accel_lsb_per_g,
            scales.gyro_lsb_per_dps()
        ),
        Err(e) => eprintln!("Error al leer las escalas: {}", e),
    }

    let mut acquisition = Acquisition::new(&handle, PipelineConfig::default(), Delay, SystemTimeSource);
    match acquisition.run(&stop, |sample| println!("[{}] {}", sample.timestamp_us, sample)) {
        Ok(emitted) => println!("\nDeteniendo el programa... ({} salidas)", emitted),
        Err(e) => eprintln!("Error en la adquisición: {}", e),
    }
}
