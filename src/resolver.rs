/// Módulo de resolución de nombres de proceso.
///
/// Cuando `ss` reporta un PID pero el nombre no se pudo extraer, se
/// consulta `/proc/<pid>/stat` como segunda fuente. El proceso puede
/// haber terminado entre el escaneo y la resolución (carrera), así que
/// cualquier fallo degrada al nombre centinela en vez de propagarse.
use crate::port_scanner::UNKNOWN_NAME;

/// Resuelve el nombre de un proceso a partir de su PID leyendo /proc.
///
/// # Arguments
/// * `pid` - PID del proceso (0 significa "dueño no visible")
///
/// # Returns
/// El campo `comm` del proceso, o "desconocido" si el proceso ya no
/// existe o no se puede leer.
pub fn resolve_name(pid: u32) -> String {
    if pid == 0 {
        return UNKNOWN_NAME.to_string();
    }

    let Ok(pid) = i32::try_from(pid) else {
        return UNKNOWN_NAME.to_string();
    };

    match procfs::process::Process::new(pid).and_then(|p| p.stat()) {
        Ok(stat) => stat.comm,
        Err(e) => {
            log::debug!("No se pudo resolver el nombre del PID {}: {}", pid, e);
            UNKNOWN_NAME.to_string()
        }
    }
}
