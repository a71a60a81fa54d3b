/// Módulo de escaneo de puertos de red.
/// Lee los puertos TCP/UDP en escucha usando el comando `ss` del sistema
/// y parsea la salida para obtener información estructurada.
use std::process::Command;

use thiserror::Error;

use crate::resolver;

/// Nombre mostrado cuando el proceso dueño del puerto no es visible
/// (típicamente por falta de permisos).
pub const UNKNOWN_NAME: &str = "desconocido";

/// Protocolo de transporte de un socket en escucha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Etiqueta corta para mostrar en la interfaz.
    pub fn label(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Información de un puerto en escucha en el sistema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Protocolo del puerto (TCP, UDP)
    pub protocol: Protocol,
    /// Número del puerto
    pub port: u16,
    /// PID del proceso que usa el puerto (0 si no es visible)
    pub pid: u32,
    /// Nombre del proceso asociado
    pub process_name: String,
    /// Dirección local de escucha (ej: "0.0.0.0", "127.0.0.1", "::")
    pub local_address: String,
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}) → {} [PID {}]",
            self.protocol, self.port, self.local_address, self.process_name, self.pid
        )
    }
}

/// Error al escanear puertos.
///
/// Solo se produce cuando la herramienta de enumeración no está
/// disponible en absoluto; la visibilidad parcial por falta de
/// permisos NO es un error (se devuelven los puertos visibles).
#[derive(Debug, Error)]
pub enum ScanError {
    /// El comando `ss` no se pudo ejecutar (no instalado, sin PATH)
    #[error("no se pudo ejecutar `ss`: {0}")]
    CommandFailed(String),
    /// El comando terminó con error en todos los protocolos
    #[error("`ss` terminó con error: {0}")]
    CommandError(String),
}

/// Interfaz de escaneo de puertos.
///
/// Permite inyectar un escáner falso en los tests del modelo de lista
/// y deja la puerta abierta a otras plataformas de enumeración.
pub trait PortScanner {
    /// Escanea los puertos en escucha y devuelve un snapshot completo.
    fn scan(&self) -> Result<Vec<PortInfo>, ScanError>;
}

/// Escáner basado en el comando `ss` de iproute2 (Linux).
pub struct SsScanner;

impl PortScanner for SsScanner {
    fn scan(&self) -> Result<Vec<PortInfo>, ScanError> {
        scan_open_ports()
    }
}

/// Escanea los puertos TCP y UDP en escucha en el sistema.
///
/// Ejecuta `ss -tlnpH` y `ss -ulnpH` para obtener los sockets en estado
/// LISTEN. Sin permisos de root la sección `users:` de otros usuarios no
/// aparece; esas entradas se devuelven con PID 0 y nombre "desconocido".
///
/// # Returns
/// Vector ordenado por número de puerto, sin duplicados (puerto, PID).
pub fn scan_open_ports() -> Result<Vec<PortInfo>, ScanError> {
    let mut ports: Vec<PortInfo> = Vec::new();
    let mut last_error: Option<ScanError> = None;

    // Escanear TCP (LISTEN) y UDP
    for (flag, protocol) in [("-tlnpH", Protocol::Tcp), ("-ulnpH", Protocol::Udp)] {
        match execute_ss_command(flag) {
            Ok(raw_output) => {
                ports.extend(parse_ss_output(&raw_output, protocol));
            }
            Err(e) => {
                log::warn!("Escaneo {} falló: {}", protocol, e);
                last_error = Some(e);
            }
        }
    }

    // Si ningún protocolo se pudo escanear, la herramienta no está disponible
    if ports.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    // Ordenar por número de puerto para consistencia visual
    ports.sort_by_key(|p| p.port);

    // Eliminar duplicados (mismo puerto y PID)
    ports.dedup_by(|a, b| a.port == b.port && a.pid == b.pid);

    Ok(ports)
}

/// Ejecuta el comando `ss` con los flags indicados.
///
/// Se ejecuta sin elevación de privilegios: con usuario normal solo se
/// ven los PIDs de los procesos propios, que es el modo degradado
/// esperado.
///
/// # Arguments
/// * `flags` - Flags para el comando ss (ej: "-tlnpH")
///
/// # Returns
/// La salida del comando, o `ScanError` si no se pudo ejecutar.
fn execute_ss_command(flags: &str) -> Result<String, ScanError> {
    let output = Command::new("ss")
        .arg(flags)
        .output()
        .map_err(|e| ScanError::CommandFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScanError::CommandError(stderr.trim().to_string()));
    }

    String::from_utf8(output.stdout).map_err(|e| ScanError::CommandFailed(e.to_string()))
}

/// Parsea la salida del comando `ss` para extraer información de puertos.
///
/// Formato esperado de ss -tlnpH:
/// ```text
/// LISTEN  0  128  0.0.0.0:8080  0.0.0.0:*  users:(("node",pid=1234,fd=5))
/// ```
///
/// Las líneas que no se pueden parsear se descartan en silencio.
fn parse_ss_output(output: &str, protocol: Protocol) -> Vec<PortInfo> {
    output
        .lines()
        .filter_map(|line| parse_single_line(line, protocol))
        .collect()
}

/// Parsea una línea individual de la salida de `ss`.
///
/// Extrae la dirección y el puerto del campo de dirección local, y el
/// PID/nombre del proceso de la sección "users:". Si la sección de
/// proceso no está (sin permisos), la entrada se conserva con PID 0.
fn parse_single_line(line: &str, protocol: Protocol) -> Option<PortInfo> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (local_address, port) = extract_address_and_port(line)?;

    // Sin sección users: el puerto existe pero el dueño no es visible
    let (pid, process_name) = match extract_process_info(line) {
        Some((pid, name)) if name.is_empty() => (pid, resolver::resolve_name(pid)),
        Some((pid, name)) => (pid, name),
        None => (0, UNKNOWN_NAME.to_string()),
    };

    Some(PortInfo {
        protocol,
        port,
        pid,
        process_name,
        local_address,
    })
}

/// Extrae la dirección local y el puerto de una línea de `ss`.
///
/// Busca el primer campo con forma de dirección (contiene '.', '[',
/// "::" o empieza con '*') y separa `DIRECCION:PUERTO` por el último
/// ':'. Maneja IPv4 (0.0.0.0:8080), IPv6 ([::]:8080) y comodines (*:80).
fn extract_address_and_port(line: &str) -> Option<(String, u16)> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    // Formato de salida de ss -tlnpH:
    // LISTEN  0  128  0.0.0.0:8080  0.0.0.0:*  users:(("node",pid=1234,fd=5))
    // Campos: [Estado, RecvQ, SendQ, DirLocal, DirRemota, ...]
    //
    // Solo se consideran campos que parecen direcciones para no confundir
    // con valores numéricos simples como el backlog (128)
    for part in &parts {
        let is_address = part.contains('.')
            || part.contains('[')
            || part.contains("::")
            || part.starts_with('*');
        if !is_address {
            continue;
        }

        if let Some(colon_pos) = part.rfind(':') {
            let addr_part = &part[..colon_pos];
            let port_str = &part[colon_pos + 1..];
            if port_str == "*" {
                continue;
            }
            if let Ok(port) = port_str.parse::<u16>() {
                if port > 0 {
                    let cleaned = addr_part.trim_start_matches('[').trim_end_matches(']');
                    // Quitar el scope de IPv6 link-local (ej: "fe80::1%eth0")
                    let cleaned = match cleaned.find('%') {
                        Some(pos) => cleaned[..pos].to_string(),
                        None if cleaned == "*" => "0.0.0.0".to_string(),
                        None => cleaned.to_string(),
                    };
                    return Some((cleaned, port));
                }
            }
        }
    }

    None
}

/// Extrae el PID y nombre del proceso de la sección "users:" de ss.
///
/// Busca el patrón: users:(("nombre",pid=1234,fd=5))
///
/// # Returns
/// Tupla (PID, nombre_proceso) si se encuentra, `None` en caso contrario.
fn extract_process_info(line: &str) -> Option<(u32, String)> {
    let users_start = line.find("users:((")?;
    let users_section = &line[users_start..];

    // Extraer el nombre del proceso entre comillas
    let name_start = users_section.find("((\"")? + 3;
    let name_end = users_section[name_start..].find('"')? + name_start;
    let process_name = users_section[name_start..name_end].to_string();

    // Extraer el PID del patrón pid=NUMERO
    let pid_marker = "pid=";
    let pid_start = users_section.find(pid_marker)? + pid_marker.len();
    let pid_end = users_section[pid_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| i + pid_start)
        .unwrap_or(users_section.len());
    let pid: u32 = users_section[pid_start..pid_end].parse().ok()?;

    Some((pid, process_name))
}
