/// Módulo de terminación de procesos.
///
/// Envía SIGTERM (cierre ordenado, no SIGKILL) al proceso dueño del
/// puerto seleccionado. No se espera la salida del proceso: el
/// siguiente refresco de la lista confirma su ausencia.
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;

/// Error al terminar un proceso
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KillError {
    /// Sin permisos para señalar el proceso (EPERM)
    #[error("permiso denegado para el PID {0}")]
    PermissionDenied(u32),
    /// El proceso ya no existe (ESRCH)
    #[error("el proceso {0} ya no existe")]
    NoSuchProcess(u32),
    /// El PID del puerto no es visible (entrada sin permisos)
    #[error("PID desconocido, no se puede terminar el proceso")]
    UnknownPid,
    /// Otro fallo del syscall kill
    #[error("error enviando señal al PID {0}: {1}")]
    Signal(u32, String),
}

/// Interfaz de terminación de procesos, inyectable en tests.
pub trait ProcessKiller {
    /// Envía la señal de terminación ordenada al PID indicado.
    fn kill(&self, pid: u32) -> Result<(), KillError>;
}

/// Implementación real basada en kill(2) con SIGTERM.
pub struct SignalKiller;

impl ProcessKiller for SignalKiller {
    fn kill(&self, pid: u32) -> Result<(), KillError> {
        kill_process(pid)
    }
}

/// Envía SIGTERM a un proceso por su PID.
///
/// El PID 0 se rechaza antes del syscall: kill(0, sig) señalaría al
/// grupo de procesos entero.
///
/// # Arguments
/// * `pid` - ID del proceso a terminar
///
/// # Returns
/// `Ok(())` si la señal se envió, `KillError` en caso contrario.
pub fn kill_process(pid: u32) -> Result<(), KillError> {
    if pid == 0 {
        return Err(KillError::UnknownPid);
    }

    let raw = i32::try_from(pid).map_err(|_| KillError::NoSuchProcess(pid))?;

    log::info!("Enviando SIGTERM al PID {}", pid);
    match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => {
            log::info!("Señal enviada al proceso {}", pid);
            Ok(())
        }
        Err(Errno::EPERM) => {
            log::warn!("Permiso denegado al señalar el PID {}", pid);
            Err(KillError::PermissionDenied(pid))
        }
        Err(Errno::ESRCH) => {
            log::warn!("El PID {} ya no existe", pid);
            Err(KillError::NoSuchProcess(pid))
        }
        Err(e) => {
            log::error!("Fallo enviando señal al PID {}: {}", pid, e);
            Err(KillError::Signal(pid, e.to_string()))
        }
    }
}
