//! # PortUI ⚔️
//!
//! TUI interactiva para Linux que lista los procesos escuchando en
//! puertos TCP/UDP y permite terminar el seleccionado.
//!
//! ## Características
//! - Tabla navegable de puertos en escucha (puerto, protocolo, PID, proceso)
//! - Cierre ordenado (SIGTERM) del proceso seleccionado, con confirmación
//! - Refresco manual de la lista con un snapshot completo
//! - Modo degradado sin privilegios: solo los procesos propios
//!
//! ## Uso
//! Ejecutar el binario en una terminal. Atajos: `j`/`k` navegar,
//! `x` cerrar, `r` actualizar, `q` salir. Con permisos de root se ven
//! y pueden cerrarse los procesos de todos los usuarios.

mod app;
mod killer;
mod port_scanner;
mod resolver;
mod ui;

use app::App;
use killer::SignalKiller;
use port_scanner::SsScanner;

/// Punto de entrada principal de PortUI.
///
/// Inicializa el logging, hace el escaneo inicial y lanza el loop de
/// la terminal. Un fallo del escaneo inicial es fatal y sale con
/// código distinto de cero ANTES de tocar el modo raw, así la terminal
/// nunca queda corrupta. Salida normal con `q`: código 0.
fn main() {
    // Inicializar logging (nivel WARN por defecto para no pelear con la
    // pantalla alternativa; configurable con RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();

    log::info!("⚔️  PortUI v{} iniciando...", env!("CARGO_PKG_VERSION"));

    // Escaneo inicial antes de entrar en modo raw
    let mut app = match App::new(Box::new(SsScanner), Box::new(SignalKiller)) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Escaneo inicial falló: {}", e);
            eprintln!("portui: {}", e);
            std::process::exit(1);
        }
    };

    // Lanzar el loop interactivo (bloquea hasta que el usuario salga)
    if let Err(e) = ui::run(&mut app) {
        log::error!("Error de terminal: {}", e);
        eprintln!("portui: error de terminal: {}", e);
        std::process::exit(1);
    }

    log::info!("PortUI cerrándose...");
}
