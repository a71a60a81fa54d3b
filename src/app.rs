/// Módulo del modelo de lista y despacho de acciones.
///
/// Mantiene el snapshot actual de puertos, el índice seleccionado y el
/// estado de la interfaz (viendo, confirmando cierre, saliendo). El
/// loop de la terminal solo traduce teclas a llamadas de este módulo;
/// toda la lógica vive aquí para poder probarse sin terminal.
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::killer::ProcessKiller;
use crate::port_scanner::{PortInfo, PortScanner, ScanError};

/// Estado de la interfaz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Navegando la lista de puertos
    Viewing,
    /// Esperando confirmación antes de terminar el proceso seleccionado
    ConfirmingKill,
    /// El usuario pidió salir; el loop debe terminar
    Exiting,
}

/// Severidad del mensaje de la barra de estado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Estado central de la aplicación.
///
/// Cada refresco reemplaza el snapshot completo: no se preserva
/// identidad entre escaneos, solo la posición seleccionada (recortada
/// a los límites de la lista nueva).
pub struct App {
    scanner: Box<dyn PortScanner>,
    killer: Box<dyn ProcessKiller>,
    /// Snapshot actual de puertos en escucha
    items: Vec<PortInfo>,
    /// Índice seleccionado; None con lista vacía
    selected: Option<usize>,
    mode: Mode,
    status: Option<(String, StatusKind)>,
}

impl App {
    /// Crea la aplicación con un escaneo inicial.
    ///
    /// Un fallo de escaneo aquí es fatal: sin snapshot previo no hay
    /// nada que mostrar y el programa debe salir con error.
    pub fn new(
        scanner: Box<dyn PortScanner>,
        killer: Box<dyn ProcessKiller>,
    ) -> Result<Self, ScanError> {
        let items = scanner.scan()?;
        log::info!("Escaneo inicial: {} puertos detectados", items.len());

        let mut app = Self {
            scanner,
            killer,
            selected: if items.is_empty() { None } else { Some(0) },
            items,
            mode: Mode::Viewing,
            status: None,
        };
        app.set_count_status();
        Ok(app)
    }

    /// Snapshot actual de puertos.
    pub fn items(&self) -> &[PortInfo] {
        &self.items
    }

    /// Índice seleccionado, None con lista vacía.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Estado actual de la interfaz.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Mensaje de la barra de estado, si hay.
    pub fn status(&self) -> Option<(&str, StatusKind)> {
        self.status.as_ref().map(|(msg, kind)| (msg.as_str(), *kind))
    }

    /// Indica si el loop principal debe terminar.
    pub fn should_quit(&self) -> bool {
        self.mode == Mode::Exiting
    }

    /// Entrada seleccionada actualmente, None con lista vacía.
    pub fn current_selection(&self) -> Option<&PortInfo> {
        self.selected.and_then(|i| self.items.get(i))
    }

    /// Reemplaza el snapshot con un nuevo escaneo.
    ///
    /// La selección se recorta a los límites de la lista nueva (la
    /// selección es posicional, no por identidad). Si el escaneo falla
    /// se conserva el snapshot anterior y se reporta en la barra de
    /// estado: en refresco el error nunca es fatal.
    pub fn refresh(&mut self) {
        log::info!("Actualizando lista de puertos...");
        match self.scanner.scan() {
            Ok(items) => {
                self.items = items;
                self.clamp_selection();
                self.set_count_status();
            }
            Err(e) => {
                log::error!("Refresco falló: {}", e);
                self.set_status(format!("El escaneo falló: {}", e), StatusKind::Error);
            }
        }
    }

    /// Mueve la selección `delta` posiciones, recortando a los límites.
    ///
    /// Sin lista no hace nada. No hay envoltura: bajar desde el último
    /// elemento o subir desde el primero deja el índice igual.
    pub fn move_selection(&mut self, delta: i32) {
        if self.items.is_empty() {
            self.selected = None;
            return;
        }
        let current = self.selected.unwrap_or(0) as i32;
        let last = self.items.len() as i32 - 1;
        self.selected = Some((current + delta).clamp(0, last) as usize);
    }

    /// Pide confirmación para terminar el proceso seleccionado.
    fn request_kill(&mut self) {
        match self.current_selection() {
            None => {
                self.set_status("No hay procesos para cerrar".to_string(), StatusKind::Info);
            }
            Some(info) if info.pid == 0 => {
                self.set_status(
                    format!("Puerto {} sin PID visible, no se puede cerrar", info.port),
                    StatusKind::Error,
                );
            }
            Some(_) => {
                self.mode = Mode::ConfirmingKill;
            }
        }
    }

    /// Termina el proceso seleccionado tras la confirmación.
    ///
    /// En éxito se refresca la lista (el siguiente snapshot confirma la
    /// ausencia del proceso). En fallo el snapshot queda intacto y el
    /// error se muestra como estado transitorio.
    fn confirm_kill(&mut self) {
        self.mode = Mode::Viewing;

        let Some(info) = self.current_selection().cloned() else {
            return;
        };

        match self.killer.kill(info.pid) {
            Ok(()) => {
                self.refresh();
                self.set_status(
                    format!("Proceso '{}' (PID {}) terminado", info.process_name, info.pid),
                    StatusKind::Success,
                );
            }
            Err(e) => {
                log::warn!("No se pudo terminar el PID {}: {}", info.pid, e);
                self.set_status(e.to_string(), StatusKind::Error);
            }
        }
    }

    /// Procesa una tecla según el estado actual.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match self.mode {
            Mode::Viewing => self.handle_viewing_key(key),
            Mode::ConfirmingKill => self.handle_confirm_key(key),
            Mode::Exiting => {}
        }
    }

    /// Teclas del estado normal de navegación.
    fn handle_viewing_key(&mut self, key: KeyEvent) {
        // El mensaje de estado se limpia con la siguiente acción
        self.status = None;

        match key.code {
            KeyCode::Char('q') => self.mode = Mode::Exiting,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.mode = Mode::Exiting;
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('x') => self.request_kill(),
            _ => {}
        }
    }

    /// Teclas del diálogo de confirmación.
    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('s') | KeyCode::Char('y') | KeyCode::Enter => self.confirm_kill(),
            KeyCode::Char('n') | KeyCode::Esc => {
                self.mode = Mode::Viewing;
                self.status = None;
            }
            _ => {}
        }
    }

    /// Recorta la selección a los límites del snapshot actual.
    fn clamp_selection(&mut self) {
        if self.items.is_empty() {
            self.selected = None;
        } else {
            let last = self.items.len() - 1;
            self.selected = Some(self.selected.unwrap_or(0).min(last));
        }
    }

    /// Estado informativo con el conteo del snapshot actual.
    fn set_count_status(&mut self) {
        if self.items.is_empty() {
            self.set_status(
                "No hay procesos escuchando en puertos (puede requerir permisos)".to_string(),
                StatusKind::Info,
            );
        } else {
            self.set_status(
                format!("{} procesos escuchando en puertos", self.items.len()),
                StatusKind::Info,
            );
        }
    }

    fn set_status(&mut self, msg: String, kind: StatusKind) {
        self.status = Some((msg, kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::killer::KillError;
    use crate::port_scanner::Protocol;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Escáner falso que devuelve snapshots preparados en orden.
    struct StubScanner {
        results: RefCell<VecDeque<Result<Vec<PortInfo>, ScanError>>>,
    }

    impl StubScanner {
        fn new(results: Vec<Result<Vec<PortInfo>, ScanError>>) -> Self {
            Self {
                results: RefCell::new(results.into()),
            }
        }
    }

    impl PortScanner for StubScanner {
        fn scan(&self) -> Result<Vec<PortInfo>, ScanError> {
            self.results
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Terminador falso que registra los PIDs señalados.
    struct StubKiller {
        killed: Rc<RefCell<Vec<u32>>>,
        result: fn(u32) -> Result<(), KillError>,
    }

    impl ProcessKiller for StubKiller {
        fn kill(&self, pid: u32) -> Result<(), KillError> {
            self.killed.borrow_mut().push(pid);
            (self.result)(pid)
        }
    }

    fn entry(pid: u32, port: u16, name: &str) -> PortInfo {
        PortInfo {
            protocol: Protocol::Tcp,
            port,
            pid,
            process_name: name.to_string(),
            local_address: "0.0.0.0".to_string(),
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    fn app_with(
        snapshots: Vec<Result<Vec<PortInfo>, ScanError>>,
        kill_result: fn(u32) -> Result<(), KillError>,
    ) -> (App, Rc<RefCell<Vec<u32>>>) {
        let killed = Rc::new(RefCell::new(Vec::new()));
        let killer = StubKiller {
            killed: Rc::clone(&killed),
            result: kill_result,
        };
        let app = App::new(Box::new(StubScanner::new(snapshots)), Box::new(killer))
            .expect("escaneo inicial del stub");
        (app, killed)
    }

    /// El escaneo inicial selecciona el primer elemento
    #[test]
    fn test_initial_selection() {
        let (app, _) = app_with(vec![Ok(vec![entry(100, 8080, "api")])], |_| Ok(()));
        assert_eq!(app.selected(), Some(0));
        assert_eq!(app.current_selection().unwrap().pid, 100);
    }

    /// Con lista vacía no hay selección y mover no hace nada
    #[test]
    fn test_empty_list_has_no_selection() {
        let (mut app, _) = app_with(vec![Ok(vec![])], |_| Ok(()));
        assert_eq!(app.selected(), None);
        app.move_selection(1);
        assert_eq!(app.selected(), None);
        assert!(app.current_selection().is_none());
    }

    /// Bajar desde el último índice no envuelve
    #[test]
    fn test_no_wraparound_at_bottom() {
        let (mut app, _) = app_with(
            vec![Ok(vec![entry(1, 80, "a"), entry(2, 81, "b")])],
            |_| Ok(()),
        );
        app.move_selection(1);
        assert_eq!(app.selected(), Some(1));
        app.move_selection(1);
        assert_eq!(app.selected(), Some(1));
    }

    /// Subir desde el índice 0 no envuelve
    #[test]
    fn test_no_wraparound_at_top() {
        let (mut app, _) = app_with(
            vec![Ok(vec![entry(1, 80, "a"), entry(2, 81, "b")])],
            |_| Ok(()),
        );
        app.move_selection(-1);
        assert_eq!(app.selected(), Some(0));
    }

    /// Tras refrescar, la selección queda dentro de los límites
    #[test]
    fn test_refresh_clamps_selection() {
        let (mut app, _) = app_with(
            vec![
                Ok(vec![entry(1, 80, "a"), entry(2, 81, "b"), entry(3, 82, "c")]),
                Ok(vec![entry(1, 80, "a")]),
            ],
            |_| Ok(()),
        );
        app.move_selection(2);
        assert_eq!(app.selected(), Some(2));

        app.refresh();
        assert_eq!(app.selected(), Some(0));
        app.move_selection(0);
        assert_eq!(app.selected(), Some(0));
    }

    /// Un refresco que deja la lista vacía quita la selección
    #[test]
    fn test_refresh_to_empty_clears_selection() {
        let (mut app, _) = app_with(
            vec![Ok(vec![entry(1, 80, "a")]), Ok(vec![])],
            |_| Ok(()),
        );
        app.refresh();
        assert_eq!(app.selected(), None);
    }

    /// Un refresco fallido conserva el snapshot anterior y reporta
    #[test]
    fn test_refresh_error_keeps_snapshot() {
        let (mut app, _) = app_with(
            vec![
                Ok(vec![entry(1, 80, "a")]),
                Err(ScanError::CommandFailed("ss no encontrado".to_string())),
            ],
            |_| Ok(()),
        );
        app.refresh();
        assert_eq!(app.items().len(), 1);
        assert_eq!(app.status().unwrap().1, StatusKind::Error);
        assert_eq!(app.mode(), Mode::Viewing);
    }

    /// Un fallo en el escaneo inicial es fatal (constructor con Err)
    #[test]
    fn test_initial_scan_error_is_fatal() {
        let scanner = StubScanner::new(vec![Err(ScanError::CommandFailed(
            "ss no encontrado".to_string(),
        ))]);
        let killer = StubKiller {
            killed: Rc::new(RefCell::new(Vec::new())),
            result: |_| Ok(()),
        };
        assert!(App::new(Box::new(scanner), Box::new(killer)).is_err());
    }

    /// Escenario completo: bajar, matar postgres, refrescar y recortar.
    /// El snapshot posterior al cierre ya no contiene el proceso.
    #[test]
    fn test_kill_selected_then_refresh() {
        let (mut app, killed) = app_with(
            vec![
                Ok(vec![entry(100, 8080, "api"), entry(200, 5432, "postgres")]),
                Ok(vec![entry(100, 8080, "api")]),
            ],
            |_| Ok(()),
        );

        app.handle_key(press(KeyCode::Char('j')));
        assert_eq!(app.current_selection().unwrap().process_name, "postgres");

        app.handle_key(press(KeyCode::Char('x')));
        assert_eq!(app.mode(), Mode::ConfirmingKill);

        app.handle_key(press(KeyCode::Char('s')));
        assert_eq!(*killed.borrow(), vec![200]);
        assert_eq!(app.mode(), Mode::Viewing);
        assert_eq!(app.items().len(), 1);
        assert_eq!(app.selected(), Some(0));
        assert_eq!(app.status().unwrap().1, StatusKind::Success);
    }

    /// Cancelar la confirmación no señala ningún proceso
    #[test]
    fn test_cancel_kill() {
        let (mut app, killed) = app_with(vec![Ok(vec![entry(100, 8080, "api")])], |_| Ok(()));
        app.handle_key(press(KeyCode::Char('x')));
        assert_eq!(app.mode(), Mode::ConfirmingKill);

        app.handle_key(press(KeyCode::Char('n')));
        assert_eq!(app.mode(), Mode::Viewing);
        assert!(killed.borrow().is_empty());
    }

    /// Matar un PID que ya no existe deja el modelo intacto y reporta
    #[test]
    fn test_kill_missing_process() {
        let (mut app, _) = app_with(
            vec![Ok(vec![entry(100, 8080, "api")])],
            |pid| Err(KillError::NoSuchProcess(pid)),
        );
        app.handle_key(press(KeyCode::Char('x')));
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.mode(), Mode::Viewing);
        assert_eq!(app.items().len(), 1);
        assert_eq!(app.status().unwrap().1, StatusKind::Error);
    }

    /// Permiso denegado se reporta sin refrescar la lista
    #[test]
    fn test_kill_permission_denied() {
        let (mut app, _) = app_with(
            vec![Ok(vec![entry(1, 22, "sshd")])],
            |pid| Err(KillError::PermissionDenied(pid)),
        );
        app.handle_key(press(KeyCode::Char('x')));
        app.handle_key(press(KeyCode::Char('y')));

        assert_eq!(app.items().len(), 1);
        let (msg, kind) = app.status().unwrap();
        assert_eq!(kind, StatusKind::Error);
        assert!(msg.contains("permiso denegado"));
    }

    /// Una entrada sin PID visible no abre la confirmación
    #[test]
    fn test_kill_unknown_pid_rejected() {
        let (mut app, killed) = app_with(vec![Ok(vec![entry(0, 631, "desconocido")])], |_| Ok(()));
        app.handle_key(press(KeyCode::Char('x')));
        assert_eq!(app.mode(), Mode::Viewing);
        assert!(killed.borrow().is_empty());
        assert_eq!(app.status().unwrap().1, StatusKind::Error);
    }

    /// "x" con lista vacía solo deja un aviso
    #[test]
    fn test_kill_on_empty_list() {
        let (mut app, killed) = app_with(vec![Ok(vec![])], |_| Ok(()));
        app.handle_key(press(KeyCode::Char('x')));
        assert_eq!(app.mode(), Mode::Viewing);
        assert!(killed.borrow().is_empty());
    }

    /// "q" pasa al estado de salida
    #[test]
    fn test_quit_key() {
        let (mut app, _) = app_with(vec![Ok(vec![])], |_| Ok(()));
        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit());
    }

    /// El mensaje de estado se limpia con la siguiente acción
    #[test]
    fn test_status_clears_on_next_action() {
        let (mut app, _) = app_with(vec![Ok(vec![entry(1, 80, "a")])], |_| Ok(()));
        assert!(app.status().is_some());
        app.handle_key(press(KeyCode::Char('j')));
        assert!(app.status().is_none());
    }
}
