// Global keyboard shortcuts (RegisterHotKey on Windows)

use assetdesk_shared::{Result, UpdateError};

/// Callback fired when a shortcut is pressed
pub type ShortcutAction = Box<dyn Fn() + Send + 'static>;

/// Key part of an accelerator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Upper-case letter or digit
    Char(char),
    /// F1..F24
    Function(u8),
}

/// Parsed accelerator such as `Ctrl+Alt+U`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accelerator {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
    pub key: Key,
}

impl Accelerator {
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |why: &str| UpdateError::Shortcut(format!("{spec:?}: {why}"));
        let mut accel = Accelerator {
            ctrl: false,
            alt: false,
            shift: false,
            super_key: false,
            key: Key::Char('\0'),
        };
        let mut key = None;

        for part in spec.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "" => return Err(invalid("empty segment")),
                "ctrl" | "control" | "cmdorctrl" => accel.ctrl = true,
                "alt" | "option" => accel.alt = true,
                "shift" => accel.shift = true,
                "super" | "win" | "cmd" | "meta" => accel.super_key = true,
                other => {
                    if key.is_some() {
                        return Err(invalid("more than one key"));
                    }
                    key = Some(parse_key(other).ok_or_else(|| invalid("unknown key"))?);
                }
            }
        }

        accel.key = key.ok_or_else(|| invalid("missing key"))?;
        if !(accel.ctrl || accel.alt || accel.super_key) {
            return Err(invalid("needs Ctrl, Alt or Super"));
        }
        Ok(accel)
    }
}

fn parse_key(name: &str) -> Option<Key> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_ascii_alphanumeric().then(|| Key::Char(c.to_ascii_uppercase()));
    }
    let n: u8 = name.strip_prefix('f')?.parse().ok()?;
    (1..=24).contains(&n).then_some(Key::Function(n))
}

/// Registers process-wide shortcuts; `unregister_all` must run at shutdown
pub trait ShortcutRegistry: Send {
    fn register(&mut self, accelerator: &str, action: ShortcutAction) -> Result<()>;

    fn unregister_all(&mut self);
}

/// The registry for the running platform
pub fn platform_registry() -> Box<dyn ShortcutRegistry> {
    #[cfg(windows)]
    {
        Box::new(windows_impl::GlobalHotkeys::default())
    }
    #[cfg(not(windows))]
    {
        Box::new(Unsupported)
    }
}

/// Accepts registrations but never fires; used where no global hotkey API exists
#[cfg(not(windows))]
pub struct Unsupported;

#[cfg(not(windows))]
impl ShortcutRegistry for Unsupported {
    fn register(&mut self, accelerator: &str, _action: ShortcutAction) -> Result<()> {
        Accelerator::parse(accelerator)?;
        log::warn!(
            "Global shortcuts are not supported on this platform; {} is inactive",
            accelerator
        );
        Ok(())
    }

    fn unregister_all(&mut self) {}
}

#[cfg(windows)]
mod windows_impl {
    use super::{Accelerator, Key, ShortcutAction, ShortcutRegistry};
    use assetdesk_shared::{Result, UpdateError};
    use std::sync::mpsc;
    use std::thread::JoinHandle;
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
        MOD_SHIFT, MOD_WIN, VK_F1,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetMessageW, PeekMessageW, PostThreadMessageW, MSG, PM_NOREMOVE, WM_HOTKEY, WM_QUIT,
        WM_USER,
    };

    /// Hotkey IDs (must be unique within the application)
    const FIRST_HOTKEY_ID: i32 = 1;

    struct HotkeyThread {
        thread_id: u32,
        handle: JoinHandle<()>,
    }

    /// Each hotkey gets a thread with its own message queue; WM_HOTKEY is
    /// posted to the thread that registered it.
    #[derive(Default)]
    pub struct GlobalHotkeys {
        threads: Vec<HotkeyThread>,
    }

    fn modifiers(accel: &Accelerator) -> HOT_KEY_MODIFIERS {
        let mut bits = MOD_NOREPEAT.0;
        if accel.ctrl {
            bits |= MOD_CONTROL.0;
        }
        if accel.alt {
            bits |= MOD_ALT.0;
        }
        if accel.shift {
            bits |= MOD_SHIFT.0;
        }
        if accel.super_key {
            bits |= MOD_WIN.0;
        }
        HOT_KEY_MODIFIERS(bits)
    }

    fn virtual_key(key: Key) -> u32 {
        match key {
            // VK codes for 0-9 and A-Z equal their ASCII values
            Key::Char(c) => c as u32,
            Key::Function(n) => VK_F1.0 as u32 + (n as u32 - 1),
        }
    }

    impl ShortcutRegistry for GlobalHotkeys {
        fn register(&mut self, accelerator: &str, action: ShortcutAction) -> Result<()> {
            let accel = Accelerator::parse(accelerator)?;
            let id = FIRST_HOTKEY_ID + self.threads.len() as i32;
            let mods = modifiers(&accel);
            let vk = virtual_key(accel.key);
            let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<u32, String>>();

            let handle = std::thread::Builder::new()
                .name("global-hotkey".into())
                .spawn(move || unsafe {
                    let mut msg = MSG::default();
                    // Force creation of this thread's message queue
                    let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
                    if let Err(e) = RegisterHotKey(None, id, mods, vk) {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                    let _ = ready_tx.send(Ok(GetCurrentThreadId()));

                    while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                        if msg.message == WM_HOTKEY {
                            action();
                        }
                    }
                    let _ = UnregisterHotKey(None, id);
                })?;

            match ready_rx.recv() {
                Ok(Ok(thread_id)) => {
                    log::info!("[Shortcuts] Registered: {}", accelerator);
                    self.threads.push(HotkeyThread { thread_id, handle });
                    Ok(())
                }
                Ok(Err(e)) => {
                    let _ = handle.join();
                    Err(UpdateError::Shortcut(format!("{accelerator}: {e}")))
                }
                Err(_) => {
                    let _ = handle.join();
                    Err(UpdateError::Shortcut(format!("{accelerator}: hotkey thread exited")))
                }
            }
        }

        fn unregister_all(&mut self) {
            for hotkey in self.threads.drain(..) {
                unsafe {
                    let _ = PostThreadMessageW(hotkey.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                let _ = hotkey.handle.join();
            }
        }
    }

    impl Drop for GlobalHotkeys {
        fn drop(&mut self) {
            self.unregister_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifiers_and_letter() {
        let accel = Accelerator::parse("Ctrl+Alt+u").unwrap();
        assert!(accel.ctrl && accel.alt && !accel.shift && !accel.super_key);
        assert_eq!(accel.key, Key::Char('U'));
    }

    #[test]
    fn parses_function_keys() {
        let accel = Accelerator::parse("Shift + Ctrl + F5").unwrap();
        assert!(accel.shift && accel.ctrl);
        assert_eq!(accel.key, Key::Function(5));
        assert!(Accelerator::parse("Ctrl+F25").is_err());
    }

    #[test]
    fn rejects_bad_accelerators() {
        for spec in ["", "U", "Shift+U", "Ctrl+", "Ctrl+Alt", "Ctrl+U+I", "Ctrl+Home"] {
            assert!(Accelerator::parse(spec).is_err(), "{spec} should be rejected");
        }
    }
}
