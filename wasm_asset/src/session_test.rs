use std::cell::{Cell, RefCell};

use crate::error::WasmAssetError;
use crate::session::{BuildSession, InstallState, ToolSpec, WASM_BINDGEN, WASM_PACK};
use crate::tools::ToolInstaller;
use crate::wrapper::LOADER_DIR_NAME;

#[derive(Default)]
struct ScriptedInstaller {
    present: bool,
    fail_installs: Cell<usize>,
    checks: Cell<usize>,
    installs: RefCell<Vec<&'static str>>,
}

impl ToolInstaller for ScriptedInstaller {
    fn is_installed(&self, _tool: ToolSpec) -> bool {
        self.checks.set(self.checks.get() + 1);
        self.present
    }

    fn install(&self, tool: ToolSpec) -> Result<(), WasmAssetError> {
        self.installs.borrow_mut().push(tool.install_crate);
        if self.fail_installs.get() > 0 {
            self.fail_installs.set(self.fail_installs.get() - 1);
            return Err(WasmAssetError::ToolInstall {
                tool: tool.binary.to_string(),
                message: "network unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[test]
fn present_tool_is_checked_once_and_never_installed() {
    let state = InstallState::default();
    let installer = ScriptedInstaller {
        present: true,
        ..ScriptedInstaller::default()
    };

    state.ensure_installed(WASM_PACK, &installer).unwrap();
    state.ensure_installed(WASM_PACK, &installer).unwrap();

    assert_eq!(installer.checks.get(), 1);
    assert!(installer.installs.borrow().is_empty());
    assert!(state.is_confirmed(WASM_PACK));
    assert!(!state.is_confirmed(WASM_BINDGEN));
}

#[test]
fn missing_tool_is_installed_once_per_session() {
    let state = InstallState::default();
    let installer = ScriptedInstaller::default();

    state.ensure_installed(WASM_BINDGEN, &installer).unwrap();
    state.ensure_installed(WASM_BINDGEN, &installer).unwrap();

    assert_eq!(*installer.installs.borrow(), vec!["wasm-bindgen-cli"]);
}

#[test]
fn failed_install_is_retried_by_the_next_request() {
    let state = InstallState::default();
    let installer = ScriptedInstaller {
        fail_installs: Cell::new(1),
        ..ScriptedInstaller::default()
    };

    let err = state.ensure_installed(WASM_PACK, &installer).unwrap_err();
    assert!(matches!(err, WasmAssetError::ToolInstall { .. }), "{err:?}");
    assert!(!state.is_confirmed(WASM_PACK));

    state.ensure_installed(WASM_PACK, &installer).unwrap();
    assert!(state.is_confirmed(WASM_PACK));
    assert_eq!(*installer.installs.borrow(), vec!["wasm-pack", "wasm-pack"]);
}

#[test]
fn loader_dir_is_created_lazily_under_cache_dir() {
    let temp = tempfile::tempdir().unwrap();
    let cache_dir = temp.path().join("nested").join("cache");
    let session = BuildSession::new(&cache_dir);

    assert!(!cache_dir.exists());
    let dir = session.ensure_loader_dir().unwrap().to_path_buf();
    assert_eq!(dir, cache_dir.join(LOADER_DIR_NAME));
    assert!(dir.is_dir());

    assert_eq!(session.ensure_loader_dir().unwrap(), dir.as_path());
    assert_eq!(session.cache_dir(), cache_dir.as_path());
}

#[test]
fn loader_dir_error_names_the_directory() {
    let temp = tempfile::tempdir().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let session = BuildSession::new(&blocker);

    match session.ensure_loader_dir() {
        Err(WasmAssetError::Io { path, .. }) => assert_eq!(path, blocker.join(LOADER_DIR_NAME)),
        other => panic!("expected an io error, got {other:?}"),
    }
}
