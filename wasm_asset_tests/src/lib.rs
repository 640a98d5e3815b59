//! Fixture collaborators for end-to-end builds. They write what the real
//! tools would emit into temp directories and record every call in a shared
//! log so tests can assert on ordering.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use wasm_asset::config::{BuildSettings, WasmAssetConfig};
use wasm_asset::error::WasmAssetError;
use wasm_asset::pipeline::{AssetRequest, BuildStrategy};
use wasm_asset::session::ToolSpec;
use wasm_asset::tools::{
    BindgenOutput, BindingGenerator, PACKAGE_DIR_NAME, ToolInstaller, Toolchain, WASM_TARGET,
    bindgen_output_paths,
};

/// `\0asm` followed by version 1.
pub const WASM_MAGIC: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

pub const HELLO_ENTRY: &str = r#"import * as wasm from './hello_bg';

export function greet(name) {
    return wasm.greet(name);
}

export function add(a, b) {
    return wasm.add(a, b);
}
"#;

pub const HELLO_WRAPPER: &str = r#"(function() {
    const __exports = {};
    let wasm;

    function init(module) {
        let result;
        const imports = { './hello': __exports };
        if (module instanceof URL || typeof module === 'string' || module instanceof Request) {
            const response = fetch(module);
            if (typeof WebAssembly.instantiateStreaming === 'function') {
                result = WebAssembly.instantiateStreaming(response, imports);
            } else {
                result = response
                    .then(r => r.arrayBuffer())
                    .then(bytes => WebAssembly.instantiate(bytes, imports));
            }
        } else {
            result = WebAssembly.instantiate(module, imports);
        }
        return result.then(({ instance }) => {
            wasm = instance.exports;
            return wasm;
        });
    }

    self.wasm_bindgen = Object.assign(init, __exports);
})();
"#;

pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(vec![]))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.borrow().clone()
}

/// Writes a minimal crate (manifest and `src/lib.rs`) and returns the request
/// for its manifest as the asset.
pub fn scaffold_crate(root: &Path, crate_name: &str) -> AssetRequest {
    let crate_dir = root.join(crate_name);
    std::fs::create_dir_all(crate_dir.join("src")).unwrap();
    std::fs::write(
        crate_dir.join("Cargo.toml"),
        format!("[package]\nname = \"{crate_name}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n"),
    )
    .unwrap();
    std::fs::write(crate_dir.join("src").join("lib.rs"), "").unwrap();
    AssetRequest::for_asset(&crate_dir.join("Cargo.toml")).unwrap()
}

pub fn settings_for(
    request: &AssetRequest,
    strategy: BuildStrategy,
    public_url: &str,
) -> BuildSettings {
    BuildSettings::resolve(
        &request.crate_dir,
        &WasmAssetConfig {
            strategy: Some(strategy),
            public_url: Some(public_url.to_string()),
            ..WasmAssetConfig::default()
        },
    )
}

/// Emits a wasm-pack style package on `build_package` and a raw binary on
/// `build_binary`.
pub struct FixtureToolchain {
    pub descriptor: serde_json::Value,
    pub entry_file: String,
    pub entry_source: String,
    log: CallLog,
}

impl FixtureToolchain {
    pub fn hello(log: &CallLog) -> Self {
        Self {
            descriptor: serde_json::json!({
                "name": "hello",
                "version": "0.1.0",
                "files": ["hello_bg.wasm", "hello.js"],
                "module": "hello.js",
                "sideEffects": false,
            }),
            entry_file: "hello.js".to_string(),
            entry_source: HELLO_ENTRY.to_string(),
            log: Rc::clone(log),
        }
    }

    pub fn with_entry_source(mut self, entry_source: &str) -> Self {
        self.entry_source = entry_source.to_string();
        self
    }

    pub fn with_descriptor(mut self, descriptor: serde_json::Value) -> Self {
        self.descriptor = descriptor;
        self
    }
}

impl Toolchain for FixtureToolchain {
    fn build_package(&self, crate_dir: &Path) -> Result<PathBuf, WasmAssetError> {
        self.log.borrow_mut().push("build_package".to_string());
        let package_dir = crate_dir.join(PACKAGE_DIR_NAME);
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(
            package_dir.join("package.json"),
            serde_json::to_string_pretty(&self.descriptor).unwrap(),
        )
        .unwrap();
        std::fs::write(package_dir.join(&self.entry_file), &self.entry_source).unwrap();
        std::fs::write(package_dir.join("hello_bg.wasm"), WASM_MAGIC).unwrap();
        Ok(package_dir)
    }

    fn build_binary(&self, crate_dir: &Path) -> Result<PathBuf, WasmAssetError> {
        self.log.borrow_mut().push("build_binary".to_string());
        let release_dir = crate_dir.join("target").join(WASM_TARGET).join("release");
        std::fs::create_dir_all(&release_dir).unwrap();
        let wasm_path = release_dir.join("hello.wasm");
        std::fs::write(&wasm_path, WASM_MAGIC).unwrap();
        Ok(wasm_path)
    }
}

/// Writes `<stem>.js` and `<stem>_bg.wasm` the way wasm-bindgen does.
pub struct FixtureBindingGenerator {
    pub wrapper_source: String,
    log: CallLog,
}

impl FixtureBindingGenerator {
    pub fn new(log: &CallLog, wrapper_source: &str) -> Self {
        Self {
            wrapper_source: wrapper_source.to_string(),
            log: Rc::clone(log),
        }
    }
}

impl BindingGenerator for FixtureBindingGenerator {
    fn generate(&self, wasm_path: &Path, out_dir: &Path) -> Result<BindgenOutput, WasmAssetError> {
        self.log.borrow_mut().push("generate".to_string());
        let output = bindgen_output_paths(wasm_path, out_dir);
        std::fs::write(&output.wrapper_path, &self.wrapper_source).unwrap();
        std::fs::write(&output.binary_path, WASM_MAGIC).unwrap();
        Ok(output)
    }
}

/// Reports the tools in `present` as installed. Installs succeed unless
/// `failures_left` is non-zero.
pub struct FixtureInstaller {
    present: BTreeSet<&'static str>,
    pub failures_left: Cell<usize>,
    log: CallLog,
}

impl FixtureInstaller {
    pub fn with_present(log: &CallLog, present: &[&'static str]) -> Self {
        Self {
            present: present.iter().copied().collect(),
            failures_left: Cell::new(0),
            log: Rc::clone(log),
        }
    }

    pub fn failing(log: &CallLog, failures: usize) -> Self {
        let installer = Self::with_present(log, &[]);
        installer.failures_left.set(failures);
        installer
    }
}

impl ToolInstaller for FixtureInstaller {
    fn is_installed(&self, tool: ToolSpec) -> bool {
        self.log
            .borrow_mut()
            .push(format!("is_installed {}", tool.binary));
        self.present.contains(tool.binary)
    }

    fn install(&self, tool: ToolSpec) -> Result<(), WasmAssetError> {
        self.log
            .borrow_mut()
            .push(format!("install {}", tool.install_crate));
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(WasmAssetError::ToolInstall {
                tool: tool.binary.to_string(),
                message: "cargo install exited with code 101".to_string(),
            });
        }
        Ok(())
    }
}
