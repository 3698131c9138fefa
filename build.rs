//! Purpose: Embed the platform's geoclient native library into the crate.
//! Role: Cargo build-script; stages the library and writes the bundled-resource table.
//! Invariants: `GEOCLIENT_NATIVE_LIB_DIR` wins when set; a missing file there fails the build.
//! Invariants: Without it, `c/geoclient_stub.c` is compiled as a shared library for the target.
//! Invariants: File names and resource keys must agree with `core::platform` and `core::resource`.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const BASE_NAME: &str = "geoclient";
const RESOURCE_GROUP: &str = "geoclient/jni";

fn main() {
    println!("cargo:rerun-if-changed=c/geoclient_stub.c");
    println!("cargo:rerun-if-env-changed=GEOCLIENT_NATIVE_LIB_DIR");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let bundle_dir = out_dir.join("bundle");
    fs::create_dir_all(&bundle_dir).expect("failed to create bundle staging directory");

    let mut entries = Vec::new();
    match library_file_name(&target_os, &target_arch) {
        Some(file_name) => {
            let staged = bundle_dir.join(&file_name);
            stage_library(&manifest_dir, &file_name, &staged, &target_os);
            entries.push((format!("{RESOURCE_GROUP}/{file_name}"), staged));
        }
        None => {
            println!(
                "cargo:warning=no native library naming convention for {target_os}/{target_arch}; \
                 the bundle will be empty"
            );
        }
    }

    write_bundle_table(&out_dir.join("bundled_resources.rs"), &entries);
}

fn library_file_name(os: &str, arch: &str) -> Option<String> {
    let qualifier = match arch {
        "x86_64" | "aarch64" => "",
        "x86" => "32",
        _ => return None,
    };
    match (os, arch) {
        ("linux", _) => Some(format!("lib{BASE_NAME}{qualifier}.so")),
        ("freebsd", "x86_64") => Some(format!("lib{BASE_NAME}.so")),
        ("macos", "x86_64" | "aarch64") => Some(format!("lib{BASE_NAME}.dylib")),
        ("windows", _) => Some(format!("{BASE_NAME}{qualifier}.dll")),
        _ => None,
    }
}

fn stage_library(manifest_dir: &Path, file_name: &str, staged: &Path, target_os: &str) {
    if let Some(dir) = env::var_os("GEOCLIENT_NATIVE_LIB_DIR") {
        let prebuilt = PathBuf::from(dir).join(file_name);
        println!("cargo:rerun-if-changed={}", prebuilt.display());
        if !prebuilt.is_file() {
            panic!(
                "{} not found; GEOCLIENT_NATIVE_LIB_DIR must contain the native library for this target",
                prebuilt.display()
            );
        }
        fs::copy(&prebuilt, staged).unwrap_or_else(|err| {
            panic!("failed to stage {}: {err}", prebuilt.display());
        });
        return;
    }

    compile_stub(&manifest_dir.join("c").join("geoclient_stub.c"), staged, target_os);
}

fn compile_stub(source: &Path, output: &Path, target_os: &str) {
    let compiler = cc::Build::new().cargo_metadata(false).get_compiler();
    let mut cmd = compiler.to_command();
    if compiler.is_like_msvc() {
        let obj_dir = output.parent().expect("staged library has a parent directory");
        cmd.arg("/LD")
            .arg(source)
            .arg(format!("/Fe{}", output.display()))
            .arg(format!("/Fo{}\\", obj_dir.display()));
    } else {
        if target_os == "macos" {
            cmd.arg("-dynamiclib");
        } else {
            cmd.arg("-shared");
        }
        if target_os != "windows" {
            cmd.arg("-fPIC");
        }
        cmd.arg("-o").arg(output).arg(source);
    }

    let status = cmd.status().unwrap_or_else(|err| {
        panic!(
            "failed to run C compiler for the stand-in geoclient library: {err}\n\
             Fix: install a C toolchain (set `CC` to override) or set GEOCLIENT_NATIVE_LIB_DIR \
             to a directory holding a prebuilt library."
        )
    });
    if !status.success() {
        panic!("C compiler exited with {status} while building {}", output.display());
    }
}

fn write_bundle_table(path: &Path, entries: &[(String, PathBuf)]) {
    let mut body = String::from("pub(crate) static BUNDLED: &[(&str, &[u8])] = &[\n");
    for (key, file) in entries {
        let file = file.display().to_string();
        body.push_str(&format!("    ({key:?}, include_bytes!({file:?})),\n"));
    }
    body.push_str("];\n");
    fs::write(path, body).expect("failed to write bundled resource table");
}
