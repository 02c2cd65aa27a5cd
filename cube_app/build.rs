// Compiles GLSL shader sources to SPIR-V with glslc from the Vulkan SDK.
// Outputs land next to the sources as <shader>/vulkan/<stage>.spv, the
// layout the engine's shader factory resolves at runtime. Compilation is
// skipped with a warning when the SDK is not installed.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

fn compile_stage(glslc: &str, source: &Path, output: &Path) {
    let up_to_date = match (source.metadata(), output.metadata()) {
        (Ok(src), Ok(dst)) => match (src.modified(), dst.modified()) {
            (Ok(src), Ok(dst)) => src <= dst,
            _ => false,
        },
        _ => false,
    };
    if up_to_date {
        return;
    }

    let status = Command::new(glslc).arg(source).arg("-o").arg(output).status();
    match status {
        Ok(s) if s.success() => {
            eprintln!("info: compiled {:?}", source.file_name().unwrap());
        }
        Ok(s) => panic!("glslc failed for {source:?} with exit code {:?}", s.code()),
        Err(e) => panic!("failed to run glslc for {source:?}: {e}"),
    }
}

fn main() {
    println!("cargo:rerun-if-changed=resources/shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");

    let Ok(vulkan_sdk) = env::var("VULKAN_SDK") else {
        eprintln!("warning: VULKAN_SDK not set, shader compilation skipped");
        return;
    };
    let glslc = if cfg!(target_os = "windows") {
        format!("{vulkan_sdk}\\Bin\\glslc.exe")
    } else {
        format!("{vulkan_sdk}/bin/glslc")
    };
    if !Path::new(&glslc).exists() {
        eprintln!("warning: glslc not found at {glslc}, shader compilation skipped");
        return;
    }

    let shader_root = PathBuf::from("resources/shaders");
    let Ok(entries) = std::fs::read_dir(&shader_root) else {
        eprintln!("info: no shader directory at {shader_root:?}");
        return;
    };

    for entry in entries.flatten() {
        let shader_dir = entry.path();
        if !shader_dir.is_dir() {
            continue;
        }
        let out_dir = shader_dir.join("vulkan");
        std::fs::create_dir_all(&out_dir).expect("create shader output directory");

        for (source_name, output_name) in
            [("vertex.vert", "vertex.spv"), ("fragment.frag", "fragment.spv")]
        {
            let source = shader_dir.join(source_name);
            if source.exists() {
                compile_stage(&glslc, &source, &out_dir.join(output_name));
            }
        }
    }
}
