use std::fs;
use std::path::Path;
#[cfg(feature = "oi-sbc")]
use std::path::PathBuf;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    decoder: Decoder,
    playback: Playback,
    #[cfg(feature = "oi-sbc")]
    backend: Backend,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Decoder {
    reinit_after_failures: u32,
    max_consecutive_failures: u32,
}

#[derive(Deserialize)]
struct Playback {
    device: String,
    channels: u32,
    period_size: usize,
}

#[cfg(feature = "oi-sbc")]
#[derive(Deserialize)]
struct Backend {
    pkg_config_name: String,
    static_lib: String,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");
    println!("cargo:rerun-if-changed=csrc/oi_sbc_shim.c");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 应用信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 解码器配置
    println!(
        "cargo:rustc-env=DECODER_REINIT_AFTER_FAILURES={}",
        config.decoder.reinit_after_failures
    );
    println!(
        "cargo:rustc-env=DECODER_MAX_CONSECUTIVE_FAILURES={}",
        config.decoder.max_consecutive_failures
    );

    // 播放配置
    println!("cargo:rustc-env=PLAYBACK_DEVICE={}", config.playback.device);
    println!("cargo:rustc-env=PLAYBACK_CHANNELS={}", config.playback.channels);
    println!("cargo:rustc-env=PLAYBACK_PERIOD_SIZE={}", config.playback.period_size);

    #[cfg(feature = "oi-sbc")]
    link_oi_sbc(&config.backend);
}

#[cfg(feature = "oi-sbc")]
fn link_oi_sbc(backend: &Backend) {
    let target = std::env::var("TARGET").unwrap_or_default();
    let mut include_paths: Vec<PathBuf> = Vec::new();

    if target.contains("musl") {
        // musl 目标：使用手动编译的静态库，不依赖 pkg-config
        if let Ok(sysroot) = std::env::var("MUSL_SYSROOT") {
            println!("cargo:rustc-link-search=native={}/usr/lib", sysroot);
            include_paths.push(PathBuf::from(format!("{}/usr/include", sysroot)));
        }
        println!("cargo:rustc-link-lib=static={}", backend.static_lib);
    } else {
        // 其他目标：通过 pkg-config 查找 SBC 解码库
        let lib = pkg_config::Config::new()
            .probe(&backend.pkg_config_name)
            .unwrap_or_else(|e| {
                panic!(
                    "Failed to find {}: {}. Install the Bluetooth SBC decoder library.",
                    backend.pkg_config_name, e
                )
            });
        include_paths.extend(lib.include_paths);
    }

    // 编译 C 垫片，用于获取解码上下文的实际大小
    let mut build = cc::Build::new();
    build.file("csrc/oi_sbc_shim.c");
    for path in &include_paths {
        build.include(path);
    }
    build.compile("oi_sbc_shim");
}
