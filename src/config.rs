use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    // 应用信息
    pub app_name: String,
    pub app_version: String,

    // 解码器配置
    pub reinit_after_failures: u32,
    pub max_consecutive_failures: u32,

    // 播放配置
    pub playback_device: String,
    pub playback_channels: u32,
    pub playback_period_size: usize,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME").to_string(),
            app_version: env!("APP_VERSION").to_string(),

            // 解码器配置
            reinit_after_failures: env!("DECODER_REINIT_AFTER_FAILURES").parse()
                .map_err(|_| "Failed to parse DECODER_REINIT_AFTER_FAILURES")?,
            max_consecutive_failures: env!("DECODER_MAX_CONSECUTIVE_FAILURES").parse()
                .map_err(|_| "Failed to parse DECODER_MAX_CONSECUTIVE_FAILURES")?,

            // 播放配置
            playback_device: env!("PLAYBACK_DEVICE").to_string(),
            playback_channels: env!("PLAYBACK_CHANNELS").parse()
                .map_err(|_| "Failed to parse PLAYBACK_CHANNELS")?,
            playback_period_size: env!("PLAYBACK_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse PLAYBACK_PERIOD_SIZE")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}
